use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use super::builder::{CheckoutBuilder, CheckoutDraft, CheckoutLine, CheckoutSource};
use super::CheckoutUrls;
use crate::db;
use crate::domain::aggregates::{Product, ShippingAddress};
use crate::domain::events::{CheckoutEvent, DomainEvent};
use crate::domain::value_objects::{Notes, Quantity};
use crate::error::{MarketplaceError, Result};
use crate::pricing::PricingConfig;
use crate::providers::payment::{CheckoutSessionRef, PaymentProvider};
use crate::publisher::EventPublisher;

/// Single product bought without going through the cart.
#[derive(Clone, Debug)]
pub struct DirectCheckout {
    pub product_id: Uuid,
    pub measurement_session_id: Option<Uuid>,
    pub quantity: Quantity,
    pub notes: Option<Notes>,
    pub shipping_address: ShippingAddress,
}

#[derive(Clone)]
pub struct CheckoutService {
    db: PgPool,
    pricing: Arc<PricingConfig>,
    urls: CheckoutUrls,
    payments: Arc<dyn PaymentProvider>,
    events: EventPublisher,
}

impl CheckoutService {
    pub fn new(db: PgPool, pricing: Arc<PricingConfig>, urls: CheckoutUrls, payments: Arc<dyn PaymentProvider>, events: EventPublisher) -> Self {
        Self { db, pricing, urls, payments, events }
    }

    pub fn payment_provider_name(&self) -> &'static str { self.payments.name() }

    fn builder(&self) -> CheckoutBuilder<'_> { CheckoutBuilder::new(&self.pricing, &self.urls) }

    async fn draft(&self, user_id: Uuid, source: CheckoutSource, lines: Vec<CheckoutLine>, shipping_address: ShippingAddress) -> Result<CheckoutDraft> {
        let session_ids: Vec<Uuid> = lines.iter().filter_map(|l| l.measurement_session_id).collect();
        let sessions = db::measurements::statuses_for_user(&self.db, user_id, &session_ids).await?;
        self.builder().draft(user_id, source, lines, &sessions, shipping_address)
    }

    /// Whole-cart checkout. The cart is left untouched; it is cleared once
    /// the order is reconciled.
    pub async fn checkout_cart(&self, user_id: Uuid, email: Option<&str>, shipping_address: ShippingAddress) -> Result<CheckoutSessionRef> {
        let cart = db::carts::find_by_user(&self.db, user_id).await?.ok_or(MarketplaceError::EmptyCart)?;
        let lines = cart.items().iter().map(CheckoutLine::from_cart_item).collect();
        let draft = self.draft(user_id, CheckoutSource::Cart { cart_id: cart.id() }, lines, shipping_address).await?;
        self.submit(&draft, email).await
    }

    pub async fn checkout_direct(&self, user_id: Uuid, email: Option<&str>, request: DirectCheckout) -> Result<CheckoutSessionRef> {
        let found = db::products::find(&self.db, request.product_id).await?;
        let product = Product::resolve_purchasable(request.product_id, found)?;
        let line = CheckoutLine::direct(&product, request.quantity, request.notes, request.measurement_session_id);
        let draft = self.draft(user_id, CheckoutSource::Direct, vec![line], request.shipping_address).await?;
        self.submit(&draft, email).await
    }

    /// Creates the provider session for a validated draft. Never retried.
    pub async fn submit(&self, draft: &CheckoutDraft, email: Option<&str>) -> Result<CheckoutSessionRef> {
        let request = self.builder().request(draft, email)?;
        let session = self.payments.create_checkout_session(&request).await.map_err(|e| {
            tracing::error!(user_id = %draft.user_id, provider = self.payments.name(), error = %e, "checkout session creation failed");
            MarketplaceError::from(e)
        })?;

        tracing::info!(
            user_id = %draft.user_id,
            checkout_type = draft.source.as_str(),
            session_id = %session.session_id,
            total = %draft.totals.total,
            "checkout session created"
        );
        self.events
            .publish(DomainEvent::Checkout(CheckoutEvent::SessionCreated {
                user_id: draft.user_id,
                cart_id: draft.source.cart_id(),
                provider_session_id: session.session_id.clone(),
                total: draft.totals.total.amount(),
            }))
            .await;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use sqlx::postgres::PgPoolOptions;

    use super::*;
    use crate::checkout::builder::{address, line};
    use crate::checkout::CheckoutMetadata;
    use crate::domain::aggregates::SessionStatus;
    use crate::providers::payment::MockPaymentProvider;

    fn service(payments: Arc<MockPaymentProvider>) -> CheckoutService {
        let pool = PgPoolOptions::new().connect_lazy("postgres://localhost/unused").unwrap();
        CheckoutService::new(pool, Arc::new(PricingConfig::default()), CheckoutUrls::from_base("https://atelier.test"), payments, EventPublisher::disabled())
    }

    fn completed_draft(svc: &CheckoutService) -> CheckoutDraft {
        let session = Uuid::new_v4();
        svc.builder()
            .draft(Uuid::new_v4(), CheckoutSource::Cart { cart_id: Uuid::new_v4() }, vec![line(860, 2, Some(session))], &HashMap::from([(session, SessionStatus::Completed)]), address())
            .unwrap()
    }

    #[tokio::test]
    async fn test_submit_sends_metadata_to_provider() {
        let payments = Arc::new(MockPaymentProvider::new("https://atelier.test"));
        let svc = service(payments.clone());
        let draft = completed_draft(&svc);
        let session = svc.submit(&draft, Some("ada@atelier.test")).await.unwrap();
        assert!(session.session_id.starts_with("cs_mock_"));

        let sent = payments.created().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].amount_total(), 189_200);
        let decoded = CheckoutMetadata::decode(&sent[0].metadata).unwrap();
        assert_eq!(decoded.total, draft.totals.total.amount());
        assert_eq!(decoded.items.len(), 1);
    }

    #[tokio::test]
    async fn test_provider_rejection_is_checkout_failed() {
        let payments = Arc::new(MockPaymentProvider::new("https://atelier.test"));
        payments.fail_with("card_declined").await;
        let svc = service(payments.clone());
        let err = svc.submit(&completed_draft(&svc), None).await.unwrap_err();
        assert!(matches!(err, MarketplaceError::CheckoutFailed(ref m) if m.contains("card_declined")));
    }
}
