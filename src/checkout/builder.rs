use std::collections::HashMap;

use rust_decimal::Decimal;
use uuid::Uuid;

use super::metadata::CheckoutMetadata;
use super::{BlockingItem, CheckoutUrls};
use crate::domain::aggregates::{CartItem, CartTotals, Product, SessionStatus, ShippingAddress};
use crate::domain::value_objects::{Money, Notes, Quantity};
use crate::error::{FieldErrors, MarketplaceError, Result};
use crate::pricing::PricingConfig;
use crate::providers::payment::{CheckoutSessionRequest, ProviderLineItem};

pub const PLATFORM_FEE_LINE_NAME: &str = "Platform fee";

/// One purchasable line, from a cart item or a direct purchase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutLine {
    pub item_id: Option<Uuid>,
    pub product_id: Uuid,
    pub tailor_id: Uuid,
    pub title: String,
    pub unit_price: Money,
    pub quantity: Quantity,
    pub notes: Option<String>,
    pub measurement_session_id: Option<Uuid>,
}

impl CheckoutLine {
    pub fn from_cart_item(item: &CartItem) -> Self {
        Self {
            item_id: Some(item.id),
            product_id: item.product_id,
            tailor_id: item.tailor_id,
            title: item.product_title.clone(),
            unit_price: item.price_at_add.clone(),
            quantity: item.quantity,
            notes: item.notes.as_ref().map(|n| n.as_str().to_string()),
            measurement_session_id: item.measurement_session_id,
        }
    }

    /// Direct purchase prices at the product's live price.
    pub fn direct(product: &Product, quantity: Quantity, notes: Option<Notes>, measurement_session_id: Option<Uuid>) -> Self {
        Self {
            item_id: None,
            product_id: product.id,
            tailor_id: product.tailor_id,
            title: product.title.clone(),
            unit_price: product.price(),
            quantity,
            notes: notes.map(|n| n.as_str().to_string()),
            measurement_session_id,
        }
    }

    pub fn subtotal(&self) -> Money { self.unit_price.multiply(self.quantity.value()) }

    fn blocking(&self, status: Option<SessionStatus>) -> BlockingItem {
        BlockingItem {
            item_id: self.item_id,
            product_id: self.product_id,
            product_title: self.title.clone(),
            measurement_session_id: self.measurement_session_id,
            status: status.map(|s| s.as_str().to_string()),
        }
    }

    fn description(&self) -> String {
        match &self.notes {
            Some(notes) => format!("Tailor {}. Notes: {notes}", self.tailor_id),
            None => format!("Tailor {}", self.tailor_id),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckoutSource {
    Cart { cart_id: Uuid },
    Direct,
}

impl CheckoutSource {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Cart { .. } => "cart", Self::Direct => "direct" }
    }

    pub fn cart_id(&self) -> Option<Uuid> {
        match self { Self::Cart { cart_id } => Some(*cart_id), Self::Direct => None }
    }
}

/// Validated and priced, ready to be sent to the payment provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutDraft {
    pub user_id: Uuid,
    pub source: CheckoutSource,
    pub lines: Vec<CheckoutLine>,
    pub totals: CartTotals,
    pub shipping_address: ShippingAddress,
}

/// Every line needs a session, and every session must be completed.
///
/// `sessions` holds the status of each referenced session the caller owns;
/// a referenced id absent from the map counts as incomplete. Missing sessions
/// are reported before incomplete ones.
pub fn check_measurements(lines: &[CheckoutLine], sessions: &HashMap<Uuid, SessionStatus>) -> Result<()> {
    let missing: Vec<BlockingItem> = lines.iter().filter(|l| l.measurement_session_id.is_none()).map(|l| l.blocking(None)).collect();
    if !missing.is_empty() { return Err(MarketplaceError::MissingMeasurements(missing)); }

    let incomplete: Vec<BlockingItem> = lines
        .iter()
        .filter_map(|l| {
            let status = l.measurement_session_id.and_then(|id| sessions.get(&id).copied());
            match status {
                Some(SessionStatus::Completed) => None,
                other => Some(l.blocking(other)),
            }
        })
        .collect();
    if !incomplete.is_empty() { return Err(MarketplaceError::IncompleteMeasurements(incomplete)); }
    Ok(())
}

pub fn check_shipping_address(address: &ShippingAddress) -> Result<()> {
    let mut fields = FieldErrors::new();
    for (field, value) in [
        ("name", &address.name),
        ("line1", &address.line1),
        ("city", &address.city),
        ("postalCode", &address.postal_code),
        ("country", &address.country),
    ] {
        if value.trim().is_empty() {
            fields.entry(format!("shippingAddress.{field}")).or_default().push("is required".into());
        }
    }
    if address.country.trim().chars().count() != 2 && !address.country.trim().is_empty() {
        fields.entry("shippingAddress.country".into()).or_default().push("must be a two-letter country code".into());
    }
    if fields.is_empty() { Ok(()) } else { Err(MarketplaceError::Validation(fields)) }
}

pub struct CheckoutBuilder<'a> {
    pricing: &'a PricingConfig,
    urls: &'a CheckoutUrls,
}

impl<'a> CheckoutBuilder<'a> {
    pub fn new(pricing: &'a PricingConfig, urls: &'a CheckoutUrls) -> Self { Self { pricing, urls } }

    /// Validate then compute. Nothing here has side effects, so a failure
    /// never leaves a half-created provider session behind.
    pub fn draft(
        &self,
        user_id: Uuid,
        source: CheckoutSource,
        lines: Vec<CheckoutLine>,
        sessions: &HashMap<Uuid, SessionStatus>,
        shipping_address: ShippingAddress,
    ) -> Result<CheckoutDraft> {
        if lines.is_empty() { return Err(MarketplaceError::EmptyCart); }
        check_measurements(&lines, sessions)?;
        check_shipping_address(&shipping_address)?;

        let subtotal = lines.iter().try_fold(Money::zero(&self.pricing.currency), |acc, l| acc.add(&l.subtotal()))?;
        let totals = CartTotals::compute(subtotal, self.pricing.commission_rate, lines.len())?;
        Ok(CheckoutDraft { user_id, source, lines, totals, shipping_address })
    }

    /// One provider line per checkout line plus a separate platform-fee line,
    /// with the reconciliation metadata attached.
    pub fn request(&self, draft: &CheckoutDraft, customer_email: Option<&str>) -> Result<CheckoutSessionRequest> {
        let mut line_items = draft
            .lines
            .iter()
            .map(|l| -> Result<ProviderLineItem> {
                Ok(ProviderLineItem {
                    name: l.title.clone(),
                    description: Some(l.description()),
                    unit_amount: l.unit_price.to_minor_units()?,
                    quantity: l.quantity.value(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if draft.totals.platform_fee.amount() > Decimal::ZERO {
            let percent = (self.pricing.commission_rate * Decimal::ONE_HUNDRED).normalize();
            line_items.push(ProviderLineItem {
                name: PLATFORM_FEE_LINE_NAME.into(),
                description: Some(format!("Marketplace commission ({percent}%)")),
                unit_amount: draft.totals.platform_fee.to_minor_units()?,
                quantity: 1,
            });
        }

        let metadata = CheckoutMetadata::from_draft(draft).encode()?;
        Ok(CheckoutSessionRequest {
            currency: draft.totals.total.currency().to_string(),
            line_items,
            metadata,
            success_url: self.urls.success_url.clone(),
            cancel_url: self.urls.cancel_url.clone(),
            customer_email: customer_email.map(String::from),
        })
    }
}

#[cfg(test)]
pub(crate) fn address() -> ShippingAddress {
    ShippingAddress {
        name: "Ada Lovelace".into(), line1: "12 Savile Row".into(), line2: None, city: "London".into(),
        state: None, postal_code: "W1S 3PQ".into(), country: "GB".into(),
    }
}

#[cfg(test)]
pub(crate) fn line(price: i64, quantity: u32, session: Option<Uuid>) -> CheckoutLine {
    CheckoutLine {
        item_id: Some(Uuid::now_v7()), product_id: Uuid::new_v4(), tailor_id: Uuid::new_v4(), title: "Navy Classic".into(),
        unit_price: Money::new(Decimal::new(price, 0), "eur"), quantity: Quantity::new(quantity).unwrap(),
        notes: None, measurement_session_id: session,
    }
}
