//! Cart service: every operation is scoped to the caller's own cart.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::domain::aggregates::cart::duplicate_product;
use crate::domain::aggregates::{Cart, CartItem, CartItemUpdate, CartTotals, Product};
use crate::domain::events::{CartEvent, DomainEvent};
use crate::domain::value_objects::{Notes, Quantity};
use crate::error::{MarketplaceError, Result};
use crate::pricing::PricingConfig;
use crate::publisher::EventPublisher;

/// A cart as returned to the client, totals computed on read.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub cart: Cart,
    pub totals: CartTotals,
}

#[derive(Clone, Debug)]
pub struct NewCartItem {
    pub product_id: Uuid,
    pub measurement_session_id: Option<Uuid>,
    pub quantity: Quantity,
    pub notes: Option<Notes>,
}

#[derive(Clone)]
pub struct CartService {
    db: PgPool,
    pricing: Arc<PricingConfig>,
    events: EventPublisher,
}

/// Snapshot the product into a new cart line. The price is captured here
/// and never refreshed afterwards.
pub fn snapshot_item(cart: &Cart, product: &Product, request: NewCartItem) -> CartItem {
    CartItem {
        id: Uuid::now_v7(),
        cart_id: cart.id(),
        product_id: product.id,
        product_title: product.title.clone(),
        tailor_id: product.tailor_id,
        measurement_session_id: request.measurement_session_id,
        price_at_add: product.price(),
        quantity: request.quantity,
        notes: request.notes,
        created_at: Utc::now(),
    }
}

impl CartService {
    pub fn new(db: PgPool, pricing: Arc<PricingConfig>, events: EventPublisher) -> Self { Self { db, pricing, events } }

    pub fn view(&self, cart: Cart) -> Result<CartView> {
        let totals = cart.totals(self.pricing.commission_rate)?;
        Ok(CartView { cart, totals })
    }

    pub async fn get_or_create(&self, user_id: Uuid) -> Result<Cart> {
        db::carts::get_or_create(&self.db, user_id, &self.pricing.currency).await
    }

    pub async fn current(&self, user_id: Uuid) -> Result<CartView> {
        let cart = self.get_or_create(user_id).await?;
        self.view(cart)
    }

    /// Referenced sessions must exist and belong to the caller.
    async fn ensure_session_owned(&self, user_id: Uuid, session_id: Option<Uuid>) -> Result<()> {
        let Some(id) = session_id else { return Ok(()) };
        let session = db::measurements::find(&self.db, id).await?.ok_or(MarketplaceError::NotFound { entity: "measurement session" })?;
        session.ensure_owned_by(user_id)
    }

    pub async fn add_item(&self, user_id: Uuid, request: NewCartItem) -> Result<CartItem> {
        let found = db::products::find(&self.db, request.product_id).await?;
        let product = Product::resolve_purchasable(request.product_id, found)?;
        self.ensure_session_owned(user_id, request.measurement_session_id).await?;

        let mut cart = self.get_or_create(user_id).await?;
        let item = snapshot_item(&cart, &product, request);
        let item = cart.add_item(item)?.clone();

        if let Err(e) = db::carts::insert_item(&self.db, &item).await {
            // Concurrent add of the same product: the unique key decides.
            if db::is_unique_violation(&e) {
                let existing = db::carts::find_item_id_by_product(&self.db, cart.id(), product.id).await?;
                return Err(match existing {
                    Some(existing_id) => duplicate_product(existing_id),
                    None => MarketplaceError::Conflict { message: "product is already in the cart".into(), existing_item_id: None },
                });
            }
            return Err(e.into());
        }

        tracing::info!(%user_id, cart_id = %cart.id(), item_id = %item.id, product_id = %product.id, "cart item added");
        self.events
            .publish(DomainEvent::Cart(CartEvent::ItemAdded {
                cart_id: cart.id(),
                item_id: item.id,
                product_id: item.product_id,
                price_at_add: item.price_at_add.amount(),
            }))
            .await;
        Ok(item)
    }

    /// Existence is checked before ownership.
    async fn owned_cart_for_item(&self, user_id: Uuid, item_id: Uuid) -> Result<Cart> {
        let owned = db::carts::find_item(&self.db, item_id).await?.ok_or(MarketplaceError::NotFound { entity: "cart item" })?;
        if owned.owner_id != user_id { return Err(MarketplaceError::Forbidden); }
        self.get_or_create(user_id).await
    }

    pub async fn update_item(&self, user_id: Uuid, item_id: Uuid, update: CartItemUpdate) -> Result<CartItem> {
        let mut cart = self.owned_cart_for_item(user_id, item_id).await?;
        if let Some(session_id) = update.measurement_session_id {
            self.ensure_session_owned(user_id, session_id).await?;
        }
        let item = cart.update_item(item_id, update)?.clone();
        db::carts::update_item(&self.db, &item).await?;
        tracing::info!(%user_id, cart_id = %cart.id(), %item_id, quantity = item.quantity.value(), "cart item updated");
        Ok(item)
    }

    pub async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<CartItem> {
        let mut cart = self.owned_cart_for_item(user_id, item_id).await?;
        let removed = cart.remove_item(item_id)?;
        if !db::carts::delete_item(&self.db, cart.id(), item_id).await? {
            return Err(MarketplaceError::NotFound { entity: "cart item" });
        }
        tracing::info!(%user_id, cart_id = %cart.id(), %item_id, "cart item removed");
        self.events.publish(DomainEvent::Cart(CartEvent::ItemRemoved { cart_id: cart.id(), item_id })).await;
        Ok(removed)
    }

    pub async fn clear(&self, user_id: Uuid) -> Result<CartView> {
        let mut cart = self.get_or_create(user_id).await?;
        let removed = db::carts::clear(&self.db, cart.id()).await?;
        cart.clear();
        tracing::info!(%user_id, cart_id = %cart.id(), removed, "cart cleared");
        self.events.publish(DomainEvent::Cart(CartEvent::Cleared { cart_id: cart.id() })).await;
        self.view(cart)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;

    fn product(price: i64) -> Product {
        Product {
            id: Uuid::new_v4(), tailor_id: Uuid::new_v4(), title: "Charcoal Modern".into(), description: None,
            price: Decimal::new(price, 0), currency: "eur".into(), is_active: true, model_id: Some("modern".into()),
            fabric_id: None, configuration: None, created_at: Utc::now(), updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_snapshot_keeps_price_at_add() {
        let cart = Cart::new(Uuid::new_v4(), "eur");
        let mut p = product(860);
        let item = snapshot_item(&cart, &p, NewCartItem { product_id: p.id, measurement_session_id: None, quantity: Quantity::one(), notes: None });
        p.price = Decimal::new(990, 0);
        assert_eq!(item.price_at_add.amount(), Decimal::new(860, 0));
        assert_eq!(item.tailor_id, p.tailor_id);
        assert_eq!(item.cart_id, cart.id());
    }
}
