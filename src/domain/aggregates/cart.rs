//! Cart Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::{Money, MoneyError, Notes, Quantity};
use crate::error::MarketplaceError;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    id: Uuid,
    user_id: Uuid,
    currency: String,
    items: Vec<CartItem>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub product_title: String,
    pub tailor_id: Uuid,
    pub measurement_session_id: Option<Uuid>,
    /// Snapshot of the product price when the item was added. Never refreshed.
    pub price_at_add: Money,
    pub quantity: Quantity,
    pub notes: Option<Notes>,
    pub created_at: DateTime<Utc>,
}

impl CartItem {
    pub fn line_total(&self) -> Money { self.price_at_add.multiply(self.quantity.value()) }
}

/// PATCH-style change set: outer `None` keeps the current value.
#[derive(Clone, Debug, Default)]
pub struct CartItemUpdate {
    pub quantity: Option<Quantity>,
    pub notes: Option<Option<Notes>>,
    pub measurement_session_id: Option<Option<Uuid>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub item_count: usize,
    pub subtotal: Money,
    pub platform_fee: Money,
    pub total: Money,
}

impl CartTotals {
    /// `platform_fee = round_minor(subtotal * rate)`, `total = subtotal + platform_fee`.
    pub fn compute(subtotal: Money, commission_rate: Decimal, item_count: usize) -> Result<Self, MarketplaceError> {
        let platform_fee = subtotal.scale(commission_rate).round_minor();
        let total = subtotal.add(&platform_fee)?;
        Ok(Self { item_count, subtotal, platform_fee, total })
    }
}

impl Cart {
    pub fn new(user_id: Uuid, currency: &str) -> Self {
        let now = Utc::now();
        Self::restore(Uuid::now_v7(), user_id, currency, vec![], now, now)
    }

    pub fn restore(id: Uuid, user_id: Uuid, currency: &str, items: Vec<CartItem>, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Self {
        Self { id, user_id, currency: currency.to_lowercase(), items, created_at, updated_at }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn user_id(&self) -> Uuid { self.user_id }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn ensure_owned_by(&self, user_id: Uuid) -> Result<(), MarketplaceError> {
        if self.user_id != user_id { return Err(MarketplaceError::Forbidden); }
        Ok(())
    }

    /// One line per product: a second add is a conflict naming the existing line.
    pub fn ensure_product_absent(&self, product_id: Uuid) -> Result<(), MarketplaceError> {
        match self.items.iter().find(|i| i.product_id == product_id) {
            Some(existing) => Err(duplicate_product(existing.id)),
            None => Ok(()),
        }
    }

    pub fn add_item(&mut self, item: CartItem) -> Result<&CartItem, MarketplaceError> {
        self.ensure_product_absent(item.product_id)?;
        if item.price_at_add.currency() != self.currency { return Err(MoneyError::CurrencyMismatch.into()); }
        self.items.push(item);
        self.touch();
        let last = self.items.len() - 1;
        Ok(&self.items[last])
    }

    pub fn item(&self, item_id: Uuid) -> Result<&CartItem, MarketplaceError> {
        self.items.iter().find(|i| i.id == item_id).ok_or(MarketplaceError::NotFound { entity: "cart item" })
    }

    pub fn update_item(&mut self, item_id: Uuid, update: CartItemUpdate) -> Result<&CartItem, MarketplaceError> {
        let index = self.items.iter().position(|i| i.id == item_id).ok_or(MarketplaceError::NotFound { entity: "cart item" })?;
        let item = &mut self.items[index];
        if let Some(quantity) = update.quantity { item.quantity = quantity; }
        if let Some(notes) = update.notes { item.notes = notes; }
        if let Some(session) = update.measurement_session_id { item.measurement_session_id = session; }
        self.touch();
        Ok(&self.items[index])
    }

    pub fn remove_item(&mut self, item_id: Uuid) -> Result<CartItem, MarketplaceError> {
        let index = self.items.iter().position(|i| i.id == item_id).ok_or(MarketplaceError::NotFound { entity: "cart item" })?;
        let removed = self.items.remove(index);
        self.touch();
        Ok(removed)
    }

    pub fn clear(&mut self) { self.items.clear(); self.touch(); }

    pub fn subtotal(&self) -> Result<Money, MarketplaceError> {
        self.items.iter().try_fold(Money::zero(&self.currency), |acc, i| acc.add(&i.line_total()).map_err(Into::into))
    }

    /// Recomputed on every call; nothing is cached on the aggregate.
    pub fn totals(&self, commission_rate: Decimal) -> Result<CartTotals, MarketplaceError> {
        CartTotals::compute(self.subtotal()?, commission_rate, self.items.len())
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

pub(crate) fn duplicate_product(existing_item_id: Uuid) -> MarketplaceError {
    MarketplaceError::Conflict { message: "product is already in the cart".into(), existing_item_id: Some(existing_item_id) }
}

#[cfg(test)]
pub(crate) fn test_item(cart_id: Uuid, price: i64, quantity: u32) -> CartItem {
    CartItem {
        id: Uuid::now_v7(), cart_id, product_id: Uuid::new_v4(), product_title: "Navy Classic".into(),
        tailor_id: Uuid::new_v4(), measurement_session_id: None, price_at_add: Money::new(Decimal::new(price, 0), "eur"),
        quantity: Quantity::new(quantity).unwrap(), notes: None, created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_totals() {
        let mut cart = Cart::new(Uuid::new_v4(), "EUR");
        cart.add_item(test_item(cart.id(), 860, 2)).unwrap();
        let totals = cart.totals(Decimal::new(10, 2)).unwrap();
        assert_eq!(totals.subtotal.amount(), Decimal::new(1720, 0));
        assert_eq!(totals.platform_fee.amount(), Decimal::new(172, 0));
        assert_eq!(totals.total.amount(), Decimal::new(1892, 0));
        assert_eq!(totals.item_count, 1);
    }

    #[test]
    fn test_duplicate_product_is_conflict_not_merge() {
        let mut cart = Cart::new(Uuid::new_v4(), "eur");
        let first = test_item(cart.id(), 500, 1);
        let first_id = first.id;
        let mut second = test_item(cart.id(), 500, 3);
        second.product_id = first.product_id;
        cart.add_item(first).unwrap();
        let err = cart.add_item(second).unwrap_err();
        assert!(matches!(err, MarketplaceError::Conflict { existing_item_id: Some(id), .. } if id == first_id));
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.items()[0].quantity.value(), 1);
    }

    #[test]
    fn test_update_and_remove() {
        let mut cart = Cart::new(Uuid::new_v4(), "eur");
        let item = test_item(cart.id(), 100, 1);
        let id = item.id;
        cart.add_item(item).unwrap();
        let session = Uuid::new_v4();
        let updated = cart.update_item(id, CartItemUpdate {
            quantity: Some(Quantity::new(4).unwrap()),
            notes: Some(Notes::parse("shorter sleeves").unwrap()),
            measurement_session_id: Some(Some(session)),
        }).unwrap();
        assert_eq!(updated.quantity.value(), 4);
        assert_eq!(updated.measurement_session_id, Some(session));
        assert_eq!(cart.subtotal().unwrap().amount(), Decimal::new(400, 0));

        let cleared = cart.update_item(id, CartItemUpdate { measurement_session_id: Some(None), ..Default::default() }).unwrap();
        assert_eq!(cleared.measurement_session_id, None);
        assert_eq!(cleared.quantity.value(), 4);

        cart.remove_item(id).unwrap();
        assert!(matches!(cart.remove_item(id), Err(MarketplaceError::NotFound { .. })));
    }

    #[test]
    fn test_ownership() {
        let owner = Uuid::new_v4();
        let cart = Cart::new(owner, "eur");
        assert!(cart.ensure_owned_by(owner).is_ok());
        assert!(matches!(cart.ensure_owned_by(Uuid::new_v4()), Err(MarketplaceError::Forbidden)));
    }

    #[test]
    fn test_empty_cart_totals_are_zero() {
        let cart = Cart::new(Uuid::new_v4(), "eur");
        let totals = cart.totals(Decimal::new(10, 2)).unwrap();
        assert!(totals.total.amount().is_zero());
    }
}
