//! Order Aggregate
//!
//! Orders are materialized from checkout-session metadata once the payment
//! provider confirms payment. This crate only models them; the webhook
//! consumer that persists them lives outside it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{Money, Quantity};
use crate::error::MarketplaceError;

#[derive(Clone, Debug)]
pub struct Order {
    id: Uuid,
    user_id: Uuid,
    checkout_session_id: String,
    status: OrderStatus,
    items: Vec<OrderItem>,
    platform_fee: Money,
    total_amount: Money,
    shipping_address: ShippingAddress,
    tracking_number: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub tailor_id: Uuid,
    pub measurement_session_id: Option<Uuid>,
    pub title: String,
    pub notes: Option<String>,
    pub unit_price: Money,
    pub quantity: Quantity,
}

impl OrderItem {
    pub fn subtotal(&self) -> Money { self.unit_price.multiply(self.quantity.value()) }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub name: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus { #[default] Pending, Paid, Processing, Shipped, Completed, Cancelled }

impl Order {
    /// Builds a pending order and checks `sum(item subtotals) + platform_fee == total_amount`.
    pub fn create(
        user_id: Uuid,
        checkout_session_id: impl Into<String>,
        items: Vec<OrderItem>,
        platform_fee: Money,
        total_amount: Money,
        shipping_address: ShippingAddress,
    ) -> Result<Self, MarketplaceError> {
        if items.is_empty() { return Err(MarketplaceError::EmptyCart); }
        let items_total = items.iter().try_fold(Money::zero(total_amount.currency()), |acc, i| acc.add(&i.subtotal()))?;
        if items_total.add(&platform_fee)? != total_amount {
            return Err(MarketplaceError::invalid("total", format!("items {items_total} + fee {platform_fee} != total {total_amount}")));
        }
        let id = Uuid::now_v7();
        let now = Utc::now();
        let mut order = Self {
            id, user_id, checkout_session_id: checkout_session_id.into(), status: OrderStatus::Pending, items,
            platform_fee, total_amount: total_amount.clone(), shipping_address, tracking_number: None,
            created_at: now, updated_at: now, events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Created { order_id: id, user_id, total: total_amount.amount() }));
        Ok(order)
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn user_id(&self) -> Uuid { self.user_id }
    pub fn checkout_session_id(&self) -> &str { &self.checkout_session_id }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn items(&self) -> &[OrderItem] { &self.items }
    pub fn platform_fee(&self) -> &Money { &self.platform_fee }
    pub fn total_amount(&self) -> &Money { &self.total_amount }
    pub fn shipping_address(&self) -> &ShippingAddress { &self.shipping_address }
    pub fn tracking_number(&self) -> Option<&str> { self.tracking_number.as_deref() }

    pub fn mark_paid(&mut self) -> Result<(), MarketplaceError> {
        self.transition(OrderStatus::Pending, OrderStatus::Paid)?;
        self.raise_event(DomainEvent::Order(OrderEvent::Paid { order_id: self.id }));
        Ok(())
    }

    pub fn start_processing(&mut self) -> Result<(), MarketplaceError> { self.transition(OrderStatus::Paid, OrderStatus::Processing) }

    pub fn ship(&mut self, tracking_number: impl Into<String>) -> Result<(), MarketplaceError> {
        self.transition(OrderStatus::Processing, OrderStatus::Shipped)?;
        let tracking = tracking_number.into();
        self.tracking_number = Some(tracking.clone());
        self.raise_event(DomainEvent::Order(OrderEvent::Shipped { order_id: self.id, tracking: Some(tracking) }));
        Ok(())
    }

    pub fn complete(&mut self) -> Result<(), MarketplaceError> { self.transition(OrderStatus::Shipped, OrderStatus::Completed) }

    pub fn cancel(&mut self) -> Result<(), MarketplaceError> {
        if !matches!(self.status, OrderStatus::Pending | OrderStatus::Paid | OrderStatus::Processing) {
            return Err(self.invalid_transition(OrderStatus::Cancelled));
        }
        self.status = OrderStatus::Cancelled;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Cancelled { order_id: self.id }));
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    fn transition(&mut self, from: OrderStatus, to: OrderStatus) -> Result<(), MarketplaceError> {
        if self.status != from { return Err(self.invalid_transition(to)); }
        self.status = to;
        self.touch();
        Ok(())
    }

    fn invalid_transition(&self, to: OrderStatus) -> MarketplaceError {
        MarketplaceError::Conflict { message: format!("order cannot move from {:?} to {to:?}", self.status), existing_item_id: None }
    }

    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}
