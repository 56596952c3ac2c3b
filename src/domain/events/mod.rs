//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "aggregate", content = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    Cart(CartEvent),
    Measurement(MeasurementEvent),
    Checkout(CheckoutEvent),
    Order(OrderEvent),
}

impl DomainEvent {
    /// NATS subject, `atelier.<aggregate>.<event>`.
    pub fn subject(&self) -> String {
        let (aggregate, event) = match self {
            Self::Cart(e) => ("cart", e.name()),
            Self::Measurement(e) => ("measurement", e.name()),
            Self::Checkout(e) => ("checkout", e.name()),
            Self::Order(e) => ("order", e.name()),
        };
        format!("atelier.{aggregate}.{event}")
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartEvent {
    ItemAdded { cart_id: Uuid, item_id: Uuid, product_id: Uuid, price_at_add: Decimal },
    ItemRemoved { cart_id: Uuid, item_id: Uuid },
    Cleared { cart_id: Uuid },
}

impl CartEvent {
    fn name(&self) -> &'static str {
        match self { Self::ItemAdded { .. } => "item_added", Self::ItemRemoved { .. } => "item_removed", Self::Cleared { .. } => "cleared" }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MeasurementEvent {
    SessionCreated { session_id: Uuid, user_id: Uuid, provider: String },
    SessionCompleted { session_id: Uuid, user_id: Uuid },
}

impl MeasurementEvent {
    fn name(&self) -> &'static str {
        match self { Self::SessionCreated { .. } => "session_created", Self::SessionCompleted { .. } => "session_completed" }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckoutEvent {
    SessionCreated { user_id: Uuid, cart_id: Option<Uuid>, provider_session_id: String, total: Decimal },
}

impl CheckoutEvent {
    fn name(&self) -> &'static str {
        match self { Self::SessionCreated { .. } => "session_created" }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Created { order_id: Uuid, user_id: Uuid, total: Decimal },
    Paid { order_id: Uuid },
    Shipped { order_id: Uuid, tracking: Option<String> },
    Cancelled { order_id: Uuid },
}

impl OrderEvent {
    fn name(&self) -> &'static str {
        match self { Self::Created { .. } => "created", Self::Paid { .. } => "paid", Self::Shipped { .. } => "shipped", Self::Cancelled { .. } => "cancelled" }
    }
}
