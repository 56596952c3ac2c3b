//! Aggregates module
pub mod cart;
pub mod fabric;
pub mod measurement;
pub mod order;
pub mod product;
pub mod suit_model;

pub use cart::{Cart, CartItem, CartItemUpdate, CartTotals};
pub use fabric::Fabric;
pub use measurement::{BodyMeasurements, MeasurementSession, MeasurementUnit, SessionStatus};
pub use order::{Order, OrderItem, OrderStatus, ShippingAddress};
pub use product::{Customizations, Product, SuitConfiguration};
pub use suit_model::{SuitModel, SuitModelId};
