//! Atelier Commerce - custom-suit marketplace core
//!
//! Tailors list configured suits, customers collect them in a cart and pay
//! through a hosted checkout once every suit has completed body measurements.
//!
//! ## Features
//! - Suit pricing with a fixed tailor / platform / risk-buffer split
//! - Cart with price snapshots and a marketplace commission
//! - Measurement sessions gating checkout
//! - Hosted checkout sessions carrying order metadata

pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod measurements;
pub mod pricing;
pub mod providers;
pub mod publisher;

pub use error::{MarketplaceError, Result};
