//! Product Aggregate
//!
//! A product is a tailor's listing. Configured suits carry the
//! [`SuitConfiguration`] they were priced from.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::measurement::BodyMeasurements;
use crate::domain::value_objects::{MonogramText, Money};
use crate::error::MarketplaceError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fit { Slim, #[default] Regular, Relaxed }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LapelStyle { #[default] Notch, Peak, Shawl }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VentStyle { None, Single, #[default] Double }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle { One, #[default] Two, Three, DoubleBreasted }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PocketStyle { #[default] Flap, Jetted, Patch }

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct Customizations {
    pub lining: bool,
    pub monogram: bool,
    #[validate(length(min = 1, max = 4, message = "monogram text must be 1-4 characters"))]
    pub monogram_text: Option<String>,
    pub extra_trousers: bool,
}

impl Customizations {
    /// Monogram text is only meaningful, and then required, when the monogram is enabled.
    pub fn monogram(&self) -> Result<Option<MonogramText>, MarketplaceError> {
        if !self.monogram { return Ok(None); }
        let raw = self.monogram_text.as_deref().unwrap_or_default();
        MonogramText::new(raw).map(Some).map_err(|e| MarketplaceError::invalid("customizations.monogramText", e.to_string()))
    }
}

/// Client-held suit design submitted for pricing or listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SuitConfiguration {
    pub model_id: String,
    pub fabric_id: Uuid,
    #[serde(default)]
    pub fit: Fit,
    #[serde(default)]
    pub lapel: LapelStyle,
    #[serde(default)]
    pub vent: VentStyle,
    #[serde(default)]
    pub buttons: ButtonStyle,
    #[serde(default)]
    pub pockets: PocketStyle,
    #[validate]
    pub measurements: Option<BodyMeasurements>,
    #[serde(default)]
    #[validate]
    pub customizations: Customizations,
}

impl SuitConfiguration {
    pub fn check(&self) -> Result<(), MarketplaceError> {
        self.validate()?;
        self.customizations.monogram()?;
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub tailor_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub currency: String,
    pub is_active: bool,
    pub model_id: Option<String>,
    pub fabric_id: Option<Uuid>,
    pub configuration: Option<Json<SuitConfiguration>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn price(&self) -> Money { Money::new(self.price, &self.currency) }

    /// Resolves a lookup into a product that can be put in a cart or bought directly.
    pub fn resolve_purchasable(id: Uuid, found: Option<Product>) -> Result<Product, MarketplaceError> {
        let product = found.ok_or(MarketplaceError::ProductNotFound(id))?;
        if !product.is_active { return Err(MarketplaceError::ProductInactive(id)); }
        Ok(product)
    }

    pub fn ensure_owned_by(&self, tailor_id: Uuid) -> Result<(), MarketplaceError> {
        if self.tailor_id != tailor_id { return Err(MarketplaceError::Forbidden); }
        Ok(())
    }
}
