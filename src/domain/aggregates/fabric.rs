//! Fabric Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::error::MarketplaceError;

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Fabric {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_add: Decimal,
    pub is_active: bool,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Fabric {
    /// Resolves a catalog lookup into a fabric that may be priced.
    ///
    /// Inactive fabrics are never priced even though the row still exists.
    pub fn resolve_for_pricing(id: Uuid, found: Option<Fabric>) -> Result<Fabric, MarketplaceError> {
        let fabric = found.ok_or(MarketplaceError::FabricNotFound(id))?;
        if !fabric.is_active { return Err(MarketplaceError::FabricInactive(id)); }
        Ok(fabric)
    }

    /// A fabric referenced by any product must not be deleted.
    pub fn ensure_deletable(id: Uuid, product_count: i64) -> Result<(), MarketplaceError> {
        if product_count > 0 { return Err(MarketplaceError::FabricInUse { fabric_id: id, product_count }); }
        Ok(())
    }
}
