//! Suit models, fabrics and pricing.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{double_option, ApiError, AppState, CurrentUser, OrApi, Role, ValidatedJson};
use super::middleware::RequestId;
use crate::db;
use crate::db::fabrics::{FabricChanges, NewFabric};
use crate::domain::aggregates::{Fabric, SuitConfiguration, SuitModel};
use crate::error::MarketplaceError;
use crate::pricing::{PriceBreakdown, PriceCalculator, PricingConfig, PricingSelfCheck};

pub async fn list_models() -> Json<Vec<SuitModel>> { Json(SuitModel::all()) }

/// Admins see inactive fabrics too.
pub async fn list_fabrics(State(s): State<AppState>, Extension(rid): Extension<RequestId>, user: Option<CurrentUser>) -> Result<Json<Vec<Fabric>>, ApiError> {
    let fabrics = match user {
        Some(u) if u.role == Role::Admin => db::fabrics::list_all(&s.db).await,
        _ => db::fabrics::list_active(&s.db).await,
    };
    fabrics.map(Json).or_api(&rid)
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateFabricRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub price_add: Decimal,
    pub is_active: Option<bool>,
    pub position: Option<i32>,
}

fn check_price_add(price_add: Decimal) -> Result<(), MarketplaceError> {
    if price_add.is_sign_negative() && !price_add.is_zero() { return Err(MarketplaceError::invalid("priceAdd", "must not be negative")); }
    Ok(())
}

pub async fn create_fabric(
    State(s): State<AppState>,
    Extension(rid): Extension<RequestId>,
    user: CurrentUser,
    ValidatedJson(r): ValidatedJson<CreateFabricRequest>,
) -> Result<(StatusCode, Json<Fabric>), ApiError> {
    user.require_admin(&rid)?;
    check_price_add(r.price_add).or_api(&rid)?;
    let fabric = NewFabric {
        name: r.name.trim().to_string(),
        description: r.description,
        price_add: r.price_add,
        is_active: r.is_active.unwrap_or(true),
        position: r.position.unwrap_or(0),
    };
    let created = db::fabrics::insert(&s.db, &fabric).await.or_api(&rid)?;
    tracing::info!(fabric_id = %created.id, admin_id = %user.id, "fabric created");
    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFabricRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub price_add: Option<Decimal>,
    pub is_active: Option<bool>,
    pub position: Option<i32>,
}

pub async fn update_fabric(
    State(s): State<AppState>,
    Extension(rid): Extension<RequestId>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(r): ValidatedJson<UpdateFabricRequest>,
) -> Result<Json<Fabric>, ApiError> {
    user.require_admin(&rid)?;
    if let Some(price_add) = r.price_add { check_price_add(price_add).or_api(&rid)?; }
    let changes = FabricChanges {
        name: r.name.map(|n| n.trim().to_string()),
        description: r.description,
        price_add: r.price_add,
        is_active: r.is_active,
        position: r.position,
    };
    let updated = db::fabrics::update(&s.db, id, &changes).await.or_api(&rid)?.ok_or(MarketplaceError::FabricNotFound(id)).or_api(&rid)?;
    tracing::info!(fabric_id = %id, admin_id = %user.id, "fabric updated");
    Ok(Json(updated))
}

/// Referenced fabrics are refused; the foreign key catches a product
/// created between the count and the delete. Responds with the deleted fabric.
pub async fn delete_fabric(State(s): State<AppState>, Extension(rid): Extension<RequestId>, user: CurrentUser, Path(id): Path<Uuid>) -> Result<Json<Fabric>, ApiError> {
    user.require_admin(&rid)?;
    let fabric = db::fabrics::find(&s.db, id).await.or_api(&rid)?.ok_or(MarketplaceError::FabricNotFound(id)).or_api(&rid)?;
    let in_use = db::fabrics::count_products_using(&s.db, id).await.or_api(&rid)?;
    Fabric::ensure_deletable(id, in_use).or_api(&rid)?;

    match db::fabrics::delete(&s.db, id).await {
        Ok(true) => {
            tracing::info!(fabric_id = %id, admin_id = %user.id, "fabric deleted");
            Ok(Json(fabric))
        }
        Ok(false) => Err(ApiError::from_domain(&rid, MarketplaceError::FabricNotFound(id))),
        Err(e) if db::is_foreign_key_violation(&e) => {
            let in_use = db::fabrics::count_products_using(&s.db, id).await.or_api(&rid)?;
            Err(ApiError::from_domain(&rid, MarketplaceError::FabricInUse { fabric_id: id, product_count: in_use.max(1) }))
        }
        Err(e) => Err(ApiError::from_domain(&rid, e.into())),
    }
}

pub async fn quote(State(s): State<AppState>, Extension(rid): Extension<RequestId>, ValidatedJson(configuration): ValidatedJson<SuitConfiguration>) -> Result<Json<PriceBreakdown>, ApiError> {
    let breakdown = PriceCalculator::new(&s.pricing).quote(&s.db, &configuration).await.or_api(&rid)?;
    Ok(Json(breakdown))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelfCheckResponse {
    #[serde(flatten)]
    pub check: PricingSelfCheck,
    pub config: PricingConfig,
    pub payment_provider: &'static str,
    pub measurement_provider: &'static str,
}

pub async fn pricing_self_check(State(s): State<AppState>, Extension(rid): Extension<RequestId>, user: CurrentUser) -> Result<Json<SelfCheckResponse>, ApiError> {
    user.require_admin(&rid)?;
    Ok(Json(SelfCheckResponse {
        check: s.pricing.self_check(),
        config: (*s.pricing).clone(),
        payment_provider: s.checkout.payment_provider_name(),
        measurement_provider: s.measurements.provider_name(),
    }))
}
