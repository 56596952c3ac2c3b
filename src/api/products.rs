//! Tailor listings built from a priced suit configuration.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::middleware::RequestId;
use super::{double_option, ApiError, AppState, CurrentUser, OrApi, Role, ValidatedJson};
use crate::db;
use crate::db::products::{NewProduct, ProductChanges};
use crate::domain::aggregates::{Product, SuitConfiguration};
use crate::error::MarketplaceError;
use crate::pricing::{PriceBreakdown, PriceCalculator};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate]
    pub configuration: SuitConfiguration,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedProduct {
    pub product: Product,
    pub breakdown: PriceBreakdown,
}

/// The listing price is the calculated total; tailors cannot pick it on creation.
pub async fn create_product(
    State(s): State<AppState>,
    Extension(rid): Extension<RequestId>,
    user: CurrentUser,
    ValidatedJson(r): ValidatedJson<CreateProductRequest>,
) -> Result<(StatusCode, Json<CreatedProduct>), ApiError> {
    user.require_role(Role::Tailor, &rid)?;
    let breakdown = PriceCalculator::new(&s.pricing).quote(&s.db, &r.configuration).await.or_api(&rid)?;
    let new = NewProduct {
        tailor_id: user.id,
        title: r.title.trim().to_string(),
        description: r.description,
        price: breakdown.total_price.amount(),
        currency: breakdown.total_price.currency().to_string(),
        configuration: r.configuration,
    };
    let product = db::products::insert(&s.db, &new).await.or_api(&rid)?;
    tracing::info!(product_id = %product.id, tailor_id = %user.id, price = %product.price, "product created");
    Ok((StatusCode::CREATED, Json(CreatedProduct { product, breakdown })))
}

pub async fn get_product(State(s): State<AppState>, Extension(rid): Extension<RequestId>, Path(id): Path<Uuid>) -> Result<Json<Product>, ApiError> {
    let product = db::products::find(&s.db, id).await.or_api(&rid)?.ok_or(MarketplaceError::ProductNotFound(id)).or_api(&rid)?;
    Ok(Json(product))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub price: Option<Decimal>,
    pub is_active: Option<bool>,
}

/// Changes the live listing. Existing cart lines keep their snapshot price.
pub async fn update_product(
    State(s): State<AppState>,
    Extension(rid): Extension<RequestId>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(r): ValidatedJson<UpdateProductRequest>,
) -> Result<Json<Product>, ApiError> {
    let current = db::products::find(&s.db, id).await.or_api(&rid)?.ok_or(MarketplaceError::ProductNotFound(id)).or_api(&rid)?;
    if user.role != Role::Admin { current.ensure_owned_by(user.id).or_api(&rid)?; }
    if let Some(price) = r.price {
        if price <= Decimal::ZERO { return Err(ApiError::from_domain(&rid, MarketplaceError::invalid("price", "must be positive"))); }
    }

    let changes = ProductChanges { title: r.title.map(|t| t.trim().to_string()), description: r.description, price: r.price, is_active: r.is_active };
    let updated = db::products::update(&s.db, id, &changes).await.or_api(&rid)?.ok_or(MarketplaceError::ProductNotFound(id)).or_api(&rid)?;
    tracing::info!(product_id = %id, user_id = %user.id, price = %updated.price, is_active = updated.is_active, "product updated");
    Ok(Json(updated))
}
