use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::middleware::RequestId;
use super::{double_option, ApiError, AppState, CurrentUser, OrApi, ValidatedJson};
use crate::cart::{CartView, NewCartItem};
use crate::domain::aggregates::{CartItem, CartItemUpdate, ShippingAddress};
use crate::domain::value_objects::{Notes, Quantity};
use crate::error::MarketplaceError;
use crate::providers::payment::CheckoutSessionRef;

fn quantity(raw: u32) -> Result<Quantity, MarketplaceError> {
    Quantity::new(raw).map_err(|e| MarketplaceError::invalid("quantity", e.to_string()))
}

fn notes(raw: Option<String>) -> Result<Option<Notes>, MarketplaceError> {
    match raw {
        None => Ok(None),
        Some(text) => Notes::parse(text).map_err(|e| MarketplaceError::invalid("notes", e.to_string())),
    }
}

pub async fn get_cart(State(s): State<AppState>, Extension(rid): Extension<RequestId>, user: CurrentUser) -> Result<Json<CartView>, ApiError> {
    s.carts.current(user.id).await.map(Json).or_api(&rid)
}

pub async fn clear_cart(State(s): State<AppState>, Extension(rid): Extension<RequestId>, user: CurrentUser) -> Result<Json<CartView>, ApiError> {
    s.carts.clear(user.id).await.map(Json).or_api(&rid)
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: Uuid,
    pub measurement_session_id: Option<Uuid>,
    #[validate(range(min = 1, max = 10, message = "quantity must be between 1 and 10"))]
    pub quantity: Option<u32>,
    pub notes: Option<String>,
}

pub async fn add_item(
    State(s): State<AppState>,
    Extension(rid): Extension<RequestId>,
    user: CurrentUser,
    ValidatedJson(r): ValidatedJson<AddItemRequest>,
) -> Result<(StatusCode, Json<CartItem>), ApiError> {
    let request = NewCartItem {
        product_id: r.product_id,
        measurement_session_id: r.measurement_session_id,
        quantity: r.quantity.map(quantity).transpose().or_api(&rid)?.unwrap_or_default(),
        notes: notes(r.notes).or_api(&rid)?,
    };
    let item = s.carts.add_item(user.id, request).await.or_api(&rid)?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Absent fields are left alone; `null` clears notes or the session link.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    #[validate(range(min = 1, max = 10, message = "quantity must be between 1 and 10"))]
    pub quantity: Option<u32>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub measurement_session_id: Option<Option<Uuid>>,
}

pub async fn update_item(
    State(s): State<AppState>,
    Extension(rid): Extension<RequestId>,
    user: CurrentUser,
    Path(item_id): Path<Uuid>,
    ValidatedJson(r): ValidatedJson<UpdateItemRequest>,
) -> Result<Json<CartItem>, ApiError> {
    let update = CartItemUpdate {
        quantity: r.quantity.map(quantity).transpose().or_api(&rid)?,
        notes: r.notes.map(notes).transpose().or_api(&rid)?,
        measurement_session_id: r.measurement_session_id,
    };
    s.carts.update_item(user.id, item_id, update).await.map(Json).or_api(&rid)
}

/// Responds with the removed item.
pub async fn remove_item(State(s): State<AppState>, Extension(rid): Extension<RequestId>, user: CurrentUser, Path(item_id): Path<Uuid>) -> Result<Json<CartItem>, ApiError> {
    s.carts.remove_item(user.id, item_id).await.map(Json).or_api(&rid)
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CartCheckoutRequest {
    pub shipping_address: ShippingAddress,
}

pub async fn checkout_cart(
    State(s): State<AppState>,
    Extension(rid): Extension<RequestId>,
    user: CurrentUser,
    ValidatedJson(r): ValidatedJson<CartCheckoutRequest>,
) -> Result<Json<CheckoutSessionRef>, ApiError> {
    s.checkout.checkout_cart(user.id, user.email.as_deref(), r.shipping_address).await.map(Json).or_api(&rid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_out_of_range_is_rejected_not_clamped() {
        let err = quantity(15).unwrap_err();
        assert!(matches!(err, MarketplaceError::Validation(ref f) if f.contains_key("quantity")));
        assert_eq!(quantity(10).unwrap().value(), 10);

        let body = UpdateItemRequest { quantity: Some(0), notes: None, measurement_session_id: None };
        let err: MarketplaceError = body.validate().unwrap_err().into();
        let MarketplaceError::Validation(fields) = err else { panic!("expected validation error") };
        assert_eq!(fields["quantity"], vec!["quantity must be between 1 and 10".to_string()]);
    }

    #[test]
    fn test_patch_distinguishes_null_from_absent() {
        let absent: UpdateItemRequest = serde_json::from_str(r#"{"quantity":2}"#).unwrap();
        assert_eq!(absent.notes, None);
        assert_eq!(absent.measurement_session_id, None);

        let cleared: UpdateItemRequest = serde_json::from_str(r#"{"notes":null,"measurementSessionId":null}"#).unwrap();
        assert_eq!(cleared.notes, Some(None));
        assert_eq!(cleared.measurement_session_id, Some(None));
    }

    #[test]
    fn test_notes_limit() {
        assert!(notes(Some("x".repeat(501))).is_err());
        assert!(notes(Some("   ".into())).unwrap().is_none());
        assert_eq!(notes(Some("Slightly longer sleeves".into())).unwrap().unwrap().as_str(), "Slightly longer sleeves");
    }
}
