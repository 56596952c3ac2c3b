use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::middleware::RequestId;
use super::{ApiError, AppState, CurrentUser, OrApi, ValidatedJson};
use crate::checkout::DirectCheckout;
use crate::domain::aggregates::ShippingAddress;
use crate::domain::value_objects::{Notes, Quantity};
use crate::error::MarketplaceError;
use crate::providers::payment::CheckoutSessionRef;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DirectCheckoutRequest {
    pub product_id: Uuid,
    pub measurement_session_id: Option<Uuid>,
    #[validate(range(min = 1, max = 10, message = "quantity must be between 1 and 10"))]
    pub quantity: Option<u32>,
    #[validate(length(max = 500, message = "notes must be at most 500 characters"))]
    pub notes: Option<String>,
    pub shipping_address: ShippingAddress,
}

impl DirectCheckoutRequest {
    fn into_checkout(self) -> Result<DirectCheckout, MarketplaceError> {
        let quantity = match self.quantity {
            Some(q) => Quantity::new(q).map_err(|e| MarketplaceError::invalid("quantity", e.to_string()))?,
            None => Quantity::one(),
        };
        let notes = match self.notes {
            Some(text) => Notes::parse(text).map_err(|e| MarketplaceError::invalid("notes", e.to_string()))?,
            None => None,
        };
        Ok(DirectCheckout {
            product_id: self.product_id,
            measurement_session_id: self.measurement_session_id,
            quantity,
            notes,
            shipping_address: self.shipping_address,
        })
    }
}

/// Buys a single product without touching the cart.
pub async fn checkout_direct(
    State(s): State<AppState>,
    Extension(rid): Extension<RequestId>,
    user: CurrentUser,
    ValidatedJson(r): ValidatedJson<DirectCheckoutRequest>,
) -> Result<Json<CheckoutSessionRef>, ApiError> {
    let request = r.into_checkout().or_api(&rid)?;
    s.checkout.checkout_direct(user.id, user.email.as_deref(), request).await.map(Json).or_api(&rid)
}
