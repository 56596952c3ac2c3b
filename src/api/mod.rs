//! HTTP surface.

mod auth;
mod cart;
mod catalog;
mod checkout;
mod measurements;
pub mod middleware;
mod products;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use auth::{CurrentUser, Role, ValidatedJson};
use middleware::{request_id, RequestId, REQUEST_ID_HEADER};

use crate::cart::CartService;
use crate::checkout::{CheckoutService, CheckoutUrls};
use crate::error::MarketplaceError;
use crate::measurements::MeasurementSessions;
use crate::pricing::PricingConfig;
use crate::providers::measurement::MeasurementProvider;
use crate::providers::payment::PaymentProvider;
use crate::publisher::EventPublisher;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub pricing: Arc<PricingConfig>,
    pub carts: CartService,
    pub measurements: MeasurementSessions,
    pub checkout: CheckoutService,
}

impl AppState {
    pub fn new(
        db: PgPool,
        pricing: PricingConfig,
        urls: CheckoutUrls,
        measurement: Arc<dyn MeasurementProvider>,
        payments: Arc<dyn PaymentProvider>,
        events: EventPublisher,
    ) -> Self {
        let pricing = Arc::new(pricing);
        Self {
            carts: CartService::new(db.clone(), Arc::clone(&pricing), events.clone()),
            measurements: MeasurementSessions::new(db.clone(), measurement, events.clone()),
            checkout: CheckoutService::new(db.clone(), Arc::clone(&pricing), urls, payments, events),
            pricing,
            db,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

impl ResponseMeta {
    fn new(request_id: String) -> Self { Self { request_id, timestamp: Utc::now() } }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// `{ "error": { code, message, details? }, "meta": { requestId, timestamp } }`
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

impl ApiError {
    pub fn new(request_id: &RequestId, status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self { status, error: ErrorBody { code, message: message.into(), details: None }, meta: ResponseMeta::new(request_id.0.clone()) }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }

    pub fn from_domain(request_id: &RequestId, error: MarketplaceError) -> Self {
        use MarketplaceError as E;
        let message = error.to_string();
        match error {
            E::Validation(fields) => Self::new(request_id, StatusCode::BAD_REQUEST, "validation_error", message).with_details(json!({ "fields": fields })),
            E::InvalidModel(_) => Self::new(request_id, StatusCode::BAD_REQUEST, "invalid_model", message),
            E::FabricNotFound(_) | E::ProductNotFound(_) | E::NotFound { .. } => Self::new(request_id, StatusCode::NOT_FOUND, "not_found", message),
            E::FabricInactive(_) => Self::new(request_id, StatusCode::BAD_REQUEST, "fabric_inactive", message),
            E::ProductInactive(_) => Self::new(request_id, StatusCode::NOT_FOUND, "product_inactive", message),
            E::FabricInUse { fabric_id, product_count } => Self::new(request_id, StatusCode::CONFLICT, "fabric_in_use", message)
                .with_details(json!({ "fabricId": fabric_id, "productCount": product_count })),
            E::Conflict { existing_item_id, .. } => {
                let err = Self::new(request_id, StatusCode::CONFLICT, "conflict", message);
                match existing_item_id {
                    Some(id) => err.with_details(json!({ "existingItemId": id })),
                    None => err,
                }
            }
            E::Forbidden => Self::new(request_id, StatusCode::FORBIDDEN, "forbidden", message),
            E::Unauthorized => Self::new(request_id, StatusCode::UNAUTHORIZED, "unauthorized", message),
            E::EmptyCart => Self::new(request_id, StatusCode::BAD_REQUEST, "empty_cart", message),
            E::MissingMeasurements(items) => Self::new(request_id, StatusCode::BAD_REQUEST, "missing_measurements", message)
                .with_details(json!({ "itemsWithoutMeasurements": items })),
            E::IncompleteMeasurements(items) => Self::new(request_id, StatusCode::BAD_REQUEST, "incomplete_measurements", message)
                .with_details(json!({ "itemsWithIncompleteMeasurements": items })),
            E::Money(_) => Self::new(request_id, StatusCode::BAD_REQUEST, "invalid_amount", message),
            E::CheckoutFailed(_) => Self::new(request_id, StatusCode::BAD_GATEWAY, "checkout_failed", message),
            E::MeasurementProvider(_) => Self::new(request_id, StatusCode::BAD_GATEWAY, "measurement_provider_failed", message),
            E::PricingConfig(_) => {
                tracing::error!(request_id = %request_id.0, error = %message, "pricing configuration invalid");
                Self::new(request_id, StatusCode::INTERNAL_SERVER_ERROR, "pricing_config", message)
            }
            E::Database(e) => {
                tracing::error!(request_id = %request_id.0, error = %e, "database query failed");
                Self::new(request_id, StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "database query failed")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response { (self.status, Json(self)).into_response() }
}

/// Attaches the request id to a domain error on its way out.
pub(crate) trait OrApi<T> {
    fn or_api(self, request_id: &RequestId) -> Result<T, ApiError>;
}

impl<T> OrApi<T> for Result<T, MarketplaceError> {
    fn or_api(self, request_id: &RequestId) -> Result<T, ApiError> { self.map_err(|e| ApiError::from_domain(request_id, e)) }
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(REQUEST_ID_HEADER),
            HeaderName::from_static(auth::USER_ID_HEADER),
            HeaderName::from_static(auth::USER_EMAIL_HEADER),
            HeaderName::from_static(auth::USER_ROLE_HEADER),
        ])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/models", get(catalog::list_models))
        .route("/api/v1/fabrics", get(catalog::list_fabrics).post(catalog::create_fabric))
        .route("/api/v1/fabrics/:id", patch(catalog::update_fabric).delete(catalog::delete_fabric))
        .route("/api/v1/pricing/quote", post(catalog::quote))
        .route("/api/v1/admin/pricing/self-check", get(catalog::pricing_self_check))
        .route("/api/v1/products", post(products::create_product))
        .route("/api/v1/products/:id", get(products::get_product).patch(products::update_product))
        .route("/api/v1/cart", get(cart::get_cart).post(cart::add_item).delete(cart::clear_cart))
        .route("/api/v1/cart/checkout", post(cart::checkout_cart))
        .route("/api/v1/cart/:item_id", patch(cart::update_item).delete(cart::remove_item))
        .route("/api/v1/checkout", post(checkout::checkout_direct))
        .route("/api/v1/measurements", post(measurements::create_session))
        .route("/api/v1/measurements/:id", get(measurements::get_session).put(measurements::complete_session))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(request_id))
                .layer(TraceLayer::new_for_http())
                .layer(build_cors()),
        )
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match crate::db::ping(&state.db).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "healthy", "service": "atelier-commerce", "database": "ok" }))),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "degraded", "service": "atelier-commerce", "database": "unavailable" })))
        }
    }
}
