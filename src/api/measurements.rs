use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::middleware::RequestId;
use super::{ApiError, AppState, CurrentUser, OrApi, ValidatedJson};
use crate::domain::aggregates::{BodyMeasurements, MeasurementSession};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub order_id: Option<Uuid>,
}

pub async fn create_session(
    State(s): State<AppState>,
    Extension(rid): Extension<RequestId>,
    user: CurrentUser,
    body: Option<Json<CreateSessionRequest>>,
) -> Result<(StatusCode, Json<MeasurementSession>), ApiError> {
    let order_id = body.and_then(|Json(b)| b.order_id);
    let session = s.measurements.create(user.id, order_id).await.or_api(&rid)?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn get_session(State(s): State<AppState>, Extension(rid): Extension<RequestId>, user: CurrentUser, Path(id): Path<Uuid>) -> Result<Json<MeasurementSession>, ApiError> {
    s.measurements.get(user.id, id).await.map(Json).or_api(&rid)
}

pub async fn complete_session(
    State(s): State<AppState>,
    Extension(rid): Extension<RequestId>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(measurements): ValidatedJson<BodyMeasurements>,
) -> Result<Json<MeasurementSession>, ApiError> {
    s.measurements.complete(user.id, id, measurements).await.map(Json).or_api(&rid)
}
