use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::aggregates::{BodyMeasurements, MeasurementSession, SessionStatus};
use crate::error::Result;

const COLUMNS: &str =
    "id, user_id, order_id, status, measurements, provider, provider_ref, mobile_url, completed_at, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    user_id: Uuid,
    order_id: Option<Uuid>,
    status: String,
    measurements: Option<Json<BodyMeasurements>>,
    provider: String,
    provider_ref: Option<String>,
    mobile_url: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SessionRow {
    fn into_domain(self) -> Result<MeasurementSession> {
        Ok(MeasurementSession {
            id: self.id,
            user_id: self.user_id,
            order_id: self.order_id,
            status: self.status.parse()?,
            measurements: self.measurements.map(|m| m.0),
            provider: self.provider,
            provider_ref: self.provider_ref,
            mobile_url: self.mobile_url,
            completed_at: self.completed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub async fn insert(pool: &PgPool, session: &MeasurementSession) -> Result<()> {
    sqlx::query(
        "INSERT INTO measurement_sessions (id, user_id, order_id, status, measurements, provider, provider_ref, mobile_url, completed_at, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(session.id)
    .bind(session.user_id)
    .bind(session.order_id)
    .bind(session.status.as_str())
    .bind(session.measurements.as_ref().map(Json))
    .bind(&session.provider)
    .bind(&session.provider_ref)
    .bind(&session.mobile_url)
    .bind(session.completed_at)
    .bind(session.created_at)
    .bind(session.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<MeasurementSession>> {
    let sql = format!("SELECT {COLUMNS} FROM measurement_sessions WHERE id = $1");
    sqlx::query_as::<_, SessionRow>(&sql).bind(id).fetch_optional(pool).await?.map(SessionRow::into_domain).transpose()
}

pub async fn update(pool: &PgPool, session: &MeasurementSession) -> Result<()> {
    sqlx::query(
        "UPDATE measurement_sessions SET status = $2, measurements = $3, mobile_url = $4, completed_at = $5, updated_at = $6 WHERE id = $1",
    )
    .bind(session.id)
    .bind(session.status.as_str())
    .bind(session.measurements.as_ref().map(Json))
    .bind(&session.mobile_url)
    .bind(session.completed_at)
    .bind(session.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Status of each listed session owned by `user_id`. Sessions owned by
/// someone else are left out, so the gate treats them as incomplete.
pub async fn statuses_for_user(pool: &PgPool, user_id: Uuid, ids: &[Uuid]) -> Result<HashMap<Uuid, SessionStatus>> {
    if ids.is_empty() { return Ok(HashMap::new()); }
    let rows = sqlx::query_as::<_, (Uuid, String)>("SELECT id, status FROM measurement_sessions WHERE user_id = $1 AND id = ANY($2)")
        .bind(user_id)
        .bind(ids)
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(|(id, status)| Ok((id, status.parse::<SessionStatus>()?))).collect()
}
