//! Measurement sessions: persistence plus the configured provider.

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::domain::aggregates::{BodyMeasurements, MeasurementSession, SessionStatus};
use crate::domain::events::{DomainEvent, MeasurementEvent};
use crate::error::{MarketplaceError, Result};
use crate::providers::measurement::{MeasurementProvider, ProviderSession};
use crate::publisher::EventPublisher;

#[derive(Clone)]
pub struct MeasurementSessions {
    db: PgPool,
    provider: Arc<dyn MeasurementProvider>,
    events: EventPublisher,
}

/// Folds the provider's view into the local session. Returns whether
/// anything changed.
pub fn apply_remote(session: &mut MeasurementSession, remote: ProviderSession) -> Result<bool> {
    let mut changed = false;
    if session.mobile_url.as_deref() != Some(remote.mobile_url.as_str()) && !remote.mobile_url.is_empty() {
        session.mobile_url = Some(remote.mobile_url);
        changed = true;
    }
    if remote.status == session.status { return Ok(changed); }
    match remote.status {
        SessionStatus::Created => {}
        SessionStatus::InProgress => {
            if session.status == SessionStatus::Created { session.start()?; changed = true; }
        }
        SessionStatus::Completed => match remote.measurements {
            Some(measurements) => { session.complete(measurements)?; changed = true; }
            None => tracing::warn!(session_id = %session.id, "provider reports completion without measurements"),
        },
        SessionStatus::Failed => { session.fail(); changed = true; }
        SessionStatus::Expired => { session.expire(); changed = true; }
    }
    Ok(changed)
}

/// The session with the provider's view folded in, or `None` when nothing
/// changed. A payload that cannot be applied leaves the stored session as is.
fn synced(session: &MeasurementSession, remote: ProviderSession) -> Option<MeasurementSession> {
    let mut next = session.clone();
    match apply_remote(&mut next, remote) {
        Ok(true) => Some(next),
        Ok(false) => None,
        Err(e) => {
            tracing::warn!(session_id = %session.id, error = %e, "measurement provider returned an unusable session");
            None
        }
    }
}

impl MeasurementSessions {
    pub fn new(db: PgPool, provider: Arc<dyn MeasurementProvider>, events: EventPublisher) -> Self { Self { db, provider, events } }

    pub fn provider_name(&self) -> &'static str { self.provider.name() }

    pub async fn create(&self, user_id: Uuid, order_id: Option<Uuid>) -> Result<MeasurementSession> {
        let mut session = MeasurementSession::new(user_id, order_id, self.provider.name());
        let remote = self.provider.create_session(session.id, user_id, order_id).await?;
        session.provider_ref = Some(remote.provider_ref.clone());
        apply_remote(&mut session, remote)?;
        db::measurements::insert(&self.db, &session).await?;

        tracing::info!(session_id = %session.id, %user_id, provider = %session.provider, "measurement session created");
        self.events
            .publish(DomainEvent::Measurement(MeasurementEvent::SessionCreated { session_id: session.id, user_id, provider: session.provider.clone() }))
            .await;
        Ok(session)
    }

    async fn load_owned(&self, user_id: Uuid, id: Uuid) -> Result<MeasurementSession> {
        let session = db::measurements::find(&self.db, id).await?.ok_or(MarketplaceError::NotFound { entity: "measurement session" })?;
        session.ensure_owned_by(user_id)?;
        Ok(session)
    }

    /// Reads a session, pulling the provider's state while it is still open.
    /// A provider outage degrades to the stored state.
    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<MeasurementSession> {
        let session = self.load_owned(user_id, id).await?;
        if session.status == SessionStatus::Completed || session.status.is_terminal() { return Ok(session); }
        let Some(provider_ref) = session.provider_ref.clone() else { return Ok(session) };

        let remote = match self.provider.get_session(&provider_ref).await {
            Ok(Some(remote)) => remote,
            Ok(None) => return Ok(session),
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "measurement provider sync failed");
                return Ok(session);
            }
        };
        let Some(next) = synced(&session, remote) else { return Ok(session) };
        db::measurements::update(&self.db, &next).await?;
        if !session.satisfies_checkout() && next.satisfies_checkout() { self.completed(&next).await; }
        Ok(next)
    }

    /// Stores a full payload and marks the session completed.
    pub async fn complete(&self, user_id: Uuid, id: Uuid, measurements: BodyMeasurements) -> Result<MeasurementSession> {
        let mut session = self.load_owned(user_id, id).await?;
        session.complete(measurements)?;
        if let (Some(provider_ref), Some(payload)) = (&session.provider_ref, &session.measurements) {
            self.provider.complete_session(provider_ref, payload).await?;
        }
        db::measurements::update(&self.db, &session).await?;
        self.completed(&session).await;
        Ok(session)
    }

    async fn completed(&self, session: &MeasurementSession) {
        tracing::info!(session_id = %session.id, user_id = %session.user_id, "measurement session completed");
        self.events
            .publish(DomainEvent::Measurement(MeasurementEvent::SessionCompleted { session_id: session.id, user_id: session.user_id }))
            .await;
    }
}
