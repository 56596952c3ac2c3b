use async_trait::async_trait;
use uuid::Uuid;

use super::{MeasurementProvider, MeasurementProviderError, ProviderSession};
use crate::domain::aggregates::{BodyMeasurements, SessionStatus};

/// Keeps no remote state; sessions are completed through the API.
pub struct MockMeasurementProvider {
    base_url: String,
}

impl MockMeasurementProvider {
    pub fn new(base_url: &str) -> Self { Self { base_url: base_url.trim_end_matches('/').to_string() } }
}

#[async_trait]
impl MeasurementProvider for MockMeasurementProvider {
    fn name(&self) -> &'static str { "mock" }

    async fn create_session(&self, session_id: Uuid, _user_id: Uuid, _order_id: Option<Uuid>) -> Result<ProviderSession, MeasurementProviderError> {
        Ok(ProviderSession {
            provider_ref: format!("mock_{}", session_id.simple()),
            mobile_url: format!("{}/measure/mock/{session_id}", self.base_url),
            status: SessionStatus::Created,
            measurements: None,
        })
    }

    async fn get_session(&self, _provider_ref: &str) -> Result<Option<ProviderSession>, MeasurementProviderError> { Ok(None) }

    async fn complete_session(&self, provider_ref: &str, _measurements: &BodyMeasurements) -> Result<(), MeasurementProviderError> {
        tracing::debug!(%provider_ref, "mock measurement session completed");
        Ok(())
    }
}
