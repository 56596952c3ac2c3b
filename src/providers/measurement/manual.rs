use async_trait::async_trait;
use uuid::Uuid;

use super::{MeasurementProvider, MeasurementProviderError, ProviderSession};
use crate::domain::aggregates::{BodyMeasurements, SessionStatus};

/// Customer enters measurements by hand; the session is in progress as soon
/// as the entry form exists.
pub struct ManualMeasurementProvider {
    base_url: String,
}

impl ManualMeasurementProvider {
    pub fn new(base_url: &str) -> Self { Self { base_url: base_url.trim_end_matches('/').to_string() } }
}

#[async_trait]
impl MeasurementProvider for ManualMeasurementProvider {
    fn name(&self) -> &'static str { "manual" }

    async fn create_session(&self, session_id: Uuid, _user_id: Uuid, order_id: Option<Uuid>) -> Result<ProviderSession, MeasurementProviderError> {
        let mobile_url = match order_id {
            Some(order_id) => format!("{}/measurements/{session_id}/manual?order={order_id}", self.base_url),
            None => format!("{}/measurements/{session_id}/manual", self.base_url),
        };
        Ok(ProviderSession { provider_ref: format!("manual_{}", session_id.simple()), mobile_url, status: SessionStatus::InProgress, measurements: None })
    }

    async fn get_session(&self, _provider_ref: &str) -> Result<Option<ProviderSession>, MeasurementProviderError> { Ok(None) }

    async fn complete_session(&self, _provider_ref: &str, _measurements: &BodyMeasurements) -> Result<(), MeasurementProviderError> { Ok(()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manual_session_starts_in_progress() {
        let provider = ManualMeasurementProvider::new("https://atelier.test/");
        let id = Uuid::new_v4();
        let order = Uuid::new_v4();
        let s = provider.create_session(id, Uuid::new_v4(), Some(order)).await.unwrap();
        assert_eq!(s.status, SessionStatus::InProgress);
        assert_eq!(s.mobile_url, format!("https://atelier.test/measurements/{id}/manual?order={order}"));
        assert!(provider.get_session(&s.provider_ref).await.unwrap().is_none());
    }
}
