use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{MeasurementProvider, MeasurementProviderError, ProviderSession};
use crate::domain::aggregates::{BodyMeasurements, SessionStatus};

/// Remote body-scan service.
///
/// Endpoints:
/// - `POST {api}/sessions` opens a scan
/// - `GET {api}/sessions/{id}` reads status and any captured measurements
/// - `POST {api}/sessions/{id}/measurements` submits a completed payload
pub struct ExternalMeasurementProvider {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionBody {
    reference: Uuid,
    user_id: Uuid,
    order_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct RemoteSession {
    id: String,
    url: Option<String>,
    status: String,
    #[serde(default)]
    measurements: Option<BodyMeasurements>,
}

#[derive(Debug, Deserialize)]
struct RemoteError {
    message: Option<String>,
}

/// Maps the scan service's status vocabulary onto session states.
fn map_status(raw: &str) -> Result<SessionStatus, MeasurementProviderError> {
    match raw {
        "created" | "pending" => Ok(SessionStatus::Created),
        "in_progress" | "scanning" | "processing" => Ok(SessionStatus::InProgress),
        "completed" | "done" => Ok(SessionStatus::Completed),
        "failed" | "error" => Ok(SessionStatus::Failed),
        "expired" => Ok(SessionStatus::Expired),
        other => Err(MeasurementProviderError::InvalidResponse(format!("unknown session status '{other}'"))),
    }
}

impl ExternalMeasurementProvider {
    /// # Errors
    ///
    /// Returns [`MeasurementProviderError::Http`] if the HTTP client cannot be built.
    pub fn new(api_url: &str, api_key: Option<&str>, timeout_secs: u64) -> Result<Self, MeasurementProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, api_url: api_url.trim_end_matches('/').to_string(), api_key: api_key.map(String::from) })
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn rejected(response: Response) -> MeasurementProviderError {
        let status = response.status().as_u16();
        let message = response
            .json::<RemoteError>()
            .await
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_else(|| format!("HTTP {status}"));
        tracing::warn!(status, %message, "measurement provider rejected request");
        MeasurementProviderError::Rejected { status, message }
    }

    fn into_session(remote: RemoteSession) -> Result<ProviderSession, MeasurementProviderError> {
        let status = map_status(&remote.status)?;
        let mobile_url = remote.url.ok_or_else(|| MeasurementProviderError::InvalidResponse(format!("session {} has no url", remote.id)))?;
        Ok(ProviderSession { provider_ref: remote.id, mobile_url, status, measurements: remote.measurements })
    }
}

#[async_trait]
impl MeasurementProvider for ExternalMeasurementProvider {
    fn name(&self) -> &'static str { "external" }

    async fn create_session(&self, session_id: Uuid, user_id: Uuid, order_id: Option<Uuid>) -> Result<ProviderSession, MeasurementProviderError> {
        let url = format!("{}/sessions", self.api_url);
        let body = CreateSessionBody { reference: session_id, user_id, order_id };
        let response = self.authed(self.client.post(&url)).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }
        let remote = response.json::<RemoteSession>().await.map_err(|e| MeasurementProviderError::InvalidResponse(e.to_string()))?;
        Self::into_session(remote)
    }

    async fn get_session(&self, provider_ref: &str) -> Result<Option<ProviderSession>, MeasurementProviderError> {
        let url = format!("{}/sessions/{provider_ref}", self.api_url);
        let response = self.authed(self.client.get(&url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(MeasurementProviderError::SessionNotFound(provider_ref.to_string()));
        }
        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }
        let remote = response.json::<RemoteSession>().await.map_err(|e| MeasurementProviderError::InvalidResponse(e.to_string()))?;
        Self::into_session(remote).map(Some)
    }

    async fn complete_session(&self, provider_ref: &str, measurements: &BodyMeasurements) -> Result<(), MeasurementProviderError> {
        let url = format!("{}/sessions/{provider_ref}/measurements", self.api_url);
        let response = self.authed(self.client.post(&url)).json(measurements).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(MeasurementProviderError::SessionNotFound(provider_ref.to_string()));
        }
        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }
        Ok(())
    }
}
