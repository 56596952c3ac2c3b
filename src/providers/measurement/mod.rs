//! Measurement provider capability.
//!
//! One implementation per provider, selected once at startup by
//! `MEASUREMENT_PROVIDER`:
//! - `MockMeasurementProvider`: local only, completes through the API
//! - `ManualMeasurementProvider`: customer types measurements into a form
//! - `ExternalMeasurementProvider`: remote body-scan service over HTTP

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{BodyMeasurements, SessionStatus};

pub mod external;
pub mod manual;
pub mod mock;

pub use external::ExternalMeasurementProvider;
pub use manual::ManualMeasurementProvider;
pub use mock::MockMeasurementProvider;

#[derive(Debug, Error)]
pub enum MeasurementProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("provider session {0} not found")]
    SessionNotFound(String),

    #[error("unexpected provider response: {0}")]
    InvalidResponse(String),
}

/// Provider-side view of a session.
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderSession {
    pub provider_ref: String,
    pub mobile_url: String,
    pub status: SessionStatus,
    pub measurements: Option<BodyMeasurements>,
}

#[async_trait]
pub trait MeasurementProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Opens a capture for `session_id` and returns where the customer goes to measure.
    async fn create_session(&self, session_id: Uuid, user_id: Uuid, order_id: Option<Uuid>) -> Result<ProviderSession, MeasurementProviderError>;

    /// Remote state, or `None` when the provider keeps no state of its own.
    async fn get_session(&self, provider_ref: &str) -> Result<Option<ProviderSession>, MeasurementProviderError>;

    /// Hands a completed payload to the provider.
    async fn complete_session(&self, provider_ref: &str, measurements: &BodyMeasurements) -> Result<(), MeasurementProviderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementProviderKind { Mock, Manual, External }

impl FromStr for MeasurementProviderKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "manual" => Ok(Self::Manual),
            "external" => Ok(Self::External),
            other => Err(format!("unknown measurement provider '{other}', expected 'mock', 'manual' or 'external'")),
        }
    }
}

impl fmt::Display for MeasurementProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Mock => f.write_str("mock"), Self::Manual => f.write_str("manual"), Self::External => f.write_str("external") }
    }
}

/// Everything needed to pick and build a provider.
#[derive(Clone, Debug)]
pub struct MeasurementSettings {
    pub kind: MeasurementProviderKind,
    pub app_base_url: String,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

/// Builds the single provider instance used for the life of the process.
///
/// # Errors
///
/// Fails when the external provider is selected without an API URL, or its
/// HTTP client cannot be built.
pub fn build_provider(settings: &MeasurementSettings) -> Result<Arc<dyn MeasurementProvider>, MeasurementProviderError> {
    let provider: Arc<dyn MeasurementProvider> = match settings.kind {
        MeasurementProviderKind::Mock => Arc::new(MockMeasurementProvider::new(&settings.app_base_url)),
        MeasurementProviderKind::Manual => Arc::new(ManualMeasurementProvider::new(&settings.app_base_url)),
        MeasurementProviderKind::External => {
            let api_url = settings
                .api_url
                .as_deref()
                .ok_or_else(|| MeasurementProviderError::InvalidResponse("MEASUREMENT_API_URL is not set".into()))?;
            Arc::new(ExternalMeasurementProvider::new(api_url, settings.api_key.as_deref(), settings.timeout_secs)?)
        }
    };
    tracing::info!(provider = provider.name(), "measurement provider selected");
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(kind: MeasurementProviderKind, api_url: Option<&str>) -> MeasurementSettings {
        MeasurementSettings { kind, app_base_url: "http://localhost:3000".into(), api_url: api_url.map(String::from), api_key: None, timeout_secs: 5 }
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("MANUAL".parse::<MeasurementProviderKind>(), Ok(MeasurementProviderKind::Manual));
        assert!("tape".parse::<MeasurementProviderKind>().is_err());
    }

    #[test]
    fn test_build_selects_by_kind() {
        assert_eq!(build_provider(&settings(MeasurementProviderKind::Mock, None)).unwrap().name(), "mock");
        assert_eq!(build_provider(&settings(MeasurementProviderKind::Manual, None)).unwrap().name(), "manual");
        assert_eq!(build_provider(&settings(MeasurementProviderKind::External, Some("http://scan.test"))).unwrap().name(), "external");
        assert!(build_provider(&settings(MeasurementProviderKind::External, None)).is_err());
    }
}
