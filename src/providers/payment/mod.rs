//! Payment provider capability.
//!
//! Implementations:
//! - `StripePaymentProvider`: hosted checkout sessions over the Stripe REST API
//! - `MockPaymentProvider`: in-memory, for local development and tests

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub mod mock;
pub mod stripe;

pub use mock::MockPaymentProvider;
pub use stripe::StripePaymentProvider;

#[derive(Debug, Error)]
pub enum PaymentProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected provider response: {0}")]
    InvalidResponse(String),
}

/// One provider line item. Amounts are integer minor units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProviderLineItem {
    pub name: String,
    pub description: Option<String>,
    pub unit_amount: i64,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckoutSessionRequest {
    pub currency: String,
    pub line_items: Vec<ProviderLineItem>,
    /// String-only; the provider stores it verbatim on the session.
    pub metadata: BTreeMap<String, String>,
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: Option<String>,
}

impl CheckoutSessionRequest {
    pub fn amount_total(&self) -> i64 {
        self.line_items.iter().map(|l| l.unit_amount * i64::from(l.quantity)).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionRef {
    pub session_id: String,
    pub url: String,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Creates a hosted checkout session. Never retried here; callers resubmit.
    async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> Result<CheckoutSessionRef, PaymentProviderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentProviderKind { Stripe, Mock }

impl FromStr for PaymentProviderKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stripe" => Ok(Self::Stripe),
            "mock" => Ok(Self::Mock),
            other => Err(format!("unknown payment provider '{other}', expected 'stripe' or 'mock'")),
        }
    }
}

impl fmt::Display for PaymentProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Stripe => f.write_str("stripe"), Self::Mock => f.write_str("mock") }
    }
}

#[derive(Clone, Debug)]
pub struct PaymentSettings {
    pub kind: PaymentProviderKind,
    pub stripe_secret_key: Option<String>,
    pub stripe_api_base: String,
    pub app_base_url: String,
    pub timeout_secs: u64,
}

/// Builds the single provider instance used for the life of the process.
///
/// # Errors
///
/// Fails when Stripe is selected without a secret key, or its HTTP client
/// cannot be built.
pub fn build_provider(settings: &PaymentSettings) -> Result<Arc<dyn PaymentProvider>, PaymentProviderError> {
    let provider: Arc<dyn PaymentProvider> = match settings.kind {
        PaymentProviderKind::Stripe => {
            let key = settings
                .stripe_secret_key
                .as_deref()
                .ok_or_else(|| PaymentProviderError::InvalidResponse("STRIPE_SECRET_KEY is not set".into()))?;
            Arc::new(StripePaymentProvider::new(&settings.stripe_api_base, key, settings.timeout_secs)?)
        }
        PaymentProviderKind::Mock => {
            tracing::warn!("mock payment provider in use; no real payments will be taken");
            Arc::new(MockPaymentProvider::new(&settings.app_base_url))
        }
    };
    tracing::info!(provider = provider.name(), "payment provider selected");
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stripe_requires_secret_key() {
        let mut settings = PaymentSettings {
            kind: PaymentProviderKind::Stripe, stripe_secret_key: None, stripe_api_base: stripe::DEFAULT_API_BASE.into(),
            app_base_url: "http://localhost:3000".into(), timeout_secs: 5,
        };
        assert!(build_provider(&settings).is_err());
        settings.stripe_secret_key = Some("sk_test_123".into());
        assert_eq!(build_provider(&settings).unwrap().name(), "stripe");
        settings.kind = PaymentProviderKind::Mock;
        assert_eq!(build_provider(&settings).unwrap().name(), "mock");
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("Stripe".parse::<PaymentProviderKind>(), Ok(PaymentProviderKind::Stripe));
        assert_eq!("mock".parse::<PaymentProviderKind>(), Ok(PaymentProviderKind::Mock));
        assert!("paypal".parse::<PaymentProviderKind>().is_err());
    }

    #[test]
    fn test_amount_total() {
        let req = CheckoutSessionRequest {
            currency: "eur".into(),
            line_items: vec![
                ProviderLineItem { name: "Suit".into(), description: None, unit_amount: 86_000, quantity: 2 },
                ProviderLineItem { name: "Platform fee".into(), description: None, unit_amount: 17_200, quantity: 1 },
            ],
            metadata: BTreeMap::new(),
            success_url: "https://example.com/ok".into(),
            cancel_url: "https://example.com/cancel".into(),
            customer_email: None,
        };
        assert_eq!(req.amount_total(), 189_200);
    }
}
