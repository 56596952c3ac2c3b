use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CheckoutSessionRef, CheckoutSessionRequest, PaymentProvider, PaymentProviderError};

/// Mock payment provider for local development and testing.
#[derive(Default)]
pub struct MockPaymentProvider {
    base_url: String,
    created: RwLock<Vec<CheckoutSessionRequest>>,
    fail_with: RwLock<Option<String>>,
}

impl MockPaymentProvider {
    pub fn new(base_url: &str) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_string(), ..Self::default() }
    }

    /// Makes every following call fail as a provider rejection.
    pub async fn fail_with(&self, message: &str) { *self.fail_with.write().await = Some(message.to_string()); }

    pub async fn created(&self) -> Vec<CheckoutSessionRequest> { self.created.read().await.clone() }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    fn name(&self) -> &'static str { "mock" }

    async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> Result<CheckoutSessionRef, PaymentProviderError> {
        if let Some(message) = self.fail_with.read().await.clone() {
            return Err(PaymentProviderError::Rejected { status: 402, message });
        }
        self.created.write().await.push(request.clone());
        let session_id = format!("cs_mock_{}", Uuid::new_v4().simple());
        let url = format!("{}/checkout/mock/{session_id}", self.base_url);
        tracing::info!(%session_id, amount_total = request.amount_total(), "mock checkout session created");
        Ok(CheckoutSessionRef { session_id, url })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn request() -> CheckoutSessionRequest {
        CheckoutSessionRequest {
            currency: "eur".into(), line_items: vec![], metadata: BTreeMap::new(),
            success_url: "s".into(), cancel_url: "c".into(), customer_email: None,
        }
    }

    #[tokio::test]
    async fn test_records_sessions() {
        let provider = MockPaymentProvider::new("http://localhost:3000/");
        let session = provider.create_checkout_session(&request()).await.unwrap();
        assert!(session.url.starts_with("http://localhost:3000/checkout/mock/cs_mock_"));
        assert_eq!(provider.created().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failure_mode() {
        let provider = MockPaymentProvider::new("http://localhost");
        provider.fail_with("card declined").await;
        let err = provider.create_checkout_session(&request()).await.unwrap_err();
        assert!(matches!(err, PaymentProviderError::Rejected { status: 402, .. }));
        assert!(provider.created().await.is_empty());
    }
}
