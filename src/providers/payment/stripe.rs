use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{CheckoutSessionRef, CheckoutSessionRequest, PaymentProvider, PaymentProviderError};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Stripe Checkout over the form-encoded REST API.
pub struct StripePaymentProvider {
    client: Client,
    api_base: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

impl StripePaymentProvider {
    /// # Errors
    ///
    /// Returns [`PaymentProviderError::Http`] if the HTTP client cannot be built.
    pub fn new(api_base: &str, secret_key: &str, timeout_secs: u64) -> Result<Self, PaymentProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, api_base: api_base.trim_end_matches('/').to_string(), secret_key: secret_key.to_string() })
    }
}

/// Flattens the request into Stripe's bracketed form keys.
pub(crate) fn form_params(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut params = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];
    if let Some(email) = &request.customer_email {
        params.push(("customer_email".into(), email.clone()));
    }
    for (i, item) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        params.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
        params.push((format!("{prefix}[price_data][currency]"), request.currency.clone()));
        params.push((format!("{prefix}[price_data][unit_amount]"), item.unit_amount.to_string()));
        params.push((format!("{prefix}[price_data][product_data][name]"), item.name.clone()));
        if let Some(description) = item.description.as_ref().filter(|d| !d.is_empty()) {
            params.push((format!("{prefix}[price_data][product_data][description]"), description.clone()));
        }
    }
    for (key, value) in &request.metadata {
        params.push((format!("metadata[{key}]"), value.clone()));
    }
    params
}

#[async_trait]
impl PaymentProvider for StripePaymentProvider {
    fn name(&self) -> &'static str { "stripe" }

    async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> Result<CheckoutSessionRef, PaymentProviderError> {
        let url = format!("{}/v1/checkout/sessions", self.api_base);
        let response = self.client.post(&url).bearer_auth(&self.secret_key).form(&form_params(request)).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or_else(|| format!("HTTP {status}"));
            tracing::warn!(status = status.as_u16(), %message, "stripe rejected checkout session");
            return Err(PaymentProviderError::Rejected { status: status.as_u16(), message });
        }

        let session = serde_json::from_str::<SessionResponse>(&body).map_err(|e| PaymentProviderError::InvalidResponse(e.to_string()))?;
        let url = session.url.ok_or_else(|| PaymentProviderError::InvalidResponse(format!("session {} has no url", session.id)))?;
        Ok(CheckoutSessionRef { session_id: session.id, url })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::providers::payment::ProviderLineItem;

    #[test]
    fn test_form_params_layout() {
        let request = CheckoutSessionRequest {
            currency: "eur".into(),
            line_items: vec![ProviderLineItem { name: "Navy Classic".into(), description: Some(String::new()), unit_amount: 86_000, quantity: 2 }],
            metadata: BTreeMap::from([("user_id".to_string(), "u1".to_string())]),
            success_url: "https://shop.test/ok".into(),
            cancel_url: "https://shop.test/cancel".into(),
            customer_email: Some("a@b.test".into()),
        };
        let params = form_params(&request);
        let get = |k: &str| params.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());
        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("86000"));
        assert_eq!(get("line_items[0][quantity]"), Some("2"));
        assert_eq!(get("line_items[0][price_data][product_data][description]"), None);
        assert_eq!(get("metadata[user_id]"), Some("u1"));
        assert_eq!(get("customer_email"), Some("a@b.test"));
    }
}
