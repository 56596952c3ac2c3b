//! Checkout: turns a cart (or one product) into a payment-provider session.
//!
//! `builder` is pure: gate, totals, line items, metadata. `service` loads
//! state from the database and talks to the payment provider. `metadata` is
//! the string-only contract the order webhook consumer decodes.

use serde::Serialize;
use uuid::Uuid;

pub mod builder;
pub mod metadata;
pub mod service;

pub use builder::{CheckoutBuilder, CheckoutDraft, CheckoutLine, CheckoutSource};
pub use metadata::{CheckoutMetadata, MetadataItem};
pub use service::{CheckoutService, DirectCheckout};

/// A line that blocks checkout, reported back so the client can route the
/// customer to the right measurement flow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockingItem {
    /// `None` for direct checkout, where there is no cart line.
    pub item_id: Option<Uuid>,
    pub product_id: Uuid,
    pub product_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurement_session_id: Option<Uuid>,
    /// Session status when one is referenced; `None` if it could not be found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Where the payment provider sends the customer afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutUrls {
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutUrls {
    pub fn from_base(app_base_url: &str) -> Self {
        let base = app_base_url.trim_end_matches('/');
        Self {
            success_url: format!("{base}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}"),
            cancel_url: format!("{base}/cart"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_from_base() {
        let urls = CheckoutUrls::from_base("https://atelier.test/");
        assert_eq!(urls.success_url, "https://atelier.test/checkout/success?session_id={CHECKOUT_SESSION_ID}");
        assert_eq!(urls.cancel_url, "https://atelier.test/cart");
    }
}
