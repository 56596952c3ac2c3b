//! Reconciliation metadata carried on the payment-provider session.
//!
//! The provider only stores string values, at most [`MAX_VALUE_CHARS`] each
//! and [`MAX_KEYS`] keys in total. Scalars get their own key; the per-line
//! payload is JSON, split into `items_0..items_{n-1}` when it is too long for
//! one value.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::builder::{CheckoutDraft, CheckoutSource};
use crate::domain::aggregates::{Order, OrderItem, ShippingAddress};
use crate::domain::value_objects::{Money, Quantity};
use crate::error::{MarketplaceError, Result};

pub const MAX_VALUE_CHARS: usize = 500;
pub const MAX_KEYS: usize = 50;

/// One purchased line as the webhook consumer sees it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataItem {
    pub product_id: Uuid,
    pub tailor_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement_session_id: Option<Uuid>,
    pub price: Decimal,
    pub quantity: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutMetadata {
    pub user_id: Uuid,
    pub source: CheckoutSource,
    pub currency: String,
    pub subtotal: Decimal,
    pub platform_fee: Decimal,
    pub total: Decimal,
    pub shipping_address: ShippingAddress,
    pub items: Vec<MetadataItem>,
}

fn amount(value: Decimal) -> String { format!("{:.2}", value) }

fn chunk(value: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = value.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}

fn bad(key: &str, message: impl Into<String>) -> MarketplaceError { MarketplaceError::invalid(&format!("metadata.{key}"), message) }

fn required<'m>(map: &'m BTreeMap<String, String>, key: &str) -> Result<&'m str> {
    map.get(key).map(String::as_str).ok_or_else(|| bad(key, "is missing"))
}

fn parse<T: std::str::FromStr>(map: &BTreeMap<String, String>, key: &str) -> Result<T> {
    required(map, key)?.parse::<T>().map_err(|_| bad(key, "is malformed"))
}

impl CheckoutMetadata {
    pub fn from_draft(draft: &CheckoutDraft) -> Self {
        Self {
            user_id: draft.user_id,
            source: draft.source,
            currency: draft.totals.total.currency().to_string(),
            subtotal: draft.totals.subtotal.amount(),
            platform_fee: draft.totals.platform_fee.amount(),
            total: draft.totals.total.amount(),
            shipping_address: draft.shipping_address.clone(),
            items: draft
                .lines
                .iter()
                .map(|l| MetadataItem {
                    product_id: l.product_id,
                    tailor_id: l.tailor_id,
                    measurement_session_id: l.measurement_session_id,
                    price: l.unit_price.amount(),
                    quantity: l.quantity.value(),
                    title: l.title.clone(),
                    notes: l.notes.clone(),
                })
                .collect(),
        }
    }

    /// Flattens into provider metadata.
    ///
    /// # Errors
    ///
    /// A validation error when the payload cannot fit the provider's limits;
    /// this is raised before any provider call is made.
    pub fn encode(&self) -> Result<BTreeMap<String, String>> {
        let mut map = BTreeMap::new();
        map.insert("user_id".to_string(), self.user_id.to_string());
        map.insert("checkout_type".to_string(), self.source.as_str().to_string());
        if let Some(cart_id) = self.source.cart_id() {
            map.insert("cart_id".to_string(), cart_id.to_string());
        }
        map.insert("currency".to_string(), self.currency.clone());
        map.insert("subtotal".to_string(), amount(self.subtotal));
        map.insert("platform_fee".to_string(), amount(self.platform_fee));
        map.insert("total".to_string(), amount(self.total));
        map.insert("item_count".to_string(), self.items.len().to_string());

        let address = serde_json::to_string(&self.shipping_address).map_err(|e| bad("shipping_address", e.to_string()))?;
        if address.chars().count() > MAX_VALUE_CHARS {
            return Err(MarketplaceError::invalid("shippingAddress", "shipping address is too long"));
        }
        map.insert("shipping_address".to_string(), address);

        let items = serde_json::to_string(&self.items).map_err(|e| bad("items", e.to_string()))?;
        let chunks = chunk(&items, MAX_VALUE_CHARS);
        if map.len() + 1 + chunks.len() > MAX_KEYS {
            return Err(MarketplaceError::invalid("items", format!("too many items to check out at once ({})", self.items.len())));
        }
        map.insert("items_chunks".to_string(), chunks.len().to_string());
        for (i, part) in chunks.into_iter().enumerate() {
            map.insert(format!("items_{i}"), part);
        }
        Ok(map)
    }

    /// Rebuilds the checkout from provider metadata and checks that
    /// `subtotal == sum(items)` and `subtotal + platform_fee == total`.
    pub fn decode(map: &BTreeMap<String, String>) -> Result<Self> {
        let user_id: Uuid = parse(map, "user_id")?;
        let source = match required(map, "checkout_type")? {
            "cart" => CheckoutSource::Cart { cart_id: parse(map, "cart_id")? },
            "direct" => CheckoutSource::Direct,
            other => return Err(bad("checkout_type", format!("unknown checkout type '{other}'"))),
        };
        let currency = required(map, "currency")?.to_string();
        let subtotal: Decimal = parse(map, "subtotal")?;
        let platform_fee: Decimal = parse(map, "platform_fee")?;
        let total: Decimal = parse(map, "total")?;
        let shipping_address: ShippingAddress =
            serde_json::from_str(required(map, "shipping_address")?).map_err(|e| bad("shipping_address", e.to_string()))?;

        let chunk_count: usize = parse(map, "items_chunks")?;
        let mut items_json = String::new();
        for i in 0..chunk_count {
            items_json.push_str(required(map, &format!("items_{i}"))?);
        }
        let items: Vec<MetadataItem> = serde_json::from_str(&items_json).map_err(|e| bad("items", e.to_string()))?;

        let item_count: usize = parse(map, "item_count")?;
        if item_count != items.len() {
            return Err(bad("item_count", format!("says {item_count} but {} items were encoded", items.len())));
        }
        let items_sum: Decimal = items.iter().map(|i| i.price * Decimal::from(i.quantity)).sum();
        if items_sum != subtotal {
            return Err(bad("subtotal", format!("{subtotal} does not match items total {items_sum}")));
        }
        if subtotal + platform_fee != total {
            return Err(bad("total", format!("{subtotal} + {platform_fee} != {total}")));
        }

        Ok(Self { user_id, source, currency, subtotal, platform_fee, total, shipping_address, items })
    }

    /// The pending order the webhook consumer should persist.
    pub fn to_order(&self, checkout_session_id: &str) -> Result<Order> {
        let items = self
            .items
            .iter()
            .map(|i| -> Result<OrderItem> {
                Ok(OrderItem {
                    product_id: i.product_id,
                    tailor_id: i.tailor_id,
                    measurement_session_id: i.measurement_session_id,
                    title: i.title.clone(),
                    notes: i.notes.clone(),
                    unit_price: Money::new(i.price, &self.currency),
                    quantity: Quantity::new(i.quantity).map_err(|e| bad("items", e.to_string()))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Order::create(
            self.user_id,
            checkout_session_id,
            items,
            Money::new(self.platform_fee, &self.currency),
            Money::new(self.total, &self.currency),
            self.shipping_address.clone(),
        )
    }
}
