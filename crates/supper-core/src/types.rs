//! # Domain Types
//!
//! The order aggregate and its snapshot companions.
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business fields (dinner code, coupon code, etc.) - human-readable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lifecycle::OrderStatus;
use crate::money::Money;

// =============================================================================
// Order Source
// =============================================================================

/// The channel an order arrived through. Also the channel coupons are
/// matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSource {
    #[serde(rename = "GUI")]
    Gui,
    #[serde(rename = "VOICE")]
    Voice,
}

impl OrderSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSource::Gui => "GUI",
            OrderSource::Voice => "VOICE",
        }
    }

    /// Parses the storage representation, defaulting to GUI.
    pub fn parse(s: &str) -> OrderSource {
        match s {
            "VOICE" => OrderSource::Voice,
            _ => OrderSource::Gui,
        }
    }
}

impl Default for OrderSource {
    fn default() -> Self {
        OrderSource::Gui
    }
}

// =============================================================================
// Opaque Snapshots
// =============================================================================

/// Where and to whom the order is delivered. Opaque to the core: captured
/// at creation, never interpreted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliverySnapshot {
    pub receiver_name: Option<String>,
    pub receiver_phone: Option<String>,
    pub delivery_address: Option<String>,
    pub geo_lat: Option<f64>,
    pub geo_lng: Option<f64>,
    pub place_label: Option<String>,
    pub address_meta: Option<serde_json::Value>,
}

/// Payment reference captured at creation. Opaque to the core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentSnapshot {
    pub payment_token: Option<String>,
    pub card_last4: Option<String>,
}

// =============================================================================
// Order
// =============================================================================

/// The order aggregate header. Monetary fields hold what was committed at
/// creation; `status` is only ever written by lifecycle transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    pub ordered_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub order_source: OrderSource,
    #[serde(flatten)]
    pub delivery: DeliverySnapshot,
    #[serde(flatten)]
    pub payment: PaymentSnapshot,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub note: Option<String>,
}

impl Order {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_source_roundtrip() {
        assert_eq!(OrderSource::parse("GUI"), OrderSource::Gui);
        assert_eq!(OrderSource::parse("VOICE"), OrderSource::Voice);
        assert_eq!(OrderSource::parse("anything"), OrderSource::Gui);
        assert_eq!(OrderSource::Voice.as_str(), "VOICE");
    }
}
