use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Canonical identifier for one oracle price stream.
///
/// Feed ids arrive in mixed forms (`0xE62DF6...`, `e62df6...`) depending on
/// which endpoint produced them. Every id, whether an outbound subscribe
/// list, an inbound update key, or a map lookup, is routed through this
/// newtype so the same feed can never hide behind two spellings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FeedId(String);

impl<'de> Deserialize<'de> for FeedId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(FeedId::new(&raw))
    }
}

impl FeedId {
    /// Build a canonical id: ASCII-lowercased, leading `0x` stripped.
    pub fn new(raw: &str) -> Self {
        let lower = raw.trim().to_ascii_lowercase();
        let canonical = lower.strip_prefix("0x").unwrap_or(&lower);
        Self(canonical.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FeedId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Compact oracle price encoding: integer mantissa (as string to survive
/// JSON number limits) plus a power-of-ten exponent.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPrice {
    #[serde(default)]
    pub price: Option<serde_json::Value>,
    #[serde(default)]
    pub expo: Option<serde_json::Value>,
}

/// Decode a `(mantissa, exponent)` price into a unit price.
///
/// Returns `None` when the mantissa is absent or non-numeric, when the
/// exponent is absent or not an integer, or when the scaled result is not
/// finite. String mantissas are parsed to `f64` before scaling, which is
/// display-grade precision, not settlement-grade.
pub fn decode_price(raw: &RawPrice) -> Option<f64> {
    let mantissa = match raw.price.as_ref()? {
        serde_json::Value::String(s) => s.parse::<f64>().ok()?,
        serde_json::Value::Number(n) => n.as_f64()?,
        _ => return None,
    };

    let expo = match raw.expo.as_ref()? {
        serde_json::Value::Number(n) => n.as_i64()?,
        _ => return None,
    };

    let unit = mantissa * 10f64.powi(expo as i32);
    unit.is_finite().then_some(unit)
}

/// A decoded price observation for one feed. Ephemeral: the board keeps only
/// the most recent sample per feed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSample {
    pub feed_id: FeedId,
    pub unit_price: f64,
    /// Receive time (ms since epoch).
    pub received_at: i64,
}

impl PriceSample {
    pub fn now(feed_id: FeedId, unit_price: f64) -> Self {
        Self {
            feed_id,
            unit_price,
            received_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Inbound stream message envelope.
#[derive(Debug, Deserialize)]
pub struct StreamMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(default)]
    pub price_feed: Option<PriceFeedPayload>,
}

/// The `price_feed` object inside a `price_update` message.
#[derive(Debug, Deserialize)]
pub struct PriceFeedPayload {
    pub id: String,
    #[serde(default)]
    pub price: Option<RawPrice>,
}

/// Outbound subscribe/unsubscribe message.
#[derive(Debug, Serialize)]
pub struct SubscribeMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub ids: Vec<FeedId>,
}

impl SubscribeMessage {
    pub fn subscribe(ids: Vec<FeedId>) -> Self {
        Self {
            msg_type: "subscribe".to_string(),
            ids,
        }
    }

    pub fn unsubscribe(ids: Vec<FeedId>) -> Self {
        Self {
            msg_type: "unsubscribe".to_string(),
            ids,
        }
    }
}
