//! Wire types for the brokerage REST API.
//!
//! The broker is loose about response shapes: instrument lookups may come
//! back as a fully-shaped record or as a bare field mapping, and order
//! placement may answer with a single object, a list of per-leg objects, or
//! something else entirely. Everything is decoded into a tagged variant at
//! this boundary so no shape-sniffing leaks into business logic.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Instrument;

/// Status field name in broker replies.
pub const STATUS_FIELD: &str = "stat";
/// Status value signalling acceptance.
pub const STATUS_OK: &str = "Ok";
/// Order number field name in broker replies.
pub const ORDER_NUMBER_FIELD: &str = "NOrdNo";

/// Instrument lookup payload, either a typed record or a loose field map.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InstrumentPayload {
    /// Fully-shaped instrument record.
    Record(InstrumentRecord),
    /// Loose mapping; missing fields are filled from the request context.
    Fields(HashMap<String, serde_json::Value>),
}

impl InstrumentPayload {
    /// Normalize into the canonical [`Instrument`] shape.
    ///
    /// `exchange` and `symbol` from the originating request fill any fields
    /// the broker omitted.
    #[must_use]
    pub fn into_instrument(self, exchange: &str, symbol: &str) -> Instrument {
        match self {
            Self::Record(record) => Instrument {
                exchange: record.exchange,
                token: record.token,
                symbol: record.symbol,
                name: record.name,
                expiry: record.expiry,
                lot_size: record.lot_size,
            },
            Self::Fields(fields) => Instrument {
                exchange: string_field(&fields, "exchange").unwrap_or_else(|| exchange.to_string()),
                token: string_field(&fields, "token").unwrap_or_default(),
                symbol: string_field(&fields, "symbol").unwrap_or_else(|| symbol.to_string()),
                name: string_field(&fields, "name").unwrap_or_default(),
                expiry: string_field(&fields, "expiry").unwrap_or_default(),
                lot_size: fields
                    .get("lot_size")
                    .and_then(serde_json::Value::as_u64)
                    .map_or(1, |v| u32::try_from(v).unwrap_or(1)),
            },
        }
    }
}

fn string_field(fields: &HashMap<String, serde_json::Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(|v| match v {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Typed instrument record as returned by the contract lookup endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentRecord {
    /// Exchange identifier.
    pub exchange: String,
    /// Broker token.
    pub token: String,
    /// Trading symbol.
    pub symbol: String,
    /// Descriptive name.
    #[serde(default)]
    pub name: String,
    /// Expiry date string, empty for equities.
    #[serde(default)]
    pub expiry: String,
    /// Contract lot size.
    #[serde(default = "default_lot_size")]
    pub lot_size: u32,
}

const fn default_lot_size() -> u32 {
    1
}

/// Canonical three-way classification of an order-placement reply.
///
/// Decode order matters: a JSON array binds to `Batch`, an object to
/// `Entry`, anything else to `Other`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum BrokerReply {
    /// List-shaped reply, one element per accepted leg (the broker's
    /// asynchronous-ack pattern).
    Batch(Vec<serde_json::Value>),
    /// Single object-shaped reply.
    Entry(serde_json::Map<String, serde_json::Value>),
    /// Anything else; always treated as a failure.
    Other(serde_json::Value),
}

impl BrokerReply {
    /// The reply as a plain JSON value, retained in results for diagnostics.
    #[must_use]
    pub fn to_raw(&self) -> serde_json::Value {
        match self {
            Self::Batch(items) => serde_json::Value::Array(items.clone()),
            Self::Entry(map) => serde_json::Value::Object(map.clone()),
            Self::Other(value) => value.clone(),
        }
    }
}

/// Whether an object-shaped reply carries the accepted status.
#[must_use]
pub fn entry_is_ok(entry: &serde_json::Map<String, serde_json::Value>) -> bool {
    entry
        .get(STATUS_FIELD)
        .and_then(serde_json::Value::as_str)
        .is_some_and(|status| status == STATUS_OK)
}

/// Extract the broker order number from an object-shaped reply.
#[must_use]
pub fn entry_order_number(entry: &serde_json::Map<String, serde_json::Value>) -> Option<String> {
    entry.get(ORDER_NUMBER_FIELD).and_then(|v| match v {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// One order as sent to the broker. Optional fields are omitted from the
/// JSON body entirely; the broker rejects some field combinations when they
/// are present but null.
#[derive(Debug, Clone, Serialize)]
pub struct OrderPayload {
    /// Exchange of the resolved instrument.
    pub exchange: String,
    /// Broker token of the resolved instrument.
    pub token: String,
    /// Trading symbol of the resolved instrument.
    pub symbol: String,
    /// Wire code for the transaction direction.
    pub transaction_type: String,
    /// Quantity.
    pub quantity: u32,
    /// Wire code for the order category.
    pub order_type: String,
    /// Wire code for the product category.
    pub product_type: String,
    /// Limit price, present only when positive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    /// Trigger price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_price: Option<Decimal>,
    /// Stop-loss offset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<Decimal>,
    /// Square-off target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub square_off: Option<Decimal>,
    /// Trailing stop-loss value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailing_sl: Option<Decimal>,
    /// After-market order flag, present only when set.
    #[serde(skip_serializing_if = "is_false")]
    pub is_amo: bool,
    /// Correlation tag, present only when non-empty.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub order_tag: String,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // signature dictated by serde
const fn is_false(value: &bool) -> bool {
    !*value
}

/// Error body the broker returns on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Status string, typically "Not_Ok".
    #[serde(default)]
    pub stat: Option<String>,
    /// Error message.
    #[serde(default)]
    pub emsg: Option<String>,
}

/// Login reply carrying the session token.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionReply {
    /// Status string.
    #[serde(default)]
    pub stat: Option<String>,
    /// Session token used to authorize subsequent calls.
    #[serde(rename = "sessionID", default)]
    pub session_id: Option<String>,
    /// Error message on refusal.
    #[serde(default)]
    pub emsg: Option<String>,
}
