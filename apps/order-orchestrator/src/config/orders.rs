//! Order and basket specifications as loaded from configuration.
//!
//! Enum values are mapped to the broker's wire codes explicitly; a string the
//! broker would not recognize fails at config-parse time rather than being
//! silently defaulted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transaction direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionSide {
    /// Buy to open or cover.
    Buy,
    /// Sell to open or close.
    Sell,
}

impl TransactionSide {
    /// Wire code expected by the broker API.
    #[must_use]
    pub const fn broker_code(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for TransactionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.broker_code())
    }
}

/// Order category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderKind {
    /// Execute at best available price.
    Market,
    /// Execute at the given price or better.
    Limit,
    /// Stop-loss limit order.
    StopLossLimit,
    /// Stop-loss market order.
    StopLossMarket,
}

impl OrderKind {
    /// Wire code expected by the broker API.
    #[must_use]
    pub const fn broker_code(&self) -> &'static str {
        match self {
            Self::Market => "MKT",
            Self::Limit => "L",
            Self::StopLossLimit => "SL",
            Self::StopLossMarket => "SL-M",
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.broker_code())
    }
}

/// Product category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductKind {
    /// Intraday position, auto-squared-off.
    Intraday,
    /// Delivery / carry-forward position.
    Delivery,
    /// Cover order.
    Cover,
    /// Bracket order.
    Bracket,
}

impl ProductKind {
    /// Wire code expected by the broker API.
    #[must_use]
    pub const fn broker_code(&self) -> &'static str {
        match self {
            Self::Intraday => "MIS",
            Self::Delivery => "CNC",
            Self::Cover => "CO",
            Self::Bracket => "BO",
        }
    }
}

impl fmt::Display for ProductKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.broker_code())
    }
}

/// One order as configured. Read-only once loaded; many orders may reference
/// the same instrument key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSpec {
    /// Name used in logs and result messages.
    pub name: String,
    /// Symbolic instrument key (equity symbol or derivative key).
    pub instrument: String,
    /// Buy or sell.
    pub transaction_type: TransactionSide,
    /// Quantity in units (shares/lots per the broker's convention).
    pub quantity: u32,
    /// Market/limit/stop category.
    pub order_type: OrderKind,
    /// Intraday/delivery category.
    pub product_type: ProductKind,
    /// Limit price. Only sent to the broker when positive.
    #[serde(default)]
    pub price: Option<Decimal>,
    /// Trigger price for stop orders.
    #[serde(default)]
    pub trigger_price: Option<Decimal>,
    /// Stop-loss offset for bracket/cover orders.
    #[serde(default)]
    pub stop_loss: Option<Decimal>,
    /// Square-off target for bracket orders.
    #[serde(default)]
    pub square_off: Option<Decimal>,
    /// Trailing stop-loss tick value.
    #[serde(default)]
    pub trailing_stop: Option<Decimal>,
    /// After-market order flag.
    #[serde(default)]
    pub after_market: bool,
    /// Free-form tag echoed back by the broker; prefixed with the account
    /// name at execution time.
    #[serde(default)]
    pub tag: String,
    /// Disabled orders are skipped with a logged reason.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// A named group of order legs submitted as one atomic broker request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasketSpec {
    /// Basket name used in logs and results.
    pub name: String,
    /// Disabled baskets are skipped entirely, never partially executed.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// The legs. An empty basket is skipped.
    #[serde(default)]
    pub orders: Vec<OrderSpec>,
}

const fn default_enabled() -> bool {
    true
}
