//! Tradable instrument record and key normalization.
//!
//! Instruments are produced once by resolution and treated as read-only
//! afterwards; they are shared across account sessions as `Arc<Instrument>`
//! without copying.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A resolved tradable contract (equity, future, or option).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    /// Exchange identifier (e.g. "NSE", "NFO", "MCX").
    pub exchange: String,
    /// Broker-specific token. Empty means unresolved.
    pub token: String,
    /// Display symbol.
    pub symbol: String,
    /// Descriptive name.
    #[serde(default)]
    pub name: String,
    /// Expiry date string. Empty for equities.
    #[serde(default)]
    pub expiry: String,
    /// Contract lot size.
    #[serde(default = "default_lot_size")]
    pub lot_size: u32,
}

const fn default_lot_size() -> u32 {
    1
}

impl Instrument {
    /// Whether this instrument carries a usable broker token.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !self.token.is_empty()
    }
}

/// Normalize a raw instrument key from configuration.
#[must_use]
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Whether a normalized key names a derivative (futures/options) contract.
///
/// Plain equity symbols never contain a separator; derivative keys always do
/// (`SYMBOL_EXPIRYCODE_FUT`, `SYMBOL_EXPIRYCODE_{CE|PE}_STRIKE`).
#[must_use]
pub fn is_derivative_key(key: &str) -> bool {
    key.contains('_')
}

/// Short expiry code used in derivative keys, e.g. 2026-12-30 -> "DEC30".
#[must_use]
pub fn expiry_code(expiry: NaiveDate) -> String {
    expiry.format("%b%d").to_string().to_uppercase()
}

/// Cache key for a futures contract: `SYMBOL_EXPIRYCODE_FUT`.
#[must_use]
pub fn future_key(symbol: &str, expiry: NaiveDate) -> String {
    format!("{}_{}_FUT", symbol.to_uppercase(), expiry_code(expiry))
}

/// Cache key for an option contract: `SYMBOL_EXPIRYCODE_{CE|PE}_STRIKE`.
#[must_use]
pub fn option_key(symbol: &str, expiry: NaiveDate, is_call: bool, strike: u32) -> String {
    let side = if is_call { "CE" } else { "PE" };
    format!(
        "{}_{}_{}_{}",
        symbol.to_uppercase(),
        expiry_code(expiry),
        side,
        strike
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn normalize_trims_and_uppercases() {
        assert_eq!(normalize_key("  reliance "), "RELIANCE");
        assert_eq!(normalize_key("Nifty_Dec30_Fut"), "NIFTY_DEC30_FUT");
    }

    #[test]
    fn derivative_keys_contain_separator() {
        assert!(is_derivative_key("NIFTY_DEC30_CE_26000"));
        assert!(!is_derivative_key("RELIANCE"));
    }

    #[test]
    fn expiry_code_format() {
        assert_eq!(expiry_code(date(2026, 12, 30)), "DEC30");
        assert_eq!(expiry_code(date(2026, 1, 2)), "JAN02");
    }

    #[test]
    fn future_key_format() {
        assert_eq!(future_key("nifty", date(2026, 12, 30)), "NIFTY_DEC30_FUT");
    }

    #[test]
    fn option_key_format() {
        assert_eq!(
            option_key("NIFTY", date(2026, 12, 30), true, 26000),
            "NIFTY_DEC30_CE_26000"
        );
        assert_eq!(
            option_key("NIFTY", date(2026, 12, 30), false, 25500),
            "NIFTY_DEC30_PE_25500"
        );
    }

    #[test]
    fn resolved_requires_token() {
        let mut instrument = Instrument {
            exchange: "NSE".to_string(),
            token: String::new(),
            symbol: "RELIANCE".to_string(),
            name: String::new(),
            expiry: String::new(),
            lot_size: 1,
        };
        assert!(!instrument.is_resolved());
        instrument.token = "2885".to_string();
        assert!(instrument.is_resolved());
    }
}
