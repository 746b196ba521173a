//! Instrument catalogue: the set of instruments resolved up front and shared
//! across all account sessions.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Catalogue of instruments to pre-resolve before any order work.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstrumentCatalogue {
    /// Cash-market equities.
    #[serde(default)]
    pub nse_equity: Vec<EquityEntry>,
    /// Derivative series keyed by namespace (e.g. `NIFTY_DEC30`). The
    /// namespace becomes the key prefix under which contracts are published
    /// to the shared table.
    #[serde(default)]
    pub nfo_derivatives: BTreeMap<String, DerivativeSeries>,
    /// Commodity symbols resolved on MCX.
    #[serde(default)]
    pub mcx_commodities: CommoditySection,
}

impl InstrumentCatalogue {
    /// Whether the catalogue describes any instrument at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nse_equity.is_empty()
            && self.nfo_derivatives.is_empty()
            && self.mcx_commodities.symbols.is_empty()
    }
}

/// One equity to resolve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityEntry {
    /// Exchange to resolve on (normally "NSE").
    pub exchange: String,
    /// Equity ticker.
    pub symbol: String,
}

/// One expiry of one underlying, with optional futures and option strikes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivativeSeries {
    /// Underlying symbol (e.g. "NIFTY").
    pub symbol: String,
    /// Contract expiry date.
    pub expiry: NaiveDate,
    /// Whether to resolve the futures contract of this series.
    #[serde(default = "default_true")]
    pub futures: bool,
    /// Option contracts to resolve.
    #[serde(default)]
    pub options: Vec<OptionEntry>,
}

/// One option contract of a derivative series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionEntry {
    /// Call or put.
    #[serde(rename = "type")]
    pub option_type: OptionType,
    /// Strike price.
    pub strike: u32,
}

/// Option side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionType {
    /// Call option.
    CE,
    /// Put option.
    PE,
}

impl OptionType {
    /// Whether this is a call.
    #[must_use]
    pub const fn is_call(&self) -> bool {
        matches!(self, Self::CE)
    }

    /// Key fragment used in derivative cache keys.
    #[must_use]
    pub const fn key_fragment(&self) -> &'static str {
        match self {
            Self::CE => "CE",
            Self::PE => "PE",
        }
    }
}

/// Commodity symbols section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommoditySection {
    /// Candidate symbols, resolved in order with fallback.
    #[serde(default)]
    pub symbols: Vec<String>,
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_parses_from_yaml() {
        let yaml = r#"
nse_equity:
  - exchange: NSE
    symbol: RELIANCE
nfo_derivatives:
  NIFTY_DEC30:
    symbol: NIFTY
    expiry: 2026-12-30
    options:
      - type: CE
        strike: 26000
      - type: PE
        strike: 25500
mcx_commodities:
  symbols: [GOLDM, GOLD]
"#;
        let catalogue: InstrumentCatalogue = serde_yaml_bw::from_str(yaml).unwrap();
        assert_eq!(catalogue.nse_equity.len(), 1);
        let series = &catalogue.nfo_derivatives["NIFTY_DEC30"];
        assert!(series.futures);
        assert_eq!(series.options.len(), 2);
        assert!(series.options[0].option_type.is_call());
        assert_eq!(catalogue.mcx_commodities.symbols.len(), 2);
        assert!(!catalogue.is_empty());
    }

    #[test]
    fn empty_catalogue_is_empty() {
        let catalogue = InstrumentCatalogue::default();
        assert!(catalogue.is_empty());
    }
}
