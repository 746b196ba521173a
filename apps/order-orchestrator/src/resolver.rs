//! Instrument resolution and the shared instrument table.
//!
//! Resolution happens once, up front, against a single authenticated client;
//! every account session then reads the same table. Failed lookups are
//! recorded as negative entries so a symbol that does not exist is asked of
//! the broker at most once per run.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::broker::{BrokerClient, FnoQuery};
use crate::config::InstrumentCatalogue;
use crate::models::{
    future_key, is_derivative_key, normalize_key, option_key, Instrument,
};

/// One slot in the instrument table.
#[derive(Debug, Clone)]
pub enum CacheEntry {
    /// Lookup succeeded; the instrument is shared without copying.
    Resolved(Arc<Instrument>),
    /// Lookup was attempted and failed. Kept so the failure is not retried.
    Unresolved,
}

/// Concurrent instrument table shared across account sessions.
///
/// Writes happen during the resolution phase; afterwards the table is
/// effectively read-only, so a std `RwLock` is sufficient.
#[derive(Debug, Clone, Default)]
pub struct InstrumentTable {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

#[allow(clippy::unwrap_used)] // lock poisoning would mean a panicked writer; propagating it is correct
impl InstrumentTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an entry by normalized key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries.read().unwrap().get(key).cloned()
    }

    /// Look up a resolved instrument by normalized key.
    #[must_use]
    pub fn get_resolved(&self, key: &str) -> Option<Arc<Instrument>> {
        match self.get(key) {
            Some(CacheEntry::Resolved(instrument)) => Some(instrument),
            _ => None,
        }
    }

    /// Publish a resolved instrument under the given key.
    pub fn insert_resolved(&self, key: impl Into<String>, instrument: Arc<Instrument>) {
        self.entries
            .write()
            .unwrap()
            .insert(key.into(), CacheEntry::Resolved(instrument));
    }

    /// Record that resolution of the given key was attempted and failed.
    pub fn mark_unresolved(&self, key: impl Into<String>) {
        self.entries
            .write()
            .unwrap()
            .insert(key.into(), CacheEntry::Unresolved);
    }

    /// Number of entries, negative markers included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Whether the table holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }

    /// Number of successfully resolved entries.
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.entries
            .read()
            .unwrap()
            .values()
            .filter(|e| matches!(e, CacheEntry::Resolved(_)))
            .count()
    }
}

/// Resolves symbolic instrument keys to broker instruments and publishes
/// them to the shared table.
pub struct InstrumentResolver {
    client: Arc<dyn BrokerClient>,
    table: InstrumentTable,
}

impl InstrumentResolver {
    /// Build a resolver over an authenticated client and a shared table.
    #[must_use]
    pub fn new(client: Arc<dyn BrokerClient>, table: InstrumentTable) -> Self {
        Self { client, table }
    }

    /// The table this resolver publishes into.
    #[must_use]
    pub fn table(&self) -> &InstrumentTable {
        &self.table
    }

    /// Resolve an equity by exchange and symbol, caching the outcome either
    /// way.
    pub async fn resolve_equity(&self, exchange: &str, symbol: &str) -> Option<Arc<Instrument>> {
        let key = normalize_key(symbol);
        if let Some(entry) = self.table.get(&key) {
            return match entry {
                CacheEntry::Resolved(instrument) => Some(instrument),
                CacheEntry::Unresolved => None,
            };
        }

        match self.client.get_instrument_by_symbol(exchange, &key).await {
            Ok(payload) => {
                let instrument = payload.into_instrument(exchange, &key);
                if instrument.is_resolved() {
                    let instrument = Arc::new(instrument);
                    self.table.insert_resolved(key, Arc::clone(&instrument));
                    Some(instrument)
                } else {
                    warn!(exchange, symbol = %key, "lookup returned no token");
                    self.table.mark_unresolved(key);
                    None
                }
            }
            Err(error) => {
                warn!(exchange, symbol = %key, %error, "equity resolution failed");
                self.table.mark_unresolved(key);
                None
            }
        }
    }

    /// Resolve a futures contract, caching under `SYMBOL_EXPIRYCODE_FUT`.
    pub async fn resolve_future(
        &self,
        symbol: &str,
        expiry: NaiveDate,
    ) -> Option<Arc<Instrument>> {
        let key = future_key(symbol, expiry);
        self.resolve_fno_keyed(key, symbol, expiry, 0, false, true)
            .await
    }

    /// Resolve an option contract, caching under
    /// `SYMBOL_EXPIRYCODE_{CE|PE}_STRIKE`.
    pub async fn resolve_option(
        &self,
        symbol: &str,
        expiry: NaiveDate,
        is_call: bool,
        strike: u32,
    ) -> Option<Arc<Instrument>> {
        let key = option_key(symbol, expiry, is_call, strike);
        self.resolve_fno_keyed(key, symbol, expiry, strike, is_call, false)
            .await
    }

    async fn resolve_fno_keyed(
        &self,
        key: String,
        symbol: &str,
        expiry: NaiveDate,
        strike: u32,
        is_call: bool,
        is_future: bool,
    ) -> Option<Arc<Instrument>> {
        if let Some(entry) = self.table.get(&key) {
            return match entry {
                CacheEntry::Resolved(instrument) => Some(instrument),
                CacheEntry::Unresolved => None,
            };
        }

        let query = FnoQuery {
            exchange: "NFO".to_string(),
            symbol: symbol.to_uppercase(),
            expiry_date: expiry.format("%d-%m-%Y").to_string(),
            strike,
            is_call,
            is_future,
        };
        match self.client.get_instrument_for_fno(&query).await {
            Ok(payload) => {
                let instrument = payload.into_instrument(&query.exchange, &query.symbol);
                if instrument.is_resolved() {
                    let instrument = Arc::new(instrument);
                    self.table.insert_resolved(key, Arc::clone(&instrument));
                    Some(instrument)
                } else {
                    warn!(%key, "contract lookup returned no token");
                    self.table.mark_unresolved(key);
                    None
                }
            }
            Err(error) => {
                warn!(%key, %error, "contract resolution failed");
                self.table.mark_unresolved(key);
                None
            }
        }
    }

    /// Resolve the first available commodity from a candidate list, caching
    /// each candidate under its own symbol.
    pub async fn resolve_commodity(&self, symbols: &[String]) -> Option<Arc<Instrument>> {
        for symbol in symbols {
            if let Some(instrument) = self.resolve_equity("MCX", symbol).await {
                return Some(instrument);
            }
        }
        None
    }

    /// Resolve an order's instrument key at execution time.
    ///
    /// Equity keys not yet in the table are looked up on NSE on demand.
    /// Derivative keys are only ever served from the table; contracts that
    /// were not pre-resolved are skipped, not fetched.
    pub async fn resolve_dynamic(&self, raw_key: &str) -> Option<Arc<Instrument>> {
        let key = normalize_key(raw_key);
        if let Some(instrument) = self.table.get_resolved(&key) {
            return Some(instrument);
        }
        if is_derivative_key(&key) {
            warn!(
                %key,
                "derivative key not pre-resolved; dynamic resolution covers equities only"
            );
            return None;
        }
        self.resolve_equity("NSE", &key).await
    }

    /// Resolve everything the catalogue names and publish it to the table.
    ///
    /// Derivative contracts are additionally published under their
    /// catalogue-namespace keys (`NAMESPACE_FUT`, `NAMESPACE_{CE|PE}_STRIKE`)
    /// when those differ from the derived keys, so order specifications can
    /// reference either form.
    pub async fn seed_catalogue(&self, catalogue: &InstrumentCatalogue) {
        for equity in &catalogue.nse_equity {
            self.resolve_equity(&equity.exchange, &equity.symbol).await;
        }

        for (namespace, series) in &catalogue.nfo_derivatives {
            let namespace = normalize_key(namespace);
            if series.futures {
                let derived = future_key(&series.symbol, series.expiry);
                if let Some(instrument) = self.resolve_future(&series.symbol, series.expiry).await
                {
                    let alias = format!("{namespace}_FUT");
                    if alias != derived {
                        self.table.insert_resolved(alias, instrument);
                    }
                }
            }
            for option in &series.options {
                let derived = option_key(
                    &series.symbol,
                    series.expiry,
                    option.option_type.is_call(),
                    option.strike,
                );
                if let Some(instrument) = self
                    .resolve_option(
                        &series.symbol,
                        series.expiry,
                        option.option_type.is_call(),
                        option.strike,
                    )
                    .await
                {
                    let alias = format!(
                        "{namespace}_{}_{}",
                        option.option_type.key_fragment(),
                        option.strike
                    );
                    if alias != derived {
                        self.table.insert_resolved(alias, instrument);
                    }
                }
            }
        }

        let mut any_commodity = false;
        for symbol in &catalogue.mcx_commodities.symbols {
            any_commodity |= self.resolve_equity("MCX", symbol).await.is_some();
        }
        if !catalogue.mcx_commodities.symbols.is_empty() && !any_commodity {
            warn!("no commodity symbol resolved");
        }

        info!(
            resolved = self.table.resolved_count(),
            total = self.table.len(),
            "instrument catalogue resolved"
        );
        debug!("resolution phase complete");
    }
}
