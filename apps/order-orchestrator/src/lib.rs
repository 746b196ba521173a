//! Concurrent multi-account order execution orchestrator.
//!
//! Given one YAML configuration describing brokerage accounts, an
//! instrument catalogue, and a set of individual and basket orders, this
//! crate authenticates every enabled account, resolves the catalogue into a
//! shared instrument table, and places the configured orders on every
//! account concurrently. Failures are isolated per account and per order;
//! the run always produces a complete per-account result map.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod basket;
pub mod broker;
pub mod config;
pub mod executor;
pub mod models;
pub mod orchestrator;
pub mod resolver;
pub mod session;
pub mod telemetry;

pub use basket::BasketOrderExecutor;
pub use broker::{Authenticator, BrokerClient, RestAuthenticator};
pub use config::{load_config, Config};
pub use executor::OrderExecutor;
pub use models::{AccountOutcome, AccountReport, BasketResult, OrderResult, RunResults};
pub use orchestrator::{execute_all, execute_basket_on_all_accounts, execute_on_all_accounts};
pub use resolver::{InstrumentResolver, InstrumentTable};
pub use session::{AccountManager, AccountSession};
