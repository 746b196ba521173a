//! Broker boundary: the traits the rest of the crate talks to, plus the
//! REST implementation.
//!
//! Everything above this module works against [`BrokerClient`] and
//! [`Authenticator`] trait objects, so tests substitute in-memory fakes and
//! the orchestration layers never touch HTTP.

pub mod api_types;
mod rest;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::AccountConfig;

pub use api_types::{BrokerReply, InstrumentPayload, OrderPayload};
pub use rest::{RestAuthenticator, RestBrokerClient};

/// Errors from broker API calls.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("Broker request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The broker answered with a non-success HTTP status.
    #[error("Broker returned HTTP {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message extracted from the body, or the raw body.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("Failed to decode broker response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The requested instrument does not exist on the exchange.
    #[error("Instrument not found: {exchange} {symbol}")]
    InstrumentNotFound {
        /// Exchange searched.
        exchange: String,
        /// Symbol searched.
        symbol: String,
    },
}

/// Errors from account authentication.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The broker refused the credentials.
    #[error("Login rejected for '{user_id}': {message}")]
    Rejected {
        /// User id that was refused.
        user_id: String,
        /// Broker-supplied reason.
        message: String,
    },

    /// Transport-level failure during login.
    #[error("Login request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The login response could not be decoded.
    #[error("Failed to decode login response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Lookup parameters for a futures or options contract.
#[derive(Debug, Clone)]
pub struct FnoQuery {
    /// Derivatives exchange, normally "NFO".
    pub exchange: String,
    /// Underlying symbol.
    pub symbol: String,
    /// Expiry date in the broker's `DD-MM-YYYY` format.
    pub expiry_date: String,
    /// Strike price; zero for futures.
    pub strike: u32,
    /// Call side flag; ignored for futures.
    pub is_call: bool,
    /// Whether the query targets the futures contract.
    pub is_future: bool,
}

/// An authenticated connection to one brokerage account.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Look up an equity or commodity instrument by exchange and symbol.
    async fn get_instrument_by_symbol(
        &self,
        exchange: &str,
        symbol: &str,
    ) -> Result<InstrumentPayload, BrokerError>;

    /// Look up a futures or options contract.
    async fn get_instrument_for_fno(
        &self,
        query: &FnoQuery,
    ) -> Result<InstrumentPayload, BrokerError>;

    /// Place a single order.
    async fn place_order(&self, payload: &OrderPayload) -> Result<BrokerReply, BrokerError>;

    /// Place a basket of orders as one request.
    async fn place_basket_order(&self, legs: &[OrderPayload])
    -> Result<BrokerReply, BrokerError>;

    /// Download contract masters for the given exchanges so instrument
    /// lookups can be served.
    async fn download_contracts(&self, exchanges: &[&str]) -> Result<(), BrokerError>;
}

/// Produces authenticated [`BrokerClient`] handles from account credentials.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Authenticate one account and return a ready-to-use client.
    async fn login(&self, account: &AccountConfig) -> Result<Arc<dyn BrokerClient>, AuthError>;
}
