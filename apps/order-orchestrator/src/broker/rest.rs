//! REST implementation of the broker boundary.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::api_types::{ApiErrorBody, BrokerReply, InstrumentPayload, OrderPayload, SessionReply};
use super::{AuthError, Authenticator, BrokerClient, BrokerError, FnoQuery};
use crate::config::{AccountConfig, BrokerConfig};

/// Broker client over the brokerage REST API, scoped to one authenticated
/// session.
pub struct RestBrokerClient {
    client: reqwest::Client,
    base_url: String,
    user_id: String,
    session_token: String,
}

impl RestBrokerClient {
    fn new(
        client: reqwest::Client,
        base_url: String,
        user_id: String,
        session_token: String,
    ) -> Self {
        Self {
            client,
            base_url,
            user_id,
            session_token,
        }
    }

    fn authorization(&self) -> String {
        format!("Bearer {} {}", self.user_id, self.session_token)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, BrokerError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(|b| b.emsg)
            .unwrap_or(body);
        Err(BrokerError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, BrokerError> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .header("Authorization", self.authorization())
            .json(body)
            .send()
            .await?;
        Self::check(response).await
    }
}

#[async_trait]
impl BrokerClient for RestBrokerClient {
    #[instrument(skip(self), fields(user_id = %self.user_id))]
    async fn get_instrument_by_symbol(
        &self,
        exchange: &str,
        symbol: &str,
    ) -> Result<InstrumentPayload, BrokerError> {
        let response = self
            .client
            .get(format!(
                "{}/api/v1/instruments/{exchange}/{symbol}",
                self.base_url
            ))
            .header("Authorization", self.authorization())
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BrokerError::InstrumentNotFound {
                exchange: exchange.to_string(),
                symbol: symbol.to_string(),
            });
        }
        let response = Self::check(response).await?;
        let payload = response.json::<InstrumentPayload>().await?;
        debug!(exchange, symbol, "instrument lookup succeeded");
        Ok(payload)
    }

    #[instrument(skip(self, query), fields(user_id = %self.user_id, symbol = %query.symbol))]
    async fn get_instrument_for_fno(
        &self,
        query: &FnoQuery,
    ) -> Result<InstrumentPayload, BrokerError> {
        #[derive(Serialize)]
        struct FnoBody<'a> {
            exchange: &'a str,
            symbol: &'a str,
            expiry_date: &'a str,
            strike: u32,
            is_ce: bool,
            is_fut: bool,
        }

        let body = FnoBody {
            exchange: &query.exchange,
            symbol: &query.symbol,
            expiry_date: &query.expiry_date,
            strike: query.strike,
            is_ce: query.is_call,
            is_fut: query.is_future,
        };
        let response = self
            .client
            .post(format!("{}/api/v1/instruments/fno", self.base_url))
            .header("Authorization", self.authorization())
            .json(&body)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BrokerError::InstrumentNotFound {
                exchange: query.exchange.clone(),
                symbol: query.symbol.clone(),
            });
        }
        let response = Self::check(response).await?;
        Ok(response.json::<InstrumentPayload>().await?)
    }

    #[instrument(skip(self, payload), fields(user_id = %self.user_id, symbol = %payload.symbol))]
    async fn place_order(&self, payload: &OrderPayload) -> Result<BrokerReply, BrokerError> {
        let response = self.post_json("/api/v1/orders", payload).await?;
        Ok(response.json::<BrokerReply>().await?)
    }

    #[instrument(skip(self, legs), fields(user_id = %self.user_id, legs = legs.len()))]
    async fn place_basket_order(
        &self,
        legs: &[OrderPayload],
    ) -> Result<BrokerReply, BrokerError> {
        let response = self.post_json("/api/v1/orders/basket", legs).await?;
        Ok(response.json::<BrokerReply>().await?)
    }

    #[instrument(skip(self), fields(user_id = %self.user_id))]
    async fn download_contracts(&self, exchanges: &[&str]) -> Result<(), BrokerError> {
        #[derive(Serialize)]
        struct DownloadBody<'a> {
            exchanges: &'a [&'a str],
        }

        self.post_json("/api/v1/contracts/download", &DownloadBody { exchanges })
            .await?;
        debug!(?exchanges, "contract masters downloaded");
        Ok(())
    }
}

/// Authenticator against the brokerage login endpoint.
pub struct RestAuthenticator {
    client: reqwest::Client,
    base_url: String,
}

impl RestAuthenticator {
    /// Build an authenticator from broker connection settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(broker: &BrokerConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(broker.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: broker.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Authenticator for RestAuthenticator {
    #[instrument(skip(self, account), fields(account = %account.account_name))]
    async fn login(&self, account: &AccountConfig) -> Result<Arc<dyn BrokerClient>, AuthError> {
        #[derive(Serialize)]
        struct LoginBody<'a> {
            user_id: &'a str,
            api_key: &'a str,
        }

        let response = self
            .client
            .post(format!("{}/api/v1/session", self.base_url))
            .json(&LoginBody {
                user_id: &account.user_id,
                api_key: &account.api_key,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let reply: SessionReply = serde_json::from_str(&body)?;

        let accepted = status.is_success()
            && reply.stat.as_deref() == Some(super::api_types::STATUS_OK);
        let Some(session_id) = reply.session_id.filter(|_| accepted) else {
            let message = reply
                .emsg
                .unwrap_or_else(|| format!("login failed with HTTP {}", status.as_u16()));
            warn!(account = %account.account_name, %message, "login rejected");
            return Err(AuthError::Rejected {
                user_id: account.user_id.clone(),
                message,
            });
        };

        debug!(account = %account.account_name, "session established");
        Ok(Arc::new(RestBrokerClient::new(
            self.client.clone(),
            self.base_url.clone(),
            account.user_id.clone(),
            session_id,
        )))
    }
}
