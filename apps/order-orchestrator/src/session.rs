//! Account sessions and concurrent session initialization.
//!
//! Each enabled account is authenticated in its own task; the fan-out is
//! bounded by a semaphore sized to `min(max_workers, accounts)`. An account
//! whose login fails (or whose login task panics) is dropped from the run
//! with a logged reason, never aborting the other accounts.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::basket::BasketOrderExecutor;
use crate::broker::{Authenticator, BrokerClient};
use crate::config::{AccountConfig, BasketSpec, OrderSpec};
use crate::executor::OrderExecutor;
use crate::models::AccountReport;
use crate::resolver::{InstrumentResolver, InstrumentTable};

/// One authenticated account, its client, and a resolver view over the
/// shared instrument table.
pub struct AccountSession {
    account: AccountConfig,
    client: Arc<dyn BrokerClient>,
    resolver: Arc<InstrumentResolver>,
}

impl AccountSession {
    /// Wrap an authenticated client into a session.
    #[must_use]
    pub fn new(
        account: AccountConfig,
        client: Arc<dyn BrokerClient>,
        table: InstrumentTable,
    ) -> Self {
        let resolver = Arc::new(InstrumentResolver::new(Arc::clone(&client), table));
        Self {
            account,
            client,
            resolver,
        }
    }

    /// Name of the underlying account.
    #[must_use]
    pub fn account_name(&self) -> &str {
        &self.account.account_name
    }

    /// This session's resolver view over the shared instrument table.
    #[must_use]
    pub fn resolver(&self) -> &Arc<InstrumentResolver> {
        &self.resolver
    }

    /// Executor for individual orders on this account.
    #[must_use]
    pub fn order_executor(&self) -> OrderExecutor {
        OrderExecutor::new(
            Arc::clone(&self.client),
            Arc::clone(&self.resolver),
            self.account_name(),
        )
    }

    /// Executor for basket orders on this account.
    #[must_use]
    pub fn basket_executor(&self) -> BasketOrderExecutor {
        BasketOrderExecutor::new(
            Arc::clone(&self.client),
            Arc::clone(&self.resolver),
            self.account_name(),
        )
    }

    /// Run this account's full workload: individual orders first, then
    /// baskets, each sequentially in configuration order.
    pub async fn run_workload(
        &self,
        orders: &[OrderSpec],
        baskets: &[BasketSpec],
    ) -> AccountReport {
        let mut report = AccountReport::default();

        let executor = self.order_executor();
        for order in orders {
            report.individual_orders.push(executor.execute(order).await);
        }

        let basket_executor = self.basket_executor();
        for basket in baskets {
            report.basket_orders.push(basket_executor.execute(basket).await);
        }

        report
    }
}

/// The set of sessions that survived initialization, in configuration order.
pub struct AccountManager {
    sessions: Vec<Arc<AccountSession>>,
    login_failures: Vec<(String, String)>,
}

impl AccountManager {
    /// Authenticate all enabled accounts concurrently.
    ///
    /// At most `min(max_workers, accounts)` logins run at once. Accounts
    /// that fail to authenticate are recorded in
    /// [`login_failures`](Self::login_failures) and excluded from
    /// [`sessions`](Self::sessions).
    pub async fn initialize_all(
        authenticator: Arc<dyn Authenticator>,
        accounts: Vec<AccountConfig>,
        table: InstrumentTable,
        max_workers: usize,
    ) -> Self {
        let enabled: Vec<_> = accounts.into_iter().filter(|a| a.enabled).collect();
        let pool_size = max_workers.min(enabled.len()).max(1);
        info!(
            accounts = enabled.len(),
            workers = pool_size,
            "initializing account sessions"
        );

        let semaphore = Arc::new(Semaphore::new(pool_size));
        let mut join_set = JoinSet::new();
        let mut task_accounts: HashMap<tokio::task::Id, (usize, String)> = HashMap::new();

        for (index, account) in enabled.into_iter().enumerate() {
            let authenticator = Arc::clone(&authenticator);
            let semaphore = Arc::clone(&semaphore);
            let table = table.clone();
            let account_name = account.account_name.clone();

            let handle = join_set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return Err("session pool closed".to_string()),
                };
                match authenticator.login(&account).await {
                    Ok(client) => {
                        // Each session prepares its own contract masters so
                        // dynamic lookups work on every connection.
                        if let Err(error) =
                            client.download_contracts(&["NSE", "NFO", "MCX"]).await
                        {
                            warn!(
                                account = %account.account_name,
                                %error,
                                "contract preparation failed, lookups may miss"
                            );
                        }
                        Ok(AccountSession::new(account, client, table))
                    }
                    Err(error) => Err(error.to_string()),
                }
            });
            task_accounts.insert(handle.id(), (index, account_name));
        }

        let mut indexed_sessions: Vec<(usize, Arc<AccountSession>)> = Vec::new();
        let mut login_failures = Vec::new();

        while let Some(joined) = join_set.join_next_with_id().await {
            match joined {
                Ok((id, task_result)) => {
                    let (index, name) = task_accounts
                        .remove(&id)
                        .unwrap_or((usize::MAX, "unknown".to_string()));
                    match task_result {
                        Ok(session) => {
                            info!(account = %name, "session ready");
                            indexed_sessions.push((index, Arc::new(session)));
                        }
                        Err(message) => {
                            warn!(account = %name, %message, "account excluded from run");
                            login_failures.push((name, message));
                        }
                    }
                }
                Err(join_error) => {
                    let (_, name) = task_accounts
                        .remove(&join_error.id())
                        .unwrap_or((usize::MAX, "unknown".to_string()));
                    error!(account = %name, error = %join_error, "login task died");
                    login_failures.push((name, join_error.to_string()));
                }
            }
        }

        indexed_sessions.sort_by_key(|(index, _)| *index);
        Self {
            sessions: indexed_sessions
                .into_iter()
                .map(|(_, session)| session)
                .collect(),
            login_failures,
        }
    }

    /// Sessions that authenticated successfully, in configuration order.
    #[must_use]
    pub fn sessions(&self) -> &[Arc<AccountSession>] {
        &self.sessions
    }

    /// Accounts that failed to authenticate, with reasons.
    #[must_use]
    pub fn login_failures(&self) -> &[(String, String)] {
        &self.login_failures
    }

    /// Whether no account survived initialization.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
