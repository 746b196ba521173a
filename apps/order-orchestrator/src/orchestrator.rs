//! Cross-account fan-out.
//!
//! Each surviving session runs its workload in its own task, bounded by a
//! semaphore sized to `min(max_workers, sessions)`. Results are collected
//! per account; a task that dies is recorded as that account's failure and
//! never disturbs the others.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::config::{BasketSpec, OrderSpec};
use crate::models::{AccountOutcome, RunResults};
use crate::session::AccountManager;

/// Place the configured individual orders on every account.
pub async fn execute_on_all_accounts(
    manager: &AccountManager,
    orders: &[OrderSpec],
    max_workers: usize,
) -> RunResults {
    fan_out(manager, orders, &[], max_workers).await
}

/// Place the configured baskets on every account.
pub async fn execute_basket_on_all_accounts(
    manager: &AccountManager,
    baskets: &[BasketSpec],
    max_workers: usize,
) -> RunResults {
    fan_out(manager, &[], baskets, max_workers).await
}

/// Run the full workload, individual orders then baskets, on every account.
pub async fn execute_all(
    manager: &AccountManager,
    orders: &[OrderSpec],
    baskets: &[BasketSpec],
    max_workers: usize,
) -> RunResults {
    fan_out(manager, orders, baskets, max_workers).await
}

async fn fan_out(
    manager: &AccountManager,
    orders: &[OrderSpec],
    baskets: &[BasketSpec],
    max_workers: usize,
) -> RunResults {
    let sessions = manager.sessions();
    let mut results = RunResults::new();
    if sessions.is_empty() {
        info!("no account sessions available, nothing to execute");
        return results;
    }

    let pool_size = max_workers.min(sessions.len()).max(1);
    info!(
        accounts = sessions.len(),
        workers = pool_size,
        orders = orders.len(),
        baskets = baskets.len(),
        "dispatching workload"
    );

    let orders: Arc<[OrderSpec]> = Arc::from(orders.to_vec());
    let baskets: Arc<[BasketSpec]> = Arc::from(baskets.to_vec());
    let semaphore = Arc::new(Semaphore::new(pool_size));
    let mut join_set = JoinSet::new();
    let mut task_accounts: HashMap<tokio::task::Id, String> = HashMap::new();

    for session in sessions {
        let session = Arc::clone(session);
        let orders = Arc::clone(&orders);
        let baskets = Arc::clone(&baskets);
        let semaphore = Arc::clone(&semaphore);
        let account_name = session.account_name().to_string();

        let handle = join_set.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(_) => None,
            };
            session.run_workload(&orders, &baskets).await
        });
        task_accounts.insert(handle.id(), account_name);
    }

    while let Some(joined) = join_set.join_next_with_id().await {
        match joined {
            Ok((id, report)) => {
                let name = task_accounts
                    .remove(&id)
                    .unwrap_or_else(|| "unknown".to_string());
                results.insert(name, AccountOutcome::Report(report));
            }
            Err(join_error) => {
                let name = task_accounts
                    .remove(&join_error.id())
                    .unwrap_or_else(|| "unknown".to_string());
                error!(account = %name, error = %join_error, "account task died");
                results.insert(name, AccountOutcome::failed(join_error.to_string()));
            }
        }
    }

    results
}
