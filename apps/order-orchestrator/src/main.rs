//! Binary entry point: load configuration, initialize sessions, resolve
//! the instrument catalogue, run the workload, and print the report.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use order_orchestrator::broker::RestAuthenticator;
use order_orchestrator::models::AccountOutcome;
use order_orchestrator::resolver::InstrumentTable;
use order_orchestrator::session::AccountManager;
use order_orchestrator::{config, orchestrator, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing("info,order_orchestrator=debug");

    let config_path = std::env::args().nth(1);
    let config = config::load_config(config_path.as_deref())
        .context("failed to load configuration")?;
    info!(
        accounts = config.accounts.len(),
        orders = config.orders.len(),
        baskets = config.basket_orders.len(),
        "configuration loaded"
    );

    let authenticator = Arc::new(
        RestAuthenticator::new(&config.broker).context("failed to build broker client")?,
    );
    let manager = AccountManager::initialize_all(
        authenticator,
        config.enabled_accounts(),
        InstrumentTable::new(),
        config.max_workers,
    )
    .await;

    if manager.is_empty() {
        anyhow::bail!("no account could be initialized, aborting run");
    }

    // One session seeds the shared table; every other session reads the
    // same entries.
    if !config.instruments.is_empty() {
        manager.sessions()[0]
            .resolver()
            .seed_catalogue(&config.instruments)
            .await;
    }

    let mut results = orchestrator::execute_all(
        &manager,
        &config.orders,
        &config.basket_orders,
        config.max_workers,
    )
    .await;

    for (account, reason) in manager.login_failures() {
        results.insert(account.clone(), AccountOutcome::failed(reason.clone()));
    }

    let succeeded = results
        .values()
        .filter_map(AccountOutcome::report)
        .flat_map(|r| r.individual_orders.iter())
        .filter(|o| o.success)
        .count();
    let submitted_baskets = results
        .values()
        .filter_map(AccountOutcome::report)
        .flat_map(|r| r.basket_orders.iter())
        .filter(|b| b.success)
        .count();
    info!(
        accounts = results.len(),
        orders_accepted = succeeded,
        baskets_accepted = submitted_baskets,
        "run complete"
    );

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
