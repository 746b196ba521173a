//! End-to-end orchestration tests over in-memory broker fakes.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use order_orchestrator::broker::api_types::{BrokerReply, InstrumentPayload, OrderPayload};
use order_orchestrator::broker::{AuthError, Authenticator, BrokerClient, BrokerError, FnoQuery};
use order_orchestrator::config::{
    AccountConfig, BasketSpec, OrderKind, OrderSpec, ProductKind, TransactionSide,
};
use order_orchestrator::models::AccountOutcome;
use order_orchestrator::resolver::InstrumentTable;
use order_orchestrator::session::AccountManager;
use order_orchestrator::orchestrator;

/// Shared fake broker: records every call, answers lookups for any symbol
/// not in `unknown_symbols`, and optionally panics for one account's orders.
#[derive(Default)]
struct FakeBroker {
    placed: Mutex<Vec<OrderPayload>>,
    baskets: Mutex<Vec<Vec<OrderPayload>>>,
    equity_lookups: AtomicUsize,
    fno_lookups: AtomicUsize,
    unknown_symbols: Vec<String>,
    panic_account: Option<String>,
}

impl FakeBroker {
    fn instrument_json(exchange: &str, symbol: &str) -> InstrumentPayload {
        serde_json::from_value(serde_json::json!({
            "exchange": exchange,
            "token": format!("tok-{symbol}"),
            "symbol": symbol,
        }))
        .unwrap()
    }
}

#[async_trait]
impl BrokerClient for FakeBroker {
    async fn get_instrument_by_symbol(
        &self,
        exchange: &str,
        symbol: &str,
    ) -> Result<InstrumentPayload, BrokerError> {
        self.equity_lookups.fetch_add(1, Ordering::SeqCst);
        if self.unknown_symbols.iter().any(|s| s == symbol) {
            return Err(BrokerError::InstrumentNotFound {
                exchange: exchange.to_string(),
                symbol: symbol.to_string(),
            });
        }
        Ok(Self::instrument_json(exchange, symbol))
    }

    async fn get_instrument_for_fno(
        &self,
        query: &FnoQuery,
    ) -> Result<InstrumentPayload, BrokerError> {
        self.fno_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(Self::instrument_json(&query.exchange, &query.symbol))
    }

    async fn place_order(&self, payload: &OrderPayload) -> Result<BrokerReply, BrokerError> {
        if let Some(account) = &self.panic_account {
            if payload.order_tag.starts_with(account.as_str()) {
                panic!("injected order failure");
            }
        }
        let mut placed = self.placed.lock().unwrap();
        placed.push(payload.clone());
        let number = placed.len();
        Ok(serde_json::from_value(serde_json::json!({
            "stat": "Ok",
            "NOrdNo": format!("ord-{number}"),
        }))
        .unwrap())
    }

    async fn place_basket_order(
        &self,
        legs: &[OrderPayload],
    ) -> Result<BrokerReply, BrokerError> {
        self.baskets.lock().unwrap().push(legs.to_vec());
        let acks: Vec<_> = (0..legs.len())
            .map(|i| serde_json::json!({ "stat": "Ok", "NOrdNo": format!("leg-{i}") }))
            .collect();
        Ok(serde_json::from_value(serde_json::Value::Array(acks)).unwrap())
    }

    async fn download_contracts(&self, _: &[&str]) -> Result<(), BrokerError> {
        Ok(())
    }
}

struct FakeAuthenticator {
    broker: Arc<FakeBroker>,
    reject: Vec<String>,
}

#[async_trait]
impl Authenticator for FakeAuthenticator {
    async fn login(&self, account: &AccountConfig) -> Result<Arc<dyn BrokerClient>, AuthError> {
        if self.reject.iter().any(|r| *r == account.account_name) {
            return Err(AuthError::Rejected {
                user_id: account.user_id.clone(),
                message: "invalid api key".to_string(),
            });
        }
        Ok(Arc::clone(&self.broker) as Arc<dyn BrokerClient>)
    }
}

fn account(name: &str) -> AccountConfig {
    AccountConfig {
        account_name: name.to_string(),
        user_id: format!("uid-{name}"),
        api_key: "key".to_string(),
        enabled: true,
    }
}

fn order(name: &str, instrument: &str, tag: &str) -> OrderSpec {
    OrderSpec {
        name: name.to_string(),
        instrument: instrument.to_string(),
        transaction_type: TransactionSide::Buy,
        quantity: 1,
        order_type: OrderKind::Market,
        product_type: ProductKind::Intraday,
        price: None,
        trigger_price: None,
        stop_loss: None,
        square_off: None,
        trailing_stop: None,
        after_market: false,
        tag: tag.to_string(),
        enabled: true,
    }
}

fn basket(name: &str, enabled: bool, legs: Vec<OrderSpec>) -> BasketSpec {
    BasketSpec {
        name: name.to_string(),
        enabled,
        orders: legs,
    }
}

async fn manager_with(
    broker: &Arc<FakeBroker>,
    reject: &[&str],
    accounts: Vec<AccountConfig>,
) -> AccountManager {
    let authenticator = Arc::new(FakeAuthenticator {
        broker: Arc::clone(broker),
        reject: reject.iter().map(ToString::to_string).collect(),
    });
    AccountManager::initialize_all(authenticator, accounts, InstrumentTable::new(), 5).await
}

#[tokio::test]
async fn orders_run_on_every_account_with_scoped_tags() {
    let broker = Arc::new(FakeBroker::default());
    let manager =
        manager_with(&broker, &[], vec![account("alpha"), account("beta")]).await;

    let orders = vec![order("buy", "RELIANCE", "breakout")];
    let results = orchestrator::execute_on_all_accounts(&manager, &orders, 5).await;

    assert_eq!(results.len(), 2);
    for name in ["alpha", "beta"] {
        let report = results[name].report().expect("account should report");
        assert_eq!(report.individual_orders.len(), 1);
        assert!(report.individual_orders[0].success);
        assert!(report.individual_orders[0].order_number.is_some());
    }

    let tags: HashSet<String> = broker
        .placed
        .lock()
        .unwrap()
        .iter()
        .map(|p| p.order_tag.clone())
        .collect();
    assert_eq!(
        tags,
        HashSet::from(["alpha_breakout".to_string(), "beta_breakout".to_string()])
    );
}

#[tokio::test]
async fn panicking_account_does_not_disturb_the_others() {
    let broker = Arc::new(FakeBroker {
        panic_account: Some("beta".to_string()),
        ..FakeBroker::default()
    });
    let manager = manager_with(
        &broker,
        &[],
        vec![account("alpha"), account("beta"), account("gamma")],
    )
    .await;

    let orders = vec![order("buy", "RELIANCE", "x")];
    let results = orchestrator::execute_on_all_accounts(&manager, &orders, 5).await;

    assert_eq!(results.len(), 3);
    match &results["beta"] {
        AccountOutcome::Failed { success, error } => {
            assert!(!success);
            assert!(error.contains("panic"), "unexpected error: {error}");
        }
        AccountOutcome::Report(_) => panic!("beta should have failed"),
    }
    for name in ["alpha", "gamma"] {
        let report = results[name].report().expect("account should report");
        assert!(report.individual_orders[0].success);
    }
}

#[tokio::test]
async fn rejected_login_excludes_only_that_account() {
    let broker = Arc::new(FakeBroker::default());
    let manager =
        manager_with(&broker, &["beta"], vec![account("alpha"), account("beta")]).await;

    let orders = vec![order("buy", "RELIANCE", "x")];
    let results = orchestrator::execute_on_all_accounts(&manager, &orders, 5).await;

    assert_eq!(results.len(), 1);
    assert!(results.contains_key("alpha"));
    assert_eq!(manager.login_failures().len(), 1);
    assert_eq!(manager.login_failures()[0].0, "beta");
}

#[tokio::test]
async fn disabled_order_is_skipped_without_calls() {
    let broker = Arc::new(FakeBroker::default());
    let manager = manager_with(&broker, &[], vec![account("alpha")]).await;

    let mut skipped = order("dormant", "RELIANCE", "");
    skipped.enabled = false;
    let results = orchestrator::execute_on_all_accounts(&manager, &[skipped], 5).await;

    let report = results["alpha"].report().expect("account should report");
    assert!(!report.individual_orders[0].success);
    assert_eq!(report.individual_orders[0].message, "Order disabled");
    assert!(broker.placed.lock().unwrap().is_empty());
    assert_eq!(broker.equity_lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn disabled_basket_makes_no_broker_calls() {
    let broker = Arc::new(FakeBroker::default());
    let manager = manager_with(&broker, &[], vec![account("alpha")]).await;

    let baskets = vec![basket(
        "momentum",
        false,
        vec![order("leg", "RELIANCE", "")],
    )];
    let results = orchestrator::execute_basket_on_all_accounts(&manager, &baskets, 5).await;

    let report = results["alpha"].report().expect("account should report");
    assert!(!report.basket_orders[0].success);
    assert_eq!(report.basket_orders[0].message, "Basket disabled");
    assert!(broker.baskets.lock().unwrap().is_empty());
    assert_eq!(broker.equity_lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_basket_is_skipped_without_calls() {
    let broker = Arc::new(FakeBroker::default());
    let manager = manager_with(&broker, &[], vec![account("alpha")]).await;

    let baskets = vec![basket("hollow", true, Vec::new())];
    let results = orchestrator::execute_basket_on_all_accounts(&manager, &baskets, 5).await;

    let report = results["alpha"].report().expect("account should report");
    assert_eq!(report.basket_orders[0].message, "Empty basket");
    assert!(broker.baskets.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unresolvable_leg_withholds_the_whole_basket() {
    let broker = Arc::new(FakeBroker {
        unknown_symbols: vec!["GHOST".to_string()],
        ..FakeBroker::default()
    });
    let manager = manager_with(&broker, &[], vec![account("alpha")]).await;

    let baskets = vec![basket(
        "mixed",
        true,
        vec![order("good", "RELIANCE", ""), order("bad", "GHOST", "")],
    )];
    let results = orchestrator::execute_basket_on_all_accounts(&manager, &baskets, 5).await;

    let report = results["alpha"].report().expect("account should report");
    assert!(!report.basket_orders[0].success);
    assert!(report.basket_orders[0].message.contains("GHOST"));
    assert!(broker.baskets.lock().unwrap().is_empty());
}

#[tokio::test]
async fn derivative_keys_are_not_resolved_dynamically() {
    let broker = Arc::new(FakeBroker::default());
    let manager = manager_with(&broker, &[], vec![account("alpha")]).await;

    let orders = vec![order("fut", "NIFTY_DEC30_FUT", "")];
    let results = orchestrator::execute_on_all_accounts(&manager, &orders, 5).await;

    let report = results["alpha"].report().expect("account should report");
    assert!(!report.individual_orders[0].success);
    assert!(report.individual_orders[0]
        .message
        .contains("NIFTY_DEC30_FUT"));
    assert_eq!(broker.fno_lookups.load(Ordering::SeqCst), 0);
    assert!(broker.placed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn full_run_covers_orders_then_baskets() {
    let broker = Arc::new(FakeBroker::default());
    let manager = manager_with(&broker, &[], vec![account("alpha")]).await;

    let orders = vec![order("buy", "RELIANCE", "a")];
    let baskets = vec![basket(
        "pair",
        true,
        vec![order("leg1", "TCS", "b"), order("leg2", "INFY", "b")],
    )];
    let results = orchestrator::execute_all(&manager, &orders, &baskets, 5).await;

    let report = results["alpha"].report().expect("account should report");
    assert_eq!(report.individual_orders.len(), 1);
    assert_eq!(report.basket_orders.len(), 1);
    assert!(report.basket_orders[0].success);
    assert_eq!(report.basket_orders[0].order_numbers.len(), 2);
    assert_eq!(broker.baskets.lock().unwrap()[0].len(), 2);
}
