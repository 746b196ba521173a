//! Single-order execution against one authenticated account.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::broker::api_types::{entry_is_ok, entry_order_number};
use crate::broker::{BrokerClient, BrokerReply, OrderPayload};
use crate::config::OrderSpec;
use crate::models::{Instrument, OrderResult};
use crate::resolver::InstrumentResolver;

/// Places individual orders for one account.
///
/// Every attempt yields an [`OrderResult`]; resolution failures, broker
/// refusals and transport errors all land in the result rather than aborting
/// the account's remaining workload.
pub struct OrderExecutor {
    client: Arc<dyn BrokerClient>,
    resolver: Arc<InstrumentResolver>,
    account_name: String,
}

impl OrderExecutor {
    /// Build an executor for one account.
    #[must_use]
    pub fn new(
        client: Arc<dyn BrokerClient>,
        resolver: Arc<InstrumentResolver>,
        account_name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            resolver,
            account_name: account_name.into(),
        }
    }

    /// Execute one configured order.
    pub async fn execute(&self, spec: &OrderSpec) -> OrderResult {
        if !spec.enabled {
            info!(account = %self.account_name, order = %spec.name, "order disabled, skipping");
            return OrderResult::failure("Order disabled");
        }

        let Some(instrument) = self.resolver.resolve_dynamic(&spec.instrument).await else {
            warn!(
                account = %self.account_name,
                order = %spec.name,
                instrument = %spec.instrument,
                "instrument could not be resolved"
            );
            return OrderResult::failure(format!(
                "Could not resolve instrument '{}'",
                spec.instrument
            ));
        };

        let payload = build_payload(spec, &instrument, &self.account_name);
        match self.client.place_order(&payload).await {
            Ok(reply) => {
                let result = classify_order_reply(&reply);
                info!(
                    account = %self.account_name,
                    order = %spec.name,
                    success = result.success,
                    order_number = result.order_number.as_deref().unwrap_or("-"),
                    "order placement finished"
                );
                result
            }
            Err(error) => {
                warn!(
                    account = %self.account_name,
                    order = %spec.name,
                    %error,
                    "order placement failed"
                );
                OrderResult::failure(error.to_string())
            }
        }
    }
}

/// Build the wire payload for one order leg.
///
/// Price-like fields are sent only when positive; the broker treats an
/// explicit zero differently from an absent field. The order tag is
/// prefixed with the account name so fills can be attributed per account.
#[must_use]
pub fn build_payload(spec: &OrderSpec, instrument: &Instrument, account_name: &str) -> OrderPayload {
    let order_tag = if spec.tag.is_empty() {
        account_name.to_string()
    } else {
        format!("{account_name}_{}", spec.tag)
    };

    OrderPayload {
        exchange: instrument.exchange.clone(),
        token: instrument.token.clone(),
        symbol: instrument.symbol.clone(),
        transaction_type: spec.transaction_type.broker_code().to_string(),
        quantity: spec.quantity,
        order_type: spec.order_type.broker_code().to_string(),
        product_type: spec.product_type.broker_code().to_string(),
        price: positive(spec.price),
        trigger_price: positive(spec.trigger_price),
        stop_loss: positive(spec.stop_loss),
        square_off: positive(spec.square_off),
        trailing_sl: positive(spec.trailing_stop),
        is_amo: spec.after_market,
        order_tag,
    }
}

fn positive(value: Option<Decimal>) -> Option<Decimal> {
    value.filter(|v| v.is_sign_positive() && !v.is_zero())
}

/// Classify a placement reply into an order result.
///
/// Three shapes are recognized: an object with `stat == "Ok"` is a
/// confirmed acceptance carrying the order number; a non-empty list is the
/// broker's asynchronous acknowledgement and is trusted without inspecting
/// the elements; anything else, including an empty list, is a failure.
#[must_use]
pub fn classify_order_reply(reply: &BrokerReply) -> OrderResult {
    let raw = reply.to_raw();
    match reply {
        BrokerReply::Entry(entry) => {
            if entry_is_ok(entry) {
                OrderResult {
                    success: true,
                    order_number: entry_order_number(entry),
                    message: "Order placed".to_string(),
                    raw,
                }
            } else {
                let message = entry
                    .get("emsg")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("Order rejected")
                    .to_string();
                OrderResult {
                    success: false,
                    order_number: None,
                    message,
                    raw,
                }
            }
        }
        BrokerReply::Batch(items) if !items.is_empty() => OrderResult {
            success: true,
            order_number: None,
            message: format!("Order submitted ({} acknowledgements)", items.len()),
            raw,
        },
        BrokerReply::Batch(_) | BrokerReply::Other(_) => OrderResult {
            success: false,
            order_number: None,
            message: "Unrecognized broker response".to_string(),
            raw,
        },
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::config::{OrderKind, ProductKind, TransactionSide};

    fn spec() -> OrderSpec {
        OrderSpec {
            name: "test".to_string(),
            instrument: "RELIANCE".to_string(),
            transaction_type: TransactionSide::Buy,
            quantity: 2,
            order_type: OrderKind::Limit,
            product_type: ProductKind::Intraday,
            price: Some(dec!(2500.50)),
            trigger_price: None,
            stop_loss: Some(dec!(0)),
            square_off: None,
            trailing_stop: None,
            after_market: false,
            tag: "alpha".to_string(),
            enabled: true,
        }
    }

    fn instrument() -> Instrument {
        Instrument {
            exchange: "NSE".to_string(),
            token: "2885".to_string(),
            symbol: "RELIANCE".to_string(),
            name: String::new(),
            expiry: String::new(),
            lot_size: 1,
        }
    }

    #[test]
    fn payload_prefixes_tag_with_account() {
        let payload = build_payload(&spec(), &instrument(), "primary");
        assert_eq!(payload.order_tag, "primary_alpha");
    }

    #[test]
    fn payload_uses_account_name_for_empty_tag() {
        let mut spec = spec();
        spec.tag = String::new();
        let payload = build_payload(&spec, &instrument(), "primary");
        assert_eq!(payload.order_tag, "primary");
    }

    #[test]
    fn payload_drops_non_positive_prices() {
        let payload = build_payload(&spec(), &instrument(), "primary");
        assert_eq!(payload.price, Some(dec!(2500.50)));
        assert!(payload.stop_loss.is_none());
        assert!(payload.trigger_price.is_none());
    }

    #[test]
    fn ok_entry_is_success_with_order_number() {
        let reply: BrokerReply =
            serde_json::from_str(r#"{"stat":"Ok","NOrdNo":"99"}"#).unwrap();
        let result = classify_order_reply(&reply);
        assert!(result.success);
        assert_eq!(result.order_number.as_deref(), Some("99"));
    }

    #[test]
    fn rejected_entry_carries_broker_message() {
        let reply: BrokerReply =
            serde_json::from_str(r#"{"stat":"Not_Ok","emsg":"margin shortfall"}"#).unwrap();
        let result = classify_order_reply(&reply);
        assert!(!result.success);
        assert_eq!(result.message, "margin shortfall");
    }

    #[test]
    fn non_empty_list_is_optimistic_success() {
        let reply: BrokerReply = serde_json::from_str(r#"[{"anything":"goes"}]"#).unwrap();
        let result = classify_order_reply(&reply);
        assert!(result.success);
        assert!(result.order_number.is_none());
    }

    #[test]
    fn empty_list_is_failure() {
        let reply: BrokerReply = serde_json::from_str("[]").unwrap();
        let result = classify_order_reply(&reply);
        assert!(!result.success);
        assert_eq!(result.message, "Unrecognized broker response");
    }

    #[test]
    fn scalar_reply_is_failure() {
        let reply: BrokerReply = serde_json::from_str("\"gateway timeout\"").unwrap();
        assert!(!classify_order_reply(&reply).success);
    }
}
