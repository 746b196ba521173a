//! Basket execution: all-or-nothing submission of multi-leg orders.

use std::sync::Arc;

use tracing::{info, warn};

use crate::broker::api_types::{entry_is_ok, entry_order_number};
use crate::broker::{BrokerClient, BrokerReply};
use crate::config::BasketSpec;
use crate::executor::build_payload;
use crate::models::BasketResult;
use crate::resolver::InstrumentResolver;

/// Places basket orders for one account.
///
/// A basket is submitted only when every enabled leg's instrument resolves;
/// a single unresolvable leg fails the whole basket before any broker call,
/// so the broker never sees a partial basket.
pub struct BasketOrderExecutor {
    client: Arc<dyn BrokerClient>,
    resolver: Arc<InstrumentResolver>,
    account_name: String,
}

impl BasketOrderExecutor {
    /// Build a basket executor for one account.
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

    /// Execute one configured basket.
    pub async fn execute(&self, spec: &BasketSpec) -> BasketResult {
        if !spec.enabled {
            info!(account = %self.account_name, basket = %spec.name, "basket disabled, skipping");
            return BasketResult::failure(&spec.name, "Basket disabled");
        }

        let legs: Vec<_> = spec.orders.iter().filter(|leg| leg.enabled).collect();
        if legs.is_empty() {
            info!(account = %self.account_name, basket = %spec.name, "basket has no enabled legs");
            return BasketResult::failure(&spec.name, "Empty basket");
        }

        let mut payloads = Vec::with_capacity(legs.len());
        for leg in &legs {
            let Some(instrument) = self.resolver.resolve_dynamic(&leg.instrument).await else {
                warn!(
                    account = %self.account_name,
                    basket = %spec.name,
                    leg = %leg.name,
                    instrument = %leg.instrument,
                    "basket leg could not be resolved, basket withheld"
                );
                return BasketResult::failure(
                    &spec.name,
                    format!(
                        "Could not resolve instrument '{}' for leg '{}'",
                        leg.instrument, leg.name
                    ),
                );
            };
            payloads.push(build_payload(leg, &instrument, &self.account_name));
        }

        match self.client.place_basket_order(&payloads).await {
            Ok(reply) => {
                let result = classify_basket_reply(&reply, &spec.name);
                info!(
                    account = %self.account_name,
                    basket = %spec.name,
                    success = result.success,
                    legs = payloads.len(),
                    "basket submission finished"
                );
                result
            }
            Err(error) => {
                warn!(
                    account = %self.account_name,
                    basket = %spec.name,
                    %error,
                    "basket submission failed"
                );
                BasketResult::failure(&spec.name, error.to_string())
            }
        }
    }
}

/// Classify a basket submission reply.
///
/// Same three-way shape handling as single orders. A non-empty list reply is
/// trusted as acceptance of the submission; order numbers are collected only
/// from elements whose own status is accepted, so a rejected leg's number is
/// never reported as placed.
#[must_use]
pub fn classify_basket_reply(reply: &BrokerReply, basket_name: &str) -> BasketResult {
    let raw = reply.to_raw();
    match reply {
        BrokerReply::Entry(entry) => {
            if entry_is_ok(entry) {
                BasketResult {
                    success: true,
                    basket_name: basket_name.to_string(),
                    order_numbers: entry_order_number(entry).into_iter().collect(),
                    message: "Basket placed".to_string(),
                    raw,
                }
            } else {
                let message = entry
                    .get("emsg")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("Basket rejected")
                    .to_string();
                BasketResult {
                    success: false,
                    basket_name: basket_name.to_string(),
                    order_numbers: Vec::new(),
                    message,
                    raw,
                }
            }
        }
        BrokerReply::Batch(items) if !items.is_empty() => {
            let order_numbers = items
                .iter()
                .filter_map(serde_json::Value::as_object)
                .filter(|entry| entry_is_ok(entry))
                .filter_map(entry_order_number)
                .collect();
            BasketResult {
                success: true,
                basket_name: basket_name.to_string(),
                order_numbers,
                message: format!("Basket submitted ({} acknowledgements)", items.len()),
                raw,
            }
        }
        BrokerReply::Batch(_) | BrokerReply::Other(_) => BasketResult {
            success: false,
            basket_name: basket_name.to_string(),
            order_numbers: Vec::new(),
            message: "Unrecognized broker response".to_string(),
            raw,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_entry_collects_single_order_number() {
        let reply: BrokerReply =
            serde_json::from_str(r#"{"stat":"Ok","NOrdNo":"7"}"#).unwrap();
        let result = classify_basket_reply(&reply, "momentum");
        assert!(result.success);
        assert_eq!(result.order_numbers, vec!["7".to_string()]);
        assert_eq!(result.basket_name, "momentum");
    }

    #[test]
    fn list_reply_collects_numbers_from_accepted_elements_only() {
        let reply: BrokerReply = serde_json::from_str(
            r#"[{"stat":"Ok","NOrdNo":"1"},{"other":"x"},{"stat":"Ok","NOrdNo":2}]"#,
        )
        .unwrap();
        let result = classify_basket_reply(&reply, "momentum");
        assert!(result.success);
        assert_eq!(result.order_numbers, vec!["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn rejected_leg_number_is_not_reported() {
        let reply: BrokerReply = serde_json::from_str(
            r#"[{"stat":"Not_Ok","NOrdNo":"rejected-1"},{"stat":"Ok","NOrdNo":"accepted-2"}]"#,
        )
        .unwrap();
        let result = classify_basket_reply(&reply, "momentum");
        assert!(result.success);
        assert_eq!(result.order_numbers, vec!["accepted-2".to_string()]);
    }

    #[test]
    fn empty_list_reply_fails() {
        let reply: BrokerReply = serde_json::from_str("[]").unwrap();
        let result = classify_basket_reply(&reply, "momentum");
        assert!(!result.success);
        assert_eq!(result.message, "Unrecognized broker response");
    }

    #[test]
    fn rejected_entry_keeps_broker_message() {
        let reply: BrokerReply =
            serde_json::from_str(r#"{"stat":"Not_Ok","emsg":"basket limit"}"#).unwrap();
        let result = classify_basket_reply(&reply, "momentum");
        assert!(!result.success);
        assert_eq!(result.message, "basket limit");
    }
}
