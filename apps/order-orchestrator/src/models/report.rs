//! Per-order, per-basket and per-account execution results.
//!
//! Results are created once per execution attempt and never mutated. The raw
//! broker response is retained for diagnostics.

use std::collections::HashMap;

use serde::Serialize;

/// Outcome of a single order placement attempt.
#[derive(Debug, Clone, Serialize)]
pub struct OrderResult {
    /// Whether the broker accepted the order.
    pub success: bool,
    /// Broker-assigned order number, when reported.
    pub order_number: Option<String>,
    /// Human-readable outcome description.
    pub message: String,
    /// Raw broker response, retained for diagnostics.
    pub raw: serde_json::Value,
}

impl OrderResult {
    /// A failed attempt with no broker response.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            order_number: None,
            message: message.into(),
            raw: serde_json::Value::Null,
        }
    }
}

/// Outcome of a basket submission attempt.
#[derive(Debug, Clone, Serialize)]
pub struct BasketResult {
    /// Whether the broker accepted the basket.
    pub success: bool,
    /// Name of the basket from configuration.
    pub basket_name: String,
    /// Broker-assigned order numbers for accepted legs.
    pub order_numbers: Vec<String>,
    /// Human-readable outcome description.
    pub message: String,
    /// Raw broker response, retained for diagnostics.
    pub raw: serde_json::Value,
}

impl BasketResult {
    /// A failed or skipped basket with no broker response.
    #[must_use]
    pub fn failure(basket_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            basket_name: basket_name.into(),
            order_numbers: Vec::new(),
            message: message.into(),
            raw: serde_json::Value::Null,
        }
    }
}

/// Everything one account produced during a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AccountReport {
    /// Results of individual order placements, in submission order.
    pub individual_orders: Vec<OrderResult>,
    /// Results of basket submissions, in submission order.
    pub basket_orders: Vec<BasketResult>,
}

/// Per-account outcome as recorded at the orchestrator's collection point.
///
/// A task that completes yields a report; a task that dies unexpectedly is
/// recorded as a failure for that account only.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AccountOutcome {
    /// The account's workload ran to completion (individual results inside
    /// may still be failures).
    Report(AccountReport),
    /// The whole account task failed.
    Failed {
        /// Always `false`; kept explicit so serialized reports are
        /// self-describing.
        success: bool,
        /// Why the account task died.
        error: String,
    },
}

impl AccountOutcome {
    /// Build the account-level failure entry.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            success: false,
            error: error.into(),
        }
    }

    /// The completed report, if the account task finished.
    #[must_use]
    pub const fn report(&self) -> Option<&AccountReport> {
        match self {
            Self::Report(report) => Some(report),
            Self::Failed { .. } => None,
        }
    }
}

/// Final cross-account result set keyed by account name.
pub type RunResults = HashMap<String, AccountOutcome>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_result_has_no_order_number() {
        let result = OrderResult::failure("boom");
        assert!(!result.success);
        assert!(result.order_number.is_none());
        assert_eq!(result.message, "boom");
    }

    #[test]
    fn failed_outcome_serializes_flat() {
        let outcome = AccountOutcome::failed("connection reset");
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "connection reset");
    }

    #[test]
    fn report_accessor() {
        let outcome = AccountOutcome::Report(AccountReport::default());
        assert!(outcome.report().is_some());
        assert!(AccountOutcome::failed("x").report().is_none());
    }
}
