//! Account descriptors.

use serde::{Deserialize, Serialize};

/// One brokerage account as configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Name used to key results and prefix order tags.
    pub account_name: String,
    /// Broker login user id.
    pub user_id: String,
    /// Broker API key. Supports `${ENV_VAR}` interpolation at load time.
    pub api_key: String,
    /// Disabled accounts are never authenticated.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_defaults_to_true() {
        let yaml = r#"
account_name: primary
user_id: AB1234
api_key: secret
"#;
        let account: AccountConfig = serde_yaml_bw::from_str(yaml).unwrap();
        assert!(account.enabled);
    }
}
