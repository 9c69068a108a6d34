//! Runtime limits.

use serde::{Deserialize, Serialize};

/// Resource limits applied to every invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Gas available to each top-level transaction.
    #[serde(default = "default_tx_gas_limit")]
    pub tx_gas_limit: u64,

    /// Gas cap for a single permission oracle check.
    #[serde(default = "default_oracle_check_gas")]
    pub oracle_check_gas: u64,

    /// Deepest allowed nesting of call frames.
    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: usize,

    /// Evaluation steps allowed for one parameterized permission.
    #[serde(default = "default_max_param_evaluations")]
    pub max_param_evaluations: usize,
}

fn default_tx_gas_limit() -> u64 {
    10_000_000
}

fn default_oracle_check_gas() -> u64 {
    30_000
}

fn default_max_call_depth() -> usize {
    64
}

fn default_max_param_evaluations() -> usize {
    256
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tx_gas_limit: default_tx_gas_limit(),
            oracle_check_gas: default_oracle_check_gas(),
            max_call_depth: default_max_call_depth(),
            max_param_evaluations: default_max_param_evaluations(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: RuntimeConfig = serde_json::from_str(r#"{"oracle_check_gas": 5}"#).unwrap();
        assert_eq!(config.oracle_check_gas, 5);
        assert_eq!(config.tx_gas_limit, 10_000_000);
        assert_eq!(config.max_call_depth, 64);
    }
}
