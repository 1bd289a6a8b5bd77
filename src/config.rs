//! Optimizer settings.
//!
//! Every field has a default, so a config can be deserialized from a partial document:
//!
//! ```ignore
//! {"max_iter_times": 20, "subplan_reuse": {"validate_merges": false}}
//! ```

use anyhow::ensure;
use serde::Deserialize;

use crate::error::{OptResult, OptimizerError};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Max number of times the heuristic optimizer runs its batch of rules.
    pub max_iter_times: usize,
    pub subplan_reuse: SubplanReuseConfig,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iter_times: 100,
            subplan_reuse: SubplanReuseConfig::default(),
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> OptResult<()> {
        ensure!(
            self.max_iter_times > 0,
            OptimizerError::InvalidConfig("max_iter_times must be positive".to_string())
        );
        ensure!(
            self.subplan_reuse.max_passes != Some(0),
            OptimizerError::InvalidConfig("subplan_reuse.max_passes must be positive".to_string())
        );
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct SubplanReuseConfig {
    pub enabled: bool,
    /// Checks every rewritten node before a merge is committed and declines merges that would
    /// leave an expression without a matching input column.
    pub validate_merges: bool,
    /// Caps the number of merges a single application of the rule performs.
    pub max_passes: Option<usize>,
}

impl Default for SubplanReuseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            validate_merges: true,
            max_passes: None,
        }
    }
}

/// Read-only state shared by all rules of one optimizer run.
#[derive(Clone, Debug, Default)]
pub struct OptimizerContext {
    config: OptimizerConfig,
}

impl OptimizerContext {
    pub fn new(config: OptimizerConfig) -> OptResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config() {
        let config: OptimizerConfig =
            serde_json::from_str(r#"{"subplan_reuse": {"validate_merges": false}}"#).unwrap();
        assert_eq!(100, config.max_iter_times);
        assert!(config.subplan_reuse.enabled);
        assert!(!config.subplan_reuse.validate_merges);
        assert_eq!(None, config.subplan_reuse.max_passes);
    }

    #[test]
    fn test_invalid_config() {
        let config: OptimizerConfig =
            serde_json::from_str(r#"{"subplan_reuse": {"max_passes": 0}}"#).unwrap();
        let err = OptimizerContext::new(config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<OptimizerError>(),
            Some(OptimizerError::InvalidConfig(_))
        ));

        let config = OptimizerConfig {
            max_iter_times: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(OptimizerConfig::default().validate().is_ok());
    }
}
