//! Configuration structures for codebook-core.
//!
//! This module defines explicit, serializable configuration objects used by
//! higher-level components (CLI, API handlers) to control tree limits, job
//! rules and the defaults of the condition engine.
//!
//! The core crate itself does not read environment variables or files. All
//! configuration must be provided explicitly by the caller.

use serde::{Deserialize, Serialize};

use crate::errors::{CodebookError, CodebookResult};
use crate::model::{ActionKind, UnitType};

/// Global configuration container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub limits: TreeLimits,
    pub rules: Rules,
    pub conditions: ConditionDefaults,
}

/// Resource limits applied while sorting and mutating a codebook tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TreeLimits {
    pub max_depth: usize,
    pub max_nodes: usize,
}

impl Default for TreeLimits {
    fn default() -> Self {
        Self {
            max_depth: 32,
            max_nodes: 10_000,
        }
    }
}

/// Job rules consulted by navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Rules {
    pub can_go_back: bool,
    pub can_skip: bool,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            can_go_back: true,
            can_skip: false,
        }
    }
}

/// Per unit-type fallbacks used when a conditional leaves a field unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitTypeDefaults {
    #[serde(default)]
    pub on_success: Option<ActionKind>,
    #[serde(default)]
    pub on_fail: Option<ActionKind>,
    #[serde(default)]
    pub damage: f64,
    /// Generate a markdown retry message when a failing conditional has none.
    #[serde(default)]
    pub retry_message: bool,
}

/// Defaults for the condition engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConditionDefaults {
    pub train: UnitTypeDefaults,
    pub test: UnitTypeDefaults,
}

impl Default for ConditionDefaults {
    fn default() -> Self {
        Self {
            train: UnitTypeDefaults {
                on_success: Some(ActionKind::Applaud),
                on_fail: Some(ActionKind::Retry),
                damage: 0.0,
                retry_message: true,
            },
            test: UnitTypeDefaults {
                on_success: None,
                on_fail: None,
                damage: 10.0,
                retry_message: false,
            },
        }
    }
}

impl ConditionDefaults {
    /// Defaults for a unit type, or `None` when the engine does not evaluate
    /// units of that type.
    pub fn for_unit_type(&self, unit_type: &UnitType) -> Option<&UnitTypeDefaults> {
        match unit_type {
            UnitType::Train => Some(&self.train),
            UnitType::Test => Some(&self.test),
            _ => None,
        }
    }
}

/// Validate a full configuration object.
pub fn validate_config(cfg: &EngineConfig) -> CodebookResult<()> {
    if cfg.limits.max_depth == 0 {
        return Err(CodebookError::invalid_argument(
            "maxDepth must be greater than zero",
        ));
    }

    if cfg.limits.max_nodes == 0 {
        return Err(CodebookError::invalid_argument(
            "maxNodes must be greater than zero",
        ));
    }

    for (label, d) in [("train", &cfg.conditions.train), ("test", &cfg.conditions.test)] {
        if !d.damage.is_finite() || d.damage < 0.0 {
            return Err(CodebookError::invalid_argument(format!(
                "{label} damage must be a finite, non-negative number"
            )));
        }
    }

    Ok(())
}

/// Parse and validate a JSON configuration document.
pub fn config_from_json(raw: &str) -> CodebookResult<EngineConfig> {
    let cfg: EngineConfig = serde_json::from_str(raw)
        .map_err(|e| CodebookError::serialization(format!("failed to parse config: {e}")))?;
    validate_config(&cfg)?;
    Ok(cfg)
}
