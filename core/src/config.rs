use crate::{
    error::{PipelineError, PipelineResult},
    timestamp::DEFAULT_FORMATS,
    types::UNKNOWN_OPERATOR,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name looked up inside the data directory.
pub const CONFIG_FILE: &str = "pipeline_config.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SlaThresholds {
    /// Max seconds from open to first response.
    pub response_seconds: f64,
    /// Max minutes from first response to resolution.
    pub resolution_minutes: f64,
}

impl Default for SlaThresholds {
    fn default() -> Self {
        Self {
            response_seconds: 10.0,
            resolution_minutes: 180.0,
        }
    }
}

/// What the enricher does when a reference table repeats a join key.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JoinPolicy {
    /// Duplicate the ticket once per matching reference row.
    #[default]
    FanOut,
    /// Fail the run on the first duplicated key.
    RequireUnique,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub unknown_operator: String,
    pub timestamp_formats: Vec<String>,
    pub sla: SlaThresholds,
    pub join_policy: JoinPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            unknown_operator: UNKNOWN_OPERATOR.into(),
            timestamp_formats: DEFAULT_FORMATS.iter().map(|f| f.to_string()).collect(),
            sla: SlaThresholds::default(),
            join_policy: JoinPolicy::FanOut,
        }
    }
}

impl PipelineConfig {
    /// Load from `<data_dir>/pipeline_config.json`.
    /// A missing file means defaults; absent fields take their defaults.
    /// In tests, use PipelineConfig::default_test().
    pub fn load(data_dir: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = data_dir.as_ref().join(CONFIG_FILE);
        if !path.exists() {
            log::debug!("no {} in {}, using defaults", CONFIG_FILE, data_dir.as_ref().display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.unknown_operator.trim().is_empty() {
            return Err(PipelineError::InvalidConfig {
                reason: "unknown_operator must not be empty".into(),
            });
        }
        if self.timestamp_formats.is_empty() {
            return Err(PipelineError::InvalidConfig {
                reason: "timestamp_formats must list at least one pattern".into(),
            });
        }
        for (name, value) in [
            ("sla.response_seconds", self.sla.response_seconds),
            ("sla.resolution_minutes", self.sla.resolution_minutes),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PipelineError::InvalidConfig {
                    reason: format!("{name} must be a non-negative number, got {value}"),
                });
            }
        }
        Ok(())
    }
}
