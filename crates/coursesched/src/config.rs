//! Configuration for the scheduling engine
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::engine::{ExtraPolicy, SearchLimits};
use crate::time::TimeGrid;

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tunables for one scheduling session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Block granularity; fixed for the lifetime of a loaded catalog
    pub minutes_per_block: u16,
    pub max_schedules: usize,
    pub max_search_nodes: u64,
    /// How long the background pre-scheduler waits for further edits
    pub debounce_ms: u64,
    pub extra_policy: ExtraPolicy,
    pub cancel_check_interval: u64,
}

impl EngineConfig {
    /// Loads a config from a JSON file
    ///
    /// # Arguments
    /// * `path` - JSON file; missing fields keep their defaults
    ///
    /// # Returns
    /// * `Ok(EngineConfig)` - Parsed configuration
    /// * `Err` - If the file can't be read or parsed
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// The block grid this config describes.
    ///
    /// # Panics
    ///
    /// Panics if `minutes_per_block` is zero or longer than a day.
    pub fn grid(&self) -> TimeGrid {
        TimeGrid::new(self.minutes_per_block)
    }

    pub fn limits(&self) -> SearchLimits {
        SearchLimits {
            max_schedules: self.max_schedules,
            max_nodes: self.max_search_nodes,
            cancel_check_interval: self.cancel_check_interval,
            extra_policy: self.extra_policy,
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            minutes_per_block: 5,
            max_schedules: 100_000,
            max_search_nodes: 20_000_000,
            debounce_ms: 150,
            extra_policy: ExtraPolicy::AnySubset,
            cancel_check_interval: 4096,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "minutes_per_block": 30, "extra_policy": "maximal_only" }"#)
                .unwrap();
        assert_eq!(config.minutes_per_block, 30);
        assert_eq!(config.extra_policy, ExtraPolicy::MaximalOnly);
        assert_eq!(config.max_schedules, 100_000);
        assert_eq!(config.grid().blocks_per_day(), 48);
        assert_eq!(config.limits().max_nodes, 20_000_000);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("coursesched-config-{}.json", std::process::id()));
        fs::write(&path, r#"{ "debounce_ms": 10 }"#).unwrap();
        let config = EngineConfig::load_from_file(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(config.debounce(), Duration::from_millis(10));

        assert!(matches!(
            EngineConfig::load_from_file(Path::new("/nonexistent/coursesched.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
