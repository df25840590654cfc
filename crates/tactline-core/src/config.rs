//! Editor configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, TactlineError};

/// Tunables for the arrangement editor and its playback thread.
///
/// Every field has a default, so a partial JSON file is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Maximum number of undo steps kept; the oldest are dropped first.
    pub journal_depth: usize,
    /// Capacity of each notification channel. `None` means unbounded.
    pub event_capacity: Option<usize>,
    /// Default log filter for the binary.
    pub log_level: String,
    /// Ticks the playback thread advances per pass.
    pub playback_step_ticks: i64,
    /// Delay between playback passes.
    pub playback_interval_ms: u64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            journal_depth: 200,
            event_capacity: None,
            log_level: "info".to_string(),
            playback_step_ticks: 48,
            playback_interval_ms: 10,
        }
    }
}

impl TimelineConfig {
    /// Parse a configuration from JSON bytes.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let config: Self = serde_json::from_slice(data)
            .map_err(|e| TactlineError::Config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| TactlineError::io(e, path))?;
        Self::from_json(&data)
    }

    fn validate(&self) -> Result<()> {
        if self.journal_depth == 0 {
            return Err(TactlineError::Config(
                "journal_depth must be at least 1".to_string(),
            ));
        }
        if self.playback_step_ticks <= 0 {
            return Err(TactlineError::Config(format!(
                "playback_step_ticks must be positive, got {}",
                self.playback_step_ticks
            )));
        }
        if self.event_capacity == Some(0) {
            return Err(TactlineError::Config(
                "event_capacity must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}
