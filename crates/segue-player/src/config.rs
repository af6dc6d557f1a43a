//! Runtime configuration for the playback controller.

use std::time::Duration;

use segue_core::Result;
use serde::{Deserialize, Serialize};

/// Delay before advancing past an item that failed to load.
const DEFAULT_AUTO_ADVANCE_DELAY_MS: u64 = 500;

/// How long duration/time reads wait for a loading item.
const DEFAULT_READINESS_TIMEOUT_MS: u64 = 10_000;

/// Default step for relative seeks.
const DEFAULT_SEEK_STEP_SECS: f64 = 10.0;

/// Events buffered per subscriber before the slowest one starts lagging.
const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Playback controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerConfig {
    pub auto_advance_delay_ms: u64,
    pub readiness_timeout_ms: u64,
    pub seek_step_secs: f64,
    pub event_capacity: usize,
    /// Honour the "should resume" hint when an interruption ends.
    pub resume_after_interruption: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            auto_advance_delay_ms: DEFAULT_AUTO_ADVANCE_DELAY_MS,
            readiness_timeout_ms: DEFAULT_READINESS_TIMEOUT_MS,
            seek_step_secs: DEFAULT_SEEK_STEP_SECS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            resume_after_interruption: true,
        }
    }
}

impl PlayerConfig {
    /// Parse a JSON document; missing keys fall back to defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub const fn auto_advance_delay(&self) -> Duration {
        Duration::from_millis(self.auto_advance_delay_ms)
    }

    pub const fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    #[must_use]
    pub fn with_auto_advance_delay(mut self, delay: Duration) -> Self {
        self.auto_advance_delay_ms = delay.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn with_readiness_timeout(mut self, timeout: Duration) -> Self {
        self.readiness_timeout_ms = timeout.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn with_seek_step(mut self, seconds: f64) -> Self {
        self.seek_step_secs = seconds;
        self
    }

    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_resume_after_interruption(mut self, resume: bool) -> Self {
        self.resume_after_interruption = resume;
        self
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlayerConfig::default();
        assert_eq!(config.readiness_timeout(), Duration::from_secs(10));
        assert_eq!(config.auto_advance_delay(), Duration::from_millis(500));
        assert!((config.seek_step_secs - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = PlayerConfig::from_json_str(r#"{ "autoAdvanceDelayMs": 50 }"#).unwrap();
        assert_eq!(config.auto_advance_delay(), Duration::from_millis(50));
        assert_eq!(config.event_capacity, 256);
        assert!(config.resume_after_interruption);
    }

    #[test]
    fn test_invalid_json() {
        assert!(PlayerConfig::from_json_str("{ nope").is_err());
    }
}
