//! Application configuration value object

use serde::{Deserialize, Serialize};

use crate::domain::recording::{Duration, DEFAULT_COUNTDOWN};

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Countdown ticks before capture starts
    pub countdown: Option<u32>,
    /// Time between countdown ticks
    pub tick: Option<String>,
    /// Longest single capture session before it is stopped automatically
    pub max_duration: Option<String>,
    /// Play audible cues for countdown and recording events
    pub cues: Option<bool>,
    /// Input device name; system default when unset
    pub device: Option<String>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            countdown: Some(DEFAULT_COUNTDOWN),
            tick: Some(Duration::default_tick().to_string()),
            max_duration: Some(Duration::default_max_duration().to_string()),
            cues: Some(false),
            device: None,
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            countdown: other.countdown.or(self.countdown),
            tick: other.tick.or(self.tick),
            max_duration: other.max_duration.or(self.max_duration),
            cues: other.cues.or(self.cues),
            device: other.device.or(self.device),
        }
    }

    /// Get countdown length, or the default if not set/zero
    pub fn countdown_or_default(&self) -> u32 {
        self.countdown
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_COUNTDOWN)
    }

    /// Get tick as parsed Duration, or default if not set/invalid
    pub fn tick_or_default(&self) -> Duration {
        self.tick
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Duration::default_tick)
    }

    /// Get max_duration as parsed Duration, or default if not set/invalid
    pub fn max_duration_or_default(&self) -> Duration {
        self.max_duration
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Duration::default_max_duration)
    }

    /// Get cues setting, or false if not set
    pub fn cues_or_default(&self) -> bool {
        self.cues.unwrap_or(false)
    }

    /// Get the configured input device name, if any
    pub fn device_name(&self) -> Option<&str> {
        self.device.as_deref().filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_expected_values() {
        let config = AppConfig::defaults();
        assert_eq!(config.countdown, Some(3));
        assert_eq!(config.tick, Some("1s".to_string()));
        assert_eq!(config.max_duration, Some("5m".to_string()));
        assert_eq!(config.cues, Some(false));
        assert!(config.device.is_none());
    }

    #[test]
    fn empty_has_all_none() {
        let config = AppConfig::empty();
        assert!(config.countdown.is_none());
        assert!(config.tick.is_none());
        assert!(config.max_duration.is_none());
        assert!(config.cues.is_none());
        assert!(config.device.is_none());
    }

    #[test]
    fn merge_other_takes_precedence() {
        let base = AppConfig {
            countdown: Some(5),
            tick: Some("1s".to_string()),
            device: Some("USB Mic".to_string()),
            ..Default::default()
        };

        let other = AppConfig {
            countdown: Some(2),
            tick: None, // Should not override
            cues: Some(true),
            ..Default::default()
        };

        let merged = base.merge(other);
        assert_eq!(merged.countdown, Some(2));
        assert_eq!(merged.tick, Some("1s".to_string()));
        assert_eq!(merged.cues, Some(true));
        assert_eq!(merged.device, Some("USB Mic".to_string()));
    }

    #[test]
    fn or_default_falls_back_on_invalid_values() {
        let config = AppConfig {
            countdown: Some(0),
            tick: Some("fast".to_string()),
            max_duration: Some("forever".to_string()),
            ..Default::default()
        };

        assert_eq!(config.countdown_or_default(), 3);
        assert_eq!(config.tick_or_default(), Duration::default_tick());
        assert_eq!(
            config.max_duration_or_default(),
            Duration::default_max_duration()
        );
        assert!(!config.cues_or_default());
    }

    #[test]
    fn parsed_values_are_used() {
        let config = AppConfig {
            countdown: Some(5),
            tick: Some("500ms".to_string()),
            max_duration: Some("30s".to_string()),
            cues: Some(true),
            device: Some(String::new()),
        };

        assert_eq!(config.countdown_or_default(), 5);
        assert_eq!(config.tick_or_default().as_millis(), 500);
        assert_eq!(config.max_duration_or_default().as_secs(), 30);
        assert!(config.cues_or_default());
        // Empty device name means "use the default"
        assert!(config.device_name().is_none());
    }

    #[test]
    fn toml_round_trip_keeps_fields() {
        let config = AppConfig::defaults();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
