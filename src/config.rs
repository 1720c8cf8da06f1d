use serde::{Deserialize, Serialize};

use crate::utils::get_env_with_prefix;

/// Main configuration for the LeakLock lifecycle engine
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    pub verification: VerificationConfig,
    pub detection: DetectionConfig,
    pub logging: LoggingConfig,
}

/// Settings for pending-change verification sweeps.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VerificationConfig {
    /// Days to wait after an expected renewal before concluding whether a
    /// declared change took effect.
    #[serde(default = "default_grace_days")]
    pub grace_days: u32,
}

/// Settings for evidence-based status detection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DetectionConfig {
    /// Consecutive missed charges before soft evidence is surfaced.
    #[serde(default = "default_soft_evidence_threshold")]
    pub soft_evidence_threshold: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_json")]
    pub json: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            verification: VerificationConfig::default(),
            detection: DetectionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            grace_days: default_grace_days(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            soft_evidence_threshold: default_soft_evidence_threshold(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: default_json(),
        }
    }
}

fn default_grace_days() -> u32 {
    3
}

fn default_soft_evidence_threshold() -> u32 {
    2
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_json() -> bool {
    false
}

/// Builder for EngineConfig
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: EngineConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grace_days(mut self, days: u32) -> Self {
        self.config.verification.grace_days = days;
        self
    }

    pub fn with_soft_evidence_threshold(mut self, missed_charges: u32) -> Self {
        self.config.detection.soft_evidence_threshold = missed_charges;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.config.logging.json = enabled;
        self
    }

    /// Load overrides from the environment.
    ///
    /// Checks `LEAKLOCK_GRACE_DAYS`, `LEAKLOCK_SOFT_EVIDENCE_THRESHOLD`,
    /// `LEAKLOCK_LOG_LEVEL` and `LEAKLOCK_LOG_JSON`, each falling back to
    /// the unprefixed variable name.
    pub fn from_env(mut self) -> Self {
        if let Some(days) = get_env_with_prefix("GRACE_DAYS") {
            if let Ok(d) = days.parse() {
                self.config.verification.grace_days = d;
            }
        }
        if let Some(threshold) = get_env_with_prefix("SOFT_EVIDENCE_THRESHOLD") {
            if let Ok(t) = threshold.parse() {
                self.config.detection.soft_evidence_threshold = t;
            }
        }
        if let Some(level) = get_env_with_prefix("LOG_LEVEL") {
            self.config.logging.level = level;
        }
        if let Some(json) = get_env_with_prefix("LOG_JSON") {
            self.config.logging.json = json.parse().unwrap_or(false);
        }
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.verification.grace_days, 3);
        assert_eq!(config.detection.soft_evidence_threshold, 2);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_builder_overrides() {
        let config = ConfigBuilder::new()
            .with_grace_days(5)
            .with_soft_evidence_threshold(3)
            .with_log_level("debug")
            .build();
        assert_eq!(config.verification.grace_days, 5);
        assert_eq!(config.detection.soft_evidence_threshold, 3);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_from_env() {
        unsafe {
            std::env::set_var("LEAKLOCK_GRACE_DAYS", "7");
        }
        let config = ConfigBuilder::new().from_env().build();
        assert_eq!(config.verification.grace_days, 7);
        unsafe {
            std::env::remove_var("LEAKLOCK_GRACE_DAYS");
        }
    }
}
