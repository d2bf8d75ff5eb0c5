//! Engine configuration.
//!
//! Loaded from TOML, then adjusted by `EXPIRY_ENGINE_*` environment
//! overrides. Every field has a default, so an empty file is a valid config.
//!
//! ```toml
//! active = true
//! max_event_rounds = 64
//!
//! [labels]
//! days = "Tage"
//! off = "Inaktiv"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::policy::UnitLabels;

/// Environment variable overriding [`EngineConfig::active`].
pub const ENV_ACTIVE: &str = "EXPIRY_ENGINE_ACTIVE";
/// Environment variable overriding [`EngineConfig::max_event_rounds`].
pub const ENV_MAX_EVENT_ROUNDS: &str = "EXPIRY_ENGINE_MAX_EVENT_ROUNDS";

/// Smallest round limit that lets a write-back's own notification settle.
pub const MIN_EVENT_ROUNDS: u32 = 2;

/// Runtime configuration for an [`ExpiryEngine`](crate::engine::ExpiryEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Global enable switch. When false, mutations never trigger
    /// recalculation; queries and explicit actions still work.
    pub active: bool,

    /// Drain rounds `process_pending` runs before giving up. An applied
    /// recalculation needs two: its own event and the write-back's echo.
    pub max_event_rounds: u32,

    /// Display labels.
    pub labels: UnitLabels,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            active: true,
            max_event_rounds: 64,
            labels: UnitLabels::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file, apply process environment overrides, validate.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.display().to_string(), e.to_string()))?;
        let mut config: Self =
            toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        config.apply_overrides(std::env::vars())?;
        config.validate()?;
        tracing::debug!(path = %path.display(), active = config.active, "Loaded engine config");
        Ok(config)
    }

    /// Defaults plus process environment overrides.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_overrides(std::env::vars())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `EXPIRY_ENGINE_*` overrides from key/value pairs. Other keys
    /// are ignored.
    pub fn apply_overrides<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let value = value.as_ref().trim();
            match key.as_ref() {
                ENV_ACTIVE => self.active = parse_bool(ENV_ACTIVE, value)?,
                ENV_MAX_EVENT_ROUNDS => {
                    self.max_event_rounds = value.parse().map_err(|_| {
                        ConfigError::ValidationError(format!(
                            "{ENV_MAX_EVENT_ROUNDS} must be a positive integer, got '{value}'"
                        ))
                    })?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Check values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_event_rounds < MIN_EVENT_ROUNDS {
            return Err(ConfigError::ValidationError(format!(
                "max_event_rounds must be >= {MIN_EVENT_ROUNDS}"
            ))
            .into());
        }
        let labels = [
            ("days", &self.labels.days),
            ("weeks", &self.labels.weeks),
            ("months", &self.labels.months),
            ("years", &self.labels.years),
            ("hours", &self.labels.hours),
            ("off", &self.labels.off),
            ("inherit", &self.labels.inherit),
        ];
        for (name, label) in labels {
            if label.trim().is_empty() {
                return Err(
                    ConfigError::ValidationError(format!("labels.{name} must not be empty")).into(),
                );
            }
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::ValidationError(format!(
            "{key} must be a boolean, got '{value}'"
        ))
        .into()),
    }
}
