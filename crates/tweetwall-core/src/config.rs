//! Opaque per-implementation configuration maps.

use crate::error::ConfigError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The opaque options an implementation receives from the settings document.
pub type ConfigMap = serde_json::Map<String, serde_json::Value>;

/// Deserialises an implementation's typed options out of its config map.
///
/// Missing keys fall back to the target type's serde defaults, so an empty map
/// is valid for any config struct whose fields all have defaults.
pub fn parse_config<C: DeserializeOwned>(kind: &str, map: &ConfigMap) -> Result<C, ConfigError> {
    serde_json::from_value(serde_json::Value::Object(map.clone())).map_err(|source| {
        ConfigError::InvalidConfig {
            kind: kind.to_string(),
            source,
        }
    })
}

/// Unit of a configured [`TimeSpan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    /// Milliseconds.
    Millis,
    /// Seconds.
    #[default]
    Seconds,
    /// Minutes.
    Minutes,
}

/// A configured duration, written as `{ "amount": 5, "unit": "seconds" }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSpan {
    /// How many units.
    pub amount: u64,
    /// Which unit; seconds when omitted.
    #[serde(default)]
    pub unit: TimeUnit,
}

impl TimeSpan {
    /// Creates a span of `amount` units.
    pub fn new(amount: u64, unit: TimeUnit) -> Self {
        Self { amount, unit }
    }

    /// Converts the span into a [`Duration`].
    pub fn as_duration(&self) -> Duration {
        match self.unit {
            TimeUnit::Millis => Duration::from_millis(self.amount),
            TimeUnit::Seconds => Duration::from_secs(self.amount),
            TimeUnit::Minutes => Duration::from_secs(self.amount.saturating_mul(60)),
        }
    }
}
