//! The settings document of a wall.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::debug;
use tweetwall_core::{
    ConfigError, DataProviderSetting, FilterChainSetting, StepDefinition, VisualizationSetting,
};

/// Everything the bootstrapping layer needs to assemble a wall.
///
/// ```json
/// {
///   "steps": [
///     { "step": "NextTweet" },
///     { "step": "Pause", "config": { "amount": 5 } },
///     { "step": "Show", "config": { "visualization": "schedule" } }
///   ],
///   "data_providers": [{ "implementation": "TweetDataProvider" }],
///   "visualizations": { "schedule": { "implementation": "Agenda" } },
///   "filter_chains": { "wall": { "domain_type": "Post", "default_result": true } }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallSettings {
    /// The step sequence in display order.
    pub steps: Vec<StepDefinition>,
    #[serde(default)]
    pub data_providers: Vec<DataProviderSetting>,
    /// Visualizations keyed by identifier.
    #[serde(default)]
    pub visualizations: BTreeMap<String, VisualizationSetting>,
    /// Filter chains keyed by name.
    #[serde(default)]
    pub filter_chains: HashMap<String, FilterChainSetting>,
}

impl WallSettings {
    /// Parses settings from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json).map_err(ConfigError::Parse)?;
        debug!(
            "Parsed settings with {} steps, {} data providers, {} visualizations",
            settings.steps.len(),
            settings.data_providers.len(),
            settings.visualizations.len()
        );
        Ok(settings)
    }

    /// Reads and parses a JSON settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }
}
