//! Filter step abstractions.

use crate::config::{parse_config, ConfigMap};
use crate::error::ConfigError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Verdict of a single filter step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterResult {
    /// Terminal: the object is admitted.
    Accepted,
    /// Terminal: the object is refused.
    Rejected,
    /// Not terminal: the next step decides.
    NothingDefinite,
}

impl FilterResult {
    /// Returns the terminal verdict as a boolean, or `None` if not terminal.
    pub fn terminal(self) -> Option<bool> {
        match self {
            FilterResult::Accepted => Some(true),
            FilterResult::Rejected => Some(false),
            FilterResult::NothingDefinite => None,
        }
    }
}

/// A domain object type that filter chains can be declared for.
pub trait FilterDomain: Send + Sync + 'static {
    /// Domain type name used in [`FilterChainSetting::domain_type`].
    const DOMAIN_TYPE: &'static str;
}

/// One rule of a filter chain.
///
/// Must be a pure function of the object (plus any memoised lookups the step
/// owns); it cannot fail.
pub trait FilterStep<T>: Send + Sync {
    /// Evaluates the rule.
    fn check(&self, item: &T) -> FilterResult;
}

/// A configured filter step.
///
/// ```json
/// { "step": "BlockedUsers", "config": { "users": ["spammer"] } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterStepDefinition {
    /// Implementation identifier, matched against [`FilterStepFactory::kind`].
    #[serde(rename = "step")]
    pub kind: String,
    /// Implementation-specific options.
    #[serde(default)]
    pub config: ConfigMap,
}

impl FilterStepDefinition {
    /// Creates a definition with an empty config map.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            config: ConfigMap::new(),
        }
    }

    /// Adds a config entry.
    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.config.insert(key.to_string(), value.into());
        self
    }

    /// Reads the typed options for this filter step.
    pub fn config<C: DeserializeOwned>(&self) -> Result<C, ConfigError> {
        parse_config(&self.kind, &self.config)
    }
}

/// A configured, named filter chain.
///
/// ```json
/// {
///   "domain_type": "Post",
///   "default_result": false,
///   "steps": [{ "step": "RejectReposts" }, { "step": "Speaker" }]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterChainSetting {
    /// Domain type the chain evaluates, matched against [`FilterDomain::DOMAIN_TYPE`].
    pub domain_type: String,
    /// Outcome when no step reaches a terminal verdict.
    #[serde(default)]
    pub default_result: bool,
    /// Filter steps in evaluation order.
    #[serde(default)]
    pub steps: Vec<FilterStepDefinition>,
}

/// Builds filter steps of one kind for domain type `T`.
pub trait FilterStepFactory<T>: Send + Sync {
    /// Implementation identifier used in [`FilterStepDefinition::kind`].
    fn kind(&self) -> &'static str;

    /// Builds the step from its definition.
    fn create(&self, definition: &FilterStepDefinition)
        -> Result<Box<dyn FilterStep<T>>, ConfigError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_terminal() {
        assert_eq!(FilterResult::Accepted.terminal(), Some(true));
        assert_eq!(FilterResult::Rejected.terminal(), Some(false));
        assert_eq!(FilterResult::NothingDefinite.terminal(), None);
    }

    #[test]
    fn test_chain_setting_from_json() {
        let setting: FilterChainSetting = serde_json::from_value(json!({
            "domain_type": "Post",
            "steps": [
                { "step": "BlockedUsers", "config": { "users": ["spammer"] } },
                { "step": "RejectReposts" }
            ]
        }))
        .unwrap();
        assert_eq!(setting.domain_type, "Post");
        assert!(!setting.default_result);
        assert_eq!(setting.steps.len(), 2);
        assert_eq!(setting.steps[0].kind, "BlockedUsers");
        assert!(setting.steps[1].config.is_empty());
    }
}
