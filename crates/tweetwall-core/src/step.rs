//! Step trait and related types.

use crate::config::{parse_config, ConfigMap};
use crate::context::MachineContext;
use crate::error::{ConfigError, StepError};
use crate::provider::ProviderType;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Type-safe step name wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StepName(String);

impl StepName {
    /// Creates a new StepName.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a StepName from a type's name (extracts last segment).
    pub fn from_type_name<T: ?Sized>() -> Self {
        let full_name = std::any::type_name::<T>();
        let short_name = full_name.rsplit("::").next().unwrap_or("UnknownStep");
        Self::new(short_name)
    }

    /// Returns the step name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StepName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StepName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for StepName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for StepName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Where a step's body has to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadAffinity {
    /// On the single UI/render thread.
    #[default]
    UiThread,
    /// On any worker thread, keeping the UI thread free.
    AnyThread,
}

/// One stage of the presentation loop.
///
/// The engine calls [`should_skip`](Step::should_skip) first; unless it
/// returns `true`, [`do_step`](Step::do_step) runs exactly once on the thread
/// chosen by [`affinity`](Step::affinity). The engine then waits until
/// [`MachineContext::proceed`] has been called (inline or later, from any
/// thread) and holds the result on screen for
/// [`preferred_step_duration`](Step::preferred_step_duration).
///
/// Steps are shared across loop iterations and may keep interior state.
///
/// # Examples
///
/// ```
/// use tweetwall_core::{MachineContext, Step, StepError};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct Announce;
///
/// #[async_trait]
/// impl Step for Announce {
///     async fn do_step(&self, ctx: &mut MachineContext) -> Result<(), StepError> {
///         ctx.insert("announced", true);
///         ctx.proceed();
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Step: Send + Sync + fmt::Debug {
    /// Performs the step's work.
    ///
    /// Must eventually lead to [`MachineContext::proceed`] being called,
    /// either directly or through a handle obtained from
    /// [`MachineContext::proceed_handle`]. Returning an error counts as having
    /// proceeded.
    async fn do_step(&self, ctx: &mut MachineContext) -> Result<(), StepError>;

    /// Returns `true` to pass over this step for the current iteration.
    fn should_skip(&self, _ctx: &MachineContext) -> bool {
        false
    }

    /// How long the step's visual state is held after it proceeded.
    fn preferred_step_duration(&self, _ctx: &MachineContext) -> Duration {
        Duration::ZERO
    }

    /// Thread the step's body must run on.
    fn affinity(&self) -> ThreadAffinity {
        ThreadAffinity::UiThread
    }

    /// Returns the step name.
    fn name(&self) -> StepName {
        StepName::from_type_name::<Self>()
    }
}

/// A configured entry of the step sequence.
///
/// ```json
/// { "step": "Pause", "config": { "amount": 5, "unit": "seconds" } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Implementation identifier, matched against [`StepFactory::kind`].
    #[serde(rename = "step")]
    pub kind: String,
    /// Display name for logs; defaults to the kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Implementation-specific options.
    #[serde(default)]
    pub config: ConfigMap,
}

impl StepDefinition {
    /// Creates a definition with an empty config map.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: None,
            config: ConfigMap::new(),
        }
    }

    /// Adds a config entry.
    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.config.insert(key.to_string(), value.into());
        self
    }

    /// Sets the display name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The name the engine logs this step under.
    pub fn step_name(&self) -> StepName {
        StepName::new(self.name.clone().unwrap_or_else(|| self.kind.clone()))
    }

    /// Reads the typed options for this step.
    pub fn config<C: DeserializeOwned>(&self) -> Result<C, ConfigError> {
        parse_config(&self.kind, &self.config)
    }
}

/// Builds [`Step`] instances of one kind from their definitions.
pub trait StepFactory: Send + Sync {
    /// Implementation identifier used in [`StepDefinition::kind`].
    fn kind(&self) -> &'static str;

    /// Builds a step from its definition.
    fn create(&self, definition: &StepDefinition) -> Result<Arc<dyn Step>, ConfigError>;

    /// Data providers the step built from `definition` reads.
    fn required_data_providers(&self, _definition: &StepDefinition) -> Vec<ProviderType> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct IdleStep;

    #[async_trait]
    impl Step for IdleStep {
        async fn do_step(&self, ctx: &mut MachineContext) -> Result<(), StepError> {
            ctx.proceed();
            Ok(())
        }
    }

    #[test]
    fn test_step_name() {
        let name = StepName::new("test");
        assert_eq!(name.as_str(), "test");

        let name: StepName = "test".into();
        assert_eq!(name.as_str(), "test");
    }

    #[test]
    fn test_step_defaults() {
        let step = IdleStep;
        let ctx = MachineContext::new();
        assert_eq!(step.name(), StepName::new("IdleStep"));
        assert_eq!(step.affinity(), ThreadAffinity::UiThread);
        assert!(!step.should_skip(&ctx));
        assert_eq!(step.preferred_step_duration(&ctx), Duration::ZERO);
    }

    #[test]
    fn test_step_definition_from_json() {
        let definition: StepDefinition = serde_json::from_value(json!({
            "step": "Show",
            "config": { "visualization": "schedule" }
        }))
        .unwrap();
        assert_eq!(definition.kind, "Show");
        assert_eq!(definition.step_name(), StepName::new("Show"));
        assert_eq!(
            definition.config.get("visualization"),
            Some(&json!("schedule"))
        );

        let named = StepDefinition::new("Pause").named("short pause");
        assert_eq!(named.step_name(), StepName::new("short pause"));
        assert!(named.config.is_empty());
    }
}
