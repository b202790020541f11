//! Error taxonomy.
//!
//! [`ConfigError`] covers everything that can go wrong while wiring the wall
//! together at startup; it is always fatal. [`StepError`] is what a single
//! step invocation reports at runtime; the engine logs it and moves on.

use crate::step::StepName;
use thiserror::Error;

/// The family of pluggable implementation a factory or setting belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Presentation loop steps.
    Step,
    /// Shared data providers.
    DataProvider,
    /// Renderable surfaces.
    Visualization,
    /// Filter chain steps.
    FilterStep,
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Family::Step => write!(f, "step"),
            Family::DataProvider => write!(f, "data provider"),
            Family::Visualization => write!(f, "visualization"),
            Family::FilterStep => write!(f, "filter step"),
        }
    }
}

/// Startup-time configuration errors.
///
/// None of these are ever deferred to evaluation time: the wall refuses to
/// start rather than run partially configured.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// No factory is registered for the requested implementation.
    #[error("no {family} factory registered for '{kind}'")]
    MissingFactory {
        /// Which registry was consulted.
        family: Family,
        /// The implementation identifier that was looked up.
        kind: String,
    },

    /// A required implementation has a factory but no setting.
    #[error("no {family} setting configured for '{kind}'")]
    MissingSetting {
        /// Which kind of setting is missing.
        family: Family,
        /// The implementation identifier without a setting.
        kind: String,
    },

    /// Two settings name the same implementation.
    #[error("{family} '{kind}' is configured more than once")]
    DuplicateSetting {
        /// Which kind of setting is repeated.
        family: Family,
        /// The repeated implementation identifier.
        kind: String,
    },

    /// Two factories claim the same implementation identifier.
    #[error("duplicate {family} factory for '{kind}'")]
    DuplicateFactory {
        /// Which registry rejected the registration.
        family: Family,
        /// The contested implementation identifier.
        kind: String,
    },

    /// Two factories produce the same concrete type.
    #[error("{family} factories '{first}' and '{second}' both produce {produced}")]
    DuplicateProducedType {
        /// Which registry rejected the registration.
        family: Family,
        /// Rust type name of the contested product.
        produced: &'static str,
        /// Identifier of the factory registered first.
        first: String,
        /// Identifier of the factory registered second.
        second: String,
    },

    /// Two visualization settings share one identifier.
    #[error("visualization id '{0}' is configured more than once")]
    DuplicateVisualization(String),

    /// A filter chain was requested for a domain type it was not declared for.
    #[error("filter chain '{chain}' is declared for domain '{declared}', requested for '{requested}'")]
    DomainMismatch {
        /// Name of the filter chain.
        chain: String,
        /// Domain type named in the chain's settings.
        declared: String,
        /// Domain type the caller asked for.
        requested: &'static str,
    },

    /// No filter chain with this name is configured.
    #[error("no filter chain named '{0}'")]
    UnknownFilterChain(String),

    /// The step sequence has no entries.
    #[error("step sequence must contain at least one step")]
    EmptySequence,

    /// An implementation's options could not be read from its config map.
    #[error("invalid configuration for '{kind}': {source}")]
    InvalidConfig {
        /// The implementation identifier whose config was rejected.
        kind: String,
        /// The underlying deserialisation error.
        #[source]
        source: serde_json::Error,
    },

    /// The settings document could not be parsed.
    #[error("failed to parse settings: {0}")]
    Parse(#[source] serde_json::Error),

    /// The settings document could not be read.
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    /// The UI platform could not be started.
    #[error("failed to start UI platform: {0}")]
    Platform(String),
}

/// Errors reported by a single step invocation.
///
/// The engine never propagates these: it logs them and treats the step as
/// having proceeded.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StepError {
    /// The step body failed.
    #[error("Step failed: {step_name}, details: {details}")]
    Failed {
        /// The name of the step that failed.
        step_name: StepName,
        /// Details about the failure.
        details: String,
    },

    /// A data provider the step relies on was not resolved.
    #[error("data provider {0} is not available")]
    MissingDataProvider(&'static str),

    /// No visualization is registered under the given id.
    #[error("no visualization with id '{0}'")]
    MissingVisualization(String),

    /// The visualization exists but cannot be shown.
    #[error("visualization '{0}' does not support show")]
    NotShowable(String),

    /// No controllable resource is registered under the given name.
    #[error("no controllable named '{0}'")]
    MissingControllable(String),

    /// A visualization reported a rendering failure.
    #[error("visualization '{id}' failed: {details}")]
    Visualization {
        /// Identifier of the failing visualization.
        id: String,
        /// Details about the failure.
        details: String,
    },
}

impl StepError {
    /// Shorthand for [`StepError::Failed`].
    pub fn failed(step_name: impl Into<StepName>, details: impl Into<String>) -> Self {
        StepError::Failed {
            step_name: step_name.into(),
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_error_display() {
        let error = StepError::failed("Pause", "clock went backwards");
        assert_eq!(
            error.to_string(),
            "Step failed: Pause, details: clock went backwards"
        );
    }

    #[test]
    fn test_config_error_display() {
        let error = ConfigError::MissingFactory {
            family: Family::Visualization,
            kind: "Agenda".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "no visualization factory registered for 'Agenda'"
        );

        let error = ConfigError::DomainMismatch {
            chain: "incoming".to_string(),
            declared: "Session".to_string(),
            requested: "Post",
        };
        assert_eq!(
            error.to_string(),
            "filter chain 'incoming' is declared for domain 'Session', requested for 'Post'"
        );
    }

    #[test]
    fn test_family_display() {
        assert_eq!(Family::Step.to_string(), "step");
        assert_eq!(Family::FilterStep.to_string(), "filter step");
    }
}
