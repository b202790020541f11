//! Core traits and types for the tweetwall step orchestration engine.
//!
//! This crate carries no scheduler. Implementors of steps, data providers,
//! visualizations and filter steps depend on it alone.
//!
//! # Core Types
//!
//! - [`Step`] / [`StepFactory`] - One stage of the presentation loop
//! - [`MachineContext`] - Shared blackboard passed to every step
//! - [`Proceed`] - Completion signal for the step in flight
//! - [`DataProvider`] / [`DataProviders`] - Shared, long-lived data sources
//! - [`Visualization`] / [`Visualizations`] - Addressable renderable surfaces
//! - [`FilterStep`] / [`FilterResult`] - Rules of a filter chain
//! - [`ConfigError`] / [`StepError`] - Startup and runtime error taxonomy
//!
//! # Optional Traits
//!
//! - [`Showable`] - A visualization that can be shown
//! - [`Controllable`] - A named resource a step can shut down

mod config;
mod context;
mod error;
mod filter;
mod provider;
mod step;
mod traits;
mod visualization;

pub use config::{parse_config, ConfigMap, TimeSpan, TimeUnit};
pub use context::{ContextKey, MachineContext, Proceed};
pub use error::{ConfigError, Family, StepError};
pub use filter::{
    FilterChainSetting, FilterDomain, FilterResult, FilterStep, FilterStepDefinition,
    FilterStepFactory,
};
pub use provider::{
    DataProvider, DataProviderFactory, DataProviderSetting, DataProviders, ProviderInstance,
    ProviderType,
};
pub use step::{Step, StepDefinition, StepFactory, StepName, ThreadAffinity};
pub use traits::{Controllable, Showable};
pub use visualization::{
    ProducedType, Visualization, VisualizationContext, VisualizationFactory,
    VisualizationSetting, Visualizations,
};
