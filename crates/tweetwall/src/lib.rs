//! A perpetually cycling presentation wall.
//!
//! The [`StepEngine`] runs a configured step sequence forever on the tokio
//! runtime, marshalling UI-affine steps onto a single [`UiThread`]. Content
//! reaches the wall through shared data providers, gated by
//! [`FilterChain`]s.
//!
//! # Example
//!
//! ```rust,ignore
//! use tweetwall::prelude::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ConfigError> {
//!     let tweets = std::sync::Arc::new(TweetProvider::default());
//!     let mut providers = DataProviders::new();
//!     providers.insert(tweets.clone());
//!
//!     let handle = StepEngine::builder()
//!         .add_step("next", NextTweet::signalling("no-news"))
//!         .add_step("pause", Pause::new(Duration::from_secs(5)).skip_on("no-news"))
//!         .data_providers(providers)
//!         .build()?
//!         .start();
//!
//!     tweets.offer(Post::new("1", "duke", "Hello wall"));
//!     handle.wait_for_cycles(1).await;
//!     handle.shutdown().await;
//!     Ok(())
//! }
//! ```

mod bootstrap;
mod engine;
mod filter_chain;
pub mod filters;
pub mod logging;
mod platform;
pub mod providers;
mod registry;
mod remote;
mod settings;
pub mod steps;

// Re-export core types
pub use tweetwall_core::*;

pub use bootstrap::{resolve, Registries, ResolvedWall};
pub use engine::{
    ConfiguredStep, EngineConfig, EngineHandle, EngineState, EngineStatus, StepEngine,
    StepEngineBuilder,
};
pub use filter_chain::{
    FilterChain, FilterChainFactory, FilterStepRegistry, FilterStepRegistryBuilder,
};
pub use platform::{Platform, PlatformClosed, UiJob, UiThread, UI_THREAD_NAME};
pub use registry::{
    DataProviderRegistry, DataProviderRegistryBuilder, StepRegistry, StepRegistryBuilder,
    VisualizationRegistry, VisualizationRegistryBuilder,
};
pub use remote::{RemoteCommand, UnknownCommand};
pub use settings::WallSettings;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::filters::{Post, SpeakerHandleCache};
    pub use crate::providers::{ScheduleProvider, Session, TweetProvider};
    pub use crate::steps::{NextTweet, Pause, ScheduleRefresh, Show, Shutdown};
    pub use crate::{
        resolve, ConfigError, ConfiguredStep, ContextKey, DataProviders, EngineHandle,
        EngineState, FilterChain, FilterChainFactory, FilterResult, FilterStep,
        MachineContext, Registries, RemoteCommand, Showable, Step, StepEngine, StepError,
        StepName, ThreadAffinity, Visualization, VisualizationContext, Visualizations,
        WallSettings,
    };
}
