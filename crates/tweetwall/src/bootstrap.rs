//! Turns a settings document into a ready-to-build engine.
//!
//! Every factory lookup, provider instantiation and visualization build
//! happens here, before the loop starts, so configuration errors surface as
//! a [`ConfigError`] from [`resolve`] instead of a half-running wall.

use crate::engine::{ConfiguredStep, StepEngine, StepEngineBuilder};
use crate::filter_chain::{FilterChainFactory, FilterStepRegistry};
use crate::filters::SpeakerHandleCache;
use crate::providers::{ScheduleProviderFactory, ScheduleSource, TweetProviderFactory};
use crate::registry::{DataProviderRegistry, StepRegistry, VisualizationRegistry};
use crate::settings::WallSettings;
use std::fmt;
use std::sync::Arc;
use tracing::info;
use tweetwall_core::{ConfigError, DataProviders, Visualizations};

/// The factory registries a wall is resolved against.
#[derive(Debug)]
pub struct Registries {
    pub steps: StepRegistry,
    pub data_providers: DataProviderRegistry,
    pub visualizations: VisualizationRegistry,
}

impl Registries {
    /// Registries holding every built-in step and data provider.
    ///
    /// Filter chains named by provider settings are built from
    /// `settings.filter_chains`; `Speaker` filter steps consult
    /// `speakers`. No visualization is registered.
    pub fn with_defaults(
        settings: &WallSettings,
        speakers: Arc<SpeakerHandleCache>,
        schedule: Arc<dyn ScheduleSource>,
    ) -> Result<Self, ConfigError> {
        let filters = Arc::new(FilterChainFactory::new(
            settings.filter_chains.clone(),
            FilterStepRegistry::post_defaults(speakers)?,
        ));
        Ok(Self {
            steps: StepRegistry::with_defaults()?,
            data_providers: DataProviderRegistry::builder()
                .register(TweetProviderFactory::with_filters(filters))
                .register(ScheduleProviderFactory::new(schedule))
                .build()?,
            visualizations: VisualizationRegistry::default(),
        })
    }

    /// Replaces the visualization registry.
    pub fn with_visualizations(mut self, visualizations: VisualizationRegistry) -> Self {
        self.visualizations = visualizations;
        self
    }
}

/// The fully resolved parts of a wall.
pub struct ResolvedWall {
    pub steps: Vec<ConfiguredStep>,
    pub data_providers: DataProviders,
    pub visualizations: Visualizations,
}

impl fmt::Debug for ResolvedWall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedWall")
            .field("steps", &self.steps)
            .field("data_providers", &self.data_providers)
            .field("visualizations", &self.visualizations)
            .finish()
    }
}

impl ResolvedWall {
    /// An engine builder preloaded with the resolved parts.
    pub fn engine_builder(self) -> StepEngineBuilder {
        StepEngine::builder()
            .steps(self.steps)
            .data_providers(self.data_providers)
            .visualizations(self.visualizations)
    }
}

/// Resolves `settings` against `registries`.
///
/// Builds every step, then exactly one instance of each data provider type
/// any step requires, then every configured visualization.
pub fn resolve(
    settings: &WallSettings,
    registries: &Registries,
) -> Result<ResolvedWall, ConfigError> {
    if settings.steps.is_empty() {
        return Err(ConfigError::EmptySequence);
    }

    let mut steps = Vec::with_capacity(settings.steps.len());
    let mut required = Vec::new();
    for definition in &settings.steps {
        let factory = registries.steps.get(&definition.kind)?;
        required.extend(factory.required_data_providers(definition));
        steps.push(ConfiguredStep::new(
            definition.step_name(),
            factory.create(definition)?,
        ));
    }

    let data_providers = registries
        .data_providers
        .resolve(required, &settings.data_providers)?;
    let visualizations = registries.visualizations.resolve(
        settings
            .visualizations
            .iter()
            .map(|(id, setting)| (id.as_str(), setting)),
    )?;

    info!(
        "Resolved wall: {} steps, {} data providers, {} visualizations",
        steps.len(),
        data_providers.len(),
        visualizations.len()
    );
    Ok(ResolvedWall {
        steps,
        data_providers,
        visualizations,
    })
}
