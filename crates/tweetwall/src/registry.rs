//! Explicit factory registries for steps, data providers and visualizations.
//!
//! Each registry is assembled once at startup through a builder; `build()`
//! rejects ambiguous registrations so lookups can never silently pick one of
//! two candidates.

use crate::steps;
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use tweetwall_core::{
    ConfigError, DataProviderFactory, DataProviderSetting, DataProviders, Family, ProviderType,
    StepFactory, VisualizationFactory, VisualizationSetting, Visualizations,
};

/// Step factories keyed by kind.
#[derive(Default)]
pub struct StepRegistry {
    factories: HashMap<&'static str, Arc<dyn StepFactory>>,
}

impl fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRegistry")
            .field("kinds", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl StepRegistry {
    /// Creates a new registry builder.
    pub fn builder() -> StepRegistryBuilder {
        StepRegistryBuilder::default()
    }

    /// A registry holding every built-in step.
    pub fn with_defaults() -> Result<Self, ConfigError> {
        Self::builder().with_defaults().build()
    }

    /// Looks up the factory for `kind`.
    pub fn get(&self, kind: &str) -> Result<&Arc<dyn StepFactory>, ConfigError> {
        self.factories
            .get(kind)
            .ok_or_else(|| ConfigError::MissingFactory {
                family: Family::Step,
                kind: kind.to_string(),
            })
    }

    /// Returns `true` if a factory for `kind` is registered.
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }
}

/// Builder for [`StepRegistry`].
#[derive(Default)]
pub struct StepRegistryBuilder {
    factories: Vec<Arc<dyn StepFactory>>,
}

impl StepRegistryBuilder {
    /// Registers a factory.
    pub fn register<F: StepFactory + 'static>(mut self, factory: F) -> Self {
        self.factories.push(Arc::new(factory));
        self
    }

    /// Registers the built-in steps.
    pub fn with_defaults(self) -> Self {
        steps::register_defaults(self)
    }

    /// Builds the registry, rejecting two factories for one kind.
    pub fn build(self) -> Result<StepRegistry, ConfigError> {
        let mut factories: HashMap<&'static str, Arc<dyn StepFactory>> = HashMap::new();
        for factory in self.factories {
            let kind = factory.kind();
            if factories.insert(kind, factory).is_some() {
                return Err(ConfigError::DuplicateFactory {
                    family: Family::Step,
                    kind: kind.to_string(),
                });
            }
        }
        debug!("Step registry holds {} factories", factories.len());
        Ok(StepRegistry { factories })
    }
}

/// Data provider factories keyed by the provider type they produce.
#[derive(Default)]
pub struct DataProviderRegistry {
    factories: HashMap<TypeId, Arc<dyn DataProviderFactory>>,
}

impl fmt::Debug for DataProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataProviderRegistry")
            .field(
                "kinds",
                &self
                    .factories
                    .values()
                    .map(|f| f.provider_type().kind())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl DataProviderRegistry {
    /// Creates a new registry builder.
    pub fn builder() -> DataProviderRegistryBuilder {
        DataProviderRegistryBuilder::default()
    }

    /// Builds exactly one instance per distinct required provider type.
    ///
    /// Fails if a required type has no factory or no matching setting, or if
    /// two settings name the same implementation.
    pub fn resolve(
        &self,
        required: impl IntoIterator<Item = ProviderType>,
        settings: &[DataProviderSetting],
    ) -> Result<DataProviders, ConfigError> {
        let mut seen = HashSet::new();
        for setting in settings {
            if !seen.insert(setting.implementation.as_str()) {
                return Err(ConfigError::DuplicateSetting {
                    family: Family::DataProvider,
                    kind: setting.implementation.clone(),
                });
            }
        }

        let mut providers = DataProviders::new();
        for provider_type in required {
            if providers.contains(&provider_type) {
                continue;
            }
            let factory = self.factories.get(&provider_type.type_id()).ok_or_else(|| {
                ConfigError::MissingFactory {
                    family: Family::DataProvider,
                    kind: provider_type.kind().to_string(),
                }
            })?;
            let setting = settings
                .iter()
                .find(|s| s.implementation == provider_type.kind())
                .ok_or_else(|| ConfigError::MissingSetting {
                    family: Family::DataProvider,
                    kind: provider_type.kind().to_string(),
                })?;
            providers.insert_instance(factory.create(setting)?);
            debug!("Created data provider {}", provider_type);
        }
        Ok(providers)
    }
}

/// Builder for [`DataProviderRegistry`].
#[derive(Default)]
pub struct DataProviderRegistryBuilder {
    factories: Vec<Arc<dyn DataProviderFactory>>,
}

impl DataProviderRegistryBuilder {
    /// Registers a factory.
    pub fn register<F: DataProviderFactory + 'static>(mut self, factory: F) -> Self {
        self.factories.push(Arc::new(factory));
        self
    }

    /// Builds the registry, rejecting two factories for one provider type.
    pub fn build(self) -> Result<DataProviderRegistry, ConfigError> {
        let mut factories: HashMap<TypeId, Arc<dyn DataProviderFactory>> = HashMap::new();
        for factory in self.factories {
            let provider_type = factory.provider_type();
            if factories.insert(provider_type.type_id(), factory).is_some() {
                return Err(ConfigError::DuplicateFactory {
                    family: Family::DataProvider,
                    kind: provider_type.kind().to_string(),
                });
            }
        }
        Ok(DataProviderRegistry { factories })
    }
}

/// Visualization factories keyed by kind, at most one per produced type.
#[derive(Default)]
pub struct VisualizationRegistry {
    factories: HashMap<&'static str, Arc<dyn VisualizationFactory>>,
}

impl fmt::Debug for VisualizationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisualizationRegistry")
            .field("kinds", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl VisualizationRegistry {
    /// Creates a new registry builder.
    pub fn builder() -> VisualizationRegistryBuilder {
        VisualizationRegistryBuilder::default()
    }

    /// Builds every configured visualization under its identifier.
    pub fn resolve<'a>(
        &self,
        settings: impl IntoIterator<Item = (&'a str, &'a VisualizationSetting)>,
    ) -> Result<Visualizations, ConfigError> {
        let mut visualizations = Visualizations::new();
        for (id, setting) in settings {
            let factory = self
                .factories
                .get(setting.implementation.as_str())
                .ok_or_else(|| ConfigError::MissingFactory {
                    family: Family::Visualization,
                    kind: setting.implementation.clone(),
                })?;
            visualizations.insert(id, factory.create(id, setting)?)?;
            debug!("Created visualization '{}' ({})", id, setting.implementation);
        }
        Ok(visualizations)
    }
}

/// Builder for [`VisualizationRegistry`].
#[derive(Default)]
pub struct VisualizationRegistryBuilder {
    factories: Vec<Arc<dyn VisualizationFactory>>,
}

impl VisualizationRegistryBuilder {
    /// Registers a factory.
    pub fn register<F: VisualizationFactory + 'static>(mut self, factory: F) -> Self {
        self.factories.push(Arc::new(factory));
        self
    }

    /// Builds the registry.
    ///
    /// Rejects two factories for one kind and two factories producing the
    /// same visualization type.
    pub fn build(self) -> Result<VisualizationRegistry, ConfigError> {
        let mut factories: HashMap<&'static str, Arc<dyn VisualizationFactory>> = HashMap::new();
        let mut producers: HashMap<TypeId, &'static str> = HashMap::new();
        for factory in self.factories {
            let kind = factory.kind();
            let produced = factory.produces();
            if let Some(first) = producers.insert(produced.type_id(), kind) {
                return Err(ConfigError::DuplicateProducedType {
                    family: Family::Visualization,
                    produced: produced.type_name(),
                    first: first.to_string(),
                    second: kind.to_string(),
                });
            }
            if factories.insert(kind, factory).is_some() {
                return Err(ConfigError::DuplicateFactory {
                    family: Family::Visualization,
                    kind: kind.to_string(),
                });
            }
        }
        Ok(VisualizationRegistry { factories })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tweetwall_core::{
        DataProvider, MachineContext, ProducedType, ProviderInstance, Step, StepDefinition,
        StepError, Visualization,
    };

    #[derive(Debug)]
    struct Noop;

    #[async_trait]
    impl Step for Noop {
        async fn do_step(&self, ctx: &mut MachineContext) -> Result<(), StepError> {
            ctx.proceed();
            Ok(())
        }
    }

    struct NoopFactory;

    impl StepFactory for NoopFactory {
        fn kind(&self) -> &'static str {
            "Noop"
        }

        fn create(&self, _definition: &StepDefinition) -> Result<Arc<dyn Step>, ConfigError> {
            Ok(Arc::new(Noop))
        }
    }

    struct Feed;

    impl DataProvider for Feed {
        const KIND: &'static str = "Feed";
    }

    struct FeedFactory;

    impl DataProviderFactory for FeedFactory {
        fn provider_type(&self) -> ProviderType {
            ProviderType::of::<Feed>()
        }

        fn create(&self, _setting: &DataProviderSetting) -> Result<ProviderInstance, ConfigError> {
            Ok(ProviderInstance::new(Arc::new(Feed)))
        }
    }

    struct Panel;

    impl Visualization for Panel {}

    struct PanelFactory(&'static str);

    impl VisualizationFactory for PanelFactory {
        fn kind(&self) -> &'static str {
            self.0
        }

        fn produces(&self) -> ProducedType {
            ProducedType::of::<Panel>()
        }

        fn create(
            &self,
            _id: &str,
            _setting: &VisualizationSetting,
        ) -> Result<Arc<dyn Visualization>, ConfigError> {
            Ok(Arc::new(Panel))
        }
    }

    #[test]
    fn test_step_registry_lookup() {
        let registry = StepRegistry::builder().register(NoopFactory).build().unwrap();
        assert!(registry.contains("Noop"));
        assert!(registry.get("Noop").is_ok());
        assert!(matches!(
            registry.get("Missing"),
            Err(ConfigError::MissingFactory { family: Family::Step, .. })
        ));
    }

    #[test]
    fn test_default_steps() {
        let registry = StepRegistry::with_defaults().unwrap();
        for kind in ["Pause", "NextTweet", "ScheduleRefresh", "Show", "Shutdown"] {
            assert!(registry.contains(kind), "missing {kind}");
        }
        assert!(StepRegistry::builder()
            .with_defaults()
            .register(NoopFactory)
            .build()
            .is_ok());
    }

    #[test]
    fn test_step_registry_rejects_duplicate_kind() {
        let result = StepRegistry::builder()
            .register(NoopFactory)
            .register(NoopFactory)
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::DuplicateFactory { family: Family::Step, kind }) if kind == "Noop"
        ));
    }

    #[test]
    fn test_provider_resolution_deduplicates() {
        let registry = DataProviderRegistry::builder()
            .register(FeedFactory)
            .build()
            .unwrap();
        let settings = vec![DataProviderSetting::new("Feed")];
        let providers = registry
            .resolve(
                vec![ProviderType::of::<Feed>(), ProviderType::of::<Feed>()],
                &settings,
            )
            .unwrap();
        assert_eq!(providers.len(), 1);
        assert!(providers.get::<Feed>().is_some());
    }

    #[test]
    fn test_provider_resolution_requires_setting_and_factory() {
        let registry = DataProviderRegistry::builder()
            .register(FeedFactory)
            .build()
            .unwrap();
        let result = registry.resolve(vec![ProviderType::of::<Feed>()], &[]);
        assert!(matches!(result, Err(ConfigError::MissingSetting { .. })));

        let empty = DataProviderRegistry::builder().build().unwrap();
        let result = empty.resolve(
            vec![ProviderType::of::<Feed>()],
            &[DataProviderSetting::new("Feed")],
        );
        assert!(matches!(result, Err(ConfigError::MissingFactory { .. })));
    }

    #[test]
    fn test_provider_resolution_rejects_repeated_setting() {
        let registry = DataProviderRegistry::builder()
            .register(FeedFactory)
            .build()
            .unwrap();
        let settings = vec![
            DataProviderSetting::new("Feed").with("history_size", 10),
            DataProviderSetting::new("Feed").with("history_size", 50),
        ];
        let result = registry.resolve(vec![ProviderType::of::<Feed>()], &settings);
        assert!(matches!(
            result,
            Err(ConfigError::DuplicateSetting {
                family: Family::DataProvider,
                kind,
            }) if kind == "Feed"
        ));
    }

    #[test]
    fn test_visualization_registry_rejects_shared_product() {
        let result = VisualizationRegistry::builder()
            .register(PanelFactory("Panel"))
            .register(PanelFactory("OtherPanel"))
            .build();
        match result {
            Err(ConfigError::DuplicateProducedType { first, second, .. }) => {
                assert_eq!(first, "Panel");
                assert_eq!(second, "OtherPanel");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_visualization_resolution() {
        let registry = VisualizationRegistry::builder()
            .register(PanelFactory("Panel"))
            .build()
            .unwrap();
        let setting = VisualizationSetting::new("Panel");
        let visualizations = registry
            .resolve(vec![("left", &setting), ("right", &setting)])
            .unwrap();
        assert_eq!(visualizations.len(), 2);

        let unknown = VisualizationSetting::new("Clock");
        assert!(matches!(
            registry.resolve(vec![("clock", &unknown)]),
            Err(ConfigError::MissingFactory { family: Family::Visualization, .. })
        ));
    }
}
