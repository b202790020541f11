//! Filter chains and the filter-step registry.
//!
//! A chain evaluates its steps in configuration order and stops at the first
//! terminal verdict. If every step returns [`FilterResult::NothingDefinite`]
//! the chain's default decides.

use crate::filters::{self, SpeakerHandleCache};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};
use tweetwall_core::{
    ConfigError, Family, FilterChainSetting, FilterDomain, FilterResult, FilterStep,
    FilterStepFactory,
};

/// An immutable, ordered list of filter steps over domain type `T`.
pub struct FilterChain<T> {
    name: String,
    steps: Vec<(String, Box<dyn FilterStep<T>>)>,
    default_result: bool,
}

impl<T> fmt::Debug for FilterChain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("name", &self.name)
            .field(
                "steps",
                &self.steps.iter().map(|(kind, _)| kind).collect::<Vec<_>>(),
            )
            .field("default_result", &self.default_result)
            .finish()
    }
}

impl<T> FilterChain<T> {
    /// Creates an empty chain that answers `default_result`.
    pub fn new(name: impl Into<String>, default_result: bool) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            default_result,
        }
    }

    /// Appends a step.
    pub fn with_step(mut self, kind: impl Into<String>, step: Box<dyn FilterStep<T>>) -> Self {
        self.steps.push((kind.into(), step));
        self
    }

    /// Configured chain name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` if the chain has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Outcome when no step is terminal.
    pub fn default_result(&self) -> bool {
        self.default_result
    }

    /// Decides whether `item` is admitted.
    pub fn evaluate(&self, item: &T) -> bool {
        for (index, (kind, step)) in self.steps.iter().enumerate() {
            if let Some(verdict) = step.check(item).terminal() {
                trace!(
                    "Filter chain '{}': step {} ({}) decided {}",
                    self.name,
                    index,
                    kind,
                    verdict
                );
                return verdict;
            }
        }
        trace!(
            "Filter chain '{}': no terminal verdict, default {}",
            self.name,
            self.default_result
        );
        self.default_result
    }

    /// The chain as a boolean test.
    pub fn as_predicate(&self) -> impl Fn(&T) -> bool + '_ {
        move |item| self.evaluate(item)
    }
}

type RegistryKey = (TypeId, String);

/// Filter-step factories keyed by domain type and step kind.
#[derive(Default)]
pub struct FilterStepRegistry {
    factories: HashMap<RegistryKey, Box<dyn Any + Send + Sync>>,
}

impl fmt::Debug for FilterStepRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterStepRegistry")
            .field(
                "kinds",
                &self.factories.keys().map(|(_, kind)| kind).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl FilterStepRegistry {
    /// Creates a new registry builder.
    pub fn builder() -> FilterStepRegistryBuilder {
        FilterStepRegistryBuilder::default()
    }

    /// A registry holding every built-in `Post` filter step.
    pub fn post_defaults(cache: Arc<SpeakerHandleCache>) -> Result<Self, ConfigError> {
        Self::builder().post_defaults(cache).build()
    }

    /// Looks up the factory for `kind` over domain `T`.
    pub fn get<T: FilterDomain>(
        &self,
        kind: &str,
    ) -> Result<&Arc<dyn FilterStepFactory<T>>, ConfigError> {
        self.factories
            .get(&(TypeId::of::<T>(), kind.to_string()))
            .and_then(|factory| factory.downcast_ref::<Arc<dyn FilterStepFactory<T>>>())
            .ok_or_else(|| ConfigError::MissingFactory {
                family: Family::FilterStep,
                kind: format!("{}/{}", T::DOMAIN_TYPE, kind),
            })
    }
}

/// Builder for [`FilterStepRegistry`].
#[derive(Default)]
pub struct FilterStepRegistryBuilder {
    factories: Vec<(RegistryKey, &'static str, Box<dyn Any + Send + Sync>)>,
}

impl FilterStepRegistryBuilder {
    /// Registers a factory for domain `T`.
    pub fn register<T, F>(mut self, factory: F) -> Self
    where
        T: FilterDomain,
        F: FilterStepFactory<T> + 'static,
    {
        let kind = factory.kind();
        let factory: Arc<dyn FilterStepFactory<T>> = Arc::new(factory);
        self.factories.push((
            (TypeId::of::<T>(), kind.to_string()),
            T::DOMAIN_TYPE,
            Box::new(factory),
        ));
        self
    }

    /// Registers the built-in `Post` filter steps.
    pub fn post_defaults(self, cache: Arc<SpeakerHandleCache>) -> Self {
        filters::register_defaults(self, cache)
    }

    /// Builds the registry, rejecting two factories for one (domain, kind) pair.
    pub fn build(self) -> Result<FilterStepRegistry, ConfigError> {
        let mut factories = HashMap::new();
        for (key, domain, factory) in self.factories {
            let kind = key.1.clone();
            if factories.insert(key, factory).is_some() {
                return Err(ConfigError::DuplicateFactory {
                    family: Family::FilterStep,
                    kind: format!("{}/{}", domain, kind),
                });
            }
        }
        Ok(FilterStepRegistry { factories })
    }
}

/// Builds named filter chains from their settings.
#[derive(Debug)]
pub struct FilterChainFactory {
    settings: HashMap<String, FilterChainSetting>,
    registry: FilterStepRegistry,
}

impl FilterChainFactory {
    /// Creates a factory over the configured chains.
    pub fn new(
        settings: HashMap<String, FilterChainSetting>,
        registry: FilterStepRegistry,
    ) -> Self {
        Self { settings, registry }
    }

    /// Builds the chain `name` for domain `T`.
    ///
    /// Fails if the chain is unknown, was declared for another domain, or
    /// names a step kind without a factory.
    pub fn create_filter_chain<T: FilterDomain>(
        &self,
        name: &str,
    ) -> Result<FilterChain<T>, ConfigError> {
        let setting = self
            .settings
            .get(name)
            .ok_or_else(|| ConfigError::UnknownFilterChain(name.to_string()))?;

        if setting.domain_type != T::DOMAIN_TYPE {
            return Err(ConfigError::DomainMismatch {
                chain: name.to_string(),
                declared: setting.domain_type.clone(),
                requested: T::DOMAIN_TYPE,
            });
        }

        let mut chain = FilterChain::new(name, setting.default_result);
        for definition in &setting.steps {
            let factory = self.registry.get::<T>(&definition.kind)?;
            chain = chain.with_step(definition.kind.clone(), factory.create(definition)?);
        }
        debug!("Built filter chain '{}' with {} steps", name, chain.len());
        Ok(chain)
    }
}
