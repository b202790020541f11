//! Addressable renderable surfaces.

use crate::config::{parse_config, ConfigMap};
use crate::context::Proceed;
use crate::error::ConfigError;
use crate::provider::{DataProvider, DataProviders};
use crate::traits::Showable;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A renderable surface, addressed by its configured identifier.
///
/// Capabilities are optional; a visualization that can be shown returns
/// itself from [`as_showable`](Visualization::as_showable).
pub trait Visualization: Send + Sync {
    /// The show capability, if supported.
    fn as_showable(&self) -> Option<&dyn Showable> {
        None
    }
}

/// Transient context handed to a visualization for one capability call.
#[derive(Clone)]
pub struct VisualizationContext {
    id: String,
    proceed: Proceed,
    providers: Arc<DataProviders>,
}

impl fmt::Debug for VisualizationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisualizationContext")
            .field("id", &self.id)
            .finish()
    }
}

impl VisualizationContext {
    /// Creates a context for the visualization `id`.
    pub fn new(id: impl Into<String>, proceed: Proceed, providers: Arc<DataProviders>) -> Self {
        Self {
            id: id.into(),
            proceed,
            providers,
        }
    }

    /// Identifier of the visualization being driven.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Signals the triggering step that the visualization is done.
    pub fn proceed(&self) {
        self.proceed.proceed();
    }

    /// Handle for signalling completion later, e.g. from an animation callback.
    pub fn proceed_handle(&self) -> Proceed {
        self.proceed.clone()
    }

    /// Returns the shared instance of provider type `T`.
    pub fn data_provider<T: DataProvider>(&self) -> Option<Arc<T>> {
        self.providers.get::<T>()
    }
}

/// The resolved visualizations, keyed by configured identifier.
#[derive(Default, Clone)]
pub struct Visualizations {
    by_id: HashMap<String, Arc<dyn Visualization>>,
}

impl fmt::Debug for Visualizations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Visualizations")
            .field("ids", &self.by_id.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Visualizations {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a visualization; fails if the id is already taken.
    pub fn insert(
        &mut self,
        id: impl Into<String>,
        visualization: Arc<dyn Visualization>,
    ) -> Result<(), ConfigError> {
        let id = id.into();
        if self.by_id.contains_key(&id) {
            return Err(ConfigError::DuplicateVisualization(id));
        }
        self.by_id.insert(id, visualization);
        Ok(())
    }

    /// Looks a visualization up by identifier.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Visualization>> {
        self.by_id.get(id).cloned()
    }

    /// Iterates over the configured identifiers.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.by_id.keys().map(String::as_str)
    }

    /// Number of visualizations.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns `true` if none are configured.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// A configured visualization.
///
/// ```json
/// { "implementation": "Agenda", "config": { "rows": 8 } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationSetting {
    /// Implementation identifier, matched against [`VisualizationFactory::kind`].
    pub implementation: String,
    /// Implementation-specific options.
    #[serde(default)]
    pub config: ConfigMap,
}

impl VisualizationSetting {
    /// Creates a setting with an empty config map.
    pub fn new(implementation: impl Into<String>) -> Self {
        Self {
            implementation: implementation.into(),
            config: ConfigMap::new(),
        }
    }

    /// Adds a config entry.
    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.config.insert(key.to_string(), value.into());
        self
    }

    /// Reads the typed options for this visualization.
    pub fn config<C: DeserializeOwned>(&self) -> Result<C, ConfigError> {
        parse_config(&self.implementation, &self.config)
    }
}

/// The concrete type a [`VisualizationFactory`] produces.
#[derive(Debug, Clone, Copy)]
pub struct ProducedType {
    type_id: TypeId,
    type_name: &'static str,
}

impl ProducedType {
    /// Identity of visualization type `V`.
    pub fn of<V: Visualization + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<V>(),
            type_name: std::any::type_name::<V>(),
        }
    }

    /// Rust type id of the product.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Rust type name of the product.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Builds visualizations of one concrete type.
pub trait VisualizationFactory: Send + Sync {
    /// Implementation identifier used in [`VisualizationSetting::implementation`].
    fn kind(&self) -> &'static str;

    /// The concrete visualization type this factory produces.
    fn produces(&self) -> ProducedType;

    /// Builds the visualization configured under `id`.
    fn create(
        &self,
        id: &str,
        setting: &VisualizationSetting,
    ) -> Result<Arc<dyn Visualization>, ConfigError>;
}
