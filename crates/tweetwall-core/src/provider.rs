//! Shared data providers.

use crate::config::{parse_config, ConfigMap};
use crate::error::ConfigError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A long-lived, shared source of domain data.
///
/// Exactly one instance per provider type exists for a running wall. Providers
/// are read by steps and may be written concurrently by ingestion paths, so
/// they guard their state themselves.
pub trait DataProvider: Any + Send + Sync {
    /// Implementation identifier used in [`DataProviderSetting::implementation`].
    const KIND: &'static str;
}

/// Identity of a provider type, as declared by step factories.
#[derive(Debug, Clone, Copy)]
pub struct ProviderType {
    kind: &'static str,
    type_id: TypeId,
    type_name: &'static str,
}

impl ProviderType {
    /// Identity of provider type `T`.
    pub fn of<T: DataProvider>() -> Self {
        Self {
            kind: T::KIND,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Implementation identifier.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Rust type id of the provider.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Rust type name of the provider.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for ProviderType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ProviderType {}

impl std::hash::Hash for ProviderType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

/// A type-erased provider instance together with its identity.
#[derive(Clone)]
pub struct ProviderInstance {
    provider_type: ProviderType,
    value: Arc<dyn Any + Send + Sync>,
}

impl ProviderInstance {
    /// Wraps a concrete provider.
    pub fn new<T: DataProvider>(provider: Arc<T>) -> Self {
        Self {
            provider_type: ProviderType::of::<T>(),
            value: provider,
        }
    }

    /// Identity of the wrapped provider.
    pub fn provider_type(&self) -> ProviderType {
        self.provider_type
    }
}

impl fmt::Debug for ProviderInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderInstance")
            .field("kind", &self.provider_type.kind)
            .finish()
    }
}

/// The resolved set of provider instances, one per provider type.
#[derive(Default, Clone)]
pub struct DataProviders {
    by_type: HashMap<TypeId, ProviderInstance>,
}

impl fmt::Debug for DataProviders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataProviders")
            .field(
                "kinds",
                &self
                    .by_type
                    .values()
                    .map(|p| p.provider_type.kind)
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl DataProviders {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a concrete provider, replacing any previous one of the same type.
    pub fn insert<T: DataProvider>(&mut self, provider: Arc<T>) {
        self.insert_instance(ProviderInstance::new(provider));
    }

    /// Adds a type-erased provider, replacing any previous one of the same type.
    pub fn insert_instance(&mut self, instance: ProviderInstance) {
        self.by_type.insert(instance.provider_type.type_id, instance);
    }

    /// Returns the shared instance of provider type `T`.
    pub fn get<T: DataProvider>(&self) -> Option<Arc<T>> {
        self.by_type
            .get(&TypeId::of::<T>())
            .and_then(|instance| instance.value.clone().downcast::<T>().ok())
    }

    /// Returns `true` if a provider of the given type is present.
    pub fn contains(&self, provider_type: &ProviderType) -> bool {
        self.by_type.contains_key(&provider_type.type_id)
    }

    /// Number of providers.
    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    /// Returns `true` if no provider is present.
    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

/// A configured data provider.
///
/// ```json
/// { "implementation": "TweetDataProvider", "config": { "history_size": 50 } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataProviderSetting {
    /// Implementation identifier, matched against [`DataProvider::KIND`].
    pub implementation: String,
    /// Implementation-specific options.
    #[serde(default)]
    pub config: ConfigMap,
}

impl DataProviderSetting {
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

    /// Reads the typed options for this provider.
    pub fn config<C: DeserializeOwned>(&self) -> Result<C, ConfigError> {
        parse_config(&self.implementation, &self.config)
    }
}

/// Builds the single instance of one provider type.
pub trait DataProviderFactory: Send + Sync {
    /// The provider type this factory produces.
    fn provider_type(&self) -> ProviderType;

    /// Builds the provider from its setting.
    fn create(&self, setting: &DataProviderSetting) -> Result<ProviderInstance, ConfigError>;
}
