//! The machine context shared by every step invocation.

use crate::error::StepError;
use crate::provider::{DataProvider, DataProviders};
use crate::traits::Controllable;
use crate::visualization::{Visualization, VisualizationContext, Visualizations};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;

/// Type-safe context key wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextKey(String);

impl ContextKey {
    /// Creates a new ContextKey.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContextKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ContextKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::borrow::Borrow<str> for ContextKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Completion signal for the step currently in flight.
///
/// Cloneable and callable from any thread. Only the first call per dispatch
/// has an effect; calls on a handle left over from an earlier dispatch are
/// ignored.
#[derive(Clone, Default)]
pub struct Proceed {
    sender: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl fmt::Debug for Proceed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proceed")
            .field("pending", &self.is_pending())
            .finish()
    }
}

impl Proceed {
    /// Creates a fresh handle and the receiver the engine waits on.
    pub fn channel() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                sender: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    /// Signals completion. Returns `true` if this call delivered the signal.
    pub fn proceed(&self) -> bool {
        match self.sender.lock().take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    /// Returns `true` while the signal has not been delivered.
    pub fn is_pending(&self) -> bool {
        self.sender.lock().as_ref().is_some_and(|tx| !tx.is_closed())
    }
}

/// Shared, run-scoped state handed to every step.
///
/// Holds the explicit skip token, a heterogeneous side-channel map for
/// dynamic extension data, the resolved data providers and visualizations,
/// named controllable resources and the completion handle of the step in
/// flight.
///
/// # Examples
///
/// ```
/// use tweetwall_core::MachineContext;
///
/// let mut ctx = MachineContext::new();
///
/// ctx.set_skip_token("no-new-tweets");
/// assert_eq!(ctx.skip_token(), Some("no-new-tweets"));
///
/// ctx.insert("round", 3u32);
/// assert_eq!(ctx.get::<u32>("round"), Some(&3));
/// assert_eq!(ctx.get::<String>("round"), None);
/// ```
pub struct MachineContext {
    skip_token: Option<String>,
    data: HashMap<ContextKey, Box<dyn Any + Send + Sync>>,
    providers: Arc<DataProviders>,
    visualizations: Arc<Visualizations>,
    controllables: HashMap<String, Arc<dyn Controllable>>,
    proceed: Proceed,
    started_at: Instant,
}

impl fmt::Debug for MachineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MachineContext")
            .field("skip_token", &self.skip_token)
            .field("keys", &self.data.keys().collect::<Vec<_>>())
            .field("providers", &self.providers)
            .field("visualizations", &self.visualizations)
            .field("controllables", &self.controllables.keys().collect::<Vec<_>>())
            .field("started_at", &self.started_at)
            .finish()
    }
}

impl Default for MachineContext {
    fn default() -> Self {
        Self::new()
    }
}

impl MachineContext {
    /// Creates a context without providers or visualizations.
    pub fn new() -> Self {
        Self::with_resources(DataProviders::new(), Visualizations::new())
    }

    /// Creates a context over resolved providers and visualizations.
    pub fn with_resources(providers: DataProviders, visualizations: Visualizations) -> Self {
        Self {
            skip_token: None,
            data: HashMap::new(),
            providers: Arc::new(providers),
            visualizations: Arc::new(visualizations),
            controllables: HashMap::new(),
            proceed: Proceed::default(),
            started_at: Instant::now(),
        }
    }

    /// Returns the current skip token.
    pub fn skip_token(&self) -> Option<&str> {
        self.skip_token.as_deref()
    }

    /// Sets the skip token.
    pub fn set_skip_token(&mut self, token: impl Into<String>) {
        self.skip_token = Some(token.into());
    }

    /// Clears the skip token and returns the previous value.
    pub fn clear_skip_token(&mut self) -> Option<String> {
        self.skip_token.take()
    }

    /// Inserts a value with the given key.
    ///
    /// If the key already exists, the previous value is replaced.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<ContextKey>, value: T) {
        self.data.insert(key.into(), Box::new(value));
    }

    /// Returns a reference to the value for the given key.
    ///
    /// Returns `None` if the key doesn't exist or the type doesn't match.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.data.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Returns a mutable reference to the value for the given key.
    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.data.get_mut(key).and_then(|v| v.downcast_mut::<T>())
    }

    /// Removes a value by key and returns it.
    pub fn remove<T: Any>(&mut self, key: &str) -> Option<T> {
        self.data
            .remove(key)
            .and_then(|v| v.downcast::<T>().ok())
            .map(|b| *b)
    }

    /// Returns `true` if the side-channel map holds the given key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Returns the shared instance of provider type `T`.
    pub fn data_provider<T: DataProvider>(&self) -> Option<Arc<T>> {
        self.providers.get::<T>()
    }

    /// Like [`data_provider`](Self::data_provider), failing with a step error.
    pub fn require_data_provider<T: DataProvider>(&self) -> Result<Arc<T>, StepError> {
        self.data_provider::<T>()
            .ok_or(StepError::MissingDataProvider(T::KIND))
    }

    /// All resolved data providers.
    pub fn data_providers(&self) -> &Arc<DataProviders> {
        &self.providers
    }

    /// Looks a visualization up by identifier.
    pub fn visualization(&self, id: &str) -> Option<Arc<dyn Visualization>> {
        self.visualizations.get(id)
    }

    /// Builds the transient context for driving visualization `id` from the
    /// current step.
    pub fn visualization_context(&self, id: &str) -> VisualizationContext {
        VisualizationContext::new(id, self.proceed.clone(), self.providers.clone())
    }

    /// Registers a named controllable resource.
    pub fn register_controllable(
        &mut self,
        name: impl Into<String>,
        resource: Arc<dyn Controllable>,
    ) {
        self.controllables.insert(name.into(), resource);
    }

    /// Looks a controllable resource up by name.
    pub fn controllable(&self, name: &str) -> Option<Arc<dyn Controllable>> {
        self.controllables.get(name).cloned()
    }

    /// Signals that the step in flight is done.
    ///
    /// This is the only way a step tells the engine to move on.
    pub fn proceed(&self) {
        self.proceed.proceed();
    }

    /// Handle for signalling completion later or from another thread.
    pub fn proceed_handle(&self) -> Proceed {
        self.proceed.clone()
    }

    /// Installs a fresh completion handle for the next dispatch and returns
    /// the receiver the engine waits on. Any older handle becomes inert.
    pub fn arm_proceed(&mut self) -> oneshot::Receiver<()> {
        let (proceed, signal) = Proceed::channel();
        self.proceed = proceed;
        signal
    }

    /// Returns the time elapsed since the context was created.
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}
