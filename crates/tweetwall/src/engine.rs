//! Step orchestration engine.
//!
//! The engine cycles through its step sequence forever. Per iteration it
//! selects the next step, asks it whether to skip, dispatches its body onto
//! the thread the step's [`ThreadAffinity`] demands, waits for the step to
//! proceed and then dwells for the step's preferred duration.

use crate::platform::{Platform, UiThread};
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tweetwall_core::{
    ConfigError, Controllable, DataProviders, MachineContext, Step, StepError, StepName,
    ThreadAffinity, Visualizations,
};

/// A step instance placed in the sequence under a display name.
#[derive(Clone)]
pub struct ConfiguredStep {
    name: StepName,
    step: Arc<dyn Step>,
}

impl fmt::Debug for ConfiguredStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfiguredStep")
            .field("name", &self.name)
            .field("step", &self.step)
            .finish()
    }
}

impl ConfiguredStep {
    /// Places a shared step instance under `name`.
    pub fn new(name: impl Into<StepName>, step: Arc<dyn Step>) -> Self {
        Self {
            name: name.into(),
            step,
        }
    }

    /// Display name.
    pub fn name(&self) -> &StepName {
        &self.name
    }

    /// The step instance.
    pub fn step(&self) -> &Arc<dyn Step> {
        &self.step
    }
}

/// Engine options.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Give up waiting for a step to proceed after this long.
    ///
    /// `None` (the default) waits indefinitely: a step that never proceeds
    /// stalls the loop until [`EngineHandle::stop`].
    pub proceed_timeout: Option<Duration>,
}

/// Where the control loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Choosing the next step.
    Select,
    /// The selected step asked to be skipped.
    Skip,
    /// The step's body is running.
    Dispatch,
    /// Waiting for the step to proceed.
    AwaitProceed,
    /// Holding the step's visual state.
    Dwell,
    /// Stop was requested; the loop is winding down.
    Stopping,
    /// The loop has exited.
    Stopped,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EngineState::Select => "select",
            EngineState::Skip => "skip",
            EngineState::Dispatch => "dispatch",
            EngineState::AwaitProceed => "await-proceed",
            EngineState::Dwell => "dwell",
            EngineState::Stopping => "stopping",
            EngineState::Stopped => "stopped",
        };
        write!(f, "{}", label)
    }
}

/// A snapshot of the engine for status reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStatus {
    /// Current state of the control loop.
    pub state: EngineState,
    /// Step being handled, if any.
    pub current_step: Option<StepName>,
    /// Number of full passes over the sequence.
    pub completed_cycles: u64,
    /// `false` once the loop has exited.
    pub running: bool,
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.current_step {
            Some(step) => write!(
                f,
                "{} at '{}' after {} cycles",
                self.state, step, self.completed_cycles
            ),
            None => write!(f, "{} after {} cycles", self.state, self.completed_cycles),
        }
    }
}

struct Shared {
    stop: watch::Sender<bool>,
    cycles: watch::Sender<u64>,
    restart: AtomicBool,
    position: Mutex<(EngineState, Option<StepName>)>,
}

impl Shared {
    fn new() -> Self {
        Self {
            stop: watch::channel(false).0,
            cycles: watch::channel(0).0,
            restart: AtomicBool::new(false),
            position: Mutex::new((EngineState::Select, None)),
        }
    }

    fn stop_requested(&self) -> bool {
        *self.stop.borrow()
    }

    fn enter(&self, state: EngineState, step: Option<StepName>) {
        let mut position = self.position.lock();
        if position.0 == EngineState::Stopped {
            return;
        }
        let state = if self.stop_requested() && state != EngineState::Stopped {
            EngineState::Stopping
        } else {
            state
        };
        *position = (state, step);
    }

    fn enter_state(&self, state: EngineState) {
        let step = self.position.lock().1.clone();
        self.enter(state, step);
    }

    async fn stopped(&self) {
        let mut rx = self.stop.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// The scheduler over a fixed, cyclic step sequence.
///
/// # Examples
///
/// ```rust,ignore
/// let engine = StepEngine::builder()
///     .add_step("pause", PauseStep::new(Duration::from_secs(5)))
///     .build()?;
///
/// let handle = engine.start();
/// // ... later
/// handle.stop();
/// handle.join().await;
/// ```
pub struct StepEngine {
    steps: Vec<ConfiguredStep>,
    context: MachineContext,
    platform: Arc<dyn Platform>,
    config: EngineConfig,
}

impl fmt::Debug for StepEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepEngine")
            .field(
                "steps",
                &self.steps.iter().map(ConfiguredStep::name).collect::<Vec<_>>(),
            )
            .field("config", &self.config)
            .finish()
    }
}

impl StepEngine {
    /// Creates a new engine builder.
    pub fn builder() -> StepEngineBuilder {
        StepEngineBuilder::new()
    }

    /// Returns the configured sequence in display order.
    pub fn step_names(&self) -> impl Iterator<Item = &StepName> {
        self.steps.iter().map(ConfiguredStep::name)
    }

    /// Number of steps in the sequence.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Spawns the control loop on the current tokio runtime.
    pub fn start(self) -> EngineHandle {
        let shared = Arc::new(Shared::new());
        let runner = Runner {
            steps: self.steps,
            context: Arc::new(tokio::sync::Mutex::new(self.context)),
            platform: self.platform,
            config: self.config,
            shared: shared.clone(),
        };
        let task = tokio::spawn(runner.run());
        EngineHandle { shared, task }
    }
}

enum StepOutcome {
    Skipped,
    Completed,
    Failed,
    Stopped,
}

struct Runner {
    steps: Vec<ConfiguredStep>,
    context: Arc<tokio::sync::Mutex<MachineContext>>,
    platform: Arc<dyn Platform>,
    config: EngineConfig,
    shared: Arc<Shared>,
}

impl Runner {
    async fn run(self) {
        info!("Step engine started with {} steps", self.steps.len());
        let mut cursor = 0;

        while !self.shared.stop_requested() {
            if self.shared.restart.swap(false, Ordering::SeqCst) {
                info!("Restarting step sequence");
                cursor = 0;
            }

            let position = cursor;
            cursor = (cursor + 1) % self.steps.len();
            let entry = &self.steps[position];
            self.shared.enter(EngineState::Select, Some(entry.name.clone()));

            match self.run_step(entry).await {
                StepOutcome::Stopped => break,
                StepOutcome::Skipped => debug!("Step '{}' skipped", entry.name),
                StepOutcome::Failed => debug!("Step '{}' failed, moving on", entry.name),
                StepOutcome::Completed => debug!("Step '{}' completed", entry.name),
            }

            if position + 1 == self.steps.len() {
                self.shared.cycles.send_modify(|cycles| *cycles += 1);
                debug!("Completed cycle {}", *self.shared.cycles.borrow());
            }
        }

        self.shared.enter(EngineState::Stopped, None);
        info!("Step engine stopped");
    }

    async fn run_step(&self, entry: &ConfiguredStep) -> StepOutcome {
        let name = &entry.name;
        let step = &entry.step;

        match self.inspect(|ctx| step.should_skip(ctx)).await {
            Ok(true) => {
                self.shared.enter_state(EngineState::Skip);
                return StepOutcome::Skipped;
            }
            Ok(false) => {}
            Err(panic) => {
                error!("Step '{}' panicked in should_skip: {}", name, panic);
                return StepOutcome::Failed;
            }
        }

        if self.shared.stop_requested() {
            return StepOutcome::Stopped;
        }

        self.shared.enter_state(EngineState::Dispatch);
        let signal = self.context.lock().await.arm_proceed();
        debug!("Dispatching step '{}' ({:?})", name, step.affinity());
        match self.dispatch(step.clone()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("Step '{}' failed: {}", name, e);
                return StepOutcome::Failed;
            }
            Err(_) => {
                error!(
                    "Step '{}' did not complete: it panicked or its thread is gone",
                    name
                );
                return StepOutcome::Failed;
            }
        }

        self.shared.enter_state(EngineState::AwaitProceed);
        if !self.await_proceed(name, signal).await {
            return StepOutcome::Stopped;
        }

        let dwell = self
            .inspect(|ctx| step.preferred_step_duration(ctx))
            .await
            .unwrap_or_else(|panic| {
                error!(
                    "Step '{}' panicked in preferred_step_duration: {}",
                    name, panic
                );
                Duration::ZERO
            });

        self.shared.enter_state(EngineState::Dwell);
        if !dwell.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(dwell) => {}
                _ = self.shared.stopped() => return StepOutcome::Stopped,
            }
        }

        StepOutcome::Completed
    }

    /// Runs `f` against the context, containing any panic it raises.
    async fn inspect<R>(&self, f: impl FnOnce(&MachineContext) -> R) -> Result<R, String> {
        let ctx = self.context.lock().await;
        let result = contain(|| f(&ctx));
        result
    }

    fn dispatch(&self, step: Arc<dyn Step>) -> oneshot::Receiver<Result<(), StepError>> {
        let (tx, rx) = oneshot::channel();
        let context = self.context.clone();
        let affinity = step.affinity();
        let job = async move {
            let mut ctx = context.lock().await;
            let result = step.do_step(&mut ctx).await;
            let _ = tx.send(result);
        };

        match affinity {
            ThreadAffinity::UiThread => {
                if let Err(e) = self.platform.run_later(Box::pin(job)) {
                    error!("Cannot dispatch to UI thread: {}", e);
                }
            }
            ThreadAffinity::AnyThread => {
                tokio::spawn(job);
            }
        }
        rx
    }

    async fn await_proceed(&self, name: &StepName, signal: oneshot::Receiver<()>) -> bool {
        let limit = self.config.proceed_timeout;
        let deadline = async move {
            match limit {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            received = signal => {
                if received.is_err() {
                    debug!("Proceed handle of step '{}' was dropped", name);
                }
                true
            }
            _ = deadline => {
                warn!("Step '{}' did not proceed within {:?}, moving on", name, limit);
                true
            }
            _ = self.shared.stopped() => false,
        }
    }
}

fn contain<R>(f: impl FnOnce() -> R) -> Result<R, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Control over a running engine.
pub struct EngineHandle {
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle")
            .field("status", &self.status())
            .finish()
    }
}

impl EngineHandle {
    /// Requests termination.
    ///
    /// No step body starts after this call; a body already running is not
    /// interrupted. Calling it again has no further effect.
    pub fn stop(&self) {
        if !self.shared.stop.send_replace(true) {
            info!("Stop requested");
            self.shared.enter_state(EngineState::Stopping);
        }
    }

    /// Makes the next selection start over at the first step.
    pub fn restart(&self) {
        self.shared.restart.store(true, Ordering::SeqCst);
    }

    /// Returns `true` while the control loop has not exited.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Number of full passes over the sequence so far.
    pub fn completed_cycles(&self) -> u64 {
        *self.shared.cycles.borrow()
    }

    /// Waits until at least `cycles` full passes have completed.
    pub async fn wait_for_cycles(&self, cycles: u64) {
        let mut rx = self.shared.cycles.subscribe();
        loop {
            if *rx.borrow_and_update() >= cycles {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Returns a snapshot of the engine.
    pub fn status(&self) -> EngineStatus {
        let (state, current_step) = self.shared.position.lock().clone();
        EngineStatus {
            state,
            current_step,
            completed_cycles: self.completed_cycles(),
            running: self.is_running(),
        }
    }

    /// Waits for the control loop to exit.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            error!("Step engine task ended abnormally: {}", e);
        }
    }

    /// Stops the engine and waits for the control loop to exit.
    pub async fn shutdown(self) {
        self.stop();
        self.join().await;
    }
}

/// Builder for constructing [`StepEngine`] instances.
#[derive(Default)]
pub struct StepEngineBuilder {
    steps: Vec<ConfiguredStep>,
    providers: DataProviders,
    visualizations: Visualizations,
    controllables: Vec<(String, Arc<dyn Controllable>)>,
    platform: Option<Arc<dyn Platform>>,
    config: EngineConfig,
}

impl StepEngineBuilder {
    /// Creates a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step under an explicit name.
    pub fn add_step<S: Step + 'static>(mut self, name: impl Into<StepName>, step: S) -> Self {
        self.steps.push(ConfiguredStep::new(name, Arc::new(step)));
        self
    }

    /// Appends an already configured step.
    pub fn add_configured(mut self, step: ConfiguredStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Appends several configured steps in order.
    pub fn steps(mut self, steps: impl IntoIterator<Item = ConfiguredStep>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Sets the resolved data providers.
    pub fn data_providers(mut self, providers: DataProviders) -> Self {
        self.providers = providers;
        self
    }

    /// Sets the resolved visualizations.
    pub fn visualizations(mut self, visualizations: Visualizations) -> Self {
        self.visualizations = visualizations;
        self
    }

    /// Registers a named controllable resource in the machine context.
    pub fn controllable(
        mut self,
        name: impl Into<String>,
        resource: Arc<dyn Controllable>,
    ) -> Self {
        self.controllables.push((name.into(), resource));
        self
    }

    /// Uses `platform` as the UI thread.
    pub fn platform(mut self, platform: Arc<dyn Platform>) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Gives up waiting for a step to proceed after `limit`.
    pub fn proceed_timeout(mut self, limit: Duration) -> Self {
        self.config.proceed_timeout = Some(limit);
        self
    }

    /// Replaces the engine options.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the engine.
    ///
    /// Spawns a [`UiThread`] if no platform was supplied.
    pub fn build(self) -> Result<StepEngine, ConfigError> {
        if self.steps.is_empty() {
            return Err(ConfigError::EmptySequence);
        }

        let platform: Arc<dyn Platform> = match self.platform {
            Some(platform) => platform,
            None => Arc::new(UiThread::spawn()?),
        };

        let mut context = MachineContext::with_resources(self.providers, self.visualizations);
        for (name, resource) in self.controllables {
            context.register_controllable(name, resource);
        }

        Ok(StepEngine {
            steps: self.steps,
            context,
            platform,
            config: self.config,
        })
    }
}
