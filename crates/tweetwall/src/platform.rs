//! The single UI/render thread.

use std::future::Future;
use std::pin::Pin;
use std::thread::{self, ThreadId};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::{self, LocalSet};
use tracing::{debug, error};
use tweetwall_core::ConfigError;

/// Name of the thread spawned by [`UiThread`].
pub const UI_THREAD_NAME: &str = "tweetwall-ui";

/// A unit of work marshalled onto the UI thread.
pub type UiJob = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Returned when the UI thread no longer accepts jobs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("UI thread is no longer running")]
pub struct PlatformClosed;

/// Access to the UI-affine execution context.
pub trait Platform: Send + Sync {
    /// Queues `job` to run on the UI thread after everything queued before it.
    fn run_later(&self, job: UiJob) -> Result<(), PlatformClosed>;

    /// Returns `true` when called on the UI thread.
    fn is_ui_thread(&self) -> bool;
}

/// A dedicated OS thread that executes [`UiJob`]s strictly one at a time.
///
/// The thread owns a current-thread tokio runtime that runs for its whole
/// lifetime. Jobs are awaited one after another, while tasks spawned from a job
/// (`tokio::spawn` or `spawn_local`) keep being polled between jobs, so a
/// visualization can finish an animation on the UI thread later. A panicking
/// job is logged and the thread keeps serving the queue.
#[derive(Debug)]
pub struct UiThread {
    jobs: mpsc::UnboundedSender<UiJob>,
    thread_id: ThreadId,
}

impl UiThread {
    /// Spawns the UI thread.
    pub fn spawn() -> Result<Self, ConfigError> {
        let (jobs, mut queue) = mpsc::unbounded_channel::<UiJob>();
        let runtime = ui_runtime().map_err(|e| ConfigError::Platform(e.to_string()))?;

        let handle = thread::Builder::new()
            .name(UI_THREAD_NAME.to_string())
            .spawn(move || {
                debug!("UI thread started");
                let local = LocalSet::new();
                local.block_on(&runtime, async move {
                    while let Some(job) = queue.recv().await {
                        if let Err(e) = task::spawn_local(job).await {
                            if e.is_panic() {
                                error!("UI job panicked");
                            } else {
                                debug!("UI job cancelled");
                            }
                        }
                    }
                });
                debug!("UI thread finished");
            })
            .map_err(|e| ConfigError::Platform(e.to_string()))?;

        Ok(Self {
            jobs,
            thread_id: handle.thread().id(),
        })
    }

    /// Queues a plain closure on the UI thread.
    pub fn run_later_fn<F>(&self, f: F) -> Result<(), PlatformClosed>
    where
        F: FnOnce() + Send + 'static,
    {
        self.run_later(Box::pin(async move { f() }))
    }
}

fn ui_runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

impl Platform for UiThread {
    fn run_later(&self, job: UiJob) -> Result<(), PlatformClosed> {
        self.jobs.send(job).map_err(|_| PlatformClosed)
    }

    fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }
}
