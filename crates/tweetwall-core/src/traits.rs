//! Optional capability traits.

use crate::error::StepError;
use crate::visualization::VisualizationContext;

/// Capability of a visualization to be shown.
///
/// The visualization owns completion: it calls
/// [`VisualizationContext::proceed`] once it is done, possibly much later from
/// an animation callback.
///
/// # Examples
///
/// ```
/// use tweetwall_core::{Showable, StepError, Visualization, VisualizationContext};
///
/// struct Banner;
///
/// impl Showable for Banner {
///     fn show(&self, ctx: VisualizationContext) -> Result<(), StepError> {
///         ctx.proceed();
///         Ok(())
///     }
/// }
///
/// impl Visualization for Banner {
///     fn as_showable(&self) -> Option<&dyn Showable> {
///         Some(self)
///     }
/// }
/// ```
pub trait Showable: Send + Sync {
    /// Shows the visualization.
    fn show(&self, ctx: VisualizationContext) -> Result<(), StepError>;
}

/// A named background resource that can be shut down from a step.
///
/// # Examples
///
/// ```
/// use tweetwall_core::Controllable;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// #[derive(Default)]
/// struct Listener {
///     stopped: AtomicBool,
/// }
///
/// impl Controllable for Listener {
///     fn shutdown(&self) {
///         self.stopped.store(true, Ordering::SeqCst);
///     }
/// }
/// ```
pub trait Controllable: Send + Sync {
    /// Stops the resource. Calling it more than once must be harmless.
    fn shutdown(&self);
}
