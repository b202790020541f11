use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tweetwall_core::{
    ConfigError, MachineContext, Step, StepDefinition, StepError, StepFactory, TimeSpan,
};

#[derive(Debug, Deserialize)]
struct ShowConfig {
    visualization: String,
    #[serde(default)]
    dwell: Option<TimeSpan>,
}

/// Shows a visualization.
///
/// The visualization decides when the step is done by proceeding through
/// its [`VisualizationContext`](tweetwall_core::VisualizationContext),
/// typically once its animation finished.
#[derive(Debug, Clone)]
pub struct Show {
    visualization: String,
    dwell: Duration,
}

impl Show {
    pub fn new(visualization: impl Into<String>) -> Self {
        Self {
            visualization: visualization.into(),
            dwell: Duration::ZERO,
        }
    }

    /// Holds the shown visualization for `dwell` after it proceeded.
    pub fn with_dwell(mut self, dwell: Duration) -> Self {
        self.dwell = dwell;
        self
    }
}

#[async_trait]
impl Step for Show {
    async fn do_step(&self, ctx: &mut MachineContext) -> Result<(), StepError> {
        let id = self.visualization.as_str();
        let visualization = ctx
            .visualization(id)
            .ok_or_else(|| StepError::MissingVisualization(id.to_string()))?;
        let showable = visualization
            .as_showable()
            .ok_or_else(|| StepError::NotShowable(id.to_string()))?;
        showable.show(ctx.visualization_context(id))
    }

    fn preferred_step_duration(&self, _ctx: &MachineContext) -> Duration {
        self.dwell
    }
}

/// Builds [`Show`] steps.
///
/// ```json
/// { "step": "Show", "config": { "visualization": "schedule" } }
/// ```
pub struct ShowFactory;

impl StepFactory for ShowFactory {
    fn kind(&self) -> &'static str {
        "Show"
    }

    fn create(&self, definition: &StepDefinition) -> Result<Arc<dyn Step>, ConfigError> {
        let config: ShowConfig = definition.config()?;
        let dwell = config.dwell.map(|d| d.as_duration()).unwrap_or_default();
        Ok(Arc::new(Show::new(config.visualization).with_dwell(dwell)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tweetwall_core::{
        DataProviders, Showable, ThreadAffinity, Visualization, VisualizationContext,
        Visualizations,
    };

    #[derive(Default)]
    struct Panel {
        shown: Mutex<Vec<String>>,
    }

    impl Showable for Panel {
        fn show(&self, ctx: VisualizationContext) -> Result<(), StepError> {
            self.shown.lock().push(ctx.id().to_string());
            ctx.proceed();
            Ok(())
        }
    }

    impl Visualization for Panel {
        fn as_showable(&self) -> Option<&dyn Showable> {
            Some(self)
        }
    }

    struct Backdrop;

    impl Visualization for Backdrop {}

    fn context() -> (MachineContext, Arc<Panel>) {
        let panel = Arc::new(Panel::default());
        let mut visualizations = Visualizations::new();
        visualizations.insert("schedule", panel.clone()).unwrap();
        visualizations.insert("backdrop", Arc::new(Backdrop)).unwrap();
        (
            MachineContext::with_resources(DataProviders::new(), visualizations),
            panel,
        )
    }

    #[tokio::test]
    async fn test_show_delegates_proceed() {
        let (mut ctx, panel) = context();
        let mut signal = ctx.arm_proceed();
        Show::new("schedule").do_step(&mut ctx).await.unwrap();
        assert_eq!(*panel.shown.lock(), vec!["schedule".to_string()]);
        assert!(signal.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_show_errors() {
        let (mut ctx, _) = context();
        assert!(matches!(
            Show::new("missing").do_step(&mut ctx).await,
            Err(StepError::MissingVisualization(_))
        ));
        assert!(matches!(
            Show::new("backdrop").do_step(&mut ctx).await,
            Err(StepError::NotShowable(_))
        ));
    }

    #[test]
    fn test_show_factory() {
        let definition = StepDefinition::new("Show").with("visualization", "schedule");
        let step = ShowFactory.create(&definition).unwrap();
        assert_eq!(step.affinity(), ThreadAffinity::UiThread);
        assert!(ShowFactory.create(&StepDefinition::new("Show")).is_err());
    }
}
