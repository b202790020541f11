use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tweetwall_core::{
    ConfigError, MachineContext, Step, StepDefinition, StepError, StepFactory, TimeSpan,
};

#[derive(Debug, Deserialize)]
struct PauseConfig {
    #[serde(flatten)]
    span: TimeSpan,
    #[serde(default)]
    skip_token: Option<String>,
}

/// Holds the current screen for a fixed time.
///
/// With a `skip_token` the pause is passed over while the context carries
/// that token.
#[derive(Debug, Clone)]
pub struct Pause {
    duration: Duration,
    skip_token: Option<String>,
}

impl Pause {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            skip_token: None,
        }
    }

    /// Skips the pause while the context carries `token`.
    pub fn skip_on(mut self, token: impl Into<String>) -> Self {
        self.skip_token = Some(token.into());
        self
    }
}

#[async_trait]
impl Step for Pause {
    async fn do_step(&self, ctx: &mut MachineContext) -> Result<(), StepError> {
        ctx.proceed();
        Ok(())
    }

    fn should_skip(&self, ctx: &MachineContext) -> bool {
        self.skip_token.is_some() && ctx.skip_token() == self.skip_token.as_deref()
    }

    fn preferred_step_duration(&self, _ctx: &MachineContext) -> Duration {
        self.duration
    }
}

/// Builds [`Pause`] steps.
///
/// ```json
/// { "step": "Pause", "config": { "amount": 5, "unit": "seconds", "skip_token": "no-news" } }
/// ```
pub struct PauseFactory;

impl StepFactory for PauseFactory {
    fn kind(&self) -> &'static str {
        "Pause"
    }

    fn create(&self, definition: &StepDefinition) -> Result<Arc<dyn Step>, ConfigError> {
        let config: PauseConfig = definition.config()?;
        Ok(Arc::new(Pause {
            duration: config.span.as_duration(),
            skip_token: config.skip_token,
        }))
    }
}
