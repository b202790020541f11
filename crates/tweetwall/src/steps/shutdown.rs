use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use tweetwall_core::{
    ConfigError, MachineContext, Step, StepDefinition, StepError, StepFactory, ThreadAffinity,
};

#[derive(Debug, Deserialize)]
struct ShutdownConfig {
    controllable: String,
}

/// Shuts a named controllable resource down, then proceeds.
#[derive(Debug, Clone)]
pub struct Shutdown {
    controllable: String,
}

impl Shutdown {
    pub fn new(controllable: impl Into<String>) -> Self {
        Self {
            controllable: controllable.into(),
        }
    }
}

#[async_trait]
impl Step for Shutdown {
    async fn do_step(&self, ctx: &mut MachineContext) -> Result<(), StepError> {
        let resource = ctx
            .controllable(&self.controllable)
            .ok_or_else(|| StepError::MissingControllable(self.controllable.clone()))?;
        info!("Shutting down '{}'", self.controllable);
        resource.shutdown();
        ctx.proceed();
        Ok(())
    }

    fn affinity(&self) -> ThreadAffinity {
        ThreadAffinity::AnyThread
    }
}

/// Builds [`Shutdown`] steps.
pub struct ShutdownFactory;

impl StepFactory for ShutdownFactory {
    fn kind(&self) -> &'static str {
        "Shutdown"
    }

    fn create(&self, definition: &StepDefinition) -> Result<Arc<dyn Step>, ConfigError> {
        let config: ShutdownConfig = definition.config()?;
        Ok(Arc::new(Shutdown::new(config.controllable)))
    }
}
