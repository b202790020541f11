use crate::providers::{RefreshOutcome, ScheduleProvider};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;
use tweetwall_core::{
    ConfigError, MachineContext, ProviderType, Step, StepDefinition, StepError, StepFactory,
    ThreadAffinity, TimeSpan, TimeUnit,
};

const DEFAULT_INTERVAL_MINUTES: u64 = 15;

#[derive(Debug, Deserialize)]
struct ScheduleRefreshConfig {
    #[serde(default = "default_amount")]
    amount: u64,
    #[serde(default = "default_unit")]
    unit: TimeUnit,
}

fn default_amount() -> u64 {
    DEFAULT_INTERVAL_MINUTES
}

fn default_unit() -> TimeUnit {
    TimeUnit::Minutes
}

/// Refreshes the [`ScheduleProvider`] at most once per interval.
///
/// Between refreshes the step is skipped, so it costs nothing in a fast loop.
#[derive(Debug)]
pub struct ScheduleRefresh {
    interval: Duration,
    /// `None` once the interval reaches past what `Instant` can represent.
    next_run: Mutex<Option<Instant>>,
}

impl ScheduleRefresh {
    /// Creates a step that refreshes on its first turn and then every `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_run: Mutex::new(Some(Instant::now())),
        }
    }
}

#[async_trait]
impl Step for ScheduleRefresh {
    async fn do_step(&self, ctx: &mut MachineContext) -> Result<(), StepError> {
        let schedule = ctx.require_data_provider::<ScheduleProvider>()?;
        if let RefreshOutcome::Updated(count) = schedule.refresh().await {
            info!("Schedule now holds {} sessions", count);
        }
        *self.next_run.lock() = Instant::now().checked_add(self.interval);
        ctx.proceed();
        Ok(())
    }

    fn should_skip(&self, _ctx: &MachineContext) -> bool {
        match *self.next_run.lock() {
            Some(next_run) => Instant::now() < next_run,
            None => true,
        }
    }

    fn affinity(&self) -> ThreadAffinity {
        ThreadAffinity::AnyThread
    }
}

/// Builds [`ScheduleRefresh`] steps.
///
/// ```json
/// { "step": "ScheduleRefresh", "config": { "amount": 15, "unit": "minutes" } }
/// ```
pub struct ScheduleRefreshFactory;

impl StepFactory for ScheduleRefreshFactory {
    fn kind(&self) -> &'static str {
        "ScheduleRefresh"
    }

    fn create(&self, definition: &StepDefinition) -> Result<Arc<dyn Step>, ConfigError> {
        let config: ScheduleRefreshConfig = definition.config()?;
        let interval = TimeSpan::new(config.amount, config.unit).as_duration();
        Ok(Arc::new(ScheduleRefresh::new(interval)))
    }

    fn required_data_providers(&self, _definition: &StepDefinition) -> Vec<ProviderType> {
        vec![ProviderType::of::<ScheduleProvider>()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{Session, StaticSchedule};
    use tweetwall_core::{DataProviders, Visualizations};

    #[tokio::test]
    async fn test_refreshes_once_per_interval() {
        let schedule = Arc::new(ScheduleProvider::new(Arc::new(StaticSchedule::new(vec![
            Session {
                id: "1".to_string(),
                title: "Opening".to_string(),
                speakers: Vec::new(),
                room: "Hall".to_string(),
                starts_at: "09:00".to_string(),
                ends_at: None,
            },
        ]))));
        let mut providers = DataProviders::new();
        providers.insert(schedule.clone());
        let mut ctx = MachineContext::with_resources(providers, Visualizations::new());

        let step = ScheduleRefresh::new(Duration::from_secs(60));
        assert!(!step.should_skip(&ctx));

        step.do_step(&mut ctx).await.unwrap();
        assert_eq!(schedule.sessions().len(), 1);
        assert!(step.should_skip(&ctx));
    }

    #[tokio::test]
    async fn test_unrepresentable_interval_means_never_again() {
        let mut providers = DataProviders::new();
        providers.insert(Arc::new(ScheduleProvider::new(Arc::new(StaticSchedule::default()))));
        let mut ctx = MachineContext::with_resources(providers, Visualizations::new());

        let definition = StepDefinition::new("ScheduleRefresh")
            .with("amount", u64::MAX)
            .with("unit", "minutes");
        let step = ScheduleRefreshFactory.create(&definition).unwrap();
        assert!(!step.should_skip(&ctx));

        step.do_step(&mut ctx).await.unwrap();
        assert!(step.should_skip(&ctx));
    }

    #[test]
    fn test_default_interval_is_fifteen_minutes() {
        let definition = StepDefinition::new("ScheduleRefresh");
        let config: ScheduleRefreshConfig = definition.config().unwrap();
        assert_eq!(
            TimeSpan::new(config.amount, config.unit).as_duration(),
            Duration::from_secs(15 * 60)
        );
    }
}
