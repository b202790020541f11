use crate::filters::LoadError;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use tweetwall_core::{
    ConfigError, DataProvider, DataProviderFactory, DataProviderSetting, ProviderInstance,
    ProviderType,
};

/// One talk of the conference schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub speakers: Vec<String>,
    #[serde(default)]
    pub room: String,
    /// Start time as reported by the conference API, e.g. `2024-03-12T09:00`.
    pub starts_at: String,
    #[serde(default)]
    pub ends_at: Option<String>,
}

/// Where schedule data comes from, usually a REST client.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Session>, LoadError>;
}

/// A fixed schedule.
#[derive(Debug, Clone, Default)]
pub struct StaticSchedule {
    sessions: Vec<Session>,
}

impl StaticSchedule {
    pub fn new(sessions: Vec<Session>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl ScheduleSource for StaticSchedule {
    async fn fetch(&self) -> Result<Vec<Session>, LoadError> {
        Ok(self.sessions.clone())
    }
}

/// Result of a [`ScheduleProvider::refresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The schedule was replaced; holds the new session count.
    Updated(usize),
    /// The source failed and the previous schedule is still served.
    KeptLastKnownGood,
}

#[derive(Default)]
struct ScheduleState {
    sessions: Arc<Vec<Session>>,
    refreshed_at: Option<Instant>,
    failed_refreshes: u32,
}

/// The conference schedule, refreshed on demand from a [`ScheduleSource`].
pub struct ScheduleProvider {
    source: Arc<dyn ScheduleSource>,
    state: RwLock<ScheduleState>,
}

impl fmt::Debug for ScheduleProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("ScheduleProvider")
            .field("sessions", &state.sessions.len())
            .field("refreshed_at", &state.refreshed_at)
            .finish()
    }
}

impl DataProvider for ScheduleProvider {
    const KIND: &'static str = "ScheduleDataProvider";
}

impl ScheduleProvider {
    pub fn new(source: Arc<dyn ScheduleSource>) -> Self {
        Self {
            source,
            state: RwLock::new(ScheduleState::default()),
        }
    }

    /// Fetches the schedule again.
    ///
    /// On failure the previous sessions stay in place.
    pub async fn refresh(&self) -> RefreshOutcome {
        match self.source.fetch().await {
            Ok(sessions) => {
                let count = sessions.len();
                let mut state = self.state.write();
                state.sessions = Arc::new(sessions);
                state.refreshed_at = Some(Instant::now());
                state.failed_refreshes = 0;
                debug!("Schedule refreshed with {} sessions", count);
                RefreshOutcome::Updated(count)
            }
            Err(e) => {
                let mut state = self.state.write();
                state.failed_refreshes += 1;
                warn!(
                    "Schedule refresh failed ({} in a row), keeping {} sessions: {}",
                    state.failed_refreshes,
                    state.sessions.len(),
                    e
                );
                RefreshOutcome::KeptLastKnownGood
            }
        }
    }

    /// The current sessions.
    pub fn sessions(&self) -> Arc<Vec<Session>> {
        self.state.read().sessions.clone()
    }

    /// When the schedule was last replaced.
    pub fn refreshed_at(&self) -> Option<Instant> {
        self.state.read().refreshed_at
    }

    /// Number of consecutive failed refreshes.
    pub fn failed_refreshes(&self) -> u32 {
        self.state.read().failed_refreshes
    }
}

/// Builds the [`ScheduleProvider`] over an injected source.
pub struct ScheduleProviderFactory {
    source: Arc<dyn ScheduleSource>,
}

impl fmt::Debug for ScheduleProviderFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduleProviderFactory").finish()
    }
}

impl ScheduleProviderFactory {
    pub fn new(source: Arc<dyn ScheduleSource>) -> Self {
        Self { source }
    }
}

impl DataProviderFactory for ScheduleProviderFactory {
    fn provider_type(&self) -> ProviderType {
        ProviderType::of::<ScheduleProvider>()
    }

    fn create(&self, _setting: &DataProviderSetting) -> Result<ProviderInstance, ConfigError> {
        Ok(ProviderInstance::new(Arc::new(ScheduleProvider::new(
            self.source.clone(),
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn session(id: &str) -> Session {
        Session {
            id: id.to_string(),
            title: format!("Talk {}", id),
            speakers: vec!["duke".to_string()],
            room: "Wintergarten".to_string(),
            starts_at: "2024-03-12T09:00".to_string(),
            ends_at: None,
        }
    }

    struct Flaky {
        down: AtomicBool,
    }

    #[async_trait]
    impl ScheduleSource for Flaky {
        async fn fetch(&self) -> Result<Vec<Session>, LoadError> {
            if self.down.load(Ordering::SeqCst) {
                Err("503 Service Unavailable".into())
            } else {
                Ok(vec![session("1"), session("2")])
            }
        }
    }

    #[tokio::test]
    async fn test_refresh_keeps_last_known_good() {
        let source = Arc::new(Flaky {
            down: AtomicBool::new(false),
        });
        let provider = ScheduleProvider::new(source.clone());
        assert!(provider.sessions().is_empty());
        assert!(provider.refreshed_at().is_none());

        assert_eq!(provider.refresh().await, RefreshOutcome::Updated(2));
        let refreshed_at = provider.refreshed_at();

        source.down.store(true, Ordering::SeqCst);
        assert_eq!(provider.refresh().await, RefreshOutcome::KeptLastKnownGood);
        assert_eq!(provider.sessions().len(), 2);
        assert_eq!(provider.refreshed_at(), refreshed_at);
        assert_eq!(provider.failed_refreshes(), 1);
    }

    #[tokio::test]
    async fn test_static_schedule() {
        let provider = ScheduleProvider::new(Arc::new(StaticSchedule::new(vec![session("a")])));
        provider.refresh().await;
        assert_eq!(provider.sessions()[0].title, "Talk a");
    }
}
