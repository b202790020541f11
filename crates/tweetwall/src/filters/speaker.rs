use super::post::{normalize_handle, Post};
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use tweetwall_core::{
    ConfigError, FilterResult, FilterStep, FilterStepDefinition, FilterStepFactory,
};

/// Error raised by a speaker handle loader.
pub type LoadError = Box<dyn std::error::Error + Send + Sync>;

type Loader = Box<dyn Fn() -> Result<Vec<String>, LoadError> + Send + Sync>;

/// The social media handles of conference speakers.
///
/// Handles are fetched through the loader on first use and then kept for the
/// lifetime of the cache. Only [`refresh`](Self::refresh) fetches again.
pub struct SpeakerHandleCache {
    loader: Loader,
    handles: RwLock<Option<Arc<HashSet<String>>>>,
}

impl fmt::Debug for SpeakerHandleCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeakerHandleCache")
            .field("loaded", &self.handles.read().is_some())
            .finish()
    }
}

impl SpeakerHandleCache {
    /// Creates a cache that fetches handles through `loader`.
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> Result<Vec<String>, LoadError> + Send + Sync + 'static,
    {
        Self {
            loader: Box::new(loader),
            handles: RwLock::new(None),
        }
    }

    /// Creates a cache over a fixed set of handles.
    pub fn from_handles<I, S>(handles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let handles: Vec<String> = handles.into_iter().map(Into::into).collect();
        Self::new(move || Ok(handles.clone()))
    }

    /// Current handles, loading them on first use.
    ///
    /// A failed first load yields an empty set and is retried on the next call.
    pub fn handles(&self) -> Arc<HashSet<String>> {
        if let Some(handles) = self.handles.read().as_ref() {
            return handles.clone();
        }

        let mut slot = self.handles.write();
        if let Some(handles) = slot.as_ref() {
            return handles.clone();
        }
        match self.load() {
            Ok(handles) => {
                *slot = Some(handles.clone());
                handles
            }
            Err(e) => {
                warn!("Failed to load speaker handles: {}", e);
                Arc::new(HashSet::new())
            }
        }
    }

    /// Fetches the handles again; the previous set is kept on failure.
    pub fn refresh(&self) -> Result<usize, LoadError> {
        let handles = self.load()?;
        let count = handles.len();
        *self.handles.write() = Some(handles);
        Ok(count)
    }

    /// Returns `true` if `handle` belongs to a speaker.
    pub fn is_speaker(&self, handle: &str) -> bool {
        self.handles().contains(&normalize_handle(handle))
    }

    fn load(&self) -> Result<Arc<HashSet<String>>, LoadError> {
        let handles: HashSet<String> = (self.loader)()?
            .iter()
            .map(|h| normalize_handle(h))
            .filter(|h| !h.is_empty())
            .collect();
        debug!("Loaded {} speaker handles", handles.len());
        Ok(Arc::new(handles))
    }
}

#[derive(Debug, Default, Deserialize)]
struct SpeakerConfig {
    #[serde(default)]
    include_related: bool,
}

/// Accepts posts by speakers.
///
/// With `include_related` a reshare or quote of a speaker's post is accepted
/// as well.
#[derive(Debug)]
pub struct Speaker {
    cache: Arc<SpeakerHandleCache>,
    include_related: bool,
}

impl Speaker {
    pub fn new(cache: Arc<SpeakerHandleCache>, include_related: bool) -> Self {
        Self {
            cache,
            include_related,
        }
    }
}

impl FilterStep<Post> for Speaker {
    fn check(&self, post: &Post) -> FilterResult {
        let speaker = self.cache.is_speaker(&post.author)
            || (self.include_related
                && post
                    .related_authors()
                    .into_iter()
                    .any(|a| self.cache.is_speaker(a)));
        if speaker {
            FilterResult::Accepted
        } else {
            FilterResult::NothingDefinite
        }
    }
}

pub struct SpeakerFactory {
    cache: Arc<SpeakerHandleCache>,
}

impl SpeakerFactory {
    pub fn new(cache: Arc<SpeakerHandleCache>) -> Self {
        Self { cache }
    }
}

impl FilterStepFactory<Post> for SpeakerFactory {
    fn kind(&self) -> &'static str {
        "Speaker"
    }

    fn create(
        &self,
        definition: &FilterStepDefinition,
    ) -> Result<Box<dyn FilterStep<Post>>, ConfigError> {
        let config: SpeakerConfig = definition.config()?;
        Ok(Box::new(Speaker::new(
            self.cache.clone(),
            config.include_related,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_cache_loads_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let cache = SpeakerHandleCache::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec!["@Duke".to_string()])
        });

        assert!(cache.is_speaker("duke"));
        assert!(cache.is_speaker("@DUKE"));
        assert!(!cache.is_speaker("tux"));
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        assert_eq!(cache.refresh().unwrap(), 1);
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failed_refresh_keeps_handles() {
        let fail = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = fail.clone();
        let cache = SpeakerHandleCache::new(move || {
            if flag.load(Ordering::SeqCst) {
                Err("conference api down".into())
            } else {
                Ok(vec!["duke".to_string()])
            }
        });

        assert!(cache.is_speaker("duke"));
        fail.store(true, Ordering::SeqCst);
        assert!(cache.refresh().is_err());
        assert!(cache.is_speaker("duke"));
    }

    #[test]
    fn test_speaker_step() {
        let cache = Arc::new(SpeakerHandleCache::from_handles(["duke"]));
        let quote = Post::new("2", "fan", "so true").quoting(Post::new("1", "duke", "talk"));

        let direct = Speaker::new(cache.clone(), false);
        assert_eq!(direct.check(&Post::new("1", "duke", "")), FilterResult::Accepted);
        assert_eq!(direct.check(&quote), FilterResult::NothingDefinite);

        let definition = FilterStepDefinition::new("Speaker").with("include_related", true);
        let related = SpeakerFactory::new(cache).create(&definition).unwrap();
        assert_eq!(related.check(&quote), FilterResult::Accepted);
    }
}
