use crate::filter_chain::{FilterChain, FilterChainFactory};
use crate::filters::Post;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};
use tweetwall_core::{
    ConfigError, DataProvider, DataProviderFactory, DataProviderSetting, ProviderInstance,
    ProviderType,
};

const DEFAULT_HISTORY_SIZE: usize = 25;

/// What [`TweetProvider::advance`] moved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// A post that has not been shown before.
    Fresh,
    /// An already shown post from the history.
    Rotated,
    /// There is nothing to show.
    Empty,
}

/// The current post together with values derived from it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TweetSnapshot {
    pub current: Option<Post>,
    pub image: Option<String>,
    pub fresh: usize,
    pub total: usize,
}

#[derive(Default)]
struct TweetState {
    posts: VecDeque<Post>,
    cursor: Option<usize>,
    image: Option<String>,
    // Newest posts at the back of `posts` that were never current.
    fresh: usize,
}

impl TweetState {
    fn select(&mut self, index: Option<usize>) {
        self.cursor = index;
        self.image = index
            .and_then(|i| self.posts.get(i))
            .and_then(Post::first_media)
            .map(str::to_string);
    }
}

/// A bounded history of admitted posts and a cursor over it.
///
/// Ingestion pushes through [`offer`](Self::offer) at its own pace; the
/// display loop rotates with [`advance`](Self::advance). The list, the
/// cursor and the derived image are guarded by one lock and always change
/// together.
pub struct TweetProvider {
    history_size: usize,
    filter: Option<FilterChain<Post>>,
    state: RwLock<TweetState>,
}

impl fmt::Debug for TweetProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TweetProvider")
            .field("history_size", &self.history_size)
            .field("filter", &self.filter)
            .field("len", &self.len())
            .finish()
    }
}

impl DataProvider for TweetProvider {
    const KIND: &'static str = "TweetDataProvider";
}

impl Default for TweetProvider {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl TweetProvider {
    /// Creates a provider keeping at most `history_size` posts.
    pub fn new(history_size: usize) -> Self {
        Self {
            history_size: history_size.max(1),
            filter: None,
            state: RwLock::new(TweetState::default()),
        }
    }

    /// Admits only posts accepted by `filter`.
    pub fn with_filter(mut self, filter: FilterChain<Post>) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Offers an incoming post. Returns `true` if it was stored.
    ///
    /// Posts rejected by the filter chain and posts already held are dropped.
    pub fn offer(&self, post: Post) -> bool {
        if let Some(filter) = &self.filter {
            if !filter.evaluate(&post) {
                trace!("Post {} by {} rejected", post.id, post.author);
                return false;
            }
        }

        let mut state = self.state.write();
        if state.posts.iter().any(|p| p.id == post.id) {
            return false;
        }
        debug!("Storing post {} by {}", post.id, post.author);
        state.posts.push_back(post);
        state.fresh = (state.fresh + 1).min(self.history_size);

        if state.posts.len() > self.history_size {
            state.posts.pop_front();
            let cursor = state.cursor.and_then(|c| c.checked_sub(1));
            state.select(cursor);
        }
        true
    }

    /// Moves to the oldest unseen post, or to the next post of the history.
    pub fn advance(&self) -> Advance {
        let mut state = self.state.write();
        let len = state.posts.len();
        if len == 0 {
            return Advance::Empty;
        }

        if state.fresh > 0 {
            let index = len - state.fresh;
            state.fresh -= 1;
            state.select(Some(index));
            Advance::Fresh
        } else {
            let index = state.cursor.map_or(0, |c| (c + 1) % len);
            state.select(Some(index));
            Advance::Rotated
        }
    }

    /// The current post.
    pub fn current(&self) -> Option<Post> {
        let state = self.state.read();
        state.cursor.and_then(|i| state.posts.get(i)).cloned()
    }

    /// The image of the current post.
    pub fn current_image(&self) -> Option<String> {
        self.state.read().image.clone()
    }

    /// The current post and its derived values, read consistently.
    pub fn snapshot(&self) -> TweetSnapshot {
        let state = self.state.read();
        TweetSnapshot {
            current: state.cursor.and_then(|i| state.posts.get(i)).cloned(),
            image: state.image.clone(),
            fresh: state.fresh,
            total: state.posts.len(),
        }
    }

    /// All held posts, oldest first.
    pub fn posts(&self) -> Vec<Post> {
        self.state.read().posts.iter().cloned().collect()
    }

    /// Number of held posts.
    pub fn len(&self) -> usize {
        self.state.read().posts.len()
    }

    /// Returns `true` if no post is held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Deserialize)]
struct TweetProviderConfig {
    #[serde(default = "default_history_size")]
    history_size: usize,
    #[serde(default)]
    filter_chain: Option<String>,
}

fn default_history_size() -> usize {
    DEFAULT_HISTORY_SIZE
}

/// Builds the [`TweetProvider`].
///
/// ```json
/// { "implementation": "TweetDataProvider",
///   "config": { "history_size": 50, "filter_chain": "wall" } }
/// ```
#[derive(Debug, Default)]
pub struct TweetProviderFactory {
    filters: Option<Arc<FilterChainFactory>>,
}

impl TweetProviderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `filter_chain` settings through `filters`.
    pub fn with_filters(filters: Arc<FilterChainFactory>) -> Self {
        Self {
            filters: Some(filters),
        }
    }
}

impl DataProviderFactory for TweetProviderFactory {
    fn provider_type(&self) -> ProviderType {
        ProviderType::of::<TweetProvider>()
    }

    fn create(&self, setting: &DataProviderSetting) -> Result<ProviderInstance, ConfigError> {
        let config: TweetProviderConfig = setting.config()?;
        let mut provider = TweetProvider::new(config.history_size);

        if let Some(name) = config.filter_chain {
            let filters = self
                .filters
                .as_ref()
                .ok_or_else(|| ConfigError::UnknownFilterChain(name.clone()))?;
            provider = provider.with_filter(filters.create_filter_chain::<Post>(&name)?);
        }
        Ok(ProviderInstance::new(Arc::new(provider)))
    }
}
