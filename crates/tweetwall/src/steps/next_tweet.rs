use crate::providers::{Advance, TweetProvider};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use tweetwall_core::{
    ConfigError, MachineContext, ProviderType, Step, StepDefinition, StepError, StepFactory,
    ThreadAffinity,
};

#[derive(Debug, Default, Deserialize)]
struct NextTweetConfig {
    #[serde(default)]
    skip_token: Option<String>,
}

/// Rotates the [`TweetProvider`] to its next post.
///
/// With a `skip_token` the token is set in the context when no fresh post
/// was available, and cleared when one was.
#[derive(Debug, Clone, Default)]
pub struct NextTweet {
    skip_token: Option<String>,
}

impl NextTweet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals `token` to later steps when there is nothing new.
    pub fn signalling(token: impl Into<String>) -> Self {
        Self {
            skip_token: Some(token.into()),
        }
    }
}

#[async_trait]
impl Step for NextTweet {
    async fn do_step(&self, ctx: &mut MachineContext) -> Result<(), StepError> {
        let tweets = ctx.require_data_provider::<TweetProvider>()?;
        let advance = tweets.advance();
        debug!("Tweet rotation: {:?}", advance);

        if let Some(token) = &self.skip_token {
            if advance == Advance::Fresh {
                if ctx.skip_token() == Some(token.as_str()) {
                    ctx.clear_skip_token();
                }
            } else {
                ctx.set_skip_token(token.clone());
            }
        }

        ctx.proceed();
        Ok(())
    }

    fn affinity(&self) -> ThreadAffinity {
        ThreadAffinity::AnyThread
    }
}

/// Builds [`NextTweet`] steps.
pub struct NextTweetFactory;

impl StepFactory for NextTweetFactory {
    fn kind(&self) -> &'static str {
        "NextTweet"
    }

    fn create(&self, definition: &StepDefinition) -> Result<Arc<dyn Step>, ConfigError> {
        let config: NextTweetConfig = definition.config()?;
        Ok(Arc::new(NextTweet {
            skip_token: config.skip_token,
        }))
    }

    fn required_data_providers(&self, _definition: &StepDefinition) -> Vec<ProviderType> {
        vec![ProviderType::of::<TweetProvider>()]
    }
}
