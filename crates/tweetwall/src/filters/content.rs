use super::post::Post;
use serde::Deserialize;
use tweetwall_core::{
    ConfigError, FilterResult, FilterStep, FilterStepDefinition, FilterStepFactory,
};

/// Verdict a matching [`ContainsText`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnMatch {
    Accept,
    #[default]
    Reject,
}

impl From<OnMatch> for FilterResult {
    fn from(on_match: OnMatch) -> Self {
        match on_match {
            OnMatch::Accept => FilterResult::Accepted,
            OnMatch::Reject => FilterResult::Rejected,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ContainsTextConfig {
    phrases: Vec<String>,
    #[serde(default)]
    on_match: OnMatch,
    #[serde(default)]
    case_sensitive: bool,
}

/// Decides on posts whose text contains one of the configured phrases.
#[derive(Debug)]
pub struct ContainsText {
    phrases: Vec<String>,
    on_match: OnMatch,
    case_sensitive: bool,
}

impl ContainsText {
    pub fn new<I, S>(phrases: I, on_match: OnMatch, case_sensitive: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let phrases = phrases
            .into_iter()
            .map(Into::into)
            .map(|p: String| if case_sensitive { p } else { p.to_lowercase() })
            .collect();
        Self {
            phrases,
            on_match,
            case_sensitive,
        }
    }
}

impl FilterStep<Post> for ContainsText {
    fn check(&self, post: &Post) -> FilterResult {
        let text = if self.case_sensitive {
            post.text.clone()
        } else {
            post.text.to_lowercase()
        };
        if self.phrases.iter().any(|p| text.contains(p.as_str())) {
            self.on_match.into()
        } else {
            FilterResult::NothingDefinite
        }
    }
}

/// Rejects reshares.
#[derive(Debug, Default)]
pub struct RejectReposts;

impl FilterStep<Post> for RejectReposts {
    fn check(&self, post: &Post) -> FilterResult {
        if post.is_repost() {
            FilterResult::Rejected
        } else {
            FilterResult::NothingDefinite
        }
    }
}

/// Rejects posts flagged as possibly sensitive.
#[derive(Debug, Default)]
pub struct RejectSensitive;

impl FilterStep<Post> for RejectSensitive {
    fn check(&self, post: &Post) -> FilterResult {
        if post.possibly_sensitive {
            FilterResult::Rejected
        } else {
            FilterResult::NothingDefinite
        }
    }
}

pub struct ContainsTextFactory;

impl FilterStepFactory<Post> for ContainsTextFactory {
    fn kind(&self) -> &'static str {
        "ContainsText"
    }

    fn create(
        &self,
        definition: &FilterStepDefinition,
    ) -> Result<Box<dyn FilterStep<Post>>, ConfigError> {
        let config: ContainsTextConfig = definition.config()?;
        Ok(Box::new(ContainsText::new(
            config.phrases,
            config.on_match,
            config.case_sensitive,
        )))
    }
}

pub struct RejectRepostsFactory;

impl FilterStepFactory<Post> for RejectRepostsFactory {
    fn kind(&self) -> &'static str {
        "RejectReposts"
    }

    fn create(
        &self,
        _definition: &FilterStepDefinition,
    ) -> Result<Box<dyn FilterStep<Post>>, ConfigError> {
        Ok(Box::new(RejectReposts))
    }
}

pub struct RejectSensitiveFactory;

impl FilterStepFactory<Post> for RejectSensitiveFactory {
    fn kind(&self) -> &'static str {
        "RejectSensitive"
    }

    fn create(
        &self,
        _definition: &FilterStepDefinition,
    ) -> Result<Box<dyn FilterStep<Post>>, ConfigError> {
        Ok(Box::new(RejectSensitive))
    }
}
