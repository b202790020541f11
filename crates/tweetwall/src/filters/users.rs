use super::post::{normalize_handle, Post};
use serde::Deserialize;
use std::collections::HashSet;
use tweetwall_core::{
    ConfigError, FilterResult, FilterStep, FilterStepDefinition, FilterStepFactory,
};

#[derive(Debug, Deserialize)]
struct UsersConfig {
    users: Vec<String>,
    #[serde(default)]
    include_related: bool,
}

impl UsersConfig {
    fn handles(&self) -> HashSet<String> {
        self.users.iter().map(|u| normalize_handle(u)).collect()
    }
}

/// Accepts posts written by one of the listed users.
#[derive(Debug)]
pub struct AllowedUsers {
    users: HashSet<String>,
}

impl AllowedUsers {
    pub fn new<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            users: users.into_iter().map(|u| normalize_handle(u.as_ref())).collect(),
        }
    }
}

impl FilterStep<Post> for AllowedUsers {
    fn check(&self, post: &Post) -> FilterResult {
        if self.users.contains(&normalize_handle(&post.author)) {
            FilterResult::Accepted
        } else {
            FilterResult::NothingDefinite
        }
    }
}

/// Rejects posts written by one of the listed users.
///
/// With `include_related` the authors of reshared and quoted posts are
/// checked as well.
#[derive(Debug)]
pub struct BlockedUsers {
    users: HashSet<String>,
    include_related: bool,
}

impl BlockedUsers {
    pub fn new<I, S>(users: I, include_related: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            users: users.into_iter().map(|u| normalize_handle(u.as_ref())).collect(),
            include_related,
        }
    }

    fn is_blocked(&self, author: &str) -> bool {
        self.users.contains(&normalize_handle(author))
    }
}

impl FilterStep<Post> for BlockedUsers {
    fn check(&self, post: &Post) -> FilterResult {
        let blocked = self.is_blocked(&post.author)
            || (self.include_related
                && post.related_authors().into_iter().any(|a| self.is_blocked(a)));
        if blocked {
            FilterResult::Rejected
        } else {
            FilterResult::NothingDefinite
        }
    }
}

pub struct AllowedUsersFactory;

impl FilterStepFactory<Post> for AllowedUsersFactory {
    fn kind(&self) -> &'static str {
        "AllowedUsers"
    }

    fn create(
        &self,
        definition: &FilterStepDefinition,
    ) -> Result<Box<dyn FilterStep<Post>>, ConfigError> {
        let config: UsersConfig = definition.config()?;
        Ok(Box::new(AllowedUsers {
            users: config.handles(),
        }))
    }
}

pub struct BlockedUsersFactory;

impl FilterStepFactory<Post> for BlockedUsersFactory {
    fn kind(&self) -> &'static str {
        "BlockedUsers"
    }

    fn create(
        &self,
        definition: &FilterStepDefinition,
    ) -> Result<Box<dyn FilterStep<Post>>, ConfigError> {
        let config: UsersConfig = definition.config()?;
        Ok(Box::new(BlockedUsers {
            users: config.handles(),
            include_related: config.include_related,
        }))
    }
}
