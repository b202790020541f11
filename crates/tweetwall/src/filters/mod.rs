//! The `Post` filter domain and its built-in filter steps.

mod content;
mod post;
mod speaker;
mod users;

pub use content::{
    ContainsText, ContainsTextFactory, OnMatch, RejectReposts, RejectRepostsFactory,
    RejectSensitive, RejectSensitiveFactory,
};
pub use post::Post;
pub use speaker::{LoadError, Speaker, SpeakerFactory, SpeakerHandleCache};
pub use users::{AllowedUsers, AllowedUsersFactory, BlockedUsers, BlockedUsersFactory};

use crate::filter_chain::FilterStepRegistryBuilder;
use std::sync::Arc;

pub(crate) fn register_defaults(
    builder: FilterStepRegistryBuilder,
    cache: Arc<SpeakerHandleCache>,
) -> FilterStepRegistryBuilder {
    builder
        .register::<Post, _>(AllowedUsersFactory)
        .register::<Post, _>(BlockedUsersFactory)
        .register::<Post, _>(ContainsTextFactory)
        .register::<Post, _>(RejectRepostsFactory)
        .register::<Post, _>(RejectSensitiveFactory)
        .register::<Post, _>(SpeakerFactory::new(cache))
}
