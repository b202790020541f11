//! Built-in step variants.

mod next_tweet;
mod pause;
mod schedule_refresh;
mod show;
mod shutdown;

pub use next_tweet::{NextTweet, NextTweetFactory};
pub use pause::{Pause, PauseFactory};
pub use schedule_refresh::{ScheduleRefresh, ScheduleRefreshFactory};
pub use show::{Show, ShowFactory};
pub use shutdown::{Shutdown, ShutdownFactory};

use crate::registry::StepRegistryBuilder;

pub(crate) fn register_defaults(builder: StepRegistryBuilder) -> StepRegistryBuilder {
    builder
        .register(PauseFactory)
        .register(NextTweetFactory)
        .register(ScheduleRefreshFactory)
        .register(ShowFactory)
        .register(ShutdownFactory)
}
