//! Built-in data providers.

mod schedule;
mod tweets;

pub use schedule::{
    RefreshOutcome, ScheduleProvider, ScheduleProviderFactory, ScheduleSource, Session,
    StaticSchedule,
};
pub use tweets::{Advance, TweetProvider, TweetProviderFactory, TweetSnapshot};
