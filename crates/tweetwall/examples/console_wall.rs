//! A wall that renders to the terminal.
//!
//! Run with `cargo run --example console_wall`; type `info`, `restart` or
//! `stop` to drive it like the remote-control channel would.

use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tweetwall::prelude::*;
use tweetwall::providers::StaticSchedule;
use tweetwall::{
    logging, ProducedType, VisualizationFactory, VisualizationRegistry, VisualizationSetting,
};

const SETTINGS: &str = r#"{
    "steps": [
        { "step": "ScheduleRefresh", "config": { "amount": 15, "unit": "minutes" } },
        { "step": "NextTweet", "config": { "skip_token": "no-news" } },
        { "step": "Show", "name": "tweet", "config": { "visualization": "tweet" } },
        { "step": "Pause", "config": { "amount": 3, "skip_token": "no-news" } },
        { "step": "Show", "name": "agenda", "config": { "visualization": "agenda" } },
        { "step": "Pause", "config": { "amount": 2 } }
    ],
    "data_providers": [
        { "implementation": "TweetDataProvider", "config": { "history_size": 10, "filter_chain": "wall" } },
        { "implementation": "ScheduleDataProvider" }
    ],
    "visualizations": {
        "tweet": { "implementation": "ConsoleTweet" },
        "agenda": { "implementation": "ConsoleAgenda" }
    },
    "filter_chains": {
        "wall": {
            "domain_type": "Post",
            "default_result": true,
            "steps": [
                { "step": "BlockedUsers", "config": { "users": ["spammer"] } },
                { "step": "RejectSensitive" },
                { "step": "Speaker" }
            ]
        }
    }
}"#;

struct ConsoleTweet;

impl Showable for ConsoleTweet {
    fn show(&self, ctx: VisualizationContext) -> Result<(), StepError> {
        let tweets = ctx
            .data_provider::<TweetProvider>()
            .ok_or(StepError::MissingDataProvider("TweetDataProvider"))?;
        let snapshot = tweets.snapshot();
        if let Some(post) = snapshot.current {
            println!("@{}: {}", post.author, post.text);
            if let Some(image) = snapshot.image {
                println!("    [image] {}", image);
            }
        }
        ctx.proceed();
        Ok(())
    }
}

impl Visualization for ConsoleTweet {
    fn as_showable(&self) -> Option<&dyn Showable> {
        Some(self)
    }
}

struct ConsoleAgenda;

impl Showable for ConsoleAgenda {
    fn show(&self, ctx: VisualizationContext) -> Result<(), StepError> {
        let schedule = ctx
            .data_provider::<ScheduleProvider>()
            .ok_or(StepError::MissingDataProvider("ScheduleDataProvider"))?;
        println!("--- Up next ---");
        for session in schedule.sessions().iter() {
            println!(
                "{} {:<12} {} ({})",
                session.starts_at,
                session.room,
                session.title,
                session.speakers.join(", ")
            );
        }
        // Let the "slide-in" finish before moving on.
        let proceed = ctx.proceed_handle();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(500));
            proceed.proceed();
        });
        Ok(())
    }
}

impl Visualization for ConsoleAgenda {
    fn as_showable(&self) -> Option<&dyn Showable> {
        Some(self)
    }
}

struct ConsoleTweetFactory;

impl VisualizationFactory for ConsoleTweetFactory {
    fn kind(&self) -> &'static str {
        "ConsoleTweet"
    }

    fn produces(&self) -> ProducedType {
        ProducedType::of::<ConsoleTweet>()
    }

    fn create(
        &self,
        _id: &str,
        _setting: &VisualizationSetting,
    ) -> Result<Arc<dyn Visualization>, ConfigError> {
        Ok(Arc::new(ConsoleTweet))
    }
}

struct ConsoleAgendaFactory;

impl VisualizationFactory for ConsoleAgendaFactory {
    fn kind(&self) -> &'static str {
        "ConsoleAgenda"
    }

    fn produces(&self) -> ProducedType {
        ProducedType::of::<ConsoleAgenda>()
    }

    fn create(
        &self,
        _id: &str,
        _setting: &VisualizationSetting,
    ) -> Result<Arc<dyn Visualization>, ConfigError> {
        Ok(Arc::new(ConsoleAgenda))
    }
}

fn schedule() -> Vec<Session> {
    let talk = |id: &str, at: &str, room: &str, title: &str, speaker: &str| Session {
        id: id.to_string(),
        title: title.to_string(),
        speakers: vec![speaker.to_string()],
        room: room.to_string(),
        starts_at: at.to_string(),
        ends_at: None,
    };
    vec![
        talk("1", "09:00", "Wintergarten", "Keynote", "duke"),
        talk("2", "10:00", "Quantum 1", "Rust for the JVM crowd", "ferris"),
        talk("3", "11:00", "Quantum 2", "Async all the way down", "tux"),
    ]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init("tweetwall=info,warn");

    let settings = WallSettings::from_json(SETTINGS)?;
    let registries = Registries::with_defaults(
        &settings,
        Arc::new(SpeakerHandleCache::from_handles(["duke", "ferris"])),
        Arc::new(StaticSchedule::new(schedule())),
    )?
    .with_visualizations(
        VisualizationRegistry::builder()
            .register(ConsoleTweetFactory)
            .register(ConsoleAgendaFactory)
            .build()?,
    );
    let wall = resolve(&settings, &registries)?;

    let tweets = wall
        .data_providers
        .get::<TweetProvider>()
        .ok_or("tweet provider not resolved")?;
    tokio::spawn(async move {
        let incoming = [
            Post::new("1", "duke", "Doors are open!").with_media("https://example.org/hall.jpg"),
            Post::new("2", "spammer", "cheap tickets"),
            Post::new("3", "ferris", "Slides for my talk are up"),
            Post::new("4", "visitor", "Great coffee here"),
        ];
        for post in incoming {
            tweets.offer(post);
            tokio::time::sleep(Duration::from_secs(4)).await;
        }
    });

    let handle = wall
        .engine_builder()
        .build()?
        .start();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.parse::<RemoteCommand>() {
            Ok(command) => {
                let status = handle.handle_command(command);
                println!("engine: {}", status);
                if command == RemoteCommand::Stop {
                    break;
                }
            }
            Err(e) => eprintln!("{}", e),
        }
    }

    handle.shutdown().await;
    Ok(())
}
