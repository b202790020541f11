use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tweetwall::prelude::*;
use tweetwall::providers::{StaticSchedule, TweetProviderFactory};
use tweetwall::{
    DataProviderFactory, DataProviderRegistry, DataProviderSetting, FilterChainSetting,
    FilterStepDefinition, FilterStepFactory, FilterStepRegistry, Family, ProducedType,
    ProviderInstance, ProviderType, StepDefinition, StepFactory, StepRegistry,
    VisualizationFactory, VisualizationRegistry, VisualizationSetting, UI_THREAD_NAME,
};

#[derive(Debug)]
struct Probe {
    seen: Arc<Mutex<Vec<Arc<TweetProvider>>>>,
}

#[async_trait]
impl Step for Probe {
    async fn do_step(&self, ctx: &mut MachineContext) -> Result<(), StepError> {
        let tweets = ctx.require_data_provider::<TweetProvider>()?;
        self.seen.lock().push(tweets);
        ctx.proceed();
        Ok(())
    }

    fn affinity(&self) -> ThreadAffinity {
        ThreadAffinity::AnyThread
    }
}

struct ProbeFactory {
    seen: Arc<Mutex<Vec<Arc<TweetProvider>>>>,
}

impl StepFactory for ProbeFactory {
    fn kind(&self) -> &'static str {
        "Probe"
    }

    fn create(&self, _definition: &StepDefinition) -> Result<Arc<dyn Step>, ConfigError> {
        Ok(Arc::new(Probe {
            seen: self.seen.clone(),
        }))
    }

    fn required_data_providers(&self, _definition: &StepDefinition) -> Vec<ProviderType> {
        vec![ProviderType::of::<TweetProvider>()]
    }
}

struct CountingFactory {
    inner: TweetProviderFactory,
    created: Arc<AtomicUsize>,
}

impl DataProviderFactory for CountingFactory {
    fn provider_type(&self) -> ProviderType {
        self.inner.provider_type()
    }

    fn create(&self, setting: &DataProviderSetting) -> Result<ProviderInstance, ConfigError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        self.inner.create(setting)
    }
}

#[tokio::test]
async fn test_shared_provider_is_one_instance() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let created = Arc::new(AtomicUsize::new(0));
    let registries = Registries {
        steps: StepRegistry::builder()
            .register(ProbeFactory { seen: seen.clone() })
            .build()
            .expect("valid registry"),
        data_providers: DataProviderRegistry::builder()
            .register(CountingFactory {
                inner: TweetProviderFactory::new(),
                created: created.clone(),
            })
            .build()
            .expect("valid registry"),
        visualizations: VisualizationRegistry::default(),
    };
    let settings = WallSettings::from_json(
        r#"{
            "steps": [
                { "step": "Probe", "name": "first" },
                { "step": "Probe", "name": "second" }
            ],
            "data_providers": [{ "implementation": "TweetDataProvider" }]
        }"#,
    )
    .expect("valid settings");

    let wall = resolve(&settings, &registries).expect("resolvable wall");
    assert_eq!(created.load(Ordering::SeqCst), 1);

    let handle = wall
        .engine_builder()
        .build()
        .expect("valid engine")
        .start();
    handle.wait_for_cycles(1).await;
    handle.shutdown().await;

    let seen = seen.lock();
    assert!(seen.len() >= 2);
    assert!(Arc::ptr_eq(&seen[0], &seen[1]));
}

#[derive(Default)]
struct Board {
    shows: AtomicUsize,
    threads: Mutex<Vec<Option<String>>>,
}

impl Showable for Board {
    fn show(&self, ctx: VisualizationContext) -> Result<(), StepError> {
        self.shows.fetch_add(1, Ordering::SeqCst);
        self.threads
            .lock()
            .push(std::thread::current().name().map(str::to_string));
        // Finish like an animation callback would, a little later.
        let proceed = ctx.proceed_handle();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            proceed.proceed();
        });
        Ok(())
    }
}

impl Visualization for Board {
    fn as_showable(&self) -> Option<&dyn Showable> {
        Some(self)
    }
}

struct BoardFactory {
    kind: &'static str,
    board: Arc<Board>,
}

impl VisualizationFactory for BoardFactory {
    fn kind(&self) -> &'static str {
        self.kind
    }

    fn produces(&self) -> ProducedType {
        ProducedType::of::<Board>()
    }

    fn create(
        &self,
        _id: &str,
        _setting: &VisualizationSetting,
    ) -> Result<Arc<dyn Visualization>, ConfigError> {
        Ok(self.board.clone())
    }
}

#[derive(Default)]
struct SlideIn {
    finished_on: Arc<Mutex<Vec<Option<String>>>>,
}

impl Showable for SlideIn {
    fn show(&self, ctx: VisualizationContext) -> Result<(), StepError> {
        let proceed = ctx.proceed_handle();
        let finished_on = self.finished_on.clone();
        // The animation completes on the UI runtime after show() returned.
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            finished_on
                .lock()
                .push(std::thread::current().name().map(str::to_string));
            proceed.proceed();
        });
        Ok(())
    }
}

impl Visualization for SlideIn {
    fn as_showable(&self) -> Option<&dyn Showable> {
        Some(self)
    }
}

#[derive(Debug)]
struct Counter {
    runs: Arc<AtomicUsize>,
}

#[async_trait]
impl Step for Counter {
    async fn do_step(&self, ctx: &mut MachineContext) -> Result<(), StepError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        ctx.proceed();
        Ok(())
    }

    fn affinity(&self) -> ThreadAffinity {
        ThreadAffinity::AnyThread
    }
}

#[tokio::test]
async fn test_show_proceeds_from_ui_animation_task() {
    let slide = Arc::new(SlideIn::default());
    let mut visualizations = Visualizations::new();
    visualizations.insert("slide", slide.clone()).expect("unique id");
    let runs = Arc::new(AtomicUsize::new(0));

    let handle = StepEngine::builder()
        .add_step("show", Show::new("slide"))
        .add_step("after", Counter { runs: runs.clone() })
        .visualizations(visualizations)
        .build()
        .expect("valid engine")
        .start();

    tokio::time::timeout(Duration::from_secs(3), handle.wait_for_cycles(2))
        .await
        .expect("animation callback on the UI thread proceeds the show step");
    handle.shutdown().await;

    assert!(runs.load(Ordering::SeqCst) >= 2);
    let finished_on = slide.finished_on.lock();
    assert!(finished_on.len() >= 2);
    assert!(finished_on
        .iter()
        .all(|name| name.as_deref() == Some(UI_THREAD_NAME)));
}

#[test]
fn test_two_factories_for_one_visualization_type_fail() {
    let board = Arc::new(Board::default());
    let result = VisualizationRegistry::builder()
        .register(BoardFactory {
            kind: "Agenda",
            board: board.clone(),
        })
        .register(BoardFactory {
            kind: "Timetable",
            board,
        })
        .build();

    assert!(matches!(
        result,
        Err(ConfigError::DuplicateProducedType {
            family: Family::Visualization,
            ..
        })
    ));
}

struct Verdict {
    kind: &'static str,
    result: FilterResult,
    calls: Arc<AtomicUsize>,
}

struct FixedVerdict {
    result: FilterResult,
    calls: Arc<AtomicUsize>,
}

impl FilterStep<Post> for FixedVerdict {
    fn check(&self, _post: &Post) -> FilterResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result
    }
}

impl FilterStepFactory<Post> for Verdict {
    fn kind(&self) -> &'static str {
        self.kind
    }

    fn create(
        &self,
        _definition: &FilterStepDefinition,
    ) -> Result<Box<dyn FilterStep<Post>>, ConfigError> {
        Ok(Box::new(FixedVerdict {
            result: self.result,
            calls: self.calls.clone(),
        }))
    }
}

fn verdict_registry(calls: &[Arc<AtomicUsize>; 3]) -> FilterStepRegistry {
    FilterStepRegistry::builder()
        .register::<Post, _>(Verdict {
            kind: "Undecided",
            result: FilterResult::NothingDefinite,
            calls: calls[0].clone(),
        })
        .register::<Post, _>(Verdict {
            kind: "Accept",
            result: FilterResult::Accepted,
            calls: calls[1].clone(),
        })
        .register::<Post, _>(Verdict {
            kind: "Reject",
            result: FilterResult::Rejected,
            calls: calls[2].clone(),
        })
        .build()
        .expect("valid registry")
}

fn chain_setting(default_result: bool, steps: &[&str]) -> FilterChainSetting {
    FilterChainSetting {
        domain_type: "Post".to_string(),
        default_result,
        steps: steps.iter().map(|kind| FilterStepDefinition::new(*kind)).collect(),
    }
}

fn sample_posts() -> Vec<Post> {
    vec![
        Post::new("1", "duke", "hello"),
        Post::new("2", "spammer", "buy now").sensitive(),
        Post::new("3", "fan", "").reposting(Post::new("1", "duke", "hello")),
    ]
}

#[test]
fn test_first_terminal_verdict_short_circuits() {
    let calls = [
        Arc::new(AtomicUsize::new(0)),
        Arc::new(AtomicUsize::new(0)),
        Arc::new(AtomicUsize::new(0)),
    ];
    let mut chains = HashMap::new();
    chains.insert(
        "wall".to_string(),
        chain_setting(false, &["Undecided", "Accept", "Reject"]),
    );
    let factory = FilterChainFactory::new(chains, verdict_registry(&calls));
    let chain = factory
        .create_filter_chain::<Post>("wall")
        .expect("valid chain");

    let posts = sample_posts();
    assert!(posts.iter().all(chain.as_predicate()));
    assert_eq!(calls[0].load(Ordering::SeqCst), posts.len());
    assert_eq!(calls[1].load(Ordering::SeqCst), posts.len());
    assert_eq!(calls[2].load(Ordering::SeqCst), 0);
}

#[test]
fn test_undecided_chain_uses_default() {
    let calls = [
        Arc::new(AtomicUsize::new(0)),
        Arc::new(AtomicUsize::new(0)),
        Arc::new(AtomicUsize::new(0)),
    ];
    let mut chains = HashMap::new();
    chains.insert(
        "lenient".to_string(),
        chain_setting(true, &["Undecided", "Undecided"]),
    );
    let factory = FilterChainFactory::new(chains, verdict_registry(&calls));
    let chain = factory
        .create_filter_chain::<Post>("lenient")
        .expect("valid chain");

    assert!(sample_posts().iter().all(|post| chain.evaluate(post)));
    assert_eq!(calls[0].load(Ordering::SeqCst), 6);
}

#[test]
fn test_builtin_post_filters_from_settings() {
    let settings = WallSettings::from_json(
        r##"{
            "steps": [{ "step": "NextTweet" }],
            "filter_chains": {
                "wall": {
                    "domain_type": "Post",
                    "default_result": false,
                    "steps": [
                        { "step": "BlockedUsers", "config": { "users": ["spammer"], "include_related": true } },
                        { "step": "RejectSensitive" },
                        { "step": "ContainsText", "config": { "phrases": ["#JavaLand"], "on_match": "accept" } },
                        { "step": "Speaker", "config": { "include_related": true } }
                    ]
                }
            }
        }"##,
    )
    .expect("valid settings");
    let speakers = Arc::new(SpeakerHandleCache::from_handles(["duke"]));
    let factory = FilterChainFactory::new(
        settings.filter_chains.clone(),
        FilterStepRegistry::post_defaults(speakers).expect("valid registry"),
    );
    let chain = factory
        .create_filter_chain::<Post>("wall")
        .expect("valid chain");

    assert!(chain.evaluate(&Post::new("1", "visitor", "Arrived at #javaland!")));
    assert!(chain.evaluate(&Post::new("2", "fan", "").quoting(Post::new("0", "duke", "talk"))));
    assert!(!chain.evaluate(&Post::new("3", "spammer", "#JavaLand deals")));
    assert!(!chain.evaluate(&Post::new("4", "duke", "#JavaLand").sensitive()));
    assert!(!chain.evaluate(&Post::new("5", "visitor", "nice weather")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tweet_pause_show_cycle() {
    let settings = WallSettings::from_json(
        r#"{
            "steps": [
                { "step": "NextTweet" },
                { "step": "Pause", "config": { "amount": 5, "unit": "seconds" } },
                { "step": "Show", "config": { "visualization": "schedule" } }
            ],
            "data_providers": [{ "implementation": "TweetDataProvider" }],
            "visualizations": {
                "schedule": { "implementation": "Agenda" }
            }
        }"#,
    )
    .expect("valid settings");

    let board = Arc::new(Board::default());
    let registries = Registries::with_defaults(
        &settings,
        Arc::new(SpeakerHandleCache::from_handles(Vec::<String>::new())),
        Arc::new(StaticSchedule::default()),
    )
    .expect("valid registries")
    .with_visualizations(
        VisualizationRegistry::builder()
            .register(BoardFactory {
                kind: "Agenda",
                board: board.clone(),
            })
            .build()
            .expect("valid registry"),
    );
    let wall = resolve(&settings, &registries).expect("resolvable wall");
    let tweets = wall
        .data_providers
        .get::<TweetProvider>()
        .expect("tweet provider");
    tweets.offer(Post::new("1", "duke", "Welcome to the wall"));

    let started = Instant::now();
    let handle = wall
        .engine_builder()
        .build()
        .expect("valid engine")
        .start();
    handle.wait_for_cycles(1).await;
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_secs(5), "cycle took {elapsed:?}");
    assert_eq!(board.shows.load(Ordering::SeqCst), 1);
    assert_eq!(tweets.current().map(|p| p.id), Some("1".to_string()));
    assert_eq!(
        board.threads.lock().as_slice(),
        &[Some(UI_THREAD_NAME.to_string())]
    );

    let status = handle.handle_command(RemoteCommand::Info);
    assert_eq!(status.completed_cycles, 1);
    handle.shutdown().await;
}
