use ditory::{
    DependencyResolutionError, ErrorCode, FailurePolicy, ModuleBuilder, ModuleOptions, ResolutionObserver,
    Resolver, Resolvers, ScopeTag, TracingObserver,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug)]
struct Unavailable;

impl std::fmt::Display for Unavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("unavailable")
    }
}

impl std::error::Error for Unavailable {}

fn flaky_module(policy: FailurePolicy, calls: Arc<AtomicU32>) -> ditory::Module<()> {
    let mut builder = ModuleBuilder::<()>::new();
    builder
        .with_options(ModuleOptions::new().failure_policy(policy))
        .public(
            Resolvers::new().with(
                "flaky",
                Resolver::try_new(move |_, _| {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(Unavailable)
                    } else {
                        Ok(1u32)
                    }
                }),
            ),
            None,
        )
        .unwrap();
    builder.create(())
}

#[test]
fn test_memoize_policy_poisons_failed_items() {
    let calls = Arc::new(AtomicU32::new(0));
    let module = flaky_module(FailurePolicy::Memoize, calls.clone());

    let first = module.get::<u32>("flaky").unwrap_err();
    let second = module.get::<u32>("flaky").unwrap_err();
    assert_eq!(first.code(), ErrorCode::InstantiationFailure);
    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_retry_policy_reinvokes() {
    let calls = Arc::new(AtomicU32::new(0));
    let module = flaky_module(FailurePolicy::Retry, calls.clone());

    assert!(module.get::<u32>("flaky").is_err());
    assert_eq!(*module.get::<u32>("flaky").unwrap(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_dependents_tracking_can_be_disabled() {
    let mut builder = ModuleBuilder::<()>::new();
    builder
        .with_options(ModuleOptions::new().track_dependents(false))
        .private(Resolvers::new().item("leaf", |_, _| 1u32), None)
        .unwrap()
        .public(
            Resolvers::new().with("top", Resolver::try_new(|m, _| m.get::<u32>("leaf").map(|v| *v))),
            None,
        )
        .unwrap();
    let module = builder.create(());

    module.get::<u32>("top").unwrap();
    assert!(module.dependents("leaf").is_empty());
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl ResolutionObserver for Recorder {
    fn resolving(&self, item: &str, depth: usize) {
        self.events.lock().unwrap().push(format!("resolving {item}@{depth}"));
    }

    fn resolved(&self, item: &str, scope: Option<ScopeTag>, _duration: Duration) {
        let scope = scope.map(|s| s.to_string()).unwrap_or_default();
        self.events.lock().unwrap().push(format!("resolved {item} as {scope}"));
    }

    fn failed(&self, error: &DependencyResolutionError) {
        self.events.lock().unwrap().push(format!("failed {}", error.code()));
    }

    fn factory_panic(&self, item: &str, _message: &str) {
        self.events.lock().unwrap().push(format!("panic {item}"));
    }
}

#[test]
fn test_observers_see_every_invocation() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("ditory=trace"))
        .with_test_writer()
        .try_init();

    let recorder = Arc::new(Recorder::default());
    let mut builder = ModuleBuilder::<()>::new();
    builder
        .add_observer(recorder.clone())
        .add_observer(Arc::new(TracingObserver::new()))
        .private(Resolvers::new().item("leaf", |_, _| 1u32), Some(ScopeTag::TRANSIENT))
        .unwrap()
        .public(
            Resolvers::new()
                .with("top", Resolver::try_new(|m, _| m.get::<u32>("leaf").map(|v| *v)))
                .item("broken", |_, _| -> u32 { panic!("nope") }),
            None,
        )
        .unwrap();
    let module = builder.create(());

    module.get::<u32>("top").unwrap();
    assert!(module.get::<u32>("broken").is_err());

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(
        events,
        [
            "resolving top@0",
            "resolving leaf@1",
            "resolved leaf as transient",
            "resolved top as transient",
            "resolving broken@0",
            "panic broken",
            "failed InstantiationFailure",
        ]
    );
}
