use ditory::{ErrorCode, ModuleBuilder, Proxy, Resolver, Resolvers, ScopeProxy};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn pass_through(dep: &'static str) -> Resolver<()> {
    Resolver::try_new(move |m, _| m.get::<u32>(dep).map(|v| *v))
}

#[test]
fn test_two_node_cycle() {
    let mut builder = ModuleBuilder::<()>::new();
    builder
        .public(
            Resolvers::new().with("a", pass_through("b")).with("b", pass_through("a")),
            None,
        )
        .unwrap();
    let module = builder.create(());

    let err = module.get::<u32>("a").unwrap_err();
    assert_eq!(err.code(), ErrorCode::CircularDependencyFailure);
    assert_eq!(err.resolution_stack(), ["a", "b"]);
    assert_eq!(err.item(), "a");
    assert_eq!(
        err.to_string(),
        "CircularDependencyFailure in attempting to resolve <a> with stack <a> <- <b>"
    );
}

#[test]
fn test_self_cycle() {
    let mut builder = ModuleBuilder::<()>::new();
    builder
        .public(Resolvers::new().with("me", pass_through("me")), None)
        .unwrap();
    let module = builder.create(());

    let err = module.get::<u32>("me").unwrap_err();
    assert_eq!(err.code(), ErrorCode::CircularDependencyFailure);
    assert_eq!(err.resolution_stack(), ["me"]);
}

#[test]
fn test_long_cycle_reports_full_path() {
    let mut builder = ModuleBuilder::<()>::new();
    builder
        .private(
            Resolvers::new()
                .with("b", pass_through("c"))
                .with("c", pass_through("d"))
                .with("d", pass_through("b")),
            None,
        )
        .unwrap()
        .public(Resolvers::new().with("a", pass_through("b")), None)
        .unwrap();
    let module = builder.create(());

    let err = module.get::<u32>("a").unwrap_err();
    assert_eq!(err.resolution_stack(), ["a", "b", "c", "d"]);
    assert_eq!(err.item(), "b");
}

#[test]
fn test_stack_is_clean_after_failure() {
    // `b` depends on `a` only until the cycle is broken.
    let cyclic = Arc::new(AtomicBool::new(true));
    let flag = cyclic.clone();

    let mut builder = ModuleBuilder::<()>::new();
    builder
        .public(
            Resolvers::new().with("a", pass_through("b")).with(
                "b",
                Resolver::try_new(move |m, _| {
                    if flag.load(Ordering::SeqCst) {
                        m.get::<u32>("a").map(|v| *v)
                    } else {
                        Ok(7)
                    }
                }),
            ),
            None,
        )
        .unwrap();
    let module = builder.create(());

    assert!(module.get::<u32>("a").is_err());
    cyclic.store(false, Ordering::SeqCst);
    assert_eq!(*module.get::<u32>("a").unwrap(), 7);
}

#[test]
fn test_unrelated_items_still_resolve_after_cycle() {
    let mut builder = ModuleBuilder::<()>::new();
    builder
        .public(
            Resolvers::new()
                .with("a", pass_through("b"))
                .with("b", pass_through("a"))
                .item("fine", |_, _| 1u32),
            None,
        )
        .unwrap();
    let module = builder.create(());

    assert!(module.get::<u32>("a").is_err());
    assert_eq!(*module.get::<u32>("fine").unwrap(), 1);
    let err = module.get::<u32>("b").unwrap_err();
    assert_eq!(err.resolution_stack(), ["b", "a"]);
}

#[test]
fn test_cycle_through_proxy_is_detected() {
    let mut builder = ModuleBuilder::<()>::new();
    builder
        .private(
            Resolvers::new()
                .with(
                    "b",
                    ScopeProxy::transient::<u32, _>(pass_through("c")),
                )
                .with(
                    "c",
                    Resolver::try_new(|m, _| m.get::<Proxy<u32>>("b")?.get().map(|v| *v)),
                ),
            None,
        )
        .unwrap()
        .public(
            Resolvers::new().with(
                "root",
                Resolver::try_new(|m, _| m.get::<Proxy<u32>>("b")?.get().map(|v| *v)),
            ),
            None,
        )
        .unwrap();
    let module = builder.create(());

    let err = module.get::<u32>("root").unwrap_err();
    assert_eq!(err.code(), ErrorCode::CircularDependencyFailure);
    assert_eq!(err.item(), "transient::b");
    assert_eq!(err.resolution_stack(), ["root", "transient::b", "c"]);
}

#[test]
fn test_cycle_through_back_ref_is_detected() {
    let mut builder = ModuleBuilder::<()>::new();
    builder
        .public(
            Resolvers::new().with(
                "eager",
                Resolver::try_new(|m, _| m.back_ref::<u32>("eager").current().map(|v| *v)),
            ),
            None,
        )
        .unwrap();
    let module = builder.create(());

    let err = module.get::<u32>("eager").unwrap_err();
    assert_eq!(err.code(), ErrorCode::CircularDependencyFailure);
    assert_eq!(err.resolution_stack(), ["eager"]);
}
