use ditory::{ErrorCode, Method, ModuleBuilder, Resolvers, Scope, ScopeTag};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[test]
fn test_public_method_sees_module_at_call_time() {
    let mut builder = ModuleBuilder::<u32>::new();
    builder
        .private(Resolvers::new().item("base", |_, p: &u32| *p), None)
        .unwrap()
        .public_impl("add", |m, x: u32| -> u32 {
            m.get::<u32>("base").map(|base| *base + x).unwrap_or(0)
        })
        .unwrap();
    let module = builder.create(40);

    assert_eq!(module.call::<u32, u32>("add", 2).unwrap(), 42);
    assert_eq!(module.scope_of("add"), Some(ScopeTag::forced(Scope::Module)));
}

#[test]
fn test_method_resolves_transient_dependencies_per_call() {
    let calls = Arc::new(AtomicU32::new(0));
    let count = calls.clone();

    let mut builder = ModuleBuilder::<()>::new();
    builder
        .private(
            Resolvers::new().item("ticket", move |_, _| count.fetch_add(1, Ordering::SeqCst)),
            Some(ScopeTag::TRANSIENT),
        )
        .unwrap()
        .public_impl("next", |m, (): ()| m.get::<u32>("ticket").map(|t| *t))
        .unwrap();
    let module = builder.create(());

    let next = module.get::<Method<(), ditory::DiResult<u32>>>("next").unwrap();
    assert_eq!(next.call(()).unwrap().unwrap(), 0);
    assert_eq!(next.call(()).unwrap().unwrap(), 1);
    // The method value itself is cached and never widened.
    assert!(Arc::ptr_eq(
        &next,
        &module.get::<Method<(), ditory::DiResult<u32>>>("next").unwrap()
    ));
    assert_eq!(module.scope_of("next"), Some(ScopeTag::forced(Scope::Module)));
}

#[test]
fn test_private_method_used_by_public_item() {
    let mut builder = ModuleBuilder::<()>::new();
    builder
        .private_impl("shout", |_, text: String| text.to_uppercase())
        .unwrap()
        .public(
            Resolvers::new().item("greeting", |m, _| {
                m.get::<Method<String, String>>("shout")
                    .and_then(|shout| shout.call("hello".to_string()))
                    .unwrap_or_default()
            }),
            None,
        )
        .unwrap();
    let module = builder.create(());

    assert_eq!(*module.get::<String>("greeting").unwrap(), "HELLO");
    let err = module.call::<String, String>("shout", "x".to_string()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::PrivateMemberAccessFailure);
}

#[test]
fn test_method_fails_once_module_is_dropped() {
    let mut builder = ModuleBuilder::<()>::new();
    builder.public_impl("ping", |_, (): ()| "pong").unwrap();
    let module = builder.create(());

    let ping = module.get::<Method<(), &'static str>>("ping").unwrap();
    assert_eq!(ping.call(()).unwrap(), "pong");
    drop(module);

    let err = ping.call(()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ResolverIsNotDefined);
    assert_eq!(err.item(), "ping");
}

#[test]
fn test_method_type_mismatch() {
    let mut builder = ModuleBuilder::<()>::new();
    builder.public_impl("len", |_, s: String| s.len()).unwrap();
    let module = builder.create(());

    let err = module.call::<String, u32>("len", "abc".to_string()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::TypeMismatch);
    assert_eq!(module.call::<String, usize>("len", "abc".to_string()).unwrap(), 3);
}
