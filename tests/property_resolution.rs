/// Property-based tests for the scope lattice and resolution memoization.
///
/// These verify that resolution behaves the same way whatever the shape of
/// the dependency graph.
use ditory::{override_scope, ModuleBuilder, Resolver, Resolvers, Scope, ScopeTag};
use proptest::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

const NAMES: [&str; 8] = ["n0", "n1", "n2", "n3", "n4", "n5", "n6", "n7"];

fn scope() -> impl Strategy<Value = Scope> {
    prop_oneof![
        Just(Scope::Module),
        Just(Scope::Singleton),
        Just(Scope::Transient),
        Just(Scope::Async),
    ]
}

fn tag() -> impl Strategy<Value = ScopeTag> {
    (scope(), 0..3u8).prop_map(|(scope, marker)| match marker {
        0 => ScopeTag::declared(scope),
        1 => ScopeTag::forced(scope),
        _ => ScopeTag::suggested(scope),
    })
}

/// Edges only point from higher to lower indices, so the graph is acyclic.
fn dag() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1..NAMES.len()).prop_flat_map(|n| {
        (0..n)
            .map(|i| proptest::sample::subsequence((0..i).collect::<Vec<_>>(), 0..=i))
            .collect::<Vec<_>>()
    })
}

fn rank(scope: Scope) -> u8 {
    match scope {
        Scope::Singleton => 0,
        Scope::Module => 1,
        Scope::Async => 2,
        Scope::Transient => 3,
    }
}

proptest! {
    #[test]
    fn absent_suggestion_keeps_own_scope(own in proptest::option::of(tag())) {
        prop_assert_eq!(override_scope(own, None), own);
    }

    #[test]
    fn forced_scope_never_changes(scope in scope(), suggested in proptest::option::of(tag())) {
        let forced = ScopeTag::forced(scope);
        prop_assert_eq!(override_scope(Some(forced), suggested), Some(forced));
    }

    #[test]
    fn widening_never_shortens_lifetime(own in tag(), suggested in tag()) {
        let merged = override_scope(Some(own), Some(suggested)).unwrap();
        prop_assert!(rank(merged.normalize()) >= rank(own.normalize()));
    }

    #[test]
    fn merging_is_idempotent(own in proptest::option::of(tag()), suggested in proptest::option::of(tag())) {
        let once = override_scope(own, suggested);
        prop_assert_eq!(override_scope(once, suggested), once);
    }

    #[test]
    fn each_resolver_invoked_once_per_acyclic_graph(edges in dag()) {
        let calls: Vec<Arc<AtomicU32>> = edges.iter().map(|_| Arc::new(AtomicU32::new(0))).collect();

        let mut resolvers = Resolvers::<()>::new();
        for (i, deps) in edges.iter().enumerate() {
            let count = calls[i].clone();
            let deps: Vec<&'static str> = deps.iter().map(|&d| NAMES[d]).collect();
            resolvers = resolvers.with(
                NAMES[i],
                Resolver::try_new(move |m, _| {
                    count.fetch_add(1, Ordering::SeqCst);
                    let mut sum = 1u64;
                    for dep in &deps {
                        sum += *m.get::<u64>(dep)?;
                    }
                    Ok::<_, ditory::DependencyResolutionError>(sum)
                }),
            );
        }

        let mut builder = ModuleBuilder::<()>::new();
        builder.public(resolvers, None).unwrap();
        let module = builder.create(());

        let root = NAMES[edges.len() - 1];
        let first = *module.get::<u64>(root).unwrap();
        let second = *module.get::<u64>(root).unwrap();
        prop_assert_eq!(first, second);

        // Only items reachable from the root are built, each exactly once.
        for (i, count) in calls.iter().enumerate() {
            let n = count.load(Ordering::SeqCst);
            prop_assert!(n <= 1, "{} invoked {} times", NAMES[i], n);
        }
        prop_assert_eq!(calls[edges.len() - 1].load(Ordering::SeqCst), 1);
    }
}
