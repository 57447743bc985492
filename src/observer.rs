//! Diagnostic hooks for resolution events.
//!
//! Observers are notified synchronously from inside the engine. Keep
//! implementations lightweight; they run on every resolver invocation (memoized
//! hits are not reported).

use std::sync::Arc;
use std::time::Duration;

use crate::error::DependencyResolutionError;
use crate::scope::ScopeTag;

/// Observer trait for resolution events.
///
/// # Examples
///
/// ```
/// use ditory::{ModuleBuilder, ResolutionObserver, Resolvers, Resolver, ScopeTag, DependencyResolutionError};
/// use std::sync::{Arc, Mutex};
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct Recorder(Mutex<Vec<String>>);
///
/// impl ResolutionObserver for Recorder {
///     fn resolving(&self, item: &str, _depth: usize) {
///         self.0.lock().unwrap().push(format!("resolving {item}"));
///     }
///     fn resolved(&self, item: &str, _scope: Option<ScopeTag>, _duration: Duration) {
///         self.0.lock().unwrap().push(format!("resolved {item}"));
///     }
///     fn failed(&self, _error: &DependencyResolutionError) {}
/// }
///
/// let recorder = Arc::new(Recorder::default());
/// let mut builder = ModuleBuilder::new();
/// builder
///     .public(Resolvers::new().with("answer", Resolver::new(|_, _: &()| 42u32)), None)
///     .unwrap()
///     .add_observer(recorder.clone());
/// let module = builder.create(());
/// assert_eq!(*module.get::<u32>("answer").unwrap(), 42);
/// assert_eq!(*recorder.0.lock().unwrap(), ["resolving answer", "resolved answer"]);
/// ```
pub trait ResolutionObserver: Send + Sync {
    /// Called right before a resolver is invoked.
    ///
    /// `depth` is the number of items already in flight (0 for a root call).
    fn resolving(&self, item: &str, depth: usize);

    /// Called after a resolver returned a value; `scope` is the effective
    /// scope the value was stored under.
    fn resolved(&self, item: &str, scope: Option<ScopeTag>, duration: Duration);

    /// Called when resolution of an item fails, once per level the error
    /// passes through.
    fn failed(&self, error: &DependencyResolutionError);

    /// Called when a resolver body panics. The panic is then reported as an
    /// instantiation failure.
    fn factory_panic(&self, item: &str, message: &str) {
        let _ = (item, message);
    }
}

/// Registered observers.
#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn ResolutionObserver>>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self { observers: Vec::new() }
    }

    pub(crate) fn add(&mut self, observer: Arc<dyn ResolutionObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    pub(crate) fn resolving(&self, item: &str, depth: usize) {
        for observer in &self.observers {
            observer.resolving(item, depth);
        }
    }

    pub(crate) fn resolved(&self, item: &str, scope: Option<ScopeTag>, duration: Duration) {
        for observer in &self.observers {
            observer.resolved(item, scope, duration);
        }
    }

    pub(crate) fn failed(&self, error: &DependencyResolutionError) {
        for observer in &self.observers {
            observer.failed(error);
        }
    }

    pub(crate) fn factory_panic(&self, item: &str, message: &str) {
        for observer in &self.observers {
            observer.factory_panic(item, message);
        }
    }
}

/// Observer that forwards every event to `tracing`.
///
/// Successful resolutions are emitted at `TRACE`, failures at `DEBUG` and
/// panics at `WARN`, all under the `ditory` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TracingObserver {
    pub fn new() -> Self {
        Self
    }
}

impl ResolutionObserver for TracingObserver {
    fn resolving(&self, item: &str, depth: usize) {
        tracing::trace!(target: "ditory", item, depth, "resolving");
    }

    fn resolved(&self, item: &str, scope: Option<ScopeTag>, duration: Duration) {
        let scope = scope.map(|s| s.to_string()).unwrap_or_else(|| "unscoped".to_string());
        tracing::trace!(target: "ditory", item, %scope, ?duration, "resolved");
    }

    fn failed(&self, error: &DependencyResolutionError) {
        tracing::debug!(target: "ditory", code = %error.code(), item = error.item(), %error, "resolution failed");
    }

    fn factory_panic(&self, item: &str, message: &str) {
        tracing::warn!(target: "ditory", item, message, "resolver panicked");
    }
}
