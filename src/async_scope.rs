//! Continuation-scoped store providers for `async`-scoped items.
//!
//! The engine only needs [`AsyncScopeApi::get_store`]; the remaining operations
//! establish and tear down the context a store belongs to. Providers are
//! injected into a builder with
//! [`ModuleBuilder::with_async_scope`](crate::ModuleBuilder::with_async_scope).

use std::future::Future;
use std::pin::Pin;

use crate::store::AsyncStorage;

/// Boxed future returned by [`AsyncScopeApi::run`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Pluggable primitive that associates a store with a logical continuation.
///
/// Implementations must hand out the same [`AsyncStorage`] for every
/// `get_store` call made inside one `run` (including across `.await` points)
/// and distinct stores for independent `run` calls.
pub trait AsyncScopeApi: Send + Sync {
    /// Establishes a fresh store for the remainder of the current execution
    /// outside any `run`.
    fn enter(&self);

    /// Returns the store of the active context, or a fallback store when no
    /// context is active.
    fn get_store(&self) -> AsyncStorage;

    /// Discards the association created by [`enter`](Self::enter).
    fn exit(&self);

    /// Runs `fut` with a fresh store for its entire continuation.
    fn run<'a, F>(&self, fut: F) -> BoxFuture<'a, F::Output>
    where
        Self: Sized,
        F: Future + Send + 'a,
        F::Output: Send + 'a;

    /// Runs `f` synchronously with a fresh store.
    fn run_sync<R>(&self, f: impl FnOnce() -> R) -> R
    where
        Self: Sized;
}

/// No-op provider: one store shared by everything.
///
/// Suitable where continuation tracking is unavailable. `async`-scoped items
/// then behave like module-scoped ones.
#[derive(Debug, Default)]
pub struct SharedAsyncScope {
    store: AsyncStorage,
}

impl SharedAsyncScope {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AsyncScopeApi for SharedAsyncScope {
    fn enter(&self) {}

    fn get_store(&self) -> AsyncStorage {
        self.store.clone()
    }

    fn exit(&self) {}

    fn run<'a, F>(&self, fut: F) -> BoxFuture<'a, F::Output>
    where
        F: Future + Send + 'a,
        F::Output: Send + 'a,
    {
        Box::pin(fut)
    }

    fn run_sync<R>(&self, f: impl FnOnce() -> R) -> R {
        f()
    }
}

#[cfg(feature = "async")]
mod task_local_scope {
    use super::*;
    use parking_lot::Mutex;

    tokio::task_local! {
        static CONTINUATION: AsyncStorage;
    }

    /// Provider backed by a tokio task-local.
    ///
    /// Each [`run`](AsyncScopeApi::run) gives its future a fresh store that
    /// follows it across every `.await`. Outside any `run` the root-tier store
    /// installed by [`enter`](AsyncScopeApi::enter) is used; a new provider is
    /// created already entered. After [`exit`](AsyncScopeApi::exit) every
    /// out-of-context lookup gets a fresh store.
    ///
    /// Spawned tasks do not inherit the store; wrap the spawned future in
    /// `run` to give it its own context.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ditory::{AsyncScopeApi, TaskLocalAsyncScope};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let scope = TaskLocalAsyncScope::new();
    /// let (a, b) = scope
    ///     .run(async { (scope.get_store(), scope.get_store()) })
    ///     .await;
    /// assert!(a.same_store(&b));
    /// # }
    /// ```
    #[derive(Debug)]
    pub struct TaskLocalAsyncScope {
        root: Mutex<Option<AsyncStorage>>,
    }

    impl TaskLocalAsyncScope {
        pub fn new() -> Self {
            let scope = Self { root: Mutex::new(None) };
            scope.enter();
            scope
        }

        /// True when called inside a [`run`](AsyncScopeApi::run) continuation.
        pub fn in_context(&self) -> bool {
            CONTINUATION.try_with(|_| ()).is_ok()
        }
    }

    impl Default for TaskLocalAsyncScope {
        fn default() -> Self {
            Self::new()
        }
    }

    impl AsyncScopeApi for TaskLocalAsyncScope {
        fn enter(&self) {
            *self.root.lock() = Some(AsyncStorage::new());
        }

        fn get_store(&self) -> AsyncStorage {
            CONTINUATION
                .try_with(AsyncStorage::clone)
                .ok()
                .or_else(|| self.root.lock().clone())
                .unwrap_or_default()
        }

        fn exit(&self) {
            self.root.lock().take();
        }

        fn run<'a, F>(&self, fut: F) -> BoxFuture<'a, F::Output>
        where
            F: Future + Send + 'a,
            F::Output: Send + 'a,
        {
            Box::pin(CONTINUATION.scope(AsyncStorage::new(), fut))
        }

        fn run_sync<R>(&self, f: impl FnOnce() -> R) -> R {
            CONTINUATION.sync_scope(AsyncStorage::new(), f)
        }
    }
}

#[cfg(feature = "async")]
pub use task_local_scope::TaskLocalAsyncScope;
