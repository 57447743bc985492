//! The resolution engine.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use super::{Injector, ModuleInner};
use crate::config::FailurePolicy;
use crate::error::{DependencyResolutionError, DiResult, ErrorCode, ResolverPanic};
use crate::internal::Resolution;
use crate::key::ResolverId;
use crate::registration::Registration;
use crate::scope::{override_scope, Scope, ScopeTag};
use crate::store::AnyArc;

impl<P: Send + Sync + 'static> ModuleInner<P> {
    /// Resolves a declared item by name within `cx`.
    pub(crate) fn resolve(&self, cx: &Resolution, name: &str) -> DiResult<AnyArc> {
        if cx.begin_if_root() {
            tracing::trace!(module = %self.id, item = name, "root resolution");
        }
        self.record_dependents(cx, name);

        match self.blueprint.registry.index_of(name) {
            Some(index) => self.resolve_index(cx, index),
            None => Err(self.report(DependencyResolutionError::new(
                ErrorCode::ResolverIsNotDefined,
                cx.snapshot(),
                name,
            ))),
        }
    }

    /// Resolves a hidden proxy target, which has no public name.
    pub(crate) fn resolve_hidden(&self, cx: &Resolution, id: ResolverId, item: &str) -> DiResult<AnyArc> {
        cx.begin_if_root();
        match self.blueprint.registry.index_of_id(id) {
            Some(index) => {
                self.record_dependents(cx, self.blueprint.registry.entry(index).name);
                self.resolve_index(cx, index)
            }
            None => Err(self.report(DependencyResolutionError::new(
                ErrorCode::ResolverIsNotDefined,
                cx.snapshot(),
                item,
            ))),
        }
    }

    fn resolve_index(&self, cx: &Resolution, index: usize) -> DiResult<AnyArc> {
        let entry = self.blueprint.registry.entry(index);

        let cached = self.effective_scope(index);
        if let Some(value) = self.lookup(cx, cached, entry.id) {
            // A cached transient or async value still shortens its reader's lifetime.
            self.widen_parent(cx, cached);
            return Ok(value);
        }
        if let Some(err) = self.poisoned(entry.id) {
            return Err(err);
        }

        let parents = cx.snapshot();
        let guard = match cx.enter(entry.name, index) {
            Ok(guard) => guard,
            Err(_) => {
                let err = DependencyResolutionError::new(ErrorCode::CircularDependencyFailure, parents, entry.name);
                return Err(self.fail(entry, err));
            }
        };

        let started = self.observers.has_observers().then(Instant::now);
        self.observers.resolving(entry.name, parents.len());

        let injector = Injector::new(self, cx);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (entry.ctor)(&injector, &self.params)));
        drop(guard);

        let value = match outcome {
            Ok(Ok(value)) => value,
            Ok(Err(err)) => {
                let err = DependencyResolutionError::from_boxed(err).unwrap_or_else(|cause| {
                    DependencyResolutionError::with_cause(
                        ErrorCode::InstantiationFailure,
                        parents,
                        entry.name,
                        Arc::from(cause),
                    )
                });
                return Err(self.fail(entry, err));
            }
            Err(payload) => {
                let panic = ResolverPanic::from_payload(payload.as_ref());
                self.observers.factory_panic(entry.name, &panic.message);
                let err = DependencyResolutionError::with_cause(
                    ErrorCode::InstantiationFailure,
                    parents,
                    entry.name,
                    Arc::new(panic),
                );
                return Err(self.fail(entry, err));
            }
        };

        // Dependencies may have widened this item while it was being built.
        let scope = self.effective_scope(index);
        self.widen_parent(cx, scope);
        let value = self.store(cx, scope, entry.id, value);

        if let Some(started) = started {
            self.observers.resolved(entry.name, scope, started.elapsed());
        }
        if cx.is_root() {
            if let Err(err) = self.initialize(cx, entry.name, &value) {
                self.evict(cx, scope, entry.id);
                return Err(self.fail(entry, err));
            }
        }
        Ok(value)
    }

    pub(crate) fn effective_scope(&self, index: usize) -> Option<ScopeTag> {
        self.scopes.lock()[index]
    }

    fn lookup(&self, cx: &Resolution, scope: Option<ScopeTag>, id: ResolverId) -> Option<AnyArc> {
        match scope.map_or(Scope::Module, |s| s.normalize()) {
            Scope::Module => self.instances.lock().get(&id).cloned(),
            Scope::Singleton => self.singletons.get(id),
            Scope::Transient => cx.transient(id),
            Scope::Async => self.async_scope.get_store().get(self.id, id),
        }
    }

    /// Stores `value` and returns the value now held by the store, which is
    /// an earlier one if a concurrent root call got there first.
    fn store(&self, cx: &Resolution, scope: Option<ScopeTag>, id: ResolverId, value: AnyArc) -> AnyArc {
        match scope.map_or(Scope::Module, |s| s.normalize()) {
            Scope::Module => self.instances.lock().entry(id).or_insert(value).clone(),
            Scope::Singleton => self.singletons.get_or_insert(id, value),
            Scope::Transient => {
                cx.store_transient(id, value.clone());
                value
            }
            Scope::Async => self.async_scope.get_store().get_or_insert(self.id, id, value),
        }
    }

    /// Drops a stored value whose initializer failed, so it is never handed
    /// out uninitialized.
    fn evict(&self, cx: &Resolution, scope: Option<ScopeTag>, id: ResolverId) {
        match scope.map_or(Scope::Module, |s| s.normalize()) {
            Scope::Module => {
                self.instances.lock().remove(&id);
            }
            Scope::Singleton => self.singletons.remove(id),
            Scope::Transient => cx.remove_transient(id),
            Scope::Async => self.async_scope.get_store().remove(self.id, id),
        }
    }

    /// Merges the resolved item's scope into the scope of the item directly
    /// below it on the stack.
    fn widen_parent(&self, cx: &Resolution, scope: Option<ScopeTag>) {
        let Some(parent) = cx.parent_index() else {
            return;
        };
        let mut scopes = self.scopes.lock();
        let current = scopes[parent];
        let widened = override_scope(current, scope);
        if widened != current {
            tracing::debug!(
                module = %self.id,
                item = self.blueprint.registry.entry(parent).name,
                from = ?current,
                to = ?widened,
                "scope widened"
            );
            scopes[parent] = widened;
        }
    }

    fn record_dependents(&self, cx: &Resolution, name: &str) {
        if !self.options.track_dependents {
            return;
        }
        cx.with_stack(|stack| {
            if stack.is_empty() {
                return;
            }
            let mut graph = self.dependents.lock();
            if let Some(set) = graph.get_mut(name) {
                set.extend(stack.iter());
            } else {
                graph.insert(name.to_string(), stack.iter().collect());
            }
        });
    }

    /// Runs the post-construction hook of a root item, if any.
    ///
    /// Failures are returned unreported; the caller records them.
    fn initialize(&self, cx: &Resolution, name: &'static str, value: &AnyArc) -> DiResult<()> {
        let Some(hook) = self.blueprint.initializers.get(name) else {
            return Ok(());
        };
        let view = Injector::excluding(self, cx, name);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| hook(value, &view, &self.params)));
        let cause: crate::error::Cause = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(err)) => Arc::from(err),
            Err(payload) => {
                let panic = ResolverPanic::from_payload(payload.as_ref());
                self.observers.factory_panic(name, &panic.message);
                Arc::new(panic)
            }
        };
        tracing::debug!(module = %self.id, item = name, error = %cause, "initializer failed");
        Err(DependencyResolutionError::with_cause(
            ErrorCode::InstantiationFailure,
            Vec::new(),
            name,
            cause,
        ))
    }

    fn poisoned(&self, id: ResolverId) -> Option<DependencyResolutionError> {
        if self.options.failure_policy != FailurePolicy::Memoize {
            return None;
        }
        self.failures.lock().get(&id).cloned()
    }

    /// Records a failure of `entry` under the active policy and reports it.
    fn fail(&self, entry: &Registration<P>, err: DependencyResolutionError) -> DependencyResolutionError {
        if self.options.failure_policy == FailurePolicy::Memoize {
            self.failures.lock().entry(entry.id).or_insert_with(|| err.clone());
        }
        self.report(err)
    }

    fn report(&self, err: DependencyResolutionError) -> DependencyResolutionError {
        tracing::debug!(module = %self.id, code = %err.code(), item = err.item(), "resolution failed");
        self.observers.failed(&err);
        err
    }
}
