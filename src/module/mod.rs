//! Constructed containers.
//!
//! A [`Module`] is produced by [`ModuleBuilder::create`](crate::ModuleBuilder::create)
//! and exposes the public items of its builder. Values are computed lazily on
//! first access and cached according to their effective scope.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::async_scope::AsyncScopeApi;
use crate::builder::Blueprint;
use crate::config::ModuleOptions;
use crate::error::{DependencyResolutionError, DiResult, ErrorCode};
use crate::internal::Resolution;
use crate::key::{ModuleId, ResolverId};
use crate::observer::Observers;
use crate::scope::ScopeTag;
use crate::store::{AnyArc, InstanceMap, SingletonStore};

mod engine;
mod injector;
mod method;

pub use injector::Injector;
pub use method::Method;

/// A container instance bound to one set of construction parameters.
///
/// Cloning is cheap and yields a handle to the same container.
///
/// # Examples
///
/// ```rust
/// use ditory::{ErrorCode, ModuleBuilder, Resolvers};
///
/// let mut builder = ModuleBuilder::new();
/// builder
///     .private(Resolvers::new().item("secret", |_, _: &()| 7u8), None)?
///     .public(Resolvers::new().item("double", |m, _| {
///         m.get::<u8>("secret").map(|s| *s * 2).unwrap_or_default()
///     }), None)?;
/// let module = builder.create(());
///
/// assert_eq!(*module.get::<u8>("double")?, 14);
/// let err = module.get::<u8>("secret").unwrap_err();
/// assert_eq!(err.code(), ErrorCode::PrivateMemberAccessFailure);
/// assert!(err.resolution_stack().is_empty());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Module<P = ()> {
    inner: Arc<ModuleInner<P>>,
}

pub(crate) struct ModuleInner<P> {
    pub(crate) id: ModuleId,
    pub(crate) blueprint: Arc<Blueprint<P>>,
    pub(crate) params: P,
    /// Effective scope per registry entry; starts as the declared scope and
    /// only ever widens.
    pub(crate) scopes: Mutex<Vec<Option<ScopeTag>>>,
    pub(crate) instances: Mutex<InstanceMap>,
    pub(crate) singletons: Arc<SingletonStore>,
    pub(crate) async_scope: Arc<dyn AsyncScopeApi>,
    pub(crate) dependents: Mutex<HashMap<String, BTreeSet<&'static str>>>,
    pub(crate) failures: Mutex<HashMap<ResolverId, DependencyResolutionError>>,
    pub(crate) options: ModuleOptions,
    pub(crate) observers: Observers,
    this: Weak<ModuleInner<P>>,
}

impl<P: Send + Sync + 'static> ModuleInner<P> {
    pub(crate) fn new(
        blueprint: Arc<Blueprint<P>>,
        params: P,
        singletons: Arc<SingletonStore>,
        async_scope: Arc<dyn AsyncScopeApi>,
        options: ModuleOptions,
        observers: Observers,
    ) -> Arc<Self> {
        let scopes = blueprint.registry.declared_scopes();
        Arc::new_cyclic(|this| ModuleInner {
            id: ModuleId::next(),
            blueprint,
            params,
            scopes: Mutex::new(scopes),
            instances: Mutex::new(InstanceMap::new()),
            singletons,
            async_scope,
            dependents: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            options,
            observers,
            this: this.clone(),
        })
    }

    pub(crate) fn handle(&self) -> ModuleRef<P> {
        ModuleRef {
            inner: self.this.clone(),
        }
    }
}

impl<P> Drop for ModuleInner<P> {
    fn drop(&mut self) {
        self.async_scope.get_store().release(self.id);
    }
}

impl<P: Send + Sync + 'static> Module<P> {
    pub(crate) fn from_inner(inner: Arc<ModuleInner<P>>) -> Self {
        tracing::debug!(module = %inner.id, items = inner.blueprint.registry.len(), "module created");
        Self { inner }
    }

    /// Resolves a public item and downcasts it to `T`.
    ///
    /// Names that are private, or not declared at all, fail with
    /// `PrivateMemberAccessFailure` and an empty stack.
    pub fn get<T>(&self, name: &str) -> DiResult<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let value = self.get_any(name)?;
        downcast(value, Vec::new(), name)
    }

    /// Resolves a public item without downcasting.
    pub fn get_any(&self, name: &str) -> DiResult<AnyArc> {
        if !self.inner.blueprint.registry.is_public(name) {
            let err = DependencyResolutionError::new(ErrorCode::PrivateMemberAccessFailure, Vec::new(), name);
            self.inner.observers.failed(&err);
            return Err(err);
        }
        Resolution::join_or_begin(self.inner.id, |cx| self.inner.resolve(cx, name))
    }

    /// Invokes a public method declared with
    /// [`public_impl`](crate::ModuleBuilder::public_impl).
    pub fn call<A, R>(&self, name: &str, args: A) -> DiResult<R>
    where
        A: 'static,
        R: 'static,
    {
        self.get::<Method<A, R>>(name)?.call(args)
    }

    /// Names that were on the stack whenever `name` was requested, sorted.
    ///
    /// Empty when dependents tracking is disabled.
    pub fn dependents(&self, name: &str) -> Vec<&'static str> {
        self.inner
            .dependents
            .lock()
            .get(name)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// The effective scope currently recorded for `name` in this container.
    pub fn scope_of(&self, name: &str) -> Option<ScopeTag> {
        let index = self.inner.blueprint.registry.index_of(name)?;
        self.inner.scopes.lock()[index]
    }

    /// True if `name` is declared (privately or publicly).
    pub fn contains(&self, name: &str) -> bool {
        self.inner.blueprint.registry.contains(name)
    }

    /// Public item names in declaration order.
    pub fn public_items(&self) -> Vec<&'static str> {
        self.inner
            .blueprint
            .registry
            .names()
            .filter(|(_, visibility)| *visibility == crate::registration::Visibility::Public)
            .map(|(name, _)| name)
            .collect()
    }

    pub fn params(&self) -> &P {
        &self.inner.params
    }

    pub fn id(&self) -> ModuleId {
        self.inner.id
    }

    /// A weak handle that does not keep the container alive.
    pub fn downgrade(&self) -> ModuleRef<P> {
        self.inner.handle()
    }
}

impl<P> Clone for Module<P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<P> fmt::Debug for Module<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("id", &self.inner.id)
            .field("items", &self.inner.blueprint.registry.len())
            .field("cached", &self.inner.instances.lock().len())
            .finish()
    }
}

/// Weak handle to a container, used by methods, proxies and back-references.
///
/// Reads through a handle whose container was dropped fail with
/// `ResolverIsNotDefined`.
pub struct ModuleRef<P> {
    inner: Weak<ModuleInner<P>>,
}

impl<P: Send + Sync + 'static> ModuleRef<P> {
    pub fn upgrade(&self) -> Option<Module<P>> {
        self.inner.upgrade().map(|inner| Module { inner })
    }

    /// Resolves any declared item, private ones included.
    ///
    /// Called from inside a resolver of the same container on the same
    /// thread, the read joins the resolution in progress; otherwise it is a
    /// fresh root call.
    pub fn resolve<T>(&self, name: &str) -> DiResult<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let inner = self.live(name)?;
        let value = Resolution::join_or_begin(inner.id, |cx| inner.resolve(cx, name))?;
        downcast(value, Vec::new(), name)
    }

    /// Runs `f` with a view of the container.
    pub(crate) fn with_view<R>(
        &self,
        item: &str,
        f: impl FnOnce(&Injector<'_, P>) -> R,
    ) -> DiResult<R> {
        let inner = self.live(item)?;
        Ok(Resolution::join_or_begin(inner.id, |cx| f(&Injector::new(&inner, cx))))
    }

    /// Resolves the hidden target of a scope proxy in the current context.
    pub(crate) fn resolve_hidden(&self, id: ResolverId, item: &str) -> DiResult<AnyArc> {
        let inner = self.live(item)?;
        Resolution::join_or_begin(inner.id, |cx| inner.resolve_hidden(cx, id, item))
    }

    fn live(&self, item: &str) -> DiResult<Arc<ModuleInner<P>>> {
        self.inner
            .upgrade()
            .ok_or_else(|| DependencyResolutionError::new(ErrorCode::ResolverIsNotDefined, Vec::new(), item))
    }
}

impl<P> Clone for ModuleRef<P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<P> fmt::Debug for ModuleRef<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRef")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

pub(crate) fn downcast<T>(value: AnyArc, stack: Vec<&'static str>, name: &str) -> DiResult<Arc<T>>
where
    T: Send + Sync + 'static,
{
    value
        .downcast::<T>()
        .map_err(|_| DependencyResolutionError::new(ErrorCode::TypeMismatch, stack, name))
}
