//! Scope-isolation proxies.
//!
//! A proxied item is split in two: a hidden target holding the real resolver
//! under a suggested `async` or `transient` scope, and a forced-`module`
//! [`Proxy`] exposed under the declared name. Dependents cache the proxy like
//! any module-scoped value, and every read through it resolves the target in
//! the context active at that moment. Since the proxy's own scope is forced,
//! it never widens the items that depend on it.
//!
//! # Examples
//!
//! ```rust
//! use ditory::{ModuleBuilder, Proxy, Resolver, Resolvers, ScopeProxy};
//! use std::sync::atomic::{AtomicU32, Ordering};
//!
//! static NEXT: AtomicU32 = AtomicU32::new(1);
//!
//! let mut builder = ModuleBuilder::new();
//! builder.public(
//!     Resolvers::new().with(
//!         "requestId",
//!         ScopeProxy::transient::<u32, _>(Resolver::new(|_, _: &()| NEXT.fetch_add(1, Ordering::SeqCst))),
//!     ),
//!     None,
//! )?;
//! let module = builder.create(());
//!
//! let id = module.get::<Proxy<u32>>("requestId")?;
//! let first = *id.get()?;
//! let second = *id.get()?;
//! assert_ne!(first, second);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::builder::Resolver;
use crate::error::DiResult;
use crate::module::downcast;
use crate::scope::{Scope, ScopeTag};
use crate::store::AnyArc;

/// Indirection to a value that is re-resolved in the active context on
/// every operation.
///
/// Writes go through the target's own interior mutability via
/// [`with`](Self::with).
pub struct Proxy<T> {
    item: &'static str,
    read: Arc<dyn Fn() -> DiResult<AnyArc> + Send + Sync>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Proxy<T> {
    pub(crate) fn new<F>(item: &'static str, read: F) -> Self
    where
        F: Fn() -> DiResult<AnyArc> + Send + Sync + 'static,
    {
        Self {
            item,
            read: Arc::new(read),
            _marker: PhantomData,
        }
    }

    /// The target's value for the current context.
    pub fn get(&self) -> DiResult<Arc<T>> {
        let value = (self.read)()?;
        downcast(value, Vec::new(), self.item)
    }

    /// Runs `f` against the current target.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> DiResult<R> {
        let target = self.get()?;
        Ok(f(&target))
    }

    /// Calls a function-valued target.
    pub fn call<A, R>(&self, args: A) -> DiResult<R>
    where
        T: Fn(A) -> R,
    {
        let target = self.get()?;
        Ok((*target)(args))
    }

    /// Name the proxy was declared under.
    pub fn item(&self) -> &'static str {
        self.item
    }
}

impl<T> Clone for Proxy<T> {
    fn clone(&self) -> Self {
        Self {
            item: self.item,
            read: self.read.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Proxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("item", &self.item)
            .field("target", &std::any::type_name::<T>())
            .finish()
    }
}

/// Constructors for proxied resolvers.
///
/// `T` is the target's value type; the declared item's value is a
/// [`Proxy<T>`].
pub struct ScopeProxy;

impl ScopeProxy {
    /// One value per continuation context, whatever scope dependents ask for.
    pub fn async_scoped<T, P>(target: Resolver<P>) -> Resolver<P>
    where
        T: Send + Sync + 'static,
        P: Send + Sync + 'static,
    {
        Self::isolate::<T, P>(target, Scope::Async)
    }

    /// A fresh value per top-level access.
    pub fn transient<T, P>(target: Resolver<P>) -> Resolver<P>
    where
        T: Send + Sync + 'static,
        P: Send + Sync + 'static,
    {
        Self::isolate::<T, P>(target, Scope::Transient)
    }

    fn isolate<T, P>(mut target: Resolver<P>, scope: Scope) -> Resolver<P>
    where
        T: Send + Sync + 'static,
        P: Send + Sync + 'static,
    {
        target.scope = Some(ScopeTag::suggested(scope));
        let target_id = target.id;
        let mut proxy = Resolver::from_fn(move |injector, _| {
            let item = injector.current().unwrap_or_default();
            let module = injector.handle();
            let proxy = Proxy::<T>::new(item, move || module.resolve_hidden(target_id, item));
            Ok(Arc::new(proxy) as AnyArc)
        })
        .scoped(ScopeTag::forced(Scope::Module));
        proxy.target = Some(Box::new(target));
        proxy
    }
}
