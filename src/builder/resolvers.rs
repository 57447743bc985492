//! Resolver, resolver batch and initializer declarations.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{BoxError, DependencyResolutionError, ErrorCode};
use crate::key::ResolverId;
use crate::module::Injector;
use crate::registration::{InitFn, ResolverFn};
use crate::scope::ScopeTag;
use crate::store::AnyArc;

/// A declared resolver: the function computing one item's value, plus an
/// optional scope.
///
/// Every `Resolver` gets a process-unique [`ResolverId`] when it is created;
/// instance stores are keyed by that identity.
///
/// # Examples
///
/// ```rust
/// use ditory::{Resolver, Scope};
///
/// let port = Resolver::new(|_, params: &u16| *params).scoped(Scope::Singleton);
/// assert_eq!(port.scope().map(|s| s.normalize()), Some(Scope::Singleton));
/// ```
pub struct Resolver<P> {
    pub(crate) id: ResolverId,
    pub(crate) ctor: ResolverFn<P>,
    pub(crate) scope: Option<ScopeTag>,
    /// Hidden target registered next to a scope proxy.
    pub(crate) target: Option<Box<Resolver<P>>>,
}

impl<P: Send + Sync + 'static> Resolver<P> {
    /// Resolver for an infallible constructor.
    pub fn new<T, F>(f: F) -> Self
    where
        T: Any + Send + Sync,
        F: for<'a> Fn(&Injector<'a, P>, &P) -> T + Send + Sync + 'static,
    {
        Self::from_fn(move |injector, params| Ok(Arc::new(f(injector, params)) as AnyArc))
    }

    /// Resolver for a fallible constructor.
    ///
    /// A [`DependencyResolutionError`] returned here (typically propagated
    /// with `?` from [`Injector::get`]) passes through unchanged; any other
    /// error becomes the cause of an `InstantiationFailure`.
    pub fn try_new<T, E, F>(f: F) -> Self
    where
        T: Any + Send + Sync,
        E: Into<BoxError>,
        F: for<'a> Fn(&Injector<'a, P>, &P) -> Result<T, E> + Send + Sync + 'static,
    {
        Self::from_fn(move |injector, params| {
            f(injector, params)
                .map(|value| Arc::new(value) as AnyArc)
                .map_err(Into::into)
        })
    }

    pub(crate) fn from_fn<F>(ctor: F) -> Self
    where
        F: for<'a> Fn(&Injector<'a, P>, &P) -> Result<AnyArc, BoxError> + Send + Sync + 'static,
    {
        let ctor: ResolverFn<P> = Arc::new(ctor);
        Self {
            id: ResolverId::next(),
            ctor,
            scope: None,
            target: None,
        }
    }
}

impl<P> Resolver<P> {
    /// Sets the resolver's own scope, which wins over the scope of the
    /// declaration call.
    pub fn scoped(mut self, scope: impl Into<ScopeTag>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn id(&self) -> ResolverId {
        self.id
    }

    pub fn scope(&self) -> Option<ScopeTag> {
        self.scope
    }
}

impl<P> fmt::Debug for Resolver<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .field("proxy", &self.target.is_some())
            .finish()
    }
}

/// An ordered batch of named resolvers for one declaration call.
pub struct Resolvers<P> {
    pub(crate) items: Vec<(&'static str, Resolver<P>)>,
}

impl<P> Resolvers<P> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn with(mut self, name: &'static str, resolver: Resolver<P>) -> Self {
        self.items.push((name, resolver));
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<P: Send + Sync + 'static> Resolvers<P> {
    /// Shorthand for `with(name, Resolver::new(f))`.
    pub fn item<T, F>(self, name: &'static str, f: F) -> Self
    where
        T: Any + Send + Sync,
        F: for<'a> Fn(&Injector<'a, P>, &P) -> T + Send + Sync + 'static,
    {
        self.with(name, Resolver::new(f))
    }
}

impl<P> Default for Resolvers<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> FromIterator<(&'static str, Resolver<P>)> for Resolvers<P> {
    fn from_iter<I: IntoIterator<Item = (&'static str, Resolver<P>)>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

/// Post-construction hooks, keyed by item name.
///
/// A hook runs once, right after its item was computed by a top-level
/// access, and receives a view of the container that excludes the item
/// itself. If a hook fails, the freshly stored value is discarded again and
/// the access reports `InstantiationFailure`.
pub struct Initializers<P> {
    pub(crate) hooks: Vec<(&'static str, InitFn<P>)>,
}

impl<P> Initializers<P> {
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl<P: Send + Sync + 'static> Initializers<P> {
    /// Registers a hook for `name`, typed on the item's value.
    pub fn on<T, F>(mut self, name: &'static str, f: F) -> Self
    where
        T: Any + Send + Sync,
        F: for<'a> Fn(&Arc<T>, &Injector<'a, P>, &P) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let hook = erase_hook(move |value, injector, params| {
            let typed = value
                .clone()
                .downcast::<T>()
                .map_err(|_| DependencyResolutionError::new(ErrorCode::TypeMismatch, Vec::new(), name))?;
            f(&typed, injector, params)
        });
        self.hooks.push((name, hook));
        self
    }
}

fn erase_hook<P, F>(hook: F) -> InitFn<P>
where
    F: for<'a> Fn(&AnyArc, &Injector<'a, P>, &P) -> Result<(), BoxError> + Send + Sync + 'static,
{
    Arc::new(hook)
}

impl<P> Default for Initializers<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Scope;

    #[test]
    fn resolvers_get_distinct_ids() {
        let a = Resolver::new(|_, _: &()| 1u8);
        let b = Resolver::new(|_, _: &()| 1u8);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.scope(), None);
    }

    #[test]
    fn scoped_accepts_scopes_and_tags() {
        let a = Resolver::new(|_, _: &()| 1u8).scoped(Scope::Transient);
        let b = Resolver::new(|_, _: &()| 1u8).scoped(ScopeTag::forced(Scope::Module));
        assert_eq!(a.scope(), Some(ScopeTag::TRANSIENT));
        assert!(b.scope().is_some_and(|s| s.is_forced()));
    }

    #[test]
    fn batches_keep_declaration_order() {
        let batch = Resolvers::new()
            .item("b", |_, _: &()| 2u8)
            .item("a", |_, _: &()| 1u8);
        let names: Vec<_> = batch.items.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(batch.len(), 2);
    }
}
