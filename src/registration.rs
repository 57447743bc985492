//! Resolver registrations.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::BoxError;
use crate::key::ResolverId;
use crate::module::Injector;
use crate::scope::ScopeTag;
use crate::store::AnyArc;

/// Type-erased resolver body.
pub(crate) type ResolverFn<P> =
    Arc<dyn for<'a> Fn(&Injector<'a, P>, &P) -> Result<AnyArc, BoxError> + Send + Sync>;

/// Type-erased post-construction hook.
pub(crate) type InitFn<P> =
    Arc<dyn for<'a> Fn(&AnyArc, &Injector<'a, P>, &P) -> Result<(), BoxError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Visibility {
    Public,
    Private,
    /// Target of a scope proxy; reachable only through the proxy.
    Hidden,
}

/// One declared item.
pub(crate) struct Registration<P> {
    pub(crate) id: ResolverId,
    pub(crate) name: &'static str,
    pub(crate) visibility: Visibility,
    /// Declared scope; containers copy it and widen their copy.
    pub(crate) scope: Option<ScopeTag>,
    pub(crate) ctor: ResolverFn<P>,
}

/// Merged private + public namespace.
pub(crate) struct Registry<P> {
    entries: Vec<Registration<P>>,
    by_name: HashMap<&'static str, usize>,
    by_id: HashMap<ResolverId, usize>,
}

impl<P> Default for Registry<P> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
            by_id: HashMap::new(),
        }
    }
}

impl<P> Registry<P> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// True if `name` is taken by a declared item.
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Appends a registration. Hidden entries are addressable by id only.
    pub(crate) fn insert(&mut self, registration: Registration<P>) -> usize {
        let index = self.entries.len();
        if registration.visibility != Visibility::Hidden {
            self.by_name.insert(registration.name, index);
        }
        self.by_id.insert(registration.id, index);
        self.entries.push(registration);
        index
    }

    #[inline]
    pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    #[inline]
    pub(crate) fn index_of_id(&self, id: ResolverId) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    #[inline]
    pub(crate) fn entry(&self, index: usize) -> &Registration<P> {
        &self.entries[index]
    }

    pub(crate) fn is_public(&self, name: &str) -> bool {
        self.index_of(name)
            .is_some_and(|i| self.entries[i].visibility == Visibility::Public)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn declared_scopes(&self) -> Vec<Option<ScopeTag>> {
        self.entries.iter().map(|r| r.scope).collect()
    }

    /// Declared (non-hidden) names with their visibility, in declaration order.
    pub(crate) fn names(&self) -> impl Iterator<Item = (&'static str, Visibility)> + '_ {
        self.entries
            .iter()
            .filter(|r| r.visibility != Visibility::Hidden)
            .map(|r| (r.name, r.visibility))
    }
}
