//! The view handed to resolvers.

use std::fmt;
use std::sync::Arc;

use super::{downcast, ModuleInner, ModuleRef};
use crate::error::{DependencyResolutionError, DiResult, ErrorCode};
use crate::internal::Resolution;
use crate::reference::Ref;
use crate::store::AnyArc;

/// Lazily dereferencing view of a module, passed to every resolver,
/// method body and initializer.
///
/// Each [`get`](Self::get) resolves the named item on demand, inside the
/// resolution that invoked the resolver, so cycles are detected and
/// transient values are shared within one top-level access. Private items
/// are visible here.
pub struct Injector<'a, P> {
    module: &'a ModuleInner<P>,
    cx: &'a Resolution,
    excluded: Option<&'static str>,
}

impl<'a, P: Send + Sync + 'static> Injector<'a, P> {
    pub(crate) fn new(module: &'a ModuleInner<P>, cx: &'a Resolution) -> Self {
        Self {
            module,
            cx,
            excluded: None,
        }
    }

    /// View that treats `item` as undeclared; handed to `item`'s initializer.
    pub(crate) fn excluding(module: &'a ModuleInner<P>, cx: &'a Resolution, item: &'static str) -> Self {
        Self {
            module,
            cx,
            excluded: Some(item),
        }
    }

    /// Resolves `name` and downcasts it to `T`.
    pub fn get<T>(&self, name: &str) -> DiResult<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let value = self.get_any(name)?;
        downcast(value, self.cx.snapshot(), name)
    }

    /// Resolves `name` without downcasting.
    pub fn get_any(&self, name: &str) -> DiResult<AnyArc> {
        if self.excluded == Some(name) {
            return Err(DependencyResolutionError::new(
                ErrorCode::ResolverIsNotDefined,
                self.cx.snapshot(),
                name,
            ));
        }
        self.module.resolve(self.cx, name)
    }

    /// The module's construction parameters.
    pub fn params(&self) -> &P {
        &self.module.params
    }

    /// A lazy back-reference that resolves `name` afresh on every read.
    pub fn back_ref<T>(&self, name: &'static str) -> Ref<T>
    where
        T: Send + Sync + 'static,
    {
        let module = self.handle();
        Ref::new(move || module.resolve::<T>(name))
    }

    /// Weak handle to the module, for values that need to reach it later.
    pub fn handle(&self) -> ModuleRef<P> {
        self.module.handle()
    }

    /// Number of items currently being resolved.
    pub fn depth(&self) -> usize {
        self.cx.depth()
    }

    /// The item whose resolver is running, if any.
    pub(crate) fn current(&self) -> Option<&'static str> {
        self.cx.parent()
    }
}

impl<P> fmt::Debug for Injector<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("module", &self.module.id)
            .field("excluded", &self.excluded)
            .finish()
    }
}
