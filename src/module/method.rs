use std::fmt;
use std::sync::Arc;

use crate::error::DiResult;

/// A callable operation bound to a module.
///
/// Produced by [`ModuleBuilder::public_impl`](crate::ModuleBuilder::public_impl)
/// and [`private_impl`](crate::ModuleBuilder::private_impl). Calling it
/// resolves whatever the body reads at call time; it fails with
/// `ResolverIsNotDefined` once the module has been dropped.
pub struct Method<A, R> {
    f: Arc<dyn Fn(A) -> DiResult<R> + Send + Sync>,
}

impl<A, R> Method<A, R> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(A) -> DiResult<R> + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    pub fn call(&self, args: A) -> DiResult<R> {
        (self.f)(args)
    }
}

impl<A, R> Clone for Method<A, R> {
    fn clone(&self) -> Self {
        Self { f: self.f.clone() }
    }
}

impl<A, R> fmt::Debug for Method<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("args", &std::any::type_name::<A>())
            .field("returns", &std::any::type_name::<R>())
            .finish()
    }
}
