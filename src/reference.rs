//! Lazy back-references.

use std::fmt;
use std::sync::Arc;

use crate::error::DiResult;

/// Read-only accessor re-evaluated on every [`current`](Self::current).
///
/// Two items in an object cycle can each hold a `Ref` to the other and be
/// linked after construction, without either capturing a stale value.
///
/// # Examples
///
/// ```rust
/// use ditory::Ref;
/// use std::sync::{Arc, Mutex};
///
/// let slot = Arc::new(Mutex::new(Arc::new(1u32)));
/// let reader = slot.clone();
/// let r = Ref::new(move || Ok(reader.lock().unwrap().clone()));
///
/// *slot.lock().unwrap() = Arc::new(2);
/// assert_eq!(*r.current().unwrap(), 2);
/// ```
pub struct Ref<T> {
    read: Arc<dyn Fn() -> DiResult<Arc<T>> + Send + Sync>,
}

impl<T> Ref<T> {
    pub fn new<F>(read: F) -> Self
    where
        F: Fn() -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        Self { read: Arc::new(read) }
    }

    /// Back-reference evaluated against `context` on every read.
    pub fn over<C, F>(context: C, read: F) -> Self
    where
        C: Send + Sync + 'static,
        F: Fn(&C) -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        Self::new(move || read(&context))
    }

    pub fn current(&self) -> DiResult<Arc<T>> {
        (self.read)()
    }
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self {
            read: self.read.clone(),
        }
    }
}

impl<T> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("target", &std::any::type_name::<T>())
            .finish()
    }
}
