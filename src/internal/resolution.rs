//! Per-call resolution state.

use std::cell::RefCell;
use std::rc::Rc;

use smallvec::SmallVec;

use super::stack::{ResolutionStack, StackError};
use crate::key::{ModuleId, ResolverId};
use crate::store::{AnyArc, InstanceMap};

// Resolutions in flight on this thread, innermost last.
thread_local! {
    static ACTIVE: RefCell<Vec<(ModuleId, Rc<Resolution>)>> = const { RefCell::new(Vec::new()) };
}

/// State owned by one top-level access and its synchronous dependency chain.
///
/// Independent root calls never share a stack or a transient store, so
/// interleaved resolutions on different tasks cannot observe each other.
#[derive(Default)]
pub(crate) struct Resolution {
    stack: RefCell<ResolutionStack>,
    /// Registry index of every stack entry, in the same order.
    frames: RefCell<SmallVec<[usize; 8]>>,
    transient: RefCell<InstanceMap>,
}

impl Resolution {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Runs `f` inside the resolution `module` already has in flight on this
    /// thread, or inside a fresh one registered for the duration of `f`.
    ///
    /// Reads made from within a resolver body through a proxy, a back-reference
    /// or a method therefore share the caller's stack and transient store.
    pub(crate) fn join_or_begin<R>(module: ModuleId, f: impl FnOnce(&Resolution) -> R) -> R {
        let active = ACTIVE.with(|active| {
            active
                .borrow()
                .iter()
                .rev()
                .find(|(id, _)| *id == module)
                .map(|(_, cx)| cx.clone())
        });
        if let Some(cx) = active {
            return f(&cx);
        }

        let cx = Rc::new(Resolution::new());
        ACTIVE.with(|active| active.borrow_mut().push((module, cx.clone())));
        let _registered = ActiveGuard;
        f(&cx)
    }

    /// True when no item is in flight.
    pub(crate) fn is_root(&self) -> bool {
        self.stack.borrow().is_empty()
    }

    /// Clears the transient store at the start of a root call.
    pub(crate) fn begin_if_root(&self) -> bool {
        let root = self.is_root();
        if root {
            self.transient.borrow_mut().clear();
        }
        root
    }

    pub(crate) fn snapshot(&self) -> Vec<&'static str> {
        self.stack.borrow().to_vec()
    }

    pub(crate) fn parent(&self) -> Option<&'static str> {
        self.stack.borrow().peek()
    }

    /// Registry index of the item on top of the stack.
    pub(crate) fn parent_index(&self) -> Option<usize> {
        self.frames.borrow().last().copied()
    }

    pub(crate) fn depth(&self) -> usize {
        self.stack.borrow().len()
    }

    pub(crate) fn with_stack<R>(&self, f: impl FnOnce(&ResolutionStack) -> R) -> R {
        f(&self.stack.borrow())
    }

    /// Pushes `name`; the returned guard pops it again on drop.
    pub(crate) fn enter(&self, name: &'static str, index: usize) -> Result<StackGuard<'_>, StackError> {
        self.stack.borrow_mut().push(name)?;
        self.frames.borrow_mut().push(index);
        Ok(StackGuard { resolution: self, name })
    }

    pub(crate) fn transient(&self, id: ResolverId) -> Option<AnyArc> {
        self.transient.borrow().get(&id).cloned()
    }

    pub(crate) fn store_transient(&self, id: ResolverId, value: AnyArc) {
        self.transient.borrow_mut().insert(id, value);
    }

    pub(crate) fn remove_transient(&self, id: ResolverId) {
        self.transient.borrow_mut().remove(&id);
    }
}

/// Unregisters the innermost active resolution, including while unwinding.
struct ActiveGuard;

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        let _ = ACTIVE.try_with(|active| active.borrow_mut().pop());
    }
}

/// Keeps one name on the stack for the duration of a resolver invocation.
///
/// Popping happens on drop, so the entry is removed on success, on error and
/// while unwinding from a resolver panic.
pub(crate) struct StackGuard<'a> {
    resolution: &'a Resolution,
    name: &'static str,
}

impl Drop for StackGuard<'_> {
    fn drop(&mut self) {
        self.resolution.frames.borrow_mut().pop();
        match self.resolution.stack.borrow_mut().pop() {
            Ok(last) => debug_assert_eq!(last, self.name),
            Err(err) => tracing::error!(item = self.name, error = %err, "resolution stack out of balance"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn guard_pops_on_drop() {
        let resolution = Resolution::new();
        {
            let _a = resolution.enter("a", 0).unwrap();
            let _b = resolution.enter("b", 1).unwrap();
            assert_eq!(resolution.snapshot(), vec!["a", "b"]);
            assert_eq!(resolution.parent(), Some("b"));
            assert_eq!(resolution.parent_index(), Some(1));
        }
        assert!(resolution.is_root());
        assert_eq!(resolution.parent_index(), None);
    }

    #[test]
    fn duplicate_enter_is_rejected_without_mutation() {
        let resolution = Resolution::new();
        let _a = resolution.enter("a", 0).unwrap();
        assert!(resolution.enter("a", 0).is_err());
        assert_eq!(resolution.depth(), 1);
    }

    #[test]
    fn nested_calls_join_the_active_resolution() {
        let module = ModuleId::next();
        Resolution::join_or_begin(module, |outer| {
            let _a = outer.enter("a", 0).unwrap();
            Resolution::join_or_begin(module, |inner| {
                assert_eq!(inner.snapshot(), vec!["a"]);
                assert!(inner.enter("a", 0).is_err());
            });
            Resolution::join_or_begin(ModuleId::next(), |other| assert!(other.is_root()));
        });
        Resolution::join_or_begin(module, |fresh| assert!(fresh.is_root()));
    }

    #[test]
    fn root_begin_clears_transient_store() {
        let resolution = Resolution::new();
        let id = ResolverId::next();
        resolution.store_transient(id, Arc::new(1u8));
        {
            let _a = resolution.enter("a", 0).unwrap();
            assert!(!resolution.begin_if_root());
            assert!(resolution.transient(id).is_some());
        }
        assert!(resolution.begin_if_root());
        assert!(resolution.transient(id).is_none());
    }
}
