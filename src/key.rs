//! Identity keys for resolvers and container instances.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_RESOLVER_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_MODULE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one declared resolver.
///
/// Instance stores are keyed by resolver identity rather than by item name:
/// two names bound to the same resolver closure are still distinct
/// declarations, and the singleton store is shared by every container built
/// from the same declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResolverId(u64);

impl ResolverId {
    pub(crate) fn next() -> Self {
        ResolverId(NEXT_RESOLVER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResolverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resolver#{}", self.0)
    }
}

/// Process-unique identity of one constructed container.
///
/// Used to partition continuation stores between containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(u64);

impl ModuleId {
    pub(crate) fn next() -> Self {
        ModuleId(NEXT_MODULE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module#{}", self.0)
    }
}
