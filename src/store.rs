//! Instance stores, one per scope kind.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::key::{ModuleId, ResolverId};

/// Type-erased value as stored by every instance store.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Resolver identity to computed value.
pub type InstanceMap = HashMap<ResolverId, AnyArc>;

static PROCESS_SINGLETONS: Lazy<Arc<SingletonStore>> = Lazy::new(|| Arc::new(SingletonStore::new()));

/// Store for `singleton`-scoped values.
///
/// The process-wide store is created on the first call to
/// [`SingletonStore::process`] and lives until the process exits; there is no
/// teardown. Because keys are resolver identities, every container built from
/// the same declarations reuses the same value regardless of its own
/// construction parameters.
#[derive(Default)]
pub struct SingletonStore {
    instances: Mutex<InstanceMap>,
}

impl SingletonStore {
    /// Creates a detached store, e.g. to isolate tests from each other.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide store used by builders that were not given one.
    pub fn process() -> Arc<SingletonStore> {
        PROCESS_SINGLETONS.clone()
    }

    pub fn get(&self, id: ResolverId) -> Option<AnyArc> {
        self.instances.lock().get(&id).cloned()
    }

    pub fn insert(&self, id: ResolverId, value: AnyArc) {
        self.instances.lock().insert(id, value);
    }

    /// Inserts `value` unless a value is already present; returns the stored one.
    pub fn get_or_insert(&self, id: ResolverId, value: AnyArc) -> AnyArc {
        self.instances.lock().entry(id).or_insert(value).clone()
    }

    pub fn remove(&self, id: ResolverId) {
        self.instances.lock().remove(&id);
    }

    pub fn contains(&self, id: ResolverId) -> bool {
        self.instances.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.instances.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.lock().is_empty()
    }
}

impl std::fmt::Debug for SingletonStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingletonStore")
            .field("instances", &self.len())
            .finish()
    }
}

/// Store for `async`-scoped values of one continuation context.
///
/// A single context is shared by every container, so instances are further
/// partitioned by [`ModuleId`]. Cloning yields a handle to the same store.
#[derive(Clone, Default)]
pub struct AsyncStorage {
    partitions: Arc<Mutex<HashMap<ModuleId, InstanceMap>>>,
}

impl AsyncStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, module: ModuleId, id: ResolverId) -> Option<AnyArc> {
        self.partitions
            .lock()
            .get(&module)
            .and_then(|instances| instances.get(&id).cloned())
    }

    pub fn insert(&self, module: ModuleId, id: ResolverId, value: AnyArc) {
        self.partitions.lock().entry(module).or_default().insert(id, value);
    }

    /// Inserts `value` unless a value is already present; returns the stored one.
    pub fn get_or_insert(&self, module: ModuleId, id: ResolverId, value: AnyArc) -> AnyArc {
        self.partitions
            .lock()
            .entry(module)
            .or_default()
            .entry(id)
            .or_insert(value)
            .clone()
    }

    pub fn remove(&self, module: ModuleId, id: ResolverId) {
        if let Some(instances) = self.partitions.lock().get_mut(&module) {
            instances.remove(&id);
        }
    }

    /// Drops every instance held for `module`.
    pub fn release(&self, module: ModuleId) {
        self.partitions.lock().remove(&module);
    }

    /// Number of values held for `module`.
    pub fn len_for(&self, module: ModuleId) -> usize {
        self.partitions.lock().get(&module).map_or(0, HashMap::len)
    }

    /// True if both handles point at the same context store.
    pub fn same_store(&self, other: &AsyncStorage) -> bool {
        Arc::ptr_eq(&self.partitions, &other.partitions)
    }
}

impl std::fmt::Debug for AsyncStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncStorage")
            .field("modules", &self.partitions.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleton_store_is_keyed_by_resolver() {
        let store = SingletonStore::new();
        let a = ResolverId::next();
        let b = ResolverId::next();
        store.insert(a, Arc::new(1u32));
        assert!(store.contains(a));
        let kept = store.get_or_insert(a, Arc::new(2u32));
        assert_eq!(kept.downcast_ref::<u32>(), Some(&1));
        assert!(!store.contains(b));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn process_store_is_shared() {
        assert!(Arc::ptr_eq(&SingletonStore::process(), &SingletonStore::process()));
    }

    #[test]
    fn async_storage_partitions_by_module() {
        let storage = AsyncStorage::new();
        let (m1, m2) = (ModuleId::next(), ModuleId::next());
        let id = ResolverId::next();
        storage.insert(m1, id, Arc::new("one"));
        assert!(storage.get(m1, id).is_some());
        assert!(storage.get(m2, id).is_none());

        storage.release(m1);
        assert_eq!(storage.len_for(m1), 0);
    }

    #[test]
    fn clones_share_the_store() {
        let storage = AsyncStorage::new();
        let clone = storage.clone();
        assert!(storage.same_store(&clone));
        assert!(!storage.same_store(&AsyncStorage::new()));
    }
}
