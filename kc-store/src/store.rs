use std::collections::{
    HashMap,
    HashSet,
};
use std::fmt;
use std::sync::{
    Arc,
    PoisonError,
    RwLock,
    RwLockReadGuard,
    RwLockWriteGuard,
};

use kc_core::prelude::*;
use tracing::*;

use crate::errors::CacheError;
use crate::index::{
    Indexers,
    Indices,
};

// Anything the cache can hold.  The store only ever looks at object metadata (for the key) and
// whatever the registered index functions look at.
pub trait Cacheable: Resource + Clone + Send + Sync + 'static {}
impl<T: Resource + Clone + Send + Sync + 'static> Cacheable for T {}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CacheAction {
    Added,
    Updated,
    Deleted,
}

impl CacheAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheAction::Added => "added",
            CacheAction::Updated => "updated",
            CacheAction::Deleted => "deleted",
        }
    }
}

impl fmt::Display for CacheAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

struct StoreState<K> {
    items: HashMap<String, Arc<K>>,
    indexers: Indexers<K>,
    indices: Indices,

    // bumped whenever the set of indexers changes, so that a relist that computed its indices
    // outside the lock can tell whether they're still usable
    indexers_generation: u64,
    synced: bool,
}

// The ObjectStore is the in-memory mirror of a remote collection: a map from object key to the
// most recent copy of that object, plus any number of secondary indices over it.  Handles are
// cheap to clone and all share the same underlying state.
//
// Every mutation (primary map and all index buckets) happens under a single write lock, so a
// reader can never see an object in an index bucket that isn't in the primary map or vice versa.
// Index buckets hold keys rather than objects; lookups always go back through the primary map
// and so always return the current copy.
//
// Objects are handed out as Arc<K> snapshots.  Callers that want to modify one have to clone it,
// which leaves the cached copy alone.
pub struct ObjectStore<K> {
    state: Arc<RwLock<StoreState<K>>>,
}

impl<K> Clone for ObjectStore<K> {
    fn clone(&self) -> Self {
        ObjectStore { state: self.state.clone() }
    }
}

impl<K: Cacheable> ObjectStore<K> {
    pub fn new(indexers: Indexers<K>) -> ObjectStore<K> {
        ObjectStore {
            state: Arc::new(RwLock::new(StoreState {
                items: HashMap::new(),
                indexers,
                indices: Indices::default(),
                indexers_generation: 0,
                synced: false,
            })),
        }
    }

    // A panic while holding the lock can only happen inside an index function; the state was
    // consistent before the call and the worst case is a half-updated bucket for that one key,
    // which the next relist repairs.  Queries shouldn't start panicking because of it.
    fn read(&self) -> RwLockReadGuard<'_, StoreState<K>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState<K>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add(&self, obj: K) -> CacheAction {
        self.update(obj)
    }

    // Insert or replace the object at its key; the returned action says which one happened.
    pub fn update(&self, obj: K) -> CacheAction {
        let key = obj.namespaced_name();
        let new = Arc::new(obj);

        let mut guard = self.write();
        let state = &mut *guard;
        let old = state.items.insert(key.clone(), new.clone());
        state.indices.update(&state.indexers, &key, old.as_deref(), Some(new.as_ref()));

        match old {
            Some(_) => CacheAction::Updated,
            None => CacheAction::Added,
        }
    }

    pub fn delete(&self, obj: &K) -> Option<Arc<K>> {
        self.delete_key(&obj.namespaced_name())
    }

    // Deleting a key that isn't present is a no-op, not an error
    pub fn delete_key(&self, key: &str) -> Option<Arc<K>> {
        let mut guard = self.write();
        let state = &mut *guard;
        let old = state.items.remove(key)?;
        state.indices.update(&state.indexers, key, Some(old.as_ref()), None);
        Some(old)
    }

    // Atomically swap the entire contents of the store for `objs`.  The new primary map and
    // indices are built before taking the write lock, so readers only ever see the complete old
    // generation or the complete new one.  If the same key shows up more than once, the last
    // copy wins.
    pub fn replace(&self, objs: Vec<K>) {
        let (indexers, generation) = {
            let state = self.read();
            (state.indexers.clone(), state.indexers_generation)
        };

        let items: HashMap<String, Arc<K>> = objs.into_iter().map(|o| (o.namespaced_name(), Arc::new(o))).collect();
        let mut indices = Indices::build(&indexers, &items);

        let mut state = self.write();
        if state.indexers_generation != generation {
            debug!("indexers changed during replace, rebuilding indices");
            indices = Indices::build(&state.indexers, &items);
        }
        state.items = items;
        state.indices = indices;
        state.synced = true;
    }

    pub fn get(&self, obj: &K) -> Option<Arc<K>> {
        self.get_by_key(&obj.namespaced_name())
    }

    pub fn get_by_key(&self, key: &str) -> Option<Arc<K>> {
        self.read().items.get(key).cloned()
    }

    pub fn list(&self) -> Vec<Arc<K>> {
        self.read().items.values().cloned().collect()
    }

    pub fn list_keys(&self) -> Vec<String> {
        self.read().items.keys().cloned().collect()
    }

    // Every object filed under `value` in the named index.  An empty result means the index
    // exists but nothing currently matches; an index that was never registered is an error.
    pub fn by_index(&self, index_name: &str, value: &str) -> anyhow::Result<Vec<Arc<K>>> {
        let state = self.read();
        if !state.indexers.contains(index_name) {
            return Err(CacheError::index_not_found(index_name));
        }

        Ok(state
            .indices
            .bucket(index_name, value)
            .map(|keys| keys.iter().filter_map(|k| state.items.get(k).cloned()).collect())
            .unwrap_or_default())
    }

    pub fn index_keys(&self, index_name: &str, value: &str) -> anyhow::Result<Vec<String>> {
        let state = self.read();
        if !state.indexers.contains(index_name) {
            return Err(CacheError::index_not_found(index_name));
        }

        Ok(state
            .indices
            .bucket(index_name, value)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default())
    }

    pub fn list_index_values(&self, index_name: &str) -> anyhow::Result<Vec<String>> {
        let state = self.read();
        if !state.indexers.contains(index_name) {
            return Err(CacheError::index_not_found(index_name));
        }
        Ok(state.indices.values(index_name))
    }

    // Every stored object that shares at least one value of the named index with `obj`.  `obj`
    // itself doesn't have to be in the store.
    pub fn index(&self, index_name: &str, obj: &K) -> anyhow::Result<Vec<Arc<K>>> {
        let state = self.read();
        let Some(f) = state.indexers.get(index_name) else {
            return Err(CacheError::index_not_found(index_name));
        };

        let mut keys = HashSet::new();
        for value in f(obj) {
            if let Some(bucket) = state.indices.bucket(index_name, &value) {
                keys.extend(bucket.iter());
            }
        }
        Ok(keys.into_iter().filter_map(|k| state.items.get(k).cloned()).collect())
    }

    // Register more indices.  Anything already in the store is filed into the new indices
    // before the lock is released.  If any of the names is already registered, nothing changes.
    pub fn add_indexers(&self, new_indexers: Indexers<K>) -> EmptyResult {
        let mut guard = self.write();
        let state = &mut *guard;

        let names: Vec<String> = new_indexers.names().map(String::from).collect();
        state.indexers.merge(new_indexers)?;
        for name in &names {
            if let Some(f) = state.indexers.get(name) {
                state.indices.backfill(name, f, state.items.iter());
            }
        }
        state.indexers_generation += 1;
        Ok(())
    }

    pub fn remove_index(&self, index_name: &str) -> bool {
        let mut state = self.write();
        let removed = state.indexers.remove(index_name);
        if removed {
            state.indices.remove(index_name);
            state.indexers_generation += 1;
        }
        removed
    }

    pub fn index_names(&self) -> Vec<String> {
        self.read().indexers.names().map(String::from).collect()
    }

    // True once the store has been filled by at least one complete relist
    pub fn has_synced(&self) -> bool {
        self.read().synced
    }

    pub fn len(&self) -> usize {
        self.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().items.is_empty()
    }
}
