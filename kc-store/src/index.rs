use std::collections::{
    BTreeMap,
    HashMap,
    HashSet,
};
use std::fmt;
use std::sync::Arc;

use kc_core::prelude::*;

use crate::errors::CacheError;

// An index function maps an object to the set of index values it should be filed under.  They
// must be pure: the store recomputes them for the old and new copy of an object on every write
// and relies on getting the same answer for the same input.
pub type IndexFn<K> = Arc<dyn Fn(&K) -> Vec<String> + Send + Sync>;

// index value -> keys of every object currently filed under that value
pub(crate) type Index = HashMap<String, HashSet<String>>;

// The set of named index functions a store maintains.  This is an explicit value handed to the
// store at construction time (or later via `ObjectStore::add_indexers`); there is no global
// registry.
pub struct Indexers<K> {
    fns: BTreeMap<String, IndexFn<K>>,
}

impl<K> Clone for Indexers<K> {
    fn clone(&self) -> Self {
        Indexers { fns: self.fns.clone() }
    }
}

impl<K> fmt::Debug for Indexers<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.fns.keys()).finish()
    }
}

impl<K> Default for Indexers<K> {
    fn default() -> Self {
        Indexers { fns: BTreeMap::new() }
    }
}

impl<K> Indexers<K> {
    pub fn new() -> Self {
        Indexers::default()
    }

    pub fn insert<F>(&mut self, name: &str, f: F) -> EmptyResult
    where
        F: Fn(&K) -> Vec<String> + Send + Sync + 'static,
    {
        if self.fns.contains_key(name) {
            return Err(CacheError::indexer_conflict(name));
        }
        self.fns.insert(name.into(), Arc::new(f));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fns.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&IndexFn<K>> {
        self.fns.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fns.keys().map(|k| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fns.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&String, &IndexFn<K>)> {
        self.fns.iter()
    }

    pub(crate) fn remove(&mut self, name: &str) -> bool {
        self.fns.remove(name).is_some()
    }

    // Fails on the first name that is registered in both; `self` is unchanged in that case.
    pub(crate) fn merge(&mut self, other: Indexers<K>) -> EmptyResult {
        if let Some(name) = other.fns.keys().find(|name| self.fns.contains_key(*name)) {
            return Err(CacheError::indexer_conflict(name));
        }
        self.fns.extend(other.fns);
        Ok(())
    }
}

impl<K: Resource + 'static> Indexers<K> {
    // The namespace and uid indices; this is what the listers expect to find.
    pub fn standard() -> Self {
        let mut fns: BTreeMap<String, IndexFn<K>> = BTreeMap::new();
        fns.insert(NAMESPACE_INDEX.into(), Arc::new(namespace_index_fn::<K>));
        fns.insert(UID_INDEX.into(), Arc::new(uid_index_fn::<K>));
        Indexers { fns }
    }

    pub fn with_label_index(mut self, label_key: &str) -> anyhow::Result<Self> {
        self.insert(&label_index_name(label_key), label_index_fn::<K>(label_key))?;
        Ok(self)
    }
}

// Cluster-scoped objects aren't filed in the namespace index at all
pub fn namespace_index_fn<K: Resource>(obj: &K) -> Vec<String> {
    obj.namespace().into_iter().collect()
}

pub fn uid_index_fn<K: Resource>(obj: &K) -> Vec<String> {
    obj.uid().into_iter().collect()
}

pub fn label_index_name(label_key: &str) -> String {
    format!("{LABEL_INDEX_PREFIX}{label_key}")
}

pub fn label_index_fn<K: Resource>(label_key: &str) -> impl Fn(&K) -> Vec<String> + Send + Sync + 'static {
    let label_key = label_key.to_string();
    move |obj: &K| obj.labels().get(&label_key).cloned().into_iter().collect()
}

// All the secondary indices for a store.  The only way to modify these is through `update` and
// `build`, which keep every bucket in agreement with the store's primary map; the store calls
// them while holding its write lock.
#[derive(Clone, Debug, Default)]
pub(crate) struct Indices {
    indices: HashMap<String, Index>,
}

impl Indices {
    pub(crate) fn build<'a, K: 'a>(
        indexers: &Indexers<K>,
        items: impl IntoIterator<Item = (&'a String, &'a Arc<K>)> + Clone,
    ) -> Indices {
        let mut indices = Indices::default();
        for (name, f) in indexers.iter() {
            indices.backfill(name, f, items.clone());
        }
        indices
    }

    pub(crate) fn backfill<'a, K: 'a>(
        &mut self,
        name: &str,
        f: &IndexFn<K>,
        items: impl IntoIterator<Item = (&'a String, &'a Arc<K>)>,
    ) {
        let index = self.indices.entry(name.into()).or_default();
        for (key, obj) in items {
            for value in f(obj.as_ref()) {
                index.entry(value).or_default().insert(key.clone());
            }
        }
    }

    // Move `key` from the buckets `old` was filed under to the buckets `new` should be filed
    // under.  `old` is None for a fresh add, `new` is None for a delete.
    pub(crate) fn update<K>(&mut self, indexers: &Indexers<K>, key: &str, old: Option<&K>, new: Option<&K>) {
        for (name, f) in indexers.iter() {
            let old_values: HashSet<String> = old.map(|o| f(o)).unwrap_or_default().into_iter().collect();
            let new_values: HashSet<String> = new.map(|n| f(n)).unwrap_or_default().into_iter().collect();

            // Re-applying an identical object is common (resyncs, relists); skip the churn
            if old.is_some() && old_values == new_values {
                continue;
            }

            let index = self.indices.entry(name.clone()).or_default();
            for value in old_values.difference(&new_values) {
                if let Some(bucket) = index.get_mut(value) {
                    bucket.remove(key);
                    if bucket.is_empty() {
                        index.remove(value);
                    }
                }
            }

            for value in new_values {
                index.entry(value).or_default().insert(key.into());
            }
        }
    }

    pub(crate) fn bucket(&self, name: &str, value: &str) -> Option<&HashSet<String>> {
        self.indices.get(name)?.get(value)
    }

    pub(crate) fn values(&self, name: &str) -> Vec<String> {
        self.indices
            .get(name)
            .map(|index| index.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn remove(&mut self, name: &str) {
        self.indices.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use kc_testutils::*;

    use super::*;

    fn build(objs: &[corev1::ServiceAccount]) -> (Indexers<corev1::ServiceAccount>, Indices) {
        let indexers = Indexers::standard().with_label_index(TEST_LABEL_KEY).unwrap();
        let items: HashMap<String, Arc<corev1::ServiceAccount>> =
            objs.iter().map(|o| (o.namespaced_name(), Arc::new(o.clone()))).collect();
        let indices = Indices::build(&indexers, &items);
        (indexers, indices)
    }

    #[rstest]
    fn test_standard_indexers() {
        let indexers = Indexers::<corev1::ServiceAccount>::standard();
        assert_bag_eq!(indexers.names().collect::<Vec<_>>(), [NAMESPACE_INDEX, UID_INDEX]);
    }

    #[rstest]
    fn test_insert_conflict() {
        let mut indexers = Indexers::<corev1::ServiceAccount>::standard();
        let err = indexers.insert(UID_INDEX, uid_index_fn::<corev1::ServiceAccount>).unwrap_err();
        assert!(matches!(err.downcast_ref::<CacheError>(), Some(CacheError::IndexerConflict(_))));
        assert_eq!(indexers.len(), 2);
    }

    #[rstest]
    fn test_merge_conflict_leaves_indexers_unchanged() {
        let mut indexers = Indexers::<corev1::ServiceAccount>::new();
        indexers.insert("foo", |_: &corev1::ServiceAccount| vec![]).unwrap();

        let mut other = Indexers::<corev1::ServiceAccount>::new();
        other.insert("bar", |_: &corev1::ServiceAccount| vec![]).unwrap();
        other.insert("foo", |_: &corev1::ServiceAccount| vec![]).unwrap();

        assert_err!(indexers.merge(other));
        assert_bag_eq!(indexers.names().collect::<Vec<_>>(), ["foo"]);
    }

    #[rstest]
    fn test_cluster_scoped_not_namespace_indexed() {
        let ns = build_namespace(TEST_NAMESPACE, "ns-uid");
        assert_is_empty!(namespace_index_fn(&ns));
        assert_eq!(uid_index_fn(&ns), vec!["ns-uid".to_string()]);
    }

    #[rstest]
    fn test_label_index_fn(test_service_account: corev1::ServiceAccount) {
        let f = label_index_fn::<corev1::ServiceAccount>(TEST_LABEL_KEY);
        assert_eq!(f(&test_service_account), vec!["prod".to_string()]);

        let f = label_index_fn::<corev1::ServiceAccount>("missing");
        assert_is_empty!(f(&test_service_account));
    }

    #[rstest]
    fn test_build(many_service_accounts: Vec<corev1::ServiceAccount>) {
        let (_, indices) = build(&many_service_accounts);
        assert_len_eq_x!(indices.bucket(NAMESPACE_INDEX, TEST_NAMESPACE).unwrap(), 6);
        assert_len_eq_x!(indices.bucket(UID_INDEX, "uid3").unwrap(), 1);
        assert_bag_eq!(indices.values(&label_index_name(TEST_LABEL_KEY)), ["prod".to_string(), "dev".to_string()]);
    }

    #[rstest]
    fn test_update_moves_bucket(test_service_account: corev1::ServiceAccount) {
        let (indexers, mut indices) = build(std::slice::from_ref(&test_service_account));
        let key = test_service_account.namespaced_name();
        let label_index = label_index_name(TEST_LABEL_KEY);

        let mut updated = test_service_account.clone();
        updated.labels_mut().insert(TEST_LABEL_KEY.into(), "dev".into());
        indices.update(&indexers, &key, Some(&test_service_account), Some(&updated));

        // the old bucket is pruned entirely rather than left empty
        assert_none!(indices.bucket(&label_index, "prod"));
        assert!(indices.bucket(&label_index, "dev").unwrap().contains(&key));
        assert!(indices.bucket(NAMESPACE_INDEX, TEST_NAMESPACE).unwrap().contains(&key));
    }

    #[rstest]
    fn test_update_delete(test_service_account: corev1::ServiceAccount) {
        let (indexers, mut indices) = build(std::slice::from_ref(&test_service_account));
        let key = test_service_account.namespaced_name();

        indices.update(&indexers, &key, Some(&test_service_account), None);
        for name in indexers.names() {
            assert_is_empty!(indices.values(name));
        }
    }
}
