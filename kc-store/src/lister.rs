use std::sync::Arc;

use kc_core::k8s::format_key;
use kc_core::prelude::*;
use tracing::*;

use crate::errors::CacheError;
use crate::store::{
    Cacheable,
    ObjectStore,
};

// Listers are the read-only face of the cache.  They never write to the store; every call takes
// a read lock for the duration of that one call, so results are internally consistent but two
// calls in a row may observe different generations of the cache.
pub struct Lister<K> {
    pub(crate) store: ObjectStore<K>,
    kind: String,
}

impl<K> Clone for Lister<K> {
    fn clone(&self) -> Self {
        Lister { store: self.store.clone(), kind: self.kind.clone() }
    }
}

pub type ConfigMapLister = Lister<corev1::ConfigMap>;
pub type NamespaceObjLister = Lister<corev1::Namespace>;
pub type PodLister = Lister<corev1::Pod>;
pub type SecretLister = Lister<corev1::Secret>;
pub type ServiceAccountLister = Lister<corev1::ServiceAccount>;
pub type ServiceLister = Lister<corev1::Service>;

impl<K: Cacheable + Resource<DynamicType = ()>> Lister<K> {
    pub fn new(store: ObjectStore<K>) -> Lister<K> {
        Lister::new_with_kind(store, &K::kind(&()))
    }
}

impl<K: Cacheable> Lister<K> {
    // For types whose kind isn't known statically (e.g., DynamicObject)
    pub fn new_with_kind(store: ObjectStore<K>, kind: &str) -> Lister<K> {
        Lister { store, kind: kind.into() }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn namespaced(&self, namespace: &str) -> NamespaceLister<'_, K> {
        NamespaceLister { lister: self, namespace: namespace.into() }
    }

    // Cluster-scoped lookup; for namespaced kinds use `namespaced(ns).get(name)`
    pub fn get(&self, name: &str) -> anyhow::Result<Arc<K>> {
        self.store
            .get_by_key(name)
            .ok_or_else(|| CacheError::not_found(&self.kind, name))
    }

    pub fn list(&self, selector: &impl LabelMatcher) -> anyhow::Result<Vec<Arc<K>>> {
        filter_by_labels(self.store.list(), selector)
    }

    pub fn list_all(&self) -> Vec<Arc<K>> {
        self.store.list()
    }

    // Straight namespace index lookup, no fallback; an unregistered index is reported.
    pub fn list_by_namespace(&self, namespace: &str) -> anyhow::Result<Vec<Arc<K>>> {
        self.store.by_index(NAMESPACE_INDEX, namespace)
    }

    pub fn by_index(&self, index_name: &str, value: &str) -> anyhow::Result<Vec<Arc<K>>> {
        self.store.by_index(index_name, value)
    }

    // UIDs are assigned by the apiserver and assumed unique, so the first hit is the answer.  No
    // match is a normal outcome (Ok(None)), not an error.
    pub fn get_by_uid(&self, uid: &str) -> anyhow::Result<Option<Arc<K>>> {
        Ok(self.store.by_index(UID_INDEX, uid)?.into_iter().next())
    }
}

// A view of a lister restricted to one namespace.  NAMESPACE_ALL (the empty string) means every
// namespace.
pub struct NamespaceLister<'a, K> {
    lister: &'a Lister<K>,
    namespace: String,
}

impl<K: Cacheable> NamespaceLister<'_, K> {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn get(&self, name: &str) -> anyhow::Result<Arc<K>> {
        self.lister
            .store
            .get_by_key(&format_key(&self.namespace, name))
            .ok_or_else(|| CacheError::not_found(&self.lister.kind, name))
    }

    // List everything in the namespace matching the selector.  This goes through the namespace
    // index when it can.  If the index lookup fails for any reason (it was never registered, it
    // was removed, etc.) we fall back to scanning the whole store and filtering on namespace
    // ourselves: a broken index costs time, never results.  Selector errors are not swallowed.
    pub fn list(&self, selector: &impl LabelMatcher) -> anyhow::Result<Vec<Arc<K>>> {
        if self.namespace == NAMESPACE_ALL {
            return self.lister.list(selector);
        }

        // The index is trusted for membership, so there's no namespace re-check on this path
        match self.lister.store.by_index(NAMESPACE_INDEX, &self.namespace) {
            Ok(objs) => filter_by_labels(objs, selector),
            Err(err) => {
                debug!(
                    "namespace index lookup for {} in {} failed ({err}), falling back to a full scan",
                    self.lister.kind, self.namespace
                );
                let in_ns = self
                    .lister
                    .store
                    .list()
                    .into_iter()
                    .filter(|obj| obj.namespace().as_deref() == Some(self.namespace.as_str()))
                    .collect();
                filter_by_labels(in_ns, selector)
            },
        }
    }
}

fn filter_by_labels<K: Cacheable>(objs: Vec<Arc<K>>, selector: &impl LabelMatcher) -> anyhow::Result<Vec<Arc<K>>> {
    let mut res = Vec::with_capacity(objs.len());
    for obj in objs {
        if selector.matches(obj.labels())? {
            res.push(obj);
        }
    }
    Ok(res)
}
