#![cfg_attr(coverage, feature(coverage_attribute))]
pub mod config;
pub mod errors;
pub mod index;
mod lister;
mod manager;
mod store;
mod synchronizer;
mod watch_source;

#[cfg(any(test, feature = "mock"))]
pub mod fake;

pub use crate::config::CacheConfig;
pub use crate::errors::{
    CacheError,
    is_index_not_found,
    is_not_found,
    is_sync_failed,
};
pub use crate::index::{
    IndexFn,
    Indexers,
};
pub use crate::lister::{
    ConfigMapLister,
    Lister,
    NamespaceLister,
    NamespaceObjLister,
    PodLister,
    SecretLister,
    ServiceAccountLister,
    ServiceLister,
};
pub use crate::manager::CacheManager;
pub use crate::store::{
    CacheAction,
    Cacheable,
    ObjectStore,
};
pub use crate::synchronizer::Synchronizer;
#[cfg(any(test, feature = "mock"))]
pub use crate::watch_source::MockWatchSource;
pub use crate::watch_source::{
    KubeWatchSource,
    ObjStream,
    WatchSource,
};

#[cfg(test)]
mod tests;
