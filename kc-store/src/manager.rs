use std::fmt::Debug;
use std::sync::Arc;

use kc_core::prelude::*;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::*;

use crate::config::CacheConfig;
use crate::lister::Lister;
use crate::store::{
    Cacheable,
    ObjectStore,
};
use crate::synchronizer::Synchronizer;
use crate::watch_source::{
    KubeWatchSource,
    WatchSource,
};

// Owns the background synchronizer for one cached collection and hands out listers over it.
// Dropping the manager (or calling `shutdown`) stops the synchronizer; listers that are still
// around keep working, they just stop seeing updates.
//
// The `start*` functions spawn onto the current tokio runtime, so they have to be called from
// inside one.
pub struct CacheManager<K: Cacheable> {
    kind: String,
    store: ObjectStore<K>,
    ready_rx: mpsc::Receiver<bool>,
    js: JoinSet<()>,
}

impl<K> CacheManager<K>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    pub fn start(client: kube::Client, config: &CacheConfig) -> anyhow::Result<Self> {
        let source = KubeWatchSource::<K>::from_config(client, config);
        CacheManager::start_with_source(&K::kind(&()), Arc::new(source), config)
    }
}

impl<K: Cacheable> CacheManager<K> {
    pub fn start_with_source(
        kind: &str,
        source: Arc<dyn WatchSource<K>>,
        config: &CacheConfig,
    ) -> anyhow::Result<Self> {
        let store = ObjectStore::new(config.build_indexers()?);
        let (ready_tx, ready_rx): (mpsc::Sender<bool>, mpsc::Receiver<bool>) = mpsc::channel(1);

        let sync = Synchronizer::new(kind, store.clone(), source, config.resync_period()?, ready_tx);
        let mut js = JoinSet::new();
        js.spawn(sync.start());
        info!("started {kind} cache");

        Ok(CacheManager { kind: kind.into(), store, ready_rx, js })
    }

    pub fn store(&self) -> ObjectStore<K> {
        self.store.clone()
    }

    pub fn lister(&self) -> Lister<K> {
        Lister::new_with_kind(self.store.clone(), &self.kind)
    }

    // Blocks until the cache has been filled by its first complete relist.  Returns false if the
    // synchronizer exited before that ever happened.
    pub async fn wait_ready(&mut self) -> bool {
        if self.store.has_synced() {
            return true;
        }
        self.ready_rx.recv().await.is_some() || self.store.has_synced()
    }

    pub async fn shutdown(&mut self) {
        self.js.shutdown().await;
        info!("{} cache shut down", self.kind);
    }
}
