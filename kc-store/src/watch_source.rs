use std::fmt::Debug;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{
    StreamExt,
    TryStreamExt,
};
use kube::api::ListParams;
use kube::runtime::WatchStreamExt;
use kube::runtime::watcher::{
    self,
    Event,
    watcher,
};
use serde::de::DeserializeOwned;
use tracing::*;

use crate::config::CacheConfig;

const LIST_PAGE_SIZE: u32 = 500;

pub type ObjStream<K> = BoxStream<'static, anyhow::Result<Event<K>>>;

// Where a synchronizer gets its objects from: a one-shot full listing (used for periodic
// relists) and an ordered, never-ending stream of change events.  The stream is expected to open
// with an Init/InitApply.../InitDone sequence and to repeat it whenever it has to start over.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait WatchSource<K: Send + Sync + 'static>: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<K>>;
    fn watch(&self) -> ObjStream<K>;
}

// The real thing: list/watch against the Kubernetes apiserver.  Retry and backoff of the watch
// are handled by kube-runtime; errors still show up on the stream so the synchronizer can see
// them.
pub struct KubeWatchSource<K> {
    api: kube::Api<K>,
    label_selector: Option<String>,
    field_selector: Option<String>,
}

impl<K> KubeWatchSource<K>
where
    K: kube::Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    pub fn new(api: kube::Api<K>) -> KubeWatchSource<K> {
        KubeWatchSource { api, label_selector: None, field_selector: None }
    }

    // Namespace restriction is done with a field selector on the cluster-wide api, since that works
    // without knowing (at compile time) whether K is namespaced.
    pub fn from_config(client: kube::Client, config: &CacheConfig) -> KubeWatchSource<K> {
        KubeWatchSource {
            api: kube::Api::all(client),
            label_selector: config.label_selector.clone(),
            field_selector: config.watch_namespace().map(|ns| format!("metadata.namespace={ns}")),
        }
    }

    pub fn with_label_selector(mut self, selector: &str) -> Self {
        self.label_selector = Some(selector.into());
        self
    }

    fn list_params(&self) -> ListParams {
        let mut lp = ListParams::default().limit(LIST_PAGE_SIZE);
        if let Some(sel) = &self.label_selector {
            lp = lp.labels(sel);
        }
        if let Some(sel) = &self.field_selector {
            lp = lp.fields(sel);
        }
        lp
    }

    fn watcher_config(&self) -> watcher::Config {
        let mut cfg = watcher::Config::default();
        if let Some(sel) = &self.label_selector {
            cfg = cfg.labels(sel);
        }
        if let Some(sel) = &self.field_selector {
            cfg = cfg.fields(sel);
        }
        cfg
    }
}

#[async_trait]
impl<K> WatchSource<K> for KubeWatchSource<K>
where
    K: kube::Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    async fn list(&self) -> anyhow::Result<Vec<K>> {
        let mut objs = vec![];
        let mut lp = self.list_params();
        loop {
            let page = self.api.list(&lp).await?;
            objs.extend(page.items);
            match page.metadata.continue_ {
                Some(token) if !token.is_empty() => {
                    debug!("fetched {} objects so far, continuing", objs.len());
                    lp = lp.continue_token(&token);
                },
                _ => break,
            }
        }
        Ok(objs)
    }

    fn watch(&self) -> ObjStream<K> {
        watcher(self.api.clone(), self.watcher_config())
            .default_backoff()
            .map_err(|e| e.into())
            .boxed()
    }
}
