use std::fs::File;
use std::time::Duration;

use kc_core::errors::*;
use kc_core::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};

use crate::index::Indexers;

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_selector: Option<String>,

    // humantime format, e.g. "30s" or "5m"; unset means no periodic relists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resync_period: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub label_indices: Vec<String>,
}

impl CacheConfig {
    pub fn load(filename: &str) -> anyhow::Result<CacheConfig> {
        let config: CacheConfig = serde_yaml::from_reader(File::open(filename)?)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EmptyResult {
        self.resync_period()?;
        self.build_indexers::<corev1::ConfigMap>()?;
        Ok(())
    }

    // The namespace to restrict list/watch to; both an absent field and NAMESPACE_ALL mean
    // "everything"
    pub fn watch_namespace(&self) -> Option<&str> {
        self.namespace.as_deref().filter(|ns| *ns != NAMESPACE_ALL)
    }

    pub fn resync_period(&self) -> anyhow::Result<Option<Duration>> {
        let Some(period) = &self.resync_period else {
            return Ok(None);
        };

        let d = humantime::parse_duration(period)?;
        ensure!(!d.is_zero(), "resyncPeriod must be greater than zero, got {period:?}");
        Ok(Some(d))
    }

    // The standard indices plus one `label:<key>` index for each configured label key.  The same
    // key listed twice is an IndexerConflict.
    pub fn build_indexers<K: Resource + 'static>(&self) -> anyhow::Result<Indexers<K>> {
        let mut indexers = Indexers::standard();
        for key in &self.label_indices {
            indexers = indexers.with_label_index(key)?;
        }
        Ok(indexers)
    }
}
