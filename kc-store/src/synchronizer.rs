use std::sync::Arc;
use std::time::Duration;

use clockabilly::{
    Clockable,
    UtcClock,
};
use futures::StreamExt;
use kc_core::errors::*;
use kc_core::prelude::*;
use kube::runtime::watcher::Event;
use metrics::{
    counter,
    gauge,
};
use tokio::sync::mpsc;
use tokio::time::{
    Instant,
    Interval,
    MissedTickBehavior,
};
use tracing::*;

use crate::errors::CacheError;
use crate::store::{
    CacheAction,
    Cacheable,
    ObjectStore,
};
use crate::watch_source::WatchSource;

// The Synchronizer is the only writer to an ObjectStore.  It consumes the watch stream for one
// collection and applies each event to the store in the order it arrives, and (optionally)
// relists the whole collection on a timer to correct any drift.
//
// A relist that arrives on the watch stream (Init, InitApply..., InitDone) is buffered and only
// applied, as a single atomic replace, once InitDone shows up.  If the stream errors out
// partway through, the buffer is thrown away and the store keeps serving the previous
// generation.
pub struct Synchronizer<K: Cacheable> {
    kind: String,
    store: ObjectStore<K>,
    source: Arc<dyn WatchSource<K>>,
    resync_period: Option<Duration>,

    relist_buffer: Option<Vec<K>>,
    clock: Box<dyn Clockable + Send>,
    last_sync_ts: Option<i64>,

    // Taken (and so sent on at most once) after the first complete relist
    ready_tx: Option<mpsc::Sender<bool>>,
}

impl<K: Cacheable> Synchronizer<K> {
    pub fn new(
        kind: &str,
        store: ObjectStore<K>,
        source: Arc<dyn WatchSource<K>>,
        resync_period: Option<Duration>,
        ready_tx: mpsc::Sender<bool>,
    ) -> Synchronizer<K> {
        Synchronizer::new_from_parts(kind, store, source, resync_period, Box::new(UtcClock), Some(ready_tx))
    }

    pub(crate) fn new_from_parts(
        kind: &str,
        store: ObjectStore<K>,
        source: Arc<dyn WatchSource<K>>,
        resync_period: Option<Duration>,
        clock: Box<dyn Clockable + Send>,
        ready_tx: Option<mpsc::Sender<bool>>,
    ) -> Synchronizer<K> {
        Synchronizer {
            kind: kind.into(),
            store,
            source,
            resync_period,
            relist_buffer: None,
            clock,
            last_sync_ts: None,
            ready_tx,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn last_sync_ts(&self) -> Option<i64> {
        self.last_sync_ts
    }

    // This is not a reference because it needs to "own" itself when tokio spawns it.  Runs until
    // the watch stream ends or the task is aborted.
    pub async fn start(mut self) {
        let mut stream = self.source.watch();
        let mut resync = self.resync_period.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        loop {
            tokio::select! {
                item = stream.next() => match item {
                    Some(res) => if let Err(err) = self.handle_event(res) {
                        kcerr!(err, "{} watcher received error on stream", self.kind);
                    },
                    None => {
                        warn!("{} watch stream closed, synchronizer exiting", self.kind);
                        break;
                    },
                },
                _ = next_resync(&mut resync) => {
                    if let Err(err) = self.relist().await {
                        kcerr!(err, "periodic relist of {} failed", self.kind);
                    }
                },
            }
        }
    }

    pub fn handle_event(&mut self, res: anyhow::Result<Event<K>>) -> EmptyResult {
        let evt = match res {
            Ok(evt) => evt,
            Err(err) => {
                if let Some(buf) = self.relist_buffer.take() {
                    warn!("discarding {} buffered {} objects from incomplete relist", buf.len(), self.kind);
                    self.record_relist("failure");
                    return Err(err.context(CacheError::SyncFailed(self.kind.clone())));
                }
                return Err(err);
            },
        };

        match evt {
            Event::Apply(obj) => {
                let action = self.store.update(obj);
                self.record_applied(action);
            },
            Event::Delete(obj) => match self.store.delete(&obj) {
                Some(_) => self.record_applied(CacheAction::Deleted),
                None => debug!("{} {} deleted but not present in cache", self.kind, obj.namespaced_name()),
            },
            Event::Init => {
                if self.relist_buffer.is_some() {
                    warn!("{} relist restarted before completing, discarding partial results", self.kind);
                }
                self.relist_buffer = Some(vec![]);
            },
            Event::InitApply(obj) => match self.relist_buffer.as_mut() {
                Some(buf) => buf.push(obj),
                None => {
                    warn!("{} object {} received outside of a relist, applying directly", self.kind, obj.namespaced_name());
                    let action = self.store.update(obj);
                    self.record_applied(action);
                },
            },
            Event::InitDone => match self.relist_buffer.take() {
                Some(objs) => self.finish_relist(objs),
                None => warn!("{} relist completed without starting, ignoring", self.kind),
            },
        }
        Ok(())
    }

    // Fetch the whole collection from the watch source and swap it in.  On failure the store is
    // not touched and the error is reported as SyncFailed.
    pub async fn relist(&mut self) -> EmptyResult {
        debug!("relisting {}", self.kind);
        match self.source.list().await {
            Ok(objs) => {
                self.finish_relist(objs);
                Ok(())
            },
            Err(err) => {
                self.record_relist("failure");
                Err(err.context(CacheError::SyncFailed(self.kind.clone())))
            },
        }
    }

    fn finish_relist(&mut self, objs: Vec<K>) {
        let count = objs.len();
        self.store.replace(objs);
        self.last_sync_ts = Some(self.clock.now_ts());
        self.record_relist("success");
        info!("{} cache synced with {count} objects", self.kind);

        // Non-blocking; if nobody's listening for readiness there's nothing to do
        if let Some(tx) = self.ready_tx.take()
            && tx.try_send(true).is_err()
        {
            debug!("nobody waiting on {} readiness", self.kind);
        }
    }

    fn record_applied(&self, action: CacheAction) {
        counter!(EVENTS_APPLIED_METRIC, "kind" => self.kind.clone(), "action" => action.as_str()).increment(1);
        self.record_size();
    }

    fn record_relist(&self, result: &'static str) {
        counter!(RELISTS_METRIC, "kind" => self.kind.clone(), "result" => result).increment(1);
        self.record_size();
    }

    fn record_size(&self) {
        gauge!(OBJECTS_GAUGE_METRIC, "kind" => self.kind.clone()).set(self.store.len() as f64);
    }
}

async fn next_resync(interval: &mut Option<Interval>) {
    match interval {
        Some(i) => {
            i.tick().await;
        },
        None => std::future::pending().await,
    }
}
