use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
    PoisonError,
};

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::StreamExt;
use kc_core::errors::*;
use kube::runtime::watcher::Event;

use crate::watch_source::{
    ObjStream,
    WatchSource,
};

struct FakeState<K> {
    objs: Vec<K>,
    fail_list: bool,
    event_tx: Option<mpsc::UnboundedSender<anyhow::Result<Event<K>>>>,
}

// An in-memory watch source for tests.  `list()` returns whatever objects have been `set`, and
// the stream returned by `watch()` yields whatever events are pushed with `send`/`apply`/etc.
// Only one stream is live at a time; calling `watch()` again takes over the event feed.
pub struct FakeWatchSource<K> {
    state: Arc<Mutex<FakeState<K>>>,
}

impl<K> Clone for FakeWatchSource<K> {
    fn clone(&self) -> Self {
        FakeWatchSource { state: self.state.clone() }
    }
}

impl<K> Default for FakeWatchSource<K> {
    fn default() -> Self {
        FakeWatchSource {
            state: Arc::new(Mutex::new(FakeState { objs: vec![], fail_list: false, event_tx: None })),
        }
    }
}

impl<K: Clone + Send + Sync + 'static> FakeWatchSource<K> {
    pub fn new(objs: Vec<K>) -> FakeWatchSource<K> {
        let fake = FakeWatchSource::default();
        fake.set(objs);
        fake
    }

    fn lock(&self) -> MutexGuard<'_, FakeState<K>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, objs: Vec<K>) {
        self.lock().objs = objs;
    }

    pub fn fail_list(&self, fail: bool) {
        self.lock().fail_list = fail;
    }

    pub fn is_watching(&self) -> bool {
        self.lock().event_tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    pub fn send(&self, evt: anyhow::Result<Event<K>>) -> EmptyResult {
        let state = self.lock();
        let Some(tx) = state.event_tx.as_ref() else {
            bail!("no watch stream is open");
        };
        tx.unbounded_send(evt)?;
        Ok(())
    }

    pub fn apply(&self, obj: K) -> EmptyResult {
        self.send(Ok(Event::Apply(obj)))
    }

    pub fn delete(&self, obj: K) -> EmptyResult {
        self.send(Ok(Event::Delete(obj)))
    }

    pub fn send_error(&self, msg: &str) -> EmptyResult {
        self.send(Err(anyhow!("{msg}")))
    }

    // Push a complete relist of the current contents onto the stream, the same way kube-runtime
    // does when a watch (re)starts
    pub fn relist(&self) -> EmptyResult {
        let objs = self.lock().objs.clone();
        self.send(Ok(Event::Init))?;
        for obj in objs {
            self.send(Ok(Event::InitApply(obj)))?;
        }
        self.send(Ok(Event::InitDone))
    }

    // Close the stream; the synchronizer reading from it will exit
    pub fn close(&self) {
        self.lock().event_tx = None;
    }
}

#[async_trait]
impl<K: Clone + Send + Sync + 'static> WatchSource<K> for FakeWatchSource<K> {
    async fn list(&self) -> anyhow::Result<Vec<K>> {
        let state = self.lock();
        if state.fail_list {
            bail!("fake list failure");
        }
        Ok(state.objs.clone())
    }

    fn watch(&self) -> ObjStream<K> {
        let (tx, rx) = mpsc::unbounded();
        self.lock().event_tx = Some(tx);
        rx.boxed()
    }
}
