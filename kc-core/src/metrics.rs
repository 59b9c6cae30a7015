use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::anyhow;
use metrics::{
    Counter,
    Gauge,
    Histogram,
    Key,
    KeyName,
    Label,
    Metadata,
    Recorder,
    SharedString,
    Unit,
    set_global_recorder,
};
use metrics_util::registry::{
    AtomicStorage,
    Registry,
};

// A metrics recorder that just keeps everything in memory; mostly useful for checking what the
// synchronizer reported, either installed globally or scoped with `metrics::with_local_recorder`.
#[derive(Clone)]
pub struct MemoryRecorder {
    registry: Arc<Registry<Key, AtomicStorage>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        MemoryRecorder { registry: Arc::new(Registry::atomic()) }
    }

    pub fn install(&self) -> anyhow::Result<()> {
        set_global_recorder(self.clone())?;
        Ok(())
    }

    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> anyhow::Result<u64> {
        let key = build_key(name, labels);
        self.registry
            .get_counter(&key)
            .map(|v| v.load(Ordering::Relaxed))
            .ok_or(anyhow!("no counter with key {key}"))
    }

    pub fn gauge(&self, name: &str, labels: &[(&str, &str)]) -> anyhow::Result<f64> {
        let key = build_key(name, labels);
        self.registry
            .get_gauge(&key)
            .map(|v| f64::from_bits(v.load(Ordering::Relaxed)))
            .ok_or(anyhow!("no gauge with key {key}"))
    }
}

impl Default for MemoryRecorder {
    fn default() -> Self {
        MemoryRecorder::new()
    }
}

fn build_key(name: &str, labels: &[(&str, &str)]) -> Key {
    let labels: Vec<_> = labels.iter().map(|(k, v)| Label::new(k.to_string(), v.to_string())).collect();
    Key::from_parts(name.to_string(), labels)
}

impl Recorder for MemoryRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        self.registry.get_or_create_counter(key, |c| Counter::from_arc(c.clone()))
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        self.registry.get_or_create_gauge(key, |g| Gauge::from_arc(g.clone()))
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        self.registry.get_or_create_histogram(key, |h| Histogram::from_arc(h.clone()))
    }
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;

    #[rstest]
    fn test_memory_recorder_local() {
        let recorder = MemoryRecorder::new();
        metrics::with_local_recorder(&recorder, || {
            metrics::counter!("foo_total", "kind" => "ConfigMap").increment(3);
            metrics::gauge!("bar").set(42.0);
        });

        assert_eq!(recorder.counter("foo_total", &[("kind", "ConfigMap")]).unwrap(), 3);
        assert_eq!(recorder.gauge("bar", &[]).unwrap(), 42.0);
        assert!(recorder.counter("foo_total", &[("kind", "Secret")]).is_err());
    }

    #[rstest]
    fn test_memory_recorder_install() {
        let recorder = MemoryRecorder::new();
        recorder.install().unwrap();
        metrics::counter!("installed_total").increment(1);
        assert_eq!(recorder.counter("installed_total", &[]).unwrap(), 1);

        // there can only be one global recorder
        assert!(MemoryRecorder::new().install().is_err());
    }
}
