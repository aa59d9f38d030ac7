use std::{
    cmp::Ordering as CmpOrdering,
    sync::{atomic::Ordering, Arc},
};

use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use metrics_util::registry::{AtomicStorage, Registry};

use crate::snapshot::{Snapshot, SnapshotValue};

/// A recorder that collects metrics for a [`WavefrontReporter`][crate::WavefrontReporter].
///
/// Counters are reported cumulatively, gauges with their latest value, and histograms with the samples recorded since
/// the previous snapshot.
///
/// Clone is shallow; clones share the same underlying registry.
#[derive(Clone)]
pub struct WavefrontRecorder {
    registry: Arc<Registry<Key, AtomicStorage>>,
}

impl WavefrontRecorder {
    /// Creates a new `WavefrontRecorder`.
    pub fn new() -> Self {
        WavefrontRecorder { registry: Arc::new(Registry::atomic()) }
    }

    /// Takes a snapshot of every registered metric.
    ///
    /// Histogram samples are drained: each sample is part of exactly one snapshot. Metrics are ordered by kind
    /// (counters, gauges, histograms) and then by key.
    pub fn snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot::new();

        let mut counters: Vec<_> = self.registry.get_counter_handles().into_iter().collect();
        counters.sort_by(|(a, _), (b, _)| compare_keys(a, b));
        for (key, counter) in counters {
            snapshot.push(key, SnapshotValue::Counter(counter.load(Ordering::Acquire)));
        }

        let mut gauges: Vec<_> = self.registry.get_gauge_handles().into_iter().collect();
        gauges.sort_by(|(a, _), (b, _)| compare_keys(a, b));
        for (key, gauge) in gauges {
            snapshot.push(key, SnapshotValue::Gauge(f64::from_bits(gauge.load(Ordering::Acquire))));
        }

        let mut histograms: Vec<_> = self.registry.get_histogram_handles().into_iter().collect();
        histograms.sort_by(|(a, _), (b, _)| compare_keys(a, b));
        for (key, histogram) in histograms {
            let mut values = Vec::new();
            histogram.clear_with(|samples| values.extend_from_slice(samples));
            snapshot.push(key, SnapshotValue::Histogram(values));
        }

        snapshot
    }
}

impl Default for WavefrontRecorder {
    fn default() -> Self {
        WavefrontRecorder::new()
    }
}

impl Recorder for WavefrontRecorder {
    fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

    fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
        self.registry.get_or_create_counter(key, |c| Counter::from_arc(c.clone()))
    }

    fn register_gauge(&self, key: &Key, _: &Metadata<'_>) -> Gauge {
        self.registry.get_or_create_gauge(key, |g| Gauge::from_arc(g.clone()))
    }

    fn register_histogram(&self, key: &Key, _: &Metadata<'_>) -> Histogram {
        self.registry.get_or_create_histogram(key, |h| Histogram::from_arc(h.clone()))
    }
}

fn compare_keys(a: &Key, b: &Key) -> CmpOrdering {
    a.name().cmp(b.name()).then_with(|| {
        let a_labels = a.labels().map(|l| (l.key(), l.value()));
        let b_labels = b.labels().map(|l| (l.key(), l.value()));
        a_labels.cmp(b_labels)
    })
}

#[cfg(test)]
mod tests {
    use metrics::{counter, gauge, histogram, with_local_recorder};

    use super::WavefrontRecorder;
    use crate::snapshot::SnapshotValue;

    fn entries(recorder: &WavefrontRecorder) -> Vec<(String, SnapshotValue)> {
        recorder.snapshot().iter().map(|(k, v)| (k.name().to_string(), v.clone())).collect()
    }

    #[test]
    fn snapshot_is_ordered_by_kind_then_key() {
        let recorder = WavefrontRecorder::new();
        with_local_recorder(&recorder, || {
            histogram!("latency").record(1.5);
            gauge!("connections").set(4.0);
            counter!("requests").increment(2);
            counter!("errors").increment(1);
        });

        assert_eq!(
            entries(&recorder),
            [
                ("errors".to_string(), SnapshotValue::Counter(1)),
                ("requests".to_string(), SnapshotValue::Counter(2)),
                ("connections".to_string(), SnapshotValue::Gauge(4.0)),
                ("latency".to_string(), SnapshotValue::Histogram(vec![1.5])),
            ]
        );
    }

    #[test]
    fn histograms_are_drained_and_counters_accumulate() {
        let recorder = WavefrontRecorder::new();
        with_local_recorder(&recorder, || {
            counter!("requests").increment(2);
            histogram!("latency").record(1.0);
            histogram!("latency").record(2.0);
        });

        let first = entries(&recorder);
        assert!(first.contains(&("latency".to_string(), SnapshotValue::Histogram(vec![1.0, 2.0]))));

        with_local_recorder(&recorder, || {
            counter!("requests").increment(3);
        });

        let second = entries(&recorder);
        assert!(second.contains(&("requests".to_string(), SnapshotValue::Counter(5))));
        assert!(second.contains(&("latency".to_string(), SnapshotValue::Histogram(vec![]))));
    }

    #[test]
    fn labels_distinguish_metrics() {
        let recorder = WavefrontRecorder::new();
        with_local_recorder(&recorder, || {
            counter!("requests", "method" => "post").increment(1);
            counter!("requests", "method" => "get").increment(1);
        });

        let snapshot = recorder.snapshot();
        let methods: Vec<_> = snapshot
            .iter()
            .map(|(k, _)| k.labels().next().map(|l| l.value().to_string()).unwrap_or_default())
            .collect();
        assert_eq!(methods, ["get", "post"]);
    }
}
