use metrics::Key;
use metrics_util::{
    debugging::{DebugValue, Snapshot as DebugSnapshot},
    MetricKind,
};

/// A point-in-time value for a metric.
#[derive(Clone, Debug, PartialEq)]
pub enum SnapshotValue {
    /// Counter.
    Counter(u64),
    /// Gauge.
    Gauge(f64),
    /// Histogram samples observed since the previous snapshot.
    Histogram(Vec<f64>),
}

impl SnapshotValue {
    /// Returns the kind of metric this value belongs to.
    pub const fn kind(&self) -> MetricKind {
        match self {
            SnapshotValue::Counter(_) => MetricKind::Counter,
            SnapshotValue::Gauge(_) => MetricKind::Gauge,
            SnapshotValue::Histogram(_) => MetricKind::Histogram,
        }
    }
}

/// An immutable, point-in-time view of a set of metrics.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    entries: Vec<(Key, SnapshotValue)>,
}

impl Snapshot {
    /// Creates an empty `Snapshot`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a counter value.
    #[must_use]
    pub fn with_counter<K: Into<Key>>(mut self, key: K, value: u64) -> Self {
        self.push(key.into(), SnapshotValue::Counter(value));
        self
    }

    /// Adds a gauge value.
    #[must_use]
    pub fn with_gauge<K: Into<Key>>(mut self, key: K, value: f64) -> Self {
        self.push(key.into(), SnapshotValue::Gauge(value));
        self
    }

    /// Adds histogram samples.
    #[must_use]
    pub fn with_histogram<K, I>(mut self, key: K, values: I) -> Self
    where
        K: Into<Key>,
        I: IntoIterator<Item = f64>,
    {
        self.push(key.into(), SnapshotValue::Histogram(values.into_iter().collect()));
        self
    }

    pub(crate) fn push(&mut self, key: Key, value: SnapshotValue) {
        self.entries.push((key, value));
    }

    /// Returns the number of metrics in the snapshot.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the snapshot holds no metrics.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the metrics in the snapshot, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &SnapshotValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Iterates over the metrics of the given kind, in insertion order.
    pub fn iter_kind(&self, kind: MetricKind) -> impl Iterator<Item = (&Key, &SnapshotValue)> {
        self.iter().filter(move |(_, v)| v.kind() == kind)
    }
}

impl From<DebugSnapshot> for Snapshot {
    fn from(snapshot: DebugSnapshot) -> Self {
        let entries = snapshot
            .into_vec()
            .into_iter()
            .map(|(ckey, _, _, value)| {
                let (_, key) = ckey.into_parts();
                let value = match value {
                    DebugValue::Counter(v) => SnapshotValue::Counter(v),
                    DebugValue::Gauge(v) => SnapshotValue::Gauge(v.into_inner()),
                    DebugValue::Histogram(vs) => {
                        SnapshotValue::Histogram(vs.into_iter().map(|v| v.into_inner()).collect())
                    }
                };
                (key, value)
            })
            .collect();

        Snapshot { entries }
    }
}

#[cfg(test)]
mod tests {
    use metrics::{counter, gauge, histogram, with_local_recorder};
    use metrics_util::{debugging::DebuggingRecorder, MetricKind};

    use super::{Snapshot, SnapshotValue};

    #[test]
    fn builder_preserves_order() {
        let snapshot = Snapshot::new()
            .with_histogram("latency", [1.0, 2.0])
            .with_counter("requests", 3)
            .with_gauge("connections", 4.5);

        let names: Vec<_> = snapshot.iter().map(|(k, _)| k.name().to_string()).collect();
        assert_eq!(names, ["latency", "requests", "connections"]);
        assert_eq!(snapshot.len(), 3);

        let counters: Vec<_> = snapshot.iter_kind(MetricKind::Counter).collect();
        assert_eq!(counters.len(), 1);
        assert_eq!(counters[0].1, &SnapshotValue::Counter(3));
    }

    #[test]
    fn converts_debugging_snapshot() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        with_local_recorder(&recorder, || {
            counter!("requests", "method" => "get").increment(2);
            gauge!("connections").set(7.0);
            histogram!("latency").record(0.25);
        });

        let snapshot = Snapshot::from(snapshotter.snapshot());
        assert_eq!(snapshot.len(), 3);

        let values: Vec<_> = snapshot.iter().map(|(k, v)| (k.name().to_string(), v.clone())).collect();
        assert!(values.contains(&("requests".to_string(), SnapshotValue::Counter(2))));
        assert!(values.contains(&("connections".to_string(), SnapshotValue::Gauge(7.0))));
        assert!(values.contains(&("latency".to_string(), SnapshotValue::Histogram(vec![0.25]))));
    }
}
