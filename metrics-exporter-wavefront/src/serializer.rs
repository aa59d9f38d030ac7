use std::sync::Arc;

use metrics::Key;
use metrics_util::MetricKind;

use crate::{
    filter::MetricFilter,
    sender::SendError,
    snapshot::{Snapshot, SnapshotValue},
};

/// Receives the metrics of a snapshot, one at a time.
pub trait SnapshotWriter {
    /// Writes a counter.
    ///
    /// # Errors
    ///
    /// If the counter could not be written, an error is returned.
    fn write_counter(&mut self, key: &Key, value: u64) -> Result<(), SendError>;

    /// Writes a gauge.
    ///
    /// # Errors
    ///
    /// If the gauge could not be written, an error is returned.
    fn write_gauge(&mut self, key: &Key, value: f64) -> Result<(), SendError>;

    /// Writes the samples of a histogram. `values` is never empty.
    ///
    /// # Errors
    ///
    /// If the histogram could not be written, an error is returned.
    fn write_histogram(&mut self, key: &Key, values: &[f64]) -> Result<(), SendError>;
}

/// Number of metrics written by a single [`SnapshotSerializer::serialize`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Counters written.
    pub counters: usize,
    /// Gauges written.
    pub gauges: usize,
    /// Histograms written.
    pub histograms: usize,
    /// Metrics rejected by the filter, or histograms without samples.
    pub skipped: usize,
}

impl WriteSummary {
    /// Total number of metrics written.
    pub const fn written(&self) -> usize {
        self.counters + self.gauges + self.histograms
    }
}

/// Walks a [`Snapshot`] and drives a [`SnapshotWriter`] over it.
///
/// Counters are written first, then gauges, then histograms. Within a kind, metrics are written in snapshot order.
/// Writing stops at the first error.
#[derive(Clone, Default)]
pub struct SnapshotSerializer {
    filter: Option<Arc<dyn MetricFilter>>,
}

impl SnapshotSerializer {
    /// Creates a serializer that writes every metric.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a serializer that only writes the metrics accepted by `filter`.
    pub fn with_filter(filter: Option<Arc<dyn MetricFilter>>) -> Self {
        SnapshotSerializer { filter }
    }

    fn is_reported(&self, key: &Key, kind: MetricKind) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter.matches(key, kind))
    }

    /// Writes `snapshot` to `writer`.
    ///
    /// # Errors
    ///
    /// If the writer fails to write a metric, the error is returned and the remaining metrics are not written.
    pub fn serialize<W>(&self, writer: &mut W, snapshot: &Snapshot) -> Result<WriteSummary, SendError>
    where
        W: SnapshotWriter + ?Sized,
    {
        let mut summary = WriteSummary::default();

        for kind in [MetricKind::Counter, MetricKind::Gauge, MetricKind::Histogram] {
            for (key, value) in snapshot.iter_kind(kind) {
                if !self.is_reported(key, kind) {
                    summary.skipped += 1;
                    continue;
                }

                match value {
                    SnapshotValue::Counter(value) => {
                        writer.write_counter(key, *value)?;
                        summary.counters += 1;
                    }
                    SnapshotValue::Gauge(value) => {
                        writer.write_gauge(key, *value)?;
                        summary.gauges += 1;
                    }
                    SnapshotValue::Histogram(values) if values.is_empty() => summary.skipped += 1,
                    SnapshotValue::Histogram(values) => {
                        writer.write_histogram(key, values)?;
                        summary.histograms += 1;
                    }
                }
            }
        }

        Ok(summary)
    }
}
