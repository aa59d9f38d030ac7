use std::{
    borrow::Cow,
    panic::{catch_unwind, AssertUnwindSafe},
    time::SystemTime,
};

use metrics::{Key, Label};
use metrics_util::storage::Summary;
use tracing::{debug, error};

use crate::{
    granularity::HistogramGranularities,
    sender::{Centroid, SendError, WavefrontSender},
    serializer::SnapshotWriter,
};

/// Quantiles reported for a histogram when no distribution granularity is enabled, with their name suffixes.
const SUMMARY_QUANTILES: [(f64, &str); 5] =
    [(0.5, "p50"), (0.75, "p75"), (0.95, "p95"), (0.99, "p99"), (0.999, "p999")];

/// Translates snapshot writes into calls on a [`WavefrontSender`].
///
/// A writer lives for a single flush. It is bound to the sender, the source, and the global tags of the reporter that
/// created it, and stamps every point with the time at which it was created.
///
/// The writer must be released once writing is done, which flushes the sender. [`close`][Self::close] releases it and
/// reports any error; a writer dropped without being closed (for example, while unwinding) releases itself and logs
/// the error instead. Either way, the sender is flushed exactly once per writer.
pub struct WavefrontWriter<'a> {
    sender: &'a dyn WavefrontSender,
    source: &'a str,
    global_labels: &'a [Label],
    granularities: HistogramGranularities,
    timestamp: Option<u64>,
    labels_buf: Vec<Label>,
    name_buf: String,
    released: bool,
}

impl<'a> WavefrontWriter<'a> {
    /// Creates a new `WavefrontWriter`.
    pub fn new(
        sender: &'a dyn WavefrontSender,
        source: &'a str,
        global_labels: &'a [Label],
        granularities: HistogramGranularities,
    ) -> Self {
        let timestamp =
            SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).ok().map(|d| d.as_millis() as u64);

        WavefrontWriter {
            sender,
            source,
            global_labels,
            granularities,
            timestamp,
            labels_buf: Vec::new(),
            name_buf: String::new(),
            released: false,
        }
    }

    /// Overrides the timestamp attached to every point.
    ///
    /// When `None`, the sender decides the timestamp of each point.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: Option<u64>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Releases the writer, flushing the sender.
    ///
    /// # Errors
    ///
    /// If the sender fails to flush, an error is returned.
    pub fn close(mut self) -> Result<(), SendError> {
        self.release()
    }

    fn release(&mut self) -> Result<(), SendError> {
        self.released = true;
        self.sender.flush()
    }

    /// Collects the labels for a point: the metric's own labels first, then every global tag the metric does not set.
    fn prepare_labels(&mut self, key: &Key) {
        self.labels_buf.clear();
        self.labels_buf.extend(key.labels().cloned());

        let own = self.labels_buf.len();
        for global in self.global_labels {
            if !self.labels_buf[..own].iter().any(|l| l.key() == global.key()) {
                self.labels_buf.push(global.clone());
            }
        }
    }

    fn send_point(&mut self, suffix: Option<&str>, key: &Key, value: f64) -> Result<(), SendError> {
        self.name_buf.clear();
        self.name_buf.push_str(key.name());
        if let Some(suffix) = suffix {
            self.name_buf.push('.');
            self.name_buf.push_str(suffix);
        }

        self.sender.send_metric(&self.name_buf, value, self.timestamp, self.source, &self.labels_buf)
    }

    fn write_distribution(&mut self, key: &Key, values: &[f64]) -> Result<(), SendError> {
        let centroids = centroids(values);
        self.sender.send_distribution(
            key.name(),
            &centroids,
            self.granularities,
            self.timestamp,
            self.source,
            &self.labels_buf,
        )
    }

    fn write_summary(&mut self, key: &Key, values: &[f64]) -> Result<(), SendError> {
        let mut summary = Summary::with_defaults();
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for value in values {
            summary.add(*value);
            sum += value;
            min = min.min(*value);
            max = max.max(*value);
        }

        let count = values.len() as f64;
        self.send_point(Some("count"), key, count)?;
        self.send_point(Some("sum"), key, sum)?;
        self.send_point(Some("min"), key, min)?;
        self.send_point(Some("max"), key, max)?;
        self.send_point(Some("mean"), key, sum / count)?;

        for (quantile, suffix) in SUMMARY_QUANTILES {
            if let Some(value) = summary.quantile(quantile) {
                self.send_point(Some(suffix), key, value)?;
            }
        }

        Ok(())
    }
}

impl SnapshotWriter for WavefrontWriter<'_> {
    fn write_counter(&mut self, key: &Key, value: u64) -> Result<(), SendError> {
        self.prepare_labels(key);
        self.send_point(None, key, value as f64)
    }

    fn write_gauge(&mut self, key: &Key, value: f64) -> Result<(), SendError> {
        self.prepare_labels(key);
        self.send_point(None, key, value)
    }

    fn write_histogram(&mut self, key: &Key, values: &[f64]) -> Result<(), SendError> {
        // NaN and infinite samples cannot be represented in a distribution or a summary, so they are dropped.
        let finite: Cow<'_, [f64]> = if values.iter().all(|v| v.is_finite()) {
            Cow::Borrowed(values)
        } else {
            let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
            debug!(
                histogram = key.name(),
                dropped = values.len() - finite.len(),
                "Dropping non-finite histogram samples."
            );
            Cow::Owned(finite)
        };
        if finite.is_empty() {
            return Ok(());
        }

        self.prepare_labels(key);
        if self.granularities.is_empty() {
            self.write_summary(key, &finite)
        } else {
            self.write_distribution(key, &finite)
        }
    }
}

impl Drop for WavefrontWriter<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        match catch_unwind(AssertUnwindSafe(|| self.release())) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Failed to release Wavefront writer."),
            Err(_) => error!("Sender panicked while releasing Wavefront writer."),
        }
    }
}

/// Groups samples into centroids of identical values, ordered by value.
fn centroids(values: &[f64]) -> Vec<Centroid> {
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);

    let mut centroids: Vec<Centroid> = Vec::new();
    for value in sorted {
        match centroids.last_mut() {
            Some(last) if last.value.total_cmp(&value).is_eq() => {
                last.count = last.count.saturating_add(1);
            }
            _ => centroids.push(Centroid { value, count: 1 }),
        }
    }
    centroids
}
