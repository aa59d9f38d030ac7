use std::{
    any::Any,
    fmt, io,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
    time::Duration,
};

use metrics::Label;
use tokio_util::sync::CancellationToken;
use tracing::{error, trace};

use crate::{
    builder::{BuildError, ReportingOptions, DEFAULT_FLUSH_INTERVAL},
    filter::MetricFilter,
    granularity::HistogramGranularities,
    sender::{SendError, WavefrontSender},
    serializer::SnapshotSerializer,
    snapshot::Snapshot,
    tags::GlobalTags,
    writer::WavefrontWriter,
};

/// Renders a snapshot as text.
///
/// Reporters that produce their own output expose a formatter; reporters that hand metrics to an external sender do
/// not.
pub trait SnapshotFormatter: Send + Sync {
    /// Writes `snapshot` to `out`.
    ///
    /// # Errors
    ///
    /// If writing to `out` fails, an error is returned.
    fn format(&self, snapshot: &Snapshot, out: &mut dyn io::Write) -> io::Result<()>;
}

/// A destination that a host periodically flushes snapshots to.
pub trait Reporter: Send + Sync {
    /// Reports `snapshot`, returning `true` on success.
    ///
    /// Failures are never propagated: they are logged and reported as `false`.
    fn flush(&self, snapshot: &Snapshot, cancel: &CancellationToken) -> bool;

    /// Interval at which the host should call [`flush`][Reporter::flush].
    fn flush_interval(&self) -> Duration;

    /// Filter applied to every snapshot before it is reported.
    fn filter(&self) -> Option<&Arc<dyn MetricFilter>>;

    /// Formatter used to render snapshots, if the reporter renders them itself.
    fn formatter(&self) -> Option<&dyn SnapshotFormatter> {
        None
    }
}

/// Reports metric snapshots to Wavefront.
///
/// The global tags and histogram granularities are computed once, when the reporter is built, and shared read-only by
/// every flush. Flushes hold no other state, so they can run concurrently.
pub struct WavefrontReporter {
    sender: Arc<dyn WavefrontSender>,
    source: String,
    global_tags: GlobalTags,
    global_labels: Vec<Label>,
    granularities: HistogramGranularities,
    filter: Option<Arc<dyn MetricFilter>>,
    flush_interval: Duration,
}

impl WavefrontReporter {
    /// Creates a new `WavefrontReporter` from the given options.
    ///
    /// # Errors
    ///
    /// If no sender was configured, an error is returned.
    pub fn new(options: ReportingOptions) -> Result<Self, BuildError> {
        let sender = options.sender.clone().ok_or(BuildError::MissingSender)?;
        let granularities = options.histogram_granularities();
        let global_tags = options.application_tags.to_global_tags();
        let global_labels = global_tags.to_labels();

        Ok(WavefrontReporter {
            sender,
            source: options.source,
            global_tags,
            global_labels,
            granularities,
            filter: options.filter,
            flush_interval: interval_or_default(options.flush_interval),
        })
    }

    /// Returns the source attached to every point.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the tags attached to every point.
    pub fn global_tags(&self) -> &GlobalTags {
        &self.global_tags
    }

    /// Returns the granularities at which histograms are reported as distributions.
    pub fn granularities(&self) -> HistogramGranularities {
        self.granularities
    }

    /// Returns the interval at which the host should flush this reporter.
    pub fn flush_interval(&self) -> Duration {
        self.flush_interval
    }

    /// Sets the flush interval. A zero interval selects [`DEFAULT_FLUSH_INTERVAL`].
    pub fn set_flush_interval(&mut self, flush_interval: Duration) {
        self.flush_interval = interval_or_default(flush_interval);
    }

    /// Returns the metric filter, if any.
    pub fn filter(&self) -> Option<&Arc<dyn MetricFilter>> {
        self.filter.as_ref()
    }

    /// Sets the metric filter. `None` reports every metric.
    pub fn set_filter(&mut self, filter: Option<Arc<dyn MetricFilter>>) {
        self.filter = filter;
    }

    /// Always `None`: formatting is left to the sender.
    pub fn formatter(&self) -> Option<&dyn SnapshotFormatter> {
        None
    }

    /// Reports `snapshot` to Wavefront.
    ///
    /// Returns `true` if every metric was handed to the sender and the sender was flushed. Any error, or a panic from
    /// the sender, is logged and turns into `false`; nothing propagates to the caller. Writing stops at the first
    /// failure, though metrics written before it may already have been sent.
    ///
    /// Cancellation is advisory: the write path does not check `cancel`, leaving that to the sender.
    pub fn flush(&self, snapshot: &Snapshot, cancel: &CancellationToken) -> bool {
        trace!(metrics = snapshot.len(), cancelled = cancel.is_cancelled(), "Flushing metrics to Wavefront.");

        let serializer = SnapshotSerializer::with_filter(self.filter.clone());
        let mut writer =
            WavefrontWriter::new(self.sender.as_ref(), &self.source, &self.global_labels, self.granularities);

        // The writer must not be dropped while a panic unwinds through it: a sender that panics again on flush would
        // then abort the process.
        let written = isolate("write", || serializer.serialize(&mut writer, snapshot));
        let closed = isolate("release", || writer.close());

        match (written, closed) {
            (Some(summary), Some(())) => {
                trace!(
                    counters = summary.counters,
                    gauges = summary.gauges,
                    histograms = summary.histograms,
                    skipped = summary.skipped,
                    "Flushed metrics to Wavefront."
                );
                true
            }
            _ => false,
        }
    }
}

impl Reporter for WavefrontReporter {
    fn flush(&self, snapshot: &Snapshot, cancel: &CancellationToken) -> bool {
        WavefrontReporter::flush(self, snapshot, cancel)
    }

    fn flush_interval(&self) -> Duration {
        self.flush_interval
    }

    fn filter(&self) -> Option<&Arc<dyn MetricFilter>> {
        self.filter.as_ref()
    }
}

impl TryFrom<ReportingOptions> for WavefrontReporter {
    type Error = BuildError;

    fn try_from(options: ReportingOptions) -> Result<Self, Self::Error> {
        WavefrontReporter::new(options)
    }
}

impl TryFrom<Option<ReportingOptions>> for WavefrontReporter {
    type Error = BuildError;

    fn try_from(options: Option<ReportingOptions>) -> Result<Self, Self::Error> {
        options.ok_or(BuildError::MissingOptions).and_then(WavefrontReporter::new)
    }
}

impl fmt::Debug for WavefrontReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WavefrontReporter")
            .field("source", &self.source)
            .field("global_tags", &self.global_tags)
            .field("granularities", &self.granularities)
            .field("filter", &self.filter.as_ref().map(|_| "MetricFilter"))
            .field("flush_interval", &self.flush_interval)
            .finish_non_exhaustive()
    }
}

fn interval_or_default(interval: Duration) -> Duration {
    if interval.is_zero() {
        DEFAULT_FLUSH_INTERVAL
    } else {
        interval
    }
}

/// Runs one step of a flush, logging its error or panic instead of propagating it.
fn isolate<T, F>(step: &'static str, f: F) -> Option<T>
where
    F: FnOnce() -> Result<T, SendError>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            error!(error = %e, step, "Failed to flush metrics to Wavefront.");
            None
        }
        Err(payload) => {
            error!(error = panic_message(&*payload), step, "Sender panicked while flushing metrics to Wavefront.");
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
