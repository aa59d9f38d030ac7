use std::{fmt, sync::Arc, time::Duration};

use thiserror::Error;

use crate::{
    filter::MetricFilter, granularity::HistogramGranularities, reporter::WavefrontReporter,
    sender::WavefrontSender, tags::ApplicationTags,
};

/// Flush interval used when none, or a zero interval, is configured.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);

const DEFAULT_SOURCE: &str = "localhost";

/// Errors that could occur while building a Wavefront reporter.
#[derive(Debug, Error)]
pub enum BuildError {
    /// No reporting options were supplied.
    #[error("reporting options are required")]
    MissingOptions,

    /// The reporting options did not specify a sender.
    #[error("a Wavefront sender is required")]
    MissingSender,

    /// The flush interval was negative or not a finite number.
    #[error("flush interval must be zero or greater (got {seconds}s)")]
    NegativeFlushInterval {
        /// The rejected interval, in seconds.
        seconds: f64,
    },

    /// A metric filter could not be built.
    #[error("invalid metric filter: {reason}")]
    InvalidFilter {
        /// Details about the failure.
        reason: String,
    },
}

/// Options for reporting metrics to Wavefront.
///
/// Every option has a default except the sender, which must be supplied via [`with_sender`][Self::with_sender]
/// before the reporter can be built.
#[derive(Clone)]
pub struct ReportingOptions {
    pub(crate) sender: Option<Arc<dyn WavefrontSender>>,
    pub(crate) source: String,
    pub(crate) application_tags: ApplicationTags,
    pub(crate) histogram_minute: bool,
    pub(crate) histogram_hour: bool,
    pub(crate) histogram_day: bool,
    pub(crate) filter: Option<Arc<dyn MetricFilter>>,
    pub(crate) flush_interval: Duration,
}

impl ReportingOptions {
    /// Set the sender used to deliver points.
    ///
    /// The sender is shared, not owned: the same sender can be handed to several reporters.
    #[must_use]
    pub fn with_sender(mut self, sender: Arc<dyn WavefrontSender>) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Set the source attached to every point.
    ///
    /// Defaults to the `HOSTNAME` environment variable, or `localhost` if it is not set.
    #[must_use]
    pub fn with_source<S: Into<String>>(mut self, source: S) -> Self {
        self.source = source.into();
        self
    }

    /// Set the application tags attached to every point.
    ///
    /// Defaults to empty application tags, which report `null` for the application, service, cluster, and shard.
    #[must_use]
    pub fn with_application_tags(mut self, application_tags: ApplicationTags) -> Self {
        self.application_tags = application_tags;
        self
    }

    /// Sets whether or not histograms are aggregated per minute by Wavefront.
    ///
    /// When any histogram granularity is enabled, histograms are sent as Wavefront distributions. Otherwise, they are
    /// summarised locally and sent as plain points.
    ///
    /// Defaults to `false`.
    #[must_use]
    pub fn report_minute_distribution(mut self, enabled: bool) -> Self {
        self.histogram_minute = enabled;
        self
    }

    /// Sets whether or not histograms are aggregated per hour by Wavefront.
    ///
    /// Defaults to `false`.
    #[must_use]
    pub fn report_hour_distribution(mut self, enabled: bool) -> Self {
        self.histogram_hour = enabled;
        self
    }

    /// Sets whether or not histograms are aggregated per day by Wavefront.
    ///
    /// Defaults to `false`.
    #[must_use]
    pub fn report_day_distribution(mut self, enabled: bool) -> Self {
        self.histogram_day = enabled;
        self
    }

    /// Set the filter that decides which metrics are reported.
    ///
    /// Defaults to reporting every metric.
    #[must_use]
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: MetricFilter + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Set the interval at which the host is expected to flush the reporter.
    ///
    /// A zero interval selects [`DEFAULT_FLUSH_INTERVAL`].
    ///
    /// Defaults to 10 seconds.
    #[must_use]
    pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    /// Set the flush interval in (fractional) seconds, as it is typically read from configuration.
    ///
    /// # Errors
    ///
    /// If `seconds` is negative or not a finite number, an error is returned.
    pub fn with_flush_interval_secs(self, seconds: f64) -> Result<Self, BuildError> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(BuildError::NegativeFlushInterval { seconds });
        }
        Ok(self.with_flush_interval(Duration::from_secs_f64(seconds)))
    }

    /// Returns the configured histogram granularities.
    pub fn histogram_granularities(&self) -> HistogramGranularities {
        HistogramGranularities::from_flags(self.histogram_minute, self.histogram_hour, self.histogram_day)
    }

    /// Builds the reporter.
    ///
    /// # Errors
    ///
    /// If no sender was configured, an error is returned.
    pub fn build(self) -> Result<WavefrontReporter, BuildError> {
        WavefrontReporter::new(self)
    }
}

impl Default for ReportingOptions {
    fn default() -> Self {
        ReportingOptions {
            sender: None,
            source: std::env::var("HOSTNAME").unwrap_or_else(|_| DEFAULT_SOURCE.to_string()),
            application_tags: ApplicationTags::default(),
            histogram_minute: false,
            histogram_hour: false,
            histogram_day: false,
            filter: None,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }
}

impl fmt::Debug for ReportingOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportingOptions")
            .field("sender", &self.sender.as_ref().map(|_| "WavefrontSender"))
            .field("source", &self.source)
            .field("application_tags", &self.application_tags)
            .field("histogram_granularities", &self.histogram_granularities())
            .field("filter", &self.filter.as_ref().map(|_| "MetricFilter"))
            .field("flush_interval", &self.flush_interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{BuildError, ReportingOptions, DEFAULT_FLUSH_INTERVAL};
    use crate::granularity::{HistogramGranularities, HistogramGranularity};

    #[test]
    fn negative_interval_is_rejected() {
        for seconds in [-1.0, -0.001, f64::NAN, f64::INFINITY] {
            let result = ReportingOptions::default().with_flush_interval_secs(seconds);
            assert!(matches!(result, Err(BuildError::NegativeFlushInterval { .. })));
        }
    }

    #[test]
    fn non_negative_interval_is_accepted() {
        let options = ReportingOptions::default().with_flush_interval_secs(2.5).unwrap();
        assert_eq!(options.flush_interval, Duration::from_millis(2500));

        let options = ReportingOptions::default().with_flush_interval_secs(0.0).unwrap();
        assert_eq!(options.flush_interval, Duration::ZERO);
    }

    #[test]
    fn defaults() {
        let options = ReportingOptions::default();
        assert!(options.sender.is_none());
        assert!(options.filter.is_none());
        assert!(!options.source.is_empty());
        assert_eq!(options.flush_interval, DEFAULT_FLUSH_INTERVAL);
        assert!(options.histogram_granularities().is_empty());
    }

    #[test]
    fn granularity_flags() {
        let options = ReportingOptions::default().report_minute_distribution(true).report_day_distribution(true);
        let granularities = options.histogram_granularities();

        assert_eq!(granularities, HistogramGranularities::MINUTE | HistogramGranularities::DAY);
        assert!(!granularities.contains(HistogramGranularity::Hour));
    }

    #[test]
    fn missing_sender_fails_to_build() {
        let result = ReportingOptions::default().with_source("host1").build();
        assert!(matches!(result, Err(BuildError::MissingSender)));
    }
}
