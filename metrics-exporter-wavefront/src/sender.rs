use std::io;

use metrics::Label;
use thiserror::Error;

use crate::granularity::HistogramGranularities;

/// Errors that could occur while handing points to a [`WavefrontSender`].
#[derive(Debug, Error)]
pub enum SendError {
    /// The sender failed to perform I/O against the proxy or the direct ingestion endpoint.
    #[error("failed to send to Wavefront: {0}")]
    Io(#[from] io::Error),

    /// The sender refused the point, typically because it failed validation.
    #[error("sender rejected point: {reason}")]
    Rejected {
        /// Details about why the point was rejected.
        reason: String,
    },

    /// The sender has already been closed and cannot accept more points.
    #[error("sender is closed")]
    Closed,
}

/// A single distribution bucket: a value and the number of times it was observed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Centroid {
    /// Observed value.
    pub value: f64,

    /// Number of observations of `value`.
    pub count: u32,
}

/// The Wavefront sender SDK.
///
/// Implementations own everything between a point and the ingestion service: encoding, batching, buffering, connection
/// management, and retries. A sender is shared between every flush of a reporter, and potentially between several
/// reporters, so it must be usable from multiple threads at once.
pub trait WavefrontSender: Send + Sync {
    /// Sends a single point.
    ///
    /// `timestamp` is in milliseconds since the Unix epoch. When `None`, the sender stamps the point itself.
    ///
    /// # Errors
    ///
    /// If the point could not be accepted, an error is returned.
    fn send_metric(
        &self,
        name: &str,
        value: f64,
        timestamp: Option<u64>,
        source: &str,
        tags: &[Label],
    ) -> Result<(), SendError>;

    /// Sends a distribution, to be aggregated by Wavefront at each of the given granularities.
    ///
    /// # Errors
    ///
    /// If the distribution could not be accepted, an error is returned.
    fn send_distribution(
        &self,
        name: &str,
        centroids: &[Centroid],
        granularities: HistogramGranularities,
        timestamp: Option<u64>,
        source: &str,
        tags: &[Label],
    ) -> Result<(), SendError>;

    /// Flushes anything the sender has buffered.
    ///
    /// # Errors
    ///
    /// If the buffered data could not be flushed, an error is returned.
    fn flush(&self) -> Result<(), SendError>;
}
