//! A [`metrics`]-compatible reporter for sending metrics to [Wavefront][wavefront] through a sender SDK.
//!
//! [wavefront]: https://docs.wavefront.com/
//!
//! # Usage
//!
//! The reporter does not talk to Wavefront itself: it walks a snapshot of metrics and hands each one to a
//! [`WavefrontSender`], which owns encoding, batching, and delivery. The host application supplies the sender, takes
//! snapshots, and decides when to flush:
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use metrics_exporter_wavefront::{
//! #     ApplicationTags, CancellationToken, ReportingOptions, WavefrontRecorder, WavefrontSender,
//! # };
//! # fn sender() -> Arc<dyn WavefrontSender> { unimplemented!() }
//! // First, create the recorder that collects metrics, and install it as the global recorder.
//! let recorder = WavefrontRecorder::new();
//! metrics::set_global_recorder(recorder.clone()).expect("failed to install recorder");
//!
//! // Then, configure the reporter. Only the sender is required.
//! let reporter = ReportingOptions::default()
//!     .with_sender(sender())
//!     .with_source("web-01")
//!     .with_application_tags(ApplicationTags::new("shop", "checkout").with_cluster("us-west"))
//!     .report_minute_distribution(true)
//!     .build()
//!     .expect("failed to build reporter");
//!
//! // Every `reporter.flush_interval()`, hand the reporter a fresh snapshot.
//! let flushed = reporter.flush(&recorder.snapshot(), &CancellationToken::new());
//! ```
//!
//! # Behavior
//!
//! ## Point tags
//!
//! Every point carries the metric's own labels plus the tags derived from [`ApplicationTags`]: `application`,
//! `service`, `cluster`, and `shard` (each `null` when unset), followed by any custom tags. A metric label with the
//! same key as an application tag takes precedence for that metric.
//!
//! ## Histograms
//!
//! When at least one [`HistogramGranularity`] is enabled, histograms are sent as Wavefront distributions and
//! aggregated by Wavefront at each enabled granularity. Otherwise, they are summarised locally into `count`, `sum`,
//! `min`, `max`, `mean`, and percentile points.
//!
//! ## Failures
//!
//! [`WavefrontReporter::flush`] never fails loudly: errors from the sender, and panics inside it, are logged via
//! [`tracing`] and reported as `false`, so a broken connection to Wavefront cannot take down the host's reporting
//! loop. Retrying is left to the sender and to whoever calls `flush` again.
//!
//! # Missing
//!
//! ## Scheduling
//!
//! The reporter does not flush on its own; the host is expected to call [`WavefrontReporter::flush`] every
//! [`WavefrontReporter::flush_interval`].

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

mod builder;
pub use self::builder::{BuildError, ReportingOptions, DEFAULT_FLUSH_INTERVAL};

mod filter;
pub use self::filter::{MetricFilter, PatternFilter, PatternFilterBuilder};

mod granularity;
pub use self::granularity::{HistogramGranularities, HistogramGranularity};

mod recorder;
pub use self::recorder::WavefrontRecorder;

mod reporter;
pub use self::reporter::{Reporter, SnapshotFormatter, WavefrontReporter};

mod sender;
pub use self::sender::{Centroid, SendError, WavefrontSender};

mod serializer;
pub use self::serializer::{SnapshotSerializer, SnapshotWriter, WriteSummary};

mod snapshot;
pub use self::snapshot::{Snapshot, SnapshotValue};

mod tags;
pub use self::tags::{
    ApplicationTags, GlobalTags, APPLICATION_TAG_KEY, CLUSTER_TAG_KEY, NULL_TAG_VALUE, SERVICE_TAG_KEY,
    SHARD_TAG_KEY,
};

mod writer;
pub use self::writer::WavefrontWriter;

pub use metrics_util::{MetricKind, MetricKindMask};
pub use tokio_util::sync::CancellationToken;

#[cfg(test)]
mod test_util;
