use std::{sync::Arc, thread::sleep, time::Duration};

use metrics::{counter, gauge, histogram, Label};
use metrics_exporter_wavefront::{
    ApplicationTags, CancellationToken, Centroid, HistogramGranularities, ReportingOptions, SendError,
    WavefrontRecorder, WavefrontSender,
};
use tracing::info;

/// Stands in for a real Wavefront sender by logging every point.
struct TracingSender;

impl WavefrontSender for TracingSender {
    fn send_metric(
        &self,
        name: &str,
        value: f64,
        timestamp: Option<u64>,
        source: &str,
        tags: &[Label],
    ) -> Result<(), SendError> {
        info!(name, value, ?timestamp, source, ?tags, "point");
        Ok(())
    }

    fn send_distribution(
        &self,
        name: &str,
        centroids: &[Centroid],
        granularities: HistogramGranularities,
        timestamp: Option<u64>,
        source: &str,
        tags: &[Label],
    ) -> Result<(), SendError> {
        info!(name, ?centroids, ?granularities, ?timestamp, source, ?tags, "distribution");
        Ok(())
    }

    fn flush(&self) -> Result<(), SendError> {
        info!("flush");
        Ok(())
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let recorder = WavefrontRecorder::new();
    metrics::set_global_recorder(recorder.clone()).expect("failed to install recorder");

    let reporter = ReportingOptions::default()
        .with_sender(Arc::new(TracingSender))
        .with_source("example-host")
        .with_application_tags(ApplicationTags::new("example", "worker").with_shard("0"))
        .report_minute_distribution(true)
        .with_flush_interval(Duration::from_secs(2))
        .build()
        .expect("failed to build reporter");

    let loops = counter!("worker_loops", "system" => "foo");
    let loop_delta_secs = histogram!("worker_loop_delta_secs", "system" => "foo");
    let cancel = CancellationToken::new();

    // Loop over and over, pretending to do some work, and flush at the reporter's interval.
    loop {
        for _ in 0..100 {
            loops.increment(1);
            loop_delta_secs.record(rand::random_range(0.0..1.0));
        }
        gauge!("lucky_iterations").set(rand::random_range(0.0..10.0));

        if !reporter.flush(&recorder.snapshot(), &cancel) {
            info!("flush failed, retrying next interval");
        }
        sleep(reporter.flush_interval());
    }
}
