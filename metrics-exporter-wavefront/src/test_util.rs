use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex, PoisonError,
};

use metrics::Label;

use crate::{
    granularity::HistogramGranularities,
    sender::{Centroid, SendError, WavefrontSender},
};

#[derive(Clone, Debug, PartialEq)]
pub enum SentItem {
    Metric {
        name: String,
        value: f64,
        timestamp: Option<u64>,
        source: String,
        tags: Vec<(String, String)>,
    },
    Distribution {
        name: String,
        centroids: Vec<Centroid>,
        granularities: HistogramGranularities,
        timestamp: Option<u64>,
        source: String,
        tags: Vec<(String, String)>,
    },
}

impl SentItem {
    pub fn name(&self) -> &str {
        match self {
            SentItem::Metric { name, .. } | SentItem::Distribution { name, .. } => name,
        }
    }

    pub fn tags(&self) -> &[(String, String)] {
        match self {
            SentItem::Metric { tags, .. } | SentItem::Distribution { tags, .. } => tags,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            SentItem::Metric { value, .. } => Some(*value),
            SentItem::Distribution { .. } => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Failure {
    Error,
    Panic,
    /// Panics while holding the sender's lock, so every later call that locks it panics too.
    Poison,
}

/// A sender that records everything handed to it, and can be told to fail after a number of sends.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<SentItem>>,
    flushes: AtomicUsize,
    fail_after: Option<(usize, Failure)>,
    fail_flush: bool,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_after(sends: usize, failure: Failure) -> Self {
        Self { fail_after: Some((sends, failure)), ..Self::default() }
    }

    pub fn failing_flush() -> Self {
        Self { fail_flush: true, ..Self::default() }
    }

    pub fn sent(&self) -> Vec<SentItem> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    fn record(&self, item: SentItem) -> Result<(), SendError> {
        let mut sent = self.sent.lock().unwrap();
        if let Some((limit, failure)) = self.fail_after {
            if sent.len() >= limit {
                match failure {
                    Failure::Error => {
                        return Err(SendError::Rejected { reason: "connection refused".to_string() })
                    }
                    Failure::Panic => {
                        drop(sent);
                        panic!("sender exploded")
                    }
                    Failure::Poison => panic!("sender exploded while holding its lock"),
                }
            }
        }
        sent.push(item);
        Ok(())
    }
}

fn owned_tags(tags: &[Label]) -> Vec<(String, String)> {
    tags.iter().map(|l| (l.key().to_string(), l.value().to_string())).collect()
}

impl WavefrontSender for RecordingSender {
    fn send_metric(
        &self,
        name: &str,
        value: f64,
        timestamp: Option<u64>,
        source: &str,
        tags: &[Label],
    ) -> Result<(), SendError> {
        self.record(SentItem::Metric {
            name: name.to_string(),
            value,
            timestamp,
            source: source.to_string(),
            tags: owned_tags(tags),
        })
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
        self.record(SentItem::Distribution {
            name: name.to_string(),
            centroids: centroids.to_vec(),
            granularities,
            timestamp,
            source: source.to_string(),
            tags: owned_tags(tags),
        })
    }

    fn flush(&self) -> Result<(), SendError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        drop(self.sent.lock().unwrap());
        if self.fail_flush {
            Err(SendError::Closed)
        } else {
            Ok(())
        }
    }
}
