//! Prometheus Metrics Module
//!
//! # Metrics
//!
//! - **Batches**: created, completed, cancelled, currently open
//! - **Chunks**: accepted and rejected chunk counts, entries received
//! - **Store**: instruments tracked, entries published per batch
//!
//! Metrics are exposed at `/metrics` on the HTTP port. Recording before
//! `init_metrics` is called is a no-op.

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::application::services::Completion;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if another global recorder has already been installed.
#[allow(clippy::expect_used)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

fn register_metrics() {
    describe_counter!("pricing_batches_created_total", "Total batches opened");
    describe_counter!(
        "pricing_batches_completed_total",
        "Total batches completed, by outcome"
    );
    describe_counter!("pricing_batches_cancelled_total", "Total batches cancelled");
    describe_counter!("pricing_chunks_total", "Total chunks submitted, by outcome");
    describe_counter!(
        "pricing_entries_received_total",
        "Total price entries applied to open batches"
    );
    describe_gauge!("pricing_open_batches", "Number of batches currently open");
    describe_gauge!("pricing_instruments", "Number of instruments with a latest price");
    describe_histogram!(
        "pricing_batch_publish_entries",
        "Distinct instruments published per completed batch"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Outcome label for submitted chunks.
#[derive(Debug, Clone, Copy)]
pub enum ChunkOutcome {
    /// Applied to the batch.
    Accepted,
    /// Batch id was not live.
    NotFound,
    /// Chunk was empty or malformed.
    Rejected,
}

impl ChunkOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::NotFound => "not_found",
            Self::Rejected => "rejected",
        }
    }
}

/// Record a newly opened batch.
pub fn record_batch_created() {
    counter!("pricing_batches_created_total").increment(1);
}

/// Record a completed batch.
///
/// Only published batches feed the entries histogram; a discarded
/// completion counts under its outcome label and nothing else.
pub fn record_batch_completed(completion: Completion) {
    counter!("pricing_batches_completed_total", "outcome" => completion.as_str()).increment(1);
    if let Completion::Published { entries } = completion {
        histogram!("pricing_batch_publish_entries").record(entries as f64);
    }
}

/// Record a cancelled batch.
pub fn record_batch_cancelled() {
    counter!("pricing_batches_cancelled_total").increment(1);
}

/// Record a submitted chunk.
pub fn record_chunk(outcome: ChunkOutcome, entries: usize) {
    counter!("pricing_chunks_total", "outcome" => outcome.as_str()).increment(1);
    if matches!(outcome, ChunkOutcome::Accepted) {
        counter!("pricing_entries_received_total").increment(entries as u64);
    }
}

/// Update the open batch gauge.
pub fn set_open_batches(count: usize) {
    gauge!("pricing_open_batches").set(count as f64);
}

/// Update the tracked instrument gauge.
pub fn set_instruments(count: usize) {
    gauge!("pricing_instruments").set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_outcome_as_str() {
        assert_eq!(ChunkOutcome::Accepted.as_str(), "accepted");
        assert_eq!(ChunkOutcome::NotFound.as_str(), "not_found");
        assert_eq!(ChunkOutcome::Rejected.as_str(), "rejected");
    }

    #[test]
    fn recording_without_recorder_is_harmless() {
        record_batch_created();
        record_chunk(ChunkOutcome::Accepted, 3);
        record_batch_completed(Completion::Published { entries: 3 });
        set_open_batches(0);
    }

    fn render_with_local_recorder(record: impl FnOnce()) -> String {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, record);
        handle.render()
    }

    #[test]
    fn published_completion_records_entries() {
        let rendered = render_with_local_recorder(|| {
            record_batch_completed(Completion::Published { entries: 4 });
        });

        assert!(rendered.contains(r#"pricing_batches_completed_total{outcome="published"} 1"#));
        assert!(rendered.contains("pricing_batch_publish_entries_count 1"));
    }

    #[test]
    fn discarded_completion_skips_entries_histogram() {
        let rendered = render_with_local_recorder(|| {
            record_batch_completed(Completion::Discarded);
        });

        assert!(rendered.contains(r#"pricing_batches_completed_total{outcome="discarded"} 1"#));
        assert!(!rendered.contains("pricing_batch_publish_entries"));
    }
}
