//! Phase metrics for the registry pipeline
//!
//! Each pipeline phase records through its own helper struct so metric names
//! stay in one place. The `metrics` facade is a no-op until a recorder is
//! installed, so recording is always safe.

use std::time::Duration;

use crate::pipeline::processing::{DedupStats, VersionStats};

/// Build a metric name in the `registry_scd2_<phase>_<name>` namespace
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("registry_scd2_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("registry_scd2_", $phase, "_", $name)
    };
    (gauge, $phase:literal, $name:literal) => {
        concat!("registry_scd2_", $phase, "_", $name)
    };
}

/// Metrics for batched reading of the input feed
pub struct IngestMetrics;

impl IngestMetrics {
    pub fn record_batch(records: usize) {
        ::metrics::counter!(phase_metric!(counter, "ingest", "batches")).increment(1);
        ::metrics::counter!(phase_metric!(counter, "ingest", "records")).increment(records as u64);
        ::metrics::histogram!(phase_metric!(histogram, "ingest", "batch_size")).record(records as f64);
    }

    pub fn record_error(kind: &'static str) {
        ::metrics::counter!(phase_metric!(counter, "ingest", "errors"), "kind" => kind).increment(1);
    }
}

/// Metrics for exact and fuzzy duplicate removal
pub struct DedupMetrics;

impl DedupMetrics {
    pub fn record(stats: &DedupStats, duration: Duration) {
        ::metrics::counter!(phase_metric!(counter, "dedup", "exact_removed"))
            .increment(stats.exact_removed as u64);
        ::metrics::counter!(phase_metric!(counter, "dedup", "fuzzy_removed"))
            .increment(stats.fuzzy_removed as u64);
        ::metrics::gauge!(phase_metric!(gauge, "dedup", "survivors")).set(stats.survivors() as f64);
        ::metrics::histogram!(phase_metric!(histogram, "dedup", "duration_seconds"))
            .record(duration.as_secs_f64());
    }
}

/// Metrics for validity interval construction
pub struct VersionMetrics;

impl VersionMetrics {
    pub fn record(stats: &VersionStats) {
        ::metrics::gauge!(phase_metric!(gauge, "scd2", "clusters")).set(stats.clusters as f64);
        ::metrics::gauge!(phase_metric!(gauge, "scd2", "versions")).set(stats.versions as f64);
        ::metrics::counter!(phase_metric!(counter, "scd2", "historical_versions"))
            .increment(stats.historical as u64);
    }
}

/// Metrics for publishing the output artifact
pub struct WriterMetrics;

impl WriterMetrics {
    pub fn record_success(rows: usize, duration: Duration) {
        ::metrics::counter!(phase_metric!(counter, "writer", "rows")).increment(rows as u64);
        ::metrics::histogram!(phase_metric!(histogram, "writer", "duration_seconds"))
            .record(duration.as_secs_f64());
    }

    pub fn record_failure() {
        ::metrics::counter!(phase_metric!(counter, "writer", "failures")).increment(1);
    }
}
