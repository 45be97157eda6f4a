use std::time::{Duration, Instant};
use tracing::info;
use uuid::Uuid;

use crate::metrics::{DedupMetrics, IngestMetrics, VersionMetrics, WriterMetrics};
use crate::pipeline::processing::{DedupStats, VersionStats};
use crate::pipeline::storage::DatasetShape;

/// Per-run progress reporter, created once and handed to each stage
#[derive(Debug)]
pub struct ProgressReporter {
    run_id: Uuid,
    started: Instant,
    batches: usize,
    records: usize,
    last_failure: Option<&'static str>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started: Instant::now(),
            batches: 0,
            records: 0,
            last_failure: None,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn records_read(&self) -> usize {
        self.records
    }

    /// Kind of the error that stopped ingestion, if any
    pub fn ingest_failure(&self) -> Option<&'static str> {
        self.last_failure
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn batch_read(&mut self, records: usize) {
        self.batches += 1;
        self.records += records;
        IngestMetrics::record_batch(records);
        info!(
            batch = self.batches,
            records,
            total = self.records,
            "Read batch"
        );
    }

    pub fn ingest_failed(&mut self, kind: &'static str) {
        self.last_failure = Some(kind);
        IngestMetrics::record_error(kind);
    }

    pub fn ingest_finished(&self) {
        info!(batches = self.batches, rows = self.records, "Raw rows: {}", self.records);
    }

    pub fn dedup_finished(&self, stats: &DedupStats, duration: Duration) {
        DedupMetrics::record(stats, duration);
        info!(
            exact_removed = stats.exact_removed,
            fuzzy_removed = stats.fuzzy_removed,
            "After fuzzy deduplication: {}",
            stats.survivors()
        );
    }

    pub fn versions_built(&self, stats: &VersionStats) {
        VersionMetrics::record(stats);
        info!(
            clusters = stats.clusters,
            versions = stats.versions,
            historical = stats.historical,
            "Validity intervals assigned"
        );
    }

    pub fn write_finished(&self, shape: &DatasetShape, duration: Duration) {
        WriterMetrics::record_success(shape.rows, duration);
        info!(
            rows = shape.rows,
            columns = shape.columns.len(),
            elapsed_ms = self.elapsed().as_millis() as u64,
            "Output published"
        );
    }

    pub fn write_failed(&self) {
        WriterMetrics::record_failure();
    }
}
