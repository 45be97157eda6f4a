// Data processing pipeline: ingestion, processing, and storage

pub mod ingestion;
pub mod processing;
pub mod progress;
pub mod storage;

use std::io::BufRead;
use std::path::Path;
use std::time::Instant;
use tracing::{error, info, info_span};

use crate::config::Settings;
use crate::error::Result;
use crate::types::{Observation, RawRecord};
use ingestion::BatchReader;
use processing::{
    build_versions, cluster_key, parse_retrieved_at, DedupStats, Deduplicator, NameScorer,
    TokenSortScorer, VersionStats,
};
use progress::ProgressReporter;
use storage::{DatasetShape, ParquetSink, VersionedSink};

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: uuid::Uuid,
    pub raw_rows: usize,
    pub dedup: DedupStats,
    pub versions: VersionStats,
    pub output: DatasetShape,
}

/// Read, deduplicate, version and publish in one strictly forward pass
pub struct Pipeline<S = TokenSortScorer> {
    batch_size: usize,
    deduplicator: Deduplicator<S>,
}

impl Pipeline<TokenSortScorer> {
    pub fn new(batch_size: usize, threshold: u8) -> Result<Self> {
        Ok(Self {
            batch_size,
            deduplicator: Deduplicator::new(threshold)?,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        Self::new(settings.batch_size, settings.threshold)
    }
}

impl<S: NameScorer> Pipeline<S> {
    pub fn with_deduplicator(batch_size: usize, deduplicator: Deduplicator<S>) -> Self {
        Self {
            batch_size,
            deduplicator,
        }
    }

    /// Run against a file on disk
    pub fn run<K: VersionedSink>(
        &self,
        input: &Path,
        sink: &mut K,
        progress: &mut ProgressReporter,
    ) -> Result<RunSummary> {
        info!(input = %input.display(), batch_size = self.batch_size, "Reading input");
        let reader = BatchReader::open(input, self.batch_size).map_err(|e| {
            progress.ingest_failed(e.kind());
            e
        })?;
        self.run_reader(reader, sink, progress)
    }

    /// Run against any batched record source
    pub fn run_reader<R: BufRead, K: VersionedSink>(
        &self,
        reader: BatchReader<R>,
        sink: &mut K,
        progress: &mut ProgressReporter,
    ) -> Result<RunSummary> {
        let observations = collect_observations(reader, progress)?;
        let raw_rows = observations.len();

        let dedup_started = Instant::now();
        let (survivors, dedup) = self.deduplicator.dedupe(observations);
        progress.dedup_finished(&dedup, dedup_started.elapsed());

        let (versions, version_stats) = build_versions(survivors);
        progress.versions_built(&version_stats);

        let write_started = Instant::now();
        let output = sink.write(&versions).map_err(|e| {
            progress.write_failed();
            e
        })?;
        progress.write_finished(&output, write_started.elapsed());

        Ok(RunSummary {
            run_id: progress.run_id(),
            raw_rows,
            dedup,
            versions: version_stats,
            output,
        })
    }
}

/// Concatenate every batch into keyed, timed observations.
///
/// All batches are materialized before deduplication because one entity's
/// observations may be spread across batches.
pub fn collect_observations<I>(batches: I, progress: &mut ProgressReporter) -> Result<Vec<Observation>>
where
    I: IntoIterator<Item = Result<Vec<RawRecord>>>,
{
    let mut observations = Vec::new();
    for batch in batches {
        let batch = batch.map_err(|e| {
            progress.ingest_failed(e.kind());
            e
        })?;
        progress.batch_read(batch.len());
        observations.reserve(batch.len());
        for record in batch {
            let retrieved_at = parse_retrieved_at(&record.retrieved_at).map_err(|e| {
                progress.ingest_failed(e.kind());
                e
            })?;
            let position = observations.len();
            observations.push(Observation {
                cluster_key: cluster_key(&record),
                retrieved_at,
                record,
                position,
            });
        }
    }
    progress.ingest_finished();
    Ok(observations)
}

/// Run the whole pipeline with the Parquet sink described by `settings`
pub fn run_pipeline(settings: &Settings) -> Result<RunSummary> {
    let mut progress = ProgressReporter::new();
    let span = info_span!("run", run_id = %progress.run_id());
    let _enter = span.enter();

    info!(
        input = %settings.input.display(),
        output = %settings.output.display(),
        batch_size = settings.batch_size,
        threshold = settings.threshold,
        "Starting run"
    );

    let pipeline = Pipeline::from_settings(settings)?;
    let mut sink = ParquetSink::new(&settings.output);
    let result = pipeline.run(&settings.input, &mut sink, &mut progress);
    if let Err(e) = &result {
        error!(kind = e.kind(), "Pipeline failed: {}", e);
    }
    result
}
