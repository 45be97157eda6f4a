use tracing::debug;

use super::{output_columns, passthrough_columns, DatasetShape, VersionedSink};
use crate::error::Result;
use crate::types::VersionedRecord;

/// In-memory sink for development/testing
#[derive(Debug, Default)]
pub struct InMemorySink {
    records: Vec<VersionedRecord>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[VersionedRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<VersionedRecord> {
        self.records
    }
}

impl VersionedSink for InMemorySink {
    fn write(&mut self, records: &[VersionedRecord]) -> Result<DatasetShape> {
        self.records = records.to_vec();
        let columns = output_columns(&passthrough_columns(records));
        debug!(rows = records.len(), columns = columns.len(), "Stored versioned records in memory");
        Ok(DatasetShape {
            rows: records.len(),
            columns,
        })
    }
}
