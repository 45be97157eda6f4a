// Pipeline storage: persistence of the versioned dataset

pub mod in_memory;
pub mod parquet_out;

pub use in_memory::InMemorySink;
pub use parquet_out::{read_back, ParquetSink};

use std::collections::HashSet;
use tracing::warn;

use crate::constants::{
    CLUSTER_KEY, COMPANY_NAME, IS_CURRENT, REGISTRATION_NUMBER, RETRIEVED_AT, VALID_FROM, VALID_TO,
};
use crate::error::Result;
use crate::types::VersionedRecord;

/// Row count and column names of a written dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetShape {
    pub rows: usize,
    pub columns: Vec<String>,
}

/// Destination for the finished versioned dataset
pub trait VersionedSink {
    /// Persist every record; on error nothing is published
    fn write(&mut self, records: &[VersionedRecord]) -> Result<DatasetShape>;
}

/// Passthrough columns in first-seen order.
///
/// A passthrough field that collides with one of the appended columns is
/// dropped in favour of the computed value.
pub fn passthrough_columns(records: &[VersionedRecord]) -> Vec<String> {
    let appended = [CLUSTER_KEY, VALID_FROM, VALID_TO, IS_CURRENT];
    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    for record in records {
        for name in record.record.extra.keys() {
            if !seen.insert(name.as_str()) {
                continue;
            }
            if appended.contains(&name.as_str()) {
                warn!(column = %name, "Passthrough column shadowed by computed column");
                continue;
            }
            columns.push(name.clone());
        }
    }
    columns
}

/// Full output column list: input columns, then the computed history columns
pub fn output_columns(passthrough: &[String]) -> Vec<String> {
    let mut columns = vec![
        COMPANY_NAME.to_string(),
        REGISTRATION_NUMBER.to_string(),
        RETRIEVED_AT.to_string(),
    ];
    columns.extend(passthrough.iter().cloned());
    columns.extend([CLUSTER_KEY, VALID_FROM, VALID_TO, IS_CURRENT].map(String::from));
    columns
}
