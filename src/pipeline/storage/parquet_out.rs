use arrow::array::{ArrayRef, BooleanArray, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use super::{output_columns, passthrough_columns, DatasetShape, VersionedSink};
use crate::constants::{
    CLUSTER_KEY, COMPANY_NAME, IS_CURRENT, REGISTRATION_NUMBER, RETRIEVED_AT, VALID_FROM, VALID_TO,
};
use crate::error::{PipelineError, Result};
use crate::types::VersionedRecord;

/// Writes the versioned dataset as a single Parquet file.
///
/// The file is staged next to its destination and renamed into place only
/// after the Parquet footer has been written and synced.
pub struct ParquetSink {
    path: PathBuf,
}

impl ParquetSink {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VersionedSink for ParquetSink {
    fn write(&mut self, records: &[VersionedRecord]) -> Result<DatasetShape> {
        let passthrough = passthrough_columns(records);
        let batch = build_record_batch(records, &passthrough)
            .map_err(|e| PipelineError::output(&self.path, e))?;
        write_atomically(&self.path, &batch)?;

        match sha256_file(&self.path) {
            Ok(digest) => info!(path = %self.path.display(), rows = records.len(), sha256 = %digest, "Parquet written"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Parquet written but digest failed"),
        }

        Ok(DatasetShape {
            rows: batch.num_rows(),
            columns: output_columns(&passthrough),
        })
    }
}

fn timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into()))
}

fn build_schema(passthrough: &[String]) -> SchemaRef {
    let mut fields = vec![
        Field::new(COMPANY_NAME, DataType::Utf8, false),
        Field::new(REGISTRATION_NUMBER, DataType::Utf8, false),
        Field::new(RETRIEVED_AT, DataType::Utf8, false),
    ];
    fields.extend(passthrough.iter().map(|name| Field::new(name.as_str(), DataType::Utf8, true)));
    fields.push(Field::new(CLUSTER_KEY, DataType::Utf8, false));
    fields.push(Field::new(VALID_FROM, timestamp_type(), false));
    fields.push(Field::new(VALID_TO, timestamp_type(), true));
    fields.push(Field::new(IS_CURRENT, DataType::Boolean, false));
    Arc::new(Schema::new(fields))
}

/// Strings pass through verbatim; other JSON values keep their compact JSON text
fn passthrough_text(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

fn build_record_batch(
    records: &[VersionedRecord],
    passthrough: &[String],
) -> std::result::Result<RecordBatch, arrow::error::ArrowError> {
    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.record.company_name.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.record.registration_number.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.record.retrieved_at.as_str()),
        )),
    ];

    for name in passthrough {
        let values: StringArray = records
            .iter()
            .map(|r| passthrough_text(r.record.extra.get(name)))
            .collect();
        columns.push(Arc::new(values));
    }

    columns.push(Arc::new(StringArray::from_iter_values(
        records.iter().map(|r| r.cluster_key.as_str()),
    )));
    columns.push(Arc::new(
        TimestampMillisecondArray::from(
            records.iter().map(|r| r.valid_from.timestamp_millis()).collect::<Vec<_>>(),
        )
        .with_timezone("UTC"),
    ));
    columns.push(Arc::new(
        TimestampMillisecondArray::from(
            records
                .iter()
                .map(|r| r.valid_to.map(|t| t.timestamp_millis()))
                .collect::<Vec<_>>(),
        )
        .with_timezone("UTC"),
    ));
    columns.push(Arc::new(BooleanArray::from(
        records.iter().map(|r| r.is_current).collect::<Vec<_>>(),
    )));

    RecordBatch::try_new(build_schema(passthrough), columns)
}

fn write_atomically(path: &Path, batch: &RecordBatch) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| PipelineError::output(path, e))?;

    // Dropping the temp file on any early return removes it
    let mut staged = NamedTempFile::new_in(&dir).map_err(|e| PipelineError::output(path, e))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(staged.as_file_mut(), batch.schema(), Some(props))
        .map_err(|e| PipelineError::output(path, e))?;
    if batch.num_rows() > 0 {
        writer.write(batch).map_err(|e| PipelineError::output(path, e))?;
    }
    writer.close().map_err(|e| PipelineError::output(path, e))?;

    staged
        .as_file()
        .sync_all()
        .map_err(|e| PipelineError::output(path, e))?;
    staged
        .persist(path)
        .map_err(|e| PipelineError::output(path, e.error))?;
    Ok(())
}

fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Read a written artifact back and report its shape
pub fn read_back<P: AsRef<Path>>(path: P) -> Result<DatasetShape> {
    let file = File::open(path.as_ref())?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(io::Error::other)?;
    let columns = builder
        .schema()
        .fields()
        .iter()
        .map(|field| field.name().clone())
        .collect();

    let mut rows = 0;
    for batch in builder.build().map_err(io::Error::other)? {
        rows += batch.map_err(io::Error::other)?.num_rows();
    }
    Ok(DatasetShape { rows, columns })
}
