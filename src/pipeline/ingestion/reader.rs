use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

use crate::constants::{COMPANY_NAME, REGISTRATION_NUMBER, RETRIEVED_AT};
use crate::error::{PipelineError, Result};
use crate::types::RawRecord;

/// Streams a line-delimited JSON feed as batches of at most `batch_size` records.
///
/// The reader is lazy and single-pass: once it has reported end of input or an
/// error it yields `None` forever.
pub struct BatchReader<R> {
    reader: R,
    batch_size: usize,
    line_no: usize,
    finished: bool,
}

impl BatchReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P, batch_size: usize) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PipelineError::InputNotFound {
                path: path.to_path_buf(),
            });
        }
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), batch_size)
    }
}

impl<R: BufRead> BatchReader<R> {
    pub fn from_reader(reader: R, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(PipelineError::Config("batch size must be at least 1".to_string()));
        }
        Ok(Self {
            reader,
            batch_size,
            line_no: 0,
            finished: false,
        })
    }

    /// Number of physical lines consumed so far, blank lines included
    pub fn lines_read(&self) -> usize {
        self.line_no
    }

    fn read_batch(&mut self) -> Result<Vec<RawRecord>> {
        let mut batch = Vec::with_capacity(self.batch_size.min(4096));
        let mut buf = Vec::new();
        while batch.len() < self.batch_size {
            buf.clear();
            let bytes = self.reader.read_until(b'\n', &mut buf)?;
            if bytes == 0 {
                self.finished = true;
                break;
            }
            self.line_no += 1;
            let line = std::str::from_utf8(&buf)
                .map_err(|e| PipelineError::MalformedRecord {
                    line: self.line_no,
                    reason: format!("invalid UTF-8: {e}"),
                })?
                .trim();
            if line.is_empty() {
                continue;
            }
            batch.push(parse_line(line, self.line_no)?);
        }
        Ok(batch)
    }
}

impl<R: BufRead> Iterator for BatchReader<R> {
    type Item = Result<Vec<RawRecord>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_batch() {
            Ok(batch) if batch.is_empty() => None,
            Ok(batch) => {
                debug!(records = batch.len(), through_line = self.line_no, "Read batch");
                Some(Ok(batch))
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Parse one non-blank line of the feed into a RawRecord
pub fn parse_line(line: &str, line_no: usize) -> Result<RawRecord> {
    let value: Value = serde_json::from_str(line).map_err(|e| PipelineError::MalformedRecord {
        line: line_no,
        reason: e.to_string(),
    })?;
    let Value::Object(mut fields) = value else {
        return Err(PipelineError::MalformedRecord {
            line: line_no,
            reason: "expected a JSON object".to_string(),
        });
    };

    let company_name = take_required(&mut fields, COMPANY_NAME, line_no)?;
    let registration_number = take_required(&mut fields, REGISTRATION_NUMBER, line_no)?;
    let retrieved_at = take_required(&mut fields, RETRIEVED_AT, line_no)?;

    Ok(RawRecord {
        company_name,
        registration_number,
        retrieved_at,
        extra: fields,
    })
}

fn take_required(fields: &mut Map<String, Value>, column: &str, line_no: usize) -> Result<String> {
    match fields.shift_remove(column) {
        None | Some(Value::Null) => Err(PipelineError::missing_column(column)),
        Some(Value::String(s)) => Ok(s),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(Value::Array(_)) | Some(Value::Object(_)) => Err(PipelineError::MalformedRecord {
            line: line_no,
            reason: format!("column {column} must be a scalar"),
        }),
    }
}
