//! Loading export files into records
//!
//! Two layouts are accepted:
//! - a JSON array of record objects (`[ {..}, {..} ]`)
//! - one JSON document per record (newline-delimited or concatenated)
//!
//! Loading is best-effort. A document that fails to decode, or decodes to
//! something other than an object, is reported as a [`Rejection`] and
//! skipped; the remaining records are kept. Decoding resumes at the next
//! line that opens a document. A malformed array rejects the whole file
//! since its elements cannot be recovered individually.

use crate::error::Result;
use crate::record::Record;
use serde_json::{Deserializer, Value};
use std::fmt;
use std::fs;
use std::path::Path;

/// A unit of input that could not be turned into a usable record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Where in the input, e.g. `line 4` or `element 2`
    pub location: String,
    pub reason: String,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.reason)
    }
}

/// Records decoded from one input plus everything skipped on the way
#[derive(Debug, Clone, Default)]
pub struct LoadedBatch {
    pub records: Vec<Record>,
    pub rejected: Vec<Rejection>,
}

impl LoadedBatch {
    fn push(&mut self, location: String, value: Value) {
        match Record::from_value(value) {
            Some(record) => self.records.push(record),
            None => self.rejected.push(Rejection {
                location,
                reason: "not a JSON object".to_string(),
            }),
        }
    }

    /// Drop records lacking any of `required`, reporting each one
    pub fn retain_complete(&mut self, required: &[&str]) {
        let mut kept = Vec::with_capacity(self.records.len());
        for (index, record) in std::mem::take(&mut self.records).into_iter().enumerate() {
            match record.missing_field(required) {
                Some(field) => self.rejected.push(Rejection {
                    location: format!("record {}", index),
                    reason: format!("missing required field '{}'", field),
                }),
                None => kept.push(record),
            }
        }
        self.records = kept;
    }
}

/// Decode the content of one export file
pub fn parse_records(content: &str) -> LoadedBatch {
    let mut batch = LoadedBatch::default();
    let trimmed = content.trim_start();

    if trimmed.is_empty() {
        return batch;
    }

    if trimmed.starts_with('[') {
        match serde_json::from_str::<Vec<Value>>(content) {
            Ok(values) => {
                for (index, value) in values.into_iter().enumerate() {
                    batch.push(format!("element {}", index), value);
                }
            }
            Err(e) => batch.rejected.push(Rejection {
                location: "document".to_string(),
                reason: e.to_string(),
            }),
        }
        return batch;
    }

    decode_stream(content, &mut batch);
    batch
}

/// Decode concatenated documents (pretty-printed or one per line)
///
/// Decoding stops at the first malformed document. That document is
/// rejected, located by the line it starts on, and decoding resumes at the
/// next line opening with `{`. Documents decoded before it are kept.
fn decode_stream(content: &str, batch: &mut LoadedBatch) {
    let mut start = 0;
    let mut index = 0;

    while start < content.len() {
        let mut stream = Deserializer::from_str(&content[start..]).into_iter::<Value>();

        let error = loop {
            match stream.next() {
                Some(Ok(value)) => {
                    batch.push(format!("document {}", index), value);
                    index += 1;
                }
                Some(Err(e)) => break e,
                None => return,
            }
        };

        // Offset is the end of the last good document; skip the whitespace
        // after it to find where the bad one starts.
        let failed = start + stream.byte_offset();
        let rest = &content[failed..];
        let bad_start = failed + (rest.len() - rest.trim_start().len());

        batch.rejected.push(Rejection {
            location: format!("line {}", line_number(content, bad_start)),
            reason: error.to_string(),
        });

        match content[bad_start..].find("\n{") {
            Some(next) => start = bad_start + next + 1,
            None => return,
        }
    }
}

/// 1-based line number of byte `offset`
fn line_number(content: &str, offset: usize) -> usize {
    content[..offset].matches('\n').count() + 1
}

/// Read and decode one export file
///
/// # Errors
/// Only I/O failures are errors; undecodable content is reported through
/// [`LoadedBatch::rejected`].
pub fn load_records<P: AsRef<Path>>(path: P) -> Result<LoadedBatch> {
    let content = fs::read_to_string(path.as_ref())?;
    let batch = parse_records(&content);
    tracing::debug!(
        "Loaded {} records ({} rejected) from {}",
        batch.records.len(),
        batch.rejected.len(),
        path.as_ref().display()
    );
    Ok(batch)
}
