// Record flattening
//
// Converts one structured export record into one flat row for a discovered
// schema. Pure: the same record and schema always yield the same row, and
// no state is shared between records beyond the schema itself.
//
// Cell resolution per column source:
// - top-level: direct value, else (derived ISO columns only) the converted
//   source timestamp, else blank
// - keyed group: first non-null typed slot of the record's entry for the tag
// - fixed group: raw sub-field value; a missing sub-object blanks the group

mod iso8601;

pub use iso8601::micros_to_iso8601;

use crate::config::SchemaConfig;
use crate::record::{KeyedEntry, Record};
use crate::schema::{ColumnSource, Schema};
use crate::table::FlatRow;
use std::collections::HashMap;

/// Rows produced for a batch
#[derive(Debug, Clone, Default)]
pub struct FlattenOutput {
    pub rows: Vec<FlatRow>,
    /// Derived ISO cells left blank because their source did not parse
    pub invalid_timestamps: usize,
}

/// Flattens records against a fixed schema
#[derive(Debug, Clone, Copy)]
pub struct Flattener<'a> {
    schema: &'a Schema,
    config: &'a SchemaConfig,
}

impl<'a> Flattener<'a> {
    pub fn new(schema: &'a Schema, config: &'a SchemaConfig) -> Self {
        Self { schema, config }
    }

    /// Flatten one record into a row with exactly the schema's columns
    pub fn flatten(&self, record: &Record) -> FlatRow {
        let mut invalid = 0;
        self.fill(record, &mut invalid)
    }

    /// Flatten a batch, preserving input order
    pub fn flatten_all(&self, records: &[Record]) -> FlattenOutput {
        let mut invalid_timestamps = 0;
        let rows = records
            .iter()
            .map(|record| self.fill(record, &mut invalid_timestamps))
            .collect();

        FlattenOutput {
            rows,
            invalid_timestamps,
        }
    }

    fn fill(&self, record: &Record, invalid_timestamps: &mut usize) -> FlatRow {
        let mut keyed: HashMap<&str, HashMap<&str, KeyedEntry<'_>>> = HashMap::new();

        let cells = self
            .schema
            .columns()
            .iter()
            .map(|column| match &column.source {
                ColumnSource::TopLevel { field, iso_source } => {
                    self.top_level(record, field, iso_source.as_deref(), invalid_timestamps)
                }
                ColumnSource::Keyed { group, tag } => keyed
                    .entry(group.as_str())
                    .or_insert_with(|| keyed_lookup(record, group))
                    .get(tag.as_str())
                    .and_then(KeyedEntry::resolve)
                    .unwrap_or_default(),
                ColumnSource::Fixed { group, field } => record
                    .fixed_object(group)
                    .and_then(|object| object.get(field))
                    .map(crate::record::render_scalar)
                    .unwrap_or_default(),
                ColumnSource::Generated => String::new(),
            })
            .collect();

        FlatRow::new(cells)
    }

    fn top_level(
        &self,
        record: &Record,
        field: &str,
        iso_source: Option<&str>,
        invalid_timestamps: &mut usize,
    ) -> String {
        if let Some(value) = record.scalar(field) {
            return value;
        }

        let Some(source) = iso_source else {
            return String::new();
        };

        match record.scalar(source) {
            Some(ts) if !ts.is_empty() => match micros_to_iso8601(&ts, self.config) {
                Ok(iso) => iso,
                Err(e) => {
                    tracing::warn!("Leaving '{}' blank: {}", field, e);
                    *invalid_timestamps += 1;
                    String::new()
                }
            },
            _ => String::new(),
        }
    }
}

/// Tag → entry for one keyed group of a record; a repeated tag keeps its
/// last entry
fn keyed_lookup<'r>(record: &'r Record, group: &str) -> HashMap<&'r str, KeyedEntry<'r>> {
    record
        .keyed_entries(group)
        .map(|entry| (entry.key, entry))
        .collect()
}
