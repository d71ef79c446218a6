//! Flat rows and the batch table
//!
//! Rows store one cell per schema column, positionally. Appending a column
//! widens every existing row with a blank cell, so all rows always share the
//! schema's exact column set.

use crate::schema::{ColumnSource, Schema};

/// One flattened record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatRow {
    cells: Vec<String>,
}

impl FlatRow {
    pub fn new(cells: Vec<String>) -> Self {
        Self { cells }
    }

    pub fn blank(width: usize) -> Self {
        Self {
            cells: vec![String::new(); width],
        }
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    /// Cell at `pos`; out-of-range positions read as blank
    pub fn cell(&self, pos: usize) -> &str {
        self.cells.get(pos).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, pos: usize, value: String) {
        if pos >= self.cells.len() {
            self.cells.resize(pos + 1, String::new());
        }
        self.cells[pos] = value;
    }

    fn widen(&mut self, width: usize) {
        if self.cells.len() < width {
            self.cells.resize(width, String::new());
        }
    }
}

/// Parse a microsecond timestamp cell
pub fn parse_timestamp(text: &str) -> Option<i64> {
    text.trim().parse::<i64>().ok()
}

/// Schema plus its rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    schema: Schema,
    rows: Vec<FlatRow>,
}

impl Table {
    /// Build a table; short rows are blank-filled to the schema width
    pub fn new(schema: Schema, mut rows: Vec<FlatRow>) -> Self {
        let width = schema.len();
        for row in &mut rows {
            row.widen(width);
        }
        Self { schema, rows }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[FlatRow] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [FlatRow] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of `name`, appending it as a generated column if missing
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(pos) = self.schema.position(name) {
            return pos;
        }

        let pos = self.schema.push(name.to_string(), ColumnSource::Generated);
        let width = self.schema.len();
        for row in &mut self.rows {
            row.widen(width);
        }
        tracing::debug!("Appended generated column '{}' at {}", name, pos);
        pos
    }

    /// Cell of `row` in column `name`
    pub fn get(&self, row: usize, name: &str) -> Option<&str> {
        let pos = self.schema.position(name)?;
        self.rows.get(row).map(|r| r.cell(pos))
    }

    /// Stable ascending sort on a microsecond timestamp column
    ///
    /// Rows whose timestamp is missing or unparseable keep their relative
    /// order and go after all timestamped rows. Returns how many such rows
    /// were found. A missing column leaves the table untouched.
    pub fn sort_by_timestamp(&mut self, field: &str) -> usize {
        let Some(pos) = self.schema.position(field) else {
            tracing::warn!("Timestamp column '{}' not in schema, rows left unsorted", field);
            return 0;
        };

        self.rows.sort_by_cached_key(|row| {
            let ts = parse_timestamp(row.cell(pos));
            (ts.is_none(), ts)
        });

        self.rows
            .iter()
            .filter(|row| parse_timestamp(row.cell(pos)).is_none())
            .count()
    }

    pub fn into_parts(self) -> (Schema, Vec<FlatRow>) {
        (self.schema, self.rows)
    }
}
