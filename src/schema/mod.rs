// Column schema for a batch of export records
//
// The schema is computed once per batch and shared by every row. Column
// order: top-level scalar fields in first-seen order (each timestamp field
// followed by its derived ISO-8601 sibling), then the structured groups in
// declaration order, each group's columns in first-seen order.
//
// Invariant: a column, once added, is never removed or renamed, and header
// names are unique within a schema.

mod discover;

pub use discover::discover;

use std::collections::HashMap;

/// Where a column's cell value comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSource {
    /// Top-level scalar field; `iso_source` names the timestamp field to
    /// convert when the record has no direct value
    TopLevel {
        field: String,
        iso_source: Option<String>,
    },
    /// Tag of a keyed (list) group
    Keyed { group: String, tag: String },
    /// Sub-field of a fixed-structure group
    Fixed { group: String, field: String },
    /// Added after flattening (propagated attributes, session ids)
    Generated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Header name, unique within the schema
    pub name: String,
    pub source: ColumnSource,
}

/// Ordered, duplicate-free column list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
    index: HashMap<String, usize>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column and return its position.
    ///
    /// An existing column with the same header name is kept as-is and its
    /// position returned.
    pub fn push(&mut self, name: String, source: ColumnSource) -> usize {
        if let Some(&pos) = self.index.get(&name) {
            return pos;
        }

        let pos = self.columns.len();
        self.index.insert(name.clone(), pos);
        self.columns.push(Column { name, source });
        pos
    }

    /// Append a structured-group column, qualifying its header as
    /// `group.name` when the plain name is already taken
    pub fn push_grouped(&mut self, group: &str, name: &str, source: ColumnSource) -> usize {
        let mut header = name.to_string();
        let mut attempt = 1;
        while self.contains(&header) {
            header = if attempt == 1 {
                format!("{}.{}", group, name)
            } else {
                format!("{}.{}.{}", group, name, attempt)
            };
            attempt += 1;
        }
        self.push(header, source)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Header names in column order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests;
