//! CSV output for flattened tables
//!
//! One header line of column names, then one line per row. Fields are quoted
//! only when needed (comma, quote, line break), quotes are doubled and lines
//! end in CRLF, matching the spreadsheet dialect.

use crate::error::Result;
use crate::table::Table;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// CSV output formatter
#[derive(Debug, Clone, Copy)]
pub struct CsvOutput {
    include_header: bool,
    crlf: bool,
}

impl CsvOutput {
    /// Create a new CSV output formatter
    pub fn new(include_header: bool, crlf: bool) -> Self {
        Self {
            include_header,
            crlf,
        }
    }

    fn builder(&self) -> csv::WriterBuilder {
        let mut builder = csv::WriterBuilder::new();
        builder.quote_style(csv::QuoteStyle::Necessary);
        if self.crlf {
            builder.terminator(csv::Terminator::CRLF);
        }
        builder
    }

    /// Serialize `table` into `writer`
    pub fn write<W: Write>(&self, table: &Table, writer: W) -> Result<()> {
        let mut out = self.builder().from_writer(writer);

        if self.include_header && !table.schema().is_empty() {
            out.write_record(table.schema().names())?;
        }

        for row in table.rows() {
            out.write_record(row.cells())?;
        }

        out.flush()?;
        Ok(())
    }

    /// Generate CSV output as string
    pub fn to_csv(&self, table: &Table) -> Result<String> {
        let mut buffer = Vec::new();
        self.write(table, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Write `table` to a file, replacing any existing content
    pub fn write_file<P: AsRef<Path>>(&self, table: &Table, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        self.write(table, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

impl Default for CsvOutput {
    fn default() -> Self {
        Self::new(true, true)
    }
}
