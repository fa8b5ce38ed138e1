//! One dataset's lifecycle from source file to relational table

use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{EtlError, Result};
use crate::model::{count_duplicate_keys, CellValue, JoinKind, Table};
use crate::parser::read_source;
use crate::registry::{ensure_table, Schema};
use crate::sink::{coerce, Connection, SqlValue};

/// Rows per append batch unless configured otherwise
pub const DEFAULT_CHUNK_SIZE: usize = 2000;

/// Rows returned by [`Loader::preview`]
pub const PREVIEW_ROWS: usize = 5;

/// Outcome of [`Loader::write_to`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub rows: usize,
    pub batches: usize,
}

/// Owns one dataset's table while it is indexed, sorted and written
#[derive(Debug, Clone)]
pub struct Loader {
    table: Table,
}

impl Loader {
    /// Read a CSV (or TSV) file whose first record is the header
    pub fn load(path: &Path) -> Result<Self> {
        let table = read_source(path)?;
        info!(
            path = %path.display(),
            rows = table.row_count(),
            columns = table.column_count(),
            "loaded source"
        );
        Ok(Self { table })
    }

    /// Wrap an already materialized table
    pub fn from_table(table: Table) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn into_table(self) -> Table {
        self.table
    }

    /// First [`PREVIEW_ROWS`] rows
    pub fn preview(&self) -> Table {
        self.table.head(PREVIEW_ROWS)
    }

    /// Derive `name` from the dash-joined `columns` and make it the index
    pub fn add_index(&mut self, name: &str, columns: &[String]) -> Result<()> {
        self.table.add_derived_column(name, columns)?;
        self.table.set_index(name)?;

        let duplicates = count_duplicate_keys(self.table.index_values());
        if duplicates > 0 {
            warn!(index = name, duplicates, "index values are not unique");
        }
        debug!(index = name, sources = ?columns, "index added");
        Ok(())
    }

    pub fn sort(&mut self, column: &str) -> Result<()> {
        self.table.sort_by_column(column)?;
        debug!(column, "sorted");
        Ok(())
    }

    /// Replace the table with its merge against `other`; see [`Table::merge`]
    pub fn merge_with(
        &mut self,
        other: &Table,
        left_on: &str,
        right_on: &str,
        select_columns: &[String],
        how: JoinKind,
    ) -> Result<()> {
        self.table = self
            .table
            .merge(other, left_on, right_on, select_columns, how)?;
        debug!(how = %how, rows = self.table.row_count(), "merged");
        Ok(())
    }

    /// Append the table to `schema`'s table in batches of `chunk_size`.
    ///
    /// The target is created first if absent. Only the schema's columns
    /// are written; batches already appended stay if a later one fails.
    pub fn write_to(
        &self,
        conn: &mut dyn Connection,
        schema: &Schema,
        chunk_size: usize,
    ) -> Result<WriteSummary> {
        let write_error = |message: String| EtlError::Write {
            table: schema.name.clone(),
            message,
        };

        if chunk_size == 0 {
            return Err(write_error("chunk size must be positive".to_string()));
        }

        let positions = schema
            .columns
            .iter()
            .map(|c| self.table.require_column(&c.name, "writing"))
            .collect::<Result<Vec<_>>>()?;

        ensure_table(conn, schema)?;

        let columns = schema.column_names();
        let mut summary = WriteSummary::default();
        for chunk in self.table.rows.chunks(chunk_size) {
            let batch = chunk
                .iter()
                .map(|row| {
                    schema
                        .columns
                        .iter()
                        .zip(&positions)
                        .map(|(def, &pos)| {
                            let cell = row.get(pos).cloned().unwrap_or(CellValue::Null);
                            coerce(&cell, def).map_err(|e| {
                                write_error(format!("source line {}: {}", row.source_line, e))
                            })
                        })
                        .collect::<Result<Vec<SqlValue>>>()
                })
                .collect::<Result<Vec<_>>>()?;

            let written = conn
                .append_rows(&schema.name, &columns, &batch)
                .map_err(|e| write_error(format!("batch {}: {}", summary.batches + 1, e)))?;
            summary.rows += written;
            summary.batches += 1;
            debug!(table = %schema.name, batch = summary.batches, rows = written, "appended batch");
        }

        info!(
            table = %schema.name,
            rows = summary.rows,
            batches = summary.batches,
            "write complete"
        );
        Ok(summary)
    }
}
