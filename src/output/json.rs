//! JSON preview output

use std::io::Write;

use anyhow::Result;
use indexmap::IndexMap;
use serde::Serialize;

use crate::model::{CellValue, Table};

use super::PreviewFormatter;

/// JSON output, one compact document per line and preview
pub struct JsonOutput;

impl JsonOutput {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct JsonPreview<'a> {
    table: &'a str,
    index: Option<&'a str>,
    rows: Vec<IndexMap<&'a str, &'a CellValue>>,
}

impl PreviewFormatter for JsonOutput {
    fn render(&self, title: &str, table: &Table, writer: &mut dyn Write) -> Result<()> {
        let rows = table
            .rows
            .iter()
            .map(|row| {
                table
                    .columns
                    .iter()
                    .zip(&row.cells)
                    .map(|(col, cell)| (col.name.as_str(), cell))
                    .collect()
            })
            .collect();

        let output = JsonPreview {
            table: title,
            index: table.index_column(),
            rows,
        };

        serde_json::to_writer(&mut *writer, &output)?;
        writeln!(writer)?;

        Ok(())
    }
}
