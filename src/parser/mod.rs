//! Source readers that materialize a [`Table`] from a file

mod csv;

use std::path::Path;

use crate::error::{EtlError, Result};
use crate::model::Table;

pub use self::csv::{parse_cell_value, CsvReader};

/// Trait for reading tabular source files
pub trait SourceReader {
    /// Read a file and return a Table; the first record is the header
    fn read(&self, path: &Path) -> Result<Table>;

    /// Check if this reader can handle the given file extension
    fn supports_extension(&self, ext: &str) -> bool;
}

/// Pick a reader for the path's extension and read it
pub fn read_source(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let reader = if ext == "tsv" {
        CsvReader::with_delimiter(b'\t')
    } else {
        CsvReader::new()
    };

    if !ext.is_empty() && !reader.supports_extension(&ext) {
        return Err(EtlError::SourceRead {
            path: path.to_path_buf(),
            message: format!("Unsupported file format: {}", ext),
        });
    }

    reader.read(path)
}
