//! CSV file reader

use std::borrow::Cow;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::debug;

use crate::error::{EtlError, Result};
use crate::model::{CellValue, Column, Table};

use super::SourceReader;

/// Reader for comma (or otherwise) delimited files with a header row
#[derive(Debug, Clone)]
pub struct CsvReader {
    delimiter: u8,
}

impl Default for CsvReader {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvReader {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }
}

impl SourceReader for CsvReader {
    fn read(&self, path: &Path) -> Result<Table> {
        let source_error = |message: String| EtlError::SourceRead {
            path: path.to_path_buf(),
            message,
        };

        let file = File::open(path).map_err(|e| source_error(e.to_string()))?;
        let reader = BufReader::new(file);
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(reader);

        // Read headers
        let headers = csv_reader
            .headers()
            .map_err(|e| source_error(format!("failed to read header: {}", e)))?
            .clone();

        if headers.is_empty() {
            return Err(source_error("missing header row".to_string()));
        }

        let columns: Vec<Column> = headers
            .iter()
            .map(|name| Column::new(name.trim()))
            .collect();

        let mut table = Table::new(columns);

        // Read rows
        for (line_num, result) in csv_reader.records().enumerate() {
            // +2 for 1-indexing and header
            let record =
                result.map_err(|e| source_error(format!("row {}: {}", line_num + 2, e)))?;

            if record.len() > table.column_count() {
                return Err(source_error(format!(
                    "row {} has {} fields, header has {}",
                    line_num + 2,
                    record.len(),
                    table.column_count()
                )));
            }

            let cells: Vec<CellValue> = record.iter().map(parse_cell_value).collect();
            table.add_row(cells, line_num + 2);
        }

        table.infer_column_kinds();
        debug!(
            path = %path.display(),
            rows = table.row_count(),
            columns = table.column_count(),
            "read source"
        );

        Ok(table)
    }

    fn supports_extension(&self, ext: &str) -> bool {
        matches!(ext.to_lowercase().as_str(), "csv" | "tsv" | "txt")
    }
}

/// Parse a string value into a CellValue with type inference.
///
/// A cell is only typed when its rendered form is the source text itself,
/// so `display()` of any parsed cell reproduces the field byte for byte.
/// Everything else (`2.0`, `1e3`, ids wider than `i64`) stays text.
pub fn parse_cell_value(s: &str) -> CellValue {
    let trimmed = s.trim();

    // Check for empty/null
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") || trimmed == "NA" {
        return CellValue::Null;
    }

    if let Ok(i) = s.parse::<i64>() {
        if i.to_string() == s {
            return CellValue::Int(i);
        }
    }

    // Plain decimal notation only, so names like "Infinity" or "NaN" stay text
    let decimal = s.bytes().any(|b| b.is_ascii_digit())
        && s.bytes().all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-'));
    if decimal {
        if let Ok(f) = s.parse::<f64>() {
            if f.to_string() == s {
                return CellValue::Float(f);
            }
        }
    }

    if let Ok(date) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if date.format("%Y-%m-%d").to_string() == s {
            return CellValue::Date(date);
        }
    }

    CellValue::String(Cow::Owned(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_cell_value() {
        assert_eq!(parse_cell_value(""), CellValue::Null);
        assert_eq!(parse_cell_value("null"), CellValue::Null);
        assert_eq!(parse_cell_value("42"), CellValue::Int(42));
        assert_eq!(parse_cell_value("3.14"), CellValue::Float(3.14));
        assert_eq!(parse_cell_value("0.5"), CellValue::Float(0.5));
        assert_eq!(
            parse_cell_value("2020-01-01"),
            CellValue::Date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
        );
        assert_eq!(
            parse_cell_value("hello"),
            CellValue::String(Cow::Owned("hello".to_string()))
        );
    }

    #[test]
    fn test_parse_keeps_identifier_text() {
        assert_eq!(parse_cell_value("007"), CellValue::from("007"));
        assert_eq!(parse_cell_value("Infinity"), CellValue::from("Infinity"));
        assert_eq!(parse_cell_value("NaN"), CellValue::from("NaN"));
        assert_eq!(parse_cell_value("1998-05"), CellValue::from("1998-05"));
    }

    #[test]
    fn test_parse_keeps_non_canonical_numbers_as_text() {
        assert_eq!(parse_cell_value("2.0"), CellValue::from("2.0"));
        assert_eq!(parse_cell_value("1.50"), CellValue::from("1.50"));
        assert_eq!(parse_cell_value("1e3"), CellValue::from("1e3"));
        assert_eq!(parse_cell_value("+5"), CellValue::from("+5"));
        assert_eq!(parse_cell_value("-0"), CellValue::from("-0"));
        assert_eq!(parse_cell_value(" 42"), CellValue::from(" 42"));
        assert_eq!(parse_cell_value("2020-1-1"), CellValue::from("2020-1-1"));
        assert_eq!(parse_cell_value("0000"), CellValue::from("0000"));

        let wide_id = "12345678901234567890123";
        assert_eq!(parse_cell_value(wide_id), CellValue::from(wide_id));
    }

    #[test]
    fn test_parsed_cells_display_as_source_text() {
        for field in ["42", "-7", "3.14", "0.5", "2020-01-01", "1.50", "1e3", "Ab c"] {
            assert_eq!(parse_cell_value(field).display(), field);
        }
    }
}
