//! Table, Row, and Cell data structures

use std::borrow::Cow;
use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::key::KeyBuilder;
use super::schema::{Column, ColumnKind};
use crate::error::{EtlError, Result};

static NULL_CELL: CellValue = CellValue::Null;

/// A cell value with type information
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Int(i64),
    Float(f64),
    String(Cow<'static, str>),
    Date(NaiveDate),
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CellValue::Null, CellValue::Null) => true,
            (CellValue::Int(a), CellValue::Int(b)) => a == b,
            (CellValue::Float(a), CellValue::Float(b)) => {
                // Handle NaN comparison
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b
                }
            }
            (CellValue::String(a), CellValue::String(b)) => a == b,
            (CellValue::Date(a), CellValue::Date(b)) => a == b,
            // Cross-type numeric comparison
            (CellValue::Int(a), CellValue::Float(b)) => (*a as f64) == *b,
            (CellValue::Float(a), CellValue::Int(b)) => *a == (*b as f64),
            _ => false,
        }
    }
}

impl CellValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// The kind this value contributes to column inference
    pub fn kind(&self) -> ColumnKind {
        match self {
            CellValue::Null => ColumnKind::Empty,
            CellValue::Int(_) => ColumnKind::Integer,
            CellValue::Float(_) => ColumnKind::Decimal,
            CellValue::String(s) if numeric_text(s).is_some() => ColumnKind::Decimal,
            CellValue::String(_) => ColumnKind::Text,
            CellValue::Date(_) => ColumnKind::Date,
        }
    }

    /// Convert to a display string
    pub fn display(&self) -> Cow<'_, str> {
        match self {
            CellValue::Null => Cow::Borrowed("NULL"),
            CellValue::Int(i) => Cow::Owned(i.to_string()),
            CellValue::Float(f) => Cow::Owned(f.to_string()),
            CellValue::String(s) => Cow::Borrowed(s.as_ref()),
            CellValue::Date(d) => Cow::Owned(d.to_string()),
        }
    }

    /// String form used when concatenating values into a derived key.
    /// Null contributes an empty segment.
    pub fn key_part(&self) -> Cow<'_, str> {
        match self {
            CellValue::Null => Cow::Borrowed(""),
            other => other.display(),
        }
    }

    /// Numeric view of the value, if it has one. Text counts when it is a
    /// plain number such as `2.0` or `1e3`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            CellValue::String(s) => numeric_text(s),
            _ => None,
        }
    }
}

fn numeric_text(s: &str) -> Option<f64> {
    let plain = s.bytes().any(|b| b.is_ascii_digit())
        && s
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    if !plain {
        return None;
    }
    s.parse::<f64>().ok().filter(|f| f.is_finite())
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(Cow::Owned(s.to_string()))
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(Cow::Owned(s))
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Float(f)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        CellValue::Date(d)
    }
}

impl<T> From<Option<T>> for CellValue
where
    T: Into<CellValue>,
{
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => CellValue::Null,
        }
    }
}

/// A row in the table
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Cell values in column order
    pub cells: Vec<CellValue>,
    /// Original line/row number in source file (1-indexed, 0 for derived rows)
    pub source_line: usize,
}

impl Row {
    pub fn new(cells: Vec<CellValue>, source_line: usize) -> Self {
        Self { cells, source_line }
    }

    /// Get a cell value by column index
    pub fn get(&self, index: usize) -> Option<&CellValue> {
        self.cells.get(index)
    }
}

/// A table containing columns and rows
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Column definitions
    pub columns: Vec<Column>,
    /// All rows in the table
    pub rows: Vec<Row>,
    /// Name of the designated index column, if any
    pub index: Option<String>,
}

impl Table {
    /// Create a new empty table with column definitions
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            index: None,
        }
    }

    /// Create an empty table from column names
    pub fn with_column_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = names
            .into_iter()
            .map(Column::new)
            .collect();
        Self::new(columns)
    }

    /// Add a row to the table, padding short rows with nulls
    pub fn add_row(&mut self, mut cells: Vec<CellValue>, source_line: usize) {
        if cells.len() < self.column_count() {
            cells.resize(self.column_count(), CellValue::Null);
        }
        self.rows.push(Row::new(cells, source_line));
    }

    /// Get column index by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Column index by name, or a `ColumnNotFound` error naming the operation
    pub fn require_column(&self, name: &str, operation: &'static str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| EtlError::column_not_found(name, operation))
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Cell at a row position in a named column
    pub fn value(&self, row: usize, column: &str) -> Option<&CellValue> {
        let col_idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(col_idx))
    }

    /// Add (or overwrite) a column whose value is the dash-joined string
    /// form of `source_columns`, in order
    pub fn add_derived_column(&mut self, name: &str, source_columns: &[String]) -> Result<()> {
        let indices = source_columns
            .iter()
            .map(|c| self.require_column(c, "deriving an index column"))
            .collect::<Result<Vec<_>>>()?;
        let builder = KeyBuilder::new().with_columns(indices);

        let target = match self.column_index(name) {
            Some(idx) => idx,
            None => {
                let idx = self.columns.len();
                self.columns.push(Column::new(name));
                for row in &mut self.rows {
                    row.cells.push(CellValue::Null);
                }
                idx
            }
        };

        for row in &mut self.rows {
            let key = builder.build_key(&row.cells);
            row.cells[target] = CellValue::from(key);
        }
        self.columns[target].kind = if self.rows.is_empty() {
            ColumnKind::Empty
        } else {
            ColumnKind::Text
        };
        Ok(())
    }

    /// Designate an existing column as the index column
    pub fn set_index(&mut self, name: &str) -> Result<()> {
        self.require_column(name, "setting the index")?;
        self.index = Some(name.to_string());
        Ok(())
    }

    /// Name of the index column, if one is set
    pub fn index_column(&self) -> Option<&str> {
        self.index.as_deref()
    }

    /// Values of the index column in row order
    pub fn index_values(&self) -> Vec<&CellValue> {
        match self.index.as_deref().and_then(|n| self.column_index(n)) {
            Some(idx) => self.rows.iter().filter_map(|r| r.get(idx)).collect(),
            None => Vec::new(),
        }
    }

    /// Stable ascending sort by one column. Numeric columns compare by
    /// value, all others by their string form; nulls sort last.
    pub fn sort_by_column(&mut self, column_name: &str) -> Result<()> {
        let col_idx = self.require_column(column_name, "sorting")?;
        let numeric = self.columns[col_idx].kind.is_numeric();

        // slice::sort_by is stable
        self.rows.sort_by(|a, b| {
            let va = a.get(col_idx).unwrap_or(&NULL_CELL);
            let vb = b.get(col_idx).unwrap_or(&NULL_CELL);
            compare_cells(va, vb, numeric)
        });
        Ok(())
    }

    /// Copy of up to `len` rows starting at `start`
    pub fn slice(&self, start: usize, len: usize) -> Table {
        let start = start.min(self.rows.len());
        let end = start.saturating_add(len).min(self.rows.len());
        Table {
            columns: self.columns.clone(),
            rows: self.rows[start..end].to_vec(),
            index: self.index.clone(),
        }
    }

    /// Copy of the first `n` rows
    pub fn head(&self, n: usize) -> Table {
        self.slice(0, n)
    }

    /// Infer column kinds from data
    pub fn infer_column_kinds(&mut self) {
        for col_idx in 0..self.column_count() {
            let inferred = self
                .rows
                .iter()
                .filter_map(|row| row.cells.get(col_idx))
                .fold(ColumnKind::Empty, |acc, cell| acc.merge(cell.kind()));

            if let Some(col) = self.columns.get_mut(col_idx) {
                col.kind = inferred;
            }
        }
    }
}

fn compare_cells(a: &CellValue, b: &CellValue, numeric: bool) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }

    if numeric {
        match (a, b) {
            (CellValue::Int(x), CellValue::Int(y)) => x.cmp(y),
            _ => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => a.display().cmp(&b.display()),
            },
        }
    } else {
        a.display().cmp(&b.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artists() -> Table {
        let mut table = Table::with_column_names(["id", "name", "followers"]);
        table.add_row(vec!["1".into(), "B".into(), CellValue::Int(30)], 2);
        table.add_row(vec!["2".into(), "A".into(), CellValue::Int(5)], 3);
        table.add_row(vec!["3".into(), "B".into(), CellValue::Null], 4);
        table.add_row(vec!["4".into(), "A".into(), CellValue::Int(100)], 5);
        table.infer_column_kinds();
        table
    }

    fn ids(table: &Table) -> Vec<String> {
        (0..table.row_count())
            .map(|i| table.value(i, "id").unwrap().display().into_owned())
            .collect()
    }

    #[test]
    fn test_add_row_pads_short_rows() {
        let mut table = Table::with_column_names(["a", "b", "c"]);
        table.add_row(vec!["x".into()], 2);
        assert_eq!(table.rows[0].cells.len(), 3);
        assert!(table.rows[0].cells[2].is_null());
    }

    #[test]
    fn test_derived_column_joins_with_dash() {
        let mut table = artists();
        table
            .add_derived_column("key", &["id".to_string(), "name".to_string()])
            .unwrap();

        assert_eq!(table.column_count(), 4);
        for (i, row) in table.rows.iter().enumerate() {
            let expected = format!("{}-{}", row.cells[0].display(), row.cells[1].display());
            assert_eq!(table.value(i, "key").unwrap().display(), expected);
        }
    }

    #[test]
    fn test_derived_column_renders_null_as_empty() {
        let mut table = artists();
        table
            .add_derived_column("key", &["name".to_string(), "followers".to_string()])
            .unwrap();
        assert_eq!(table.value(2, "key").unwrap().display(), "B-");
    }

    #[test]
    fn test_derived_column_overwrites_existing() {
        let mut table = artists();
        table.add_derived_column("key", &["id".to_string()]).unwrap();
        table.add_derived_column("key", &["name".to_string()]).unwrap();
        assert_eq!(table.column_count(), 4);
        assert_eq!(table.value(0, "key").unwrap().display(), "B");
    }

    #[test]
    fn test_derived_column_missing_source() {
        let mut table = artists();
        let err = table
            .add_derived_column("key", &["id".to_string(), "genre".to_string()])
            .unwrap_err();
        assert!(matches!(err, EtlError::ColumnNotFound { ref column, .. } if column == "genre"));
        assert_eq!(table.column_count(), 3);
    }

    #[test]
    fn test_set_index() {
        let mut table = artists();
        table.set_index("name").unwrap();
        assert_eq!(table.index_column(), Some("name"));
        assert_eq!(table.index_values().len(), 4);
        assert!(table.set_index("missing").is_err());
    }

    #[test]
    fn test_sort_is_stable() {
        let mut table = artists();
        table.sort_by_column("name").unwrap();
        assert_eq!(ids(&table), vec!["2", "4", "1", "3"]);
    }

    #[test]
    fn test_sort_numeric_with_nulls_last() {
        let mut table = artists();
        table.sort_by_column("followers").unwrap();
        assert_eq!(ids(&table), vec!["2", "1", "4", "3"]);
    }

    #[test]
    fn test_sort_numeric_text_by_value() {
        let mut table = Table::with_column_names(["id", "followers"]);
        table.add_row(vec!["a".into(), "23230.0".into()], 2);
        table.add_row(vec!["b".into(), CellValue::Int(5)], 3);
        table.add_row(vec!["c".into(), "1e3".into()], 4);
        table.infer_column_kinds();
        assert_eq!(table.columns[1].kind, ColumnKind::Decimal);

        table.sort_by_column("followers").unwrap();
        assert_eq!(ids(&table), vec!["b", "c", "a"]);
        assert_eq!(table.value(2, "followers").unwrap().display(), "23230.0");
    }

    #[test]
    fn test_sort_missing_column() {
        let mut table = artists();
        assert!(matches!(
            table.sort_by_column("popularity"),
            Err(EtlError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_slice_and_head_clamp() {
        let table = artists();
        assert_eq!(table.head(2).row_count(), 2);
        assert_eq!(table.head(50).row_count(), 4);
        assert_eq!(ids(&table.slice(3, 10)), vec!["4"]);
        assert_eq!(table.slice(10, 1).row_count(), 0);
    }
}
