//! Relational sink: engines, connections and typed SQL values

mod memory;
mod sqlite;

use chrono::NaiveDate;

use crate::config::ConnectionParams;
use crate::error::{Result, SinkError};
use crate::model::CellValue;
use crate::registry::{ColumnDef, Schema, SqlType};

pub use memory::{MemoryDatabase, MemoryEngine, MemoryTable};
pub use sqlite::SqliteEngine;

/// A database engine that hands out connections
pub trait Engine {
    /// Short name used in logs and connection URLs
    fn name(&self) -> &'static str;

    /// Open a connection; it is released when the box is dropped
    fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn Connection>>;
}

/// An open connection to a relational database
pub trait Connection {
    fn table_exists(&mut self, table: &str) -> std::result::Result<bool, SinkError>;

    /// Create the table described by `schema`; no-op if it already exists
    fn create_table(&mut self, schema: &Schema) -> std::result::Result<(), SinkError>;

    /// Drop a table; returns [`SinkError::TableMissing`] if it does not exist
    fn drop_table(&mut self, table: &str) -> std::result::Result<(), SinkError>;

    /// Append one batch of rows atomically, returning the number of rows written
    fn append_rows(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<SqlValue>],
    ) -> std::result::Result<usize, SinkError>;

    fn row_count(&mut self, table: &str) -> std::result::Result<usize, SinkError>;
}

/// A cell value coerced to a column's declared SQL type
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Date(NaiveDate),
}

impl SqlValue {
    /// Canonical text used for primary key comparison
    pub fn key_text(&self) -> String {
        match self {
            SqlValue::Null => String::new(),
            SqlValue::Integer(i) => i.to_string(),
            SqlValue::Real(f) => f.to_string(),
            SqlValue::Text(s) => s.clone(),
            SqlValue::Date(d) => d.to_string(),
        }
    }
}

/// Coerce a cell into the declared type of `column`
pub fn coerce(value: &CellValue, column: &ColumnDef) -> std::result::Result<SqlValue, String> {
    if value.is_null() {
        return if column.nullable {
            Ok(SqlValue::Null)
        } else {
            Err(format!("column '{}' does not accept null", column.name))
        };
    }

    match column.sql_type {
        SqlType::Varchar(max) => {
            let text = value.display().into_owned();
            let len = text.chars().count();
            if len > max {
                return Err(format!(
                    "value of length {} exceeds {} for column '{}'",
                    len, column.sql_type, column.name
                ));
            }
            Ok(SqlValue::Text(text))
        }
        SqlType::Numeric => match value {
            CellValue::Int(i) => Ok(SqlValue::Integer(*i)),
            CellValue::Float(f) => Ok(SqlValue::Real(*f)),
            CellValue::String(s) => s
                .trim()
                .parse::<f64>()
                .map(SqlValue::Real)
                .map_err(|_| mismatch(value, column)),
            _ => Err(mismatch(value, column)),
        },
        SqlType::Date => match value {
            CellValue::Date(d) => Ok(SqlValue::Date(*d)),
            CellValue::Int(year) => i32::try_from(*year)
                .ok()
                .filter(|y| (0..=9999).contains(y))
                .and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1))
                .map(SqlValue::Date)
                .ok_or_else(|| mismatch(value, column)),
            CellValue::String(s) => parse_partial_date(s)
                .map(SqlValue::Date)
                .ok_or_else(|| mismatch(value, column)),
            _ => Err(mismatch(value, column)),
        },
    }
}

fn mismatch(value: &CellValue, column: &ColumnDef) -> String {
    format!(
        "value '{}' is not a valid {} for column '{}'",
        value.display(),
        column.sql_type,
        column.name
    )
}

/// Parse `YYYY-MM-DD`, `YYYY-MM` or `YYYY`. Missing or zero month and day
/// parts default to the first, so the `0000` placeholder becomes `0000-01-01`.
fn parse_partial_date(s: &str) -> Option<NaiveDate> {
    let mut parts = s.trim().splitn(3, '-');
    let year = parts.next().filter(|y| y.len() == 4)?.parse::<i32>().ok()?;
    let month = date_part(parts.next())?;
    let day = date_part(parts.next())?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn date_part(part: Option<&str>) -> Option<u32> {
    match part {
        None => Some(1),
        Some(p) => p.parse::<u32>().ok().map(|n| n.max(1)),
    }
}

/// Render a `CREATE TABLE IF NOT EXISTS` statement for a schema
pub fn create_table_sql(schema: &Schema) -> String {
    let mut defs: Vec<String> = schema
        .columns
        .iter()
        .map(|c| {
            let mut def = format!("{} {}", quote_ident(&c.name), c.sql_type);
            if !c.nullable {
                def.push_str(" NOT NULL");
            }
            def
        })
        .collect();

    let key = schema.primary_key();
    if !key.is_empty() {
        let cols: Vec<String> = key.iter().map(|k| quote_ident(k)).collect();
        defs.push(format!("PRIMARY KEY ({})", cols.join(", ")));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(&schema.name),
        defs.join(", ")
    )
}

/// Render a parameterized `INSERT` for the given columns
pub fn insert_sql(table: &str, columns: &[String]) -> String {
    let cols: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    let params: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        cols.join(", "),
        params.join(", ")
    )
}

/// Double-quote an identifier, escaping embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
