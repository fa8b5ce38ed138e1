//! Relational schemas for the `artists` and `albums` tables
//!
//! Schemas are plain values handed to [`create_schema`], [`ensure_table`]
//! and the loader's write path; nothing is registered globally.

use tracing::{debug, info};

use crate::error::{EtlError, Result, SinkError};
use crate::sink::Connection;

pub const ARTISTS_TABLE: &str = "artists";
pub const ALBUMS_TABLE: &str = "albums";

/// Declared column type in the target database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    /// Variable-length text with a maximum length in characters
    Varchar(usize),
    Numeric,
    Date,
}

impl std::fmt::Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlType::Varchar(len) => write!(f, "VARCHAR({})", len),
            SqlType::Numeric => write!(f, "NUMERIC"),
            SqlType::Date => write!(f, "DATE"),
        }
    }
}

/// One column of a target table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: SqlType,
    pub nullable: bool,
    pub primary_key: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            nullable: true,
            primary_key: false,
        }
    }

    /// Mark as (part of) the primary key; key columns are never null
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }
}

/// A named, ordered set of columns describing a relational table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl Schema {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Names of the primary key columns, in declaration order
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Schema of the `artists` table
pub fn artists_schema() -> Schema {
    use SqlType::*;
    Schema::new(
        ARTISTS_TABLE,
        vec![
            ColumnDef::new("id", Varchar(256)).primary_key(),
            ColumnDef::new("artist_popularity", Numeric),
            ColumnDef::new("followers", Numeric),
            ColumnDef::new("genres", Varchar(1024)),
            ColumnDef::new("name", Varchar(256)),
            ColumnDef::new("track_id", Varchar(256)),
            ColumnDef::new("track_name_prev", Varchar(256)),
            ColumnDef::new("type", Varchar(256)),
        ],
    )
}

/// Schema of the `albums` table
///
/// An artist has many albums, so the key spans `artist_id`, `id` and
/// `release_date` rather than `artist_id` alone.
pub fn albums_schema() -> Schema {
    use SqlType::*;
    Schema::new(
        ALBUMS_TABLE,
        vec![
            ColumnDef::new("artist_id", Varchar(256)).primary_key(),
            ColumnDef::new("album_type", Varchar(256)),
            ColumnDef::new("available_markets", Varchar(10240)),
            ColumnDef::new("external_urls", Varchar(512)),
            ColumnDef::new("href", Varchar(256)),
            ColumnDef::new("id", Varchar(256)).primary_key(),
            ColumnDef::new("images", Varchar(1024)),
            ColumnDef::new("name", Varchar(512)),
            ColumnDef::new("release_date", Date).primary_key(),
            ColumnDef::new("release_date_precision", Varchar(16)),
            ColumnDef::new("total_tracks", Numeric),
            ColumnDef::new("track_id", Varchar(256)),
            ColumnDef::new("track_name_prev", Varchar(256)),
            ColumnDef::new("uri", Varchar(256)),
            ColumnDef::new("type", Varchar(256)),
        ],
    )
}

/// Create the `artists` and `albums` tables, dropping them first when
/// `drop_first` is set
pub fn create_schema(conn: &mut dyn Connection, drop_first: bool) -> Result<()> {
    create_schemas(conn, &[artists_schema(), albums_schema()], drop_first)
}

/// Create each schema's table if absent. With `drop_first`, existing
/// tables are dropped in reverse order first; a missing table is not an
/// error.
pub fn create_schemas(conn: &mut dyn Connection, schemas: &[Schema], drop_first: bool) -> Result<()> {
    if drop_first {
        for schema in schemas.iter().rev() {
            match conn.drop_table(&schema.name) {
                Ok(()) => info!(table = %schema.name, "dropped table"),
                Err(SinkError::TableMissing(_)) => {
                    debug!(table = %schema.name, "table does not exist, nothing to drop")
                }
                Err(e) => {
                    return Err(EtlError::Schema {
                        table: schema.name.clone(),
                        message: format!("drop failed: {}", e),
                    })
                }
            }
        }
    }

    for schema in schemas {
        ensure_table(conn, schema)?;
    }
    Ok(())
}

/// Create the table for `schema` unless it already exists
pub fn ensure_table(conn: &mut dyn Connection, schema: &Schema) -> Result<()> {
    let schema_error = |e: SinkError| EtlError::Schema {
        table: schema.name.clone(),
        message: e.to_string(),
    };

    if conn.table_exists(&schema.name).map_err(schema_error)? {
        debug!(table = %schema.name, "table already exists");
        return Ok(());
    }
    conn.create_table(schema).map_err(schema_error)?;
    info!(table = %schema.name, columns = schema.columns.len(), "created table");
    Ok(())
}
