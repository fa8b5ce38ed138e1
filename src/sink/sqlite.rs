//! SQLite backend

use std::path::PathBuf;

use rusqlite::types::{ToSql, ToSqlOutput, Value};
use rusqlite::{params_from_iter, OptionalExtension};
use tracing::{debug, info};

use crate::config::ConnectionParams;
use crate::error::{EtlError, Result, SinkError};
use crate::registry::Schema;

use super::{create_table_sql, insert_sql, quote_ident, Connection, Engine, SqlValue};

/// Host value that selects an in-memory database
pub const IN_MEMORY_HOST: &str = ":memory:";

/// Engine backed by SQLite files
///
/// `host` names the directory holding the database file
/// `<database>.sqlite3`. SQLite has no accounts, so `user` and `password`
/// are accepted and not used.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteEngine;

impl SqliteEngine {
    pub fn new() -> Self {
        Self
    }

    /// File path a set of connection parameters resolves to
    pub fn database_path(params: &ConnectionParams) -> PathBuf {
        PathBuf::from(&params.host).join(format!("{}.sqlite3", params.database))
    }
}

impl Engine for SqliteEngine {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn Connection>> {
        let target = params.redacted_url(self.name());
        let opened = if params.host == IN_MEMORY_HOST {
            rusqlite::Connection::open_in_memory()
        } else {
            let path = Self::database_path(params);
            if !path.parent().is_some_and(|dir| dir.is_dir()) {
                return Err(EtlError::SinkConnection {
                    target,
                    message: format!("directory '{}' does not exist", params.host),
                });
            }
            rusqlite::Connection::open(&path)
        };
        let conn = opened.map_err(|e| EtlError::SinkConnection {
            target: target.clone(),
            message: e.to_string(),
        })?;

        if !params.user.is_empty() {
            debug!(user = %params.user, "sqlite ignores user credentials");
        }
        info!(url = %target, "connected");
        Ok(Box::new(SqliteConnection { conn }))
    }
}

/// An open SQLite connection; closed on drop
pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl Connection for SqliteConnection {
    fn table_exists(&mut self, table: &str) -> std::result::Result<bool, SinkError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn create_table(&mut self, schema: &Schema) -> std::result::Result<(), SinkError> {
        let sql = create_table_sql(schema);
        debug!(sql = %sql, "create table");
        self.conn.execute(&sql, [])?;
        Ok(())
    }

    fn drop_table(&mut self, table: &str) -> std::result::Result<(), SinkError> {
        if !self.table_exists(table)? {
            return Err(SinkError::TableMissing(table.to_string()));
        }
        self.conn
            .execute(&format!("DROP TABLE {}", quote_ident(table)), [])?;
        Ok(())
    }

    fn append_rows(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<SqlValue>],
    ) -> std::result::Result<usize, SinkError> {
        if !self.table_exists(table)? {
            return Err(SinkError::TableMissing(table.to_string()));
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&insert_sql(table, columns))?;
            for row in rows {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    fn row_count(&mut self, table: &str) -> std::result::Result<usize, SinkError> {
        if !self.table_exists(table)? {
            return Err(SinkError::TableMissing(table.to_string()));
        }
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            SqlValue::Null => Value::Null,
            SqlValue::Integer(i) => Value::Integer(*i),
            SqlValue::Real(f) => Value::Real(*f),
            SqlValue::Text(s) => Value::Text(s.clone()),
            SqlValue::Date(d) => Value::Text(d.to_string()),
        };
        Ok(ToSqlOutput::Owned(value))
    }
}
