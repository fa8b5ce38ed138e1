//! In-process backend used for dry runs and tests

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use tracing::info;

use crate::config::ConnectionParams;
use crate::error::{EtlError, Result, SinkError};
use crate::registry::Schema;

use super::{Connection, Engine, SqlValue};

/// A table held by [`MemoryDatabase`]
#[derive(Debug, Clone)]
pub struct MemoryTable {
    pub schema: Schema,
    /// Rows in schema column order
    pub rows: Vec<Vec<SqlValue>>,
    /// Size of every batch appended, in order
    pub batches: Vec<usize>,
    keys: FxHashSet<Vec<String>>,
}

impl MemoryTable {
    fn new(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
            batches: Vec::new(),
            keys: FxHashSet::default(),
        }
    }

    fn key_positions(&self) -> Vec<usize> {
        self.schema
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.primary_key)
            .map(|(i, _)| i)
            .collect()
    }

    /// Value of `column` in every row, in insertion order
    pub fn column_values(&self, column: &str) -> Vec<&SqlValue> {
        match self.schema.columns.iter().position(|c| c.name == column) {
            Some(pos) => self.rows.iter().map(|r| &r[pos]).collect(),
            None => Vec::new(),
        }
    }
}

/// Tables shared by every connection of one [`MemoryEngine`]
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    pub tables: IndexMap<String, MemoryTable>,
}

impl MemoryDatabase {
    pub fn table(&self, name: &str) -> Option<&MemoryTable> {
        self.tables.get(name)
    }
}

/// Engine whose connections share one in-process database
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    database: Rc<RefCell<MemoryDatabase>>,
    unreachable: bool,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine whose `connect` always fails
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    /// Shared handle for inspecting what was written
    pub fn database(&self) -> Rc<RefCell<MemoryDatabase>> {
        Rc::clone(&self.database)
    }
}

impl Engine for MemoryEngine {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn Connection>> {
        let url = params.redacted_url(self.name());
        if self.unreachable {
            return Err(EtlError::SinkConnection {
                target: url,
                message: "host unreachable".to_string(),
            });
        }
        info!(url = %url, "connected");
        Ok(Box::new(MemoryConnection {
            database: Rc::clone(&self.database),
        }))
    }
}

struct MemoryConnection {
    database: Rc<RefCell<MemoryDatabase>>,
}

impl Connection for MemoryConnection {
    fn table_exists(&mut self, table: &str) -> std::result::Result<bool, SinkError> {
        Ok(self.database.borrow().tables.contains_key(table))
    }

    fn create_table(&mut self, schema: &Schema) -> std::result::Result<(), SinkError> {
        self.database
            .borrow_mut()
            .tables
            .entry(schema.name.clone())
            .or_insert_with(|| MemoryTable::new(schema.clone()));
        Ok(())
    }

    fn drop_table(&mut self, table: &str) -> std::result::Result<(), SinkError> {
        self.database
            .borrow_mut()
            .tables
            .shift_remove(table)
            .map(|_| ())
            .ok_or_else(|| SinkError::TableMissing(table.to_string()))
    }

    fn append_rows(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<SqlValue>],
    ) -> std::result::Result<usize, SinkError> {
        let mut db = self.database.borrow_mut();
        let target = db
            .tables
            .get_mut(table)
            .ok_or_else(|| SinkError::TableMissing(table.to_string()))?;

        let positions = columns
            .iter()
            .map(|name| {
                target
                    .schema
                    .columns
                    .iter()
                    .position(|c| &c.name == name)
                    .ok_or_else(|| {
                        SinkError::Other(format!("table '{}' has no column '{}'", table, name))
                    })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        // Build the whole batch before touching the table so a failure leaves it unchanged
        let width = target.schema.columns.len();
        let key_positions = target.key_positions();
        let mut staged = Vec::with_capacity(rows.len());
        let mut staged_keys: FxHashSet<Vec<String>> = FxHashSet::default();
        for row in rows {
            let mut full = vec![SqlValue::Null; width];
            for (&pos, value) in positions.iter().zip(row) {
                full[pos] = value.clone();
            }
            if !key_positions.is_empty() {
                let key: Vec<String> = key_positions.iter().map(|&p| full[p].key_text()).collect();
                if target.keys.contains(&key) || !staged_keys.insert(key.clone()) {
                    return Err(SinkError::DuplicateKey {
                        table: table.to_string(),
                        key: key.join(", "),
                    });
                }
            }
            staged.push(full);
        }

        target.keys.extend(staged_keys);
        target.rows.extend(staged);
        target.batches.push(rows.len());
        Ok(rows.len())
    }

    fn row_count(&mut self, table: &str) -> std::result::Result<usize, SinkError> {
        self.database
            .borrow()
            .tables
            .get(table)
            .map(|t| t.rows.len())
            .ok_or_else(|| SinkError::TableMissing(table.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ColumnDef, SqlType};

    fn keyed_schema() -> Schema {
        Schema::new(
            "t",
            vec![
                ColumnDef::new("k", SqlType::Varchar(8)).primary_key(),
                ColumnDef::new("v", SqlType::Numeric),
            ],
        )
    }

    #[test]
    fn test_connections_share_database() {
        let engine = MemoryEngine::new();
        let mut first = engine.connect(&ConnectionParams::default()).unwrap();
        first.create_table(&keyed_schema()).unwrap();

        let mut second = engine.connect(&ConnectionParams::default()).unwrap();
        assert!(second.table_exists("t").unwrap());
        drop(first);
        assert!(engine.database().borrow().table("t").is_some());
    }

    #[test]
    fn test_duplicate_key_rejects_whole_batch() {
        let engine = MemoryEngine::new();
        let mut conn = engine.connect(&ConnectionParams::default()).unwrap();
        conn.create_table(&keyed_schema()).unwrap();

        let columns = vec!["k".to_string()];
        let rows = vec![
            vec![SqlValue::Text("a".into())],
            vec![SqlValue::Text("b".into())],
            vec![SqlValue::Text("a".into())],
        ];
        let err = conn.append_rows("t", &columns, &rows).unwrap_err();
        assert!(matches!(err, SinkError::DuplicateKey { .. }));
        assert_eq!(conn.row_count("t").unwrap(), 0);
    }

    #[test]
    fn test_unknown_column_and_missing_table() {
        let engine = MemoryEngine::new();
        let mut conn = engine.connect(&ConnectionParams::default()).unwrap();
        let columns = vec!["k".to_string()];
        assert!(matches!(
            conn.append_rows("t", &columns, &[]),
            Err(SinkError::TableMissing(_))
        ));

        conn.create_table(&keyed_schema()).unwrap();
        let columns = vec!["nope".to_string()];
        assert!(matches!(
            conn.append_rows("t", &columns, &[]),
            Err(SinkError::Other(_))
        ));
    }

    #[test]
    fn test_unreachable_engine() {
        let err = MemoryEngine::unreachable()
            .connect(&ConnectionParams::default())
            .err()
            .unwrap();
        assert!(matches!(err, EtlError::SinkConnection { .. }));
    }
}
