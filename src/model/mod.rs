//! Data model for tabular data representation

mod key;
mod merge;
mod schema;
mod table;

pub use key::{count_duplicate_keys, KeyBuilder, KEY_SEPARATOR};
pub use merge::{JoinKind, MERGE_ROW_LIMIT};
pub use schema::{Column, ColumnKind};
pub use table::{CellValue, Row, Table};
