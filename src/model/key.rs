//! Composite key construction

use rustc_hash::FxHashSet;

use super::table::CellValue;

/// Separator between key components of a derived index column
pub const KEY_SEPARATOR: &str = "-";

/// Builder for computing composite keys
pub struct KeyBuilder {
    column_indices: Vec<usize>,
}

impl Default for KeyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyBuilder {
    /// Create a new key builder
    pub fn new() -> Self {
        Self {
            column_indices: Vec::new(),
        }
    }

    /// Set the key columns by index
    pub fn with_columns(mut self, indices: Vec<usize>) -> Self {
        self.column_indices = indices;
        self
    }

    /// Build a key string from cell values
    pub fn build_key(&self, cells: &[CellValue]) -> String {
        self.column_indices
            .iter()
            .map(|&i| cells.get(i).map(|c| c.key_part()).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(KEY_SEPARATOR)
    }
}

/// Number of values that repeat an earlier value in the sequence
pub fn count_duplicate_keys<'a>(values: impl IntoIterator<Item = &'a CellValue>) -> usize {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    values
        .into_iter()
        .filter(|v| !seen.insert(v.key_part().into_owned()))
        .count()
}
