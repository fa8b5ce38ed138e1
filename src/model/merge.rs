//! Bounded relational join between two tables

use rustc_hash::{FxHashMap, FxHashSet};

use super::schema::Column;
use super::table::{CellValue, Row, Table};
use crate::error::Result;

/// Maximum number of rows a merge produces
pub const MERGE_ROW_LIMIT: usize = 20;

/// Join kind for [`Table::merge`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JoinKind {
    #[default]
    Left,
    Right,
    Inner,
    Outer,
}

impl std::str::FromStr for JoinKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "left" => Ok(JoinKind::Left),
            "right" => Ok(JoinKind::Right),
            "inner" => Ok(JoinKind::Inner),
            "outer" => Ok(JoinKind::Outer),
            _ => Err(format!("Unknown join kind: {}", s)),
        }
    }
}

impl std::fmt::Display for JoinKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JoinKind::Left => write!(f, "left"),
            JoinKind::Right => write!(f, "right"),
            JoinKind::Inner => write!(f, "inner"),
            JoinKind::Outer => write!(f, "outer"),
        }
    }
}

/// Resolved column layout of a merge result
struct MergePlan {
    left_key: usize,
    right_key: usize,
    /// Right-table columns carried into the output, in output order
    right_columns: Vec<usize>,
    /// Key column shared by both sides (left_on == right_on)
    coalesced: bool,
    columns: Vec<Column>,
}

impl MergePlan {
    fn new(
        left: &Table,
        right: &Table,
        left_on: &str,
        right_on: &str,
        select_columns: &[String],
    ) -> Result<Self> {
        let left_key = left.require_column(left_on, "merging")?;
        let right_key = right.require_column(right_on, "merging")?;
        let coalesced = left_on == right_on;

        let mut right_columns = Vec::new();
        if !coalesced {
            right_columns.push(right_key);
        }
        for name in select_columns {
            let idx = right.require_column(name, "merging")?;
            if (coalesced && idx == right_key) || right_columns.contains(&idx) {
                continue;
            }
            right_columns.push(idx);
        }

        let right_names: FxHashSet<&str> = right_columns
            .iter()
            .map(|&i| right.columns[i].name.as_str())
            .collect();
        let left_names: FxHashSet<&str> = left
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .collect();

        let mut columns = Vec::with_capacity(left.column_count() + right_columns.len());
        for col in &left.columns {
            let name = if right_names.contains(col.name.as_str()) {
                format!("{}_x", col.name)
            } else {
                col.name.clone()
            };
            columns.push(Column::with_kind(name, col.kind));
        }
        for &i in &right_columns {
            let col = &right.columns[i];
            let name = if left_names.contains(col.name.as_str()) {
                format!("{}_y", col.name)
            } else {
                col.name.clone()
            };
            columns.push(Column::with_kind(name, col.kind));
        }

        Ok(Self {
            left_key,
            right_key,
            right_columns,
            coalesced,
            columns,
        })
    }

    fn combine(&self, left: Option<&Row>, right: Option<&Row>, left_width: usize) -> Row {
        let mut cells = Vec::with_capacity(self.columns.len());
        match left {
            Some(row) => cells.extend(row.cells.iter().cloned()),
            None => {
                cells.resize(left_width, CellValue::Null);
                if self.coalesced {
                    if let Some(key) = right.and_then(|r| r.get(self.right_key)) {
                        cells[self.left_key] = key.clone();
                    }
                }
            }
        }
        for &i in &self.right_columns {
            let value = right
                .and_then(|r| r.get(i))
                .cloned()
                .unwrap_or(CellValue::Null);
            cells.push(value);
        }

        let source_line = left.or(right).map(|r| r.source_line).unwrap_or(0);
        Row::new(cells, source_line)
    }
}

/// Group row positions by the string form of their key; null keys never match
fn key_lookup(table: &Table, key: usize) -> FxHashMap<String, Vec<usize>> {
    let mut lookup: FxHashMap<String, Vec<usize>> = FxHashMap::default();
    for (pos, row) in table.rows.iter().enumerate() {
        if let Some(value) = row.get(key).filter(|v| !v.is_null()) {
            lookup
                .entry(value.display().into_owned())
                .or_default()
                .push(pos);
        }
    }
    lookup
}

fn matches<'a>(
    lookup: &'a FxHashMap<String, Vec<usize>>,
    row: &Row,
    key: usize,
) -> &'a [usize] {
    row.get(key)
        .filter(|v| !v.is_null())
        .and_then(|v| lookup.get(&*v.display()))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

impl Table {
    /// Join this table with `other` restricted to `select_columns`,
    /// matching `left_on == right_on`. The result keeps at most
    /// [`MERGE_ROW_LIMIT`] rows in join order.
    pub fn merge(
        &self,
        other: &Table,
        left_on: &str,
        right_on: &str,
        select_columns: &[String],
        how: JoinKind,
    ) -> Result<Table> {
        let plan = MergePlan::new(self, other, left_on, right_on, select_columns)?;
        let left_width = self.column_count();
        let mut rows: Vec<Row> = Vec::new();

        match how {
            JoinKind::Left | JoinKind::Inner | JoinKind::Outer => {
                let lookup = key_lookup(other, plan.right_key);
                let mut matched = vec![false; other.row_count()];

                for left_row in &self.rows {
                    if rows.len() >= MERGE_ROW_LIMIT {
                        break;
                    }
                    let hits = matches(&lookup, left_row, plan.left_key);
                    if hits.is_empty() {
                        if how != JoinKind::Inner {
                            rows.push(plan.combine(Some(left_row), None, left_width));
                        }
                        continue;
                    }
                    for &pos in hits {
                        matched[pos] = true;
                        rows.push(plan.combine(Some(left_row), Some(&other.rows[pos]), left_width));
                    }
                }

                if how == JoinKind::Outer {
                    for (pos, right_row) in other.rows.iter().enumerate() {
                        if rows.len() >= MERGE_ROW_LIMIT {
                            break;
                        }
                        if !matched[pos] {
                            rows.push(plan.combine(None, Some(right_row), left_width));
                        }
                    }
                }
            }
            JoinKind::Right => {
                let lookup = key_lookup(self, plan.left_key);
                for right_row in &other.rows {
                    if rows.len() >= MERGE_ROW_LIMIT {
                        break;
                    }
                    let hits = matches(&lookup, right_row, plan.right_key);
                    if hits.is_empty() {
                        rows.push(plan.combine(None, Some(right_row), left_width));
                    }
                    for &pos in hits {
                        rows.push(plan.combine(Some(&self.rows[pos]), Some(right_row), left_width));
                    }
                }
            }
        }
        rows.truncate(MERGE_ROW_LIMIT);

        let index = self
            .index
            .as_ref()
            .filter(|name| plan.columns.iter().any(|c| &c.name == *name))
            .cloned();

        let mut merged = Table {
            columns: plan.columns,
            rows,
            index,
        };
        merged.infer_column_kinds();
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;

    fn artists(n: usize) -> Table {
        let mut table = Table::with_column_names(["id", "name"]);
        for i in 0..n {
            table.add_row(vec![format!("ar{}", i).into(), format!("Artist {}", i).into()], i + 2);
        }
        table.infer_column_kinds();
        table
    }

    fn albums() -> Table {
        let mut table = Table::with_column_names(["artist_id", "id", "name"]);
        table.add_row(vec!["ar1".into(), "al1".into(), "First".into()], 2);
        table.add_row(vec!["ar9".into(), "al2".into(), "Orphan".into()], 3);
        table.add_row(vec!["ar1".into(), "al3".into(), "Second".into()], 4);
        table.add_row(vec!["ar0".into(), "al4".into(), "Debut".into()], 5);
        table.infer_column_kinds();
        table
    }

    fn select(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_left_merge_null_fills_unmatched() {
        let merged = artists(3)
            .merge(&albums(), "id", "artist_id", &select(&["name"]), JoinKind::Left)
            .unwrap();

        assert_eq!(
            merged.column_names(),
            vec!["id", "name_x", "artist_id", "name_y"]
        );
        // ar0 -> Debut, ar1 -> First + Second, ar2 -> no match
        assert_eq!(merged.row_count(), 4);
        assert_eq!(merged.value(0, "name_y").unwrap().display(), "Debut");
        assert_eq!(merged.value(1, "name_y").unwrap().display(), "First");
        assert_eq!(merged.value(2, "name_y").unwrap().display(), "Second");
        assert_eq!(merged.value(3, "id").unwrap().display(), "ar2");
        assert!(merged.value(3, "artist_id").unwrap().is_null());
        assert!(merged.value(3, "name_y").unwrap().is_null());
    }

    #[test]
    fn test_inner_merge_drops_unmatched() {
        let merged = artists(3)
            .merge(&albums(), "id", "artist_id", &select(&["id"]), JoinKind::Inner)
            .unwrap();
        assert_eq!(merged.row_count(), 3);
        assert_eq!(merged.column_names(), vec!["id_x", "name", "artist_id", "id_y"]);
    }

    #[test]
    fn test_right_merge_follows_right_order() {
        let merged = artists(2)
            .merge(&albums(), "id", "artist_id", &select(&["id"]), JoinKind::Right)
            .unwrap();
        let ids: Vec<_> = (0..merged.row_count())
            .map(|i| merged.value(i, "id_y").unwrap().display().into_owned())
            .collect();
        assert_eq!(ids, vec!["al1", "al2", "al3", "al4"]);
        assert!(merged.value(1, "id_x").unwrap().is_null());
    }

    #[test]
    fn test_outer_merge_appends_unmatched_right() {
        let mut left = artists(3);
        left.columns[0].name = "artist_id".to_string();
        let merged = left
            .merge(&albums(), "artist_id", "artist_id", &select(&["id"]), JoinKind::Outer)
            .unwrap();

        assert_eq!(merged.column_names(), vec!["artist_id", "name", "id"]);
        assert_eq!(merged.row_count(), 5);
        let last = merged.row_count() - 1;
        assert_eq!(merged.value(last, "artist_id").unwrap().display(), "ar9");
        assert_eq!(merged.value(last, "id").unwrap().display(), "al2");
        assert!(merged.value(last, "name").unwrap().is_null());
    }

    #[test]
    fn test_merge_caps_output() {
        let left = artists(50);
        let right = artists(50);
        for how in [JoinKind::Left, JoinKind::Right, JoinKind::Inner, JoinKind::Outer] {
            let merged = left.merge(&right, "id", "id", &select(&["name"]), how).unwrap();
            assert_eq!(merged.row_count(), MERGE_ROW_LIMIT);
        }

        let merged = left
            .merge(&right, "id", "id", &select(&["name"]), JoinKind::Left)
            .unwrap();
        for i in 0..MERGE_ROW_LIMIT {
            assert_eq!(merged.value(i, "id").unwrap().display(), format!("ar{}", i));
        }
    }

    #[test]
    fn test_merge_missing_columns() {
        let err = artists(2)
            .merge(&albums(), "id", "artist", &[], JoinKind::Left)
            .unwrap_err();
        assert!(matches!(err, EtlError::ColumnNotFound { ref column, .. } if column == "artist"));

        let err = artists(2)
            .merge(&albums(), "id", "artist_id", &select(&["genres"]), JoinKind::Left)
            .unwrap_err();
        assert!(matches!(err, EtlError::ColumnNotFound { ref column, .. } if column == "genres"));
    }

    #[test]
    fn test_merge_keeps_left_index() {
        let mut left = artists(2);
        left.set_index("id").unwrap();
        let merged = left
            .merge(&albums(), "id", "artist_id", &select(&["id"]), JoinKind::Left)
            .unwrap();
        // "id" was renamed to "id_x", so the index no longer applies
        assert_eq!(merged.index_column(), None);

        let merged = left
            .merge(&albums(), "id", "artist_id", &[], JoinKind::Left)
            .unwrap();
        assert_eq!(merged.index_column(), Some("id"));
    }

    #[test]
    fn test_join_kind_from_str() {
        assert_eq!("OUTER".parse::<JoinKind>().unwrap(), JoinKind::Outer);
        assert!("cross".parse::<JoinKind>().is_err());
    }
}
