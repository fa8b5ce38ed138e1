//! Column metadata collected while reading a source

/// What the values of a column turned out to be once every row was read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    /// No non-null value seen yet
    #[default]
    Empty,
    Integer,
    /// Any mix of integers and decimals, including numeric text like `2.0`
    Decimal,
    Date,
    /// Free text, or values of incompatible kinds
    Text,
}

impl ColumnKind {
    /// Kind of a column holding values of both `self` and `other`
    pub fn merge(self, other: ColumnKind) -> ColumnKind {
        match (self, other) {
            (a, b) if a == b => a,
            (ColumnKind::Empty, k) | (k, ColumnKind::Empty) => k,
            (ColumnKind::Integer, ColumnKind::Decimal) | (ColumnKind::Decimal, ColumnKind::Integer) => {
                ColumnKind::Decimal
            }
            _ => ColumnKind::Text,
        }
    }

    /// Numeric columns order by magnitude instead of by text
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Decimal)
    }
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ColumnKind::Empty => "empty",
            ColumnKind::Integer => "integer",
            ColumnKind::Decimal => "decimal",
            ColumnKind::Date => "date",
            ColumnKind::Text => "text",
        };
        f.write_str(name)
    }
}

/// A named column and the kind of its values
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_kind(name, ColumnKind::Empty)
    }

    pub fn with_kind(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_kinds() {
        use ColumnKind::*;
        assert_eq!(Empty.merge(Integer), Integer);
        assert_eq!(Decimal.merge(Empty), Decimal);
        assert_eq!(Integer.merge(Decimal), Decimal);
        assert_eq!(Date.merge(Date), Date);
        assert_eq!(Date.merge(Integer), Text);
        assert_eq!(Text.merge(Decimal), Text);
    }

    #[test]
    fn test_numeric_kinds() {
        assert!(ColumnKind::Integer.is_numeric());
        assert!(ColumnKind::Decimal.is_numeric());
        assert!(!ColumnKind::Date.is_numeric());
        assert!(!ColumnKind::Empty.is_numeric());
        assert_eq!(ColumnKind::Decimal.to_string(), "decimal");
    }
}
