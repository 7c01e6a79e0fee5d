use thiserror::Error;

/// Structural problems with a table or a key specification.
///
/// Raised at the boundary of an operation, before any row is processed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// One or more referenced fields are not in the table's schema.
    #[error("{table}: missing field(s): {}", .fields.join(", "))]
    MissingFields { table: String, fields: Vec<String> },
    /// A field name appears more than once.
    #[error("duplicate field name '{0}'")]
    DuplicateField(String),
    /// A join key names no fields.
    #[error("{table}: join key must name at least one field")]
    EmptyKey { table: String },
    /// Left and right join keys have different lengths.
    #[error("key length mismatch: left key has {left} field(s), right key has {right}")]
    KeyLengthMismatch { left: usize, right: usize },
    /// A row does not carry one value per field.
    #[error("row {row}: expected {expected} value(s), found {found}")]
    ArityMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },
    /// A replacement column does not carry one value per row.
    #[error("column '{field}': expected {expected} value(s), found {found}")]
    ColumnLength {
        field: String,
        expected: usize,
        found: usize,
    },
    /// Two tables that must share a schema do not.
    #[error("schema mismatch: [{}] vs [{}]", .left.join(", "), .right.join(", "))]
    Mismatch { left: Vec<String>, right: Vec<String> },
}

impl SchemaError {
    /// Field names this error is about, if any.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::MissingFields { fields, .. } => fields.iter().map(String::as_str).collect(),
            Self::DuplicateField(name) => vec![name.as_str()],
            Self::ColumnLength { field, .. } => vec![field.as_str()],
            _ => Vec::new(),
        }
    }
}
