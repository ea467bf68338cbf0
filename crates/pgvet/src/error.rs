//! Error types for pgvet.
//!
//! Every failure mode of a validation is a variant of [`VetError`]; nothing
//! is reported out of band. A statement's validation stops at the first
//! error. Wrapper variants ([`VetError::Context`]) prepend the clause being
//! traversed without losing the underlying error, so callers can still walk
//! the `source()` chain.

use thiserror::Error;

/// Result type alias for pgvet operations.
pub type VetResult<T> = Result<T, VetError>;

/// Error type for query and schema validation.
#[derive(Debug, Error)]
pub enum VetError {
    /// The PostgreSQL parser rejected the input.
    #[error("invalid SQL: {0}")]
    Parse(#[from] pg_query::Error),

    /// A single-statement entry point received more than one statement.
    #[error("query contains more than one statement")]
    MultipleStatements,

    /// The input produced no statements at all.
    #[error("query contains no statement")]
    EmptyStatement,

    /// The top-level parse node is not a recognizable statement.
    #[error("query contains an invalid statement")]
    InvalidStatementKind,

    /// The statement kind is outside the supported set.
    #[error("unsupported statement kind: {0}")]
    UnsupportedStatement(String),

    /// A referenced table is not defined in the schema.
    #[error("invalid table name: {0}")]
    InvalidTable(String),

    /// A write statement targets a view, CTE, or other read-only relation.
    #[error("table `{0}` is read-only")]
    ReadOnlyTable(String),

    /// A qualified column names a table that was not brought into scope.
    #[error("table `{table}` not available for query")]
    TableUnavailable { table: String, location: i32 },

    /// A column does not exist in the qualifying table, or in any visible
    /// table when unqualified.
    #[error("column `{}` is not defined in {}", .column, column_scope(.table))]
    ColumnNotFound {
        column: String,
        table: Option<String>,
        location: i32,
    },

    /// An INSERT values row does not match the target column list.
    #[error("column count {columns} doesn't match value count {values}")]
    ColumnCountMismatch { columns: usize, values: usize },

    /// DELETE without a WHERE clause.
    #[error("no WHERE clause for DELETE")]
    MissingWhere,

    /// DELETE whose WHERE clause references no columns.
    #[error("no columns referenced in DELETE's WHERE clause")]
    EmptyWherePredicate,

    /// A sub-clause had an unexpected shape (e.g. a VALUES row that is not a
    /// list, or a subquery without a SELECT body).
    #[error("invalid subexpression: {0}")]
    InvalidSubexpression(String),

    /// Traversal context prepended to an inner error.
    #[error("{context}: {source}")]
    Context {
        context: &'static str,
        #[source]
        source: Box<VetError>,
    },
}

fn column_scope(table: &Option<String>) -> String {
    match table {
        Some(table) => format!("table `{table}`"),
        None => "any table available for query".to_string(),
    }
}

impl VetError {
    /// Wrap an error with the clause being traversed when it surfaced.
    pub(crate) fn context(context: &'static str, source: VetError) -> Self {
        VetError::Context {
            context,
            source: Box::new(source),
        }
    }

    /// Byte offset into the query the error points at, when one is known.
    ///
    /// The parser reports `-1` for synthesized nodes; those yield `None`.
    pub fn location(&self) -> Option<i32> {
        match self {
            VetError::TableUnavailable { location, .. }
            | VetError::ColumnNotFound { location, .. } => (*location >= 0).then_some(*location),
            VetError::Context { source, .. } => source.location(),
            _ => None,
        }
    }
}
