//! Error types for quibble

use crate::value::Value;
use std::fmt;
use thiserror::Error;

/// Result type alias for quibble operations
pub type QueryResult<T> = Result<T, QueryError>;

/// The kind of statement an error or execution belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Group,
}

impl StatementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Group => "group",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostics attached to execution-time errors: the SQL that ran and what was bound to it.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementContext {
    pub kind: StatementKind,
    pub sql: String,
    pub bindings: Vec<Value>,
    /// Index of the failing row for multi-row inserts.
    pub row: Option<usize>,
}

impl StatementContext {
    pub fn new(kind: StatementKind, sql: impl Into<String>, bindings: Vec<Value>) -> Self {
        Self {
            kind,
            sql: sql.into(),
            bindings,
            row: None,
        }
    }

    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }
}

impl fmt::Display for StatementContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` (", self.sql)?;
        for (i, value) in self.bindings.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str(")")?;
        if let Some(row) = self.row {
            write!(f, " at row {row}")?;
        }
        Ok(())
    }
}

/// Error reported by a database driver, mirroring its `(sql_state, code, message)` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    pub sql_state: Option<String>,
    pub code: Option<String>,
    pub message: String,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            sql_state: None,
            code: None,
            message: message.into(),
        }
    }

    pub fn with_sql_state(mut self, sql_state: impl Into<String>) -> Self {
        self.sql_state = Some(sql_state.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl std::error::Error for DriverError {}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.sql_state, &self.code) {
            (Some(state), Some(code)) => write!(f, "{state} / {code}: {}", self.message),
            (Some(tag), None) | (None, Some(tag)) => write!(f, "{tag}: {}", self.message),
            (None, None) => f.write_str(&self.message),
        }
    }
}

/// Malformed join descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("join direction already set to {0}")]
    DirectionAlreadySet(&'static str),

    #[error("join has no table")]
    MissingTable,

    #[error("join on `{0}` has no USING or ON condition")]
    MissingCondition(String),
}

/// Error types for statement building and execution
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    /// The driver rejected the SQL text at prepare time
    #[error("Preparation error for `{sql}`: {source}")]
    Preparation {
        sql: String,
        #[source]
        source: DriverError,
    },

    /// The driver failed while executing a prepared statement
    #[error("{} execution error: {source} in {context}", .context.kind)]
    Execution {
        context: Box<StatementContext>,
        #[source]
        source: DriverError,
    },

    /// A select produced no rows
    #[error("{} returned no rows: {context}", .context.kind)]
    EmptyResult { context: Box<StatementContext> },

    /// A write statement ran but affected no rows
    #[error("{} affected no rows: {context}", .context.kind)]
    NoAffectedRows { context: Box<StatementContext> },

    /// Malformed join
    #[error("Join error: {0}")]
    Join(#[from] JoinError),

    /// A predicate group was handed to the executor
    #[error("Cannot get a statement for a group")]
    GroupNotExecutable,

    /// Builder misuse caught before anything reached the driver
    #[error("Build error: {0}")]
    Build(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },
}

impl QueryError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a build error
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build(message.into())
    }

    pub fn preparation(sql: impl Into<String>, source: DriverError) -> Self {
        Self::Preparation {
            sql: sql.into(),
            source,
        }
    }

    pub fn execution(context: StatementContext, source: DriverError) -> Self {
        Self::Execution {
            context: Box::new(context),
            source,
        }
    }

    pub fn empty_result(context: StatementContext) -> Self {
        Self::EmptyResult {
            context: Box::new(context),
        }
    }

    pub fn no_affected_rows(context: StatementContext) -> Self {
        Self::NoAffectedRows {
            context: Box::new(context),
        }
    }

    pub fn is_preparation(&self) -> bool {
        matches!(self, Self::Preparation { .. })
    }

    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }

    pub fn is_empty_result(&self) -> bool {
        matches!(self, Self::EmptyResult { .. })
    }

    pub fn is_no_affected_rows(&self) -> bool {
        matches!(self, Self::NoAffectedRows { .. })
    }

    pub fn is_join(&self) -> bool {
        matches!(self, Self::Join(_))
    }

    /// Errors the silent error mode may turn into a falsy result.
    ///
    /// Preparation failures and builder misuse are never recoverable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Execution { .. } | Self::EmptyResult { .. } | Self::NoAffectedRows { .. }
        )
    }

    /// Execution context, if this error happened after the statement was built.
    pub fn context(&self) -> Option<&StatementContext> {
        match self {
            Self::Execution { context, .. }
            | Self::EmptyResult { context }
            | Self::NoAffectedRows { context } => Some(context),
            _ => None,
        }
    }

    pub fn statement_kind(&self) -> Option<StatementKind> {
        match self {
            Self::GroupNotExecutable => Some(StatementKind::Group),
            _ => self.context().map(|ctx| ctx.kind),
        }
    }
}

#[cfg(feature = "postgres")]
impl From<tokio_postgres::Error> for DriverError {
    fn from(err: tokio_postgres::Error) -> Self {
        match err.as_db_error() {
            Some(db_err) => {
                DriverError::new(db_err.message()).with_sql_state(db_err.code().code())
            }
            None => DriverError::new(err.to_string()),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for DriverError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(ffi_err, message) => {
                let message = message.clone().unwrap_or_else(|| ffi_err.to_string());
                DriverError::new(message).with_code(ffi_err.extended_code.to_string())
            }
            _ => DriverError::new(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_error_display_follows_error_info() {
        let err = DriverError::new("no such table: nope")
            .with_sql_state("HY000")
            .with_code("1");
        assert_eq!(err.to_string(), "HY000 / 1: no such table: nope");
        assert_eq!(DriverError::new("boom").to_string(), "boom");
    }

    #[test]
    fn context_lists_bindings() {
        let ctx = StatementContext::new(
            StatementKind::Delete,
            "DELETE FROM test WHERE (id = ?)",
            vec![Value::Int(999)],
        );
        let err = QueryError::no_affected_rows(ctx);
        assert_eq!(
            err.to_string(),
            "delete affected no rows: `DELETE FROM test WHERE (id = ?)` (999)"
        );
        assert!(err.is_recoverable());
        assert_eq!(err.statement_kind(), Some(StatementKind::Delete));
    }

    #[test]
    fn preparation_is_not_recoverable() {
        let err = QueryError::preparation("SELEC 1", DriverError::new("syntax error"));
        assert!(err.is_preparation());
        assert!(!err.is_recoverable());
        assert_eq!(err.statement_kind(), None);
    }

    #[test]
    fn row_context_is_rendered() {
        let ctx = StatementContext::new(StatementKind::Insert, "INSERT", vec![]).with_row(2);
        assert_eq!(ctx.to_string(), "`INSERT` () at row 2");
    }
}
