use crate::error::{QueryResult, StatementKind};
use crate::value::Value;

/// SQL text plus its flattened bindings, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

impl BuiltQuery {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// Something that renders to a parameterized statement.
///
/// Rendering is deterministic: building twice without changing the builder yields identical
/// SQL text, which is what the statement cache keys on.
pub trait Statement {
    fn kind(&self) -> StatementKind;

    /// Render SQL and bindings, surfacing any error recorded while clauses were added.
    fn build(&self) -> QueryResult<BuiltQuery>;

    fn to_sql(&self) -> QueryResult<String> {
        Ok(self.build()?.sql)
    }

    fn bindings(&self) -> QueryResult<Vec<Value>> {
        Ok(self.build()?.params)
    }
}
