use crate::client::Client;
use crate::connection::Connection;
use crate::error::{QueryError, QueryResult, StatementContext, StatementKind};
use crate::qb::bindings::Bindings;
use crate::qb::group::{Predicates, where_methods};
use crate::qb::traits::{BuiltQuery, Statement};

/// DELETE statement builder.
#[derive(Debug, Clone)]
pub struct Delete {
    table: String,
    where_clause: Predicates,
    bindings: Bindings,
    allow_delete_all: bool,
    build_error: Option<QueryError>,
}

impl Delete {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            where_clause: Predicates::default(),
            bindings: Bindings::new(),
            allow_delete_all: false,
            build_error: None,
        }
    }

    /// Allow DELETE without WHERE (delete all rows).
    ///
    /// By default, DELETE without WHERE renders `WHERE 1=0` (no-op).
    pub fn allow_delete_all(mut self, allow: bool) -> Self {
        self.allow_delete_all = allow;
        self
    }

    where_methods!(where_clause);

    /// Execute the delete. Zero affected rows is an error in strict mode and `Ok(false)`
    /// otherwise.
    pub async fn execute<C: Connection>(&self, client: &Client<C>) -> QueryResult<bool> {
        let built = self.build()?;
        let result = client
            .execute_built(StatementKind::Delete, &built)
            .await
            .and_then(|affected| {
                if affected == 0 {
                    return Err(QueryError::no_affected_rows(StatementContext::new(
                        StatementKind::Delete,
                        built.sql.clone(),
                        built.params.clone(),
                    )));
                }
                Ok(true)
            });
        client.settle(result, || false)
    }
}

impl Statement for Delete {
    fn kind(&self) -> StatementKind {
        StatementKind::Delete
    }

    fn build(&self) -> QueryResult<BuiltQuery> {
        if let Some(err) = &self.build_error {
            return Err(err.clone());
        }
        if self.where_clause.is_empty() {
            let sql = if self.allow_delete_all {
                format!("DELETE FROM {}", self.table)
            } else {
                format!("DELETE FROM {} WHERE 1=0", self.table)
            };
            return Ok(BuiltQuery::new(sql, Vec::new()));
        }
        let sql = format!(
            "DELETE FROM {} WHERE {}",
            self.table,
            self.where_clause.render()
        );
        Ok(BuiltQuery::new(sql, self.bindings.flatten()))
    }
}
