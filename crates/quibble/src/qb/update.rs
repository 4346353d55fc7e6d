use crate::client::Client;
use crate::connection::Connection;
use crate::error::{QueryError, QueryResult, StatementContext, StatementKind};
use crate::qb::bindings::{Bindable, Bindings, Phase};
use crate::qb::group::{Predicates, record, where_methods};
use crate::qb::traits::{BuiltQuery, Statement};

/// UPDATE statement builder.
///
/// SET values bind into the values phase, so they always precede WHERE values:
///
/// ```ignore
/// Update::new("test")
///     .set("foo", "qux")
///     .set_raw("updated_at", "CURRENT_TIMESTAMP")
///     .and_where("id = ?", 1)
///     .execute(&client)
///     .await?;
/// // UPDATE test SET foo = ?, updated_at = CURRENT_TIMESTAMP WHERE (id = ?)
/// ```
#[derive(Debug, Clone)]
pub struct Update {
    table: String,
    assignments: Vec<String>,
    where_clause: Predicates,
    bindings: Bindings,
    build_error: Option<QueryError>,
}

impl Update {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            assignments: Vec::new(),
            where_clause: Predicates::default(),
            bindings: Bindings::new(),
            build_error: None,
        }
    }

    /// `column = ?`
    pub fn set(mut self, column: &str, value: impl Into<Bindable>) -> Self {
        let result = self
            .bindings
            .weave(Phase::Values, "?", vec![value.into()])
            .map(|sql| self.assignments.push(format!("{column} = {sql}")));
        record(&mut self.build_error, result);
        self
    }

    /// `column = <expr>` with `expr` written verbatim.
    pub fn set_raw(mut self, column: &str, expr: &str) -> Self {
        self.assignments.push(format!("{column} = {expr}"));
        self
    }

    pub fn values<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Bindable>,
    {
        for (column, value) in values {
            self = self.set(column.as_ref(), value);
        }
        self
    }

    where_methods!(where_clause);

    /// Execute the update. Zero affected rows is an error in strict mode and `Ok(false)`
    /// otherwise.
    pub async fn execute<C: Connection>(&self, client: &Client<C>) -> QueryResult<bool> {
        let built = self.build()?;
        let result = client
            .execute_built(StatementKind::Update, &built)
            .await
            .and_then(|affected| {
                if affected == 0 {
                    return Err(QueryError::no_affected_rows(StatementContext::new(
                        StatementKind::Update,
                        built.sql.clone(),
                        built.params.clone(),
                    )));
                }
                Ok(true)
            });
        client.settle(result, || false)
    }
}

impl Statement for Update {
    fn kind(&self) -> StatementKind {
        StatementKind::Update
    }

    fn build(&self) -> QueryResult<BuiltQuery> {
        if let Some(err) = &self.build_error {
            return Err(err.clone());
        }
        if self.assignments.is_empty() {
            return Err(QueryError::build(format!(
                "UPDATE {} requires at least one SET assignment",
                self.table
            )));
        }
        let mut sql = format!("UPDATE {} SET {}", self.table, self.assignments.join(", "));
        if !self.where_clause.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_clause.render());
        }
        Ok(BuiltQuery::new(sql, self.bindings.flatten()))
    }
}
