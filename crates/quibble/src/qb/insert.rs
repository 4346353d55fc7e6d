use crate::client::Client;
use crate::connection::Connection;
use crate::error::{QueryError, QueryResult, StatementContext, StatementKind};
use crate::qb::bindings::{Bindable, Bindings, Phase};
use crate::qb::group::record;
use crate::qb::traits::{BuiltQuery, Statement};

#[derive(Debug, Clone, Default)]
struct InsertRow {
    columns: Vec<String>,
    values: Vec<String>,
    bindings: Bindings,
}

impl InsertRow {
    fn set(&mut self, column: &str, value: Bindable) -> QueryResult<()> {
        if self.columns.iter().any(|c| c == column) {
            return Err(QueryError::build(format!(
                "column `{column}` set twice in one INSERT row"
            )));
        }
        let sql = self.bindings.weave(Phase::Values, "?", vec![value])?;
        self.columns.push(column.to_string());
        self.values.push(sql);
        Ok(())
    }

    fn build(&self, table: &str) -> QueryResult<BuiltQuery> {
        if self.columns.is_empty() {
            return Err(QueryError::build(format!(
                "INSERT INTO {table} requires at least one column"
            )));
        }
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            self.columns.join(", "),
            self.values.join(", ")
        );
        Ok(BuiltQuery::new(sql, self.bindings.flatten()))
    }
}

/// INSERT statement builder.
///
/// [`Raw`](crate::Raw) values are written into the VALUES list verbatim and bind nothing:
///
/// ```ignore
/// Insert::new("test")
///     .set("foo", "bar")
///     .set("created_at", raw("CURRENT_TIMESTAMP"))
///     .execute(&client)
///     .await?;
/// // INSERT INTO test (foo, created_at) VALUES (?, CURRENT_TIMESTAMP)
/// ```
///
/// Multiple rows are executed one statement per row:
///
/// ```ignore
/// Insert::new("test")
///     .row([("foo", "a")])
///     .row([("foo", "b")])
///     .execute(&client)
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Insert {
    table: String,
    rows: Vec<InsertRow>,
    build_error: Option<QueryError>,
}

impl Insert {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            rows: vec![InsertRow::default()],
            build_error: None,
        }
    }

    fn current_row(&mut self) -> &mut InsertRow {
        if self.rows.is_empty() {
            self.rows.push(InsertRow::default());
        }
        let last = self.rows.len() - 1;
        &mut self.rows[last]
    }

    /// Set a column on the current row.
    pub fn set(mut self, column: &str, value: impl Into<Bindable>) -> Self {
        let result = self.current_row().set(column, value.into());
        record(&mut self.build_error, result);
        self
    }

    /// Set several columns on the current row.
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

    /// Start a new row and fill it. The first call fills the initial row if it is still empty.
    pub fn row<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Bindable>,
    {
        if !self.current_row().columns.is_empty() {
            self.rows.push(InsertRow::default());
        }
        self.values(values)
    }

    pub fn row_count(&self) -> usize {
        self.rows.iter().filter(|r| !r.columns.is_empty()).count()
    }

    /// Render every row as its own statement.
    pub fn build_rows(&self) -> QueryResult<Vec<BuiltQuery>> {
        if let Some(err) = &self.build_error {
            return Err(err.clone());
        }
        self.rows.iter().map(|row| row.build(&self.table)).collect()
    }

    /// Execute every row, reusing the prepared statement while consecutive rows render the
    /// same SQL.
    ///
    /// Returns `Ok(true)` if at least one row was inserted. In strict mode the first row that
    /// fails or inserts nothing is returned as an error carrying its row index.
    pub async fn execute<C: Connection>(&self, client: &Client<C>) -> QueryResult<bool> {
        let rows = self.build_rows()?;
        let multi = rows.len() > 1;
        let mut prepared: Option<(&str, C::Prepared)> = None;
        let mut affected = 0u64;

        for (i, built) in rows.iter().enumerate() {
            let stmt = match &prepared {
                Some((sql, stmt)) if *sql == built.sql => stmt.clone(),
                _ => {
                    let stmt = client.prepare(&built.sql).await?;
                    prepared = Some((&built.sql, stmt.clone()));
                    stmt
                }
            };

            match client
                .execute_prepared(StatementKind::Insert, &stmt, built)
                .await
            {
                Ok(0) if client.is_strict() => {
                    let ctx = row_context(built, multi.then_some(i));
                    return Err(QueryError::no_affected_rows(ctx));
                }
                Ok(n) => affected += n,
                Err(err) if client.is_strict() || !err.is_recoverable() => {
                    return Err(at_row(err, multi.then_some(i)));
                }
                Err(err) => {
                    tracing::warn!(
                        target: "quibble.sql",
                        row = i,
                        error = %err,
                        "insert row failed in silent error mode"
                    );
                }
            }
        }

        if affected == 0 {
            let ctx = row_context(&rows[0], None);
            return client.settle(Err(QueryError::no_affected_rows(ctx)), || false);
        }
        Ok(true)
    }
}

fn row_context(built: &BuiltQuery, row: Option<usize>) -> StatementContext {
    let ctx = StatementContext::new(StatementKind::Insert, built.sql.clone(), built.params.clone());
    match row {
        Some(i) => ctx.with_row(i),
        None => ctx,
    }
}

fn at_row(mut err: QueryError, row: Option<usize>) -> QueryError {
    if let (QueryError::Execution { context, .. }, Some(i)) = (&mut err, row) {
        context.row = Some(i);
    }
    err
}

/// A single-row insert. Multi-row inserts must go through [`Insert::execute`] or
/// [`Insert::build_rows`].
impl Statement for Insert {
    fn kind(&self) -> StatementKind {
        StatementKind::Insert
    }

    fn build(&self) -> QueryResult<BuiltQuery> {
        let mut rows = self.build_rows()?;
        if rows.len() > 1 {
            return Err(QueryError::build(format!(
                "INSERT INTO {} has {} rows; run it with Insert::execute",
                self.table,
                rows.len()
            )));
        }
        rows.pop()
            .ok_or_else(|| QueryError::build("INSERT has no rows"))
    }
}
