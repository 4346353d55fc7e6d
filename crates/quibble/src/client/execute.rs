use super::Client;
use super::config::ErrorMode;
use super::statement_cache::StmtCacheProbe;
use crate::connection::{Connection, RowStream};
use crate::error::{QueryError, QueryResult, StatementContext, StatementKind};
use crate::qb::{BuiltQuery, Statement};
use crate::row::Row;

impl<C: Connection> Client<C> {
    fn probe_stmt_cache(&self, sql: &str) -> StmtCacheProbe<C::Prepared> {
        let Some(cache) = &self.statement_cache else {
            return StmtCacheProbe::Disabled;
        };
        match cache.get(sql) {
            Some(stmt) => StmtCacheProbe::Hit(stmt),
            None => StmtCacheProbe::Miss,
        }
    }

    /// Get a prepared statement for `sql`, from the cache or the driver.
    ///
    /// Preparation failures are returned regardless of [`ErrorMode`].
    pub async fn prepare(&self, sql: &str) -> QueryResult<C::Prepared> {
        match self.probe_stmt_cache(sql) {
            StmtCacheProbe::Hit(stmt) => {
                tracing::trace!(target: "quibble.sql", sql = %sql, "statement cache hit");
                Ok(stmt)
            }
            StmtCacheProbe::Miss => {
                tracing::trace!(target: "quibble.sql", sql = %sql, "statement cache miss");
                let stmt = self.prepare_uncached(sql).await?;
                match &self.statement_cache {
                    Some(cache) => Ok(cache.insert_if_absent(sql.to_string(), stmt)),
                    None => Ok(stmt),
                }
            }
            StmtCacheProbe::Disabled => self.prepare_uncached(sql).await,
        }
    }

    async fn prepare_uncached(&self, sql: &str) -> QueryResult<C::Prepared> {
        self.conn
            .prepare(sql)
            .await
            .map_err(|source| QueryError::preparation(sql, source))
    }

    /// Build, prepare and run a statement, returning every row.
    pub async fn query<S: Statement + ?Sized>(&self, statement: &S) -> QueryResult<Vec<Row>> {
        let (kind, built) = executable(statement)?;
        self.query_built(kind, &built).await
    }

    /// Build, prepare and run a statement, returning the number of affected rows.
    pub async fn execute<S: Statement + ?Sized>(&self, statement: &S) -> QueryResult<u64> {
        let (kind, built) = executable(statement)?;
        self.execute_built(kind, &built).await
    }

    /// Build, prepare and run a statement, returning its rows as a stream.
    pub async fn query_stream<S: Statement + ?Sized>(
        &self,
        statement: &S,
    ) -> QueryResult<RowStream> {
        let (kind, built) = executable(statement)?;
        self.query_stream_built(kind, built).await
    }

    pub(crate) async fn query_built(
        &self,
        kind: StatementKind,
        built: &BuiltQuery,
    ) -> QueryResult<Vec<Row>> {
        let stmt = self.prepare(&built.sql).await?;
        log_execution(kind, built);
        self.conn
            .query(&stmt, &built.params)
            .await
            .map_err(|source| QueryError::execution(context(kind, built), source))
    }

    pub(crate) async fn execute_built(
        &self,
        kind: StatementKind,
        built: &BuiltQuery,
    ) -> QueryResult<u64> {
        let stmt = self.prepare(&built.sql).await?;
        self.execute_prepared(kind, &stmt, built).await
    }

    /// Run an already prepared statement. `built.sql` must be the text `stmt` was prepared from.
    pub(crate) async fn execute_prepared(
        &self,
        kind: StatementKind,
        stmt: &C::Prepared,
        built: &BuiltQuery,
    ) -> QueryResult<u64> {
        log_execution(kind, built);
        self.conn
            .execute(stmt, &built.params)
            .await
            .map_err(|source| QueryError::execution(context(kind, built), source))
    }

    pub(crate) async fn query_stream_built(
        &self,
        kind: StatementKind,
        built: BuiltQuery,
    ) -> QueryResult<RowStream> {
        let stmt = self.prepare(&built.sql).await?;
        log_execution(kind, &built);
        let ctx = context(kind, &built);
        self.conn
            .query_stream(&stmt, built.params)
            .await
            .map_err(|source| QueryError::execution(ctx, source))
    }

    /// Apply the error mode: in silent mode a recoverable error becomes `fallback()`.
    pub(crate) fn settle<T>(
        &self,
        result: QueryResult<T>,
        fallback: impl FnOnce() -> T,
    ) -> QueryResult<T> {
        match result {
            Err(err) if self.config.error_mode == ErrorMode::Silent && err.is_recoverable() => {
                tracing::warn!(
                    target: "quibble.sql",
                    kind = ?err.statement_kind(),
                    error = %err,
                    "suppressed in silent error mode"
                );
                Ok(fallback())
            }
            other => other,
        }
    }
}

/// Reject groups, then render.
fn executable<S: Statement + ?Sized>(statement: &S) -> QueryResult<(StatementKind, BuiltQuery)> {
    let kind = statement.kind();
    if kind == StatementKind::Group {
        return Err(QueryError::GroupNotExecutable);
    }
    Ok((kind, statement.build()?))
}

fn context(kind: StatementKind, built: &BuiltQuery) -> StatementContext {
    StatementContext::new(kind, built.sql.clone(), built.params.clone())
}

fn log_execution(kind: StatementKind, built: &BuiltQuery) {
    tracing::debug!(
        target: "quibble.sql",
        kind = %kind,
        param_count = built.params.len(),
        sql = %built.sql,
        "execute"
    );
}
