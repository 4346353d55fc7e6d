//! SQLite adapter over `rusqlite`.
//!
//! The connection is guarded by a mutex and every call runs synchronously inside the returned
//! future. Row streams are buffered.

use crate::connection::Connection;
use crate::error::DriverError;
use crate::row::Row;
use crate::value::{TypeHint, Value};
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{ToSql, params_from_iter};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A SQLite connection.
pub struct SqliteConnection {
    conn: Mutex<rusqlite::Connection>,
}

/// A statement accepted by SQLite at prepare time.
///
/// rusqlite statements borrow their connection, so the handle keeps the SQL text and the
/// result column names; execution goes through the connection's own statement cache.
#[derive(Debug, Clone)]
pub struct SqlitePrepared {
    sql: Arc<str>,
    columns: Arc<[String]>,
}

impl SqlitePrepared {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl SqliteConnection {
    pub fn new(conn: rusqlite::Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, DriverError> {
        Ok(Self::new(rusqlite::Connection::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self, DriverError> {
        Ok(Self::new(rusqlite::Connection::open_in_memory()?))
    }

    /// Run one or more `;`-separated statements without parameters (schema setup, pragmas).
    pub fn execute_batch(&self, sql: &str) -> Result<(), DriverError> {
        Ok(self.lock().execute_batch(sql)?)
    }

    fn lock(&self) -> MutexGuard<'_, rusqlite::Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn prepare_sync(&self, sql: &str) -> Result<SqlitePrepared, DriverError> {
        let conn = self.lock();
        let stmt = conn.prepare_cached(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        Ok(SqlitePrepared {
            sql: Arc::from(sql),
            columns: columns.into(),
        })
    }

    fn query_sync(
        &self,
        prepared: &SqlitePrepared,
        params: &[Value],
    ) -> Result<Vec<Row>, DriverError> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(&prepared.sql)?;
        let width = prepared.columns.len();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let values = (0..width)
                .map(|idx| row.get_ref(idx).map(decode_value))
                .collect::<Result<Vec<_>, _>>()?;
            out.push(Row::new(Arc::clone(&prepared.columns), values));
        }
        Ok(out)
    }

    fn execute_sync(
        &self,
        prepared: &SqlitePrepared,
        params: &[Value],
    ) -> Result<u64, DriverError> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(&prepared.sql)?;
        let affected = stmt.execute(params_from_iter(params.iter()))?;
        Ok(affected as u64)
    }
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection").finish_non_exhaustive()
    }
}

impl Connection for SqliteConnection {
    type Prepared = SqlitePrepared;

    async fn prepare(&self, sql: &str) -> Result<SqlitePrepared, DriverError> {
        self.prepare_sync(sql)
    }

    async fn query(
        &self,
        stmt: &SqlitePrepared,
        params: &[Value],
    ) -> Result<Vec<Row>, DriverError> {
        self.query_sync(stmt, params)
    }

    async fn execute(&self, stmt: &SqlitePrepared, params: &[Value]) -> Result<u64, DriverError> {
        self.execute_sync(stmt, params)
    }
}

fn decode_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(r) => Value::Float(r),
        ValueRef::Text(items) => Value::Text(String::from_utf8_lossy(items).into_owned()),
        ValueRef::Blob(items) => Value::Blob(items.to_vec()),
    }
}

/// Binds by [`Value::type_hint`]. SQLite has no boolean storage class, so booleans bind as
/// 0/1. String-hinted values keep their storage class and the column's affinity coerces them.
impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let out = match self.type_hint() {
            TypeHint::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            TypeHint::Bool => ToSqlOutput::Owned(rusqlite::types::Value::Integer(i64::from(
                matches!(self, Value::Bool(true)),
            ))),
            TypeHint::Str => match self {
                Value::Int(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
                Value::Float(f) => ToSqlOutput::Borrowed(ValueRef::Real(*f)),
                Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
                Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b.as_slice())),
                other => ToSqlOutput::Owned(rusqlite::types::Value::Text(
                    other.to_text().unwrap_or_default(),
                )),
            },
        };
        Ok(out)
    }
}
