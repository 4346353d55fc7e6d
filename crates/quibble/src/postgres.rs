//! PostgreSQL adapter over `tokio-postgres`.
//!
//! Statements are written with `?` placeholders; they are renumbered to `$1..$n` when
//! prepared. Text values bound to typed parameters (integers, booleans, timestamps, uuids,
//! json) are parsed into that type, and such columns decode back to [`Value`]s. Other
//! parameter types (numeric, interval, inet, ...) are rejected at bind time.

use crate::connection::{Connection, RowStream};
use crate::error::DriverError;
use crate::qb::placeholder_offsets;
use crate::row::Row;
use crate::value::{TypeHint, Value};
use bytes::BytesMut;
use futures_core::Stream;
use std::error::Error;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_postgres::{Client, Statement};

/// A PostgreSQL connection.
///
/// ```ignore
/// let (client, connection) = tokio_postgres::connect(&database_url, NoTls).await?;
/// tokio::spawn(async move { let _ = connection.await; });
/// let client = quibble::Client::new(PgConnection::new(client));
/// ```
pub struct PgConnection {
    client: Client,
}

impl PgConnection {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn into_inner(self) -> Client {
        self.client
    }
}

impl std::fmt::Debug for PgConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgConnection")
            .field("closed", &self.client.is_closed())
            .finish()
    }
}

/// Rewrite `?` placeholders to `$1..$n`, leaving quoted literals and identifiers alone.
///
/// Uses the same scan as the binding weaver, so `$n` lines up with the bound values.
pub fn to_numbered_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut last = 0;
    for (n, offset) in placeholder_offsets(sql).into_iter().enumerate() {
        out.push_str(&sql[last..offset]);
        out.push('$');
        out.push_str(&(n + 1).to_string());
        last = offset + 1;
    }
    out.push_str(&sql[last..]);
    out
}

fn params(values: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    values.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

fn column_names(stmt: &Statement) -> Arc<[String]> {
    stmt.columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect::<Vec<_>>()
        .into()
}

impl Connection for PgConnection {
    type Prepared = Statement;

    async fn prepare(&self, sql: &str) -> Result<Statement, DriverError> {
        Ok(self.client.prepare(&to_numbered_placeholders(sql)).await?)
    }

    async fn query(&self, stmt: &Statement, values: &[Value]) -> Result<Vec<Row>, DriverError> {
        let rows = self.client.query(stmt, &params(values)).await?;
        let columns = column_names(stmt);
        rows.iter().map(|row| decode_row(row, &columns)).collect()
    }

    async fn execute(&self, stmt: &Statement, values: &[Value]) -> Result<u64, DriverError> {
        Ok(self.client.execute(stmt, &params(values)).await?)
    }

    async fn query_stream(
        &self,
        stmt: &Statement,
        values: Vec<Value>,
    ) -> Result<RowStream, DriverError> {
        let stream = self.client.query_raw(stmt, values.iter()).await?;
        Ok(RowStream::new(PgRowStream {
            inner: Box::pin(stream),
            columns: column_names(stmt),
        }))
    }
}

struct PgRowStream {
    inner: Pin<Box<tokio_postgres::RowStream>>,
    columns: Arc<[String]>,
}

impl Stream for PgRowStream {
    type Item = Result<Row, DriverError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(row))) => Poll::Ready(Some(decode_row(&row, &self.columns))),
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e.into()))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

fn decode_row(row: &tokio_postgres::Row, columns: &Arc<[String]>) -> Result<Row, DriverError> {
    let values = row
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| decode_value(row, idx, column.type_()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Row::new(Arc::clone(columns), values))
}

fn decode_value(row: &tokio_postgres::Row, idx: usize, ty: &Type) -> Result<Value, DriverError> {
    let value = if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(idx)?.map(Value::Bool)
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(idx)?.map(Value::from)
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(idx)?.map(Value::from)
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(idx)?.map(Value::Int)
    } else if *ty == Type::OID {
        row.try_get::<_, Option<u32>>(idx)?.map(Value::from)
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(idx)?.map(Value::from)
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(idx)?.map(Value::Float)
    } else if *ty == Type::BYTEA {
        row.try_get::<_, Option<Vec<u8>>>(idx)?.map(Value::Blob)
    } else if *ty == Type::TIMESTAMP {
        row.try_get::<_, Option<chrono::NaiveDateTime>>(idx)?
            .map(|v| Value::Text(v.to_string()))
    } else if *ty == Type::TIMESTAMPTZ {
        row.try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx)?
            .map(|v| Value::Text(v.to_rfc3339()))
    } else if *ty == Type::DATE {
        row.try_get::<_, Option<chrono::NaiveDate>>(idx)?
            .map(|v| Value::Text(v.to_string()))
    } else if *ty == Type::TIME {
        row.try_get::<_, Option<chrono::NaiveTime>>(idx)?
            .map(|v| Value::Text(v.to_string()))
    } else if *ty == Type::UUID {
        row.try_get::<_, Option<uuid::Uuid>>(idx)?
            .map(|v| Value::Text(v.to_string()))
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        row.try_get::<_, Option<serde_json::Value>>(idx)?
            .map(|v| Value::Text(v.to_string()))
    } else {
        row.try_get::<_, Option<String>>(idx)
            .map_err(|_| DriverError::new(format!("unsupported column type `{ty}`")))?
            .map(Value::Text)
    };
    Ok(value.unwrap_or(Value::Null))
}

type BoxError = Box<dyn Error + Sync + Send>;

fn int_to_sql(v: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if *ty == Type::INT2 {
        i16::try_from(v)?.to_sql(ty, out)
    } else if *ty == Type::INT4 {
        i32::try_from(v)?.to_sql(ty, out)
    } else if *ty == Type::OID {
        u32::try_from(v)?.to_sql(ty, out)
    } else if *ty == Type::FLOAT4 {
        (v as f32).to_sql(ty, out)
    } else if *ty == Type::FLOAT8 {
        (v as f64).to_sql(ty, out)
    } else if *ty == Type::BOOL {
        (v != 0).to_sql(ty, out)
    } else if *ty == Type::INT8 {
        v.to_sql(ty, out)
    } else {
        text_to_sql(&v.to_string(), ty, out)
    }
}

fn float_to_sql(v: f64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if *ty == Type::FLOAT4 {
        (v as f32).to_sql(ty, out)
    } else if *ty == Type::FLOAT8 {
        v.to_sql(ty, out)
    } else {
        text_to_sql(&v.to_string(), ty, out)
    }
}

fn bool_to_sql(v: bool, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if *ty == Type::BOOL {
        v.to_sql(ty, out)
    } else {
        int_to_sql(i64::from(v), ty, out)
    }
}

/// Coerce the string form of a value into the parameter's type.
fn text_to_sql(s: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if *ty == Type::INT2 || *ty == Type::INT4 || *ty == Type::INT8 || *ty == Type::OID {
        int_to_sql(s.trim().parse::<i64>()?, ty, out)
    } else if *ty == Type::FLOAT4 {
        s.trim().parse::<f32>()?.to_sql(ty, out)
    } else if *ty == Type::FLOAT8 {
        s.trim().parse::<f64>()?.to_sql(ty, out)
    } else if *ty == Type::BOOL {
        let v = match s.trim() {
            "1" | "t" | "true" | "TRUE" => true,
            "0" | "f" | "false" | "FALSE" | "" => false,
            other => return Err(format!("invalid boolean `{other}`").into()),
        };
        v.to_sql(ty, out)
    } else if *ty == Type::TIMESTAMP {
        s.parse::<chrono::NaiveDateTime>()?.to_sql(ty, out)
    } else if *ty == Type::TIMESTAMPTZ {
        s.parse::<chrono::DateTime<chrono::Utc>>()?.to_sql(ty, out)
    } else if *ty == Type::DATE {
        s.parse::<chrono::NaiveDate>()?.to_sql(ty, out)
    } else if *ty == Type::UUID {
        s.parse::<uuid::Uuid>()?.to_sql(ty, out)
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out)
    } else if *ty == Type::BYTEA {
        s.as_bytes().to_sql(ty, out)
    } else if <&str as ToSql>::accepts(ty) {
        s.to_sql(ty, out)
    } else {
        Err(format!("unsupported parameter type `{ty}`").into())
    }
}

/// Binds by [`Value::type_hint`]: NULL, a boolean, or the value coerced into the parameter's
/// type. Integers and floats take the direct path to numeric parameters, which encodes the
/// same as parsing their string form.
impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self.type_hint() {
            TypeHint::Null => Ok(IsNull::Yes),
            TypeHint::Bool => bool_to_sql(matches!(self, Value::Bool(true)), ty, out),
            TypeHint::Str => match self {
                Value::Int(v) => int_to_sql(*v, ty, out),
                Value::Float(v) => float_to_sql(*v, ty, out),
                Value::Blob(b) if *ty == Type::BYTEA => b.as_slice().to_sql(ty, out),
                other => text_to_sql(&other.to_text().unwrap_or_default(), ty, out),
            },
        }
    }

    // NULL binds to any parameter; unsupported types are rejected by `to_sql`.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}
