//! Driver contract consumed by the executor.

use crate::error::DriverError;
use crate::row::Row;
use crate::value::Value;
use futures_core::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A database connection able to prepare and run `?`-placeholder statements.
///
/// Parameters arrive already flattened in placeholder order; binding is positional and
/// 1-indexed from the driver's point of view.
pub trait Connection: Send + Sync {
    /// A prepared statement handle. Cloned out of the statement cache on every hit.
    type Prepared: Clone + Send + Sync + 'static;

    fn prepare(
        &self,
        sql: &str,
    ) -> impl std::future::Future<Output = Result<Self::Prepared, DriverError>> + Send;

    /// Run a prepared statement and return every row.
    fn query(
        &self,
        stmt: &Self::Prepared,
        params: &[Value],
    ) -> impl std::future::Future<Output = Result<Vec<Row>, DriverError>> + Send;

    /// Run a prepared statement and return the number of affected rows.
    fn execute(
        &self,
        stmt: &Self::Prepared,
        params: &[Value],
    ) -> impl std::future::Future<Output = Result<u64, DriverError>> + Send;

    /// Run a prepared statement and return its rows as a stream.
    ///
    /// The default implementation buffers [`Connection::query`].
    fn query_stream(
        &self,
        stmt: &Self::Prepared,
        params: Vec<Value>,
    ) -> impl std::future::Future<Output = Result<RowStream, DriverError>> + Send {
        async move {
            let rows = self.query(stmt, &params).await?;
            Ok(RowStream::from_rows(rows))
        }
    }
}

/// A type-erased stream of rows.
pub struct RowStream {
    inner: Pin<Box<dyn Stream<Item = Result<Row, DriverError>> + Send>>,
}

impl RowStream {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Row, DriverError>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// A stream over rows that were already fetched.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self::new(BufferedRows(rows.into_iter()))
    }
}

impl std::fmt::Debug for RowStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowStream").finish_non_exhaustive()
    }
}

impl Stream for RowStream {
    type Item = Result<Row, DriverError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

struct BufferedRows(std::vec::IntoIter<Row>);

impl Stream for BufferedRows {
    type Item = Result<Row, DriverError>;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.0.next().map(Ok))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}
