//! Lazy row streams produced by [`Select::generate`](crate::Select::generate).

use crate::connection::RowStream;
use crate::error::{QueryError, QueryResult, StatementContext};
use crate::qb::decorate::{self, Decorator};
use crate::row::Row;
use futures_core::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Forward-only stream of decorated rows.
///
/// Holds the driver cursor open until it is exhausted or dropped. Once a driver error has
/// been seen the stream is finished; in silent error mode the error is logged and the stream
/// simply ends.
pub struct SelectStream {
    inner: Option<RowStream>,
    decorators: Vec<Decorator>,
    context: StatementContext,
    silent: bool,
}

impl SelectStream {
    pub(crate) fn new(
        inner: Option<RowStream>,
        decorators: Vec<Decorator>,
        context: StatementContext,
        silent: bool,
    ) -> Self {
        Self {
            inner,
            decorators,
            context,
            silent,
        }
    }

    /// The SQL and bindings this stream was produced from.
    pub fn context(&self) -> &StatementContext {
        &self.context
    }
}

impl Stream for SelectStream {
    type Item = QueryResult<Row>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };

        match Pin::new(inner).poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(None) => {
                this.inner = None;
                Poll::Ready(None)
            }
            Poll::Ready(Some(Ok(row))) => {
                Poll::Ready(Some(Ok(decorate::apply(&this.decorators, row))))
            }
            Poll::Ready(Some(Err(source))) => {
                this.inner = None;
                let err = QueryError::execution(this.context.clone(), source);
                if this.silent {
                    tracing::warn!(
                        target: "quibble.sql",
                        error = %err,
                        "row stream ended early in silent error mode"
                    );
                    Poll::Ready(None)
                } else {
                    Poll::Ready(Some(Err(err)))
                }
            }
        }
    }
}

impl std::fmt::Debug for SelectStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectStream")
            .field("finished", &self.inner.is_none())
            .field("sql", &self.context.sql)
            .finish()
    }
}
