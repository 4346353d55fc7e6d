//! # quibble
//!
//! A fluent SQL statement builder with placeholder-aligned parameter binding.
//!
//! ## Features
//!
//! - **Caller-written SQL**: fragments are plain strings with `?` placeholders
//! - **Aligned bindings**: every clause weaves its values into a phase-ordered ledger, so the
//!   flattened binding list always matches the `?` order of the rendered SQL
//! - **Raw values and sub-selects**: [`Raw`] is inlined verbatim; a [`Select`] passed as a
//!   value is spliced in together with its own bindings
//! - **Fully parenthesized predicates**: AND/OR chains and nested [`Group`]s render with
//!   explicit precedence
//! - **Statement cache**: prepared handles are reused by SQL text
//! - **Error modes**: [`ErrorMode::Silent`] reports empty results and zero affected rows as
//!   falsy values; [`ErrorMode::Strict`] reports them as [`QueryError`]s
//!
//! ## Example
//!
//! ```ignore
//! use quibble::{Client, ClientConfig, Delete, Select, SqliteConnection};
//!
//! let client = Client::with_config(SqliteConnection::open_in_memory()?, ClientConfig::new());
//!
//! let rows = Select::new("test")
//!     .and_where("id = ?", 1)
//!     .or_where("id = ? AND foo = ?", (2, "baz"))
//!     .fetch_all(&client)
//!     .await?;
//!
//! let n = Select::new("test").count(&client).await?;
//!
//! let deleted = Delete::new("test")
//!     .and_where("id = ?", 999)
//!     .execute(&client)
//!     .await?; // false: nothing matched
//! ```

pub mod client;
pub mod connection;
pub mod error;
pub mod qb;
pub mod row;
pub mod stream;
pub mod value;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use client::{Client, ClientConfig, ErrorMode, StatementCacheConfig};
pub use connection::{Connection, RowStream};
pub use error::{
    DriverError, JoinError, QueryError, QueryResult, StatementContext, StatementKind,
};
pub use qb::{
    Bindable, Bindings, BuiltQuery, Decorator, Delete, Group, Insert, IntoBindings, Join,
    JoinType, Junction, Phase, Raw, Select, Statement, TableRef, Update, raw,
};
pub use row::{FromRow, FromValue, Row};
pub use stream::SelectStream;
pub use value::{TypeHint, Value};

#[cfg(feature = "postgres")]
pub use postgres::PgConnection;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteConnection;
