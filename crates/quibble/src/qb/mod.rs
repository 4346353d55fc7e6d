//! Statement builders.
//!
//! Each clause call weaves its fragment into the builder's binding ledger right away, so a
//! builder always holds final SQL pieces plus bindings in placeholder order.
//!
//! # Usage
//!
//! ```ignore
//! use quibble::qb;
//!
//! // SELECT
//! let rows = qb::select("test")
//!     .and_where("id = ?", 1)
//!     .or_where("id = ? AND foo = ?", (2, "baz"))
//!     .fetch_all(&client)
//!     .await?;
//!
//! // INSERT
//! qb::insert("test")
//!     .set("foo", "bar")
//!     .execute(&client)
//!     .await?;
//!
//! // UPDATE
//! qb::update("test")
//!     .set("foo", "qux")
//!     .and_where("id = ?", 1)
//!     .execute(&client)
//!     .await?;
//!
//! // DELETE
//! qb::delete("test")
//!     .and_where("id = ?", 1)
//!     .execute(&client)
//!     .await?;
//! ```

mod bindings;
pub(crate) mod decorate;
mod delete;
mod group;
mod insert;
mod join;
mod select;
mod traits;
mod update;

pub use bindings::{Bindable, Bindings, IntoBindings, Phase, Raw, raw};
pub(crate) use bindings::placeholder_offsets;
pub use decorate::Decorator;
pub use delete::Delete;
pub use group::{Group, Junction};
pub use insert::Insert;
pub use join::{Join, JoinType, TableRef};
pub use select::Select;
pub use traits::{BuiltQuery, Statement};
pub use update::Update;

/// Create a SELECT builder for a table or sub-select.
pub fn select(table: impl Into<TableRef>) -> Select {
    Select::new(table)
}

/// Create an INSERT builder.
pub fn insert(table: &str) -> Insert {
    Insert::new(table)
}

/// Create an UPDATE builder.
pub fn update(table: &str) -> Update {
    Update::new(table)
}

/// Create a DELETE builder.
pub fn delete(table: &str) -> Delete {
    Delete::new(table)
}
