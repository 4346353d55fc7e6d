//! Statement executor.
//!
//! `Client` wraps a [`Connection`] with a prepared statement cache keyed by SQL text and a
//! fixed [`ErrorMode`]. Builders hand it their rendered SQL and flattened bindings.
//!
//! # Example
//!
//! ```ignore
//! use quibble::{Client, ClientConfig, Delete, SqliteConnection};
//!
//! let client = Client::with_config(
//!     SqliteConnection::open_in_memory()?,
//!     ClientConfig::new().strict().statement_cache(64),
//! );
//!
//! // Raises `QueryError::NoAffectedRows` under strict mode, returns `Ok(false)` otherwise.
//! let deleted = Delete::new("test").and_where("id = ?", 999).execute(&client).await?;
//! ```

pub mod config;
mod execute;
mod statement_cache;

pub use config::{ClientConfig, ErrorMode, StatementCacheConfig};

use crate::connection::Connection;
use statement_cache::StatementCache;


/// Executes statements against a connection, caching prepared handles by SQL text.
pub struct Client<C: Connection> {
    conn: C,
    statement_cache: Option<StatementCache<C::Prepared>>,
    config: ClientConfig,
}

impl<C: Connection> Client<C> {
    /// Create a client with the default configuration (silent errors, statement cache on).
    pub fn new(conn: C) -> Self {
        Self::with_config(conn, ClientConfig::default())
    }

    pub fn with_config(conn: C, config: ClientConfig) -> Self {
        let statement_cache = (config.statement_cache.enabled
            && config.statement_cache.capacity > 0)
            .then(|| StatementCache::new(config.statement_cache.capacity));

        Self {
            conn,
            statement_cache,
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn error_mode(&self) -> ErrorMode {
        self.config.error_mode
    }

    pub fn is_strict(&self) -> bool {
        self.config.error_mode == ErrorMode::Strict
    }

    /// Access the underlying connection.
    pub fn connection(&self) -> &C {
        &self.conn
    }

    pub fn into_inner(self) -> C {
        self.conn
    }

    /// Number of prepared statements currently cached.
    pub fn cached_statements(&self) -> usize {
        self.statement_cache.as_ref().map_or(0, StatementCache::len)
    }

    pub fn clear_statement_cache(&self) {
        if let Some(cache) = &self.statement_cache {
            cache.clear();
        }
    }
}

impl<C: Connection + std::fmt::Debug> std::fmt::Debug for Client<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("conn", &self.conn)
            .field("config", &self.config)
            .field("cached_statements", &self.cached_statements())
            .finish()
    }
}
