/// How recoverable failures are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Empty results, zero affected rows and execution failures become falsy return values
    /// (`None`, an empty `Vec`, `false`, `0`).
    #[default]
    Silent,
    /// The same conditions are returned as errors carrying the SQL and bindings.
    Strict,
}

/// Configuration for [`Client`](super::Client).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Error reporting mode, fixed for the lifetime of the client.
    pub error_mode: ErrorMode,
    /// Prepared statement cache configuration (per-connection).
    pub statement_cache: StatementCacheConfig,
}

/// Prepared statement cache configuration (per-connection).
#[derive(Debug, Clone)]
pub struct StatementCacheConfig {
    pub enabled: bool,
    pub capacity: usize,
}

impl Default for StatementCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 256,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Silent,
            statement_cache: StatementCacheConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Report empty results and zero affected rows as errors.
    pub fn strict(mut self) -> Self {
        self.error_mode = ErrorMode::Strict;
        self
    }

    /// Report empty results and zero affected rows as falsy values.
    pub fn silent(mut self) -> Self {
        self.error_mode = ErrorMode::Silent;
        self
    }

    /// Set the statement cache capacity. A capacity of 0 disables caching.
    pub fn statement_cache(mut self, cap: usize) -> Self {
        self.statement_cache = StatementCacheConfig {
            enabled: cap > 0,
            capacity: cap,
        };
        self
    }

    /// Disable prepared statement caching.
    pub fn no_statement_cache(mut self) -> Self {
        self.statement_cache.enabled = false;
        self
    }
}
