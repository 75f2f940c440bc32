//! Error types for rampart-core.
//!
//! Every Rampart crate reports failures through this single [`Error`] enum so
//! that the adapter can attach operation context without re-boxing backend
//! errors of differing types.

/// Boxed source error carried by backend failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while persisting or loading policy rules.
///
/// All error variants are marked with `#[non_exhaustive]` to allow
/// adding new error types without breaking changes.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Backing store failure (driver, storage engine, blocking task).
    #[error("Store error: {message}")]
    Store {
        /// Human-readable error message
        message: String,
        /// Source error if available
        #[source]
        source: Option<BoxError>,
    },

    /// Row encode/decode failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database or table could not be created during adapter initialization.
    #[error("Failed to initialize {database}.{table}: {source}")]
    Init {
        /// Target database name
        database: String,
        /// Target table name
        table: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// An adapter operation failed against a specific table.
    #[error("{operation} on {table} failed: {source}")]
    Operation {
        /// Adapter operation name (e.g. `load_policy`)
        operation: &'static str,
        /// Qualified `database.table` name
        table: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// The named database does not exist.
    #[error("Database not found: {database}")]
    DatabaseNotFound {
        /// Database name that was not found
        database: String,
    },

    /// The named table does not exist in its database.
    #[error("Table not found: {database}.{table}")]
    TableNotFound {
        /// Database name
        database: String,
        /// Table name that was not found
        table: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// The store has been closed and can no longer serve requests.
    #[error("Store is closed")]
    Closed,
}

/// Convenience `Result` type alias for Rampart operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new store error with a message.
    pub fn store<S: Into<String>>(message: S) -> Self {
        Error::Store {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new store error with a message and source error.
    pub fn store_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: Into<BoxError>,
    {
        Error::Store {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Wraps this error as an initialization failure for `database.table`.
    pub fn into_init(self, database: &str, table: &str) -> Self {
        Error::Init {
            database: database.to_string(),
            table: table.to_string(),
            source: Box::new(self),
        }
    }

    /// Wraps this error with the adapter operation and table it came from.
    pub fn in_operation(self, operation: &'static str, table: impl Into<String>) -> Self {
        Error::Operation {
            operation,
            table: table.into(),
            source: Box::new(self),
        }
    }

    /// Returns whether retrying the same call could succeed.
    ///
    /// Store failures may be transient; everything else describes a state
    /// that will not change on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Store { .. } => true,
            Error::Init { source, .. } | Error::Operation { source, .. } => source.is_retryable(),
            Error::Serialization(_)
            | Error::DatabaseNotFound { .. }
            | Error::TableNotFound { .. }
            | Error::Config { .. }
            | Error::Closed => false,
        }
    }
}
