//! # Barcode Cache - local network cache for barcode lookups
//!
//! Answers barcode lookups from a local relational database when it can,
//! and falls back to a remote catalogue on a miss, writing the answer
//! through to the local database so the next lookup stays local.
//!
//! Barcode Cache provides:
//! - A `DataSource` capability shared by local storage and remote catalogues
//! - A dialect shim that runs one set of SQL templates on SQLite, PostgreSQL and MySQL
//! - A cache coordinator implementing check-local, fetch-remote, write-through
//! - An HTTP front end serving records as JSON

pub mod record;
pub mod source;
pub mod storage;
pub mod coordinator;
pub mod server;
pub mod config;

// Re-exports for convenient access
pub use record::Record;
pub use source::DataSource;
pub use storage::{Dialect, DialectProfile};
pub use coordinator::{CacheCoordinator, Resolution};

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cache operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unsupported database dialect: {0:?}")]
    UnsupportedDialect(String),

    #[error("Barcode is empty")]
    EmptyKey,

    #[error("{0} backend used before initialization")]
    NotInitialized(&'static str),

    #[error("{0} support was not compiled in (enable the `{0}` feature)")]
    BackendDisabled(&'static str),

    #[error("Storage error: {0}")]
    Storage(#[from] tokio_rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[cfg(feature = "postgres")]
    #[error("PostgreSQL pool error: {0}")]
    Pool(String),

    #[cfg(feature = "mysql")]
    #[error("MySQL error: {0}")]
    MySql(#[from] mysql_async::Error),

    #[error("Remote source error: {0}")]
    Remote(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error is a configuration or contract violation rather
    /// than a transient runtime failure.
    ///
    /// Fatal errors abort startup; they should never be produced by
    /// user-supplied input under correct wiring.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedDialect(_)
                | Error::EmptyKey
                | Error::NotInitialized(_)
                | Error::BackendDisabled(_)
                | Error::Config(_)
        )
    }
}
