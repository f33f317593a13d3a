//! Storage Layer - relational persistence for cached records
//!
//! One table, `barcodes(id, barcode, isbn, author, title)`, served by any of:
//! - SQLite (always available)
//! - PostgreSQL (`postgres` feature)
//! - MySQL (`mysql` feature)
//!
//! Each backend compiles the shared templates in `schema` through
//! `dialect` at initialization and implements `DataSource`.

pub mod schema;
pub mod dialect;
pub mod sqlite;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "mysql")]
pub mod mysql;

pub use dialect::{Dialect, DialectProfile, PlaceholderStyle, compile};
pub use sqlite::SqliteBackend;
#[cfg(feature = "postgres")]
pub use postgres::PostgresBackend;
#[cfg(feature = "mysql")]
pub use mysql::MySqlBackend;

use std::sync::Arc;

use crate::source::DataSource;
use crate::Result;

/// Construct and initialize the backend for `dialect`.
///
/// Any error here is a startup configuration failure; callers are expected
/// to abort rather than retry. `pool_size` only applies to PostgreSQL.
#[cfg_attr(not(feature = "postgres"), allow(unused_variables))]
pub async fn open_backend(dialect: Dialect, params: &str, pool_size: usize) -> Result<Arc<dyn DataSource>> {
    tracing::info!("Using database type '{}'", dialect);

    let backend: Arc<dyn DataSource> = match dialect {
        Dialect::Sqlite => {
            let mut backend = SqliteBackend::new();
            backend.initialize(params).await?;
            Arc::new(backend)
        }
        #[cfg(feature = "postgres")]
        Dialect::Postgres => {
            let mut backend = PostgresBackend::new(pool_size);
            backend.initialize(params).await?;
            Arc::new(backend)
        }
        #[cfg(feature = "mysql")]
        Dialect::MySql => {
            let mut backend = MySqlBackend::new();
            backend.initialize(params).await?;
            Arc::new(backend)
        }
        #[allow(unreachable_patterns)]
        other => return Err(crate::Error::BackendDisabled(other.as_str())),
    };

    Ok(backend)
}
