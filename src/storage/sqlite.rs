//! SQLite storage backend

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use rusqlite::{OptionalExtension, params};
use tokio_rusqlite::Connection;

use crate::source::DataSource;
use crate::{Error, Record, Result};
use super::dialect::{Dialect, DialectProfile};

/// Path that opens a private in-memory database
pub const IN_MEMORY: &str = ":memory:";

/// SQLite-backed barcode cache.
///
/// Statements run on the connection's own background thread through
/// `Connection::call`, so file I/O never blocks a runtime worker. The handle
/// is cheap to clone and is taken out of the lock for each call.
#[derive(Default)]
pub struct SqliteBackend {
    conn: RwLock<Option<Connection>>,
    profile: Option<Arc<DialectProfile>>,
}

impl SqliteBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached rows
    pub async fn row_count(&self) -> Result<usize> {
        let count = self
            .conn()?
            .call(|conn| {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM barcodes", [], |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        Ok(count as usize)
    }

    fn profile(&self) -> Result<Arc<DialectProfile>> {
        self.profile.clone().ok_or(Error::NotInitialized("sqlite"))
    }

    fn conn(&self) -> Result<Connection> {
        self.conn
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(Error::NotInitialized("sqlite"))
    }

    async fn open(path: &str) -> Result<Connection> {
        if path == IN_MEMORY {
            return Ok(Connection::open_in_memory().await?);
        }

        let path = Path::new(path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !tokio::fs::try_exists(parent).await.unwrap_or(false) {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            tracing::info!("Database file {} does not exist; creating", path.display());
        }
        Ok(Connection::open(path).await?)
    }
}

#[async_trait::async_trait]
impl DataSource for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    /// `params` is the database file path, or `:memory:`.
    async fn initialize(&mut self, params: &str) -> Result<()> {
        self.shutdown().await;

        let profile = Arc::new(DialectProfile::for_dialect(Dialect::Sqlite));
        let conn = Self::open(params).await?;
        let ddl = profile.create_table().to_string();
        if let Err(e) = conn.call(move |conn| Ok(conn.execute(&ddl, [])?)).await {
            let _ = conn.close().await;
            return Err(e.into());
        }

        tracing::debug!(dialect = %profile.dialect(), path = params, "barcode table ready");
        *self.conn.get_mut().unwrap_or_else(PoisonError::into_inner) = Some(conn);
        self.profile = Some(profile);
        Ok(())
    }

    async fn lookup(&self, barcode: &str) -> Result<Option<Record>> {
        if barcode.is_empty() {
            return Err(Error::EmptyKey);
        }
        let profile = self.profile()?;
        let conn = self.conn()?;

        let key = barcode.to_string();
        let row = conn
            .call(move |conn| {
                let mut stmt = conn.prepare_cached(profile.lookup())?;
                let row = stmt
                    .query_row([&key], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
                    })
                    .optional()?;
                Ok(row)
            })
            .await?;

        Ok(row.map(|(isbn, author, title)| Record::new(barcode, isbn, author, title)))
    }

    async fn store(&self, record: &Record) -> Result<()> {
        if !record.has_key() {
            return Err(Error::EmptyKey);
        }
        let profile = self.profile()?;
        let conn = self.conn()?;

        let owned = record.clone();
        let inserted = conn
            .call(move |conn| {
                let inserted = conn.prepare_cached(profile.insert())?.execute(params![
                    owned.barcode(),
                    owned.isbn(),
                    owned.author(),
                    owned.title(),
                    owned.barcode(),
                ])?;
                Ok(inserted)
            })
            .await?;
        if inserted == 0 {
            tracing::debug!(barcode = record.barcode(), "barcode already cached; insert skipped");
        }
        Ok(())
    }

    async fn shutdown(&self) {
        let conn = self.conn.write().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(conn) = conn {
            if let Err(e) = conn.close().await {
                tracing::warn!("Failed to close SQLite database: {}", e);
            }
        }
    }
}
