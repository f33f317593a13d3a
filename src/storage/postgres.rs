//! PostgreSQL storage backend

use std::sync::{PoisonError, RwLock};

use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::NoTls;

use crate::source::DataSource;
use crate::{Error, Record, Result};
use super::dialect::{Dialect, DialectProfile};

pub const DEFAULT_POOL_SIZE: usize = 16;

/// PostgreSQL-backed barcode cache over a `deadpool-postgres` pool.
pub struct PostgresBackend {
    pool: RwLock<Option<Pool>>,
    profile: Option<DialectProfile>,
    max_size: usize,
}

impl Default for PostgresBackend {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}

impl PostgresBackend {
    pub fn new(max_size: usize) -> Self {
        Self {
            pool: RwLock::new(None),
            profile: None,
            max_size,
        }
    }

    fn profile(&self) -> Result<&DialectProfile> {
        self.profile.as_ref().ok_or(Error::NotInitialized("postgres"))
    }

    /// Clone the pool handle so no lock is held across an await
    fn pool(&self) -> Result<Pool> {
        self.pool
            .read()
            .ok()
            .and_then(|pool| pool.clone())
            .ok_or(Error::NotInitialized("postgres"))
    }

    async fn get_conn(&self) -> Result<deadpool_postgres::Object> {
        self.pool()?
            .get()
            .await
            .map_err(|e| Error::Pool(e.to_string()))
    }

    /// Check out a connection now so a bad server fails at startup
    async fn create_table(pool: &Pool, profile: &DialectProfile) -> Result<()> {
        let conn = pool.get().await.map_err(|e| Error::Pool(e.to_string()))?;
        conn.batch_execute(profile.create_table()).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl DataSource for PostgresBackend {
    fn name(&self) -> &'static str {
        "postgres"
    }

    /// `params` is a libpq-style connection string,
    /// e.g. `host=localhost port=5432 user=user dbname=barcode_cache`.
    async fn initialize(&mut self, params: &str) -> Result<()> {
        self.shutdown().await;

        let pg_config: tokio_postgres::Config = params.parse()?;
        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );
        let pool = Pool::builder(manager)
            .max_size(self.max_size)
            .build()
            .map_err(|e| Error::Pool(format!("Failed to create pool: {}", e)))?;

        let profile = DialectProfile::for_dialect(Dialect::Postgres);

        if let Err(e) = Self::create_table(&pool, &profile).await {
            pool.close();
            return Err(e);
        }

        tracing::debug!(dialect = %profile.dialect(), max_size = self.max_size, "barcode table ready");
        *self.pool.get_mut().unwrap_or_else(PoisonError::into_inner) = Some(pool);
        self.profile = Some(profile);
        Ok(())
    }

    async fn lookup(&self, barcode: &str) -> Result<Option<Record>> {
        if barcode.is_empty() {
            return Err(Error::EmptyKey);
        }
        let profile = self.profile()?;
        let conn = self.get_conn().await?;

        let stmt = conn.prepare_cached(profile.lookup()).await?;
        let row = conn.query_opt(&stmt, &[&barcode]).await?;

        match row {
            Some(row) => Ok(Some(Record::new(
                barcode,
                row.try_get::<_, String>(0)?,
                row.try_get::<_, String>(1)?,
                row.try_get::<_, String>(2)?,
            ))),
            None => Ok(None),
        }
    }

    async fn store(&self, record: &Record) -> Result<()> {
        if !record.has_key() {
            return Err(Error::EmptyKey);
        }
        let profile = self.profile()?;
        let conn = self.get_conn().await?;

        let stmt = conn.prepare_cached(profile.insert()).await?;
        let inserted = conn
            .execute(
                &stmt,
                &[&record.barcode(), &record.isbn(), &record.author(), &record.title(), &record.barcode()],
            )
            .await?;
        if inserted == 0 {
            tracing::debug!(barcode = record.barcode(), "barcode already cached; insert skipped");
        }
        Ok(())
    }

    async fn shutdown(&self) {
        let pool = self.pool.write().ok().and_then(|mut slot| slot.take());
        if let Some(pool) = pool {
            pool.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_use_before_initialize() {
        let backend = PostgresBackend::default();
        assert!(matches!(backend.lookup("1").await, Err(Error::NotInitialized("postgres"))));
        assert!(matches!(
            backend.store(&Record::new("1", "", "", "")).await,
            Err(Error::NotInitialized("postgres"))
        ));
        backend.shutdown().await;
        backend.shutdown().await;
    }

    #[tokio::test]
    async fn test_empty_key_checked_first() {
        let backend = PostgresBackend::default();
        assert!(matches!(backend.lookup("").await, Err(Error::EmptyKey)));
    }

    #[tokio::test]
    async fn test_malformed_connection_string() {
        let mut backend = PostgresBackend::default();
        assert!(backend.initialize("port=not-a-number").await.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_server_leaves_backend_uninitialized() {
        let mut backend = PostgresBackend::new(2);
        let result = backend
            .initialize("host=127.0.0.1 port=9 user=user dbname=barcode_cache connect_timeout=2")
            .await;
        assert!(result.is_err());
        assert!(matches!(backend.lookup("1").await, Err(Error::NotInitialized("postgres"))));
    }

    /// libpq connection string of a disposable database
    const LIVE_DB_VAR: &str = "BARCODE_CACHE_TEST_POSTGRES";

    #[tokio::test]
    #[ignore] // Run explicitly: BARCODE_CACHE_TEST_POSTGRES="host=... dbname=..." cargo test --features postgres -- --ignored
    async fn test_live_store_lookup_keeps_original() {
        let Ok(params) = std::env::var(LIVE_DB_VAR) else {
            eprintln!("{} not set; skipping", LIVE_DB_VAR);
            return;
        };

        let mut backend = PostgresBackend::new(4);
        backend.initialize(&params).await.unwrap();
        // Table creation must be safe on every startup
        backend.initialize(&params).await.unwrap();

        let barcode = format!("live-{}", rand::random::<u64>());
        let original = Record::new(barcode.as_str(), "ISBN-A", "Author-A", "Title-A");
        let replacement = Record::new(barcode.as_str(), "ISBN-B", "Author-B", "Title-B");

        assert_eq!(backend.lookup(&barcode).await.unwrap(), None);
        backend.store(&original).await.unwrap();
        backend.store(&replacement).await.unwrap();
        assert_eq!(backend.lookup(&barcode).await.unwrap(), Some(original));

        let conn = backend.get_conn().await.unwrap();
        let row = conn
            .query_one("SELECT COUNT(*) FROM barcodes WHERE barcode = $1", &[&barcode])
            .await
            .unwrap();
        assert_eq!(row.get::<_, i64>(0), 1);
        conn.execute("DELETE FROM barcodes WHERE barcode = $1", &[&barcode]).await.unwrap();
        drop(conn);

        backend.shutdown().await;
    }
}
