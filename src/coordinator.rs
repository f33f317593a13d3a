//! Cache coordinator - check local, else fetch remote and write through
//!
//! Per request:
//! 1. Look the barcode up in the local backend; a hit is answered at once.
//! 2. On a miss (or with no local backend) ask the remote source, once.
//! 3. A remote answer is stored locally, best effort, then returned.
//!
//! Callers only ever see a record or no record. Failures are logged so a
//! genuine cache miss can be told apart from a broken cache.
//!
//! Concurrent misses for the same barcode are not coalesced: each may reach
//! the remote source, and the insert-if-absent statement makes the second
//! write-through a no-op.

use std::sync::Arc;

use crate::Record;
use crate::source::DataSource;

/// Where an answer came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Served from the local backend without contacting the remote source
    Local(Record),
    /// Fetched from the remote source (and written through if possible)
    Remote(Record),
    NotFound,
}

impl Resolution {
    pub fn into_record(self) -> Option<Record> {
        match self {
            Resolution::Local(record) | Resolution::Remote(record) => Some(record),
            Resolution::NotFound => None,
        }
    }
}

/// Mediates between one local backend and an optional remote source.
///
/// Holds no per-request state and takes no locks, so one instance can be
/// shared by every request task.
#[derive(Clone, Default)]
pub struct CacheCoordinator {
    local: Option<Arc<dyn DataSource>>,
    remote: Option<Arc<dyn DataSource>>,
}

impl CacheCoordinator {
    pub fn new(local: Option<Arc<dyn DataSource>>, remote: Option<Arc<dyn DataSource>>) -> Self {
        Self { local, remote }
    }

    /// Look a barcode up, returning the record if any source has it.
    pub async fn lookup(&self, barcode: &str) -> Option<Record> {
        self.resolve(barcode).await.into_record()
    }

    /// Like `lookup`, but reports which source answered.
    pub async fn resolve(&self, barcode: &str) -> Resolution {
        if barcode.is_empty() {
            tracing::error!("Refusing lookup of empty barcode");
            return Resolution::NotFound;
        }

        if let Some(record) = self.lookup_local(barcode).await {
            tracing::debug!(barcode, "local cache hit");
            return Resolution::Local(record);
        }

        let Some(remote) = self.remote.as_ref() else {
            tracing::info!(barcode, "No remote source configured");
            return Resolution::NotFound;
        };

        let record = match remote.lookup(barcode).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::info!(barcode, source = remote.name(), "No result was located");
                return Resolution::NotFound;
            }
            Err(e) => {
                tracing::warn!(barcode, source = remote.name(), error = %e, "remote lookup failed");
                return Resolution::NotFound;
            }
        };

        self.write_through(&record).await;
        Resolution::Remote(record)
    }

    async fn lookup_local(&self, barcode: &str) -> Option<Record> {
        let Some(local) = self.local.as_ref() else {
            tracing::debug!(barcode, "No local backend configured");
            return None;
        };

        match local.lookup(barcode).await {
            Ok(Some(record)) => Some(record),
            Ok(None) => {
                tracing::info!(barcode, "Not found in local cache; attempting remote");
                None
            }
            Err(e) => {
                tracing::warn!(barcode, backend = local.name(), error = %e, "local cache lookup failed; treating as miss");
                None
            }
        }
    }

    async fn write_through(&self, record: &Record) {
        let Some(local) = self.local.as_ref() else {
            return;
        };
        if let Err(e) = local.store(record).await {
            tracing::warn!(barcode = record.barcode(), backend = local.name(), error = %e, "write-through to local cache failed");
        }
    }
}
