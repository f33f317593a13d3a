//! Data sources - the capability shared by local storage and remote catalogues
//!
//! The coordinator only ever talks to `DataSource` trait objects, so a
//! SQL backend, a web catalogue and a test stub are interchangeable.

pub mod alma;
pub mod random;

pub use alma::AlmaSource;
pub use random::RandomSource;

use crate::{Record, Result};

/// Four-operation contract implemented by every data source.
///
/// All implementations must be `Send + Sync`: one instance is shared by
/// every in-flight request.
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    /// Short human-readable name used in logs.
    fn name(&self) -> &'static str;

    /// Open connections or record credentials. Calling it again replaces
    /// the previous state.
    async fn initialize(&mut self, params: &str) -> Result<()>;

    /// Find the record for a barcode. `Ok(None)` means a genuine absence.
    async fn lookup(&self, barcode: &str) -> Result<Option<Record>>;

    /// Persist a record. Read-only sources may treat this as a no-op.
    async fn store(&self, record: &Record) -> Result<()>;

    /// Release resources. Safe to call more than once.
    async fn shutdown(&self);
}
