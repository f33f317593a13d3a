//! Offline stand-in for a remote catalogue

use rand::Rng;

use crate::source::DataSource;
use crate::{Record, Result};

/// Answers every lookup with made-up attributes.
///
/// Used when no catalogue API key is configured, so the cache can be
/// exercised end to end without network access.
#[derive(Debug, Default)]
pub struct RandomSource;

impl RandomSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl DataSource for RandomSource {
    fn name(&self) -> &'static str {
        "random"
    }

    async fn initialize(&mut self, _params: &str) -> Result<()> {
        Ok(())
    }

    async fn lookup(&self, barcode: &str) -> Result<Option<Record>> {
        let n: u32 = rand::rng().random_range(0..1_000_000);
        Ok(Some(Record::new(
            barcode,
            format!("ISBN{}", n),
            format!("Author{}", n),
            format!("Title{}", n),
        )))
    }

    async fn store(&self, record: &Record) -> Result<()> {
        tracing::warn!(barcode = record.barcode(), "store called on read-only random source");
        Ok(())
    }

    async fn shutdown(&self) {}
}
