//! Remote catalogue client for the Alma library services API

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;

use crate::source::DataSource;
use crate::{Record, Result};

/// North American Alma API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api-na.hosted.exlibrisgroup.com/almaws/v1";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Read-only data source backed by the Alma `items` endpoint.
///
/// Every failure (transport, non-200 status, unexpected body) is logged
/// and reported as an absent record; the coordinator never sees an error
/// from this source.
pub struct AlmaSource {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl AlmaSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: None,
        })
    }

    fn items_url(&self) -> String {
        format!("{}/items", self.endpoint)
    }
}

/// Extract a record from an Alma item response body.
///
/// Missing or non-string attributes become empty strings; a body without a
/// `bib_data` object yields `None`.
pub fn parse_item(barcode: &str, body: &Value) -> Option<Record> {
    let Some(bib_data) = body.get("bib_data") else {
        tracing::warn!(barcode, "Alma response has no 'bib_data' value");
        return None;
    };
    let Some(bib) = bib_data.as_object() else {
        tracing::warn!(barcode, "Alma 'bib_data' is not an object");
        return None;
    };

    let field = |name: &str| bib.get(name).and_then(Value::as_str).unwrap_or_default().to_string();
    Some(Record::new(barcode, field("isbn"), field("author"), field("title")))
}

#[async_trait::async_trait]
impl DataSource for AlmaSource {
    fn name(&self) -> &'static str {
        "alma"
    }

    /// `params` is the API access key.
    async fn initialize(&mut self, params: &str) -> Result<()> {
        if params.is_empty() {
            return Err(crate::Error::Config("Alma API key is empty".to_string()));
        }
        self.api_key = Some(params.to_string());
        Ok(())
    }

    async fn lookup(&self, barcode: &str) -> Result<Option<Record>> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(crate::Error::NotInitialized("alma"));
        };

        let response = match self
            .client
            .get(self.items_url())
            .query(&[("item_barcode", barcode)])
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::AUTHORIZATION, format!("apikey {}", api_key))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(barcode, error = %e, "unable to fetch Alma data");
                return Ok(None);
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            tracing::warn!(
                barcode,
                %status,
                headers = ?response.headers(),
                "non-200 return code from Alma server"
            );
            return Ok(None);
        }

        match response.json::<Value>().await {
            Ok(body) => Ok(parse_item(barcode, &body)),
            Err(e) => {
                tracing::warn!(barcode, error = %e, "unable to decode Alma response");
                Ok(None)
            }
        }
    }

    async fn store(&self, record: &Record) -> Result<()> {
        tracing::warn!(barcode = record.barcode(), "store called on read-only Alma source");
        Ok(())
    }

    async fn shutdown(&self) {}
}
