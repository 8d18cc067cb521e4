//! Paginated HTTP client for the upstream breed catalog
//!
//! Pages are requested as `GET {base}/{resource}?page={n}` starting at 1 until
//! the upstream answers with an empty array. Non-2xx responses are retried
//! through [`RetryManager`]; transport failures are not.

use crate::config::UpstreamConfig;
use crate::error::FetchError;
use crate::models::RawRecord;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::retry::RetryManager;

/// Records aggregated by [`UpstreamClient::fetch_all`]
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedRecords {
    /// Records in page order
    pub records: Vec<RawRecord>,
    /// Number of non-empty pages fetched
    pub pages_fetched: u32,
    /// The failure that ended pagination early, if any
    pub interrupted: Option<FetchError>,
}

impl FetchedRecords {
    /// True when pagination ran until the upstream returned an empty page
    pub fn is_complete(&self) -> bool {
        self.interrupted.is_none()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// HTTP client for the upstream catalog
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    base_url: String,
    resource: String,
    retry: RetryManager,
}

impl UpstreamClient {
    /// Create a client whose requests are bounded by the configured timeout
    pub fn new(config: &UpstreamConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self::with_client(client, config))
    }

    /// Create a client around a custom reqwest Client
    pub fn with_client(client: Client, config: &UpstreamConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            resource: config.resource.clone(),
            retry: RetryManager::new(config.retry.clone()),
        }
    }

    /// Name of the paginated resource
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// URL of the resource without the page parameter
    pub fn resource_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.resource.trim_start_matches('/')
        )
    }

    /// Fetch one page, retrying non-2xx responses
    ///
    /// Once every attempt has failed with a status the error becomes
    /// `RetriesExhausted`.
    pub async fn fetch_page(&self, page: u32) -> Result<Vec<RawRecord>, FetchError> {
        self.retry
            .execute(|| self.request_page(page))
            .await
            .map_err(|err| match err {
                FetchError::Status(status) => FetchError::RetriesExhausted {
                    status,
                    attempts: self.retry.max_attempts(),
                },
                other => other,
            })
    }

    /// Fetch every page until the first empty one
    ///
    /// A page-terminal failure stops pagination; the records gathered before
    /// it are returned with `interrupted` set. Fails with `NoDataFetched` when
    /// the first page is empty, or with the page failure itself when nothing
    /// was gathered before it.
    pub async fn fetch_all(&self) -> Result<FetchedRecords, FetchError> {
        let mut records = Vec::new();
        let mut pages_fetched = 0u32;
        let mut interrupted = None;
        let mut page = 1u32;

        loop {
            match self.fetch_page(page).await {
                Ok(batch) if batch.is_empty() => {
                    debug!(resource = %self.resource, page, "Reached empty page");
                    break;
                }
                Ok(batch) => {
                    debug!(
                        resource = %self.resource,
                        page,
                        records = batch.len(),
                        "Fetched page"
                    );
                    records.extend(batch);
                    pages_fetched += 1;
                    page += 1;
                }
                Err(err) if err.aborts_pagination() => {
                    error!(
                        resource = %self.resource,
                        page,
                        records = records.len(),
                        error = %err,
                        "Pagination aborted"
                    );
                    interrupted = Some(err);
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        if records.is_empty() {
            return Err(interrupted.unwrap_or_else(|| FetchError::NoDataFetched {
                resource: self.resource.clone(),
            }));
        }

        info!(
            resource = %self.resource,
            records = records.len(),
            pages = pages_fetched,
            complete = interrupted.is_none(),
            "Fetched upstream records"
        );

        Ok(FetchedRecords {
            records,
            pages_fetched,
            interrupted,
        })
    }

    /// One GET for one page, no retry
    async fn request_page(&self, page: u32) -> Result<Vec<RawRecord>, FetchError> {
        let url = self.resource_url();
        debug!(url = %url, page, "Sending HTTP GET request");

        let response = self
            .client
            .get(&url)
            .query(&[("page", page)])
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, page, status = status.as_u16(), "Upstream error status");
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        decode_page(&body)
    }
}

/// Decode a page body into raw records
///
/// Anything but a JSON array is `UnexpectedShape`; an array element that is
/// not a record is `Decode`.
pub fn decode_page(body: &[u8]) -> Result<Vec<RawRecord>, FetchError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| FetchError::Decode(e.to_string()))?;

    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| {
                serde_json::from_value::<RawRecord>(item)
                    .map_err(|e| FetchError::Decode(e.to_string()))
            })
            .collect(),
        other => Err(FetchError::UnexpectedShape(format!(
            "expected an array, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
