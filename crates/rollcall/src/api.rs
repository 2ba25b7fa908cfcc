//! Ledger API client.
//!
//! The ledger is owned by the server. This module defines the REST contract
//! as the [`LedgerApi`] trait and provides [`HttpLedger`], the `reqwest`
//! implementation used at runtime.

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::record::{CheckInPayload, CheckInRecord};

/// Path of the member list endpoint.
pub const MEMBERS_PATH: &str = "/api/members";
/// Path of the bulk record fetch endpoint.
pub const RECORDS_PATH: &str = "/api/records";
/// Path of the check-in submission endpoint.
pub const CHECKIN_PATH: &str = "/api/checkin";
/// Path of the event registration endpoint.
pub const EVENTS_PATH: &str = "/api/events";
/// Path of the CSV export download.
pub const EXPORT_PATH: &str = "/api/export";

/// Request body for `POST /api/events`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRegistration {
    /// Event name.
    pub name: String,
    /// Calendar date of the event.
    pub date: String,
}

#[derive(Debug, Deserialize)]
struct MembersResponse {
    members: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RecordsResponse {
    records: Vec<serde_json::Value>,
}

impl RecordsResponse {
    /// Decode each row on its own; an unreadable row is skipped with a warning.
    fn into_records(self) -> Vec<CheckInRecord> {
        self.records
            .into_iter()
            .enumerate()
            .filter_map(|(index, row)| match serde_json::from_value(row) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(index, error = %e, "Skipping unreadable ledger record");
                    None
                }
            })
            .collect()
    }
}

/// Operations offered by the ledger owner.
#[async_trait::async_trait]
pub trait LedgerApi: Send + Sync {
    /// Fetch the names on the member list.
    async fn list_members(&self) -> Result<Vec<String>>;

    /// Fetch every record in the ledger, oldest first.
    async fn list_records(&self) -> Result<Vec<CheckInRecord>>;

    /// Append a check-in to the ledger.
    async fn submit_checkin(&self, payload: &CheckInPayload) -> Result<()>;

    /// Register a new event.
    async fn register_event(&self, registration: &EventRegistration) -> Result<()>;
}

/// [`LedgerApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpLedger {
    client: Client,
    origin: String,
}

impl HttpLedger {
    /// Create a client for the origin selected by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if no origin is configured or the HTTP client can't
    /// be built.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            origin: config.origin()?.to_string(),
        })
    }

    /// The origin requests are sent to.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.origin.trim_end_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &'static str) -> Result<T> {
        let response = self
            .client
            .get(self.url(endpoint))
            .send()
            .await
            .map_err(|source| Error::Network { endpoint, source })?;

        let response = ensure_success(endpoint, response)?;
        response
            .json()
            .await
            .map_err(|e| Error::invalid_response(endpoint, e.to_string()))
    }

    async fn post_json<B: Serialize + Sync>(&self, endpoint: &'static str, body: &B) -> Result<()> {
        let response = self
            .client
            .post(self.url(endpoint))
            .json(body)
            .send()
            .await
            .map_err(|source| Error::Network { endpoint, source })?;

        ensure_success(endpoint, response).map(|_| ())
    }
}

fn ensure_success(endpoint: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(Error::ServerRejected {
            endpoint,
            status: status.as_u16(),
        })
    }
}

#[async_trait::async_trait]
impl LedgerApi for HttpLedger {
    #[instrument(skip(self), fields(origin = %self.origin))]
    async fn list_members(&self) -> Result<Vec<String>> {
        let body: MembersResponse = self.get_json(MEMBERS_PATH).await?;
        debug!(count = body.members.len(), "Fetched member list");
        Ok(body.members)
    }

    #[instrument(skip(self), fields(origin = %self.origin))]
    async fn list_records(&self) -> Result<Vec<CheckInRecord>> {
        let body: RecordsResponse = self.get_json(RECORDS_PATH).await?;
        let rows = body.records.len();
        let records = body.into_records();
        debug!(rows, count = records.len(), "Fetched ledger records");
        Ok(records)
    }

    #[instrument(skip(self, payload), fields(origin = %self.origin, name = %payload.name))]
    async fn submit_checkin(&self, payload: &CheckInPayload) -> Result<()> {
        self.post_json(CHECKIN_PATH, payload).await
    }

    #[instrument(skip(self, registration), fields(origin = %self.origin, event = %registration.name))]
    async fn register_event(&self, registration: &EventRegistration) -> Result<()> {
        self.post_json(EVENTS_PATH, registration).await
    }
}
