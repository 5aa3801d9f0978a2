//! SolarEdge monitoring API client
//!
//! Every query is a single GET under `/site/{siteId}/...`, authenticated with an
//! `api_key` query parameter. The client never retries: falling back to cached
//! data is the refresh policy's job.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::{
    EnergySeriesResponse, PowerFlowResponse, PowerSeriesResponse, Resolution, TimeSeries,
    VENDOR_DATETIME_FORMAT, VENDOR_DATE_FORMAT,
};
use crate::config::{Credentials, DEFAULT_BASE_URL};

/// HTTP status the API uses to signal rate limiting
const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Errors that can occur when querying the monitoring API
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API answered with a non-success status
    #[error("API Error: {status} {status_text}")]
    Remote { status: u16, status_text: String },

    /// The request never produced a response (DNS, connect, TLS, body read)
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not the JSON we expected
    #[error("Failed to parse JSON response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Classification of [`ApiError::Remote`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    RateLimited,
    Other,
}

impl ApiError {
    /// HTTP status for remote errors
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classifies remote errors; `None` for transport and parse failures
    pub fn remote_kind(&self) -> Option<RemoteErrorKind> {
        self.status().map(|status| {
            if status == STATUS_TOO_MANY_REQUESTS {
                RemoteErrorKind::RateLimited
            } else {
                RemoteErrorKind::Other
            }
        })
    }

    pub fn is_rate_limited(&self) -> bool {
        self.remote_kind() == Some(RemoteErrorKind::RateLimited)
    }
}

/// The queries the dashboard needs from one site
#[async_trait]
pub trait SiteApi: Send + Sync {
    /// Latest instantaneous power flow
    async fn fetch_current_power(
        &self,
        credentials: &Credentials,
    ) -> Result<PowerFlowResponse, ApiError>;

    /// Power samples at native (15-minute) resolution between two local timestamps
    async fn fetch_power_series(
        &self,
        credentials: &Credentials,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<TimeSeries, ApiError>;

    /// Energy samples between two calendar dates (inclusive)
    async fn fetch_energy_series(
        &self,
        credentials: &Credentials,
        start: NaiveDate,
        end: NaiveDate,
        resolution: Resolution,
    ) -> Result<TimeSeries, ApiError>;

    /// Site overview; not every account tier exposes it, and its shape varies
    async fn fetch_overview(&self, credentials: &Credentials) -> Result<Value, ApiError>;
}

/// Client for the SolarEdge monitoring API
#[derive(Debug, Clone)]
pub struct SolarEdgeClient {
    client: Client,
    base_url: String,
}

impl Default for SolarEdgeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SolarEdgeClient {
    /// Create a new client against the public API
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a new client against a different host (self-hosted proxy, tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// Replaces the HTTP client, e.g. one with a request timeout
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issues one GET and decodes the JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        credentials: &Credentials,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}/site/{}/{}", self.base_url, credentials.site_id, endpoint);
        debug!(%url, ?query, "requesting");

        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("api_key", credentials.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "request rejected");
            return Err(ApiError::Remote {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl SiteApi for SolarEdgeClient {
    async fn fetch_current_power(
        &self,
        credentials: &Credentials,
    ) -> Result<PowerFlowResponse, ApiError> {
        self.get_json(credentials, "currentPowerFlow.json", &[]).await
    }

    async fn fetch_power_series(
        &self,
        credentials: &Credentials,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<TimeSeries, ApiError> {
        let query = [
            ("startTime", start.format(VENDOR_DATETIME_FORMAT).to_string()),
            ("endTime", end.format(VENDOR_DATETIME_FORMAT).to_string()),
        ];
        let response: PowerSeriesResponse = self.get_json(credentials, "power", &query).await?;
        Ok(response.power)
    }

    async fn fetch_energy_series(
        &self,
        credentials: &Credentials,
        start: NaiveDate,
        end: NaiveDate,
        resolution: Resolution,
    ) -> Result<TimeSeries, ApiError> {
        let query = [
            ("startDate", start.format(VENDOR_DATE_FORMAT).to_string()),
            ("endDate", end.format(VENDOR_DATE_FORMAT).to_string()),
            ("timeUnit", resolution.as_query_value().to_string()),
        ];
        let response: EnergySeriesResponse = self.get_json(credentials, "energy", &query).await?;
        Ok(response.energy)
    }

    async fn fetch_overview(&self, credentials: &Credentials) -> Result<Value, ApiError> {
        self.get_json(credentials, "overview", &[]).await
    }
}
