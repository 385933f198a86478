//! Remote fee schedule client
//!
//! Optional HTTP source of fee rows, for deployments where fee terms are
//! maintained centrally. `GET {base_url}/fees/{category_id}` returns a JSON
//! fee row or 404 when the category has none.

use std::time::Duration;
use thiserror::Error;

use crate::catalog::FeeScheduleRow;

const USER_AGENT: &str = concat!("resale-classifier/", env!("CARGO_PKG_VERSION"));

/// Fee service client errors
#[derive(Debug, Error)]
pub enum FeeClientError {
    /// Connection failure or timeout
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Non-success HTTP status other than 404
    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    /// Response body was not a fee row
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl FeeClientError {
    /// Network failures, throttling and server errors are worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            FeeClientError::NetworkError(_) => true,
            FeeClientError::ApiError(status, _) => *status == 429 || *status >= 500,
            FeeClientError::ParseError(_) => false,
        }
    }
}

/// HTTP client for the fee service
#[derive(Debug, Clone)]
pub struct RemoteFeeClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl RemoteFeeClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FeeClientError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FeeClientError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the fee row for a category; `Ok(None)` when the service has none
    pub async fn fetch_row(
        &self,
        category_id: &str,
        timeout: Duration,
    ) -> Result<Option<FeeScheduleRow>, FeeClientError> {
        let url = format!("{}/fees/{}", self.base_url, category_id);
        tracing::debug!(category_id, url = %url, "Querying fee service");

        let response = self
            .http_client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FeeClientError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(FeeClientError::ApiError(status.as_u16(), error_text));
        }

        let row: FeeScheduleRow = response
            .json()
            .await
            .map_err(|e| FeeClientError::ParseError(e.to_string()))?;

        row.validate()
            .map_err(|e| FeeClientError::ParseError(e.to_string()))?;

        Ok(Some(row))
    }
}
