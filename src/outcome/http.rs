//! Remote outcome service client.
//!
//! Endpoint: `POST {base_url}/spin` with body `{"bet": <amount>}`.
//! Success: `{"reels": [[..],..], "win": bool, "payout": n}`.
//! Failure: non-2xx with `{"error": "...", "message": "..."}`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::OutcomeSource;
use crate::types::{SpinOutcome, TransportError};

const SOURCE_NAME: &str = "http";

/// Shown when a failed response carries no usable message.
const FALLBACK_MESSAGE: &str = "Spin failed";

#[derive(Debug, Serialize)]
struct SpinRequest {
    bet: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP outcome source.
pub struct HttpOutcomeClient {
    http: Client,
    spin_url: String,
}

impl HttpOutcomeClient {
    /// Create a client for the service at `base_url`.
    ///
    /// `timeout` of `None` leaves requests unbounded.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().user_agent("SPINDECK/0.1.0");
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .context("Failed to build HTTP client for outcome source")?;

        Ok(Self {
            http,
            spin_url: format!("{}/spin", base_url.trim_end_matches('/')),
        })
    }

    pub fn spin_url(&self) -> &str {
        &self.spin_url
    }
}

/// Pull a human-readable reason out of a failed response body.
fn rejection_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(msg) = parsed.error.or(parsed.message).filter(|m| !m.is_empty()) {
            return msg;
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() && !trimmed.starts_with('<') {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or(FALLBACK_MESSAGE)
        .to_string()
}

#[async_trait]
impl OutcomeSource for HttpOutcomeClient {
    async fn fetch_outcome(&self, bet: u64) -> Result<SpinOutcome, TransportError> {
        debug!(url = %self.spin_url, bet, "Requesting spin outcome");

        let resp = self
            .http
            .post(&self.spin_url)
            .json(&SpinRequest { bet })
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        if !status.is_success() {
            let message = rejection_message(status, &body);
            warn!(status = status.as_u16(), message = %message, "Outcome source rejected spin");
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str::<SpinOutcome>(&body)
            .map_err(|e| TransportError::Malformed(e.to_string()))
    }

    fn name(&self) -> &'static str {
        SOURCE_NAME
    }
}
