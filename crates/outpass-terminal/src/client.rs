// crates/outpass-terminal/src/client.rs
// ============================================================================
// Module: Terminal Server Client
// Description: Blocking HTTP client for the gate endpoints.
// Purpose: Verify scans, log actions, and pull cache snapshots with
//          failures classified for retry decisions.
// Dependencies: outpass-config, outpass-core, reqwest, serde, serde_json,
//               url
// ============================================================================

//! ## Overview
//! [`ServerClient`] wraps a blocking reqwest client pointed at the Outpass
//! server. Failures split into two classes: [`ClientError::Network`] covers
//! connectivity, timeouts, and 5xx responses and is the only retryable
//! class; a 4xx response is a definitive [`ClientError::Rejected`] carrying
//! the server's machine-readable reason. Redirects are rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use outpass_config::TerminalConfig;
use outpass_core::CacheSnapshot;
use outpass_core::LogActionRequest;
use outpass_core::LogOutcome;
use outpass_core::RegNo;
use outpass_core::VerifyOutcome;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Gate client failure classification.
///
/// # Invariants
/// - `Network` is the only retryable class; everything else is final.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// The configured server URL is unusable.
    #[error("client config error: {0}")]
    Config(String),
    /// Connectivity failure, timeout, or server-side (5xx) response.
    #[error("network error: {0}")]
    Network(String),
    /// Definitive rejection from the server (4xx).
    #[error("server rejected the action ({reason}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Machine-readable reason code from the error body.
        reason: String,
        /// Human-readable message from the error body.
        message: String,
    },
    /// Response payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

impl ClientError {
    /// Reports whether retrying the same call later can succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// Error body shape returned by the server.
#[derive(Debug, Deserialize)]
struct ServerRejection {
    /// Human-readable message.
    error: String,
    /// Machine-readable reason code.
    reason: String,
}

/// Verification payload sent to the server.
#[derive(Debug, Serialize)]
struct VerifyPayload {
    /// Scanned registration number.
    reg_no: String,
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Blocking HTTP client for the Outpass gate endpoints.
pub struct ServerClient {
    /// Underlying HTTP client with the configured timeout.
    http: Client,
    /// Server base URL.
    base: Url,
}

impl ServerClient {
    /// Builds a client from terminal configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] on an unusable URL and
    /// [`ClientError::Network`] when the HTTP client cannot be constructed.
    pub fn from_config(config: &TerminalConfig) -> Result<Self, ClientError> {
        let base =
            Url::parse(&config.server_url).map_err(|err| ClientError::Config(err.to_string()))?;
        match base.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(ClientError::Config(format!("unsupported scheme: {scheme}")));
            }
        }
        let http = Client::builder()
            .redirect(Policy::none())
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|err| ClientError::Network(err.to_string()))?;
        Ok(Self {
            http,
            base,
        })
    }

    /// Verifies a scanned registration number against live server state.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] per the failure classification above.
    pub fn verify(&self, reg_no: &RegNo) -> Result<VerifyOutcome, ClientError> {
        let payload = VerifyPayload {
            reg_no: reg_no.as_str().to_string(),
        };
        self.post("/gate/verify-pass", &payload)
    }

    /// Submits a gate action to the log endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] per the failure classification above.
    pub fn log_action(&self, request: &LogActionRequest) -> Result<LogOutcome, ClientError> {
        self.post("/gate/log-action", request)
    }

    /// Pulls the full verification snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] per the failure classification above.
    pub fn fetch_snapshot(&self) -> Result<CacheSnapshot, ClientError> {
        let url = self.endpoint("/gate/sync-cache")?;
        let response = self.http.get(url).send().map_err(map_transport)?;
        decode(response)
    }

    /// Posts a JSON body and decodes the JSON response.
    fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize,
        T: for<'de> Deserialize<'de>,
    {
        let url = self.endpoint(path)?;
        let response = self.http.post(url).json(body).send().map_err(map_transport)?;
        decode(response)
    }

    /// Resolves an absolute endpoint path against the base URL.
    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base.join(path).map_err(|err| ClientError::Config(err.to_string()))
    }
}

// ============================================================================
// SECTION: Response Handling
// ============================================================================

/// Classifies a transport-level send failure as retryable.
fn map_transport(err: reqwest::Error) -> ClientError {
    ClientError::Network(err.to_string())
}

/// Decodes a response, classifying non-success statuses.
fn decode<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().map_err(|err| ClientError::Decode(err.to_string()));
    }
    let code = status.as_u16();
    if status.is_server_error() {
        return Err(ClientError::Network(format!("http status {code}")));
    }
    let text = response.text().unwrap_or_default();
    let rejection = serde_json::from_str::<ServerRejection>(&text).unwrap_or(ServerRejection {
        error: format!("http status {code}"),
        reason: "unclassified".to_string(),
    });
    Err(ClientError::Rejected {
        status: code,
        reason: rejection.reason,
        message: rejection.error,
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use super::ClientError;

    #[test]
    fn only_network_failures_are_retryable() {
        assert!(ClientError::Network("refused".to_string()).is_retryable());
        assert!(!ClientError::Config("bad url".to_string()).is_retryable());
        assert!(!ClientError::Decode("bad json".to_string()).is_retryable());
        let rejected = ClientError::Rejected {
            status: 409,
            reason: "invalid_transition".to_string(),
            message: "pass is completed".to_string(),
        };
        assert!(!rejected.is_retryable());
    }
}
