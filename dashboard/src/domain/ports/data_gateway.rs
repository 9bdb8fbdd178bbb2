//! Driven port for the hosted data API.
//!
//! The domain hands the gateway a complete [`TableRequest`] and receives the
//! hosted API's `{rows, error}` envelope back. Transport and decoding
//! failures travel as [`GatewayError`]; structured errors returned by the API
//! stay inside the envelope until [`GatewayResponse::into_rows`] classifies
//! them.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::define_port_error;
use crate::domain::request::TableRequest;

/// One row as returned by the gateway: string-keyed JSON fields.
pub type Record = Map<String, Value>;

/// Structured error payload returned by the hosted API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteErrorBody {
    /// Human-readable message.
    pub message: String,
    /// Backend error code, when provided.
    #[serde(default)]
    pub code: Option<String>,
    /// Additional detail text.
    #[serde(default)]
    pub details: Option<String>,
    /// Remediation hint.
    #[serde(default)]
    pub hint: Option<String>,
}

impl RemoteErrorBody {
    /// Build an error body carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            details: None,
            hint: None,
        }
    }
}

/// The `{rows, error}` envelope produced for every executed request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GatewayResponse {
    /// Returned rows, absent when the API produced none.
    pub rows: Option<Vec<Record>>,
    /// Structured error, absent on success.
    pub error: Option<RemoteErrorBody>,
}

impl GatewayResponse {
    /// Successful envelope carrying `rows`.
    pub fn ok(rows: Vec<Record>) -> Self {
        Self {
            rows: Some(rows),
            error: None,
        }
    }

    /// Failed envelope with null rows.
    pub fn failed(error: RemoteErrorBody) -> Self {
        Self {
            rows: None,
            error: Some(error),
        }
    }

    /// Classify the envelope.
    ///
    /// A present error always wins, even when rows were also returned; null
    /// rows without an error mean an empty result.
    ///
    /// # Examples
    /// ```
    /// use dashboard::domain::ports::{GatewayError, GatewayResponse, RemoteErrorBody};
    ///
    /// let failed = GatewayResponse::failed(RemoteErrorBody::message("Database error"));
    /// assert_eq!(failed.into_rows(), Err(GatewayError::remote("Database error")));
    ///
    /// assert_eq!(GatewayResponse::default().into_rows(), Ok(Vec::new()));
    /// ```
    pub fn into_rows(self) -> Result<Vec<Record>, GatewayError> {
        if let Some(error) = self.error {
            return Err(GatewayError::remote(error.message));
        }
        Ok(self.rows.unwrap_or_default())
    }
}

define_port_error! {
    /// Failures surfaced while reading through the gateway.
    pub enum GatewayError {
        /// The gateway could not be reached or timed out.
        Network => "data gateway unreachable",
        /// The gateway answered with a structured error.
        Remote => "data gateway returned an error",
        /// The gateway answered with a payload that does not match the
        /// expected row shape.
        Decode => "data gateway payload could not be decoded",
    }
}

impl GatewayError {
    /// Return whether repeating the request may succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Remote { .. })
    }
}

/// Port for executing request descriptors against the hosted API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DataGateway: Send + Sync {
    /// Execute `request` and return the API's envelope.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use dashboard::domain::ports::DataGateway;
    /// use dashboard::domain::request::{Table, TableRequest};
    ///
    /// let response = gateway
    ///     .execute(&TableRequest::select_all(Table::Drafts).with_limit(5))
    ///     .await?;
    /// let rows = response.into_rows()?;
    /// assert!(rows.len() <= 5);
    /// # Ok::<(), dashboard::domain::ports::GatewayError>(())
    /// ```
    async fn execute(&self, request: &TableRequest) -> Result<GatewayResponse, GatewayError>;
}
