//! Boundary to the card server's REST API.
//!
//! Every failure is classified exactly once, when the response is read, into
//! [`ApiError`]. Nothing downstream inspects raw responses.

pub mod http;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::identity::SessionIdentity;
use crate::models::{
    CardInfo, CreateLocationRequest, CreateLocationResponse, LocationRecord, MessageResponse,
    RecordingWindow,
};

pub use http::{HttpLocationsApi, SESSION_HEADER};

/// Body of a non-success response.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorBody {
    Text(String),
    Json(Value),
}

impl ErrorBody {
    /// Classifies raw response bytes. A JSON string literal counts as text; any
    /// other JSON value is structured; non-JSON is text. Empty bodies and JSON
    /// `null` carry nothing.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Null) => None,
            Ok(Value::String(text)) => Some(ErrorBody::Text(text)),
            Ok(value) => Some(ErrorBody::Json(value)),
            Err(_) => {
                let text = String::from_utf8_lossy(bytes);
                if text.trim().is_empty() {
                    None
                } else {
                    Some(ErrorBody::Text(text.into_owned()))
                }
            }
        }
    }

    /// Compact rendering: text verbatim, JSON serialized without whitespace in
    /// its original key order.
    pub fn render(&self) -> String {
        match self {
            ErrorBody::Text(text) => text.clone(),
            ErrorBody::Json(value) => value.to_string(),
        }
    }

    /// The server's own message when it sent one in the usual `detail` /
    /// `message` envelope, otherwise [`render`](Self::render).
    pub fn message(&self) -> String {
        if let ErrorBody::Json(Value::Object(map)) = self {
            for key in ["detail", "message", "error"] {
                if let Some(Value::String(text)) = map.get(key) {
                    return text.clone();
                }
            }
        }
        self.render()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// No response was received.
    #[error("network error: {0}")]
    Network(String),

    #[error("server responded with status {status}")]
    Http { status: u16, body: Option<ErrorBody> },

    #[error("an unknown error occurred")]
    Unknown,
}

impl ApiError {
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Best human-readable message for surfaces that show the server's words.
    pub fn server_message(&self) -> String {
        match self {
            ApiError::Http {
                body: Some(body), ..
            } => body.message(),
            other => other.to_string(),
        }
    }
}

/// REST endpoints the recorder consumes.
#[async_trait]
pub trait LocationsApi: Send + Sync {
    async fn fetch_locations(&self) -> Result<Vec<LocationRecord>, ApiError>;

    async fn fetch_recording_window(&self) -> Result<RecordingWindow, ApiError>;

    async fn create_location(
        &self,
        request: &CreateLocationRequest,
        identity: &SessionIdentity,
    ) -> Result<CreateLocationResponse, ApiError>;

    async fn delete_location(
        &self,
        id: i64,
        identity: &SessionIdentity,
    ) -> Result<MessageResponse, ApiError>;

    async fn fetch_card_info(&self) -> Result<CardInfo, ApiError>;
}
