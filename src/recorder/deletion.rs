//! Ownership-scoped deletion. The server alone decides whether the caller's
//! session owns the record; the client only reports what it was told.

use serde::Serialize;
use tokio::sync::Mutex;

use crate::api::{ApiError, ErrorBody, LocationsApi};
use crate::error::RecorderError;
use crate::identity::SessionIdentity;
use crate::notify::{Notice, Notifier};
use crate::records::RecordStore;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub const DELETE_FAILURE_PREFIX: &str = "deletion failed: ";
pub const UNKNOWN_ERROR_DETAIL: &str = "an unknown error occurred";
pub const DELETE_SUCCESS_MESSAGE: &str = "Your recorded location was deleted.";
pub const DELETE_CONFIRM_QUESTION: &str = "Delete this recorded location?";

/// Explicit yes/no gesture from the user.
pub trait ConfirmPrompt: Send + Sync {
    fn confirm(&self, question: &str) -> bool;
}

/// Prompt that always answers the same way; for scripted use (`--yes`).
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl ConfirmPrompt for FixedAnswer {
    fn confirm(&self, _question: &str) -> bool {
        self.0
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub id: i64,
    pub message: String,
}

/// Everything a delete needs, passed in rather than reached for.
pub struct DeleteDeps<'a> {
    pub api: &'a dyn LocationsApi,
    pub prompt: &'a dyn ConfirmPrompt,
    pub notifier: &'a dyn Notifier,
    pub identity: &'a SessionIdentity,
    pub records: &'a Mutex<RecordStore>,
}

/// Failure detail, by precedence: string body verbatim, structured body as
/// compact JSON, transport-level message, fixed fallback.
pub fn normalize_error_detail(err: &ApiError) -> String {
    match err {
        ApiError::Http {
            body: Some(ErrorBody::Text(text)),
            ..
        } => text.clone(),
        ApiError::Http {
            body: Some(body @ ErrorBody::Json(_)),
            ..
        } => body.render(),
        ApiError::Http { body: None, .. } => err.to_string(),
        ApiError::Network(message) if !message.trim().is_empty() => message.clone(),
        ApiError::Network(_) | ApiError::Unknown => UNKNOWN_ERROR_DETAIL.to_string(),
    }
}

pub fn delete_failure_message(err: &ApiError) -> String {
    format!("{DELETE_FAILURE_PREFIX}{}", normalize_error_detail(err))
}

pub async fn delete_location(id: i64, deps: DeleteDeps<'_>) -> Result<DeleteOutcome, RecorderError> {
    if !deps.prompt.confirm(DELETE_CONFIRM_QUESTION) {
        return Err(RecorderError::DeleteDeclined);
    }

    match deps.api.delete_location(id, deps.identity).await {
        Ok(response) => {
            let removed = deps.records.lock().await.remove(id);
            if removed.is_none() {
                log_info!("deleted location {id} was not in the local cache");
            }
            deps.notifier
                .notify(Notice::Success(DELETE_SUCCESS_MESSAGE.to_string()));
            Ok(DeleteOutcome {
                id,
                message: response.message,
            })
        }
        Err(err) => {
            let message = delete_failure_message(&err);
            log_warn!("delete of location {id} rejected: {err}");
            deps.notifier.notify(Notice::Error(message.clone()));
            Err(RecorderError::Delete {
                status: err.status(),
                message,
            })
        }
    }
}
