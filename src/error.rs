use thiserror::Error;

use crate::api::ApiError;
use crate::capture::GeolocationError;

/// Everything a recorder operation can fail with.
///
/// None of these are fatal: the controller turns each into a `Notice::Error`
/// and the affected feature degrades while the rest keeps working.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RecorderError {
    #[error("{0}")]
    Validation(String),

    #[error("recording is not enabled right now")]
    RecordingDisabled,

    #[error("this map is view-only")]
    ViewOnly,

    #[error("session identity unavailable: {0}")]
    Identity(String),

    #[error("could not get your position: {0}")]
    Geolocation(#[from] GeolocationError),

    #[error("you have already recorded a location from this session")]
    DuplicateRecord,

    #[error("a location is already being recorded")]
    ConfirmInFlight,

    #[error("could not check existing records: {0}")]
    RecordSync(ApiError),

    #[error("{0}")]
    RecordCreate(String),

    #[error("deletion cancelled")]
    DeleteDeclined,

    #[error("{message}")]
    Delete { status: Option<u16>, message: String },
}

impl RecorderError {
    /// Errors the user can act on by trying again later rather than by
    /// changing what they did.
    pub fn is_transient(&self) -> bool {
        match self {
            RecorderError::RecordSync(err) => err.is_network(),
            RecorderError::Delete { status, .. } => status.is_none(),
            RecorderError::Geolocation(err) => err.is_retryable(),
            _ => false,
        }
    }
}
