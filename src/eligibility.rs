use chrono::{DateTime, Utc};
use log::warn;

use crate::api::{ApiError, LocationsApi};
use crate::models::RecordingWindow;

/// Last-known recording window plus how it was obtained.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Eligibility {
    window: RecordingWindow,
    fetch_error: Option<ApiError>,
    fetched_at: Option<DateTime<Utc>>,
}

impl Eligibility {
    /// Before the first fetch completes recording stays closed.
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn from_fetch(result: Result<RecordingWindow, ApiError>, now: DateTime<Utc>) -> Self {
        match result {
            Ok(window) => Self {
                window,
                fetch_error: None,
                fetched_at: Some(now),
            },
            Err(err) => {
                warn!("Recording status unavailable, keeping recording closed: {err}");
                Self {
                    window: RecordingWindow::disabled(),
                    fetch_error: Some(err),
                    fetched_at: Some(now),
                }
            }
        }
    }

    /// The server's flag decides; the client never reopens or closes a window
    /// on its own.
    pub fn is_enabled(&self) -> bool {
        self.window.enabled
    }

    pub fn window(&self) -> &RecordingWindow {
        &self.window
    }

    pub fn description(&self) -> Option<&str> {
        self.window
            .description
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }

    pub fn fetch_error(&self) -> Option<&ApiError> {
        self.fetch_error.as_ref()
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    /// User-facing note about the window's time limit, if it has one.
    pub fn expiry_notice(&self, now: DateTime<Utc>) -> Option<String> {
        let expires_at = self.window.expires_at?;
        let stamp = expires_at.format("%Y-%m-%d %H:%M UTC");
        if self.window.has_expired_at(now) {
            Some(format!(
                "The recording window ended at {stamp}. Records outside the window are rejected."
            ))
        } else {
            Some(format!(
                "Recording is open until {stamp}. Records outside the window are rejected so \
                 unrelated times are not recorded by mistake."
            ))
        }
    }
}

pub async fn fetch_eligibility(api: &dyn LocationsApi) -> Eligibility {
    let result = api.fetch_recording_window().await;
    Eligibility::from_fetch(result, Utc::now())
}
