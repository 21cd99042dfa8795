use serde::{Deserialize, Serialize};

use crate::capture::{CaptureMethod, GeolocationError};
use crate::eligibility::Eligibility;
use crate::error::RecorderError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RecorderMode {
    View,
    Record,
}

/// View/record state machine plus the instruction overlay.
///
/// A view-only instance is `View` for its whole life and never shows the
/// overlay. A record-capable instance starts in `Record` with the overlay up;
/// the overlay must be dismissed once per mount before method selection shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeController {
    view_only: bool,
    mode: RecorderMode,
    overlay_visible: bool,
    method: CaptureMethod,
}

impl ModeController {
    pub fn new(view_only: bool) -> Self {
        Self {
            view_only,
            mode: if view_only {
                RecorderMode::View
            } else {
                RecorderMode::Record
            },
            overlay_visible: !view_only,
            method: CaptureMethod::default(),
        }
    }

    pub fn mode(&self) -> RecorderMode {
        self.mode
    }

    pub fn is_view_only(&self) -> bool {
        self.view_only
    }

    pub fn can_toggle(&self) -> bool {
        !self.view_only
    }

    pub fn method(&self) -> CaptureMethod {
        self.method
    }

    pub fn overlay_visible(&self) -> bool {
        self.overlay_visible
    }

    /// Fresh mount: the overlay comes back for record-capable instances.
    pub fn remount(&mut self) {
        self.overlay_visible = !self.view_only;
    }

    pub fn dismiss_overlay(&mut self) {
        self.overlay_visible = false;
    }

    pub fn set_mode(&mut self, target: RecorderMode) -> Result<RecorderMode, RecorderError> {
        if self.view_only && target == RecorderMode::Record {
            return Err(RecorderError::ViewOnly);
        }
        self.mode = target;
        Ok(self.mode)
    }

    pub fn toggle(&mut self) -> Result<RecorderMode, RecorderError> {
        let target = match self.mode {
            RecorderMode::View => RecorderMode::Record,
            RecorderMode::Record => RecorderMode::View,
        };
        if self.view_only {
            return Err(RecorderError::ViewOnly);
        }
        self.set_mode(target)
    }

    pub fn select_method(&mut self, method: CaptureMethod) -> Result<(), RecorderError> {
        if self.view_only {
            return Err(RecorderError::ViewOnly);
        }
        self.method = method;
        Ok(())
    }

    pub fn method_selection_visible(&self, recording_enabled: bool) -> bool {
        self.mode == RecorderMode::Record && !self.overlay_visible && recording_enabled
    }

    /// Whether a new capture may be taken right now.
    pub fn ensure_capture_allowed(&self, recording_enabled: bool) -> Result<(), RecorderError> {
        if self.view_only {
            return Err(RecorderError::ViewOnly);
        }
        if self.mode != RecorderMode::Record {
            return Err(RecorderError::Validation(
                "switch to record mode to capture a location".into(),
            ));
        }
        if self.overlay_visible {
            return Err(RecorderError::Validation(
                "read and close the instructions first".into(),
            ));
        }
        if !recording_enabled {
            return Err(RecorderError::RecordingDisabled);
        }
        Ok(())
    }

    /// Confirm needs record mode and an open window but not the overlay check:
    /// a pending location can only exist once it was dismissed.
    pub fn ensure_confirm_allowed(&self, recording_enabled: bool) -> Result<(), RecorderError> {
        if self.view_only {
            return Err(RecorderError::ViewOnly);
        }
        if self.mode != RecorderMode::Record {
            return Err(RecorderError::Validation(
                "switch to record mode to confirm a location".into(),
            ));
        }
        if !recording_enabled {
            return Err(RecorderError::RecordingDisabled);
        }
        Ok(())
    }
}

/// Launch parameter selecting a view-only map, e.g. `?view=mapview`.
pub fn view_only_from_query(query: &str) -> bool {
    query
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .any(|(key, value)| key == "view" && value == "mapview")
}

/// Mode and eligibility state guarded by the controller's lock. The record
/// cache sits behind its own lock so deletion can run against it alone.
#[derive(Debug, Clone)]
pub struct RecorderState {
    pub modes: ModeController,
    pub eligibility: Eligibility,
    pub geolocation_error: Option<GeolocationError>,
}

impl RecorderState {
    pub fn new(view_only: bool) -> Self {
        Self {
            modes: ModeController::new(view_only),
            eligibility: Eligibility::unknown(),
            geolocation_error: None,
        }
    }

    pub fn recording_enabled(&self) -> bool {
        self.eligibility.is_enabled()
    }

    pub fn capture_enabled(&self) -> bool {
        self.modes
            .ensure_capture_allowed(self.recording_enabled())
            .is_ok()
    }
}
