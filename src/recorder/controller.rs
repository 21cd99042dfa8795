use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{
    api::LocationsApi,
    capture::{self, CaptureMethod, GeolocationError, Geolocator, MapProjector, PixelPoint},
    eligibility::{fetch_eligibility, Eligibility},
    error::RecorderError,
    identity::{IdentityProvider, SessionIdentity},
    map::{self, DefaultView, MapViewport},
    models::{LocationRecord, PendingLocation},
    notify::{Notice, Notifier},
    records::RecordStore,
};

use super::{
    confirm::{cancel_pending, confirm_pending, ConfirmOutcome},
    deletion::{delete_location, ConfirmPrompt, DeleteDeps, DeleteOutcome},
    state::{RecorderMode, RecorderState},
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

pub const DEFAULT_GEOLOCATION_TIMEOUT: Duration = Duration::from_secs(15);

/// External collaborators the controller talks to.
#[derive(Clone)]
pub struct RecorderServices {
    pub api: Arc<dyn LocationsApi>,
    pub geolocator: Arc<dyn Geolocator>,
    pub projector: Arc<dyn MapProjector>,
    pub viewport: Arc<dyn MapViewport>,
    pub notifier: Arc<dyn Notifier>,
    pub prompt: Arc<dyn ConfirmPrompt>,
}

#[derive(Debug, Clone, Copy)]
pub struct RecorderOptions {
    pub view_only: bool,
    pub geolocation_timeout: Duration,
    pub default_view: DefaultView,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderSnapshot {
    pub mode: RecorderMode,
    pub view_only: bool,
    pub can_toggle: bool,
    pub overlay_visible: bool,
    pub method: CaptureMethod,
    pub method_selection_visible: bool,
    pub capture_enabled: bool,
    pub recording_enabled: bool,
    pub description: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub expiry_notice: Option<String>,
    pub eligibility_checked_at: Option<DateTime<Utc>>,
    pub eligibility_error: Option<String>,
    pub geolocation_error: Option<GeolocationError>,
    pub pending: Option<PendingLocation>,
    pub records: Vec<LocationRecord>,
    pub records_loaded: bool,
    pub confirm_in_flight: bool,
}

/// One map instance: owns its mode, eligibility, record cache and pending
/// capture, and turns every failure into a notice.
#[derive(Clone)]
pub struct RecorderController {
    state: Arc<Mutex<RecorderState>>,
    records: Arc<Mutex<RecordStore>>,
    services: RecorderServices,
    identities: Arc<IdentityProvider>,
    confirming: Arc<AtomicBool>,
    gps_capture: Arc<Mutex<Option<CancellationToken>>>,
    options: RecorderOptions,
}

impl RecorderController {
    pub fn new(
        services: RecorderServices,
        identities: Arc<IdentityProvider>,
        options: RecorderOptions,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(RecorderState::new(options.view_only))),
            records: Arc::new(Mutex::new(RecordStore::new())),
            services,
            identities,
            confirming: Arc::new(AtomicBool::new(false)),
            gps_capture: Arc::new(Mutex::new(None)),
            options,
        }
    }

    /// Mount: overlay back up, eligibility and records fetched side by side.
    pub async fn mount(&self) -> RecorderSnapshot {
        {
            let mut state = self.state.lock().await;
            state.modes.remount();
            state.geolocation_error = None;
        }
        self.cancel_gps().await;

        let token = self.records.lock().await.begin_refresh();
        let api = self.services.api.as_ref();
        let (eligibility, fetched) = tokio::join!(fetch_eligibility(api), api.fetch_locations());

        self.state.lock().await.eligibility = eligibility;
        match fetched {
            Ok(records) => {
                let count = records.len();
                if self.records.lock().await.apply_refresh(token, records) {
                    log_info!("mounted with {count} recorded locations");
                }
            }
            Err(err) => {
                log_error!("initial record load failed: {err}");
                self.services.notifier.notify(Notice::Error(format!(
                    "could not load recorded locations: {}",
                    err.server_message()
                )));
            }
        }

        self.snapshot().await
    }

    /// Explicit refresh signal for the record list.
    pub async fn refresh_records(&self) -> Result<usize, RecorderError> {
        let token = self.records.lock().await.begin_refresh();
        let result = self
            .services
            .api
            .fetch_locations()
            .await
            .map_err(RecorderError::RecordSync);

        let records = self.report(result)?;
        let count = records.len();
        self.records.lock().await.apply_refresh(token, records);
        Ok(count)
    }

    pub async fn refresh_eligibility(&self) -> Eligibility {
        let eligibility = fetch_eligibility(self.services.api.as_ref()).await;
        self.state.lock().await.eligibility = eligibility.clone();
        eligibility
    }

    pub async fn toggle_mode(&self) -> Result<RecorderMode, RecorderError> {
        let result = self.state.lock().await.modes.toggle();
        let mode = self.report(result)?;
        if mode == RecorderMode::View {
            self.cancel_gps().await;
        }
        Ok(mode)
    }

    pub async fn set_mode(&self, target: RecorderMode) -> Result<RecorderMode, RecorderError> {
        let result = self.state.lock().await.modes.set_mode(target);
        let mode = self.report(result)?;
        if mode == RecorderMode::View {
            self.cancel_gps().await;
        }
        Ok(mode)
    }

    pub async fn dismiss_instructions(&self) {
        self.state.lock().await.modes.dismiss_overlay();
    }

    pub async fn select_method(&self, method: CaptureMethod) -> Result<(), RecorderError> {
        let result = self.state.lock().await.modes.select_method(method);
        self.report(result)?;
        if method == CaptureMethod::Click {
            self.cancel_gps().await;
        }
        Ok(())
    }

    pub async fn handle_map_click(&self, pixel: PixelPoint) -> Result<PendingLocation, RecorderError> {
        let result = self.click_capture(pixel).await;
        self.report(result)
    }

    async fn click_capture(&self, pixel: PixelPoint) -> Result<PendingLocation, RecorderError> {
        {
            let state = self.state.lock().await;
            state.modes.ensure_capture_allowed(state.recording_enabled())?;
            if state.modes.method() != CaptureMethod::Click {
                return Err(RecorderError::Validation(
                    "map clicks are ignored while GPS capture is selected".into(),
                ));
            }
        }

        let pending = capture::capture_click(self.services.projector.as_ref(), pixel)?;
        self.records.lock().await.set_pending(pending);
        Ok(pending)
    }

    /// One position request. A newer request, a cancel, or leaving record mode
    /// abandons this one.
    pub async fn capture_gps(&self) -> Result<PendingLocation, RecorderError> {
        {
            let state = self.state.lock().await;
            let allowed = state
                .modes
                .ensure_capture_allowed(state.recording_enabled())
                .and_then(|_| match state.modes.method() {
                    CaptureMethod::Gps => Ok(()),
                    CaptureMethod::Click => Err(RecorderError::Validation(
                        "select GPS capture first".into(),
                    )),
                });
            drop(state);
            self.report(allowed)?;
        }

        let token = CancellationToken::new();
        if let Some(previous) = self.gps_capture.lock().await.replace(token.clone()) {
            previous.cancel();
        }

        let result = capture::capture_gps(
            self.services.geolocator.as_ref(),
            self.options.geolocation_timeout,
            &token,
        )
        .await;

        {
            let mut slot = self.gps_capture.lock().await;
            if !token.is_cancelled() {
                slot.take();
            }
        }
        if token.is_cancelled() {
            return Err(RecorderError::Geolocation(GeolocationError::Cancelled));
        }

        match result {
            Ok(pending) => {
                self.state.lock().await.geolocation_error = None;
                self.records.lock().await.set_pending(pending);
                Ok(pending)
            }
            Err(err) => {
                log_warn!("geolocation failed: {err}");
                self.state.lock().await.geolocation_error = Some(err);
                self.report(Err(RecorderError::Geolocation(err)))
            }
        }
    }

    /// Drops the pending location and abandons any position request.
    pub async fn cancel_capture(&self) -> Option<PendingLocation> {
        self.cancel_gps().await;
        cancel_pending(&self.records).await
    }

    async fn cancel_gps(&self) {
        if let Some(token) = self.gps_capture.lock().await.take() {
            token.cancel();
        }
    }

    pub async fn confirm(&self) -> Result<ConfirmOutcome, RecorderError> {
        let result = confirm_pending(
            &self.state,
            &self.records,
            self.services.api.as_ref(),
            &self.identities,
            &self.confirming,
        )
        .await;

        let outcome = self.report(result)?;
        let message = if outcome.message.is_empty() {
            format!("Location recorded (id {}).", outcome.id)
        } else {
            format!("{} (id {}).", outcome.message, outcome.id)
        };
        self.services.notifier.notify(Notice::Success(message));
        Ok(outcome)
    }

    pub async fn delete_record(&self, id: i64) -> Result<DeleteOutcome, RecorderError> {
        let identity = self.report(self.identities.get_or_create())?;
        let deps = DeleteDeps {
            api: self.services.api.as_ref(),
            prompt: self.services.prompt.as_ref(),
            notifier: self.services.notifier.as_ref(),
            identity: &identity,
            records: &self.records,
        };
        // Deletion reports its own outcome through the notifier.
        delete_location(id, deps).await
    }

    pub fn identity(&self) -> Result<SessionIdentity, RecorderError> {
        self.report(self.identities.get_or_create())
    }

    pub async fn my_records(&self) -> Result<Vec<LocationRecord>, RecorderError> {
        let identity = self.identity()?;
        Ok(self
            .records
            .lock()
            .await
            .owned_by(&identity)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn zoom_in(&self) -> f64 {
        map::zoom_in(self.services.viewport.as_ref())
    }

    pub fn zoom_out(&self) -> f64 {
        map::zoom_out(self.services.viewport.as_ref())
    }

    pub fn reset_view(&self) {
        map::reset_view(self.services.viewport.as_ref(), &self.options.default_view);
    }

    pub async fn snapshot(&self) -> RecorderSnapshot {
        let state = self.state.lock().await.clone();
        let records = self.records.lock().await;
        let recording_enabled = state.recording_enabled();

        RecorderSnapshot {
            mode: state.modes.mode(),
            view_only: state.modes.is_view_only(),
            can_toggle: state.modes.can_toggle(),
            overlay_visible: state.modes.overlay_visible(),
            method: state.modes.method(),
            method_selection_visible: state.modes.method_selection_visible(recording_enabled),
            capture_enabled: state.capture_enabled(),
            recording_enabled,
            description: state.eligibility.description().map(str::to_string),
            expires_at: state.eligibility.window().expires_at,
            expiry_notice: state.eligibility.expiry_notice(Utc::now()),
            eligibility_checked_at: state.eligibility.fetched_at(),
            eligibility_error: state.eligibility.fetch_error().map(|err| err.to_string()),
            geolocation_error: state.geolocation_error,
            pending: records.pending().copied(),
            records: records.records().to_vec(),
            records_loaded: records.is_loaded(),
            confirm_in_flight: self.confirming.load(Ordering::Acquire),
        }
    }

    fn report<T>(&self, result: Result<T, RecorderError>) -> Result<T, RecorderError> {
        if let Err(err) = &result {
            self.services.notifier.notify(Notice::Error(err.to_string()));
        }
        result
    }
}
