// In-memory card server and a controller wired against it.
#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use meetmap_lib::{
    api::{ApiError, ErrorBody, LocationsApi},
    capture::{GeolocationError, Geolocator},
    identity::{IdentityProvider, MemoryIdentityStore, SessionIdentity},
    map::{DefaultView, SlippyMapView},
    models::{
        CardInfo, Coordinates, CreateLocationRequest, CreateLocationResponse, LocationRecord,
        MessageResponse, RecordingWindow,
    },
    notify::{ChannelNotifier, Notice},
    recorder::{FixedAnswer, RecorderController, RecorderOptions, RecorderServices},
};
use serde_json::json;
use tokio::sync::{mpsc::UnboundedReceiver, Notify};

pub const TOKYO: Coordinates = Coordinates {
    latitude: 35.6895,
    longitude: 139.6917,
};

#[derive(Debug, Default)]
struct ServerState {
    records: Vec<LocationRecord>,
    next_id: i64,
    window: Option<RecordingWindow>,
    window_error: Option<ApiError>,
    create_error: Option<ApiError>,
    delete_error: Option<ApiError>,
    fetch_calls: usize,
    create_started: usize,
    create_calls: usize,
    delete_calls: usize,
    create_sessions: Vec<String>,
    delete_sessions: Vec<String>,
}

/// Enforces one record per session and owner-only deletes, like the real
/// server. Failures can be scripted per endpoint.
#[derive(Debug, Default)]
pub struct FakeServer {
    state: Mutex<ServerState>,
    create_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeServer {
    pub fn open() -> Arc<Self> {
        let server = Self::default();
        server.set_window(RecordingWindow {
            enabled: true,
            description: Some("Tokyo meetup".into()),
            expires_at: None,
        });
        Arc::new(server)
    }

    pub fn closed() -> Arc<Self> {
        let server = Self::default();
        server.set_window(RecordingWindow::disabled());
        Arc::new(server)
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut ServerState) -> T) -> T {
        let mut guard = self.state.lock().unwrap();
        f(&mut guard)
    }

    pub fn set_window(&self, window: RecordingWindow) {
        self.with_state(|s| s.window = Some(window));
    }

    pub fn fail_window(&self, err: ApiError) {
        self.with_state(|s| s.window_error = Some(err));
    }

    pub fn fail_create(&self, err: ApiError) {
        self.with_state(|s| s.create_error = Some(err));
    }

    pub fn fail_delete(&self, err: ApiError) {
        self.with_state(|s| s.delete_error = Some(err));
    }

    /// Holds every create until the returned handle is notified.
    pub fn gate_creates(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.create_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn seed(&self, latitude: f64, longitude: f64, session: Option<&str>) -> i64 {
        self.with_state(|s| {
            s.next_id += 1;
            let id = s.next_id;
            s.records.push(LocationRecord {
                id,
                latitude,
                longitude,
                timestamp: Some("2024-05-01 09:30:00".into()),
                session_id: session.map(str::to_string),
            });
            id
        })
    }

    pub fn records(&self) -> Vec<LocationRecord> {
        self.with_state(|s| s.records.clone())
    }

    pub fn fetch_calls(&self) -> usize {
        self.with_state(|s| s.fetch_calls)
    }

    pub fn create_started(&self) -> usize {
        self.with_state(|s| s.create_started)
    }

    pub fn create_calls(&self) -> usize {
        self.with_state(|s| s.create_calls)
    }

    pub fn delete_calls(&self) -> usize {
        self.with_state(|s| s.delete_calls)
    }

    pub fn create_sessions(&self) -> Vec<String> {
        self.with_state(|s| s.create_sessions.clone())
    }

    pub fn delete_sessions(&self) -> Vec<String> {
        self.with_state(|s| s.delete_sessions.clone())
    }
}

#[async_trait]
impl LocationsApi for FakeServer {
    async fn fetch_locations(&self) -> Result<Vec<LocationRecord>, ApiError> {
        Ok(self.with_state(|s| {
            s.fetch_calls += 1;
            s.records.clone()
        }))
    }

    async fn fetch_recording_window(&self) -> Result<RecordingWindow, ApiError> {
        self.with_state(|s| match &s.window_error {
            Some(err) => Err(err.clone()),
            None => Ok(s.window.clone().unwrap_or_default()),
        })
    }

    async fn create_location(
        &self,
        request: &CreateLocationRequest,
        identity: &SessionIdentity,
    ) -> Result<CreateLocationResponse, ApiError> {
        self.with_state(|s| s.create_started += 1);
        let gate = self.create_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.with_state(|s| {
            s.create_calls += 1;
            s.create_sessions.push(identity.as_str().to_string());
            if let Some(err) = &s.create_error {
                return Err(err.clone());
            }
            if s.records
                .iter()
                .any(|record| record.session_id.as_deref() == Some(identity.as_str()))
            {
                return Err(ApiError::Http {
                    status: 400,
                    body: Some(ErrorBody::Json(
                        json!({"detail": "This session has already recorded a location"}),
                    )),
                });
            }
            s.next_id += 1;
            let id = s.next_id;
            s.records.push(LocationRecord {
                id,
                latitude: request.latitude,
                longitude: request.longitude,
                timestamp: Some("2024-05-01 10:00:00".into()),
                session_id: Some(request.session_id.clone()),
            });
            Ok(CreateLocationResponse {
                message: "Location recorded successfully".into(),
                id,
            })
        })
    }

    async fn delete_location(
        &self,
        id: i64,
        identity: &SessionIdentity,
    ) -> Result<MessageResponse, ApiError> {
        self.with_state(|s| {
            s.delete_calls += 1;
            s.delete_sessions.push(identity.as_str().to_string());
            if let Some(err) = &s.delete_error {
                return Err(err.clone());
            }
            let position = s.records.iter().position(|record| {
                record.id == id && record.session_id.as_deref() == Some(identity.as_str())
            });
            match position {
                Some(index) => {
                    s.records.remove(index);
                    Ok(MessageResponse {
                        message: "Location deleted successfully".into(),
                    })
                }
                None => Err(ApiError::Http {
                    status: 404,
                    body: Some(ErrorBody::Text(
                        "Location not found or not owned by user".into(),
                    )),
                }),
            }
        })
    }

    async fn fetch_card_info(&self) -> Result<CardInfo, ApiError> {
        Ok(CardInfo {
            name: Some("Aiko Tanaka".into()),
            company: Some("Example KK".into()),
            ..CardInfo::default()
        })
    }
}

/// Answers position requests from a queue; an empty queue never answers.
#[derive(Debug, Default)]
pub struct ScriptedGeolocator {
    fixes: Mutex<VecDeque<Result<Coordinates, GeolocationError>>>,
}

impl ScriptedGeolocator {
    pub fn new(fixes: Vec<Result<Coordinates, GeolocationError>>) -> Self {
        Self {
            fixes: Mutex::new(fixes.into()),
        }
    }
}

#[async_trait]
impl Geolocator for ScriptedGeolocator {
    async fn current_position(&self) -> Result<Coordinates, GeolocationError> {
        let next = self.fixes.lock().unwrap().pop_front();
        match next {
            Some(fix) => fix,
            None => std::future::pending().await,
        }
    }
}

pub struct HarnessConfig {
    pub view_only: bool,
    pub identity: Option<String>,
    pub geolocator: Arc<dyn Geolocator>,
    pub delete_answer: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            view_only: false,
            identity: None,
            geolocator: Arc::new(ScriptedGeolocator::default()),
            delete_answer: true,
        }
    }
}

pub struct Harness {
    pub controller: RecorderController,
    pub server: Arc<FakeServer>,
    pub view: Arc<SlippyMapView>,
    pub identities: Arc<IdentityProvider>,
    notices: UnboundedReceiver<Notice>,
}

impl Harness {
    pub fn new(server: Arc<FakeServer>) -> Self {
        Self::with_config(server, HarnessConfig::default())
    }

    pub fn with_config(server: Arc<FakeServer>, config: HarnessConfig) -> Self {
        let default_view = DefaultView {
            center: TOKYO,
            zoom: 10.0,
        };
        let view = Arc::new(SlippyMapView::new(default_view, 800.0, 600.0, 2.0, 19.0));
        let (notifier, notices) = ChannelNotifier::new();
        let store = match config.identity {
            Some(value) => MemoryIdentityStore::with_value(value),
            None => MemoryIdentityStore::new(),
        };
        let identities = Arc::new(IdentityProvider::new(store));

        let services = RecorderServices {
            api: server.clone(),
            geolocator: config.geolocator,
            projector: view.clone(),
            viewport: view.clone(),
            notifier: Arc::new(notifier),
            prompt: Arc::new(FixedAnswer(config.delete_answer)),
        };
        let options = RecorderOptions {
            view_only: config.view_only,
            geolocation_timeout: std::time::Duration::from_secs(15),
            default_view,
        };

        Self {
            controller: RecorderController::new(services, identities.clone(), options),
            server,
            view,
            identities,
            notices,
        }
    }

    /// Mounts, dismisses the overlay and clicks on `point`.
    pub async fn click_at(&self, point: Coordinates) {
        let pixel = self.view.pixel_for(point);
        self.controller.handle_map_click(pixel).await.unwrap();
    }

    pub async fn ready(&self) {
        self.controller.mount().await;
        self.controller.dismiss_instructions().await;
    }

    pub fn notices(&mut self) -> Vec<Notice> {
        let mut drained = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            drained.push(notice);
        }
        drained
    }
}

pub fn close_to(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}
