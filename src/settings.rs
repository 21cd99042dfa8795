use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
    time::Duration,
};

use crate::map::DefaultView;
use crate::models::Coordinates;

pub const API_URL_ENV: &str = "MEETMAP_API_URL";
pub const IDENTITY_PATH_ENV: &str = "MEETMAP_IDENTITY_PATH";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub http_timeout_secs: u64,
    pub geolocation_timeout_secs: u64,
    pub default_center: Coordinates,
    pub default_zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub identity_path: Option<PathBuf>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8001".into(),
            http_timeout_secs: 10,
            geolocation_timeout_secs: crate::recorder::controller::DEFAULT_GEOLOCATION_TIMEOUT
                .as_secs(),
            default_center: Coordinates::new(35.6895, 139.6917),
            default_zoom: 10.0,
            min_zoom: 2.0,
            max_zoom: 19.0,
            identity_path: None,
        }
    }
}

impl ClientSettings {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    pub fn geolocation_timeout(&self) -> Duration {
        Duration::from_secs(self.geolocation_timeout_secs.max(1))
    }

    pub fn default_view(&self) -> DefaultView {
        DefaultView {
            center: self.default_center,
            zoom: self.default_zoom,
        }
    }

    /// Environment wins over the file, so one-off runs need no edits.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_base_url = url;
            }
        }
        if let Ok(path) = std::env::var(IDENTITY_PATH_ENV) {
            if !path.trim().is_empty() {
                self.identity_path = Some(PathBuf::from(path));
            }
        }
        self
    }

    pub fn resolved_identity_path(&self) -> PathBuf {
        self.identity_path
            .clone()
            .unwrap_or_else(AppDirs::identity_path)
    }
}

/// Platform directories for settings and the durable identity.
pub struct AppDirs;

impl AppDirs {
    fn project() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "meetmap")
    }

    pub fn settings_path() -> PathBuf {
        Self::project()
            .map(|dirs| dirs.config_dir().join("settings.json"))
            .unwrap_or_else(|| PathBuf::from("meetmap_settings.json"))
    }

    pub fn identity_path() -> PathBuf {
        Self::project()
            .map(|dirs| dirs.data_local_dir().join("identity.json"))
            .unwrap_or_else(|| PathBuf::from("meetmap_identity.json"))
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<ClientSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            ClientSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> ClientSettings {
        self.data.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn update(&self, settings: ClientSettings) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(|p| p.into_inner());
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    fn persist(&self, data: &ClientSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
