//! Anonymous visitor identity, created once and kept in durable local storage.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
    sync::{Mutex, RwLock},
};

use anyhow::{Context, Result};
use chrono::Utc;
use log::{info, warn};
use rand::Rng;
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};

use crate::error::RecorderError;

pub const IDENTITY_PREFIX: &str = "user_";
const RANDOM_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionIdentity(String);

impl SessionIdentity {
    pub fn generate() -> Self {
        Self::generate_with(Utc::now().timestamp_millis(), &mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(unix_millis: i64, rng: &mut R) -> Self {
        let suffix: String = (0..RANDOM_SUFFIX_LEN)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        Self(format!("{IDENTITY_PREFIX}{}_{suffix}", unix_millis.max(0)))
    }

    /// Accepts only the generated shape `user_<digits>_<lowercase alnum>`.
    pub fn parse(raw: &str) -> Option<Self> {
        let rest = raw.strip_prefix(IDENTITY_PREFIX)?;
        let (digits, suffix) = rest.split_once('_')?;
        let digits_ok = !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit());
        let suffix_ok = !suffix.is_empty()
            && suffix
                .bytes()
                .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase());
        (digits_ok && suffix_ok).then(|| Self(raw.to_string()))
    }

    /// Wraps a stored value as-is. Stored identities of a different shape are
    /// kept; only values that cannot travel in the session header are refused.
    fn from_stored(raw: String) -> Option<Self> {
        if raw.trim().is_empty() || HeaderValue::from_str(&raw).is_err() {
            return None;
        }
        Some(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Durable key holding the identity string.
pub trait IdentityStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, value: &str) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredIdentity {
    session_id: String,
}

/// JSON file store. A missing or unparsable file reads as "no identity yet".
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IdentityStore for FileIdentityStore {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read identity from {}", self.path.display()))?;
        Ok(serde_json::from_str::<StoredIdentity>(&contents)
            .ok()
            .map(|stored| stored.session_id))
    }

    fn save(&self, value: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create identity directory {}", parent.display())
            })?;
        }
        let serialized = serde_json::to_string_pretty(&StoredIdentity {
            session_id: value.to_string(),
        })?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write identity to {}", self.path.display()))
    }
}

/// Process-local store, for tests and for clients without a writable disk.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    value: Mutex<Option<String>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(value.into())),
        }
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn load(&self) -> Result<Option<String>> {
        let guard = self.value.lock().unwrap_or_else(|p| p.into_inner());
        Ok(guard.clone())
    }

    fn save(&self, value: &str) -> Result<()> {
        let mut guard = self.value.lock().unwrap_or_else(|p| p.into_inner());
        *guard = Some(value.to_string());
        Ok(())
    }
}

/// Resolves the identity lazily and caches it for the life of the process.
pub struct IdentityProvider {
    store: Box<dyn IdentityStore>,
    cached: RwLock<Option<SessionIdentity>>,
}

impl IdentityProvider {
    pub fn new(store: impl IdentityStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            cached: RwLock::new(None),
        }
    }

    pub fn current(&self) -> Option<SessionIdentity> {
        self.cached
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn get_or_create(&self) -> Result<SessionIdentity, RecorderError> {
        if let Some(identity) = self.current() {
            return Ok(identity);
        }

        let mut guard = self.cached.write().unwrap_or_else(|p| p.into_inner());
        if let Some(identity) = guard.as_ref() {
            return Ok(identity.clone());
        }

        let stored = self
            .store
            .load()
            .map_err(|err| RecorderError::Identity(format!("{err:#}")))?;

        let reusable = stored.and_then(|value| {
            let escaped = value.escape_debug().to_string();
            let identity = SessionIdentity::from_stored(value);
            if identity.is_none() && !escaped.trim().is_empty() {
                warn!("Stored session identity \"{escaped}\" is unusable; generating a new one");
            }
            identity
        });

        let identity = match reusable {
            Some(identity) => identity,
            None => {
                let identity = SessionIdentity::generate();
                // An unwritable store still yields a usable identity for this run.
                match self.store.save(identity.as_str()) {
                    Ok(()) => info!("Created session identity {identity}"),
                    Err(err) => warn!("Session identity {identity} not persisted: {err:#}"),
                }
                identity
            }
        };

        *guard = Some(identity.clone());
        Ok(identity)
    }
}
