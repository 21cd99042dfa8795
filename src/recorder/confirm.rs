//! Committing the pending location, at most one per session.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::api::LocationsApi;
use crate::error::RecorderError;
use crate::identity::{IdentityProvider, SessionIdentity};
use crate::models::{CreateLocationRequest, LocationRecord, PendingLocation};
use crate::records::RecordStore;

use super::state::RecorderState;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmOutcome {
    pub id: i64,
    pub message: String,
    pub record: LocationRecord,
}

/// Holds the single confirm slot; released on drop whatever the outcome.
pub(crate) struct ConfirmSlot<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ConfirmSlot<'a> {
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Result<Self, RecorderError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| RecorderError::ConfirmInFlight)?;
        Ok(Self { flag })
    }
}

impl Drop for ConfirmSlot<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub fn ensure_not_recorded(
    records: &RecordStore,
    identity: &SessionIdentity,
) -> Result<(), RecorderError> {
    if records.has_record_for(identity) {
        return Err(RecorderError::DuplicateRecord);
    }
    Ok(())
}

/// Full confirmation: gate, local duplicate check, fresh server check, create.
///
/// Locks are only held between awaits, never across one.
pub(crate) async fn confirm_pending(
    state: &Mutex<RecorderState>,
    records: &Mutex<RecordStore>,
    api: &dyn LocationsApi,
    identities: &IdentityProvider,
    in_flight: &AtomicBool,
) -> Result<ConfirmOutcome, RecorderError> {
    let _slot = ConfirmSlot::acquire(in_flight)?;

    {
        let guard = state.lock().await;
        guard
            .modes
            .ensure_confirm_allowed(guard.recording_enabled())?;
    }

    let pending = records
        .lock()
        .await
        .pending()
        .copied()
        .ok_or_else(|| RecorderError::Validation("pick a location before confirming".into()))?;
    pending.coordinates().validate()?;

    let identity = identities.get_or_create()?;

    ensure_not_recorded(&*records.lock().await, &identity)?;

    // The cache may predate a confirm from another tab of this session.
    let token = records.lock().await.begin_refresh();
    let fresh = api
        .fetch_locations()
        .await
        .map_err(RecorderError::RecordSync)?;
    {
        let mut guard = records.lock().await;
        if !guard.apply_refresh(token, fresh.clone()) {
            log_warn!("record refresh superseded during confirm; checking the fetched list directly");
        }
        if fresh.iter().any(|record| record.is_owned_by(&identity)) {
            return Err(RecorderError::DuplicateRecord);
        }
        ensure_not_recorded(&guard, &identity)?;
    }

    let request = CreateLocationRequest::new(&pending, &identity);
    let response = api
        .create_location(&request, &identity)
        .await
        .map_err(|err| RecorderError::RecordCreate(err.server_message()))?;

    let record = LocationRecord {
        id: response.id,
        latitude: pending.latitude,
        longitude: pending.longitude,
        timestamp: Some(Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()),
        session_id: Some(identity.as_str().to_string()),
    };

    {
        let mut guard = records.lock().await;
        guard.append(record.clone());
        if !guard.clear_pending_if(&pending) {
            log_info!("pending location changed during confirm; keeping the newer capture");
        }
    }

    log_info!(
        "recorded location {} at ({:.5}, {:.5}) via {}",
        response.id,
        pending.latitude,
        pending.longitude,
        pending.source.as_str()
    );

    Ok(ConfirmOutcome {
        id: response.id,
        message: response.message,
        record,
    })
}

/// Unconfirmed capture discarded by the user.
pub(crate) async fn cancel_pending(records: &Mutex<RecordStore>) -> Option<PendingLocation> {
    records.lock().await.clear_pending()
}
