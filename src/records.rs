use crate::identity::SessionIdentity;
use crate::models::{LocationRecord, PendingLocation};

/// Version token for an explicit record refresh. A result is applied only when
/// its token is still the latest one handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefreshToken(u64);

/// Cached server records plus the single pending candidate.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<LocationRecord>,
    pending: Option<PendingLocation>,
    latest_refresh: u64,
    loaded: bool,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[LocationRecord] {
        &self.records
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn owned_by(&self, identity: &SessionIdentity) -> Vec<&LocationRecord> {
        self.records
            .iter()
            .filter(|record| record.is_owned_by(identity))
            .collect()
    }

    pub fn has_record_for(&self, identity: &SessionIdentity) -> bool {
        self.records.iter().any(|record| record.is_owned_by(identity))
    }

    pub fn get(&self, id: i64) -> Option<&LocationRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn begin_refresh(&mut self) -> RefreshToken {
        self.latest_refresh += 1;
        RefreshToken(self.latest_refresh)
    }

    /// Returns false (and changes nothing) when a newer refresh has started
    /// since `token` was issued.
    pub fn apply_refresh(&mut self, token: RefreshToken, records: Vec<LocationRecord>) -> bool {
        if token.0 != self.latest_refresh {
            return false;
        }
        self.records = records;
        self.loaded = true;
        true
    }

    pub(crate) fn append(&mut self, record: LocationRecord) {
        self.records.retain(|existing| existing.id != record.id);
        self.records.insert(0, record);
    }

    pub(crate) fn remove(&mut self, id: i64) -> Option<LocationRecord> {
        let index = self.records.iter().position(|record| record.id == id)?;
        Some(self.records.remove(index))
    }

    pub fn pending(&self) -> Option<&PendingLocation> {
        self.pending.as_ref()
    }

    /// Replaces whatever was pending before.
    pub fn set_pending(&mut self, pending: PendingLocation) -> Option<PendingLocation> {
        self.pending.replace(pending)
    }

    pub fn clear_pending(&mut self) -> Option<PendingLocation> {
        self.pending.take()
    }

    /// Clears the pending location only if it is still `expected`, so a capture
    /// made while a confirm was in flight survives that confirm.
    pub(crate) fn clear_pending_if(&mut self, expected: &PendingLocation) -> bool {
        if self.pending.as_ref() == Some(expected) {
            self.pending = None;
            true
        } else {
            false
        }
    }
}
