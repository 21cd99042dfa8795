use serde::{Deserialize, Serialize};

use crate::error::RecorderError;
use crate::identity::SessionIdentity;

pub const LATITUDE_RANGE: (f64, f64) = (-90.0, 90.0);
pub const LONGITUDE_RANGE: (f64, f64) = (-180.0, 180.0);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Rejects points the server would refuse (and NaN, which compares false
    /// against both bounds).
    pub fn validate(&self) -> Result<(), RecorderError> {
        let (min_lat, max_lat) = LATITUDE_RANGE;
        let (min_lon, max_lon) = LONGITUDE_RANGE;

        if !(min_lat..=max_lat).contains(&self.latitude) {
            return Err(RecorderError::Validation(format!(
                "latitude {} must be between {min_lat} and {max_lat}",
                self.latitude
            )));
        }
        if !(min_lon..=max_lon).contains(&self.longitude) {
            return Err(RecorderError::Validation(format!(
                "longitude {} must be between {min_lon} and {max_lon}",
                self.longitude
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CaptureSource {
    Click,
    Gps,
}

impl CaptureSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureSource::Click => "click",
            CaptureSource::Gps => "gps",
        }
    }
}

/// Candidate point captured but not yet confirmed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PendingLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub source: CaptureSource,
}

impl PendingLocation {
    pub fn new(coordinates: Coordinates, source: CaptureSource) -> Self {
        Self {
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
            source,
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// Server-owned record as returned by `GET /api/locations`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationRecord {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl LocationRecord {
    pub fn is_owned_by(&self, identity: &SessionIdentity) -> bool {
        self.session_id.as_deref() == Some(identity.as_str())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreateLocationRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub session_id: String,
}

impl CreateLocationRequest {
    pub fn new(pending: &PendingLocation, identity: &SessionIdentity) -> Self {
        Self {
            latitude: pending.latitude,
            longitude: pending.longitude,
            session_id: identity.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateLocationResponse {
    #[serde(default)]
    pub message: String,
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn rejects_out_of_range_points() {
        assert!(Coordinates::new(35.6895, 139.6917).validate().is_ok());
        assert!(Coordinates::new(-90.0, 180.0).validate().is_ok());
        assert_matches!(
            Coordinates::new(90.5, 0.0).validate(),
            Err(RecorderError::Validation(msg)) if msg.contains("latitude")
        );
        assert_matches!(
            Coordinates::new(0.0, -180.01).validate(),
            Err(RecorderError::Validation(msg)) if msg.contains("longitude")
        );
        assert!(Coordinates::new(f64::NAN, 0.0).validate().is_err());
    }

    #[test]
    fn record_tolerates_null_owner_and_timestamp() {
        let raw = r#"[{"id":1,"latitude":35.0,"longitude":139.0,"timestamp":null,"session_id":null},
                     {"id":2,"latitude":35.0,"longitude":139.0}]"#;
        let records: Vec<LocationRecord> = serde_json::from_str(raw).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.session_id.is_none()));
    }

    #[test]
    fn ownership_matches_exact_session() {
        let me = SessionIdentity::parse("user_1700000000000_abc123xyz").unwrap();
        let record = LocationRecord {
            id: 7,
            latitude: 0.0,
            longitude: 0.0,
            timestamp: None,
            session_id: Some("user_1700000000000_abc123xyz".into()),
        };
        assert!(record.is_owned_by(&me));

        let other = SessionIdentity::parse("user_1700000000001_zzz").unwrap();
        assert!(!record.is_owned_by(&other));
    }

    #[test]
    fn create_request_serializes_snake_case() {
        let me = SessionIdentity::parse("user_1_a").unwrap();
        let pending = PendingLocation::new(Coordinates::new(1.5, 2.5), CaptureSource::Gps);
        let body = serde_json::to_value(CreateLocationRequest::new(&pending, &me)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"latitude": 1.5, "longitude": 2.5, "session_id": "user_1_a"})
        );
    }
}
