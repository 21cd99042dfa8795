use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};

/// Host-declared recording window from `GET /api/recording-status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RecordingWindow {
    pub enabled: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl RecordingWindow {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn has_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires_at) if now > expires_at)
    }
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Accepts RFC 3339 as well as the naive ISO forms the server stores (with or
/// without seconds, or a bare date meaning midnight), which are UTC by
/// convention.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, DATE_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
        .ok_or_else(|| anyhow!("invalid timestamp '{value}'"))
}

fn deserialize_optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        // The expiry is informational; an unreadable one must not hide the window.
        Some(value) => match parse_timestamp(value) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(err) => {
                warn!("Ignoring recording window expiry: {err}");
                Ok(None)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_status_without_expiry() {
        let window: RecordingWindow =
            serde_json::from_str(r#"{"enabled":true,"description":"Meetup","expires_at":null}"#)
                .unwrap();
        assert!(window.enabled);
        assert_eq!(window.description.as_deref(), Some("Meetup"));
        assert_eq!(window.expires_at, None);
        assert!(!window.has_expired_at(Utc::now()));
    }

    #[test]
    fn parses_naive_and_offset_expiry() {
        let naive: RecordingWindow =
            serde_json::from_str(r#"{"enabled":true,"expires_at":"2024-05-01T18:30:00"}"#).unwrap();
        let offset: RecordingWindow =
            serde_json::from_str(r#"{"enabled":true,"expires_at":"2024-05-02T03:30:00+09:00"}"#)
                .unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 18, 30, 0).unwrap();
        assert_eq!(naive.expires_at, Some(expected));
        assert_eq!(offset.expires_at, Some(expected));
    }

    #[test]
    fn expiry_is_strictly_after() {
        let expires = Utc.with_ymd_and_hms(2024, 5, 1, 18, 30, 0).unwrap();
        let window = RecordingWindow {
            enabled: true,
            description: None,
            expires_at: Some(expires),
        };
        assert!(!window.has_expired_at(expires));
        assert!(window.has_expired_at(expires + chrono::Duration::seconds(1)));
    }

    #[test]
    fn minute_and_date_only_expiry() {
        let minutes: RecordingWindow =
            serde_json::from_str(r#"{"enabled":true,"expires_at":"2030-05-01T10:00"}"#).unwrap();
        assert_eq!(
            minutes.expires_at,
            Some(Utc.with_ymd_and_hms(2030, 5, 1, 10, 0, 0).unwrap())
        );

        let date: RecordingWindow =
            serde_json::from_str(r#"{"enabled":true,"expires_at":"2030-05-01"}"#).unwrap();
        assert_eq!(
            date.expires_at,
            Some(Utc.with_ymd_and_hms(2030, 5, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn unreadable_expiry_keeps_the_window() {
        let window: RecordingWindow = serde_json::from_str(
            r#"{"enabled":true,"description":"Meetup","expires_at":"next tuesday"}"#,
        )
        .unwrap();
        assert!(window.enabled);
        assert_eq!(window.description.as_deref(), Some("Meetup"));
        assert_eq!(window.expires_at, None);
        assert!(parse_timestamp("next tuesday").is_err());
    }
}
