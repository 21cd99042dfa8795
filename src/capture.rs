//! Turning a map click or a device position fix into a pending location.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::error::RecorderError;
use crate::models::{CaptureSource, Coordinates, PendingLocation};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMethod {
    #[default]
    Click,
    Gps,
}

/// Position on the rendered map surface, in display pixels from the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Pixel-to-geographic translation owned by the map widget.
pub trait MapProjector: Send + Sync {
    /// `None` when the pixel falls outside the rendered map.
    fn to_geographic(&self, pixel: PixelPoint) -> Option<Coordinates>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GeolocationError {
    #[error("location permission was denied")]
    PermissionDenied,
    #[error("position unavailable")]
    PositionUnavailable,
    #[error("timed out waiting for a position fix")]
    Timeout,
    #[error("geolocation is not supported on this device")]
    Unsupported,
    #[error("position request cancelled")]
    Cancelled,
}

impl GeolocationError {
    /// Whether asking again without changing any settings might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GeolocationError::PositionUnavailable | GeolocationError::Timeout
        )
    }
}

/// Device geolocation capability.
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, GeolocationError>;
}

/// Geolocator for hosts without a positioning device.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedGeolocator;

#[async_trait]
impl Geolocator for UnsupportedGeolocator {
    async fn current_position(&self) -> Result<Coordinates, GeolocationError> {
        Err(GeolocationError::Unsupported)
    }
}

pub fn capture_click(
    projector: &dyn MapProjector,
    pixel: PixelPoint,
) -> Result<PendingLocation, RecorderError> {
    let coordinates = projector.to_geographic(pixel).ok_or_else(|| {
        RecorderError::Validation(format!(
            "click at ({}, {}) is outside the map",
            pixel.x, pixel.y
        ))
    })?;
    coordinates.validate()?;
    Ok(PendingLocation::new(coordinates, CaptureSource::Click))
}

/// Single position request, bounded by `timeout` and abandoned when `cancel`
/// fires. Never retried here; the user triggers the next attempt.
pub async fn capture_gps(
    geolocator: &dyn Geolocator,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<PendingLocation, GeolocationError> {
    let coordinates = tokio::select! {
        _ = cancel.cancelled() => return Err(GeolocationError::Cancelled),
        fix = tokio::time::timeout(timeout, geolocator.current_position()) => {
            fix.map_err(|_| GeolocationError::Timeout)??
        }
    };

    if coordinates.validate().is_err() {
        return Err(GeolocationError::PositionUnavailable);
    }
    Ok(PendingLocation::new(coordinates, CaptureSource::Gps))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProjector(Option<Coordinates>);

    impl MapProjector for FixedProjector {
        fn to_geographic(&self, _pixel: PixelPoint) -> Option<Coordinates> {
            self.0
        }
    }

    struct FixedGeolocator(Result<Coordinates, GeolocationError>);

    #[async_trait]
    impl Geolocator for FixedGeolocator {
        async fn current_position(&self) -> Result<Coordinates, GeolocationError> {
            self.0
        }
    }

    struct StalledGeolocator;

    #[async_trait]
    impl Geolocator for StalledGeolocator {
        async fn current_position(&self) -> Result<Coordinates, GeolocationError> {
            std::future::pending().await
        }
    }

    #[test]
    fn click_wraps_projected_point() {
        let projector = FixedProjector(Some(Coordinates::new(35.6895, 139.6917)));
        let pending = capture_click(&projector, PixelPoint::new(10.0, 20.0)).unwrap();
        assert_eq!(pending.source, CaptureSource::Click);
        assert_eq!(pending.coordinates(), Coordinates::new(35.6895, 139.6917));
    }

    #[test]
    fn click_off_map_is_rejected() {
        let projector = FixedProjector(None);
        assert!(matches!(
            capture_click(&projector, PixelPoint::new(-1.0, -1.0)),
            Err(RecorderError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn gps_success_is_tagged_gps() {
        let geolocator = FixedGeolocator(Ok(Coordinates::new(35.6895, 139.6917)));
        let pending = capture_gps(&geolocator, Duration::from_secs(1), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(pending.source, CaptureSource::Gps);
    }

    #[tokio::test]
    async fn gps_failure_is_passed_through() {
        let geolocator = FixedGeolocator(Err(GeolocationError::PermissionDenied));
        let err = capture_gps(&geolocator, Duration::from_secs(1), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, GeolocationError::PermissionDenied);
    }

    #[tokio::test(start_paused = true)]
    async fn gps_times_out() {
        let err = capture_gps(
            &StalledGeolocator,
            Duration::from_secs(15),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert_eq!(err, GeolocationError::Timeout);
    }

    #[tokio::test]
    async fn gps_can_be_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = capture_gps(&StalledGeolocator, Duration::from_secs(15), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, GeolocationError::Cancelled);
    }

    #[tokio::test]
    async fn unsupported_device_reports_unsupported() {
        let err = capture_gps(
            &UnsupportedGeolocator,
            Duration::from_secs(1),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert_eq!(err, GeolocationError::Unsupported);
        assert!(!err.is_retryable());
    }
}
