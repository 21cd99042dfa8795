//! Headless map view: Web-Mercator (slippy map) maths for turning display
//! pixels into coordinates, plus the zoom/reset viewport operations.

use std::f64::consts::PI;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::capture::{MapProjector, PixelPoint};
use crate::models::Coordinates;

pub const TILE_SIZE: f64 = 256.0;
pub const ZOOM_STEP: f64 = 1.0;
/// Web-Mercator cannot represent the poles.
pub const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_78;

/// Viewport state owned by the map widget.
pub trait MapViewport: Send + Sync {
    fn zoom(&self) -> f64;
    fn set_zoom(&self, zoom: f64);
    fn center(&self) -> Coordinates;
    fn set_center(&self, center: Coordinates);
    /// Inclusive `(min, max)` zoom the widget supports.
    fn zoom_bounds(&self) -> (f64, f64);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DefaultView {
    pub center: Coordinates,
    pub zoom: f64,
}

pub fn zoom_in(viewport: &dyn MapViewport) -> f64 {
    step_zoom(viewport, ZOOM_STEP)
}

pub fn zoom_out(viewport: &dyn MapViewport) -> f64 {
    step_zoom(viewport, -ZOOM_STEP)
}

pub fn reset_view(viewport: &dyn MapViewport, default: &DefaultView) {
    viewport.set_center(default.center);
    viewport.set_zoom(clamp_zoom(viewport, default.zoom));
}

fn step_zoom(viewport: &dyn MapViewport, delta: f64) -> f64 {
    let next = clamp_zoom(viewport, viewport.zoom() + delta);
    viewport.set_zoom(next);
    next
}

fn clamp_zoom(viewport: &dyn MapViewport, zoom: f64) -> f64 {
    let (min, max) = viewport.zoom_bounds();
    zoom.clamp(min, max)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ViewState {
    center: Coordinates,
    zoom: f64,
}

/// In-memory slippy-map view of a fixed pixel size.
#[derive(Debug)]
pub struct SlippyMapView {
    state: RwLock<ViewState>,
    width: f64,
    height: f64,
    min_zoom: f64,
    max_zoom: f64,
}

impl SlippyMapView {
    pub fn new(default: DefaultView, width: f64, height: f64, min_zoom: f64, max_zoom: f64) -> Self {
        let (min_zoom, max_zoom) = if min_zoom <= max_zoom {
            (min_zoom, max_zoom)
        } else {
            (max_zoom, min_zoom)
        };
        Self {
            state: RwLock::new(ViewState {
                center: default.center,
                zoom: default.zoom.clamp(min_zoom, max_zoom),
            }),
            width,
            height,
            min_zoom,
            max_zoom,
        }
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn snapshot(&self) -> ViewState {
        *self.state.read().unwrap_or_else(|p| p.into_inner())
    }

    /// Display pixel at which `coordinates` is drawn under the current view.
    pub fn pixel_for(&self, coordinates: Coordinates) -> PixelPoint {
        let view = self.snapshot();
        let world = world_size(view.zoom);
        let (cx, cy) = project(view.center, world);
        let (x, y) = project(coordinates, world);
        PixelPoint::new(x - cx + self.width / 2.0, y - cy + self.height / 2.0)
    }
}

impl MapProjector for SlippyMapView {
    fn to_geographic(&self, pixel: PixelPoint) -> Option<Coordinates> {
        if !(0.0..=self.width).contains(&pixel.x) || !(0.0..=self.height).contains(&pixel.y) {
            return None;
        }

        let view = self.snapshot();
        let world = world_size(view.zoom);
        let (cx, cy) = project(view.center, world);
        let wx = cx + pixel.x - self.width / 2.0;
        let wy = cy + pixel.y - self.height / 2.0;
        if !(0.0..=world).contains(&wy) {
            return None;
        }

        let longitude = wrap_longitude(wx / world * 360.0 - 180.0);
        let latitude = (PI * (1.0 - 2.0 * wy / world)).sinh().atan().to_degrees();
        Some(Coordinates::new(latitude, longitude))
    }
}

impl MapViewport for SlippyMapView {
    fn zoom(&self) -> f64 {
        self.snapshot().zoom
    }

    fn set_zoom(&self, zoom: f64) {
        let mut guard = self.state.write().unwrap_or_else(|p| p.into_inner());
        guard.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    fn center(&self) -> Coordinates {
        self.snapshot().center
    }

    fn set_center(&self, center: Coordinates) {
        let mut guard = self.state.write().unwrap_or_else(|p| p.into_inner());
        guard.center = center;
    }

    fn zoom_bounds(&self) -> (f64, f64) {
        (self.min_zoom, self.max_zoom)
    }
}

fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * zoom.exp2()
}

fn project(coordinates: Coordinates, world: f64) -> (f64, f64) {
    let latitude = coordinates
        .latitude
        .clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE)
        .to_radians();
    let x = (coordinates.longitude + 180.0) / 360.0 * world;
    let y = (1.0 - (latitude.tan() + 1.0 / latitude.cos()).ln() / PI) / 2.0 * world;
    (x, y)
}

fn wrap_longitude(longitude: f64) -> f64 {
    let wrapped = (longitude + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid maps +180 to -180; keep the eastern edge when that is what was asked for.
    if wrapped == -180.0 && longitude > 0.0 {
        180.0
    } else {
        wrapped
    }
}
