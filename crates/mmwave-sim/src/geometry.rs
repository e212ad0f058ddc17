//! Planar geometry: positions, bearings, and movement along segments.
//!
//! The world is a flat plane in metres. Bearings are compass azimuths:
//! degrees clockwise from north (positive y), normalized to `[0, 360)`.

use serde::{Deserialize, Serialize};

/// A position on the simulation plane, in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a point from metre coordinates.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Compass azimuth towards another point, degrees in `[0, 360)`.
    ///
    /// Coincident points yield 0.0.
    pub fn azimuth_to(&self, other: &Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        if dx == 0.0 && dy == 0.0 {
            return 0.0;
        }
        let deg = dx.atan2(dy).to_degrees();
        if deg < 0.0 { deg + 360.0 } else { deg }
    }

    /// Move `dist` metres from this point towards `target`.
    ///
    /// Overshooting lands exactly on `target`.
    pub fn step_towards(&self, target: &Point, dist: f64) -> Point {
        let total = self.distance_to(target);
        if total <= dist || total == 0.0 {
            return *target;
        }
        let f = dist / total;
        Point {
            x: self.x + (target.x - self.x) * f,
            y: self.y + (target.y - self.y) * f,
        }
    }
}

/// Signed angular difference `a - b` wrapped to `[-180, 180]` degrees.
pub fn angle_diff_deg(a: f64, b: f64) -> f64 {
    let mut d = (a - b) % 360.0;
    if d > 180.0 {
        d -= 360.0;
    } else if d < -180.0 {
        d += 360.0;
    }
    d
}
