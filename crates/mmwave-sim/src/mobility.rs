//! Mobility models: stationary nodes and constant-speed waypoint routes.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Convert km/h to m/s.
pub fn kph_to_mps(kph: f64) -> f64 {
    kph / 3.6
}

/// Convert m/s to km/h.
pub fn mps_to_kph(mps: f64) -> f64 {
    mps * 3.6
}

/// A polyline route traversed at constant speed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathMobility {
    waypoints: Vec<Point>,
    speed_mps: f64,
    /// Index of the waypoint currently being approached.
    next: usize,
    pos: Point,
}

impl PathMobility {
    /// Create a route over `waypoints` at `speed_mps`.
    ///
    /// The node starts at the first waypoint. A single-point route is
    /// immediately finished.
    pub fn new(waypoints: Vec<Point>, speed_mps: f64) -> Self {
        let pos = waypoints.first().copied().unwrap_or(Point::new(0.0, 0.0));
        Self {
            waypoints,
            speed_mps,
            next: 1,
            pos,
        }
    }

    /// Advance the node by `dt` seconds. Returns true when the route end
    /// has been reached (including calls after it already finished).
    pub fn advance(&mut self, dt: f64) -> bool {
        let mut remaining = self.speed_mps * dt;
        while remaining > 0.0 {
            let Some(target) = self.waypoints.get(self.next) else {
                return true;
            };
            let leg = self.pos.distance_to(target);
            if leg <= remaining {
                self.pos = *target;
                self.next += 1;
                remaining -= leg;
            } else {
                self.pos = self.pos.step_towards(target, remaining);
                remaining = 0.0;
            }
        }
        self.is_finished()
    }

    /// Current position.
    pub fn position(&self) -> Point {
        self.pos
    }

    /// Compass heading of the current leg. Finished routes keep the last
    /// leg's heading; degenerate routes report 0.
    pub fn heading_deg(&self) -> f64 {
        let target = self
            .waypoints
            .get(self.next)
            .or_else(|| self.waypoints.last());
        match target {
            Some(t) => self.pos.azimuth_to(t),
            None => 0.0,
        }
    }

    pub fn speed_mps(&self) -> f64 {
        self.speed_mps
    }

    pub fn speed_kph(&self) -> f64 {
        mps_to_kph(self.speed_mps)
    }

    /// Whether all waypoints have been consumed.
    pub fn is_finished(&self) -> bool {
        self.next >= self.waypoints.len()
    }
}

/// Mobility of a simulation node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Mobility {
    /// Fixed installation (base-station beams).
    Stationary(Point),
    /// Vehicle following a route.
    Route(PathMobility),
}

impl Mobility {
    /// Current position.
    pub fn position(&self) -> Point {
        match self {
            Mobility::Stationary(p) => *p,
            Mobility::Route(r) => r.position(),
        }
    }

    /// Advance by `dt` seconds; true when a route just is (or was) finished.
    /// Stationary nodes never finish.
    pub fn advance(&mut self, dt: f64) -> bool {
        match self {
            Mobility::Stationary(_) => false,
            Mobility::Route(r) => r.advance(dt),
        }
    }

    /// Heading in degrees; stationary nodes report 0.
    pub fn heading_deg(&self) -> f64 {
        match self {
            Mobility::Stationary(_) => 0.0,
            Mobility::Route(r) => r.heading_deg(),
        }
    }

    /// Speed in km/h; stationary nodes report 0.
    pub fn speed_kph(&self) -> f64 {
        match self {
            Mobility::Stationary(_) => 0.0,
            Mobility::Route(r) => r.speed_kph(),
        }
    }
}
