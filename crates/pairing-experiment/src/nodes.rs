//! Simulation nodes: sector beams of the small cell and vehicles.

use mmwave_sim::antenna::{AntennaPattern, SectorPattern};
use mmwave_sim::geometry::Point;
use mmwave_sim::mobility::PathMobility;
use mmwave_sim::radio::{Radio, RadioConfig};
use serde::Serialize;

/// Index of a beam within the scenario.
pub type BeamIdx = usize;
/// Index of a vehicle within the scenario.
pub type VehicleIdx = usize;

/// One sector beam of the base station.
#[derive(Debug, Clone)]
pub struct Beam {
    pub id: String,
    pub location: Point,
    pub radio: Radio,
    /// Vehicle currently served by this beam, if any.
    pub serving: Option<VehicleIdx>,
}

impl Beam {
    /// Create a sector beam pointing at `boresight_deg` with the given
    /// sector width.
    pub fn sector(id: String, location: Point, boresight_deg: f64, sector_width_deg: f64) -> Self {
        let pattern =
            AntennaPattern::Sector(SectorPattern::from_sector_width(boresight_deg, sector_width_deg));
        Self {
            id,
            location,
            radio: Radio::new(RadioConfig::beam_default(), pattern),
            serving: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.serving.is_none()
    }
}

/// One completed association session between a vehicle and a beam.
#[derive(Debug, Clone, Serialize)]
pub struct BeamSession {
    pub beam: String,
    pub duration_secs: f64,
}

/// A vehicle with a steered radio following road routes.
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: String,
    pub radio: Radio,
    pub mobility: PathMobility,
    /// Beam this vehicle is associated with, if any.
    pub associated: Option<BeamIdx>,
    /// Open association session: (beam id, start time).
    current_session: Option<(String, f64)>,
    sessions: Vec<BeamSession>,
}

impl Vehicle {
    pub fn new(id: String, route: PathMobility) -> Self {
        Self {
            id,
            radio: Radio::new(RadioConfig::vehicle_default(), AntennaPattern::Steered),
            mobility: route,
            associated: None,
            current_session: None,
            sessions: Vec::new(),
        }
    }

    pub fn position(&self) -> Point {
        self.mobility.position()
    }

    pub fn heading_deg(&self) -> f64 {
        self.mobility.heading_deg()
    }

    pub fn speed_kph(&self) -> f64 {
        self.mobility.speed_kph()
    }

    /// Straight-line range to a beam, as derived from timing advance.
    pub fn distance_to_beam(&self, beam: &Beam) -> f64 {
        self.position().distance_to(&beam.location)
    }

    /// Replace the route after the previous one finished.
    pub fn set_route(&mut self, route: PathMobility) {
        self.mobility = route;
    }

    /// Record a new association.
    pub fn connect(&mut self, beam: BeamIdx, beam_id: &str, now: f64) {
        self.associated = Some(beam);
        if let Some((prev, start)) = self.current_session.take() {
            // A direct beam change: close the previous session first.
            self.sessions.push(BeamSession { beam: prev, duration_secs: now - start });
        }
        self.current_session = Some((beam_id.to_string(), now));
    }

    /// Record the loss of the current association.
    pub fn disconnect(&mut self, now: f64) {
        self.associated = None;
        if let Some((beam, start)) = self.current_session.take() {
            self.sessions.push(BeamSession { beam, duration_secs: now - start });
        }
    }

    /// Close any open session at the end of the run.
    pub fn finish(&mut self, now: f64) {
        if let Some((beam, start)) = self.current_session.take() {
            self.sessions.push(BeamSession { beam, duration_secs: now - start });
        }
    }

    /// Completed association sessions, oldest first.
    pub fn beam_sessions(&self) -> &[BeamSession] {
        &self.sessions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_vehicle() -> Vehicle {
        let route = PathMobility::new(vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)], 10.0);
        Vehicle::new("Car 0".to_string(), route)
    }

    #[test]
    fn test_beam_starts_idle() {
        let beam = Beam::sector("BS-01".to_string(), Point::new(0.0, 0.0), 0.0, 60.0);
        assert!(beam.is_idle());
    }

    #[test]
    fn test_session_recorded_on_disconnect() {
        let mut v = test_vehicle();
        v.connect(2, "BS-03", 10.0);
        assert_eq!(v.associated, Some(2));

        v.disconnect(25.0);
        assert_eq!(v.associated, None);
        assert_eq!(v.beam_sessions().len(), 1);
        assert_eq!(v.beam_sessions()[0].beam, "BS-03");
        assert!((v.beam_sessions()[0].duration_secs - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_direct_beam_change_closes_previous_session() {
        let mut v = test_vehicle();
        v.connect(0, "BS-01", 0.0);
        v.connect(1, "BS-02", 30.0);
        assert_eq!(v.beam_sessions().len(), 1);
        assert_eq!(v.beam_sessions()[0].beam, "BS-01");
        assert!((v.beam_sessions()[0].duration_secs - 30.0).abs() < 1e-12);

        v.disconnect(45.0);
        assert_eq!(v.beam_sessions().len(), 2);
        assert_eq!(v.beam_sessions()[1].beam, "BS-02");
    }

    #[test]
    fn test_finish_flushes_open_session() {
        let mut v = test_vehicle();
        v.connect(0, "BS-01", 5.0);
        v.finish(12.0);
        assert_eq!(v.beam_sessions().len(), 1);
        assert!((v.beam_sessions()[0].duration_secs - 7.0).abs() < 1e-12);

        // No open session left: finish again is a no-op
        v.finish(20.0);
        assert_eq!(v.beam_sessions().len(), 1);
    }

    #[test]
    fn test_disconnect_without_session_is_noop() {
        let mut v = test_vehicle();
        v.disconnect(10.0);
        assert!(v.beam_sessions().is_empty());
    }
}
