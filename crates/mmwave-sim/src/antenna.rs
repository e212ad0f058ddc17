//! Antenna patterns: fixed sector beams and steered arrays.
//!
//! Sector beams use the 3GPP parabolic attenuation profile; steered arrays
//! track their peer and incur no angular loss.

use serde::{Deserialize, Serialize};

use crate::geometry::angle_diff_deg;

/// Front-to-back attenuation cap for the sector pattern (dB).
const FRONT_TO_BACK_DB: f64 = 20.0;

/// A fixed sector beam pattern.
///
/// Attenuation follows the 3GPP parabolic profile:
/// `min(12 * (delta / beamwidth_3db)^2, A_m)` with `A_m = 20 dB`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectorPattern {
    /// Boresight azimuth, degrees clockwise from north.
    pub boresight_deg: f64,
    /// Half-power (3 dB) beamwidth in degrees.
    pub beamwidth_3db_deg: f64,
}

impl SectorPattern {
    /// Build a sector pattern from the sector's angular width.
    ///
    /// A 60 degree sector maps to a 35 degree 3 dB beamwidth
    /// (`width * 35/60`), matching 3GPP sectorization practice.
    pub fn from_sector_width(boresight_deg: f64, sector_width_deg: f64) -> Self {
        Self {
            boresight_deg,
            beamwidth_3db_deg: sector_width_deg * 35.0 / 60.0,
        }
    }

    /// Pattern attenuation towards the given azimuth, in dB (>= 0).
    pub fn attenuation_db(&self, azimuth_deg: f64) -> f64 {
        let delta = angle_diff_deg(azimuth_deg, self.boresight_deg);
        let ratio = delta / self.beamwidth_3db_deg;
        (12.0 * ratio * ratio).min(FRONT_TO_BACK_DB)
    }
}

/// Antenna pattern of a radio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AntennaPattern {
    /// Fixed sector beam.
    Sector(SectorPattern),
    /// Electronically steered array: always points at the peer.
    Steered,
}

impl AntennaPattern {
    /// Attenuation towards the given azimuth, in dB.
    pub fn attenuation_db(&self, azimuth_deg: f64) -> f64 {
        match self {
            AntennaPattern::Sector(p) => p.attenuation_db(azimuth_deg),
            AntennaPattern::Steered => 0.0,
        }
    }
}
