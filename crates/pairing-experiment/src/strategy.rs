//! Vehicle selection strategies: how an idle beam picks its next vehicle.
//!
//! Strategies see the world through the [`BeamScan`] interface: which beams
//! are idle, and which vehicles answer a beam's hello. Connection outcomes
//! are reported back so learning strategies can update their estimates.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::nodes::{BeamIdx, VehicleIdx};

/// A vehicle that answered a beam's hello, with the features observed at
/// pairing time.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub vehicle: VehicleIdx,
    /// Hello-reply received power at the beam, in dBm.
    pub cqi: f64,
    /// Range from the beam (timing advance), in metres.
    pub distance_m: f64,
    /// Vehicle travel heading, degrees clockwise from north.
    pub heading_deg: f64,
    /// Vehicle speed in km/h.
    pub speed_kph: f64,
}

/// A beam-vehicle pairing decision.
#[derive(Debug, Clone, Copy)]
pub struct Pairing {
    pub beam: BeamIdx,
    pub candidate: Candidate,
}

/// Scan interface the scenario exposes to strategies.
///
/// `candidates` performs the actual hello handshakes, so repeated calls may
/// consume channel randomness.
pub trait BeamScan {
    /// Beams currently not serving any vehicle.
    fn idle_beams(&self) -> Vec<BeamIdx>;

    /// Unserved vehicles that complete the two-way hello with this beam.
    fn candidates(&mut self, beam: BeamIdx) -> Vec<Candidate>;
}

/// A vehicle selection strategy.
pub trait PairingStrategy {
    fn name(&self) -> &'static str;

    /// Pick the next beam-vehicle pairing, or `None` when no pairing is
    /// available this tick.
    fn do_pairing(&mut self, scan: &mut dyn BeamScan, now: f64) -> Option<Pairing>;

    /// A pairing returned from `do_pairing` was established.
    fn report_conn_confirmed(&mut self, _now: f64, _pairing: &Pairing) {}

    /// An established connection was lost.
    fn report_conn_lost(&mut self, _now: f64, _beam: BeamIdx, _vehicle: VehicleIdx) {}
}

/// Uniform random selection: a random idle beam, then a random candidate.
///
/// Beams that hear no vehicle are dropped from the draw and another beam is
/// tried, so a pairing is found whenever any idle beam has a candidate.
pub struct RandomSelection {
    rng: ChaCha8Rng,
}

impl RandomSelection {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl PairingStrategy for RandomSelection {
    fn name(&self) -> &'static str {
        "random"
    }

    fn do_pairing(&mut self, scan: &mut dyn BeamScan, _now: f64) -> Option<Pairing> {
        let mut available = scan.idle_beams();
        loop {
            let beam = *available.choose(&mut self.rng)?;
            let candidates = scan.candidates(beam);
            match candidates.choose(&mut self.rng) {
                Some(candidate) => {
                    return Some(Pairing {
                        beam,
                        candidate: *candidate,
                    });
                }
                None => {
                    // No vehicle in this beam; don't draw it again
                    available.retain(|&b| b != beam);
                }
            }
        }
    }
}

/// Greedy selection of the strongest link: scan every idle beam and pick
/// the candidate with the highest CQI (best SNR).
#[derive(Debug, Default)]
pub struct HighestCqi;

impl HighestCqi {
    pub fn new() -> Self {
        Self
    }
}

impl PairingStrategy for HighestCqi {
    fn name(&self) -> &'static str {
        "bestsnr"
    }

    fn do_pairing(&mut self, scan: &mut dyn BeamScan, _now: f64) -> Option<Pairing> {
        let mut selected: Option<Pairing> = None;
        for beam in scan.idle_beams() {
            for candidate in scan.candidates(beam) {
                let better = match &selected {
                    Some(best) => candidate.cqi > best.candidate.cqi,
                    None => true,
                };
                if better {
                    selected = Some(Pairing { beam, candidate });
                }
            }
        }
        selected
    }
}
