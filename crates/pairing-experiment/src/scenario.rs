//! Scenario assembly and the per-tick pairing loop.
//!
//! The scenario owns the beams, vehicles, map, and statistics. Each tick:
//! vehicles move (finished routes are re-drawn), serving beams verify their
//! connection with a hello, and idle beams are paired by the strategy until
//! the active-beam budget is filled.

use anyhow::{Context, Result, bail};
use mmwave_sim::channel::Channel;
use mmwave_sim::map::RoadMap;
use mmwave_sim::mobility::{PathMobility, kph_to_mps};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::comm::hello;
use crate::generator::CELL_SITE_PIN;
use crate::nodes::{Beam, BeamIdx, Vehicle};
use crate::results::{BeamProgress, ProgressSnapshot};
use crate::stats::StatsBook;
use crate::strategy::{BeamScan, Candidate, PairingStrategy};

/// Attempts at drawing a routable pin pair before giving up.
const MAX_ROUTE_ATTEMPTS: usize = 100;

/// Population and cell layout of a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    /// Number of sector beams on the cell site.
    pub n_beams: usize,
    /// Beams that may serve vehicles concurrently.
    pub max_active_beams: usize,
    /// Vehicle population.
    pub n_vehicles: usize,
    /// Route speed range in km/h (uniform draw per route).
    pub speed_range_kph: (f64, f64),
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            n_beams: 6,
            max_active_beams: 2,
            n_vehicles: 100,
            speed_range_kph: (30.0, 50.0),
        }
    }
}

/// The assembled simulation state.
pub struct PairingScenario {
    beams: Vec<Beam>,
    vehicles: Vec<Vehicle>,
    map: RoadMap,
    channel: Channel,
    stats: StatsBook,
    rng: ChaCha8Rng,
    route_pins: Vec<String>,
    max_active_beams: usize,
    speed_range_kph: (f64, f64),
}

impl PairingScenario {
    /// Build beams around the cell site and route the vehicle population.
    pub fn build(config: &ScenarioConfig, map: RoadMap, channel: Channel, seed: u64) -> Result<Self> {
        if config.n_beams == 0 {
            bail!("scenario needs at least one beam");
        }
        let site = map
            .pin(CELL_SITE_PIN)
            .with_context(|| format!("map has no '{}' pin", CELL_SITE_PIN))?
            .location;

        let width = 360.0 / config.n_beams as f64;
        let beams = (0..config.n_beams)
            .map(|i| Beam::sector(format!("BS-{:02}", i + 1), site, i as f64 * width, width))
            .collect();

        let route_pins: Vec<String> = map
            .pin_names()
            .into_iter()
            .filter(|n| *n != CELL_SITE_PIN)
            .map(str::to_string)
            .collect();
        if route_pins.len() < 2 {
            bail!("map needs at least two route pins, found {}", route_pins.len());
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut vehicles = Vec::with_capacity(config.n_vehicles);
        for i in 0..config.n_vehicles {
            let route = Self::make_route(&map, &route_pins, config.speed_range_kph, &mut rng)?;
            vehicles.push(Vehicle::new(format!("Car {}", i), route));
        }

        Ok(Self {
            beams,
            vehicles,
            map,
            channel,
            stats: StatsBook::new(config.n_beams),
            rng,
            route_pins,
            max_active_beams: config.max_active_beams,
            speed_range_kph: config.speed_range_kph,
        })
    }

    /// Draw a route between two distinct random pins at a random speed.
    fn make_route(
        map: &RoadMap,
        pins: &[String],
        speed_range_kph: (f64, f64),
        rng: &mut ChaCha8Rng,
    ) -> Result<PathMobility> {
        for _ in 0..MAX_ROUTE_ATTEMPTS {
            let start = pins.choose(rng).map(String::as_str).unwrap_or_default();
            let end = pins.choose(rng).map(String::as_str).unwrap_or_default();
            if start == end {
                continue;
            }
            if let Some(waypoints) = map.find_path(start, end) {
                let kph = rng.random_range(speed_range_kph.0..=speed_range_kph.1);
                return Ok(PathMobility::new(waypoints, kph_to_mps(kph)));
            }
        }
        bail!("no routable pin pair after {} attempts", MAX_ROUTE_ATTEMPTS)
    }

    /// Advance the scenario by one step and run the pairing loop.
    pub fn tick(&mut self, now: f64, step: f64, strategy: &mut dyn PairingStrategy) -> Result<()> {
        // Mobility: move vehicles, re-route the ones that arrived
        for idx in 0..self.vehicles.len() {
            if self.vehicles[idx].mobility.advance(step) {
                let route =
                    Self::make_route(&self.map, &self.route_pins, self.speed_range_kph, &mut self.rng)?;
                self.vehicles[idx].set_route(route);
            }
        }

        // Liveness: serving beams must still complete the hello handshake
        for beam_idx in 0..self.beams.len() {
            let Some(v_idx) = self.beams[beam_idx].serving else {
                continue;
            };
            let alive =
                hello(&self.beams[beam_idx], &self.vehicles[v_idx], &self.channel, &mut self.rng)
                    .is_some();
            if !alive {
                debug!(
                    beam = %self.beams[beam_idx].id,
                    vehicle = %self.vehicles[v_idx].id,
                    now = now,
                    "connection lost"
                );
                self.beams[beam_idx].serving = None;
                self.vehicles[v_idx].disconnect(now);
                self.stats.conn_end(beam_idx, now);
                strategy.report_conn_lost(now, beam_idx, v_idx);
            }
        }

        // Pairing: fill the active-beam budget
        let mut active = self.beams.iter().filter(|b| b.serving.is_some()).count();
        while active < self.max_active_beams {
            let pairing = {
                let mut scan = ScanView {
                    beams: &self.beams,
                    vehicles: &self.vehicles,
                    channel: &self.channel,
                    rng: &mut self.rng,
                };
                strategy.do_pairing(&mut scan, now)
            };
            let Some(pairing) = pairing else {
                break;
            };

            let beam_id = self.beams[pairing.beam].id.clone();
            debug!(
                beam = %beam_id,
                vehicle = %self.vehicles[pairing.candidate.vehicle].id,
                cqi = pairing.candidate.cqi,
                now = now,
                "connection established"
            );
            self.beams[pairing.beam].serving = Some(pairing.candidate.vehicle);
            self.vehicles[pairing.candidate.vehicle].connect(pairing.beam, &beam_id, now);
            self.stats.conn_begin(pairing.beam, now);
            strategy.report_conn_confirmed(now, &pairing);
            active += 1;
        }

        Ok(())
    }

    /// Snapshot per-beam statistics at a progress boundary and reset the
    /// session book.
    pub fn snapshot(&mut self, fraction: f64) -> ProgressSnapshot {
        let beams = self
            .beams
            .iter()
            .enumerate()
            .map(|(i, beam)| BeamProgress {
                beam: beam.id.clone(),
                overall_mean_secs: self.stats.overall()[i].mean_connection_secs(),
                overall_count: self.stats.overall()[i].connection_count(),
                session_mean_secs: self.stats.session()[i].mean_connection_secs(),
                session_count: self.stats.session()[i].connection_count(),
            })
            .collect();
        self.stats.reset_session();
        ProgressSnapshot { fraction, beams }
    }

    /// Close open vehicle sessions at the end of the run.
    pub fn finish(&mut self, now: f64) {
        for vehicle in &mut self.vehicles {
            vehicle.finish(now);
        }
    }

    pub fn stats(&self) -> &StatsBook {
        &self.stats
    }

    pub fn beams(&self) -> &[Beam] {
        &self.beams
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }
}

/// Borrowed world view handed to strategies during pairing.
struct ScanView<'a> {
    beams: &'a [Beam],
    vehicles: &'a [Vehicle],
    channel: &'a Channel,
    rng: &'a mut ChaCha8Rng,
}

impl BeamScan for ScanView<'_> {
    fn idle_beams(&self) -> Vec<BeamIdx> {
        self.beams
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_idle())
            .map(|(i, _)| i)
            .collect()
    }

    fn candidates(&mut self, beam: BeamIdx) -> Vec<Candidate> {
        let beam_node = &self.beams[beam];
        let mut found = Vec::new();
        for (i, v) in self.vehicles.iter().enumerate() {
            if v.associated.is_some() {
                continue;
            }
            if let Some(cqi) = hello(beam_node, v, self.channel, &mut *self.rng) {
                found.push(Candidate {
                    vehicle: i,
                    cqi,
                    distance_m: v.distance_to_beam(beam_node),
                    heading_deg: v.heading_deg(),
                    speed_kph: v.speed_kph(),
                });
            }
        }
        found
    }
}
