//! Multi-armed bandit vehicle selection.
//!
//! Pairing is a bandit problem: each (beam, vehicle-profile) context is an
//! arm, the reward of a pull is how long the resulting connection lasts.
//! The plain MAB keys arms by beam alone; the contextual MAB (C-MAB)
//! additionally profiles vehicles by range, heading quadrant, and
//! optionally speed at pairing time.
//!
//! Exploration uses an epsilon-first schedule: before `explore_until` the
//! bandit behaves exactly like random selection (while still crediting
//! rewards); afterwards it exploits the arm with the highest mean reward
//! among the current candidates.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::nodes::{BeamIdx, VehicleIdx};
use crate::strategy::{BeamScan, Candidate, Pairing, PairingStrategy, RandomSelection};

/// Range bucket edges, metres.
const DIST_NEAR_M: f64 = 180.0;
const DIST_MED_M: f64 = 360.0;

/// Speed bucket edges, km/h.
const SPEED_SLOW_KPH: f64 = 40.0;
const SPEED_MED_KPH: f64 = 50.0;

/// Bucket counts per feature.
const N_DIST: usize = 3;
const N_DIR: usize = 4;
const N_SPEED: usize = 3;

/// A discretized pairing context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArmContext {
    pub beam: usize,
    /// 0 = near, 1 = med, 2 = far.
    pub dist: u8,
    /// Heading quadrant, 0..4.
    pub dir: u8,
    /// 0 = slow, 1 = med, 2 = fast.
    pub speed: u8,
}

/// Which vehicle features the context space discretizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextMode {
    /// Arms are beams alone (plain MAB).
    BeamOnly,
    /// Beam x range x heading, optionally x speed (C-MAB).
    Profile { use_speed: bool },
}

/// The discretized context space, with a bijective flat indexing.
#[derive(Debug, Clone, Copy)]
pub struct ContextSpace {
    n_beams: usize,
    mode: ContextMode,
}

impl ContextSpace {
    pub fn new(n_beams: usize, mode: ContextMode) -> Self {
        Self { n_beams, mode }
    }

    /// Total number of contexts.
    pub fn len(&self) -> usize {
        match self.mode {
            ContextMode::BeamOnly => self.n_beams,
            ContextMode::Profile { use_speed } => {
                let speeds = if use_speed { N_SPEED } else { 1 };
                self.n_beams * N_DIST * N_DIR * speeds
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discretize the features observed for a candidate under a beam.
    pub fn context_of(&self, beam: BeamIdx, candidate: &Candidate) -> ArmContext {
        match self.mode {
            ContextMode::BeamOnly => ArmContext {
                beam,
                dist: 0,
                dir: 0,
                speed: 0,
            },
            ContextMode::Profile { use_speed } => ArmContext {
                beam,
                dist: bucket_dist(candidate.distance_m),
                dir: bucket_dir(candidate.heading_deg),
                speed: if use_speed {
                    bucket_speed(candidate.speed_kph)
                } else {
                    0
                },
            },
        }
    }

    /// Flat index of a context within the space.
    pub fn index(&self, ctx: &ArmContext) -> usize {
        match self.mode {
            ContextMode::BeamOnly => ctx.beam,
            ContextMode::Profile { use_speed } => {
                let speeds = if use_speed { N_SPEED } else { 1 };
                ((ctx.beam * N_DIST + ctx.dist as usize) * N_DIR + ctx.dir as usize) * speeds
                    + ctx.speed as usize
            }
        }
    }
}

fn bucket_dist(distance_m: f64) -> u8 {
    if distance_m < DIST_NEAR_M {
        0
    } else if distance_m < DIST_MED_M {
        1
    } else {
        2
    }
}

fn bucket_dir(heading_deg: f64) -> u8 {
    let h = heading_deg.rem_euclid(360.0);
    ((h / 90.0) as usize).min(N_DIR - 1) as u8
}

fn bucket_speed(speed_kph: f64) -> u8 {
    if speed_kph < SPEED_SLOW_KPH {
        0
    } else if speed_kph < SPEED_MED_KPH {
        1
    } else {
        2
    }
}

/// Running reward estimate for one arm.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ArmEstimate {
    total_reward: f64,
    pulls: u64,
}

impl ArmEstimate {
    pub fn update(&mut self, reward: f64) {
        self.total_reward += reward;
        self.pulls += 1;
    }

    /// Mean reward, `None` until the arm has completed a pull.
    pub fn mean(&self) -> Option<f64> {
        if self.pulls == 0 {
            None
        } else {
            Some(self.total_reward / self.pulls as f64)
        }
    }

    pub fn pulls(&self) -> u64 {
        self.pulls
    }
}

/// Summary of the bandit's learned state, for results output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanditStats {
    /// Contexts with at least one completed reward observation.
    pub contexts_observed: usize,
    /// Total context space size.
    pub total_contexts: usize,
    /// Pairing decisions made (exploration and exploitation).
    pub total_pulls: u64,
    /// Highest mean reward seen, with its pull count.
    pub best_mean_reward_secs: f64,
    pub best_arm_pulls: u64,
}

/// Pending reward attribution for an open connection.
#[derive(Debug, Clone, Copy)]
struct PendingArm {
    ctx: usize,
    start: f64,
}

/// Epsilon-first (contextual) multi-armed bandit strategy.
pub struct BanditStrategy {
    name: &'static str,
    space: ContextSpace,
    arms: Vec<ArmEstimate>,
    /// Open connections awaiting their reward, keyed by vehicle.
    pending: HashMap<VehicleIdx, PendingArm>,
    explore_until: f64,
    explorer: RandomSelection,
    total_pulls: u64,
}

impl BanditStrategy {
    /// Plain MAB: arms are beams.
    pub fn mab(n_beams: usize, explore_until: f64, seed: u64) -> Self {
        Self::with_space(
            "mab",
            ContextSpace::new(n_beams, ContextMode::BeamOnly),
            explore_until,
            seed,
        )
    }

    /// Contextual MAB: arms are beam x vehicle profile.
    pub fn cmab(n_beams: usize, use_speed: bool, explore_until: f64, seed: u64) -> Self {
        Self::with_space(
            "cmab",
            ContextSpace::new(n_beams, ContextMode::Profile { use_speed }),
            explore_until,
            seed,
        )
    }

    fn with_space(name: &'static str, space: ContextSpace, explore_until: f64, seed: u64) -> Self {
        Self {
            name,
            space,
            arms: vec![ArmEstimate::default(); space.len()],
            pending: HashMap::new(),
            explore_until,
            explorer: RandomSelection::new(seed),
            total_pulls: 0,
        }
    }

    pub fn space(&self) -> &ContextSpace {
        &self.space
    }

    /// Predicted reward for a context: the arm's mean observed reward.
    fn predicted_reward(&self, ctx_idx: usize) -> Option<f64> {
        self.arms[ctx_idx].mean()
    }

    /// Learned-state summary.
    pub fn stats(&self) -> BanditStats {
        let observed = self.arms.iter().filter(|a| a.pulls() > 0).count();
        let best = self
            .arms
            .iter()
            .filter_map(|a| a.mean().map(|m| (m, a.pulls())))
            .max_by(|a, b| a.0.total_cmp(&b.0));
        BanditStats {
            contexts_observed: observed,
            total_contexts: self.space.len(),
            total_pulls: self.total_pulls,
            best_mean_reward_secs: best.map(|(m, _)| m).unwrap_or(0.0),
            best_arm_pulls: best.map(|(_, p)| p).unwrap_or(0),
        }
    }
}

impl PairingStrategy for BanditStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn do_pairing(&mut self, scan: &mut dyn BeamScan, now: f64) -> Option<Pairing> {
        self.total_pulls += 1;

        // Epsilon-first: random selection until the exploration cutoff
        if now < self.explore_until {
            return self.explorer.do_pairing(scan, now);
        }

        // Exploitation: highest predicted reward among current candidates.
        // Contexts without history are skipped; if none has history yet,
        // no pairing is made this tick.
        let mut best: Option<(f64, Pairing)> = None;
        for beam in scan.idle_beams() {
            for candidate in scan.candidates(beam) {
                let ctx = self.space.context_of(beam, &candidate);
                let Some(predicted) = self.predicted_reward(self.space.index(&ctx)) else {
                    continue;
                };
                let better = match &best {
                    Some((top, _)) => predicted > *top,
                    None => true,
                };
                if better {
                    best = Some((predicted, Pairing { beam, candidate }));
                }
            }
        }
        best.map(|(_, pairing)| pairing)
    }

    fn report_conn_confirmed(&mut self, now: f64, pairing: &Pairing) {
        let ctx = self.space.context_of(pairing.beam, &pairing.candidate);
        self.pending.insert(
            pairing.candidate.vehicle,
            PendingArm {
                ctx: self.space.index(&ctx),
                start: now,
            },
        );
    }

    fn report_conn_lost(&mut self, now: f64, _beam: BeamIdx, vehicle: VehicleIdx) {
        // Consume the pending entry so a reward is credited exactly once
        if let Some(pending) = self.pending.remove(&vehicle) {
            self.arms[pending.ctx].update(now - pending.start);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::tests::{FakeScan, candidate};
    use std::collections::HashMap as StdHashMap;

    fn profiled_candidate(
        vehicle: VehicleIdx,
        distance_m: f64,
        heading_deg: f64,
        speed_kph: f64,
    ) -> Candidate {
        Candidate {
            vehicle,
            cqi: -80.0,
            distance_m,
            heading_deg,
            speed_kph,
        }
    }

    #[test]
    fn test_flat_index_is_bijective() {
        let space = ContextSpace::new(6, ContextMode::Profile { use_speed: true });
        let mut seen = vec![false; space.len()];
        for beam in 0..6 {
            for dist in 0..N_DIST as u8 {
                for dir in 0..N_DIR as u8 {
                    for speed in 0..N_SPEED as u8 {
                        let idx = space.index(&ArmContext { beam, dist, dir, speed });
                        assert!(idx < space.len(), "index {} out of range", idx);
                        assert!(!seen[idx], "index {} hit twice", idx);
                        seen[idx] = true;
                    }
                }
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_space_sizes() {
        assert_eq!(ContextSpace::new(6, ContextMode::BeamOnly).len(), 6);
        assert_eq!(
            ContextSpace::new(6, ContextMode::Profile { use_speed: false }).len(),
            6 * 3 * 4
        );
        assert_eq!(
            ContextSpace::new(6, ContextMode::Profile { use_speed: true }).len(),
            6 * 3 * 4 * 3
        );
    }

    #[test]
    fn test_feature_buckets() {
        assert_eq!(bucket_dist(0.0), 0);
        assert_eq!(bucket_dist(179.9), 0);
        assert_eq!(bucket_dist(180.0), 1);
        assert_eq!(bucket_dist(359.9), 1);
        assert_eq!(bucket_dist(360.0), 2);

        assert_eq!(bucket_dir(0.0), 0);
        assert_eq!(bucket_dir(89.9), 0);
        assert_eq!(bucket_dir(90.0), 1);
        assert_eq!(bucket_dir(359.9), 3);
        assert_eq!(bucket_dir(360.0), 0); // wraps

        assert_eq!(bucket_speed(30.0), 0);
        assert_eq!(bucket_speed(45.0), 1);
        assert_eq!(bucket_speed(55.0), 2);
    }

    #[test]
    fn test_beam_only_mode_ignores_profile() {
        let space = ContextSpace::new(6, ContextMode::BeamOnly);
        let a = space.context_of(3, &profiled_candidate(0, 100.0, 10.0, 35.0));
        let b = space.context_of(3, &profiled_candidate(1, 500.0, 270.0, 55.0));
        assert_eq!(space.index(&a), space.index(&b));
    }

    #[test]
    fn test_explores_before_cutoff() {
        let mut bandit = BanditStrategy::cmab(2, false, 100.0, 1);
        let mut scan = FakeScan {
            idle: vec![0],
            candidates: StdHashMap::from([(0, vec![candidate(5, -80.0)])]),
        };
        // No history yet, but exploration delegates to random selection
        let pairing = bandit.do_pairing(&mut scan, 10.0).unwrap();
        assert_eq!(pairing.candidate.vehicle, 5);
        assert_eq!(bandit.stats().total_pulls, 1);
    }

    #[test]
    fn test_exploitation_requires_history() {
        let mut bandit = BanditStrategy::cmab(2, false, 100.0, 1);
        let mut scan = FakeScan {
            idle: vec![0],
            candidates: StdHashMap::from([(0, vec![candidate(5, -80.0)])]),
        };
        // Past the cutoff with no learned arms: no pairing
        assert!(bandit.do_pairing(&mut scan, 200.0).is_none());
    }

    #[test]
    fn test_reward_credited_on_loss_once() {
        let mut bandit = BanditStrategy::mab(2, 100.0, 1);
        let pairing = Pairing {
            beam: 1,
            candidate: candidate(5, -80.0),
        };
        bandit.report_conn_confirmed(10.0, &pairing);
        bandit.report_conn_lost(40.0, 1, 5);

        let stats = bandit.stats();
        assert_eq!(stats.contexts_observed, 1);
        assert!((stats.best_mean_reward_secs - 30.0).abs() < 1e-12);

        // A second loss for the same vehicle must not double-credit
        bandit.report_conn_lost(80.0, 1, 5);
        assert_eq!(bandit.stats().best_arm_pulls, 1);
    }

    #[test]
    fn test_exploitation_prefers_longest_lived_context() {
        let mut bandit = BanditStrategy::mab(2, 0.0, 1);

        // Beam 0 connections last 10 s, beam 1 connections last 60 s
        for (beam, vehicle, duration) in [(0, 0, 10.0), (1, 1, 60.0)] {
            let pairing = Pairing {
                beam,
                candidate: candidate(vehicle, -80.0),
            };
            bandit.report_conn_confirmed(0.0, &pairing);
            bandit.report_conn_lost(duration, beam, vehicle);
        }

        let mut scan = FakeScan {
            idle: vec![0, 1],
            candidates: StdHashMap::from([
                (0, vec![candidate(2, -60.0)]),
                (1, vec![candidate(3, -90.0)]),
            ]),
        };
        // Exploitation picks beam 1 despite the weaker CQI
        let pairing = bandit.do_pairing(&mut scan, 10.0).unwrap();
        assert_eq!(pairing.beam, 1);
    }

    #[test]
    fn test_cmab_distinguishes_contexts_on_same_beam() {
        let mut bandit = BanditStrategy::cmab(1, false, 0.0, 1);

        // Near vehicles on beam 0 last 5 s, far vehicles last 50 s
        let near = Pairing {
            beam: 0,
            candidate: profiled_candidate(0, 100.0, 0.0, 45.0),
        };
        bandit.report_conn_confirmed(0.0, &near);
        bandit.report_conn_lost(5.0, 0, 0);

        let far = Pairing {
            beam: 0,
            candidate: profiled_candidate(1, 400.0, 0.0, 45.0),
        };
        bandit.report_conn_confirmed(0.0, &far);
        bandit.report_conn_lost(50.0, 0, 1);

        let mut scan = FakeScan {
            idle: vec![0],
            candidates: StdHashMap::from([(
                0,
                vec![
                    profiled_candidate(2, 120.0, 0.0, 45.0),
                    profiled_candidate(3, 420.0, 0.0, 45.0),
                ],
            )]),
        };
        let pairing = bandit.do_pairing(&mut scan, 10.0).unwrap();
        // The far-context vehicle wins
        assert_eq!(pairing.candidate.vehicle, 3);
    }

    #[test]
    fn test_speed_feature_changes_space() {
        let with_speed = BanditStrategy::cmab(6, true, 0.0, 1);
        let without = BanditStrategy::cmab(6, false, 0.0, 1);
        assert_eq!(with_speed.stats().total_contexts, 6 * 3 * 4 * 3);
        assert_eq!(without.stats().total_contexts, 6 * 3 * 4);
    }
}
