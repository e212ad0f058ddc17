//! Experiment runner for beam-vehicle pairing experiments.
//!
//! Orchestrates the run lifecycle:
//! 1. Generate the road map
//! 2. Assemble the scenario (beams, vehicles, statistics)
//! 3. Run the tick loop over the simulation horizon
//! 4. Collect metrics and results

use anyhow::{Result, bail};
use chrono::Utc;
use mmwave_sim::channel::Channel;
use mmwave_sim::clock::{ProgressTicker, SimClock};
use mmwave_sim::config::SimParams;
use rand::Rng;
use tracing::info;
use uuid::Uuid;

use crate::bandit::BanditStrategy;
use crate::generator::{MapGenerator, MapGeneratorConfig};
use crate::results::{BeamSummary, RunConfig, RunResult};
use crate::scenario::{PairingScenario, ScenarioConfig};
use crate::strategy::{HighestCqi, PairingStrategy, RandomSelection};

/// Pairing algorithm to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Uniform random beam and vehicle selection
    Random,
    /// Strongest CQI (best SNR) selection
    BestCqi,
    /// Multi-armed bandit over beams
    Mab,
    /// Contextual multi-armed bandit over beam x vehicle profile
    Cmab,
}

impl Algorithm {
    /// Get all algorithms for grid experiments.
    pub fn all() -> Vec<Self> {
        vec![Self::Random, Self::BestCqi, Self::Mab, Self::Cmab]
    }

    /// Get the name of this algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::BestCqi => "bestsnr",
            Self::Mab => "mab",
            Self::Cmab => "cmab",
        }
    }

    /// Parse an algorithm name.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "random" | "rand" => Ok(Self::Random),
            "bestsnr" | "best-snr" | "bestcqi" | "best-cqi" => Ok(Self::BestCqi),
            "mab" => Ok(Self::Mab),
            "cmab" | "c-mab" => Ok(Self::Cmab),
            _ => bail!("Unknown algorithm: {}. Valid: random, bestsnr, mab, cmab", s),
        }
    }
}

/// Configuration for the experiment runner.
#[derive(Debug, Clone)]
pub struct ExperimentRunnerConfig {
    /// Simulation timing (step, horizon, progress interval)
    pub sim: SimParams,
    /// Scenario layout and population
    pub scenario: ScenarioConfig,
    /// Road-map generation
    pub map: MapGeneratorConfig,
    /// Fraction of the horizon the bandits spend exploring
    pub explore_fraction: f64,
    /// Include the speed feature in the C-MAB context
    pub use_speed: bool,
    /// Log-normal shadow fading sigma in dB (0 = deterministic channel)
    pub shadow_sigma_db: f64,
}

impl Default for ExperimentRunnerConfig {
    fn default() -> Self {
        Self {
            sim: SimParams::default(),
            scenario: ScenarioConfig::default(),
            map: MapGeneratorConfig::default(),
            explore_fraction: 0.3,
            use_speed: false,
            shadow_sigma_db: 0.0,
        }
    }
}

/// Strategy instance built for one run; keeps the concrete type around so
/// bandit state can be read back after the run.
enum BuiltStrategy {
    Random(RandomSelection),
    BestCqi(HighestCqi),
    Bandit(BanditStrategy),
}

impl BuiltStrategy {
    fn as_dyn(&mut self) -> &mut dyn PairingStrategy {
        match self {
            BuiltStrategy::Random(s) => s,
            BuiltStrategy::BestCqi(s) => s,
            BuiltStrategy::Bandit(s) => s,
        }
    }
}

/// The experiment runner.
pub struct ExperimentRunner {
    config: ExperimentRunnerConfig,
}

impl ExperimentRunner {
    /// Create a new experiment runner.
    pub fn new(config: ExperimentRunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExperimentRunnerConfig {
        &self.config
    }

    /// Run a single experiment.
    ///
    /// `seed` drives every random decision in the run (map layout, vehicle
    /// routing, channel shadowing, strategy draws); `None` picks a fresh
    /// seed.
    pub fn run(&self, algorithm: Algorithm, trial: usize, seed: Option<u64>) -> Result<RunResult> {
        let started_at = Utc::now();
        let seed = seed.unwrap_or_else(|| rand::rng().random());

        let mut generator = MapGenerator::new(self.config.map.clone(), seed);
        let map = generator.generate()?;

        let channel = if self.config.shadow_sigma_db > 0.0 {
            Channel::mmwave_28ghz().with_shadowing(self.config.shadow_sigma_db)
        } else {
            Channel::mmwave_28ghz()
        };

        let mut scenario = PairingScenario::build(
            &self.config.scenario,
            map,
            channel,
            seed.wrapping_add(1),
        )?;

        let explore_until = self.config.explore_fraction * self.config.sim.duration_secs;
        let n_beams = self.config.scenario.n_beams;
        let mut strategy = match algorithm {
            Algorithm::Random => BuiltStrategy::Random(RandomSelection::new(seed.wrapping_add(2))),
            Algorithm::BestCqi => BuiltStrategy::BestCqi(HighestCqi::new()),
            Algorithm::Mab => BuiltStrategy::Bandit(BanditStrategy::mab(
                n_beams,
                explore_until,
                seed.wrapping_add(2),
            )),
            Algorithm::Cmab => BuiltStrategy::Bandit(BanditStrategy::cmab(
                n_beams,
                self.config.use_speed,
                explore_until,
                seed.wrapping_add(2),
            )),
        };

        info!(
            algorithm = algorithm.name(),
            trial = trial,
            seed = seed,
            vehicles = self.config.scenario.n_vehicles,
            beams = n_beams,
            duration_secs = self.config.sim.duration_secs,
            "Starting experiment"
        );

        let mut clock = SimClock::new(self.config.sim.step_secs, self.config.sim.duration_secs)?;
        let mut ticker = ProgressTicker::new(self.config.sim.progress_interval);
        let mut snapshots = Vec::new();
        let mut total_ticks = 0usize;

        while clock.tick() {
            let now = clock.now();
            scenario.tick(now, clock.step(), strategy.as_dyn())?;
            total_ticks += 1;

            // The 1.0 boundary is covered by the explicit final snapshot
            let progress = clock.progress();
            if progress < 1.0 {
                if let Some(boundary) = ticker.fire(progress) {
                    let snapshot = scenario.snapshot(boundary);
                    info!(
                        algorithm = algorithm.name(),
                        trial = trial,
                        progress = format!("{:.0}%", boundary * 100.0),
                        connections = scenario.stats().total_connections(),
                        mean_secs = format!("{:.2}", scenario.stats().overall_mean_secs()),
                        "Progress"
                    );
                    snapshots.push(snapshot);
                }
            }
        }

        // Final snapshot at the end of the horizon
        snapshots.push(scenario.snapshot(1.0));
        scenario.finish(clock.now());

        let per_beam: Vec<BeamSummary> = scenario
            .beams()
            .iter()
            .enumerate()
            .map(|(i, beam)| BeamSummary {
                beam: beam.id.clone(),
                mean_connection_secs: scenario.stats().overall()[i].mean_connection_secs(),
                connections: scenario.stats().overall()[i].connection_count(),
            })
            .collect();

        let bandit = match &strategy {
            BuiltStrategy::Bandit(b) => Some(b.stats()),
            _ => None,
        };

        let result = RunResult {
            run_id: Uuid::new_v4().to_string(),
            config: RunConfig {
                algorithm: algorithm.name().to_string(),
                n_beams,
                max_active_beams: self.config.scenario.max_active_beams,
                n_vehicles: self.config.scenario.n_vehicles,
                duration_secs: self.config.sim.duration_secs,
                step_secs: self.config.sim.step_secs,
                explore_fraction: self.config.explore_fraction,
                use_speed: self.config.use_speed,
                trial,
                seed,
            },
            started_at,
            ended_at: Utc::now(),
            total_ticks,
            total_connections: scenario.stats().total_connections(),
            mean_connection_secs: scenario.stats().overall_mean_secs(),
            per_beam,
            snapshots,
            bandit,
        };

        info!(
            algorithm = algorithm.name(),
            trial = trial,
            connections = result.total_connections,
            mean_secs = format!("{:.2}", result.mean_connection_secs),
            "Experiment complete"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_config() -> ExperimentRunnerConfig {
        ExperimentRunnerConfig {
            sim: SimParams {
                step_secs: 0.5,
                duration_secs: 120.0,
                progress_interval: 0.25,
            },
            scenario: ScenarioConfig {
                n_beams: 6,
                max_active_beams: 2,
                n_vehicles: 20,
                speed_range_kph: (30.0, 50.0),
            },
            map: MapGeneratorConfig {
                pins: 8,
                area_m: 800.0,
                nearest_neighbors: 3,
            },
            explore_fraction: 0.3,
            use_speed: false,
            shadow_sigma_db: 0.0,
        }
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!(Algorithm::parse("random").unwrap(), Algorithm::Random);
        assert_eq!(Algorithm::parse("BESTSNR").unwrap(), Algorithm::BestCqi);
        assert_eq!(Algorithm::parse("mab").unwrap(), Algorithm::Mab);
        assert_eq!(Algorithm::parse("c-mab").unwrap(), Algorithm::Cmab);
        assert!(Algorithm::parse("greedy").is_err());
    }

    #[test]
    fn test_run_produces_complete_result() {
        let runner = ExperimentRunner::new(short_config());
        let result = runner.run(Algorithm::Random, 0, Some(42)).unwrap();

        assert_eq!(result.config.algorithm, "random");
        assert_eq!(result.total_ticks, 240);
        assert_eq!(result.per_beam.len(), 6);
        // Boundaries at 25/50/75% plus the final 100% snapshot
        assert_eq!(result.snapshots.len(), 4);
        assert!((result.snapshots.last().unwrap().fraction - 1.0).abs() < 1e-12);
        assert!(result.bandit.is_none());
    }

    #[test]
    fn test_run_is_reproducible_under_seed() {
        let runner = ExperimentRunner::new(short_config());
        let a = runner.run(Algorithm::Random, 0, Some(7)).unwrap();
        let b = runner.run(Algorithm::Random, 0, Some(7)).unwrap();
        assert_eq!(a.total_connections, b.total_connections);
        assert_eq!(a.mean_connection_secs, b.mean_connection_secs);
    }

    #[test]
    fn test_bandit_runs_report_state() {
        let runner = ExperimentRunner::new(short_config());
        let result = runner.run(Algorithm::Cmab, 0, Some(11)).unwrap();
        let bandit = result.bandit.expect("cmab reports bandit stats");
        assert!(bandit.total_pulls > 0);
        assert_eq!(bandit.total_contexts, 6 * 3 * 4);
    }
}
