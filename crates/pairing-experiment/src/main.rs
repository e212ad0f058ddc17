//! Beam-Vehicle Pairing Experiment CLI.
//!
//! Commands:
//! - single: Run a single experiment
//! - grid: Run full grid experiment (algorithms × trials)
//! - ablation: Run C-MAB ablation (explore fraction × speed feature)
//! - map: Generate and display a road map

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use futures::future::join_all;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use mmwave_sim::config::SimParams;
use pairing_experiment::experiment::{Algorithm, ExperimentRunner, ExperimentRunnerConfig};
use pairing_experiment::generator::{MapGenerator, MapPreset};
use pairing_experiment::results::{GridResults, RunResult, format_duration};
use pairing_experiment::scenario::ScenarioConfig;

/// Generate a timestamped output path from the given path.
/// e.g., "results.json" -> "results-20260807-010530.json"
fn timestamped_path(path: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d-%H%M%S");
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("results");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("json");
    let parent = path.parent().unwrap_or(std::path::Path::new("."));
    parent.join(format!("{}-{}.{}", stem, timestamp, ext))
}

#[derive(Parser)]
#[command(name = "pairing-experiment")]
#[command(version)]
#[command(about = "Multi-armed bandit beam-vehicle pairing experiments")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single experiment
    Single {
        /// Algorithm to use
        #[arg(long, default_value = "cmab")]
        algo: String,

        /// Number of vehicles
        #[arg(long, default_value = "100")]
        vehicles: usize,

        /// Number of sector beams
        #[arg(long, default_value = "6")]
        beams: usize,

        /// Concurrent active-beam budget
        #[arg(long, default_value = "2")]
        active: usize,

        /// Simulation horizon in seconds
        #[arg(long, default_value = "36000")]
        duration: f64,

        /// Fraction of the horizon the bandits spend exploring
        #[arg(long, default_value = "0.3")]
        explore: f64,

        /// Use vehicle speed as a C-MAB context feature
        #[arg(long)]
        use_speed: bool,

        /// Log-normal shadow fading sigma in dB
        #[arg(long, default_value = "0")]
        shadowing: f64,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Run grid experiment
    Grid {
        /// Number of trials per configuration
        #[arg(long, default_value = "5")]
        trials: usize,

        /// Algorithms to test (comma-separated). Default: all
        /// Valid: random, bestsnr, mab, cmab
        #[arg(long, value_delimiter = ',')]
        algos: Option<Vec<String>>,

        /// Number of vehicles
        #[arg(long, default_value = "100")]
        vehicles: usize,

        /// Simulation horizon in seconds
        #[arg(long, default_value = "36000")]
        duration: f64,

        /// Fraction of the horizon the bandits spend exploring
        #[arg(long, default_value = "0.3")]
        explore: f64,

        /// Use vehicle speed as a C-MAB context feature
        #[arg(long)]
        use_speed: bool,

        /// Base random seed (trial seeds derive from it)
        #[arg(long)]
        seed: Option<u64>,

        /// Output file for results
        #[arg(long, default_value = "results.json")]
        output: PathBuf,
    },

    /// Run C-MAB ablation study
    Ablation {
        /// Number of trials per configuration
        #[arg(long, default_value = "5")]
        trials: usize,

        /// Number of vehicles
        #[arg(long, default_value = "100")]
        vehicles: usize,

        /// Simulation horizon in seconds
        #[arg(long, default_value = "36000")]
        duration: f64,

        /// Base random seed (trial seeds derive from it)
        #[arg(long)]
        seed: Option<u64>,

        /// Output file for results
        #[arg(long, default_value = "ablation.json")]
        output: PathBuf,
    },

    /// Generate and display a road map
    Map {
        /// Layout preset: compact, town, sprawl
        #[arg(long, default_value = "town")]
        preset: String,

        /// Random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Print the full map as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    match cli.command {
        Commands::Single {
            algo,
            vehicles,
            beams,
            active,
            duration,
            explore,
            use_speed,
            shadowing,
            seed,
        } => {
            let algorithm = Algorithm::parse(&algo)?;
            let config = ExperimentRunnerConfig {
                sim: SimParams {
                    duration_secs: duration,
                    ..SimParams::default()
                },
                scenario: ScenarioConfig {
                    n_beams: beams,
                    max_active_beams: active,
                    n_vehicles: vehicles,
                    ..ScenarioConfig::default()
                },
                explore_fraction: explore,
                use_speed,
                shadow_sigma_db: shadowing,
                ..Default::default()
            };

            let runner = ExperimentRunner::new(config);
            let result = runner.run(algorithm, 0, seed)?;
            print_run_result(&result);
        }

        Commands::Grid {
            trials,
            algos,
            vehicles,
            duration,
            explore,
            use_speed,
            seed,
            output,
        } => {
            let algorithms: Vec<Algorithm> = match algos {
                Some(names) => names
                    .iter()
                    .map(|s| Algorithm::parse(s))
                    .collect::<Result<_>>()?,
                None => Algorithm::all(),
            };

            info!(
                trials = trials,
                algorithms = algorithms.len(),
                vehicles = vehicles,
                "Starting grid experiment"
            );

            let config = ExperimentRunnerConfig {
                sim: SimParams {
                    duration_secs: duration,
                    ..SimParams::default()
                },
                scenario: ScenarioConfig {
                    n_vehicles: vehicles,
                    ..ScenarioConfig::default()
                },
                explore_fraction: explore,
                use_speed,
                ..Default::default()
            };

            let runs = run_grid(config, &algorithms, trials, seed).await?;
            let mut results = GridResults::new();
            for run in runs {
                results.add(run);
            }
            results.compute_summary();

            let output_path = timestamped_path(&output);
            results.save(&output_path)?;

            println!("\n=== Grid Experiment Complete ===");
            println!("Results saved to: {}", output_path.display());
            println!("\nSummary:");
            for (key, summary) in &results.summary {
                println!(
                    "  {}: mean_conn={} (se {:.2}), avg_connections={:.1}",
                    key,
                    format_duration(summary.mean_connection_secs),
                    summary.mean_connection_se,
                    summary.avg_connections
                );
            }
        }

        Commands::Ablation {
            trials,
            vehicles,
            duration,
            seed,
            output,
        } => {
            info!(trials = trials, "Starting ablation study");

            // Ablation configurations: explore fraction x speed feature
            let explore_fractions = [0.1, 0.3, 0.5];
            let speed_flags = [false, true];

            let mut results = GridResults::new();
            let mut run_index: u64 = 0;
            for &explore in &explore_fractions {
                for &use_speed in &speed_flags {
                    let config = ExperimentRunnerConfig {
                        sim: SimParams {
                            duration_secs: duration,
                            ..SimParams::default()
                        },
                        scenario: ScenarioConfig {
                            n_vehicles: vehicles,
                            ..ScenarioConfig::default()
                        },
                        explore_fraction: explore,
                        use_speed,
                        ..Default::default()
                    };

                    let mut tasks = Vec::new();
                    for trial in 0..trials {
                        let runner = ExperimentRunner::new(config.clone());
                        let run_seed = seed.map(|s| s.wrapping_add(run_index));
                        run_index += 1;
                        tasks.push(tokio::task::spawn_blocking(move || {
                            runner.run(Algorithm::Cmab, trial, run_seed)
                        }));
                    }
                    for joined in join_all(tasks).await {
                        results.add(joined??);
                    }

                    info!(
                        explore = explore,
                        use_speed = use_speed,
                        "Completed ablation configuration"
                    );
                }
            }

            results.compute_summary();
            let output_path = timestamped_path(&output);
            results.save(&output_path)?;

            println!("\n=== Ablation Study Complete ===");
            println!("Results saved to: {}", output_path.display());
        }

        Commands::Map { preset, seed, json } => {
            let preset = match preset.to_lowercase().as_str() {
                "compact" => MapPreset::Compact,
                "town" => MapPreset::Town,
                "sprawl" => MapPreset::Sprawl,
                other => anyhow::bail!(
                    "Unknown preset: {}. Valid: compact, town, sprawl",
                    other
                ),
            };

            let mut generator = MapGenerator::new(preset.config(), seed);
            let map = generator.generate()?;

            if json {
                println!("{}", map.to_json()?);
                return Ok(());
            }

            println!("Road map ({} pins, {} roads):", map.pin_count(), map.edge_count());
            for pin in map.pins() {
                println!(
                    "  {:<12} ({:>7.1}, {:>7.1})",
                    pin.name, pin.location.x, pin.location.y
                );
            }

            let names = map.pin_names();
            if names.len() >= 3 {
                // Demo path between the first two route pins (pin 0 is the
                // cell site)
                let (a, b) = (names[1], names[2]);
                match map.find_path(a, b) {
                    Some(path) => println!("\nPath {} -> {}: {} waypoints", a, b, path.len()),
                    None => println!("\nPath {} -> {}: unreachable", a, b),
                }
            }
        }
    }

    Ok(())
}

/// Run algorithms × trials concurrently, one blocking task per run.
async fn run_grid(
    config: ExperimentRunnerConfig,
    algorithms: &[Algorithm],
    trials: usize,
    base_seed: Option<u64>,
) -> Result<Vec<RunResult>> {
    let mut tasks = Vec::new();
    let mut run_index: u64 = 0;
    for &algorithm in algorithms {
        for trial in 0..trials {
            let runner = ExperimentRunner::new(config.clone());
            let run_seed = base_seed.map(|s| s.wrapping_add(run_index));
            run_index += 1;
            tasks.push(tokio::task::spawn_blocking(move || {
                runner.run(algorithm, trial, run_seed)
            }));
        }
    }

    let mut results = Vec::new();
    for joined in join_all(tasks).await {
        results.push(joined??);
    }
    Ok(results)
}

/// Print a single run's outcome as a table.
fn print_run_result(result: &RunResult) {
    println!("\n=== Experiment Result ===");
    println!("Algorithm: {}", result.config.algorithm);
    println!(
        "Vehicles: {}, Beams: {} ({} active)",
        result.config.n_vehicles, result.config.n_beams, result.config.max_active_beams
    );
    println!(
        "Horizon: {} sim time, {} ticks",
        format_duration(result.config.duration_secs),
        result.total_ticks
    );
    println!("Connections: {}", result.total_connections);
    println!(
        "Mean connection time: {}",
        format_duration(result.mean_connection_secs)
    );

    println!("\nPer-beam:");
    println!("  {:<8} {:>10} {:>8}", "Beam", "Mean(s)", "Count");
    for beam in &result.per_beam {
        println!(
            "  {:<8} {:>10.2} {:>8}",
            beam.beam, beam.mean_connection_secs, beam.connections
        );
    }

    if let Some(bandit) = &result.bandit {
        println!("\nBandit:");
        println!(
            "  Contexts observed: {}/{}",
            bandit.contexts_observed, bandit.total_contexts
        );
        println!("  Total pulls: {}", bandit.total_pulls);
        println!(
            "  Best arm: {:.2}s mean reward over {} pulls",
            bandit.best_mean_reward_secs, bandit.best_arm_pulls
        );
    }
}
