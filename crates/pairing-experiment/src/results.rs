//! Results collection and output for pairing experiments.
//!
//! Captures per-run metrics (mean connection time, per-beam breakdown,
//! progress snapshots, bandit state) and aggregates repeated trials into
//! per-configuration summaries with standard errors.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bandit::BanditStats;

/// Configuration of a single run, echoed into its result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Algorithm name
    pub algorithm: String,
    /// Number of sector beams
    pub n_beams: usize,
    /// Concurrent active-beam budget
    pub max_active_beams: usize,
    /// Vehicle population
    pub n_vehicles: usize,
    /// Simulation horizon in seconds
    pub duration_secs: f64,
    /// Simulation step in seconds
    pub step_secs: f64,
    /// Fraction of the horizon spent exploring (bandit algorithms)
    pub explore_fraction: f64,
    /// Whether the speed feature is part of the C-MAB context
    pub use_speed: bool,
    /// Trial number (for repeated experiments)
    pub trial: usize,
    /// Random seed of the run
    pub seed: u64,
}

/// Per-beam outcome over the whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeamSummary {
    pub beam: String,
    pub mean_connection_secs: f64,
    pub connections: u64,
}

/// Per-beam statistics at one progress boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeamProgress {
    pub beam: String,
    pub overall_mean_secs: f64,
    pub overall_count: u64,
    pub session_mean_secs: f64,
    pub session_count: u64,
}

/// Statistics snapshot taken at a progress boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Progress fraction at which the snapshot was taken.
    pub fraction: f64,
    pub beams: Vec<BeamProgress>,
}

/// Results from a single experiment run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Unique run id
    pub run_id: String,
    /// Run configuration
    pub config: RunConfig,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// End time
    pub ended_at: DateTime<Utc>,
    /// Ticks executed
    pub total_ticks: usize,
    /// Completed connections across all beams
    pub total_connections: u64,
    /// Count-weighted mean connection time across all beams
    pub mean_connection_secs: f64,
    /// Per-beam breakdown
    pub per_beam: Vec<BeamSummary>,
    /// Snapshots taken at progress boundaries
    pub snapshots: Vec<ProgressSnapshot>,
    /// Bandit state at the end (MAB/C-MAB runs only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bandit: Option<BanditStats>,
}

/// Aggregate results from a grid experiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridResults {
    /// All individual results
    pub results: Vec<RunResult>,
    /// Summary statistics by configuration
    pub summary: HashMap<String, ConfigSummary>,
}

/// Summary statistics for one configuration across trials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub config_key: String,
    pub trials: usize,
    /// Mean over trials of the run-level mean connection time
    pub mean_connection_secs: f64,
    /// Standard error of that mean
    pub mean_connection_se: f64,
    /// 95% confidence interval
    pub mean_connection_ci: (f64, f64),
    /// Mean number of completed connections per trial
    pub avg_connections: f64,
    pub min_connection_secs: f64,
    pub max_connection_secs: f64,
}

impl GridResults {
    /// Create a new empty grid results.
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
            summary: HashMap::new(),
        }
    }

    /// Add a result.
    pub fn add(&mut self, result: RunResult) {
        self.results.push(result);
    }

    /// Group key for a run configuration.
    fn config_key(config: &RunConfig) -> String {
        format!(
            "{}:vehicles={}:explore={}:speed={}",
            config.algorithm, config.n_vehicles, config.explore_fraction, config.use_speed
        )
    }

    /// Compute summary statistics.
    pub fn compute_summary(&mut self) {
        let mut by_config: HashMap<String, Vec<&RunResult>> = HashMap::new();
        for result in &self.results {
            by_config
                .entry(Self::config_key(&result.config))
                .or_default()
                .push(result);
        }

        for (key, results) in by_config {
            let trials = results.len();
            let n = trials as f64;

            let means: Vec<f64> = results.iter().map(|r| r.mean_connection_secs).collect();
            let mean = means.iter().sum::<f64>() / n;

            // Standard error: std_dev / sqrt(n)
            let se = if trials > 1 {
                let variance =
                    means.iter().map(|m| (m - mean).powi(2)).sum::<f64>() / (n - 1.0);
                variance.sqrt() / n.sqrt()
            } else {
                0.0
            };

            // 95% CI: mean +/- 1.96 * SE, clamped at zero
            let z = 1.96;
            let ci = ((mean - z * se).max(0.0), mean + z * se);

            let avg_connections =
                results.iter().map(|r| r.total_connections as f64).sum::<f64>() / n;
            let min = means.iter().copied().fold(f64::INFINITY, f64::min);
            let max = means.iter().copied().fold(f64::NEG_INFINITY, f64::max);

            self.summary.insert(
                key.clone(),
                ConfigSummary {
                    config_key: key,
                    trials,
                    mean_connection_secs: mean,
                    mean_connection_se: se,
                    mean_connection_ci: ci,
                    avg_connections,
                    min_connection_secs: min,
                    max_connection_secs: max,
                },
            );
        }
    }

    /// Save results to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load results from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let results = serde_json::from_str(&json)?;
        Ok(results)
    }
}

impl Default for GridResults {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a duration in seconds for display.
pub fn format_duration(secs: f64) -> String {
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else if secs < 3_600.0 {
        format!("{:.1}m", secs / 60.0)
    } else {
        format!("{:.1}h", secs / 3_600.0)
    }
}
