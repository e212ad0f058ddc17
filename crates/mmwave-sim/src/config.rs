//! Simulation timing parameters.

use serde::Deserialize;

/// Top-level timing configuration for a simulation run.
///
/// Defaults mirror the standard 10-hour small-cell run: 0.1 s steps with a
/// progress report every 5% of the horizon.
#[derive(Debug, Clone, Deserialize)]
pub struct SimParams {
    /// Simulation step in seconds.
    pub step_secs: f64,

    /// Simulation horizon in seconds.
    pub duration_secs: f64,

    /// Progress-report interval as a fraction of the horizon.
    pub progress_interval: f64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            step_secs: 0.1,
            duration_secs: 36_000.0, // 10 hours
            progress_interval: 0.05,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = SimParams::default();
        assert_eq!(params.step_secs, 0.1);
        assert_eq!(params.duration_secs, 36_000.0);
        assert_eq!(params.progress_interval, 0.05);
    }
}
