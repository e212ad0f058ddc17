//! Connection statistics per beam.
//!
//! Two books are kept: an overall book covering the whole run, and a
//! session book that resets at every progress snapshot so the report shows
//! both cumulative and recent behavior.

use serde::Serialize;

/// Connection-time accounting for a single beam.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BeamStats {
    /// Start time of the connection currently in flight.
    conn_start: Option<f64>,
    total_secs: f64,
    count: u64,
}

impl BeamStats {
    /// A connection to this beam was established.
    pub fn conn_begin(&mut self, now: f64) {
        self.conn_start = Some(now);
    }

    /// The connection to this beam was lost.
    pub fn conn_end(&mut self, now: f64) {
        if let Some(start) = self.conn_start.take() {
            self.total_secs += now - start;
            self.count += 1;
        }
    }

    /// Mean duration of completed connections, 0 when there were none.
    pub fn mean_connection_secs(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.total_secs / self.count as f64
    }

    pub fn connection_count(&self) -> u64 {
        self.count
    }

    pub fn total_secs(&self) -> f64 {
        self.total_secs
    }

    /// Zero the totals. An in-flight connection is kept so it still
    /// completes in this book after the reset.
    pub fn reset(&mut self) {
        self.total_secs = 0.0;
        self.count = 0;
    }
}

/// Overall and session statistics for all beams.
#[derive(Debug, Clone)]
pub struct StatsBook {
    overall: Vec<BeamStats>,
    session: Vec<BeamStats>,
}

impl StatsBook {
    pub fn new(n_beams: usize) -> Self {
        Self {
            overall: vec![BeamStats::default(); n_beams],
            session: vec![BeamStats::default(); n_beams],
        }
    }

    pub fn conn_begin(&mut self, beam: usize, now: f64) {
        self.overall[beam].conn_begin(now);
        self.session[beam].conn_begin(now);
    }

    pub fn conn_end(&mut self, beam: usize, now: f64) {
        self.overall[beam].conn_end(now);
        self.session[beam].conn_end(now);
    }

    pub fn overall(&self) -> &[BeamStats] {
        &self.overall
    }

    pub fn session(&self) -> &[BeamStats] {
        &self.session
    }

    /// Reset the session book (totals only; in-flight starts survive).
    pub fn reset_session(&mut self) {
        for s in &mut self.session {
            s.reset();
        }
    }

    /// Connection-count weighted mean connection time across all beams.
    pub fn overall_mean_secs(&self) -> f64 {
        weighted_mean(&self.overall)
    }

    /// Total completed connections across all beams.
    pub fn total_connections(&self) -> u64 {
        self.overall.iter().map(|s| s.connection_count()).sum()
    }
}

/// Count-weighted mean connection time over a set of beam stats.
pub fn weighted_mean(stats: &[BeamStats]) -> f64 {
    let count: u64 = stats.iter().map(|s| s.connection_count()).sum();
    if count == 0 {
        return 0.0;
    }
    let total: f64 = stats.iter().map(|s| s.total_secs()).sum();
    total / count as f64
}
