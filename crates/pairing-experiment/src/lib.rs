//! Beam-vehicle pairing experiments.
//!
//! A base-station-centric mmWave small cell collects link quality from
//! vehicles via hello handshakes and associates sector beams with vehicles
//! using one of several selection algorithms: random, best CQI, a
//! multi-armed bandit, or a contextual multi-armed bandit that profiles
//! vehicles by range, heading, and optionally speed.

pub mod bandit;
pub mod comm;
pub mod experiment;
pub mod generator;
pub mod nodes;
pub mod results;
pub mod scenario;
pub mod stats;
pub mod strategy;
