//! Subcommand implementations

pub mod anomalies;
pub mod metrics;
pub mod reports;
