//! HTTP service around the anomaly engine

pub mod api;
pub mod config;
