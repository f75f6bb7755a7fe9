//! Data ingestion layer for swing-monitor.
//!
//! Responsible for discovering and reading launch-monitor CSV exports,
//! serving them through a cached session store, running the load pipeline
//! and building the per-session summary table.

pub mod aggregator;
pub mod analysis;
pub mod reader;
pub mod store;

pub use swing_core as core;
