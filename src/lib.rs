//! Transformer test analytics: loading, filtering, statistics, chart data
//! and narrative reports. The egui shell lives in the binary.

pub mod charts;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod narrative;
pub mod session;
pub mod state;
