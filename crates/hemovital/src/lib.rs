//! Donor matching and blood demand analytics for hospital coordination.

pub mod analytics;
pub mod config;
pub mod error;
pub mod telemetry;
