//! Load driver for the usuarios API
//!
//! Ramps virtual users (VUs) through a stage profile. Every VU repeatedly
//! creates, reads, updates, lists and deletes a user, recording request
//! timings and named checks. At the end the run is judged against
//! thresholds on request latency, request failures and check pass rate.

pub mod config;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod scenario;

pub use config::{LoadConfig, Stage, Thresholds};
pub use error::{LoadTestError, LoadTestResult};
pub use metrics::Summary;
