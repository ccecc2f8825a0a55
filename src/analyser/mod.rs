//! The core of SRT statistics log analysis.
//! Validates and normalises raw telemetry, then derives link statistics and window breach sets.
pub mod utils;
pub mod core;
pub mod scan;
pub mod stats;
pub mod containers;
