//! Analyzer module for perftest client logs.
//!
//! Provides functionality for:
//! - Loading a log file into memory
//! - Scanning it for bandwidth and latency result blocks

pub mod log_loader;
pub mod log_parser;
pub mod types;

pub use log_loader::load_lines;
pub use log_parser::extract_records;
pub use types::{BandwidthRecord, LatencyRecord, PerfRecord, RdmaResults};
