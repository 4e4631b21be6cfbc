//! Report outputs: the JSON document and the summary charts.

pub mod chart;
pub mod json;

pub use chart::{BANDWIDTH_CHART, LATENCY_CHART, render_charts};
pub use json::{read_json, write_json};
