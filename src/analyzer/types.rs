//! Record types produced by the log scan.

use serde::{Deserialize, Serialize};

/// One bandwidth measurement row (`ib_*_bw` tests).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandwidthRecord {
    /// Test label, e.g. `ib_write_bw`.
    #[serde(rename = "type")]
    pub test_type: String,
    pub bytes: u64,
    pub iterations: u64,
    /// Peak bandwidth in MiB/s.
    #[serde(with = "json_float")]
    pub bw_peak: f64,
    /// Average bandwidth in MiB/s.
    #[serde(with = "json_float")]
    pub bw_avg: f64,
    /// Message rate in Mpps.
    #[serde(with = "json_float")]
    pub msg_rate: f64,
}

/// One latency measurement row (`ib_*_lat` tests).
///
/// Times are kept in the unit printed by the benchmark (usec).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyRecord {
    /// Test label, e.g. `ib_read_lat`.
    #[serde(rename = "type")]
    pub test_type: String,
    pub bytes: u64,
    pub iterations: u64,
    #[serde(with = "json_float")]
    pub t_min: f64,
    #[serde(with = "json_float")]
    pub t_max: f64,
    #[serde(with = "json_float")]
    pub t_typical: f64,
    #[serde(with = "json_float")]
    pub t_avg: f64,
    #[serde(with = "json_float")]
    pub t_stdev: f64,
    #[serde(with = "json_float")]
    pub t_99: f64,
    #[serde(with = "json_float")]
    pub t_999: f64,
}

/// Everything extracted from one log, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RdmaResults {
    pub bandwidth: Vec<BandwidthRecord>,
    pub latency: Vec<LatencyRecord>,
}

impl RdmaResults {
    pub fn is_empty(&self) -> bool {
        self.bandwidth.is_empty() && self.latency.is_empty()
    }
}

/// Block counters collected during a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Windows that matched the block signature and consumed four lines.
    pub accepted_blocks: usize,
    /// Accepted blocks whose label had neither a `_bw` nor a `_lat` marker.
    pub dropped_blocks: usize,
}

/// Output of a successful scan.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub results: RdmaResults,
    pub stats: ScanStats,
}

/// Float fields that survive a JSON round trip even when not finite.
///
/// perftest can print `nan` or `inf` columns, which JSON numbers cannot hold.
/// Those are written as the strings `"NaN"`, `"Infinity"` and `"-Infinity"`;
/// finite values stay plain numbers.
mod json_float {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    const NAN: &str = "NaN";
    const INFINITY: &str = "Infinity";
    const NEG_INFINITY: &str = "-Infinity";

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_str(NAN)
        } else if value.is_infinite() {
            serializer.serialize_str(if *value > 0.0 { INFINITY } else { NEG_INFINITY })
        } else {
            serializer.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => match text.as_str() {
                NAN => Ok(f64::NAN),
                INFINITY => Ok(f64::INFINITY),
                NEG_INFINITY => Ok(f64::NEG_INFINITY),
                other => Err(D::Error::custom(format!("expected a number, found string '{}'", other))),
            },
        }
    }
}

/// Common view over both record kinds, used for grouping and charting.
pub trait PerfRecord {
    fn test_type(&self) -> &str;
    fn bytes(&self) -> u64;
}

impl PerfRecord for BandwidthRecord {
    fn test_type(&self) -> &str {
        &self.test_type
    }

    fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl PerfRecord for LatencyRecord {
    fn test_type(&self) -> &str {
        &self.test_type
    }

    fn bytes(&self) -> u64 {
        self.bytes
    }
}
