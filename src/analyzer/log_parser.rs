//! Scan perftest output and extract bandwidth/latency records.
//!
//! Every result in an `ib_*` client log is printed as a four-line block:
//!
//! ```text
//!  #bytes     #iterations    BW peak[MiB/sec]    BW average[MiB/sec]   MsgRate[Mpps]
//!  65536      1000             12345.6            12000.1               0.192002
//! ---------------------------------------------------------------------------------------
//! ib_write_bw
//! ```
//!
//! The scan walks a cursor over the lines. A window that does not match the
//! block signature advances the cursor by one line, an accepted block by four.

use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;

use super::types::{BandwidthRecord, Extraction, LatencyRecord, RdmaResults, ScanStats};

/// Lines in one result block: header, data, divider, label.
pub const BLOCK_LINES: usize = 4;

const TEST_LABEL_MARKER: &str = "ib_";
const BANDWIDTH_MARKER: &str = "_bw";
const LATENCY_MARKER: &str = "_lat";

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#bytes\s+#iterations").unwrap());
static DIVIDER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-+$").unwrap());

/// Column names of a bandwidth data line, in print order.
const BANDWIDTH_COLUMNS: [&str; 5] = ["bytes", "iterations", "bw_peak", "bw_avg", "msg_rate"];

/// Column names of a latency data line, in print order.
const LATENCY_COLUMNS: [&str; 9] = [
    "bytes",
    "iterations",
    "t_min",
    "t_max",
    "t_typical",
    "t_avg",
    "t_stdev",
    "t_99",
    "t_999",
];

/// A block matched the signature but its data line could not be read.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatError {
    /// The data line ran out of tokens before `field`.
    MissingField {
        line_index: usize,
        field: &'static str,
        expected: usize,
        found: usize,
    },
    /// `token` in column `field` is not a valid number.
    InvalidNumber {
        line_index: usize,
        field: &'static str,
        token: String,
    },
}

impl std::fmt::Display for FormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatError::MissingField {
                line_index,
                field,
                expected,
                found,
            } => write!(
                f,
                "line index {}: missing column '{}' (expected {} tokens, found {})",
                line_index, field, expected, found
            ),
            FormatError::InvalidNumber { line_index, field, token } => {
                write!(f, "line index {}: invalid number '{}' in column '{}'", line_index, token, field)
            }
        }
    }
}

impl std::error::Error for FormatError {}

/// Extract all records from a log.
///
/// # Parameters
///
/// * `lines` - The complete log, one entry per line
///
/// # Returns
///
/// The bandwidth and latency records in discovery order plus block counters,
/// or the first `FormatError`. Nothing is returned on failure.
pub fn extract_records<S: AsRef<str>>(lines: &[S]) -> Result<Extraction, FormatError> {
    let mut results = RdmaResults::default();
    let mut stats = ScanStats::default();
    let mut i = 0;

    while i + BLOCK_LINES <= lines.len() {
        let header = lines[i].as_ref().trim();
        let data = lines[i + 1].as_ref().trim();
        let divider = lines[i + 2].as_ref().trim();
        let label = lines[i + 3].as_ref().trim();

        if !is_record_block(header, divider, label) {
            i += 1;
            continue;
        }

        let data_index = i + 1;
        let tokens: Vec<&str> = data.split_whitespace().collect();

        if label.contains(BANDWIDTH_MARKER) {
            let record = parse_bandwidth(label, &tokens, data_index)?;
            log::debug!("Bandwidth block at line {}: {} {} bytes", i, record.test_type, record.bytes);
            results.bandwidth.push(record);
        } else if label.contains(LATENCY_MARKER) {
            let record = parse_latency(label, &tokens, data_index)?;
            log::debug!("Latency block at line {}: {} {} bytes", i, record.test_type, record.bytes);
            results.latency.push(record);
        } else {
            log::debug!("Block at line {} has no bandwidth/latency marker: {}", i, label);
            stats.dropped_blocks += 1;
        }

        stats.accepted_blocks += 1;
        i += BLOCK_LINES;
    }

    Ok(Extraction { results, stats })
}

/// Check the header, divider and label lines of a candidate window.
pub fn is_record_block(header: &str, divider: &str, label: &str) -> bool {
    HEADER_RE.is_match(header) && DIVIDER_RE.is_match(divider) && label.contains(TEST_LABEL_MARKER)
}

fn parse_bandwidth(label: &str, tokens: &[&str], line_index: usize) -> Result<BandwidthRecord, FormatError> {
    let columns = Columns::new(tokens, line_index, BANDWIDTH_COLUMNS.len());

    Ok(BandwidthRecord {
        test_type: label.to_string(),
        bytes: columns.get(0, BANDWIDTH_COLUMNS[0])?,
        iterations: columns.get(1, BANDWIDTH_COLUMNS[1])?,
        bw_peak: columns.get(2, BANDWIDTH_COLUMNS[2])?,
        bw_avg: columns.get(3, BANDWIDTH_COLUMNS[3])?,
        msg_rate: columns.get(4, BANDWIDTH_COLUMNS[4])?,
    })
}

fn parse_latency(label: &str, tokens: &[&str], line_index: usize) -> Result<LatencyRecord, FormatError> {
    let columns = Columns::new(tokens, line_index, LATENCY_COLUMNS.len());

    Ok(LatencyRecord {
        test_type: label.to_string(),
        bytes: columns.get(0, LATENCY_COLUMNS[0])?,
        iterations: columns.get(1, LATENCY_COLUMNS[1])?,
        t_min: columns.get(2, LATENCY_COLUMNS[2])?,
        t_max: columns.get(3, LATENCY_COLUMNS[3])?,
        t_typical: columns.get(4, LATENCY_COLUMNS[4])?,
        t_avg: columns.get(5, LATENCY_COLUMNS[5])?,
        t_stdev: columns.get(6, LATENCY_COLUMNS[6])?,
        t_99: columns.get(7, LATENCY_COLUMNS[7])?,
        t_999: columns.get(8, LATENCY_COLUMNS[8])?,
    })
}

/// Positional reader over the tokens of a data line.
struct Columns<'a> {
    tokens: &'a [&'a str],
    line_index: usize,
    expected: usize,
}

impl<'a> Columns<'a> {
    fn new(tokens: &'a [&'a str], line_index: usize, expected: usize) -> Self {
        Self {
            tokens,
            line_index,
            expected,
        }
    }

    fn get<T: FromStr>(&self, position: usize, field: &'static str) -> Result<T, FormatError> {
        let token = self.tokens.get(position).ok_or(FormatError::MissingField {
            line_index: self.line_index,
            field,
            expected: self.expected,
            found: self.tokens.len(),
        })?;

        token.parse().map_err(|_| FormatError::InvalidNumber {
            line_index: self.line_index,
            field,
            token: token.to_string(),
        })
    }
}
