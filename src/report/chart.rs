//! Per-test-type charts of bandwidth and P99 latency against message size.

use anyhow::Context;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::analyzer::{BandwidthRecord, LatencyRecord, PerfRecord};
use crate::config::{ChartFormat, ReportConfig};

const X_DESC: &str = "Message Size (Bytes)";
const FONT_FAMILY: &str = "serif";

/// What to plot for one record kind.
pub struct ChartKind<R> {
    /// Appended to the test type to form the file stem.
    pub file_suffix: &'static str,
    /// Appended to the test type to form the chart title.
    pub title: &'static str,
    pub y_desc: &'static str,
    pub value: fn(&R) -> f64,
}

pub const BANDWIDTH_CHART: ChartKind<BandwidthRecord> = ChartKind {
    file_suffix: "bw_avg",
    title: "BW Average vs Message Size",
    y_desc: "Average Bandwidth (MiB/s)",
    value: bw_avg,
};

pub const LATENCY_CHART: ChartKind<LatencyRecord> = ChartKind {
    file_suffix: "p99_latency",
    title: "P99 Latency vs Message Size",
    y_desc: "99th Percentile Latency (µs)",
    value: p99_latency,
};

fn bw_avg(record: &BandwidthRecord) -> f64 {
    record.bw_avg
}

fn p99_latency(record: &LatencyRecord) -> f64 {
    record.t_99
}

/// Points of one chart, sorted by message size.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub test_type: String,
    pub points: Vec<(u64, f64)>,
}

/// Group records by test type, keeping discovery order inside each group.
pub fn group_by_type<R: PerfRecord>(records: &[R]) -> BTreeMap<&str, Vec<&R>> {
    let mut groups: BTreeMap<&str, Vec<&R>> = BTreeMap::new();
    for record in records {
        groups.entry(record.test_type()).or_default().push(record);
    }
    groups
}

/// Build one series per test type.
///
/// Points are sorted by `bytes` ascending. Points that cannot be placed on a
/// log2 axis (zero bytes) or have a non-finite value are skipped, and a type
/// left without points produces no series.
pub fn build_series<R: PerfRecord>(records: &[R], kind: &ChartKind<R>) -> Vec<ChartSeries> {
    let mut all_series = Vec::new();

    for (test_type, mut group) in group_by_type(records) {
        group.sort_by_key(|record| record.bytes());

        let points: Vec<(u64, f64)> = group
            .into_iter()
            .filter_map(|record| {
                let value = (kind.value)(record);
                if record.bytes() == 0 || !value.is_finite() {
                    log::warn!(
                        "Skipping {} point at {} bytes ({}), not plottable on a log2 axis",
                        test_type,
                        record.bytes(),
                        value
                    );
                    return None;
                }
                Some((record.bytes(), value))
            })
            .collect();

        if points.is_empty() {
            log::warn!("No plottable points for {}, chart skipped", test_type);
            continue;
        }

        all_series.push(ChartSeries {
            test_type: test_type.to_string(),
            points,
        });
    }

    all_series
}

/// File name of the chart for `test_type`, e.g. `ib_write_bw_bw_avg.png`.
pub fn chart_file_name(test_type: &str, file_suffix: &str, format: ChartFormat) -> String {
    format!("{}_{}.{}", test_type, file_suffix, format.extension())
}

/// Tick label for a message size: `2^k` with `k = floor(log2(bytes))`.
pub fn log2_label(bytes: f64) -> String {
    if !(bytes >= 1.0) {
        return String::new();
    }
    format!("2^{}", (bytes as u64).ilog2())
}

/// Render every chart of one record kind into `config.chart_dir`.
///
/// # Returns
///
/// Paths of the written files, in test type order.
pub fn render_charts<R: PerfRecord>(
    records: &[R],
    kind: &ChartKind<R>,
    config: &ReportConfig,
) -> anyhow::Result<Vec<PathBuf>> {
    let all_series = build_series(records, kind);
    if all_series.is_empty() {
        return Ok(Vec::new());
    }

    fs::create_dir_all(&config.chart_dir)
        .with_context(|| format!("Failed to create chart directory: {}", config.chart_dir.display()))?;

    let size = (config.chart_width, config.chart_height);
    let mut written = Vec::with_capacity(all_series.len());

    for series in &all_series {
        let path = config
            .chart_dir
            .join(chart_file_name(&series.test_type, kind.file_suffix, config.chart_format));
        let title = format!("{} - {}", series.test_type, kind.title);

        let drawn = match config.chart_format {
            ChartFormat::Png => draw_chart(BitMapBackend::new(&path, size).into_drawing_area(), series, &title, kind.y_desc),
            ChartFormat::Svg => draw_chart(SVGBackend::new(&path, size).into_drawing_area(), series, &title, kind.y_desc),
        };
        drawn.with_context(|| format!("Failed to render chart: {}", path.display()))?;

        log::info!("Wrote chart {}", path.display());
        written.push(path);
    }

    Ok(written)
}

fn draw_chart<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    series: &ChartSeries,
    title: &str,
    y_desc: &str,
) -> anyhow::Result<()>
where
    DB::ErrorType: 'static,
{
    let points: Vec<(f64, f64)> = series.points.iter().map(|&(bytes, value)| (bytes as f64, value)).collect();
    let ticks: Vec<f64> = points.iter().map(|&(x, _)| x).collect();

    // Half a power of two of headroom on each side of the data.
    let x_lo = ticks[0] / std::f64::consts::SQRT_2;
    let x_hi = ticks[ticks.len() - 1] * std::f64::consts::SQRT_2;
    let (y_lo, y_hi) = value_bounds(points.iter().map(|&(_, y)| y));

    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT_FAMILY, 24).into_font().style(FontStyle::Bold))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d((x_lo..x_hi).log_scale().with_key_points(ticks.clone()), y_lo..y_hi)?;

    chart
        .configure_mesh()
        .x_labels(ticks.len())
        .x_label_formatter(&|x: &f64| log2_label(*x))
        .x_desc(X_DESC)
        .y_desc(y_desc)
        .axis_desc_style((FONT_FAMILY, 18).into_font().style(FontStyle::Bold))
        .label_style((FONT_FAMILY, 13).into_font().style(FontStyle::Bold))
        .draw()?;

    chart.draw_series(LineSeries::new(points.clone(), BLUE.stroke_width(2)))?;
    chart.draw_series(points.iter().map(|&point| Circle::new(point, 4, BLUE.filled())))?;

    root.present()?;
    Ok(())
}

/// Y range covering zero and every value, with 10% headroom.
fn value_bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let span = if max > min { max - min } else { 1.0 };
    let lo = if min < 0.0 { min - span * 0.1 } else { 0.0 };
    (lo, max + span * 0.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bw(test_type: &str, bytes: u64, bw_avg: f64) -> BandwidthRecord {
        BandwidthRecord {
            test_type: test_type.to_string(),
            bytes,
            iterations: 1000,
            bw_peak: bw_avg,
            bw_avg,
            msg_rate: 1.0,
        }
    }

    fn lat(test_type: &str, bytes: u64, t_99: f64) -> LatencyRecord {
        LatencyRecord {
            test_type: test_type.to_string(),
            bytes,
            iterations: 1000,
            t_min: 1.0,
            t_max: 9.0,
            t_typical: 2.0,
            t_avg: 2.0,
            t_stdev: 0.1,
            t_99,
            t_999: 8.0,
        }
    }

    #[test]
    fn test_group_by_type_keeps_discovery_order() {
        let records = vec![bw("ib_write_bw", 4, 1.0), bw("ib_read_bw", 2, 2.0), bw("ib_write_bw", 2, 3.0)];
        let groups = group_by_type(&records);

        assert_eq!(groups.keys().copied().collect::<Vec<_>>(), vec!["ib_read_bw", "ib_write_bw"]);
        let write: Vec<u64> = groups["ib_write_bw"].iter().map(|r| r.bytes).collect();
        assert_eq!(write, vec![4, 2]);
    }

    #[test]
    fn test_bandwidth_series_sorted_by_bytes() {
        let records = vec![
            bw("ib_write_bw", 65536, 12000.0),
            bw("ib_send_bw", 2, 10.0),
            bw("ib_write_bw", 2, 9.5),
            bw("ib_write_bw", 1024, 4000.0),
        ];
        let series = build_series(&records, &BANDWIDTH_CHART);

        assert_eq!(
            series,
            vec![
                ChartSeries {
                    test_type: "ib_send_bw".to_string(),
                    points: vec![(2, 10.0)],
                },
                ChartSeries {
                    test_type: "ib_write_bw".to_string(),
                    points: vec![(2, 9.5), (1024, 4000.0), (65536, 12000.0)],
                },
            ]
        );
    }

    #[test]
    fn test_latency_series_plots_p99() {
        let records = vec![lat("ib_read_lat", 8, 2.5), lat("ib_read_lat", 2, 1.42)];
        let series = build_series(&records, &LATENCY_CHART);

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].points, vec![(2, 1.42), (8, 2.5)]);
    }

    #[test]
    fn test_zero_bytes_point_is_skipped() {
        let records = vec![bw("ib_write_bw", 0, 1.0), bw("ib_write_bw", 2, 2.0), bw("ib_only_zero_bw", 0, 3.0)];
        let series = build_series(&records, &BANDWIDTH_CHART);

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].test_type, "ib_write_bw");
        assert_eq!(series[0].points, vec![(2, 2.0)]);
    }

    #[test]
    fn test_chart_file_names() {
        assert_eq!(
            chart_file_name("ib_write_bw", BANDWIDTH_CHART.file_suffix, ChartFormat::Png),
            "ib_write_bw_bw_avg.png"
        );
        assert_eq!(
            chart_file_name("ib_read_lat", LATENCY_CHART.file_suffix, ChartFormat::Svg),
            "ib_read_lat_p99_latency.svg"
        );
    }

    #[test]
    fn test_log2_labels() {
        assert_eq!(log2_label(1.0), "2^0");
        assert_eq!(log2_label(2.0), "2^1");
        assert_eq!(log2_label(65536.0), "2^16");
        assert_eq!(log2_label(1000.0), "2^9");
        assert_eq!(log2_label(0.5), "");
        assert_eq!(log2_label(f64::NAN), "");
    }

    #[test]
    fn test_value_bounds() {
        assert_eq!(value_bounds([10.0, 20.0].into_iter()), (0.0, 22.0));
        assert_eq!(value_bounds([0.0].into_iter()), (0.0, 0.1));
        let (lo, hi) = value_bounds([-5.0, 5.0].into_iter());
        assert_eq!((lo, hi), (-6.0, 6.0));
    }

    #[test]
    fn test_render_svg_with_log2_ticks() {
        let config = ReportConfig {
            chart_dir: std::env::temp_dir().join(format!("rdma-perf-report-{}-svg", std::process::id())),
            chart_format: ChartFormat::Svg,
            ..ReportConfig::default()
        };
        let records = vec![bw("ib_write_bw", 4096, 9000.0), bw("ib_write_bw", 1024, 5000.0), bw("ib_write_bw", 2048, 7000.0)];

        let written = render_charts(&records, &BANDWIDTH_CHART, &config).unwrap();
        let svg = fs::read_to_string(config.chart_dir.join("ib_write_bw_bw_avg.svg")).unwrap();
        fs::remove_dir_all(&config.chart_dir).unwrap();

        assert_eq!(written, vec![config.chart_dir.join("ib_write_bw_bw_avg.svg")]);
        assert!(svg.contains("2^10"));
        assert!(svg.contains("2^12"));
        assert!(svg.contains("ib_write_bw - BW Average vs Message Size"));
    }

    #[test]
    fn test_render_nothing_for_empty_input() {
        let config = ReportConfig {
            chart_dir: std::env::temp_dir().join("rdma-perf-report-never-created"),
            ..ReportConfig::default()
        };
        let written = render_charts::<BandwidthRecord>(&[], &BANDWIDTH_CHART, &config).unwrap();

        assert!(written.is_empty());
        assert!(!config.chart_dir.exists());
    }
}
