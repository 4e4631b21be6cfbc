use anyhow::Context;
use clap::Parser;
use env_logger::Builder;
use log::{LevelFilter, info};
use std::path::PathBuf;

use crate::analyzer::{RdmaResults, extract_records, load_lines};
use crate::config::{ChartFormat, ReportConfig};
use crate::report::{BANDWIDTH_CHART, LATENCY_CHART, read_json, render_charts, write_json};

mod analyzer;
mod config;
mod report;

#[derive(Parser, Debug)]
#[command(author, version, about = "Extract perftest results from a client log into JSON and charts")]
struct Args {
    /// perftest client log to parse [default: client_results.log]
    input: Option<PathBuf>,

    /// TOML config file [default: rdma-report.toml next to the input, if present]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Destination of the JSON report
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory receiving the chart images
    #[arg(long)]
    chart_dir: Option<PathBuf>,

    /// Chart image format
    #[arg(long, value_enum)]
    format: Option<ChartFormat>,

    /// Only write the JSON report
    #[arg(long)]
    no_charts: bool,

    /// Render charts from a previously written JSON report instead of a log
    #[arg(long, conflicts_with_all = ["input", "output"])]
    from_json: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Resolve the config file and apply command line overrides on top of it.
    fn resolve_config(&self) -> anyhow::Result<ReportConfig> {
        let mut config = match &self.config {
            Some(path) => ReportConfig::load(path).map_err(anyhow::Error::msg)?,
            None => {
                let input = self.input.clone().unwrap_or_else(|| ReportConfig::default().input);
                let candidate = ReportConfig::config_path_from_input(&input);
                if candidate.is_file() {
                    info!("Using config {}", candidate.display());
                    ReportConfig::load(&candidate).map_err(anyhow::Error::msg)?
                } else {
                    ReportConfig::default()
                }
            }
        };

        if let Some(input) = &self.input {
            config.input = input.clone();
        }
        if let Some(output) = &self.output {
            config.json_output = output.clone();
        }
        if let Some(chart_dir) = &self.chart_dir {
            config.chart_dir = chart_dir.clone();
        }
        if let Some(format) = self.format {
            config.chart_format = format;
        }
        if self.no_charts {
            config.charts = false;
        }

        Ok(config)
    }
}

/// Parse the log (or load an earlier report), write JSON, then render charts.
fn run(args: &Args, config: &ReportConfig) -> anyhow::Result<()> {
    let results: RdmaResults = match &args.from_json {
        Some(path) => read_json(path)?,
        None => {
            let lines = load_lines(&config.input)?;
            let extraction = extract_records(&lines)
                .with_context(|| format!("Malformed result block in {}", config.input.display()))?;

            info!(
                "Found {} result blocks ({} bandwidth, {} latency, {} without marker)",
                extraction.stats.accepted_blocks,
                extraction.results.bandwidth.len(),
                extraction.results.latency.len(),
                extraction.stats.dropped_blocks
            );
            if extraction.results.is_empty() {
                log::warn!("No bandwidth or latency results found in {}", config.input.display());
            }

            write_json(&extraction.results, &config.json_output)?;
            extraction.results
        }
    };

    if config.charts {
        let bandwidth_charts = render_charts(&results.bandwidth, &BANDWIDTH_CHART, config)?;
        let latency_charts = render_charts(&results.latency, &LATENCY_CHART, config)?;
        info!(
            "Rendered {} bandwidth and {} latency charts into {}",
            bandwidth_charts.len(),
            latency_charts.len(),
            config.chart_dir.display()
        );
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logging setup
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(
            Some("rdma_perf_report"),
            if args.verbose { LevelFilter::Debug } else { LevelFilter::Info },
        )
        .parse_default_env()
        .init();

    let config = args.resolve_config()?;
    run(&args, &config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_defaults() {
        let args = Args::try_parse_from([
            "rdma-perf-report",
            "/nonexistent/run/client.log",
            "-o",
            "out/results.json",
            "--chart-dir",
            "out",
            "--format",
            "svg",
            "--no-charts",
        ])
        .unwrap();
        let config = args.resolve_config().unwrap();

        assert_eq!(config.input, PathBuf::from("/nonexistent/run/client.log"));
        assert_eq!(config.json_output, PathBuf::from("out/results.json"));
        assert_eq!(config.chart_dir, PathBuf::from("out"));
        assert_eq!(config.chart_format, ChartFormat::Svg);
        assert!(!config.charts);
        assert_eq!(config.chart_width, 1000);
    }

    #[test]
    fn test_config_file_next_to_input() {
        let dir = std::env::temp_dir().join(format!("rdma-perf-report-{}-cli", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("rdma-report.toml"), "chart-format = \"svg\"\njson-output = \"from_file.json\"\n").unwrap();
        let input = dir.join("client_results.log");

        let input_arg = input.to_string_lossy().to_string();

        let args = Args::try_parse_from(["rdma-perf-report", input_arg.as_str(), "--output", "cli.json"]).unwrap();
        let config = args.resolve_config().unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(config.chart_format, ChartFormat::Svg);
        assert_eq!(config.json_output, PathBuf::from("cli.json"));
        assert_eq!(config.input, input);
    }

    #[test]
    fn test_missing_explicit_config_is_fatal() {
        let args = Args::try_parse_from(["rdma-perf-report", "--config", "/nonexistent/rdma-report.toml"]).unwrap();
        let err = args.resolve_config().unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_from_json_conflicts_with_input() {
        assert!(Args::try_parse_from(["rdma-perf-report", "client.log", "--from-json", "r.json"]).is_err());
    }

    #[test]
    fn test_run_writes_report_and_skips_charts() {
        let dir = std::env::temp_dir().join(format!("rdma-perf-report-{}-run", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("client_results.log");
        std::fs::write(
            &input,
            " #bytes     #iterations    BW peak[MiB/sec]    BW average[MiB/sec]   MsgRate[Mpps]\n \
             65536      1000             12345.6            12000.1               183.2\n\
             -----------------------------------\n\
             ib_write_bw\n",
        )
        .unwrap();
        let config = ReportConfig {
            input: input.clone(),
            json_output: dir.join("rdma_results.json"),
            charts: false,
            ..ReportConfig::default()
        };
        let args = Args::try_parse_from(["rdma-perf-report"]).unwrap();

        run(&args, &config).unwrap();
        let results = read_json(&config.json_output).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(results.bandwidth.len(), 1);
        assert_eq!(results.bandwidth[0].bw_avg, 12000.1);
        assert!(results.latency.is_empty());
    }

    #[test]
    fn test_run_writes_nothing_on_format_error() {
        let dir = std::env::temp_dir().join(format!("rdma-perf-report-{}-bad-run", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("client_results.log");
        std::fs::write(&input, "#bytes #iterations\n2 1000 1.0\n---\nib_send_lat\n").unwrap();
        let config = ReportConfig {
            input,
            json_output: dir.join("rdma_results.json"),
            charts: false,
            ..ReportConfig::default()
        };
        let args = Args::try_parse_from(["rdma-perf-report"]).unwrap();

        let err = run(&args, &config).unwrap_err();
        let written = config.json_output.exists();
        std::fs::remove_dir_all(&dir).unwrap();

        assert!(format!("{:#}", err).contains("line index 1"));
        assert!(!written);
    }
}
