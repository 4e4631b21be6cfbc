//! Report configuration loaded from TOML and overridden from the command line.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Name of the config file looked up next to the input log.
pub const DEFAULT_CONFIG_FILE: &str = "rdma-report.toml";

/// Image format for rendered charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChartFormat {
    #[default]
    Png,
    Svg,
}

impl ChartFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ChartFormat::Png => "png",
            ChartFormat::Svg => "svg",
        }
    }
}

/// Settings for one report run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ReportConfig {
    /// perftest client log to parse
    pub input: PathBuf,
    /// Destination of the JSON report
    pub json_output: PathBuf,
    /// Directory receiving the chart images
    pub chart_dir: PathBuf,
    pub chart_format: ChartFormat,
    /// Chart width in pixels
    pub chart_width: u32,
    /// Chart height in pixels
    pub chart_height: u32,
    /// Render charts after writing the JSON report
    pub charts: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("client_results.log"),
            json_output: PathBuf::from("rdma_results.json"),
            chart_dir: PathBuf::from("."),
            chart_format: ChartFormat::Png,
            chart_width: 1000,
            chart_height: 600,
            charts: true,
        }
    }
}

impl ReportConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    /// * `config_path` - Path to the TOML file
    ///
    /// # Returns
    /// * `Ok(ReportConfig)` if the file was successfully loaded, parsed and validated
    /// * `Err(String)` with a descriptive error message otherwise
    pub fn load(config_path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(config_path).map_err(|e| format!("Failed to read config file: {}", e))?;

        Self::parse(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, String> {
        let config: ReportConfig = toml::from_str(content).map_err(|e| format!("Failed to parse config file: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.chart_width == 0 || self.chart_height == 0 {
            return Err(format!(
                "Invalid chart size {}x{}, both dimensions must be positive",
                self.chart_width, self.chart_height
            ));
        }
        Ok(())
    }

    /// Derive the config path from an input log path.
    ///
    /// Replaces the log filename with [`DEFAULT_CONFIG_FILE`] in the same directory.
    pub fn config_path_from_input(input_path: &Path) -> PathBuf {
        input_path.parent().unwrap_or(Path::new(".")).join(DEFAULT_CONFIG_FILE)
    }
}
