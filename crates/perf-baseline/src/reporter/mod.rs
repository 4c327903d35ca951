//! Result reporting
//!
//! Three outputs leave the pipeline:
//!
//! - **Performance log** ([`PerformanceLog`]): one record per exceeded
//!   component budget
//! - **Metrics file** ([`merge_into_file`]): audit results merged into
//!   `lighthouse_metrics.json`
//! - **Run summaries** ([`Reporter`]): a whole [`RunReport`] as console text
//!   or JSON
//!
//! # Example
//!
//! ```no_run
//! use perf_baseline::reporter::{Reporter, OutputFormat};
//! use perf_baseline::runner::RunReport;
//!
//! # fn example(report: RunReport) -> perf_baseline::Result<()> {
//! Reporter::new(OutputFormat::Console).report(&report)?;
//! Reporter::new(OutputFormat::JsonPretty).write_to_file(&report, "perf-report.json")?;
//! # Ok(())
//! # }
//! ```

mod console;
mod json;
pub mod metrics_file;
pub mod perf_log;

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;

use crate::error::{PerfError, Result};
use crate::runner::RunReport;

pub use console::ConsoleReporter;
pub use json::JsonReporter;
pub use metrics_file::{merge_into_file, MetricsReport};
pub use perf_log::{
    JsonLinesPerformanceLog, MemoryPerformanceLog, PerformanceLog, PerformanceRecord,
    TracingPerformanceLog,
};

/// Output format for run summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Json,
    JsonPretty,
    #[default]
    Console,
}

impl FromStr for OutputFormat {
    type Err = PerfError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(OutputFormat::Json),
            "json-pretty" => Ok(OutputFormat::JsonPretty),
            "console" => Ok(OutputFormat::Console),
            other => Err(PerfError::Config(format!("unknown output format '{}'", other))),
        }
    }
}

pub struct Reporter {
    format: OutputFormat,
}

impl Reporter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print the report to stdout
    pub fn report(&self, report: &RunReport) -> Result<()> {
        let output = self.format_report(report)?;
        let mut stdout = io::stdout();
        stdout
            .write_all(output.as_bytes())
            .and_then(|_| stdout.flush())
            .map_err(|e| PerfError::io("<stdout>", e))
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, report: &RunReport, path: P) -> Result<()> {
        let path = path.as_ref();
        let output = self.format_report(report)?;
        fs::write(path, output).map_err(|e| PerfError::io(path, e))
    }

    pub fn format_report(&self, report: &RunReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => JsonReporter::format(report, false),
            OutputFormat::JsonPretty => JsonReporter::format(report, true),
            OutputFormat::Console => ConsoleReporter::format(report),
        }
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(OutputFormat::default())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reporter_json_format() {
        let report = fixtures::run_report();
        let output = Reporter::new(OutputFormat::Json).format_report(&report).unwrap();

        assert!(output.contains("Discover performance"));
        assert!(output.contains("http://localhost:5601"));
        assert!(!output.contains('\n'));
    }

    #[test]
    fn test_reporter_console_format() {
        let report = fixtures::run_report();
        let output = Reporter::new(OutputFormat::Console).format_report(&report).unwrap();

        assert!(output.contains("Discover performance"));
        assert!(output.contains("discover_sidebarPanel"));
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("perf-report.json");

        Reporter::new(OutputFormat::JsonPretty)
            .write_to_file(&fixtures::run_report(), &path)
            .unwrap();

        let written: RunReport = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, fixtures::run_report());
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("json-pretty".parse::<OutputFormat>().unwrap(), OutputFormat::JsonPretty);
        assert_eq!("console".parse::<OutputFormat>().unwrap(), OutputFormat::Console);
        assert!("markdown".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_default_format() {
        let reporter = Reporter::default();
        assert_eq!(reporter.format, OutputFormat::Console);
    }
}
