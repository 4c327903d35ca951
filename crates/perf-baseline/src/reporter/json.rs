//! JSON reporter for run summaries

use crate::error::{PerfError, Result};
use crate::runner::RunReport;

pub struct JsonReporter;

impl JsonReporter {
    /// Serialize the report, pretty-printed when `pretty` is set
    pub fn format(report: &RunReport, pretty: bool) -> Result<String> {
        let output = if pretty {
            serde_json::to_string_pretty(report)
        } else {
            serde_json::to_string(report)
        };
        output.map_err(|e| PerfError::Report(e.to_string()))
    }
}
