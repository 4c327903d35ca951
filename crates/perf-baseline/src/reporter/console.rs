//! Console reporter for run summaries
//!
//! Plain text with boxed header and per-target sections.

use std::fmt::Write;

use crate::error::Result;
use crate::pipeline::ComponentReport;
use crate::runner::{PageRun, RunReport};

pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn format(report: &RunReport) -> Result<String> {
        let mut output = String::new();

        writeln!(output)?;
        writeln!(output, "╔══════════════════════════════════════════════════════════════╗")?;
        writeln!(output, "║                  PERFORMANCE BASELINE RESULTS                ║")?;
        writeln!(output, "╚══════════════════════════════════════════════════════════════╝")?;
        writeln!(output)?;

        writeln!(output, "Suite:     {}", report.suite_name)?;
        writeln!(output, "Base URL:  {}", report.base_url)?;
        writeln!(output, "Started:   {}", report.started_at)?;
        writeln!(output, "Duration:  {}ms", report.total_duration_ms)?;
        writeln!(output)?;

        for component in &report.components {
            Self::format_component(&mut output, component)?;
        }
        for page in &report.pages {
            Self::format_page(&mut output, page)?;
        }

        writeln!(output)?;
        writeln!(output, "────────────────────────────────────────────────────────────────")?;
        let (symbol, status) = if report.passed() {
            ("✓", "PASSED")
        } else {
            ("✗", "FAILED")
        };
        writeln!(output, "Overall Status: {} {}", symbol, status)?;

        if !report.failures.is_empty() {
            writeln!(output)?;
            writeln!(output, "Failures:")?;
            for failure in &report.failures {
                writeln!(output, "  • {}", failure)?;
            }
        }

        if !report.errors.is_empty() {
            writeln!(output)?;
            writeln!(output, "Errors:")?;
            for error in &report.errors {
                writeln!(output, "  • {}: {}", error.target, error.message)?;
            }
        }

        writeln!(output)?;
        Ok(output)
    }

    fn format_component(output: &mut String, component: &ComponentReport) -> Result<()> {
        writeln!(output, "────────────────────────────────────────────────────────────────")?;
        writeln!(output, "Component: {}", component.key)?;
        writeln!(output, "────────────────────────────────────────────────────────────────")?;

        if !component.baseline_found {
            writeln!(output, "  (no baseline, not measured)")?;
        }
        for result in &component.results {
            writeln!(
                output,
                "  {} {:<14} {}",
                result.outcome.icon(),
                result.kind.key_suffix(),
                result.message
            )?;
        }
        writeln!(output)?;
        Ok(())
    }

    fn format_page(output: &mut String, page: &PageRun) -> Result<()> {
        writeln!(output, "────────────────────────────────────────────────────────────────")?;
        writeln!(output, "Page: {}", page.outcome.page_key)?;
        writeln!(output, "────────────────────────────────────────────────────────────────")?;
        writeln!(output, "  Report: {}", page.outcome.report_path.display())?;

        for (category, score) in &page.outcome.below_threshold {
            writeln!(output, "  ⚠ {} scored {} (below audit threshold)", category, score)?;
        }

        match &page.summary {
            Some(summary) => {
                for entry in &summary.results {
                    writeln!(output, "  {:<28} {}", entry.key, entry.result.message)?;
                }
            }
            None => writeln!(output, "  (no baseline, nothing recorded)")?,
        }
        writeln!(output)?;
        Ok(())
    }
}
