//! Config-driven suite execution
//!
//! [`SuiteRunner`] walks every `[[components]]` and `[[pages]]` entry of a
//! [`Config`] through the [`PerfPipeline`] and collects a [`RunReport`].
//!
//! ```text
//! components ──► PageSource::open ──► measure_component_performance ──► close
//! pages      ──► run_lighthouse ──► compare_lighthouse_report
//! ```
//!
//! A target that errors is recorded and the run moves on to the next one.
//! Budget and audit failures never abort the run.
//!
//! # Example
//!
//! ```no_run
//! use perf_baseline::{browser::BrowserSession, Config, PerfPipeline};
//! use perf_baseline::runner::SuiteRunner;
//! use std::sync::Arc;
//!
//! # async fn example() -> perf_baseline::Result<()> {
//! let config = Config::from_file("perf.toml")?;
//! let session = Arc::new(BrowserSession::launch(&config, false).await?);
//! let runner = SuiteRunner::new(PerfPipeline::from_config(config)).with_page_source(session);
//! let report = runner.run().await?;
//! println!("{} failures", report.failures.len());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::browser::BrowserSession;
use crate::config::{ComponentTarget, PageTarget};
use crate::error::{PerfError, Result};
use crate::metrics::PageProbe;
use crate::pipeline::{AuditOutcome, ComponentReport, PageAuditSummary, PerfPipeline};

/// Opens loaded pages for component measurements
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn open(&self, url: &str) -> Result<Box<dyn PageProbe>>;
}

#[async_trait]
impl PageSource for BrowserSession {
    async fn open(&self, url: &str) -> Result<Box<dyn PageProbe>> {
        Ok(Box::new(self.open_page(url).await?))
    }
}

/// Audit and comparison of one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRun {
    pub outcome: AuditOutcome,
    /// `None` when the page has no baseline
    pub summary: Option<PageAuditSummary>,
}

/// A target that could not be measured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetError {
    pub target: String,
    pub message: String,
}

/// Results from a complete suite run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub suite_name: String,
    pub base_url: String,
    /// RFC 3339 timestamp of the start of the run
    pub started_at: String,
    pub total_duration_ms: u64,
    pub components: Vec<ComponentReport>,
    pub pages: Vec<PageRun>,
    /// `<report key>: <message>` for every exceeded budget or low audit score
    pub failures: Vec<String>,
    pub errors: Vec<TargetError>,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty() && self.errors.is_empty()
    }
}

pub struct SuiteRunner {
    pipeline: PerfPipeline,
    pages: Option<Arc<dyn PageSource>>,
}

impl SuiteRunner {
    /// Runner without a page source; only suites with no components can run
    pub fn new(pipeline: PerfPipeline) -> Self {
        Self {
            pipeline,
            pages: None,
        }
    }

    pub fn with_page_source(mut self, source: Arc<dyn PageSource>) -> Self {
        self.pages = Some(source);
        self
    }

    /// Measure every configured component, then audit every configured page
    ///
    /// # Errors
    ///
    /// Fails only when components are configured but no page source was
    /// given. Per-target errors end up in [`RunReport::errors`].
    #[instrument(skip(self), fields(suite = %self.pipeline.config().suite.name))]
    pub async fn run(&self) -> Result<RunReport> {
        let config = self.pipeline.config();
        if !config.components.is_empty() && self.pages.is_none() {
            return Err(PerfError::Config(
                "components are configured but no browser is available".to_string(),
            ));
        }

        let start_time = Instant::now();
        let started_at = chrono::Utc::now().to_rfc3339();
        info!(
            "Starting suite '{}' with {} components and {} pages",
            config.suite.name,
            config.components.len(),
            config.pages.len()
        );

        let mut report = RunReport {
            suite_name: config.suite.name.clone(),
            base_url: config.suite.base_url.clone(),
            started_at,
            total_duration_ms: 0,
            components: Vec::new(),
            pages: Vec::new(),
            failures: Vec::new(),
            errors: Vec::new(),
        };

        if let Some(source) = &self.pages {
            for target in &config.components {
                match self.run_component(source.as_ref(), target).await {
                    Ok(component) => {
                        report.failures.extend(
                            component
                                .failures()
                                .map(|(metric, message)| format!("{}: {}", metric, message)),
                        );
                        report.components.push(component);
                    }
                    Err(e) => {
                        error!("Component {} failed: {}", target.key(), e);
                        report.errors.push(TargetError {
                            target: target.key(),
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        for target in &config.pages {
            match self.run_page(target).await {
                Ok(page) => {
                    if let Some(summary) = &page.summary {
                        report.failures.extend(
                            summary
                                .results
                                .iter()
                                .filter(|r| r.result.outcome.is_fail())
                                .map(|r| format!("{}: {}", r.key, r.result.message)),
                        );
                    }
                    report.pages.push(page);
                }
                Err(e) => {
                    error!("Page {} failed: {}", target.key, e);
                    report.errors.push(TargetError {
                        target: target.key.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        report.total_duration_ms = start_time.elapsed().as_millis() as u64;
        if report.passed() {
            info!(
                "Suite '{}' completed in {}ms",
                report.suite_name, report.total_duration_ms
            );
        } else {
            warn!(
                "Suite '{}' completed with {} failures and {} errors",
                report.suite_name,
                report.failures.len(),
                report.errors.len()
            );
        }

        Ok(report)
    }

    #[instrument(skip(self, source), fields(component = %target.key()))]
    async fn run_component(
        &self,
        source: &dyn PageSource,
        target: &ComponentTarget,
    ) -> Result<ComponentReport> {
        let url = self.pipeline.config().url_for(&target.url);
        let probe = source.open(&url).await?;

        let measured = self
            .pipeline
            .measure_component_performance(probe.as_ref(), &target.plugin, &target.test_id)
            .await;

        if let Err(e) = probe.close().await {
            warn!("Failed to close page {}: {}", url, e);
        }
        measured
    }

    #[instrument(skip(self), fields(page = %target.key))]
    async fn run_page(&self, target: &PageTarget) -> Result<PageRun> {
        let url = self.pipeline.config().url_for(&target.url);
        let (outcome, summary) = self.pipeline.audit_page(&target.key, &url).await?;
        Ok(PageRun { outcome, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{ComparisonResult, Outcome};
    use crate::metrics::MetricKind;

    fn empty_report() -> RunReport {
        RunReport {
            suite_name: "Discover".to_string(),
            base_url: "http://localhost:5601".to_string(),
            started_at: "2024-01-01T00:00:00Z".to_string(),
            total_duration_ms: 0,
            components: Vec::new(),
            pages: Vec::new(),
            failures: Vec::new(),
            errors: Vec::new(),
        }
    }

    #[test]
    fn test_empty_report_passes() {
        assert!(empty_report().passed());
    }

    #[test]
    fn test_failures_or_errors_fail_the_report() {
        let mut report = empty_report();
        report.failures.push("discover_performance: ❌ 20 (Expected: 30)".to_string());
        assert!(!report.passed());

        let mut report = empty_report();
        report.errors.push(TargetError {
            target: "discover".to_string(),
            message: "Audit of 'discover' failed: exit status 1".to_string(),
        });
        assert!(!report.passed());
    }

    #[test]
    fn test_report_serializes_component_results() {
        let mut report = empty_report();
        report.components.push(ComponentReport {
            key: "discover_sidebarPanel".to_string(),
            baseline_found: true,
            results: vec![ComparisonResult {
                kind: MetricKind::RenderTime,
                actual: 734.56,
                expected: 500.0,
                outcome: Outcome::Fail,
                message: "exceeded: 734.56ms > 500ms".to_string(),
            }],
        });

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["components"][0]["key"], "discover_sidebarPanel");
        assert_eq!(
            json["components"][0]["results"][0]["message"],
            "exceeded: 734.56ms > 500ms"
        );
    }
}
