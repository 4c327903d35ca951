//! The load → collect → compare → report pipeline
//!
//! [`PerfPipeline`] holds the configuration and the injected services, and
//! exposes one method per test-suite command:
//!
//! - [`measure_component_performance`](PerfPipeline::measure_component_performance):
//!   render time, layout shift and memory of one component against
//!   `performance_baselines.json`; only failures are logged
//! - [`run_lighthouse`](PerfPipeline::run_lighthouse): audit one page and
//!   leave `lighthouse_report_<page>.json` behind
//! - [`compare_lighthouse_report`](PerfPipeline::compare_lighthouse_report):
//!   compare that report against `lighthouse_baselines.json` and merge both
//!   passes and failures into `lighthouse_metrics.json`
//!
//! Missing baselines and budget failures never produce errors. Unreadable or
//! malformed inputs, browser failures and audit failures do.
//!
//! # Example
//!
//! ```no_run
//! use perf_baseline::config::Config;
//! use perf_baseline::pipeline::PerfPipeline;
//!
//! # async fn example() -> perf_baseline::Result<()> {
//! let pipeline = PerfPipeline::from_config(Config::from_file("perf.toml")?);
//! pipeline.run_lighthouse("discover", "/app/discover").await?;
//! if let Some(summary) = pipeline.compare_lighthouse_report("discover")? {
//!     for entry in &summary.results {
//!         println!("{}: {}", entry.key, entry.result.message);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::baseline::{BaselineEntry, BaselineSet};
use crate::compare::{compare, ComparisonResult, Outcome};
use crate::config::Config;
use crate::error::{PerfError, Result};
use crate::lighthouse::{AuditCategory, AuditRequest, AuditRunner, LighthouseCli, LighthouseReport};
use crate::metrics::{MetricCollector, MetricSample, PageProbe};
use crate::reporter::{
    merge_into_file, JsonLinesPerformanceLog, PerformanceLog, PerformanceRecord,
    TracingPerformanceLog,
};

/// Budget results for one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentReport {
    /// `<plugin>_<test_id>`
    pub key: String,
    /// False when the component had no baseline and nothing was measured
    pub baseline_found: bool,
    pub results: Vec<ComparisonResult>,
}

impl ComponentReport {
    fn without_baseline(key: String) -> Self {
        Self {
            key,
            baseline_found: false,
            results: Vec::new(),
        }
    }

    /// `(<key>_<metric>, message)` for every exceeded budget
    pub fn failures(&self) -> impl Iterator<Item = (String, &str)> + '_ {
        self.results
            .iter()
            .filter(|r| r.outcome.is_fail())
            .map(|r| (format!("{}_{}", self.key, r.kind.key_suffix()), r.message.as_str()))
    }
}

/// One audit category compared against its baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditCategoryResult {
    /// `<pageKey>_<category>`
    pub key: String,
    pub category: AuditCategory,
    pub result: ComparisonResult,
}

/// Everything merged into the metrics file for one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageAuditSummary {
    pub page_key: String,
    pub results: Vec<AuditCategoryResult>,
}

impl PageAuditSummary {
    /// Report entries, `<pageKey>_<category>` → `"<icon> <actual> (Expected: <expected>)"`
    pub fn entries(&self) -> impl Iterator<Item = (String, String)> + '_ {
        self.results
            .iter()
            .map(|r| (r.key.clone(), r.result.message.clone()))
    }

    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| !r.result.outcome.is_fail())
    }
}

/// A finished audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditOutcome {
    pub page_key: String,
    pub report_path: PathBuf,
    /// Categories under the audit's own thresholds, with their 0-100 score
    pub below_threshold: Vec<(AuditCategory, f64)>,
}

/// Performance checks bound to a configuration and its services
pub struct PerfPipeline {
    config: Config,
    auditor: Arc<dyn AuditRunner>,
    perf_log: Arc<dyn PerformanceLog>,
}

impl PerfPipeline {
    pub fn new(
        config: Config,
        auditor: Arc<dyn AuditRunner>,
        perf_log: Arc<dyn PerformanceLog>,
    ) -> Self {
        Self {
            config,
            auditor,
            perf_log,
        }
    }

    /// Lighthouse CLI for audits; violations go to the configured
    /// performance log file, or to tracing alone
    pub fn from_config(config: Config) -> Self {
        let auditor = Arc::new(LighthouseCli::new(&config.audit.binary));
        let perf_log: Arc<dyn PerformanceLog> = match &config.paths.performance_log {
            Some(path) => Arc::new(JsonLinesPerformanceLog::new(path)),
            None => Arc::new(TracingPerformanceLog),
        };
        Self::new(config, auditor, perf_log)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Measure a component and log every exceeded budget
    ///
    /// The page behind `probe` must already be loaded. Components without a
    /// baseline are not measured.
    ///
    /// # Errors
    ///
    /// Fails if the baseline file is missing or malformed, if the component
    /// never becomes visible, or if the browser cannot be queried.
    #[instrument(skip(self, probe))]
    pub async fn measure_component_performance(
        &self,
        probe: &dyn PageProbe,
        plugin: &str,
        test_id: &str,
    ) -> Result<ComponentReport> {
        let baselines = BaselineSet::load(&self.config.paths.performance_baselines)?;
        let key = format!("{}_{}", plugin, test_id);

        let Some(baseline) = baselines.get(&key) else {
            info!("No baseline found for component: {}", key);
            return Ok(ComponentReport::without_baseline(key));
        };

        let collector = MetricCollector::new(probe);
        let timeouts = &self.config.timeouts;
        let mut results = Vec::new();

        let render_time = collector.render_time(test_id, timeouts.visibility).await?;
        self.check_budget(&key, &render_time, baseline, &mut results)?;

        let layout_shift = collector.layout_shift(timeouts.layout_shift_window).await?;
        self.check_budget(&key, &layout_shift, baseline, &mut results)?;

        let memory = collector.memory().await?;
        self.check_budget(&key, &memory, baseline, &mut results)?;

        Ok(ComponentReport {
            key,
            baseline_found: true,
            results,
        })
    }

    fn check_budget(
        &self,
        key: &str,
        sample: &MetricSample,
        baseline: &BaselineEntry,
        results: &mut Vec<ComparisonResult>,
    ) -> Result<()> {
        let Some(result) = compare(sample, baseline) else {
            debug!("{} has no {} baseline", key, sample.kind);
            return Ok(());
        };

        if result.outcome.is_fail() {
            self.perf_log.log_performance(&PerformanceRecord {
                metric: format!("{}_{}", key, sample.kind.key_suffix()),
                value: result.message.clone(),
            })?;
        } else {
            debug!("{} {}: {}", key, sample.kind, result.message);
        }

        results.push(result);
        Ok(())
    }

    /// Audit a page with the fixed desktop profile
    ///
    /// The audit runs even when the page has no baseline; that case only
    /// warns. Categories under the audit thresholds are logged, not raised.
    ///
    /// # Errors
    ///
    /// Fails if the audit cannot run, exceeds the audit timeout, or leaves
    /// no readable report.
    #[instrument(skip(self))]
    pub async fn run_lighthouse(&self, page_key: &str, url: &str) -> Result<AuditOutcome> {
        let baselines = BaselineSet::load_or_empty(&self.config.paths.lighthouse_baselines)?;
        if baselines.get(page_key).is_none() {
            warn!("⚠️ No Lighthouse baseline found for: {}", page_key);
        }

        let request = AuditRequest::desktop(&self.config, page_key, url);
        let audit_timeout = self.config.timeouts.audit;
        timeout(audit_timeout, self.auditor.run(&request))
            .await
            .map_err(|_| PerfError::AuditTimeout {
                page_key: page_key.to_string(),
                timeout: audit_timeout,
            })??;

        let report = LighthouseReport::load(&request.output_path)?;
        let below_threshold = report.below_thresholds(&request.thresholds);
        for (category, score) in &below_threshold {
            warn!(
                "{} {} score {} is below the audit threshold {}",
                page_key,
                category,
                score,
                request.thresholds.minimum(*category)
            );
        }

        Ok(AuditOutcome {
            page_key: page_key.to_string(),
            report_path: request.output_path,
            below_threshold,
        })
    }

    /// Compare a page's audit report with its baseline and merge the result
    /// into the metrics file
    ///
    /// Returns `None`, without touching the metrics file, when the page has
    /// no baseline. The file is also left alone when no category could be
    /// compared.
    ///
    /// # Errors
    ///
    /// Fails if the report is missing or malformed, or the metrics file
    /// cannot be read or written.
    #[instrument(skip(self))]
    pub fn compare_lighthouse_report(&self, page_key: &str) -> Result<Option<PageAuditSummary>> {
        let baselines = BaselineSet::load_or_empty(&self.config.paths.lighthouse_baselines)?;
        let Some(baseline) = baselines.get(page_key) else {
            warn!("⚠️ No Lighthouse baseline found for: {}", page_key);
            return Ok(None);
        };

        let report = LighthouseReport::load(self.config.report_path(page_key))?;

        let mut results = Vec::new();
        for category in AuditCategory::ALL {
            let kind = category.metric_kind();
            if baseline.expected(kind).is_none() {
                continue;
            }
            let Some(raw_score) = report.score(category) else {
                warn!("Audit report for {} has no {} category", page_key, category);
                continue;
            };
            let Some(result) = compare(&MetricSample::new(kind, raw_score), baseline) else {
                continue;
            };

            let key = format!("{}_{}", page_key, category);
            match result.outcome {
                Outcome::Pass => info!("{}: {}", key, result.message),
                Outcome::Fail => warn!("{}: {}", key, result.message),
            }
            results.push(AuditCategoryResult {
                key,
                category,
                result,
            });
        }

        let summary = PageAuditSummary {
            page_key: page_key.to_string(),
            results,
        };
        if summary.results.is_empty() {
            debug!("No audit categories compared for {}", page_key);
            return Ok(Some(summary));
        }
        merge_into_file(&self.config.paths.metrics_file, summary.entries())?;
        Ok(Some(summary))
    }

    /// [`run_lighthouse`](Self::run_lighthouse) followed by
    /// [`compare_lighthouse_report`](Self::compare_lighthouse_report)
    pub async fn audit_page(
        &self,
        page_key: &str,
        url: &str,
    ) -> Result<(AuditOutcome, Option<PageAuditSummary>)> {
        let outcome = self.run_lighthouse(page_key, url).await?;
        let summary = self.compare_lighthouse_report(page_key)?;
        Ok((outcome, summary))
    }
}
