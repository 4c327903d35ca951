//! Page audits with Lighthouse
//!
//! An audit runs against a URL with a fixed desktop profile and writes its
//! result to `lighthouse_report_<pageKey>.json`. The report is later read
//! back by the comparison step, which only looks at category scores.
//!
//! # Report shape
//!
//! Reports are accepted either wrapped, as written by test-runner plugins:
//!
//! ```json
//! { "lhr": { "categories": { "performance": { "score": 0.42 } } } }
//! ```
//!
//! or as the bare result object the Lighthouse CLI writes. A category with a
//! `null` score counts as 0.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::error::{PerfError, Result};
use crate::metrics::MetricKind;

/// Audit categories compared against baselines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditCategory {
    Performance,
    Accessibility,
}

impl AuditCategory {
    pub const ALL: [AuditCategory; 2] = [AuditCategory::Performance, AuditCategory::Accessibility];

    /// Category id as used by Lighthouse and in baseline files
    pub fn id(&self) -> &'static str {
        match self {
            AuditCategory::Performance => "performance",
            AuditCategory::Accessibility => "accessibility",
        }
    }

    pub fn metric_kind(&self) -> MetricKind {
        match self {
            AuditCategory::Performance => MetricKind::PerformanceScore,
            AuditCategory::Accessibility => MetricKind::AccessibilityScore,
        }
    }
}

impl fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Minimum category scores (0-100) enforced during the audit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditThresholds {
    pub performance: u32,
    pub accessibility: u32,
}

impl AuditThresholds {
    pub fn minimum(&self, category: AuditCategory) -> u32 {
        match category {
            AuditCategory::Performance => self.performance,
            AuditCategory::Accessibility => self.accessibility,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormFactor {
    Desktop,
    Mobile,
}

/// Screen emulation passed to the audit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenEmulation {
    pub mobile: bool,
    pub disabled: bool,
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
}

/// Everything needed to audit one page
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRequest {
    pub page_key: String,
    pub url: String,
    pub output_path: PathBuf,
    pub thresholds: AuditThresholds,
    pub form_factor: FormFactor,
    pub screen: ScreenEmulation,
}

impl AuditRequest {
    /// Desktop audit at the configured viewport, scale ratio 1
    pub fn desktop(config: &Config, page_key: &str, url: &str) -> Self {
        Self {
            page_key: page_key.to_string(),
            url: config.url_for(url),
            output_path: config.report_path(page_key),
            thresholds: AuditThresholds {
                performance: config.audit.performance,
                accessibility: config.audit.accessibility,
            },
            form_factor: FormFactor::Desktop,
            screen: ScreenEmulation {
                mobile: false,
                disabled: false,
                width: config.suite.viewport_width,
                height: config.suite.viewport_height,
                device_scale_factor: 1.0,
            },
        }
    }
}

/// Runs an audit and leaves the report at `request.output_path`
#[async_trait]
pub trait AuditRunner: Send + Sync {
    async fn run(&self, request: &AuditRequest) -> Result<()>;
}

const CHROME_FLAGS: &str = "--headless=new --no-sandbox";

/// [`AuditRunner`] that shells out to the Lighthouse CLI
#[derive(Debug, Clone)]
pub struct LighthouseCli {
    program: String,
    prefix_args: Vec<String>,
}

impl LighthouseCli {
    /// `binary` may carry leading arguments, e.g. `"npx lighthouse"`
    pub fn new(binary: &str) -> Self {
        let mut parts = binary.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_else(|| "lighthouse".to_string());
        Self {
            program,
            prefix_args: parts.collect(),
        }
    }

    /// Command-line arguments for a request, after any prefix arguments
    pub fn args(&self, request: &AuditRequest) -> Vec<String> {
        let categories = AuditCategory::ALL.map(|c| c.id()).join(",");
        let form_factor = match request.form_factor {
            FormFactor::Desktop => "desktop",
            FormFactor::Mobile => "mobile",
        };

        let mut args = self.prefix_args.clone();
        args.extend([
            request.url.clone(),
            "--output=json".to_string(),
            format!("--output-path={}", request.output_path.display()),
            format!("--only-categories={}", categories),
            format!("--form-factor={}", form_factor),
            format!("--screenEmulation.mobile={}", request.screen.mobile),
            format!("--screenEmulation.disabled={}", request.screen.disabled),
            format!("--screenEmulation.width={}", request.screen.width),
            format!("--screenEmulation.height={}", request.screen.height),
            format!(
                "--screenEmulation.deviceScaleFactor={}",
                request.screen.device_scale_factor
            ),
            format!("--chrome-flags={}", CHROME_FLAGS),
            "--quiet".to_string(),
        ]);
        args
    }
}

impl Default for LighthouseCli {
    fn default() -> Self {
        Self::new("lighthouse")
    }
}

#[async_trait]
impl AuditRunner for LighthouseCli {
    #[instrument(skip(self, request), fields(page = %request.page_key))]
    async fn run(&self, request: &AuditRequest) -> Result<()> {
        if let Some(parent) = request.output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PerfError::io(parent, e))?;
        }

        info!("Auditing {} ({})", request.page_key, request.url);
        let output = Command::new(&self.program)
            .args(self.args(request))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| PerfError::AuditFailed {
                page_key: request.page_key.clone(),
                reason: format!("could not start {}: {}", self.program, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            return Err(PerfError::AuditFailed {
                page_key: request.page_key.clone(),
                reason: format!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
                ),
            });
        }

        debug!("Report written to {}", request.output_path.display());
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
struct CategoryResult {
    #[serde(default)]
    score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
struct ResultBody {
    #[serde(default)]
    categories: BTreeMap<String, CategoryResult>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReportFile {
    Wrapped { lhr: ResultBody },
    Bare(ResultBody),
}

/// Category scores from an audit report
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LighthouseReport {
    categories: BTreeMap<String, CategoryResult>,
}

impl LighthouseReport {
    /// # Errors
    ///
    /// - [`PerfError::NotFound`] if the report does not exist
    /// - [`PerfError::Parse`] if it is not a JSON object
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| PerfError::io(path, e))?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self> {
        // Reject non-objects before the untagged fallback gets a chance to accept them
        let value: serde_json::Value =
            serde_json::from_str(content).map_err(|e| PerfError::parse(path, e))?;
        if !value.is_object() {
            return Err(PerfError::parse(
                path,
                serde::de::Error::custom("audit report must be a JSON object"),
            ));
        }

        let body = match serde_json::from_value(value).map_err(|e| PerfError::parse(path, e))? {
            ReportFile::Wrapped { lhr } => lhr,
            ReportFile::Bare(body) => body,
        };
        Ok(Self {
            categories: body.categories,
        })
    }

    /// Raw `[0, 1]` score of a category, `None` if the report lacks it
    pub fn score(&self, category: AuditCategory) -> Option<f64> {
        self.categories
            .get(category.id())
            .map(|c| c.score.unwrap_or(0.0))
    }

    /// Categories scoring below the audit thresholds, with their 0-100 score
    pub fn below_thresholds(&self, thresholds: &AuditThresholds) -> Vec<(AuditCategory, f64)> {
        AuditCategory::ALL
            .into_iter()
            .filter_map(|category| {
                let percent = crate::compare::audit_score_percent(self.score(category)?);
                (percent < f64::from(thresholds.minimum(category))).then_some((category, percent))
            })
            .collect()
    }
}
