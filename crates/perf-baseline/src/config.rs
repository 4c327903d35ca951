//! Configuration parsing for performance runs
//!
//! A run is described by a TOML file naming the application under test, the
//! baseline and report files, the timeouts handed to the browser, the audit
//! thresholds, and the components and pages to measure.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PerfError, Result};

/// Main configuration structure loaded from TOML files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application under test and browser viewport
    pub suite: SuiteConfig,
    /// Baseline inputs and report outputs
    #[serde(default)]
    pub paths: PathsConfig,
    /// Timeouts for visibility waits, audits and the layout-shift window
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    /// Audit tool settings
    #[serde(default)]
    pub audit: AuditConfig,
    /// Components measured by `run`
    #[serde(default)]
    pub components: Vec<ComponentTarget>,
    /// Pages audited by `run`
    #[serde(default)]
    pub pages: Vec<PageTarget>,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the TOML is malformed
    ///
    /// # Example
    ///
    /// ```no_run
    /// use perf_baseline::config::Config;
    ///
    /// # fn example() -> perf_baseline::Result<()> {
    /// let config = Config::from_file("perf.toml")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| PerfError::io(path, e))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    ///
    /// ```
    /// use perf_baseline::config::Config;
    ///
    /// let config = Config::from_str(r#"
    ///     [suite]
    ///     name = "Discover"
    ///     base_url = "http://localhost:5601"
    /// "#).unwrap();
    /// assert_eq!(config.timeouts.layout_shift_window.as_millis(), 2000);
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| PerfError::Config(e.to_string()))
    }

    /// Resolve a path relative to the base URL of the suite
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") || path.starts_with("data:")
        {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.suite.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Location of the audit report written for `page_key`
    pub fn report_path(&self, page_key: &str) -> PathBuf {
        self.paths
            .report_dir
            .join(format!("lighthouse_report_{}.json", page_key))
    }
}

/// Application under test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Name shown in run summaries
    pub name: String,
    /// Base URL that relative component and page URLs are joined to
    pub base_url: String,
    /// Viewport width used by the browser and the audit emulation
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    /// Viewport height used by the browser and the audit emulation
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
}

fn default_viewport_width() -> u32 {
    2000
}

fn default_viewport_height() -> u32 {
    1320
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_performance_baselines")]
    pub performance_baselines: PathBuf,
    #[serde(default = "default_lighthouse_baselines")]
    pub lighthouse_baselines: PathBuf,
    /// Directory holding `lighthouse_report_<page>.json` artifacts
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,
    #[serde(default = "default_metrics_file")]
    pub metrics_file: PathBuf,
    /// Optional JSON-lines file receiving budget violations
    #[serde(default)]
    pub performance_log: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            performance_baselines: default_performance_baselines(),
            lighthouse_baselines: default_lighthouse_baselines(),
            report_dir: default_report_dir(),
            metrics_file: default_metrics_file(),
            performance_log: None,
        }
    }
}

fn default_performance_baselines() -> PathBuf {
    PathBuf::from("cypress/utils/performance_baselines.json")
}

fn default_lighthouse_baselines() -> PathBuf {
    PathBuf::from("cypress/utils/lighthouse_baselines.json")
}

fn default_report_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_metrics_file() -> PathBuf {
    PathBuf::from("lighthouse_metrics.json")
}

/// Timeouts, all expressed in milliseconds in the TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    /// How long to wait for a component to become visible
    #[serde(default = "default_visibility", with = "duration_ms")]
    pub visibility: Duration,
    /// How long a single page audit may take
    #[serde(default = "default_audit", with = "duration_ms")]
    pub audit: Duration,
    /// Observation window for cumulative layout shift
    #[serde(default = "default_layout_shift_window", with = "duration_ms")]
    pub layout_shift_window: Duration,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            visibility: default_visibility(),
            audit: default_audit(),
            layout_shift_window: default_layout_shift_window(),
        }
    }
}

fn default_visibility() -> Duration {
    Duration::from_millis(180_000)
}

fn default_audit() -> Duration {
    Duration::from_millis(240_000)
}

fn default_layout_shift_window() -> Duration {
    Duration::from_millis(2_000)
}

/// Audit tool settings and category score minimums
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Executable used to run the audit
    #[serde(default = "default_audit_binary")]
    pub binary: String,
    /// Minimum performance score (0-100)
    #[serde(default = "default_performance_threshold")]
    pub performance: u32,
    /// Minimum accessibility score (0-100)
    #[serde(default = "default_accessibility_threshold")]
    pub accessibility: u32,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            binary: default_audit_binary(),
            performance: default_performance_threshold(),
            accessibility: default_accessibility_threshold(),
        }
    }
}

fn default_audit_binary() -> String {
    "lighthouse".to_string()
}

fn default_performance_threshold() -> u32 {
    30
}

fn default_accessibility_threshold() -> u32 {
    90
}

/// A component whose render time, layout shift and memory are measured
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentTarget {
    /// Plugin prefix of the baseline key
    pub plugin: String,
    /// `data-test-subj` of the element to wait for
    pub test_id: String,
    /// Page to load before measuring
    pub url: String,
}

impl ComponentTarget {
    /// Baseline key, `<plugin>_<test_id>`
    pub fn key(&self) -> String {
        format!("{}_{}", self.plugin, self.test_id)
    }
}

/// A page audited with the audit tool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageTarget {
    /// Page key used in baseline and report file names
    pub key: String,
    pub url: String,
}

/// Serde module for serializing/deserializing Duration as milliseconds
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
