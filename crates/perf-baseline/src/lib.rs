//! Performance baselines for browser end-to-end suites
//!
//! This crate measures UI components and audits whole pages, compares the
//! results with stored baselines, and reports regressions.
//!
//! # Features
//!
//! - **Component budgets**: render time, cumulative layout shift and JS heap
//!   usage of a `data-test-subj` element, checked against
//!   `performance_baselines.json`; violations go to a [`reporter::PerformanceLog`]
//! - **Page audits**: Lighthouse performance and accessibility scores with a
//!   fixed desktop profile, checked against `lighthouse_baselines.json` and
//!   merged into `lighthouse_metrics.json`
//! - **Suite runs**: every configured component and page in one pass, with
//!   console or JSON summaries
//!
//! # Example
//!
//! ```no_run
//! use perf_baseline::{browser::BrowserSession, Config, PerfPipeline};
//!
//! # async fn example() -> perf_baseline::Result<()> {
//! let config = Config::from_file("perf.toml")?;
//! let session = BrowserSession::launch(&config, false).await?;
//! let pipeline = PerfPipeline::from_config(config);
//!
//! let probe = session.open_page("http://localhost:5601/app/discover").await?;
//! let report = pipeline
//!     .measure_component_performance(&probe, "discover", "sidebarPanel")
//!     .await?;
//! for (metric, message) in report.failures() {
//!     println!("{}: {}", metric, message);
//! }
//!
//! pipeline.audit_page("discover", "http://localhost:5601/app/discover").await?;
//! session.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! ```toml
//! [suite]
//! name = "Discover performance"
//! base_url = "http://localhost:5601"
//!
//! [paths]
//! performance_baselines = "cypress/utils/performance_baselines.json"
//! lighthouse_baselines = "cypress/utils/lighthouse_baselines.json"
//!
//! [[components]]
//! plugin = "discover"
//! test_id = "sidebarPanel"
//! url = "/app/discover"
//!
//! [[pages]]
//! key = "discover"
//! url = "/app/discover"
//! ```

pub mod baseline;
pub mod browser;
pub mod compare;
pub mod config;
pub mod error;
pub mod lighthouse;
pub mod metrics;
pub mod pipeline;
pub mod reporter;
pub mod runner;

pub use baseline::{BaselineEntry, BaselineSet};
pub use compare::{compare, ComparisonResult, Outcome};
pub use config::Config;
pub use error::{PerfError, Result};
pub use metrics::{MetricKind, MetricSample, PageProbe};
pub use pipeline::{ComponentReport, PageAuditSummary, PerfPipeline};
pub use reporter::{OutputFormat, Reporter};
pub use runner::{RunReport, SuiteRunner};
