//! Scripted stand-ins for the browser and the audit tool

#![allow(dead_code)]

use async_trait::async_trait;
use perf_baseline::config::Config;
use perf_baseline::lighthouse::{AuditRequest, AuditRunner};
use perf_baseline::metrics::{LayoutShiftEntry, LayoutShiftObserver, PageProbe};
use perf_baseline::reporter::MemoryPerformanceLog;
use perf_baseline::runner::PageSource;
use perf_baseline::{PerfError, PerfPipeline, Result};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Probe with a scripted page clock, layout shifts and heap size
pub struct ScriptedProbe {
    clock: Mutex<VecDeque<f64>>,
    shifts: Vec<LayoutShiftEntry>,
    heap_bytes: u64,
    visible: bool,
    pub disconnected: Arc<AtomicBool>,
    pub closed: AtomicBool,
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self {
            clock: Mutex::new(VecDeque::new()),
            shifts: Vec::new(),
            heap_bytes: 0,
            visible: true,
            disconnected: Arc::new(AtomicBool::new(false)),
            closed: AtomicBool::new(false),
        }
    }

    /// Successive `performance.now()` readings
    pub fn with_clock(self, readings: &[f64]) -> Self {
        *self.clock.lock().unwrap() = readings.iter().copied().collect();
        self
    }

    pub fn with_shifts(mut self, shifts: &[(f64, bool)]) -> Self {
        self.shifts = shifts
            .iter()
            .map(|&(value, had_recent_input)| LayoutShiftEntry {
                value,
                had_recent_input,
            })
            .collect();
        self
    }

    pub fn with_heap_mb(mut self, megabytes: u64) -> Self {
        self.heap_bytes = megabytes * 1024 * 1024;
        self
    }

    pub fn never_visible(mut self) -> Self {
        self.visible = false;
        self
    }
}

struct ScriptedObserver {
    entries: Vec<LayoutShiftEntry>,
    disconnected: Arc<AtomicBool>,
}

#[async_trait]
impl LayoutShiftObserver for ScriptedObserver {
    async fn take_entries(&mut self) -> Result<Vec<LayoutShiftEntry>> {
        Ok(std::mem::take(&mut self.entries))
    }

    async fn disconnect(self: Box<Self>) -> Result<()> {
        self.disconnected.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl PageProbe for ScriptedProbe {
    async fn now_ms(&self) -> Result<f64> {
        Ok(self.clock.lock().unwrap().pop_front().unwrap_or(0.0))
    }

    async fn wait_until_visible(&self, test_id: &str, timeout: Duration) -> Result<()> {
        if self.visible {
            Ok(())
        } else {
            Err(PerfError::VisibilityTimeout {
                test_id: test_id.to_string(),
                timeout,
            })
        }
    }

    async fn observe_layout_shift(&self) -> Result<Box<dyn LayoutShiftObserver>> {
        Ok(Box::new(ScriptedObserver {
            entries: self.shifts.clone(),
            disconnected: Arc::clone(&self.disconnected),
        }))
    }

    async fn used_heap_bytes(&self) -> Result<u64> {
        Ok(self.heap_bytes)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out a fresh scripted probe for every page
pub struct ScriptedPages {
    make: Box<dyn Fn() -> ScriptedProbe + Send + Sync>,
    pub opened: Mutex<Vec<String>>,
}

impl ScriptedPages {
    pub fn new(make: impl Fn() -> ScriptedProbe + Send + Sync + 'static) -> Self {
        Self {
            make: Box::new(make),
            opened: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PageSource for ScriptedPages {
    async fn open(&self, url: &str) -> Result<Box<dyn PageProbe>> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(Box::new((self.make)()))
    }
}

/// Audit runner that writes a canned report for each known page
#[derive(Default)]
pub struct FakeAuditor {
    reports: Mutex<HashMap<String, serde_json::Value>>,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<AuditRequest>>,
}

impl FakeAuditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw 0..1 scores, wrapped as `{ "lhr": ... }`
    pub fn with_scores(self, page_key: &str, performance: f64, accessibility: f64) -> Self {
        self.with_report(
            page_key,
            json!({
                "lhr": {
                    "categories": {
                        "performance": { "score": performance },
                        "accessibility": { "score": accessibility }
                    }
                }
            }),
        )
    }

    pub fn with_report(self, page_key: &str, report: serde_json::Value) -> Self {
        self.reports
            .lock()
            .unwrap()
            .insert(page_key.to_string(), report);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl AuditRunner for FakeAuditor {
    async fn run(&self, request: &AuditRequest) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let report = self.reports.lock().unwrap().get(&request.page_key).cloned();
        match report {
            Some(report) => {
                std::fs::write(&request.output_path, report.to_string()).unwrap();
                Ok(())
            }
            None => Err(PerfError::AuditFailed {
                page_key: request.page_key.clone(),
                reason: "no canned report".to_string(),
            }),
        }
    }
}

/// Temporary working directory with a config pointing into it
pub struct Fixture {
    pub dir: TempDir,
    pub config: Config,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_extra_toml("")
    }

    /// Extra TOML appended after the generated sections
    pub fn with_extra_toml(extra: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().display();
        let toml = format!(
            r#"
[suite]
name = "Discover performance"
base_url = "http://localhost:5601"

[paths]
performance_baselines = '{root}/performance_baselines.json'
lighthouse_baselines = '{root}/lighthouse_baselines.json'
report_dir = '{root}'
metrics_file = '{root}/lighthouse_metrics.json'

[timeouts]
visibility = 1000
audit = 5000
layout_shift_window = 0

{extra}
"#
        );
        let config = Config::from_str(&toml).unwrap();
        Self { dir, config }
    }

    pub fn write_performance_baselines(&self, json: &str) {
        std::fs::write(&self.config.paths.performance_baselines, json).unwrap();
    }

    pub fn write_lighthouse_baselines(&self, json: &str) {
        std::fs::write(&self.config.paths.lighthouse_baselines, json).unwrap();
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.config.paths.metrics_file.clone()
    }

    pub fn read_metrics(&self) -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(self.metrics_path()).unwrap()).unwrap()
    }

    pub fn pipeline(&self, auditor: Arc<FakeAuditor>) -> (PerfPipeline, Arc<MemoryPerformanceLog>) {
        let log = Arc::new(MemoryPerformanceLog::default());
        let pipeline = PerfPipeline::new(self.config.clone(), auditor, log.clone());
        (pipeline, log)
    }
}
