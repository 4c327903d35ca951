//! Sinks for budget violations
//!
//! Render time, layout shift and memory failures are reported here as
//! `(metric, value)` pairs, e.g. `("discover_sidebarPanel_render_time",
//! "exceeded: 734.56ms > 500ms")`. Passing budgets are not reported.

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

use crate::error::{PerfError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    /// `<plugin>_<test_id>_<metric>`
    pub metric: String,
    pub value: String,
}

pub trait PerformanceLog: Send + Sync {
    fn log_performance(&self, record: &PerformanceRecord) -> Result<()>;
}

/// Emits each record as a structured warning
#[derive(Debug, Clone, Default)]
pub struct TracingPerformanceLog;

impl PerformanceLog for TracingPerformanceLog {
    fn log_performance(&self, record: &PerformanceRecord) -> Result<()> {
        warn!(metric = %record.metric, value = %record.value, "performance budget exceeded");
        Ok(())
    }
}

/// Appends each record as one JSON object per line, and logs it
#[derive(Debug, Clone)]
pub struct JsonLinesPerformanceLog {
    path: PathBuf,
}

impl JsonLinesPerformanceLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PerformanceLog for JsonLinesPerformanceLog {
    fn log_performance(&self, record: &PerformanceRecord) -> Result<()> {
        TracingPerformanceLog.log_performance(record)?;

        let mut line = serde_json::to_string(record).map_err(|e| PerfError::parse(&self.path, e))?;
        line.push('\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| PerfError::io(parent, e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| PerfError::io(&self.path, e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| PerfError::io(&self.path, e))?;
        Ok(())
    }
}

/// Keeps records in memory, for embedding callers and tests
#[derive(Debug, Default)]
pub struct MemoryPerformanceLog {
    records: Mutex<Vec<PerformanceRecord>>,
}

impl MemoryPerformanceLog {
    pub fn records(&self) -> Vec<PerformanceRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl PerformanceLog for MemoryPerformanceLog {
    fn log_performance(&self, record: &PerformanceRecord) -> Result<()> {
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
        Ok(())
    }
}
