//! Baseline files
//!
//! Both baseline files are flat JSON objects. Component baselines are keyed
//! `<plugin>_<test_id>` and carry `render_time`, `layout_shift` and
//! `memory_MB`; page baselines are keyed by page and carry expected
//! `performance` and `accessibility` scores. Every field is optional and a
//! missing field simply disables that comparison.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{PerfError, Result};
use crate::metrics::MetricKind;

/// Expected values for one component or page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaselineEntry {
    /// Render time budget in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_time: Option<f64>,
    /// Cumulative layout shift budget
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_shift: Option<f64>,
    /// JS heap budget in megabytes
    #[serde(
        rename = "memory_MB",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub memory_mb: Option<f64>,
    /// Minimum audit performance score (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<f64>,
    /// Minimum audit accessibility score (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessibility: Option<f64>,
}

impl BaselineEntry {
    /// Expected value for a metric, if this entry defines one
    pub fn expected(&self, kind: MetricKind) -> Option<f64> {
        match kind {
            MetricKind::RenderTime => self.render_time,
            MetricKind::LayoutShift => self.layout_shift,
            MetricKind::MemoryMb => self.memory_mb,
            MetricKind::PerformanceScore => self.performance,
            MetricKind::AccessibilityScore => self.accessibility,
        }
    }
}

/// All baselines from one file, keyed by component or page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaselineSet {
    entries: BTreeMap<String, BaselineEntry>,
}

impl BaselineSet {
    /// Load a baseline file
    ///
    /// # Errors
    ///
    /// - [`PerfError::NotFound`] if the file does not exist
    /// - [`PerfError::Parse`] if it is not a JSON object of baseline entries
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| PerfError::io(path, e))?;
        let set: Self = serde_json::from_str(&content).map_err(|e| PerfError::parse(path, e))?;
        debug!("Loaded {} baselines from {}", set.len(), path.display());
        Ok(set)
    }

    /// Load a baseline file, treating a missing file as an empty set
    pub fn load_or_empty<P: AsRef<Path>>(path: P) -> Result<Self> {
        match Self::load(&path) {
            Err(PerfError::NotFound(missing)) => {
                warn!("Baseline file {} not found, no baselines loaded", missing.display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn get(&self, key: &str) -> Option<&BaselineEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
