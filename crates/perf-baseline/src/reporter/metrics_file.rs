//! Persisted audit metrics
//!
//! `lighthouse_metrics.json` is a flat JSON object from
//! `<pageKey>_<category>` to the latest formatted result. Each run reads the
//! file, overwrites its own keys and writes everything back. Keys from other
//! pages are left alone. There is no locking: one writer at a time.

use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, instrument};

use crate::error::{PerfError, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsReport {
    entries: Map<String, Value>,
}

impl MetricsReport {
    /// Read a report, treating a missing file as empty
    ///
    /// # Errors
    ///
    /// Returns [`PerfError::Parse`] if the file is not a JSON object.
    pub fn load_or_empty<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No metrics file at {}, starting empty", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(PerfError::io(path, e)),
        };

        let entries: Map<String, Value> =
            serde_json::from_str(&content).map_err(|e| PerfError::parse(path, e))?;
        Ok(Self { entries })
    }

    /// Overwrite the given keys, keeping every other key
    pub fn merge<I, K, V>(&mut self, summary: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in summary {
            self.entries.insert(key.into(), Value::String(value.into()));
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PerfError::io(parent, e))?;
        }
        let content =
            serde_json::to_string_pretty(&self.entries).map_err(|e| PerfError::parse(path, e))?;
        fs::write(path, content).map_err(|e| PerfError::io(path, e))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read-modify-write `summary` into the report at `path`
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn merge_into_file<P, I, K, V>(path: P, summary: I) -> Result<MetricsReport>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let path = path.as_ref();
    let mut report = MetricsReport::load_or_empty(path)?;
    report.merge(summary);
    report.save(path)?;
    debug!("Metrics file now holds {} entries", report.len());
    Ok(report)
}
