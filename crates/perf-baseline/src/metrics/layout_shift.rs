//! Cumulative Layout Shift accumulation
//!
//! The browser reports `layout-shift` performance entries; only shifts that
//! were not caused by recent user input count toward the score.

use serde::{Deserialize, Serialize};

/// One `layout-shift` performance entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutShiftEntry {
    pub value: f64,
    #[serde(default)]
    pub had_recent_input: bool,
}

/// Running CLS score
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CumulativeLayoutShift {
    score: f64,
    counted: usize,
    ignored: usize,
}

impl CumulativeLayoutShift {
    pub fn record(&mut self, entry: &LayoutShiftEntry) {
        if entry.had_recent_input {
            self.ignored += 1;
        } else {
            self.score += entry.value;
            self.counted += 1;
        }
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    /// Number of shifts that contributed to the score
    pub fn counted(&self) -> usize {
        self.counted
    }

    /// Number of shifts skipped because of recent input
    pub fn ignored(&self) -> usize {
        self.ignored
    }
}

impl<'a> Extend<&'a LayoutShiftEntry> for CumulativeLayoutShift {
    fn extend<I: IntoIterator<Item = &'a LayoutShiftEntry>>(&mut self, iter: I) {
        for entry in iter {
            self.record(entry);
        }
    }
}
