//! Metric collection for components under test
//!
//! This module provides:
//! - **Metric kinds and samples**: the values the comparator understands
//! - **[`PageProbe`]**: the browser-side services the collector needs
//!   (page clock, visibility wait, layout-shift observer, heap size)
//! - **[`MetricCollector`]**: render time, cumulative layout shift and memory
//!   measurements built on top of a probe
//!
//! # Example
//!
//! ```no_run
//! use perf_baseline::metrics::{MetricCollector, PageProbe};
//! use std::time::Duration;
//!
//! # async fn example(probe: &dyn PageProbe) -> perf_baseline::Result<()> {
//! let collector = MetricCollector::new(probe);
//! let render = collector.render_time("sidebarPanel", Duration::from_secs(180)).await?;
//! let cls = collector.layout_shift(Duration::from_secs(2)).await?;
//! println!("render {:.2}ms, cls {:.4}", render.value, cls.value);
//! # Ok(())
//! # }
//! ```

pub mod collector;
pub mod layout_shift;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::Result;

pub use collector::MetricCollector;
pub use layout_shift::{CumulativeLayoutShift, LayoutShiftEntry};

/// Kind of a measured value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    RenderTime,
    LayoutShift,
    MemoryMb,
    PerformanceScore,
    AccessibilityScore,
}

impl MetricKind {
    /// Unit appended to values in budget messages
    pub fn unit(&self) -> &'static str {
        match self {
            MetricKind::RenderTime => "ms",
            MetricKind::MemoryMb => "MB",
            MetricKind::LayoutShift
            | MetricKind::PerformanceScore
            | MetricKind::AccessibilityScore => "",
        }
    }

    /// Suffix of the report key, as used in baseline files
    pub fn key_suffix(&self) -> &'static str {
        match self {
            MetricKind::RenderTime => "render_time",
            MetricKind::LayoutShift => "layout_shift",
            MetricKind::MemoryMb => "memory_MB",
            MetricKind::PerformanceScore => "performance",
            MetricKind::AccessibilityScore => "accessibility",
        }
    }

    /// Audit categories fail below their baseline; budgets fail above it
    pub fn is_audit_score(&self) -> bool {
        matches!(
            self,
            MetricKind::PerformanceScore | MetricKind::AccessibilityScore
        )
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key_suffix())
    }
}

/// A single measured value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub kind: MetricKind,
    pub value: f64,
}

impl MetricSample {
    pub fn new(kind: MetricKind, value: f64) -> Self {
        Self { kind, value }
    }
}

/// Browser-side services used by the collector
///
/// Implemented over chromiumoxide by [`crate::browser::ChromiumProbe`];
/// tests provide scripted implementations.
#[async_trait]
pub trait PageProbe: Send + Sync {
    /// High resolution page clock in milliseconds (`performance.now()`)
    async fn now_ms(&self) -> Result<f64>;

    /// Resolve once the element with the given test id is visible
    ///
    /// Fails with [`crate::PerfError::VisibilityTimeout`] after `timeout`.
    async fn wait_until_visible(&self, test_id: &str, timeout: Duration) -> Result<()>;

    /// Start observing layout shifts, including buffered entries
    async fn observe_layout_shift(&self) -> Result<Box<dyn LayoutShiftObserver>>;

    /// Bytes of JS heap currently in use
    async fn used_heap_bytes(&self) -> Result<u64>;

    /// Release the page once measurements are done
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A connected layout-shift observer
///
/// Must be disconnected once the observation window closes.
#[async_trait]
pub trait LayoutShiftObserver: Send {
    /// Entries recorded since the previous call
    async fn take_entries(&mut self) -> Result<Vec<LayoutShiftEntry>>;

    async fn disconnect(self: Box<Self>) -> Result<()>;
}
