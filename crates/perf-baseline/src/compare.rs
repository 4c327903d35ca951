//! Baseline comparison
//!
//! Budgets (render time, layout shift, memory) fail when the measured value
//! is above the baseline. Audit categories fail when the rounded score is
//! below it. Only audit outcomes end up in the metrics report; budget
//! outcomes are logged, and only when they fail.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::baseline::BaselineEntry;
use crate::metrics::{MetricKind, MetricSample};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Pass,
    Fail,
}

impl Outcome {
    pub fn icon(&self) -> &'static str {
        match self {
            Outcome::Pass => "✅",
            Outcome::Fail => "❌",
        }
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Outcome::Fail)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Pass => f.write_str("PASS"),
            Outcome::Fail => f.write_str("FAIL"),
        }
    }
}

/// Result of comparing one sample against its baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub kind: MetricKind,
    /// Measured value; audit scores are already scaled to 0-100 and rounded
    pub actual: f64,
    pub expected: f64,
    pub outcome: Outcome,
    pub message: String,
}

/// Compare a sample against the matching field of a baseline entry
///
/// Audit score samples carry the raw `[0, 1]` score reported by the audit
/// tool. Returns `None` when the entry has no value for the sample's kind.
///
/// ```
/// use perf_baseline::baseline::BaselineEntry;
/// use perf_baseline::compare::{compare, Outcome};
/// use perf_baseline::metrics::{MetricKind, MetricSample};
///
/// let entry = BaselineEntry { render_time: Some(500.0), ..Default::default() };
/// let result = compare(&MetricSample::new(MetricKind::RenderTime, 734.56), &entry).unwrap();
/// assert_eq!(result.outcome, Outcome::Fail);
/// assert_eq!(result.message, "exceeded: 734.56ms > 500ms");
/// ```
pub fn compare(sample: &MetricSample, entry: &BaselineEntry) -> Option<ComparisonResult> {
    let expected = entry.expected(sample.kind)?;

    let result = if sample.kind.is_audit_score() {
        compare_audit_score(sample.kind, sample.value, expected)
    } else {
        compare_budget(sample.kind, sample.value, expected)
    };
    Some(result)
}

fn compare_budget(kind: MetricKind, actual: f64, expected: f64) -> ComparisonResult {
    let unit = kind.unit();
    let tag = if kind == MetricKind::LayoutShift {
        " (CLS)"
    } else {
        ""
    };

    let (outcome, message) = if actual > expected {
        (
            Outcome::Fail,
            format!("exceeded: {:.2}{unit} > {}{unit}{tag}", actual, expected),
        )
    } else {
        (
            Outcome::Pass,
            format!("within budget: {:.2}{unit} <= {}{unit}{tag}", actual, expected),
        )
    };

    ComparisonResult {
        kind,
        actual,
        expected,
        outcome,
        message,
    }
}

fn compare_audit_score(kind: MetricKind, raw_score: f64, expected: f64) -> ComparisonResult {
    let actual = audit_score_percent(raw_score);
    let outcome = if actual < expected {
        Outcome::Fail
    } else {
        Outcome::Pass
    };

    ComparisonResult {
        kind,
        actual,
        expected,
        outcome,
        message: format!("{} {} (Expected: {})", outcome.icon(), actual, expected),
    }
}

/// Scale a `[0, 1]` audit score to a whole percentage
pub fn audit_score_percent(raw_score: f64) -> f64 {
    (raw_score * 100.0).round()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn budgets() -> BaselineEntry {
        BaselineEntry {
            render_time: Some(500.0),
            layout_shift: Some(0.1),
            memory_mb: Some(150.0),
            ..Default::default()
        }
    }

    fn scores() -> BaselineEntry {
        BaselineEntry {
            performance: Some(30.0),
            accessibility: Some(90.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_render_time_exceeded_message() {
        let result = compare(
            &MetricSample::new(MetricKind::RenderTime, 734.56),
            &budgets(),
        )
        .unwrap();

        assert_eq!(result.outcome, Outcome::Fail);
        assert_eq!(result.message, "exceeded: 734.56ms > 500ms");
    }

    #[test]
    fn test_layout_shift_exceeded_message() {
        let result = compare(
            &MetricSample::new(MetricKind::LayoutShift, 0.254),
            &budgets(),
        )
        .unwrap();

        assert_eq!(result.outcome, Outcome::Fail);
        assert_eq!(result.message, "exceeded: 0.25 > 0.1 (CLS)");
    }

    #[test]
    fn test_memory_exceeded_message() {
        let result = compare(&MetricSample::new(MetricKind::MemoryMb, 151.5), &budgets()).unwrap();

        assert_eq!(result.outcome, Outcome::Fail);
        assert_eq!(result.message, "exceeded: 151.50MB > 150MB");
    }

    #[test]
    fn test_budget_equal_to_baseline_passes() {
        let result = compare(&MetricSample::new(MetricKind::RenderTime, 500.0), &budgets()).unwrap();
        assert_eq!(result.outcome, Outcome::Pass);
    }

    #[test]
    fn test_missing_field_skips_comparison() {
        let entry = BaselineEntry {
            render_time: Some(500.0),
            ..Default::default()
        };
        assert!(compare(&MetricSample::new(MetricKind::MemoryMb, 9999.0), &entry).is_none());
        assert!(compare(&MetricSample::new(MetricKind::PerformanceScore, 0.1), &entry).is_none());
    }

    #[test]
    fn test_audit_scores_pass() {
        let perf = compare(
            &MetricSample::new(MetricKind::PerformanceScore, 0.42),
            &scores(),
        )
        .unwrap();
        let a11y = compare(
            &MetricSample::new(MetricKind::AccessibilityScore, 0.95),
            &scores(),
        )
        .unwrap();

        assert_eq!(perf.outcome, Outcome::Pass);
        assert_eq!(perf.message, "✅ 42 (Expected: 30)");
        assert_eq!(a11y.outcome, Outcome::Pass);
        assert_eq!(a11y.message, "✅ 95 (Expected: 90)");
    }

    #[test]
    fn test_audit_score_below_expected_fails() {
        let result = compare(
            &MetricSample::new(MetricKind::AccessibilityScore, 0.87),
            &scores(),
        )
        .unwrap();

        assert_eq!(result.outcome, Outcome::Fail);
        assert_eq!(result.actual, 87.0);
        assert_eq!(result.message, "❌ 87 (Expected: 90)");
    }

    #[test]
    fn test_audit_score_equal_to_expected_passes() {
        let result = compare(
            &MetricSample::new(MetricKind::PerformanceScore, 0.30),
            &scores(),
        )
        .unwrap();
        assert_eq!(result.outcome, Outcome::Pass);
    }

    #[test]
    fn test_audit_score_rounding() {
        assert_eq!(audit_score_percent(0.29), 29.0);
        assert_eq!(audit_score_percent(0.954), 95.0);
        assert_eq!(audit_score_percent(0.956), 96.0);
        assert_eq!(audit_score_percent(1.0), 100.0);
        assert_eq!(audit_score_percent(0.0), 0.0);
    }
}
