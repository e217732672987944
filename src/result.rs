//! Aggregated outcome of one comparison.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::finding::{Finding, Severity};

/// Overall outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    /// No active finding reached the fail-on threshold.
    #[default]
    Pass,
    /// At least one active finding reached the fail-on threshold.
    Fail,
}

impl Verdict {
    /// `PASS` or `FAIL`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
        }
    }

    /// Whether the check failed.
    #[must_use]
    pub const fn is_fail(self) -> bool {
        matches!(self, Self::Fail)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Finding counts per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Summary {
    /// Active error findings.
    pub error: usize,
    /// Active warning findings.
    pub warning: usize,
    /// Active notice findings.
    pub notice: usize,
    /// Ignored findings of any severity.
    pub ignored: usize,
    /// All findings, ignored ones included.
    pub total: usize,
}

/// Findings of one comparison together with their summary and verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Identifier of the old snapshot.
    pub old_path: String,
    /// Identifier of the new snapshot.
    pub new_path: String,
    /// Findings in registry order.
    pub findings: Vec<Finding>,
    /// Counts derived by [`CheckResult::compute`].
    pub summary: Summary,
    /// Verdict derived by [`CheckResult::compute`].
    pub result: Verdict,
    /// Threshold the verdict was computed against.
    pub fail_on: Severity,
}

impl CheckResult {
    /// Creates a result; call [`compute`](Self::compute) before reading the summary.
    #[must_use]
    pub fn new(
        old_path: impl Into<String>,
        new_path: impl Into<String>,
        findings: Vec<Finding>,
        fail_on: Severity,
    ) -> Self {
        Self {
            old_path: old_path.into(),
            new_path: new_path.into(),
            findings,
            summary: Summary::default(),
            result: Verdict::Pass,
            fail_on,
        }
    }

    /// Recounts findings and recomputes the verdict.
    ///
    /// ```
    /// use modbreak_core::{CheckResult, Finding, Severity, Verdict};
    ///
    /// let mut result = CheckResult::new(
    ///     "old",
    ///     "new",
    ///     vec![Finding::new("RC006", "input-default-changed", Severity::Warning, "m")],
    ///     Severity::Error,
    /// );
    /// result.compute();
    /// assert_eq!(result.summary.warning, 1);
    /// assert_eq!(result.result, Verdict::Pass);
    /// ```
    pub fn compute(&mut self) {
        let mut summary = Summary {
            total: self.findings.len(),
            ..Summary::default()
        };
        summary.ignored = self.findings.iter().filter(|f| f.ignored).count();
        for finding in self.active_findings() {
            match finding.severity {
                Severity::Error => summary.error += 1,
                Severity::Warning => summary.warning += 1,
                Severity::Notice => summary.notice += 1,
            }
        }
        let failed = self.active_findings().any(|f| f.severity >= self.fail_on);
        self.summary = summary;
        self.result = if failed { Verdict::Fail } else { Verdict::Pass };
    }

    /// Findings that are not ignored.
    pub fn active_findings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| !f.ignored)
    }

    /// Whether the verdict is [`Verdict::Fail`].
    #[must_use]
    pub fn is_fail(&self) -> bool {
        self.result.is_fail()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(severity: Severity) -> Finding {
        Finding::new("X", "x", severity, "m")
    }

    fn computed(findings: Vec<Finding>, fail_on: Severity) -> CheckResult {
        let mut result = CheckResult::new("old", "new", findings, fail_on);
        result.compute();
        result
    }

    #[test]
    fn test_error_fails_at_error_threshold() {
        let result = computed(
            vec![finding(Severity::Error), finding(Severity::Warning)],
            Severity::Error,
        );
        assert_eq!(
            result.summary,
            Summary {
                error: 1,
                warning: 1,
                notice: 0,
                ignored: 0,
                total: 2
            }
        );
        assert_eq!(result.result, Verdict::Fail);
    }

    #[test]
    fn test_warning_passes_at_error_but_fails_at_warning() {
        let findings = vec![finding(Severity::Warning)];
        assert_eq!(computed(findings.clone(), Severity::Error).result, Verdict::Pass);
        assert_eq!(computed(findings, Severity::Warning).result, Verdict::Fail);
    }

    #[test]
    fn test_ignored_error_counts_only_as_ignored() {
        let result = computed(
            vec![finding(Severity::Error).with_ignored(Some("accepted".into()))],
            Severity::Error,
        );
        assert_eq!(result.summary.error, 0);
        assert_eq!(result.summary.ignored, 1);
        assert_eq!(result.summary.total, 1);
        assert_eq!(result.result, Verdict::Pass, "ignored findings never fail");
    }

    #[test]
    fn test_one_of_each_tier_plus_an_ignored_error() {
        let findings = vec![
            finding(Severity::Error),
            finding(Severity::Warning),
            finding(Severity::Notice),
            finding(Severity::Error).with_ignored(None),
        ];

        let at_error = computed(findings.clone(), Severity::Error);
        assert_eq!(
            at_error.summary,
            Summary {
                error: 1,
                warning: 1,
                notice: 1,
                ignored: 1,
                total: 4
            }
        );
        assert_eq!(at_error.result, Verdict::Fail);
        assert_eq!(at_error.active_findings().count(), 3);

        let at_notice = computed(findings, Severity::Notice);
        assert_eq!(at_notice.summary, at_error.summary);
        assert_eq!(at_notice.result, Verdict::Fail);
    }

    #[test]
    fn test_empty_result_passes() {
        let result = computed(Vec::new(), Severity::Notice);
        assert_eq!(result.summary, Summary::default());
        assert_eq!(result.result, Verdict::Pass);
    }

    #[test]
    fn test_compute_is_idempotent() {
        let mut result = computed(vec![finding(Severity::Notice)], Severity::Notice);
        let first = result.summary;
        result.compute();
        assert_eq!(result.summary, first);
        assert!(result.is_fail());
    }

    #[test]
    fn test_verdict_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Verdict::Fail).unwrap(), "\"FAIL\"");
        assert_eq!(Verdict::Pass.to_string(), "PASS");
    }
}
