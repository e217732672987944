//! Rule Trait
//!
//! This module defines the [`Rule`] trait, the common interface of every
//! comparison rule, together with the static documentation each rule carries
//! ([`RuleDoc`]) and the per-evaluation context ([`EvalContext`]).
//!
//! # Overview
//!
//! A rule compares two snapshots and reports what changed:
//!
//! - Each rule has a stable ID (`BC001`) and a kebab-case name
//!   (`required-input-added`)
//! - Each rule has a default severity that configuration may override
//! - Each rule is pure: no I/O, no shared state, same inputs give same output
//!
//! # Implementing a Custom Rule
//!
//! ```rust
//! use modbreak_core::rule::{EvalContext, Rule, RuleDoc};
//! use modbreak_core::{Finding, ModuleSnapshot, Severity};
//!
//! struct NoOutputsLeft;
//!
//! static DOC: RuleDoc = RuleDoc {
//!     id: "X001",
//!     name: "no-outputs-left",
//!     default_severity: Severity::Warning,
//!     description: "The new version exposes no outputs at all.",
//!     example: "",
//!     remediation: "Keep at least one output.",
//! };
//!
//! impl Rule for NoOutputsLeft {
//!     fn doc(&self) -> &'static RuleDoc {
//!         &DOC
//!     }
//!
//!     fn evaluate(
//!         &self,
//!         old: &ModuleSnapshot,
//!         new: &ModuleSnapshot,
//!         _ctx: &EvalContext,
//!     ) -> Vec<Finding> {
//!         if !old.outputs.is_empty() && new.outputs.is_empty() {
//!             vec![Finding::from_rule(&DOC, "all outputs were removed")]
//!         } else {
//!             Vec::new()
//!         }
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::finding::{Finding, Severity};
use crate::snapshot::ModuleSnapshot;

/// Default similarity threshold for rename detection.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

/// Static, machine-checkable documentation of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RuleDoc {
    /// Stable identifier, e.g. `BC001`.
    pub id: &'static str,
    /// Kebab-case name, e.g. `required-input-added`.
    pub name: &'static str,
    /// Severity used when configuration does not override it.
    pub default_severity: Severity,
    /// One-paragraph explanation.
    pub description: &'static str,
    /// A before/after example that triggers the rule.
    pub example: &'static str,
    /// How to make the change non-breaking.
    pub remediation: &'static str,
}

/// Rename detection settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenameDetection {
    /// Whether rename rules run at all.
    #[serde(default)]
    pub enabled: bool,
    /// Minimum similarity in `[0, 1]` for two names to count as a rename.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

fn default_similarity_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}

impl Default for RenameDetection {
    fn default() -> Self {
        Self {
            enabled: false,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

impl RenameDetection {
    /// Rename detection switched on at the default threshold.
    #[must_use]
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Rename detection switched on at `threshold`.
    #[must_use]
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            enabled: true,
            similarity_threshold: threshold,
        }
    }
}

/// Everything a rule may consult besides the two snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EvalContext {
    /// Rename detection settings of the running engine.
    pub rename: RenameDetection,
}

impl EvalContext {
    /// Context with the given rename settings.
    #[must_use]
    pub const fn new(rename: RenameDetection) -> Self {
        Self { rename }
    }
}

/// Common trait for all comparison rules.
///
/// Rules are stateless and shared between threads, hence `Send + Sync`.
pub trait Rule: Send + Sync {
    /// Static documentation, including identity and default severity.
    fn doc(&self) -> &'static RuleDoc;

    /// Compares `old` against `new` and reports findings in a deterministic order.
    ///
    /// Returns an empty list when the rule does not apply; evaluation never fails.
    fn evaluate(&self, old: &ModuleSnapshot, new: &ModuleSnapshot, ctx: &EvalContext)
    -> Vec<Finding>;

    /// Stable identifier.
    fn id(&self) -> &'static str {
        self.doc().id
    }

    /// Kebab-case name.
    fn name(&self) -> &'static str {
        self.doc().name
    }

    /// One-paragraph explanation.
    fn description(&self) -> &'static str {
        self.doc().description
    }

    /// Severity used when configuration does not override it.
    fn default_severity(&self) -> Severity {
        self.doc().default_severity
    }
}
