//! Comparison engine.
//!
//! The engine runs every enabled rule of a [`Registry`] against two snapshots,
//! applies configured severity overrides, and, when rename detection is on,
//! drops the removal/addition findings that a rename finding already explains.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::finding::{Finding, META_NEW_NAME, META_OLD_NAME, Severity};
use crate::ignore::{IgnoreRule, apply_ignores};
use crate::registry::{Registry, default_registry};
pub use crate::rule::RenameDetection;
use crate::rule::{EvalContext, Rule};
use crate::result::CheckResult;
use crate::snapshot::ModuleSnapshot;

/// Per-rule configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSetting {
    /// `Some(false)` disables the rule; unset leaves it enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Replaces the rule's default severity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

/// Everything the engine needs besides the rules themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Settings by rule ID. Rules without an entry run at default severity.
    pub rules: BTreeMap<String, RuleSetting>,
    /// Rename detection settings.
    pub rename: RenameDetection,
    /// Lowest severity that fails a check.
    pub fail_on: Severity,
    /// Findings to mark ignored.
    pub ignores: Vec<IgnoreRule>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rules: BTreeMap::new(),
            rename: RenameDetection::default(),
            fail_on: Severity::Error,
            ignores: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Whether `rule_id` should run.
    #[must_use]
    pub fn is_enabled(&self, rule_id: &str) -> bool {
        self.rules
            .get(rule_id)
            .and_then(|s| s.enabled)
            .unwrap_or(true)
    }

    /// Configured severity override for `rule_id`.
    #[must_use]
    pub fn severity_override(&self, rule_id: &str) -> Option<Severity> {
        self.rules.get(rule_id).and_then(|s| s.severity)
    }

    /// Disables a rule.
    #[must_use]
    pub fn disable(mut self, rule_id: impl Into<String>) -> Self {
        self.rules.entry(rule_id.into()).or_default().enabled = Some(false);
        self
    }

    /// Overrides a rule's severity.
    #[must_use]
    pub fn with_severity(mut self, rule_id: impl Into<String>, severity: Severity) -> Self {
        self.rules.entry(rule_id.into()).or_default().severity = Some(severity);
        self
    }

    /// Sets rename detection.
    #[must_use]
    pub fn with_rename(mut self, rename: RenameDetection) -> Self {
        self.rename = rename;
        self
    }

    /// Sets the fail-on threshold.
    #[must_use]
    pub fn with_fail_on(mut self, fail_on: Severity) -> Self {
        self.fail_on = fail_on;
        self
    }

    /// Adds an ignore entry.
    #[must_use]
    pub fn with_ignore(mut self, ignore: IgnoreRule) -> Self {
        self.ignores.push(ignore);
        self
    }
}

/// Per-call options of [`Engine::check_with_options`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckOptions {
    /// Attach each rule's remediation text to its findings.
    pub include_remediation: bool,
}

/// Which findings a rename finding explains.
struct Suppression {
    rename_rule: &'static str,
    suppressed_rule: &'static str,
    key: &'static str,
}

const SUPPRESSIONS: &[Suppression] = &[
    Suppression {
        rename_rule: "BC003",
        suppressed_rule: "BC002",
        key: META_OLD_NAME,
    },
    Suppression {
        rename_rule: "BC003",
        suppressed_rule: "BC001",
        key: META_NEW_NAME,
    },
    Suppression {
        rename_rule: "RC003",
        suppressed_rule: "BC002",
        key: META_OLD_NAME,
    },
    Suppression {
        rename_rule: "BC010",
        suppressed_rule: "BC009",
        key: META_OLD_NAME,
    },
];

/// Drops findings explained by a rename finding.
///
/// Matching is on the suppressed finding's `subject`.
fn suppress_renamed(findings: Vec<Finding>) -> Vec<Finding> {
    let explained: HashSet<(&'static str, String)> = SUPPRESSIONS
        .iter()
        .flat_map(|s| {
            findings
                .iter()
                .filter(move |f| f.rule_id == s.rename_rule)
                .filter_map(move |f| {
                    f.meta(s.key)
                        .map(|name| (s.suppressed_rule, name.to_string()))
                })
        })
        .collect();

    if explained.is_empty() {
        return findings;
    }

    let before = findings.len();
    let kept: Vec<Finding> = findings
        .into_iter()
        .filter(|f| {
            let Some(subject) = f.subject.as_deref() else {
                return true;
            };
            !SUPPRESSIONS
                .iter()
                .filter(|s| s.suppressed_rule == f.rule_id)
                .any(|s| explained.contains(&(s.suppressed_rule, subject.to_string())))
        })
        .collect();
    tracing::debug!(suppressed = before - kept.len(), "Applied rename suppression");
    kept
}

/// Runs rules against snapshot pairs.
///
/// An engine is immutable after construction and can be shared between
/// threads; engines with different configurations may run concurrently.
#[derive(Debug)]
pub struct Engine {
    registry: RegistryRef,
    config: EngineConfig,
}

#[derive(Debug)]
enum RegistryRef {
    Default,
    Owned(Registry),
}

impl RegistryRef {
    fn get(&self) -> &Registry {
        match self {
            Self::Default => default_registry(),
            Self::Owned(registry) => registry,
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    /// Creates an engine over the default registry.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            registry: RegistryRef::Default,
            config,
        }
    }

    /// Creates an engine over a caller-supplied registry.
    #[must_use]
    pub fn with_registry(registry: Registry, config: EngineConfig) -> Self {
        Self {
            registry: RegistryRef::Owned(registry),
            config,
        }
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The registry rules are drawn from.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        self.registry.get()
    }

    fn run_rule(
        &self,
        rule: &dyn Rule,
        old: &ModuleSnapshot,
        new: &ModuleSnapshot,
        ctx: &EvalContext,
    ) -> Vec<Finding> {
        let mut findings = rule.evaluate(old, new, ctx);
        tracing::debug!(rule = rule.id(), findings = findings.len(), "Evaluated rule");
        if let Some(severity) = self.config.severity_override(rule.id()) {
            for finding in &mut findings {
                finding.severity = severity;
            }
        }
        findings
    }

    /// Runs every enabled rule in registry order and returns the findings.
    ///
    /// Rename suppression is applied when rename detection is enabled.
    /// The ignore list is not applied here; see [`Engine::check`].
    #[tracing::instrument(level = "debug", skip_all, fields(old = %old.path, new = %new.path))]
    pub fn evaluate(&self, old: &ModuleSnapshot, new: &ModuleSnapshot) -> Vec<Finding> {
        let ctx = EvalContext::new(self.config.rename);
        let mut findings = Vec::new();
        for rule in self.registry().all() {
            if !self.config.is_enabled(rule.id()) {
                tracing::trace!(rule = rule.id(), "Skipping disabled rule");
                continue;
            }
            findings.extend(self.run_rule(rule.as_ref(), old, new, &ctx));
        }
        if self.config.rename.enabled {
            findings = suppress_renamed(findings);
        }
        findings
    }

    /// Evaluates and aggregates into a computed [`CheckResult`].
    pub fn check(&self, old: &ModuleSnapshot, new: &ModuleSnapshot) -> CheckResult {
        self.check_with_options(old, new, &CheckOptions::default())
    }

    /// Like [`Engine::check`], with per-call options.
    #[tracing::instrument(level = "debug", skip_all, fields(old = %old.path, new = %new.path))]
    pub fn check_with_options(
        &self,
        old: &ModuleSnapshot,
        new: &ModuleSnapshot,
        options: &CheckOptions,
    ) -> CheckResult {
        let mut findings = self.evaluate(old, new);

        if options.include_remediation {
            let registry = self.registry();
            for finding in &mut findings {
                if let Some(rule) = registry.get(&finding.rule_id) {
                    finding.remediation = Some(rule.doc().remediation.to_string());
                }
            }
        }

        apply_ignores(&mut findings, &self.config.ignores);

        let mut result = CheckResult::new(&old.path, &new.path, findings, self.config.fail_on);
        result.compute();
        tracing::info!(
            errors = result.summary.error,
            warnings = result.summary.warning,
            notices = result.summary.notice,
            ignored = result.summary.ignored,
            result = %result.result,
            "Check complete"
        );
        result
    }
}
