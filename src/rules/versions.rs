//! Rules over core and provider version constraints.
//!
//! Removing a constraint only widens what callers may use, so none of these
//! rules report it.

use crate::finding::{Finding, Severity};
use crate::rule::{EvalContext, Rule, RuleDoc};
use crate::snapshot::ModuleSnapshot;

fn non_empty(constraint: &str) -> Option<&str> {
    Some(constraint.trim()).filter(|c| !c.is_empty())
}

/// BC200: a core version constraint appeared.
pub struct RequiredVersionAdded;

static REQUIRED_VERSION_ADDED: RuleDoc = RuleDoc {
    id: "BC200",
    name: "required-version-added",
    default_severity: Severity::Error,
    description: "The module now declares a core version constraint. Callers running a \
                  version outside it can no longer use the module.",
    example: "+ terraform { required_version = \">= 1.5\" }",
    remediation: "Publish the constraint in a major release, or keep it as wide as possible.",
};

impl Rule for RequiredVersionAdded {
    fn doc(&self) -> &'static RuleDoc {
        &REQUIRED_VERSION_ADDED
    }

    fn evaluate(
        &self,
        old: &ModuleSnapshot,
        new: &ModuleSnapshot,
        _ctx: &EvalContext,
    ) -> Vec<Finding> {
        match (old.version_constraint(), new.version_constraint()) {
            (None, Some(constraint)) => vec![
                Finding::from_rule(
                    self.doc(),
                    format!("core version constraint \"{constraint}\" was added"),
                )
                .with_subject("required_version"),
            ],
            _ => Vec::new(),
        }
    }
}

/// RC200: the core version constraint changed.
pub struct RequiredVersionChanged;

static REQUIRED_VERSION_CHANGED: RuleDoc = RuleDoc {
    id: "RC200",
    name: "required-version-changed",
    default_severity: Severity::Warning,
    description: "The core version constraint changed. Callers on versions that satisfied \
                  the old constraint may not satisfy the new one.",
    example: "required_version = \">= 1.3\" -> required_version = \">= 1.6\"",
    remediation: "Make sure the new constraint still admits the versions callers run.",
};

impl Rule for RequiredVersionChanged {
    fn doc(&self) -> &'static RuleDoc {
        &REQUIRED_VERSION_CHANGED
    }

    fn evaluate(
        &self,
        old: &ModuleSnapshot,
        new: &ModuleSnapshot,
        _ctx: &EvalContext,
    ) -> Vec<Finding> {
        match (old.version_constraint(), new.version_constraint()) {
            (Some(before), Some(after)) if before != after => vec![
                Finding::from_rule(self.doc(), "core version constraint changed")
                    .with_detail(format!("{before} -> {after}"))
                    .with_subject("required_version"),
            ],
            _ => Vec::new(),
        }
    }
}

/// BC201: a provider gained a version constraint.
pub struct ProviderConstraintAdded;

static PROVIDER_CONSTRAINT_ADDED: RuleDoc = RuleDoc {
    id: "BC201",
    name: "provider-constraint-added",
    default_severity: Severity::Error,
    description: "A provider version constraint was added, either for a newly required \
                  provider or for one that was unconstrained. Callers pinned to other \
                  provider versions can no longer initialize.",
    example: "+ aws = { source = \"hashicorp/aws\", version = \">= 5.0\" }",
    remediation: "Keep provider constraints as wide as the module allows.",
};

impl Rule for ProviderConstraintAdded {
    fn doc(&self) -> &'static RuleDoc {
        &PROVIDER_CONSTRAINT_ADDED
    }

    fn evaluate(
        &self,
        old: &ModuleSnapshot,
        new: &ModuleSnapshot,
        _ctx: &EvalContext,
    ) -> Vec<Finding> {
        new.required_providers
            .iter()
            .filter_map(|(name, requirement)| {
                let constraint = non_empty(&requirement.version)?;
                let previous = old
                    .required_providers
                    .get(name)
                    .and_then(|p| non_empty(&p.version));
                if previous.is_some() {
                    return None;
                }
                let detail = if old.required_providers.contains_key(name) {
                    "the provider was unconstrained"
                } else {
                    "the provider was not required before"
                };
                Some(
                    Finding::from_rule(
                        self.doc(),
                        format!("provider \"{name}\" now requires \"{constraint}\""),
                    )
                    .with_detail(detail)
                    .with_subject(name),
                )
            })
            .collect()
    }
}

/// RC201: a provider's version constraint changed.
pub struct ProviderConstraintChanged;

static PROVIDER_CONSTRAINT_CHANGED: RuleDoc = RuleDoc {
    id: "RC201",
    name: "provider-constraint-changed",
    default_severity: Severity::Warning,
    description: "A provider version constraint changed. Callers whose lock file pins a \
                  version outside the new range must upgrade the provider.",
    example: "version = \"~> 4.0\" -> version = \"~> 5.0\"",
    remediation: "Call out the provider upgrade in release notes.",
};

impl Rule for ProviderConstraintChanged {
    fn doc(&self) -> &'static RuleDoc {
        &PROVIDER_CONSTRAINT_CHANGED
    }

    fn evaluate(
        &self,
        old: &ModuleSnapshot,
        new: &ModuleSnapshot,
        _ctx: &EvalContext,
    ) -> Vec<Finding> {
        old.required_providers
            .iter()
            .filter_map(|(name, o)| {
                let n = new.required_providers.get(name)?;
                let before = non_empty(&o.version)?;
                let after = non_empty(&n.version)?;
                (before != after).then(|| {
                    Finding::from_rule(
                        self.doc(),
                        format!("version constraint of provider \"{name}\" changed"),
                    )
                    .with_detail(format!("{before} -> {after}"))
                    .with_subject(name)
                })
            })
            .collect()
    }
}

/// BC202: a provider now comes from a different registry source.
pub struct ProviderSourceChanged;

static PROVIDER_SOURCE_CHANGED: RuleDoc = RuleDoc {
    id: "BC202",
    name: "provider-source-changed",
    default_severity: Severity::Error,
    description: "The source address of a required provider changed. Existing state refers \
                  to the old provider and must be migrated.",
    example: "source = \"hashicorp/aws\" -> source = \"example/aws\"",
    remediation: "Keep the source address, or document the state migration steps.",
};

impl Rule for ProviderSourceChanged {
    fn doc(&self) -> &'static RuleDoc {
        &PROVIDER_SOURCE_CHANGED
    }

    fn evaluate(
        &self,
        old: &ModuleSnapshot,
        new: &ModuleSnapshot,
        _ctx: &EvalContext,
    ) -> Vec<Finding> {
        old.required_providers
            .iter()
            .filter_map(|(name, o)| new.required_providers.get(name).map(|n| (name, o, n)))
            .filter(|(_, o, n)| o.source.trim() != n.source.trim())
            .map(|(name, o, n)| {
                Finding::from_rule(
                    self.doc(),
                    format!("source of provider \"{name}\" changed"),
                )
                .with_detail(format!("{} -> {}", o.source, n.source))
                .with_subject(name)
            })
            .collect()
    }
}
