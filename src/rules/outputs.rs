//! Rules over outputs.

use crate::finding::{Finding, Severity};
use crate::rule::{EvalContext, Rule, RuleDoc};
use crate::snapshot::ModuleSnapshot;

/// BC009: an output that no longer exists.
pub struct OutputRemoved;

static OUTPUT_REMOVED: RuleDoc = RuleDoc {
    id: "BC009",
    name: "output-removed",
    default_severity: Severity::Error,
    description: "An output was removed. Calling configurations that reference it fail to \
                  evaluate.",
    example: "- output \"vpc_id\" { value = aws_vpc.main.id }",
    remediation: "Keep the output until callers have stopped referencing it.",
};

impl Rule for OutputRemoved {
    fn doc(&self) -> &'static RuleDoc {
        &OUTPUT_REMOVED
    }

    fn evaluate(
        &self,
        old: &ModuleSnapshot,
        new: &ModuleSnapshot,
        _ctx: &EvalContext,
    ) -> Vec<Finding> {
        old.outputs
            .iter()
            .filter(|(name, _)| !new.outputs.contains_key(*name))
            .map(|(name, output)| {
                Finding::from_rule(self.doc(), format!("output \"{name}\" was removed"))
                    .with_subject(name)
                    .with_old_location(&output.location)
            })
            .collect()
    }
}

/// RC011: an output became sensitive.
pub struct OutputSensitiveChanged;

static OUTPUT_SENSITIVE_CHANGED: RuleDoc = RuleDoc {
    id: "RC011",
    name: "output-sensitive-changed",
    default_severity: Severity::Warning,
    description: "An output was marked sensitive. Callers that pass it into non-sensitive \
                  outputs of their own now fail.",
    example: "output \"endpoint\" {} -> output \"endpoint\" { sensitive = true }",
    remediation: "Tell callers to mark their dependent outputs sensitive before upgrading.",
};

impl Rule for OutputSensitiveChanged {
    fn doc(&self) -> &'static RuleDoc {
        &OUTPUT_SENSITIVE_CHANGED
    }

    fn evaluate(
        &self,
        old: &ModuleSnapshot,
        new: &ModuleSnapshot,
        _ctx: &EvalContext,
    ) -> Vec<Finding> {
        old.outputs
            .iter()
            .filter_map(|(name, o)| new.outputs.get(name).map(|n| (name, o, n)))
            .filter(|(_, o, n)| !o.sensitive && n.sensitive)
            .map(|(name, o, n)| {
                Finding::from_rule(self.doc(), format!("output \"{name}\" is now sensitive"))
                    .with_subject(name)
                    .with_old_location(&o.location)
                    .with_new_location(&n.location)
            })
            .collect()
    }
}
