//! Rename detection rules.
//!
//! All three rules are opt-in: they return nothing unless
//! [`EvalContext::rename`](crate::rule::EvalContext) is enabled. Removed names
//! are visited in sorted order and each added name can be claimed by at most
//! one rename. A removed input paired with a required input by BC003 is not
//! offered to RC003.

use crate::finding::{Finding, META_NEW_NAME, META_OLD_NAME, META_SIMILARITY, Severity};
use crate::rule::{EvalContext, Rule, RuleDoc};
use crate::rules::{RenamePair, match_renames};
use crate::snapshot::{ModuleSnapshot, VariableSignature};

fn removed_variables<'a>(old: &'a ModuleSnapshot, new: &ModuleSnapshot) -> Vec<&'a str> {
    old.variables
        .keys()
        .filter(|name| !new.variables.contains_key(*name))
        .map(String::as_str)
        .collect()
}

fn added_variables<'a>(
    old: &ModuleSnapshot,
    new: &'a ModuleSnapshot,
    keep: impl Fn(&VariableSignature) -> bool,
) -> Vec<&'a str> {
    new.variables
        .iter()
        .filter(|(name, var)| !old.variables.contains_key(*name) && keep(*var))
        .map(|(name, _)| name.as_str())
        .collect()
}

fn rename_finding(doc: &RuleDoc, kind: &str, pair: &RenamePair<'_>) -> Finding {
    Finding::from_rule(
        doc,
        format!("{kind} \"{}\" appears to be renamed to \"{}\"", pair.old, pair.new),
    )
    .with_detail(format!("similarity {:.2}", pair.score))
    .with_subject(pair.old)
    .with_metadata(META_OLD_NAME, pair.old)
    .with_metadata(META_NEW_NAME, pair.new)
    .with_metadata(META_SIMILARITY, format!("{:.4}", pair.score))
}

fn variable_renames(
    doc: &RuleDoc,
    old: &ModuleSnapshot,
    new: &ModuleSnapshot,
    ctx: &EvalContext,
    new_is_required: bool,
) -> Vec<Finding> {
    if !ctx.rename.enabled {
        return Vec::new();
    }
    let threshold = ctx.rename.similarity_threshold;
    let mut removed = removed_variables(old, new);
    if !new_is_required {
        let required = added_variables(old, new, |v| v.required);
        let claimed: Vec<&str> = match_renames(removed.clone(), required, threshold)
            .iter()
            .map(|pair| pair.old)
            .collect();
        removed.retain(|name| !claimed.contains(name));
    }
    let added = added_variables(old, new, |v| v.required == new_is_required);
    match_renames(removed, added, threshold)
        .iter()
        .map(|pair| {
            let mut finding = rename_finding(doc, "input", pair);
            if let Some(var) = old.variables.get(pair.old) {
                finding = finding.with_old_location(&var.location);
            }
            if let Some(var) = new.variables.get(pair.new) {
                finding = finding.with_new_location(&var.location);
            }
            finding
        })
        .collect()
}

/// BC003: an input was renamed and the new name has no default.
pub struct InputRenamed;

static INPUT_RENAMED: RuleDoc = RuleDoc {
    id: "BC003",
    name: "input-renamed",
    default_severity: Severity::Error,
    description: "An input variable appears to have been renamed and the new variable is \
                  required. Callers passing the old name fail, and callers not passing \
                  anything fail too.",
    example: "- variable \"api_key\" {}\n+ variable \"api_key_v2\" {}",
    remediation: "Keep the old variable as an alias, or give the new one a default.",
};

impl Rule for InputRenamed {
    fn doc(&self) -> &'static RuleDoc {
        &INPUT_RENAMED
    }

    fn evaluate(
        &self,
        old: &ModuleSnapshot,
        new: &ModuleSnapshot,
        ctx: &EvalContext,
    ) -> Vec<Finding> {
        variable_renames(self.doc(), old, new, ctx, true)
    }
}

/// RC003: an input was renamed and the new name has a default.
pub struct InputRenamedOptional;

static INPUT_RENAMED_OPTIONAL: RuleDoc = RuleDoc {
    id: "RC003",
    name: "input-renamed-optional",
    default_severity: Severity::Warning,
    description: "An input variable appears to have been renamed to an optional variable. \
                  Callers passing the old name fail; callers relying on the default do not.",
    example: "- variable \"instance_type\" {}\n+ variable \"instance_types\" { default = [] }",
    remediation: "Keep the old variable as a deprecated alias until callers have moved.",
};

impl Rule for InputRenamedOptional {
    fn doc(&self) -> &'static RuleDoc {
        &INPUT_RENAMED_OPTIONAL
    }

    fn evaluate(
        &self,
        old: &ModuleSnapshot,
        new: &ModuleSnapshot,
        ctx: &EvalContext,
    ) -> Vec<Finding> {
        variable_renames(self.doc(), old, new, ctx, false)
    }
}

/// BC010: an output was renamed.
pub struct OutputRenamed;

static OUTPUT_RENAMED: RuleDoc = RuleDoc {
    id: "BC010",
    name: "output-renamed",
    default_severity: Severity::Error,
    description: "An output appears to have been renamed. References to the old output name \
                  in calling configurations no longer resolve.",
    example: "- output \"bucket_arn\" {}\n+ output \"bucket_arns\" {}",
    remediation: "Keep the old output alongside the new one until callers have migrated.",
};

impl Rule for OutputRenamed {
    fn doc(&self) -> &'static RuleDoc {
        &OUTPUT_RENAMED
    }

    fn evaluate(
        &self,
        old: &ModuleSnapshot,
        new: &ModuleSnapshot,
        ctx: &EvalContext,
    ) -> Vec<Finding> {
        if !ctx.rename.enabled {
            return Vec::new();
        }
        let removed = old
            .outputs
            .keys()
            .filter(|name| !new.outputs.contains_key(*name))
            .map(String::as_str);
        let added = new
            .outputs
            .keys()
            .filter(|name| !old.outputs.contains_key(*name))
            .map(String::as_str);

        match_renames(removed, added, ctx.rename.similarity_threshold)
            .iter()
            .map(|pair| {
                let mut finding = rename_finding(self.doc(), "output", pair);
                if let Some(output) = old.outputs.get(pair.old) {
                    finding = finding.with_old_location(&output.location);
                }
                if let Some(output) = new.outputs.get(pair.new) {
                    finding = finding.with_new_location(&output.location);
                }
                finding
            })
            .collect()
    }
}
