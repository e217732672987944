//! Rules over input variables.

use crate::finding::{Finding, Severity};
use crate::pattern::{LiteralListPattern, find_removed_values};
use crate::rule::{EvalContext, Rule, RuleDoc};
use crate::snapshot::{ModuleSnapshot, VariableSignature};

/// Pairs of variables declared in both snapshots, in sorted name order.
fn common_variables<'a>(
    old: &'a ModuleSnapshot,
    new: &'a ModuleSnapshot,
) -> impl Iterator<Item = (&'a VariableSignature, &'a VariableSignature)> {
    old.variables
        .iter()
        .filter_map(|(name, o)| new.variables.get(name).map(|n| (o, n)))
}

fn display_type(var: &VariableSignature) -> String {
    if var.is_unconstrained() {
        "any".to_string()
    } else {
        var.normalized_type()
    }
}

/// BC001: a new input without a default.
pub struct RequiredInputAdded;

static REQUIRED_INPUT_ADDED: RuleDoc = RuleDoc {
    id: "BC001",
    name: "required-input-added",
    default_severity: Severity::Error,
    description: "A new input variable without a default was added. Every existing caller \
                  must now pass a value or the module fails to plan.",
    example: "+ variable \"region\" { type = string }",
    remediation: "Give the new variable a default value so existing callers keep working.",
};

impl Rule for RequiredInputAdded {
    fn doc(&self) -> &'static RuleDoc {
        &REQUIRED_INPUT_ADDED
    }

    fn evaluate(
        &self,
        old: &ModuleSnapshot,
        new: &ModuleSnapshot,
        _ctx: &EvalContext,
    ) -> Vec<Finding> {
        new.variables
            .iter()
            .filter(|(name, var)| var.required && !old.variables.contains_key(*name))
            .map(|(name, var)| {
                Finding::from_rule(
                    self.doc(),
                    format!("new required input \"{name}\" has no default"),
                )
                .with_subject(name)
                .with_new_location(&var.location)
            })
            .collect()
    }
}

/// BC002: an input that no longer exists.
pub struct InputRemoved;

static INPUT_REMOVED: RuleDoc = RuleDoc {
    id: "BC002",
    name: "input-removed",
    default_severity: Severity::Error,
    description: "An input variable was removed. Callers that still set it fail with an \
                  unsupported argument error.",
    example: "- variable \"instance_count\" { type = number }",
    remediation: "Keep the variable (optionally marked deprecated in its description) until \
                  callers have migrated, or ship the removal in a major version.",
};

impl Rule for InputRemoved {
    fn doc(&self) -> &'static RuleDoc {
        &INPUT_REMOVED
    }

    fn evaluate(
        &self,
        old: &ModuleSnapshot,
        new: &ModuleSnapshot,
        _ctx: &EvalContext,
    ) -> Vec<Finding> {
        old.variables
            .iter()
            .filter(|(name, _)| !new.variables.contains_key(*name))
            .map(|(name, var)| {
                let kind = if var.required { "required" } else { "optional" };
                Finding::from_rule(self.doc(), format!("input \"{name}\" was removed"))
                    .with_detail(format!("the input was {kind}"))
                    .with_subject(name)
                    .with_old_location(&var.location)
            })
            .collect()
    }
}

/// BC004: an input's type changed in a way callers can observe.
///
/// Going from unconstrained to a specific type is treated as safe narrowing.
/// Going from a specific type to unconstrained is reported, since the module
/// body can no longer rely on conversions callers were used to.
pub struct InputTypeChanged;

static INPUT_TYPE_CHANGED: RuleDoc = RuleDoc {
    id: "BC004",
    name: "input-type-changed",
    default_severity: Severity::Error,
    description: "The type constraint of an input variable changed. Values that were valid \
                  before may be rejected or converted differently.",
    example: "variable \"ports\" { type = list(number) } -> { type = list(string) }",
    remediation: "Introduce a new variable with the new type and keep the old one working.",
};

impl Rule for InputTypeChanged {
    fn doc(&self) -> &'static RuleDoc {
        &INPUT_TYPE_CHANGED
    }

    fn evaluate(
        &self,
        old: &ModuleSnapshot,
        new: &ModuleSnapshot,
        _ctx: &EvalContext,
    ) -> Vec<Finding> {
        common_variables(old, new)
            .filter(|(o, n)| {
                if o.is_unconstrained() {
                    return false;
                }
                n.is_unconstrained() || o.normalized_type() != n.normalized_type()
            })
            .map(|(o, n)| {
                Finding::from_rule(
                    self.doc(),
                    format!("type of input \"{}\" changed", o.name),
                )
                .with_detail(format!("{} -> {}", display_type(o), display_type(n)))
                .with_subject(&o.name)
                .with_old_location(&o.location)
                .with_new_location(&n.location)
            })
            .collect()
    }
}

/// BC005: an optional input became required.
pub struct InputDefaultRemoved;

static INPUT_DEFAULT_REMOVED: RuleDoc = RuleDoc {
    id: "BC005",
    name: "input-default-removed",
    default_severity: Severity::Error,
    description: "An input variable lost its default value. Callers that relied on the \
                  default must now set it explicitly.",
    example: "variable \"size\" { default = \"small\" } -> variable \"size\" {}",
    remediation: "Restore the default value.",
};

impl Rule for InputDefaultRemoved {
    fn doc(&self) -> &'static RuleDoc {
        &INPUT_DEFAULT_REMOVED
    }

    fn evaluate(
        &self,
        old: &ModuleSnapshot,
        new: &ModuleSnapshot,
        _ctx: &EvalContext,
    ) -> Vec<Finding> {
        common_variables(old, new)
            .filter(|(o, n)| !o.required && n.required)
            .map(|(o, n)| {
                Finding::from_rule(
                    self.doc(),
                    format!("input \"{}\" no longer has a default", o.name),
                )
                .with_subject(&o.name)
                .with_old_location(&o.location)
                .with_new_location(&n.location)
            })
            .collect()
    }
}

/// RC006: a default value changed.
pub struct InputDefaultChanged;

static INPUT_DEFAULT_CHANGED: RuleDoc = RuleDoc {
    id: "RC006",
    name: "input-default-changed",
    default_severity: Severity::Warning,
    description: "The default value of an input variable changed. Callers that do not set \
                  the variable silently get different infrastructure.",
    example: "default = \"t3.micro\" -> default = \"t3.small\"",
    remediation: "Call the change out in release notes, or keep the old default.",
};

impl Rule for InputDefaultChanged {
    fn doc(&self) -> &'static RuleDoc {
        &INPUT_DEFAULT_CHANGED
    }

    fn evaluate(
        &self,
        old: &ModuleSnapshot,
        new: &ModuleSnapshot,
        _ctx: &EvalContext,
    ) -> Vec<Finding> {
        common_variables(old, new)
            .filter_map(|(o, n)| match (&o.default, &n.default) {
                (Some(before), Some(after)) if before != after => Some((o, n, before, after)),
                _ => None,
            })
            .map(|(o, n, before, after)| {
                Finding::from_rule(
                    self.doc(),
                    format!("default of input \"{}\" changed", o.name),
                )
                .with_detail(format!("{before} -> {after}"))
                .with_subject(&o.name)
                .with_old_location(&o.location)
                .with_new_location(&n.location)
            })
            .collect()
    }
}

/// RC007: an input stopped accepting `null`.
pub struct InputNullableChanged;

static INPUT_NULLABLE_CHANGED: RuleDoc = RuleDoc {
    id: "RC007",
    name: "input-nullable-changed",
    default_severity: Severity::Warning,
    description: "An input variable became non-nullable. Callers passing null now get the \
                  default (or an error when there is none) instead of null.",
    example: "variable \"name\" {} -> variable \"name\" { nullable = false }",
    remediation: "Leave nullable unset (or true) until callers stop passing null.",
};

impl Rule for InputNullableChanged {
    fn doc(&self) -> &'static RuleDoc {
        &INPUT_NULLABLE_CHANGED
    }

    fn evaluate(
        &self,
        old: &ModuleSnapshot,
        new: &ModuleSnapshot,
        _ctx: &EvalContext,
    ) -> Vec<Finding> {
        common_variables(old, new)
            .filter(|(o, n)| o.is_nullable() && !n.is_nullable())
            .map(|(o, n)| {
                Finding::from_rule(
                    self.doc(),
                    format!("input \"{}\" no longer accepts null", o.name),
                )
                .with_subject(&o.name)
                .with_old_location(&o.location)
                .with_new_location(&n.location)
            })
            .collect()
    }
}

/// RC008: an input became sensitive.
pub struct InputSensitiveChanged;

static INPUT_SENSITIVE_CHANGED: RuleDoc = RuleDoc {
    id: "RC008",
    name: "input-sensitive-changed",
    default_severity: Severity::Warning,
    description: "An input variable was marked sensitive. Anything derived from it becomes \
                  sensitive too, which can break outputs that are not marked sensitive.",
    example: "variable \"token\" {} -> variable \"token\" { sensitive = true }",
    remediation: "Mark dependent outputs sensitive in the same release and call it out.",
};

impl Rule for InputSensitiveChanged {
    fn doc(&self) -> &'static RuleDoc {
        &INPUT_SENSITIVE_CHANGED
    }

    fn evaluate(
        &self,
        old: &ModuleSnapshot,
        new: &ModuleSnapshot,
        _ctx: &EvalContext,
    ) -> Vec<Finding> {
        common_variables(old, new)
            .filter(|(o, n)| !o.sensitive && n.sensitive)
            .map(|(o, n)| {
                Finding::from_rule(
                    self.doc(),
                    format!("input \"{}\" is now sensitive", o.name),
                )
                .with_subject(&o.name)
                .with_old_location(&o.location)
                .with_new_location(&n.location)
            })
            .collect()
    }
}

/// RC013: more validation blocks than before.
pub struct InputValidationAdded;

static INPUT_VALIDATION_ADDED: RuleDoc = RuleDoc {
    id: "RC013",
    name: "input-validation-added",
    default_severity: Severity::Warning,
    description: "An input variable gained validation blocks. Values accepted before may now \
                  be rejected.",
    example: "+ validation { condition = length(var.name) < 32 }",
    remediation: "Check that every value callers use today still passes the new validation.",
};

impl Rule for InputValidationAdded {
    fn doc(&self) -> &'static RuleDoc {
        &INPUT_VALIDATION_ADDED
    }

    fn evaluate(
        &self,
        old: &ModuleSnapshot,
        new: &ModuleSnapshot,
        _ctx: &EvalContext,
    ) -> Vec<Finding> {
        common_variables(old, new)
            .filter(|(o, n)| n.validation_count > o.validation_count)
            .map(|(o, n)| {
                let added = n.validation_count - o.validation_count;
                Finding::from_rule(
                    self.doc(),
                    format!(
                        "input \"{}\" has {added} new validation block{}",
                        o.name,
                        if added == 1 { "" } else { "s" }
                    ),
                )
                .with_detail(format!("{} -> {}", o.validation_count, n.validation_count))
                .with_subject(&o.name)
                .with_old_location(&o.location)
                .with_new_location(&n.location)
            })
            .collect()
    }
}

/// RC014: a literal allowed value disappeared from a `contains([...])` validation.
pub struct InputValidationValueRemoved;

static INPUT_VALIDATION_VALUE_REMOVED: RuleDoc = RuleDoc {
    id: "RC014",
    name: "input-validation-value-removed",
    default_severity: Severity::Warning,
    description: "A value was removed from the literal allow-list of an input validation. \
                  Callers using that value are now rejected.",
    example: "contains([\"dev\", \"prod\"], var.env) -> contains([\"prod\"], var.env)",
    remediation: "Keep accepting the removed value until callers have migrated.",
};

fn literal_patterns(var: &VariableSignature) -> Vec<LiteralListPattern> {
    var.validations
        .iter()
        .filter_map(|v| v.condition.as_deref())
        .filter_map(LiteralListPattern::parse)
        .collect()
}

impl Rule for InputValidationValueRemoved {
    fn doc(&self) -> &'static RuleDoc {
        &INPUT_VALIDATION_VALUE_REMOVED
    }

    fn evaluate(
        &self,
        old: &ModuleSnapshot,
        new: &ModuleSnapshot,
        _ctx: &EvalContext,
    ) -> Vec<Finding> {
        let mut findings = Vec::new();
        for (o, n) in common_variables(old, new) {
            let new_patterns = literal_patterns(n);
            for old_pattern in literal_patterns(o) {
                let counterpart = new_patterns
                    .iter()
                    .find(|p| p.reference == old_pattern.reference);
                let removed = find_removed_values(Some(&old_pattern), counterpart);
                if removed.is_empty() {
                    continue;
                }
                let quoted: Vec<String> = removed.iter().map(|v| format!("\"{v}\"")).collect();
                findings.push(
                    Finding::from_rule(
                        self.doc(),
                        format!(
                            "input \"{}\" no longer allows {}",
                            o.name,
                            quoted.join(", ")
                        ),
                    )
                    .with_detail(format!("validation on var.{}", old_pattern.reference))
                    .with_subject(&o.name)
                    .with_metadata("removed_values", removed.join(","))
                    .with_old_location(&o.location)
                    .with_new_location(&n.location),
                );
            }
        }
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(vars: Vec<VariableSignature>) -> ModuleSnapshot {
        vars.into_iter()
            .fold(ModuleSnapshot::new("m"), ModuleSnapshot::with_variable)
    }

    fn run(rule: &dyn Rule, old: &ModuleSnapshot, new: &ModuleSnapshot) -> Vec<Finding> {
        rule.evaluate(old, new, &EvalContext::default())
    }

    #[test]
    fn test_required_input_added_flags_new_required_variable() {
        let old = snapshot(vec![]);
        let new = snapshot(vec![VariableSignature::new("region").with_type("string")]);

        let findings = run(&RequiredInputAdded, &old, &new);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "BC001");
        assert_eq!(findings[0].subject.as_deref(), Some("region"));
        assert_eq!(findings[0].severity, Severity::Error);
    }

    #[test]
    fn test_required_input_added_ignores_variable_with_default() {
        let old = snapshot(vec![]);
        let new = snapshot(vec![VariableSignature::new("region").with_default(json!("eu-west-1"))]);
        assert!(run(&RequiredInputAdded, &old, &new).is_empty());
    }

    #[test]
    fn test_required_input_added_ignores_existing_variable() {
        let both = snapshot(vec![VariableSignature::new("region")]);
        assert!(run(&RequiredInputAdded, &both, &both).is_empty());
    }

    #[test]
    fn test_input_removed_reports_each_removed_variable_in_name_order() {
        let old = snapshot(vec![
            VariableSignature::new("zone"),
            VariableSignature::new("az").with_default(json!("a")),
            VariableSignature::new("kept"),
        ]);
        let new = snapshot(vec![VariableSignature::new("kept")]);

        let findings = run(&InputRemoved, &old, &new);
        let subjects: Vec<_> = findings.iter().filter_map(|f| f.subject.as_deref()).collect();
        assert_eq!(subjects, vec!["az", "zone"]);
        assert_eq!(findings[0].detail.as_deref(), Some("the input was optional"));
    }

    #[test]
    fn test_type_change_narrowing_from_any_is_safe() {
        let old = snapshot(vec![VariableSignature::new("x").with_type("any")]);
        let new = snapshot(vec![VariableSignature::new("x").with_type("string")]);
        assert!(run(&InputTypeChanged, &old, &new).is_empty());
    }

    #[test]
    fn test_type_change_widening_to_any_is_breaking() {
        let old = snapshot(vec![VariableSignature::new("x").with_type("string")]);
        let new = snapshot(vec![VariableSignature::new("x").with_type("any")]);

        let findings = run(&InputTypeChanged, &old, &new);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].detail.as_deref(), Some("string -> any"));
    }

    #[test]
    fn test_type_change_between_specific_types() {
        let old = snapshot(vec![VariableSignature::new("p").with_type("list(number)")]);
        let new = snapshot(vec![VariableSignature::new("p").with_type("list(string)")]);
        assert_eq!(run(&InputTypeChanged, &old, &new).len(), 1);
    }

    #[test]
    fn test_type_change_empty_and_any_are_equivalent() {
        let old = snapshot(vec![VariableSignature::new("x")]);
        let new = snapshot(vec![VariableSignature::new("x").with_type("any")]);
        assert!(run(&InputTypeChanged, &old, &new).is_empty());
        assert!(run(&InputTypeChanged, &new, &old).is_empty());
    }

    #[test]
    fn test_type_change_ignores_whitespace_only_differences() {
        let old = snapshot(vec![VariableSignature::new("m").with_type("map( string )")]);
        let new = snapshot(vec![VariableSignature::new("m").with_type("map(  string )")]);
        assert!(run(&InputTypeChanged, &old, &new).is_empty());
    }

    #[test]
    fn test_default_removed() {
        let old = snapshot(vec![VariableSignature::new("size").with_default(json!("small"))]);
        let new = snapshot(vec![VariableSignature::new("size")]);
        let findings = run(&InputDefaultRemoved, &old, &new);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "BC005");
        assert!(run(&InputDefaultRemoved, &new, &old).is_empty());
    }

    #[test]
    fn test_default_changed_compares_structurally() {
        let old = snapshot(vec![
            VariableSignature::new("tags").with_default(json!({"a": 1, "b": 2})),
        ]);
        let same = snapshot(vec![
            VariableSignature::new("tags").with_default(json!({"b": 2, "a": 1})),
        ]);
        let changed = snapshot(vec![VariableSignature::new("tags").with_default(json!({"a": 1}))]);

        assert!(run(&InputDefaultChanged, &old, &same).is_empty());
        let findings = run(&InputDefaultChanged, &old, &changed);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].detail.as_deref(), Some(r#"{"a":1,"b":2} -> {"a":1}"#));
    }

    #[test]
    fn test_default_changed_skips_when_default_removed() {
        let old = snapshot(vec![VariableSignature::new("x").with_default(json!(1))]);
        let new = snapshot(vec![VariableSignature::new("x")]);
        assert!(run(&InputDefaultChanged, &old, &new).is_empty());
    }

    #[test]
    fn test_nullable_unset_behaves_like_true() {
        let unset = snapshot(vec![VariableSignature::new("x")]);
        let explicit_true = snapshot(vec![VariableSignature::new("x").with_nullable(true)]);
        let non_null = snapshot(vec![VariableSignature::new("x").with_nullable(false)]);

        assert!(run(&InputNullableChanged, &unset, &explicit_true).is_empty());
        assert_eq!(run(&InputNullableChanged, &unset, &non_null).len(), 1);
        assert!(
            run(&InputNullableChanged, &non_null, &unset).is_empty(),
            "accepting null again is not risky"
        );
    }

    #[test]
    fn test_sensitive_changed_only_when_becoming_sensitive() {
        let plain = snapshot(vec![VariableSignature::new("token")]);
        let secret = snapshot(vec![VariableSignature::new("token").with_sensitive(true)]);
        assert_eq!(run(&InputSensitiveChanged, &plain, &secret).len(), 1);
        assert!(run(&InputSensitiveChanged, &secret, &plain).is_empty());
    }

    #[test]
    fn test_validation_added_counts_blocks() {
        let old = snapshot(vec![VariableSignature::new("name")]);
        let new = snapshot(vec![
            VariableSignature::new("name")
                .with_validation("length(var.name) < 32")
                .with_validation("can(regex(\"^a\", var.name))"),
        ]);
        let findings = run(&InputValidationAdded, &old, &new);
        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].message,
            "input \"name\" has 2 new validation blocks"
        );
        assert!(run(&InputValidationAdded, &new, &old).is_empty());
    }

    #[test]
    fn test_validation_value_removed() {
        let old = snapshot(vec![VariableSignature::new("environment").with_validation(
            r#"contains(["dev", "staging", "prod"], var.environment)"#,
        )]);
        let new = snapshot(vec![
            VariableSignature::new("environment")
                .with_validation(r#"contains(["dev", "prod"], var.environment)"#),
        ]);

        let findings = run(&InputValidationValueRemoved, &old, &new);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].meta("removed_values"), Some("staging"));
        assert_eq!(
            findings[0].message,
            "input \"environment\" no longer allows \"staging\""
        );
    }

    #[test]
    fn test_validation_value_removed_declines_dynamic_lists() {
        let old = snapshot(vec![
            VariableSignature::new("env").with_validation(r#"contains(["a", "b"], var.env)"#),
        ]);
        let new = snapshot(vec![
            VariableSignature::new("env").with_validation("contains(var.allowed, var.env)"),
        ]);
        assert!(run(&InputValidationValueRemoved, &old, &new).is_empty());
    }

    #[test]
    fn test_validation_value_added_is_not_reported() {
        let old = snapshot(vec![
            VariableSignature::new("env").with_validation(r#"contains(["a"], var.env)"#),
        ]);
        let new = snapshot(vec![
            VariableSignature::new("env").with_validation(r#"contains(["a", "b"], var.env)"#),
        ]);
        assert!(run(&InputValidationValueRemoved, &old, &new).is_empty());
    }
}
