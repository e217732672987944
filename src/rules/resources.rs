//! Rules over managed resources and sub-module calls.

use std::collections::BTreeSet;

use crate::finding::{Finding, Severity};
use crate::rule::{EvalContext, Rule, RuleDoc};
use crate::snapshot::ModuleSnapshot;

fn moved_sources(new: &ModuleSnapshot) -> BTreeSet<&str> {
    new.moved_blocks.iter().map(|m| m.from.as_str()).collect()
}

/// BC100: a resource disappeared and nothing says where it went.
pub struct ResourceRemovedWithoutMoved;

static RESOURCE_REMOVED_WITHOUT_MOVED: RuleDoc = RuleDoc {
    id: "BC100",
    name: "resource-removed-without-moved",
    default_severity: Severity::Error,
    description: "A managed resource was removed or renamed without a moved block. Applying \
                  the new version destroys the existing infrastructure object.",
    example: "- resource \"aws_s3_bucket\" \"logs\" {}\n+ resource \"aws_s3_bucket\" \"log\" {}",
    remediation: "Add `moved { from = <old address> to = <new address> }` when the resource \
                  was renamed, or document the destroy in a major release.",
};

impl Rule for ResourceRemovedWithoutMoved {
    fn doc(&self) -> &'static RuleDoc {
        &RESOURCE_REMOVED_WITHOUT_MOVED
    }

    fn evaluate(
        &self,
        old: &ModuleSnapshot,
        new: &ModuleSnapshot,
        _ctx: &EvalContext,
    ) -> Vec<Finding> {
        let moved = moved_sources(new);
        old.resources
            .iter()
            .filter(|(address, _)| {
                !new.resources.contains_key(*address) && !moved.contains(address.as_str())
            })
            .map(|(address, resource)| {
                Finding::from_rule(
                    self.doc(),
                    format!("resource \"{address}\" was removed without a moved block"),
                )
                .with_detail("the existing object will be destroyed")
                .with_subject(address)
                .with_old_location(&resource.location)
            })
            .collect()
    }
}

/// BC101: a module call disappeared and nothing says where it went.
pub struct ModuleRemovedWithoutMoved;

static MODULE_REMOVED_WITHOUT_MOVED: RuleDoc = RuleDoc {
    id: "BC101",
    name: "module-removed-without-moved",
    default_severity: Severity::Error,
    description: "A module call was removed or renamed without a moved block. Every resource \
                  inside it is destroyed on apply.",
    example: "- module \"network\" {}\n+ module \"net\" {}",
    remediation: "Add `moved { from = module.<old> to = module.<new> }`.",
};

impl Rule for ModuleRemovedWithoutMoved {
    fn doc(&self) -> &'static RuleDoc {
        &MODULE_REMOVED_WITHOUT_MOVED
    }

    fn evaluate(
        &self,
        old: &ModuleSnapshot,
        new: &ModuleSnapshot,
        _ctx: &EvalContext,
    ) -> Vec<Finding> {
        let moved = moved_sources(new);
        old.module_calls
            .iter()
            .filter(|(name, _)| {
                !new.module_calls.contains_key(*name)
                    && !moved.contains(format!("module.{name}").as_str())
            })
            .map(|(name, call)| {
                Finding::from_rule(
                    self.doc(),
                    format!("module \"{name}\" was removed without a moved block"),
                )
                .with_detail("all resources in the module will be destroyed")
                .with_subject(name)
                .with_old_location(&call.location)
            })
            .collect()
    }
}

/// RC104: a module call now points at a different source.
pub struct ModuleSourceChanged;

static MODULE_SOURCE_CHANGED: RuleDoc = RuleDoc {
    id: "RC104",
    name: "module-source-changed",
    default_severity: Severity::Warning,
    description: "The source of a module call changed. The called module may have a \
                  different interface or resource layout.",
    example: "source = \"./modules/vpc\" -> source = \"terraform-aws-modules/vpc/aws\"",
    remediation: "Review the plan for the module call and add moved blocks as needed.",
};

impl Rule for ModuleSourceChanged {
    fn doc(&self) -> &'static RuleDoc {
        &MODULE_SOURCE_CHANGED
    }

    fn evaluate(
        &self,
        old: &ModuleSnapshot,
        new: &ModuleSnapshot,
        _ctx: &EvalContext,
    ) -> Vec<Finding> {
        old.module_calls
            .iter()
            .filter_map(|(name, o)| new.module_calls.get(name).map(|n| (name, o, n)))
            .filter(|(_, o, n)| o.source != n.source)
            .map(|(name, o, n)| {
                Finding::from_rule(
                    self.doc(),
                    format!("source of module \"{name}\" changed"),
                )
                .with_detail(format!("{} -> {}", o.source, n.source))
                .with_subject(name)
                .with_old_location(&o.location)
                .with_new_location(&n.location)
            })
            .collect()
    }
}

/// RC105: a module call's version constraint changed.
///
/// Dropping the constraint entirely only loosens it and is not reported.
pub struct ModuleVersionChanged;

static MODULE_VERSION_CHANGED: RuleDoc = RuleDoc {
    id: "RC105",
    name: "module-version-changed",
    default_severity: Severity::Warning,
    description: "The version constraint of a module call changed. A different release of \
                  the called module may be selected.",
    example: "version = \"~> 4.0\" -> version = \"~> 5.0\"",
    remediation: "Read the called module's changelog for the new version range.",
};

impl Rule for ModuleVersionChanged {
    fn doc(&self) -> &'static RuleDoc {
        &MODULE_VERSION_CHANGED
    }

    fn evaluate(
        &self,
        old: &ModuleSnapshot,
        new: &ModuleSnapshot,
        _ctx: &EvalContext,
    ) -> Vec<Finding> {
        old.module_calls
            .iter()
            .filter_map(|(name, o)| new.module_calls.get(name).map(|n| (name, o, n)))
            .filter(|(_, o, n)| {
                let (before, after) = (o.version.trim(), n.version.trim());
                !after.is_empty() && before != after
            })
            .map(|(name, o, n)| {
                let before = if o.version.trim().is_empty() {
                    "(none)"
                } else {
                    o.version.trim()
                };
                Finding::from_rule(
                    self.doc(),
                    format!("version constraint of module \"{name}\" changed"),
                )
                .with_detail(format!("{before} -> {}", n.version.trim()))
                .with_subject(name)
                .with_old_location(&o.location)
                .with_new_location(&n.location)
            })
            .collect()
    }
}
