//! Consistency checks over `moved` declarations of the new snapshot.
//!
//! [`InvalidMovedBlock`] looks at one declaration at a time.
//! [`ConflictingMovedBlocks`] looks at the declarations as a graph `from -> to`
//! and runs three independent checks (duplicate sources, cycles, dangling
//! targets), tagging each finding with a `check` metadata entry.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::finding::{Finding, Severity};
use crate::rule::{EvalContext, Rule, RuleDoc};
use crate::snapshot::{AddressKind, ModuleSnapshot, MovedBlock};

/// Metadata key naming which graph check produced a BC103 finding.
pub const META_CHECK: &str = "check";

/// BC102: a declaration that cannot be valid on its own.
pub struct InvalidMovedBlock;

static INVALID_MOVED_BLOCK: RuleDoc = RuleDoc {
    id: "BC102",
    name: "invalid-moved-block",
    default_severity: Severity::Error,
    description: "A moved block has an address that is neither a resource nor a module \
                  address, or moves a resource into a module address (or the reverse). \
                  The plan fails.",
    example: "moved { from = aws_s3_bucket.logs to = module.logs }",
    remediation: "Use `type.name` on both sides for resources and `module.name` on both \
                  sides for module calls.",
};

impl Rule for InvalidMovedBlock {
    fn doc(&self) -> &'static RuleDoc {
        &INVALID_MOVED_BLOCK
    }

    fn evaluate(
        &self,
        _old: &ModuleSnapshot,
        new: &ModuleSnapshot,
        _ctx: &EvalContext,
    ) -> Vec<Finding> {
        new.moved_blocks
            .iter()
            .filter_map(|moved| {
                let from = AddressKind::of(&moved.from);
                let to = AddressKind::of(&moved.to);
                let problem = if from == AddressKind::Malformed {
                    format!("source \"{}\" is not a valid address", moved.from)
                } else if to == AddressKind::Malformed {
                    format!("target \"{}\" is not a valid address", moved.to)
                } else if from != to {
                    format!(
                        "moves a {} address to a {} address",
                        from.label(),
                        to.label()
                    )
                } else {
                    return None;
                };
                Some(
                    Finding::from_rule(
                        self.doc(),
                        format!(
                            "moved block \"{}\" -> \"{}\" is invalid",
                            moved.from, moved.to
                        ),
                    )
                    .with_detail(problem)
                    .with_subject(&moved.from)
                    .with_new_location(&moved.location),
                )
            })
            .collect()
    }
}

/// BC103: declarations that contradict each other or the new snapshot.
pub struct ConflictingMovedBlocks;

static CONFLICTING_MOVED_BLOCKS: RuleDoc = RuleDoc {
    id: "BC103",
    name: "conflicting-moved-blocks",
    default_severity: Severity::Error,
    description: "Moved blocks conflict: the same source is moved twice, the moves form a \
                  cycle, or a target address does not exist in the new version.",
    example: "moved { from = a.x to = a.y }\nmoved { from = a.y to = a.x }",
    remediation: "Keep exactly one moved block per source, make the chain end at a declared \
                  address, and remove cyclic moves.",
};

impl ConflictingMovedBlocks {
    fn duplicates(&self, blocks: &[MovedBlock]) -> Vec<Finding> {
        let mut seen: HashMap<&str, &MovedBlock> = HashMap::new();
        let mut findings = Vec::new();
        for moved in blocks {
            match seen.get(moved.from.as_str()) {
                Some(first) => findings.push(
                    Finding::from_rule(
                        self.doc(),
                        format!("\"{}\" is moved more than once", moved.from),
                    )
                    .with_detail(format!(
                        "first moved to \"{}\", then to \"{}\"",
                        first.to, moved.to
                    ))
                    .with_subject(&moved.from)
                    .with_metadata(META_CHECK, "duplicate")
                    .with_new_location(&moved.location),
                ),
                None => {
                    seen.insert(&moved.from, moved);
                }
            }
        }
        findings
    }

    fn cycles(&self, blocks: &[MovedBlock]) -> Vec<Finding> {
        // First declaration per source wins; later ones are duplicates.
        let mut edges: HashMap<&str, &MovedBlock> = HashMap::new();
        for moved in blocks {
            edges.entry(moved.from.as_str()).or_insert(moved);
        }

        let mut reported: HashSet<&str> = HashSet::new();
        let mut findings = Vec::new();
        for start in blocks {
            let mut path: Vec<&str> = Vec::new();
            let mut on_path: HashSet<&str> = HashSet::new();
            let mut node = start.from.as_str();

            while let Some(edge) = edges.get(node) {
                if !on_path.insert(node) {
                    break;
                }
                path.push(node);
                node = edge.to.as_str();
            }
            if !on_path.contains(node) || !reported.insert(node) {
                continue;
            }

            let cycle_start = path.iter().position(|n| *n == node).unwrap_or_default();
            let mut chain: Vec<&str> = path[cycle_start..].to_vec();
            chain.push(node);
            reported.extend(path[cycle_start..].iter().copied());

            let mut finding = Finding::from_rule(
                self.doc(),
                format!("moved blocks form a cycle through \"{node}\""),
            )
            .with_detail(chain.join(" -> "))
            .with_subject(node)
            .with_metadata(META_CHECK, "cycle");
            if let Some(edge) = edges.get(node) {
                finding = finding.with_new_location(&edge.location);
            }
            findings.push(finding);
        }
        findings
    }

    fn dangling(&self, blocks: &[MovedBlock], new: &ModuleSnapshot) -> Vec<Finding> {
        let module_addresses: BTreeSet<String> = new
            .module_calls
            .keys()
            .map(|name| format!("module.{name}"))
            .collect();

        blocks
            .iter()
            .filter(|moved| match AddressKind::of(&moved.to) {
                AddressKind::Resource => !new.resources.contains_key(&moved.to),
                AddressKind::Module => !module_addresses.contains(&moved.to),
                AddressKind::Malformed => false,
            })
            .map(|moved| {
                Finding::from_rule(
                    self.doc(),
                    format!("moved target \"{}\" does not exist", moved.to),
                )
                .with_detail(format!("moved from \"{}\"", moved.from))
                .with_subject(&moved.to)
                .with_metadata(META_CHECK, "dangling")
                .with_new_location(&moved.location)
            })
            .collect()
    }
}

impl Rule for ConflictingMovedBlocks {
    fn doc(&self) -> &'static RuleDoc {
        &CONFLICTING_MOVED_BLOCKS
    }

    fn evaluate(
        &self,
        _old: &ModuleSnapshot,
        new: &ModuleSnapshot,
        _ctx: &EvalContext,
    ) -> Vec<Finding> {
        let blocks = &new.moved_blocks;
        if blocks.is_empty() {
            return Vec::new();
        }
        let mut findings = self.duplicates(blocks);
        findings.extend(self.cycles(blocks));
        findings.extend(self.dangling(blocks, new));
        findings
    }
}
