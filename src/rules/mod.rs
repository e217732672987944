//! Built-in comparison rules.
//!
//! Rule IDs follow one convention: `BC` rules report breaking changes and
//! default to [`Severity::Error`](crate::Severity::Error), `RC` rules report
//! risky changes and default to [`Severity::Warning`](crate::Severity::Warning).
//! The hundreds digit groups the subject: `0xx` inputs and outputs, `1xx`
//! resources, module calls and moved blocks, `2xx` version constraints.

use std::sync::Arc;

use crate::rule::Rule;
use crate::similarity::find_best_match;

pub mod inputs;
pub mod moved;
pub mod outputs;
pub mod rename;
pub mod resources;
pub mod versions;

pub use inputs::{
    InputDefaultChanged, InputDefaultRemoved, InputNullableChanged, InputRemoved,
    InputSensitiveChanged, InputTypeChanged, InputValidationAdded, InputValidationValueRemoved,
    RequiredInputAdded,
};
pub use moved::{ConflictingMovedBlocks, InvalidMovedBlock};
pub use outputs::{OutputRemoved, OutputSensitiveChanged};
pub use rename::{InputRenamed, InputRenamedOptional, OutputRenamed};
pub use resources::{
    ModuleRemovedWithoutMoved, ModuleSourceChanged, ModuleVersionChanged,
    ResourceRemovedWithoutMoved,
};
pub use versions::{
    ProviderConstraintAdded, ProviderConstraintChanged, ProviderSourceChanged,
    RequiredVersionAdded, RequiredVersionChanged,
};

/// Every built-in rule, in registration (and therefore output) order.
#[must_use]
pub fn builtin_rules() -> Vec<Arc<dyn Rule>> {
    vec![
        Arc::new(RequiredInputAdded),
        Arc::new(InputRemoved),
        Arc::new(InputRenamed),
        Arc::new(InputRenamedOptional),
        Arc::new(InputTypeChanged),
        Arc::new(InputDefaultRemoved),
        Arc::new(InputDefaultChanged),
        Arc::new(InputNullableChanged),
        Arc::new(InputSensitiveChanged),
        Arc::new(OutputRemoved),
        Arc::new(OutputRenamed),
        Arc::new(OutputSensitiveChanged),
        Arc::new(InputValidationAdded),
        Arc::new(InputValidationValueRemoved),
        Arc::new(ResourceRemovedWithoutMoved),
        Arc::new(ModuleRemovedWithoutMoved),
        Arc::new(InvalidMovedBlock),
        Arc::new(ConflictingMovedBlocks),
        Arc::new(ModuleSourceChanged),
        Arc::new(ModuleVersionChanged),
        Arc::new(RequiredVersionAdded),
        Arc::new(RequiredVersionChanged),
        Arc::new(ProviderConstraintAdded),
        Arc::new(ProviderConstraintChanged),
        Arc::new(ProviderSourceChanged),
    ]
}

/// One removed name paired with the added name it most likely became.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RenamePair<'a> {
    pub old: &'a str,
    pub new: &'a str,
    pub score: f64,
}

/// Greedy one-to-one rename matching.
///
/// `removed` is visited in the order given (callers pass sorted map keys) and
/// each match consumes its candidate, so no added name is paired twice.
pub(crate) fn match_renames<'a>(
    removed: impl IntoIterator<Item = &'a str>,
    added: impl IntoIterator<Item = &'a str>,
    threshold: f64,
) -> Vec<RenamePair<'a>> {
    let mut remaining: Vec<&'a str> = added.into_iter().collect();
    let mut pairs = Vec::new();

    for old in removed {
        if remaining.is_empty() {
            break;
        }
        if let Some(best) = find_best_match(old, remaining.iter().copied(), threshold) {
            tracing::trace!(old, new = best.candidate, score = best.score, "Matched rename");
            remaining.retain(|c| *c != best.candidate);
            pairs.push(RenamePair {
                old,
                new: best.candidate,
                score: best.score,
            });
        }
    }

    pairs
}
