//! Whole-tree rules (T001–T002), evaluated once the walk is complete.
//! Single parentage needs no rule: the decoded tree owns its children.

use std::collections::HashMap;

use crate::error::{Violation, ViolationKind};
use crate::parse::field_path;
use crate::parse::types::ActionKind;
use crate::walk::Walk;

/// Run all whole-tree rules. Returns all violations found.
pub fn check_tree(walk: &Walk<'_>) -> Vec<Violation> {
    let mut errors = Vec::new();

    t001_unique_names(walk, &mut errors);
    t002_default_branch_is_an_option(walk, &mut errors);

    errors
}

fn t001_unique_names(walk: &Walk<'_>, errors: &mut Vec<Violation>) {
    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    for (i, visit) in walk.visits.iter().enumerate() {
        let name = visit.node.name();
        match first_seen.get(name) {
            Some(&first) => errors.push(
                Violation::new(
                    ViolationKind::DuplicateName,
                    field_path(&walk.path(i), "name"),
                    format!(
                        "step name '{}' is already used by the node at '{}'",
                        name,
                        walk.path(first)
                    ),
                )
                .with_node(i),
            ),
            None => {
                first_seen.insert(name, i);
            }
        }
    }
}

fn t002_default_branch_is_an_option(walk: &Walk<'_>, errors: &mut Vec<Violation>) {
    for (i, visit) in walk.visits.iter().enumerate() {
        let Some(action) = visit.node.as_action() else {
            continue;
        };
        let ActionKind::Split { settings, .. } = &action.kind else {
            continue;
        };
        if !settings.options.iter().any(|o| o.id == settings.default_branch) {
            errors.push(
                Violation::new(
                    ViolationKind::InvalidDefaultBranch,
                    "settings.defaultBranch",
                    format!(
                        "default branch '{}' does not match any option id",
                        settings.default_branch
                    ),
                )
                .under(&walk.path(i))
                .with_node(i),
            );
        }
    }
}
