//! Recompute the denormalized `valid` flag on every node.

use std::collections::HashSet;

use crate::error::Violation;
use crate::parse::types::{Action, WorkflowImport};

/// Set every node's `valid` flag: a node is valid iff no violation is
/// attributed to it. The template is valid iff there are no violations at all.
///
/// Nodes are numbered in walk order, matching `Violation::node`.
pub fn annotate_validity(mut definition: WorkflowImport, violations: &[Violation]) -> WorkflowImport {
    let invalid: HashSet<usize> = violations.iter().filter_map(|v| v.node).collect();

    let Some(template) = definition.template.as_mut() else {
        return definition;
    };
    template.valid = violations.is_empty();

    let trigger = &mut template.trigger;
    trigger.meta.valid = !invalid.contains(&0);

    let mut index = 0;
    let mut pending: Vec<&mut Action> = trigger.next_action.as_deref_mut().into_iter().collect();
    while let Some(action) = pending.pop() {
        index += 1;
        action.meta.valid = !invalid.contains(&index);
        let children = action.children_mut();
        pending.extend(children.into_iter().rev().map(|(_, child)| child));
    }

    definition
}
