//! Per-node structural rules, run once for every visited action.
//! Paths are relative to the node; the caller re-roots them.

use std::collections::{HashMap, HashSet};

use crate::error::{Violation, ViolationKind};
use crate::options::ValidationOptions;
use crate::parse::types::*;
use crate::parse::{field_path, index_path};

/// Check a single action. Returns all violations found, in field order.
pub fn check_node(action: &Action, options: &ValidationOptions) -> Vec<Violation> {
    let mut errors = Vec::new();

    match &action.kind {
        ActionKind::Branch { settings, .. } => {
            let conditions_path = "settings.conditions";
            if settings.conditions.is_empty() {
                errors.push(Violation::new(
                    ViolationKind::BranchRequiresCondition,
                    conditions_path,
                    "branch requires at least one condition",
                ));
            }
            check_condition_groups(
                &settings.conditions,
                conditions_path,
                options.reject_empty_condition_groups,
                &mut errors,
            );
        }
        ActionKind::Split { settings, branches } => {
            check_split(settings, branches, options, &mut errors);
        }
        ActionKind::Code { .. } | ActionKind::Block { .. } | ActionKind::LoopOnItems { .. } => {}
    }

    errors
}

fn check_split(
    settings: &SplitSettings,
    branches: &[SplitBranch],
    options: &ValidationOptions,
    errors: &mut Vec<Violation>,
) {
    let options_path = "settings.options";
    let branches_path = "branches";

    if settings.options.is_empty() || branches.is_empty() {
        let path = if settings.options.is_empty() {
            options_path
        } else {
            branches_path
        };
        errors.push(Violation::new(
            ViolationKind::SplitRequiresBranch,
            path,
            "split requires at least one branch",
        ));
    }

    let mut option_ids: HashMap<&str, usize> = HashMap::new();
    for (i, option) in settings.options.iter().enumerate() {
        if let Some(first) = option_ids.get(option.id.as_str()) {
            errors.push(Violation::new(
                ViolationKind::DuplicateOptionId,
                field_path(&index_path(options_path, i), "id"),
                format!(
                    "option id '{}' is already used by {}",
                    option.id,
                    index_path(options_path, *first)
                ),
            ));
        } else {
            option_ids.insert(&option.id, i);
        }
    }

    let mut branch_ids: HashSet<&str> = HashSet::new();
    for (i, branch) in branches.iter().enumerate() {
        let option_id_path = field_path(&index_path(branches_path, i), "optionId");
        if !branch_ids.insert(&branch.option_id) {
            errors.push(Violation::new(
                ViolationKind::DuplicateBranch,
                option_id_path,
                format!("option '{}' has more than one branch", branch.option_id),
            ));
        } else if !option_ids.contains_key(branch.option_id.as_str()) {
            errors.push(Violation::new(
                ViolationKind::UnknownBranchOption,
                option_id_path,
                format!(
                    "branch references option '{}' which is not declared in settings.options",
                    branch.option_id
                ),
            ));
        }
    }

    for (i, option) in settings.options.iter().enumerate() {
        // Duplicated ids were reported above; only judge the first occurrence.
        if option_ids.get(option.id.as_str()) != Some(&i) {
            continue;
        }
        if !branch_ids.contains(option.id.as_str()) {
            errors.push(Violation::new(
                ViolationKind::MissingBranch,
                field_path(&index_path(options_path, i), "id"),
                format!("option '{}' has no matching branch", option.id),
            ));
        }
    }

    for (i, option) in settings.options.iter().enumerate() {
        let conditions_path = field_path(&index_path(options_path, i), "conditions");
        // The default option is the fallback; its conditions never decide dispatch.
        let is_default = option.id == settings.default_branch;
        if option.conditions.is_empty() && !is_default {
            errors.push(Violation::new(
                ViolationKind::OptionRequiresCondition,
                conditions_path.clone(),
                format!("option '{}' requires at least one condition", option.id),
            ));
        }
        check_condition_groups(
            &option.conditions,
            &conditions_path,
            options.reject_empty_condition_groups && !is_default,
            errors,
        );
    }
}

fn check_condition_groups(
    groups: &[Vec<Condition>],
    conditions_path: &str,
    reject_empty_groups: bool,
    errors: &mut Vec<Violation>,
) {
    for (g, group) in groups.iter().enumerate() {
        let group_path = index_path(conditions_path, g);
        if group.is_empty() && reject_empty_groups {
            errors.push(Violation::new(
                ViolationKind::EmptyConditionGroup,
                group_path.clone(),
                "condition group has no conditions",
            ));
        }
        for (a, condition) in group.iter().enumerate() {
            if condition.operator().is_none() {
                errors.push(Violation::new(
                    ViolationKind::UnknownOperator,
                    field_path(&index_path(&group_path, a), "operator"),
                    format!("unknown condition operator '{}'", condition.operator),
                ));
            }
        }
    }
}
