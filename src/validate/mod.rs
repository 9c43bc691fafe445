//! Validation phase: decode → walk → check → aggregate.

pub mod annotate;
pub mod node_rules;
pub mod structural;

pub use annotate::annotate_validity;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{DecodeError, Violation};
use crate::options::ValidationOptions;
use crate::parse::{self, WorkflowImport};
use crate::walk;

/// Verdict for one document. `errors` is absent on success and non-empty on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<Violation>>,
}

impl ValidationResult {
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        if violations.is_empty() {
            ValidationResult {
                success: true,
                errors: None,
            }
        } else {
            ValidationResult {
                success: false,
                errors: Some(violations),
            }
        }
    }

    pub fn violations(&self) -> &[Violation] {
        self.errors.as_deref().unwrap_or_default()
    }
}

/// Validate an untyped import document with default options.
pub fn validate_workflow_import(document: &Value) -> ValidationResult {
    validate_workflow_import_with(document, &ValidationOptions::default())
}

#[instrument(skip_all, fields(max_depth = options.max_depth))]
pub fn validate_workflow_import_with(document: &Value, options: &ValidationOptions) -> ValidationResult {
    let violations = match parse::decode(document, options) {
        Ok(definition) => validate_definition(&definition, options).unwrap_or_else(|e| vec![e.into()]),
        Err(e) => {
            debug!(path = %e.path, reason = %e.reason, "document failed to decode");
            vec![e.into()]
        }
    };
    let result = ValidationResult::from_violations(violations);
    debug!(
        success = result.success,
        violations = result.violations().len(),
        "validated workflow import"
    );
    result
}

/// Validate a JSON string. Malformed JSON is a single decode violation.
/// Nesting is bounded only by `options.max_depth`.
pub fn validate_json(json: &str, options: &ValidationOptions) -> ValidationResult {
    match parse::read_document(json) {
        Ok(document) => {
            let result = validate_workflow_import_with(&document, options);
            parse::drop_document(document);
            result
        }
        Err(e) => ValidationResult::from_violations(vec![e.into()]),
    }
}

/// Check an already decoded definition. Only walker failures are returned as `Err`;
/// semantic violations are collected in walk order, then the whole-tree ones.
pub fn validate_definition(
    definition: &WorkflowImport,
    options: &ValidationOptions,
) -> Result<Vec<Violation>, DecodeError> {
    let Some(template) = &definition.template else {
        return Ok(vec![Violation::template_required()]);
    };

    let walk = walk::walk(&template.trigger, options)?;

    let mut violations = Vec::new();
    for (i, visit) in walk.visits.iter().enumerate() {
        let Some(action) = visit.node.as_action() else {
            continue;
        };
        let found = node_rules::check_node(action, options);
        if found.is_empty() {
            continue;
        }
        let node_path = walk.path(i);
        violations.extend(found.into_iter().map(|v| v.under(&node_path).with_node(i)));
    }
    violations.extend(structural::check_tree(&walk));

    debug!(
        nodes = walk.visits.len(),
        violations = violations.len(),
        "checked workflow tree"
    );
    Ok(violations)
}
