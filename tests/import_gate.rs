//! Integration tests for the import gate and validity annotation.

#[allow(dead_code)]
mod helpers;

use helpers::*;
use serde_json::json;
use workflow_import::error::ViolationKind;
use workflow_import::import::{DefinitionStore, ImportError, import_definition};
use workflow_import::options::ValidationOptions;
use workflow_import::parse::{self, Action, ActionKind, WorkflowImport};
use workflow_import::validate::{annotate_validity, validate_definition};

#[derive(Debug, thiserror::Error)]
#[error("store is read-only")]
struct ReadOnly;

#[derive(Default)]
struct MemoryStore {
    saved: Vec<WorkflowImport>,
    read_only: bool,
}

impl DefinitionStore for MemoryStore {
    type Id = usize;
    type Error = ReadOnly;

    fn save(&mut self, definition: WorkflowImport) -> Result<usize, ReadOnly> {
        if self.read_only {
            return Err(ReadOnly);
        }
        self.saved.push(definition);
        Ok(self.saved.len() - 1)
    }
}

/// Collect `(name, valid)` for every action reachable from `action`, pre-order.
fn action_flags(action: &Action, out: &mut Vec<(String, bool)>) {
    out.push((action.meta.name.clone(), action.meta.valid));
    match &action.kind {
        ActionKind::Branch {
            on_success_action,
            on_failure_action,
            ..
        } => {
            for child in [on_success_action, on_failure_action].into_iter().flatten() {
                action_flags(child, out);
            }
        }
        ActionKind::Split { branches, .. } => {
            for child in branches.iter().filter_map(|b| b.next_action.as_deref()) {
                action_flags(child, out);
            }
        }
        ActionKind::LoopOnItems {
            first_loop_action, ..
        } => {
            if let Some(child) = first_loop_action {
                action_flags(child, out);
            }
        }
        ActionKind::Code { .. } | ActionKind::Block { .. } => {}
    }
    if let Some(next) = &action.next_action {
        action_flags(next, out);
    }
}

fn flags(definition: &WorkflowImport) -> Vec<(String, bool)> {
    let trigger = &definition.template.as_ref().unwrap().trigger;
    let mut out = vec![(trigger.meta.name.clone(), trigger.meta.valid)];
    if let Some(next) = &trigger.next_action {
        action_flags(next, &mut out);
    }
    out
}

#[test]
fn valid_document_is_saved_with_fresh_flags() {
    let mut store = MemoryStore::default();
    let id = import_definition(&mut store, &sample_workflow(), &ValidationOptions::default())
        .expect("Should import");
    assert_eq!(id, 0);
    assert_eq!(store.saved.len(), 1);

    // The fixture ships `valid: false` on the trigger and template.
    let saved = &store.saved[0];
    assert!(saved.template.as_ref().unwrap().valid);
    let all = flags(saved);
    assert_eq!(all.len(), 11);
    assert!(all.iter().all(|(_, valid)| *valid), "{:?}", all);
}

#[test]
fn invalid_document_never_reaches_the_store() {
    let mut store = MemoryStore::default();
    let err = import_definition(
        &mut store,
        &linear_document(&["step_1", "step_1"]),
        &ValidationOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ImportError::Rejected { .. }));
    assert_eq!(err.violations()[0].kind, ViolationKind::DuplicateName);
    assert_eq!(err.to_string(), "workflow rejected with 1 violation(s)");
    assert!(store.saved.is_empty());
}

#[test]
fn rejected_import_returns_the_flagged_definition() {
    let mut store = MemoryStore::default();
    let err = import_definition(
        &mut store,
        &linear_document(&["step_1", "step_2", "step_1"]),
        &ValidationOptions::default(),
    )
    .unwrap_err();
    let definition = match err {
        ImportError::Rejected {
            definition: Some(definition),
            ..
        } => definition,
        other => panic!("expected a rejected definition, got {:?}", other),
    };
    assert!(!definition.template.as_ref().unwrap().valid);
    assert_eq!(
        flags(&definition),
        [
            ("trigger".to_string(), true),
            ("step_1".to_string(), true),
            ("step_2".to_string(), true),
            ("step_1".to_string(), false),
        ]
    );
    assert!(store.saved.is_empty());
}

#[test]
fn undecodable_document_is_rejected() {
    let mut store = MemoryStore::default();
    let mut doc = linear_document(&["step_1"]);
    doc["template"]["trigger"]["nextAction"]["type"] = json!(42);
    let err = import_definition(&mut store, &doc, &ValidationOptions::default()).unwrap_err();
    assert_eq!(err.violations().len(), 1);
    assert_eq!(err.violations()[0].kind, ViolationKind::Decode);
    assert!(matches!(
        err,
        ImportError::Rejected {
            definition: None,
            ..
        }
    ));
    assert!(store.saved.is_empty());
}

#[test]
fn missing_template_is_rejected() {
    let mut store = MemoryStore::default();
    let mut doc = sample_workflow();
    doc["template"] = json!({});
    let err = import_definition(&mut store, &doc, &ValidationOptions::default()).unwrap_err();
    assert_eq!(err.violations()[0].kind, ViolationKind::TemplateRequired);
    assert!(store.saved.is_empty());
}

#[test]
fn store_failure_is_surfaced() {
    let mut store = MemoryStore {
        read_only: true,
        ..MemoryStore::default()
    };
    let err = import_definition(&mut store, &sample_workflow(), &ValidationOptions::default())
        .unwrap_err();
    assert!(matches!(err, ImportError::Store(ReadOnly)));
    assert!(err.violations().is_empty());
    assert_eq!(err.to_string(), "failed to store workflow: store is read-only");
}

#[test]
fn annotation_marks_only_offending_nodes_invalid() {
    let options = ValidationOptions::default();
    let mut split = split_action("step_2", &["a"], &["a", "X"], "a");
    split["branches"][0]["nextAction"] = code_action("step_3");
    let chain = then(code_action("step_1"), then(split, code_action("step_1")));
    let definition = parse::decode(&document(empty_trigger(Some(chain))), &options).unwrap();

    let violations = validate_definition(&definition, &options).unwrap();
    assert_eq!(violations.len(), 2);

    let annotated = annotate_validity(definition, &violations);
    assert!(!annotated.template.as_ref().unwrap().valid);
    assert_eq!(
        flags(&annotated),
        [
            ("trigger".to_string(), true),
            ("step_1".to_string(), true),
            ("step_2".to_string(), false),
            ("step_3".to_string(), true),
            ("step_1".to_string(), false),
        ]
    );
}
