use serde_json::{Value, json};
use workflow_import::error::{Violation, ViolationKind};
use workflow_import::validate::ValidationResult;

// =============================================================================
// Documents
// =============================================================================

/// The exported sample: EMPTY trigger → loop { split { branch, code, code } → code } → code.
pub fn sample_workflow() -> Value {
    serde_json::from_str(include_str!("../fixtures/sample_workflow.json"))
        .expect("fixture is valid JSON")
}

/// Wrap a trigger node in a full import document.
pub fn document(trigger: Value) -> Value {
    // Assigned rather than interpolated: `json!` would serialize the trigger recursively.
    let mut doc = json!({
        "name": "Untitled",
        "description": "",
        "tags": [],
        "template": {
            "displayName": "Untitled",
            "valid": false
        }
    });
    doc["template"]["trigger"] = trigger;
    doc
}

/// `linear_document` with `len` generated step names.
pub fn deep_chain_document(len: usize) -> Value {
    let names: Vec<String> = (1..=len).map(|i| format!("step_{}", i)).collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    linear_document(&names)
}

/// The JSON text of `deep_chain_document(len)`, built without a `Value`.
pub fn deep_chain_json(len: usize) -> String {
    let mut json = String::from(
        r#"{"name":"Untitled","description":"","tags":[],"template":{"displayName":"Untitled","valid":false,"trigger":{"name":"trigger","displayName":"Select Trigger","type":"EMPTY","valid":false,"settings":{}"#,
    );
    for i in 1..=len {
        json.push_str(&format!(
            r#","nextAction":{{"name":"step_{}","displayName":"Code step_{}","type":"CODE","valid":true,"settings":{{"input":{{}},"sourceCode":{{"code":"","packageJson":"{{}}"}}}}"#,
            i, i
        ));
    }
    json.push_str(&"}".repeat(len));
    // trigger, template, document
    json.push_str("}}}");
    json
}

/// Run `f` on a thread with std's default 2 MiB worker stack.
pub fn on_small_stack<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
    std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(f)
        .expect("spawn test thread")
        .join()
        .expect("test thread panicked")
}

// =============================================================================
// Node builders
// =============================================================================

pub fn empty_trigger(next: Option<Value>) -> Value {
    let mut trigger = json!({
        "name": "trigger",
        "displayName": "Select Trigger",
        "type": "EMPTY",
        "valid": false,
        "settings": {}
    });
    if let Some(next) = next {
        trigger["nextAction"] = next;
    }
    trigger
}

pub fn code_action(name: &str) -> Value {
    json!({
        "name": name,
        "displayName": format!("Code {}", name),
        "type": "CODE",
        "valid": true,
        "settings": {
            "input": {},
            "sourceCode": {
                "code": "export const code = async (inputs) => { return true; };",
                "packageJson": "{}"
            },
            "inputUiInfo": {},
            "errorHandlingOptions": {
                "retryOnFailure": { "value": false },
                "continueOnFailure": { "value": false }
            }
        }
    })
}

pub fn condition(operator: &str) -> Value {
    json!({
        "operator": operator,
        "firstValue": "{{trigger.body}}",
        "secondValue": "value",
        "caseSensitive": false
    })
}

pub fn branch_action(name: &str, conditions: Value) -> Value {
    json!({
        "name": name,
        "displayName": "Condition",
        "type": "BRANCH",
        "valid": true,
        "settings": {
            "conditions": conditions,
            "inputUiInfo": {}
        }
    })
}

/// A split with one option per id in `option_ids` and one empty branch per id in `branch_ids`.
pub fn split_action(name: &str, option_ids: &[&str], branch_ids: &[&str], default_branch: &str) -> Value {
    let options: Vec<Value> = option_ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            json!({
                "id": id,
                "name": format!("Branch {}", i + 1),
                "conditions": [[condition("TEXT_EXACTLY_MATCHES")]]
            })
        })
        .collect();
    let branches: Vec<Value> = branch_ids
        .iter()
        .map(|id| json!({ "optionId": id }))
        .collect();
    json!({
        "name": name,
        "displayName": "Split",
        "type": "SPLIT",
        "valid": true,
        "branches": branches,
        "settings": {
            "options": options,
            "defaultBranch": default_branch,
            "inputUiInfo": {}
        }
    })
}

pub fn loop_action(name: &str, body: Option<Value>) -> Value {
    let mut action = json!({
        "name": name,
        "displayName": "Loop on Items",
        "type": "LOOP_ON_ITEMS",
        "valid": true,
        "settings": { "items": "{{trigger.items}}", "inputUiInfo": {} }
    });
    if let Some(body) = body {
        action["firstLoopAction"] = body;
    }
    action
}

/// Set `nextAction` on `node` and return it.
pub fn then(mut node: Value, next: Value) -> Value {
    node["nextAction"] = next;
    node
}

/// Linear chain `trigger → names[0] → names[1] → ...` of CODE actions.
pub fn linear_document(names: &[&str]) -> Value {
    let mut next: Option<Value> = None;
    for name in names.iter().rev() {
        let action = code_action(name);
        next = Some(match next {
            Some(n) => then(action, n),
            None => action,
        });
    }
    document(empty_trigger(next))
}

// =============================================================================
// Assertions
// =============================================================================

pub fn assert_has_violation(result: &ValidationResult, kind: ViolationKind) {
    assert!(
        result.violations().iter().any(|v| v.kind == kind),
        "Expected violation {:?}, got: {:?}",
        kind,
        result.violations()
    );
}

pub fn assert_no_violation(result: &ValidationResult, kind: ViolationKind) {
    assert!(
        !result.violations().iter().any(|v| v.kind == kind),
        "Did not expect violation {:?}, but got: {:?}",
        kind,
        result.violations()
    );
}

pub fn violations_of_kind(result: &ValidationResult, kind: ViolationKind) -> Vec<&Violation> {
    result.violations().iter().filter(|v| v.kind == kind).collect()
}
