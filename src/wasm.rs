//! WASM entry points for browser use.

use wasm_bindgen::prelude::*;

use crate::error::DecodeError;
use crate::options::ValidationOptions;
use crate::validate::{self, ValidationResult};

/// Validate an import document JSON with default options.
/// Returns `{success: true}` or `{success: false, errors: [...]}`.
#[wasm_bindgen]
pub fn validate_workflow_import(json: &str) -> JsValue {
    let result = validate::validate_json(json, &ValidationOptions::default());
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

/// Same as `validate_workflow_import`, with `ValidationOptions` given as JSON.
#[wasm_bindgen]
pub fn validate_workflow_import_with_options(json: &str, options_json: &str) -> JsValue {
    let result = validate_with_options_inner(json, options_json);
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

fn validate_with_options_inner(json: &str, options_json: &str) -> ValidationResult {
    match serde_json::from_str::<ValidationOptions>(options_json) {
        Ok(options) => validate::validate_json(json, &options),
        Err(e) => ValidationResult::from_violations(vec![
            DecodeError::new("", format!("failed to parse validation options JSON: {}", e)).into(),
        ]),
    }
}
