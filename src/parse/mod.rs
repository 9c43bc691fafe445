//! Parse phase: untyped document → typed workflow tree.

pub mod decode;
pub mod types;

pub use decode::Decoder;
pub use types::*;

use serde::Deserialize;
use serde_json::Value;

use crate::error::DecodeError;
use crate::options::ValidationOptions;

/// Access path of the trigger; every node path starts here.
pub const ROOT_PATH: &str = "template.trigger";

/// Decode an already-parsed document. Fails on the first shape problem.
pub fn decode(document: &Value, options: &ValidationOptions) -> Result<WorkflowImport, DecodeError> {
    Decoder::new(options).decode_document(document)
}

/// Parse a JSON string and decode it in one step.
pub fn parse(json: &str, options: &ValidationOptions) -> Result<WorkflowImport, DecodeError> {
    let document = read_document(json)?;
    let decoded = decode(&document, options);
    drop_document(document);
    decoded
}

/// Parse JSON text into a `Value` with no nesting limit of its own, so
/// `maxDepth` stays the only depth rule. Deep input grows the stack on demand.
pub fn read_document(json: &str) -> Result<Value, DecodeError> {
    let mut de = serde_json::Deserializer::from_str(json);
    de.disable_recursion_limit();
    let document = Value::deserialize(serde_stacker::Deserializer::new(&mut de))
        .map_err(json_error)?;
    if let Err(e) = de.end() {
        drop_document(document);
        return Err(json_error(e));
    }
    Ok(document)
}

/// Drop a document of any depth without recursing.
pub fn drop_document(document: Value) {
    let mut pending = vec![document];
    while let Some(value) = pending.pop() {
        match value {
            Value::Array(items) => pending.extend(items),
            Value::Object(fields) => pending.extend(fields.into_iter().map(|(_, v)| v)),
            _ => {}
        }
    }
}

fn json_error(e: serde_json::Error) -> DecodeError {
    DecodeError::new("", format!("failed to parse workflow JSON: {}", e))
}

/// `parent.field`, or just `field` at the document root.
pub fn field_path(parent: &str, field: &str) -> String {
    if parent.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", parent, field)
    }
}

/// `parent[index]`.
pub fn index_path(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

/// Path of a node given the edges leading to it, listed from the node up to the trigger.
pub fn node_path(edges_upward: &[Edge]) -> String {
    let mut path = ROOT_PATH.to_string();
    for edge in edges_upward.iter().rev() {
        edge.push_segment(&mut path);
    }
    path
}
