//! Shape decoding: `serde_json::Value` → typed tree.
//!
//! Nodes are decoded by hand so every failure carries the access path of the
//! offending field; kind-specific settings go through their serde derives.
//! No cross-node rules live here. Nothing recurses per node, so chains as deep
//! as `maxDepth` decode on a small stack.

use std::collections::BTreeSet;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::types::*;
use super::{ROOT_PATH, field_path, index_path, node_path};
use crate::error::DecodeError;
use crate::options::ValidationOptions;

/// Every field that links a node to a child node.
const CONTINUATION_FIELDS: [&str; 5] = [
    "nextAction",
    "onSuccessAction",
    "onFailureAction",
    "branches",
    "firstLoopAction",
];

pub struct Decoder<'o> {
    options: &'o ValidationOptions,
}

impl<'o> Decoder<'o> {
    pub fn new(options: &'o ValidationOptions) -> Self {
        Decoder { options }
    }

    pub fn decode_document(&self, document: &Value) -> Result<WorkflowImport, DecodeError> {
        let obj = as_object(document, "")?;

        let name = required_string(obj, "", "name")?;
        let description = optional_string(obj, "", "description")?.unwrap_or_default();
        let tags = decode_tags(obj.get("tags"))?;
        let template = self.decode_template(obj.get("template"))?;

        Ok(WorkflowImport {
            name,
            description,
            tags,
            template,
        })
    }

    fn decode_template(&self, value: Option<&Value>) -> Result<Option<FlowTemplate>, DecodeError> {
        let path = "template";
        let Some(value) = present(value) else {
            return Ok(None);
        };
        let obj = as_object(value, path)?;

        let Some(trigger) = present(obj.get("trigger")) else {
            return Ok(None);
        };

        Ok(Some(FlowTemplate {
            display_name: optional_string(obj, path, "displayName")?.unwrap_or_default(),
            valid: optional_bool(obj, path, "valid")?.unwrap_or(false),
            trigger: self.decode_trigger(trigger)?,
        }))
    }

    fn decode_trigger(&self, value: &Value) -> Result<Trigger, DecodeError> {
        let (trigger, next) = decode_trigger_node(value).map_err(|e| e.under(ROOT_PATH))?;
        Ok(Trigger {
            next_action: self.decode_actions(next)?,
            ..trigger
        })
    }

    /// Decode the action tree hanging off the trigger with an explicit stack.
    ///
    /// Nodes are decoded in pre-order, each without its children, and then
    /// attached to their parents back to front. Paths are only built for errors.
    fn decode_actions(&self, first: Option<&Value>) -> Result<Option<Box<Action>>, DecodeError> {
        let mut slots: Vec<Slot> = Vec::new();
        let mut pending: Vec<Pending<'_>> = first
            .map(|value| Pending {
                value,
                parent: None,
                edge: Edge::Next,
                depth: 1,
            })
            .into_iter()
            .collect();

        while let Some(next) = pending.pop() {
            if next.depth > self.options.max_depth {
                return Err(DecodeError::new(
                    slot_path(&slots, next.parent, next.edge),
                    format!(
                        "maximum nesting depth of {} exceeded",
                        self.options.max_depth
                    ),
                ));
            }
            let (action, children) = decode_action_node(next.value)
                .map_err(|e| e.under(&slot_path(&slots, next.parent, next.edge)))?;

            let index = slots.len();
            slots.push(Slot {
                action,
                parent: next.parent,
                edge: next.edge,
            });
            for (edge, value) in children.into_iter().rev() {
                pending.push(Pending {
                    value,
                    parent: Some(index),
                    edge,
                    depth: next.depth + 1,
                });
            }
        }

        let mut head = None;
        while let Some(slot) = slots.pop() {
            let child = Box::new(slot.action);
            match slot.parent {
                Some(parent) => slots[parent].action.attach(slot.edge, child),
                None => head = Some(child),
            }
        }
        Ok(head)
    }
}

/// A decoded action whose children are not attached yet.
struct Slot {
    action: Action,
    /// Index of the parent slot; `None` hangs off the trigger.
    parent: Option<usize>,
    edge: Edge,
}

struct Pending<'v> {
    value: &'v Value,
    parent: Option<usize>,
    edge: Edge,
    depth: usize,
}

fn slot_path(slots: &[Slot], parent: Option<usize>, edge: Edge) -> String {
    let mut edges = vec![edge];
    let mut cursor = parent;
    while let Some(slot) = cursor.and_then(|i| slots.get(i)) {
        edges.push(slot.edge);
        cursor = slot.parent;
    }
    node_path(&edges)
}

// Node decoders work on node-relative paths; callers re-root errors with `under`.

fn decode_trigger_node(value: &Value) -> Result<(Trigger, Option<&Value>), DecodeError> {
    let obj = as_object(value, "")?;
    let kind_tag = required_string(obj, "", "type")?;
    let meta = decode_meta(obj, "")?;

    let kind = match kind_tag.as_str() {
        "EMPTY" => {
            let settings = match present(obj.get("settings")) {
                Some(v) => as_object(v, "settings")?.clone(),
                None => Map::new(),
            };
            TriggerKind::Empty { settings }
        }
        "BLOCK" => TriggerKind::Block {
            settings: decode_settings(obj, "")?,
        },
        other => {
            return Err(DecodeError::new(
                "type",
                format!("unknown trigger type '{}'", other),
            ));
        }
    };

    reject_foreign_continuations(obj, "", &kind_tag, &["nextAction"])?;
    let trigger = Trigger {
        meta,
        kind,
        next_action: None,
    };
    Ok((trigger, present(obj.get("nextAction"))))
}

/// Decode one action without its children. The children's values are returned
/// in visiting order.
fn decode_action_node(value: &Value) -> Result<(Action, Vec<(Edge, &Value)>), DecodeError> {
    let obj = as_object(value, "")?;
    let kind_tag = required_string(obj, "", "type")?;
    let meta = decode_meta(obj, "")?;
    let mut children = Vec::new();

    let kind = match kind_tag.as_str() {
        "CODE" => {
            reject_foreign_continuations(obj, "", &kind_tag, &["nextAction"])?;
            ActionKind::Code {
                settings: decode_settings(obj, "")?,
            }
        }
        "BLOCK" => {
            reject_foreign_continuations(obj, "", &kind_tag, &["nextAction"])?;
            ActionKind::Block {
                settings: decode_settings(obj, "")?,
            }
        }
        "BRANCH" => {
            reject_foreign_continuations(
                obj,
                "",
                &kind_tag,
                &["nextAction", "onSuccessAction", "onFailureAction"],
            )?;
            let settings = decode_settings(obj, "")?;
            children.extend(present(obj.get("onSuccessAction")).map(|v| (Edge::OnSuccess, v)));
            children.extend(present(obj.get("onFailureAction")).map(|v| (Edge::OnFailure, v)));
            ActionKind::Branch {
                settings,
                on_success_action: None,
                on_failure_action: None,
            }
        }
        "SPLIT" => {
            reject_foreign_continuations(obj, "", &kind_tag, &["nextAction", "branches"])?;
            let settings = decode_settings(obj, "")?;
            let branches = decode_branches(obj, &mut children)?;
            ActionKind::Split { settings, branches }
        }
        "LOOP_ON_ITEMS" => {
            reject_foreign_continuations(
                obj,
                "",
                &kind_tag,
                &["nextAction", "firstLoopAction"],
            )?;
            let settings = decode_settings(obj, "")?;
            children.extend(present(obj.get("firstLoopAction")).map(|v| (Edge::LoopBody, v)));
            ActionKind::LoopOnItems {
                settings,
                first_loop_action: None,
            }
        }
        other => {
            return Err(DecodeError::new(
                "type",
                format!("unknown action type '{}'", other),
            ));
        }
    };
    children.extend(present(obj.get("nextAction")).map(|v| (Edge::Next, v)));

    let action = Action {
        meta,
        kind,
        next_action: None,
    };
    Ok((action, children))
}

fn decode_branches<'v>(
    obj: &'v Map<String, Value>,
    children: &mut Vec<(Edge, &'v Value)>,
) -> Result<Vec<SplitBranch>, DecodeError> {
    let Some(value) = present(obj.get("branches")) else {
        return Ok(Vec::new());
    };
    let Value::Array(items) = value else {
        return Err(DecodeError::new(
            "branches",
            format!("expected an array, found {}", type_name(value)),
        ));
    };

    let mut branches = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let branch_path = index_path("branches", i);
        let branch = as_object(item, &branch_path)?;
        branches.push(SplitBranch {
            option_id: required_string(branch, &branch_path, "optionId")?,
            next_action: None,
        });
        children.extend(present(branch.get("nextAction")).map(|v| (Edge::Branch(i), v)));
    }
    Ok(branches)
}

fn decode_meta(obj: &Map<String, Value>, path: &str) -> Result<NodeMeta, DecodeError> {
    Ok(NodeMeta {
        name: required_string(obj, path, "name")?,
        display_name: required_string(obj, path, "displayName")?,
        valid: optional_bool(obj, path, "valid")?.unwrap_or(false),
    })
}

fn decode_settings<T: DeserializeOwned>(
    obj: &Map<String, Value>,
    path: &str,
) -> Result<T, DecodeError> {
    let settings_path = field_path(path, "settings");
    let Some(value) = present(obj.get("settings")) else {
        return Err(DecodeError::new(settings_path, "missing field `settings`"));
    };
    as_object(value, &settings_path)?;
    T::deserialize(value).map_err(|e| DecodeError::new(settings_path, e.to_string()))
}

fn decode_tags(value: Option<&Value>) -> Result<BTreeSet<String>, DecodeError> {
    let Some(value) = present(value) else {
        return Ok(BTreeSet::new());
    };
    let Value::Array(items) = value else {
        return Err(DecodeError::new(
            "tags",
            format!("expected an array, found {}", type_name(value)),
        ));
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(s) => Ok(s.clone()),
            other => Err(DecodeError::new(
                index_path("tags", i),
                format!("expected a string, found {}", type_name(other)),
            )),
        })
        .collect()
}

fn reject_foreign_continuations(
    obj: &Map<String, Value>,
    path: &str,
    kind_tag: &str,
    allowed: &[&str],
) -> Result<(), DecodeError> {
    for field in CONTINUATION_FIELDS {
        if !allowed.contains(&field) && present(obj.get(field)).is_some() {
            return Err(DecodeError::new(
                field_path(path, field),
                format!("`{}` is not allowed on a {} node", field, kind_tag),
            ));
        }
    }
    Ok(())
}

/// `null` counts as absent.
fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn as_object<'v>(value: &'v Value, path: &str) -> Result<&'v Map<String, Value>, DecodeError> {
    value.as_object().ok_or_else(|| {
        DecodeError::new(
            path,
            format!("expected an object, found {}", type_name(value)),
        )
    })
}

fn required_string(obj: &Map<String, Value>, path: &str, field: &str) -> Result<String, DecodeError> {
    optional_string(obj, path, field)?
        .ok_or_else(|| DecodeError::new(field_path(path, field), format!("missing field `{}`", field)))
}

fn optional_string(
    obj: &Map<String, Value>,
    path: &str,
    field: &str,
) -> Result<Option<String>, DecodeError> {
    match present(obj.get(field)) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(DecodeError::new(
            field_path(path, field),
            format!("expected a string, found {}", type_name(other)),
        )),
    }
}

fn optional_bool(obj: &Map<String, Value>, path: &str, field: &str) -> Result<Option<bool>, DecodeError> {
    match present(obj.get(field)) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(DecodeError::new(
            field_path(path, field),
            format!("expected a boolean, found {}", type_name(other)),
        )),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
