//! Tree walker: deterministic pre-order traversal of a decoded workflow.
//!
//! Order per node: the node itself, then the success sub-tree, the failure
//! sub-tree, each split branch in `branches` order, the loop body, and finally
//! the node's own `nextAction`. Violation ordering and "first occurrence wins"
//! for duplicate names both rely on this order.
//!
//! Children are owned boxes, so every node has exactly one parent and no node
//! can be reached twice. The walk needs no visited set.

use tracing::{debug, trace};

pub use crate::parse::{Edge, ROOT_PATH};

use crate::error::DecodeError;
use crate::options::ValidationOptions;
use crate::parse::node_path;
use crate::parse::types::{Action, NodeMeta, Trigger};

#[derive(Debug, Clone, Copy)]
pub enum FlowNode<'a> {
    Trigger(&'a Trigger),
    Action(&'a Action),
}

impl<'a> FlowNode<'a> {
    pub fn meta(&self) -> &'a NodeMeta {
        match self {
            FlowNode::Trigger(t) => &t.meta,
            FlowNode::Action(a) => &a.meta,
        }
    }

    pub fn name(&self) -> &'a str {
        &self.meta().name
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            FlowNode::Trigger(t) => t.kind_name(),
            FlowNode::Action(a) => a.kind_name(),
        }
    }

    pub fn as_action(&self) -> Option<&'a Action> {
        match self {
            FlowNode::Trigger(_) => None,
            FlowNode::Action(a) => Some(a),
        }
    }

    /// Direct children in visiting order.
    pub fn children(&self) -> Vec<(Edge, &'a Action)> {
        match self {
            FlowNode::Trigger(t) => t
                .next_action
                .as_deref()
                .map(|a| (Edge::Next, a))
                .into_iter()
                .collect(),
            FlowNode::Action(a) => a.children(),
        }
    }
}

/// One visited node.
#[derive(Debug, Clone)]
pub struct Visit<'a> {
    /// Nodes between the trigger and this node; the trigger is depth 0.
    pub depth: usize,
    pub node: FlowNode<'a>,
    /// Index of the parent visit in `Walk::visits`.
    pub parent: Option<usize>,
    pub edge: Option<Edge>,
}

#[derive(Debug)]
pub struct Walk<'a> {
    pub visits: Vec<Visit<'a>>,
}

impl Walk<'_> {
    /// Access path of the visit at `index`, rebuilt from parent links.
    pub fn path(&self, index: usize) -> String {
        path_of(&self.visits, index)
    }
}

fn path_of(visits: &[Visit<'_>], index: usize) -> String {
    let mut edges = Vec::new();
    let mut cursor = Some(index);
    while let Some(visit) = cursor.and_then(|i| visits.get(i)) {
        edges.extend(visit.edge);
        cursor = visit.parent;
    }
    node_path(&edges)
}

/// Visit every node reachable from `trigger` exactly once, in pre-order.
///
/// Fails only when a continuation chain is deeper than `options.max_depth`.
pub fn walk<'a>(trigger: &'a Trigger, options: &ValidationOptions) -> Result<Walk<'a>, DecodeError> {
    let mut visits: Vec<Visit<'a>> = Vec::new();
    let mut pending = vec![Visit {
        depth: 0,
        node: FlowNode::Trigger(trigger),
        parent: None,
        edge: None,
    }];

    while let Some(visit) = pending.pop() {
        let position = visits.len();
        trace!(index = position, depth = visit.depth, kind = visit.node.kind_name(), "visit");

        if visit.depth > options.max_depth {
            visits.push(visit);
            return Err(DecodeError::new(
                path_of(&visits, position),
                format!("maximum nesting depth of {} exceeded", options.max_depth),
            ));
        }

        // Reverse so the stack pops children in visiting order.
        for (edge, child) in visit.node.children().into_iter().rev() {
            pending.push(Visit {
                depth: visit.depth + 1,
                node: FlowNode::Action(child),
                parent: Some(position),
                edge: Some(edge),
            });
        }
        visits.push(visit);
    }

    debug!(nodes = visits.len(), "walked workflow tree");
    Ok(Walk { visits })
}
