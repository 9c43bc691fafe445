//! Typed workflow tree produced by the decoder.
//!
//! One enum arm per node kind, each carrying only the continuations that kind
//! owns. Serializing a value yields the import wire shape again (camelCase
//! keys, `type` discriminant), which is how annotated copies are handed on.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// TOP-LEVEL DOCUMENT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowImport {
    pub name: String,
    pub description: String,
    pub tags: BTreeSet<String>,
    /// `None` when the document has no template or the template has no trigger.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<FlowTemplate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowTemplate {
    pub display_name: String,
    pub trigger: Trigger,
    pub valid: bool,
}

/// Fields every node carries regardless of kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMeta {
    pub name: String,
    pub display_name: String,
    /// Recomputed by validation; the imported value is never trusted.
    pub valid: bool,
}

// =============================================================================
// TRIGGERS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    #[serde(flatten)]
    pub meta: NodeMeta,
    #[serde(flatten)]
    pub kind: TriggerKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_action: Option<Box<Action>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerKind {
    /// Placeholder trigger with no side effects.
    Empty { settings: Map<String, Value> },
    Block { settings: BlockTriggerSettings },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockTriggerSettings {
    pub block_name: String,
    pub block_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_name: Option<String>,
    #[serde(default)]
    pub input: Map<String, Value>,
}

impl Trigger {
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            TriggerKind::Empty { .. } => "EMPTY",
            TriggerKind::Block { .. } => "BLOCK",
        }
    }
}

// =============================================================================
// ACTIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    #[serde(flatten)]
    pub meta: NodeMeta,
    #[serde(flatten)]
    pub kind: ActionKind,
    /// Linear continuation taken after this node (and any sub-tree it owns) completes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_action: Option<Box<Action>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ActionKind {
    Code {
        settings: CodeSettings,
    },
    Block {
        settings: BlockActionSettings,
    },
    Branch {
        settings: BranchSettings,
        #[serde(skip_serializing_if = "Option::is_none")]
        on_success_action: Option<Box<Action>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        on_failure_action: Option<Box<Action>>,
    },
    Split {
        settings: SplitSettings,
        branches: Vec<SplitBranch>,
    },
    LoopOnItems {
        settings: LoopOnItemsSettings,
        #[serde(skip_serializing_if = "Option::is_none")]
        first_loop_action: Option<Box<Action>>,
    },
}

impl Action {
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            ActionKind::Code { .. } => "CODE",
            ActionKind::Block { .. } => "BLOCK",
            ActionKind::Branch { .. } => "BRANCH",
            ActionKind::Split { .. } => "SPLIT",
            ActionKind::LoopOnItems { .. } => "LOOP_ON_ITEMS",
        }
    }

    /// Direct children in visiting order: success, failure, split branches,
    /// loop body, then `nextAction`.
    pub fn children(&self) -> Vec<(Edge, &Action)> {
        let mut children = Vec::new();
        match &self.kind {
            ActionKind::Branch {
                on_success_action,
                on_failure_action,
                ..
            } => {
                children.extend(on_success_action.as_deref().map(|a| (Edge::OnSuccess, a)));
                children.extend(on_failure_action.as_deref().map(|a| (Edge::OnFailure, a)));
            }
            ActionKind::Split { branches, .. } => {
                for (i, branch) in branches.iter().enumerate() {
                    children.extend(branch.next_action.as_deref().map(|a| (Edge::Branch(i), a)));
                }
            }
            ActionKind::LoopOnItems {
                first_loop_action, ..
            } => {
                children.extend(first_loop_action.as_deref().map(|a| (Edge::LoopBody, a)));
            }
            ActionKind::Code { .. } | ActionKind::Block { .. } => {}
        }
        children.extend(self.next_action.as_deref().map(|a| (Edge::Next, a)));
        children
    }

    /// Same order as [`Action::children`].
    pub fn children_mut(&mut self) -> Vec<(Edge, &mut Action)> {
        let Action {
            kind, next_action, ..
        } = self;
        let mut children = Vec::new();
        match kind {
            ActionKind::Branch {
                on_success_action,
                on_failure_action,
                ..
            } => {
                children.extend(on_success_action.as_deref_mut().map(|a| (Edge::OnSuccess, a)));
                children.extend(on_failure_action.as_deref_mut().map(|a| (Edge::OnFailure, a)));
            }
            ActionKind::Split { branches, .. } => {
                for (i, branch) in branches.iter_mut().enumerate() {
                    children.extend(branch.next_action.as_deref_mut().map(|a| (Edge::Branch(i), a)));
                }
            }
            ActionKind::LoopOnItems {
                first_loop_action, ..
            } => {
                children.extend(first_loop_action.as_deref_mut().map(|a| (Edge::LoopBody, a)));
            }
            ActionKind::Code { .. } | ActionKind::Block { .. } => {}
        }
        children.extend(next_action.as_deref_mut().map(|a| (Edge::Next, a)));
        children
    }

    /// Hang `child` off the continuation `edge` names. Edges this kind does
    /// not own are ignored.
    pub(super) fn attach(&mut self, edge: Edge, child: Box<Action>) {
        match (edge, &mut self.kind) {
            (Edge::Next, _) => self.next_action = Some(child),
            (Edge::OnSuccess, ActionKind::Branch { on_success_action, .. }) => {
                *on_success_action = Some(child)
            }
            (Edge::OnFailure, ActionKind::Branch { on_failure_action, .. }) => {
                *on_failure_action = Some(child)
            }
            (Edge::Branch(i), ActionKind::Split { branches, .. }) => {
                if let Some(branch) = branches.get_mut(i) {
                    branch.next_action = Some(child);
                }
            }
            (Edge::LoopBody, ActionKind::LoopOnItems { first_loop_action, .. }) => {
                *first_loop_action = Some(child)
            }
            _ => {}
        }
    }

    fn take_children(&mut self) -> Vec<Box<Action>> {
        let mut children = Vec::new();
        match &mut self.kind {
            ActionKind::Branch {
                on_success_action,
                on_failure_action,
                ..
            } => {
                children.extend(on_success_action.take());
                children.extend(on_failure_action.take());
            }
            ActionKind::Split { branches, .. } => {
                children.extend(branches.iter_mut().filter_map(|b| b.next_action.take()));
            }
            ActionKind::LoopOnItems {
                first_loop_action, ..
            } => children.extend(first_loop_action.take()),
            ActionKind::Code { .. } | ActionKind::Block { .. } => {}
        }
        children.extend(self.next_action.take());
        children
    }

    pub fn error_handling_options(&self) -> Option<&ErrorHandlingOptions> {
        match &self.kind {
            ActionKind::Code { settings } => settings.error_handling_options.as_ref(),
            ActionKind::Block { settings } => settings.error_handling_options.as_ref(),
            ActionKind::Branch { settings, .. } => settings.error_handling_options.as_ref(),
            ActionKind::Split { settings, .. } => settings.error_handling_options.as_ref(),
            ActionKind::LoopOnItems { settings, .. } => settings.error_handling_options.as_ref(),
        }
    }
}

// Chains run to `maxDepth` nodes; the derived drop would recurse once per node.
impl Drop for Action {
    fn drop(&mut self) {
        let mut pending = self.take_children();
        while let Some(mut action) = pending.pop() {
            pending.append(&mut action.take_children());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitBranch {
    pub option_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_action: Option<Box<Action>>,
}

// =============================================================================
// CONTINUATIONS
// =============================================================================

/// The continuation field a child node hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Next,
    OnSuccess,
    OnFailure,
    Branch(usize),
    LoopBody,
}

impl Edge {
    /// Append the access segment of this edge to `path`.
    pub fn push_segment(&self, path: &mut String) {
        match self {
            Edge::Next => path.push_str(".nextAction"),
            Edge::OnSuccess => path.push_str(".onSuccessAction"),
            Edge::OnFailure => path.push_str(".onFailureAction"),
            Edge::Branch(i) => path.push_str(&format!(".branches[{}].nextAction", i)),
            Edge::LoopBody => path.push_str(".firstLoopAction"),
        }
    }

    /// Path of the child reached through this edge from `parent`.
    pub fn child_path(&self, parent: &str) -> String {
        let mut path = parent.to_string();
        self.push_segment(&mut path);
        path
    }
}

// =============================================================================
// ACTION SETTINGS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSettings {
    pub source_code: SourceCode,
    /// Parameter name to value expression. Expressions are not resolved here.
    #[serde(default)]
    pub input: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_handling_options: Option<ErrorHandlingOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceCode {
    pub code: String,
    pub package_json: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockActionSettings {
    pub block_name: String,
    pub block_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_name: Option<String>,
    #[serde(default)]
    pub input: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_handling_options: Option<ErrorHandlingOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchSettings {
    /// Disjunction of AND-groups, in document order.
    pub conditions: Vec<Vec<Condition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_handling_options: Option<ErrorHandlingOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitSettings {
    pub options: Vec<SplitOption>,
    pub default_branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_handling_options: Option<ErrorHandlingOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitOption {
    pub id: String,
    pub name: String,
    pub conditions: Vec<Vec<Condition>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopOnItemsSettings {
    pub items: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_handling_options: Option<ErrorHandlingOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorHandlingOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_on_failure: Option<Toggle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_on_failure: Option<Toggle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toggle {
    pub value: bool,
}

// =============================================================================
// CONDITIONS
// =============================================================================

/// One atom of an AND-group. The operator stays a string after decoding so an
/// unrecognised operator is reported as a violation rather than a decode failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub operator: String,
    pub first_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_sensitive: Option<bool>,
}

impl Condition {
    pub fn operator(&self) -> Option<BranchOperator> {
        BranchOperator::from_wire(&self.operator)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchOperator {
    TextContains,
    TextDoesNotContain,
    TextExactlyMatches,
    TextDoesNotExactlyMatch,
    TextStartsWith,
    TextDoesNotStartWith,
    TextEndsWith,
    TextDoesNotEndWith,
    NumberIsGreaterThan,
    NumberIsLessThan,
    NumberIsEqualTo,
    BooleanIsTrue,
    BooleanIsFalse,
    DateIsBefore,
    DateIsEqual,
    DateIsAfter,
    ListContains,
    ListDoesNotContain,
    ListIsEmpty,
    ListIsNotEmpty,
    Exists,
    DoesNotExist,
}

impl BranchOperator {
    pub const ALL: [BranchOperator; 22] = [
        BranchOperator::TextContains,
        BranchOperator::TextDoesNotContain,
        BranchOperator::TextExactlyMatches,
        BranchOperator::TextDoesNotExactlyMatch,
        BranchOperator::TextStartsWith,
        BranchOperator::TextDoesNotStartWith,
        BranchOperator::TextEndsWith,
        BranchOperator::TextDoesNotEndWith,
        BranchOperator::NumberIsGreaterThan,
        BranchOperator::NumberIsLessThan,
        BranchOperator::NumberIsEqualTo,
        BranchOperator::BooleanIsTrue,
        BranchOperator::BooleanIsFalse,
        BranchOperator::DateIsBefore,
        BranchOperator::DateIsEqual,
        BranchOperator::DateIsAfter,
        BranchOperator::ListContains,
        BranchOperator::ListDoesNotContain,
        BranchOperator::ListIsEmpty,
        BranchOperator::ListIsNotEmpty,
        BranchOperator::Exists,
        BranchOperator::DoesNotExist,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BranchOperator::TextContains => "TEXT_CONTAINS",
            BranchOperator::TextDoesNotContain => "TEXT_DOES_NOT_CONTAIN",
            BranchOperator::TextExactlyMatches => "TEXT_EXACTLY_MATCHES",
            BranchOperator::TextDoesNotExactlyMatch => "TEXT_DOES_NOT_EXACTLY_MATCH",
            BranchOperator::TextStartsWith => "TEXT_STARTS_WITH",
            BranchOperator::TextDoesNotStartWith => "TEXT_DOES_NOT_START_WITH",
            BranchOperator::TextEndsWith => "TEXT_ENDS_WITH",
            BranchOperator::TextDoesNotEndWith => "TEXT_DOES_NOT_END_WITH",
            BranchOperator::NumberIsGreaterThan => "NUMBER_IS_GREATER_THAN",
            BranchOperator::NumberIsLessThan => "NUMBER_IS_LESS_THAN",
            BranchOperator::NumberIsEqualTo => "NUMBER_IS_EQUAL_TO",
            BranchOperator::BooleanIsTrue => "BOOLEAN_IS_TRUE",
            BranchOperator::BooleanIsFalse => "BOOLEAN_IS_FALSE",
            BranchOperator::DateIsBefore => "DATE_IS_BEFORE",
            BranchOperator::DateIsEqual => "DATE_IS_EQUAL",
            BranchOperator::DateIsAfter => "DATE_IS_AFTER",
            BranchOperator::ListContains => "LIST_CONTAINS",
            BranchOperator::ListDoesNotContain => "LIST_DOES_NOT_CONTAIN",
            BranchOperator::ListIsEmpty => "LIST_IS_EMPTY",
            BranchOperator::ListIsNotEmpty => "LIST_IS_NOT_EMPTY",
            BranchOperator::Exists => "EXISTS",
            BranchOperator::DoesNotExist => "DOES_NOT_EXIST",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        BranchOperator::ALL.into_iter().find(|op| op.as_str() == s)
    }
}
