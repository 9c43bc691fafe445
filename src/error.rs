//! Violation and decode error types shared by every phase.

use serde::{Deserialize, Serialize};

use crate::parse::field_path;

/// What a violation is about. Serialized as a SCREAMING_SNAKE_CASE tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationKind {
    Decode,
    TemplateRequired,
    DuplicateName,
    InvalidDefaultBranch,
    SplitRequiresBranch,
    DuplicateOptionId,
    DuplicateBranch,
    UnknownBranchOption,
    MissingBranch,
    OptionRequiresCondition,
    BranchRequiresCondition,
    EmptyConditionGroup,
    UnknownOperator,
}

impl ViolationKind {
    /// Stable short code, grouped by the phase that raises it.
    pub fn code(&self) -> &'static str {
        match self {
            ViolationKind::Decode => "D001",
            ViolationKind::TemplateRequired => "D002",
            ViolationKind::DuplicateName => "T001",
            ViolationKind::InvalidDefaultBranch => "T002",
            ViolationKind::SplitRequiresBranch => "S001",
            ViolationKind::DuplicateOptionId => "S002",
            ViolationKind::DuplicateBranch => "S003",
            ViolationKind::UnknownBranchOption => "S004",
            ViolationKind::MissingBranch => "S005",
            ViolationKind::OptionRequiresCondition => "S006",
            ViolationKind::BranchRequiresCondition => "B001",
            ViolationKind::EmptyConditionGroup => "B002",
            ViolationKind::UnknownOperator => "B003",
        }
    }

    /// Fatal kinds end validation with a single violation.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ViolationKind::Decode | ViolationKind::TemplateRequired)
    }
}

/// A single reported failure, located by its path from the document root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub path: String,
    pub kind: ViolationKind,
    pub message: String,
    /// Pre-order index of the node the violation is attributed to (the trigger
    /// is 0). Not part of the wire format.
    #[serde(skip)]
    pub node: Option<usize>,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "[{}] {}", self.kind.code(), self.message)
        } else {
            write!(
                f,
                "[{}] {} (at '{}')",
                self.kind.code(),
                self.message,
                self.path
            )
        }
    }
}

impl Violation {
    pub fn new(kind: ViolationKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Violation {
            path: path.into(),
            kind,
            message: message.into(),
            node: None,
        }
    }

    /// Attribute the violation to the node visited at `index`.
    pub fn with_node(mut self, index: usize) -> Self {
        self.node = Some(index);
        self
    }

    /// Re-root a node-relative path under `node_path`.
    pub fn under(mut self, node_path: &str) -> Self {
        self.path = rerooted(&self.path, node_path);
        self
    }

    pub fn template_required() -> Self {
        Violation::new(
            ViolationKind::TemplateRequired,
            "template",
            "template is required",
        )
    }
}

/// The document cannot be interpreted as the node grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason} (at '{path}')")]
pub struct DecodeError {
    pub path: String,
    pub reason: String,
}

impl DecodeError {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        DecodeError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Re-root a node-relative path under `node_path`.
    pub fn under(mut self, node_path: &str) -> Self {
        self.path = rerooted(&self.path, node_path);
        self
    }
}

fn rerooted(relative: &str, node_path: &str) -> String {
    if relative.is_empty() {
        node_path.to_string()
    } else {
        field_path(node_path, relative)
    }
}

impl From<DecodeError> for Violation {
    fn from(e: DecodeError) -> Self {
        Violation::new(ViolationKind::Decode, e.path, e.reason)
    }
}
