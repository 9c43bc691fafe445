//! Import gate: only documents that validate reach the persistence collaborator.

use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::error::{DecodeError, Violation};
use crate::options::ValidationOptions;
use crate::parse::{self, WorkflowImport};
use crate::validate::{annotate_validity, validate_definition};

/// Persistence for accepted definitions. Implementations own encryption and
/// redaction of secret-bearing fields; they never see a rejected document.
pub trait DefinitionStore {
    type Id;
    type Error: std::error::Error + 'static;

    fn save(&mut self, definition: WorkflowImport) -> Result<Self::Id, Self::Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError<E: std::error::Error + 'static> {
    /// `definition` carries the validity flags for each node; it is absent
    /// when the document could not be decoded.
    #[error("workflow rejected with {} violation(s)", .violations.len())]
    Rejected {
        violations: Vec<Violation>,
        definition: Option<Box<WorkflowImport>>,
    },
    #[error("failed to store workflow: {0}")]
    Store(#[source] E),
}

impl<E: std::error::Error + 'static> ImportError<E> {
    fn undecodable(e: DecodeError) -> Self {
        ImportError::Rejected {
            violations: vec![e.into()],
            definition: None,
        }
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            ImportError::Rejected { violations, .. } => violations,
            ImportError::Store(_) => &[],
        }
    }
}

/// Validate `document` and hand the annotated definition to `store`.
#[instrument(skip_all)]
pub fn import_definition<S: DefinitionStore>(
    store: &mut S,
    document: &Value,
    options: &ValidationOptions,
) -> Result<S::Id, ImportError<S::Error>> {
    let definition = parse::decode(document, options).map_err(ImportError::undecodable)?;
    let violations = validate_definition(&definition, options).map_err(ImportError::undecodable)?;
    let definition = annotate_validity(definition, &violations);

    if !violations.is_empty() {
        warn!(
            name = %definition.name,
            violations = violations.len(),
            "rejected workflow import"
        );
        return Err(ImportError::Rejected {
            violations,
            definition: Some(Box::new(definition)),
        });
    }

    let name = definition.name.clone();
    let id = store.save(definition).map_err(ImportError::Store)?;
    info!(name = %name, "imported workflow");
    Ok(id)
}
