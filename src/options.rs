//! Caller-tunable validation settings.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_DEPTH: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationOptions {
    /// Deepest continuation chain accepted, counted in nodes below the trigger.
    pub max_depth: usize,
    /// Report an AND-group with zero atoms instead of treating it as always matching.
    pub reject_empty_condition_groups: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        ValidationOptions {
            max_depth: DEFAULT_MAX_DEPTH,
            reject_empty_condition_groups: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let options: ValidationOptions =
            serde_json::from_str(r#"{"rejectEmptyConditionGroups": true}"#).unwrap();
        assert_eq!(options.max_depth, DEFAULT_MAX_DEPTH);
        assert!(options.reject_empty_condition_groups);
    }
}
