// ============================================================================
// spark-fields - Errors
// Configuration failures, page lookups, warnings and form validation
// ============================================================================

use std::fmt;

/// Result alias for controller construction and mounting
pub type Result<T, E = ConfigurationError> = std::result::Result<T, E>;

/// A controller cannot be built from what it was given.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// The trigger reference does not resolve to a live control
    #[error("missing required control `{reference}`")]
    MissingControl { reference: String },

    /// An id in the configuration is blank
    #[error("empty {role} reference in field group configuration")]
    EmptyReference { role: &'static str },

    /// The configuration document could not be parsed
    #[error("invalid field group configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Host page lookups and mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
    #[error("an element with id `{id}` already exists")]
    DuplicateId { id: String },

    #[error("no element with id `{id}`")]
    UnknownElement { id: String },
}

/// Why a dependent reference could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingReason {
    /// Nothing was ever bound to the reference
    Unresolved,
    /// The element existed but has since been removed from the page
    Removed,
    /// The field has no ancestor carrying the container class
    NoContainer { class: String },
}

impl fmt::Display for MissingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingReason::Unresolved => f.write_str("not found"),
            MissingReason::Removed => f.write_str("removed from the page"),
            MissingReason::NoContainer { class } => {
                write!(f, "no enclosing `.{class}` container")
            }
        }
    }
}

/// A dependent reference was skipped during evaluation.
///
/// Not fatal: the remaining dependents are still applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("dependent element `{reference}` skipped: {reason}")]
pub struct MissingElementWarning {
    pub reference: String,
    pub reason: MissingReason,
}

/// A visible field group fails the completeness check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("`{trigger}` selects the alternate group but {} field(s) are blank: {}", .missing.len(), .missing.join(", "))]
    IncompleteGroup {
        trigger: String,
        missing: Vec<String>,
    },
}
