//! Error types for mention configuration and composition
//!
//! "No match" is never an error: a query that cannot be embedded in a
//! candidate simply drops the candidate. Everything here is a caller
//! contract violation that should surface at the call site.

/// Mention-specific errors
#[derive(Debug, Clone, PartialEq)]
pub enum MentionError {
    /// Neither `values` nor `collection` was configured
    NoCollection,
    /// Two rules share the same trigger sequence
    DuplicateTrigger(String),
    /// `lookup` was neither a key string nor a function
    InvalidLookup(String),
    /// Candidate values were not an array
    NotAnArray(String),
    /// Collection index out of range
    InvalidCollectionIndex(usize),
    /// Values of this collection come from a provider and cannot be appended to
    ProviderValues(usize),
    /// No composition is active
    NoActiveComposition,
    /// Trigger automaton could not be built
    Automaton(String),
    /// Separator pattern could not be compiled
    Pattern(String),
}

impl std::fmt::Display for MentionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MentionError::NoCollection => write!(f, "No collection specified"),
            MentionError::DuplicateTrigger(t) => {
                write!(f, "Trigger {:?} is configured more than once", t)
            }
            MentionError::InvalidLookup(found) => write!(
                f,
                "Invalid `lookup` configuration: expected a key string or a function, got {}",
                found
            ),
            MentionError::NotAnArray(found) => {
                write!(f, "Expected an array of values, got {}", found)
            }
            MentionError::InvalidCollectionIndex(idx) => {
                write!(f, "Invalid collectionIndex: {}", idx)
            }
            MentionError::ProviderValues(idx) => write!(
                f,
                "Unable to append to values of collection {}, as they come from a provider",
                idx
            ),
            MentionError::NoActiveComposition => {
                write!(f, "No active composition. Use append with a collection index instead")
            }
            MentionError::Automaton(msg) => write!(f, "Trigger automaton error: {}", msg),
            MentionError::Pattern(msg) => write!(f, "Separator pattern error: {}", msg),
        }
    }
}

impl std::error::Error for MentionError {}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, MentionError>;
