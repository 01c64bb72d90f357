//! Error types for resolution and registry construction

use crate::candidate::{CollectionKey, ElementKey};
use provide_types::{CandidateId, Type};
use thiserror::Error;

/// Result type alias for resolver operations
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Errors surfaced by the resolver and the registry
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    /// No eligible candidate produces the requested type
    #[error("No candidate found for {ty}")]
    Unresolved { ty: Type },

    /// More than one candidate survived every tie-break
    #[error("Ambiguous candidates for {ty}: {}", render_ids(.candidates))]
    Ambiguous {
        ty: Type,
        candidates: Vec<CandidateId>,
    },

    /// A type depends on itself
    #[error("Circular dependency detected: {}", render_path(.path))]
    Cyclic { path: Vec<Type> },

    /// Two collection entries share an element key under the `Fail` policy
    #[error("Duplicate element {element} in collection {collection}")]
    DuplicateCollectionKey {
        collection: CollectionKey,
        element: ElementKey,
    },

    /// Two candidates were registered with the same id
    #[error("Candidate {0} is registered more than once")]
    DuplicateCandidate(CandidateId),

    /// Configuration or manifest could not be read
    #[cfg(feature = "config")]
    #[error("Configuration error: {0}")]
    Config(String),
}

fn render_ids(ids: &[CandidateId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_path(path: &[Type]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
