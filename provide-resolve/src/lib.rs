//! Compile-time dependency resolution
//!
//! Given a requested type, the lexical scope chain it is requested from and
//! a registry of candidates, the [`Resolver`] selects exactly one candidate
//! (or reports why it cannot), resolves that candidate's parameters
//! recursively and produces a dependency graph. `Set`/`Map` requests with
//! no direct producer are assembled from collection members.
//!
//! Resolution is a pure function of its inputs: the same request against
//! the same registry always produces the same result.

pub mod candidate;
pub mod collection;
pub mod config;
pub mod context;
pub mod error;
pub mod registry;
pub mod request;
pub mod resolver;
pub mod result;

#[cfg(feature = "config")]
pub mod manifest;

pub use candidate::{
    Candidate, CollectionKey, CollectionMembership, ElementKey, Origin, OverridePolicy, Priority,
};
pub use collection::{CollectionConflict, CollectionSynthesizer};
pub use config::ResolverConfig;
pub use context::{ContextId, ScopeChain, ScopeContext};
pub use error::{ResolveError, Result};
pub use registry::{CandidateRegistry, RegistryBuilder, StaticRegistry, VisibleCandidate};
pub use request::ResolutionRequest;
pub use resolver::Resolver;
pub use result::{ResolutionResult, ResolvedNode};

#[cfg(feature = "config")]
pub use manifest::{ContextManifest, RegistryManifest};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::{
        Candidate, CandidateRegistry, CollectionKey, CollectionMembership, Origin, OverridePolicy,
        Priority, RegistryBuilder, ResolutionRequest, ResolutionResult, ResolveError,
        ResolvedNode, Resolver, ScopeChain, ScopeContext, StaticRegistry,
    };
    pub use provide_types::{CacheKey, CandidateId, ScopeId, Type};
}
