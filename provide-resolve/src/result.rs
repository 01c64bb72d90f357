//! Resolution results and the resolved dependency graph

use crate::candidate::{Candidate, CollectionKey, ElementKey};
use crate::error::{ResolveError, Result};
use provide_types::{CacheKey, Type};
use rustc_hash::FxHashSet;
use std::sync::Arc;

/// A node of the resolved graph
///
/// Scoped nodes are shared between all dependents within one resolution,
/// so the result is a DAG rather than a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNode {
    pub candidate: Arc<Candidate>,
    /// The produced type with the candidate's type variables bound
    pub produced: Type,
    /// One node per candidate parameter, in parameter order
    pub arguments: Vec<Arc<ResolvedNode>>,
    /// Present when the value is cached in a scope
    pub cache_key: Option<CacheKey>,
    /// Refers back to the nearest enclosing node producing the same type
    ///
    /// Only appears beneath a provider, which defers creation until the
    /// enclosing value exists. Deferred nodes have no arguments.
    pub deferred: bool,
}

impl ResolvedNode {
    pub fn is_scoped(&self) -> bool {
        self.cache_key.is_some()
    }

    /// Visit every distinct node once, dependencies before dependents
    pub fn walk(self: &Arc<Self>, mut visit: impl FnMut(&Arc<ResolvedNode>)) {
        let mut seen = FxHashSet::default();
        Self::walk_inner(self, &mut seen, &mut visit);
    }

    fn walk_inner(
        node: &Arc<ResolvedNode>,
        seen: &mut FxHashSet<*const ResolvedNode>,
        visit: &mut impl FnMut(&Arc<ResolvedNode>),
    ) {
        if !seen.insert(Arc::as_ptr(node)) {
            return;
        }
        for argument in &node.arguments {
            Self::walk_inner(argument, seen, visit);
        }
        visit(node);
    }

    /// Number of distinct nodes reachable from this one, itself included
    pub fn node_count(self: &Arc<Self>) -> usize {
        let mut count = 0;
        self.walk(|_| count += 1);
        count
    }
}

/// Outcome of one resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionResult {
    Success(Arc<ResolvedNode>),
    /// Every candidate tied after all tie-breaks
    Ambiguous {
        request: Type,
        candidates: Vec<Arc<Candidate>>,
    },
    Unresolved(Type),
    /// The dependency path from the first occurrence of a type back to itself
    Cyclic(Vec<Type>),
    /// A synthesized collection hit a `Fail` policy
    DuplicateCollectionKey {
        collection: CollectionKey,
        element: ElementKey,
    },
}

impl ResolutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ResolutionResult::Success(_))
    }

    pub fn node(&self) -> Option<&Arc<ResolvedNode>> {
        match self {
            ResolutionResult::Success(node) => Some(node),
            _ => None,
        }
    }

    /// Convert into a `Result`, for callers that only care about failure
    pub fn into_result(self) -> Result<Arc<ResolvedNode>> {
        match self {
            ResolutionResult::Success(node) => Ok(node),
            ResolutionResult::Ambiguous { request, candidates } => Err(ResolveError::Ambiguous {
                ty: request,
                candidates: candidates.iter().map(|candidate| candidate.id).collect(),
            }),
            ResolutionResult::Unresolved(ty) => Err(ResolveError::Unresolved { ty }),
            ResolutionResult::Cyclic(path) => Err(ResolveError::Cyclic { path }),
            ResolutionResult::DuplicateCollectionKey { collection, element } => {
                Err(ResolveError::DuplicateCollectionKey { collection, element })
            }
        }
    }
}
