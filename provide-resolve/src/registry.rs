//! Candidate registry: the lookup the resolver searches
//!
//! The registry is populated by an external discovery pass and is read-only
//! during resolution. Implementations must enumerate candidates innermost
//! context first; ambient declarations come last.

use crate::candidate::{Candidate, CollectionKey};
use crate::context::{ContextId, ScopeChain};
use crate::error::{ResolveError, Result};
use provide_types::{CandidateId, ClassDecl, ScopeId, SlotId, Substitution, Type, TypeHierarchy};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use tracing::debug;

/// A candidate as seen from a particular scope chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleCandidate {
    pub candidate: Arc<Candidate>,
    /// Chain position of the declaring context, 0 being innermost
    pub depth: usize,
    /// Bindings of the candidate's (freshened) type variables
    pub bindings: Substitution,
}

impl VisibleCandidate {
    pub fn new(candidate: Arc<Candidate>, depth: usize) -> Self {
        Self {
            candidate,
            depth,
            bindings: Substitution::new(),
        }
    }

    fn instantiate(&self, ty: &Type) -> Type {
        let fresh = self.candidate.freshening().apply(ty);
        self.bindings.apply(&fresh)
    }

    /// The produced type with the bindings applied
    pub fn produced_type(&self) -> Type {
        self.instantiate(&self.candidate.produced)
    }

    /// The parameter types with the bindings applied
    pub fn parameter_types(&self) -> Vec<Type> {
        self.candidate
            .parameters
            .iter()
            .map(|parameter| self.instantiate(parameter))
            .collect()
    }

    /// Slot this instantiation is cached in when scoped
    pub fn slot_id(&self) -> SlotId {
        SlotId::new(self.candidate.id, self.bindings.values().cloned().collect())
    }
}

/// Source of candidates for resolution
pub trait CandidateRegistry {
    /// Classifier declarations used for subtyping
    fn hierarchy(&self) -> &TypeHierarchy;

    /// Visible candidates whose produced type is request-compatible with
    /// `request`, innermost context first
    fn candidates_for(&self, request: &Type, chain: &ScopeChain) -> Vec<VisibleCandidate>;

    /// Visible candidates that declared membership in `key`, innermost
    /// context first, declaration order within a context
    fn collection_members(&self, key: &CollectionKey, chain: &ScopeChain) -> Vec<VisibleCandidate>;

    /// Visible candidates flagged eager whose declared scope is `scope`,
    /// in declaration order
    fn eager_candidates(&self, scope: &ScopeId, chain: &ScopeChain) -> Vec<VisibleCandidate>;
}

/// In-memory registry
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    hierarchy: TypeHierarchy,
    /// Declaration order
    candidates: Vec<Arc<Candidate>>,
    by_context: FxHashMap<ContextId, Vec<usize>>,
    ambient: Vec<usize>,
    by_id: FxHashMap<CandidateId, usize>,
}

impl StaticRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn get(&self, id: CandidateId) -> Option<&Arc<Candidate>> {
        self.by_id.get(&id).map(|&index| &self.candidates[index])
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// All candidates in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Candidate>> {
        self.candidates.iter()
    }

    /// Indices of the candidates visible from `chain` with their depth,
    /// innermost first
    fn visible<'a>(&'a self, chain: &'a ScopeChain) -> impl Iterator<Item = (usize, usize)> + 'a {
        let declared = chain.iter().enumerate().flat_map(move |(depth, context)| {
            self.by_context
                .get(&context.id)
                .into_iter()
                .flatten()
                .map(move |&index| (depth, index))
        });
        let ambient = self.ambient.iter().map(move |&index| (chain.len(), index));
        declared.chain(ambient)
    }
}

impl CandidateRegistry for StaticRegistry {
    fn hierarchy(&self) -> &TypeHierarchy {
        &self.hierarchy
    }

    fn candidates_for(&self, request: &Type, chain: &ScopeChain) -> Vec<VisibleCandidate> {
        self.visible(chain)
            .filter_map(|(depth, index)| {
                let candidate = &self.candidates[index];
                let produced = candidate.freshening().apply(&candidate.produced);
                self.hierarchy
                    .match_request(&produced, request)
                    .map(|bindings| VisibleCandidate {
                        candidate: candidate.clone(),
                        depth,
                        bindings,
                    })
            })
            .collect()
    }

    fn collection_members(&self, key: &CollectionKey, chain: &ScopeChain) -> Vec<VisibleCandidate> {
        self.visible(chain)
            .filter(|&(_, index)| self.candidates[index].membership(key).is_some())
            .map(|(depth, index)| VisibleCandidate::new(self.candidates[index].clone(), depth))
            .collect()
    }

    fn eager_candidates(&self, scope: &ScopeId, chain: &ScopeChain) -> Vec<VisibleCandidate> {
        let mut found: Vec<(usize, usize)> = self
            .visible(chain)
            .filter(|&(_, index)| {
                let candidate = &self.candidates[index];
                candidate.eager && candidate.declared_scope.as_ref() == Some(scope)
            })
            .collect();
        found.sort_by_key(|&(_, index)| index);
        found
            .into_iter()
            .map(|(depth, index)| VisibleCandidate::new(self.candidates[index].clone(), depth))
            .collect()
    }
}

/// Builder for [`StaticRegistry`]
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    hierarchy: TypeHierarchy,
    declarations: Vec<(Option<ContextId>, Candidate)>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a classifier for subtyping
    pub fn class(&mut self, decl: ClassDecl) -> &mut Self {
        self.hierarchy.declare(decl);
        self
    }

    /// Register a candidate visible from every chain
    pub fn candidate(&mut self, candidate: Candidate) -> &mut Self {
        self.declarations.push((None, candidate));
        self
    }

    /// Register a candidate declared in `context`
    pub fn candidate_in(
        &mut self,
        context: impl Into<ContextId>,
        candidate: Candidate,
    ) -> &mut Self {
        self.declarations.push((Some(context.into()), candidate));
        self
    }

    /// Build the registry, rejecting duplicate candidate ids
    pub fn build(self) -> Result<StaticRegistry> {
        let mut registry = StaticRegistry {
            hierarchy: self.hierarchy,
            ..StaticRegistry::default()
        };
        let mut seen = FxHashSet::default();

        for (context, candidate) in self.declarations {
            if !seen.insert(candidate.id) {
                return Err(ResolveError::DuplicateCandidate(candidate.id));
            }
            let index = registry.candidates.len();
            registry.by_id.insert(candidate.id, index);
            registry.candidates.push(Arc::new(candidate));
            match context {
                Some(context) => registry.by_context.entry(context).or_default().push(index),
                None => registry.ambient.push(index),
            }
        }

        debug!(
            "Built registry with {} candidates and {} classes",
            registry.candidates.len(),
            registry.hierarchy.len()
        );
        Ok(registry)
    }
}
