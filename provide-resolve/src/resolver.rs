//! Type-directed candidate resolution
//!
//! Given a requested type and the scope chain it is requested from, the
//! resolver picks the best candidate, resolves that candidate's parameters
//! recursively and returns the resulting dependency graph. It never mutates
//! the registry and keeps no state between calls.
//!
//! Requests nothing produces directly may still be synthesized: `Set`/`Map`
//! requests from collection members, and `Function0<T>` requests as a lazy
//! provider of `T`. A provider defers creation, so a cycle passing through
//! one ends in a deferred node instead of failing.

use crate::candidate::{provided_type, Candidate, CollectionKey, Origin, Priority};
use crate::collection::CollectionSynthesizer;
use crate::config::ResolverConfig;
use crate::context::ScopeChain;
use crate::registry::{CandidateRegistry, VisibleCandidate};
use crate::request::ResolutionRequest;
use crate::result::{ResolutionResult, ResolvedNode};
use provide_types::{CacheKey, CandidateId, ScopeId, Type};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Resolves requests against a candidate registry
pub struct Resolver<'r, R: CandidateRegistry + ?Sized> {
    registry: &'r R,
    config: ResolverConfig,
}

impl<'r, R: CandidateRegistry + ?Sized> Resolver<'r, R> {
    pub fn new(registry: &'r R) -> Self {
        Self::with_config(registry, ResolverConfig::default())
    }

    pub fn with_config(registry: &'r R, config: ResolverConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn registry(&self) -> &'r R {
        self.registry
    }

    /// Resolve one request
    ///
    /// The first failure met anywhere in the graph is returned unchanged;
    /// no partial graph is produced.
    pub fn resolve(&self, request: ResolutionRequest) -> ResolutionResult {
        let ResolutionRequest {
            target,
            scope_chain,
            mut in_progress,
        } = request;

        let result = self.run(&scope_chain).resolve(&target, &mut in_progress);

        match &result {
            ResolutionResult::Success(node) => {
                debug!("Resolved {} with {} nodes", target, node.node_count())
            }
            ResolutionResult::Ambiguous { candidates, .. } => {
                debug!("Ambiguous request {}: {} candidates tied", target, candidates.len())
            }
            ResolutionResult::Unresolved(ty) => {
                debug!("Could not resolve {} (missing {})", target, ty)
            }
            ResolutionResult::Cyclic(path) => {
                debug!("Cycle while resolving {} ({} types)", target, path.len())
            }
            ResolutionResult::DuplicateCollectionKey { collection, element } => {
                debug!("Duplicate element {} in {} while resolving {}", element, collection, target)
            }
        }
        result
    }

    /// Resolve `target` from `chain` with an empty in-progress stack
    pub fn resolve_type(&self, target: Type, chain: &ScopeChain) -> ResolutionResult {
        self.resolve(ResolutionRequest::new(target, chain.clone()))
    }

    /// Resolve the eager candidates of `scope`, in declaration order
    ///
    /// All entries share one run, so a scoped dependency appears as the same
    /// node across the list. Candidates with type variables are skipped since
    /// nothing fixes their arguments. Nothing is eager for a scope the chain
    /// does not host.
    pub fn resolve_eager(&self, scope: &ScopeId, chain: &ScopeChain) -> Vec<ResolutionResult> {
        if !chain.contains_scope(scope) {
            return Vec::new();
        }
        let mut run = self.run(chain);
        let results: Vec<ResolutionResult> = self
            .registry
            .eager_candidates(scope, chain)
            .into_iter()
            .filter(|visible| {
                let generic = !visible.candidate.freshening().is_empty();
                if generic {
                    debug!("Skipping generic eager candidate {}", visible.candidate);
                }
                !generic
            })
            .map(|visible| {
                let produced = visible.produced_type();
                run.resolve_candidate(&produced, visible, &mut Vec::new())
            })
            .collect();

        debug!("Resolved {} eager candidates for {}", results.len(), scope);
        results
    }

    fn run<'a>(&'a self, chain: &'a ScopeChain) -> ResolutionRun<'a, R> {
        ResolutionRun {
            registry: self.registry,
            config: &self.config,
            chain,
            shared: FxHashMap::default(),
            providers: Vec::new(),
            next_synthetic: 0,
        }
    }
}

/// Outcome of ranking the eligible candidates of one request
enum Ranking {
    Winner(VisibleCandidate),
    Tied(Vec<VisibleCandidate>),
}

/// State of one top-level resolution
struct ResolutionRun<'a, R: CandidateRegistry + ?Sized> {
    registry: &'a R,
    config: &'a ResolverConfig,
    chain: &'a ScopeChain,
    /// Scoped nodes built so far, shared by every later dependent
    shared: FxHashMap<CacheKey, Arc<ResolvedNode>>,
    /// In-progress positions held by synthesized providers
    providers: Vec<usize>,
    next_synthetic: u32,
}

impl<'a, R: CandidateRegistry + ?Sized> ResolutionRun<'a, R> {
    fn resolve(&mut self, target: &Type, in_progress: &mut Vec<Type>) -> ResolutionResult {
        if let Some(start) = in_progress.iter().position(|ty| ty == target) {
            if self.providers.iter().any(|&position| position >= start) {
                trace!("Deferring {} behind a provider", target);
                return ResolutionResult::Success(self.deferred(target));
            }
            let mut path = in_progress[start..].to_vec();
            path.push(target.clone());
            return ResolutionResult::Cyclic(path);
        }
        if in_progress.len() >= self.config.max_depth {
            let mut path = in_progress.clone();
            path.push(target.clone());
            return ResolutionResult::Cyclic(path);
        }

        let eligible: Vec<VisibleCandidate> = self
            .registry
            .candidates_for(target, self.chain)
            .into_iter()
            .filter(|visible| self.is_eligible(&visible.candidate))
            .collect();

        if eligible.is_empty() {
            if self.config.synthesize_collections {
                if let Some(key) = CollectionKey::of(target) {
                    return self.synthesize_collection(target, key, in_progress);
                }
            }
            if self.config.synthesize_providers {
                if let Some(provided) = provided_type(target) {
                    return self.synthesize_provider(target, provided.clone(), in_progress);
                }
            }
            return ResolutionResult::Unresolved(target.clone());
        }

        trace!("Ranking {} candidates for {}", eligible.len(), target);
        match rank(eligible) {
            Ranking::Winner(winner) => self.resolve_candidate(target, winner, in_progress),
            Ranking::Tied(survivors) => ResolutionResult::Ambiguous {
                request: target.clone(),
                candidates: survivors.into_iter().map(|visible| visible.candidate).collect(),
            },
        }
    }

    /// A scoped candidate is only usable where its scope is hosted
    fn is_eligible(&self, candidate: &Candidate) -> bool {
        candidate
            .declared_scope
            .as_ref()
            .map_or(true, |scope| self.chain.contains_scope(scope))
    }

    fn resolve_candidate(
        &mut self,
        target: &Type,
        winner: VisibleCandidate,
        in_progress: &mut Vec<Type>,
    ) -> ResolutionResult {
        let cache_key = winner
            .candidate
            .declared_scope
            .clone()
            .map(|scope| CacheKey::new(scope, winner.slot_id()));
        if let Some(node) = cache_key.as_ref().and_then(|key| self.shared.get(key)) {
            trace!("Sharing {} for {}", winner.candidate, target);
            return ResolutionResult::Success(node.clone());
        }

        let arguments = match self.resolve_all(target, winner.parameter_types(), in_progress) {
            Ok(arguments) => arguments,
            Err(failure) => return failure,
        };

        let node = Arc::new(ResolvedNode {
            produced: winner.produced_type(),
            candidate: winner.candidate,
            arguments,
            cache_key: cache_key.clone(),
            deferred: false,
        });
        if let Some(key) = cache_key {
            self.shared.insert(key, node.clone());
        }
        ResolutionResult::Success(node)
    }

    /// Resolve `dependencies` of `target` in order, stopping at the first failure
    fn resolve_all(
        &mut self,
        target: &Type,
        dependencies: Vec<Type>,
        in_progress: &mut Vec<Type>,
    ) -> Result<Vec<Arc<ResolvedNode>>, ResolutionResult> {
        in_progress.push(target.clone());
        let mut arguments = Vec::with_capacity(dependencies.len());
        let mut failure = None;
        for dependency in &dependencies {
            match self.resolve(dependency, in_progress) {
                ResolutionResult::Success(node) => arguments.push(node),
                other => {
                    failure = Some(other);
                    break;
                }
            }
        }
        in_progress.pop();
        match failure {
            Some(failure) => Err(failure),
            None => Ok(arguments),
        }
    }

    fn synthesize_collection(
        &mut self,
        target: &Type,
        key: CollectionKey,
        in_progress: &mut Vec<Type>,
    ) -> ResolutionResult {
        let members = match CollectionSynthesizer::new(self.registry).resolve_collection(
            key.element_type(),
            &key,
            self.chain,
        ) {
            Ok(members) => members,
            Err(conflict) => {
                return ResolutionResult::DuplicateCollectionKey {
                    collection: conflict.collection,
                    element: conflict.element,
                }
            }
        };
        trace!("Synthesizing {} from {} members", target, members.len());

        in_progress.push(target.clone());
        let mut arguments = Vec::with_capacity(members.len());
        let mut failure = None;
        for member in members {
            let produced = member.produced_type();
            match self.resolve_candidate(&produced, member, in_progress) {
                ResolutionResult::Success(node) => arguments.push(node),
                other => {
                    failure = Some(other);
                    break;
                }
            }
        }
        in_progress.pop();
        if let Some(failure) = failure {
            return failure;
        }

        ResolutionResult::Success(self.synthesized(target, arguments))
    }

    /// A provider of `provided`; its argument may refer back to a type that
    /// is still in progress
    fn synthesize_provider(
        &mut self,
        target: &Type,
        provided: Type,
        in_progress: &mut Vec<Type>,
    ) -> ResolutionResult {
        self.providers.push(in_progress.len());
        let arguments = self.resolve_all(target, vec![provided], in_progress);
        self.providers.pop();

        match arguments {
            Ok(arguments) => {
                trace!("Synthesizing provider {}", target);
                ResolutionResult::Success(self.synthesized(target, arguments))
            }
            Err(failure) => failure,
        }
    }

    fn synthesized(
        &mut self,
        target: &Type,
        arguments: Vec<Arc<ResolvedNode>>,
    ) -> Arc<ResolvedNode> {
        let candidate = Candidate::new(self.allocate_id(), target.clone())
            .with_parameters(arguments.iter().map(|argument| argument.produced.clone()))
            .origin(Origin::FrameworkSynthesized);

        Arc::new(ResolvedNode {
            candidate: Arc::new(candidate),
            produced: target.clone(),
            arguments,
            cache_key: None,
            deferred: false,
        })
    }

    fn deferred(&mut self, target: &Type) -> Arc<ResolvedNode> {
        let candidate =
            Candidate::new(self.allocate_id(), target.clone()).origin(Origin::FrameworkSynthesized);
        Arc::new(ResolvedNode {
            candidate: Arc::new(candidate),
            produced: target.clone(),
            arguments: Vec::new(),
            cache_key: None,
            deferred: true,
        })
    }

    fn allocate_id(&mut self) -> CandidateId {
        let id = CandidateId::synthetic(self.next_synthetic);
        self.next_synthetic += 1;
        id
    }
}

/// Apply the tie-breaks in order: fallback exclusion, local values, chain
/// position, priority tier
fn rank(mut pool: Vec<VisibleCandidate>) -> Ranking {
    if pool
        .iter()
        .any(|visible| visible.candidate.priority != Priority::Fallback)
    {
        pool.retain(|visible| visible.candidate.priority != Priority::Fallback);
    }

    if pool
        .iter()
        .any(|visible| visible.candidate.origin == Origin::LocalValue)
    {
        pool.retain(|visible| visible.candidate.origin == Origin::LocalValue);
    }

    if let Some(innermost) = pool.iter().map(|visible| visible.depth).min() {
        pool.retain(|visible| visible.depth == innermost);
    }

    if let Some(best) = pool.iter().map(|visible| visible.candidate.priority).min() {
        pool.retain(|visible| visible.candidate.priority == best);
    }

    if pool.len() == 1 {
        Ranking::Winner(pool.remove(0))
    } else {
        Ranking::Tied(pool)
    }
}
