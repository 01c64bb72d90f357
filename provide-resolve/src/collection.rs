//! Collection assembly for `Set<T>` and `Map<K, V>` requests
//!
//! Membership is additive: every visible member contributes, and duplicate
//! element keys are settled by the incoming entry's [`OverridePolicy`]
//! instead of the single-candidate tie-break.
//!
//! Entries are folded outermost context first, in declaration order within
//! a context, so an inner declaration counts as "later" than an outer one.
//! `Permit` keeps duplicates only in sets; in maps it behaves like `Fail`.

use crate::candidate::{CollectionKey, ElementKey, OverridePolicy};
use crate::context::ScopeChain;
use crate::registry::{CandidateRegistry, VisibleCandidate};
use crate::ResolveError;
use provide_types::Type;
use rustc_hash::FxHashMap;
use tracing::trace;

/// Two entries of `collection` share `element` under the `Fail` policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionConflict {
    pub collection: CollectionKey,
    pub element: ElementKey,
}

impl From<CollectionConflict> for ResolveError {
    fn from(conflict: CollectionConflict) -> Self {
        ResolveError::DuplicateCollectionKey {
            collection: conflict.collection,
            element: conflict.element,
        }
    }
}

/// Assembles collection members from a registry
pub struct CollectionSynthesizer<'r, R: CandidateRegistry + ?Sized> {
    registry: &'r R,
}

impl<'r, R: CandidateRegistry + ?Sized> CollectionSynthesizer<'r, R> {
    pub fn new(registry: &'r R) -> Self {
        Self { registry }
    }

    /// The members of `key` visible from `chain`, after applying override policies
    ///
    /// Members whose declared scope is not hosted by the chain, or whose
    /// produced type does not satisfy `element_type`, are skipped.
    pub fn resolve_collection(
        &self,
        element_type: &Type,
        key: &CollectionKey,
        chain: &ScopeChain,
    ) -> Result<Vec<VisibleCandidate>, CollectionConflict> {
        let hierarchy = self.registry.hierarchy();
        let mut members: Vec<VisibleCandidate> = self
            .registry
            .collection_members(key, chain)
            .into_iter()
            .filter(|member| {
                member
                    .candidate
                    .declared_scope
                    .as_ref()
                    .map_or(true, |scope| chain.contains_scope(scope))
            })
            .filter_map(|mut member| {
                let produced = member.candidate.freshening().apply(&member.candidate.produced);
                let bindings = hierarchy.match_request(&produced, element_type)?;
                member.bindings = bindings;
                Some(member)
            })
            .collect();

        // Stable: keeps declaration order within a context
        members.sort_by(|a, b| b.depth.cmp(&a.depth));

        let mut entries: Vec<(ElementKey, VisibleCandidate)> = Vec::with_capacity(members.len());
        let mut positions: FxHashMap<ElementKey, usize> = FxHashMap::default();

        for member in members {
            let Some(membership) = member.candidate.membership(key) else {
                continue;
            };
            let element = membership
                .element
                .clone()
                .unwrap_or_else(|| ElementKey::new(member.produced_type().to_string()));
            // A map cannot hold two values under one key
            let policy = match membership.policy {
                OverridePolicy::Permit if key.is_map() => OverridePolicy::Fail,
                policy => policy,
            };

            let Some(&position) = positions.get(&element) else {
                positions.insert(element.clone(), entries.len());
                entries.push((element, member));
                continue;
            };

            trace!(
                "Duplicate element {} in {}: {} resolved with {:?}",
                element,
                key,
                member.candidate.id,
                policy
            );
            match policy {
                OverridePolicy::Fail => {
                    return Err(CollectionConflict {
                        collection: key.clone(),
                        element,
                    })
                }
                OverridePolicy::Override => entries[position] = (element, member),
                OverridePolicy::Drop => {}
                OverridePolicy::Permit => entries.push((element, member)),
            }
        }

        Ok(entries.into_iter().map(|(_, member)| member).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{Candidate, CollectionMembership};
    use crate::context::ScopeContext;
    use crate::registry::RegistryBuilder;

    fn commands() -> CollectionKey {
        CollectionKey::set(Type::named("Command"))
    }

    fn member(id: u32, produced: &str, policy: OverridePolicy) -> Candidate {
        Candidate::new(id, Type::named(produced))
            .member_of(CollectionMembership::new(commands()).policy(policy))
    }

    fn ids(members: &[VisibleCandidate]) -> Vec<u32> {
        members.iter().map(|member| member.candidate.id.0).collect()
    }

    #[test]
    fn test_distinct_members_all_included() {
        let mut builder = RegistryBuilder::new();
        builder
            .candidate(member(1, "Command", OverridePolicy::Fail))
            .candidate(
                Candidate::new(2, Type::named("Command").tagged("help"))
                    .member_of(CollectionMembership::new(commands())),
            );
        let registry = builder.build().unwrap();
        let members = CollectionSynthesizer::new(&registry)
            .resolve_collection(&Type::named("Command"), &commands(), &ScopeChain::default())
            .unwrap();
        assert_eq!(ids(&members), vec![1, 2]);
    }

    #[test]
    fn test_fail_policy() {
        let mut builder = RegistryBuilder::new();
        builder
            .candidate(member(1, "Command", OverridePolicy::Fail))
            .candidate(member(2, "Command", OverridePolicy::Fail));
        let registry = builder.build().unwrap();
        let conflict = CollectionSynthesizer::new(&registry)
            .resolve_collection(&Type::named("Command"), &commands(), &ScopeChain::default())
            .unwrap_err();
        assert_eq!(conflict.element, ElementKey::from("Command"));
    }

    #[test]
    fn test_override_inner_replaces_outer() {
        let mut builder = RegistryBuilder::new();
        builder
            .candidate_in("inner", member(1, "Command", OverridePolicy::Override))
            .candidate_in("outer", member(2, "Command", OverridePolicy::Fail));
        let registry = builder.build().unwrap();
        let chain = ScopeChain::new([
            ScopeContext::lexical("inner"),
            ScopeContext::lexical("outer"),
        ]);
        let members = CollectionSynthesizer::new(&registry)
            .resolve_collection(&Type::named("Command"), &commands(), &chain)
            .unwrap();
        assert_eq!(ids(&members), vec![1]);
    }

    #[test]
    fn test_permit_keeps_both() {
        let mut builder = RegistryBuilder::new();
        builder
            .candidate(member(1, "Command", OverridePolicy::Fail))
            .candidate(member(2, "Command", OverridePolicy::Permit));
        let registry = builder.build().unwrap();
        let members = CollectionSynthesizer::new(&registry)
            .resolve_collection(&Type::named("Command"), &commands(), &ScopeChain::default())
            .unwrap();
        assert_eq!(ids(&members), vec![1, 2]);
    }

    #[test]
    fn test_permit_fails_on_map_keys() {
        let handlers = CollectionKey::map(Type::named("String"), Type::named("Handler"));
        let entry = |id: u32, policy: OverridePolicy| {
            Candidate::new(id, Type::named("Handler"))
                .member_of(CollectionMembership::new(handlers.clone()).keyed("get").policy(policy))
        };
        let mut builder = RegistryBuilder::new();
        builder
            .candidate(entry(1, OverridePolicy::Fail))
            .candidate(entry(2, OverridePolicy::Permit));
        let registry = builder.build().unwrap();
        let conflict = CollectionSynthesizer::new(&registry)
            .resolve_collection(&Type::named("Handler"), &handlers, &ScopeChain::default())
            .unwrap_err();
        assert_eq!(conflict.collection, handlers);
        assert_eq!(conflict.element, ElementKey::from("get"));
    }

    #[test]
    fn test_member_outside_chain_scope_skipped() {
        let mut builder = RegistryBuilder::new();
        builder
            .candidate(member(1, "Command", OverridePolicy::Fail).scoped("ActivityScope"))
            .candidate(member(2, "Command", OverridePolicy::Fail).scoped("AppScope"));
        let registry = builder.build().unwrap();
        let chain = ScopeChain::of_scopes(["AppScope"]);
        let members = CollectionSynthesizer::new(&registry)
            .resolve_collection(&Type::named("Command"), &commands(), &chain)
            .unwrap();
        assert_eq!(ids(&members), vec![2]);
    }
}
