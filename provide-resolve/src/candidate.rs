//! Candidate declarations
//!
//! A [`Candidate`] is an immutable fact supplied by the front-end: one way
//! to produce a value of a given type. Every binding kind (explicit
//! provider, local value, constructor, synthesized collection) is the same
//! struct, distinguished by its [`Origin`].

use provide_types::{CandidateId, Name, ScopeId, Substitution, Type};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classifier name of synthesized set requests
pub const SET_CLASSIFIER: &str = "Set";
/// Classifier name of synthesized map requests
pub const MAP_CLASSIFIER: &str = "Map";
/// Classifier name of zero-argument function types, `Function0<T>` being `() -> T`
pub const PROVIDER_CLASSIFIER: &str = "Function0";

/// Where a candidate comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// An explicitly declared provider function or property
    #[default]
    Explicit,
    /// A value bound in the local lexical context
    LocalValue,
    /// A constructor of the produced class
    ConstructorDerived,
    /// Built by the resolver itself, e.g. a collection or a provider
    FrameworkSynthesized,
}

/// Tie-break tier, lower wins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    Normal,
    LowPriority,
    /// Only used when nothing else matches the request
    Fallback,
}

/// What happens when two collection entries share an element key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverridePolicy {
    /// The collection cannot be assembled
    #[default]
    Fail,
    /// The later entry replaces the earlier one
    Override,
    /// The later entry is discarded
    Drop,
    /// Both entries are kept
    Permit,
}

/// Identity of a collection: the requested `Set<E>` or `Map<K, V>` type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionKey(Type);

impl CollectionKey {
    pub fn set(element: Type) -> Self {
        Self(Type::generic(SET_CLASSIFIER, [element]))
    }

    pub fn map(key: Type, value: Type) -> Self {
        Self(Type::generic(MAP_CLASSIFIER, [key, value]))
    }

    /// The collection key for `ty`, if it is a set or map type
    pub fn of(ty: &Type) -> Option<Self> {
        let arity = match ty.name() {
            SET_CLASSIFIER => 1,
            MAP_CLASSIFIER => 2,
            _ => return None,
        };
        if ty.is_parameter() || ty.arguments().len() != arity {
            return None;
        }
        Some(Self(ty.clone().non_null()))
    }

    /// Tag the collection itself, e.g. to keep two `Set<Command>`s apart
    pub fn tagged(self, tag: &str) -> Self {
        Self(self.0.tagged(tag))
    }

    pub fn ty(&self) -> &Type {
        &self.0
    }

    pub fn is_map(&self) -> bool {
        self.0.name() == MAP_CLASSIFIER
    }

    /// The type every member must produce
    pub fn element_type(&self) -> &Type {
        self.0.arguments().last().unwrap_or(&self.0)
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The type a provider request yields, if `ty` is `Function0<T>`
pub fn provided_type(ty: &Type) -> Option<&Type> {
    if ty.name() != PROVIDER_CLASSIFIER || ty.is_parameter() {
        return None;
    }
    match ty.arguments() {
        [provided] => Some(provided),
        _ => None,
    }
}

/// Identity of an entry within one collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementKey(Name);

impl ElementKey {
    pub fn new(key: impl Into<Name>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ElementKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A candidate's opt-in to a collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionMembership {
    pub key: CollectionKey,
    /// Entry identity; defaults to the member's produced type
    #[serde(default)]
    pub element: Option<ElementKey>,
    #[serde(default)]
    pub policy: OverridePolicy,
}

impl CollectionMembership {
    pub fn new(key: CollectionKey) -> Self {
        Self {
            key,
            element: None,
            policy: OverridePolicy::default(),
        }
    }

    pub fn keyed(mut self, element: impl Into<ElementKey>) -> Self {
        self.element = Some(element.into());
        self
    }

    pub fn policy(mut self, policy: OverridePolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// One way to produce a value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub produced: Type,
    #[serde(default)]
    pub parameters: Vec<Type>,
    /// Scope the produced value is cached in; unscoped when absent
    #[serde(default)]
    pub declared_scope: Option<ScopeId>,
    #[serde(default)]
    pub origin: Origin,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub collections: Vec<CollectionMembership>,
    /// Created while the declared scope is being built
    #[serde(default)]
    pub eager: bool,
}

impl Candidate {
    pub fn new(id: impl Into<CandidateId>, produced: Type) -> Self {
        Self {
            id: id.into(),
            produced,
            parameters: Vec::new(),
            declared_scope: None,
            origin: Origin::default(),
            priority: Priority::default(),
            collections: Vec::new(),
            eager: false,
        }
    }

    pub fn with_parameters(mut self, parameters: impl IntoIterator<Item = Type>) -> Self {
        self.parameters = parameters.into_iter().collect();
        self
    }

    pub fn scoped(mut self, scope: impl Into<ScopeId>) -> Self {
        self.declared_scope = Some(scope.into());
        self
    }

    pub fn origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn member_of(mut self, membership: CollectionMembership) -> Self {
        self.collections.push(membership);
        self
    }

    pub fn eager(mut self) -> Self {
        self.eager = true;
        self
    }

    pub fn is_generic(&self) -> bool {
        self.produced.has_parameters()
    }

    /// Membership in `key`, if declared
    pub fn membership(&self, key: &CollectionKey) -> Option<&CollectionMembership> {
        self.collections.iter().find(|membership| &membership.key == key)
    }

    /// Renaming of this candidate's type variables into its private namespace
    pub fn freshening(&self) -> Substitution {
        if !self.is_generic() && !self.parameters.iter().any(Type::has_parameters) {
            return Substitution::new();
        }
        let mut names = self.produced.parameters();
        for parameter in &self.parameters {
            names.extend(parameter.parameters());
        }
        Substitution::freshening(&names, &self.id.0.to_string())
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.produced)?;
        if let Some(scope) = &self.declared_scope {
            write!(f, " in {}", scope)?;
        }
        Ok(())
    }
}
