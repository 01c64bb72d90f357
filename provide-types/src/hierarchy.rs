//! Classifier declarations, subtyping and request compatibility

use crate::subst::Substitution;
use crate::types::{Name, Type};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Bound on supertype chains followed during one comparison
const MAX_SUPERTYPE_DEPTH: usize = 64;

/// Declaration-site variance of a type parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variance {
    #[default]
    Invariant,
    /// `out` position: arguments are compared covariantly
    Covariant,
    /// `in` position: arguments are compared contravariantly
    Contravariant,
}

/// A declared type parameter of a classifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeParam {
    pub name: Name,
    #[serde(default)]
    pub variance: Variance,
}

impl TypeParam {
    pub fn invariant(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            variance: Variance::Invariant,
        }
    }

    pub fn covariant(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            variance: Variance::Covariant,
        }
    }

    pub fn contravariant(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            variance: Variance::Contravariant,
        }
    }
}

/// Declaration of a classifier: its type parameters and direct supertypes
///
/// Supertypes may mention the declared type parameters by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: Name,
    #[serde(default)]
    pub type_parameters: Vec<TypeParam>,
    #[serde(default)]
    pub supertypes: Vec<Type>,
}

impl ClassDecl {
    pub fn new(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            type_parameters: Vec::new(),
            supertypes: Vec::new(),
        }
    }

    pub fn with_param(mut self, param: TypeParam) -> Self {
        self.type_parameters.push(param);
        self
    }

    pub fn extends(mut self, supertype: Type) -> Self {
        self.supertypes.push(supertype);
        self
    }
}

/// Table of classifier declarations
///
/// Classifiers that were never declared have no supertypes and invariant
/// arguments.
#[derive(Debug, Clone, Default)]
pub struct TypeHierarchy {
    classes: FxHashMap<Name, ClassDecl>,
}

impl TypeHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a classifier, replacing an earlier declaration of the same name
    pub fn declare(&mut self, decl: ClassDecl) -> Option<ClassDecl> {
        self.classes.insert(decl.name.clone(), decl)
    }

    pub fn get(&self, name: &str) -> Option<&ClassDecl> {
        self.classes.get(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Variance of the `index`-th argument of `classifier`
    pub fn variance(&self, classifier: &str, index: usize) -> Variance {
        self.classes
            .get(classifier)
            .and_then(|decl| decl.type_parameters.get(index))
            .map(|param| param.variance)
            .unwrap_or_default()
    }

    /// Direct supertypes of `ty`, with its arguments substituted in
    ///
    /// Supertypes inherit the nullability and tags of `ty`.
    pub fn supertypes(&self, ty: &Type) -> Vec<Type> {
        if ty.is_parameter() {
            return Vec::new();
        }
        let Some(decl) = self.classes.get(ty.name()) else {
            return Vec::new();
        };
        if decl.type_parameters.len() != ty.arguments().len() {
            return Vec::new();
        }

        let substitution: Substitution = decl
            .type_parameters
            .iter()
            .zip(ty.arguments())
            .map(|(param, argument)| (param.name.clone(), argument.clone()))
            .collect();

        decl.supertypes
            .iter()
            .map(|supertype| {
                let mut result = substitution.apply(supertype);
                if ty.is_null_compatible() {
                    result = result.null_compatible();
                } else if ty.is_nullable() {
                    result = result.nullable();
                }
                result.with_tags(ty.tags().iter().cloned())
            })
            .collect()
    }

    /// Structural subtyping, tags included
    pub fn is_subtype(&self, sub: &Type, sup: &Type) -> bool {
        Matcher::new(self, BTreeSet::new()).subtype(sub, sup, false)
    }

    /// Whether a candidate producing `candidate` may satisfy `request`
    ///
    /// The candidate must be a structural subtype of the request and carry
    /// at least the request's tags. A nullable candidate only satisfies a
    /// non-null request when it is marked null-compatible.
    pub fn is_request_compatible(&self, candidate: &Type, request: &Type) -> bool {
        self.match_request(candidate, request).is_some()
    }

    /// Like [`is_request_compatible`](Self::is_request_compatible), also
    /// returning the bindings of the candidate's type variables
    pub fn match_request(&self, candidate: &Type, request: &Type) -> Option<Substitution> {
        let mut matcher = Matcher::new(self, candidate.parameters());
        if matcher.subtype(candidate, request, true) {
            Some(matcher.bindings)
        } else {
            None
        }
    }
}

/// Which side of the comparison a type variable occurrence sits on
#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Sub,
    Super,
}

/// A supertype search: `(sub, sup, top)`
type Goal = (Type, Type, bool);

struct Matcher<'h> {
    hierarchy: &'h TypeHierarchy,
    /// Variables that may be bound; every other variable is rigid
    flexible: BTreeSet<Name>,
    bindings: Substitution,
    /// Supertype searches currently being explored, outermost first
    active: Vec<Goal>,
    /// Searches known to fail under the current bindings
    failed: FxHashSet<Goal>,
    /// Lowest `active` index a cut search pointed back to
    lowest_cut: usize,
}

impl<'h> Matcher<'h> {
    fn new(hierarchy: &'h TypeHierarchy, flexible: BTreeSet<Name>) -> Self {
        Self {
            hierarchy,
            flexible,
            bindings: Substitution::new(),
            active: Vec::new(),
            failed: FxHashSet::default(),
            lowest_cut: usize::MAX,
        }
    }

    fn is_flexible(&self, ty: &Type) -> bool {
        ty.is_parameter() && self.flexible.contains(ty.shared_name())
    }

    fn subtype(&mut self, sub: &Type, sup: &Type, top: bool) -> bool {
        if self.is_flexible(sub) {
            return self.bind_or_check(sub, sup, Side::Sub, top);
        }
        if self.is_flexible(sup) {
            return self.bind_or_check(sup, sub, Side::Super, top);
        }

        if !nullability_ok(sub, sup, top) || !sub.tags().is_superset(sup.tags()) {
            return false;
        }

        if sub.is_parameter() || sup.is_parameter() {
            return sub.is_parameter() && sup.is_parameter() && sub.name() == sup.name();
        }

        if sub.name() == sup.name() {
            return self.arguments(sub, sup);
        }

        self.via_supertypes(sub, sup, top)
    }

    fn bind_or_check(&mut self, occurrence: &Type, target: &Type, side: Side, top: bool) -> bool {
        if self.bindings.contains(occurrence.name()) {
            let applied = occurrence.substitute(&self.bindings);
            return match side {
                Side::Sub => self.subtype(&applied, target, top),
                Side::Super => self.subtype(target, &applied, top),
            };
        }

        match side {
            Side::Sub => {
                if !nullability_ok(occurrence, target, top) {
                    return false;
                }
            }
            Side::Super => {
                if !target.tags().is_superset(occurrence.tags()) {
                    return false;
                }
            }
        }

        let mut bound = target
            .clone()
            .with_tags(target.tags().difference(occurrence.tags()).cloned().collect::<Vec<_>>());
        if occurrence.is_nullable() {
            bound = bound.non_null();
        }
        self.bindings.insert(occurrence.shared_name().clone(), bound);
        true
    }

    fn arguments(&mut self, sub: &Type, sup: &Type) -> bool {
        if sub.arguments().len() != sup.arguments().len() {
            return false;
        }
        for (index, (a, b)) in sub.arguments().iter().zip(sup.arguments()).enumerate() {
            let ok = match self.hierarchy.variance(sub.name(), index) {
                Variance::Covariant => self.subtype(a, b, false),
                Variance::Contravariant => self.subtype(b, a, false),
                Variance::Invariant => self.subtype(a, b, false) && self.subtype(b, a, false),
            };
            if !ok {
                return false;
            }
        }
        true
    }

    /// Search the supertypes of `sub` for one that satisfies `sup`
    ///
    /// Each goal is explored at most once per path, so cyclic class tables
    /// terminate. A failed goal is remembered unless its result depended on
    /// a goal that was still open further up the path.
    fn via_supertypes(&mut self, sub: &Type, sup: &Type, top: bool) -> bool {
        let goal = (sub.clone(), sup.clone(), top);
        if self.failed.contains(&goal) {
            return false;
        }
        if let Some(index) = self.active.iter().position(|open| open == &goal) {
            self.lowest_cut = self.lowest_cut.min(index);
            return false;
        }
        if self.active.len() >= MAX_SUPERTYPE_DEPTH {
            return false;
        }

        let index = self.active.len();
        let outer_cut = std::mem::replace(&mut self.lowest_cut, usize::MAX);
        self.active.push(goal);

        let mut found = false;
        for supertype in self.hierarchy.supertypes(sub) {
            let snapshot = self.bindings.clone();
            if self.subtype(&supertype, sup, top) {
                found = true;
                break;
            }
            if self.bindings.len() != snapshot.len() {
                self.failed.clear();
            }
            self.bindings = snapshot;
        }

        if let Some(goal) = self.active.pop() {
            if !found && self.lowest_cut >= index {
                self.failed.insert(goal);
            }
        }
        self.lowest_cut = outer_cut.min(self.lowest_cut);
        found
    }
}

fn nullability_ok(sub: &Type, sup: &Type, top: bool) -> bool {
    !sub.is_nullable() || sup.is_nullable() || (top && sub.is_null_compatible())
}
