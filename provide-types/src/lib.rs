//! Type model for the provide dependency resolver
//!
//! This crate holds the leaf data shared by resolution and the scope runtime:
//! - structural [`Type`]s with nullability and disambiguating [`Tag`]s
//! - the [`TypeHierarchy`] used for variance-aware subtyping
//! - capture-avoiding [`Substitution`]
//! - identifiers for candidates, scopes and cache slots

pub mod hierarchy;
pub mod ids;
pub mod subst;
pub mod types;

pub use hierarchy::{ClassDecl, TypeHierarchy, TypeParam, Variance};
pub use ids::{CacheKey, CandidateId, ScopeId, SlotId};
pub use subst::Substitution;
pub use types::{Name, Tag, Type, TypeKind};
