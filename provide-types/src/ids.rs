//! Identifiers shared between resolution and the scope runtime

use crate::types::{Name, Type};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a candidate declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub u32);

impl CandidateId {
    /// First id handed out to candidates synthesized during resolution
    pub const SYNTHETIC_BASE: u32 = 0x8000_0000;

    pub fn synthetic(index: u32) -> Self {
        Self(Self::SYNTHETIC_BASE + index)
    }

    pub fn is_synthetic(self) -> bool {
        self.0 >= Self::SYNTHETIC_BASE
    }
}

impl From<u32> for CandidateId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a scope kind, e.g. `AppScope`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeId(Name);

impl ScopeId {
    pub fn new(name: impl Into<Name>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ScopeId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ScopeId {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a cached value inside a scope
///
/// Instantiations of one generic candidate with different type arguments
/// get different slots.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotId {
    candidate: CandidateId,
    type_arguments: Vec<Type>,
}

impl SlotId {
    pub fn new(candidate: CandidateId, type_arguments: Vec<Type>) -> Self {
        Self {
            candidate,
            type_arguments,
        }
    }

    pub fn candidate(&self) -> CandidateId {
        self.candidate
    }

    pub fn type_arguments(&self) -> &[Type] {
        &self.type_arguments
    }
}

impl From<CandidateId> for SlotId {
    fn from(candidate: CandidateId) -> Self {
        Self::new(candidate, Vec::new())
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.candidate)?;
        if !self.type_arguments.is_empty() {
            write!(f, "[")?;
            for (index, argument) in self.type_arguments.iter().enumerate() {
                if index > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", argument)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

/// Where a resolved value is cached: slot `slot` of the scope `scope`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub scope: ScopeId,
    pub slot: SlotId,
}

impl CacheKey {
    pub fn new(scope: impl Into<ScopeId>, slot: impl Into<SlotId>) -> Self {
        Self {
            scope: scope.into(),
            slot: slot.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scope, self.slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_ids() {
        assert!(!CandidateId(1).is_synthetic());
        assert!(CandidateId::synthetic(0).is_synthetic());
        assert_eq!(CandidateId::synthetic(3).0, CandidateId::SYNTHETIC_BASE + 3);
    }

    #[test]
    fn test_cache_key_display() {
        let key = CacheKey::new("AppScope", CandidateId(4));
        assert_eq!(key.to_string(), "AppScope/#4");

        let generic = CacheKey::new(
            "AppScope",
            SlotId::new(CandidateId(4), vec![Type::named("String")]),
        );
        assert_eq!(generic.to_string(), "AppScope/#4[String]");
        assert_ne!(key, generic);
    }
}
