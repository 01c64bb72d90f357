//! Slot keys and slot states

use provide_types::{Name, SlotId};
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// A cached value, type-erased
pub type Value = Arc<dyn Any + Send + Sync>;

/// Key of one entry in a scope's store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SlotKey {
    /// A slot assigned by resolution
    Resolved(SlotId),
    /// A slot chosen by application code
    Named(Name),
    /// One slot per Rust type
    Type(TypeId),
}

impl SlotKey {
    pub fn named(name: impl Into<Name>) -> Self {
        SlotKey::Named(name.into())
    }

    pub fn of<T: 'static>() -> Self {
        SlotKey::Type(TypeId::of::<T>())
    }
}

impl From<SlotId> for SlotKey {
    fn from(slot: SlotId) -> Self {
        SlotKey::Resolved(slot)
    }
}

impl From<&str> for SlotKey {
    fn from(name: &str) -> Self {
        SlotKey::named(name)
    }
}

impl From<TypeId> for SlotKey {
    fn from(type_id: TypeId) -> Self {
        SlotKey::Type(type_id)
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKey::Resolved(slot) => write!(f, "{}", slot),
            SlotKey::Named(name) => f.write_str(name),
            SlotKey::Type(type_id) => write!(f, "{:?}", type_id),
        }
    }
}

/// Lifecycle of one slot
#[derive(Clone, Default)]
pub enum SlotState {
    #[default]
    Empty,
    /// A factory is running for this slot
    InProgress,
    Done(Value),
}

impl SlotState {
    pub fn is_done(&self) -> bool {
        matches!(self, SlotState::Done(_))
    }
}

impl fmt::Debug for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotState::Empty => f.write_str("Empty"),
            SlotState::InProgress => f.write_str("InProgress"),
            SlotState::Done(_) => f.write_str("Done(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provide_types::{CandidateId, Type};

    #[test]
    fn test_display() {
        let slot = SlotId::new(CandidateId(4), vec![Type::named("String")]);
        assert_eq!(SlotKey::from(slot).to_string(), "#4[String]");
        assert_eq!(SlotKey::from("db").to_string(), "db");
    }

    #[test]
    fn test_type_keys() {
        assert_eq!(SlotKey::of::<u32>(), SlotKey::of::<u32>());
        assert_ne!(SlotKey::of::<u32>(), SlotKey::of::<u64>());
    }
}
