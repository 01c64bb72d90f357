//! Scope runtime for resolved dependency graphs
//!
//! Scopes give scoped candidates "one instance per scope" semantics:
//! - values are cached per slot and created at most once, even under
//!   concurrent access
//! - eager slots are created while a scope is built
//! - disposing a scope cascades to its children, disposes the values it
//!   created and notifies observers
//!
//! A resolved node's cache key names the scope and slot its value lives in,
//! see [`Scope::get_or_create_cached`].

pub mod builder;
pub mod error;
pub mod lifecycle;
pub mod scope;
pub mod slot;

pub use builder::{ChildScopeFactory, ScopeBuilder};
pub use error::{Result, ScopeError};
pub use lifecycle::{Disposable, DisposableHandle};
pub use scope::{Scope, ScopeGuard};
pub use slot::{SlotKey, SlotState};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::{
        ChildScopeFactory, Disposable, DisposableHandle, Scope, ScopeBuilder, ScopeError,
        SlotKey,
    };
}
