//! Lexical scope contexts a request is resolved from

use provide_types::{Name, ScopeId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a lexical context (a function body, class, component...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(Name);

impl ContextId {
    pub fn new(name: impl Into<Name>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ContextId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One level of the chain, optionally bound to a runtime scope
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeContext {
    pub id: ContextId,
    #[serde(default)]
    pub scope: Option<ScopeId>,
}

impl ScopeContext {
    /// A purely lexical level
    pub fn lexical(id: impl Into<ContextId>) -> Self {
        Self {
            id: id.into(),
            scope: None,
        }
    }

    /// A level that hosts instances of `scope`
    pub fn scoped(id: impl Into<ContextId>, scope: impl Into<ScopeId>) -> Self {
        Self {
            id: id.into(),
            scope: Some(scope.into()),
        }
    }
}

/// Contexts visible from a request, innermost first
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeChain {
    contexts: Vec<ScopeContext>,
}

impl ScopeChain {
    /// Build a chain from contexts listed innermost first
    pub fn new(contexts: impl IntoIterator<Item = ScopeContext>) -> Self {
        Self {
            contexts: contexts.into_iter().collect(),
        }
    }

    /// A chain with one level per scope, innermost first, each context named after its scope
    pub fn of_scopes<S: Into<ScopeId>>(scopes: impl IntoIterator<Item = S>) -> Self {
        Self::new(scopes.into_iter().map(|scope| {
            let scope = scope.into();
            ScopeContext::scoped(scope.as_str(), scope.clone())
        }))
    }

    /// A new chain with `context` as its innermost level
    pub fn enter(&self, context: ScopeContext) -> Self {
        let mut contexts = Vec::with_capacity(self.contexts.len() + 1);
        contexts.push(context);
        contexts.extend(self.contexts.iter().cloned());
        Self { contexts }
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn innermost(&self) -> Option<&ScopeContext> {
        self.contexts.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScopeContext> {
        self.contexts.iter()
    }

    /// Position of `id`, 0 being innermost
    pub fn position(&self, id: &ContextId) -> Option<usize> {
        self.contexts.iter().position(|context| &context.id == id)
    }

    /// Whether some level of the chain hosts `scope`
    pub fn contains_scope(&self, scope: &ScopeId) -> bool {
        self.contexts
            .iter()
            .any(|context| context.scope.as_ref() == Some(scope))
    }
}
