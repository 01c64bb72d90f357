//! Scope construction

use crate::error::Result;
use crate::lifecycle::Disposable;
use crate::scope::{Elements, Scope};
use crate::slot::{SlotKey, Value};
use provide_types::ScopeId;
use std::any::TypeId;
use std::sync::Arc;
use tracing::debug;

type EagerSlot = Box<dyn FnOnce(&Scope) -> Result<()> + Send>;
type Initializer = Box<dyn FnOnce(&Scope) + Send>;

/// Builder for a [`Scope`]
///
/// Eager slots are created in registration order while the scope is built,
/// followed by the initializers, so callers only ever see a fully
/// initialized scope.
pub struct ScopeBuilder {
    id: ScopeId,
    parent: Option<Scope>,
    elements: Elements,
    eager: Vec<EagerSlot>,
    initializers: Vec<Initializer>,
}

impl ScopeBuilder {
    pub fn new(id: impl Into<ScopeId>) -> Self {
        Self {
            id: id.into(),
            parent: None,
            elements: Elements::default(),
            eager: Vec::new(),
            initializers: Vec::new(),
        }
    }

    /// Nest the scope under `parent`; disposing the parent disposes it
    pub fn parent(&mut self, parent: &Scope) -> &mut Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Register an element, visible from this scope and its descendants
    pub fn element<T: Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.elements.insert(TypeId::of::<T>(), Arc::new(value) as Value);
        self
    }

    /// Create the slot `key` while the scope is built
    pub fn eager<T, F>(&mut self, key: impl Into<SlotKey>, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: FnOnce(&Scope) -> T + Send + 'static,
    {
        let key = key.into();
        self.eager.push(Box::new(move |scope: &Scope| {
            scope.get_or_create(key, move || factory(scope)).map(|_: Arc<T>| ())
        }));
        self
    }

    /// Like [`eager`](Self::eager) for values disposed with the scope
    pub fn eager_disposable<T, F>(&mut self, key: impl Into<SlotKey>, factory: F) -> &mut Self
    where
        T: Disposable + 'static,
        F: FnOnce(&Scope) -> T + Send + 'static,
    {
        let key = key.into();
        self.eager.push(Box::new(move |scope: &Scope| {
            scope
                .get_or_create_disposable(key, move || factory(scope))
                .map(|_: Arc<T>| ())
        }));
        self
    }

    /// Run `initializer` once the eager slots exist
    pub fn initializer(&mut self, initializer: impl FnOnce(&Scope) + Send + 'static) -> &mut Self {
        self.initializers.push(Box::new(initializer));
        self
    }

    /// Build the scope
    ///
    /// Fails when the parent is already disposed. If an eager slot fails,
    /// the half-built scope is disposed and the error returned.
    pub fn build(self) -> Result<Scope> {
        let ScopeBuilder {
            id,
            parent,
            elements,
            eager,
            initializers,
        } = self;

        let scope = Scope::new(id, parent.clone(), elements);
        if let Some(parent) = &parent {
            parent.attach_child(scope.clone())?;
        }

        let eager_count = eager.len();
        for create in eager {
            if let Err(err) = create(&scope) {
                scope.dispose();
                return Err(err);
            }
        }
        for initializer in initializers {
            initializer(&scope);
        }

        debug!("Built scope {} with {} eager slots", scope.id(), eager_count);
        Ok(scope)
    }
}

/// Builds child scopes of a fixed parent from call arguments
pub struct ChildScopeFactory<A> {
    parent: Scope,
    id: ScopeId,
    configure: Arc<dyn Fn(&mut ScopeBuilder, A) + Send + Sync>,
}

impl<A> ChildScopeFactory<A> {
    pub(crate) fn new<F>(parent: Scope, id: ScopeId, configure: F) -> Self
    where
        F: Fn(&mut ScopeBuilder, A) + Send + Sync + 'static,
    {
        Self {
            parent,
            id,
            configure: Arc::new(configure),
        }
    }

    pub fn parent(&self) -> &Scope {
        &self.parent
    }

    /// Build a new child scope configured with `args`
    pub fn create(&self, args: A) -> Result<Scope> {
        let mut builder = ScopeBuilder::new(self.id.clone());
        builder.parent(&self.parent);
        (self.configure)(&mut builder, args);
        builder.build()
    }
}

impl<A> Clone for ChildScopeFactory<A> {
    fn clone(&self) -> Self {
        Self {
            parent: self.parent.clone(),
            id: self.id.clone(),
            configure: self.configure.clone(),
        }
    }
}
