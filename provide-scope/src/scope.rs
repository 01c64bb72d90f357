//! Hierarchical, disposable value caches
//!
//! A [`Scope`] caches one value per slot and guarantees that concurrent
//! callers racing on the same slot run the factory exactly once. Scopes form
//! a tree: disposing a scope disposes its live children first, then the
//! values it created, then notifies its observers.

use crate::builder::{ChildScopeFactory, ScopeBuilder};
use crate::error::{Result, ScopeError};
use crate::lifecycle::{Disposable, DisposableHandle, Observer};
use crate::slot::{SlotKey, SlotState, Value};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use provide_types::{CacheKey, ScopeId};
use rustc_hash::FxHashMap;
use std::any::TypeId;
use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Values registered at build time, keyed by their Rust type
pub(crate) type Elements = FxHashMap<TypeId, Value>;

/// A freshly created value and its disposal capability
type Created = (Value, Option<Arc<dyn Disposable>>);

#[derive(Default)]
struct Store {
    slots: FxHashMap<SlotKey, SlotState>,
    /// In creation order
    disposers: Vec<(SlotKey, Arc<dyn Disposable>)>,
}

#[derive(Default)]
struct Lifecycle {
    /// In creation order
    children: Vec<Scope>,
    observers: Vec<Observer>,
    next_observer: u64,
}

pub(crate) struct ScopeInner {
    id: ScopeId,
    parent: Option<Scope>,
    elements: Elements,
    disposed: AtomicBool,
    /// Held while a factory runs; reentrant so factories can fill other slots
    creation: ReentrantMutex<()>,
    store: RwLock<Store>,
    lifecycle: Mutex<Lifecycle>,
}

impl ScopeInner {
    pub(crate) fn forget_observer(&self, id: u64) {
        self.lifecycle.lock().observers.retain(|observer| observer.id != id);
    }
}

/// Clears an `InProgress` marker if the factory fails or panics
struct PendingSlot<'a> {
    store: &'a RwLock<Store>,
    key: &'a SlotKey,
    armed: bool,
}

impl PendingSlot<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.store.write().slots.remove(self.key);
        }
    }
}

/// Handle to a scope
///
/// Cloning is cheap and every clone refers to the same scope. A scope stays
/// alive until it and its parent have been disposed and every handle dropped.
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

impl Scope {
    /// A root scope without elements
    pub fn root(id: impl Into<ScopeId>) -> Self {
        Self::new(id.into(), None, Elements::default())
    }

    /// Start building a scope with elements, eager slots or a parent
    pub fn builder(id: impl Into<ScopeId>) -> ScopeBuilder {
        ScopeBuilder::new(id)
    }

    pub(crate) fn new(id: ScopeId, parent: Option<Scope>, elements: Elements) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                id,
                parent,
                elements,
                disposed: AtomicBool::new(false),
                creation: ReentrantMutex::new(()),
                store: RwLock::new(Store::default()),
                lifecycle: Mutex::new(Lifecycle::default()),
            }),
        }
    }

    pub fn id(&self) -> &ScopeId {
        &self.inner.id
    }

    pub fn parent(&self) -> Option<&Scope> {
        self.inner.parent.as_ref()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Whether both handles refer to the same scope
    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// This scope or the closest ancestor with the given id
    pub fn find(&self, id: &ScopeId) -> Option<&Scope> {
        self.ancestors().find(|scope| scope.id() == id)
    }

    /// This scope followed by its ancestors, innermost first
    pub fn ancestors(&self) -> impl Iterator<Item = &Scope> {
        std::iter::successors(Some(self), |scope| scope.parent())
    }

    /// An element registered on this scope or an ancestor
    pub fn element<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.ancestors()
            .find_map(|scope| scope.inner.elements.get(&TypeId::of::<T>()))
            .and_then(|value| value.clone().downcast::<T>().ok())
    }

    /// The cached value of `key`, creating it with `factory` on first use
    ///
    /// `factory` runs at most once per slot, however many threads race on
    /// the key.
    pub fn get_or_create<T, F>(&self, key: impl Into<SlotKey>, factory: F) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        let key = key.into();
        let value = self.create_slot(&key, || Ok((Arc::new(factory()) as Value, None)))?;
        downcast(key, value)
    }

    /// Like [`get_or_create`](Self::get_or_create), disposing the value
    /// together with the scope
    pub fn get_or_create_disposable<T, F>(
        &self,
        key: impl Into<SlotKey>,
        factory: F,
    ) -> Result<Arc<T>>
    where
        T: Disposable + 'static,
        F: FnOnce() -> T,
    {
        let key = key.into();
        let value = self.create_slot(&key, || {
            let value = Arc::new(factory());
            let disposer: Arc<dyn Disposable> = value.clone();
            Ok((value as Value, Some(disposer)))
        })?;
        downcast(key, value)
    }

    /// Like [`get_or_create`](Self::get_or_create) with a fallible factory
    ///
    /// Nothing is stored when the factory fails, so a later call retries.
    pub fn try_get_or_create<T, E, F>(&self, key: impl Into<SlotKey>, factory: F) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        E: fmt::Display,
        F: FnOnce() -> std::result::Result<T, E>,
    {
        let key = key.into();
        let value = self.create_slot(&key, || {
            factory()
                .map(|value| (Arc::new(value) as Value, None))
                .map_err(|e| ScopeError::Factory {
                    key: key.clone(),
                    reason: e.to_string(),
                })
        })?;
        downcast(key, value)
    }

    /// The value for a resolved cache key, created in the scope the key names
    ///
    /// The scope is looked up among this scope and its ancestors.
    pub fn get_or_create_cached<T, F>(&self, key: &CacheKey, factory: F) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        let owner = self.find(&key.scope).ok_or_else(|| ScopeError::UnknownScope {
            scope: key.scope.clone(),
        })?;
        owner.get_or_create(key.slot.clone(), factory)
    }

    /// The cached value of `key`, if it was created
    pub fn get<T: Send + Sync + 'static>(&self, key: impl Into<SlotKey>) -> Result<Option<Arc<T>>> {
        let key = key.into();
        match self.lookup(&key)? {
            Some(value) => downcast(key, value).map(Some),
            None => Ok(None),
        }
    }

    /// Current state of `key`
    pub fn state(&self, key: &SlotKey) -> SlotState {
        self.inner
            .store
            .read()
            .slots
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn contains(&self, key: &SlotKey) -> bool {
        self.state(key).is_done()
    }

    /// Drop the value of `key`, disposing it if it is disposable
    ///
    /// Removing a slot that holds no value is an error.
    pub fn remove(&self, key: impl Into<SlotKey>) -> Result<()> {
        let key = key.into();
        let disposer = {
            let mut store = self.inner.store.write();
            self.ensure_active()?;
            if !matches!(store.slots.get(&key), Some(SlotState::Done(_))) {
                return Err(ScopeError::SlotReleased {
                    scope: self.inner.id.clone(),
                    key,
                });
            }
            store.slots.remove(&key);
            store
                .disposers
                .iter()
                .position(|(slot, _)| slot == &key)
                .map(|position| store.disposers.remove(position).1)
        };

        trace!("Removed slot {} from scope {}", key, self.inner.id);
        if let Some(disposer) = disposer {
            disposer.dispose();
        }
        Ok(())
    }

    /// Dispose the scope
    ///
    /// Children are disposed first (most recent first), then the values
    /// created in this scope (most recent first), then the observers run in
    /// registration order. Calling this again is a no-op.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!("Disposing scope {}", self.inner.id);

        let (children, observers) = {
            let mut lifecycle = self.inner.lifecycle.lock();
            (
                mem::take(&mut lifecycle.children),
                mem::take(&mut lifecycle.observers),
            )
        };
        for child in children.iter().rev() {
            child.dispose();
        }

        let (slots, disposers) = {
            let mut store = self.inner.store.write();
            (mem::take(&mut store.slots), mem::take(&mut store.disposers))
        };
        for (key, disposer) in disposers.into_iter().rev() {
            trace!("Disposing slot {} of scope {}", key, self.inner.id);
            disposer.dispose();
        }

        for observer in observers {
            observer.fire();
        }
        drop(slots);

        if let Some(parent) = &self.inner.parent {
            parent.detach_child(self);
        }
    }

    /// Run `callback` when the scope is disposed
    ///
    /// On a scope that is already disposed the callback runs immediately.
    pub fn invoke_on_dispose(&self, callback: impl FnOnce() + Send + 'static) -> DisposableHandle {
        let mut lifecycle = self.inner.lifecycle.lock();
        if self.is_disposed() {
            drop(lifecycle);
            callback();
            return DisposableHandle::fired();
        }

        let id = lifecycle.next_observer;
        lifecycle.next_observer += 1;
        let (observer, armed) = Observer::new(id, Box::new(callback));
        lifecycle.observers.push(observer);
        DisposableHandle::new(Arc::downgrade(&self.inner), id, armed)
    }

    /// A plain child scope
    pub fn child(&self, id: impl Into<ScopeId>) -> Result<Scope> {
        let mut builder = ScopeBuilder::new(id);
        builder.parent(self);
        builder.build()
    }

    /// A factory building configured child scopes from arguments
    pub fn child_factory<A, F>(&self, id: impl Into<ScopeId>, configure: F) -> ChildScopeFactory<A>
    where
        F: Fn(&mut ScopeBuilder, A) + Send + Sync + 'static,
    {
        ChildScopeFactory::new(self.clone(), id.into(), configure)
    }

    /// Dispose the scope when the returned guard is dropped
    pub fn guard(self) -> ScopeGuard {
        ScopeGuard { scope: self }
    }

    pub(crate) fn attach_child(&self, child: Scope) -> Result<()> {
        let mut lifecycle = self.inner.lifecycle.lock();
        self.ensure_active()?;
        lifecycle.children.push(child);
        Ok(())
    }

    fn detach_child(&self, child: &Scope) {
        self.inner
            .lifecycle
            .lock()
            .children
            .retain(|candidate| !candidate.ptr_eq(child));
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_disposed() {
            Err(ScopeError::Disposed {
                scope: self.inner.id.clone(),
            })
        } else {
            Ok(())
        }
    }

    fn lookup(&self, key: &SlotKey) -> Result<Option<Value>> {
        let store = self.inner.store.read();
        self.ensure_active()?;
        Ok(match store.slots.get(key) {
            Some(SlotState::Done(value)) => Some(value.clone()),
            _ => None,
        })
    }

    fn create_slot(
        &self,
        key: &SlotKey,
        create: impl FnOnce() -> Result<Created>,
    ) -> Result<Value> {
        if let Some(value) = self.lookup(key)? {
            return Ok(value);
        }

        let _creating = self.inner.creation.lock();
        {
            let mut store = self.inner.store.write();
            self.ensure_active()?;
            match store.slots.get(key) {
                Some(SlotState::Done(value)) => return Ok(value.clone()),
                Some(SlotState::InProgress) => {
                    return Err(ScopeError::ReentrantCreation { key: key.clone() })
                }
                Some(SlotState::Empty) | None => {}
            }
            store.slots.insert(key.clone(), SlotState::InProgress);
        }

        trace!("Creating slot {} in scope {}", key, self.inner.id);
        let pending = PendingSlot {
            store: &self.inner.store,
            key,
            armed: true,
        };
        let (value, disposer) = create()?;

        let mut store = self.inner.store.write();
        pending.disarm();
        if self.is_disposed() {
            store.slots.remove(key);
            drop(store);
            warn!(
                "Scope {} was disposed while slot {} was being created, discarding the value",
                self.inner.id, key
            );
            if let Some(disposer) = disposer {
                disposer.dispose();
            }
            return Err(ScopeError::Disposed {
                scope: self.inner.id.clone(),
            });
        }

        store.slots.insert(key.clone(), SlotState::Done(value.clone()));
        if let Some(disposer) = disposer {
            store.disposers.push((key.clone(), disposer));
        }
        Ok(value)
    }
}

fn downcast<T: Send + Sync + 'static>(key: SlotKey, value: Value) -> Result<Arc<T>> {
    value.downcast::<T>().map_err(|_| ScopeError::TypeMismatch {
        key,
        expected: std::any::type_name::<T>(),
    })
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.inner.id)
            .field("parent", &self.parent().map(Scope::id))
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Disposes its scope on drop
#[derive(Debug)]
pub struct ScopeGuard {
    scope: Scope,
}

impl ScopeGuard {
    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

impl std::ops::Deref for ScopeGuard {
    type Target = Scope;

    fn deref(&self) -> &Scope {
        &self.scope
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        self.scope.dispose();
    }
}
