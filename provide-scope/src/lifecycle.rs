//! Disposal capabilities and dispose observers

use crate::scope::ScopeInner;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Trait for values that release resources when their scope is disposed
pub trait Disposable: Send + Sync {
    /// Dispose of any resources held by the value
    ///
    /// Called at most once by the owning scope.
    fn dispose(&self);
}

/// A callback registered with [`Scope::invoke_on_dispose`](crate::Scope::invoke_on_dispose)
pub(crate) struct Observer {
    pub(crate) id: u64,
    armed: Arc<AtomicBool>,
    callback: Box<dyn FnOnce() + Send>,
}

impl Observer {
    pub(crate) fn new(id: u64, callback: Box<dyn FnOnce() + Send>) -> (Self, Arc<AtomicBool>) {
        let armed = Arc::new(AtomicBool::new(true));
        let observer = Self {
            id,
            armed: armed.clone(),
            callback,
        };
        (observer, armed)
    }

    /// Run the callback unless it was cancelled
    pub(crate) fn fire(self) {
        if self.armed.swap(false, Ordering::AcqRel) {
            (self.callback)();
        }
    }
}

/// Handle to a dispose observer
///
/// Cancelling stops a callback that has not fired yet; it cannot undo one
/// that already ran.
pub struct DisposableHandle {
    scope: Weak<ScopeInner>,
    id: u64,
    armed: Arc<AtomicBool>,
}

impl DisposableHandle {
    pub(crate) fn new(scope: Weak<ScopeInner>, id: u64, armed: Arc<AtomicBool>) -> Self {
        Self { scope, id, armed }
    }

    /// Handle of a callback that already ran
    pub(crate) fn fired() -> Self {
        Self {
            scope: Weak::new(),
            id: 0,
            armed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether the callback is still waiting to fire
    pub fn is_active(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Prevent the callback from firing
    pub fn cancel(&self) {
        if !self.armed.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(scope) = self.scope.upgrade() {
            scope.forget_observer(self.id);
        }
    }
}

impl Disposable for DisposableHandle {
    fn dispose(&self) {
        self.cancel();
    }
}

impl fmt::Debug for DisposableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposableHandle")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_cancelled_observer_does_not_fire() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let (observer, armed) = Observer::new(
            1,
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let handle = DisposableHandle::new(Weak::new(), 1, armed);
        assert!(handle.is_active());

        handle.dispose();
        assert!(!handle.is_active());
        observer.fire();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fired_handle_is_inert() {
        let handle = DisposableHandle::fired();
        assert!(!handle.is_active());
        handle.cancel();
    }
}
