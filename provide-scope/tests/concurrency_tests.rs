//! Concurrent access to scopes

use provide_scope::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const THREADS: usize = 64;

#[test]
fn test_single_flight_under_load() {
    let scope = Scope::root("AppScope");
    let counter = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let scope = scope.clone();
            let counter = counter.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                scope
                    .get_or_create("shared", || {
                        thread::sleep(Duration::from_millis(5));
                        counter.fetch_add(1, Ordering::SeqCst)
                    })
                    .unwrap()
            })
        })
        .collect();

    let values: Vec<Arc<usize>> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert!(values.iter().all(|value| Arc::ptr_eq(value, &values[0])));
}

#[test]
fn test_distinct_slots_each_created_once() {
    let scope = Scope::root("AppScope");
    let counter = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|index| {
            let scope = scope.clone();
            let counter = counter.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let key = SlotKey::named(format!("slot-{}", index % 8));
                scope
                    .get_or_create(key, || counter.fetch_add(1, Ordering::SeqCst))
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(counter.load(Ordering::SeqCst), 8);
}

struct Resource {
    disposed: Arc<AtomicUsize>,
}

impl Disposable for Resource {
    fn dispose(&self) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_creation_racing_disposal_fails() {
    let scope = Scope::root("AppScope");
    let disposed = Arc::new(AtomicUsize::new(0));
    let (started_tx, started_rx) = mpsc::channel();
    let (resume_tx, resume_rx) = mpsc::channel::<()>();

    let creator = {
        let scope = scope.clone();
        let disposed = disposed.clone();
        thread::spawn(move || {
            scope.get_or_create_disposable("slow", move || {
                started_tx.send(()).unwrap();
                resume_rx.recv().unwrap();
                Resource { disposed }
            })
        })
    };

    started_rx.recv().unwrap();
    scope.dispose();
    resume_tx.send(()).unwrap();

    let result = creator.join().unwrap();
    assert!(matches!(result, Err(ScopeError::Disposed { .. })));
    // The discarded value is still released
    assert_eq!(disposed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_concurrent_dispose_runs_disposers_once() {
    let scope = Scope::root("AppScope");
    let disposed = Arc::new(AtomicUsize::new(0));
    for index in 0..16 {
        let disposed = disposed.clone();
        scope
            .get_or_create_disposable(SlotKey::named(format!("r{}", index)), move || Resource {
                disposed,
            })
            .unwrap();
    }

    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let scope = scope.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                scope.dispose();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(disposed.load(Ordering::SeqCst), 16);
}
