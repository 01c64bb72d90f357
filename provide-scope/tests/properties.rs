//! Property tests for slot bookkeeping

use proptest::prelude::*;
use provide_scope::prelude::*;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Tracked {
    disposed: Arc<AtomicUsize>,
}

impl Disposable for Tracked {
    fn dispose(&self) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
enum Op {
    Create(u8),
    Remove(u8),
}

fn ops() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![(0u8..6).prop_map(Op::Create), (0u8..6).prop_map(Op::Remove)],
        0..40,
    )
}

proptest! {
    #[test]
    fn every_created_value_is_disposed_exactly_once(ops in ops()) {
        let scope = Scope::root("AppScope");
        let created = Arc::new(AtomicUsize::new(0));
        let disposed = Arc::new(AtomicUsize::new(0));
        let mut live = BTreeSet::new();

        for op in ops {
            match op {
                Op::Create(slot) => {
                    let key = SlotKey::named(format!("s{}", slot));
                    let created = created.clone();
                    let disposed = disposed.clone();
                    scope.get_or_create_disposable(key, move || {
                        created.fetch_add(1, Ordering::SeqCst);
                        Tracked { disposed }
                    }).unwrap();
                    live.insert(slot);
                }
                Op::Remove(slot) => {
                    let result = scope.remove(SlotKey::named(format!("s{}", slot)));
                    prop_assert_eq!(result.is_ok(), live.remove(&slot));
                }
            }
            prop_assert_eq!(
                created.load(Ordering::SeqCst) - disposed.load(Ordering::SeqCst),
                live.len()
            );
        }

        scope.dispose();
        prop_assert_eq!(created.load(Ordering::SeqCst), disposed.load(Ordering::SeqCst));
    }
}
