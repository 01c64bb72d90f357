//! Realizing resolved graphs against live scopes

use parking_lot::Mutex;
use provide_resolve::prelude::*;
use provide_scope::{Scope, SlotKey};
use std::sync::Arc;

/// Types built so far, in creation order
type Created = Mutex<Vec<String>>;

/// Build the value of `node` itself, materializing its arguments first
fn construct(node: &Arc<ResolvedNode>, scope: &Scope, created: &Created) -> String {
    let arguments: Vec<String> = node
        .arguments
        .iter()
        .map(|argument| materialize(argument, scope, created).to_string())
        .collect();
    created.lock().push(node.produced.to_string());
    format!("{}({})", node.produced, arguments.join(", "))
}

/// Build a textual value for `node`, caching scoped nodes in their scope
fn materialize(node: &Arc<ResolvedNode>, scope: &Scope, created: &Created) -> Arc<String> {
    match &node.cache_key {
        Some(key) => scope
            .get_or_create_cached(key, || construct(node, scope, created))
            .unwrap(),
        None => Arc::new(construct(node, scope, created)),
    }
}

fn registry() -> StaticRegistry {
    let mut builder = RegistryBuilder::new();
    builder
        .candidate(Candidate::new(1, Type::named("Repository")).scoped("AppScope"))
        .candidate(Candidate::new(2, Type::named("Session")).scoped("SessionScope"))
        .candidate(
            Candidate::new(3, Type::named("Reader")).with_parameters([Type::named("Repository")]),
        )
        .candidate(
            Candidate::new(4, Type::named("Handler"))
                .with_parameters([Type::named("Reader"), Type::named("Session")]),
        );
    builder.build().unwrap()
}

#[test]
fn test_scoped_values_created_once_per_scope() {
    let registry = registry();
    let chain = ScopeChain::of_scopes(["SessionScope", "AppScope"]);
    let node = Resolver::new(&registry)
        .resolve_type(Type::named("Handler"), &chain)
        .into_result()
        .unwrap();

    let app = Scope::root("AppScope");
    let created = Created::default();

    let first = app.child("SessionScope").unwrap();
    let value = materialize(&node, &first, &created);
    assert_eq!(*value, "Handler(Reader(Repository()), Session())");
    assert_eq!(created.lock().len(), 4);

    // Same session: only unscoped nodes are rebuilt
    materialize(&node, &first, &created);
    assert_eq!(created.lock().len(), 6);

    // New session: the repository is shared through the app scope
    let second = app.child("SessionScope").unwrap();
    materialize(&node, &second, &created);
    assert_eq!(created.lock().len(), 9);

    let repository = node.arguments[0].arguments[0].cache_key.clone().unwrap();
    assert!(app.contains(&repository.slot.into()));
}

#[test]
fn test_eager_candidates_created_during_build() {
    let mut builder = RegistryBuilder::new();
    builder
        .candidate(Candidate::new(1, Type::named("Repository")).scoped("AppScope"))
        .candidate(
            Candidate::new(2, Type::named("Audit"))
                .scoped("SessionScope")
                .with_parameters([Type::named("Repository")])
                .eager(),
        )
        .candidate(Candidate::new(3, Type::named("Cache")).scoped("SessionScope"))
        .candidate(Candidate::new(4, Type::named("Listener")).scoped("SessionScope").eager());
    let registry = builder.build().unwrap();

    let session_id = ScopeId::from("SessionScope");
    let chain = ScopeChain::of_scopes(["SessionScope", "AppScope"]);
    let eager: Vec<Arc<ResolvedNode>> = Resolver::new(&registry)
        .resolve_eager(&session_id, &chain)
        .into_iter()
        .map(|result| result.into_result().unwrap())
        .collect();

    let app = Scope::root("AppScope");
    let created = Arc::new(Created::default());

    let mut session = Scope::builder(session_id);
    session.parent(&app);
    for node in &eager {
        let key = node.cache_key.clone().unwrap();
        let node = node.clone();
        let created = created.clone();
        session.eager(SlotKey::from(key.slot), move |scope: &Scope| {
            construct(&node, scope, &created)
        });
    }
    let session = session.build().unwrap();

    // Eager slots exist before anyone asked for them, in declaration order
    assert_eq!(*created.lock(), vec!["Repository", "Audit", "Listener"]);
    for node in &eager {
        let key = node.cache_key.clone().unwrap();
        assert!(session.contains(&key.slot.into()));
    }

    // Later requests reuse them
    let audit = materialize(&eager[0], &session, &created);
    assert_eq!(*audit, "Audit(Repository())");
    assert_eq!(created.lock().len(), 3);
}
