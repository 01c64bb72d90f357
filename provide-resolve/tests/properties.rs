//! Property tests for resolution

use proptest::prelude::*;
use provide_resolve::prelude::*;

const TYPES: usize = 6;

fn type_name(index: usize) -> Type {
    Type::named(format!("T{}", index))
}

/// Candidates as (produced type, parameter types, scoped)
fn declarations() -> impl Strategy<Value = Vec<(usize, Vec<usize>, bool)>> {
    prop::collection::vec(
        (0..TYPES, prop::collection::vec(0..TYPES, 0..3), any::<bool>()),
        1..12,
    )
}

fn registry(declarations: &[(usize, Vec<usize>, bool)]) -> StaticRegistry {
    let mut builder = RegistryBuilder::new();
    for (id, (produced, parameters, scoped)) in declarations.iter().enumerate() {
        let mut candidate = Candidate::new(id as u32, type_name(*produced))
            .with_parameters(parameters.iter().map(|&index| type_name(index)));
        if *scoped {
            candidate = candidate.scoped("AppScope");
        }
        builder.candidate(candidate);
    }
    builder.build().unwrap()
}

proptest! {
    #[test]
    fn resolution_is_deterministic(declarations in declarations(), target in 0..TYPES) {
        let registry = registry(&declarations);
        let chain = ScopeChain::of_scopes(["AppScope"]);
        let resolver = Resolver::new(&registry);

        let first = resolver.resolve_type(type_name(target), &chain);
        let second = resolver.resolve_type(type_name(target), &chain);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn cycles_are_closed_paths(declarations in declarations(), target in 0..TYPES) {
        let registry = registry(&declarations);
        let result = Resolver::new(&registry)
            .resolve_type(type_name(target), &ScopeChain::of_scopes(["AppScope"]));

        if let ResolutionResult::Cyclic(path) = result {
            prop_assert!(path.len() >= 2);
            prop_assert_eq!(path.first(), path.last());
        }
    }

    #[test]
    fn success_nodes_satisfy_their_requests(declarations in declarations(), target in 0..TYPES) {
        let registry = registry(&declarations);
        let result = Resolver::new(&registry)
            .resolve_type(type_name(target), &ScopeChain::of_scopes(["AppScope"]));

        if let ResolutionResult::Success(node) = result {
            prop_assert_eq!(&node.produced, &type_name(target));
            let mut ok = true;
            node.walk(|visited| {
                ok &= visited.arguments.len() == visited.candidate.parameters.len();
                ok &= visited.is_scoped() == visited.candidate.declared_scope.is_some();
            });
            prop_assert!(ok);
        }
    }
}
