//! Property tests for the type model

use proptest::prelude::*;
use provide_types::{Substitution, Tag, Type, TypeHierarchy};

fn leaf() -> impl Strategy<Value = Type> {
    (
        prop::sample::select(vec!["Foo", "Bar", "String", "Int"]),
        any::<bool>(),
        prop::collection::btree_set(prop::sample::select(vec!["a", "b", "c"]), 0..3),
    )
        .prop_map(|(name, nullable, tags)| {
            let ty = Type::named(name).with_tags(tags.into_iter().map(Tag::from));
            if nullable {
                ty.nullable()
            } else {
                ty
            }
        })
}

fn ty() -> impl Strategy<Value = Type> {
    leaf().prop_recursive(3, 12, 3, |inner| {
        (
            prop::sample::select(vec!["List", "Map", "Pair"]),
            prop::collection::vec(inner, 1..3),
        )
            .prop_map(|(name, arguments)| Type::generic(name, arguments))
    })
}

proptest! {
    #[test]
    fn prop_request_compatibility_is_reflexive(t in ty()) {
        let hierarchy = TypeHierarchy::new();
        prop_assert!(hierarchy.is_request_compatible(&t, &t));
        prop_assert!(hierarchy.is_subtype(&t, &t));
    }

    #[test]
    fn prop_untagged_request_accepts_tagged_candidate(t in ty()) {
        let hierarchy = TypeHierarchy::new();
        let request = t.clone().untagged();
        prop_assert!(hierarchy.is_request_compatible(&t, &request));
    }

    #[test]
    fn prop_empty_substitution_is_identity(t in ty()) {
        prop_assert_eq!(Substitution::new().apply(&t), t);
    }

    #[test]
    fn prop_non_null_satisfies_nullable(t in ty()) {
        let hierarchy = TypeHierarchy::new();
        let candidate = t.clone().non_null();
        prop_assert!(hierarchy.is_request_compatible(&candidate, &t.nullable()));
    }

    #[test]
    fn prop_freshened_variables_never_collide(name in "[A-Z]", discriminator in 0u32..1000) {
        let declared = Type::generic("List", [Type::param(name.as_str())]);
        let fresh = declared.freshen(&discriminator.to_string());
        for parameter in fresh.parameters() {
            prop_assert_ne!(parameter.as_ref(), name.as_str());
        }
    }
}
