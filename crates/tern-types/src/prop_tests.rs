//! Property tests for the type lattice.
//!
//! 1. merge is commutative and associative on union membership
//! 2. merge is idempotent
//! 3. extends never answers Any for concrete operands
//! 4. extends(any, C) is Any unless C is any
//! 5. widen is idempotent and leaves no literals behind

use proptest::prelude::*;

use crate::*;

const NAME_POOL: &[&str] = &["Foo", "Bar", "Baz"];
const FIELD_POOL: &[&str] = &["a", "b"];
const STRING_POOL: &[&str] = &["x", "y", "z"];

fn arb_primitive() -> impl Strategy<Value = Type> {
    prop::sample::select(
        &[
            Primitive::Number,
            Primitive::String,
            Primitive::Boolean,
            Primitive::Null,
            Primitive::Undefined,
        ][..],
    )
    .prop_map(Type::Primitive)
}

fn arb_literal() -> impl Strategy<Value = Type> {
    prop_oneof![
        (0i32..4).prop_map(|n| Type::num_lit(n as f64)),
        prop::sample::select(STRING_POOL).prop_map(Type::str_lit),
        any::<bool>().prop_map(Type::bool_lit),
    ]
}

/// Concrete leaf types: no placeholders, no top or bottom types.
fn arb_ground_type() -> BoxedStrategy<Type> {
    prop_oneof![
        3 => arb_primitive(),
        4 => arb_literal(),
        1 => prop::sample::select(NAME_POOL).prop_map(Type::class),
    ]
    .boxed()
}

fn arb_type(depth: u32) -> BoxedStrategy<Type> {
    if depth == 0 {
        return arb_ground_type();
    }
    let inner = arb_type(depth - 1);
    prop_oneof![
        4 => arb_ground_type(),
        1 => inner.clone().prop_map(Type::array),
        1 => (prop::sample::select(FIELD_POOL), inner.clone())
            .prop_map(|(name, ty)| Type::object(vec![(name, ty)])),
        1 => (inner.clone(), inner.clone())
            .prop_map(|(a, b)| Type::object(vec![("a", a), ("b", b)])),
        1 => prop::collection::vec(inner, 2..=3)
            .prop_map(|members| merge_all(members.iter())),
    ]
    .boxed()
}

fn members(ty: &Type) -> Vec<Type> {
    ty.union_members().to_vec()
}

fn has_literal(ty: &Type) -> bool {
    match ty {
        Type::Literal(_) | Type::ConstTuple(_) | Type::ConstArray(..) => true,
        Type::Union(ms) => ms.iter().any(has_literal),
        Type::Tuple(fields) => fields.iter().any(|f| has_literal(&f.ty)),
        Type::Array(elem) | Type::Optional(elem) => has_literal(elem),
        _ => false,
    }
}

proptest! {
    #[test]
    fn merge_is_commutative(a in arb_type(2), b in arb_type(2)) {
        prop_assert_eq!(merge(&a, &b), merge(&b, &a));
    }

    #[test]
    fn merge_is_associative_on_membership(a in arb_type(2), b in arb_type(2), c in arb_type(2)) {
        let left = merge(&merge(&a, &b), &c);
        let right = merge(&a, &merge(&b, &c));
        prop_assert_eq!(members(&left), members(&right));
    }

    #[test]
    fn merge_is_idempotent(a in arb_type(2)) {
        prop_assert_eq!(merge(&a, &a), a);
    }

    #[test]
    fn merge_result_contains_no_nested_unions(a in arb_type(2), b in arb_type(2)) {
        let merged = merge(&a, &b);
        prop_assert!(members(&merged).iter().all(|m| !matches!(m, Type::Union(_))));
    }

    #[test]
    fn extends_is_never_any_for_concrete(t in arb_type(2), c in arb_type(2)) {
        let result = extends(&t, &c, &mut TypeBindings::new(), &NoEnv);
        prop_assert_ne!(result, ExtendsResult::Any);
    }

    #[test]
    fn extends_from_any_is_indeterminate(c in arb_type(2)) {
        let result = extends(&Type::Any, &c, &mut TypeBindings::new(), &NoEnv);
        prop_assert_eq!(result, ExtendsResult::Any);
        let top = extends(&Type::Any, &Type::Any, &mut TypeBindings::new(), &NoEnv);
        prop_assert_eq!(top, ExtendsResult::True);
    }

    #[test]
    fn extends_is_reflexive(t in arb_type(2)) {
        let result = extends(&t, &t, &mut TypeBindings::new(), &NoEnv);
        prop_assert_eq!(result, ExtendsResult::True);
    }

    #[test]
    fn widen_is_idempotent(t in arb_type(2)) {
        let once = widen(&t);
        prop_assert_eq!(widen(&once), once.clone());
        prop_assert!(!has_literal(&once));
    }
}
