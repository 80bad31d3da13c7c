//! Type lattice operations: widening, joins and the `extends` relation.

use crate::bindings::TypeBindings;
use crate::ty::{Field, FunctionType, Primitive, Type};

/// A member of a class or interface, as seen by structural checks.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub ty: Type,
    pub optional: bool,
}

/// Declaration knowledge the lattice needs for named types.
pub trait TypeEnv {
    /// Direct supertypes (base class, implemented or extended interfaces).
    fn supertypes(&self, ty: &Type) -> Vec<Type>;

    /// Fields and methods of a class or interface, when resolved.
    fn members(&self, ty: &Type) -> Option<Vec<Member>>;
}

/// Environment with no declarations.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEnv;

impl TypeEnv for NoEnv {
    fn supertypes(&self, _ty: &Type) -> Vec<Type> {
        Vec::new()
    }

    fn members(&self, _ty: &Type) -> Option<Vec<Member>> {
        None
    }
}

// =============================================================================
// widen
// =============================================================================

/// Literal types become their base primitive; const tuples and arrays lose
/// their fixed shape.
pub fn widen(ty: &Type) -> Type {
    match ty {
        Type::Literal(lit) => Type::Primitive(lit.base()),
        Type::ConstTuple(fields) => Type::Tuple(widen_fields(fields)),
        Type::Tuple(fields) => Type::Tuple(widen_fields(fields)),
        Type::ConstArray(elem, _) => Type::array(widen(elem)),
        Type::Array(elem) => Type::array(widen(elem)),
        Type::Union(members) => Type::union(members.iter().map(widen)),
        Type::Optional(inner) => Type::optional(widen(inner)),
        other => other.clone(),
    }
}

fn widen_fields(fields: &[Field]) -> Vec<Field> {
    fields
        .iter()
        .map(|f| Field {
            name: f.name.clone(),
            ty: widen(&f.ty),
        })
        .collect()
}

// =============================================================================
// merge
// =============================================================================

/// Least upper bound used for branch joins.
pub fn merge(a: &Type, b: &Type) -> Type {
    if a == b {
        return a.clone();
    }
    match (a, b) {
        (Type::Never, other) | (other, Type::Never) => return other.clone(),
        (Type::Any, _) | (_, Type::Any) => return Type::Any,
        (Type::Unknown, _) | (_, Type::Unknown) => return Type::Unknown,
        _ => {}
    }

    let mut members: Vec<Type> = Vec::new();
    members.extend(a.union_members().iter().cloned());
    members.extend(b.union_members().iter().cloned());
    join_members(members)
}

/// Folds any number of types with [`merge`].
pub fn merge_all<'a>(types: impl IntoIterator<Item = &'a Type>) -> Type {
    types
        .into_iter()
        .fold(Type::Never, |acc, ty| merge(&acc, ty))
}

fn join_members(members: Vec<Type>) -> Type {
    let members = combine_tuples(members);

    let literal_values = {
        let mut seen: Vec<&Type> = Vec::new();
        for m in members.iter().filter(|m| m.is_literal()) {
            if !seen.contains(&m) {
                seen.push(m);
            }
        }
        seen.len()
    };
    let has_literal_base = members
        .iter()
        .any(|m| matches!(m, Type::Primitive(p) if p.has_literals()));
    let widen_literals = literal_values >= 2 || (literal_values >= 1 && has_literal_base);

    let mut joined: Vec<Type> = members
        .into_iter()
        .map(|m| if widen_literals && m.is_literal() { widen(&m) } else { m })
        .collect();

    // A base primitive absorbs its own literals.
    let bases: Vec<Primitive> = joined
        .iter()
        .filter_map(|m| match m {
            Type::Primitive(p) => Some(*p),
            _ => None,
        })
        .collect();
    joined.retain(|m| match m {
        Type::Literal(lit) => !bases.contains(&lit.base()),
        _ => true,
    });

    Type::union(joined)
}

/// Tuples of the same kind whose field names line up are merged field-wise.
fn combine_tuples(members: Vec<Type>) -> Vec<Type> {
    let mut out: Vec<Type> = Vec::with_capacity(members.len());
    for member in members {
        let slot = out.iter_mut().find(|existing| same_tuple_shape(existing, &member));
        match slot {
            Some(existing) => *existing = merge_tuple_fields(existing, &member),
            None => out.push(member),
        }
    }
    out
}

fn field_names(fields: &[Field]) -> impl Iterator<Item = Option<&str>> {
    fields.iter().map(|f| f.name.as_deref())
}

fn same_tuple_shape(a: &Type, b: &Type) -> bool {
    match (a, b) {
        (Type::Tuple(fa), Type::Tuple(fb)) | (Type::ConstTuple(fa), Type::ConstTuple(fb)) => {
            fa.len() == fb.len() && field_names(fa).eq(field_names(fb))
        }
        _ => false,
    }
}

fn merge_tuple_fields(a: &Type, b: &Type) -> Type {
    let zip = |fa: &[Field], fb: &[Field]| -> Vec<Field> {
        fa.iter()
            .zip(fb)
            .map(|(x, y)| Field {
                name: x.name.clone(),
                ty: merge(&x.ty, &y.ty),
            })
            .collect()
    };
    match (a, b) {
        (Type::Tuple(fa), Type::Tuple(fb)) => Type::Tuple(zip(fa, fb)),
        (Type::ConstTuple(fa), Type::ConstTuple(fb)) => Type::ConstTuple(zip(fa, fb)),
        _ => a.clone(),
    }
}

// =============================================================================
// extends
// =============================================================================

/// Four-valued result of the constraint test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtendsResult {
    True,
    False,
    /// Indeterminate because an operand is the top type.
    Any,
    /// The checked type is `never`.
    Never,
}

impl ExtendsResult {
    pub fn from_bool(value: bool) -> Self {
        if value {
            ExtendsResult::True
        } else {
            ExtendsResult::False
        }
    }

    pub fn is_true(self) -> bool {
        self == ExtendsResult::True
    }

    /// Conjunction; `False` dominates, then `Any`.
    pub fn and(self, other: ExtendsResult) -> ExtendsResult {
        use ExtendsResult::*;
        match (self, other) {
            (False, _) | (_, False) => False,
            (Any, _) | (_, Any) => Any,
            (Never, x) | (x, Never) => x,
            (True, True) => True,
        }
    }
}

const SUPERTYPE_DEPTH: usize = 64;

/// Does `t` satisfy constraint `c`? Unbound placeholders in `c` (from `infer`
/// clauses) are bound to the matching part of `t`.
pub fn extends(t: &Type, c: &Type, bindings: &mut TypeBindings, env: &dyn TypeEnv) -> ExtendsResult {
    extends_depth(t, c, bindings, env, 0)
}

fn extends_depth(
    t: &Type,
    c: &Type,
    bindings: &mut TypeBindings,
    env: &dyn TypeEnv,
    depth: usize,
) -> ExtendsResult {
    use ExtendsResult as R;

    if matches!(t, Type::Any) {
        return if matches!(c, Type::Any) { R::True } else { R::Any };
    }
    if let Type::NamedGeneric(name) = c {
        if let Some(bound) = bindings.get(name).cloned() {
            return extends_depth(t, &bound, bindings, env, depth);
        }
        bindings.insert(name.clone(), t.clone());
        return R::True;
    }
    if matches!(c, Type::Any | Type::Unknown) {
        return R::True;
    }
    if matches!(t, Type::Never) {
        return R::Never;
    }
    if t == c {
        return R::True;
    }
    if depth > SUPERTYPE_DEPTH {
        return R::False;
    }
    let next = depth + 1;

    match (t, c) {
        (Type::NamedGeneric(name), _) => match bindings.get(name).cloned() {
            Some(bound) => extends_depth(&bound, c, bindings, env, next),
            None => R::Any,
        },
        (Type::Union(members), _) => {
            let mut result = R::True;
            let mut all_never = true;
            for member in members {
                match extends_depth(member, c, bindings, env, next) {
                    R::False => return R::False,
                    R::Never => continue,
                    other => {
                        all_never = false;
                        result = result.and(other);
                    }
                }
            }
            if all_never {
                R::Never
            } else {
                result
            }
        }
        (_, Type::Union(members)) => {
            let mut saw_any = false;
            for member in members {
                let mut attempt = bindings.clone();
                match extends_depth(t, member, &mut attempt, env, next) {
                    R::True => {
                        *bindings = attempt;
                        return R::True;
                    }
                    R::Any => saw_any = true,
                    _ => {}
                }
            }
            if saw_any {
                R::Any
            } else {
                R::False
            }
        }
        (Type::Primitive(Primitive::Undefined), Type::Optional(_)) => R::True,
        (Type::Optional(inner), _) => extends_depth(&Type::undefined(), c, bindings, env, next)
            .and(extends_depth(inner, c, bindings, env, next)),
        (_, Type::Optional(inner)) => extends_depth(t, inner, bindings, env, next),
        (Type::Literal(a), Type::Literal(b)) => R::from_bool(a == b),
        (Type::Literal(lit), Type::Primitive(p)) => R::from_bool(lit.base() == *p),
        (Type::Array(te), Type::Array(ce)) | (Type::ConstArray(te, _), Type::Array(ce)) => {
            extends_depth(te, ce, bindings, env, next)
        }
        (Type::ConstArray(te, n), Type::ConstArray(ce, m)) => {
            if n != m {
                R::False
            } else {
                extends_depth(te, ce, bindings, env, next)
            }
        }
        (Type::Tuple(tf) | Type::ConstTuple(tf), Type::Tuple(cf) | Type::ConstTuple(cf)) => {
            tuple_extends(tf, cf, bindings, env, next)
        }
        (Type::Tuple(tf) | Type::ConstTuple(tf), Type::Interface(_)) => match env.members(c) {
            Some(members) => fields_satisfy(tf, &members, bindings, env, next),
            None => R::False,
        },
        (Type::Function(tf), Type::Function(cf)) => function_extends(tf, cf, bindings, env, next),
        (Type::Class(tn) | Type::Interface(tn), Type::Class(cn) | Type::Interface(cn)) => {
            if tn.name == cn.name {
                return R::True;
            }
            for sup in env.supertypes(t) {
                if extends_depth(&sup, c, bindings, env, next).is_true() {
                    return R::True;
                }
            }
            if matches!(c, Type::Interface(_)) {
                if let (Some(have), Some(want)) = (env.members(t), env.members(c)) {
                    return members_satisfy(&have, &want, bindings, env, next);
                }
            }
            R::False
        }
        _ => R::False,
    }
}

fn tuple_extends(
    tf: &[Field],
    cf: &[Field],
    bindings: &mut TypeBindings,
    env: &dyn TypeEnv,
    depth: usize,
) -> ExtendsResult {
    let mut result = ExtendsResult::True;
    for (i, want) in cf.iter().enumerate() {
        let have = match &want.name {
            Some(name) => tf.iter().find(|f| f.name.as_deref() == Some(name.as_str())),
            None => tf.get(i),
        };
        match have {
            Some(have) => {
                result = result.and(extends_depth(&have.ty, &want.ty, bindings, env, depth));
                if result == ExtendsResult::False {
                    return result;
                }
            }
            None if matches!(want.ty, Type::Optional(_)) => {}
            None => return ExtendsResult::False,
        }
    }
    if cf.iter().all(|f| f.name.is_none()) && tf.len() != cf.len() {
        return ExtendsResult::False;
    }
    result
}

fn fields_satisfy(
    fields: &[Field],
    members: &[Member],
    bindings: &mut TypeBindings,
    env: &dyn TypeEnv,
    depth: usize,
) -> ExtendsResult {
    let have: Vec<Member> = fields
        .iter()
        .filter_map(|f| {
            f.name.as_ref().map(|name| Member {
                name: name.clone(),
                ty: f.ty.clone(),
                optional: false,
            })
        })
        .collect();
    members_satisfy(&have, members, bindings, env, depth)
}

fn members_satisfy(
    have: &[Member],
    want: &[Member],
    bindings: &mut TypeBindings,
    env: &dyn TypeEnv,
    depth: usize,
) -> ExtendsResult {
    let mut result = ExtendsResult::True;
    for member in want {
        match have.iter().find(|h| h.name == member.name) {
            Some(found) => {
                result = result.and(extends_depth(&found.ty, &member.ty, bindings, env, depth));
                if result == ExtendsResult::False {
                    return result;
                }
            }
            None if member.optional => {}
            None => return ExtendsResult::False,
        }
    }
    result
}

fn function_extends(
    tf: &FunctionType,
    cf: &FunctionType,
    bindings: &mut TypeBindings,
    env: &dyn TypeEnv,
    depth: usize,
) -> ExtendsResult {
    if tf.min_arity() > cf.params.len() {
        return ExtendsResult::False;
    }
    let mut result = ExtendsResult::True;
    for (have, want) in tf.params.iter().zip(&cf.params) {
        // Parameters are contravariant.
        result = result.and(extends_depth(want, have, bindings, env, depth));
        if result == ExtendsResult::False {
            return result;
        }
    }
    if cf.result.is_void() {
        return result;
    }
    result.and(extends_depth(&tf.result, &cf.result, bindings, env, depth))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ext(t: &Type, c: &Type) -> ExtendsResult {
        extends(t, c, &mut TypeBindings::new(), &NoEnv)
    }

    #[test]
    fn test_widen_literals_and_const_shapes() {
        assert_eq!(widen(&Type::num_lit(5.0)), Type::number());
        assert_eq!(widen(&Type::str_lit("a")), Type::string());
        let tuple = Type::ConstTuple(vec![Field::positional(Type::num_lit(1.0))]);
        assert_eq!(widen(&tuple), Type::Tuple(vec![Field::positional(Type::number())]));
        let arr = Type::ConstArray(Box::new(Type::bool_lit(true)), 3);
        assert_eq!(widen(&arr), Type::array(Type::boolean()));
        assert_eq!(widen(&Type::class("Foo")), Type::class("Foo"));
    }

    #[test]
    fn test_merge_identical_is_unchanged() {
        assert_eq!(merge(&Type::num_lit(5.0), &Type::num_lit(5.0)), Type::num_lit(5.0));
    }

    #[test]
    fn test_merge_distinct_literals_widen() {
        assert_eq!(merge(&Type::num_lit(5.0), &Type::num_lit(6.0)), Type::number());
        assert_eq!(merge(&Type::bool_lit(true), &Type::bool_lit(false)), Type::boolean());
        assert_eq!(
            merge(&Type::str_lit("a"), &Type::num_lit(1.0)),
            Type::union([Type::string(), Type::number()])
        );
    }

    #[test]
    fn test_merge_literal_with_unrelated_type_keeps_literal() {
        let merged = merge(&Type::str_lit("a"), &Type::undefined());
        assert_eq!(merged, Type::union([Type::str_lit("a"), Type::undefined()]));
    }

    #[test]
    fn test_merge_tuples_fieldwise() {
        let a = Type::object(vec![("value", Type::number()), ("done", Type::bool_lit(false))]);
        let b = Type::object(vec![("value", Type::undefined()), ("done", Type::bool_lit(true))]);
        let merged = merge(&a, &b);
        assert_eq!(
            merged,
            Type::object(vec![
                ("value", Type::union([Type::number(), Type::undefined()])),
                ("done", Type::boolean()),
            ])
        );
    }

    #[test]
    fn test_merge_mismatched_tuples_union() {
        let a = Type::object(vec![("x", Type::number())]);
        let b = Type::object(vec![("y", Type::number())]);
        assert!(matches!(merge(&a, &b), Type::Union(members) if members.len() == 2));
    }

    #[test]
    fn test_merge_never_and_any() {
        assert_eq!(merge(&Type::Never, &Type::string()), Type::string());
        assert_eq!(merge(&Type::Any, &Type::string()), Type::Any);
    }

    #[test]
    fn test_extends_literal_identity() {
        assert_eq!(ext(&Type::num_lit(5.0), &Type::num_lit(6.0)), ExtendsResult::False);
        assert_eq!(ext(&Type::num_lit(5.0), &Type::num_lit(5.0)), ExtendsResult::True);
        assert_eq!(ext(&Type::num_lit(5.0), &Type::number()), ExtendsResult::True);
        assert_eq!(ext(&Type::number(), &Type::num_lit(5.0)), ExtendsResult::False);
    }

    #[test]
    fn test_extends_any_is_indeterminate() {
        assert_eq!(ext(&Type::Any, &Type::number()), ExtendsResult::Any);
        assert_eq!(ext(&Type::Any, &Type::Any), ExtendsResult::True);
        assert_eq!(ext(&Type::number(), &Type::Any), ExtendsResult::True);
    }

    #[test]
    fn test_extends_never() {
        assert_eq!(ext(&Type::Never, &Type::string()), ExtendsResult::Never);
    }

    #[test]
    fn test_extends_unions() {
        let num_or_str = Type::union([Type::number(), Type::string()]);
        assert_eq!(ext(&Type::num_lit(1.0), &num_or_str), ExtendsResult::True);
        assert_eq!(ext(&num_or_str, &Type::number()), ExtendsResult::False);
        assert_eq!(ext(&num_or_str, &num_or_str), ExtendsResult::True);
    }

    #[test]
    fn test_extends_binds_infer_placeholder() {
        let mut bindings = TypeBindings::new();
        let result = extends(
            &Type::array(Type::string()),
            &Type::array(Type::generic("U")),
            &mut bindings,
            &NoEnv,
        );
        assert_eq!(result, ExtendsResult::True);
        assert_eq!(bindings.get("U"), Some(&Type::string()));
    }

    #[test]
    fn test_extends_functions() {
        let narrow = Type::function(vec![Type::number()], Type::num_lit(1.0));
        let wide = Type::function(vec![Type::number(), Type::string()], Type::number());
        assert_eq!(ext(&narrow, &wide), ExtendsResult::True);
        assert_eq!(ext(&wide, &narrow), ExtendsResult::False);
    }

    #[test]
    fn test_extends_optional() {
        let opt = Type::optional(Type::number());
        assert_eq!(ext(&Type::undefined(), &opt), ExtendsResult::True);
        assert_eq!(ext(&Type::num_lit(3.0), &opt), ExtendsResult::True);
        assert_eq!(ext(&opt, &Type::number()), ExtendsResult::False);
    }

    struct Hierarchy;

    impl TypeEnv for Hierarchy {
        fn supertypes(&self, ty: &Type) -> Vec<Type> {
            match ty.named().map(|n| n.name.as_str()) {
                Some("Dog") => vec![Type::class("Animal")],
                _ => Vec::new(),
            }
        }

        fn members(&self, ty: &Type) -> Option<Vec<Member>> {
            match ty.named().map(|n| n.name.as_str()) {
                Some("Named") => Some(vec![Member {
                    name: "name".into(),
                    ty: Type::string(),
                    optional: false,
                }]),
                _ => None,
            }
        }
    }

    #[test]
    fn test_extends_through_supertypes_and_structure() {
        let mut b = TypeBindings::new();
        assert!(extends(&Type::class("Dog"), &Type::class("Animal"), &mut b, &Hierarchy).is_true());
        assert!(!extends(&Type::class("Animal"), &Type::class("Dog"), &mut b, &Hierarchy).is_true());
        let obj = Type::object(vec![("name", Type::str_lit("rex"))]);
        assert!(extends(&obj, &Type::interface("Named"), &mut b, &Hierarchy).is_true());
    }
}
