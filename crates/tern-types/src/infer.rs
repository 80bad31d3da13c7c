//! Best-effort structural inference of type-parameter bindings.

use rustc_hash::FxHashSet;

use crate::bindings::TypeBindings;
use crate::lattice::TypeEnv;
use crate::ty::{Field, NamedType, Type};

const MAX_BASE_SEARCH: usize = 32;

/// Walks `template` and `concrete` in lock-step, binding every named
/// placeholder reached in the template. Shapes that do not line up stop the
/// descent without error.
pub fn infer(template: &Type, concrete: &Type, bindings: &mut TypeBindings, env: &dyn TypeEnv) {
    if !template.has_placeholders() {
        return;
    }
    match (template, concrete) {
        (Type::NamedGeneric(name), _) => {
            tracing::trace!(placeholder = %name, ty = %concrete, "infer binding");
            bindings.bind_merge(name, concrete);
        }
        (Type::Optional(t), Type::Optional(c)) => infer(t, c, bindings, env),
        (Type::Optional(t), c) => {
            let stripped = c.non_optional();
            if !matches!(stripped, Type::Never) {
                infer(t, &stripped, bindings, env);
            }
        }
        (Type::Array(t), Type::Array(c) | Type::ConstArray(c, _)) => infer(t, c, bindings, env),
        (Type::Tuple(tf) | Type::ConstTuple(tf), Type::Tuple(cf) | Type::ConstTuple(cf)) => {
            infer_fields(tf, cf, bindings, env)
        }
        (Type::Function(tf), Type::Function(cf)) => {
            for (t, c) in tf.params.iter().zip(&cf.params) {
                infer(t, c, bindings, env);
            }
            infer(&tf.result, &cf.result, bindings, env);
        }
        (Type::Class(t) | Type::Interface(t), Type::Class(_) | Type::Interface(_)) => {
            infer_named(t, concrete, bindings, env)
        }
        (Type::Union(tm), Type::Union(cm)) => {
            let t_rest: Vec<&Type> = tm.iter().filter(|t| !cm.contains(t)).collect();
            let c_rest: Vec<Type> = cm.iter().filter(|c| !tm.contains(c)).cloned().collect();
            if let [single] = t_rest.as_slice() {
                infer(single, &Type::union(c_rest), bindings, env);
            } else {
                for (t, c) in t_rest.iter().zip(&c_rest) {
                    infer(t, c, bindings, env);
                }
            }
        }
        (Type::Union(tm), c) => {
            // `T | undefined` against a plain value binds T to the value.
            let generic: Vec<&Type> = tm.iter().filter(|t| t.has_placeholders()).collect();
            if let [single] = generic.as_slice() {
                if !tm.contains(c) {
                    infer(single, c, bindings, env);
                }
            }
        }
        _ => {}
    }
}

fn infer_fields(tf: &[Field], cf: &[Field], bindings: &mut TypeBindings, env: &dyn TypeEnv) {
    for (i, t) in tf.iter().enumerate() {
        let c = match &t.name {
            Some(name) => cf.iter().find(|f| f.name.as_deref() == Some(name.as_str())),
            None => cf.get(i),
        };
        if let Some(c) = c {
            infer(&t.ty, &c.ty, bindings, env);
        }
    }
}

/// Class/interface inference goes through the generic origin's type
/// arguments, searching the concrete type's supertypes for the template's
/// generic declaration.
fn infer_named(template: &NamedType, concrete: &Type, bindings: &mut TypeBindings, env: &dyn TypeEnv) {
    let Some(t_origin) = &template.origin else {
        return;
    };
    let mut queue = vec![concrete.clone()];
    let mut seen: FxHashSet<String> = FxHashSet::default();
    while let Some(candidate) = queue.pop() {
        if seen.len() > MAX_BASE_SEARCH {
            break;
        }
        let Some(named) = candidate.named() else {
            continue;
        };
        if !seen.insert(named.name.clone()) {
            continue;
        }
        if let Some(c_origin) = &named.origin {
            if c_origin.generic == t_origin.generic {
                for (t, c) in t_origin.args.iter().zip(&c_origin.args) {
                    infer(t, c, bindings, env);
                }
                return;
            }
        }
        queue.extend(env.supertypes(&candidate));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::{Member, NoEnv};

    #[test]
    fn test_infer_direct_placeholder() {
        let mut b = TypeBindings::new();
        infer(&Type::generic("T"), &Type::num_lit(5.0), &mut b, &NoEnv);
        assert_eq!(b.get("T"), Some(&Type::num_lit(5.0)));
    }

    #[test]
    fn test_infer_array_and_function() {
        let mut b = TypeBindings::new();
        let template = Type::function(vec![Type::generic("T")], Type::array(Type::generic("U")));
        let concrete = Type::function(vec![Type::string()], Type::array(Type::boolean()));
        infer(&template, &concrete, &mut b, &NoEnv);
        assert_eq!(b.get("T"), Some(&Type::string()));
        assert_eq!(b.get("U"), Some(&Type::boolean()));
    }

    #[test]
    fn test_infer_tuple_by_field_name() {
        let mut b = TypeBindings::new();
        let template = Type::object(vec![("a", Type::generic("A")), ("b", Type::generic("B"))]);
        let concrete = Type::object(vec![("b", Type::string()), ("a", Type::number())]);
        infer(&template, &concrete, &mut b, &NoEnv);
        assert_eq!(b.get("A"), Some(&Type::number()));
        assert_eq!(b.get("B"), Some(&Type::string()));
    }

    #[test]
    fn test_infer_optional_strips_undefined() {
        let mut b = TypeBindings::new();
        let template = Type::optional(Type::generic("T"));
        let concrete = Type::union([Type::number(), Type::undefined()]);
        infer(&template, &concrete, &mut b, &NoEnv);
        assert_eq!(b.get("T"), Some(&Type::number()));
    }

    #[test]
    fn test_infer_union_removes_shared_members() {
        let mut b = TypeBindings::new();
        let template = Type::union([Type::generic("T"), Type::null()]);
        let concrete = Type::union([Type::string(), Type::null()]);
        infer(&template, &concrete, &mut b, &NoEnv);
        assert_eq!(b.get("T"), Some(&Type::string()));
    }

    #[test]
    fn test_infer_mismatched_shapes_is_silent() {
        let mut b = TypeBindings::new();
        infer(&Type::array(Type::generic("T")), &Type::number(), &mut b, &NoEnv);
        assert!(b.is_empty());
    }

    struct Bases;

    impl TypeEnv for Bases {
        fn supertypes(&self, ty: &Type) -> Vec<Type> {
            match ty.named().map(|n| n.name.as_str()) {
                Some("NumberList") => vec![Type::Class(NamedType::specialized(
                    "List",
                    vec![Type::number()],
                ))],
                _ => Vec::new(),
            }
        }

        fn members(&self, _ty: &Type) -> Option<Vec<Member>> {
            None
        }
    }

    #[test]
    fn test_infer_class_through_base() {
        let mut b = TypeBindings::new();
        let template = Type::Class(NamedType::specialized("List", vec![Type::generic("T")]));
        infer(&template, &Type::class("NumberList"), &mut b, &Bases);
        assert_eq!(b.get("T"), Some(&Type::number()));
    }
}
