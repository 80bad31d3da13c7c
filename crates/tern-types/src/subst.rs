//! Placeholder substitution

use crate::bindings::TypeBindings;
use crate::ty::{Field, FunctionType, NamedType, Type};

/// Replaces bound placeholders. Unbound placeholders are left in place, and
/// substituted unions are re-normalized.
pub fn substitute(ty: &Type, bindings: &TypeBindings) -> Type {
    if bindings.is_empty() || !ty.has_placeholders() {
        return ty.clone();
    }
    match ty {
        Type::NamedGeneric(name) => bindings.get(name).cloned().unwrap_or_else(|| ty.clone()),
        Type::Union(members) => Type::union(members.iter().map(|m| substitute(m, bindings))),
        Type::Tuple(fields) => Type::Tuple(substitute_fields(fields, bindings)),
        Type::ConstTuple(fields) => Type::ConstTuple(substitute_fields(fields, bindings)),
        Type::Array(elem) => Type::array(substitute(elem, bindings)),
        Type::ConstArray(elem, len) => Type::ConstArray(Box::new(substitute(elem, bindings)), *len),
        Type::Optional(inner) => Type::optional(substitute(inner, bindings)),
        Type::Function(func) => Type::Function(FunctionType {
            params: func.params.iter().map(|p| substitute(p, bindings)).collect(),
            result: Box::new(substitute(&func.result, bindings)),
            variadic: func.variadic,
        }),
        Type::Class(named) => Type::Class(substitute_named(named, bindings)),
        Type::Interface(named) => Type::Interface(substitute_named(named, bindings)),
        Type::Primitive(_) | Type::Literal(_) | Type::Never | Type::Any | Type::Unknown => ty.clone(),
    }
}

fn substitute_fields(fields: &[Field], bindings: &TypeBindings) -> Vec<Field> {
    fields
        .iter()
        .map(|f| Field {
            name: f.name.clone(),
            ty: substitute(&f.ty, bindings),
        })
        .collect()
}

fn substitute_named(named: &NamedType, bindings: &TypeBindings) -> NamedType {
    match &named.origin {
        Some(origin) => NamedType::specialized(
            origin.generic.clone(),
            origin.args.iter().map(|a| substitute(a, bindings)).collect(),
        ),
        None => named.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_nested() {
        let bindings = TypeBindings::from_pairs([("T".to_string(), Type::number())]);
        let ty = Type::function(vec![Type::array(Type::generic("T"))], Type::generic("U"));
        let out = substitute(&ty, &bindings);
        assert_eq!(out, Type::function(vec![Type::array(Type::number())], Type::generic("U")));
    }

    #[test]
    fn test_substitute_renames_specialization() {
        let bindings = TypeBindings::from_pairs([("T".to_string(), Type::string())]);
        let ty = Type::Class(NamedType::specialized("Box", vec![Type::generic("T")]));
        let out = substitute(&ty, &bindings);
        assert_eq!(out.named().map(|n| n.name.as_str()), Some("Box<string>"));
    }

    #[test]
    fn test_substitute_renormalizes_union() {
        let bindings = TypeBindings::from_pairs([("T".to_string(), Type::number())]);
        let ty = Type::union([Type::generic("T"), Type::number()]);
        assert_eq!(substitute(&ty, &bindings), Type::number());
    }
}
