//! Type value model

use std::fmt;
use std::hash::{Hash, Hasher};

/// Primitive base types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    Number,
    String,
    Boolean,
    BigInt,
    Symbol,
    Void,
    Null,
    Undefined,
}

impl Primitive {
    /// Whether literal values of this primitive exist.
    pub fn has_literals(self) -> bool {
        matches!(self, Primitive::Number | Primitive::String | Primitive::Boolean)
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Primitive::Number => "number",
            Primitive::String => "string",
            Primitive::Boolean => "boolean",
            Primitive::BigInt => "bigint",
            Primitive::Symbol => "symbol",
            Primitive::Void => "void",
            Primitive::Null => "null",
            Primitive::Undefined => "undefined",
        };
        write!(f, "{}", s)
    }
}

/// Value carried by a literal type. Numbers compare by bit pattern so that
/// literal types are usable as exact keys.
#[derive(Debug, Clone)]
pub enum LiteralValue {
    Number(f64),
    String(String),
    Boolean(bool),
}

impl LiteralValue {
    pub fn base(&self) -> Primitive {
        match self {
            LiteralValue::Number(_) => Primitive::Number,
            LiteralValue::String(_) => Primitive::String,
            LiteralValue::Boolean(_) => Primitive::Boolean,
        }
    }
}

impl PartialEq for LiteralValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LiteralValue::Number(a), LiteralValue::Number(b)) => a.to_bits() == b.to_bits(),
            (LiteralValue::String(a), LiteralValue::String(b)) => a == b,
            (LiteralValue::Boolean(a), LiteralValue::Boolean(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for LiteralValue {}

impl Hash for LiteralValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            LiteralValue::Number(n) => n.to_bits().hash(state),
            LiteralValue::String(s) => s.hash(state),
            LiteralValue::Boolean(b) => b.hash(state),
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Number(n) => write!(f, "{}", n),
            LiteralValue::String(s) => write!(f, "\"{}\"", s),
            LiteralValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// One tuple field. Object literal types are tuples with named fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: Option<String>,
    pub ty: Type,
}

impl Field {
    pub fn named(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: Some(name.into()),
            ty,
        }
    }

    pub fn positional(ty: Type) -> Self {
        Self { name: None, ty }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionType {
    pub params: Vec<Type>,
    pub result: Box<Type>,
    /// Last parameter is a rest array.
    pub variadic: bool,
}

impl FunctionType {
    pub fn new(params: Vec<Type>, result: Type) -> Self {
        Self {
            params,
            result: Box::new(result),
            variadic: false,
        }
    }

    /// Number of parameters a call must supply.
    pub fn min_arity(&self) -> usize {
        let fixed = if self.variadic {
            self.params.len().saturating_sub(1)
        } else {
            self.params.len()
        };
        self.params[..fixed]
            .iter()
            .rposition(|p| !matches!(p, Type::Optional(_)))
            .map_or(0, |i| i + 1)
    }
}

/// The generic declaration a specialized class or interface came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericOrigin {
    pub generic: String,
    pub args: Vec<Type>,
}

/// Reference to a class or interface declaration by its full name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedType {
    pub name: String,
    pub origin: Option<GenericOrigin>,
}

impl NamedType {
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: None,
        }
    }

    pub fn specialized(generic: impl Into<String>, args: Vec<Type>) -> Self {
        let generic = generic.into();
        Self {
            name: specialization_name(&generic, &args),
            origin: Some(GenericOrigin { generic, args }),
        }
    }
}

/// `fullName<arg, arg>`: the key under which a specialization is cached.
pub fn specialization_name(generic: &str, args: &[Type]) -> String {
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    format!("{}<{}>", generic, args.join(", "))
}

/// A resolved type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Primitive(Primitive),
    Literal(LiteralValue),
    /// Flattened, deduplicated, sorted. Build with [`Type::union`].
    Union(Vec<Type>),
    Tuple(Vec<Field>),
    /// Fixed-size tuple built from a literal-only context.
    ConstTuple(Vec<Field>),
    Array(Box<Type>),
    ConstArray(Box<Type>, usize),
    Function(FunctionType),
    Class(NamedType),
    Interface(NamedType),
    NamedGeneric(String),
    Optional(Box<Type>),
    Never,
    Any,
    Unknown,
}

impl Type {
    pub fn number() -> Type {
        Type::Primitive(Primitive::Number)
    }

    pub fn string() -> Type {
        Type::Primitive(Primitive::String)
    }

    pub fn boolean() -> Type {
        Type::Primitive(Primitive::Boolean)
    }

    pub fn void() -> Type {
        Type::Primitive(Primitive::Void)
    }

    pub fn undefined() -> Type {
        Type::Primitive(Primitive::Undefined)
    }

    pub fn null() -> Type {
        Type::Primitive(Primitive::Null)
    }

    pub fn num_lit(value: f64) -> Type {
        Type::Literal(LiteralValue::Number(value))
    }

    pub fn str_lit(value: impl Into<String>) -> Type {
        Type::Literal(LiteralValue::String(value.into()))
    }

    pub fn bool_lit(value: bool) -> Type {
        Type::Literal(LiteralValue::Boolean(value))
    }

    pub fn array(elem: Type) -> Type {
        Type::Array(Box::new(elem))
    }

    pub fn optional(inner: Type) -> Type {
        match inner {
            Type::Optional(_) => inner,
            other => Type::Optional(Box::new(other)),
        }
    }

    pub fn function(params: Vec<Type>, result: Type) -> Type {
        Type::Function(FunctionType::new(params, result))
    }

    pub fn class(name: impl Into<String>) -> Type {
        Type::Class(NamedType::plain(name))
    }

    pub fn interface(name: impl Into<String>) -> Type {
        Type::Interface(NamedType::plain(name))
    }

    pub fn generic(name: impl Into<String>) -> Type {
        Type::NamedGeneric(name.into())
    }

    pub fn object(fields: Vec<(&str, Type)>) -> Type {
        Type::Tuple(
            fields
                .into_iter()
                .map(|(name, ty)| Field::named(name, ty))
                .collect(),
        )
    }

    /// Builds a union: nested unions are flattened, duplicates dropped,
    /// members sorted by their rendering. `Never` members vanish and an
    /// `Any`/`Unknown` member swallows the rest.
    pub fn union(members: impl IntoIterator<Item = Type>) -> Type {
        let mut flat: Vec<Type> = Vec::new();
        for member in members {
            match member {
                Type::Union(inner) => flat.extend(inner),
                Type::Never => {}
                other => flat.push(other),
            }
        }
        if flat.iter().any(|t| matches!(t, Type::Any)) {
            return Type::Any;
        }
        if flat.iter().any(|t| matches!(t, Type::Unknown)) {
            return Type::Unknown;
        }
        flat.sort_by_cached_key(|t| (t.to_string(), t.kind_rank()));
        let mut unique: Vec<Type> = Vec::with_capacity(flat.len());
        for member in flat {
            if !unique.contains(&member) {
                unique.push(member);
            }
        }
        let mut flat = unique;
        match flat.len() {
            0 => Type::Never,
            1 => flat.remove(0),
            _ => Type::Union(flat),
        }
    }

    /// Tie-breaker for types that render identically (a class and an
    /// interface of the same name).
    fn kind_rank(&self) -> u8 {
        match self {
            Type::Primitive(_) => 0,
            Type::Literal(_) => 1,
            Type::Union(_) => 2,
            Type::Tuple(_) => 3,
            Type::ConstTuple(_) => 4,
            Type::Array(_) => 5,
            Type::ConstArray(..) => 6,
            Type::Function(_) => 7,
            Type::Class(_) => 8,
            Type::Interface(_) => 9,
            Type::NamedGeneric(_) => 10,
            Type::Optional(_) => 11,
            Type::Never => 12,
            Type::Any => 13,
            Type::Unknown => 14,
        }
    }

    /// Members of a union, or the type itself.
    pub fn union_members(&self) -> &[Type] {
        match self {
            Type::Union(members) => members,
            other => std::slice::from_ref(other),
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Type::Literal(_))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Primitive(Primitive::Void))
    }

    pub fn is_numeric(&self) -> bool {
        match self {
            Type::Primitive(Primitive::Number) => true,
            Type::Literal(lit) => lit.base() == Primitive::Number,
            Type::Union(members) => members.iter().all(Type::is_numeric),
            _ => false,
        }
    }

    pub fn is_stringish(&self) -> bool {
        match self {
            Type::Primitive(Primitive::String) => true,
            Type::Literal(lit) => lit.base() == Primitive::String,
            Type::Union(members) => members.iter().all(Type::is_stringish),
            _ => false,
        }
    }

    /// Whether a named generic placeholder occurs anywhere inside.
    pub fn has_placeholders(&self) -> bool {
        match self {
            Type::NamedGeneric(_) => true,
            Type::Union(members) => members.iter().any(Type::has_placeholders),
            Type::Tuple(fields) | Type::ConstTuple(fields) => {
                fields.iter().any(|f| f.ty.has_placeholders())
            }
            Type::Array(elem) | Type::ConstArray(elem, _) | Type::Optional(elem) => {
                elem.has_placeholders()
            }
            Type::Function(func) => {
                func.params.iter().any(Type::has_placeholders) || func.result.has_placeholders()
            }
            Type::Class(named) | Type::Interface(named) => named
                .origin
                .as_ref()
                .is_some_and(|o| o.args.iter().any(Type::has_placeholders)),
            Type::Primitive(_) | Type::Literal(_) | Type::Never | Type::Any | Type::Unknown => {
                false
            }
        }
    }

    /// Field lookup on tuple-shaped types by name.
    pub fn field(&self, name: &str) -> Option<&Type> {
        match self {
            Type::Tuple(fields) | Type::ConstTuple(fields) => fields
                .iter()
                .find(|f| f.name.as_deref() == Some(name))
                .map(|f| &f.ty),
            _ => None,
        }
    }

    /// Element type of array-like types.
    pub fn element(&self) -> Option<&Type> {
        match self {
            Type::Array(elem) | Type::ConstArray(elem, _) => Some(elem),
            _ => None,
        }
    }

    /// The type without an `undefined` member.
    pub fn non_optional(&self) -> Type {
        match self {
            Type::Optional(inner) => (**inner).clone(),
            Type::Union(members) => Type::union(
                members
                    .iter()
                    .filter(|m| !matches!(m, Type::Primitive(Primitive::Undefined)))
                    .cloned(),
            ),
            other => other.clone(),
        }
    }

    pub fn named(&self) -> Option<&NamedType> {
        match self {
            Type::Class(named) | Type::Interface(named) => Some(named),
            _ => None,
        }
    }
}

fn needs_parens(ty: &Type) -> bool {
    matches!(ty, Type::Union(_) | Type::Function(_) | Type::Optional(_))
}

fn write_fields(f: &mut fmt::Formatter<'_>, fields: &[Field]) -> fmt::Result {
    let named = fields.iter().any(|field| field.name.is_some());
    write!(f, "{}", if named { "{" } else { "[" })?;
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        match &field.name {
            Some(name) => write!(f, "{}: {}", name, field.ty)?,
            None => write!(f, "{}", field.ty)?,
        }
    }
    write!(f, "{}", if named { "}" } else { "]" })
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(p) => write!(f, "{}", p),
            Type::Literal(lit) => write!(f, "{}", lit),
            Type::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    if matches!(member, Type::Function(_)) {
                        write!(f, "({})", member)?;
                    } else {
                        write!(f, "{}", member)?;
                    }
                }
                Ok(())
            }
            Type::Tuple(fields) => write_fields(f, fields),
            Type::ConstTuple(fields) => {
                write!(f, "const ")?;
                write_fields(f, fields)
            }
            Type::Array(elem) if needs_parens(elem) => write!(f, "({})[]", elem),
            Type::Array(elem) => write!(f, "{}[]", elem),
            Type::ConstArray(elem, len) => write!(f, "const {}[{}]", elem, len),
            Type::Function(func) => {
                write!(f, "(")?;
                for (i, param) in func.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if func.variadic && i + 1 == func.params.len() {
                        write!(f, "...")?;
                    }
                    write!(f, "{}", param)?;
                }
                write!(f, ") => {}", func.result)
            }
            Type::Class(named) | Type::Interface(named) => write!(f, "{}", named.name),
            Type::NamedGeneric(name) => write!(f, "{}", name),
            Type::Optional(inner) if needs_parens(inner) => write!(f, "({})?", inner),
            Type::Optional(inner) => write!(f, "{}?", inner),
            Type::Never => write!(f, "never"),
            Type::Any => write!(f, "any"),
            Type::Unknown => write!(f, "unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_flattens_and_dedups() {
        let inner = Type::union([Type::number(), Type::string()]);
        let outer = Type::union([inner, Type::number(), Type::boolean()]);
        match &outer {
            Type::Union(members) => {
                assert_eq!(members.len(), 3);
                assert!(members.iter().all(|m| !matches!(m, Type::Union(_))));
            }
            other => panic!("expected union, got {}", other),
        }
    }

    #[test]
    fn test_union_member_order_is_canonical() {
        let a = Type::union([Type::string(), Type::number()]);
        let b = Type::union([Type::number(), Type::string()]);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "number | string");
    }

    #[test]
    fn test_union_edge_cases() {
        assert_eq!(Type::union(Vec::<Type>::new()), Type::Never);
        assert_eq!(Type::union([Type::Never, Type::number()]), Type::number());
        assert_eq!(Type::union([Type::Any, Type::number()]), Type::Any);
    }

    #[test]
    fn test_literal_number_equality_by_value() {
        assert_eq!(Type::num_lit(5.0), Type::num_lit(5.0));
        assert_ne!(Type::num_lit(5.0), Type::num_lit(6.0));
        assert_ne!(Type::num_lit(1.0), Type::bool_lit(true));
    }

    #[test]
    fn test_specialization_name() {
        let inner = NamedType::specialized("Box", vec![Type::number()]);
        assert_eq!(inner.name, "Box<number>");
        let outer = NamedType::specialized("ns.Pair", vec![Type::Class(inner), Type::string()]);
        assert_eq!(outer.name, "ns.Pair<Box<number>, string>");
    }

    #[test]
    fn test_display_shapes() {
        let func = Type::function(vec![Type::number(), Type::string()], Type::void());
        assert_eq!(func.to_string(), "(number, string) => void");
        assert_eq!(Type::array(Type::union([Type::number(), Type::string()])).to_string(), "(number | string)[]");
        assert_eq!(Type::object(vec![("x", Type::number())]).to_string(), "{x: number}");
        assert_eq!(Type::Tuple(vec![Field::positional(Type::number())]).to_string(), "[number]");
    }

    #[test]
    fn test_placeholder_detection() {
        assert!(!Type::number().has_placeholders());
        assert!(Type::array(Type::generic("T")).has_placeholders());
        let boxed = Type::Class(NamedType::specialized("Box", vec![Type::generic("T")]));
        assert!(boxed.has_placeholders());
    }

    #[test]
    fn test_min_arity_skips_trailing_optionals() {
        let func = FunctionType::new(
            vec![Type::number(), Type::optional(Type::string())],
            Type::void(),
        );
        assert_eq!(func.min_arity(), 1);
    }
}
