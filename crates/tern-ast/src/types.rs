//! Type definitions for the AST

use super::*;
use std::fmt;

/// Type expression
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// Primitive types: number, string, boolean, bigint, symbol, void, null, undefined, any, never, unknown
    Primitive(PrimitiveType),

    /// Array type: T[]
    Array(Box<Node<Type>>),

    /// Tuple type: [T1, T2, ...]
    Tuple(Vec<Node<Type>>),

    /// Union type: T1 | T2 | ...
    Union(Vec<Node<Type>>),

    /// Function type: (args) => ReturnType
    Function(FunctionType),

    /// Type reference: SomeType, ns.SomeType, Box<T>
    TypeRef {
        name: Node<Ident>,
        type_args: Option<Vec<Node<Type>>>,
    },

    /// Object type: { prop1: Type1, prop2: Type2 }
    Object(ObjectType),

    /// Literal type: "hello" | 42 | true
    Literal(LiteralType),

    /// Parenthesized type
    Paren(Box<Node<Type>>),

    /// Conditional type: T extends U ? X : Y
    Conditional {
        check_type: Box<Node<Type>>,
        extends_type: Box<Node<Type>>,
        true_type: Box<Node<Type>>,
        false_type: Box<Node<Type>>,
    },

    /// infer type: infer T (used in conditional types)
    Infer(Node<Ident>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Number,
    String,
    Boolean,
    BigInt,
    Symbol,
    Void,
    Null,
    Undefined,
    Any,
    Never,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub type_params: Option<Vec<TypeParam>>,
    pub params: Vec<FunctionTypeParam>,
    pub return_type: Box<Node<Type>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionTypeParam {
    pub name: Option<Node<Ident>>,
    pub ty: Node<Type>,
    pub optional: bool,
    pub is_rest: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectType {
    pub members: Vec<ObjectTypeMember>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectTypeMember {
    Property {
        name: PropertyName,
        ty: Node<Type>,
        optional: bool,
        readonly: bool,
    },
    Method {
        name: PropertyName,
        type_params: Option<Vec<TypeParam>>,
        params: Vec<FunctionTypeParam>,
        return_type: Node<Type>,
        optional: bool,
    },
}

impl ObjectTypeMember {
    pub fn name(&self) -> &PropertyName {
        match self {
            ObjectTypeMember::Property { name, .. } | ObjectTypeMember::Method { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralType {
    String(String),
    Number(f64),
    Boolean(bool),
}

/// Type parameter (generic)
#[derive(Debug, Clone, PartialEq)]
pub struct TypeParam {
    pub name: Node<Ident>,
    pub constraint: Option<Box<Node<Type>>>,
    pub default: Option<Box<Node<Type>>>,
}

// Display implementations

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveType::Number => write!(f, "number"),
            PrimitiveType::String => write!(f, "string"),
            PrimitiveType::Boolean => write!(f, "boolean"),
            PrimitiveType::BigInt => write!(f, "bigint"),
            PrimitiveType::Symbol => write!(f, "symbol"),
            PrimitiveType::Void => write!(f, "void"),
            PrimitiveType::Null => write!(f, "null"),
            PrimitiveType::Undefined => write!(f, "undefined"),
            PrimitiveType::Any => write!(f, "any"),
            PrimitiveType::Never => write!(f, "never"),
            PrimitiveType::Unknown => write!(f, "unknown"),
        }
    }
}

impl fmt::Display for LiteralType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralType::String(s) => write!(f, "\"{}\"", s),
            LiteralType::Number(n) => write!(f, "{}", n),
            LiteralType::Boolean(b) => write!(f, "{}", b),
        }
    }
}
