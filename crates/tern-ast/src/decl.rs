//! Declaration definitions for the AST

use super::*;

/// Declaration
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    /// Function declaration
    Function(FunctionDecl),

    /// Class declaration
    Class(ClassDecl),

    /// Interface declaration
    Interface(InterfaceDecl),

    /// Type alias declaration
    TypeAlias(TypeAliasDecl),

    /// Enum declaration
    Enum(EnumDecl),

    /// Namespace declaration
    Module(ModuleDecl),

    /// Variable declaration
    Var(VarDecl),
}

impl Decl {
    /// Declared name, when the declaration introduces exactly one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Decl::Function(f) => Some(&f.name.value.name),
            Decl::Class(c) => Some(&c.name.value.name),
            Decl::Interface(i) => Some(&i.name.value.name),
            Decl::TypeAlias(t) => Some(&t.name.value.name),
            Decl::Enum(e) => Some(&e.name.value.name),
            Decl::Module(m) => Some(&m.name.value.name),
            Decl::Var(_) => None,
        }
    }
}

/// Function declaration
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Node<Ident>,
    pub type_params: Option<Vec<TypeParam>>,
    pub params: Vec<Param>,
    pub return_type: Option<Box<Node<Type>>>,
    pub body: Option<Node<BlockStmt>>,
    pub is_generator: bool,
    pub is_declare: bool,
}

impl FunctionDecl {
    pub fn is_generic(&self) -> bool {
        self.type_params.as_ref().is_some_and(|tp| !tp.is_empty())
    }
}

/// Function parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub pattern: Node<Pattern>,
    pub type_annotation: Option<Box<Node<Type>>>,
    pub default: Option<Node<Expr>>,
    pub optional: bool,
    pub is_rest: bool,
}

impl Param {
    /// Annotation on the parameter itself, falling back to the pattern's.
    pub fn annotation(&self) -> Option<&Node<Type>> {
        self.type_annotation
            .as_deref()
            .or_else(|| self.pattern.value.type_annotation())
    }
}

/// Class declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: Node<Ident>,
    pub type_params: Option<Vec<TypeParam>>,
    pub extends: Option<ClassExtends>,
    pub implements: Vec<Node<Type>>,
    pub members: Vec<ClassMember>,
    pub is_abstract: bool,
    pub is_declare: bool,
}

impl ClassDecl {
    pub fn is_generic(&self) -> bool {
        self.type_params.as_ref().is_some_and(|tp| !tp.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassExtends {
    /// Base class name, possibly dotted (`ns.Base`)
    pub base: Node<Ident>,
    pub type_args: Option<Vec<Node<Type>>>,
}

/// Class member
#[derive(Debug, Clone, PartialEq)]
pub enum ClassMember {
    /// Constructor
    Constructor {
        params: Vec<Param>,
        body: Option<Node<BlockStmt>>,
    },

    /// Method
    Method {
        name: PropertyName,
        type_params: Option<Vec<TypeParam>>,
        params: Vec<Param>,
        return_type: Option<Box<Node<Type>>>,
        body: Option<Node<BlockStmt>>,
        is_static: bool,
        is_abstract: bool,
    },

    /// Property/field
    Property {
        name: PropertyName,
        type_annotation: Option<Box<Node<Type>>>,
        init: Option<Node<Expr>>,
        is_static: bool,
        is_readonly: bool,
        is_optional: bool,
    },
}

/// Interface declaration
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDecl {
    pub name: Node<Ident>,
    pub type_params: Option<Vec<TypeParam>>,
    pub extends: Vec<Node<Type>>,
    pub members: Vec<ObjectTypeMember>,
    pub is_declare: bool,
}

impl InterfaceDecl {
    pub fn is_generic(&self) -> bool {
        self.type_params.as_ref().is_some_and(|tp| !tp.is_empty())
    }
}

/// Type alias declaration
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAliasDecl {
    pub name: Node<Ident>,
    pub type_params: Option<Vec<TypeParam>>,
    pub ty: Node<Type>,
}

/// Enum declaration
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub name: Node<Ident>,
    pub members: Vec<EnumMember>,
    pub is_const: bool,
    pub is_declare: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    pub name: Node<Ident>,
    pub init: Option<Node<Expr>>,
}

/// Namespace declaration. `name` may be dotted (`namespace A.B { }`).
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDecl {
    pub name: Node<Ident>,
    pub body: Vec<Node<ModuleItem>>,
    pub is_declare: bool,
}
