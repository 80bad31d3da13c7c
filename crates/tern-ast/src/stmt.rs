//! Statement definitions for the AST

use super::*;
use std::fmt;

/// Statement
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Expression statement
    Expr(Node<Expr>),

    /// Variable declaration: let/const/var name: Type = value
    VarDecl(VarDecl),

    /// Nested declaration (function or class inside a body)
    Decl(Box<Decl>),

    /// Return statement
    Return(Option<Node<Expr>>),

    /// If statement
    If {
        condition: Node<Expr>,
        then_stmt: Box<Node<Stmt>>,
        else_stmt: Option<Box<Node<Stmt>>>,
    },

    /// For statement
    For {
        init: Option<ForInit>,
        condition: Option<Node<Expr>>,
        update: Option<Node<Expr>>,
        body: Box<Node<Stmt>>,
    },

    /// For-of statement: for (left of right) body
    ForOf {
        left: VarDecl,
        right: Node<Expr>,
        body: Box<Node<Stmt>>,
    },

    /// While statement
    While {
        condition: Node<Expr>,
        body: Box<Node<Stmt>>,
    },

    /// Do-while statement
    DoWhile {
        body: Box<Node<Stmt>>,
        condition: Node<Expr>,
    },

    /// Block statement: { stmts }
    Block(BlockStmt),

    /// Break statement
    Break,

    /// Continue statement
    Continue,

    /// Throw statement
    Throw(Node<Expr>),

    /// Empty statement: ;
    Empty,
}

/// Block statement
#[derive(Debug, Clone, PartialEq)]
pub struct BlockStmt {
    pub stmts: Vec<Node<Stmt>>,
}

/// Variable declaration
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub kind: VarDeclKind,
    pub declarations: Vec<VarDeclarator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarDeclKind {
    Let,
    Const,
    Var,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclarator {
    pub pattern: Node<Pattern>,
    pub init: Option<Node<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    VarDecl(VarDecl),
    Expr(Node<Expr>),
}

/// Pattern for destructuring
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// Identifier pattern
    Ident {
        name: Node<Ident>,
        type_annotation: Option<Box<Node<Type>>>,
    },

    /// Array pattern: [a, b]
    Array {
        elements: Vec<Option<Node<Pattern>>>,
        type_annotation: Option<Box<Node<Type>>>,
    },

    /// Object pattern: { a, b: c }
    Object {
        properties: Vec<ObjectPatternProperty>,
        type_annotation: Option<Box<Node<Type>>>,
    },
}

impl Pattern {
    /// Name of a plain identifier pattern.
    pub fn ident_name(&self) -> Option<&str> {
        match self {
            Pattern::Ident { name, .. } => Some(name.value.name.as_str()),
            _ => None,
        }
    }

    pub fn type_annotation(&self) -> Option<&Node<Type>> {
        match self {
            Pattern::Ident { type_annotation, .. }
            | Pattern::Array { type_annotation, .. }
            | Pattern::Object { type_annotation, .. } => type_annotation.as_deref(),
        }
    }

    /// Every identifier bound by this pattern, in source order.
    pub fn bound_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names(&self, out: &mut Vec<String>) {
        match self {
            Pattern::Ident { name, .. } => out.push(name.value.name.clone()),
            Pattern::Array { elements, .. } => {
                for elem in elements.iter().flatten() {
                    elem.value.collect_names(out);
                }
            }
            Pattern::Object { properties, .. } => {
                for prop in properties {
                    prop.value.value.collect_names(out);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPatternProperty {
    pub key: PropertyName,
    pub value: Node<Pattern>,
}

// Display implementations

impl fmt::Display for VarDeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarDeclKind::Let => write!(f, "let"),
            VarDeclKind::Const => write!(f, "const"),
            VarDeclKind::Var => write!(f, "var"),
        }
    }
}
