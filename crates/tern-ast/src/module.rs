//! Module-level items

use super::*;

/// Module item (top-level in a file or namespace body)
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleItem {
    /// Statement
    Stmt(Node<Stmt>),

    /// Declaration
    Decl(Node<Decl>),

    /// `export` declaration
    Export(Node<Decl>),
}

impl ModuleItem {
    pub fn as_decl(&self) -> Option<&Node<Decl>> {
        match self {
            ModuleItem::Decl(decl) | ModuleItem::Export(decl) => Some(decl),
            ModuleItem::Stmt(_) => None,
        }
    }

    pub fn is_exported(&self) -> bool {
        matches!(self, ModuleItem::Export(_))
    }
}

/// Root AST node - represents a complete source file
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub items: Vec<Node<ModuleItem>>,
    pub span: Span,
}

impl Program {
    pub fn new(items: Vec<Node<ModuleItem>>) -> Self {
        let span = items
            .iter()
            .map(|item| item.span)
            .reduce(|a, b| a.merge(&b))
            .unwrap_or_default();
        Self { items, span }
    }
}
