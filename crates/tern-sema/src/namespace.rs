//! Namespace tree.
//!
//! Every namespace is stored once in the declaration tables under its full
//! dotted path. Per-namespace tables map a short name to the full name of the
//! declaration; the records themselves live in the global tables.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::scope::{DeclRef, ScopeEntry};
use crate::symbols::DeclTables;

/// Which per-namespace table a name goes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Variable,
    Function,
    GenericFunction,
    Class,
    GenericClass,
    Interface,
    GenericInterface,
    Enum,
    Alias,
    GenericAlias,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamespaceInfo {
    pub name: String,
    pub full_name: String,
    pub parent: Option<String>,
    pub children: Vec<String>,
    pub variables: FxHashMap<String, String>,
    pub functions: FxHashMap<String, String>,
    pub generic_functions: FxHashMap<String, String>,
    pub classes: FxHashMap<String, String>,
    pub generic_classes: FxHashMap<String, String>,
    pub interfaces: FxHashMap<String, String>,
    pub generic_interfaces: FxHashMap<String, String>,
    pub enums: FxHashMap<String, String>,
    pub type_aliases: FxHashMap<String, String>,
    pub generic_aliases: FxHashMap<String, String>,
}

impl NamespaceInfo {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(name: &str, parent: &str) -> Self {
        Self {
            name: name.to_string(),
            full_name: qualify(parent, name),
            parent: Some(parent.to_string()),
            ..Self::default()
        }
    }

    pub fn table(&self, kind: SymbolKind) -> &FxHashMap<String, String> {
        match kind {
            SymbolKind::Variable => &self.variables,
            SymbolKind::Function => &self.functions,
            SymbolKind::GenericFunction => &self.generic_functions,
            SymbolKind::Class => &self.classes,
            SymbolKind::GenericClass => &self.generic_classes,
            SymbolKind::Interface => &self.interfaces,
            SymbolKind::GenericInterface => &self.generic_interfaces,
            SymbolKind::Enum => &self.enums,
            SymbolKind::Alias => &self.type_aliases,
            SymbolKind::GenericAlias => &self.generic_aliases,
        }
    }

    pub fn table_mut(&mut self, kind: SymbolKind) -> &mut FxHashMap<String, String> {
        match kind {
            SymbolKind::Variable => &mut self.variables,
            SymbolKind::Function => &mut self.functions,
            SymbolKind::GenericFunction => &mut self.generic_functions,
            SymbolKind::Class => &mut self.classes,
            SymbolKind::GenericClass => &mut self.generic_classes,
            SymbolKind::Interface => &mut self.interfaces,
            SymbolKind::GenericInterface => &mut self.generic_interfaces,
            SymbolKind::Enum => &mut self.enums,
            SymbolKind::Alias => &mut self.type_aliases,
            SymbolKind::GenericAlias => &mut self.generic_aliases,
        }
    }
}

/// Full name of `name` declared in namespace `ns` (root is `""`).
pub fn qualify(ns: &str, name: &str) -> String {
    if ns.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", ns, name)
    }
}

const VALUE_ORDER: [SymbolKind; 3] = [
    SymbolKind::Variable,
    SymbolKind::Function,
    SymbolKind::GenericFunction,
];

const TYPE_ORDER: [SymbolKind; 7] = [
    SymbolKind::Class,
    SymbolKind::GenericClass,
    SymbolKind::Interface,
    SymbolKind::GenericInterface,
    SymbolKind::Enum,
    SymbolKind::Alias,
    SymbolKind::GenericAlias,
];

fn decl_ref(kind: SymbolKind, full: String) -> Option<DeclRef> {
    Some(match kind {
        SymbolKind::Variable => return None,
        SymbolKind::Function => DeclRef::Function(full),
        SymbolKind::GenericFunction => DeclRef::GenericFunction(full),
        SymbolKind::Class => DeclRef::Class(full),
        SymbolKind::GenericClass => DeclRef::GenericClass(full),
        SymbolKind::Interface => DeclRef::Interface(full),
        SymbolKind::GenericInterface => DeclRef::GenericInterface(full),
        SymbolKind::Enum => DeclRef::Enum(full),
        SymbolKind::Alias => DeclRef::Alias(full),
        SymbolKind::GenericAlias => DeclRef::GenericAlias(full),
    })
}

impl DeclTables {
    /// Namespaces from `ns` out to the root.
    pub fn namespace_chain(&self, ns: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut cursor = Some(ns.to_string());
        while let Some(current) = cursor {
            cursor = self.namespaces.get(&current).and_then(|info| info.parent.clone());
            chain.push(current);
        }
        chain
    }

    /// Looks `name` up in one namespace only, values before types.
    pub fn lookup_in(&self, ns: &str, name: &str) -> Option<ScopeEntry> {
        let info = self.namespaces.get(ns)?;
        for kind in VALUE_ORDER {
            if let Some(full) = info.table(kind).get(name) {
                return match kind {
                    SymbolKind::Variable => self.globals.get(full).cloned().map(ScopeEntry::Variable),
                    _ => decl_ref(kind, full.clone()).map(ScopeEntry::Declaration),
                };
            }
        }
        let child = qualify(ns, name);
        if info.children.contains(&child) {
            return Some(ScopeEntry::Declaration(DeclRef::Namespace(child)));
        }
        self.lookup_type_in(ns, name).map(ScopeEntry::Declaration)
    }

    pub fn lookup_type_in(&self, ns: &str, name: &str) -> Option<DeclRef> {
        let info = self.namespaces.get(ns)?;
        TYPE_ORDER
            .iter()
            .find_map(|kind| info.table(*kind).get(name).and_then(|full| decl_ref(*kind, full.clone())))
    }

    /// Walks the namespace chain from `ns` to the root; first hit wins.
    pub fn lookup_value(&self, ns: &str, name: &str) -> Option<ScopeEntry> {
        let found = self
            .namespace_chain(ns)
            .iter()
            .find_map(|current| self.lookup_in(current, name));
        tracing::trace!(namespace = ns, name, found = found.is_some(), "namespace lookup");
        found
    }

    pub fn lookup_type(&self, ns: &str, name: &str) -> Option<DeclRef> {
        self.namespace_chain(ns)
            .iter()
            .find_map(|current| self.lookup_type_in(current, name))
    }

    /// Resolves a namespace path like `A.B`, relative to the chain of `ns`.
    pub fn lookup_namespace(&self, ns: &str, path: &[&str]) -> Option<String> {
        let (first, rest) = path.split_first()?;
        let mut current = self
            .namespace_chain(ns)
            .into_iter()
            .map(|candidate| qualify(&candidate, first))
            .find(|full| self.namespaces.get(full).is_some())?;
        for segment in rest {
            let next = qualify(&current, segment);
            self.namespaces.get(&next)?;
            current = next;
        }
        Some(current)
    }

    /// Creates the namespace (and any missing parents) for `full`,
    /// reusing existing entries.
    pub fn ensure_namespace(&mut self, parent: &str, dotted: &str) -> String {
        let mut current = parent.to_string();
        for segment in dotted.split('.') {
            let full = qualify(&current, segment);
            if self.namespaces.get(&full).is_none() {
                self.namespaces.insert(full.clone(), NamespaceInfo::child(segment, &current));
                let child = full.clone();
                self.namespaces.update(&current, |info| {
                    if !info.children.contains(&child) {
                        info.children.push(child);
                    }
                });
            }
            current = full;
        }
        current
    }

    /// Registers `name` in a namespace table. Idempotent.
    pub fn register_name(&mut self, ns: &str, kind: SymbolKind, name: &str, full: &str) {
        let exists = self
            .namespaces
            .get(ns)
            .and_then(|info| info.table(kind).get(name))
            .is_some_and(|existing| existing == full);
        if !exists {
            self.namespaces.update(ns, |info| {
                info.table_mut(kind).insert(name.to_string(), full.to_string());
            });
        }
    }
}

/// The namespace resolution currently happens in.
#[derive(Debug, Clone, Default)]
pub struct NamespaceCursor(Rc<RefCell<String>>);

impl NamespaceCursor {
    pub fn current(&self) -> String {
        self.0.borrow().clone()
    }

    /// Switches to `full` until the returned guard is dropped.
    pub fn enter(&self, full: &str) -> NamespaceGuard {
        let previous = self.0.replace(full.to_string());
        tracing::trace!(namespace = full, "enter namespace");
        NamespaceGuard {
            cursor: self.clone(),
            previous,
        }
    }
}

#[must_use = "the previous namespace is restored when the guard drops"]
pub struct NamespaceGuard {
    cursor: NamespaceCursor,
    previous: String,
}

impl Drop for NamespaceGuard {
    fn drop(&mut self) {
        let previous = std::mem::take(&mut self.previous);
        self.cursor.0.replace(previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::VariableInfo;
    use tern_types::Type;

    fn tables() -> DeclTables {
        let mut tables = DeclTables::new();
        let inner = tables.ensure_namespace("", "A.B");
        assert_eq!(inner, "A.B");
        tables.register_name("", SymbolKind::Function, "f", "f");
        tables.register_name("A.B", SymbolKind::Class, "Point", "A.B.Point");
        tables.globals.insert("A.x".into(), VariableInfo::global("x", "A.x", Type::number()));
        tables.register_name("A", SymbolKind::Variable, "x", "A.x");
        tables
    }

    #[test]
    fn test_lookup_walks_to_root() {
        let tables = tables();
        assert_eq!(
            tables.lookup_value("A.B", "f"),
            Some(ScopeEntry::Declaration(DeclRef::Function("f".into())))
        );
        assert!(matches!(tables.lookup_value("A.B", "x"), Some(ScopeEntry::Variable(_))));
        assert_eq!(tables.lookup_type("A.B", "Point"), Some(DeclRef::Class("A.B.Point".into())));
        assert_eq!(tables.lookup_type("A", "Point"), None);
    }

    #[test]
    fn test_namespace_paths() {
        let tables = tables();
        assert_eq!(tables.lookup_namespace("", &["A", "B"]), Some("A.B".into()));
        assert_eq!(tables.lookup_namespace("A.B", &["B"]), Some("A.B".into()));
        assert_eq!(tables.lookup_namespace("", &["B"]), None);
        assert_eq!(
            tables.lookup_value("", "A"),
            Some(ScopeEntry::Declaration(DeclRef::Namespace("A".into())))
        );
    }

    #[test]
    fn test_ensure_namespace_is_idempotent() {
        let mut tables = tables();
        tables.ensure_namespace("", "A");
        let root = tables.namespaces.get("").cloned().unwrap();
        assert_eq!(root.children, vec!["A".to_string()]);
    }

    #[test]
    fn test_guard_restores_on_drop() {
        let cursor = NamespaceCursor::default();
        {
            let _outer = cursor.enter("A");
            {
                let _inner = cursor.enter("A.B");
                assert_eq!(cursor.current(), "A.B");
            }
            assert_eq!(cursor.current(), "A");
        }
        assert_eq!(cursor.current(), "");
    }
}
