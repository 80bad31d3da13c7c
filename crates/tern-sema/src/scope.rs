//! Lexical scopes

use rustc_hash::FxHashMap;
use tern_ir::ValueId;
use tern_types::Type;

/// Where a variable's storage lives.
#[derive(Debug, Clone, PartialEq)]
pub enum VarSlot {
    /// `Variable` slot in the owning function
    Local(ValueId),
    /// Module or namespace global, by full name
    Global(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableInfo {
    pub name: String,
    pub ty: Type,
    pub slot: VarSlot,
    /// Function whose frame declares the variable; `None` for globals.
    pub owner_function: Option<String>,
    pub is_const: bool,
    /// Rewrite temporaries are never captured.
    pub no_capture: bool,
}

impl VariableInfo {
    pub fn local(name: impl Into<String>, ty: Type, slot: ValueId, owner: &str) -> Self {
        let name = name.into();
        Self {
            no_capture: is_rewrite_temp(&name),
            name,
            ty,
            slot: VarSlot::Local(slot),
            owner_function: Some(owner.to_string()),
            is_const: false,
        }
    }

    pub fn global(name: impl Into<String>, full_name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            slot: VarSlot::Global(full_name.into()),
            owner_function: None,
            is_const: false,
            no_capture: false,
        }
    }

    pub fn constant(mut self, is_const: bool) -> Self {
        self.is_const = is_const;
        self
    }

    pub fn is_global(&self) -> bool {
        matches!(self.slot, VarSlot::Global(_))
    }

    /// Whether reading this variable from `function` crosses a closure
    /// boundary.
    pub fn captured_from(&self, function: Option<&str>) -> bool {
        if self.no_capture || self.is_global() {
            return false;
        }
        match (&self.owner_function, function) {
            (Some(owner), Some(current)) => owner != current,
            _ => false,
        }
    }
}

/// Names introduced by resolver rewrites start with `%`, which no source
/// identifier can.
pub fn is_rewrite_temp(name: &str) -> bool {
    name.starts_with('%')
}

/// A declaration visible by name, carrying its full name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclRef {
    Class(String),
    GenericClass(String),
    Interface(String),
    GenericInterface(String),
    Enum(String),
    Alias(String),
    GenericAlias(String),
    Function(String),
    GenericFunction(String),
    Namespace(String),
}

impl DeclRef {
    pub fn full_name(&self) -> &str {
        match self {
            DeclRef::Class(n)
            | DeclRef::GenericClass(n)
            | DeclRef::Interface(n)
            | DeclRef::GenericInterface(n)
            | DeclRef::Enum(n)
            | DeclRef::Alias(n)
            | DeclRef::GenericAlias(n)
            | DeclRef::Function(n)
            | DeclRef::GenericFunction(n)
            | DeclRef::Namespace(n) => n,
        }
    }

    /// Whether the name denotes a type.
    pub fn is_type(&self) -> bool {
        !matches!(
            self,
            DeclRef::Function(_) | DeclRef::GenericFunction(_) | DeclRef::Namespace(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScopeEntry {
    Variable(VariableInfo),
    Declaration(DeclRef),
}

/// Stack of lexical blocks. Empty at module level: anything declared there
/// goes to the namespace tables instead.
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<FxHashMap<String, ScopeEntry>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Drops blocks above `depth`, after an aborted resolution.
    pub fn truncate(&mut self, depth: usize) {
        self.scopes.truncate(depth);
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Declares in the innermost block. Returns `true` when the name was
    /// already declared in that same block.
    pub fn declare(&mut self, name: impl Into<String>, entry: ScopeEntry) -> bool {
        match self.scopes.last_mut() {
            Some(scope) => scope.insert(name.into(), entry).is_some(),
            None => false,
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&ScopeEntry> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Innermost declaration of a type named `name`; variables of the same
    /// name do not shadow types.
    pub fn lookup_type(&self, name: &str) -> Option<&DeclRef> {
        self.scopes.iter().rev().find_map(|scope| match scope.get(name) {
            Some(ScopeEntry::Declaration(decl)) if decl.is_type() => Some(decl),
            _ => None,
        })
    }

    pub fn lookup_variable(&self, name: &str) -> Option<&VariableInfo> {
        match self.lookup(name) {
            Some(ScopeEntry::Variable(info)) => Some(info),
            _ => None,
        }
    }

    /// Updates the type of the innermost visible variable `name`.
    pub fn set_variable_type(&mut self, name: &str, ty: Type) {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(ScopeEntry::Variable(info)) = scope.get_mut(name) {
                info.ty = ty;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_innermost_first() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        scopes.declare("x", ScopeEntry::Variable(VariableInfo::local("x", Type::number(), ValueId(0), "f")));
        scopes.push();
        scopes.declare("x", ScopeEntry::Variable(VariableInfo::local("x", Type::string(), ValueId(1), "f")));
        assert_eq!(scopes.lookup_variable("x").map(|v| v.ty.clone()), Some(Type::string()));
        scopes.pop();
        assert_eq!(scopes.lookup_variable("x").map(|v| v.ty.clone()), Some(Type::number()));
    }

    #[test]
    fn test_same_block_redeclare_detected() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        let info = VariableInfo::local("a", Type::number(), ValueId(0), "f");
        assert!(!scopes.declare("a", ScopeEntry::Variable(info.clone())));
        assert!(scopes.declare("a", ScopeEntry::Variable(info)));
    }

    #[test]
    fn test_capture_rules() {
        let outer = VariableInfo::local("v", Type::number(), ValueId(0), "outer");
        assert!(outer.captured_from(Some("outer.lambda0")));
        assert!(!outer.captured_from(Some("outer")));

        let temp = VariableInfo::local("%d0", Type::number(), ValueId(0), "outer");
        assert!(temp.no_capture);
        assert!(!temp.captured_from(Some("outer.lambda0")));

        let global = VariableInfo::global("g", "g", Type::number());
        assert!(!global.captured_from(Some("f")));
    }
}
