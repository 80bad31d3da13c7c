//! Declaration tables.
//!
//! Every table is journaled: a checkpoint is the journal length, and rolling
//! back replays the journal in reverse. Speculative passes and deferred
//! fixpoint attempts use this to discard provisional declarations.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use tern_ast::{BlockStmt, ClassDecl, EnumDecl, Expr, InterfaceDecl, Node, Param, Span, TypeAliasDecl, TypeParam};
use tern_types::{FunctionType, GenericOrigin, LiteralValue, Member, NamedType, Type, TypeBindings, TypeEnv};

use crate::capture::CaptureSet;
use crate::namespace::NamespaceInfo;
use crate::scope::VariableInfo;

// =============================================================================
// Journaled map
// =============================================================================

#[derive(Debug, Clone)]
pub struct JournaledMap<V> {
    map: FxHashMap<String, V>,
    log: Vec<(String, Option<V>)>,
}

impl<V> Default for JournaledMap<V> {
    fn default() -> Self {
        Self {
            map: FxHashMap::default(),
            log: Vec::new(),
        }
    }
}

impl<V: Clone> JournaledMap<V> {
    pub fn get(&self, key: &str) -> Option<&V> {
        self.map.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn insert(&mut self, key: String, value: V) {
        let old = self.map.insert(key.clone(), value);
        self.log.push((key, old));
    }

    /// Modifies an existing entry in place. Returns `false` when absent.
    pub fn update(&mut self, key: &str, f: impl FnOnce(&mut V)) -> bool {
        match self.map.get_mut(key) {
            Some(value) => {
                self.log.push((key.to_string(), Some(value.clone())));
                f(value);
                true
            }
            None => false,
        }
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.map.values()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn checkpoint(&self) -> usize {
        self.log.len()
    }

    pub fn rollback(&mut self, checkpoint: usize) {
        while self.log.len() > checkpoint {
            let Some((key, old)) = self.log.pop() else {
                break;
            };
            match old {
                Some(value) => {
                    self.map.insert(key, value);
                }
                None => {
                    self.map.remove(&key);
                }
            }
        }
    }
}

// =============================================================================
// Functions
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ParamInfo {
    pub name: String,
    pub ty: Type,
    pub optional: bool,
    pub variadic: bool,
    pub has_default: bool,
}

impl ParamInfo {
    /// Type as seen by callers: omissible parameters are optional.
    pub fn signature_type(&self) -> Type {
        if (self.optional || self.has_default) && !self.variadic {
            Type::optional(self.ty.clone())
        } else {
            self.ty.clone()
        }
    }
}

/// Resolved signature of one function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionPrototype {
    pub name: String,
    pub params: Vec<ParamInfo>,
    /// `None` until annotated or discovered.
    pub return_type: Option<Type>,
    pub discovered: bool,
    pub captures: CaptureSet,
    pub has_captures: bool,
    /// Locals were hoisted into the function by the generator rewrite.
    pub extra_local_fields: bool,
    pub resume_points: usize,
    /// Receiver class of methods and constructors.
    pub this_class: Option<Type>,
}

impl FunctionPrototype {
    pub fn function_type(&self) -> FunctionType {
        FunctionType {
            params: self.params.iter().map(ParamInfo::signature_type).collect(),
            result: Box::new(self.return_type.clone().unwrap_or(Type::Never)),
            variadic: self.params.last().is_some_and(|p| p.variadic),
        }
    }

    pub fn ty(&self) -> Type {
        Type::Function(self.function_type())
    }

    /// Aggregate type of the implicit capture parameter.
    pub fn capture_type(&self) -> Option<Type> {
        self.captures.aggregate_type()
    }

    pub fn min_arity(&self) -> usize {
        self.function_type().min_arity()
    }
}

/// Syntax of a function body, normalized across declarations, methods,
/// constructors and arrows.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSyntax {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Param>,
    pub return_type: Option<Node<tern_ast::Type>>,
    pub body: Option<Node<BlockStmt>>,
    pub is_generator: bool,
    /// `yield` statements turned into returns by the generator rewrite.
    pub resume_points: usize,
    pub extra_locals: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionKind {
    Free,
    Method { class: String, is_static: bool },
    Constructor { class: String },
    Closure,
}

impl FunctionKind {
    pub fn class(&self) -> Option<&str> {
        match self {
            FunctionKind::Method { class, .. } | FunctionKind::Constructor { class } => Some(class),
            _ => None,
        }
    }

    /// Whether the function has a `this` parameter.
    pub fn has_this(&self) -> bool {
        matches!(
            self,
            FunctionKind::Method { is_static: false, .. } | FunctionKind::Constructor { .. }
        )
    }
}

/// Everything needed to resolve a function body later.
#[derive(Debug, Clone)]
pub struct FunctionSource {
    pub syntax: Rc<FunctionSyntax>,
    pub namespace: String,
    pub bindings: Rc<TypeBindings>,
    pub kind: FunctionKind,
    /// Resolved with the lexical scopes of its declaration site visible.
    pub nested: bool,
}

#[derive(Debug, Clone)]
pub struct FunctionRecord {
    pub full_name: String,
    pub source: Rc<FunctionSource>,
    pub prototype: Option<FunctionPrototype>,
    pub committed: bool,
}

// =============================================================================
// Generic declarations
// =============================================================================

#[derive(Debug, Clone)]
pub struct GenericFunctionInfo {
    pub full_name: String,
    pub syntax: Rc<FunctionSyntax>,
    pub namespace: String,
    /// Declaring class and whether the method is static.
    pub owner_class: Option<(String, bool)>,
    /// Bindings in force at the declaration (a generic method of a
    /// specialized class sees the class's arguments).
    pub bindings: Rc<TypeBindings>,
}

impl GenericFunctionInfo {
    pub fn type_params(&self) -> &[TypeParam] {
        &self.syntax.type_params
    }
}

#[derive(Debug, Clone)]
pub struct GenericClassInfo {
    pub full_name: String,
    pub decl: Rc<ClassDecl>,
    pub namespace: String,
}

impl GenericClassInfo {
    pub fn type_params(&self) -> &[TypeParam] {
        self.decl.type_params.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct GenericInterfaceInfo {
    pub full_name: String,
    pub decl: Rc<InterfaceDecl>,
    pub namespace: String,
}

impl GenericInterfaceInfo {
    pub fn type_params(&self) -> &[TypeParam] {
        self.decl.type_params.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct GenericAliasInfo {
    pub full_name: String,
    pub decl: Rc<TypeAliasDecl>,
    pub namespace: String,
}

impl GenericAliasInfo {
    pub fn type_params(&self) -> &[TypeParam] {
        self.decl.type_params.as_deref().unwrap_or_default()
    }
}

// =============================================================================
// Classes, interfaces, enums, aliases
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclState {
    Hoisted,
    Processing,
    Resolved,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    pub ty: Type,
    pub is_static: bool,
    pub is_readonly: bool,
    pub init: Option<Node<Expr>>,
    /// Class that declares the field.
    pub owner: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    pub name: String,
    /// Implementing function; for generic methods, the generic declaration.
    pub function: String,
    pub ty: Option<Type>,
    pub is_static: bool,
    pub is_abstract: bool,
    pub generic: bool,
}

#[derive(Debug, Clone)]
pub struct ClassRecord {
    pub full_name: String,
    pub decl: Rc<ClassDecl>,
    pub namespace: String,
    pub bindings: Rc<TypeBindings>,
    pub origin: Option<GenericOrigin>,
    /// Declared inside a function body.
    pub local: bool,
    pub state: DeclState,
    pub committed: bool,
    pub base: Option<String>,
    pub interfaces: Vec<Type>,
    /// Inherited fields first.
    pub fields: Vec<FieldInfo>,
    /// Inherited methods first; overrides replace by name.
    pub methods: Vec<MethodInfo>,
    pub constructor: Option<String>,
    pub vtable: Vec<(String, String)>,
    /// Union of the captures of every member function.
    pub captures: CaptureSet,
}

impl ClassRecord {
    pub fn new(full_name: &str, decl: Rc<ClassDecl>, namespace: &str, bindings: Rc<TypeBindings>) -> Self {
        Self {
            full_name: full_name.to_string(),
            decl,
            namespace: namespace.to_string(),
            bindings,
            origin: None,
            local: false,
            state: DeclState::Hoisted,
            committed: false,
            base: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            constructor: None,
            vtable: Vec::new(),
            captures: CaptureSet::new(),
        }
    }

    pub fn ty(&self) -> Type {
        Type::Class(NamedType {
            name: self.full_name.clone(),
            origin: self.origin.clone(),
        })
    }

    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn span(&self) -> Span {
        self.decl.name.span
    }
}

#[derive(Debug, Clone)]
pub struct InterfaceRecord {
    pub full_name: String,
    pub decl: Rc<InterfaceDecl>,
    pub namespace: String,
    pub bindings: Rc<TypeBindings>,
    pub origin: Option<GenericOrigin>,
    pub state: DeclState,
    pub extends: Vec<Type>,
    /// Inherited members first; redeclarations replace by name.
    pub members: Vec<Member>,
}

impl InterfaceRecord {
    pub fn ty(&self) -> Type {
        Type::Interface(NamedType {
            name: self.full_name.clone(),
            origin: self.origin.clone(),
        })
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct EnumRecord {
    pub full_name: String,
    pub decl: Rc<EnumDecl>,
    pub namespace: String,
    pub members: Vec<(String, LiteralValue)>,
    pub resolved: bool,
}

impl EnumRecord {
    /// Union of the member literal types.
    pub fn ty(&self) -> Type {
        Type::union(self.members.iter().map(|(_, value)| Type::Literal(value.clone())))
    }

    pub fn member(&self, name: &str) -> Option<&LiteralValue> {
        self.members.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

#[derive(Debug, Clone)]
pub struct AliasRecord {
    pub full_name: String,
    pub decl: Rc<TypeAliasDecl>,
    pub namespace: String,
    pub ty: Option<Type>,
    pub resolving: bool,
}

// =============================================================================
// Tables
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TablesCheckpoint([usize; 11]);

#[derive(Debug, Clone)]
pub struct DeclTables {
    pub namespaces: JournaledMap<NamespaceInfo>,
    pub functions: JournaledMap<FunctionRecord>,
    pub generic_functions: JournaledMap<GenericFunctionInfo>,
    pub classes: JournaledMap<ClassRecord>,
    pub generic_classes: JournaledMap<GenericClassInfo>,
    pub interfaces: JournaledMap<InterfaceRecord>,
    pub generic_interfaces: JournaledMap<GenericInterfaceInfo>,
    pub enums: JournaledMap<EnumRecord>,
    pub aliases: JournaledMap<AliasRecord>,
    pub generic_aliases: JournaledMap<GenericAliasInfo>,
    pub globals: JournaledMap<VariableInfo>,
}

impl Default for DeclTables {
    fn default() -> Self {
        Self::new()
    }
}

impl DeclTables {
    pub fn new() -> Self {
        let mut namespaces = JournaledMap::default();
        namespaces.insert(String::new(), NamespaceInfo::root());
        Self {
            namespaces,
            functions: JournaledMap::default(),
            generic_functions: JournaledMap::default(),
            classes: JournaledMap::default(),
            generic_classes: JournaledMap::default(),
            interfaces: JournaledMap::default(),
            generic_interfaces: JournaledMap::default(),
            enums: JournaledMap::default(),
            aliases: JournaledMap::default(),
            generic_aliases: JournaledMap::default(),
            globals: JournaledMap::default(),
        }
    }

    pub fn checkpoint(&self) -> TablesCheckpoint {
        TablesCheckpoint([
            self.namespaces.checkpoint(),
            self.functions.checkpoint(),
            self.generic_functions.checkpoint(),
            self.classes.checkpoint(),
            self.generic_classes.checkpoint(),
            self.interfaces.checkpoint(),
            self.generic_interfaces.checkpoint(),
            self.enums.checkpoint(),
            self.aliases.checkpoint(),
            self.generic_aliases.checkpoint(),
            self.globals.checkpoint(),
        ])
    }

    pub fn rollback(&mut self, checkpoint: TablesCheckpoint) {
        let [ns, f, gf, c, gc, i, gi, e, a, ga, g] = checkpoint.0;
        self.namespaces.rollback(ns);
        self.functions.rollback(f);
        self.generic_functions.rollback(gf);
        self.classes.rollback(c);
        self.generic_classes.rollback(gc);
        self.interfaces.rollback(i);
        self.generic_interfaces.rollback(gi);
        self.enums.rollback(e);
        self.aliases.rollback(a);
        self.generic_aliases.rollback(ga);
        self.globals.rollback(g);
    }
}

impl TypeEnv for DeclTables {
    fn supertypes(&self, ty: &Type) -> Vec<Type> {
        match ty {
            Type::Class(named) => match self.classes.get(&named.name) {
                Some(record) => {
                    let mut out: Vec<Type> = record
                        .base
                        .as_ref()
                        .and_then(|base| self.classes.get(base))
                        .map(ClassRecord::ty)
                        .into_iter()
                        .collect();
                    out.extend(record.interfaces.iter().cloned());
                    out
                }
                None => Vec::new(),
            },
            Type::Interface(named) => self
                .interfaces
                .get(&named.name)
                .map(|record| record.extends.clone())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    fn members(&self, ty: &Type) -> Option<Vec<Member>> {
        match ty {
            Type::Class(named) => {
                let record = self.classes.get(&named.name)?;
                if record.state == DeclState::Hoisted {
                    return None;
                }
                let fields = record.fields.iter().filter(|f| !f.is_static).map(|f| Member {
                    name: f.name.clone(),
                    ty: f.ty.clone(),
                    optional: false,
                });
                let methods = record
                    .methods
                    .iter()
                    .filter(|m| !m.is_static)
                    .filter_map(|m| {
                        m.ty.clone().map(|ty| Member {
                            name: m.name.clone(),
                            ty,
                            optional: false,
                        })
                    });
                Some(fields.chain(methods).collect())
            }
            Type::Interface(named) => {
                let record = self.interfaces.get(&named.name)?;
                (record.state != DeclState::Hoisted).then(|| record.members.clone())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_ast::build::node;
    use tern_ast::Ident;

    #[test]
    fn test_journal_rollback_restores_updates_and_inserts() {
        let mut map: JournaledMap<u32> = JournaledMap::default();
        map.insert("a".into(), 1);
        let cp = map.checkpoint();
        map.update("a", |v| *v = 2);
        map.insert("b".into(), 3);
        assert_eq!(map.get("a"), Some(&2));
        map.rollback(cp);
        assert_eq!(map.get("a"), Some(&1));
        assert!(!map.contains("b"));
    }

    #[test]
    fn test_tables_rollback_is_per_table() {
        let mut tables = DeclTables::new();
        let cp = tables.checkpoint();
        tables
            .globals
            .insert("x".into(), VariableInfo::global("x", "x", Type::number()));
        tables.rollback(cp);
        assert!(tables.globals.is_empty());
        assert!(tables.namespaces.contains(""));
    }

    #[test]
    fn test_prototype_signature_marks_omissible_params() {
        let proto = FunctionPrototype {
            name: "f".into(),
            params: vec![
                ParamInfo {
                    name: "a".into(),
                    ty: Type::number(),
                    optional: false,
                    variadic: false,
                    has_default: false,
                },
                ParamInfo {
                    name: "b".into(),
                    ty: Type::string(),
                    optional: false,
                    variadic: false,
                    has_default: true,
                },
            ],
            return_type: Some(Type::void()),
            discovered: false,
            captures: CaptureSet::new(),
            has_captures: false,
            extra_local_fields: false,
            resume_points: 0,
            this_class: None,
        };
        assert_eq!(proto.min_arity(), 1);
        assert_eq!(
            proto.ty(),
            Type::function(vec![Type::number(), Type::optional(Type::string())], Type::void())
        );
    }

    #[test]
    fn test_class_members_via_type_env() {
        let decl = Rc::new(ClassDecl {
            name: node(Ident::new("Point")),
            type_params: None,
            extends: None,
            implements: vec![],
            members: vec![],
            is_abstract: false,
            is_declare: false,
        });
        let mut record = ClassRecord::new("Point", decl, "", Rc::new(TypeBindings::new()));
        record.state = DeclState::Resolved;
        record.fields.push(FieldInfo {
            name: "x".into(),
            ty: Type::number(),
            is_static: false,
            is_readonly: false,
            init: None,
            owner: "Point".into(),
        });
        let mut tables = DeclTables::new();
        tables.classes.insert("Point".into(), record);
        let members = tables.members(&Type::class("Point")).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name, "x");
    }
}
