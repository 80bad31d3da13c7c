//! Declarations: hoisting, class layout and commit, interfaces, enums and
//! aliases, and declarations local to function bodies.

use std::rc::Rc;

use tern_ast as ast;
use tern_ast::build::{assign, call, expr_stmt, ident, member, node, this};
use tern_ast::{
    BlockStmt, ClassDecl, ClassMember, Decl, EnumDecl, Expr, InterfaceDecl, Literal, ModuleItem, Node,
    ObjectTypeMember, Span, Stmt, TypeAliasDecl, UnaryOp,
};
use tern_ir::{IrGlobal, IrStruct, Op};
use tern_types::{widen, LiteralValue, Member, Type, TypeBindings};

use crate::capture::CaptureSet;
use crate::context::GenContext;
use crate::error::{DeferReason, Failure, SemaError, SemaResult};
use crate::namespace::{qualify, SymbolKind};
use crate::resolver::Resolver;
use crate::scope::{DeclRef, ScopeEntry, VariableInfo};
use crate::symbols::{
    AliasRecord, ClassRecord, DeclState, EnumRecord, FieldInfo, FunctionKind, FunctionSource, FunctionSyntax,
    GenericAliasInfo, GenericClassInfo, GenericFunctionInfo, GenericInterfaceInfo, InterfaceRecord, MethodInfo,
};

impl Resolver {
    // =========================================================================
    // Hoisting
    // =========================================================================

    /// Registers every name declared by `items` in namespace `ns`,
    /// namespace bodies included. Nothing is resolved yet.
    pub(crate) fn hoist_items(&mut self, items: &[Node<ModuleItem>], ns: &str) {
        for item in items {
            match &item.value {
                ModuleItem::Decl(decl) | ModuleItem::Export(decl) => self.hoist_decl(&decl.value, decl.span, ns),
                ModuleItem::Stmt(stmt) => {
                    if let Stmt::Decl(decl) = &stmt.value {
                        self.hoist_decl(decl, stmt.span, ns);
                    }
                }
            }
        }
    }

    fn hoist_decl(&mut self, decl: &Decl, span: Span, ns: &str) {
        let Some(name) = decl.name() else {
            return;
        };
        let full = qualify(ns, name);
        match decl {
            Decl::Function(func) if func.is_generic() => {
                if !self.tables.generic_functions.contains(&full) {
                    self.tables.generic_functions.insert(
                        full.clone(),
                        GenericFunctionInfo {
                            full_name: full.clone(),
                            syntax: Rc::new(FunctionSyntax::from_decl(func, span)),
                            namespace: ns.to_string(),
                            owner_class: None,
                            bindings: Rc::default(),
                        },
                    );
                }
                self.tables.register_name(ns, SymbolKind::GenericFunction, name, &full);
            }
            Decl::Function(func) => {
                self.register_function(
                    &full,
                    FunctionSource {
                        syntax: Rc::new(FunctionSyntax::from_decl(func, span)),
                        namespace: ns.to_string(),
                        bindings: Rc::default(),
                        kind: FunctionKind::Free,
                        nested: false,
                    },
                );
                self.tables.register_name(ns, SymbolKind::Function, name, &full);
            }
            Decl::Class(class) if class.is_generic() => {
                if !self.tables.generic_classes.contains(&full) {
                    self.tables
                        .generic_classes
                        .insert(full.clone(), generic_class_info(&full, class, ns));
                }
                self.tables.register_name(ns, SymbolKind::GenericClass, name, &full);
            }
            Decl::Class(class) => {
                if !self.tables.classes.contains(&full) {
                    let record = ClassRecord::new(&full, Rc::new(class.clone()), ns, Rc::default());
                    self.tables.classes.insert(full.clone(), record);
                }
                self.tables.register_name(ns, SymbolKind::Class, name, &full);
            }
            Decl::Interface(iface) if iface.is_generic() => {
                if !self.tables.generic_interfaces.contains(&full) {
                    self.tables.generic_interfaces.insert(
                        full.clone(),
                        GenericInterfaceInfo {
                            full_name: full.clone(),
                            decl: Rc::new(iface.clone()),
                            namespace: ns.to_string(),
                        },
                    );
                }
                self.tables.register_name(ns, SymbolKind::GenericInterface, name, &full);
            }
            Decl::Interface(iface) => {
                if !self.tables.interfaces.contains(&full) {
                    self.tables
                        .interfaces
                        .insert(full.clone(), interface_record(&full, iface, ns, Rc::default()));
                }
                self.tables.register_name(ns, SymbolKind::Interface, name, &full);
            }
            Decl::TypeAlias(alias) if alias.type_params.as_ref().is_some_and(|p| !p.is_empty()) => {
                if !self.tables.generic_aliases.contains(&full) {
                    self.tables.generic_aliases.insert(
                        full.clone(),
                        GenericAliasInfo {
                            full_name: full.clone(),
                            decl: Rc::new(alias.clone()),
                            namespace: ns.to_string(),
                        },
                    );
                }
                self.tables.register_name(ns, SymbolKind::GenericAlias, name, &full);
            }
            Decl::TypeAlias(alias) => {
                if !self.tables.aliases.contains(&full) {
                    self.tables.aliases.insert(full.clone(), alias_record(&full, alias, ns));
                }
                self.tables.register_name(ns, SymbolKind::Alias, name, &full);
            }
            Decl::Enum(decl) => {
                if !self.tables.enums.contains(&full) {
                    self.tables.enums.insert(full.clone(), enum_record(&full, decl, ns));
                }
                self.tables.register_name(ns, SymbolKind::Enum, name, &full);
            }
            Decl::Module(module) => {
                let full = self.tables.ensure_namespace(ns, &module.name.value.name);
                self.hoist_items(&module.body, &full);
            }
            Decl::Var(_) => {}
        }
    }

    // =========================================================================
    // Declaration items
    // =========================================================================

    /// Resolves a declaration at namespace level. Hoisting already
    /// registered its name.
    pub(crate) fn resolve_decl_item(&mut self, decl: &Decl, span: Span, ctx: &GenContext) -> SemaResult<()> {
        let ns = self.namespace.current();
        let full = decl.name().map(|name| qualify(&ns, name));
        match (decl, full) {
            (Decl::Var(var), _) => self.resolve_var_decl(var, span, ctx),
            (Decl::Module(module), Some(full)) => {
                let _ns = self.namespace.enter(&full);
                tracing::debug!(namespace = %full, "resolving namespace");
                let region = self.resolve_group(&module.body, ctx)?;
                self.builder.splice(region)?;
                Ok(())
            }
            (Decl::Function(func), Some(full)) if !func.is_generic() => {
                self.ensure_function(&full, span, ctx)?;
                Ok(())
            }
            (Decl::Class(class), Some(full)) if !class.is_generic() => {
                self.ensure_class(&full, ctx)?;
                self.emit_static_initializers(&full, span, ctx)
            }
            (Decl::Interface(iface), Some(full)) if !iface.is_generic() => self.ensure_interface(&full, ctx),
            (Decl::TypeAlias(alias), Some(full)) if alias.type_params.as_ref().is_none_or(|p| p.is_empty()) => {
                self.ensure_alias(&full, ctx).map(|_| ())
            }
            (Decl::Enum(_), Some(full)) => self.ensure_enum(&full, ctx).map(|_| ()),
            // Generic declarations resolve per specialization.
            _ => Ok(()),
        }
    }

    /// Resolves a declaration inside a function body. Local types are
    /// named after the enclosing function and visible lexically.
    pub(crate) fn resolve_local_decl(&mut self, decl: &Decl, span: Span, ctx: &GenContext) -> SemaResult<()> {
        let ns = self.namespace.current();
        let owner = self.frame()?.name.clone();
        if let Decl::Var(var) = decl {
            return self.resolve_var_decl(var, span, ctx);
        }
        let Some(name) = decl.name().map(str::to_string) else {
            return Ok(());
        };
        let full = format!("{}.{}", owner, name);
        let entry = match decl {
            Decl::Function(func) => return self.declare_nested_function(func, span, ctx),
            Decl::Class(class) if class.is_generic() => {
                self.tables
                    .generic_classes
                    .insert(full.clone(), generic_class_info(&full, class, &ns));
                DeclRef::GenericClass(full.clone())
            }
            Decl::Class(class) => {
                let mut record = ClassRecord::new(&full, Rc::new(class.clone()), &ns, ctx.bindings.clone());
                record.local = true;
                self.tables.classes.insert(full.clone(), record);
                DeclRef::Class(full.clone())
            }
            Decl::Interface(iface) => {
                self.tables
                    .interfaces
                    .insert(full.clone(), interface_record(&full, iface, &ns, ctx.bindings.clone()));
                DeclRef::Interface(full.clone())
            }
            Decl::TypeAlias(alias) => {
                self.tables.aliases.insert(full.clone(), alias_record(&full, alias, &ns));
                DeclRef::Alias(full.clone())
            }
            Decl::Enum(decl) => {
                self.tables.enums.insert(full.clone(), enum_record(&full, decl, &ns));
                DeclRef::Enum(full.clone())
            }
            Decl::Module(_) => {
                return Err(self.report(
                    span,
                    SemaError::Internal(format!("namespace `{}` must be declared at module level", name)),
                ));
            }
            Decl::Var(_) => return Ok(()),
        };
        if self.scopes.declare(&name, ScopeEntry::Declaration(entry.clone())) {
            self.warn(span, SemaError::DuplicateDeclaration(name));
        }
        match entry {
            DeclRef::Class(full) => {
                self.ensure_class(&full, ctx)?;
                self.emit_static_initializers(&full, span, ctx)
            }
            DeclRef::Interface(full) => self.ensure_interface(&full, ctx),
            DeclRef::Alias(full) => self.ensure_alias(&full, ctx).map(|_| ()),
            DeclRef::Enum(full) => self.ensure_enum(&full, ctx).map(|_| ()),
            _ => Ok(()),
        }
    }

    // =========================================================================
    // Classes
    // =========================================================================

    pub(crate) fn class_record(&self, full: &str) -> SemaResult<ClassRecord> {
        self.tables
            .classes
            .get(full)
            .cloned()
            .ok_or_else(|| Failure::Internal(format!("unknown class `{}`", full)))
    }

    /// Lays the class out if needed, and commits it outside speculative
    /// contexts. A class whose layout is in progress is returned as is.
    pub(crate) fn ensure_class(&mut self, full: &str, ctx: &GenContext) -> SemaResult<ClassRecord> {
        let record = self.class_record(full)?;
        match record.state {
            DeclState::Processing => return Ok(record),
            DeclState::Resolved if record.committed || ctx.speculative => return Ok(record),
            DeclState::Resolved => {}
            DeclState::Hoisted => self.in_class_scope(&record, |this| this.layout_class(full, ctx))?,
        }
        if !ctx.speculative {
            self.in_class_scope(&record, |this| this.commit_class(full, ctx))?;
        }
        self.class_record(full)
    }

    /// Runs `f` in the class's namespace. Only local classes see the
    /// lexical scopes around them.
    fn in_class_scope<T>(&mut self, record: &ClassRecord, f: impl FnOnce(&mut Self) -> SemaResult<T>) -> SemaResult<T> {
        let _ns = self.namespace.enter(&record.namespace);
        if record.local {
            f(self)
        } else {
            self.with_isolated_scopes(f)
        }
    }

    fn class_context(record: &ClassRecord, ctx: &GenContext) -> GenContext {
        GenContext {
            allow_partial_resolve: ctx.allow_partial_resolve,
            speculative: ctx.speculative,
            ..GenContext::new().with_bindings(record.bindings.clone())
        }
    }

    /// Computes base, fields, methods, constructor, vtable and captures.
    fn layout_class(&mut self, full: &str, ctx: &GenContext) -> SemaResult<()> {
        self.tables.classes.update(full, |r| r.state = DeclState::Processing);
        let record = self.class_record(full)?;
        let decl = record.decl.clone();
        let cctx = Self::class_context(&record, ctx);
        let span = record.span();
        let ctor_full = format!("{}.constructor", full);
        tracing::debug!(class = full, "laying out class");

        let mut fields: Vec<FieldInfo> = Vec::new();
        let mut methods: Vec<MethodInfo> = Vec::new();
        let mut vtable: Vec<(String, String)> = Vec::new();
        let mut base = None;
        let mut base_ctor: Option<(String, String, Rc<TypeBindings>)> = None;

        if let Some(ext) = &decl.extends {
            let base_ref = Node::new(
                ast::Type::TypeRef {
                    name: ext.base.clone(),
                    type_args: ext.type_args.clone(),
                },
                ext.base.span,
            );
            let base_ty = self.resolve_type(&base_ref, &cctx)?;
            let Type::Class(named) = &base_ty else {
                return Err(self.report(ext.base.span, SemaError::NotConstructible(ext.base.value.name.clone())));
            };
            let base_record = self.ensure_class(&named.name, &cctx)?;
            if base_record.state != DeclState::Resolved {
                return Err(self.defer_or_report(
                    ctx,
                    ext.base.span,
                    DeferReason::UnresolvedName(named.name.clone()),
                    SemaError::UnresolvedDependencies(full.to_string()),
                ));
            }
            fields = base_record.fields.clone();
            methods = base_record.methods.clone();
            vtable = base_record.vtable.clone();
            base = Some(named.name.clone());
            base_ctor = base_record
                .constructor
                .clone()
                .map(|ctor| (ctor, base_record.namespace.clone(), base_record.bindings.clone()));
        }

        let mut interfaces = Vec::with_capacity(decl.implements.len());
        for implemented in &decl.implements {
            let ty = self.resolve_type(implemented, &cctx)?;
            if ty.named().is_none() {
                return Err(self.report(implemented.span, SemaError::UndefinedType(ty.to_string())));
            }
            interfaces.push(ty);
        }

        for class_member in &decl.members {
            let ClassMember::Property {
                name,
                type_annotation,
                init,
                is_static,
                is_readonly,
                is_optional,
            } = class_member
            else {
                continue;
            };
            let field_name = name.as_string();
            let ty = match (type_annotation, init) {
                (Some(ann), _) => self.resolve_type(ann, &cctx)?,
                (None, Some(init)) => widen(&self.probe_type(init, &cctx.in_function(&ctor_full))?),
                (None, None) => Type::Any,
            };
            let ty = if *is_optional { Type::optional(ty) } else { ty };
            if *is_static {
                let global = format!("{}.{}", full, field_name);
                self.tables.globals.insert(
                    global.clone(),
                    VariableInfo::global(&field_name, &global, ty.clone()).constant(*is_readonly),
                );
                self.builder.add_global(IrGlobal {
                    name: global,
                    ty: ty.clone(),
                    is_const: *is_readonly,
                });
            }
            let info = FieldInfo {
                name: field_name,
                ty,
                is_static: *is_static,
                is_readonly: *is_readonly,
                init: init.clone(),
                owner: full.to_string(),
            };
            match fields.iter_mut().find(|f| f.name == info.name) {
                Some(existing) => *existing = info,
                None => fields.push(info),
            }
        }

        let mut own = Vec::new();
        for class_member in &decl.members {
            let ClassMember::Method {
                name,
                type_params,
                params,
                return_type,
                body,
                is_static,
                is_abstract,
            } = class_member
            else {
                continue;
            };
            let method_name = name.as_string();
            let function = format!("{}.{}", full, method_name);
            let method_span = body.as_ref().map_or(span, |b| b.span);
            let syntax = FunctionSyntax::method(&method_name, type_params, params, return_type, body, method_span);
            let generic = !syntax.type_params.is_empty();
            if generic {
                self.tables.generic_functions.insert(
                    function.clone(),
                    GenericFunctionInfo {
                        full_name: function.clone(),
                        syntax: Rc::new(syntax),
                        namespace: record.namespace.clone(),
                        owner_class: Some((full.to_string(), *is_static)),
                        bindings: record.bindings.clone(),
                    },
                );
            } else {
                self.register_function(
                    &function,
                    FunctionSource {
                        syntax: Rc::new(syntax),
                        namespace: record.namespace.clone(),
                        bindings: record.bindings.clone(),
                        kind: FunctionKind::Method {
                            class: full.to_string(),
                            is_static: *is_static,
                        },
                        nested: record.local,
                    },
                );
                own.push(function.clone());
            }
            let info = MethodInfo {
                name: method_name,
                function,
                ty: None,
                is_static: *is_static,
                is_abstract: *is_abstract,
                generic,
            };
            match methods.iter_mut().find(|m| m.name == info.name) {
                Some(existing) => *existing = info,
                None => methods.push(info),
            }
        }

        let explicit_ctor = decl.members.iter().find_map(|m| match m {
            ClassMember::Constructor { params, body } => Some((params.clone(), body.clone())),
            _ => None,
        });
        let ctor_source = match explicit_ctor {
            Some((params, body)) => {
                let body = body.unwrap_or_else(|| Node::new(BlockStmt { stmts: Vec::new() }, span));
                FunctionSource {
                    syntax: Rc::new(FunctionSyntax::constructor(params, body, span)),
                    namespace: record.namespace.clone(),
                    bindings: record.bindings.clone(),
                    kind: FunctionKind::Constructor { class: full.to_string() },
                    nested: record.local,
                }
            }
            None => self.forwarding_constructor(full, &record, base_ctor, span),
        };
        self.register_function(&ctor_full, ctor_source);

        for method in methods.iter().filter(|m| !m.is_static && !m.generic) {
            match vtable.iter_mut().find(|(name, _)| *name == method.name) {
                Some(slot) => slot.1 = method.function.clone(),
                None => vtable.push((method.name.clone(), method.function.clone())),
            }
        }

        self.tables.classes.update(full, |r| {
            r.base = base;
            r.interfaces = interfaces;
            r.fields = fields;
            r.methods = methods;
            r.constructor = Some(ctor_full.clone());
            r.vtable = vtable;
        });

        // Prototypes only; bodies are committed once the layout is final.
        let pctx = GenContext {
            speculative: true,
            ..cctx
        };
        let mut captures = CaptureSet::new();
        for function in &own {
            let proto = self.ensure_function(function, span, &pctx)?;
            captures.union_with(&proto.captures);
            let ty = proto.ty();
            self.tables.classes.update(full, |r| {
                if let Some(method) = r.methods.iter_mut().find(|m| &m.function == function) {
                    method.ty = Some(ty);
                }
            });
        }
        let ctor = self.ensure_function(&ctor_full, span, &pctx)?;
        captures.union_with(&ctor.captures);

        tracing::debug!(class = full, captures = captures.len(), "class laid out");
        self.tables.classes.update(full, |r| {
            r.captures = captures;
            r.state = DeclState::Resolved;
        });
        Ok(())
    }

    /// Constructor of a class that declares none: takes the base
    /// constructor's parameters and passes them on.
    fn forwarding_constructor(
        &self,
        full: &str,
        record: &ClassRecord,
        base_ctor: Option<(String, String, Rc<TypeBindings>)>,
        span: Span,
    ) -> FunctionSource {
        let kind = FunctionKind::Constructor { class: full.to_string() };
        let Some((base_ctor, base_ns, base_bindings)) = base_ctor else {
            return FunctionSource {
                syntax: Rc::new(FunctionSyntax::constructor(
                    Vec::new(),
                    Node::new(BlockStmt { stmts: Vec::new() }, span),
                    span,
                )),
                namespace: record.namespace.clone(),
                bindings: record.bindings.clone(),
                kind,
                nested: record.local,
            };
        };
        let params = self
            .tables
            .functions
            .get(&base_ctor)
            .map(|r| r.source.syntax.params.clone())
            .unwrap_or_default();
        let forwarded = params
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let arg = ident(p.pattern.value.ident_name().unwrap_or(&format!("%p{}", i)));
                if p.is_rest {
                    node(Expr::Spread(Box::new(arg)))
                } else {
                    arg
                }
            })
            .collect();
        let body = Node::new(
            BlockStmt {
                stmts: vec![expr_stmt(call(node(Expr::Super), forwarded))],
            },
            span,
        );
        // Parameter annotations are written against the base class.
        FunctionSource {
            syntax: Rc::new(FunctionSyntax::constructor(params, body, span)),
            namespace: base_ns,
            bindings: base_bindings,
            kind,
            nested: record.local,
        }
    }

    /// Emits the struct and commits the constructor and own methods.
    fn commit_class(&mut self, full: &str, ctx: &GenContext) -> SemaResult<()> {
        let record = self.class_record(full)?;
        let mut fields: Vec<(String, Type)> = record
            .fields
            .iter()
            .filter(|f| !f.is_static)
            .map(|f| (f.name.clone(), f.ty.clone()))
            .collect();
        if let Some(captures) = record.captures.aggregate_type() {
            fields.push(("captures".to_string(), captures));
        }
        let mut def = IrStruct::new(full, fields);
        def.base = record.base.clone();
        def.interfaces = record
            .interfaces
            .iter()
            .filter_map(|t| t.named().map(|n| n.name.clone()))
            .collect();
        def.vtable = record.vtable.clone();
        self.builder.add_struct(def)?;
        self.tables.classes.update(full, |r| r.committed = true);
        tracing::debug!(class = full, "committing class");

        let cctx = Self::class_context(&record, ctx).committing();
        let span = record.span();
        let prefix = format!("{}.", full);
        let mut functions: Vec<String> = record.constructor.iter().cloned().collect();
        functions.extend(
            record
                .methods
                .iter()
                .filter(|m| !m.generic && m.function.starts_with(&prefix))
                .map(|m| m.function.clone()),
        );
        for function in functions {
            self.ensure_function(&function, span, &cctx)?;
        }
        Ok(())
    }

    /// `this.field = init` for each instance field the class declares with
    /// an initializer. Runs at the top of the constructor body.
    pub(crate) fn emit_field_initializers(&mut self, class: &str, span: Span, ctx: &GenContext) -> SemaResult<()> {
        let record = self.class_record(class)?;
        for field in record.fields.iter().filter(|f| f.owner == class && !f.is_static) {
            if let Some(init) = &field.init {
                let store = assign(member(this(), &field.name), init.clone());
                self.resolve_expr(&Node::new(store.value, span), ctx)?;
            }
        }
        Ok(())
    }

    /// Static field initializers run where the class is declared.
    fn emit_static_initializers(&mut self, full: &str, span: Span, ctx: &GenContext) -> SemaResult<()> {
        let record = self.class_record(full)?;
        for field in record.fields.iter().filter(|f| f.is_static && f.owner == full) {
            let Some(init) = &field.init else {
                continue;
            };
            let value = self.resolve_expr(init, &ctx.plain().with_receiver(Some(field.ty.clone())))?;
            self.check_assignable(&value.ty, &field.ty, init.span)?;
            let slot = self.value(
                field.ty.clone(),
                Op::GlobalRef {
                    name: format!("{}.{}", full, field.name),
                },
                Vec::new(),
                span,
            )?;
            self.emit(Op::Store, vec![slot.value, value.value], span)?;
        }
        Ok(())
    }

    // =========================================================================
    // Interfaces, enums, aliases
    // =========================================================================

    /// Resolves an interface's members, inherited ones first.
    pub(crate) fn ensure_interface(&mut self, full: &str, ctx: &GenContext) -> SemaResult<()> {
        let record = self
            .tables
            .interfaces
            .get(full)
            .cloned()
            .ok_or_else(|| Failure::Internal(format!("unknown interface `{}`", full)))?;
        if record.state != DeclState::Hoisted {
            return Ok(());
        }
        self.tables.interfaces.update(full, |r| r.state = DeclState::Processing);
        let ictx = GenContext {
            allow_partial_resolve: ctx.allow_partial_resolve,
            speculative: ctx.speculative,
            ..GenContext::new().with_bindings(record.bindings.clone())
        };
        let _ns = self.namespace.enter(&record.namespace);
        let (extends, members) = self.with_isolated_scopes(|this| -> SemaResult<(Vec<Type>, Vec<Member>)> {
            let mut extends = Vec::new();
            let mut members: Vec<Member> = Vec::new();
            for parent in &record.decl.extends {
                let ty = this.resolve_type(parent, &ictx)?;
                if let Some(named) = ty.named() {
                    if let Some(parent) = this.tables.interfaces.get(&named.name) {
                        for inherited in &parent.members {
                            upsert_member(&mut members, inherited.clone());
                        }
                    }
                }
                extends.push(ty);
            }
            for decl_member in &record.decl.members {
                let (name, ty) = this.resolve_type_member(decl_member, &ictx)?;
                let optional = matches!(
                    decl_member,
                    ObjectTypeMember::Property { optional: true, .. } | ObjectTypeMember::Method { optional: true, .. }
                );
                upsert_member(&mut members, Member { name, ty, optional });
            }
            Ok((extends, members))
        })?;
        tracing::debug!(interface = full, members = members.len(), "interface resolved");
        self.tables.interfaces.update(full, |r| {
            r.extends = extends;
            r.members = members;
            r.state = DeclState::Resolved;
        });
        Ok(())
    }

    /// Enum members number from 0; an explicit numeric value restarts the
    /// count after it.
    pub(crate) fn ensure_enum(&mut self, full: &str, _ctx: &GenContext) -> SemaResult<Type> {
        let record = self
            .tables
            .enums
            .get(full)
            .cloned()
            .ok_or_else(|| Failure::Internal(format!("unknown enum `{}`", full)))?;
        if record.resolved {
            return Ok(record.ty());
        }
        let mut members = Vec::with_capacity(record.decl.members.len());
        let mut next = 0.0;
        for enum_member in &record.decl.members {
            let value = match &enum_member.init {
                None => LiteralValue::Number(next),
                Some(init) => match constant_initializer(init) {
                    Some(value) => value,
                    None => {
                        return Err(self.report(
                            init.span,
                            SemaError::TypeMismatch {
                                expected: Type::number(),
                                found: Type::Unknown,
                            },
                        ));
                    }
                },
            };
            if let LiteralValue::Number(n) = value {
                next = n + 1.0;
            }
            members.push((enum_member.name.value.name.clone(), value));
        }
        self.tables.enums.update(full, |r| {
            r.members = members;
            r.resolved = true;
        });
        let ty = self
            .tables
            .enums
            .get(full)
            .map(EnumRecord::ty)
            .unwrap_or(Type::Never);
        Ok(ty)
    }

    pub(crate) fn ensure_alias(&mut self, full: &str, ctx: &GenContext) -> SemaResult<Type> {
        let record = self
            .tables
            .aliases
            .get(full)
            .cloned()
            .ok_or_else(|| Failure::Internal(format!("unknown type alias `{}`", full)))?;
        if let Some(ty) = record.ty {
            return Ok(ty);
        }
        if record.resolving {
            return Err(self.report(
                record.decl.name.span,
                SemaError::UnresolvedDependencies(full.to_string()),
            ));
        }
        self.tables.aliases.update(full, |r| r.resolving = true);
        let actx = GenContext {
            allow_partial_resolve: ctx.allow_partial_resolve,
            speculative: ctx.speculative,
            ..GenContext::new()
        };
        let _ns = self.namespace.enter(&record.namespace);
        let result = self.with_isolated_scopes(|this| this.resolve_type(&record.decl.ty, &actx));
        self.tables.aliases.update(full, |r| {
            r.resolving = false;
            if let Ok(ty) = &result {
                r.ty = Some(ty.clone());
            }
        });
        result
    }
}

fn generic_class_info(full: &str, class: &ClassDecl, ns: &str) -> GenericClassInfo {
    GenericClassInfo {
        full_name: full.to_string(),
        decl: Rc::new(class.clone()),
        namespace: ns.to_string(),
    }
}

fn interface_record(full: &str, iface: &InterfaceDecl, ns: &str, bindings: Rc<TypeBindings>) -> InterfaceRecord {
    InterfaceRecord {
        full_name: full.to_string(),
        decl: Rc::new(iface.clone()),
        namespace: ns.to_string(),
        bindings,
        origin: None,
        state: DeclState::Hoisted,
        extends: Vec::new(),
        members: Vec::new(),
    }
}

fn alias_record(full: &str, alias: &TypeAliasDecl, ns: &str) -> AliasRecord {
    AliasRecord {
        full_name: full.to_string(),
        decl: Rc::new(alias.clone()),
        namespace: ns.to_string(),
        ty: None,
        resolving: false,
    }
}

fn enum_record(full: &str, decl: &EnumDecl, ns: &str) -> EnumRecord {
    EnumRecord {
        full_name: full.to_string(),
        decl: Rc::new(decl.clone()),
        namespace: ns.to_string(),
        members: Vec::new(),
        resolved: false,
    }
}

fn upsert_member(members: &mut Vec<Member>, member: Member) {
    match members.iter_mut().find(|m| m.name == member.name) {
        Some(existing) => *existing = member,
        None => members.push(member),
    }
}

/// Value of a constant enum initializer: a literal, possibly negated.
fn constant_initializer(expr: &Node<Expr>) -> Option<LiteralValue> {
    match &expr.value {
        Expr::Literal(Literal::Number(n)) => Some(LiteralValue::Number(*n)),
        Expr::Literal(Literal::String(s)) => Some(LiteralValue::String(s.clone())),
        Expr::Literal(Literal::Boolean(b)) => Some(LiteralValue::Boolean(*b)),
        Expr::Unary {
            op: UnaryOp::Minus,
            expr: inner,
        } => match constant_initializer(inner)? {
            LiteralValue::Number(n) => Some(LiteralValue::Number(-n)),
            _ => None,
        },
        Expr::Paren(inner) => constant_initializer(inner),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_ast::build::*;
    use tern_ast::{EnumMember, Ident};

    #[test]
    fn test_constant_initializer() {
        assert_eq!(constant_initializer(&num(3.0)), Some(LiteralValue::Number(3.0)));
        assert_eq!(
            constant_initializer(&unary(UnaryOp::Minus, num(2.0))),
            Some(LiteralValue::Number(-2.0))
        );
        assert_eq!(constant_initializer(&ident("x")), None);
    }

    #[test]
    fn test_enum_numbering_restarts_after_explicit_value() {
        let decl = EnumDecl {
            name: node(Ident::new("E")),
            members: vec![
                EnumMember {
                    name: node(Ident::new("A")),
                    init: None,
                },
                EnumMember {
                    name: node(Ident::new("B")),
                    init: Some(num(10.0)),
                },
                EnumMember {
                    name: node(Ident::new("C")),
                    init: None,
                },
                EnumMember {
                    name: node(Ident::new("D")),
                    init: Some(string("d")),
                },
            ],
            is_const: false,
            is_declare: false,
        };
        let mut r = Resolver::default();
        r.hoist_decl(&Decl::Enum(decl), Span::default(), "");
        let ty = r.ensure_enum("E", &GenContext::new()).unwrap();
        let record = r.enumeration("E").unwrap();
        assert_eq!(record.member("A"), Some(&LiteralValue::Number(0.0)));
        assert_eq!(record.member("B"), Some(&LiteralValue::Number(10.0)));
        assert_eq!(record.member("C"), Some(&LiteralValue::Number(11.0)));
        assert_eq!(record.member("D"), Some(&LiteralValue::String("d".into())));
        assert_eq!(ty.union_members().len(), 4);
    }

    #[test]
    fn test_hoisting_registers_nested_namespaces() {
        let inner = Decl::Module(tern_ast::ModuleDecl {
            name: node(Ident::new("A.B")),
            body: vec![decl_item(Decl::Function(function("f", vec![], vec![], None, vec![])))],
            is_declare: false,
        });
        let mut r = Resolver::default();
        r.hoist_items(&[decl_item(inner)], "");
        assert!(r.tables.functions.contains("A.B.f"));
        assert_eq!(
            r.tables.lookup_value("A.B", "f"),
            Some(ScopeEntry::Declaration(DeclRef::Function("A.B.f".into())))
        );
    }

    #[test]
    fn test_recursive_alias_is_reported() {
        let alias = TypeAliasDecl {
            name: node(Ident::new("Loop")),
            type_params: None,
            ty: array_type(type_ref("Loop")),
        };
        let mut r = Resolver::default();
        r.hoist_decl(&Decl::TypeAlias(alias), Span::default(), "");
        assert_eq!(r.ensure_alias("Loop", &GenContext::new()), Err(Failure::Reported));
        assert!(matches!(
            r.diagnostics()[0].kind,
            SemaError::UnresolvedDependencies(_)
        ));
    }
}
