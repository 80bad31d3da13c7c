//! Function resolution in two passes.
//!
//! A function whose signature is not fully known is first resolved
//! speculatively into a scratch module (discovery): that pass learns the
//! return type and the captured variables, then every effect is rolled
//! back. The commit pass then emits the real body with the capture layout
//! fixed.

use std::cell::RefCell;
use std::rc::Rc;

use tern_ast::build::{assign, binary, expr_stmt, ident, if_stmt, undefined};
use tern_ast::{
    ArrowBody, BinaryOp, BlockStmt, Expr, FunctionDecl, Node, Param, Span, Stmt, TypeParam, VarDeclKind,
    VarDeclarator,
};
use tern_ir::{IrFunction, IrParam, Op};
use tern_types::{widen, Type};

use crate::capture::CaptureSet;
use crate::context::{DiscoveryAccumulator, GenContext};
use crate::error::{DeferReason, Failure, SemaResult};
use crate::resolver::{CaptureLayout, FnFrame, Resolver, Typed};
use crate::rewrite::rewrite_generator;
use crate::scope::{DeclRef, ScopeEntry, VariableInfo};
use crate::symbols::{
    ClassRecord, FunctionKind, FunctionPrototype, FunctionRecord, FunctionSource, FunctionSyntax, GenericFunctionInfo,
    ParamInfo,
};
use crate::type_ref::with_unbound_placeholders;

/// How a function body being emitted reaches its captures.
#[derive(Debug, Clone, PartialEq)]
enum CapturePlan {
    None,
    Param(Vec<String>),
    ClassField(Vec<String>),
    Discovery,
}

impl FunctionSyntax {
    #[allow(clippy::too_many_arguments)]
    fn build(
        name: &str,
        type_params: Option<Vec<TypeParam>>,
        params: Vec<Param>,
        return_type: Option<Node<tern_ast::Type>>,
        body: Option<Node<BlockStmt>>,
        is_generator: bool,
        span: Span,
    ) -> Self {
        let mut syntax = Self {
            name: name.to_string(),
            type_params: type_params.unwrap_or_default(),
            params,
            return_type,
            body,
            is_generator,
            resume_points: 0,
            extra_locals: false,
            span,
        };
        if syntax.is_generator {
            rewrite_generator(&mut syntax);
        }
        syntax
    }

    pub(crate) fn from_decl(decl: &FunctionDecl, span: Span) -> Self {
        Self::build(
            &decl.name.value.name,
            decl.type_params.clone(),
            decl.params.clone(),
            decl.return_type.as_deref().cloned(),
            decl.body.clone(),
            decl.is_generator,
            span,
        )
    }

    pub(crate) fn method(
        name: &str,
        type_params: &Option<Vec<TypeParam>>,
        params: &[Param],
        return_type: &Option<Box<Node<tern_ast::Type>>>,
        body: &Option<Node<BlockStmt>>,
        span: Span,
    ) -> Self {
        Self::build(
            name,
            type_params.clone(),
            params.to_vec(),
            return_type.as_deref().cloned(),
            body.clone(),
            false,
            span,
        )
    }

    pub(crate) fn constructor(params: Vec<Param>, body: Node<BlockStmt>, span: Span) -> Self {
        let void = Node::new(tern_ast::Type::Primitive(tern_ast::PrimitiveType::Void), span);
        Self::build("constructor", None, params, Some(void), Some(body), false, span)
    }

    /// Syntax of an arrow or function expression. An expression body
    /// becomes a single `return`.
    pub(crate) fn from_expr(expr: &Node<Expr>, name: &str) -> Option<Self> {
        match &expr.value {
            Expr::Arrow {
                type_params,
                params,
                return_type,
                body,
            } => {
                let body = match body {
                    ArrowBody::Block(block) => (**block).clone(),
                    ArrowBody::Expr(value) => Node::new(
                        BlockStmt {
                            stmts: vec![Node::new(Stmt::Return(Some((**value).clone())), value.span)],
                        },
                        value.span,
                    ),
                };
                Some(Self::build(
                    name,
                    type_params.clone(),
                    params.clone(),
                    return_type.as_deref().cloned(),
                    Some(body),
                    false,
                    expr.span,
                ))
            }
            Expr::Function {
                type_params,
                params,
                return_type,
                body,
                is_generator,
                ..
            } => Some(Self::build(
                name,
                type_params.clone(),
                params.clone(),
                return_type.as_deref().cloned(),
                Some((**body).clone()),
                *is_generator,
                expr.span,
            )),
            Expr::Paren(inner) => Self::from_expr(inner, name),
            _ => None,
        }
    }
}

impl Resolver {
    // =========================================================================
    // Records
    // =========================================================================

    /// Registers a function unless one of that name exists.
    pub(crate) fn register_function(&mut self, full: &str, source: FunctionSource) {
        if !self.tables.functions.contains(full) {
            self.insert_function(full, source);
        }
    }

    /// Registers a function, replacing any previous record. Closures are
    /// registered afresh each time their enclosing body is resolved.
    pub(crate) fn insert_function(&mut self, full: &str, source: FunctionSource) {
        self.tables.functions.insert(
            full.to_string(),
            FunctionRecord {
                full_name: full.to_string(),
                source: Rc::new(source),
                prototype: None,
                committed: false,
            },
        );
    }

    fn store_prototype(&mut self, full: &str, proto: &FunctionPrototype) {
        self.tables.functions.update(full, |record| record.prototype = Some(proto.clone()));
    }

    fn needs_discovery(&self, source: &FunctionSource, proto: &FunctionPrototype) -> bool {
        source.syntax.body.is_some()
            && (proto.return_type.is_none() || source.nested || !self.options.skip_discovery_for_annotated)
    }

    fn prototype_complete(&self, source: &FunctionSource, proto: &FunctionPrototype) -> bool {
        proto.return_type.is_some() && (proto.discovered || !self.needs_discovery(source, proto))
    }

    // =========================================================================
    // Driver
    // =========================================================================

    /// Makes the prototype of `full` available. Outside speculative
    /// contexts the function is committed as well.
    pub(crate) fn ensure_function(&mut self, full: &str, span: Span, ctx: &GenContext) -> SemaResult<FunctionPrototype> {
        let record = self
            .tables
            .functions
            .get(full)
            .cloned()
            .ok_or_else(|| Failure::Internal(format!("unknown function `{}`", full)))?;
        if let Some(proto) = &record.prototype {
            if record.committed {
                return Ok(proto.clone());
            }
            let known = proto.return_type.is_some();
            if known && self.committing.iter().any(|f| f == full) {
                return Ok(proto.clone());
            }
            if self.discovering.iter().any(|f| f == full) {
                if known {
                    return Ok(proto.clone());
                }
                return Err(Failure::Deferred(DeferReason::PendingDiscovery(full.to_string())));
            }
            if ctx.speculative && self.prototype_complete(&record.source, proto) {
                return Ok(proto.clone());
            }
        }

        let source = record.source.clone();
        let _ns = self.namespace.enter(&source.namespace);
        if source.nested {
            self.resolve_function(full, &source, record.prototype, span, ctx)
        } else {
            self.with_isolated_scopes(|this| this.resolve_function(full, &source, record.prototype, span, ctx))
        }
    }

    /// [`Resolver::ensure_function`] for call sites. A callee whose own
    /// discovery is in progress yields its parameters and an unknown
    /// (`never`) result, and the caller's discovery records the dependency.
    pub(crate) fn ensure_callee(&mut self, full: &str, span: Span, ctx: &GenContext) -> SemaResult<FunctionPrototype> {
        match self.ensure_function(full, span, ctx) {
            Err(Failure::Deferred(DeferReason::PendingDiscovery(on))) if ctx.record_pending(&on) => {
                tracing::debug!(callee = full, pending = %on, "call into a function under discovery");
                let proto = self
                    .tables
                    .functions
                    .get(full)
                    .and_then(|r| r.prototype.clone())
                    .ok_or(Failure::Deferred(DeferReason::PendingDiscovery(on)))?;
                Ok(FunctionPrototype {
                    return_type: Some(Type::Never),
                    ..proto
                })
            }
            other => other,
        }
    }

    fn resolve_function(
        &mut self,
        full: &str,
        source: &FunctionSource,
        existing: Option<FunctionPrototype>,
        span: Span,
        ctx: &GenContext,
    ) -> SemaResult<FunctionPrototype> {
        let mut proto = match existing {
            Some(proto) => proto,
            None => {
                let proto = self.resolve_prototype_params(full, source, ctx)?;
                self.store_prototype(full, &proto);
                proto
            }
        };

        if source.syntax.body.is_none() {
            // Declaration only: the signature is all there is.
            if proto.return_type.is_none() {
                proto.return_type = Some(Type::Any);
            }
            self.store_prototype(full, &proto);
            self.tables.functions.update(full, |r| r.committed = true);
            return Ok(proto);
        }

        if !self.prototype_complete(source, &proto) {
            proto = self.discover(full, source, proto, span, ctx)?;
            self.store_prototype(full, &proto);
        }
        if ctx.speculative {
            return Ok(proto);
        }
        self.commit_function(full, source, &proto, ctx)?;
        Ok(proto)
    }

    /// Context for the body of `full`: fresh expression state, the
    /// function's bindings, strictness and speculation inherited.
    fn body_context(&self, full: &str, source: &FunctionSource, ctx: &GenContext) -> GenContext {
        let base = GenContext::new().with_bindings(source.bindings.clone());
        let base = with_unbound_placeholders(&base, &source.syntax.type_params).in_function(full);
        GenContext {
            allow_partial_resolve: ctx.allow_partial_resolve,
            speculative: ctx.speculative,
            discover_params_only: ctx.discover_params_only,
            ..base
        }
    }

    /// Parameter types and the annotated return type. Unannotated
    /// parameters take the contextual signature, then the type of their
    /// default value, then `any`.
    pub(crate) fn resolve_prototype_params(
        &mut self,
        full: &str,
        source: &FunctionSource,
        ctx: &GenContext,
    ) -> SemaResult<FunctionPrototype> {
        let syntax = &source.syntax;
        let pctx = self.body_context(full, source, ctx);
        let receiver = match &ctx.receiver_type {
            Some(Type::Function(ft)) => Some(ft.clone()),
            _ => None,
        };

        let mut params = Vec::with_capacity(syntax.params.len());
        for (i, param) in syntax.params.iter().enumerate() {
            let name = param
                .pattern
                .value
                .ident_name()
                .map_or_else(|| format!("%p{}", i), str::to_string);
            let contextual = receiver.as_ref().and_then(|ft| ft.params.get(i));
            let ty = if let Some(ann) = param.annotation() {
                self.resolve_type(ann, &pctx)?
            } else if ctx.discover_params_only {
                Type::Never
            } else if let Some(ty) = contextual {
                if ty.has_placeholders() {
                    Type::Any
                } else {
                    ty.non_optional()
                }
            } else if let Some(default) = &param.default {
                widen(&self.probe_type(default, &pctx)?)
            } else if param.is_rest {
                Type::array(Type::Any)
            } else {
                Type::Any
            };
            params.push(ParamInfo {
                name,
                ty,
                optional: param.optional,
                variadic: param.is_rest,
                has_default: param.default.is_some(),
            });
        }

        let return_type = match &syntax.return_type {
            Some(ann) => Some(self.resolve_type(ann, &pctx)?),
            None => None,
        };
        let this_class = source
            .kind
            .class()
            .map(|class| self.tables.classes.get(class).map_or_else(|| Type::class(class), ClassRecord::ty));

        Ok(FunctionPrototype {
            name: full.to_string(),
            params,
            return_type,
            discovered: false,
            captures: CaptureSet::new(),
            has_captures: false,
            extra_local_fields: syntax.extra_locals,
            resume_points: syntax.resume_points,
            this_class,
        })
    }

    /// Speculative pass over the body. Returns the prototype completed
    /// with the return type and captures learned.
    fn discover(
        &mut self,
        full: &str,
        source: &FunctionSource,
        proto: FunctionPrototype,
        span: Span,
        ctx: &GenContext,
    ) -> SemaResult<FunctionPrototype> {
        tracing::debug!(function = full, "discovery pass");
        let tx = self.begin_transaction();
        let token = self.builder.begin_scratch();
        self.diagnostics.postpone();
        self.discovering.push(full.to_string());

        let acc = Rc::new(RefCell::new(DiscoveryAccumulator::default()));
        let dctx = self.body_context(full, source, ctx).discovering(acc.clone());
        let result = self.emit_function(full, source, &proto, CapturePlan::Discovery, &dctx);

        self.discovering.pop();
        let dropped = self.builder.drop_scratch(token);
        match &result {
            Err(Failure::Reported) => self.diagnostics.flush_postponed(),
            _ => self.diagnostics.discard_postponed(),
        }
        self.rollback(tx)?;
        dropped?;
        result?;

        let acc = acc.borrow();
        if let Some(on) = acc.pending_on.iter().find(|f| f.as_str() != full) {
            tracing::debug!(function = full, pending = %on, ?span, "discovery waits on another discovery");
            return Err(Failure::Deferred(DeferReason::PendingDiscovery(on.clone())));
        }

        let mut proto = proto;
        if proto.return_type.is_none() {
            let discovered = match (&acc.return_type, acc.returns) {
                (Some(ty), n) if n > 0 => ty.clone(),
                _ => Type::void(),
            };
            proto.return_type = Some(discovered);
        }
        proto.captures = acc.captures.clone();
        proto.has_captures = !proto.captures.is_empty();
        proto.discovered = true;
        tracing::debug!(
            function = full,
            return_type = %proto.return_type.as_ref().unwrap_or(&Type::Unknown),
            captures = proto.captures.len(),
            "discovered"
        );
        Ok(proto)
    }

    fn capture_plan(&self, source: &FunctionSource, proto: &FunctionPrototype) -> CapturePlan {
        if source.kind.has_this() {
            let class_captures = source
                .kind
                .class()
                .and_then(|class| self.tables.classes.get(class))
                .map(|record| record.captures.names())
                .unwrap_or_default();
            if !class_captures.is_empty() {
                return CapturePlan::ClassField(class_captures);
            }
        }
        if proto.captures.is_empty() {
            CapturePlan::None
        } else {
            CapturePlan::Param(proto.captures.names())
        }
    }

    fn commit_function(
        &mut self,
        full: &str,
        source: &FunctionSource,
        proto: &FunctionPrototype,
        ctx: &GenContext,
    ) -> SemaResult<()> {
        tracing::debug!(function = full, "commit pass");
        let plan = self.capture_plan(source, proto);
        self.committing.push(full.to_string());
        let cctx = self.body_context(full, source, ctx).committing();
        let result = self.emit_function(full, source, proto, plan, &cctx);
        self.committing.pop();
        match result {
            Ok(()) => {
                self.tables.functions.update(full, |record| {
                    record.committed = true;
                    record.prototype = Some(proto.clone());
                });
                Ok(())
            }
            Err(Failure::Deferred(reason))
                if proto.discovered
                    && !ctx.allow_partial_resolve
                    && !matches!(reason, DeferReason::PendingDiscovery(_)) =>
            {
                Err(Failure::Internal(format!(
                    "`{}` failed to commit after a successful discovery: {}",
                    full, reason
                )))
            }
            Err(failure) => Err(failure),
        }
    }

    // =========================================================================
    // Emission
    // =========================================================================

    fn emit_function(
        &mut self,
        full: &str,
        source: &FunctionSource,
        proto: &FunctionPrototype,
        plan: CapturePlan,
        ctx: &GenContext,
    ) -> SemaResult<()> {
        let capture_ty = match &plan {
            CapturePlan::Param(_) => proto.capture_type(),
            _ => None,
        };
        let mut params = Vec::with_capacity(proto.params.len() + 2);
        if let Some(ty) = &capture_ty {
            params.push(IrParam::new("%captures", ty.clone()));
        }
        if source.kind.has_this() {
            params.push(IrParam::new("this", proto.this_class.clone().unwrap_or(Type::Any)));
        }
        params.extend(proto.params.iter().map(|p| IrParam::new(&p.name, p.signature_type())));

        let mut function = IrFunction::new(full, params, proto.return_type.clone().unwrap_or(Type::Unknown));
        function.captures = capture_ty;
        function.span = Some(source.syntax.span);
        self.builder.begin_function(function);
        let mut frame = FnFrame::new(full, CaptureLayout::None, proto.return_type.clone());
        frame.this_class = source.kind.class().map(str::to_string);
        self.frames.push(frame);
        let depth = self.scopes.depth();
        self.scopes.push();

        let result = self.emit_function_body(full, source, proto, plan, ctx);

        self.scopes.truncate(depth);
        self.frames.pop();
        match result {
            Ok(()) => {
                self.builder.finish_function()?;
                Ok(())
            }
            Err(failure) => {
                self.builder.abandon_function();
                Err(failure)
            }
        }
    }

    fn emit_function_body(
        &mut self,
        full: &str,
        source: &FunctionSource,
        proto: &FunctionPrototype,
        plan: CapturePlan,
        ctx: &GenContext,
    ) -> SemaResult<()> {
        let syntax = &source.syntax;
        let span = syntax.span;
        let mut index = 0;
        match plan {
            CapturePlan::Param(names) => {
                let ty = proto.capture_type().unwrap_or(Type::Unknown);
                let value = self.value(ty, Op::Param(0), Vec::new(), span)?;
                self.frame_mut()?.captures = CaptureLayout::Param {
                    value: value.value,
                    names,
                };
                index = 1;
            }
            CapturePlan::ClassField(names) => self.frame_mut()?.captures = CaptureLayout::ClassField { names },
            CapturePlan::Discovery => self.frame_mut()?.captures = CaptureLayout::Discovery,
            CapturePlan::None => {}
        }
        if source.kind.has_this() {
            let ty = proto.this_class.clone().unwrap_or(Type::Any);
            self.bind_param("this", ty, index, true, full, span)?;
            index += 1;
        }
        for (i, param) in proto.params.iter().enumerate() {
            let ty = if param.optional && !param.has_default {
                param.signature_type()
            } else {
                param.ty.clone()
            };
            self.bind_param(&param.name, ty, index + i, false, full, span)?;
        }

        for (param, info) in syntax.params.iter().zip(&proto.params) {
            if let Some(default) = &param.default {
                let missing = binary(ident(&info.name), BinaryOp::StrictEq, undefined());
                let fill = expr_stmt(assign(ident(&info.name), default.clone()));
                self.resolve_stmt(&if_stmt(missing, fill, None), ctx)?;
            }
        }
        for (param, info) in syntax.params.iter().zip(&proto.params) {
            if param.pattern.value.ident_name().is_none() {
                let declarator = VarDeclarator {
                    pattern: param.pattern.clone(),
                    init: Some(Node::new(Expr::Ident(tern_ast::Ident::new(&info.name)), param.pattern.span)),
                };
                self.resolve_declarator(VarDeclKind::Let, &declarator, ctx)?;
            }
        }

        if let FunctionKind::Constructor { class } = &source.kind {
            self.emit_field_initializers(class, span, ctx)?;
        }
        if let Some(body) = &syntax.body {
            self.resolve_stmts(&body.value.stmts, ctx)?;
        }
        if !self.builder.region_terminated() {
            self.emit(Op::Return, Vec::new(), span)?;
        }
        Ok(())
    }

    fn bind_param(&mut self, name: &str, ty: Type, index: usize, is_const: bool, owner: &str, span: Span) -> SemaResult<()> {
        let param = self.value(ty.clone(), Op::Param(index), Vec::new(), span)?;
        let slot = self.value(
            ty.clone(),
            Op::Variable {
                name: name.to_string(),
            },
            vec![param.value],
            span,
        )?;
        let info = VariableInfo::local(name, ty, slot.value, owner).constant(is_const);
        self.scopes.declare(name, ScopeEntry::Variable(info));
        Ok(())
    }

    // =========================================================================
    // Closures
    // =========================================================================

    fn next_lambda_name(&mut self) -> SemaResult<String> {
        let frame = self.frame_mut()?;
        let name = format!("{}.lambda{}", frame.name, frame.lambda_counter);
        frame.lambda_counter += 1;
        Ok(name)
    }

    fn closure_source(&self, syntax: FunctionSyntax, ctx: &GenContext) -> FunctionSource {
        FunctionSource {
            syntax: Rc::new(syntax),
            namespace: self.namespace.current(),
            bindings: ctx.bindings.clone(),
            kind: FunctionKind::Closure,
            nested: true,
        }
    }

    /// Resolves an arrow or function expression to a closure value.
    pub(crate) fn resolve_function_expr(&mut self, expr: &Node<Expr>, ctx: &GenContext) -> SemaResult<Typed> {
        let full = self.next_lambda_name()?;
        let syntax = FunctionSyntax::from_expr(expr, &full)
            .ok_or_else(|| Failure::Internal("function expression expected".to_string()))?;
        let source = self.closure_source(syntax, ctx);
        self.insert_function(&full, source);
        let proto = self.ensure_function(&full, expr.span, ctx)?;
        self.closure_value(&full, &proto, expr.span, ctx)
    }

    /// Signature of a function literal from its annotations alone. Nothing
    /// is registered or emitted.
    pub(crate) fn function_literal_type(&mut self, expr: &Node<Expr>, ctx: &GenContext) -> SemaResult<Type> {
        let syntax = FunctionSyntax::from_expr(expr, "%literal")
            .ok_or_else(|| Failure::Internal("function expression expected".to_string()))?;
        let source = self.closure_source(syntax, ctx);
        let proto = self.resolve_prototype_params("%literal", &source, ctx)?;
        Ok(proto.ty())
    }

    /// Creates the closure value for `full`, loading each capture through
    /// the enclosing function so captures propagate outward.
    pub(crate) fn closure_value(
        &mut self,
        full: &str,
        proto: &FunctionPrototype,
        span: Span,
        ctx: &GenContext,
    ) -> SemaResult<Typed> {
        if proto.captures.is_empty() {
            return self.value(
                proto.ty(),
                Op::FunctionRef {
                    function: full.to_string(),
                },
                Vec::new(),
                span,
            );
        }
        let mut slots = Vec::with_capacity(proto.captures.len());
        for name in proto.captures.names() {
            let info = self.scopes.lookup_variable(&name).cloned().ok_or_else(|| {
                Failure::Internal(format!("captured variable `{}` of `{}` is not in scope", name, full))
            })?;
            slots.push(self.variable_slot(&info, span, ctx)?);
        }
        self.value(
            proto.ty(),
            Op::Closure {
                function: full.to_string(),
            },
            slots,
            span,
        )
    }

    /// A function declared inside a function body: a closure stored in a
    /// local variable, declared before its body is resolved so the body can
    /// call itself.
    pub(crate) fn declare_nested_function(&mut self, decl: &FunctionDecl, span: Span, ctx: &GenContext) -> SemaResult<()> {
        let name = decl.name.value.name.clone();
        let owner = self.frame()?.name.clone();
        let full = format!("{}.{}", owner, name);
        let syntax = FunctionSyntax::from_decl(decl, span);

        if decl.is_generic() {
            self.tables.generic_functions.insert(
                full.clone(),
                GenericFunctionInfo {
                    full_name: full.clone(),
                    syntax: Rc::new(syntax),
                    namespace: self.namespace.current(),
                    owner_class: None,
                    bindings: ctx.bindings.clone(),
                },
            );
            self.scopes
                .declare(name, ScopeEntry::Declaration(DeclRef::GenericFunction(full)));
            return Ok(());
        }

        let source = self.closure_source(syntax, ctx);
        let proto = self.resolve_prototype_params(&full, &source, &ctx.plain())?;
        self.insert_function(&full, source);
        self.store_prototype(&full, &proto);

        let slot = self.value(proto.ty(), Op::Variable { name: name.clone() }, Vec::new(), span)?;
        let info = VariableInfo::local(&name, proto.ty(), slot.value, &owner);
        if self.scopes.declare(&name, ScopeEntry::Variable(info)) {
            self.warn(span, crate::error::SemaError::DuplicateDeclaration(name.clone()));
        }

        let proto = self.ensure_function(&full, span, ctx)?;
        let closure = self.closure_value(&full, &proto, span, ctx)?;
        self.emit(Op::Store, vec![slot.value, closure.value], span)?;
        self.scopes.set_variable_type(&name, proto.ty());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_ast::build::*;

    #[test]
    fn test_arrow_expression_body_becomes_return() {
        let lambda = arrow(vec![param("x", Some(number_type()))], ident("x"));
        let syntax = FunctionSyntax::from_expr(&lambda, "f.lambda0").unwrap();
        let body = syntax.body.unwrap();
        assert!(matches!(body.value.stmts.as_slice(), [Node { value: Stmt::Return(Some(_)), .. }]));
        assert_eq!(syntax.name, "f.lambda0");
        assert_eq!(syntax.params.len(), 1);
    }

    #[test]
    fn test_non_function_expression_has_no_syntax() {
        assert!(FunctionSyntax::from_expr(&num(1.0), "x").is_none());
    }

    #[test]
    fn test_generator_declaration_is_rewritten() {
        let decl = FunctionDecl {
            is_generator: true,
            ..function("gen", vec![], vec![], None, vec![expr_stmt(yield_expr(Some(num(1.0))))])
        };
        let syntax = FunctionSyntax::from_decl(&decl, Span::default());
        assert!(!syntax.is_generator);
        assert_eq!(syntax.resume_points, 1);
        assert!(syntax.return_type.is_none());
    }
}
