//! Statements and variable declarations.

use tern_ast::build::ident;
use tern_ast::{Expr, ForInit, Ident, Node, Pattern, Span, Stmt, VarDecl, VarDeclKind, VarDeclarator};
use tern_ir::{BinOp, Constant, IrGlobal, Op, Region, ValueId};
use tern_types::{extends, widen, ExtendsResult, Type, TypeBindings};

use crate::context::GenContext;
use crate::error::{SemaError, SemaResult};
use crate::namespace::{qualify, SymbolKind};
use crate::resolver::{Resolver, Typed};
use crate::rewrite::destructure;
use crate::scope::{ScopeEntry, VariableInfo};

impl Resolver {
    /// Statements of one block. Code after a terminator is not emitted.
    pub(crate) fn resolve_stmts(&mut self, stmts: &[Node<Stmt>], ctx: &GenContext) -> SemaResult<()> {
        for stmt in stmts {
            if self.builder.region_terminated() {
                tracing::trace!(span = ?stmt.span, "skipping unreachable statement");
                break;
            }
            self.resolve_stmt(stmt, ctx)?;
        }
        Ok(())
    }

    pub(crate) fn resolve_stmt(&mut self, stmt: &Node<Stmt>, ctx: &GenContext) -> SemaResult<()> {
        let span = stmt.span;
        match &stmt.value {
            Stmt::Expr(expr) => {
                self.resolve_expr(expr, &ctx.plain())?;
                Ok(())
            }
            Stmt::VarDecl(decl) => self.resolve_var_decl(decl, span, ctx),
            Stmt::Decl(decl) if self.scopes.is_empty() => self.resolve_decl_item(decl, span, ctx),
            Stmt::Decl(decl) => self.resolve_local_decl(decl, span, ctx),
            Stmt::Return(value) => self.resolve_return(value.as_ref(), span, ctx),
            Stmt::If {
                condition,
                then_stmt,
                else_stmt,
            } => {
                let cond = self.resolve_expr(condition, &ctx.plain())?;
                let then_region = self.in_region(|this| this.resolve_stmt(then_stmt, ctx))?;
                let else_region = match else_stmt {
                    Some(else_stmt) => self.in_region(|this| this.resolve_stmt(else_stmt, ctx))?,
                    None => Region::new(),
                };
                self.emit(
                    Op::If {
                        then_region,
                        else_region,
                    },
                    vec![cond.value],
                    span,
                )
            }
            Stmt::While { condition, body } => {
                let cond = self.condition_region(Some(condition), span, ctx)?;
                let body = self.in_region(|this| this.resolve_stmt(body, ctx))?;
                self.emit_loop(cond, body, Region::new(), span)
            }
            Stmt::DoWhile { body, condition } => {
                let cond = self.condition_region(None, span, ctx)?;
                let body = self.in_region(|this| this.resolve_stmt(body, ctx))?;
                // The test runs in the update region so `continue` reaches it.
                let update = self.in_region(|this| {
                    let value = this.resolve_expr(condition, &ctx.plain())?;
                    let exit = this.in_region(|this| this.emit(Op::Break, Vec::new(), span))?;
                    this.emit(
                        Op::If {
                            then_region: Region::new(),
                            else_region: exit,
                        },
                        vec![value.value],
                        span,
                    )
                })?;
                self.emit_loop(cond, body, update, span)
            }
            Stmt::For {
                init,
                condition,
                update,
                body,
            } => self.in_block(|this| {
                match init {
                    Some(ForInit::VarDecl(decl)) => this.resolve_var_decl(decl, span, ctx)?,
                    Some(ForInit::Expr(expr)) => {
                        this.resolve_expr(expr, &ctx.plain())?;
                    }
                    None => {}
                }
                let cond = this.condition_region(condition.as_ref(), span, ctx)?;
                let body = this.in_region(|this| this.resolve_stmt(body, ctx))?;
                let update = this.in_region(|this| {
                    if let Some(update) = update {
                        this.resolve_expr(update, &ctx.plain())?;
                    }
                    Ok(())
                })?;
                this.emit_loop(cond, body, update, span)
            }),
            Stmt::ForOf { left, right, body } => self.resolve_for_of(left, right, body, span, ctx),
            Stmt::Block(block) => self.in_block(|this| this.resolve_stmts(&block.stmts, ctx)),
            Stmt::Break => self.emit(Op::Break, Vec::new(), span),
            Stmt::Continue => self.emit(Op::Continue, Vec::new(), span),
            Stmt::Throw(value) => {
                let value = self.resolve_expr(value, &ctx.plain())?;
                self.emit(Op::Throw, vec![value.value], span)
            }
            Stmt::Empty => Ok(()),
        }
    }

    /// Runs `f` in a new lexical block.
    fn in_block<T>(&mut self, f: impl FnOnce(&mut Self) -> SemaResult<T>) -> SemaResult<T> {
        let depth = self.scopes.depth();
        self.scopes.push();
        let result = f(self);
        self.scopes.truncate(depth);
        result
    }

    /// Runs `f` in a new lexical block and detached IR region.
    pub(crate) fn in_region(&mut self, f: impl FnOnce(&mut Self) -> SemaResult<()>) -> SemaResult<Region> {
        self.builder.begin_region()?;
        let result = self.in_block(f);
        let region = self.builder.end_region()?;
        result.map(|()| region)
    }

    /// Loop condition region; it ends with the condition value.
    fn condition_region(&mut self, condition: Option<&Node<Expr>>, span: Span, ctx: &GenContext) -> SemaResult<Region> {
        self.in_region(|this| {
            match condition {
                Some(condition) => this.resolve_expr(condition, &ctx.plain())?,
                None => this.constant(Constant::Boolean(true), Type::boolean(), span)?,
            };
            Ok(())
        })
    }

    fn emit_loop(&mut self, cond: Region, body: Region, update: Region, span: Span) -> SemaResult<()> {
        self.emit(Op::Loop { cond, body, update }, Vec::new(), span)
    }

    /// `for (x of xs)` iterates by index over an array or string.
    fn resolve_for_of(
        &mut self,
        left: &VarDecl,
        right: &Node<Expr>,
        body: &Node<Stmt>,
        span: Span,
        ctx: &GenContext,
    ) -> SemaResult<()> {
        let iterable = self.resolve_expr(right, &ctx.plain())?;
        let element = match &iterable.ty {
            Type::Any => Type::Any,
            ty if ty.is_stringish() => Type::string(),
            ty => match ty.non_optional().element() {
                Some(elem) => elem.clone(),
                None => {
                    return Err(self.report(
                        right.span,
                        SemaError::TypeMismatch {
                            expected: Type::array(Type::Any),
                            found: iterable.ty.clone(),
                        },
                    ));
                }
            },
        };

        self.in_block(|this| {
            let (_, items) = this.local_temp("it", iterable.clone(), span)?;
            let zero = this.constant(Constant::Number(0.0), Type::number(), span)?;
            let (_, counter) = this.local_temp("i", zero, span)?;

            let cond = this.in_region(|this| {
                let index = this.value(Type::number(), Op::Load, vec![counter], span)?;
                let array = this.value(iterable.ty.clone(), Op::Load, vec![items], span)?;
                let length = this.length_of(array.value, span)?;
                this.value(Type::boolean(), Op::Binary(BinOp::Lt), vec![index.value, length.value], span)?;
                Ok(())
            })?;
            let body = this.in_region(|this| {
                let index = this.value(Type::number(), Op::Load, vec![counter], span)?;
                let array = this.value(iterable.ty.clone(), Op::Load, vec![items], span)?;
                let slot = this.value(element.clone(), Op::ElementRef, vec![array.value, index.value], span)?;
                let value = this.value(element.clone(), Op::Load, vec![slot.value], span)?;
                let (temp_name, _) = this.local_temp("e", value, span)?;
                let kind = left.kind;
                for declarator in &left.declarations {
                    let bound = VarDeclarator {
                        pattern: declarator.pattern.clone(),
                        init: Some(Node::new(Expr::Ident(Ident::new(&temp_name)), declarator.pattern.span)),
                    };
                    this.resolve_declarator(kind, &bound, ctx)?;
                }
                this.resolve_stmt(body, ctx)
            })?;
            let update = this.in_region(|this| {
                let index = this.value(Type::number(), Op::Load, vec![counter], span)?;
                let one = this.constant(Constant::Number(1.0), Type::number(), span)?;
                let next = this.value(Type::number(), Op::Binary(BinOp::Add), vec![index.value, one.value], span)?;
                this.emit(Op::Store, vec![counter, next.value], span)
            })?;
            this.emit_loop(cond, body, update, span)
        })
    }

    /// Declares a rewrite temporary holding `init`.
    pub(crate) fn local_temp(&mut self, prefix: &str, init: Typed, span: Span) -> SemaResult<(String, ValueId)> {
        let name = self.fresh_temp(prefix)?;
        let owner = self.frame()?.name.clone();
        let slot = self.value(init.ty.clone(), Op::Variable { name: name.clone() }, vec![init.value], span)?;
        let info = VariableInfo::local(&name, init.ty, slot.value, &owner);
        self.scopes.declare(name.clone(), ScopeEntry::Variable(info));
        Ok((name, slot.value))
    }

    pub(crate) fn length_of(&mut self, value: ValueId, span: Span) -> SemaResult<Typed> {
        let slot = self.value(
            Type::number(),
            Op::FieldRef {
                name: "length".to_string(),
            },
            vec![value],
            span,
        )?;
        self.value(Type::number(), Op::Load, vec![slot.value], span)
    }

    fn resolve_return(&mut self, value: Option<&Node<Expr>>, span: Span, ctx: &GenContext) -> SemaResult<()> {
        let declared = self.frame()?.return_type.clone();
        let Some(value) = value else {
            ctx.record_return(&Type::void());
            return self.emit(Op::Return, Vec::new(), span);
        };
        let receiver = declared.clone().filter(|ty| !ty.is_void());
        let typed = self.resolve_expr(value, &ctx.plain().with_receiver(receiver.clone()))?;
        if let Some(expected) = &receiver {
            self.check_assignable(&typed.ty, expected, value.span)?;
        }
        ctx.record_return(&typed.ty);
        self.emit(Op::Return, vec![typed.value], span)
    }

    /// Reports a mismatch only when `found` definitely does not extend
    /// `expected`.
    pub(crate) fn check_assignable(&mut self, found: &Type, expected: &Type, span: Span) -> SemaResult<()> {
        let mut scratch = TypeBindings::new();
        match extends(found, expected, &mut scratch, &self.tables) {
            ExtendsResult::False => Err(self.report(
                span,
                SemaError::TypeMismatch {
                    expected: expected.clone(),
                    found: found.clone(),
                },
            )),
            _ => Ok(()),
        }
    }

    // =========================================================================
    // Variables
    // =========================================================================

    pub(crate) fn resolve_var_decl(&mut self, decl: &VarDecl, _span: Span, ctx: &GenContext) -> SemaResult<()> {
        for declarator in &decl.declarations {
            self.resolve_declarator(decl.kind, declarator, ctx)?;
        }
        Ok(())
    }

    /// One declarator. `const` keeps the initializer's literal type; `let`
    /// and `var` widen it. Patterns go through a temporary.
    pub(crate) fn resolve_declarator(
        &mut self,
        kind: VarDeclKind,
        declarator: &VarDeclarator,
        ctx: &GenContext,
    ) -> SemaResult<()> {
        let span = declarator.pattern.span;
        let Pattern::Ident { name, type_annotation } = &declarator.pattern.value else {
            let Some(init) = &declarator.init else {
                let names = declarator.pattern.value.bound_names().join(", ");
                return Err(self.report(span, SemaError::MissingInitializer(names)));
            };
            let temp = self.fresh_temp("d")?;
            let holder = VarDeclarator {
                pattern: Node::new(
                    Pattern::Ident {
                        name: Node::new(Ident::new(&temp), span),
                        type_annotation: declarator.pattern.value.type_annotation().cloned().map(Box::new),
                    },
                    span,
                ),
                init: Some(init.clone()),
            };
            self.resolve_declarator(VarDeclKind::Const, &holder, ctx)?;
            for part in destructure(&declarator.pattern, &ident(&temp)) {
                self.resolve_declarator(kind, &part, ctx)?;
            }
            return Ok(());
        };

        let declared = self.resolve_optional_type(type_annotation.as_deref(), ctx)?;
        let value = match &declarator.init {
            Some(init) => {
                let typed = self.resolve_expr(init, &ctx.plain().with_receiver(declared.clone()))?;
                if let Some(expected) = &declared {
                    self.check_assignable(&typed.ty, expected, init.span)?;
                }
                Some(typed)
            }
            None => None,
        };
        let ty = match (declared, &value) {
            (Some(ty), _) => ty,
            (None, Some(value)) if kind == VarDeclKind::Const => value.ty.clone(),
            (None, Some(value)) => widen(&value.ty),
            (None, None) => Type::Any,
        };
        self.declare_variable(kind, &name.value.name, ty, value.map(|v| v.value), span)
    }

    /// Module and namespace level variables are globals; everything else
    /// gets a slot in the current function.
    pub(crate) fn declare_variable(
        &mut self,
        kind: VarDeclKind,
        name: &str,
        ty: Type,
        init: Option<ValueId>,
        span: Span,
    ) -> SemaResult<()> {
        let is_const = kind == VarDeclKind::Const;
        if self.scopes.is_empty() {
            let ns = self.namespace.current();
            let full = qualify(&ns, name);
            if self.tables.globals.contains(&full) {
                self.warn(span, SemaError::DuplicateDeclaration(name.to_string()));
            }
            tracing::trace!(global = %full, ty = %ty, "declare global");
            self.tables.globals.insert(
                full.clone(),
                VariableInfo::global(name, &full, ty.clone()).constant(is_const),
            );
            self.tables.register_name(&ns, SymbolKind::Variable, name, &full);
            self.builder.add_global(IrGlobal {
                name: full.clone(),
                ty: ty.clone(),
                is_const,
            });
            if let Some(init) = init {
                let slot = self.value(ty, Op::GlobalRef { name: full }, Vec::new(), span)?;
                self.emit(Op::Store, vec![slot.value, init], span)?;
            }
            return Ok(());
        }

        let owner = self.frame()?.name.clone();
        let slot = self.value(
            ty.clone(),
            Op::Variable { name: name.to_string() },
            init.into_iter().collect(),
            span,
        )?;
        let info = VariableInfo::local(name, ty, slot.value, &owner).constant(is_const);
        if self.scopes.declare(name, ScopeEntry::Variable(info)) {
            self.warn(span, SemaError::DuplicateDeclaration(name.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{CaptureLayout, FnFrame};
    use tern_ast::build::*;
    use tern_ir::IrFunction;

    fn in_function(r: &mut Resolver, name: &str) -> GenContext {
        r.builder.begin_function(IrFunction::new(name, Vec::new(), Type::void()));
        r.frames.push(FnFrame::new(name, CaptureLayout::None, Some(Type::void())));
        r.scopes.push();
        GenContext::new().in_function(name)
    }

    #[test]
    fn test_const_keeps_literal_and_let_widens() {
        let mut r = Resolver::default();
        let ctx = in_function(&mut r, "f");
        r.resolve_stmt(&const_stmt("a", num(1.0)), &ctx).unwrap();
        r.resolve_stmt(&let_stmt("b", None, Some(num(1.0))), &ctx).unwrap();
        assert_eq!(r.scopes.lookup_variable("a").unwrap().ty, Type::num_lit(1.0));
        assert_eq!(r.scopes.lookup_variable("b").unwrap().ty, Type::number());
    }

    #[test]
    fn test_annotation_mismatch_is_reported() {
        let mut r = Resolver::default();
        let ctx = in_function(&mut r, "f");
        let result = r.resolve_stmt(&let_stmt("s", Some(string_type()), Some(num(1.0))), &ctx);
        assert!(result.is_err());
        assert!(matches!(r.diagnostics()[0].kind, SemaError::TypeMismatch { .. }));
    }

    #[test]
    fn test_array_destructuring_reads_elements() {
        let mut r = Resolver::default();
        let ctx = in_function(&mut r, "f");
        let pattern = node(Pattern::Array {
            elements: vec![Some(ident_pattern("x")), Some(ident_pattern("y"))],
            type_annotation: None,
        });
        let decl = VarDecl {
            kind: VarDeclKind::Let,
            declarations: vec![VarDeclarator {
                pattern,
                init: Some(array(vec![num(1.0), num(2.0)])),
            }],
        };
        r.resolve_var_decl(&decl, Span::default(), &ctx).unwrap();
        assert_eq!(r.scopes.lookup_variable("x").unwrap().ty, Type::number());
        assert!(r.scopes.lookup_variable("%d0").unwrap().no_capture);
    }

    #[test]
    fn test_code_after_return_is_skipped() {
        let mut r = Resolver::default();
        let ctx = in_function(&mut r, "f");
        r.resolve_stmts(&[ret(None), expr_stmt(ident("missing"))], &ctx).unwrap();
        assert!(r.diagnostics().is_empty());
    }
}
