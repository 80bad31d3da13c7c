//! Expressions: names and captures, operators, places, member access,
//! calls, literals and `new`.

use tern_ast::{self as ast, AssignmentOp, BinaryOp, Expr, Literal, Node, ObjectProperty, Span, UnaryOp};
use tern_ir::{BinOp, Constant, Op, UnOp, ValueId};
use tern_types::{merge, merge_all, widen, Field, FunctionType, LiteralValue, Type, TypeEnv};

use crate::context::GenContext;
use crate::error::{DeferReason, Failure, SemaError, SemaResult};
use crate::generics::is_function_literal;
use crate::namespace::qualify;
use crate::resolver::{CaptureLayout, Resolver, Typed};
use crate::scope::{DeclRef, ScopeEntry, VarSlot, VariableInfo};
use crate::symbols::DeclState;

/// How a call reaches its target.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Callee {
    Direct(String),
    /// A function or closure value.
    Indirect(ValueId),
    Virtual { method: String, slot: usize },
    Interface { interface: String, method: String },
}

/// An assignable location.
#[derive(Debug, Clone)]
struct Place {
    slot: ValueId,
    ty: Type,
    /// Owner class of a readonly field.
    readonly: Option<String>,
}

impl Place {
    fn writable(slot: ValueId, ty: Type) -> Self {
        Self { slot, ty, readonly: None }
    }
}

impl Resolver {
    pub(crate) fn resolve_expr(&mut self, expr: &Node<Expr>, ctx: &GenContext) -> SemaResult<Typed> {
        let span = expr.span;
        match &expr.value {
            Expr::Literal(lit) => self.resolve_literal(lit, span),
            Expr::Ident(ident) => self.resolve_ident(&ident.name, span, ctx),
            Expr::This => self.resolve_ident("this", span, ctx),
            Expr::Paren(inner) => self.resolve_expr(inner, ctx),
            Expr::Binary { left, op, right } if op.is_logical() => self.resolve_logical(left, *op, right, span, ctx),
            Expr::Binary { left, op, right } => {
                let l = self.resolve_expr(left, &ctx.plain())?;
                let r = self.resolve_expr(right, &ctx.plain())?;
                self.apply_binary(*op, l, r, span)
            }
            Expr::Unary { op, expr: operand } => self.resolve_unary(*op, operand, span, ctx),
            Expr::Assignment { target, op, value } => self.resolve_assignment(target, *op, value, span, ctx),
            Expr::Ternary {
                condition,
                then_expr,
                else_expr,
            } => self.resolve_ternary(condition, then_expr, else_expr, span, ctx),
            Expr::Call { callee, type_args, args } => self.resolve_call(callee, type_args.as_deref(), args, span, ctx),
            Expr::New { callee, type_args, args } => self.resolve_new(callee, type_args.as_deref(), args, span, ctx),
            Expr::Member { object, property } => self.resolve_member(object, &property.value.name, span, ctx),
            Expr::Index { object, index } => {
                let place = self.index_place(object, index, span, ctx)?;
                self.value(place.ty, Op::Load, vec![place.slot], span)
            }
            Expr::Array(elements) => self.resolve_array(elements, span, ctx),
            Expr::Object(properties) => self.resolve_object(properties, span, ctx),
            Expr::Arrow { .. } | Expr::Function { .. } => self.resolve_function_expr(expr, ctx),
            Expr::TypeCast { expr: inner, ty } => {
                let value = self.resolve_expr(inner, &ctx.plain())?;
                let target = self.resolve_type(ty, ctx)?;
                self.value(target, Op::Cast, vec![value.value], span)
            }
            Expr::Super => Err(self.report(span, SemaError::UndefinedVariable("super".to_string()))),
            Expr::Spread(_) => Err(self.report(span, SemaError::UnexpectedSpread)),
            Expr::Yield { .. } => Err(self.report(span, SemaError::InvalidYield)),
        }
    }

    fn resolve_literal(&mut self, lit: &Literal, span: Span) -> SemaResult<Typed> {
        match lit {
            Literal::Number(n) => self.constant(Constant::Number(*n), Type::num_lit(*n), span),
            Literal::String(s) => self.constant(Constant::String(s.clone()), Type::str_lit(s.clone()), span),
            Literal::Boolean(b) => self.constant(Constant::Boolean(*b), Type::bool_lit(*b), span),
            Literal::Null => self.constant(Constant::Null, Type::null(), span),
            Literal::Undefined => self.undefined(span),
        }
    }

    // =========================================================================
    // Names and captures
    // =========================================================================

    /// Lexical scopes first, then the namespace chain.
    fn lookup_name(&self, name: &str) -> Option<ScopeEntry> {
        if let Some(entry) = self.scopes.lookup(name) {
            return Some(entry.clone());
        }
        self.tables.lookup_value(&self.namespace.current(), name)
    }

    fn resolve_ident(&mut self, name: &str, span: Span, ctx: &GenContext) -> SemaResult<Typed> {
        match self.lookup_name(name) {
            Some(ScopeEntry::Variable(info)) => {
                let slot = self.variable_slot(&info, span, ctx)?;
                self.value(info.ty.clone(), Op::Load, vec![slot], span)
            }
            Some(ScopeEntry::Declaration(DeclRef::Function(full))) => self.function_value(&full, span, ctx),
            Some(ScopeEntry::Declaration(DeclRef::GenericFunction(full))) => Err(self.missing_type_argument(&full, span)),
            Some(ScopeEntry::Declaration(_)) => Err(self.report(span, SemaError::UndefinedVariable(name.to_string()))),
            None => Err(self.defer_or_report(
                ctx,
                span,
                DeferReason::UnresolvedName(name.to_string()),
                SemaError::UndefinedVariable(name.to_string()),
            )),
        }
    }

    /// A named function used as a value.
    fn function_value(&mut self, full: &str, span: Span, ctx: &GenContext) -> SemaResult<Typed> {
        let proto = self.ensure_callee(full, span, ctx)?;
        self.closure_value(full, &proto, span, ctx)
    }

    /// Storage slot of a variable as seen from the current function.
    pub(crate) fn variable_slot(&mut self, info: &VariableInfo, span: Span, ctx: &GenContext) -> SemaResult<ValueId> {
        let current = self.frame()?.name.clone();
        if info.captured_from(Some(&current)) {
            return self.capture_slot(info, span, ctx);
        }
        match &info.slot {
            VarSlot::Local(slot) => Ok(*slot),
            VarSlot::Global(full) => Ok(self
                .value(info.ty.clone(), Op::GlobalRef { name: full.clone() }, Vec::new(), span)?
                .value),
        }
    }

    fn capture_slot(&mut self, info: &VariableInfo, span: Span, ctx: &GenContext) -> SemaResult<ValueId> {
        let layout = self.frame()?.captures.clone();
        let (index, aggregate) = match layout {
            CaptureLayout::Discovery => {
                let index = ctx
                    .record_capture(info)
                    .ok_or_else(|| Failure::Internal(format!("capture of `{}` outside discovery", info.name)))?;
                (index, self.undefined(span)?.value)
            }
            CaptureLayout::Param { value, names } => {
                let index = names
                    .iter()
                    .position(|n| *n == info.name)
                    .ok_or_else(|| Failure::Internal(format!("`{}` is not among the captures", info.name)))?;
                (index, value)
            }
            CaptureLayout::ClassField { names } => {
                let index = names
                    .iter()
                    .position(|n| *n == info.name)
                    .ok_or_else(|| Failure::Internal(format!("`{}` is not among the class captures", info.name)))?;
                let class = self.frame()?.this_class.clone().unwrap_or_default();
                let aggregate_ty = self
                    .tables
                    .classes
                    .get(&class)
                    .and_then(|record| record.captures.aggregate_type())
                    .ok_or_else(|| Failure::Internal(format!("`{}` has no capture aggregate", class)))?;
                let this = self
                    .scopes
                    .lookup_variable("this")
                    .cloned()
                    .ok_or_else(|| Failure::Internal("`this` is not bound".to_string()))?;
                let VarSlot::Local(this_slot) = this.slot else {
                    return Err(Failure::Internal("`this` is not a local".to_string()));
                };
                let receiver = self.value(this.ty.clone(), Op::Load, vec![this_slot], span)?;
                let field = self.value(
                    aggregate_ty.clone(),
                    Op::FieldRef {
                        name: "captures".to_string(),
                    },
                    vec![receiver.value],
                    span,
                )?;
                (index, self.value(aggregate_ty, Op::Load, vec![field.value], span)?.value)
            }
            CaptureLayout::None => {
                return Err(Failure::Internal(format!(
                    "`{}` crosses a closure boundary of a function without captures",
                    info.name
                )));
            }
        };
        tracing::trace!(variable = %info.name, index, "capture");
        let slot = self.value(
            info.ty.clone(),
            Op::CaptureField {
                index,
                name: info.name.clone(),
            },
            vec![aggregate],
            span,
        )?;
        Ok(slot.value)
    }

    fn missing_type_argument(&mut self, generic: &str, span: Span) -> Failure {
        let first = |params: &[ast::TypeParam]| params.first().map(|p| p.name.value.name.clone());
        let param = self
            .tables
            .generic_functions
            .get(generic)
            .and_then(|info| first(info.type_params()))
            .or_else(|| {
                self.tables
                    .generic_classes
                    .get(generic)
                    .and_then(|info| first(info.type_params()))
            })
            .unwrap_or_default();
        self.report(
            span,
            SemaError::MissingTypeArgument {
                decl: generic.to_string(),
                param,
            },
        )
    }

    // =========================================================================
    // Operators
    // =========================================================================

    fn apply_binary(&mut self, op: BinaryOp, l: Typed, r: Typed, span: Span) -> SemaResult<Typed> {
        let ty = if op.is_comparison() {
            Type::boolean()
        } else if op == BinaryOp::Add && (l.ty.is_stringish() || r.ty.is_stringish()) {
            Type::string()
        } else {
            for operand in [&l.ty, &r.ty] {
                if !is_arithmetic(operand) {
                    return Err(self.report(
                        span,
                        SemaError::TypeMismatch {
                            expected: Type::number(),
                            found: operand.clone(),
                        },
                    ));
                }
            }
            if op == BinaryOp::Add && (l.ty == Type::Any || r.ty == Type::Any) {
                Type::Any
            } else {
                Type::number()
            }
        };
        let bin = binary_op(op).ok_or_else(|| Failure::Internal(format!("`{:?}` is not a value operator", op)))?;
        self.value(ty, Op::Binary(bin), vec![l.value, r.value], span)
    }

    /// `&&`, `||` and `??` evaluate their right side conditionally.
    fn resolve_logical(
        &mut self,
        left: &Node<Expr>,
        op: BinaryOp,
        right: &Node<Expr>,
        span: Span,
        ctx: &GenContext,
    ) -> SemaResult<Typed> {
        let l = self.resolve_expr(left, &ctx.plain())?;
        let left_ty = match op {
            BinaryOp::NullishCoalesce => l.ty.non_optional(),
            _ => l.ty.clone(),
        };
        let slot = self.result_slot(l.ty.clone(), Some(l.value), span)?;
        let test = match op {
            BinaryOp::NullishCoalesce => {
                let undefined = self.undefined(span)?;
                self.value(Type::boolean(), Op::Binary(BinOp::Ne), vec![l.value, undefined.value], span)?
            }
            _ => l.clone(),
        };

        let mut right_ty = Type::Never;
        let rhs = self.in_region(|this| {
            let r = this.resolve_expr(right, &ctx.plain().with_receiver(ctx.receiver_type.clone()))?;
            right_ty = r.ty.clone();
            this.emit(Op::Store, vec![slot, r.value], span)
        })?;
        let (then_region, else_region) = match op {
            BinaryOp::And => (rhs, tern_ir::Region::new()),
            _ => (tern_ir::Region::new(), rhs),
        };
        self.emit(
            Op::If {
                then_region,
                else_region,
            },
            vec![test.value],
            span,
        )?;
        let ty = merge(&left_ty, &right_ty);
        self.value(ty, Op::Load, vec![slot], span)
    }

    /// Fresh local holding the result of a conditional expression.
    fn result_slot(&mut self, ty: Type, init: Option<ValueId>, span: Span) -> SemaResult<ValueId> {
        let name = self.fresh_temp("t")?;
        let operands = init.into_iter().collect();
        Ok(self.value(ty, Op::Variable { name }, operands, span)?.value)
    }

    fn resolve_ternary(
        &mut self,
        condition: &Node<Expr>,
        then_expr: &Node<Expr>,
        else_expr: &Node<Expr>,
        span: Span,
        ctx: &GenContext,
    ) -> SemaResult<Typed> {
        let cond = self.resolve_expr(condition, &ctx.plain())?;
        let slot = self.result_slot(ctx.receiver_type.clone().unwrap_or(Type::Any), None, span)?;
        let mut types = Vec::with_capacity(2);
        let mut branch = |this: &mut Self, expr: &Node<Expr>| {
            this.in_region(|this| {
                let value = this.resolve_expr(expr, &ctx.plain().with_receiver(ctx.receiver_type.clone()))?;
                types.push(value.ty);
                this.emit(Op::Store, vec![slot, value.value], span)
            })
        };
        let then_region = branch(self, then_expr)?;
        let else_region = branch(self, else_expr)?;
        self.emit(
            Op::If {
                then_region,
                else_region,
            },
            vec![cond.value],
            span,
        )?;
        self.value(merge_all(&types), Op::Load, vec![slot], span)
    }

    fn resolve_unary(&mut self, op: UnaryOp, operand: &Node<Expr>, span: Span, ctx: &GenContext) -> SemaResult<Typed> {
        if op.is_update() {
            return self.resolve_update(op, operand, span, ctx);
        }
        if op == UnaryOp::Void {
            self.resolve_expr(operand, &ctx.plain())?;
            return self.undefined(span);
        }
        let value = self.resolve_expr(operand, &ctx.plain())?;
        let ty = match op {
            UnaryOp::Not => Type::boolean(),
            UnaryOp::TypeOf => Type::string(),
            UnaryOp::Minus => match &value.ty {
                Type::Literal(LiteralValue::Number(n)) => Type::num_lit(-n),
                ty => {
                    self.expect_arithmetic(ty, operand.span)?;
                    Type::number()
                }
            },
            _ => {
                self.expect_arithmetic(&value.ty, operand.span)?;
                Type::number()
            }
        };
        let un = unary_op(op).ok_or_else(|| Failure::Internal(format!("`{:?}` is not a value operator", op)))?;
        self.value(ty, Op::Unary(un), vec![value.value], span)
    }

    /// `++x`, `x--` and friends. Prefix forms yield the new value.
    fn resolve_update(&mut self, op: UnaryOp, target: &Node<Expr>, span: Span, ctx: &GenContext) -> SemaResult<Typed> {
        let place = self.resolve_place(target, span, ctx)?;
        self.expect_arithmetic(&place.ty, target.span)?;
        let old = self.value(place.ty.clone(), Op::Load, vec![place.slot], span)?;
        let one = self.constant(Constant::Number(1.0), Type::number(), span)?;
        let bin = match op {
            UnaryOp::PreIncrement | UnaryOp::PostIncrement => BinOp::Add,
            _ => BinOp::Sub,
        };
        let new = self.value(Type::number(), Op::Binary(bin), vec![old.value, one.value], span)?;
        self.check_assignable(&new.ty, &place.ty, span)?;
        self.emit(Op::Store, vec![place.slot, new.value], span)?;
        match op {
            UnaryOp::PreIncrement | UnaryOp::PreDecrement => Ok(new),
            _ => Ok(old),
        }
    }

    fn expect_arithmetic(&mut self, ty: &Type, span: Span) -> SemaResult<()> {
        if is_arithmetic(ty) {
            return Ok(());
        }
        Err(self.report(
            span,
            SemaError::TypeMismatch {
                expected: Type::number(),
                found: ty.clone(),
            },
        ))
    }

    // =========================================================================
    // Places and assignment
    // =========================================================================

    fn resolve_assignment(
        &mut self,
        target: &Node<Expr>,
        op: AssignmentOp,
        value: &Node<Expr>,
        span: Span,
        ctx: &GenContext,
    ) -> SemaResult<Typed> {
        let place = self.resolve_place(target, span, ctx)?;
        let assigned = match op.binary_op() {
            None => self.resolve_expr(value, &ctx.plain().with_receiver(Some(place.ty.clone())))?,
            Some(bin) => {
                let current = self.value(place.ty.clone(), Op::Load, vec![place.slot], span)?;
                let rhs = self.resolve_expr(value, &ctx.plain())?;
                self.apply_binary(bin, current, rhs, span)?
            }
        };
        self.check_assignable(&assigned.ty, &place.ty, value.span)?;
        self.emit(Op::Store, vec![place.slot, assigned.value], span)?;
        Ok(assigned)
    }

    fn resolve_place(&mut self, target: &Node<Expr>, span: Span, ctx: &GenContext) -> SemaResult<Place> {
        let place = match &target.value {
            Expr::Paren(inner) => return self.resolve_place(inner, span, ctx),
            Expr::Ident(ident) => match self.lookup_name(&ident.name) {
                Some(ScopeEntry::Variable(info)) => self.variable_place(&info, span, ctx)?,
                Some(ScopeEntry::Declaration(_)) => {
                    return Err(self.report(target.span, SemaError::InvalidAssignmentTarget));
                }
                None => {
                    return Err(self.defer_or_report(
                        ctx,
                        target.span,
                        DeferReason::UnresolvedName(ident.name.clone()),
                        SemaError::UndefinedVariable(ident.name.clone()),
                    ));
                }
            },
            Expr::Member { object, property } => match self.static_target(object) {
                Some(decl) => self.static_place(decl, &property.value.name, target.span, ctx)?,
                None => {
                    let receiver = self.resolve_expr(object, &ctx.plain())?;
                    self.member_place(receiver, &property.value.name, target.span, ctx)?
                }
            },
            Expr::Index { object, index } => self.index_place(object, index, target.span, ctx)?,
            _ => return Err(self.report(target.span, SemaError::InvalidAssignmentTarget)),
        };
        if let Some(owner) = &place.readonly {
            let constructor = format!("{}.constructor", owner);
            if self.frame()?.name != constructor {
                let name = match &target.value {
                    Expr::Member { property, .. } => property.value.name.clone(),
                    _ => owner.clone(),
                };
                return Err(self.report(target.span, SemaError::AssignToConst(name)));
            }
        }
        Ok(place)
    }

    fn variable_place(&mut self, info: &VariableInfo, span: Span, ctx: &GenContext) -> SemaResult<Place> {
        if info.is_const {
            return Err(self.report(span, SemaError::AssignToConst(info.name.clone())));
        }
        let slot = self.variable_slot(info, span, ctx)?;
        Ok(Place::writable(slot, info.ty.clone()))
    }

    /// Assignable static member: a namespace variable or a static field.
    fn static_place(&mut self, target: DeclRef, name: &str, span: Span, ctx: &GenContext) -> SemaResult<Place> {
        match &target {
            DeclRef::Namespace(ns) => match self.tables.lookup_in(ns, name) {
                Some(ScopeEntry::Variable(info)) => self.variable_place(&info, span, ctx),
                Some(ScopeEntry::Declaration(_)) => Err(self.report(span, SemaError::InvalidAssignmentTarget)),
                None => {
                    let full = qualify(ns, name);
                    Err(self.defer_or_report(
                        ctx,
                        span,
                        DeferReason::UnresolvedName(full.clone()),
                        SemaError::UndefinedVariable(full),
                    ))
                }
            },
            DeclRef::Class(full) => {
                let record = self.ensure_class(full, ctx)?;
                let field = record.field(name).filter(|f| f.is_static).cloned();
                let Some(field) = field else {
                    return Err(self.report(span, SemaError::InvalidAssignmentTarget));
                };
                let global = qualify(&field.owner, name);
                let slot = self.value(field.ty.clone(), Op::GlobalRef { name: global }, Vec::new(), span)?;
                Ok(Place {
                    slot: slot.value,
                    ty: field.ty,
                    readonly: field.is_readonly.then(|| field.owner.clone()),
                })
            }
            _ => Err(self.report(span, SemaError::InvalidAssignmentTarget)),
        }
    }

    // =========================================================================
    // Static paths
    // =========================================================================

    /// The namespace, class or enum an expression names, if any.
    fn static_target(&self, expr: &Node<Expr>) -> Option<DeclRef> {
        let decl = match &expr.value {
            Expr::Ident(ident) => match self.lookup_name(&ident.name)? {
                ScopeEntry::Declaration(decl) => decl,
                ScopeEntry::Variable(_) => return None,
            },
            Expr::Member { object, property } => match self.static_target(object)? {
                DeclRef::Namespace(ns) => match self.tables.lookup_in(&ns, &property.value.name)? {
                    ScopeEntry::Declaration(decl) => decl,
                    ScopeEntry::Variable(_) => return None,
                },
                _ => return None,
            },
            Expr::Paren(inner) => return self.static_target(inner),
            _ => return None,
        };
        match decl {
            DeclRef::Namespace(_) | DeclRef::Class(_) | DeclRef::GenericClass(_) | DeclRef::Enum(_) => Some(decl),
            _ => None,
        }
    }

    fn resolve_static_member(&mut self, target: DeclRef, name: &str, span: Span, ctx: &GenContext) -> SemaResult<Typed> {
        match &target {
            DeclRef::Namespace(ns) => match self.tables.lookup_in(ns, name) {
                Some(ScopeEntry::Variable(info)) => {
                    let slot = self.variable_slot(&info, span, ctx)?;
                    self.value(info.ty.clone(), Op::Load, vec![slot], span)
                }
                Some(ScopeEntry::Declaration(DeclRef::Function(full))) => self.function_value(&full, span, ctx),
                Some(ScopeEntry::Declaration(DeclRef::GenericFunction(full))) => {
                    Err(self.missing_type_argument(&full, span))
                }
                _ => {
                    let full = qualify(ns, name);
                    Err(self.defer_or_report(
                        ctx,
                        span,
                        DeferReason::UnresolvedName(full.clone()),
                        SemaError::UndefinedVariable(full),
                    ))
                }
            },
            DeclRef::Enum(full) => {
                let ty = self.ensure_enum(full, ctx)?;
                let member = self.tables.enums.get(full).and_then(|record| record.member(name)).cloned();
                match member {
                    Some(lit) => {
                        let constant = constant_of(&lit);
                        self.constant(constant, Type::Literal(lit), span)
                    }
                    None => Err(self.report(
                        span,
                        SemaError::PropertyNotFound {
                            ty,
                            property: name.to_string(),
                        },
                    )),
                }
            }
            DeclRef::Class(full) => {
                let record = self.ensure_class(full, ctx)?;
                if let Some(field) = record.field(name).filter(|f| f.is_static) {
                    let global = qualify(&field.owner, name);
                    let ty = field.ty.clone();
                    let slot = self.value(ty.clone(), Op::GlobalRef { name: global }, Vec::new(), span)?;
                    return self.value(ty, Op::Load, vec![slot.value], span);
                }
                match record.method(name).filter(|m| m.is_static).cloned() {
                    Some(method) if method.generic => Err(self.missing_type_argument(&method.function, span)),
                    Some(method) => self.function_value(&method.function, span, ctx),
                    None => Err(self.report(
                        span,
                        SemaError::PropertyNotFound {
                            ty: record.ty(),
                            property: name.to_string(),
                        },
                    )),
                }
            }
            DeclRef::GenericClass(full) => Err(self.missing_type_argument(full, span)),
            other => Err(self.report(
                span,
                SemaError::UndefinedVariable(qualify(other.full_name(), name)),
            )),
        }
    }

    // =========================================================================
    // Members and indexing
    // =========================================================================

    fn resolve_member(&mut self, object: &Node<Expr>, name: &str, span: Span, ctx: &GenContext) -> SemaResult<Typed> {
        if let Some(target) = self.static_target(object) {
            return self.resolve_static_member(target, name, span, ctx);
        }
        let receiver = self.resolve_expr(object, &ctx.plain())?;
        if name == "length" {
            let ty = receiver.ty.non_optional();
            if ty.is_stringish() || matches!(ty, Type::Array(_) | Type::ConstArray(..)) {
                return self.length_of(receiver.value, span);
            }
        }
        let place = self.member_place(receiver, name, span, ctx)?;
        self.value(place.ty, Op::Load, vec![place.slot], span)
    }

    /// Slot of an instance member of `receiver`.
    fn member_place(&mut self, receiver: Typed, name: &str, span: Span, ctx: &GenContext) -> SemaResult<Place> {
        let receiver_ty = receiver.ty.non_optional();
        let (ty, readonly) = match &receiver_ty {
            Type::Class(named) => {
                let record = self.ensure_class(&named.name, ctx)?;
                match record.field(name).filter(|f| !f.is_static) {
                    Some(field) => (field.ty.clone(), field.is_readonly.then(|| field.owner.clone())),
                    // Members of a class under layout appear as it progresses.
                    None if record.state == DeclState::Processing => {
                        return Err(Failure::Deferred(DeferReason::UnresolvedName(qualify(
                            &named.name,
                            name,
                        ))));
                    }
                    None => return Err(self.property_not_found(receiver_ty.clone(), name, span)),
                }
            }
            Type::Interface(named) => {
                self.ensure_interface(&named.name, ctx)?;
                let member = self
                    .tables
                    .interfaces
                    .get(&named.name)
                    .and_then(|record| record.member(name))
                    .cloned();
                match member {
                    Some(member) if member.optional => (Type::optional(member.ty), None),
                    Some(member) => (member.ty, None),
                    None => return Err(self.property_not_found(receiver_ty.clone(), name, span)),
                }
            }
            Type::Tuple(_) | Type::ConstTuple(_) => match receiver_ty.field(name) {
                Some(ty) => (ty.clone(), None),
                None => return Err(self.property_not_found(receiver_ty.clone(), name, span)),
            },
            Type::Any => (Type::Any, None),
            Type::Never => (Type::Never, None),
            _ => return Err(self.property_not_found(receiver_ty.clone(), name, span)),
        };
        let slot = self.value(
            ty.clone(),
            Op::FieldRef {
                name: name.to_string(),
            },
            vec![receiver.value],
            span,
        )?;
        Ok(Place {
            slot: slot.value,
            ty,
            readonly,
        })
    }

    fn property_not_found(&mut self, ty: Type, name: &str, span: Span) -> Failure {
        self.report(
            span,
            SemaError::PropertyNotFound {
                ty,
                property: name.to_string(),
            },
        )
    }

    fn index_place(&mut self, object: &Node<Expr>, index: &Node<Expr>, span: Span, ctx: &GenContext) -> SemaResult<Place> {
        let target = self.resolve_expr(object, &ctx.plain())?;
        let key = self.resolve_expr(index, &ctx.plain())?;
        if !is_arithmetic(&key.ty) && !key.ty.is_stringish() {
            return Err(self.report(
                index.span,
                SemaError::TypeMismatch {
                    expected: Type::number(),
                    found: key.ty.clone(),
                },
            ));
        }
        let target_ty = target.ty.non_optional();
        let ty = match &target_ty {
            Type::Any => Type::Any,
            Type::Never => Type::Never,
            ty if ty.is_stringish() => Type::string(),
            Type::Array(elem) | Type::ConstArray(elem, _) => (**elem).clone(),
            Type::Tuple(fields) | Type::ConstTuple(fields) => match &key.ty {
                Type::Literal(LiteralValue::Number(n)) if *n >= 0.0 && n.fract() == 0.0 => {
                    match fields.get(*n as usize) {
                        Some(field) => field.ty.clone(),
                        None => return Err(self.property_not_found(target_ty.clone(), &n.to_string(), index.span)),
                    }
                }
                Type::Literal(LiteralValue::String(s)) => match target_ty.field(s) {
                    Some(ty) => ty.clone(),
                    None => return Err(self.property_not_found(target_ty.clone(), s, index.span)),
                },
                _ => merge_all(fields.iter().map(|f| &f.ty)),
            },
            _ => {
                return Err(self.report(
                    object.span,
                    SemaError::TypeMismatch {
                        expected: Type::array(Type::Any),
                        found: target.ty.clone(),
                    },
                ));
            }
        };
        let slot = self.value(ty.clone(), Op::ElementRef, vec![target.value, key.value], span)?;
        Ok(Place::writable(slot.value, ty))
    }

    /// Type of member `name` of `ty`, for contextual typing.
    fn member_type(&self, ty: &Type, name: &str) -> Option<Type> {
        match ty {
            Type::Tuple(_) | Type::ConstTuple(_) => ty.field(name).cloned(),
            Type::Class(_) | Type::Interface(_) => self
                .tables
                .members(ty)?
                .into_iter()
                .find(|m| m.name == name)
                .map(|m| m.ty),
            _ => None,
        }
    }

    // =========================================================================
    // Calls
    // =========================================================================

    fn resolve_call(
        &mut self,
        callee: &Node<Expr>,
        type_args: Option<&[Node<ast::Type>]>,
        args: &[Node<Expr>],
        span: Span,
        ctx: &GenContext,
    ) -> SemaResult<Typed> {
        match &callee.value {
            Expr::Super => self.resolve_super_call(args, span, ctx),
            Expr::Paren(inner) if !matches!(inner.value, Expr::Member { .. }) => {
                self.resolve_call(inner, type_args, args, span, ctx)
            }
            Expr::Member { object, property } => {
                self.resolve_method_call(object, &property.value.name, type_args, args, span, ctx)
            }
            Expr::Ident(ident) => match self.lookup_name(&ident.name) {
                Some(ScopeEntry::Declaration(DeclRef::Function(full))) => {
                    self.reject_type_args(&full, type_args.is_some(), span)?;
                    self.call_function(&full, None, args, span, ctx)
                }
                Some(ScopeEntry::Declaration(DeclRef::GenericFunction(full))) => {
                    self.resolve_generic_call(&full, type_args, None, args, span, ctx)
                }
                Some(ScopeEntry::Declaration(decl)) => Err(self.not_callable(&decl, span)),
                Some(ScopeEntry::Variable(_)) => {
                    self.reject_type_args(&ident.name, type_args.is_some(), span)?;
                    self.call_value(callee, args, span, ctx)
                }
                None => Err(self.defer_or_report(
                    ctx,
                    span,
                    DeferReason::UnresolvedName(ident.name.clone()),
                    SemaError::UndefinedVariable(ident.name.clone()),
                )),
            },
            _ => self.call_value(callee, args, span, ctx),
        }
    }

    fn not_callable(&mut self, decl: &DeclRef, span: Span) -> Failure {
        match decl {
            DeclRef::Class(full) | DeclRef::GenericClass(full) => {
                self.report(span, SemaError::NotCallable(Type::class(full.clone())))
            }
            other => self.report(span, SemaError::UndefinedVariable(other.full_name().to_string())),
        }
    }

    /// Calls a named function. A capturing function called without a
    /// receiver goes through its closure value.
    pub(crate) fn call_function(
        &mut self,
        full: &str,
        this: Option<ValueId>,
        args: &[Node<Expr>],
        span: Span,
        ctx: &GenContext,
    ) -> SemaResult<Typed> {
        let proto = self.ensure_callee(full, span, ctx)?;
        let ft = proto.function_type();
        let callee = if this.is_none() && !proto.captures.is_empty() {
            Callee::Indirect(self.closure_value(full, &proto, span, ctx)?.value)
        } else {
            Callee::Direct(full.to_string())
        };
        self.finish_call(callee, full, &ft, this, args, vec![None; args.len()], span, ctx)
    }

    fn call_value(&mut self, callee: &Node<Expr>, args: &[Node<Expr>], span: Span, ctx: &GenContext) -> SemaResult<Typed> {
        let function = self.resolve_expr(callee, &ctx.plain())?;
        self.call_typed(function, &describe(callee), args, span, ctx)
    }

    fn call_typed(
        &mut self,
        function: Typed,
        name: &str,
        args: &[Node<Expr>],
        span: Span,
        ctx: &GenContext,
    ) -> SemaResult<Typed> {
        match function.ty.non_optional() {
            Type::Function(ft) => self.finish_call(
                Callee::Indirect(function.value),
                name,
                &ft,
                None,
                args,
                vec![None; args.len()],
                span,
                ctx,
            ),
            ty @ (Type::Any | Type::Never) => {
                let mut operands = vec![function.value];
                for arg in args {
                    let arg = match &arg.value {
                        Expr::Spread(inner) => inner.as_ref(),
                        _ => arg,
                    };
                    operands.push(self.resolve_expr(arg, &ctx.plain())?.value);
                }
                self.value(ty, Op::CallIndirect, operands, span)
            }
            other => Err(self.report(span, SemaError::NotCallable(other))),
        }
    }

    fn resolve_method_call(
        &mut self,
        object: &Node<Expr>,
        name: &str,
        type_args: Option<&[Node<ast::Type>]>,
        args: &[Node<Expr>],
        span: Span,
        ctx: &GenContext,
    ) -> SemaResult<Typed> {
        if let Some(target) = self.static_target(object) {
            return self.resolve_static_call(target, name, type_args, args, span, ctx);
        }
        if matches!(object.value, Expr::Super) {
            return self.resolve_super_method_call(name, type_args, args, span, ctx);
        }

        let receiver = self.resolve_expr(object, &ctx.plain())?;
        match receiver.ty.non_optional() {
            Type::Class(named) => {
                let record = self.ensure_class(&named.name, ctx)?;
                if let Some(method) = record.method(name).filter(|m| !m.is_static).cloned() {
                    if method.generic {
                        return self.resolve_generic_call(&method.function, type_args, Some(receiver), args, span, ctx);
                    }
                    self.reject_type_args(&method.function, type_args.is_some(), span)?;
                    let proto = self.ensure_callee(&method.function, span, ctx)?;
                    let callee = match record.vtable.iter().position(|(n, _)| n == name) {
                        Some(slot) => Callee::Virtual {
                            method: name.to_string(),
                            slot,
                        },
                        None => Callee::Direct(method.function.clone()),
                    };
                    return self.finish_call(
                        callee,
                        &method.function,
                        &proto.function_type(),
                        Some(receiver.value),
                        args,
                        vec![None; args.len()],
                        span,
                        ctx,
                    );
                }
            }
            Type::Interface(named) => {
                self.ensure_interface(&named.name, ctx)?;
                let member = self
                    .tables
                    .interfaces
                    .get(&named.name)
                    .and_then(|record| record.member(name))
                    .cloned();
                if let Some(Type::Function(ft)) = member.as_ref().filter(|m| !m.optional).map(|m| m.ty.clone()) {
                    return self.finish_call(
                        Callee::Interface {
                            interface: named.name.clone(),
                            method: name.to_string(),
                        },
                        name,
                        &ft,
                        Some(receiver.value),
                        args,
                        vec![None; args.len()],
                        span,
                        ctx,
                    );
                }
            }
            _ => {}
        }

        // Function-valued fields and properties of `any`.
        let place = self.member_place(receiver, name, span, ctx)?;
        let function = self.value(place.ty, Op::Load, vec![place.slot], span)?;
        self.call_typed(function, name, args, span, ctx)
    }

    fn resolve_static_call(
        &mut self,
        target: DeclRef,
        name: &str,
        type_args: Option<&[Node<ast::Type>]>,
        args: &[Node<Expr>],
        span: Span,
        ctx: &GenContext,
    ) -> SemaResult<Typed> {
        match &target {
            DeclRef::Namespace(ns) => match self.tables.lookup_in(ns, name) {
                Some(ScopeEntry::Declaration(DeclRef::Function(full))) => {
                    self.reject_type_args(&full, type_args.is_some(), span)?;
                    self.call_function(&full, None, args, span, ctx)
                }
                Some(ScopeEntry::Declaration(DeclRef::GenericFunction(full))) => {
                    self.resolve_generic_call(&full, type_args, None, args, span, ctx)
                }
                Some(ScopeEntry::Declaration(decl)) => Err(self.not_callable(&decl, span)),
                _ => {
                    let function = self.resolve_static_member(target.clone(), name, span, ctx)?;
                    self.call_typed(function, name, args, span, ctx)
                }
            },
            DeclRef::Class(full) => {
                let record = self.ensure_class(full, ctx)?;
                match record.method(name).filter(|m| m.is_static).cloned() {
                    Some(method) if method.generic => {
                        self.resolve_generic_call(&method.function, type_args, None, args, span, ctx)
                    }
                    Some(method) => {
                        self.reject_type_args(&method.function, type_args.is_some(), span)?;
                        self.call_function(&method.function, None, args, span, ctx)
                    }
                    None => {
                        let function = self.resolve_static_member(target.clone(), name, span, ctx)?;
                        self.call_typed(function, name, args, span, ctx)
                    }
                }
            }
            _ => {
                let function = self.resolve_static_member(target.clone(), name, span, ctx)?;
                self.call_typed(function, name, args, span, ctx)
            }
        }
    }

    /// Base class of the class whose member is being resolved.
    fn base_class(&mut self, span: Span) -> SemaResult<String> {
        let base = self
            .frame()?
            .this_class
            .as_ref()
            .and_then(|class| self.tables.classes.get(class))
            .and_then(|record| record.base.clone());
        match base {
            Some(base) => Ok(base),
            None => Err(self.report(span, SemaError::UndefinedVariable("super".to_string()))),
        }
    }

    fn resolve_super_call(&mut self, args: &[Node<Expr>], span: Span, ctx: &GenContext) -> SemaResult<Typed> {
        let base = self.base_class(span)?;
        let record = self.ensure_class(&base, ctx)?;
        let constructor = record
            .constructor
            .clone()
            .ok_or_else(|| Failure::Internal(format!("`{}` has no constructor", base)))?;
        let this = self.resolve_ident("this", span, ctx)?;
        self.call_function(&constructor, Some(this.value), args, span, ctx)
    }

    /// `super.m()` calls the base implementation directly.
    fn resolve_super_method_call(
        &mut self,
        name: &str,
        type_args: Option<&[Node<ast::Type>]>,
        args: &[Node<Expr>],
        span: Span,
        ctx: &GenContext,
    ) -> SemaResult<Typed> {
        let base = self.base_class(span)?;
        let record = self.ensure_class(&base, ctx)?;
        let Some(method) = record.method(name).filter(|m| !m.is_static).cloned() else {
            return Err(self.property_not_found(record.ty(), name, span));
        };
        let this = self.resolve_ident("this", span, ctx)?;
        if method.generic {
            return self.resolve_generic_call(&method.function, type_args, Some(this), args, span, ctx);
        }
        self.reject_type_args(&method.function, type_args.is_some(), span)?;
        self.call_function(&method.function, Some(this.value), args, span, ctx)
    }

    /// Checks arity and argument types against `ft` and emits the call.
    /// `pre` holds arguments already resolved during inference.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn finish_call(
        &mut self,
        callee: Callee,
        name: &str,
        ft: &FunctionType,
        this: Option<ValueId>,
        args: &[Node<Expr>],
        mut pre: Vec<Option<Typed>>,
        span: Span,
        ctx: &GenContext,
    ) -> SemaResult<Typed> {
        let spread = args.iter().any(|arg| matches!(arg.value, Expr::Spread(_)));
        let fixed = if ft.variadic {
            ft.params.len().saturating_sub(1)
        } else {
            ft.params.len()
        };
        if !spread {
            let min = ft.min_arity();
            let expected = if args.len() < min {
                Some(min)
            } else if !ft.variadic && args.len() > fixed {
                Some(fixed)
            } else {
                None
            };
            if let Some(expected) = expected {
                return Err(self.report(
                    span,
                    SemaError::ArityMismatch {
                        name: name.to_string(),
                        expected,
                        found: args.len(),
                    },
                ));
            }
        }

        let mut operands = Vec::with_capacity(args.len() + 2);
        if let Callee::Indirect(function) = &callee {
            operands.push(*function);
        }
        operands.extend(this);
        let rest_ty = if ft.variadic { ft.params.last().cloned() } else { None };
        let mut rest = Vec::new();
        let mut rest_array = None;

        for (i, arg) in args.iter().enumerate() {
            let in_rest = ft.variadic && i >= fixed;
            if let Expr::Spread(inner) = &arg.value {
                let value = self.resolve_expr(inner, &ctx.plain())?;
                if in_rest && rest.is_empty() && rest_array.is_none() {
                    rest_array = Some(value.value);
                } else {
                    operands.push(value.value);
                }
                continue;
            }
            let expected = if in_rest {
                rest_ty.as_ref().and_then(Type::element).cloned()
            } else {
                ft.params.get(i).cloned()
            };
            let value = match pre.get_mut(i).and_then(Option::take) {
                Some(value) => value,
                None => {
                    let receiver = expected.as_ref().map(Type::non_optional);
                    self.resolve_expr(arg, &ctx.plain().with_receiver(receiver))?
                }
            };
            if let Some(expected) = &expected {
                self.check_assignable(&value.ty, expected, arg.span)?;
            }
            if in_rest {
                rest.push(value.value);
            } else {
                operands.push(value.value);
            }
        }
        if !spread {
            for _ in args.len()..fixed {
                operands.push(self.undefined(span)?.value);
            }
        }
        if let Some(rest_ty) = rest_ty {
            match rest_array {
                Some(array) => operands.push(array),
                None => operands.push(self.value(rest_ty, Op::MakeArray, rest, span)?.value),
            }
        }

        let result = (*ft.result).clone();
        let op = match callee {
            Callee::Direct(function) => Op::Call { function },
            Callee::Indirect(_) => Op::CallIndirect,
            Callee::Virtual { method, slot } => Op::VirtualCall { method, slot },
            Callee::Interface { interface, method } => Op::InterfaceCall { interface, method },
        };
        tracing::trace!(callee = name, result = %result, "call");
        self.value(result, op, operands, span)
    }

    // =========================================================================
    // Literals and `new`
    // =========================================================================

    fn resolve_array(&mut self, elements: &[Node<Expr>], span: Span, ctx: &GenContext) -> SemaResult<Typed> {
        let expected = ctx.receiver_type.as_ref().map(Type::non_optional);
        let element_receiver = expected.as_ref().and_then(Type::element).cloned();
        let mut values = Vec::with_capacity(elements.len());
        let mut types = Vec::with_capacity(elements.len());
        for element in elements {
            let value = self.resolve_expr(element, &ctx.plain().with_receiver(element_receiver.clone()))?;
            values.push(value.value);
            types.push(value.ty);
        }
        let ty = if types.is_empty() {
            match expected {
                Some(ty @ Type::Array(_)) => ty,
                _ => Type::array(Type::Any),
            }
        } else if types.iter().all(Type::is_literal) {
            Type::ConstArray(Box::new(merge_all(&types)), types.len())
        } else {
            Type::array(widen(&merge_all(&types)))
        };
        self.value(ty, Op::MakeArray, values, span)
    }

    /// Object literals are named tuples. Field types widen unless the
    /// contextual type gives the field a type.
    fn resolve_object(&mut self, properties: &[ObjectProperty], span: Span, ctx: &GenContext) -> SemaResult<Typed> {
        let expected = ctx.receiver_type.as_ref().map(Type::non_optional);
        let mut fields: Vec<Field> = Vec::with_capacity(properties.len());
        let mut values: Vec<ValueId> = Vec::with_capacity(properties.len());
        for property in properties {
            match property {
                ObjectProperty::Property { key, value, .. } => {
                    let name = key.as_string();
                    let receiver = expected.as_ref().and_then(|ty| self.member_type(ty, &name));
                    let contextual = receiver.is_some();
                    let typed = self.resolve_expr(value, &ctx.plain().with_receiver(receiver))?;
                    let ty = if contextual { typed.ty } else { widen(&typed.ty) };
                    set_field(&mut fields, &mut values, name, ty, typed.value);
                }
                ObjectProperty::Spread(source) => {
                    let typed = self.resolve_expr(source, &ctx.plain())?;
                    let (Type::Tuple(source_fields) | Type::ConstTuple(source_fields)) = typed.ty.non_optional() else {
                        return Err(self.report(
                            source.span,
                            SemaError::TypeMismatch {
                                expected: Type::object(Vec::new()),
                                found: typed.ty.clone(),
                            },
                        ));
                    };
                    for field in source_fields {
                        let Some(name) = field.name else { continue };
                        let slot = self.value(field.ty.clone(), Op::FieldRef { name: name.clone() }, vec![typed.value], span)?;
                        let loaded = self.value(field.ty.clone(), Op::Load, vec![slot.value], span)?;
                        set_field(&mut fields, &mut values, name, field.ty, loaded.value);
                    }
                }
            }
        }
        let names = fields.iter().map(|f| f.name.clone()).collect();
        self.value(Type::Tuple(fields), Op::MakeTuple { names }, values, span)
    }

    fn resolve_new(
        &mut self,
        callee: &Node<Expr>,
        type_args: Option<&[Node<ast::Type>]>,
        args: &[Node<Expr>],
        span: Span,
        ctx: &GenContext,
    ) -> SemaResult<Typed> {
        if let Expr::Ident(ident) = &callee.value {
            if self.lookup_name(&ident.name).is_none() {
                return Err(self.defer_or_report(
                    ctx,
                    span,
                    DeferReason::UnresolvedName(ident.name.clone()),
                    SemaError::UndefinedVariable(ident.name.clone()),
                ));
            }
        }
        let class = match self.static_target(callee) {
            Some(DeclRef::Class(full)) => {
                self.reject_type_args(&full, type_args.is_some(), span)?;
                full
            }
            Some(DeclRef::GenericClass(generic)) => {
                let spec = match type_args {
                    Some(type_args) => {
                        let mut explicit = Vec::with_capacity(type_args.len());
                        for arg in type_args {
                            explicit.push(self.resolve_type(arg, &ctx.plain())?);
                        }
                        self.specialize_class(&generic, explicit, span, ctx)?
                    }
                    None => {
                        let operands = self.operand_types(args, ctx)?;
                        self.infer_class_args(&generic, &operands, span, ctx)?
                    }
                };
                spec.key.clone()
            }
            _ => return Err(self.report(span, SemaError::NotConstructible(describe(callee)))),
        };

        let record = self.ensure_class(&class, ctx)?;
        if record.decl.is_abstract {
            return Err(self.report(span, SemaError::NotConstructible(class)));
        }
        let object = self.value(record.ty(), Op::New { class: class.clone() }, Vec::new(), span)?;
        if let Some(aggregate_ty) = record.captures.aggregate_type() {
            let names = record.captures.names();
            let mut slots = Vec::with_capacity(names.len());
            for name in &names {
                let info = self.scopes.lookup_variable(name).cloned().ok_or_else(|| {
                    Failure::Internal(format!("captured variable `{}` of `{}` is not in scope", name, class))
                })?;
                slots.push(self.variable_slot(&info, span, ctx)?);
            }
            let aggregate = self.value(
                aggregate_ty.clone(),
                Op::MakeTuple {
                    names: names.into_iter().map(Some).collect(),
                },
                slots,
                span,
            )?;
            let field = self.value(
                aggregate_ty,
                Op::FieldRef {
                    name: "captures".to_string(),
                },
                vec![object.value],
                span,
            )?;
            self.emit(Op::Store, vec![field.value, aggregate.value], span)?;
        }
        let constructor = record
            .constructor
            .clone()
            .ok_or_else(|| Failure::Internal(format!("`{}` has no constructor", class)))?;
        self.call_function(&constructor, Some(object.value), args, span, ctx)?;
        Ok(object)
    }

    /// Argument types for inference, without keeping any IR.
    fn operand_types(&mut self, args: &[Node<Expr>], ctx: &GenContext) -> SemaResult<Vec<Type>> {
        let mut types = Vec::with_capacity(args.len());
        for arg in args {
            let ty = match &arg.value {
                Expr::Spread(_) => Type::Never,
                _ if is_function_literal(arg) => self.function_literal_type(arg, &ctx.params_only())?,
                _ => self.probe_type(arg, &ctx.plain())?,
            };
            types.push(ty);
        }
        Ok(types)
    }
}

/// Numbers and the types that defer judgement.
fn is_arithmetic(ty: &Type) -> bool {
    ty.is_numeric() || matches!(ty, Type::Any | Type::Never)
}

fn binary_op(op: BinaryOp) -> Option<BinOp> {
    Some(match op {
        BinaryOp::Add => BinOp::Add,
        BinaryOp::Sub => BinOp::Sub,
        BinaryOp::Mul => BinOp::Mul,
        BinaryOp::Div => BinOp::Div,
        BinaryOp::Mod => BinOp::Mod,
        BinaryOp::Pow => BinOp::Pow,
        BinaryOp::Eq | BinaryOp::StrictEq => BinOp::Eq,
        BinaryOp::NotEq | BinaryOp::StrictNotEq => BinOp::Ne,
        BinaryOp::Lt => BinOp::Lt,
        BinaryOp::LtEq => BinOp::Le,
        BinaryOp::Gt => BinOp::Gt,
        BinaryOp::GtEq => BinOp::Ge,
        BinaryOp::BitAnd => BinOp::BitAnd,
        BinaryOp::BitOr => BinOp::BitOr,
        BinaryOp::BitXor => BinOp::BitXor,
        BinaryOp::LeftShift => BinOp::Shl,
        BinaryOp::RightShift => BinOp::Shr,
        BinaryOp::InstanceOf => BinOp::InstanceOf,
        BinaryOp::And | BinaryOp::Or | BinaryOp::NullishCoalesce => return None,
    })
}

fn unary_op(op: UnaryOp) -> Option<UnOp> {
    match op {
        UnaryOp::Minus => Some(UnOp::Neg),
        UnaryOp::Plus => Some(UnOp::Plus),
        UnaryOp::Not => Some(UnOp::Not),
        UnaryOp::BitNot => Some(UnOp::BitNot),
        UnaryOp::TypeOf => Some(UnOp::TypeOf),
        _ => None,
    }
}

fn constant_of(lit: &LiteralValue) -> Constant {
    match lit {
        LiteralValue::Number(n) => Constant::Number(*n),
        LiteralValue::String(s) => Constant::String(s.clone()),
        LiteralValue::Boolean(b) => Constant::Boolean(*b),
    }
}

fn set_field(fields: &mut Vec<Field>, values: &mut Vec<ValueId>, name: String, ty: Type, value: ValueId) {
    match fields.iter().position(|f| f.name.as_deref() == Some(name.as_str())) {
        Some(i) => {
            fields[i].ty = ty;
            values[i] = value;
        }
        None => {
            fields.push(Field::named(name, ty));
            values.push(value);
        }
    }
}

/// Short source-like rendering of a callee for diagnostics.
fn describe(expr: &Node<Expr>) -> String {
    match &expr.value {
        Expr::Ident(ident) => ident.name.clone(),
        Expr::Member { object, property } => format!("{}.{}", describe(object), property.value.name),
        Expr::Paren(inner) => describe(inner),
        Expr::This => "this".to_string(),
        _ => "expression".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::FnFrame;
    use tern_ast::build::*;
    use tern_ir::IrFunction;

    fn in_function(r: &mut Resolver, name: &str) -> GenContext {
        r.builder.begin_function(IrFunction::new(name, Vec::new(), Type::void()));
        r.frames.push(FnFrame::new(name, CaptureLayout::None, Some(Type::void())));
        r.scopes.push();
        GenContext::new().in_function(name)
    }

    fn ty_of(r: &mut Resolver, ctx: &GenContext, expr: Node<Expr>) -> Type {
        r.resolve_expr(&expr, ctx).unwrap().ty
    }

    #[test]
    fn test_string_concatenation_and_arithmetic() {
        let mut r = Resolver::default();
        let ctx = in_function(&mut r, "f");
        assert_eq!(
            ty_of(&mut r, &ctx, binary(string("a"), BinaryOp::Add, num(1.0))),
            Type::string()
        );
        assert_eq!(
            ty_of(&mut r, &ctx, binary(num(2.0), BinaryOp::Mul, num(3.0))),
            Type::number()
        );
        assert_eq!(
            ty_of(&mut r, &ctx, binary(num(2.0), BinaryOp::Lt, num(3.0))),
            Type::boolean()
        );
    }

    #[test]
    fn test_arithmetic_on_boolean_is_reported() {
        let mut r = Resolver::default();
        let ctx = in_function(&mut r, "f");
        let result = r.resolve_expr(&binary(boolean(true), BinaryOp::Sub, num(1.0)), &ctx);
        assert_eq!(result, Err(Failure::Reported));
        assert!(matches!(r.diagnostics()[0].kind, SemaError::TypeMismatch { .. }));
    }

    #[test]
    fn test_negated_literal_stays_literal() {
        let mut r = Resolver::default();
        let ctx = in_function(&mut r, "f");
        assert_eq!(
            ty_of(&mut r, &ctx, unary(UnaryOp::Minus, num(4.0))),
            Type::num_lit(-4.0)
        );
    }

    #[test]
    fn test_nullish_coalescing_drops_undefined() {
        let mut r = Resolver::default();
        let ctx = in_function(&mut r, "f");
        let maybe = Type::optional(Type::number());
        let slot = r.undefined(Span::default()).unwrap();
        let info = VariableInfo::local("m", maybe, slot.value, "f");
        r.scopes.declare("m", ScopeEntry::Variable(info));
        assert_eq!(
            ty_of(&mut r, &ctx, binary(ident("m"), BinaryOp::NullishCoalesce, num(0.0))),
            Type::number()
        );
    }

    #[test]
    fn test_literal_arrays_are_const() {
        let mut r = Resolver::default();
        let ctx = in_function(&mut r, "f");
        let ty = ty_of(&mut r, &ctx, array(vec![num(1.0), num(2.0)]));
        assert!(matches!(ty, Type::ConstArray(_, 2)));
        let mixed = ty_of(&mut r, &ctx, array(vec![num(1.0), binary(num(1.0), BinaryOp::Add, num(1.0))]));
        assert_eq!(mixed, Type::array(Type::number()));
        assert_eq!(ty_of(&mut r, &ctx, array(vec![])), Type::array(Type::Any));
    }

    #[test]
    fn test_object_literal_fields_widen() {
        let mut r = Resolver::default();
        let ctx = in_function(&mut r, "f");
        let ty = ty_of(&mut r, &ctx, object(vec![("x", num(1.0)), ("s", string("a"))]));
        assert_eq!(ty, Type::object(vec![("x", Type::number()), ("s", Type::string())]));
        let read = member(object(vec![("x", num(1.0))]), "x");
        assert_eq!(ty_of(&mut r, &ctx, read), Type::number());
    }

    #[test]
    fn test_assignment_to_const_is_reported() {
        let mut r = Resolver::default();
        let ctx = in_function(&mut r, "f");
        r.resolve_stmt(&const_stmt("c", num(1.0)), &ctx).unwrap();
        let result = r.resolve_expr(&assign(ident("c"), num(2.0)), &ctx);
        assert_eq!(result, Err(Failure::Reported));
        assert_eq!(r.diagnostics()[0].kind, SemaError::AssignToConst("c".into()));
    }

    #[test]
    fn test_unknown_name_defers_when_partial() {
        let mut r = Resolver::default();
        let ctx = in_function(&mut r, "f").partial();
        let result = r.resolve_expr(&ident("later"), &ctx);
        assert!(matches!(result, Err(Failure::Deferred(DeferReason::UnresolvedName(_)))));
        assert!(r.diagnostics().is_empty());
    }

    #[test]
    fn test_calling_a_number_is_reported() {
        let mut r = Resolver::default();
        let ctx = in_function(&mut r, "f");
        r.resolve_stmt(&let_stmt("n", None, Some(num(1.0))), &ctx).unwrap();
        let result = r.resolve_expr(&call(ident("n"), vec![]), &ctx);
        assert_eq!(result, Err(Failure::Reported));
        assert_eq!(r.diagnostics()[0].kind, SemaError::NotCallable(Type::number()));
    }

    #[test]
    fn test_describe_member_paths() {
        assert_eq!(describe(&member(member(ident("a"), "b"), "c")), "a.b.c");
        assert_eq!(describe(&num(1.0)), "expression");
    }
}
