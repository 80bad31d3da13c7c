//! The resolver: owns the declaration tables, the specialization cache, the
//! IR builder and the diagnostics sink. Resolution behavior is spread over
//! `impl Resolver` blocks in the sibling modules.

use std::cell::RefCell;
use std::rc::Rc;

use tern_ast::{Node, Program, Span};
use tern_ir::{Constant, IrBuilder, IrFunction, IrModule, Mark, Op, ValueId};
use tern_types::Type;

use crate::config::SemaOptions;
use crate::context::{DiscoveryAccumulator, GenContext};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{DeferReason, Failure, SemaError, SemaResult};
use crate::namespace::NamespaceCursor;
use crate::scope::ScopeStack;
use crate::specialization::{Specialization, SpecializationCache};
use crate::symbols::{ClassRecord, DeclTables, EnumRecord, FunctionPrototype, InterfaceRecord, TablesCheckpoint};
use crate::{DeclarationSource, Resolution};

/// A resolved expression: its IR value and type.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Typed {
    pub value: ValueId,
    pub ty: Type,
}

/// How the function being emitted reaches its captured variables.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CaptureLayout {
    None,
    /// Implicit first parameter holding the capture aggregate.
    Param { value: ValueId, names: Vec<String> },
    /// `captures` field of the receiver, for members of a capturing class.
    ClassField { names: Vec<String> },
    /// Captures are being discovered; slots are placeholders.
    Discovery,
}

/// Per-function resolution state, parallel to the builder's frames.
#[derive(Debug)]
pub(crate) struct FnFrame {
    pub name: String,
    pub captures: CaptureLayout,
    /// Declared or discovered return type; `None` while discovering an
    /// unannotated function.
    pub return_type: Option<Type>,
    pub this_class: Option<String>,
    pub lambda_counter: usize,
    pub temp_counter: usize,
}

impl FnFrame {
    pub fn new(name: &str, captures: CaptureLayout, return_type: Option<Type>) -> Self {
        Self {
            name: name.to_string(),
            captures,
            return_type,
            this_class: None,
            lambda_counter: 0,
            temp_counter: 0,
        }
    }
}

/// Everything an aborted attempt must undo.
#[derive(Debug)]
pub(crate) struct Transaction {
    tables: TablesCheckpoint,
    cache: usize,
    mark: Mark,
    counters: Option<(usize, usize)>,
}

/// Semantic resolver for one compilation unit.
pub struct Resolver {
    pub(crate) options: SemaOptions,
    pub(crate) tables: DeclTables,
    pub(crate) cache: SpecializationCache,
    pub(crate) scopes: ScopeStack,
    pub(crate) namespace: NamespaceCursor,
    pub(crate) builder: IrBuilder,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) frames: Vec<FnFrame>,
    /// Functions whose discovery pass is running, innermost last.
    pub(crate) discovering: Vec<String>,
    /// Functions whose commit pass is running.
    pub(crate) committing: Vec<String>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(SemaOptions::default())
    }
}

impl Resolver {
    pub fn new(options: SemaOptions) -> Self {
        Self {
            options,
            tables: DeclTables::new(),
            cache: SpecializationCache::new(),
            scopes: ScopeStack::new(),
            namespace: NamespaceCursor::default(),
            builder: IrBuilder::new(),
            diagnostics: Diagnostics::new(),
            frames: Vec::new(),
            discovering: Vec::new(),
            committing: Vec::new(),
        }
    }

    // =========================================================================
    // Entry points
    // =========================================================================

    /// Resolves the declaration sources, then `program`, emitting top-level
    /// statement code into the module initializer.
    #[tracing::instrument(skip_all, fields(items = program.items.len(), sources = sources.len()))]
    pub fn resolve_program(
        &mut self,
        program: &Program,
        sources: &[&dyn DeclarationSource],
    ) -> Result<(), Vec<Diagnostic>> {
        let start = self.builder.insertion_point();
        let frames = self.frames.len();
        if let Err(failure) = self.run_program(program, sources) {
            self.builder.restore_insertion_point(start);
            self.frames.truncate(frames);
            let span = program.span;
            self.absorb_failure(failure, span);
        }
        if self.diagnostics.has_errors() {
            tracing::debug!(errors = self.diagnostics.reported().len(), "resolution failed");
            return Err(self.diagnostics.reported().to_vec());
        }
        Ok(())
    }

    fn run_program(&mut self, program: &Program, sources: &[&dyn DeclarationSource]) -> SemaResult<()> {
        let init = self.options.init_function.clone();
        self.builder.begin_function(IrFunction::new(&init, Vec::new(), Type::void()));
        self.frames.push(FnFrame::new(&init, CaptureLayout::None, Some(Type::void())));
        let ctx = GenContext::new().in_function(&init);

        for source in sources {
            tracing::debug!(source = source.name(), "resolving declaration source");
            let items = source.items();
            let _root = self.namespace.enter("");
            let region = self.resolve_group(&items, &ctx)?;
            self.builder.splice(region)?;
        }
        let region = self.resolve_group(&program.items, &ctx)?;
        self.builder.splice(region)?;

        self.builder.emit(Op::Return, Vec::new())?;
        self.frames.pop();
        self.builder.finish_function()?;
        Ok(())
    }

    /// Finishes the run, returning the module and any warnings.
    pub fn into_resolution(self) -> Result<Resolution, Vec<Diagnostic>> {
        let diagnostics = self.diagnostics.into_vec();
        match self.builder.finish() {
            Ok(module) => Ok(Resolution { module, diagnostics }),
            Err(err) => {
                let mut all = diagnostics;
                all.push(Diagnostic {
                    severity: crate::diagnostics::Severity::Error,
                    kind: SemaError::Internal(err.to_string()),
                    span: Span::default(),
                });
                Err(all)
            }
        }
    }

    /// Instantiates a generic function with explicit type arguments.
    pub fn instantiate_function(
        &mut self,
        generic: &str,
        args: Vec<Type>,
    ) -> Result<Rc<Specialization>, Vec<Diagnostic>> {
        let ctx = GenContext::new();
        let result = self.with_isolated_scopes(|this| this.specialize_function(generic, args, Span::default(), &ctx));
        result.map_err(|failure| self.failure_diagnostics(failure))
    }

    /// Instantiates a generic class with explicit type arguments.
    pub fn instantiate_class(&mut self, generic: &str, args: Vec<Type>) -> Result<Rc<Specialization>, Vec<Diagnostic>> {
        let ctx = GenContext::new();
        let result = self.with_isolated_scopes(|this| this.specialize_class(generic, args, Span::default(), &ctx));
        result.map_err(|failure| self.failure_diagnostics(failure))
    }

    fn failure_diagnostics(&mut self, failure: Failure) -> Vec<Diagnostic> {
        self.absorb_failure(failure, Span::default());
        self.diagnostics.reported().to_vec()
    }

    /// Turns a failure escaping the top level into a diagnostic.
    fn absorb_failure(&mut self, failure: Failure, span: Span) {
        match failure {
            Failure::Reported => {}
            Failure::Deferred(reason) => {
                self.diagnostics
                    .emit_error(span, SemaError::UnresolvedDependencies(reason.to_string()));
            }
            Failure::Internal(msg) => {
                tracing::error!(%msg, "internal consistency error");
                self.diagnostics.emit_error(span, SemaError::Internal(msg));
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn module(&self) -> &IrModule {
        self.builder.module()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.reported()
    }

    pub fn prototype(&self, function: &str) -> Option<&FunctionPrototype> {
        self.tables.functions.get(function)?.prototype.as_ref()
    }

    pub fn global_type(&self, name: &str) -> Option<Type> {
        self.tables.globals.get(name).map(|info| info.ty.clone())
    }

    pub fn class(&self, name: &str) -> Option<&ClassRecord> {
        self.tables.classes.get(name)
    }

    pub fn interface(&self, name: &str) -> Option<&InterfaceRecord> {
        self.tables.interfaces.get(name)
    }

    pub fn enumeration(&self, name: &str) -> Option<&EnumRecord> {
        self.tables.enums.get(name)
    }

    pub fn specialization(&self, key: &str) -> Option<Rc<Specialization>> {
        self.cache.get(key)
    }

    // =========================================================================
    // Diagnostics helpers
    // =========================================================================

    pub(crate) fn report(&mut self, span: Span, kind: SemaError) -> Failure {
        self.diagnostics.emit_error(span, kind);
        Failure::Reported
    }

    pub(crate) fn warn(&mut self, span: Span, kind: SemaError) {
        self.diagnostics.emit_warning(span, kind);
    }

    /// Defers under partial resolution, reports otherwise.
    pub(crate) fn defer_or_report(
        &mut self,
        ctx: &GenContext,
        span: Span,
        reason: DeferReason,
        kind: SemaError,
    ) -> Failure {
        if ctx.allow_partial_resolve {
            tracing::trace!(%reason, "deferred");
            Failure::Deferred(reason)
        } else {
            self.report(span, kind)
        }
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    pub(crate) fn begin_transaction(&self) -> Transaction {
        Transaction {
            tables: self.tables.checkpoint(),
            cache: self.cache.checkpoint(),
            mark: self.builder.mark(),
            counters: self.frames.last().map(|f| (f.lambda_counter, f.temp_counter)),
        }
    }

    /// Undoes declarations, specializations and committed IR since `tx`.
    pub(crate) fn rollback(&mut self, tx: Transaction) -> SemaResult<()> {
        self.tables.rollback(tx.tables);
        self.cache.rollback(tx.cache);
        if let (Some(frame), Some((lambdas, temps))) = (self.frames.last_mut(), tx.counters) {
            frame.lambda_counter = lambdas;
            frame.temp_counter = temps;
        }
        self.builder.erase_since(tx.mark)?;
        Ok(())
    }

    // =========================================================================
    // Frames and scopes
    // =========================================================================

    pub(crate) fn frame(&self) -> SemaResult<&FnFrame> {
        self.frames
            .last()
            .ok_or_else(|| Failure::Internal("no function frame".to_string()))
    }

    pub(crate) fn frame_mut(&mut self) -> SemaResult<&mut FnFrame> {
        self.frames
            .last_mut()
            .ok_or_else(|| Failure::Internal("no function frame".to_string()))
    }

    /// Fresh name for a rewrite temporary in the current function.
    pub(crate) fn fresh_temp(&mut self, prefix: &str) -> SemaResult<String> {
        let frame = self.frame_mut()?;
        let name = format!("%{}{}", prefix, frame.temp_counter);
        frame.temp_counter += 1;
        Ok(name)
    }

    /// Runs `f` with no lexical scopes visible, restoring them afterwards.
    pub(crate) fn with_isolated_scopes<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = std::mem::take(&mut self.scopes);
        let result = f(self);
        self.scopes = saved;
        result
    }

    // =========================================================================
    // Emission helpers
    // =========================================================================

    pub(crate) fn value(&mut self, ty: Type, op: Op, operands: Vec<ValueId>, span: Span) -> SemaResult<Typed> {
        let value = self.builder.create_value_at(ty.clone(), op, operands, Some(span))?;
        Ok(Typed { value, ty })
    }

    pub(crate) fn emit(&mut self, op: Op, operands: Vec<ValueId>, span: Span) -> SemaResult<()> {
        self.builder.emit_at(op, operands, Some(span))?;
        Ok(())
    }

    pub(crate) fn constant(&mut self, constant: Constant, ty: Type, span: Span) -> SemaResult<Typed> {
        self.value(ty, Op::Const(constant), Vec::new(), span)
    }

    pub(crate) fn undefined(&mut self, span: Span) -> SemaResult<Typed> {
        self.constant(Constant::Undefined, Type::undefined(), span)
    }

    /// Types an expression without keeping any of its effects.
    pub(crate) fn probe_type(&mut self, expr: &Node<tern_ast::Expr>, ctx: &GenContext) -> SemaResult<Type> {
        let tx = self.begin_transaction();
        let token = self.builder.begin_scratch();
        self.diagnostics.postpone();
        let name = ctx.current_function.clone().unwrap_or_else(|| "%probe".to_string());
        self.builder.begin_function(IrFunction::new(&name, Vec::new(), Type::Unknown));
        self.frames.push(FnFrame::new(&name, CaptureLayout::Discovery, None));
        let acc = Rc::new(RefCell::new(DiscoveryAccumulator::default()));
        let probe_ctx = ctx.discovering(acc).plain();

        let result = self.resolve_expr(expr, &probe_ctx).map(|typed| typed.ty);

        self.frames.pop();
        self.builder.abandon_function();
        let dropped = self.builder.drop_scratch(token);
        match &result {
            Err(Failure::Reported) => self.diagnostics.flush_postponed(),
            _ => self.diagnostics.discard_postponed(),
        }
        self.rollback(tx)?;
        dropped?;
        result
    }
}
