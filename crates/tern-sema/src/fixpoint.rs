//! Fixpoint resolution of sibling items.
//!
//! Items are attempted in passes until a pass makes no progress. Each
//! attempt is a transaction: a deferred attempt leaves no trace in the
//! tables, the specialization cache or the module.

use tern_ast::{ModuleItem, Node, Span, Stmt};
use tern_ir::Region;

use crate::context::GenContext;
use crate::error::{DeferReason, Failure, SemaError, SemaResult};
use crate::resolver::Resolver;

/// Where an item stands in its group's worklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    Unresolved,
    InProgress,
    Resolved,
    Failed,
}

enum Attempt {
    Resolved(Region),
    Deferred(DeferReason),
    Failed,
}

impl Resolver {
    /// Hoists and resolves `items` in the current namespace. Returns their
    /// statement code in source order.
    pub(crate) fn resolve_group(&mut self, items: &[Node<ModuleItem>], ctx: &GenContext) -> SemaResult<Region> {
        let ns = self.namespace.current();
        self.hoist_items(items, &ns);

        let mut states = vec![ResolutionState::Unresolved; items.len()];
        let mut regions: Vec<Option<Region>> = vec![None; items.len()];
        let partial = ctx.partial();
        let mut passes = 0;

        loop {
            passes += 1;
            let mut progress = false;
            for (i, item) in items.iter().enumerate() {
                if states[i] != ResolutionState::Unresolved {
                    continue;
                }
                states[i] = ResolutionState::InProgress;
                states[i] = match self.attempt_item(item, &partial)? {
                    Attempt::Resolved(region) => {
                        regions[i] = Some(region);
                        progress = true;
                        ResolutionState::Resolved
                    }
                    Attempt::Failed => {
                        progress = true;
                        ResolutionState::Failed
                    }
                    Attempt::Deferred(reason) => {
                        tracing::trace!(item = %item_name(item), %reason, pass = passes, "item deferred");
                        ResolutionState::Unresolved
                    }
                };
            }
            let remaining = states.iter().filter(|s| **s == ResolutionState::Unresolved).count();
            tracing::debug!(namespace = %ns, pass = passes, remaining, "fixpoint pass");
            if remaining == 0 || !progress || passes >= self.options.max_passes {
                break;
            }
        }

        let stalled: Vec<usize> = (0..items.len())
            .filter(|&i| states[i] == ResolutionState::Unresolved)
            .collect();
        if !stalled.is_empty() {
            // An enclosing group may still declare what is missing.
            if ctx.allow_partial_resolve {
                return Err(Failure::Deferred(DeferReason::Dependencies));
            }
            if self.options.strict_retry {
                let strict = ctx.strict();
                for &i in &stalled {
                    states[i] = match self.attempt_item(&items[i], &strict)? {
                        Attempt::Resolved(region) => {
                            regions[i] = Some(region);
                            ResolutionState::Resolved
                        }
                        Attempt::Failed => ResolutionState::Failed,
                        Attempt::Deferred(_) => ResolutionState::Unresolved,
                    };
                }
            }
            if let Some(first) = states.iter().position(|s| *s == ResolutionState::Unresolved) {
                let item = &items[first];
                return Err(self.report(item_span(item), SemaError::UnresolvedDependencies(item_name(item))));
            }
        }

        let mut out = Region::new();
        for region in regions.into_iter().flatten() {
            out.instructions.extend(region.instructions);
        }
        Ok(out)
    }

    fn attempt_item(&mut self, item: &Node<ModuleItem>, ctx: &GenContext) -> SemaResult<Attempt> {
        let tx = self.begin_transaction();
        self.diagnostics.postpone();
        let frames = self.frames.len();
        let depth = self.scopes.depth();
        let discovering = self.discovering.len();
        let committing = self.committing.len();
        self.builder.begin_region()?;
        let point = self.builder.insertion_point();

        let result = self.resolve_item(item, ctx);

        self.builder.restore_insertion_point(point);
        let region = self.builder.end_region()?;
        self.frames.truncate(frames);
        self.scopes.truncate(depth);
        self.discovering.truncate(discovering);
        self.committing.truncate(committing);

        match result {
            Ok(()) => {
                self.diagnostics.flush_postponed();
                Ok(Attempt::Resolved(region))
            }
            Err(Failure::Deferred(reason)) => {
                self.diagnostics.discard_postponed();
                self.rollback(tx)?;
                Ok(Attempt::Deferred(reason))
            }
            Err(Failure::Reported) => {
                self.diagnostics.flush_postponed();
                self.rollback(tx)?;
                Ok(Attempt::Failed)
            }
            Err(internal) => {
                self.diagnostics.flush_postponed();
                Err(internal)
            }
        }
    }

    fn resolve_item(&mut self, item: &Node<ModuleItem>, ctx: &GenContext) -> SemaResult<()> {
        match &item.value {
            ModuleItem::Decl(decl) | ModuleItem::Export(decl) => self.resolve_decl_item(&decl.value, decl.span, ctx),
            ModuleItem::Stmt(stmt) => match &stmt.value {
                Stmt::Decl(decl) => self.resolve_decl_item(decl, stmt.span, ctx),
                _ => self.resolve_stmt(stmt, ctx),
            },
        }
    }
}

fn item_span(item: &Node<ModuleItem>) -> Span {
    match &item.value {
        ModuleItem::Decl(decl) | ModuleItem::Export(decl) => decl.span,
        ModuleItem::Stmt(stmt) => stmt.span,
    }
}

/// Name used in diagnostics: the declared name, or the first bound variable.
fn item_name(item: &Node<ModuleItem>) -> String {
    let decl = match &item.value {
        ModuleItem::Decl(decl) | ModuleItem::Export(decl) => Some(&decl.value),
        ModuleItem::Stmt(stmt) => match &stmt.value {
            Stmt::Decl(decl) => Some(decl.as_ref()),
            _ => None,
        },
    };
    match decl {
        Some(tern_ast::Decl::Var(var)) => var
            .declarations
            .iter()
            .flat_map(|d| d.pattern.value.bound_names())
            .next()
            .unwrap_or_else(|| "statement".to_string()),
        Some(decl) => decl.name().unwrap_or("declaration").to_string(),
        None => "statement".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SemaOptions;
    use tern_ast::build::*;
    use tern_ast::{BinaryOp, Decl, VarDeclKind};
    use tern_types::Type;

    fn const_item(name: &str, init: Node<tern_ast::Expr>) -> Node<ModuleItem> {
        stmt_item(nested_decl(Decl::Var(var_decl(VarDeclKind::Const, name, None, Some(init)))))
    }

    fn run(r: &mut Resolver, items: Vec<Node<ModuleItem>>) -> SemaResult<Region> {
        let init = r.options.init_function.clone();
        r.builder
            .begin_function(tern_ir::IrFunction::new(&init, Vec::new(), Type::void()));
        r.frames.push(crate::resolver::FnFrame::new(
            &init,
            crate::resolver::CaptureLayout::None,
            Some(Type::void()),
        ));
        r.resolve_group(&items, &GenContext::new().in_function(&init))
    }

    #[test]
    fn test_forward_reference_resolves_on_later_pass() {
        let mut r = Resolver::default();
        let items = vec![
            const_item("a", binary(ident("b"), BinaryOp::Add, num(1.0))),
            const_item("b", num(2.0)),
        ];
        run(&mut r, items).unwrap();
        assert!(r.diagnostics().is_empty());
        assert_eq!(r.global_type("a"), Some(Type::number()));
        assert_eq!(r.global_type("b"), Some(Type::num_lit(2.0)));
    }

    #[test]
    fn test_cycle_without_strict_retry_reports_first_item() {
        let mut r = Resolver::new(SemaOptions::new().with_strict_retry(false));
        let items = vec![const_item("a", ident("b")), const_item("b", ident("a"))];
        assert_eq!(run(&mut r, items), Err(Failure::Reported));
        assert_eq!(r.diagnostics().len(), 1);
        assert_eq!(
            r.diagnostics()[0].kind,
            SemaError::UnresolvedDependencies("a".into())
        );
    }

    #[test]
    fn test_strict_retry_surfaces_precise_error() {
        let mut r = Resolver::default();
        let items = vec![const_item("a", ident("missing"))];
        run(&mut r, items).unwrap();
        assert_eq!(
            r.diagnostics()[0].kind,
            SemaError::UndefinedVariable("missing".into())
        );
    }

    #[test]
    fn test_item_names() {
        assert_eq!(item_name(&const_item("x", num(1.0))), "x");
        assert_eq!(item_name(&stmt_item(expr_stmt(num(1.0)))), "statement");
    }
}
