//! Syntax rewrites applied before resolution: generator bodies and
//! destructuring declarations.

use rustc_hash::FxHashSet;
use tern_ast::build::{arrow_block, block_stmt, boolean, expr_stmt, ident, index, member, num, object, undefined, var_decl};
use tern_ast::{
    BlockStmt, Expr, ForInit, Literal, Node, Pattern, Span, Stmt, UnaryOp, VarDecl, VarDeclKind, VarDeclarator,
};

use crate::symbols::FunctionSyntax;

/// Turns a generator into a function returning `{ next }`.
///
/// Top-level locals with pure initializers move to the wrapper so their
/// state survives between `next` calls. Each statement-level `yield e`
/// becomes `return { value: e, done: false }` and counts as a resume point;
/// `return e` becomes `return { value: e, done: true }`.
///
/// `next` re-enters the body from the top, so a top-level `for` loop picks
/// up where it stopped only because its counter is hoisted: a `yield` in its
/// body runs the loop update before returning. Statements after a `yield`
/// in the same loop body, and `while` loops without such an update, do not
/// resume.
pub(crate) fn rewrite_generator(syntax: &mut FunctionSyntax) {
    syntax.is_generator = false;
    let Some(body) = syntax.body.take() else {
        return;
    };
    let mut rewrite = GeneratorRewrite {
        params: syntax
            .params
            .iter()
            .filter_map(|p| p.pattern.value.ident_name().map(str::to_string))
            .collect(),
        hoisted: Vec::new(),
        names: FxHashSet::default(),
        resume_points: 0,
        loop_update: None,
    };

    let mut next = rewrite.stmts(body.value.stmts, true);
    next.push(step(None, true, body.span));

    let mut stmts = std::mem::take(&mut rewrite.hoisted);
    stmts.push(Node::new(
        Stmt::Return(Some(object(vec![("next", arrow_block(Vec::new(), next))]))),
        body.span,
    ));
    tracing::trace!(
        generator = %syntax.name,
        resume_points = rewrite.resume_points,
        hoisted = stmts.len() - 1,
        "generator rewritten"
    );

    syntax.extra_locals = stmts.len() > 1;
    syntax.resume_points = rewrite.resume_points;
    // The result is the `{ next }` object; its type is inferred.
    syntax.return_type = None;
    syntax.body = Some(Node::new(BlockStmt { stmts }, body.span));
}

/// `{ value, done }` returned from `next`.
fn step(value: Option<Node<Expr>>, done: bool, span: Span) -> Node<Stmt> {
    let result = object(vec![("value", value.unwrap_or_else(undefined)), ("done", boolean(done))]);
    Node::new(Stmt::Return(Some(result)), span)
}

struct GeneratorRewrite {
    params: Vec<String>,
    hoisted: Vec<Node<Stmt>>,
    names: FxHashSet<String>,
    resume_points: usize,
    /// Update of the enclosing top-level `for`, run before a `yield` returns.
    loop_update: Option<Node<Expr>>,
}

impl GeneratorRewrite {
    fn is_pure(&self, init: &Node<Expr>) -> bool {
        match &init.value {
            Expr::Literal(_) => true,
            Expr::Ident(ident) => self.params.contains(&ident.name),
            Expr::Unary {
                op: UnaryOp::Minus,
                expr,
            } => matches!(expr.value, Expr::Literal(Literal::Number(_))),
            Expr::Paren(inner) => self.is_pure(inner),
            _ => false,
        }
    }

    /// Moves pure declarators to the wrapper; returns what stays in place.
    fn hoist(&mut self, decl: VarDecl, span: Span) -> Option<VarDecl> {
        let mut kept = Vec::new();
        for declarator in decl.declarations {
            let hoistable = match (declarator.pattern.value.ident_name(), &declarator.init) {
                (Some(name), Some(init)) => self.is_pure(init) && !self.names.contains(name),
                _ => false,
            };
            if !hoistable {
                kept.push(declarator);
                continue;
            }
            self.names
                .extend(declarator.pattern.value.ident_name().map(str::to_string));
            self.hoisted.push(Node::new(
                Stmt::VarDecl(VarDecl {
                    kind: VarDeclKind::Let,
                    declarations: vec![declarator],
                }),
                span,
            ));
        }
        (!kept.is_empty()).then_some(VarDecl {
            kind: decl.kind,
            declarations: kept,
        })
    }

    fn stmts(&mut self, stmts: Vec<Node<Stmt>>, top: bool) -> Vec<Node<Stmt>> {
        stmts.into_iter().flat_map(|stmt| self.stmt(stmt, top)).collect()
    }

    /// Rewrites a loop body with `update` as the pending loop update.
    fn loop_body(&mut self, body: Node<Stmt>, update: Option<Node<Expr>>) -> Box<Node<Stmt>> {
        let outer = std::mem::replace(&mut self.loop_update, update);
        let body = self.nested(body);
        self.loop_update = outer;
        body
    }

    /// `yield e` inside a hoisted `for`: the value is taken before the
    /// update runs.
    fn yield_in_loop(&mut self, argument: Option<Node<Expr>>, update: Node<Expr>, span: Span) -> Vec<Node<Stmt>> {
        let temp = format!("%y{}", self.resume_points);
        let value = argument.unwrap_or_else(undefined);
        vec![
            Node::new(Stmt::VarDecl(var_decl(VarDeclKind::Const, &temp, None, Some(value))), span),
            Node::new(expr_stmt(update).value, span),
            step(Some(ident(&temp)), false, span),
        ]
    }

    fn nested(&mut self, stmt: Node<Stmt>) -> Box<Node<Stmt>> {
        let span = stmt.span;
        let mut out = self.stmt(stmt, false);
        Box::new(match out.len() {
            1 => out.remove(0),
            _ => Node::new(block_stmt(out).value, span),
        })
    }

    fn stmt(&mut self, stmt: Node<Stmt>, top: bool) -> Vec<Node<Stmt>> {
        let span = stmt.span;
        let rewritten = match stmt.value {
            Stmt::VarDecl(decl) if top => match self.hoist(decl, span) {
                Some(kept) => Stmt::VarDecl(kept),
                None => return Vec::new(),
            },
            Stmt::Expr(Node {
                value: Expr::Yield { argument },
                ..
            }) => {
                self.resume_points += 1;
                let argument = argument.map(|a| *a);
                return match self.loop_update.clone() {
                    Some(update) => self.yield_in_loop(argument, update, span),
                    None => vec![step(argument, false, span)],
                };
            }
            Stmt::Return(value) => return vec![step(value, true, span)],
            Stmt::If {
                condition,
                then_stmt,
                else_stmt,
            } => Stmt::If {
                condition,
                then_stmt: self.nested(*then_stmt),
                else_stmt: else_stmt.map(|s| self.nested(*s)),
            },
            Stmt::For {
                init,
                condition,
                update,
                body,
            } => {
                let init = match init {
                    Some(ForInit::VarDecl(decl)) if top => self.hoist(decl, span).map(ForInit::VarDecl),
                    other => other,
                };
                let pending = if top { update.clone() } else { None };
                Stmt::For {
                    init,
                    condition,
                    update,
                    body: self.loop_body(*body, pending),
                }
            }
            Stmt::ForOf { left, right, body } => Stmt::ForOf {
                left,
                right,
                body: self.loop_body(*body, None),
            },
            Stmt::While { condition, body } => Stmt::While {
                condition,
                body: self.loop_body(*body, None),
            },
            Stmt::DoWhile { body, condition } => Stmt::DoWhile {
                body: self.loop_body(*body, None),
                condition,
            },
            Stmt::Block(block) => Stmt::Block(BlockStmt {
                stmts: self.stmts(block.stmts, false),
            }),
            other => other,
        };
        vec![Node::new(rewritten, span)]
    }
}

/// Splits a destructuring pattern into one declarator per element or
/// property, each reading from `source`. Nested patterns stay patterns.
pub(crate) fn destructure(pattern: &Node<Pattern>, source: &Node<Expr>) -> Vec<VarDeclarator> {
    match &pattern.value {
        Pattern::Ident { .. } => vec![VarDeclarator {
            pattern: pattern.clone(),
            init: Some(source.clone()),
        }],
        Pattern::Array { elements, .. } => elements
            .iter()
            .enumerate()
            .filter_map(|(i, element)| {
                element.as_ref().map(|element| VarDeclarator {
                    pattern: element.clone(),
                    init: Some(Node::new(index(source.clone(), num(i as f64)).value, element.span)),
                })
            })
            .collect(),
        Pattern::Object { properties, .. } => properties
            .iter()
            .map(|property| VarDeclarator {
                pattern: property.value.clone(),
                init: Some(Node::new(
                    member(source.clone(), &property.key.as_string()).value,
                    property.value.span,
                )),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_ast::build::*;
    use tern_ast::{FunctionDecl, ObjectPatternProperty, PropertyName};

    fn is_step(stmt: &Node<Stmt>) -> bool {
        matches!(&stmt.value, Stmt::Return(Some(value)) if matches!(value.value, Expr::Object(_)))
    }

    fn generator(body: Vec<Node<Stmt>>) -> FunctionSyntax {
        let decl = FunctionDecl {
            is_generator: true,
            ..function("gen", vec![], vec![param("n", Some(number_type()))], None, body)
        };
        FunctionSyntax::from_decl(&decl, Span::default())
    }

    #[test]
    fn test_pure_locals_move_to_wrapper() {
        let syntax = generator(vec![
            let_stmt("i", None, Some(num(0.0))),
            let_stmt("limit", None, Some(ident("n"))),
            let_stmt("twice", None, Some(binary(ident("n"), tern_ast::BinaryOp::Mul, num(2.0)))),
            expr_stmt(yield_expr(Some(ident("i")))),
        ]);
        let stmts = &syntax.body.as_ref().unwrap().value.stmts;
        assert_eq!(stmts.len(), 3);
        assert!(matches!(stmts[2].value, Stmt::Return(Some(_))));
        assert!(syntax.extra_locals);
        assert_eq!(syntax.resume_points, 1);
    }

    #[test]
    fn test_yields_become_steps_inside_next() {
        let syntax = generator(vec![
            expr_stmt(yield_expr(Some(num(1.0)))),
            if_stmt(ident("n"), expr_stmt(yield_expr(Some(num(2.0)))), None),
        ]);
        assert_eq!(syntax.resume_points, 2);
        let stmts = &syntax.body.as_ref().unwrap().value.stmts;
        let Stmt::Return(Some(result)) = &stmts[0].value else {
            panic!("wrapper must return the iterator");
        };
        let Expr::Object(props) = &result.value else {
            panic!("iterator must be an object");
        };
        let tern_ast::ObjectProperty::Property { value, .. } = &props[0] else {
            panic!("`next` property expected");
        };
        let Expr::Arrow {
            body: tern_ast::ArrowBody::Block(next),
            ..
        } = &value.value
        else {
            panic!("`next` must be a block arrow");
        };
        assert_eq!(next.value.stmts.len(), 3);
        assert!(next.value.stmts.iter().all(|s| is_step(s) || matches!(s.value, Stmt::If { .. })));
    }

    fn counting_loop(body: Node<Stmt>) -> Node<Stmt> {
        node(Stmt::For {
            init: Some(ForInit::VarDecl(var_decl(VarDeclKind::Let, "i", None, Some(num(0.0))))),
            condition: Some(binary(ident("i"), tern_ast::BinaryOp::Lt, ident("n"))),
            update: Some(assign(ident("i"), binary(ident("i"), tern_ast::BinaryOp::Add, num(1.0)))),
            body: Box::new(body),
        })
    }

    fn next_body(syntax: &FunctionSyntax) -> &[Node<Stmt>] {
        let stmts = &syntax.body.as_ref().unwrap().value.stmts;
        let Some(Stmt::Return(Some(result))) = stmts.last().map(|s| &s.value) else {
            panic!("wrapper must return the iterator");
        };
        let Expr::Object(props) = &result.value else {
            panic!("iterator must be an object");
        };
        let tern_ast::ObjectProperty::Property { value, .. } = &props[0] else {
            panic!("`next` property expected");
        };
        let Expr::Arrow {
            body: tern_ast::ArrowBody::Block(next),
            ..
        } = &value.value
        else {
            panic!("`next` must be a block arrow");
        };
        &next.value.stmts
    }

    #[test]
    fn test_yield_in_hoisted_loop_advances_before_returning() {
        let syntax = generator(vec![counting_loop(block_stmt(vec![expr_stmt(yield_expr(Some(ident("i"))))]))]);
        let stmts = &syntax.body.as_ref().unwrap().value.stmts;
        // `let i = 0` moved to the wrapper.
        assert_eq!(stmts.len(), 2);
        let Stmt::For { init, body, .. } = &next_body(&syntax)[0].value else {
            panic!("loop stays inside `next`");
        };
        assert!(init.is_none());
        let Stmt::Block(body) = &body.value else {
            panic!("loop body must stay a block");
        };
        assert_eq!(body.stmts.len(), 3);
        assert!(matches!(&body.stmts[0].value, Stmt::VarDecl(d) if d.declarations[0].pattern.value.ident_name() == Some("%y0")));
        assert!(matches!(body.stmts[1].value, Stmt::Expr(Node { value: Expr::Assignment { .. }, .. })));
        assert!(is_step(&body.stmts[2]));
    }

    #[test]
    fn test_yield_in_while_returns_directly() {
        let syntax = generator(vec![node(Stmt::While {
            condition: ident("n"),
            body: Box::new(expr_stmt(yield_expr(Some(num(1.0))))),
        })]);
        let Stmt::While { body, .. } = &next_body(&syntax)[0].value else {
            panic!("loop stays inside `next`");
        };
        assert!(is_step(body));
    }

    #[test]
    fn test_object_pattern_reads_properties() {
        let pattern = node(Pattern::Object {
            properties: vec![ObjectPatternProperty {
                key: PropertyName::String("x".into()),
                value: ident_pattern("px"),
            }],
            type_annotation: None,
        });
        let parts = destructure(&pattern, &ident("%d0"));
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].pattern.value.ident_name(), Some("px"));
        assert!(matches!(parts[0].init.as_ref().unwrap().value, Expr::Member { .. }));
    }

    #[test]
    fn test_array_pattern_skips_holes() {
        let pattern = node(Pattern::Array {
            elements: vec![None, Some(ident_pattern("b"))],
            type_annotation: None,
        });
        let parts = destructure(&pattern, &ident("%d0"));
        assert_eq!(parts.len(), 1);
        assert!(matches!(parts[0].init.as_ref().unwrap().value, Expr::Index { .. }));
    }
}
