//! Capture analysis: which variables a closure reaches, how captures
//! propagate through enclosing closures, and generator state.

mod common;

use common::*;
use tern_ast::build::*;
use tern_ast::BinaryOp;
use tern_types::Type;

#[test]
fn test_closure_captures_exactly_what_it_reads() {
    let r = resolve(vec![fn_item(
        "outer",
        vec![],
        vec![],
        Some(number_type()),
        vec![
            let_stmt("v", None, Some(num(1.0))),
            let_stmt("unused", None, Some(num(2.0))),
            const_stmt("g", arrow(vec![], ident("v"))),
            ret(Some(call(ident("g"), vec![]))),
        ],
    )]);
    assert_clean(&r);
    let lambda = r.prototype("outer.lambda0").expect("lambda prototype");
    assert_eq!(lambda.captures.names(), vec!["v".to_string()]);

    let function = r.module().find_function("outer.lambda0").expect("lambda function");
    assert_eq!(function.captures, Some(Type::object(vec![("v", Type::number())])));
}

#[test]
fn test_parameters_and_own_locals_are_not_captures() {
    let r = resolve(vec![fn_item(
        "outer",
        vec![],
        vec![],
        Some(number_type()),
        vec![
            const_stmt(
                "inc",
                arrow_block(
                    vec![param("x", Some(number_type()))],
                    vec![
                        let_stmt("step", None, Some(num(1.0))),
                        ret(Some(binary(ident("x"), BinaryOp::Add, ident("step")))),
                    ],
                ),
            ),
            ret(Some(call(ident("inc"), vec![num(1.0)]))),
        ],
    )]);
    assert_clean(&r);
    assert!(r.prototype("outer.lambda0").unwrap().captures.is_empty());
    assert_eq!(r.module().find_function("outer.lambda0").unwrap().captures, None);
}

#[test]
fn test_captures_propagate_through_enclosing_closures() {
    let inner = arrow(vec![], ident("v"));
    let middle = arrow_block(
        vec![],
        vec![const_stmt("g", inner), ret(Some(call(ident("g"), vec![])))],
    );
    let r = resolve(vec![fn_item(
        "outer",
        vec![],
        vec![],
        Some(number_type()),
        vec![
            let_stmt("v", None, Some(num(1.0))),
            const_stmt("f", middle),
            ret(Some(call(ident("f"), vec![]))),
        ],
    )]);
    assert_clean(&r);
    assert_eq!(r.prototype("outer.lambda0").unwrap().captures.names(), vec!["v".to_string()]);
    assert_eq!(
        r.prototype("outer.lambda0.lambda0").unwrap().captures.names(),
        vec!["v".to_string()]
    );
}

#[test]
fn test_module_globals_are_never_captured() {
    let r = resolve(vec![
        let_item("counter", None, num(0.0)),
        fn_item(
            "bump",
            vec![],
            vec![],
            Some(number_type()),
            vec![
                const_stmt("read", arrow(vec![], ident("counter"))),
                ret(Some(call(ident("read"), vec![]))),
            ],
        ),
    ]);
    assert_clean(&r);
    assert!(r.prototype("bump.lambda0").unwrap().captures.is_empty());
}

#[test]
fn test_generator_step_captures_hoisted_state() {
    let r = resolve(vec![generator_item(
        "count",
        vec![param("n", Some(number_type()))],
        vec![
            let_stmt("i", None, Some(num(0.0))),
            if_stmt(
                binary(ident("n"), BinaryOp::Gt, num(0.0)),
                expr_stmt(yield_expr(Some(ident("i")))),
                None,
            ),
            expr_stmt(yield_expr(Some(ident("n")))),
        ],
    )]);
    assert_clean(&r);
    let proto = r.prototype("count").unwrap();
    assert_eq!(proto.resume_points, 2);
    assert!(proto.extra_local_fields);

    let mut captured = r.prototype("count.lambda0").unwrap().captures.names();
    captured.sort();
    assert_eq!(captured, vec!["i".to_string(), "n".to_string()]);
}

#[test]
fn test_generator_loop_counter_is_hoisted_and_captured() {
    let counting = node(tern_ast::Stmt::For {
        init: Some(tern_ast::ForInit::VarDecl(var_decl(
            tern_ast::VarDeclKind::Let,
            "i",
            None,
            Some(num(0.0)),
        ))),
        condition: Some(binary(ident("i"), BinaryOp::Lt, ident("n"))),
        update: Some(assign(ident("i"), binary(ident("i"), BinaryOp::Add, num(1.0)))),
        body: Box::new(block_stmt(vec![expr_stmt(yield_expr(Some(ident("i"))))])),
    });
    let r = resolve(vec![generator_item(
        "range",
        vec![param("n", Some(number_type()))],
        vec![counting],
    )]);
    assert_clean(&r);
    assert_eq!(r.prototype("range").unwrap().resume_points, 1);

    let mut captured = r.prototype("range.lambda0").unwrap().captures.names();
    captured.sort();
    assert_eq!(captured, vec!["i".to_string(), "n".to_string()]);
}

#[test]
fn test_nested_function_declaration_captures_outer_local() {
    let helper = tern_ast::Decl::Function(function(
        "helper",
        vec![],
        vec![],
        Some(number_type()),
        vec![ret(Some(binary(ident("base"), BinaryOp::Mul, num(2.0))))],
    ));
    let r = resolve(vec![fn_item(
        "outer",
        vec![],
        vec![param("base", Some(number_type()))],
        Some(number_type()),
        vec![nested_decl(helper), ret(Some(call(ident("helper"), vec![])))],
    )]);
    assert_clean(&r);
    assert_eq!(
        r.prototype("outer.helper").unwrap().captures.names(),
        vec!["base".to_string()]
    );
}
