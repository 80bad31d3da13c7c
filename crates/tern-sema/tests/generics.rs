//! Generic instantiation: inference, caching, constraints and recursion
//! through specialized classes.

mod common;

use std::rc::Rc;

use common::*;
use tern_ast::build::*;
use tern_ast::BinaryOp;
use tern_sema::SemaError;
use tern_types::Type;

fn identity() -> tern_ast::Node<tern_ast::ModuleItem> {
    fn_item(
        "id",
        vec![type_param("T", None, None)],
        vec![param("x", Some(type_ref("T")))],
        Some(type_ref("T")),
        vec![ret(Some(ident("x")))],
    )
}

#[test]
fn test_identity_is_specialized_once_per_argument_type() {
    let mut r = resolve(vec![
        identity(),
        const_item("a", call(ident("id"), vec![num(1.0)])),
        const_item("b", call(ident("id"), vec![num(2.0)])),
        const_item("s", call_with_types(ident("id"), vec![string_type()], vec![string("x")])),
    ]);
    assert_clean(&r);
    assert_eq!(r.global_type("a"), Some(Type::number()));
    assert_eq!(r.global_type("s"), Some(Type::string()));

    let module_functions: Vec<&str> = r.module().functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(module_functions.iter().filter(|n| **n == "id<number>").count(), 1);
    assert_eq!(module_functions.iter().filter(|n| **n == "id<string>").count(), 1);

    let first = r.instantiate_function("id", vec![Type::number()]).unwrap();
    let second = r.instantiate_function("id", vec![Type::number()]).unwrap();
    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(first.key, "id<number>");
}

#[test]
fn test_specialized_signature_uses_type_arguments() {
    let r = resolve(vec![identity(), const_item("a", call(ident("id"), vec![num(5.0)]))]);
    assert_clean(&r);
    let proto = r.prototype("id<number>").unwrap();
    let params: Vec<&Type> = proto.params.iter().map(|p| &p.ty).collect();
    assert_eq!(params, vec![&Type::number()]);
    assert_eq!(proto.return_type, Some(Type::number()));
    assert_eq!(r.global_type("a"), Some(Type::number()));
}

#[test]
fn test_discovery_infers_specialized_return_type() {
    let r = resolve(vec![
        fn_item(
            "id2",
            vec![type_param("T", None, None)],
            vec![param("x", Some(type_ref("T")))],
            None,
            vec![ret(Some(ident("x")))],
        ),
        const_item("a", call(ident("id2"), vec![num(5.0)])),
        const_item("s", call(ident("id2"), vec![string("x")])),
    ]);
    assert_clean(&r);
    let proto = r.prototype("id2<number>").unwrap();
    assert!(proto.discovered);
    assert_eq!(proto.return_type, Some(Type::number()));
    assert_eq!(r.global_type("a"), Some(Type::number()));
    assert_eq!(r.prototype("id2<string>").unwrap().return_type, Some(Type::string()));
}

#[test]
fn test_unmet_constraint_is_reported() {
    let r = resolve(vec![
        fn_item(
            "onlyNumbers",
            vec![type_param("T", Some(number_type()), None)],
            vec![param("x", Some(type_ref("T")))],
            Some(type_ref("T")),
            vec![ret(Some(ident("x")))],
        ),
        const_item("bad", call(ident("onlyNumbers"), vec![string("no")])),
    ]);
    assert!(errors(&r)
        .iter()
        .any(|e| matches!(e, SemaError::ConstraintNotSatisfied { decl, .. } if decl == "onlyNumbers")));
}

#[test]
fn test_uninferable_type_argument_is_reported() {
    let r = resolve(vec![
        fn_item(
            "make",
            vec![type_param("T", None, None)],
            vec![],
            Some(array_type(type_ref("T"))),
            vec![ret(Some(array(vec![])))],
        ),
        const_item("m", call(ident("make"), vec![])),
    ]);
    assert!(errors(&r).contains(&SemaError::MissingTypeArgument {
        decl: "make".into(),
        param: "T".into(),
    }));
}

#[test]
fn test_default_type_argument_fills_the_gap() {
    let r = resolve(vec![
        fn_item(
            "make",
            vec![type_param("T", None, Some(number_type()))],
            vec![],
            Some(array_type(type_ref("T"))),
            vec![ret(Some(array(vec![])))],
        ),
        const_item("m", call(ident("make"), vec![])),
    ]);
    assert_clean(&r);
    assert_eq!(r.global_type("m"), Some(Type::array(Type::number())));
}

#[test]
fn test_lambda_parameters_see_inferred_bindings() {
    let r = resolve(vec![
        fn_item(
            "apply",
            vec![type_param("T", None, None), type_param("R", None, None)],
            vec![
                param("x", Some(type_ref("T"))),
                param("f", Some(function_type(vec![type_ref("T")], type_ref("R")))),
            ],
            Some(type_ref("R")),
            vec![ret(Some(call(ident("f"), vec![ident("x")])))],
        ),
        const_item(
            "doubled",
            call(
                ident("apply"),
                vec![num(2.0), arrow(vec![param("n", None)], binary(ident("n"), BinaryOp::Mul, num(2.0)))],
            ),
        ),
    ]);
    assert_clean(&r);
    assert_eq!(r.global_type("doubled"), Some(Type::number()));
    let spec = r.specialization("apply<number, number>").unwrap();
    assert_eq!(spec.args, vec![Type::number(), Type::number()]);
}

#[test]
fn test_generic_class_inferred_from_constructor() {
    let boxed = class(
        "Box",
        vec![type_param("T", None, None)],
        vec![
            field("value", type_ref("T"), None),
            ctor(
                vec![param("v", Some(type_ref("T")))],
                vec![expr_stmt(assign(member(this(), "value"), ident("v")))],
            ),
            method("get", vec![], Some(type_ref("T")), vec![ret(Some(member(this(), "value")))]),
        ],
    );
    let r = resolve(vec![
        class_item(boxed),
        const_item("b", new_expr("Box", None, vec![num(5.0)])),
        const_item("v", call(member(ident("b"), "get"), vec![])),
    ]);
    assert_clean(&r);
    assert_eq!(r.global_type("v"), Some(Type::number()));
    assert!(r.specialization("Box<number>").is_some());
}

#[test]
fn test_mutually_referencing_generic_classes_terminate() {
    let a = class(
        "A",
        vec![type_param("T", None, None)],
        vec![field("next", generic_ref("B", vec![type_ref("T")]), None)],
    );
    let b = class(
        "B",
        vec![type_param("T", None, None)],
        vec![field("prev", generic_ref("A", vec![type_ref("T")]), None)],
    );
    let r = resolve(vec![
        class_item(a),
        class_item(b),
        const_item("x", new_expr("A", Some(vec![number_type()]), vec![])),
    ]);
    assert_clean(&r);
    assert!(r.specialization("A<number>").is_some());
    assert!(r.specialization("B<number>").is_some());
    assert!(r.class("A<number>").is_some());
}

#[test]
fn test_explicit_arguments_on_non_generic_function() {
    let r = resolve(vec![
        fn_item("plain", vec![], vec![], Some(number_type()), vec![ret(Some(num(1.0)))]),
        const_item("p", call_with_types(ident("plain"), vec![number_type()], vec![])),
    ]);
    assert!(errors(&r).contains(&SemaError::NotGeneric("plain".into())));
}
