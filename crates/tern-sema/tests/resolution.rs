//! Whole-program resolution: declaration order, fixpoint termination,
//! determinism and the class/namespace surface.

mod common;

use common::*;
use tern_ast::build::*;
use tern_ast::{BinaryOp, Decl, EnumDecl, EnumMember, Ident, ModuleItem, Node, Program};
use tern_sema::{resolve_program, SemaError, SemaOptions};
use tern_types::Type;

fn forward_references() -> Vec<Node<ModuleItem>> {
    vec![
        const_item("a", binary(ident("b"), BinaryOp::Add, num(1.0))),
        fn_item("f", vec![], vec![], Some(number_type()), vec![ret(Some(ident("a")))]),
        const_item("b", num(2.0)),
        const_item("c", new_expr("Point", None, vec![])),
        class_item(class(
            "Point",
            vec![],
            vec![field("x", number_type(), Some(num(0.0)))],
        )),
    ]
}

#[test]
fn test_declaration_order_does_not_matter() {
    let forward = resolve(forward_references());
    let mut reversed_items = forward_references();
    reversed_items.reverse();
    let reversed = resolve(reversed_items);

    assert_clean(&forward);
    assert_clean(&reversed);
    for name in ["a", "b", "c"] {
        assert_eq!(forward.global_type(name), reversed.global_type(name), "global `{}`", name);
    }
    assert_eq!(forward.global_type("a"), Some(Type::number()));
    assert_eq!(forward.global_type("c"), Some(Type::class("Point")));
}

#[test]
fn test_resolution_is_deterministic() {
    let first = resolve_program(&Program::new(forward_references())).unwrap();
    let second = resolve_program(&Program::new(forward_references())).unwrap();
    assert_eq!(first.module, second.module);
}

#[test]
fn test_skipping_discovery_for_annotated_functions_changes_nothing() {
    let items = || {
        vec![
            fn_item(
                "square",
                vec![],
                vec![param("x", Some(number_type()))],
                Some(number_type()),
                vec![ret(Some(binary(ident("x"), BinaryOp::Mul, ident("x"))))],
            ),
            const_item("nine", call(ident("square"), vec![num(3.0)])),
        ]
    };
    let skipping = resolve_with(SemaOptions::new().with_skip_discovery_for_annotated(true), items());
    let discovering = resolve_with(SemaOptions::new().with_skip_discovery_for_annotated(false), items());
    assert_clean(&skipping);
    assert_clean(&discovering);
    assert_eq!(skipping.module(), discovering.module());
}

#[test]
fn test_cycle_reports_unresolved_dependencies() {
    let r = resolve_with(
        SemaOptions::new().with_strict_retry(false),
        vec![const_item("x", ident("y")), const_item("y", ident("x"))],
    );
    assert_eq!(errors(&r), vec![SemaError::UnresolvedDependencies("x".into())]);
}

#[test]
fn test_undefined_name_surfaces_after_strict_retry() {
    let r = resolve(vec![const_item("x", ident("nowhere"))]);
    assert_eq!(errors(&r), vec![SemaError::UndefinedVariable("nowhere".into())]);
}

#[test]
fn test_mutually_recursive_functions_infer_return_types() {
    let r = resolve(vec![
        fn_item(
            "even",
            vec![],
            vec![param("n", Some(number_type()))],
            None,
            vec![
                if_stmt(binary(ident("n"), BinaryOp::StrictEq, num(0.0)), ret(Some(boolean(true))), None),
                ret(Some(call(ident("odd"), vec![binary(ident("n"), BinaryOp::Sub, num(1.0))]))),
            ],
        ),
        fn_item(
            "odd",
            vec![],
            vec![param("n", Some(number_type()))],
            None,
            vec![
                if_stmt(binary(ident("n"), BinaryOp::StrictEq, num(0.0)), ret(Some(boolean(false))), None),
                ret(Some(call(ident("even"), vec![binary(ident("n"), BinaryOp::Sub, num(1.0))]))),
            ],
        ),
        const_item("e", call(ident("even"), vec![num(4.0)])),
    ]);
    assert_clean(&r);
    assert_eq!(r.global_type("e"), Some(Type::boolean()));
    assert!(r.module().find_function("even").is_some());
    assert!(r.module().find_function("odd").is_some());
}

#[test]
fn test_namespace_members_by_qualified_path() {
    let geo = namespace_item(
        "Geo",
        vec![
            export(const_item("origin", num(0.0))),
            export(fn_item(
                "twice",
                vec![],
                vec![param("n", Some(number_type()))],
                Some(number_type()),
                vec![ret(Some(binary(ident("n"), BinaryOp::Mul, num(2.0))))],
            )),
        ],
    );
    let r = resolve(vec![
        const_item(
            "t",
            call(member(ident("Geo"), "twice"), vec![member(ident("Geo"), "origin")]),
        ),
        geo,
    ]);
    assert_clean(&r);
    assert_eq!(r.global_type("t"), Some(Type::number()));
    assert!(r.module().find_function("Geo.twice").is_some());
}

#[test]
fn test_enum_members_are_literal_constants() {
    let color = Decl::Enum(EnumDecl {
        name: node(Ident::new("Color")),
        members: vec![
            EnumMember {
                name: node(Ident::new("Red")),
                init: None,
            },
            EnumMember {
                name: node(Ident::new("Green")),
                init: None,
            },
        ],
        is_const: false,
        is_declare: false,
    });
    let r = resolve(vec![decl_item(color), const_item("g", member(ident("Color"), "Green"))]);
    assert_clean(&r);
    assert_eq!(r.global_type("g"), Some(Type::num_lit(1.0)));
}

#[test]
fn test_methods_fields_and_super_calls() {
    let base = class(
        "Base",
        vec![],
        vec![
            field("size", number_type(), None),
            ctor(
                vec![param("size", Some(number_type()))],
                vec![expr_stmt(assign(member(this(), "size"), ident("size")))],
            ),
            method("describe", vec![], Some(string_type()), vec![ret(Some(string("base")))]),
        ],
    );
    let derived = subclass(
        "Derived",
        "Base",
        vec![
            ctor(vec![], vec![expr_stmt(super_call(vec![num(3.0)]))]),
            method(
                "describe",
                vec![],
                Some(string_type()),
                vec![ret(Some(binary(
                    string("derived of "),
                    BinaryOp::Add,
                    call(super_member("describe"), vec![]),
                )))],
            ),
        ],
    );
    let r = resolve(vec![
        class_item(derived),
        class_item(base),
        const_item("d", new_expr("Derived", None, vec![])),
        const_item("text", call(member(ident("d"), "describe"), vec![])),
        const_item("n", member(ident("d"), "size")),
    ]);
    assert_clean(&r);
    assert_eq!(r.global_type("text"), Some(Type::string()));
    assert_eq!(r.global_type("n"), Some(Type::number()));
    assert_eq!(r.class("Derived").unwrap().base.as_deref(), Some("Base"));
}

#[test]
fn test_readonly_field_is_writable_only_in_constructor() {
    let point = class(
        "Id",
        vec![],
        vec![
            readonly_field("value", number_type()),
            ctor(
                vec![param("v", Some(number_type()))],
                vec![expr_stmt(assign(member(this(), "value"), ident("v")))],
            ),
        ],
    );
    let r = resolve(vec![
        class_item(point),
        fn_item(
            "reset",
            vec![],
            vec![param("id", Some(type_ref("Id")))],
            None,
            vec![expr_stmt(assign(member(ident("id"), "value"), num(0.0)))],
        ),
    ]);
    assert_eq!(errors(&r), vec![SemaError::AssignToConst("value".into())]);
}

#[test]
fn test_wrong_argument_count_is_reported() {
    let r = resolve(vec![
        fn_item(
            "pair",
            vec![],
            vec![param("a", Some(number_type())), param("b", Some(number_type()))],
            Some(number_type()),
            vec![ret(Some(ident("a")))],
        ),
        const_item("p", call(ident("pair"), vec![num(1.0)])),
    ]);
    assert_eq!(
        errors(&r),
        vec![SemaError::ArityMismatch {
            name: "pair".into(),
            expected: 2,
            found: 1,
        }]
    );
}
