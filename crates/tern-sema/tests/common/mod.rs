//! Shared builders for resolver integration tests.

#![allow(dead_code)]

use tern_ast::build::*;
use tern_ast::{
    ClassDecl, ClassExtends, ClassMember, Decl, Expr, Ident, ModuleDecl, ModuleItem, Node, Param, Program,
    PropertyName, Stmt, Type, TypeParam, VarDeclKind,
};
use tern_sema::{Resolver, SemaError, SemaOptions};
use tracing_subscriber::EnvFilter;

/// Routes resolver logs to the test harness. Set `TERN_LOG=trace` to see
/// fixpoint passes and discovery.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("TERN_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

pub fn resolve_with(options: SemaOptions, items: Vec<Node<ModuleItem>>) -> Resolver {
    init_tracing();
    let mut resolver = Resolver::new(options);
    let _ = resolver.resolve_program(&Program::new(items), &[]);
    resolver
}

pub fn resolve(items: Vec<Node<ModuleItem>>) -> Resolver {
    resolve_with(SemaOptions::default(), items)
}

pub fn errors(resolver: &Resolver) -> Vec<SemaError> {
    resolver
        .diagnostics()
        .iter()
        .filter(|d| d.is_error())
        .map(|d| d.kind.clone())
        .collect()
}

pub fn assert_clean(resolver: &Resolver) {
    let errors = errors(resolver);
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
}

// ============================================================================
// Items
// ============================================================================

pub fn fn_item(
    name: &str,
    type_params: Vec<TypeParam>,
    params: Vec<Param>,
    return_type: Option<Node<Type>>,
    body: Vec<Node<Stmt>>,
) -> Node<ModuleItem> {
    decl_item(Decl::Function(function(name, type_params, params, return_type, body)))
}

pub fn generator_item(name: &str, params: Vec<Param>, body: Vec<Node<Stmt>>) -> Node<ModuleItem> {
    let decl = tern_ast::FunctionDecl {
        is_generator: true,
        ..function(name, vec![], params, None, body)
    };
    decl_item(Decl::Function(decl))
}

pub fn const_item(name: &str, init: Node<Expr>) -> Node<ModuleItem> {
    stmt_item(nested_decl(Decl::Var(var_decl(VarDeclKind::Const, name, None, Some(init)))))
}

pub fn let_item(name: &str, ty: Option<Node<Type>>, init: Node<Expr>) -> Node<ModuleItem> {
    stmt_item(nested_decl(Decl::Var(var_decl(VarDeclKind::Let, name, ty, Some(init)))))
}

pub fn namespace_item(name: &str, body: Vec<Node<ModuleItem>>) -> Node<ModuleItem> {
    decl_item(Decl::Module(ModuleDecl {
        name: node(Ident::new(name)),
        body,
        is_declare: false,
    }))
}

pub fn export(item: Node<ModuleItem>) -> Node<ModuleItem> {
    match item.value {
        ModuleItem::Decl(decl) => node(ModuleItem::Export(decl)),
        ModuleItem::Stmt(Node {
            value: Stmt::Decl(decl),
            span,
        }) => node(ModuleItem::Export(Node::new(*decl, span))),
        other => node(other),
    }
}

// ============================================================================
// Classes
// ============================================================================

pub fn class(name: &str, type_params: Vec<TypeParam>, members: Vec<ClassMember>) -> ClassDecl {
    ClassDecl {
        name: node(Ident::new(name)),
        type_params: if type_params.is_empty() { None } else { Some(type_params) },
        extends: None,
        implements: Vec::new(),
        members,
        is_abstract: false,
        is_declare: false,
    }
}

pub fn subclass(name: &str, base: &str, members: Vec<ClassMember>) -> ClassDecl {
    ClassDecl {
        extends: Some(ClassExtends {
            base: node(Ident::new(base)),
            type_args: None,
        }),
        ..class(name, vec![], members)
    }
}

pub fn class_item(decl: ClassDecl) -> Node<ModuleItem> {
    decl_item(Decl::Class(decl))
}

fn prop_name(name: &str) -> PropertyName {
    PropertyName::Ident(node(Ident::new(name)))
}

pub fn field(name: &str, ty: Node<Type>, init: Option<Node<Expr>>) -> ClassMember {
    ClassMember::Property {
        name: prop_name(name),
        type_annotation: Some(Box::new(ty)),
        init,
        is_static: false,
        is_readonly: false,
        is_optional: false,
    }
}

pub fn readonly_field(name: &str, ty: Node<Type>) -> ClassMember {
    ClassMember::Property {
        name: prop_name(name),
        type_annotation: Some(Box::new(ty)),
        init: None,
        is_static: false,
        is_readonly: true,
        is_optional: false,
    }
}

pub fn method(name: &str, params: Vec<Param>, return_type: Option<Node<Type>>, body: Vec<Node<Stmt>>) -> ClassMember {
    ClassMember::Method {
        name: prop_name(name),
        type_params: None,
        params,
        return_type: return_type.map(Box::new),
        body: Some(block(body)),
        is_static: false,
        is_abstract: false,
    }
}

pub fn ctor(params: Vec<Param>, body: Vec<Node<Stmt>>) -> ClassMember {
    ClassMember::Constructor {
        params,
        body: Some(block(body)),
    }
}

pub fn super_call(args: Vec<Node<Expr>>) -> Node<Expr> {
    call(node(Expr::Super), args)
}

pub fn super_member(name: &str) -> Node<Expr> {
    member(node(Expr::Super), name)
}
