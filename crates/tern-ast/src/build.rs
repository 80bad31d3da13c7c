//! Small constructors for synthesizing syntax.
//!
//! Used by source-to-source rewrites in the resolver and by tests that build
//! trees by hand. Nodes created here carry the default span unless one is
//! given explicitly.

use super::*;

pub fn node<T>(value: T) -> Node<T> {
    Node::new(value, Span::default())
}

pub fn at<T>(value: T, span: Span) -> Node<T> {
    Node::new(value, span)
}

// -----------------------------------------------------------------------------
// Expressions
// -----------------------------------------------------------------------------

pub fn ident(name: &str) -> Node<Expr> {
    node(Expr::Ident(Ident::new(name)))
}

pub fn num(value: f64) -> Node<Expr> {
    node(Expr::Literal(Literal::Number(value)))
}

pub fn string(value: &str) -> Node<Expr> {
    node(Expr::Literal(Literal::String(value.to_string())))
}

pub fn boolean(value: bool) -> Node<Expr> {
    node(Expr::Literal(Literal::Boolean(value)))
}

pub fn undefined() -> Node<Expr> {
    node(Expr::Literal(Literal::Undefined))
}

pub fn binary(left: Node<Expr>, op: BinaryOp, right: Node<Expr>) -> Node<Expr> {
    node(Expr::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    })
}

pub fn unary(op: UnaryOp, expr: Node<Expr>) -> Node<Expr> {
    node(Expr::Unary {
        op,
        expr: Box::new(expr),
    })
}

pub fn assign(target: Node<Expr>, value: Node<Expr>) -> Node<Expr> {
    node(Expr::Assignment {
        target: Box::new(target),
        op: AssignmentOp::Assign,
        value: Box::new(value),
    })
}

pub fn call(callee: Node<Expr>, args: Vec<Node<Expr>>) -> Node<Expr> {
    node(Expr::Call {
        callee: Box::new(callee),
        type_args: None,
        args,
    })
}

pub fn call_with_types(
    callee: Node<Expr>,
    type_args: Vec<Node<Type>>,
    args: Vec<Node<Expr>>,
) -> Node<Expr> {
    node(Expr::Call {
        callee: Box::new(callee),
        type_args: Some(type_args),
        args,
    })
}

pub fn member(object: Node<Expr>, property: &str) -> Node<Expr> {
    node(Expr::Member {
        object: Box::new(object),
        property: node(Ident::new(property)),
    })
}

pub fn index(object: Node<Expr>, idx: Node<Expr>) -> Node<Expr> {
    node(Expr::Index {
        object: Box::new(object),
        index: Box::new(idx),
    })
}

pub fn array(elements: Vec<Node<Expr>>) -> Node<Expr> {
    node(Expr::Array(elements))
}

pub fn object(fields: Vec<(&str, Node<Expr>)>) -> Node<Expr> {
    node(Expr::Object(
        fields
            .into_iter()
            .map(|(key, value)| ObjectProperty::Property {
                key: PropertyName::Ident(node(Ident::new(key))),
                value,
                shorthand: false,
            })
            .collect(),
    ))
}

pub fn ternary(condition: Node<Expr>, then_expr: Node<Expr>, else_expr: Node<Expr>) -> Node<Expr> {
    node(Expr::Ternary {
        condition: Box::new(condition),
        then_expr: Box::new(then_expr),
        else_expr: Box::new(else_expr),
    })
}

pub fn arrow(params: Vec<Param>, body: Node<Expr>) -> Node<Expr> {
    node(Expr::Arrow {
        type_params: None,
        params,
        return_type: None,
        body: ArrowBody::Expr(Box::new(body)),
    })
}

pub fn arrow_block(params: Vec<Param>, stmts: Vec<Node<Stmt>>) -> Node<Expr> {
    node(Expr::Arrow {
        type_params: None,
        params,
        return_type: None,
        body: ArrowBody::Block(Box::new(node(BlockStmt { stmts }))),
    })
}

pub fn new_expr(callee: &str, type_args: Option<Vec<Node<Type>>>, args: Vec<Node<Expr>>) -> Node<Expr> {
    node(Expr::New {
        callee: Box::new(ident(callee)),
        type_args,
        args,
    })
}

pub fn this() -> Node<Expr> {
    node(Expr::This)
}

pub fn yield_expr(argument: Option<Node<Expr>>) -> Node<Expr> {
    node(Expr::Yield {
        argument: argument.map(Box::new),
    })
}

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

pub fn prim(p: PrimitiveType) -> Node<Type> {
    node(Type::Primitive(p))
}

pub fn number_type() -> Node<Type> {
    prim(PrimitiveType::Number)
}

pub fn string_type() -> Node<Type> {
    prim(PrimitiveType::String)
}

pub fn type_ref(name: &str) -> Node<Type> {
    node(Type::TypeRef {
        name: node(Ident::new(name)),
        type_args: None,
    })
}

pub fn generic_ref(name: &str, args: Vec<Node<Type>>) -> Node<Type> {
    node(Type::TypeRef {
        name: node(Ident::new(name)),
        type_args: Some(args),
    })
}

pub fn array_type(elem: Node<Type>) -> Node<Type> {
    node(Type::Array(Box::new(elem)))
}

pub fn literal_type(lit: LiteralType) -> Node<Type> {
    node(Type::Literal(lit))
}

pub fn function_type(params: Vec<Node<Type>>, ret: Node<Type>) -> Node<Type> {
    node(Type::Function(FunctionType {
        type_params: None,
        params: params
            .into_iter()
            .map(|ty| FunctionTypeParam {
                name: None,
                ty,
                optional: false,
                is_rest: false,
            })
            .collect(),
        return_type: Box::new(ret),
    }))
}

pub fn type_param(name: &str, constraint: Option<Node<Type>>, default: Option<Node<Type>>) -> TypeParam {
    TypeParam {
        name: node(Ident::new(name)),
        constraint: constraint.map(Box::new),
        default: default.map(Box::new),
    }
}

// -----------------------------------------------------------------------------
// Patterns, parameters, statements
// -----------------------------------------------------------------------------

pub fn ident_pattern(name: &str) -> Node<Pattern> {
    node(Pattern::Ident {
        name: node(Ident::new(name)),
        type_annotation: None,
    })
}

pub fn param(name: &str, ty: Option<Node<Type>>) -> Param {
    Param {
        pattern: ident_pattern(name),
        type_annotation: ty.map(Box::new),
        default: None,
        optional: false,
        is_rest: false,
    }
}

pub fn rest_param(name: &str, ty: Option<Node<Type>>) -> Param {
    Param {
        is_rest: true,
        ..param(name, ty)
    }
}

pub fn var_decl(kind: VarDeclKind, name: &str, ty: Option<Node<Type>>, init: Option<Node<Expr>>) -> VarDecl {
    VarDecl {
        kind,
        declarations: vec![VarDeclarator {
            pattern: node(Pattern::Ident {
                name: node(Ident::new(name)),
                type_annotation: ty.map(Box::new),
            }),
            init,
        }],
    }
}

pub fn let_stmt(name: &str, ty: Option<Node<Type>>, init: Option<Node<Expr>>) -> Node<Stmt> {
    node(Stmt::VarDecl(var_decl(VarDeclKind::Let, name, ty, init)))
}

pub fn const_stmt(name: &str, init: Node<Expr>) -> Node<Stmt> {
    node(Stmt::VarDecl(var_decl(VarDeclKind::Const, name, None, Some(init))))
}

pub fn expr_stmt(expr: Node<Expr>) -> Node<Stmt> {
    node(Stmt::Expr(expr))
}

pub fn ret(expr: Option<Node<Expr>>) -> Node<Stmt> {
    node(Stmt::Return(expr))
}

pub fn block(stmts: Vec<Node<Stmt>>) -> Node<BlockStmt> {
    node(BlockStmt { stmts })
}

pub fn if_stmt(condition: Node<Expr>, then_stmt: Node<Stmt>, else_stmt: Option<Node<Stmt>>) -> Node<Stmt> {
    node(Stmt::If {
        condition,
        then_stmt: Box::new(then_stmt),
        else_stmt: else_stmt.map(Box::new),
    })
}

pub fn block_stmt(stmts: Vec<Node<Stmt>>) -> Node<Stmt> {
    node(Stmt::Block(BlockStmt { stmts }))
}

pub fn function(
    name: &str,
    type_params: Vec<TypeParam>,
    params: Vec<Param>,
    return_type: Option<Node<Type>>,
    body: Vec<Node<Stmt>>,
) -> FunctionDecl {
    FunctionDecl {
        name: node(Ident::new(name)),
        type_params: if type_params.is_empty() { None } else { Some(type_params) },
        params,
        return_type: return_type.map(Box::new),
        body: Some(block(body)),
        is_generator: false,
        is_declare: false,
    }
}

pub fn decl_item(decl: Decl) -> Node<ModuleItem> {
    node(ModuleItem::Decl(node(decl)))
}

pub fn stmt_item(stmt: Node<Stmt>) -> Node<ModuleItem> {
    node(ModuleItem::Stmt(stmt))
}

pub fn nested_decl(decl: Decl) -> Node<Stmt> {
    node(Stmt::Decl(Box::new(decl)))
}
