//! Mapping of syntactic types to resolved types.

use std::rc::Rc;

use tern_ast as ast;
use tern_ast::{Ident, Node, ObjectTypeMember, PrimitiveType, Span};
use tern_types::{extends, ExtendsResult, Field, FunctionType, Type, TypeBindings};

use crate::context::GenContext;
use crate::error::{DeferReason, SemaError, SemaResult};
use crate::resolver::Resolver;
use crate::scope::DeclRef;

impl Resolver {
    pub(crate) fn resolve_type(&mut self, ty: &Node<ast::Type>, ctx: &GenContext) -> SemaResult<Type> {
        match &ty.value {
            ast::Type::Primitive(p) => Ok(primitive(*p)),
            ast::Type::Array(elem) => Ok(Type::array(self.resolve_type(elem, ctx)?)),
            ast::Type::Tuple(elems) => {
                let mut fields = Vec::with_capacity(elems.len());
                for elem in elems {
                    fields.push(Field::positional(self.resolve_type(elem, ctx)?));
                }
                Ok(Type::Tuple(fields))
            }
            ast::Type::Union(members) => {
                let mut out = Vec::with_capacity(members.len());
                for member in members {
                    out.push(self.resolve_type(member, ctx)?);
                }
                Ok(Type::union(out))
            }
            ast::Type::Function(func) => {
                let ctx = with_placeholders(ctx, func.type_params.as_deref().unwrap_or_default());
                let ty = self.resolve_signature(&func.params, &func.return_type, &ctx)?;
                Ok(Type::Function(ty))
            }
            ast::Type::TypeRef { name, type_args } => {
                self.resolve_type_ref(name, type_args.as_deref(), ty.span, ctx)
            }
            ast::Type::Object(obj) => {
                let mut fields = Vec::with_capacity(obj.members.len());
                for member in &obj.members {
                    let (name, ty) = self.resolve_type_member(member, ctx)?;
                    fields.push(Field::named(name, ty));
                }
                Ok(Type::Tuple(fields))
            }
            ast::Type::Literal(lit) => Ok(match lit {
                ast::LiteralType::Number(n) => Type::num_lit(*n),
                ast::LiteralType::String(s) => Type::str_lit(s.clone()),
                ast::LiteralType::Boolean(b) => Type::bool_lit(*b),
            }),
            ast::Type::Paren(inner) => self.resolve_type(inner, ctx),
            ast::Type::Conditional {
                check_type,
                extends_type,
                true_type,
                false_type,
            } => self.resolve_conditional(check_type, extends_type, true_type, false_type, ctx),
            ast::Type::Infer(name) => Ok(Type::generic(name.value.name.clone())),
        }
    }

    pub(crate) fn resolve_optional_type(
        &mut self,
        ty: Option<&Node<ast::Type>>,
        ctx: &GenContext,
    ) -> SemaResult<Option<Type>> {
        ty.map(|ty| self.resolve_type(ty, ctx)).transpose()
    }

    /// Member of an object or interface body: its name and type.
    pub(crate) fn resolve_type_member(
        &mut self,
        member: &ObjectTypeMember,
        ctx: &GenContext,
    ) -> SemaResult<(String, Type)> {
        match member {
            ObjectTypeMember::Property { name, ty, optional, .. } => {
                let resolved = self.resolve_type(ty, ctx)?;
                let resolved = if *optional { Type::optional(resolved) } else { resolved };
                Ok((name.as_string(), resolved))
            }
            ObjectTypeMember::Method {
                name,
                type_params,
                params,
                return_type,
                optional,
            } => {
                let ctx = with_placeholders(ctx, type_params.as_deref().unwrap_or_default());
                let func = Type::Function(self.resolve_signature(params, return_type, &ctx)?);
                let func = if *optional { Type::optional(func) } else { func };
                Ok((name.as_string(), func))
            }
        }
    }

    fn resolve_signature(
        &mut self,
        params: &[ast::FunctionTypeParam],
        return_type: &Node<ast::Type>,
        ctx: &GenContext,
    ) -> SemaResult<FunctionType> {
        let mut resolved = Vec::with_capacity(params.len());
        for param in params {
            let ty = self.resolve_type(&param.ty, ctx)?;
            resolved.push(if param.optional { Type::optional(ty) } else { ty });
        }
        Ok(FunctionType {
            params: resolved,
            result: Box::new(self.resolve_type(return_type, ctx)?),
            variadic: params.last().is_some_and(|p| p.is_rest),
        })
    }

    fn resolve_type_ref(
        &mut self,
        name: &Node<Ident>,
        type_args: Option<&[Node<ast::Type>]>,
        span: Span,
        ctx: &GenContext,
    ) -> SemaResult<Type> {
        let raw = name.value.name.as_str();
        if type_args.is_none() {
            if let Some(bound) = ctx.bindings.get(raw) {
                return Ok(bound.clone());
            }
        }
        let mut args = Vec::new();
        for arg in type_args.unwrap_or_default() {
            args.push(self.resolve_type(arg, ctx)?);
        }
        if matches!(raw, "Array" | "ReadonlyArray") && args.len() == 1 {
            return Ok(Type::array(args.remove(0)));
        }

        let Some(decl) = self.lookup_type_decl(raw) else {
            return Err(self.defer_or_report(
                ctx,
                span,
                DeferReason::UnresolvedName(raw.to_string()),
                SemaError::UndefinedType(raw.to_string()),
            ));
        };
        tracing::trace!(name = raw, ?decl, "type reference");
        let explicit = type_args.is_some();
        match decl {
            DeclRef::Class(full) => {
                self.reject_type_args(&full, explicit, span)?;
                Ok(self.tables.classes.get(&full).map_or_else(|| Type::class(&full), |c| c.ty()))
            }
            DeclRef::Interface(full) => {
                self.reject_type_args(&full, explicit, span)?;
                self.ensure_interface(&full, ctx)?;
                Ok(Type::interface(full))
            }
            DeclRef::Enum(full) => {
                self.reject_type_args(&full, explicit, span)?;
                self.ensure_enum(&full, ctx)
            }
            DeclRef::Alias(full) => {
                self.reject_type_args(&full, explicit, span)?;
                self.ensure_alias(&full, ctx)
            }
            DeclRef::GenericClass(full) => self.class_type_for(&full, args, span, ctx),
            DeclRef::GenericInterface(full) => self.interface_type_for(&full, args, span, ctx),
            DeclRef::GenericAlias(full) => self.alias_type_for(&full, args, span, ctx),
            DeclRef::Function(_) | DeclRef::GenericFunction(_) | DeclRef::Namespace(_) => {
                Err(self.report(span, SemaError::UndefinedType(raw.to_string())))
            }
        }
    }

    pub(crate) fn reject_type_args(&mut self, full: &str, explicit: bool, span: Span) -> SemaResult<()> {
        if explicit {
            return Err(self.report(span, SemaError::NotGeneric(full.to_string())));
        }
        Ok(())
    }

    /// Finds the declaration a type name refers to: lexical declarations
    /// first, then the namespace chain. Dotted names go through namespaces.
    pub(crate) fn lookup_type_decl(&self, raw: &str) -> Option<DeclRef> {
        let current = self.namespace.current();
        if let Some((path, last)) = raw.rsplit_once('.') {
            let segments: Vec<&str> = path.split('.').collect();
            let ns = self.tables.lookup_namespace(&current, &segments)?;
            return self.tables.lookup_type_in(&ns, last);
        }
        if let Some(decl) = self.scopes.lookup_type(raw) {
            return Some(decl.clone());
        }
        self.tables.lookup_type(&current, raw)
    }

    /// `C extends E ? T : F`. An indeterminate test yields both branches;
    /// `infer` placeholders bound by the test are visible in the true branch.
    fn resolve_conditional(
        &mut self,
        check_type: &Node<ast::Type>,
        extends_type: &Node<ast::Type>,
        true_type: &Node<ast::Type>,
        false_type: &Node<ast::Type>,
        ctx: &GenContext,
    ) -> SemaResult<Type> {
        let check = self.resolve_type(check_type, ctx)?;
        let mut infer_names = Vec::new();
        collect_infer_names(extends_type, &mut infer_names);
        let constraint = self.resolve_type(extends_type, ctx)?;

        let mut inferred = TypeBindings::new();
        let result = extends(&check, &constraint, &mut inferred, &self.tables);
        tracing::trace!(check = %check, constraint = %constraint, ?result, "conditional type");

        let true_ctx = |inferred: &TypeBindings| {
            let mut bindings = (*ctx.bindings).clone();
            for name in &infer_names {
                bindings.insert(name.clone(), inferred.get(name).cloned().unwrap_or(Type::Any));
            }
            ctx.with_bindings(Rc::new(bindings))
        };
        match result {
            ExtendsResult::True => self.resolve_type(true_type, &true_ctx(&inferred)),
            ExtendsResult::False => self.resolve_type(false_type, ctx),
            ExtendsResult::Any => {
                let when_true = self.resolve_type(true_type, &true_ctx(&inferred))?;
                let when_false = self.resolve_type(false_type, ctx)?;
                Ok(Type::union([when_true, when_false]))
            }
            ExtendsResult::Never => Ok(Type::Never),
        }
    }
}

fn primitive(p: PrimitiveType) -> Type {
    use tern_types::Primitive;
    match p {
        PrimitiveType::Number => Type::number(),
        PrimitiveType::String => Type::string(),
        PrimitiveType::Boolean => Type::boolean(),
        PrimitiveType::BigInt => Type::Primitive(Primitive::BigInt),
        PrimitiveType::Symbol => Type::Primitive(Primitive::Symbol),
        PrimitiveType::Void => Type::void(),
        PrimitiveType::Null => Type::null(),
        PrimitiveType::Undefined => Type::undefined(),
        PrimitiveType::Any => Type::Any,
        PrimitiveType::Never => Type::Never,
        PrimitiveType::Unknown => Type::Unknown,
    }
}

/// Binds each type parameter to its own placeholder.
pub(crate) fn with_placeholders(ctx: &GenContext, params: &[ast::TypeParam]) -> GenContext {
    if params.is_empty() {
        return ctx.clone();
    }
    let mut bindings = (*ctx.bindings).clone();
    for param in params {
        let name = &param.name.value.name;
        bindings.insert(name.clone(), Type::generic(name.clone()));
    }
    ctx.with_bindings(Rc::new(bindings))
}

/// Like [`with_placeholders`], but keeps parameters `ctx` already binds.
/// A specialization's body sees its concrete arguments this way.
pub(crate) fn with_unbound_placeholders(ctx: &GenContext, params: &[ast::TypeParam]) -> GenContext {
    let unbound: Vec<ast::TypeParam> = params
        .iter()
        .filter(|param| !ctx.bindings.contains(&param.name.value.name))
        .cloned()
        .collect();
    with_placeholders(ctx, &unbound)
}

fn collect_infer_names(ty: &Node<ast::Type>, out: &mut Vec<String>) {
    match &ty.value {
        ast::Type::Infer(name) => {
            if !out.contains(&name.value.name) {
                out.push(name.value.name.clone());
            }
        }
        ast::Type::Array(inner) | ast::Type::Paren(inner) => collect_infer_names(inner, out),
        ast::Type::Tuple(items) | ast::Type::Union(items) => {
            for item in items {
                collect_infer_names(item, out);
            }
        }
        ast::Type::Function(func) => {
            for param in &func.params {
                collect_infer_names(&param.ty, out);
            }
            collect_infer_names(&func.return_type, out);
        }
        ast::Type::TypeRef { type_args, .. } => {
            for arg in type_args.iter().flatten() {
                collect_infer_names(arg, out);
            }
        }
        ast::Type::Object(obj) => {
            for member in &obj.members {
                if let ObjectTypeMember::Property { ty, .. } = member {
                    collect_infer_names(ty, out);
                }
            }
        }
        ast::Type::Conditional { .. } | ast::Type::Primitive(_) | ast::Type::Literal(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_ast::build::*;
    use tern_ast::{LiteralType, ObjectType};

    fn resolve(ty: Node<ast::Type>) -> Type {
        let mut r = Resolver::default();
        r.resolve_type(&ty, &GenContext::new()).unwrap()
    }

    #[test]
    fn test_structural_types() {
        let obj = node(ast::Type::Object(ObjectType {
            members: vec![ObjectTypeMember::Property {
                name: tern_ast::PropertyName::Ident(node(Ident::new("x"))),
                ty: number_type(),
                optional: true,
                readonly: false,
            }],
        }));
        assert_eq!(resolve(obj), Type::object(vec![("x", Type::optional(Type::number()))]));
        assert_eq!(
            resolve(function_type(vec![string_type()], array_type(number_type()))),
            Type::function(vec![Type::string()], Type::array(Type::number()))
        );
        assert_eq!(
            resolve(generic_ref("Array", vec![literal_type(LiteralType::Boolean(true))])),
            Type::array(Type::bool_lit(true))
        );
    }

    #[test]
    fn test_bindings_shadow_declarations() {
        let mut r = Resolver::default();
        let ctx = GenContext::new().with_bindings(Rc::new(TypeBindings::from_pairs([(
            "T".to_string(),
            Type::string(),
        )])));
        assert_eq!(r.resolve_type(&type_ref("T"), &ctx).unwrap(), Type::string());
    }

    #[test]
    fn test_bound_parameters_keep_their_arguments() {
        let params = vec![type_param("T", None, None), type_param("U", None, None)];
        let ctx = GenContext::new().with_bindings(Rc::new(TypeBindings::from_pairs([(
            "T".to_string(),
            Type::number(),
        )])));
        let ctx = with_unbound_placeholders(&ctx, &params);
        assert_eq!(ctx.bindings.get("T"), Some(&Type::number()));
        assert_eq!(ctx.bindings.get("U"), Some(&Type::generic("U")));
        assert_eq!(
            with_placeholders(&ctx, &params).bindings.get("T"),
            Some(&Type::generic("T"))
        );
    }

    #[test]
    fn test_unknown_type_defers_or_reports() {
        let mut r = Resolver::default();
        let err = r.resolve_type(&type_ref("Nope"), &GenContext::new().partial()).unwrap_err();
        assert!(err.is_deferred());
        assert!(r.diagnostics().is_empty());
        r.resolve_type(&type_ref("Nope"), &GenContext::new()).unwrap_err();
        assert_eq!(r.diagnostics()[0].kind, SemaError::UndefinedType("Nope".into()));
    }

    fn conditional(check: Node<ast::Type>, ext: Node<ast::Type>, t: Node<ast::Type>, f: Node<ast::Type>) -> Node<ast::Type> {
        node(ast::Type::Conditional {
            check_type: Box::new(check),
            extends_type: Box::new(ext),
            true_type: Box::new(t),
            false_type: Box::new(f),
        })
    }

    #[test]
    fn test_conditional_branches() {
        let picked = resolve(conditional(
            literal_type(LiteralType::Number(1.0)),
            number_type(),
            string_type(),
            prim(PrimitiveType::Boolean),
        ));
        assert_eq!(picked, Type::string());

        let both = resolve(conditional(
            prim(PrimitiveType::Any),
            number_type(),
            string_type(),
            prim(PrimitiveType::Boolean),
        ));
        assert_eq!(both, Type::union([Type::string(), Type::boolean()]));
    }

    #[test]
    fn test_conditional_infer_binds_true_branch() {
        let ty = conditional(
            array_type(string_type()),
            array_type(node(ast::Type::Infer(node(Ident::new("E"))))),
            type_ref("E"),
            prim(PrimitiveType::Never),
        );
        assert_eq!(resolve(ty), Type::string());
    }
}
