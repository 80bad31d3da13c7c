//! Resolution errors

use std::fmt;

use thiserror::Error;
use tern_ir::IrError;
use tern_types::Type;

/// User-facing diagnostic kinds.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SemaError {
    #[error("cannot resolve dependencies of {0}")]
    UnresolvedDependencies(String),

    #[error(
        "type argument {index} (`{param}`) of `{decl}`: `{ty}` does not satisfy the constraint `{constraint}`"
    )]
    ConstraintNotSatisfied {
        decl: String,
        index: usize,
        param: String,
        ty: Type,
        constraint: Type,
    },

    #[error("ambiguous call to `{decl}`: cannot infer type argument `{param}`")]
    MissingTypeArgument { decl: String, param: String },

    #[error("`{decl}` expects {expected} type arguments, found {found}")]
    TypeArgumentCount {
        decl: String,
        expected: usize,
        found: usize,
    },

    #[error("type mismatch: expected `{expected}`, found `{found}`")]
    TypeMismatch { expected: Type, found: Type },

    #[error("undefined variable `{0}`")]
    UndefinedVariable(String),

    #[error("undefined type `{0}`")]
    UndefinedType(String),

    #[error("property `{property}` not found on type `{ty}`")]
    PropertyNotFound { ty: Type, property: String },

    #[error("cannot call value of type `{0}`")]
    NotCallable(Type),

    #[error("`{0}` cannot be constructed")]
    NotConstructible(String),

    #[error("`{name}` expects {expected} arguments, found {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("cannot assign to constant `{0}`")]
    AssignToConst(String),

    #[error("duplicate declaration of `{0}`")]
    DuplicateDeclaration(String),

    #[error("`{0}` is not generic")]
    NotGeneric(String),

    #[error("`yield` is only supported as a statement inside a generator")]
    InvalidYield,

    #[error("spread is only supported in call arguments")]
    UnexpectedSpread,

    #[error("invalid assignment target")]
    InvalidAssignmentTarget,

    #[error("destructuring declaration of `{0}` needs an initializer")]
    MissingInitializer(String),

    #[error("internal consistency error: {0}")]
    Internal(String),
}

/// Why an attempt was put off until a later fixpoint pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferReason {
    /// A name that may be declared by a sibling not yet resolved.
    UnresolvedName(String),
    /// The named function is still under discovery.
    PendingDiscovery(String),
    /// A constraint failed while partial resolution was allowed.
    Constraint(String),
    /// A specialization still has placeholder bindings.
    StillGeneric(String),
    /// A nested statement group made no progress.
    Dependencies,
}

impl fmt::Display for DeferReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeferReason::UnresolvedName(name) => write!(f, "unresolved name `{}`", name),
            DeferReason::PendingDiscovery(name) => write!(f, "`{}` is under discovery", name),
            DeferReason::Constraint(decl) => write!(f, "constraint of `{}` not yet satisfied", decl),
            DeferReason::StillGeneric(key) => write!(f, "`{}` is still generic", key),
            DeferReason::Dependencies => write!(f, "unresolved dependencies"),
        }
    }
}

/// Internal failure of a resolution step.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Failure {
    /// Recoverable by retrying later; never shown to the user.
    #[error("deferred: {0}")]
    Deferred(DeferReason),

    /// A diagnostic has already been emitted.
    #[error("error reported")]
    Reported,

    /// Aborts the compilation unit.
    #[error("internal consistency error: {0}")]
    Internal(String),
}

impl Failure {
    pub fn is_deferred(&self) -> bool {
        matches!(self, Failure::Deferred(_))
    }
}

impl From<IrError> for Failure {
    fn from(err: IrError) -> Self {
        Failure::Internal(err.to_string())
    }
}

pub type SemaResult<T> = Result<T, Failure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_message_names_everything() {
        let err = SemaError::ConstraintNotSatisfied {
            decl: "onlyNumbers".into(),
            index: 0,
            param: "T".into(),
            ty: Type::string(),
            constraint: Type::number(),
        };
        let msg = err.to_string();
        assert!(msg.contains("onlyNumbers"));
        assert!(msg.contains("`T`"));
        assert!(msg.contains("string"));
        assert!(msg.contains("number"));
    }

    #[test]
    fn test_ir_error_is_internal() {
        let failure: Failure = IrError::NoOpenFunction.into();
        assert!(matches!(failure, Failure::Internal(_)));
        assert!(!failure.is_deferred());
    }
}
