//! # Tern types
//!
//! Resolved type values and the lattice the resolver computes over them:
//! literal widening, branch joins, the four-valued `extends` relation and
//! structural inference of type-parameter bindings.

pub mod bindings;
pub mod infer;
pub mod lattice;
pub mod subst;
pub mod ty;

pub use bindings::TypeBindings;
pub use infer::infer;
pub use lattice::{extends, merge, merge_all, widen, ExtendsResult, Member, NoEnv, TypeEnv};
pub use subst::substitute;
pub use ty::{specialization_name, Field, FunctionType, GenericOrigin, LiteralValue, NamedType, Primitive, Type};

#[cfg(test)]
mod prop_tests;
