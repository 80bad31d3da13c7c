//! # Tern semantic resolution
//!
//! Resolves a parsed program into typed IR: namespaces and lexical scopes,
//! closure capture analysis, on-demand generic instantiation, two-pass
//! discovery and commit of function bodies, and fixpoint resolution of
//! declarations that reference each other in any order.
//!
//! ```ignore
//! let resolution = tern_sema::resolve_program(&program)?;
//! for function in &resolution.module.functions {
//!     println!("{}", function.name);
//! }
//! ```

pub mod capture;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod namespace;
pub mod scope;
pub mod specialization;
pub mod symbols;

mod discovery;
mod fixpoint;
mod generics;
mod resolve_decl;
mod resolve_expr;
mod resolve_stmt;
mod resolver;
mod rewrite;
mod type_ref;

use tern_ast::{ModuleItem, Node, Program};
use tern_ir::IrModule;

pub use capture::CaptureSet;
pub use config::SemaOptions;
pub use diagnostics::{Diagnostic, Severity};
pub use error::SemaError;
pub use fixpoint::ResolutionState;
pub use resolver::Resolver;
pub use specialization::{SpecKind, SpecState, Specialization};

/// Declarations resolved ahead of the program, such as ambient
/// declaration files. Their items share the root namespace.
pub trait DeclarationSource {
    fn name(&self) -> &str;
    fn items(&self) -> Vec<Node<ModuleItem>>;
}

/// Output of a successful run.
#[derive(Debug)]
pub struct Resolution {
    pub module: IrModule,
    /// Warnings; errors fail the run.
    pub diagnostics: Vec<Diagnostic>,
}

/// Resolves `program` with default options.
pub fn resolve_program(program: &Program) -> Result<Resolution, Vec<Diagnostic>> {
    resolve_program_with_sources(program, &[], SemaOptions::default())
}

pub fn resolve_program_with_sources(
    program: &Program,
    sources: &[&dyn DeclarationSource],
    options: SemaOptions,
) -> Result<Resolution, Vec<Diagnostic>> {
    let mut resolver = Resolver::new(options);
    resolver.resolve_program(program, sources)?;
    resolver.into_resolution()
}
