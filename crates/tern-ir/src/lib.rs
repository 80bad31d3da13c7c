//! Typed intermediate representation produced by the semantic front end.
//!
//! Functions hold structured regions of instructions; every value-producing
//! instruction carries its resolved [`Type`](tern_types::Type). The
//! [`IrBuilder`] is the emitter the resolver drives: it creates typed values,
//! brackets functions and regions, saves and restores insertion points,
//! erases everything created after a [`Mark`], and swaps in disposable
//! scratch modules for speculative passes.

pub mod builder;
pub mod function;
pub mod instruction;
pub mod module;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for a value within a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub u32);

impl std::fmt::Display for ValueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.0)
    }
}

// ============================================================================
// Re-exports (public API)
// ============================================================================

pub use builder::{InsertionPoint, IrBuilder, IrError, Mark, ScratchToken};
pub use function::{IrFunction, IrGlobal, IrParam, IrStruct};
pub use instruction::{BinOp, Constant, Instruction, Op, Region, UnOp};
pub use module::IrModule;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_id_display() {
        assert_eq!(format!("{}", ValueId(3)), "%3");
    }
}
