//! IR instructions and structured control flow.

use tern_ast::Span;
use tern_types::Type;

use crate::ValueId;

/// Compile-time constant value.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Number(f64),
    String(String),
    Boolean(bool),
    Null,
    Undefined,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,

    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,

    InstanceOf,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
    Neg,
    Plus,
    Not,
    BitNot,
    TypeOf,
}

/// A sequence of instructions executed in order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Region {
    pub instructions: Vec<Instruction>,
}

impl Region {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Instructions of this region and all nested regions, depth first.
    pub fn walk(&self, f: &mut impl FnMut(&Instruction)) {
        for inst in &self.instructions {
            f(inst);
            for region in inst.op.regions() {
                region.walk(f);
            }
        }
    }
}

/// The operation an instruction performs. Operand meaning per variant is
/// noted on each variant; operands live in [`Instruction::operands`].
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Literal constant
    Const(Constant),

    /// Incoming parameter by position
    Param(usize),

    /// Mutable storage slot for a local variable; operand 0 is the initializer
    Variable { name: String },

    /// Read a storage slot (operand 0)
    Load,

    /// Write operand 1 into storage slot operand 0
    Store,

    /// Module or namespace global by full name
    GlobalRef { name: String },

    /// Storage slot of a captured variable inside the capture aggregate
    /// (operand 0)
    CaptureField { index: usize, name: String },

    /// Function value for a function with no captures
    FunctionRef { function: String },

    /// Closure value; operands are the captured storage slots in capture order
    Closure { function: String },

    /// Direct call; operands are the arguments
    Call { function: String },

    /// Call through a function value (operand 0)
    CallIndirect,

    /// Dynamic dispatch through the receiver's (operand 0) virtual table
    VirtualCall { method: String, slot: usize },

    /// Dispatch through an interface member of the receiver (operand 0)
    InterfaceCall { interface: String, method: String },

    /// Allocate an uninitialized instance; the constructor is called separately
    New { class: String },

    /// Storage slot of a named field of operand 0
    FieldRef { name: String },

    /// Storage slot of element operand 1 of operand 0
    ElementRef,

    /// Tuple value from the operands, with optional field names
    MakeTuple { names: Vec<Option<String>> },

    /// Array value from the operands
    MakeArray,

    Binary(BinOp),
    Unary(UnOp),

    /// Conversion of operand 0 to the instruction's type
    Cast,

    /// Structured conditional on operand 0
    If { then_region: Region, else_region: Region },

    /// Structured loop; `cond` ends with the condition value
    Loop {
        cond: Region,
        body: Region,
        update: Region,
    },

    Break,
    Continue,

    /// Return operand 0, if any
    Return,

    Throw,
}

impl Op {
    /// Nested regions, in execution order.
    pub fn regions(&self) -> Vec<&Region> {
        match self {
            Op::If {
                then_region,
                else_region,
            } => vec![then_region, else_region],
            Op::Loop { cond, body, update } => vec![cond, body, update],
            _ => Vec::new(),
        }
    }

    pub fn regions_mut(&mut self) -> Vec<&mut Region> {
        match self {
            Op::If {
                then_region,
                else_region,
            } => vec![then_region, else_region],
            Op::Loop { cond, body, update } => vec![cond, body, update],
            _ => Vec::new(),
        }
    }

    /// Whether this op transfers control away unconditionally.
    pub fn is_terminator(&self) -> bool {
        matches!(self, Op::Return | Op::Throw | Op::Break | Op::Continue)
    }
}

/// A single IR instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Value produced, if any
    pub result: Option<ValueId>,

    /// Resolved type of the result (`void` when there is none)
    pub ty: Type,

    pub op: Op,

    pub operands: Vec<ValueId>,

    /// Optional source span for debugging
    pub span: Option<Span>,
}
