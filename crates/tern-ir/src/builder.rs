//! The IR emitter.
//!
//! Functions under construction form a stack of frames: committing a nested
//! function while its parent is still open is the normal case. Each frame has
//! a stack of open regions; instructions always go to the innermost region of
//! the innermost frame.

use thiserror::Error;
use tern_ast::Span;
use tern_types::Type;

use crate::{Instruction, IrFunction, IrGlobal, IrModule, IrStruct, Op, Region, ValueId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IrError {
    #[error("no function is open")]
    NoOpenFunction,

    #[error("no region is open in function `{0}`")]
    NoOpenRegion(String),

    #[error("function `{name}` finished with {open} unclosed regions")]
    UnbalancedRegions { name: String, open: usize },

    #[error("function `{0}` is already defined")]
    DuplicateFunction(String),

    #[error("struct `{0}` is already defined")]
    DuplicateStruct(String),

    #[error("scratch token does not match the innermost scratch module")]
    ScratchMismatch,

    #[error("{0} functions are still open")]
    OpenFunctions(usize),
}

struct Frame {
    function: IrFunction,
    regions: Vec<Region>,
    next_value: u32,
}

/// Module contents at a point in time; see [`IrBuilder::erase_since`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    functions: usize,
    structs: usize,
    globals: usize,
    scratch_depth: usize,
}

/// Saved function nesting; see [`IrBuilder::restore_insertion_point`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertionPoint {
    depth: usize,
    regions: usize,
}

/// Handle for one [`IrBuilder::begin_scratch`] call.
#[derive(Debug)]
#[must_use = "a scratch module must be dropped with IrBuilder::drop_scratch"]
pub struct ScratchToken {
    depth: usize,
}

/// Builds an [`IrModule`].
#[derive(Default)]
pub struct IrBuilder {
    module: IrModule,
    frames: Vec<Frame>,
    /// Permanent state swapped out while scratch modules are active.
    saved: Vec<(IrModule, Vec<Frame>)>,
}

impl IrBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn module(&self) -> &IrModule {
        &self.module
    }

    /// Whether output currently goes to a disposable scratch module.
    pub fn in_scratch(&self) -> bool {
        !self.saved.is_empty()
    }

    // =========================================================================
    // Functions
    // =========================================================================

    /// Opens `function` for emission. Its body region is the insertion point
    /// until a region is opened or the function is finished.
    pub fn begin_function(&mut self, function: IrFunction) {
        tracing::trace!(function = %function.name, scratch = self.in_scratch(), "begin function");
        self.frames.push(Frame {
            function,
            regions: vec![Region::new()],
            next_value: 0,
        });
    }

    pub fn current_function(&self) -> Option<&IrFunction> {
        self.frames.last().map(|f| &f.function)
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.module.find_function(name).is_some()
    }

    /// Closes the innermost function and adds it to the module.
    pub fn finish_function(&mut self) -> Result<(), IrError> {
        let mut frame = self.frames.pop().ok_or(IrError::NoOpenFunction)?;
        if frame.regions.len() != 1 {
            return Err(IrError::UnbalancedRegions {
                name: frame.function.name,
                open: frame.regions.len() - 1,
            });
        }
        if self.has_function(&frame.function.name) {
            return Err(IrError::DuplicateFunction(frame.function.name));
        }
        frame.function.body = frame.regions.pop().unwrap_or_default();
        frame.function.renumber();
        tracing::debug!(
            function = %frame.function.name,
            instructions = frame.function.instruction_count(),
            scratch = self.in_scratch(),
            "function committed"
        );
        self.module.add_function(frame.function);
        Ok(())
    }

    /// Drops the innermost function without committing it.
    pub fn abandon_function(&mut self) {
        if let Some(frame) = self.frames.pop() {
            tracing::trace!(function = %frame.function.name, "function abandoned");
        }
    }

    /// Sets the capture aggregate of the innermost open function.
    pub fn set_captures(&mut self, captures: Option<Type>) -> Result<(), IrError> {
        let frame = self.frames.last_mut().ok_or(IrError::NoOpenFunction)?;
        frame.function.captures = captures;
        Ok(())
    }

    // =========================================================================
    // Instructions
    // =========================================================================

    /// Emits an instruction producing a value of type `ty`.
    pub fn create_value(&mut self, ty: Type, op: Op, operands: Vec<ValueId>) -> Result<ValueId, IrError> {
        self.create_value_at(ty, op, operands, None)
    }

    pub fn create_value_at(
        &mut self,
        ty: Type,
        op: Op,
        operands: Vec<ValueId>,
        span: Option<Span>,
    ) -> Result<ValueId, IrError> {
        let frame = self.frames.last_mut().ok_or(IrError::NoOpenFunction)?;
        let id = ValueId(frame.next_value);
        frame.next_value += 1;
        let region = frame
            .regions
            .last_mut()
            .ok_or_else(|| IrError::NoOpenRegion(frame.function.name.clone()))?;
        region.instructions.push(Instruction {
            result: Some(id),
            ty,
            op,
            operands,
            span,
        });
        Ok(id)
    }

    /// Emits an instruction with no result.
    pub fn emit(&mut self, op: Op, operands: Vec<ValueId>) -> Result<(), IrError> {
        self.emit_at(op, operands, None)
    }

    pub fn emit_at(&mut self, op: Op, operands: Vec<ValueId>, span: Option<Span>) -> Result<(), IrError> {
        let frame = self.frames.last_mut().ok_or(IrError::NoOpenFunction)?;
        let region = frame
            .regions
            .last_mut()
            .ok_or_else(|| IrError::NoOpenRegion(frame.function.name.clone()))?;
        region.instructions.push(Instruction {
            result: None,
            ty: Type::void(),
            op,
            operands,
            span,
        });
        Ok(())
    }

    /// Whether the innermost region already ends in a terminator.
    pub fn region_terminated(&self) -> bool {
        self.frames
            .last()
            .and_then(|f| f.regions.last())
            .and_then(|r| r.instructions.last())
            .is_some_and(|inst| inst.op.is_terminator())
    }

    // =========================================================================
    // Regions
    // =========================================================================

    /// Opens a nested region; instructions go there until [`end_region`].
    ///
    /// [`end_region`]: IrBuilder::end_region
    pub fn begin_region(&mut self) -> Result<(), IrError> {
        let frame = self.frames.last_mut().ok_or(IrError::NoOpenFunction)?;
        frame.regions.push(Region::new());
        Ok(())
    }

    pub fn end_region(&mut self) -> Result<Region, IrError> {
        let frame = self.frames.last_mut().ok_or(IrError::NoOpenFunction)?;
        if frame.regions.len() <= 1 {
            return Err(IrError::NoOpenRegion(frame.function.name.clone()));
        }
        frame
            .regions
            .pop()
            .ok_or_else(|| IrError::NoOpenRegion(frame.function.name.clone()))
    }

    /// Appends the instructions of a detached region at the insertion point.
    /// Value ids must come from the innermost function.
    pub fn splice(&mut self, region: Region) -> Result<(), IrError> {
        let frame = self.frames.last_mut().ok_or(IrError::NoOpenFunction)?;
        let target = frame
            .regions
            .last_mut()
            .ok_or_else(|| IrError::NoOpenRegion(frame.function.name.clone()))?;
        target.instructions.extend(region.instructions);
        Ok(())
    }

    // =========================================================================
    // Insertion points, marks and scratch modules
    // =========================================================================

    pub fn insertion_point(&self) -> InsertionPoint {
        InsertionPoint {
            depth: self.frames.len(),
            regions: self.frames.last().map_or(0, |f| f.regions.len()),
        }
    }

    /// Abandons every function and region opened after `point` was taken.
    pub fn restore_insertion_point(&mut self, point: InsertionPoint) {
        while self.frames.len() > point.depth {
            self.abandon_function();
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.regions.truncate(point.regions.max(1));
        }
    }

    pub fn mark(&self) -> Mark {
        Mark {
            functions: self.module.functions.len(),
            structs: self.module.structs.len(),
            globals: self.module.globals.len(),
            scratch_depth: self.saved.len(),
        }
    }

    /// Erases every function, struct and global committed after `mark`.
    pub fn erase_since(&mut self, mark: Mark) -> Result<(), IrError> {
        if mark.scratch_depth != self.saved.len() {
            return Err(IrError::ScratchMismatch);
        }
        let erased = self.module.functions.len().saturating_sub(mark.functions);
        self.module.functions.truncate(mark.functions);
        self.module.structs.truncate(mark.structs);
        self.module.globals.truncate(mark.globals);
        if erased > 0 {
            tracing::trace!(erased, "erased functions since mark");
        }
        Ok(())
    }

    /// Redirects all emission into a fresh, empty module with no open
    /// functions. The permanent module and open frames are untouched until
    /// the matching [`drop_scratch`].
    ///
    /// [`drop_scratch`]: IrBuilder::drop_scratch
    pub fn begin_scratch(&mut self) -> ScratchToken {
        let module = std::mem::take(&mut self.module);
        let frames = std::mem::take(&mut self.frames);
        self.saved.push((module, frames));
        tracing::trace!(depth = self.saved.len(), "begin scratch");
        ScratchToken {
            depth: self.saved.len(),
        }
    }

    /// Discards the scratch module and restores the state saved by the
    /// matching [`begin_scratch`]. Returns the discarded module.
    ///
    /// [`begin_scratch`]: IrBuilder::begin_scratch
    pub fn drop_scratch(&mut self, token: ScratchToken) -> Result<IrModule, IrError> {
        if token.depth != self.saved.len() {
            return Err(IrError::ScratchMismatch);
        }
        let (module, frames) = self.saved.pop().ok_or(IrError::ScratchMismatch)?;
        let scratch = std::mem::replace(&mut self.module, module);
        self.frames = frames;
        tracing::trace!(depth = token.depth, functions = scratch.functions.len(), "drop scratch");
        Ok(scratch)
    }

    // =========================================================================
    // Structs and globals
    // =========================================================================

    pub fn add_struct(&mut self, def: IrStruct) -> Result<(), IrError> {
        if self.module.find_struct(&def.name).is_some() {
            return Err(IrError::DuplicateStruct(def.name));
        }
        self.module.add_struct(def);
        Ok(())
    }

    /// Adds a global; re-adding an existing name is a no-op.
    pub fn add_global(&mut self, global: IrGlobal) {
        if self.module.find_global(&global.name).is_none() {
            self.module.add_global(global);
        }
    }

    /// Finishes building and returns the permanent module.
    pub fn finish(mut self) -> Result<IrModule, IrError> {
        while let Some((module, frames)) = self.saved.pop() {
            self.module = module;
            self.frames = frames;
        }
        if !self.frames.is_empty() {
            return Err(IrError::OpenFunctions(self.frames.len()));
        }
        Ok(self.module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Constant, IrParam};

    fn open(builder: &mut IrBuilder, name: &str) {
        builder.begin_function(IrFunction::new(name, vec![IrParam::new("x", Type::number())], Type::number()));
    }

    #[test]
    fn test_create_value_numbers_sequentially() {
        let mut b = IrBuilder::new();
        open(&mut b, "f");
        let p = b.create_value(Type::number(), Op::Param(0), vec![]).unwrap();
        let c = b
            .create_value(Type::num_lit(1.0), Op::Const(Constant::Number(1.0)), vec![])
            .unwrap();
        assert_eq!((p, c), (ValueId(0), ValueId(1)));
        b.emit(Op::Return, vec![c]).unwrap();
        b.finish_function().unwrap();
        let f = b.module().find_function("f").unwrap();
        assert_eq!(f.body.len(), 3);
    }

    #[test]
    fn test_no_open_function() {
        let mut b = IrBuilder::new();
        assert_eq!(
            b.create_value(Type::number(), Op::Param(0), vec![]),
            Err(IrError::NoOpenFunction)
        );
    }

    #[test]
    fn test_regions_nest_and_balance() {
        let mut b = IrBuilder::new();
        open(&mut b, "f");
        let cond = b
            .create_value(Type::bool_lit(true), Op::Const(Constant::Boolean(true)), vec![])
            .unwrap();
        b.begin_region().unwrap();
        b.emit(Op::Return, vec![]).unwrap();
        let then_region = b.end_region().unwrap();
        b.emit(
            Op::If {
                then_region,
                else_region: Region::new(),
            },
            vec![cond],
        )
        .unwrap();
        assert!(b.end_region().is_err());
        b.finish_function().unwrap();

        open(&mut b, "g");
        b.begin_region().unwrap();
        assert_eq!(
            b.finish_function(),
            Err(IrError::UnbalancedRegions {
                name: "g".into(),
                open: 1
            })
        );
    }

    #[test]
    fn test_nested_functions_commit_inner_first() {
        let mut b = IrBuilder::new();
        open(&mut b, "outer");
        open(&mut b, "inner");
        b.finish_function().unwrap();
        b.create_value(
            Type::function(vec![], Type::void()),
            Op::FunctionRef {
                function: "inner".into(),
            },
            vec![],
        )
        .unwrap();
        b.finish_function().unwrap();
        let names: Vec<&str> = b.module().functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["inner", "outer"]);
    }

    #[test]
    fn test_duplicate_function_rejected() {
        let mut b = IrBuilder::new();
        open(&mut b, "f");
        b.finish_function().unwrap();
        open(&mut b, "f");
        assert_eq!(b.finish_function(), Err(IrError::DuplicateFunction("f".into())));
    }

    #[test]
    fn test_mark_and_erase() {
        let mut b = IrBuilder::new();
        open(&mut b, "kept");
        b.finish_function().unwrap();
        let mark = b.mark();
        open(&mut b, "dropped");
        b.finish_function().unwrap();
        b.add_struct(IrStruct::new("S", vec![])).unwrap();
        b.erase_since(mark).unwrap();
        assert!(b.has_function("kept"));
        assert!(!b.has_function("dropped"));
        assert!(b.module().structs.is_empty());
    }

    #[test]
    fn test_scratch_is_isolated_and_discarded() {
        let mut b = IrBuilder::new();
        open(&mut b, "outer");
        b.create_value(Type::number(), Op::Param(0), vec![]).unwrap();

        let token = b.begin_scratch();
        assert!(b.in_scratch());
        assert!(b.current_function().is_none());
        open(&mut b, "speculative");
        b.finish_function().unwrap();
        let scratch = b.drop_scratch(token).unwrap();
        assert!(scratch.find_function("speculative").is_some());

        assert!(!b.in_scratch());
        assert_eq!(b.current_function().map(|f| f.name.as_str()), Some("outer"));
        b.finish_function().unwrap();
        assert!(!b.has_function("speculative"));
        let outer = b.module().find_function("outer").unwrap();
        assert_eq!(outer.body.len(), 1);
    }

    #[test]
    fn test_scratch_tokens_must_nest() {
        let mut b = IrBuilder::new();
        let outer = b.begin_scratch();
        let inner = b.begin_scratch();
        assert_eq!(b.drop_scratch(outer).unwrap_err(), IrError::ScratchMismatch);
        b.drop_scratch(inner).unwrap();
        assert!(b.in_scratch());
    }

    #[test]
    fn test_restore_insertion_point_abandons_nested() {
        let mut b = IrBuilder::new();
        open(&mut b, "outer");
        let point = b.insertion_point();
        open(&mut b, "abandoned");
        b.begin_region().unwrap();
        b.restore_insertion_point(point);
        assert_eq!(b.current_function().map(|f| f.name.as_str()), Some("outer"));
        b.finish_function().unwrap();
        assert!(b.finish().unwrap().find_function("abandoned").is_none());
    }

    #[test]
    fn test_splice_keeps_source_order() {
        let mut b = IrBuilder::new();
        open(&mut b, "init");
        b.begin_region().unwrap();
        b.emit(Op::Break, vec![]).unwrap();
        let first = b.end_region().unwrap();
        b.begin_region().unwrap();
        b.emit(Op::Continue, vec![]).unwrap();
        let second = b.end_region().unwrap();
        b.splice(second).unwrap();
        b.splice(first).unwrap();
        b.finish_function().unwrap();
        let ops: Vec<&Op> = b.module().functions[0].body.instructions.iter().map(|i| &i.op).collect();
        assert_eq!(ops, vec![&Op::Continue, &Op::Break]);
    }

    #[test]
    fn test_renumber_after_dropped_region() {
        let mut b = IrBuilder::new();
        open(&mut b, "f");
        b.begin_region().unwrap();
        b.create_value(Type::number(), Op::Param(0), vec![]).unwrap();
        let _ = b.end_region().unwrap();
        let v = b.create_value(Type::number(), Op::Param(0), vec![]).unwrap();
        assert_eq!(v, ValueId(1));
        b.emit(Op::Return, vec![v]).unwrap();
        b.finish_function().unwrap();
        let f = b.module().find_function("f").unwrap();
        assert_eq!(f.body.instructions[0].result, Some(ValueId(0)));
        assert_eq!(f.body.instructions[1].operands, vec![ValueId(0)]);
    }
}
