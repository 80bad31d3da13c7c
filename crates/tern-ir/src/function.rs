//! IR function, struct and global definitions.

use rustc_hash::FxHashMap;
use tern_ast::Span;
use tern_types::Type;

use crate::{Region, ValueId};

/// A function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct IrParam {
    pub name: String,
    pub ty: Type,
}

impl IrParam {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// An IR function definition.
#[derive(Debug, Clone, PartialEq)]
pub struct IrFunction {
    /// Full name (namespace-qualified; specializations carry their key)
    pub name: String,

    /// Parameters; a capturing function has the capture aggregate first
    pub params: Vec<IrParam>,

    /// Return type
    pub return_type: Type,

    /// Capture aggregate type, when the function captures anything
    pub captures: Option<Type>,

    /// Function body
    pub body: Region,

    /// Optional source span for debugging
    pub span: Option<Span>,
}

impl IrFunction {
    /// Creates a new function with an empty body.
    pub fn new(name: impl Into<String>, params: Vec<IrParam>, return_type: Type) -> Self {
        IrFunction {
            name: name.into(),
            params,
            return_type,
            captures: None,
            body: Region::new(),
            span: None,
        }
    }

    /// The function's own type, without the capture aggregate.
    pub fn signature(&self) -> Type {
        let skip = usize::from(self.captures.is_some());
        Type::function(
            self.params.iter().skip(skip).map(|p| p.ty.clone()).collect(),
            self.return_type.clone(),
        )
    }

    /// Reassigns value ids densely in definition order.
    pub fn renumber(&mut self) {
        let mut map: FxHashMap<ValueId, ValueId> = FxHashMap::default();
        renumber_region(&mut self.body, &mut map);
    }

    /// Number of instructions, including nested regions.
    pub fn instruction_count(&self) -> usize {
        let mut count = 0;
        self.body.walk(&mut |_| count += 1);
        count
    }
}

fn renumber_region(region: &mut Region, map: &mut FxHashMap<ValueId, ValueId>) {
    for inst in &mut region.instructions {
        for operand in &mut inst.operands {
            if let Some(new) = map.get(operand) {
                *operand = *new;
            }
        }
        if let Some(result) = inst.result {
            let new = ValueId(map.len() as u32);
            map.insert(result, new);
            inst.result = Some(new);
        }
        for nested in inst.op.regions_mut() {
            renumber_region(nested, map);
        }
    }
}

/// A class layout: fields in slot order plus its virtual table.
#[derive(Debug, Clone, PartialEq)]
pub struct IrStruct {
    /// Full class name (specializations carry their key)
    pub name: String,

    /// Base class, if any
    pub base: Option<String>,

    /// Implemented interfaces
    pub interfaces: Vec<String>,

    /// Field names and types, base fields first
    pub fields: Vec<(String, Type)>,

    /// Method name and implementing function, in slot order
    pub vtable: Vec<(String, String)>,
}

impl IrStruct {
    pub fn new(name: impl Into<String>, fields: Vec<(String, Type)>) -> Self {
        IrStruct {
            name: name.into(),
            base: None,
            interfaces: Vec::new(),
            fields,
            vtable: Vec::new(),
        }
    }

    /// Gets the index of a field by name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|(n, _)| n == name)
    }

    /// Gets the virtual-table slot of a method.
    pub fn vtable_slot(&self, method: &str) -> Option<usize> {
        self.vtable.iter().position(|(m, _)| m == method)
    }
}

/// A module or namespace level variable.
#[derive(Debug, Clone, PartialEq)]
pub struct IrGlobal {
    pub name: String,
    pub ty: Type,
    pub is_const: bool,
}
