//! IR module definition representing a compilation unit.

use crate::{IrFunction, IrGlobal, IrStruct};

/// A complete IR module representing a compilation unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IrModule {
    /// All functions in this module, in commit order
    pub functions: Vec<IrFunction>,

    /// All class layouts
    pub structs: Vec<IrStruct>,

    /// Global variables
    pub globals: Vec<IrGlobal>,
}

impl IrModule {
    /// Creates a new empty IR module.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a function to the module.
    pub fn add_function(&mut self, function: IrFunction) {
        self.functions.push(function);
    }

    /// Adds a struct type to the module.
    pub fn add_struct(&mut self, struct_def: IrStruct) {
        self.structs.push(struct_def);
    }

    /// Adds a global variable.
    pub fn add_global(&mut self, global: IrGlobal) {
        self.globals.push(global);
    }

    /// Finds a function by name.
    pub fn find_function(&self, name: &str) -> Option<&IrFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Finds a struct by name.
    pub fn find_struct(&self, name: &str) -> Option<&IrStruct> {
        self.structs.iter().find(|s| s.name == name)
    }

    pub fn find_global(&self, name: &str) -> Option<&IrGlobal> {
        self.globals.iter().find(|g| g.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.structs.is_empty() && self.globals.is_empty()
    }
}
