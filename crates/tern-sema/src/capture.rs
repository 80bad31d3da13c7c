//! Closure capture sets

use indexmap::IndexMap;
use tern_types::{Field, Type};

use crate::scope::VariableInfo;

/// Variables a function reads or writes across its own boundary, in
/// first-reference order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureSet {
    vars: IndexMap<String, VariableInfo>,
}

impl CaptureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `info` unless a capture of that name already exists.
    pub fn insert(&mut self, info: &VariableInfo) -> bool {
        if self.vars.contains_key(&info.name) {
            return false;
        }
        tracing::trace!(name = %info.name, owner = ?info.owner_function, "capture recorded");
        self.vars.insert(info.name.clone(), info.clone());
        true
    }

    pub fn names(&self) -> Vec<String> {
        self.vars.keys().cloned().collect()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.vars.get_index_of(name)
    }

    pub fn get(&self, name: &str) -> Option<&VariableInfo> {
        self.vars.get(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VariableInfo> {
        self.vars.values()
    }

    pub fn union_with(&mut self, other: &CaptureSet) {
        for info in other.iter() {
            self.insert(info);
        }
    }

    /// The tuple passed as the implicit first parameter, one named field
    /// per capture. `None` when nothing is captured.
    pub fn aggregate_type(&self) -> Option<Type> {
        if self.is_empty() {
            return None;
        }
        Some(Type::Tuple(
            self.vars
                .values()
                .map(|info| Field::named(info.name.clone(), info.ty.clone()))
                .collect(),
        ))
    }
}
