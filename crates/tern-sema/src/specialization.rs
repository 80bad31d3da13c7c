//! Specialization cache keyed by `fullName<args>`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tern_types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecState {
    Processing,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecKind {
    Function,
    Class,
    Interface,
    Alias,
}

/// One instantiation of a generic declaration.
#[derive(Debug)]
pub struct Specialization {
    pub key: String,
    pub kind: SpecKind,
    pub generic: String,
    pub args: Vec<Type>,
    pub(crate) state: Cell<SpecState>,
    /// Resolved type: the signature for functions, the named type for
    /// classes and interfaces, the aliased type for aliases.
    pub(crate) ty: RefCell<Option<Type>>,
}

impl Specialization {
    pub fn state(&self) -> SpecState {
        self.state.get()
    }

    pub fn ty(&self) -> Option<Type> {
        self.ty.borrow().clone()
    }

    pub(crate) fn finish(&self, ty: Type) {
        *self.ty.borrow_mut() = Some(ty);
        self.state.set(SpecState::Done);
    }
}

#[derive(Debug, Default)]
pub struct SpecializationCache {
    entries: FxHashMap<String, Rc<Specialization>>,
    log: Vec<String>,
}

impl SpecializationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Rc<Specialization>> {
        self.entries.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Creates a `Processing` entry. The key must not be cached yet.
    pub fn begin(&mut self, key: &str, kind: SpecKind, generic: &str, args: Vec<Type>) -> Rc<Specialization> {
        tracing::debug!(key, ?kind, "specialization started");
        let spec = Rc::new(Specialization {
            key: key.to_string(),
            kind,
            generic: generic.to_string(),
            args,
            state: Cell::new(SpecState::Processing),
            ty: RefCell::new(None),
        });
        self.entries.insert(key.to_string(), spec.clone());
        self.log.push(key.to_string());
        spec
    }

    pub fn checkpoint(&self) -> usize {
        self.log.len()
    }

    /// Forgets every entry created after `checkpoint`.
    pub fn rollback(&mut self, checkpoint: usize) {
        while self.log.len() > checkpoint {
            if let Some(key) = self.log.pop() {
                self.entries.remove(&key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_get_and_rollback() {
        let mut cache = SpecializationCache::new();
        let cp = cache.checkpoint();
        let spec = cache.begin("id<number>", SpecKind::Function, "id", vec![Type::number()]);
        assert_eq!(spec.state(), SpecState::Processing);
        spec.finish(Type::function(vec![Type::number()], Type::number()));
        let again = cache.get("id<number>").unwrap();
        assert!(Rc::ptr_eq(&spec, &again));
        assert_eq!(again.state(), SpecState::Done);
        cache.rollback(cp);
        assert!(cache.get("id<number>").is_none());
    }
}
