//! Type-parameter bindings

use indexmap::IndexMap;

use crate::lattice::merge;
use crate::ty::Type;

/// Ordered map from type-parameter name to its bound type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeBindings {
    map: IndexMap<String, Type>,
}

impl TypeBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, Type)>) -> Self {
        Self {
            map: pairs.into_iter().collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Type> {
        self.map.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, ty: Type) -> Option<Type> {
        self.map.insert(name.into(), ty)
    }

    /// Records a binding, joining with any earlier one.
    pub fn bind_merge(&mut self, name: &str, ty: &Type) {
        match self.map.get_mut(name) {
            Some(existing) => *existing = merge(existing, ty),
            None => {
                self.map.insert(name.to_string(), ty.clone());
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Type> {
        self.map.shift_remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Type)> {
        self.map.iter()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Later bindings win.
    pub fn extend(&mut self, other: &TypeBindings) {
        for (name, ty) in other.iter() {
            self.map.insert(name.clone(), ty.clone());
        }
    }

    pub fn any_placeholder(&self) -> bool {
        self.map.values().any(Type::has_placeholders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_merge_joins_literals() {
        let mut bindings = TypeBindings::new();
        bindings.bind_merge("T", &Type::num_lit(1.0));
        bindings.bind_merge("T", &Type::num_lit(2.0));
        assert_eq!(bindings.get("T"), Some(&Type::number()));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut bindings = TypeBindings::new();
        bindings.insert("U", Type::string());
        bindings.insert("T", Type::number());
        let names: Vec<&String> = bindings.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["U", "T"]);
    }
}
