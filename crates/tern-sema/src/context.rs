//! Resolution context threaded through every resolution call.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexSet;
use tern_types::{merge, widen, Type, TypeBindings};

use crate::capture::CaptureSet;
use crate::scope::VariableInfo;

/// What a discovery pass learns about the function under discovery.
#[derive(Debug, Default)]
pub struct DiscoveryAccumulator {
    /// Widened join of every returned value.
    pub return_type: Option<Type>,
    pub returns: usize,
    pub captures: CaptureSet,
    /// Functions whose own discovery was in progress when called.
    pub pending_on: IndexSet<String>,
}

/// Cheap to clone; derived contexts are copies with targeted overrides.
#[derive(Debug, Clone, Default)]
pub struct GenContext {
    pub bindings: Rc<TypeBindings>,
    pub current_function: Option<String>,
    /// IR goes to a scratch module that will be dropped.
    pub speculative: bool,
    /// Unresolved names and unmet constraints defer instead of reporting.
    pub allow_partial_resolve: bool,
    /// Function literals yield their parameter types only.
    pub discover_params_only: bool,
    pub call_operands: Option<Rc<Vec<Type>>>,
    /// Expected type of the expression, for contextual typing.
    pub receiver_type: Option<Type>,
    pub discovery: Option<Rc<RefCell<DiscoveryAccumulator>>>,
}

impl GenContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bindings(&self, bindings: Rc<TypeBindings>) -> Self {
        Self {
            bindings,
            ..self.clone()
        }
    }

    /// Context for the body of `function`. Expression-level state does not
    /// cross the function boundary.
    pub fn in_function(&self, function: &str) -> Self {
        Self {
            current_function: Some(function.to_string()),
            call_operands: None,
            receiver_type: None,
            discover_params_only: false,
            ..self.clone()
        }
    }

    pub fn discovering(&self, acc: Rc<RefCell<DiscoveryAccumulator>>) -> Self {
        Self {
            speculative: true,
            discovery: Some(acc),
            ..self.clone()
        }
    }

    pub fn committing(&self) -> Self {
        Self {
            speculative: false,
            discovery: None,
            ..self.clone()
        }
    }

    pub fn partial(&self) -> Self {
        Self {
            allow_partial_resolve: true,
            ..self.clone()
        }
    }

    pub fn strict(&self) -> Self {
        Self {
            allow_partial_resolve: false,
            ..self.clone()
        }
    }

    pub fn params_only(&self) -> Self {
        Self {
            discover_params_only: true,
            ..self.clone()
        }
    }

    pub fn with_receiver(&self, receiver: Option<Type>) -> Self {
        Self {
            receiver_type: receiver,
            ..self.clone()
        }
    }

    pub fn with_call_operands(&self, operands: Vec<Type>) -> Self {
        Self {
            call_operands: Some(Rc::new(operands)),
            ..self.clone()
        }
    }

    /// Context for a subexpression: no contextual type, no call operands.
    pub fn plain(&self) -> Self {
        Self {
            receiver_type: None,
            call_operands: None,
            discover_params_only: false,
            ..self.clone()
        }
    }

    pub fn record_return(&self, ty: &Type) {
        if let Some(acc) = &self.discovery {
            let mut acc = acc.borrow_mut();
            let widened = widen(ty);
            acc.return_type = Some(match acc.return_type.take() {
                Some(existing) => merge(&existing, &widened),
                None => widened,
            });
            acc.returns += 1;
        }
    }

    /// Records a capture; returns its index in the set.
    pub fn record_capture(&self, info: &VariableInfo) -> Option<usize> {
        let acc = self.discovery.as_ref()?;
        let mut acc = acc.borrow_mut();
        acc.captures.insert(info);
        acc.captures.index_of(&info.name)
    }

    pub fn record_pending(&self, function: &str) -> bool {
        match &self.discovery {
            Some(acc) => {
                acc.borrow_mut().pending_on.insert(function.to_string());
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_ir::ValueId;

    #[test]
    fn test_record_return_widens_and_merges() {
        let acc = Rc::new(RefCell::new(DiscoveryAccumulator::default()));
        let ctx = GenContext::new().discovering(acc.clone());
        ctx.record_return(&Type::num_lit(1.0));
        ctx.record_return(&Type::num_lit(2.0));
        assert_eq!(acc.borrow().return_type, Some(Type::number()));
        assert_eq!(acc.borrow().returns, 2);
    }

    #[test]
    fn test_without_accumulator_nothing_is_recorded() {
        let ctx = GenContext::new();
        let info = VariableInfo::local("v", Type::number(), ValueId(0), "outer");
        assert_eq!(ctx.record_capture(&info), None);
        assert!(!ctx.record_pending("f"));
    }

    #[test]
    fn test_derived_contexts_override_only_their_fields() {
        let base = GenContext::new().partial().in_function("f");
        let derived = base.with_receiver(Some(Type::number())).strict();
        assert!(!derived.allow_partial_resolve);
        assert_eq!(derived.current_function.as_deref(), Some("f"));
        assert!(base.allow_partial_resolve);
        assert_eq!(derived.plain().receiver_type, None);
    }
}
