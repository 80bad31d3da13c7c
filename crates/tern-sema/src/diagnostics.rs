//! Diagnostics sink with a postponed-buffer stack.
//!
//! While a buffer is open (speculative passes, fixpoint attempts) diagnostics
//! are held back; the owner then either discards them or flushes them to the
//! next outer level.

use std::fmt;

use tern_ast::Span;

use crate::error::SemaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: SemaError,
    pub span: Span,
}

impl Diagnostic {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.severity, self.span, self.kind)
    }
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    reported: Vec<Diagnostic>,
    postponed: Vec<Vec<Diagnostic>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit_error(&mut self, span: Span, kind: SemaError) {
        self.emit(Diagnostic {
            severity: Severity::Error,
            kind,
            span,
        });
    }

    pub fn emit_warning(&mut self, span: Span, kind: SemaError) {
        self.emit(Diagnostic {
            severity: Severity::Warning,
            kind,
            span,
        });
    }

    fn emit(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(%diagnostic, postponed = !self.postponed.is_empty(), "diagnostic");
        match self.postponed.last_mut() {
            Some(buffer) => buffer.push(diagnostic),
            None => self.reported.push(diagnostic),
        }
    }

    /// Opens a postponed buffer.
    pub fn postpone(&mut self) {
        self.postponed.push(Vec::new());
    }

    /// Closes the innermost buffer, dropping its contents.
    pub fn discard_postponed(&mut self) {
        self.postponed.pop();
    }

    /// Closes the innermost buffer, moving its contents one level out.
    pub fn flush_postponed(&mut self) {
        if let Some(buffer) = self.postponed.pop() {
            for diagnostic in buffer {
                self.emit(diagnostic);
            }
        }
    }

    pub fn depth(&self) -> usize {
        self.postponed.len()
    }

    /// Reported (not postponed) diagnostics.
    pub fn reported(&self) -> &[Diagnostic] {
        &self.reported
    }

    pub fn has_errors(&self) -> bool {
        self.reported.iter().any(Diagnostic::is_error)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.reported
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postponed_discard_and_flush() {
        let mut d = Diagnostics::new();
        d.postpone();
        d.emit_error(Span::default(), SemaError::UndefinedVariable("a".into()));
        d.discard_postponed();
        assert!(d.reported().is_empty());

        d.postpone();
        d.postpone();
        d.emit_warning(Span::default(), SemaError::DuplicateDeclaration("b".into()));
        d.flush_postponed();
        assert!(d.reported().is_empty());
        d.flush_postponed();
        assert_eq!(d.reported().len(), 1);
        assert!(!d.has_errors());
    }

    #[test]
    fn test_display_includes_span() {
        let diag = Diagnostic {
            severity: Severity::Error,
            kind: SemaError::UndefinedType("Foo".into()),
            span: Span::new(3, 6, 0),
        };
        assert_eq!(diag.to_string(), "error at 0:3..6: undefined type `Foo`");
    }
}
