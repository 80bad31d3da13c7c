//! Resolver configuration

/// Options controlling a resolution run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemaOptions {
    /// Upper bound on fixpoint passes over one statement group.
    pub max_passes: usize,
    /// Retry stalled items once without partial resolution so that the
    /// precise diagnostic surfaces.
    pub strict_retry: bool,
    /// Module-level functions with an annotated return type are committed
    /// without a discovery pass.
    pub skip_discovery_for_annotated: bool,
    /// Name of the function that receives top-level statement code.
    pub init_function: String,
}

impl Default for SemaOptions {
    fn default() -> Self {
        Self {
            max_passes: 64,
            strict_retry: true,
            skip_discovery_for_annotated: true,
            init_function: "__module_init".to_string(),
        }
    }
}

impl SemaOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_passes(mut self, passes: usize) -> Self {
        self.max_passes = passes.max(1);
        self
    }

    pub fn with_strict_retry(mut self, enabled: bool) -> Self {
        self.strict_retry = enabled;
        self
    }

    pub fn with_skip_discovery_for_annotated(mut self, enabled: bool) -> Self {
        self.skip_discovery_for_annotated = enabled;
        self
    }

    pub fn with_init_function(mut self, name: impl Into<String>) -> Self {
        self.init_function = name.into();
        self
    }
}
