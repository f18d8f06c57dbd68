/// Controls schema loading and resolution limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Maximum nesting of generic instantiations before resolution fails.
    pub max_instantiation_depth: usize,
    /// Maximum bytes read from a schema file.
    pub max_source_size: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_instantiation_depth: 32,
            max_source_size: 4 * 1024 * 1024,
        }
    }
}
