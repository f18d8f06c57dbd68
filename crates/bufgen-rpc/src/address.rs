use std::fmt;
use std::sync::Arc;

/// Opaque, stable identifier of an RPC scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(Arc<str>);

impl ScopeId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScopeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Small unsigned method index within a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(pub u32);

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Full address of a remote method or stream: `(scope, method)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodAddress {
    pub scope: ScopeId,
    pub method: MethodId,
}

impl MethodAddress {
    pub fn new(scope: impl Into<ScopeId>, method: u32) -> Self {
        Self {
            scope: scope.into(),
            method: MethodId(method),
        }
    }
}

impl fmt::Display for MethodAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scope, self.method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_scope_and_method() {
        let addr = MethodAddress::new("723ca727-6a66-43a7-bfcc-b8ad94eac9be", 2);
        assert_eq!(addr.to_string(), "723ca727-6a66-43a7-bfcc-b8ad94eac9be/2");
    }

    #[test]
    fn addresses_compare_by_scope_then_method() {
        let a = MethodAddress::new("a", 9);
        let b = MethodAddress::new("b", 0);
        assert!(a < b);
        assert_eq!(MethodAddress::new("a", 9), a);
    }
}
