//! Resolution requests

use crate::context::ScopeChain;
use provide_types::Type;

/// A request for a value of `target`, as seen from `scope_chain`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    pub target: Type,
    pub scope_chain: ScopeChain,
    /// Types whose resolution is underway above this request
    pub in_progress: Vec<Type>,
}

impl ResolutionRequest {
    pub fn new(target: Type, scope_chain: ScopeChain) -> Self {
        Self {
            target,
            scope_chain,
            in_progress: Vec::new(),
        }
    }

    /// Continue a resolution that is already working on `in_progress`
    pub fn with_in_progress(mut self, in_progress: Vec<Type>) -> Self {
        self.in_progress = in_progress;
        self
    }
}
