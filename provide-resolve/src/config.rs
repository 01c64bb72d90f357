//! Resolver configuration

use serde::{Deserialize, Serialize};

/// Tunables for a [`Resolver`](crate::Resolver)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Deepest dependency chain explored before giving up
    ///
    /// Protects against generic candidates that expand forever, e.g. a
    /// `Box<T>` requiring a `Box<Box<T>>`. Hitting the bound is reported
    /// as a cycle.
    pub max_depth: usize,

    /// Assemble `Set`/`Map` requests from collection members when no
    /// candidate produces the collection directly
    pub synthesize_collections: bool,

    /// Satisfy `Function0<T>` requests with a lazy provider of `T` when no
    /// candidate produces the function type directly
    pub synthesize_providers: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: 128,
            synthesize_collections: true,
            synthesize_providers: true,
        }
    }
}

#[cfg(feature = "config")]
impl ResolverConfig {
    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| crate::ResolveError::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> crate::error::Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| crate::ResolveError::Config(format!("Failed to parse JSON: {}", e)))
    }
}
