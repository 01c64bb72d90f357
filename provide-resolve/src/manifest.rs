//! Registry manifests
//!
//! A manifest describes classifiers and candidates as data, so a registry
//! can be produced by tools that do not link against this crate.
//!
//! ```toml
//! [[classes]]
//! name = "FileLogger"
//! supertypes = [{ name = "Logger" }]
//!
//! [[candidates]]
//! id = 1
//! produced = { name = "FileLogger" }
//! declared_scope = "AppScope"
//!
//! [[contexts]]
//! id = "main"
//!
//! [[contexts.candidates]]
//! id = 2
//! produced = { name = "Config" }
//! origin = "local_value"
//! ```

use crate::candidate::Candidate;
use crate::context::ContextId;
use crate::error::{ResolveError, Result};
use crate::registry::{RegistryBuilder, StaticRegistry};
use provide_types::ClassDecl;
use serde::{Deserialize, Serialize};

/// Candidates declared in one lexical context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextManifest {
    pub id: ContextId,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// Serializable description of a [`StaticRegistry`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryManifest {
    #[serde(default)]
    pub classes: Vec<ClassDecl>,
    /// Ambient candidates, visible from every chain
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub contexts: Vec<ContextManifest>,
}

impl RegistryManifest {
    /// Load a manifest from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| ResolveError::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Load a manifest from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| ResolveError::Config(format!("Failed to parse JSON: {}", e)))
    }

    /// Render the manifest as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ResolveError::Config(format!("Failed to write JSON: {}", e)))
    }

    /// Populate `builder` with the manifest's declarations
    pub fn apply_to_builder(self, builder: &mut RegistryBuilder) {
        for class in self.classes {
            builder.class(class);
        }
        for candidate in self.candidates {
            builder.candidate(candidate);
        }
        for context in self.contexts {
            for candidate in context.candidates {
                builder.candidate_in(context.id.clone(), candidate);
            }
        }
    }

    /// Build a registry from the manifest alone
    pub fn into_registry(self) -> Result<StaticRegistry> {
        let mut builder = RegistryBuilder::new();
        self.apply_to_builder(&mut builder);
        builder.build()
    }
}
