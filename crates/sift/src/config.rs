//! Compiler configuration.
//!
//! Options are plain serde structs, so hosts can keep them next to the rest
//! of their configuration:
//!
//! ```yaml
//! merge_strategy: child_operator
//! cache_paths: false
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How the compiler picks the combinator for a child node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// A child with children of its own is joined with the root node's
    /// combinator; a leaf child with its own.
    #[default]
    RootForSubtrees,
    /// Every child is joined with its own combinator.
    ChildOperator,
}

/// Options for [`Compiler`](crate::Compiler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    pub merge_strategy: MergeStrategy,
    /// Memoize resolved selector paths across compilations.
    pub cache_paths: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            merge_strategy: MergeStrategy::default(),
            cache_paths: true,
        }
    }
}

impl CompileOptions {
    /// Sets the merge strategy.
    pub fn merge_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.merge_strategy = strategy;
        self
    }

    /// Enables or disables the selector path cache.
    pub fn cache_paths(mut self, cache: bool) -> Self {
        self.cache_paths = cache;
        self
    }

    /// Loads options from JSON. Missing keys take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Loads options from YAML. Missing keys take their defaults.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }
}
