//! Tunables shared by validation and composition.

use std::collections::BTreeMap;

use crate::registry::Generation;

/// Default bound on body nesting (paragraph nesting and nested records).
pub const DEFAULT_MAX_BODY_DEPTH: usize = 32;

/// Default bound on the paragraph nodes one body may expand to once
/// fragment references are inlined.
pub const DEFAULT_MAX_BODY_NODES: usize = 50_000;

/// Options for a validation or composition pass.
///
/// # Examples
///
/// ```
/// use page_schema_core::{ComposeOptions, Generation};
///
/// let options = ComposeOptions::default()
///     .with_max_body_depth(8)
///     .with_hint("author", Generation::new(3));
/// assert_eq!(options.hint("author"), Some(Generation::new(3)));
/// assert_eq!(options.hint("image"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeOptions {
    pub max_body_depth: usize,
    pub max_body_nodes: usize,
    /// Generation forced per variant, bypassing best-fit discrimination.
    pub generation_hints: BTreeMap<String, Generation>,
    /// Memoize normalized records by `(contentId, variant, generation)`.
    pub cache: bool,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            max_body_depth: DEFAULT_MAX_BODY_DEPTH,
            max_body_nodes: DEFAULT_MAX_BODY_NODES,
            generation_hints: BTreeMap::new(),
            cache: false,
        }
    }
}

impl ComposeOptions {
    pub fn with_max_body_depth(mut self, depth: usize) -> Self {
        self.max_body_depth = depth;
        self
    }

    pub fn with_max_body_nodes(mut self, nodes: usize) -> Self {
        self.max_body_nodes = nodes;
        self
    }

    pub fn with_hint(mut self, variant: impl Into<String>, generation: Generation) -> Self {
        self.generation_hints.insert(variant.into(), generation);
        self
    }

    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    pub fn hint(&self, variant: &str) -> Option<Generation> {
        self.generation_hints.get(variant).copied()
    }
}
