//! Engine configuration for composition runs.
//!
//! Defines the YAML-serializable configuration that controls body nesting
//! limits, normalization caching and forced schema generations.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! max_body_depth: 32
//! max_body_nodes: 50000
//! cache: true
//! generation_hints:
//!   author: 3
//! ```

use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use page_schema_core::{ComposeOptions, DEFAULT_MAX_BODY_DEPTH, DEFAULT_MAX_BODY_NODES, Generation, SchemaRegistry};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Configuration format version written by [`EngineConfig::default`].
pub const CONFIG_VERSION: &str = "1.0";

fn default_version() -> String {
    CONFIG_VERSION.to_string()
}

fn default_max_body_depth() -> usize {
    DEFAULT_MAX_BODY_DEPTH
}

fn default_max_body_nodes() -> usize {
    DEFAULT_MAX_BODY_NODES
}

fn default_cache() -> bool {
    true
}

/// Top-level engine configuration.
///
/// Loaded from a YAML file (typically `page-compose.yml`) and turned into
/// [`ComposeOptions`] for a composition pass. Every key is optional.
///
/// # Examples
///
/// ```no_run
/// use page_schema_core::SchemaRegistry;
/// use page_schema_db::EngineConfig;
///
/// let config = EngineConfig::load("page-compose.yml").unwrap();
/// config.validate(SchemaRegistry::builtin()).unwrap();
/// let options = config.into_options();
/// println!("body depth limit: {}", options.max_body_depth);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Configuration format version (e.g., `"1.0"`).
    #[serde(default = "default_version")]
    pub version: String,
    /// Deepest permitted body nesting before a record is rejected.
    #[serde(default = "default_max_body_depth")]
    pub max_body_depth: usize,
    /// Most paragraph nodes one body may expand to once fragment
    /// references are inlined.
    #[serde(default = "default_max_body_nodes")]
    pub max_body_nodes: usize,
    /// Serve recurring records from the normalization cache.
    #[serde(default = "default_cache")]
    pub cache: bool,
    /// Generation forced per content variant.
    #[serde(default)]
    pub generation_hints: BTreeMap<String, u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            max_body_depth: DEFAULT_MAX_BODY_DEPTH,
            max_body_nodes: DEFAULT_MAX_BODY_NODES,
            cache: true,
            generation_hints: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::StoreError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::StoreError::YamlError) if parsing
    /// fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::StoreError::IoError) if the file cannot
    /// be written, or [`YamlError`](crate::StoreError::YamlError) if
    /// serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Checks the configuration against `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfig`](crate::StoreError::InvalidConfig) when
    /// `max_body_depth` or `max_body_nodes` is zero or a generation hint names a variant or
    /// generation the registry does not define.
    ///
    /// # Examples
    ///
    /// ```
    /// use page_schema_core::SchemaRegistry;
    /// use page_schema_db::EngineConfig;
    ///
    /// let mut config = EngineConfig::default();
    /// config.generation_hints.insert("author".into(), 3);
    /// assert!(config.validate(SchemaRegistry::builtin()).is_ok());
    ///
    /// config.generation_hints.insert("author".into(), 9);
    /// assert!(config.validate(SchemaRegistry::builtin()).is_err());
    /// ```
    pub fn validate(&self, registry: &SchemaRegistry) -> Result<()> {
        if self.max_body_depth == 0 {
            return Err(StoreError::InvalidConfig(
                "max_body_depth must be at least 1".to_string(),
            ));
        }
        if self.max_body_nodes == 0 {
            return Err(StoreError::InvalidConfig(
                "max_body_nodes must be at least 1".to_string(),
            ));
        }
        for (variant, &generation) in &self.generation_hints {
            if !registry.contains(variant) {
                return Err(StoreError::InvalidConfig(format!(
                    "generation hint for unknown variant `{variant}`"
                )));
            }
            if let Err(err) = registry.lookup(variant, Generation::new(generation)) {
                return Err(StoreError::InvalidConfig(format!("generation hint: {err}")));
            }
        }
        Ok(())
    }

    /// Converts the configuration into options for a composition pass.
    ///
    /// # Examples
    ///
    /// ```
    /// use page_schema_core::Generation;
    /// use page_schema_db::EngineConfig;
    ///
    /// let mut config = EngineConfig::default();
    /// config.max_body_depth = 8;
    /// config.generation_hints.insert("image".into(), 2);
    ///
    /// let options = config.into_options();
    /// assert_eq!(options.max_body_depth, 8);
    /// assert_eq!(options.hint("image"), Some(Generation::new(2)));
    /// assert!(options.cache);
    /// ```
    pub fn into_options(self) -> ComposeOptions {
        let options = ComposeOptions::default()
            .with_max_body_depth(self.max_body_depth)
            .with_max_body_nodes(self.max_body_nodes)
            .with_cache(self.cache);
        self.generation_hints
            .into_iter()
            .fold(options, |options, (variant, generation)| {
                options.with_hint(variant, Generation::new(generation))
            })
    }
}
