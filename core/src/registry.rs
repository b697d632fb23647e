//! Schema registry: field contracts per content variant and generation.
//!
//! A [`FieldContract`] describes the fields one generation of a variant
//! accepts. Contracts are assembled from reusable field sets (an
//! `articleLiveBlog` contract is the article set plus the live-blog set)
//! instead of an inheritance chain.
//!
//! The builtin registry is a process-wide immutable value, built once on
//! first use and shared across threads without synchronization.
//!
//! # Example
//!
//! ```
//! use page_schema_core::{Generation, SchemaRegistry};
//!
//! let registry = SchemaRegistry::builtin();
//! assert!(registry.contains("article"));
//! assert_eq!(registry.generations("author").len(), 3);
//!
//! let contract = registry.lookup("image", Generation::new(3)).unwrap();
//! assert!(contract.field("aspects").is_some_and(|f| f.required));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::contracts::BUILTIN_CONTRACTS;

/// Schema generation of a content variant. Generations are numbered from 1
/// in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(u32);

impl Generation {
    pub const fn new(number: u32) -> Self {
        Self(number)
    }

    pub const fn number(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Kind of value a contract field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Bool,
    /// Non-negative integer.
    Integer,
    /// RFC 3339 timestamp, `YYYY-MM-DD`, or epoch milliseconds.
    Date,
    /// Closed value set; other values are a constraint violation.
    Enum(&'static [&'static str]),
    /// Known value set; unseen values are tolerated and normalized to
    /// `unknown`.
    Vocabulary(&'static [&'static str]),
    Taxonomy,
    /// Map of named crops to `{ width, height, x, y }`.
    Aspects,
    /// Image asset list (`imgArray`).
    ImageAssets,
    /// Ordered body sequence, composed by the body composer.
    Body,
    /// Nested content record; the listed variants are tried in order.
    Content(&'static [&'static str]),
    /// Content envelope only (`inputTemplate`, `contentId`, `contentName`).
    Summary,
    /// Either a plain author name or a nested `author` record.
    AuthorOrName,
    /// Opaque object, passed through untouched.
    Object,
    List(&'static FieldKind),
}

impl FieldKind {
    /// Cheap structural test of the JSON primitive kind, used by the
    /// discriminator. Deep validation happens later.
    pub fn admits(&self, value: &Value) -> bool {
        match self {
            Self::String | Self::Enum(_) | Self::Vocabulary(_) => value.is_string(),
            Self::Bool => value.is_boolean(),
            Self::Integer => value.is_u64(),
            Self::Date => value.is_string() || value.is_i64(),
            Self::Taxonomy | Self::Aspects | Self::Content(_) | Self::Summary | Self::Object => {
                value.is_object()
            }
            Self::ImageAssets | Self::Body | Self::List(_) => value.is_array(),
            Self::AuthorOrName => value.is_string() || value.is_object(),
        }
    }

    /// Human-readable description used in type-mismatch errors.
    pub fn describe(&self) -> String {
        match self {
            Self::String => "string".to_string(),
            Self::Bool => "boolean".to_string(),
            Self::Integer => "non-negative integer".to_string(),
            Self::Date => "date".to_string(),
            Self::Enum(values) => format!("one of {}", values.join(" | ")),
            Self::Vocabulary(_) => "string".to_string(),
            Self::Taxonomy => "taxonomy item".to_string(),
            Self::Aspects => "aspect map".to_string(),
            Self::ImageAssets => "image asset list".to_string(),
            Self::Body => "body sequence".to_string(),
            Self::Content(variants) => format!("{} record", variants.join(" | ")),
            Self::Summary => "content summary".to_string(),
            Self::AuthorOrName => "author name or author record".to_string(),
            Self::Object => "object".to_string(),
            Self::List(inner) => format!("list of {}", inner.describe()),
        }
    }
}

/// One declared field of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub required: bool,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self { name, required: true, kind }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self { name, required: false, kind }
    }
}

/// Field contract of one `(variant, generation)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldContract {
    pub variant: &'static str,
    pub generation: Generation,
    sets: &'static [&'static [FieldSpec]],
}

impl FieldContract {
    pub const fn new(
        variant: &'static str,
        generation: Generation,
        sets: &'static [&'static [FieldSpec]],
    ) -> Self {
        Self { variant, generation, sets }
    }

    /// All declared fields, set by set in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &'static FieldSpec> + '_ {
        self.sets.iter().flat_map(|set| set.iter())
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().find(|spec| spec.name == name)
    }

    pub fn declares(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &'static FieldSpec> + '_ {
        self.fields().filter(|spec| spec.required)
    }
}

/// Registry lookup and registration failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("no contract registered for `{variant}` {generation}")]
    NotFound { variant: String, generation: Generation },

    #[error("contract for `{variant}` {generation} is already registered")]
    Duplicate { variant: String, generation: Generation },
}

/// Maps `(variant, generation)` to field contracts.
///
/// Generations of a variant are kept in registration order, which is also
/// the precedence order the discriminator uses.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    contracts: BTreeMap<&'static str, Vec<FieldContract>>,
}

static BUILTIN: LazyLock<SchemaRegistry> = LazyLock::new(SchemaRegistry::with_builtin_contracts);

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared registry holding every builtin contract.
    pub fn builtin() -> &'static SchemaRegistry {
        &BUILTIN
    }

    /// Creates an owned registry pre-populated with the builtin contracts,
    /// for callers that register extra variants before sharing it.
    pub fn with_builtin_contracts() -> Self {
        let mut registry = Self::new();
        for contract in BUILTIN_CONTRACTS {
            registry
                .contracts
                .entry(contract.variant)
                .or_default()
                .push(*contract);
        }
        registry
    }

    /// Adds a contract. Rejects a `(variant, generation)` pair that is
    /// already present.
    pub fn register(&mut self, contract: FieldContract) -> Result<(), RegistryError> {
        let generations = self.contracts.entry(contract.variant).or_default();
        if generations.iter().any(|c| c.generation == contract.generation) {
            return Err(RegistryError::Duplicate {
                variant: contract.variant.to_string(),
                generation: contract.generation,
            });
        }
        generations.push(contract);
        Ok(())
    }

    pub fn lookup(&self, variant: &str, generation: Generation) -> Result<&FieldContract, RegistryError> {
        self.generations(variant)
            .iter()
            .find(|c| c.generation == generation)
            .ok_or_else(|| RegistryError::NotFound {
                variant: variant.to_string(),
                generation,
            })
    }

    /// Contracts of a variant in registration order; empty when unknown.
    pub fn generations(&self, variant: &str) -> &[FieldContract] {
        self.contracts.get(variant).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Most recently registered generation of a variant.
    pub fn latest(&self, variant: &str) -> Option<&FieldContract> {
        self.generations(variant).last()
    }

    pub fn contains(&self, variant: &str) -> bool {
        self.contracts.contains_key(variant)
    }

    /// Registered variant names in sorted order.
    pub fn variants(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.contracts.keys().copied()
    }

    /// Every contract, grouped by variant.
    pub fn contracts(&self) -> impl Iterator<Item = &FieldContract> {
        self.contracts.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.contracts.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}
