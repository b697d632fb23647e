//! Manifest management for tracking composition state.
//!
//! The manifest records per-document metadata that enables incremental batch
//! runs. A document should be composed again when any of the following
//! change:
//!
//! - **Checksum**: the document file no longer matches the recorded SHA-256
//!   checksum.
//! - **Options**: the composition options (body depth, generation hints)
//!   differ from the ones recorded.
//! - **Tool version**: a different engine produced the manifest.
//!
//! # Examples
//!
//! ```no_run
//! use page_schema_db::{CompositionStatus, DocumentEntry, Manifest, OptionsFingerprint};
//!
//! let mut manifest = Manifest::new("0.1.0".into(), OptionsFingerprint::default());
//!
//! manifest.update_entry("home".into(), DocumentEntry {
//!     checksum: "abc123".into(),
//!     page_type: Some("homepage".into()),
//!     status: CompositionStatus::Composed,
//!     error_count: 0,
//!     warning_count: 1,
//!     composed_at: chrono::Utc::now(),
//!     output_file: Some("home.json".into()),
//! });
//!
//! manifest.save("manifest.json").unwrap();
//! let loaded = Manifest::load("manifest.json").unwrap();
//! assert!(loaded.contains("home"));
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{DateTime, Utc};
use page_schema_core::{ComposeOptions, DEFAULT_MAX_BODY_NODES};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Result, StoreError};

/// Manifest format version written by [`Manifest::new`].
pub const MANIFEST_VERSION: &str = "1.0";

/// SHA-256 hex digest of `bytes`.
pub fn checksum_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Fingerprint of the options a batch was composed with.
///
/// When it changes between two manifests, [`Manifest::diff`] returns every
/// document.
///
/// # Examples
///
/// ```
/// use page_schema_core::{ComposeOptions, Generation};
/// use page_schema_db::OptionsFingerprint;
///
/// let default = OptionsFingerprint::default();
/// assert_eq!(default.max_body_depth, 32);
///
/// let hinted = OptionsFingerprint::from(
///     &ComposeOptions::default().with_hint("author", Generation::new(3)),
/// );
/// assert_ne!(default, hinted);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionsFingerprint {
    pub max_body_depth: usize,
    #[serde(default = "default_max_body_nodes")]
    pub max_body_nodes: usize,
    #[serde(default)]
    pub generation_hints: BTreeMap<String, u32>,
}

fn default_max_body_nodes() -> usize {
    DEFAULT_MAX_BODY_NODES
}

impl Default for OptionsFingerprint {
    fn default() -> Self {
        Self::from(&ComposeOptions::default())
    }
}

impl From<&ComposeOptions> for OptionsFingerprint {
    fn from(options: &ComposeOptions) -> Self {
        Self {
            max_body_depth: options.max_body_depth,
            max_body_nodes: options.max_body_nodes,
            generation_hints: options
                .generation_hints
                .iter()
                .map(|(variant, generation)| (variant.clone(), generation.number()))
                .collect(),
        }
    }
}

/// Outcome of composing one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionStatus {
    Composed,
    Failed,
}

/// Per-document metadata recorded after composition.
///
/// # Examples
///
/// ```
/// use page_schema_db::{CompositionStatus, DocumentEntry};
///
/// let entry = DocumentEntry {
///     checksum: "abc123def456".into(),
///     page_type: Some("article".into()),
///     status: CompositionStatus::Failed,
///     error_count: 2,
///     warning_count: 0,
///     composed_at: "2024-05-01T10:30:00Z".parse().unwrap(),
///     output_file: None,
/// };
/// assert_eq!(entry.status, CompositionStatus::Failed);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEntry {
    /// SHA-256 hex digest of the document file.
    pub checksum: String,
    /// Raw `pageType` of the document, when present.
    pub page_type: Option<String>,
    pub status: CompositionStatus,
    pub error_count: usize,
    #[serde(default)]
    pub warning_count: usize,
    pub composed_at: DateTime<Utc>,
    /// Output file name relative to the output directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
}

/// Top-level manifest tracking all composed documents.
///
/// Persisted as pretty-printed JSON next to the output directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Manifest format version (e.g., `"1.0"`).
    pub version: String,
    /// Version of the tool that produced this manifest.
    pub tool_version: String,
    /// Options in effect when the documents were composed.
    pub options: OptionsFingerprint,
    pub updated_at: DateTime<Utc>,
    /// Per-document metadata keyed by document name.
    pub documents: BTreeMap<String, DocumentEntry>,
}

impl Manifest {
    /// Creates a new, empty manifest stamped with the current time.
    pub fn new(tool_version: String, options: OptionsFingerprint) -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            tool_version,
            options,
            updated_at: Utc::now(),
            documents: BTreeMap::new(),
        }
    }

    /// Loads a manifest from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::StoreError::IoError) if the file cannot
    /// be read, [`JsonError`](crate::StoreError::JsonError) if the content is
    /// not valid manifest JSON, or
    /// [`InvalidManifest`](crate::StoreError::InvalidManifest) for an
    /// unsupported format version.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let manifest: Self = serde_json::from_reader(reader)?;
        if manifest.version != MANIFEST_VERSION {
            return Err(StoreError::InvalidManifest(format!(
                "unsupported manifest version `{}`",
                manifest.version
            )));
        }
        Ok(manifest)
    }

    /// Saves the manifest as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::StoreError::IoError) if the file cannot
    /// be written, or [`JsonError`](crate::StoreError::JsonError) if
    /// serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Inserts or updates the entry for `name` and refreshes `updated_at`.
    pub fn update_entry(&mut self, name: String, entry: DocumentEntry) {
        self.documents.insert(name, entry);
        self.updated_at = Utc::now();
    }

    /// Computes the SHA-256 hex digest of a file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::StoreError::IoError) if the file cannot
    /// be read.
    pub fn calculate_checksum(path: impl AsRef<Path>) -> Result<String> {
        let bytes = std::fs::read(path)?;
        Ok(checksum_bytes(&bytes))
    }

    /// Checks that the file at `path` still matches the entry for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidChecksum`](crate::StoreError::InvalidChecksum) when
    /// the entry is missing or the digests differ.
    pub fn verify(&self, name: &str, path: impl AsRef<Path>) -> Result<()> {
        let entry = self
            .get(name)
            .ok_or_else(|| StoreError::InvalidChecksum(format!("no manifest entry for `{name}`")))?;
        let actual = Self::calculate_checksum(path)?;
        if actual != entry.checksum {
            return Err(StoreError::InvalidChecksum(format!(
                "`{name}`: expected {}, found {actual}",
                entry.checksum
            )));
        }
        Ok(())
    }

    /// Returns `true` when a document with `checksum` must be composed
    /// again under this manifest.
    pub fn needs_composition(&self, name: &str, checksum: &str) -> bool {
        self.get(name).is_none_or(|entry| entry.checksum != checksum)
    }

    /// Returns the sorted names of documents that differ between `self`
    /// and `other`.
    ///
    /// A document is considered changed if it exists in one manifest but
    /// not the other, or its checksum differs. If the options fingerprint or
    /// tool version changed, **all** documents are returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use page_schema_db::{CompositionStatus, DocumentEntry, Manifest, OptionsFingerprint};
    ///
    /// let entry = |checksum: &str| DocumentEntry {
    ///     checksum: checksum.into(),
    ///     page_type: Some("article".into()),
    ///     status: CompositionStatus::Composed,
    ///     error_count: 0,
    ///     warning_count: 0,
    ///     composed_at: chrono::Utc::now(),
    ///     output_file: None,
    /// };
    ///
    /// let mut old = Manifest::new("0.1.0".into(), OptionsFingerprint::default());
    /// old.update_entry("story".into(), entry("abc"));
    ///
    /// let mut new = Manifest::new("0.1.0".into(), OptionsFingerprint::default());
    /// new.update_entry("story".into(), entry("def"));
    /// new.update_entry("home".into(), entry("123"));
    ///
    /// assert_eq!(old.diff(&new), vec!["home".to_string(), "story".to_string()]);
    /// ```
    pub fn diff(&self, other: &Manifest) -> Vec<String> {
        let mut changed = BTreeSet::new();

        if self.options != other.options || self.tool_version != other.tool_version {
            changed.extend(self.documents.keys().cloned());
            changed.extend(other.documents.keys().cloned());
            return changed.into_iter().collect();
        }

        for (name, entry) in &self.documents {
            match other.documents.get(name) {
                None => {
                    changed.insert(name.clone());
                }
                Some(other_entry) if other_entry.checksum != entry.checksum => {
                    changed.insert(name.clone());
                }
                Some(_) => {}
            }
        }
        for name in other.documents.keys() {
            if !self.documents.contains_key(name) {
                changed.insert(name.clone());
            }
        }

        changed.into_iter().collect()
    }

    /// Looks up the entry for a document.
    pub fn get(&self, name: &str) -> Option<&DocumentEntry> {
        self.documents.get(name)
    }

    /// Returns `true` if the manifest contains an entry for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.documents.contains_key(name)
    }

    /// Names of documents whose last composition failed.
    pub fn failed(&self) -> impl Iterator<Item = &str> {
        self.documents
            .iter()
            .filter(|(_, entry)| entry.status == CompositionStatus::Failed)
            .map(|(name, _)| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_schema_core::Generation;
    use tempfile::TempDir;

    fn sample_entry(checksum: &str, status: CompositionStatus) -> DocumentEntry {
        DocumentEntry {
            checksum: checksum.into(),
            page_type: Some("article".into()),
            status,
            error_count: usize::from(status == CompositionStatus::Failed),
            warning_count: 0,
            composed_at: "2024-05-01T10:30:00Z".parse().unwrap(),
            output_file: Some("story.json".into()),
        }
    }

    fn manifest_with(entries: &[(&str, &str)]) -> Manifest {
        let mut m = Manifest::new("0.1.0".into(), OptionsFingerprint::default());
        for (name, checksum) in entries {
            m.update_entry(name.to_string(), sample_entry(checksum, CompositionStatus::Composed));
        }
        m
    }

    #[test]
    fn test_manifest_creation() {
        let m = Manifest::new("0.1.0".into(), OptionsFingerprint::default());
        assert_eq!(m.version, MANIFEST_VERSION);
        assert_eq!(m.tool_version, "0.1.0");
        assert!(m.documents.is_empty());
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manifest.json");

        let mut m = manifest_with(&[("story", "abc123")]);
        m.update_entry("broken".into(), sample_entry("def456", CompositionStatus::Failed));
        m.save(&path).unwrap();

        let loaded = Manifest::load(&path).unwrap();
        assert_eq!(loaded.tool_version, "0.1.0");
        assert_eq!(loaded.get("story"), m.get("story"));
        assert_eq!(loaded.failed().collect::<Vec<_>>(), vec!["broken"]);
    }

    #[test]
    fn test_load_rejects_unknown_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manifest.json");
        let mut m = manifest_with(&[]);
        m.version = "9.9".into();
        m.save(&path).unwrap();

        let err = Manifest::load(&path).unwrap_err();
        assert!(matches!(err, StoreError::InvalidManifest(_)));
    }

    #[test]
    fn test_checksum_calculation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.json");
        std::fs::write(&path, b"hello world").unwrap();

        let checksum = Manifest::calculate_checksum(&path).unwrap();
        // SHA-256 of "hello world"
        assert_eq!(
            checksum,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_verify_detects_modified_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("story.json");
        std::fs::write(&path, b"{}").unwrap();

        let checksum = Manifest::calculate_checksum(&path).unwrap();
        let m = manifest_with(&[("story", checksum.as_str())]);
        assert!(m.verify("story", &path).is_ok());

        std::fs::write(&path, b"{\"pageType\": \"tag\"}").unwrap();
        assert!(matches!(m.verify("story", &path), Err(StoreError::InvalidChecksum(_))));
        assert!(matches!(m.verify("missing", &path), Err(StoreError::InvalidChecksum(_))));
    }

    #[test]
    fn test_needs_composition() {
        let m = manifest_with(&[("story", "abc")]);
        assert!(!m.needs_composition("story", "abc"));
        assert!(m.needs_composition("story", "def"));
        assert!(m.needs_composition("home", "abc"));
    }

    #[test]
    fn test_diff_detects_checksum_change() {
        let a = manifest_with(&[("story", "abc"), ("home", "123")]);
        let b = manifest_with(&[("story", "def"), ("home", "123")]);
        assert_eq!(a.diff(&b), vec!["story".to_string()]);
    }

    #[test]
    fn test_diff_detects_added_and_removed_documents() {
        let a = manifest_with(&[("story", "abc")]);
        let b = manifest_with(&[("home", "123")]);
        assert_eq!(a.diff(&b), vec!["home".to_string(), "story".to_string()]);
    }

    #[test]
    fn test_diff_ignores_status_only_changes() {
        let a = manifest_with(&[("story", "abc")]);
        let mut b = manifest_with(&[]);
        b.update_entry("story".into(), sample_entry("abc", CompositionStatus::Failed));
        assert!(a.diff(&b).is_empty());
    }

    #[test]
    fn test_diff_forces_all_on_options_change() {
        let a = manifest_with(&[("story", "abc"), ("home", "123")]);
        let options = ComposeOptions::default().with_hint("author", Generation::new(2));
        let mut b = Manifest::new("0.1.0".into(), OptionsFingerprint::from(&options));
        b.update_entry("story".into(), sample_entry("abc", CompositionStatus::Composed));
        b.update_entry("tag".into(), sample_entry("789", CompositionStatus::Composed));

        assert_eq!(a.diff(&b), vec!["home".to_string(), "story".to_string(), "tag".to_string()]);
    }

    #[test]
    fn test_diff_forces_all_on_tool_version_change() {
        let a = manifest_with(&[("story", "abc")]);
        let mut b = Manifest::new("0.2.0".into(), OptionsFingerprint::default());
        b.update_entry("story".into(), sample_entry("abc", CompositionStatus::Composed));
        assert_eq!(a.diff(&b), vec!["story".to_string()]);
    }

    #[test]
    fn test_fingerprint_tracks_node_budget() {
        let tight = OptionsFingerprint::from(&ComposeOptions::default().with_max_body_nodes(100));
        assert_ne!(tight, OptionsFingerprint::default());

        // manifests written before the budget existed load with the default
        let older: OptionsFingerprint = serde_json::from_str(r#"{"max_body_depth": 32}"#).unwrap();
        assert_eq!(older, OptionsFingerprint::default());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(CompositionStatus::Composed).unwrap(),
            serde_json::json!("composed")
        );
    }
}
