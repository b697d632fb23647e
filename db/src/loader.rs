//! Raw page document loading with builder pattern and fallback chains.
//!
//! Provides [`DocumentStore`] for in-memory document lookup and
//! [`StoreBuilder`] for constructing a store from multiple sources with
//! automatic fallback.
//!
//! # Loading patterns
//!
//! ```no_run
//! use page_schema_db::DocumentStore;
//!
//! // Load every .json/.yaml/.yml file of a directory
//! let store = DocumentStore::from_dir("pages/").unwrap();
//! assert!(store.get("harbor-reopens").is_some());
//!
//! // Load a single document
//! let store = DocumentStore::from_file("pages/harbor-reopens.yaml").unwrap();
//!
//! // Use the builder for a fallback chain
//! let store = DocumentStore::builder()
//!     .from_dir("pages/")
//!     .from_file("fallback.json")
//!     .build()
//!     .unwrap();
//! ```
//!
//! Documents are keyed by file stem, so `pages/home.yaml` is `home`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::manifest::checksum_bytes;

/// Serialization format of a document file, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Maps `.json`, `.yaml` and `.yml` to a format.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Some(Self::Json),
            Some("yaml" | "yml") => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// One raw page document as read from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// File stem used as the lookup key.
    pub name: String,
    pub path: PathBuf,
    /// SHA-256 hex digest of the file bytes.
    pub checksum: String,
    pub format: DocumentFormat,
    /// Parsed JSON tree handed to the composition engine.
    pub value: Value,
}

impl Document {
    /// Reads and parses a single document file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnsupportedFormat`] for unknown extensions,
    /// [`StoreError::IoError`] if the file cannot be read, and
    /// [`StoreError::JsonError`] or [`StoreError::YamlError`] if it does not
    /// parse.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format =
            DocumentFormat::from_path(path).ok_or_else(|| StoreError::UnsupportedFormat(path.to_path_buf()))?;
        let bytes = std::fs::read(path)?;
        let value: Value = match format {
            DocumentFormat::Json => serde_json::from_slice(&bytes)?,
            DocumentFormat::Yaml => serde_yaml::from_slice(&bytes)?,
        };
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            name,
            path: path.to_path_buf(),
            checksum: checksum_bytes(&bytes),
            format,
            value,
        })
    }

    /// The raw `pageType` string, if the document has one.
    pub fn page_type(&self) -> Option<&str> {
        self.value.get("pageType").and_then(Value::as_str)
    }
}

/// Describes where a [`DocumentStore`] was loaded from.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// Loaded from a directory of document files.
    Directory(PathBuf),
    /// Loaded from a single document file.
    File(PathBuf),
    /// Loaded via a fallback chain of multiple sources.
    Multiple(Vec<DocumentSource>),
}

/// In-memory collection of raw page documents keyed by name.
///
/// Iteration order is by name, so batch runs are reproducible.
///
/// # Examples
///
/// ```no_run
/// use page_schema_db::DocumentStore;
///
/// let store = DocumentStore::from_dir("pages/").unwrap();
/// println!("Loaded {} documents", store.len());
///
/// for document in store.documents() {
///     println!("  {} ({})", document.name, document.page_type().unwrap_or("?"));
/// }
/// ```
#[derive(Debug)]
pub struct DocumentStore {
    documents: BTreeMap<String, Document>,
    source: DocumentSource,
}

impl DocumentStore {
    /// Returns a new [`StoreBuilder`] for configuring a fallback chain.
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    /// Loads every `.json`, `.yaml` and `.yml` file of a directory.
    ///
    /// Other files and subdirectories are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IoError`] if the directory cannot be read, or a
    /// parse error if any document file is malformed.
    pub fn from_dir(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut files = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let file_path = entry?.path();
            if file_path.is_file() && DocumentFormat::from_path(&file_path).is_some() {
                files.push(file_path);
            }
        }
        files.sort();

        let mut documents = BTreeMap::new();
        for file_path in files {
            let document = Document::read(&file_path)?;
            documents.insert(document.name.clone(), document);
        }

        Ok(Self {
            documents,
            source: DocumentSource::Directory(path.to_path_buf()),
        })
    }

    /// Loads a single document file.
    ///
    /// # Errors
    ///
    /// See [`Document::read`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let document = Document::read(path)?;
        let mut documents = BTreeMap::new();
        documents.insert(document.name.clone(), document);

        Ok(Self {
            documents,
            source: DocumentSource::File(path.to_path_buf()),
        })
    }

    /// Loads each path as a directory or a file and merges the results.
    ///
    /// Unlike the builder, every path must load.
    ///
    /// # Errors
    ///
    /// Returns the first load failure.
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut documents = BTreeMap::new();
        let mut sources = Vec::new();
        for path in paths {
            let path = path.as_ref();
            let store = if path.is_dir() {
                Self::from_dir(path)?
            } else {
                Self::from_file(path)?
            };
            sources.push(store.source);
            documents.extend(store.documents);
        }

        Ok(Self {
            documents,
            source: DocumentSource::Multiple(sources),
        })
    }

    /// Looks up a document by name.
    pub fn get(&self, name: &str) -> Option<&Document> {
        self.documents.get(name)
    }

    /// Inserts a document, replacing any existing entry with the same name.
    pub fn insert(&mut self, document: Document) {
        self.documents.insert(document.name.clone(), document);
    }

    /// Returns `true` if the store contains a document named `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.documents.contains_key(name)
    }

    /// Returns the number of documents in the store.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns `true` if the store contains no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Returns an iterator over document names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    /// Returns an iterator over documents in name order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    /// Returns a reference to the source metadata.
    pub fn source(&self) -> &DocumentSource {
        &self.source
    }
}

/// Builder for constructing a [`DocumentStore`] with a fallback chain.
///
/// Sources are tried in the order they are added. The first successful load
/// wins; if all fail, [`StoreError::NoSourcesAvailable`] is returned.
///
/// # Example
///
/// ```no_run
/// use page_schema_db::DocumentStore;
///
/// let store = DocumentStore::builder()
///     .from_dir("/srv/pages/")
///     .from_file("/srv/pages.json")
///     .build()
///     .unwrap();
/// ```
pub struct StoreBuilder {
    sources: Vec<DocumentSource>,
}

impl StoreBuilder {
    /// Creates a new builder with no sources.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Adds a directory of document files as a source.
    pub fn from_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(DocumentSource::Directory(path.into()));
        self
    }

    /// Adds a single document file as a source.
    pub fn from_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(DocumentSource::File(path.into()));
        self
    }

    /// Attempts to load documents from configured sources in order.
    ///
    /// Returns the first successfully loaded store. If all sources fail,
    /// returns [`StoreError::NoSourcesAvailable`].
    pub fn build(self) -> Result<DocumentStore> {
        if self.sources.is_empty() {
            return Err(StoreError::NoSourcesAvailable);
        }

        let all_sources = self.sources.clone();

        for source in &self.sources {
            let result = match source {
                DocumentSource::Directory(path) => DocumentStore::from_dir(path),
                DocumentSource::File(path) => DocumentStore::from_file(path),
                DocumentSource::Multiple(_) => continue,
            };

            if let Ok(mut store) = result {
                store.source = DocumentSource::Multiple(all_sources);
                return Ok(store);
            }
        }

        Err(StoreError::NoSourcesAvailable)
    }
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}
