//! Document loading, engine configuration and composition manifests.
//!
//! This crate is the filesystem side of the page composition engine: it
//! reads raw page documents (JSON or YAML) from files and directories, loads
//! the YAML [`EngineConfig`], and tracks per-document composition state in a
//! checksummed [`Manifest`].
//!
//! # Quick start
//!
//! ```no_run
//! use page_schema_core::{PageComposer, SchemaRegistry};
//! use page_schema_db::{DocumentStore, EngineConfig, Manifest, OptionsFingerprint};
//!
//! // Load documents from a directory
//! let store = DocumentStore::from_dir("pages/").unwrap();
//!
//! // Turn the YAML configuration into composition options
//! let options = EngineConfig::load("page-compose.yml").unwrap().into_options();
//! let fingerprint = OptionsFingerprint::from(&options);
//!
//! let composer = PageComposer::new(SchemaRegistry::builtin()).with_options(options);
//! for document in store.documents() {
//!     match composer.compose(&document.value) {
//!         Ok(composed) => println!("{}: {} elements", document.name, composed.page.element_count()),
//!         Err(errors) => println!("{}: {} errors", document.name, errors.len()),
//!     }
//! }
//!
//! // Track composition state with a manifest
//! let manifest = Manifest::new("0.1.0".into(), fingerprint);
//! ```

mod config;
mod error;
mod loader;
mod manifest;

pub use config::{CONFIG_VERSION, EngineConfig};
pub use error::{Result, StoreError};
pub use loader::{Document, DocumentFormat, DocumentSource, DocumentStore, StoreBuilder};
pub use manifest::{
    CompositionStatus, DocumentEntry, MANIFEST_VERSION, Manifest, OptionsFingerprint, checksum_bytes,
};
