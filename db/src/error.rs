//! Error types for document store operations.
//!
//! Covers every failure outside the composition engine itself: I/O,
//! serialization, configuration and manifest validation, and source
//! resolution.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading documents, configuration or
/// manifests.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A document file with an extension other than `.json`, `.yaml` or `.yml`.
    #[error("unsupported document format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Engine configuration rejected by [`EngineConfig::validate`](crate::EngineConfig::validate).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Manifest validation failure (e.g. unknown format version).
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// Checksum mismatch between the manifest and a document on disk.
    #[error("invalid checksum: {0}")]
    InvalidChecksum(String),

    /// All configured loader sources failed.
    #[error("no document sources available")]
    NoSourcesAvailable,
}

/// Convenience alias for results with [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
