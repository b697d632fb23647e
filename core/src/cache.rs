//! Normalization cache shared across concurrent compositions.
//!
//! Normalization is a pure function of `(contentId, variant, generation)`
//! and the record content, so records that recur across pages (authors,
//! shared images) are normalized once. Keys carry a SHA-256 digest of the
//! raw record: two records sharing a `contentId` but differing in any field
//! never share an entry. Entries are insert-once: the first value stored
//! for a key wins and later inserts return it.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::registry::Generation;
use crate::types::Content;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub content_id: String,
    pub variant: String,
    pub generation: Generation,
    /// Hex SHA-256 of the raw record's JSON text.
    pub digest: String,
}

impl CacheKey {
    pub fn new(content_id: impl Into<String>, variant: impl Into<String>, generation: Generation, raw: &Value) -> Self {
        Self {
            content_id: content_id.into(),
            variant: variant.into(),
            generation,
            digest: format!("{:x}", Sha256::digest(raw.to_string().as_bytes())),
        }
    }
}

/// Thread-safe, insert-once map from [`CacheKey`] to normalized content.
///
/// # Examples
///
/// ```
/// use page_schema_core::*;
/// use serde_json::json;
///
/// let raw = json!({"inputTemplate": "embed", "contentId": "e-1", "identifier": "yt"});
/// let cache = NormalizationCache::new();
/// let key = CacheKey::new("e-1", "embed", Generation::new(1), &raw);
/// assert!(cache.get(&key).is_none());
///
/// let embed = Content {
///     content_id: "e-1".into(),
///     content_name: None,
///     fields: ContentFields::Embed(Embed { identifier: "yt".into() }),
///     extra: Default::default(),
/// };
/// cache.insert(key.clone(), embed.clone());
/// assert_eq!(*cache.get(&key).unwrap(), embed);
/// ```
#[derive(Debug, Default)]
pub struct NormalizationCache {
    entries: RwLock<HashMap<CacheKey, Arc<Content>>>,
}

impl NormalizationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<Content>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    /// Stores `content` unless the key is already present; returns the
    /// value held by the cache afterwards.
    pub fn insert(&self, key: CacheKey, content: Content) -> Arc<Content> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.entry(key).or_insert_with(|| Arc::new(content)).clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}
