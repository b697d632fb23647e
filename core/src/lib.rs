//! Schema validation and page composition for CMS content.
//!
//! Raw page documents arrive as JSON trees whose content records come in
//! several historical schema generations. This crate turns them into a
//! single canonical, strongly typed [`Page`]:
//!
//! - [`SchemaRegistry`]: field contracts per content variant and generation.
//! - [`classify`]: picks the variant and generation of a raw record.
//! - [`validate`]: checks a record against its contract, collecting every
//!   violation with its [`FieldPath`].
//! - [`normalize`]: maps a validated record of any generation onto the
//!   canonical [`Content`] model.
//! - [`compose_body`]: builds body sequences, resolving fragment references
//!   and rejecting structural cycles.
//! - [`PageComposer`]: composes slots and pages and enforces the page-level
//!   rules (exploded `main` slot, live-blog cards).
//!
//! Normalization is idempotent: serializing a [`Content`] and running it
//! back through the pipeline yields an equal value.
//!
//! # Example
//!
//! ```
//! use page_schema_core::*;
//! use serde_json::json;
//!
//! let raw = json!({
//!     "pageType": "article",
//!     "lineage": [{"name": "News", "url": "/news"}],
//!     "seoData": {"metaTitle": "Harbor reopens"},
//!     "slots": {
//!         "main": [{
//!             "inputTemplate": "article",
//!             "contentId": "a-1",
//!             "title": "Harbor reopens",
//!             "pubDate": "2024-05-01",
//!             "authors": [{
//!                 "inputTemplate": "author",
//!                 "contentId": "au-1",
//!                 "contentName": "Dana Levi",
//!                 "authorType": "htz",
//!                 "hasPushAlerts": true,
//!             }],
//!             "body": ["Ships are moving again."],
//!         }],
//!     },
//! });
//!
//! let page = compose_page(&raw).unwrap();
//! let article = page.primary().and_then(Content::as_article).unwrap();
//! let AuthorEntry::Author(author) = &article.authors[0] else { panic!() };
//! assert_eq!(author.as_author().unwrap().author_type, AuthorType::Haaretz);
//! ```

mod body;
mod cache;
mod compose;
mod contracts;
mod discriminate;
mod error;
mod normalize;
mod options;
mod page;
mod registry;
mod types;
mod validate;

pub use body::compose_body;
pub use cache::{CacheKey, NormalizationCache};
pub use compose::{Composed, OrderedSlot, PageComposer, compose_page, compose_slot, order_cards};
pub use contracts::{AUTHOR_TYPES, IMAGE_TYPES, LEADING_MEDIA, LEGACY_AUTHOR_TYPES, PULLQUOTE_TYPES};
pub use discriminate::{BodyClass, Classification, classify, classify_as, classify_body_element, classify_with_hint};
pub use error::{CompositionError, CompositionWarning, ErrorReport, FieldPath, PathSegment, ValidationError};
pub use normalize::normalize;
pub use options::{ComposeOptions, DEFAULT_MAX_BODY_DEPTH, DEFAULT_MAX_BODY_NODES};
pub use page::{Page, PageType, SeoData};
pub use registry::{FieldContract, FieldKind, FieldSpec, Generation, RegistryError, SchemaRegistry};
pub use types::*;
pub use validate::{FieldValue, ValidRecord, Validator, parse_date, validate};
