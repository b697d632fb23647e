//! Error and warning types for validation and page composition.
//!
//! Field-level problems are collected rather than reported fail-fast, so
//! each error carries the [`FieldPath`] of the offending value (for example
//! `slots.main[2].body[5].alt`). A failed composition therefore enumerates
//! every violation found in the document.

use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::registry::Generation;

/// One step in a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Object member name.
    Key(String),
    /// Array index.
    Index(usize),
}

/// Location of a value inside a raw document.
///
/// # Examples
///
/// ```
/// use page_schema_core::FieldPath;
///
/// let path = FieldPath::root().key("slots").key("main").index(2).key("alt");
/// assert_eq!(path.to_string(), "slots.main[2].alt");
/// assert_eq!(FieldPath::root().to_string(), "(root)");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    /// The empty path, pointing at the value being validated.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Returns a new path extended by an object member.
    pub fn key(&self, key: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Key(key.to_string()));
        Self(segments)
    }

    /// Returns a new path extended by an array index.
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "(root)");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{key}")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Record-level validation failures.
///
/// Every variant is fatal for the record that produced it; the Validator
/// keeps going after the first one so sibling fields and elements are still
/// checked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is absent (or `null`).
    #[error("{path}: missing required field")]
    MissingField { path: FieldPath },

    /// A present field holds a value of the wrong kind.
    #[error("{path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: FieldPath,
        expected: String,
        found: String,
    },

    /// A value has the right kind but breaks a declared constraint
    /// (closed enumeration, crop geometry, date ordering).
    #[error("{path}: {reason}")]
    ConstraintViolation { path: FieldPath, reason: String },

    /// More than one schema generation fits the record equally well and no
    /// generation hint was supplied.
    #[error("{path}: `{variant}` matches several schema generations ({})", join_generations(.candidates))]
    SchemaAmbiguous {
        path: FieldPath,
        variant: String,
        candidates: Vec<Generation>,
    },

    /// The registry has no contract for the requested variant/generation.
    #[error("{path}: no schema registered for `{variant}` {generation}")]
    UnknownSchema {
        path: FieldPath,
        variant: String,
        generation: Generation,
    },

    /// Body content is structurally invalid: a fragment cycle, a dangling
    /// fragment reference, excessive nesting, or an unrecognizable element.
    #[error("{path}: malformed body: {reason}")]
    MalformedBody { path: FieldPath, reason: String },
}

fn join_generations(candidates: &[Generation]) -> String {
    candidates
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationError {
    pub fn path(&self) -> &FieldPath {
        match self {
            Self::MissingField { path }
            | Self::TypeMismatch { path, .. }
            | Self::ConstraintViolation { path, .. }
            | Self::SchemaAmbiguous { path, .. }
            | Self::UnknownSchema { path, .. }
            | Self::MalformedBody { path, .. } => path,
        }
    }

    /// Stable snake_case name of the error kind, used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingField { .. } => "missing_field",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::ConstraintViolation { .. } => "constraint_violation",
            Self::SchemaAmbiguous { .. } => "schema_ambiguous",
            Self::UnknownSchema { .. } => "unknown_schema",
            Self::MalformedBody { .. } => "malformed_body",
        }
    }

    pub(crate) fn type_mismatch(path: &FieldPath, expected: impl Into<String>, found: &serde_json::Value) -> Self {
        Self::TypeMismatch {
            path: path.clone(),
            expected: expected.into(),
            found: describe_json(found).to_string(),
        }
    }

    pub(crate) fn malformed(path: &FieldPath, reason: impl Into<String>) -> Self {
        Self::MalformedBody {
            path: path.clone(),
            reason: reason.into(),
        }
    }
}

/// Page-level composition failures.
///
/// A `compose_page` call that fails returns every error it collected; a
/// partial page is never produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositionError {
    /// A field- or record-level failure inside the document.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The exploded `main` slot does not start with the page's primary
    /// article.
    #[error("{path}: invalid main slot: {reason}")]
    InvalidMainSlot { path: FieldPath, reason: String },

    /// `pageType` is not one of the closed enumeration.
    #[error("unknown page type `{page_type}`")]
    UnknownPageType { page_type: String },

    /// A live-blog page whose primary article carries no cards.
    #[error("{path}: invalid live blog: {reason}")]
    InvalidLiveBlog { path: FieldPath, reason: String },
}

impl CompositionError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(err) => err.kind(),
            Self::InvalidMainSlot { .. } => "invalid_main_slot",
            Self::UnknownPageType { .. } => "unknown_page_type",
            Self::InvalidLiveBlog { .. } => "invalid_live_blog",
        }
    }

    /// Path of the offending value, when the error is tied to one.
    pub fn path(&self) -> Option<&FieldPath> {
        match self {
            Self::Validation(err) => Some(err.path()),
            Self::InvalidMainSlot { path, .. } | Self::InvalidLiveBlog { path, .. } => Some(path),
            Self::UnknownPageType { .. } => None,
        }
    }

    /// Flattens the error into a serializable report line.
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            path: self.path().map(ToString::to_string),
            message: self.to_string(),
        }
    }
}

/// Serializable summary of one [`CompositionError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub message: String,
}

/// Non-fatal findings recorded while composing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompositionWarning {
    /// An element whose `inputTemplate` matches no registered variant was
    /// dropped.
    UnknownContent {
        path: FieldPath,
        #[serde(skip_serializing_if = "Option::is_none")]
        input_template: Option<String>,
    },
}

impl fmt::Display for CompositionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownContent {
                path,
                input_template: Some(template),
            } => write!(f, "{path}: dropped unknown content `{template}`"),
            Self::UnknownContent {
                path,
                input_template: None,
            } => write!(f, "{path}: dropped content without inputTemplate"),
        }
    }
}

/// Short name of a JSON value's kind, for mismatch messages.
pub(crate) fn describe_json(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
