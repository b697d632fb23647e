//! Record validation against a field contract.
//!
//! Validation checks a raw record against the contract of one
//! `(variant, generation)` pair and produces a [`ValidRecord`]: typed field
//! values plus the fields the contract does not declare. Every violation is
//! collected with its [`FieldPath`], so one pass reports all problems in a
//! record instead of stopping at the first.
//!
//! Nested records (leading media, author bylines, gallery images, cards) are
//! discriminated and validated recursively; body fields go through the body
//! composer.
//!
//! # Examples
//!
//! ```
//! use page_schema_core::*;
//! use serde_json::json;
//!
//! let raw = json!({
//!     "inputTemplate": "embed",
//!     "contentId": "e-1",
//!     "identifier": "yt-9bZkp7q19f0",
//!     "provider": "youtube",
//! });
//! let record = validate(SchemaRegistry::builtin(), &raw, "embed", Generation::new(1)).unwrap();
//! assert_eq!(record.text("identifier"), Some("yt-9bZkp7q19f0"));
//! assert_eq!(record.extra["provider"], "youtube");
//!
//! // Missing required field
//! let raw = json!({"inputTemplate": "embed", "contentId": "e-1"});
//! let errors = validate(SchemaRegistry::builtin(), &raw, "embed", Generation::new(1)).unwrap_err();
//! assert!(matches!(&errors[..], [ValidationError::MissingField { .. }]));
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::{Map, Value};
use tracing::warn;

use crate::body;
use crate::discriminate::{Classification, classify_as, classify_with_hint};
use crate::error::{CompositionWarning, FieldPath, ValidationError};
use crate::normalize::normalize;
use crate::options::ComposeOptions;
use crate::registry::{FieldKind, Generation, SchemaRegistry};
use crate::types::{
    Aspect, AspectName, BodyElement, Content, ContentSummary, ImageAsset, TaxonomyItem,
};

/// Envelope keys every content record carries; never part of `extra`.
const ENVELOPE: &[&str] = &["inputTemplate", "contentId", "contentName"];

/// A typed field value of a validated record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
    Integer(u64),
    Date(DateTime<Utc>),
    Taxonomy(TaxonomyItem),
    Aspects(BTreeMap<AspectName, Aspect>),
    Assets(Vec<ImageAsset>),
    Body(Vec<BodyElement>),
    Record(Box<ValidRecord>),
    Summary(ContentSummary),
    Object(Map<String, Value>),
    List(Vec<FieldValue>),
}

/// A raw record that passed validation for one `(variant, generation)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRecord {
    pub variant: &'static str,
    pub generation: Generation,
    pub content_id: String,
    pub content_name: Option<String>,
    /// Where the record sits in the enclosing document.
    pub path: FieldPath,
    pub fields: BTreeMap<&'static str, FieldValue>,
    /// Undeclared fields, carried through untouched. Keys declared by the
    /// variant's latest generation are dropped instead.
    pub extra: Map<String, Value>,
}

impl ValidRecord {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(FieldValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(FieldValue::Flag(flag)) => Some(*flag),
            _ => None,
        }
    }

    pub fn date(&self, name: &str) -> Option<DateTime<Utc>> {
        match self.get(name) {
            Some(FieldValue::Date(date)) => Some(*date),
            _ => None,
        }
    }

    pub fn record(&self, name: &str) -> Option<&ValidRecord> {
        match self.get(name) {
            Some(FieldValue::Record(record)) => Some(record),
            _ => None,
        }
    }

    /// Items of a list field; empty when the field is absent.
    pub fn list(&self, name: &str) -> &[FieldValue] {
        match self.get(name) {
            Some(FieldValue::List(items)) => items,
            _ => &[],
        }
    }

    pub fn body(&self, name: &str) -> Option<&[BodyElement]> {
        match self.get(name) {
            Some(FieldValue::Body(elements)) => Some(elements),
            _ => None,
        }
    }

    pub(crate) fn require_text(&self, name: &str) -> Result<String, ValidationError> {
        self.text(name)
            .map(str::to_string)
            .ok_or_else(|| self.missing(name))
    }

    pub(crate) fn require_date(&self, name: &str) -> Result<DateTime<Utc>, ValidationError> {
        self.date(name).ok_or_else(|| self.missing(name))
    }

    pub(crate) fn missing(&self, name: &str) -> ValidationError {
        ValidationError::MissingField {
            path: self.path.key(name),
        }
    }
}

/// Validates a raw record against one `(variant, generation)` contract with
/// default options.
pub fn validate(
    registry: &SchemaRegistry,
    raw: &Value,
    variant: &str,
    generation: Generation,
) -> Result<ValidRecord, Vec<ValidationError>> {
    let options = ComposeOptions::default();
    Validator::new(registry, &options).validate(raw, variant, generation, &FieldPath::root())
}

/// Stateful validation pass.
///
/// Holds the registry and options for one pass and collects the warnings
/// raised while walking nested bodies.
#[derive(Debug)]
pub struct Validator<'a> {
    registry: &'a SchemaRegistry,
    options: &'a ComposeOptions,
    warnings: Vec<CompositionWarning>,
}

impl<'a> Validator<'a> {
    pub fn new(registry: &'a SchemaRegistry, options: &'a ComposeOptions) -> Self {
        Self {
            registry,
            options,
            warnings: Vec::new(),
        }
    }

    pub fn registry(&self) -> &'a SchemaRegistry {
        self.registry
    }

    pub fn options(&self) -> &'a ComposeOptions {
        self.options
    }

    pub fn warnings(&self) -> &[CompositionWarning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<CompositionWarning> {
        self.warnings
    }

    /// Records that an element of unknown variant was dropped.
    pub(crate) fn drop_unknown(&mut self, path: &FieldPath, input_template: Option<String>) {
        warn!(
            path = %path,
            input_template = input_template.as_deref().unwrap_or("<none>"),
            "dropping content of unknown variant"
        );
        self.warnings.push(CompositionWarning::UnknownContent {
            path: path.clone(),
            input_template,
        });
    }

    /// Validates `raw` against a specific contract.
    pub fn validate(
        &mut self,
        raw: &Value,
        variant: &str,
        generation: Generation,
        path: &FieldPath,
    ) -> Result<ValidRecord, Vec<ValidationError>> {
        self.validate_record(raw, variant, generation, path, 0)
    }

    /// Classifies, validates and normalizes a standalone record.
    ///
    /// Returns `Ok(None)` when the record's variant is unknown; the record is
    /// dropped and a warning is recorded.
    pub fn content(&mut self, raw: &Value, path: &FieldPath) -> Result<Option<Content>, Vec<ValidationError>> {
        self.content_at(raw, path, 0)
    }

    pub(crate) fn content_at(
        &mut self,
        raw: &Value,
        path: &FieldPath,
        depth: usize,
    ) -> Result<Option<Content>, Vec<ValidationError>> {
        let classification = self.classify(raw);
        let Some((variant, generation)) = resolve(classification, path).map_err(|err| vec![err])? else {
            let template = raw.get("inputTemplate").and_then(Value::as_str).map(str::to_string);
            self.drop_unknown(path, template);
            return Ok(None);
        };
        let record = self.validate_record(raw, variant, generation, path, depth)?;
        normalize(&record).map(Some).map_err(|err| vec![err])
    }

    /// Classifies a record, honoring any generation hint for its variant.
    pub fn classify(&self, raw: &Value) -> Classification {
        let hint = raw
            .get("inputTemplate")
            .and_then(Value::as_str)
            .and_then(|template| self.options.hint(template));
        classify_with_hint(self.registry, raw, hint)
    }

    pub(crate) fn validate_record(
        &mut self,
        raw: &Value,
        variant: &str,
        generation: Generation,
        path: &FieldPath,
        depth: usize,
    ) -> Result<ValidRecord, Vec<ValidationError>> {
        if depth > self.options.max_body_depth {
            return Err(vec![ValidationError::malformed(
                path,
                format!("nesting deeper than {} levels", self.options.max_body_depth),
            )]);
        }
        let contract = self.registry.lookup(variant, generation).map_err(|_| {
            vec![ValidationError::UnknownSchema {
                path: path.clone(),
                variant: variant.to_string(),
                generation,
            }]
        })?;
        let Some(obj) = raw.as_object() else {
            return Err(vec![ValidationError::type_mismatch(
                path,
                format!("{} record", contract.variant),
                raw,
            )]);
        };

        let mut errors = Vec::new();
        let content_id = envelope_string(obj, "contentId", true, path, &mut errors);
        envelope_string(obj, "inputTemplate", true, path, &mut errors);
        let content_name = if contract.declares("contentName") {
            obj.get("contentName").and_then(Value::as_str).map(str::to_string)
        } else {
            envelope_string(obj, "contentName", false, path, &mut errors)
        };

        let mut fields = BTreeMap::new();
        for spec in contract.fields() {
            let field_path = path.key(spec.name);
            match obj.get(spec.name) {
                None | Some(Value::Null) => {
                    if spec.required {
                        errors.push(ValidationError::MissingField { path: field_path });
                    }
                }
                Some(value) => match self.validate_value(value, spec.kind, &field_path, depth) {
                    Ok(field) => {
                        fields.insert(spec.name, field);
                    }
                    Err(mut field_errors) => errors.append(&mut field_errors),
                },
            }
        }
        check_date_order(&fields, path, &mut errors);

        let content_id = match content_id {
            Some(id) if errors.is_empty() => id,
            _ => return Err(errors),
        };
        // a key the latest generation declares would be read back as that
        // field once the canonical record is re-emitted
        let latest = self.registry.latest(contract.variant);
        let extra = obj
            .iter()
            .filter(|(key, _)| {
                !ENVELOPE.contains(&key.as_str())
                    && !contract.declares(key)
                    && !latest.is_some_and(|latest| latest.declares(key))
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(ValidRecord {
            variant: contract.variant,
            generation,
            content_id,
            content_name,
            path: path.clone(),
            fields,
            extra,
        })
    }

    fn validate_value(
        &mut self,
        value: &Value,
        kind: FieldKind,
        path: &FieldPath,
        depth: usize,
    ) -> Result<FieldValue, Vec<ValidationError>> {
        let mismatch = || vec![ValidationError::type_mismatch(path, kind.describe(), value)];
        match kind {
            FieldKind::String | FieldKind::Vocabulary(_) => value
                .as_str()
                .map(|s| FieldValue::Text(s.to_string()))
                .ok_or_else(mismatch),
            FieldKind::Bool => value.as_bool().map(FieldValue::Flag).ok_or_else(mismatch),
            FieldKind::Integer => value.as_u64().map(FieldValue::Integer).ok_or_else(mismatch),
            FieldKind::Date => parse_date(value).map(FieldValue::Date).ok_or_else(mismatch),
            FieldKind::Enum(allowed) => {
                let text = value.as_str().ok_or_else(mismatch)?;
                if allowed.contains(&text) {
                    Ok(FieldValue::Text(text.to_string()))
                } else {
                    Err(vec![ValidationError::ConstraintViolation {
                        path: path.clone(),
                        reason: format!("`{text}` is not one of {}", allowed.join(", ")),
                    }])
                }
            }
            FieldKind::Taxonomy => taxonomy_item(value, path).map(FieldValue::Taxonomy),
            FieldKind::Aspects => aspects(value, path).map(FieldValue::Aspects),
            FieldKind::ImageAssets => image_assets(value, path).map(FieldValue::Assets),
            FieldKind::Body => body::compose_at(self, value, path, depth + 1).map(FieldValue::Body),
            FieldKind::Content(variants) => self.nested(value, variants, kind, path, depth),
            FieldKind::Summary => summary(value, path).map(FieldValue::Summary),
            FieldKind::AuthorOrName => match value {
                Value::String(name) => Ok(FieldValue::Text(name.clone())),
                Value::Object(_) => self.nested(value, &["author"], kind, path, depth),
                _ => Err(mismatch()),
            },
            FieldKind::Object => value
                .as_object()
                .cloned()
                .map(FieldValue::Object)
                .ok_or_else(mismatch),
            FieldKind::List(inner) => {
                let items = value.as_array().ok_or_else(mismatch)?;
                let mut values = Vec::with_capacity(items.len());
                let mut errors = Vec::new();
                for (i, item) in items.iter().enumerate() {
                    match self.validate_value(item, *inner, &path.index(i), depth) {
                        Ok(field) => values.push(field),
                        Err(mut item_errors) => errors.append(&mut item_errors),
                    }
                }
                if errors.is_empty() {
                    Ok(FieldValue::List(values))
                } else {
                    Err(errors)
                }
            }
        }
    }

    /// Validates a nested record restricted to the given variants; the first
    /// permitted variant matching the record's template wins.
    fn nested(
        &mut self,
        value: &Value,
        variants: &[&str],
        kind: FieldKind,
        path: &FieldPath,
        depth: usize,
    ) -> Result<FieldValue, Vec<ValidationError>> {
        let Some(template) = value.get("inputTemplate").and_then(Value::as_str) else {
            return Err(vec![ValidationError::type_mismatch(path, kind.describe(), value)]);
        };
        let Some(variant) = variants.iter().copied().find(|variant| *variant == template) else {
            return Err(vec![ValidationError::TypeMismatch {
                path: path.clone(),
                expected: kind.describe(),
                found: format!("{template} record"),
            }]);
        };

        let classification = classify_as(self.registry, variant, value, self.options.hint(variant));
        match resolve(classification, path).map_err(|err| vec![err])? {
            Some((variant, generation)) => self
                .validate_record(value, variant, generation, path, depth + 1)
                .map(|record| FieldValue::Record(Box::new(record))),
            None => Err(vec![ValidationError::TypeMismatch {
                path: path.clone(),
                expected: kind.describe(),
                found: format!("unregistered {template} record"),
            }]),
        }
    }
}

/// Turns a classification into the contract to validate against.
///
/// `Ok(None)` means the variant is unknown.
pub(crate) fn resolve(
    classification: Classification,
    path: &FieldPath,
) -> Result<Option<(&'static str, Generation)>, ValidationError> {
    match classification {
        Classification::Matched { variant, generation } => Ok(Some((variant, generation))),
        Classification::Ambiguous { variant, candidates } => Err(ValidationError::SchemaAmbiguous {
            path: path.clone(),
            variant: variant.to_string(),
            candidates,
        }),
        Classification::Unknown { .. } => Ok(None),
    }
}

/// Parses a raw date: RFC 3339, `YYYY-MM-DD` (midnight UTC) or epoch
/// milliseconds.
///
/// ```
/// use page_schema_core::parse_date;
/// use serde_json::json;
///
/// let a = parse_date(&json!("2024-05-01T00:00:00Z")).unwrap();
/// let b = parse_date(&json!("2024-05-01")).unwrap();
/// let c = parse_date(&json!(1714521600000_i64)).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(b, c);
/// assert!(parse_date(&json!("yesterday")).is_none());
/// ```
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => DateTime::parse_from_rfc3339(text)
            .map(|date| date.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
                    .map(|midnight| Utc.from_utc_datetime(&midnight))
            }),
        Value::Number(number) => number
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

fn envelope_string(
    obj: &Map<String, Value>,
    key: &str,
    required: bool,
    path: &FieldPath,
    errors: &mut Vec<ValidationError>,
) -> Option<String> {
    match obj.get(key) {
        Some(Value::String(text)) => Some(text.clone()),
        None | Some(Value::Null) => {
            if required {
                errors.push(ValidationError::MissingField { path: path.key(key) });
            }
            None
        }
        Some(other) => {
            errors.push(ValidationError::type_mismatch(&path.key(key), "string", other));
            None
        }
    }
}

fn check_date_order(
    fields: &BTreeMap<&'static str, FieldValue>,
    path: &FieldPath,
    errors: &mut Vec<ValidationError>,
) {
    if let (Some(FieldValue::Date(published)), Some(FieldValue::Date(modified))) =
        (fields.get("pubDate"), fields.get("modDate"))
    {
        if modified < published {
            errors.push(ValidationError::ConstraintViolation {
                path: path.key("modDate"),
                reason: format!("modDate {modified} precedes pubDate {published}"),
            });
        }
    }
}

fn object<'v>(value: &'v Value, expected: &str, path: &FieldPath) -> Result<&'v Map<String, Value>, Vec<ValidationError>> {
    value
        .as_object()
        .ok_or_else(|| vec![ValidationError::type_mismatch(path, expected, value)])
}

fn taxonomy_item(value: &Value, path: &FieldPath) -> Result<TaxonomyItem, Vec<ValidationError>> {
    let obj = object(value, "taxonomy item", path)?;
    let mut errors = Vec::new();
    let name = envelope_string(obj, "name", true, path, &mut errors);
    let url = envelope_string(obj, "url", true, path, &mut errors);
    let path_segment = envelope_string(obj, "pathSegment", false, path, &mut errors);
    let content_id = envelope_string(obj, "contentId", false, path, &mut errors);
    match (name, url) {
        (Some(name), Some(url)) if errors.is_empty() => Ok(TaxonomyItem {
            name,
            url,
            path_segment,
            content_id,
        }),
        _ => Err(errors),
    }
}

/// Validates a list of taxonomy items, such as a page lineage.
pub(crate) fn taxonomy_list(value: &Value, path: &FieldPath) -> Result<Vec<TaxonomyItem>, Vec<ValidationError>> {
    let Some(items) = value.as_array() else {
        return Err(vec![ValidationError::type_mismatch(path, "list of taxonomy item", value)]);
    };
    let mut taxonomy = Vec::with_capacity(items.len());
    let mut errors = Vec::new();
    for (i, item) in items.iter().enumerate() {
        match taxonomy_item(item, &path.index(i)) {
            Ok(item) => taxonomy.push(item),
            Err(mut item_errors) => errors.append(&mut item_errors),
        }
    }
    if errors.is_empty() { Ok(taxonomy) } else { Err(errors) }
}

fn summary(value: &Value, path: &FieldPath) -> Result<ContentSummary, Vec<ValidationError>> {
    let obj = object(value, "content summary", path)?;
    let mut errors = Vec::new();
    let input_template = envelope_string(obj, "inputTemplate", true, path, &mut errors);
    let content_id = envelope_string(obj, "contentId", true, path, &mut errors);
    let content_name = envelope_string(obj, "contentName", false, path, &mut errors);
    let extra = obj
        .iter()
        .filter(|(key, _)| !ENVELOPE.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    match (input_template, content_id) {
        (Some(input_template), Some(content_id)) if errors.is_empty() => Ok(ContentSummary {
            input_template,
            content_id,
            content_name,
            extra,
        }),
        _ => Err(errors),
    }
}

fn aspects(value: &Value, path: &FieldPath) -> Result<BTreeMap<AspectName, Aspect>, Vec<ValidationError>> {
    let obj = object(value, "aspect map", path)?;
    let mut aspects = BTreeMap::new();
    let mut errors = Vec::new();
    for (name, crop) in obj {
        let crop_path = path.key(name);
        let Some(aspect_name) = AspectName::from_name(name) else {
            errors.push(ValidationError::ConstraintViolation {
                path: crop_path,
                reason: format!("unknown aspect `{name}`"),
            });
            continue;
        };
        match aspect(crop, &crop_path) {
            Ok(aspect) => {
                aspects.insert(aspect_name, aspect);
            }
            Err(mut crop_errors) => errors.append(&mut crop_errors),
        }
    }
    if errors.is_empty() { Ok(aspects) } else { Err(errors) }
}

fn aspect(value: &Value, path: &FieldPath) -> Result<Aspect, Vec<ValidationError>> {
    let obj = object(value, "aspect", path)?;
    let mut errors = Vec::new();
    let width = dimension(obj, "width", path, &mut errors);
    let height = dimension(obj, "height", path, &mut errors);
    let x = dimension(obj, "x", path, &mut errors);
    let y = dimension(obj, "y", path, &mut errors);

    for (key, size) in [("width", width), ("height", height)] {
        if size == Some(0) {
            errors.push(ValidationError::ConstraintViolation {
                path: path.key(key),
                reason: format!("crop {key} must be positive"),
            });
        }
    }
    match (width, height, x, y) {
        (Some(width), Some(height), Some(x), Some(y)) if errors.is_empty() => Ok(Aspect { width, height, x, y }),
        _ => Err(errors),
    }
}

fn dimension(
    obj: &Map<String, Value>,
    key: &str,
    path: &FieldPath,
    errors: &mut Vec<ValidationError>,
) -> Option<u32> {
    let key_path = path.key(key);
    let Some(value) = obj.get(key).filter(|value| !value.is_null()) else {
        errors.push(ValidationError::MissingField { path: key_path });
        return None;
    };
    if let Some(size) = value.as_u64() {
        return match u32::try_from(size) {
            Ok(size) => Some(size),
            Err(_) => {
                errors.push(ValidationError::ConstraintViolation {
                    path: key_path,
                    reason: format!("{key} {size} is out of range"),
                });
                None
            }
        };
    }
    if value.as_i64().is_some() {
        errors.push(ValidationError::ConstraintViolation {
            path: key_path,
            reason: format!("{key} must be non-negative"),
        });
    } else {
        errors.push(ValidationError::type_mismatch(&key_path, "non-negative integer", value));
    }
    None
}

fn image_assets(value: &Value, path: &FieldPath) -> Result<Vec<ImageAsset>, Vec<ValidationError>> {
    let Some(items) = value.as_array() else {
        return Err(vec![ValidationError::type_mismatch(path, "image asset list", value)]);
    };
    let mut assets = Vec::with_capacity(items.len());
    let mut errors = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let item_path = path.index(i);
        let obj = match object(item, "image asset", &item_path) {
            Ok(obj) => obj,
            Err(mut item_errors) => {
                errors.append(&mut item_errors);
                continue;
            }
        };
        let img_name = envelope_string(obj, "imgName", true, &item_path, &mut errors);
        let version = match obj.get("version") {
            None | Some(Value::Null) => None,
            Some(Value::String(version)) => Some(version.clone()),
            Some(Value::Number(version)) => Some(version.to_string()),
            Some(other) => {
                errors.push(ValidationError::type_mismatch(
                    &item_path.key("version"),
                    "string or number",
                    other,
                ));
                None
            }
        };
        let extra = obj
            .iter()
            .filter(|(key, _)| key.as_str() != "imgName" && key.as_str() != "version")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        if let Some(img_name) = img_name {
            assets.push(ImageAsset {
                img_name,
                version,
                extra,
            });
        }
    }
    if errors.is_empty() { Ok(assets) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> &'static SchemaRegistry {
        SchemaRegistry::builtin()
    }

    fn paths(errors: &[ValidationError]) -> Vec<String> {
        errors.iter().map(|err| err.path().to_string()).collect()
    }

    #[test]
    fn test_collects_every_violation() {
        let raw = json!({
            "inputTemplate": "advert",
            "contentId": "ad",
            "style": 4,
            "class": "banner",
        });
        let errors = validate(registry(), &raw, "advert", Generation::new(1)).unwrap_err();
        assert_eq!(paths(&errors), vec!["style", "id", "audianceTarget"]);
        assert!(matches!(errors[0], ValidationError::TypeMismatch { .. }));
        assert!(matches!(errors[1], ValidationError::MissingField { .. }));
    }

    #[test]
    fn test_missing_content_id() {
        let raw = json!({"inputTemplate": "embed", "identifier": "x"});
        let errors = validate(registry(), &raw, "embed", Generation::new(1)).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::MissingField {
                path: FieldPath::root().key("contentId")
            }]
        );
    }

    #[test]
    fn test_unknown_generation_is_unknown_schema() {
        let raw = json!({"inputTemplate": "embed", "contentId": "e", "identifier": "x"});
        let errors = validate(registry(), &raw, "embed", Generation::new(2)).unwrap_err();
        assert!(matches!(errors[..], [ValidationError::UnknownSchema { .. }]));
    }

    #[test]
    fn test_strict_enum_rejects_unlisted_value() {
        let raw = json!({
            "inputTemplate": "pullquote",
            "contentId": "pq",
            "pullquoteType": "huge",
            "content": "quote",
        });
        let errors = validate(registry(), &raw, "pullquote", Generation::new(1)).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::ConstraintViolation {
                path: FieldPath::root().key("pullquoteType"),
                reason: "`huge` is not one of default, hasQuote, hasPic".to_string(),
            }]
        );
    }

    #[test]
    fn test_vocabulary_tolerates_unseen_value() {
        let raw = json!({
            "inputTemplate": "author",
            "contentId": "a",
            "contentName": "Jane",
            "authorType": "freelance",
        });
        let record = validate(registry(), &raw, "author", Generation::new(3)).unwrap();
        assert_eq!(record.text("authorType"), Some("freelance"));
        assert_eq!(record.content_name.as_deref(), Some("Jane"));
    }

    #[test]
    fn test_mod_date_before_pub_date() {
        let raw = json!({
            "inputTemplate": "article",
            "contentId": "a",
            "title": "t",
            "pubDate": "2024-05-02T10:00:00Z",
            "modDate": "2024-05-01",
            "body": [],
        });
        let errors = validate(registry(), &raw, "article", Generation::new(1)).unwrap_err();
        assert_eq!(paths(&errors), vec!["modDate"]);
        assert!(matches!(errors[0], ValidationError::ConstraintViolation { .. }));
    }

    #[test]
    fn test_aspect_constraints() {
        let raw = json!({
            "inputTemplate": "image",
            "contentId": "i",
            "alt": "a",
            "imgArray": [{"imgName": "a.jpg"}],
            "aspects": {
                "square": {"width": 0, "height": 10, "x": -1, "y": 0},
                "panorama": {"width": 1, "height": 1, "x": 0, "y": 0},
            },
        });
        let errors = validate(registry(), &raw, "image", Generation::new(3)).unwrap_err();
        let mut found = paths(&errors);
        found.sort();
        assert_eq!(
            found,
            vec!["aspects.panorama", "aspects.square.width", "aspects.square.x"]
        );
        assert!(errors
            .iter()
            .all(|err| matches!(err, ValidationError::ConstraintViolation { .. })));
    }

    #[test]
    fn test_nested_leading_media_rejects_other_variant() {
        let raw = json!({
            "inputTemplate": "article",
            "contentId": "a",
            "title": "t",
            "pubDate": "2024-05-01",
            "body": [],
            "leadingMedia": {"inputTemplate": "advert", "contentId": "ad"},
        });
        let errors = validate(registry(), &raw, "article", Generation::new(1)).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::TypeMismatch {
                path: FieldPath::root().key("leadingMedia"),
                expected: "image | embed | gallery record".to_string(),
                found: "advert record".to_string(),
            }]
        );
    }

    #[test]
    fn test_nested_errors_carry_full_path() {
        let raw = json!({
            "inputTemplate": "gallery",
            "contentId": "g",
            "images": [
                {"inputTemplate": "image", "contentId": "i1", "alt": "a", "image": "a.jpg"},
                {"inputTemplate": "image", "contentId": "i2", "alt": 7, "image": "b.jpg"},
            ],
        });
        let errors = validate(registry(), &raw, "gallery", Generation::new(1)).unwrap_err();
        assert_eq!(paths(&errors), vec!["images[1].alt"]);
        assert!(matches!(errors[0], ValidationError::TypeMismatch { .. }));
    }

    #[test]
    fn test_author_or_name_accepts_both_shapes() {
        let raw = json!({
            "inputTemplate": "article",
            "contentId": "a",
            "title": "t",
            "pubDate": "2024-05-01",
            "body": [],
            "authors": [
                "Staff",
                {"inputTemplate": "author", "contentId": "au", "contentName": "Jane", "authorType": "haaretz"},
            ],
        });
        let record = validate(registry(), &raw, "article", Generation::new(1)).unwrap();
        let authors = record.list("authors");
        assert_eq!(authors[0], FieldValue::Text("Staff".to_string()));
        assert!(matches!(&authors[1], FieldValue::Record(r) if r.variant == "author" && r.generation == Generation::new(3)));
    }

    #[test]
    fn test_image_asset_version_number_becomes_text() {
        let raw = json!({
            "inputTemplate": "image",
            "contentId": "i",
            "alt": "a",
            "imgArray": [{"imgName": "a.jpg", "version": 3, "hash": "f00"}],
        });
        let record = validate(registry(), &raw, "image", Generation::new(2)).unwrap();
        let Some(FieldValue::Assets(assets)) = record.get("imgArray") else {
            panic!("imgArray not validated as assets");
        };
        assert_eq!(assets[0].version.as_deref(), Some("3"));
        assert_eq!(assets[0].extra["hash"], "f00");
    }

    #[test]
    fn test_null_optional_field_is_absent() {
        let raw = json!({
            "inputTemplate": "gallery",
            "contentId": "g",
            "title": null,
            "images": [],
        });
        let record = validate(registry(), &raw, "gallery", Generation::new(1)).unwrap();
        assert!(record.get("title").is_none());
        assert!(record.extra.is_empty());
    }

    #[test]
    fn test_legacy_extra_never_shadows_canonical_field() {
        let raw = json!({
            "inputTemplate": "author",
            "contentId": "au",
            "contentName": "Dana",
            "authorType": "htz",
            "hasPushAlerts": true,
            "bio": "Writer",
            "pronouns": "they/them",
        });
        let record = validate(registry(), &raw, "author", Generation::new(1)).unwrap();
        assert!(record.get("bio").is_none());
        assert!(!record.extra.contains_key("bio"));
        assert_eq!(record.extra["pronouns"], "they/them");
    }
}
