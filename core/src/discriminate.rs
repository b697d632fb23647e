//! Discriminator: decides which variant and schema generation a raw record
//! belongs to.
//!
//! The variant comes from `inputTemplate`. When a variant has several
//! generations each one is tested structurally; the best fit among the
//! matches is chosen by vocabulary conformance, then by how many of the
//! record's keys the contract declares. A tie is reported as
//! [`Classification::Ambiguous`] rather than guessed.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::registry::{FieldContract, FieldKind, Generation, SchemaRegistry};

/// Outcome of classifying one raw record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Classification {
    Matched {
        variant: &'static str,
        generation: Generation,
    },
    Ambiguous {
        variant: &'static str,
        candidates: Vec<Generation>,
    },
    /// `inputTemplate` is missing or names no registered variant.
    Unknown { input_template: Option<String> },
}

/// Outcome of classifying one element of a body sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyClass {
    Paragraph,
    Content(Classification),
    /// An object that is neither a paragraph nor a content record.
    Unrecognized,
}

/// Classifies a raw record by its `inputTemplate`.
///
/// # Examples
///
/// ```
/// use page_schema_core::{classify, Classification, Generation, SchemaRegistry};
/// use serde_json::json;
///
/// let raw = json!({
///     "inputTemplate": "image",
///     "contentId": "img-1",
///     "alt": "Harbor at dawn",
///     "image": "harbor.jpg",
/// });
/// assert_eq!(
///     classify(SchemaRegistry::builtin(), &raw),
///     Classification::Matched { variant: "image", generation: Generation::new(1) },
/// );
/// ```
pub fn classify(registry: &SchemaRegistry, raw: &Value) -> Classification {
    classify_with_hint(registry, raw, None)
}

/// Like [`classify`], with an optional generation forced for the record's
/// variant.
pub fn classify_with_hint(registry: &SchemaRegistry, raw: &Value, hint: Option<Generation>) -> Classification {
    let Some(template) = raw.get("inputTemplate").and_then(Value::as_str) else {
        return Classification::Unknown { input_template: None };
    };
    classify_as(registry, template, raw, hint)
}

/// Classifies a record against a given variant, regardless of its own
/// `inputTemplate`. Used where the page context fixes the variant, such as
/// the primary article of a live-blog page.
pub fn classify_as(
    registry: &SchemaRegistry,
    variant: &str,
    raw: &Value,
    hint: Option<Generation>,
) -> Classification {
    let contracts = registry.generations(variant);
    let (Some(first), Some(obj)) = (contracts.first(), raw.as_object()) else {
        return Classification::Unknown {
            input_template: Some(variant.to_string()),
        };
    };
    let variant = first.variant;

    if let Some(generation) = hint {
        debug!(variant, %generation, "generation forced by hint");
        return Classification::Matched { variant, generation };
    }
    if contracts.len() == 1 {
        return Classification::Matched {
            variant,
            generation: first.generation,
        };
    }

    let fits: Vec<(Generation, Fit)> = contracts
        .iter()
        .filter_map(|contract| structural_fit(contract, obj).map(|fit| (contract.generation, fit)))
        .collect();

    let Some(best) = fits.iter().map(|(_, fit)| *fit).max() else {
        let generation = fallback_generation(contracts, obj);
        debug!(variant, %generation, "no generation fits; validating against fallback");
        return Classification::Matched { variant, generation };
    };

    let candidates: Vec<Generation> = fits
        .iter()
        .filter(|(_, fit)| *fit == best)
        .map(|(generation, _)| *generation)
        .collect();

    match candidates.as_slice() {
        [generation] => {
            debug!(variant, generation = %generation, "classified record");
            Classification::Matched {
                variant,
                generation: *generation,
            }
        }
        _ => {
            debug!(variant, candidates = candidates.len(), "ambiguous record");
            Classification::Ambiguous { variant, candidates }
        }
    }
}

/// Classifies one element of a body sequence.
///
/// Arrays and bare strings are paragraphs, as are nested-tag objects and the
/// legacy `{"content": …}` paragraph object, none of which carry an
/// `inputTemplate`. Objects with an `inputTemplate` are content records.
pub fn classify_body_element(registry: &SchemaRegistry, raw: &Value, hint: Option<Generation>) -> BodyClass {
    match raw {
        Value::Array(_) | Value::String(_) => BodyClass::Paragraph,
        Value::Object(obj) if obj.contains_key("inputTemplate") => {
            BodyClass::Content(classify_with_hint(registry, raw, hint))
        }
        Value::Object(obj) if obj.contains_key("tag") || obj.contains_key("content") => BodyClass::Paragraph,
        _ => BodyClass::Unrecognized,
    }
}

/// Ranking of a structurally matching generation. Field order gives the
/// precedence: vocabulary conformance first, then key coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Fit {
    vocabulary_conformant: bool,
    coverage: usize,
}

fn structural_fit(contract: &FieldContract, obj: &Map<String, Value>) -> Option<Fit> {
    let mut vocabulary_conformant = true;
    for spec in contract.fields() {
        match obj.get(spec.name) {
            None | Some(Value::Null) if spec.required => return None,
            None | Some(Value::Null) => {}
            Some(value) if !spec.kind.admits(value) => return None,
            Some(value) => {
                if let FieldKind::Vocabulary(known) = spec.kind {
                    let conforms = value.as_str().is_some_and(|s| known.contains(&s));
                    vocabulary_conformant &= conforms;
                }
            }
        }
    }
    let coverage = obj.keys().filter(|key| contract.declares(key)).count();
    Some(Fit {
        vocabulary_conformant,
        coverage,
    })
}

fn fallback_generation(contracts: &[FieldContract], obj: &Map<String, Value>) -> Generation {
    contracts
        .iter()
        .find(|contract| {
            contract
                .required_fields()
                .all(|spec| obj.get(spec.name).is_some_and(|v| !v.is_null()))
        })
        .or_else(|| contracts.last())
        .map(|contract| contract.generation)
        .unwrap_or(Generation::new(1))
}
