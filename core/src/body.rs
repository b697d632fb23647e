//! Body composition.
//!
//! A body is an ordered sequence of paragraphs and embedded content records
//! (images, embeds, related-content boxes, adverts, pull quotes). Paragraphs
//! are trees of text runs and nested tags; a tag may carry an `id` and be
//! reused elsewhere in the same body through a fragment reference
//! `{"ref": "<id>"}`. References are inlined in the composed output.
//!
//! Composition rejects structural cycles (a fragment referring to one of its
//! own ancestors), dangling or duplicate fragment ids, nesting deeper than
//! [`ComposeOptions::max_body_depth`] and bodies whose inlined references
//! expand past [`ComposeOptions::max_body_nodes`] paragraph nodes, all as
//! [`ValidationError::MalformedBody`].
//!
//! # Examples
//!
//! ```
//! use page_schema_core::*;
//! use serde_json::json;
//!
//! let raw = json!([
//!     ["Breaking: ", {"tag": "strong", "id": "alert", "content": "storm warning"}],
//!     {"inputTemplate": "embed", "contentId": "e1", "identifier": "radar"},
//!     [{"ref": "alert"}, " lifted"],
//! ]);
//! let body = compose_body(SchemaRegistry::builtin(), &raw).unwrap();
//! assert_eq!(body.len(), 3);
//!
//! // A fragment that contains a reference to itself is a cycle
//! let raw = json!([[{"tag": "span", "id": "a", "content": [{"ref": "a"}]}]]);
//! let errors = compose_body(SchemaRegistry::builtin(), &raw).unwrap_err();
//! assert!(matches!(&errors[..], [ValidationError::MalformedBody { .. }]));
//! ```

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::discriminate::{BodyClass, classify_body_element};
use crate::error::{FieldPath, ValidationError, describe_json};
use crate::normalize::normalize;
use crate::options::ComposeOptions;
use crate::registry::SchemaRegistry;
use crate::types::{BodyElement, ContentKind, NestedTag, Paragraph, ParagraphNode};
use crate::validate::{Validator, resolve};

static TAG_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9-]*$").expect("static regex must compile"));

const BODY_ELEMENTS: &str = "paragraph or image | embed | related | advert | pullquote record";

/// Composes a raw body sequence with default options.
pub fn compose_body(registry: &SchemaRegistry, raw: &Value) -> Result<Vec<BodyElement>, Vec<ValidationError>> {
    let options = ComposeOptions::default();
    let mut validator = Validator::new(registry, &options);
    compose_at(&mut validator, raw, &FieldPath::root(), 0)
}

pub(crate) fn compose_at(
    validator: &mut Validator<'_>,
    raw: &Value,
    path: &FieldPath,
    depth: usize,
) -> Result<Vec<BodyElement>, Vec<ValidationError>> {
    let max_depth = validator.options().max_body_depth;
    let max_nodes = validator.options().max_body_nodes;
    if depth > max_depth {
        return Err(vec![ValidationError::malformed(
            path,
            format!("nesting deeper than {max_depth} levels"),
        )]);
    }
    let Some(elements) = raw.as_array() else {
        return Err(vec![ValidationError::type_mismatch(path, "body sequence", raw)]);
    };

    let fragments = fragment_index(elements, path, max_depth).map_err(|err| vec![err])?;
    let mut expander = Expander {
        fragments,
        max_depth,
        max_nodes,
        emitted: 0,
        expanding: Vec::new(),
    };

    let mut composed = Vec::with_capacity(elements.len());
    let mut errors = Vec::new();
    for (i, element) in elements.iter().enumerate() {
        let element_path = path.index(i);
        let template = element.get("inputTemplate").and_then(Value::as_str);
        let hint = template.and_then(|template| validator.options().hint(template));

        match classify_body_element(validator.registry(), element, hint) {
            // the budget error was reported once already
            BodyClass::Paragraph if expander.exhausted() => {}
            BodyClass::Paragraph => match expander.paragraph(element, &element_path, depth) {
                Ok(paragraph) => composed.push(BodyElement::Paragraph(paragraph)),
                Err(err) => errors.push(err),
            },
            BodyClass::Content(classification) => match resolve(classification, &element_path) {
                Err(err) => errors.push(err),
                Ok(None) => validator.drop_unknown(&element_path, template.map(str::to_string)),
                Ok(Some((variant, _))) if !ContentKind::from_template(variant).is_some_and(ContentKind::is_body_element) => {
                    errors.push(ValidationError::TypeMismatch {
                        path: element_path,
                        expected: BODY_ELEMENTS.to_string(),
                        found: format!("{variant} record"),
                    });
                }
                Ok(Some((variant, generation))) => {
                    match validator.validate_record(element, variant, generation, &element_path, depth) {
                        Ok(record) => match normalize(&record) {
                            Ok(content) => composed.push(BodyElement::Content(Box::new(content))),
                            Err(err) => errors.push(err),
                        },
                        Err(mut record_errors) => errors.append(&mut record_errors),
                    }
                }
            },
            BodyClass::Unrecognized => errors.push(ValidationError::malformed(
                &element_path,
                format!("unrecognized body element ({})", describe_json(element)),
            )),
        }
    }

    if errors.is_empty() { Ok(composed) } else { Err(errors) }
}

/// Collects every tag carrying an `id` in the paragraph parts of a body.
fn fragment_index<'v>(
    elements: &'v [Value],
    path: &FieldPath,
    max_depth: usize,
) -> Result<HashMap<&'v str, &'v Value>, ValidationError> {
    let mut fragments = HashMap::new();
    let mut stack: Vec<(&'v Value, FieldPath, usize)> = elements
        .iter()
        .enumerate()
        .filter(|(_, element)| element.get("inputTemplate").is_none())
        .map(|(i, element)| (element, path.index(i), 0))
        .collect();

    while let Some((value, value_path, depth)) = stack.pop() {
        // too deep to expand; the expander reports it
        if depth > max_depth {
            continue;
        }
        match value {
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    stack.push((item, value_path.index(i), depth + 1));
                }
            }
            Value::Object(obj) => {
                if obj.contains_key("tag") {
                    if let Some(id) = obj.get("id").and_then(Value::as_str) {
                        match fragments.entry(id) {
                            Entry::Occupied(_) => {
                                return Err(ValidationError::malformed(
                                    &value_path.key("id"),
                                    format!("duplicate fragment id `{id}`"),
                                ));
                            }
                            Entry::Vacant(slot) => {
                                slot.insert(value);
                            }
                        }
                    }
                }
                if let Some(content) = obj.get("content") {
                    stack.push((content, value_path.key("content"), depth + 1));
                }
            }
            _ => {}
        }
    }
    Ok(fragments)
}

/// Expands paragraph trees, inlining fragment references.
struct Expander<'v> {
    fragments: HashMap<&'v str, &'v Value>,
    max_depth: usize,
    max_nodes: usize,
    /// Paragraph nodes produced so far across the whole body.
    emitted: usize,
    /// Ids of the fragments on the current expansion path.
    expanding: Vec<&'v str>,
}

impl<'v> Expander<'v> {
    fn paragraph(&mut self, value: &'v Value, path: &FieldPath, depth: usize) -> Result<Paragraph, ValidationError> {
        let mut nodes = Vec::new();
        self.nodes(value, path, depth, &mut nodes)?;
        Ok(Paragraph(nodes))
    }

    fn too_deep(&self, path: &FieldPath) -> ValidationError {
        ValidationError::malformed(path, format!("nesting deeper than {} levels", self.max_depth))
    }

    fn exhausted(&self) -> bool {
        self.emitted > self.max_nodes
    }

    /// Counts one produced node against the body's budget.
    fn emit(&mut self, path: &FieldPath) -> Result<(), ValidationError> {
        self.emitted += 1;
        if self.exhausted() {
            return Err(ValidationError::malformed(
                path,
                format!("body expands to more than {} nodes", self.max_nodes),
            ));
        }
        Ok(())
    }

    fn nodes(
        &mut self,
        value: &'v Value,
        path: &FieldPath,
        depth: usize,
        out: &mut Vec<ParagraphNode>,
    ) -> Result<(), ValidationError> {
        if depth > self.max_depth {
            return Err(self.too_deep(path));
        }
        match value {
            Value::String(text) => {
                self.emit(path)?;
                out.push(ParagraphNode::Text(text.clone()));
            }
            // nested arrays flatten into the enclosing run
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    self.nodes(item, &path.index(i), depth + 1, out)?;
                }
            }
            Value::Object(obj) => {
                if let Some(reference) = obj.get("ref") {
                    let fragment = self.fragment(reference, path)?;
                    out.push(ParagraphNode::Tag(self.tag(fragment, path, depth + 1)?));
                } else if obj.contains_key("tag") {
                    out.push(ParagraphNode::Tag(self.tag(value, path, depth)?));
                } else if let Some(content) = obj.get("content") {
                    self.nodes(content, &path.key("content"), depth + 1, out)?;
                } else {
                    return Err(ValidationError::malformed(path, "unrecognized paragraph node"));
                }
            }
            other => return Err(ValidationError::type_mismatch(path, "text or nested tag", other)),
        }
        Ok(())
    }

    fn fragment(&self, reference: &'v Value, path: &FieldPath) -> Result<&'v Value, ValidationError> {
        let Some(id) = reference.as_str() else {
            return Err(ValidationError::type_mismatch(&path.key("ref"), "fragment id", reference));
        };
        if self.expanding.contains(&id) {
            let chain = self.expanding.join(" -> ");
            return Err(ValidationError::malformed(
                path,
                format!("fragment cycle: {chain} -> {id}"),
            ));
        }
        self.fragments
            .get(id)
            .copied()
            .ok_or_else(|| ValidationError::malformed(path, format!("dangling fragment reference `{id}`")))
    }

    fn tag(&mut self, value: &'v Value, path: &FieldPath, depth: usize) -> Result<NestedTag, ValidationError> {
        if depth > self.max_depth {
            return Err(self.too_deep(path));
        }
        self.emit(path)?;
        let Some(obj) = value.as_object() else {
            return Err(ValidationError::type_mismatch(path, "nested tag", value));
        };
        let tag = match obj.get("tag") {
            Some(Value::String(name)) if TAG_NAME.is_match(name) => name.clone(),
            Some(Value::String(name)) => {
                return Err(ValidationError::malformed(
                    &path.key("tag"),
                    format!("invalid tag name `{name}`"),
                ));
            }
            Some(other) => return Err(ValidationError::type_mismatch(&path.key("tag"), "tag name", other)),
            None => return Err(ValidationError::MissingField { path: path.key("tag") }),
        };
        let attributes = match obj.get("attributes") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(attributes)) => attributes.clone(),
            Some(other) => return Err(ValidationError::type_mismatch(&path.key("attributes"), "object", other)),
        };
        let id = match obj.get("id") {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) => Some(id.as_str()),
            Some(other) => return Err(ValidationError::type_mismatch(&path.key("id"), "fragment id", other)),
        };

        if let Some(id) = id {
            self.expanding.push(id);
        }
        let mut content = Vec::new();
        let expanded = match obj.get("content") {
            None | Some(Value::Null) => Ok(()),
            Some(inner) => self.nodes(inner, &path.key("content"), depth + 1, &mut content),
        };
        if id.is_some() {
            self.expanding.pop();
        }
        expanded?;

        Ok(NestedTag {
            tag,
            attributes,
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContentFields;
    use serde_json::json;

    fn compose(raw: Value) -> Result<Vec<BodyElement>, Vec<ValidationError>> {
        compose_body(SchemaRegistry::builtin(), &raw)
    }

    fn compose_with(raw: Value, options: ComposeOptions) -> Result<Vec<BodyElement>, Vec<ValidationError>> {
        let mut validator = Validator::new(SchemaRegistry::builtin(), &options);
        compose_at(&mut validator, &raw, &FieldPath::root(), 0)
    }

    fn compose_with_depth(raw: Value, depth: usize) -> Result<Vec<BodyElement>, Vec<ValidationError>> {
        compose_with(raw, ComposeOptions::default().with_max_body_depth(depth))
    }

    /// Paragraphs defining fragments `f0..=f{levels}`, each holding `fan_out`
    /// references to the one below it. No cycles, exponential expansion.
    fn fan_out_body(levels: usize, fan_out: usize) -> Value {
        let mut paragraphs = vec![json!([{"tag": "b", "id": "f0", "content": "x"}])];
        for level in 1..=levels {
            let refs: Vec<Value> = (0..fan_out).map(|_| json!({"ref": format!("f{}", level - 1)})).collect();
            paragraphs.push(json!([{"tag": "span", "id": format!("f{level}"), "content": refs}]));
        }
        Value::Array(paragraphs)
    }

    fn text(s: &str) -> ParagraphNode {
        ParagraphNode::Text(s.to_string())
    }

    fn only_malformed(errors: &[ValidationError]) -> &str {
        match errors {
            [ValidationError::MalformedBody { reason, .. }] => reason,
            other => panic!("expected a single MalformedBody, got {other:?}"),
        }
    }

    #[test]
    fn test_paragraph_shapes() {
        let body = compose(json!([
            "plain",
            ["a", ["b", ["c"]]],
            {"content": "legacy"},
            {"tag": "h2", "content": "Heading"},
        ]))
        .unwrap();
        assert_eq!(
            body,
            vec![
                BodyElement::Paragraph(Paragraph(vec![text("plain")])),
                BodyElement::Paragraph(Paragraph(vec![text("a"), text("b"), text("c")])),
                BodyElement::Paragraph(Paragraph(vec![text("legacy")])),
                BodyElement::Paragraph(Paragraph(vec![ParagraphNode::Tag(NestedTag {
                    tag: "h2".to_string(),
                    attributes: Map::new(),
                    content: vec![text("Heading")],
                })])),
            ]
        );
    }

    #[test]
    fn test_fragment_reference_is_inlined() {
        let body = compose(json!([
            [{"tag": "em", "id": "q", "content": "quoted"}],
            [{"ref": "q"}],
        ]))
        .unwrap();
        let BodyElement::Paragraph(second) = &body[1] else {
            panic!("second element should be a paragraph");
        };
        assert_eq!(second.plain_text(), "quoted");
        let json = serde_json::to_value(&body[1]).unwrap();
        assert_eq!(json, json!([{"tag": "em", "content": ["quoted"]}]));
    }

    #[test]
    fn test_mutual_fragment_cycle() {
        let errors = compose(json!([
            [{"tag": "span", "id": "a", "content": [{"ref": "b"}]}],
            [{"tag": "span", "id": "b", "content": [{"ref": "a"}]}],
        ]))
        .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|err| matches!(err, ValidationError::MalformedBody { reason, .. } if reason.starts_with("fragment cycle"))));
    }

    #[test]
    fn test_dangling_and_duplicate_fragments() {
        let errors = compose(json!([[{"ref": "missing"}]])).unwrap_err();
        assert_eq!(only_malformed(&errors), "dangling fragment reference `missing`");

        let errors = compose(json!([
            [{"tag": "b", "id": "x"}],
            [{"tag": "i", "id": "x"}],
        ]))
        .unwrap_err();
        assert_eq!(only_malformed(&errors), "duplicate fragment id `x`");
    }

    #[test]
    fn test_depth_bound() {
        let raw = json!([[[[["deep"]]]]]);
        assert!(compose_with_depth(raw.clone(), 8).is_ok());
        let errors = compose_with_depth(raw, 2).unwrap_err();
        assert_eq!(only_malformed(&errors), "nesting deeper than 2 levels");
    }

    #[test]
    fn test_fan_out_expansion_is_bounded() {
        let errors = compose(fan_out_body(8, 12)).unwrap_err();
        assert_eq!(only_malformed(&errors), "body expands to more than 50000 nodes");
        // f0..f4 fit in the budget; f5 is the first paragraph past it
        assert!(errors[0].path().to_string().starts_with("[5]"), "{:?}", errors[0]);
    }

    #[test]
    fn test_node_budget_is_configurable() {
        let raw = fan_out_body(2, 3);
        // f0: 2 nodes, f1: 1 + 3 * 2, f2: 1 + 3 * 7
        assert_eq!(compose_with(raw.clone(), ComposeOptions::default().with_max_body_nodes(31)).unwrap().len(), 3);
        let errors = compose_with(raw, ComposeOptions::default().with_max_body_nodes(30)).unwrap_err();
        assert_eq!(only_malformed(&errors), "body expands to more than 30 nodes");
    }

    #[test]
    fn test_invalid_tag_name() {
        let errors = compose(json!([[{"tag": "<script>"}]])).unwrap_err();
        assert_eq!(errors[0].path().to_string(), "[0][0].tag");
    }

    #[test]
    fn test_embedded_records_are_normalized() {
        let body = compose(json!([
            "intro",
            {"inputTemplate": "image", "contentId": "i1", "alt": "Pier", "image": "pier.jpg", "caption": "At dusk"},
        ]))
        .unwrap();
        let BodyElement::Content(content) = &body[1] else {
            panic!("second element should be content");
        };
        let ContentFields::Image(image) = &content.fields else {
            panic!("expected an image");
        };
        assert_eq!(image.description.as_deref(), Some("At dusk"));
        assert_eq!(image.img_array[0].img_name, "pier.jpg");
    }

    #[test]
    fn test_unknown_record_is_dropped_with_warning() {
        let options = ComposeOptions::default();
        let mut validator = Validator::new(SchemaRegistry::builtin(), &options);
        let raw = json!(["a", {"inputTemplate": "podcast", "contentId": "p"}, "b"]);
        let body = compose_at(&mut validator, &raw, &FieldPath::root().key("body"), 0).unwrap();
        assert_eq!(body.len(), 2);
        assert_eq!(validator.warnings().len(), 1);
        assert_eq!(validator.warnings()[0].to_string(), "body[1]: dropped unknown content `podcast`");
    }

    #[test]
    fn test_non_body_variant_is_type_mismatch() {
        let errors = compose(json!([
            {"inputTemplate": "gallery", "contentId": "g", "images": []},
        ]))
        .unwrap_err();
        assert!(matches!(&errors[..], [ValidationError::TypeMismatch { found, .. }] if found == "gallery record"));
    }

    #[test]
    fn test_errors_collected_across_elements() {
        let errors = compose(json!([
            42,
            {"inputTemplate": "embed", "contentId": "e"},
            [{"ref": "nope"}],
        ]))
        .unwrap_err();
        let paths: Vec<_> = errors.iter().map(|err| err.path().to_string()).collect();
        assert_eq!(paths, vec!["[0]", "[1].identifier", "[2][0]"]);
    }
}
