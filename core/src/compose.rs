//! Slot and page composition.
//!
//! A raw page document names its page type, lineage, SEO metadata and a map
//! of named slots, each an ordered list of content records. Composition
//! validates and normalizes every element, preserving slot order, and
//! applies the page-level rules:
//!
//! - on article-family pages the `main` slot is exploded: `main[0]` must be
//!   the primary article, validated in the context of the page type
//! - on live-blog pages the primary article is validated as a live blog and
//!   must carry at least one card; cards are ordered pinned-first, then
//!   newest-first
//! - elements of unknown variant are dropped with a warning
//!
//! All errors found in the document are returned together; a partial page is
//! never produced.
//!
//! # Examples
//!
//! ```
//! use page_schema_core::*;
//! use serde_json::json;
//!
//! let raw = json!({
//!     "pageType": "section",
//!     "lineage": [{"name": "News", "url": "/news"}],
//!     "seoData": {"metaTitle": "News"},
//!     "slots": {
//!         "main": [
//!             {"inputTemplate": "embed", "contentId": "e-1", "identifier": "weather"},
//!             {"inputTemplate": "podcast", "contentId": "p-1"},
//!         ],
//!     },
//! });
//! let composed = PageComposer::new(SchemaRegistry::builtin()).compose(&raw).unwrap();
//! assert_eq!(composed.page.slot("main").unwrap().len(), 1);
//! assert_eq!(composed.warnings.len(), 1);
//! ```

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::cache::{CacheKey, NormalizationCache};
use crate::discriminate::classify_as;
use crate::error::{CompositionError, CompositionWarning, FieldPath, ValidationError};
use crate::normalize::normalize;
use crate::options::ComposeOptions;
use crate::page::{Page, PageType, SeoData};
use crate::registry::{Generation, SchemaRegistry};
use crate::types::{Content, ContentKind, LiveblogItem};
use crate::validate::{Validator, resolve, taxonomy_list};

static NULL: Value = Value::Null;

/// A composed page and the non-fatal findings of its composition.
#[derive(Debug, Clone, PartialEq)]
pub struct Composed {
    pub page: Page,
    pub warnings: Vec<CompositionWarning>,
}

/// One composed slot.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedSlot {
    pub name: String,
    pub elements: Vec<Content>,
    pub warnings: Vec<CompositionWarning>,
}

/// Composes raw page documents against a schema registry.
///
/// A composer is `Sync`; one instance can serve many threads. When caching
/// is enabled without a shared cache, the composer keeps its own.
#[derive(Debug)]
pub struct PageComposer<'a> {
    registry: &'a SchemaRegistry,
    options: ComposeOptions,
    shared_cache: Option<&'a NormalizationCache>,
    local_cache: NormalizationCache,
}

impl<'a> PageComposer<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self {
            registry,
            options: ComposeOptions::default(),
            shared_cache: None,
            local_cache: NormalizationCache::new(),
        }
    }

    pub fn with_options(mut self, options: ComposeOptions) -> Self {
        self.options = options;
        self
    }

    /// Uses a cache shared with other composers. Implies caching.
    pub fn with_cache(mut self, cache: &'a NormalizationCache) -> Self {
        self.shared_cache = Some(cache);
        self
    }

    pub fn options(&self) -> &ComposeOptions {
        &self.options
    }

    fn cache(&self) -> Option<&NormalizationCache> {
        match self.shared_cache {
            Some(cache) => Some(cache),
            None if self.options.cache => Some(&self.local_cache),
            None => None,
        }
    }

    /// Composes a full page document.
    pub fn compose(&self, raw: &Value) -> Result<Composed, Vec<CompositionError>> {
        let root = FieldPath::root();
        let Some(document) = raw.as_object() else {
            return Err(vec![ValidationError::type_mismatch(&root, "page document", raw).into()]);
        };
        let page_type = match document.get("pageType") {
            Some(Value::String(page_type)) => page_type.as_str(),
            None | Some(Value::Null) => {
                return Err(vec![
                    ValidationError::MissingField {
                        path: root.key("pageType"),
                    }
                    .into(),
                ]);
            }
            Some(other) => {
                return Err(vec![
                    ValidationError::type_mismatch(&root.key("pageType"), "page type name", other).into(),
                ]);
            }
        };
        self.compose_parts(
            page_type,
            document.get("lineage").unwrap_or(&NULL),
            document.get("seoData").unwrap_or(&NULL),
            document.get("slots").unwrap_or(&NULL),
        )
    }

    /// Composes a page from its separate parts.
    pub fn compose_parts(
        &self,
        page_type: &str,
        lineage: &Value,
        seo_data: &Value,
        slots: &Value,
    ) -> Result<Composed, Vec<CompositionError>> {
        let Some(page_type) = PageType::from_name(page_type) else {
            return Err(vec![CompositionError::UnknownPageType {
                page_type: page_type.to_string(),
            }]);
        };
        let root = FieldPath::root();
        let mut validator = Validator::new(self.registry, &self.options);
        let mut errors: Vec<CompositionError> = Vec::new();

        let lineage_path = root.key("lineage");
        let lineage = match lineage {
            Value::Null => {
                errors.push(ValidationError::MissingField { path: lineage_path }.into());
                Vec::new()
            }
            value => taxonomy_list(value, &lineage_path).unwrap_or_else(|lineage_errors| {
                errors.extend(lineage_errors.into_iter().map(CompositionError::from));
                Vec::new()
            }),
        };

        let seo_path = root.key("seoData");
        let seo_data = match seo_data {
            Value::Object(seo) => SeoData(seo.clone()),
            Value::Null => {
                errors.push(ValidationError::MissingField { path: seo_path }.into());
                SeoData::default()
            }
            other => {
                errors.push(ValidationError::type_mismatch(&seo_path, "object", other).into());
                SeoData::default()
            }
        };

        let slots_path = root.key("slots");
        let raw_slots = match slots {
            Value::Object(raw_slots) => raw_slots,
            Value::Null => {
                errors.push(ValidationError::MissingField { path: slots_path }.into());
                return Err(errors);
            }
            other => {
                errors.push(ValidationError::type_mismatch(&slots_path, "object of slots", other).into());
                return Err(errors);
            }
        };
        let slots = self.slots(&mut validator, raw_slots, page_type, &slots_path, &mut errors);

        if !errors.is_empty() {
            debug!(page_type = %page_type, errors = errors.len(), "page composition failed");
            return Err(errors);
        }

        let page = Page {
            page_type,
            lineage,
            seo_data,
            slots,
        };
        let warnings = validator.into_warnings();
        debug!(
            page_type = %page_type,
            elements = page.element_count(),
            warnings = warnings.len(),
            "composed page"
        );
        Ok(Composed { page, warnings })
    }

    /// Composes one slot of a page of the given type.
    pub fn compose_slot(
        &self,
        name: &str,
        raw_elements: &Value,
        page_type: PageType,
    ) -> Result<OrderedSlot, Vec<CompositionError>> {
        let mut validator = Validator::new(self.registry, &self.options);
        let path = FieldPath::root().key("slots").key(name);
        let elements = self.slot_elements(&mut validator, name, raw_elements, page_type, &path)?;
        Ok(OrderedSlot {
            name: name.to_string(),
            elements,
            warnings: validator.into_warnings(),
        })
    }

    fn slots(
        &self,
        validator: &mut Validator<'_>,
        raw_slots: &Map<String, Value>,
        page_type: PageType,
        path: &FieldPath,
        errors: &mut Vec<CompositionError>,
    ) -> BTreeMap<String, Vec<Content>> {
        let mut slots = BTreeMap::new();
        for (name, raw_elements) in raw_slots {
            match self.slot_elements(validator, name, raw_elements, page_type, &path.key(name)) {
                Ok(elements) => {
                    slots.insert(name.clone(), elements);
                }
                Err(mut slot_errors) => errors.append(&mut slot_errors),
            }
        }
        if page_type.has_exploded_main() && !raw_slots.contains_key("main") {
            errors.push(CompositionError::InvalidMainSlot {
                path: path.key("main"),
                reason: format!("{page_type} page has no main slot"),
            });
        }
        slots
    }

    fn slot_elements(
        &self,
        validator: &mut Validator<'_>,
        name: &str,
        raw_elements: &Value,
        page_type: PageType,
        path: &FieldPath,
    ) -> Result<Vec<Content>, Vec<CompositionError>> {
        let Some(items) = raw_elements.as_array() else {
            return Err(vec![
                ValidationError::type_mismatch(path, "list of content records", raw_elements).into(),
            ]);
        };
        let mut elements = Vec::with_capacity(items.len());
        let mut errors = Vec::new();

        let exploded = name == "main" && page_type.has_exploded_main();
        let (offset, rest) = match (exploded, items.split_first()) {
            (false, _) => (0, items.as_slice()),
            (true, None) => {
                errors.push(CompositionError::InvalidMainSlot {
                    path: path.clone(),
                    reason: "main slot is empty; it must start with the primary article".to_string(),
                });
                (0, items.as_slice())
            }
            (true, Some((first, rest))) => {
                match self.primary(validator, first, page_type, &path.index(0)) {
                    Ok(primary) => elements.push(primary),
                    Err(mut primary_errors) => errors.append(&mut primary_errors),
                }
                (1, rest)
            }
        };

        for (i, item) in rest.iter().enumerate() {
            match self.element(validator, item, &path.index(i + offset)) {
                Ok(Some(content)) => elements.push(content),
                Ok(None) => {}
                Err(element_errors) => errors.extend(element_errors.into_iter().map(CompositionError::from)),
            }
        }

        if errors.is_empty() { Ok(elements) } else { Err(errors) }
    }

    /// Validates `main[0]` of an article-family page. Live-blog pages take an
    /// `article` or `articleLiveBlog` record and validate it as a live blog;
    /// every other article-family page takes an `article` record only.
    fn primary(
        &self,
        validator: &mut Validator<'_>,
        raw: &Value,
        page_type: PageType,
        path: &FieldPath,
    ) -> Result<Content, Vec<CompositionError>> {
        let live_blog_page = page_type == PageType::ArticleLiveBlog;
        let template = raw.get("inputTemplate").and_then(Value::as_str);
        let accepted = template
            .and_then(ContentKind::from_template)
            .is_some_and(|kind| kind.is_primary_article_of(page_type));
        if !accepted {
            let found = template.map_or_else(|| "an element without inputTemplate".to_string(), |t| format!("`{t}`"));
            return Err(vec![CompositionError::InvalidMainSlot {
                path: path.clone(),
                reason: format!("main[0] of a {page_type} page must be the primary article, found {found}"),
            }]);
        }

        let variant = if live_blog_page {
            ContentKind::ArticleLiveBlog.as_str()
        } else {
            ContentKind::Article.as_str()
        };

        let mut errors = Vec::new();
        if live_blog_page && cards_missing(raw) {
            errors.push(CompositionError::InvalidLiveBlog {
                path: path.key("cards"),
                reason: "a live-blog page needs at least one card".to_string(),
            });
        }

        let classification = classify_as(self.registry, variant, raw, self.options.hint(variant));
        match resolve(classification, path) {
            Err(err) => errors.push(err.into()),
            Ok(None) => errors.push(CompositionError::InvalidMainSlot {
                path: path.clone(),
                reason: format!("no schema registered for `{variant}`"),
            }),
            Ok(Some((variant, generation))) => match self.normalized(validator, raw, variant, generation, path) {
                Ok(mut content) if errors.is_empty() => {
                    if let Some(live_blog) = content.as_live_blog_mut() {
                        order_cards(&mut live_blog.cards);
                    }
                    return Ok(content);
                }
                Ok(_) => {}
                Err(record_errors) => errors.extend(record_errors.into_iter().map(CompositionError::from)),
            },
        }
        Err(errors)
    }

    /// Classifies, validates and normalizes an ordinary slot element.
    /// `Ok(None)` means the element was dropped as unknown.
    fn element(
        &self,
        validator: &mut Validator<'_>,
        raw: &Value,
        path: &FieldPath,
    ) -> Result<Option<Content>, Vec<ValidationError>> {
        if !raw.is_object() {
            return Err(vec![ValidationError::type_mismatch(path, "content record", raw)]);
        }
        let classification = validator.classify(raw);
        let Some((variant, generation)) = resolve(classification, path).map_err(|err| vec![err])? else {
            let template = raw.get("inputTemplate").and_then(Value::as_str).map(str::to_string);
            validator.drop_unknown(path, template);
            return Ok(None);
        };
        self.normalized(validator, raw, variant, generation, path).map(Some)
    }

    fn normalized(
        &self,
        validator: &mut Validator<'_>,
        raw: &Value,
        variant: &'static str,
        generation: Generation,
        path: &FieldPath,
    ) -> Result<Content, Vec<ValidationError>> {
        let cached = self.cache().zip(
            raw.get("contentId")
                .and_then(Value::as_str)
                .map(|content_id| CacheKey::new(content_id, variant, generation, raw)),
        );
        if let Some((cache, key)) = &cached {
            if let Some(hit) = cache.get(key) {
                trace!(content_id = %key.content_id, variant, "normalization cache hit");
                return Ok(Content::clone(&hit));
            }
        }

        let warnings = validator.warnings().len();
        let record = validator.validate(raw, variant, generation, path)?;
        let content = normalize(&record).map_err(|err| vec![err])?;
        match cached {
            // records that raised warnings are revalidated at each occurrence
            Some((cache, key)) if validator.warnings().len() == warnings => {
                Ok(Content::clone(&cache.insert(key, content)))
            }
            _ => Ok(content),
        }
    }
}

fn cards_missing(raw: &Value) -> bool {
    match raw.get("cards") {
        None | Some(Value::Null) => true,
        Some(Value::Array(cards)) => cards.is_empty(),
        Some(_) => false,
    }
}

/// Orders live-blog cards: pinned cards first, then by publication date,
/// newest first. Cards that compare equal keep their input order.
pub fn order_cards(cards: &mut [Content]) {
    let pinned = |card: &Content| card.as_liveblog_item().is_some_and(LiveblogItem::is_pinned);
    cards.sort_by(|a, b| {
        pinned(b)
            .cmp(&pinned(a))
            .then_with(|| b.pub_date().cmp(&a.pub_date()))
    });
}

/// Composes a page document with the builtin registry and default options.
pub fn compose_page(raw: &Value) -> Result<Page, Vec<CompositionError>> {
    PageComposer::new(SchemaRegistry::builtin())
        .compose(raw)
        .map(|composed| composed.page)
}

/// Composes one slot with the builtin registry and default options.
pub fn compose_slot(name: &str, raw_elements: &Value, page_type: PageType) -> Result<OrderedSlot, Vec<CompositionError>> {
    PageComposer::new(SchemaRegistry::builtin()).compose_slot(name, raw_elements, page_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentFields, Embed};
    use serde_json::json;

    fn article(id: &str) -> Value {
        json!({
            "inputTemplate": "article",
            "contentId": id,
            "title": "Headline",
            "pubDate": "2024-06-01T09:00:00Z",
            "body": ["Lead paragraph."],
        })
    }

    fn card(id: &str, pub_date: &str, key_event: Option<&str>) -> Value {
        let mut card = json!({
            "inputTemplate": "liveblogItem",
            "contentId": id,
            "contentName": id,
            "title": id,
            "pubDate": pub_date,
            "body": [],
        });
        if let Some(event) = key_event {
            card["keyEvent"] = json!(event);
        }
        card
    }

    fn page(page_type: &str, slots: Value) -> Value {
        json!({
            "pageType": page_type,
            "lineage": [{"name": "Home", "url": "/"}],
            "seoData": {"metaTitle": "t"},
            "slots": slots,
        })
    }

    fn kinds(errors: &[CompositionError]) -> Vec<&'static str> {
        errors.iter().map(CompositionError::kind).collect()
    }

    #[test]
    fn test_unknown_page_type_is_fatal() {
        let errors = compose_page(&page("blog", json!({}))).unwrap_err();
        assert_eq!(
            errors,
            vec![CompositionError::UnknownPageType {
                page_type: "blog".to_string()
            }]
        );
    }

    #[test]
    fn test_missing_document_parts_are_all_reported() {
        let errors = compose_page(&json!({"pageType": "homepage", "slots": {}})).unwrap_err();
        let paths: Vec<_> = errors.iter().filter_map(|err| err.path()).map(ToString::to_string).collect();
        assert_eq!(paths, vec!["lineage", "seoData"]);
    }

    #[test]
    fn test_main_slot_must_start_with_article() {
        let raw = page(
            "article",
            json!({"main": [{"inputTemplate": "embed", "contentId": "e", "identifier": "x"}, article("a")]}),
        );
        let errors = compose_page(&raw).unwrap_err();
        assert_eq!(kinds(&errors), vec!["invalid_main_slot"]);
        assert_eq!(errors[0].path().unwrap().to_string(), "slots.main[0]");
    }

    #[test]
    fn test_live_blog_record_only_leads_live_blog_pages() {
        let mut live_blog = article("lb");
        live_blog["inputTemplate"] = json!("articleLiveBlog");
        live_blog["cards"] = json!([card("c", "2024-06-01T08:00:00Z", None)]);

        for page_type in ["article", "articleMagazine", "articleReviewBook"] {
            let errors = compose_page(&page(page_type, json!({"main": [live_blog.clone()]}))).unwrap_err();
            assert_eq!(kinds(&errors), vec!["invalid_main_slot"], "{page_type}");
        }

        let page = compose_page(&page("articleLiveBlog", json!({"main": [live_blog]}))).unwrap();
        assert!(page.primary().and_then(Content::as_live_blog).is_some());
    }

    #[test]
    fn test_cache_never_hides_invalid_records() {
        let cache = NormalizationCache::new();
        let composer = PageComposer::new(SchemaRegistry::builtin()).with_cache(&cache);
        let valid = page("section", json!({"a": [{"inputTemplate": "embed", "contentId": "e", "identifier": "x"}]}));
        composer.compose(&valid).unwrap();

        let invalid = page("section", json!({"a": [{"inputTemplate": "embed", "contentId": "e"}]}));
        let errors = composer.compose(&invalid).unwrap_err();
        assert_eq!(kinds(&errors), vec!["missing_field"]);

        let other = page("section", json!({"a": [{"inputTemplate": "embed", "contentId": "e", "identifier": "y"}]}));
        let composed = composer.compose(&other).unwrap();
        let embed = &composed.page.slot("a").unwrap()[0];
        assert_eq!(embed.fields, ContentFields::Embed(Embed { identifier: "y".to_string() }));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cached_records_still_report_warnings() {
        let cache = NormalizationCache::new();
        let composer = PageComposer::new(SchemaRegistry::builtin()).with_cache(&cache);
        let mut with_unknown = article("a");
        with_unknown["body"] = json!(["text", {"inputTemplate": "podcast", "contentId": "p"}]);
        let raw = page("article", json!({"main": [with_unknown]}));

        assert_eq!(composer.compose(&raw).unwrap().warnings.len(), 1);
        assert_eq!(composer.compose(&raw).unwrap().warnings.len(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_missing_and_empty_main() {
        let errors = compose_page(&page("venue", json!({"aside": []}))).unwrap_err();
        assert_eq!(kinds(&errors), vec!["invalid_main_slot"]);

        let errors = compose_page(&page("event", json!({"main": []}))).unwrap_err();
        assert_eq!(kinds(&errors), vec!["invalid_main_slot"]);
    }

    #[test]
    fn test_non_article_page_main_is_ordinary() {
        let raw = page(
            "homepage",
            json!({"main": [{"inputTemplate": "embed", "contentId": "e", "identifier": "x"}]}),
        );
        let page = compose_page(&raw).unwrap();
        assert!(page.primary().is_none());
        assert_eq!(page.slot("main").unwrap().len(), 1);
    }

    #[test]
    fn test_slot_order_preserved_without_gaps() {
        let raw = page(
            "article",
            json!({
                "main": [
                    article("a"),
                    {"inputTemplate": "embed", "contentId": "e1", "identifier": "one"},
                    {"inputTemplate": "quiz", "contentId": "q"},
                    {"inputTemplate": "embed", "contentId": "e2", "identifier": "two"},
                ],
            }),
        );
        let composed = PageComposer::new(SchemaRegistry::builtin()).compose(&raw).unwrap();
        let ids: Vec<_> = composed.page.slot("main").unwrap().iter().map(|c| c.content_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "e1", "e2"]);
        assert_eq!(
            composed.warnings,
            vec![CompositionWarning::UnknownContent {
                path: FieldPath::root().key("slots").key("main").index(2),
                input_template: Some("quiz".to_string()),
            }]
        );
    }

    #[test]
    fn test_live_blog_without_cards_yields_one_error() {
        let raw = page("articleLiveBlog", json!({"main": [article("lb")]}));
        let errors = compose_page(&raw).unwrap_err();
        assert_eq!(
            errors,
            vec![CompositionError::InvalidLiveBlog {
                path: FieldPath::root().key("slots").key("main").index(0).key("cards"),
                reason: "a live-blog page needs at least one card".to_string(),
            }]
        );
    }

    #[test]
    fn test_cards_pinned_first_then_newest() {
        let mut primary = article("lb");
        primary["cards"] = json!([
            card("old", "2024-06-01T08:00:00Z", None),
            card("pinned-old", "2024-06-01T07:00:00Z", Some("Result")),
            card("new", "2024-06-01T10:00:00Z", None),
            card("pinned-new", "2024-06-01T09:00:00Z", Some("Speech")),
            card("new-twin", "2024-06-01T10:00:00Z", Some("")),
        ]);
        let page = compose_page(&page("articleLiveBlog", json!({"main": [primary]}))).unwrap();
        let live_blog = page.primary().and_then(Content::as_live_blog).unwrap();
        let order: Vec<_> = live_blog.cards.iter().map(|c| c.content_id.as_str()).collect();
        assert_eq!(order, vec!["pinned-new", "pinned-old", "new", "new-twin", "old"]);
    }

    #[test]
    fn test_shared_cache_is_filled_once() {
        let cache = NormalizationCache::new();
        let composer = PageComposer::new(SchemaRegistry::builtin()).with_cache(&cache);
        let raw = page(
            "section",
            json!({
                "a": [{"inputTemplate": "embed", "contentId": "e", "identifier": "x"}],
                "b": [{"inputTemplate": "embed", "contentId": "e", "identifier": "x"}],
            }),
        );
        let composed = composer.compose(&raw).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(composed.page.slot("a"), composed.page.slot("b"));
    }

    #[test]
    fn test_compose_slot_entry() {
        let slot = compose_slot(
            "main",
            &json!([article("a"), {"inputTemplate": "embed", "contentId": "e", "identifier": "x"}]),
            PageType::ArticleRecipe,
        )
        .unwrap();
        assert_eq!(slot.name, "main");
        assert_eq!(slot.elements.len(), 2);
        assert!(slot.warnings.is_empty());
    }
}
