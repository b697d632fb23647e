//! Normalization of validated records into the canonical content model.
//!
//! Each schema generation has its own mapping onto the canonical shape:
//! renamed fields are moved, retired fields are dropped, legacy value
//! vocabularies are translated, and legacy single-id image references are
//! expanded into full image records. Fields the contract does not declare
//! travel unchanged in [`Content::extra`].
//!
//! The canonical serialization of a normalized record is itself a valid raw
//! record of the latest generation, so normalizing it again yields an equal
//! value.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::ValidationError;
use crate::registry::Generation;
use crate::types::{
    Advert, Article, ArticleLiveBlog, Author, AuthorEntry, AuthorType, BodyElement, Content,
    ContentFields, ContentKind, ContentSummary, Embed, Gallery, Image, ImageAsset, ImageType, List,
    LiveblogItem, Pullquote, PullquoteType, Related, TaxonomyItem,
};
use crate::validate::{FieldValue, ValidRecord};

/// `authorType` translation for author generations 1 and 2.
const LEGACY_AUTHOR_TYPES: &[(&str, AuthorType)] = &[
    ("htz", AuthorType::Haaretz),
    ("tm", AuthorType::TheMarker),
    ("hdc", AuthorType::HaaretzCom),
    ("blogger", AuthorType::Blogger),
    ("guest", AuthorType::Guest),
];

const AUTHOR_TYPES: &[(&str, AuthorType)] = &[
    ("haaretz", AuthorType::Haaretz),
    ("themarker", AuthorType::TheMarker),
    ("haaretzcom", AuthorType::HaaretzCom),
    ("haaretzblog", AuthorType::Blogger),
    ("haaretzguest", AuthorType::Guest),
    ("unknown", AuthorType::Unknown),
];

/// Maps a validated record onto the canonical content model.
///
/// # Examples
///
/// ```
/// use page_schema_core::*;
/// use serde_json::json;
///
/// let raw = json!({
///     "inputTemplate": "author",
///     "contentId": "au-7",
///     "contentName": "Dana Levi",
///     "authorType": "tm",
///     "hasPushAlerts": true,
///     "gplus": "+dana",
/// });
/// let record = validate(SchemaRegistry::builtin(), &raw, "author", Generation::new(1)).unwrap();
/// let author = normalize(&record).unwrap();
/// assert_eq!(author.as_author().unwrap().author_type, AuthorType::TheMarker);
///
/// let json = serde_json::to_value(&author).unwrap();
/// assert_eq!(json["authorType"], "themarker");
/// assert!(json.get("gplus").is_none());
/// assert!(json.get("hasPushAlerts").is_none());
/// ```
pub fn normalize(record: &ValidRecord) -> Result<Content, ValidationError> {
    let kind = ContentKind::from_template(record.variant).ok_or_else(|| ValidationError::UnknownSchema {
        path: record.path.clone(),
        variant: record.variant.to_string(),
        generation: record.generation,
    })?;

    let fields = match kind {
        ContentKind::Article => ContentFields::Article(article(record)?),
        ContentKind::ArticleLiveBlog => ContentFields::ArticleLiveBlog(live_blog(record)?),
        ContentKind::LiveblogItem => ContentFields::LiveblogItem(liveblog_item(record)?),
        ContentKind::Image => ContentFields::Image(image(record)?),
        ContentKind::Gallery => ContentFields::Gallery(Gallery {
            title: text(record, "title"),
            images: records(record, "images")?,
        }),
        ContentKind::Embed => ContentFields::Embed(Embed {
            identifier: record.require_text("identifier")?,
        }),
        ContentKind::Related => ContentFields::Related(Related {
            items: summaries(record, "items"),
        }),
        ContentKind::Advert => ContentFields::Advert(Advert {
            style: record.require_text("style")?,
            class: record.require_text("class")?,
            id: record.require_text("id")?,
            audience_target: record.require_text("audianceTarget")?,
        }),
        ContentKind::Author => ContentFields::Author(author(record)?),
        ContentKind::Pullquote => ContentFields::Pullquote(pullquote(record)?),
        ContentKind::List => ContentFields::List(list(record)?),
    };

    Ok(Content {
        content_id: record.content_id.clone(),
        content_name: record.content_name.clone(),
        fields,
        extra: record.extra.clone(),
    })
}

fn text(record: &ValidRecord, name: &str) -> Option<String> {
    record.text(name).map(str::to_string)
}

fn unexpected(record: &ValidRecord, name: &str, expected: &str) -> ValidationError {
    ValidationError::TypeMismatch {
        path: record.path.key(name),
        expected: expected.to_string(),
        found: "value of another kind".to_string(),
    }
}

fn body(record: &ValidRecord, name: &str) -> Result<Vec<BodyElement>, ValidationError> {
    record
        .body(name)
        .map(<[BodyElement]>::to_vec)
        .ok_or_else(|| record.missing(name))
}

fn taxonomy(record: &ValidRecord, name: &str) -> Vec<TaxonomyItem> {
    record
        .list(name)
        .iter()
        .filter_map(|value| match value {
            FieldValue::Taxonomy(item) => Some(item.clone()),
            _ => None,
        })
        .collect()
}

fn summaries(record: &ValidRecord, name: &str) -> Vec<ContentSummary> {
    record
        .list(name)
        .iter()
        .filter_map(|value| match value {
            FieldValue::Summary(summary) => Some(summary.clone()),
            _ => None,
        })
        .collect()
}

fn nested(record: &ValidRecord, name: &str) -> Result<Option<Box<Content>>, ValidationError> {
    record
        .record(name)
        .map(|nested| normalize(nested).map(Box::new))
        .transpose()
}

fn records(record: &ValidRecord, name: &str) -> Result<Vec<Content>, ValidationError> {
    record
        .list(name)
        .iter()
        .map(|value| match value {
            FieldValue::Record(nested) => normalize(nested),
            _ => Err(unexpected(record, name, "list of records")),
        })
        .collect()
}

fn author_entry(record: &ValidRecord, name: &str, value: &FieldValue) -> Result<AuthorEntry, ValidationError> {
    match value {
        FieldValue::Text(author) => Ok(AuthorEntry::Name(author.clone())),
        FieldValue::Record(author) => Ok(AuthorEntry::Author(Box::new(normalize(author)?))),
        _ => Err(unexpected(record, name, "author name or author record")),
    }
}

fn authors(record: &ValidRecord, name: &str) -> Result<Vec<AuthorEntry>, ValidationError> {
    record
        .list(name)
        .iter()
        .map(|value| author_entry(record, name, value))
        .collect()
}

fn article(record: &ValidRecord) -> Result<Article, ValidationError> {
    Ok(Article {
        title: record.require_text("title")?,
        mobile_title: text(record, "mobileTitle"),
        subtitle: text(record, "subtitle"),
        mobile_subtitle: text(record, "mobileSubtitle"),
        exclusive: text(record, "exclusive"),
        mobile_exclusive: text(record, "mobileExclusive"),
        authors: authors(record, "authors")?,
        credit: text(record, "credit"),
        reporting_from: text(record, "reportingFrom"),
        pub_date: record.require_date("pubDate")?,
        mod_date: record.date("modDate"),
        leading_media: nested(record, "leadingMedia")?,
        tags: taxonomy(record, "tags"),
        comments: text(record, "comments"),
        body: body(record, "body")?,
    })
}

fn live_blog(record: &ValidRecord) -> Result<ArticleLiveBlog, ValidationError> {
    let show_cards_date = match record.generation.number() {
        1 => "ShowCardsDate",
        _ => "showCardsDate",
    };
    Ok(ArticleLiveBlog {
        article: article(record)?,
        is_live_update: record.flag("isLiveUpdate").unwrap_or(false),
        show_cards_date: record.flag(show_cards_date).unwrap_or(false),
        live_blog_meta_title: text(record, "liveBlogMetaTitle"),
        cards: records(record, "cards")?,
    })
}

fn liveblog_item(record: &ValidRecord) -> Result<LiveblogItem, ValidationError> {
    let (mobile_title, body_field, authors) = match record.generation.number() {
        1 => {
            let author = record
                .get("author")
                .map(|value| author_entry(record, "author", value))
                .transpose()?;
            ("titleMobile", "content", author.into_iter().collect())
        }
        _ => ("mobileTitle", "body", authors(record, "authors")?),
    };
    Ok(LiveblogItem {
        title: record.require_text("title")?,
        mobile_title: text(record, mobile_title),
        pub_date: record.require_date("pubDate")?,
        mod_date: record.date("modDate"),
        key_event: text(record, "keyEvent"),
        card_id: text(record, "cardId"),
        authors,
        reporting_from: text(record, "reportingFrom"),
        credit: text(record, "credit"),
        tags: taxonomy(record, "tags"),
        body: body(record, body_field)?,
    })
}

/// Image synthesized from a legacy single-id reference.
fn legacy_image(image_id: &str, alt: &str) -> Content {
    Content {
        content_id: image_id.to_string(),
        content_name: None,
        fields: ContentFields::Image(Image {
            alt: alt.to_string(),
            description: None,
            credit: None,
            aspects: BTreeMap::new(),
            is_animated: false,
            img_array: vec![ImageAsset::legacy(image_id)],
            image_type: ImageType::Image,
        }),
        extra: serde_json::Map::new(),
    }
}

fn image(record: &ValidRecord) -> Result<Image, ValidationError> {
    let (img_array, description) = match record.generation.number() {
        1 => (
            vec![ImageAsset::legacy(record.require_text("image")?)],
            text(record, "caption"),
        ),
        _ => {
            let assets = match record.get("imgArray") {
                Some(FieldValue::Assets(assets)) => assets.clone(),
                _ => return Err(record.missing("imgArray")),
            };
            (assets, text(record, "description"))
        }
    };
    let aspects = match record.get("aspects") {
        Some(FieldValue::Aspects(aspects)) => aspects.clone(),
        _ => BTreeMap::new(),
    };
    Ok(Image {
        alt: record.require_text("alt")?,
        description,
        credit: text(record, "credit"),
        aspects,
        is_animated: record.flag("isAnimated").unwrap_or(false),
        img_array,
        image_type: record
            .text("imageType")
            .and_then(ImageType::from_name)
            .unwrap_or_default(),
    })
}

fn author_type(generation: Generation, raw: &str) -> AuthorType {
    let table = if generation.number() <= 2 {
        LEGACY_AUTHOR_TYPES
    } else {
        AUTHOR_TYPES
    };
    match table.iter().find(|(name, _)| *name == raw) {
        Some((_, author_type)) => *author_type,
        None => {
            debug!(author_type = raw, %generation, "unseen author type mapped to unknown");
            AuthorType::Unknown
        }
    }
}

fn author(record: &ValidRecord) -> Result<Author, ValidationError> {
    let raw_type = record.require_text("authorType")?;
    let image = match record.get("image") {
        Some(FieldValue::Text(image_id)) => {
            let alt = record.content_name.as_deref().unwrap_or_default();
            Some(Box::new(legacy_image(image_id, alt)))
        }
        Some(FieldValue::Record(image)) => Some(Box::new(normalize(image)?)),
        _ => None,
    };
    Ok(Author {
        author_type: author_type(record.generation, &raw_type),
        url: text(record, "url"),
        image,
        twitter: text(record, "twitter"),
        facebook: text(record, "facebook"),
        email: text(record, "email"),
        has_email_alerts: record.flag("hasEmailAlerts"),
        bio: text(record, "bio"),
        job_title: text(record, "jobTitle"),
    })
}

fn pullquote(record: &ValidRecord) -> Result<Pullquote, ValidationError> {
    let pullquote_type = record
        .text("pullquoteType")
        .and_then(PullquoteType::from_name)
        .ok_or_else(|| record.missing("pullquoteType"))?;
    Ok(Pullquote {
        pullquote_type,
        content: record.require_text("content")?,
        image: nested(record, "image")?,
        citation: text(record, "citation"),
    })
}

fn list(record: &ValidRecord) -> Result<List, ValidationError> {
    let (paginated, link_text) = match record.generation.number() {
        1 => ("hasPagination", "urlDescription"),
        _ => ("paginated", "linkText"),
    };
    Ok(List {
        view: record.require_text("view")?,
        title: text(record, "title"),
        url: text(record, "url"),
        link_text: text(record, link_text),
        paginated: record.flag(paginated).unwrap_or(false),
        items: summaries(record, "items"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discriminate::{Classification, classify};
    use crate::registry::SchemaRegistry;
    use crate::types::LEGACY_IMAGE_VERSION;
    use crate::validate::validate;
    use serde_json::{Value, json};

    fn pipeline(raw: &Value) -> Content {
        let registry = SchemaRegistry::builtin();
        let Classification::Matched { variant, generation } = classify(registry, raw) else {
            panic!("record did not classify: {raw}");
        };
        let record = validate(registry, raw, variant, generation).unwrap();
        normalize(&record).unwrap()
    }

    fn assert_idempotent(raw: &Value) -> Content {
        let first = pipeline(raw);
        let canonical = serde_json::to_value(&first).unwrap();
        let second = pipeline(&canonical);
        assert_eq!(first, second, "canonical form changed on re-normalization: {canonical}");
        first
    }

    #[test]
    fn test_legacy_author_image_becomes_image_record() {
        let raw = json!({
            "inputTemplate": "author",
            "contentId": "au-1",
            "contentName": "Dana Levi",
            "authorType": "hdc",
            "hasPushAlerts": false,
            "image": "dana.jpg",
            "twitter": "@dana",
        });
        let content = assert_idempotent(&raw);
        let author = content.as_author().unwrap();
        assert_eq!(author.author_type, AuthorType::HaaretzCom);
        assert_eq!(author.twitter.as_deref(), Some("@dana"));

        let image = author.image.as_ref().and_then(|image| image.as_image()).unwrap();
        assert_eq!(image.alt, "Dana Levi");
        assert_eq!(image.img_array.len(), 1);
        assert_eq!(image.img_array[0].img_name, "dana.jpg");
        assert_eq!(image.img_array[0].version.as_deref(), Some(LEGACY_IMAGE_VERSION));
    }

    #[test]
    fn test_gen1_and_gen3_author_normalize_alike() {
        let legacy = json!({
            "inputTemplate": "author",
            "contentId": "au-2",
            "contentName": "Noa",
            "authorType": "blogger",
            "hasPushAlerts": true,
            "url": "/ty-writer/noa",
        });
        let current = json!({
            "inputTemplate": "author",
            "contentId": "au-2",
            "contentName": "Noa",
            "authorType": "haaretzblog",
            "url": "/ty-writer/noa",
        });
        assert_eq!(pipeline(&legacy), pipeline(&current));
    }

    #[test]
    fn test_unseen_author_type_is_unknown() {
        let raw = json!({
            "inputTemplate": "author",
            "contentId": "au-3",
            "contentName": "Guest",
            "authorType": "contributor",
        });
        let content = pipeline(&raw);
        assert_eq!(content.as_author().unwrap().author_type, AuthorType::Unknown);
    }

    #[test]
    fn test_image_defaults_and_caption() {
        let raw = json!({
            "inputTemplate": "image",
            "contentId": "img-1",
            "alt": "Sea",
            "image": "sea.jpg",
            "caption": "Low tide",
            "photographerRef": "p-9",
        });
        let content = assert_idempotent(&raw);
        let image = content.as_image().unwrap();
        assert_eq!(image.description.as_deref(), Some("Low tide"));
        assert!(!image.is_animated);
        assert_eq!(image.image_type, ImageType::Image);
        assert_eq!(content.extra["photographerRef"], "p-9");
    }

    #[test]
    fn test_gen1_liveblog_item_renames() {
        let raw = json!({
            "inputTemplate": "liveblogItem",
            "contentId": "c-1",
            "contentName": "Update",
            "title": "Polls open",
            "titleMobile": "Polls",
            "pubDate": "2024-11-05T06:00:00Z",
            "content": ["Voting has started."],
            "author": "Newsdesk",
        });
        let content = assert_idempotent(&raw);
        let card = content.as_liveblog_item().unwrap();
        assert_eq!(card.mobile_title.as_deref(), Some("Polls"));
        assert_eq!(card.authors, vec![AuthorEntry::Name("Newsdesk".to_string())]);
        assert_eq!(card.body.len(), 1);
    }

    #[test]
    fn test_gen1_list_renames() {
        let raw = json!({
            "inputTemplate": "list",
            "contentId": "l-1",
            "view": "Zoidberg",
            "hasPagination": true,
            "urlDescription": "More news",
            "items": [{"inputTemplate": "article", "contentId": "a-1", "contentName": "One"}],
        });
        let content = assert_idempotent(&raw);
        let ContentFields::List(list) = &content.fields else {
            panic!("expected a list");
        };
        assert!(list.paginated);
        assert_eq!(list.link_text.as_deref(), Some("More news"));
        assert_eq!(list.items[0].content_id, "a-1");
    }

    #[test]
    fn test_gen1_live_blog_flags() {
        let raw = json!({
            "inputTemplate": "articleLiveBlog",
            "contentId": "lb-1",
            "title": "Results",
            "pubDate": "2024-11-05",
            "body": [],
            "isLiveUpdate": true,
            "ShowCardsDate": true,
        });
        let content = assert_idempotent(&raw);
        let live_blog = content.as_live_blog().unwrap();
        assert!(live_blog.is_live_update);
        assert!(live_blog.show_cards_date);
        assert!(live_blog.cards.is_empty());
    }

    #[test]
    fn test_article_with_nested_content_is_idempotent() {
        let raw = json!({
            "inputTemplate": "article",
            "contentId": "a-9",
            "contentName": "Harbor",
            "title": "The harbor reopens",
            "pubDate": 1714521600000_i64,
            "modDate": "2024-05-02T08:30:00+03:00",
            "authors": [
                "Staff",
                {"inputTemplate": "author", "contentId": "au-1", "contentName": "Dana", "authorType": "htz", "hasPushAlerts": true, "image": "d.jpg"},
            ],
            "leadingMedia": {
                "inputTemplate": "image", "contentId": "i-1", "alt": "Harbor",
                "imgArray": [{"imgName": "h.jpg", "version": 2}],
                "aspects": {"landscape": {"width": 1200, "height": 675, "x": 0, "y": 40}},
            },
            "tags": [{"name": "Ports", "url": "/tags/ports", "pathSegment": "ports"}],
            "body": [
                ["The ", {"tag": "a", "attributes": {"href": "/ports"}, "content": "harbor"}, " reopened."],
                {"inputTemplate": "pullquote", "contentId": "pq-1", "pullquoteType": "hasQuote", "content": "Finally."},
                {"inputTemplate": "related", "contentId": "r-1", "items": [{"inputTemplate": "article", "contentId": "a-2", "section": "news"}]},
            ],
            "seoKeywords": ["harbor"],
        });
        let content = assert_idempotent(&raw);
        let article = content.as_article().unwrap();
        assert_eq!(article.authors.len(), 2);
        assert_eq!(article.tags[0].path_segment.as_deref(), Some("ports"));
        assert_eq!(content.extra["seoKeywords"], json!(["harbor"]));
    }
}
