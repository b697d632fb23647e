//! Canonical content model.
//!
//! Every type here is produced by normalization: one shape per content
//! variant, whatever schema generation the raw record was written in.
//! Serializing a [`Content`] yields a raw record of the variant's latest
//! generation, so canonical output can be fed back through
//! classify/validate/normalize and comes out unchanged.
//!
//! Values are built by the pipeline rather than deserialized directly; only
//! [`Serialize`] is derived.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::page::PageType;

/// `version` marker given to image assets synthesized from a legacy
/// single-id image reference.
pub const LEGACY_IMAGE_VERSION: &str = "legacy";

/// Content variant, named after its `inputTemplate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentKind {
    Article,
    ArticleLiveBlog,
    LiveblogItem,
    Image,
    Gallery,
    Embed,
    Related,
    Advert,
    Author,
    Pullquote,
    List,
}

impl ContentKind {
    pub const ALL: [ContentKind; 11] = [
        Self::Article,
        Self::ArticleLiveBlog,
        Self::LiveblogItem,
        Self::Image,
        Self::Gallery,
        Self::Embed,
        Self::Related,
        Self::Advert,
        Self::Author,
        Self::Pullquote,
        Self::List,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Article => "article",
            Self::ArticleLiveBlog => "articleLiveBlog",
            Self::LiveblogItem => "liveblogItem",
            Self::Image => "image",
            Self::Gallery => "gallery",
            Self::Embed => "embed",
            Self::Related => "related",
            Self::Advert => "advert",
            Self::Author => "author",
            Self::Pullquote => "pullquote",
            Self::List => "list",
        }
    }

    pub fn from_template(template: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == template)
    }

    /// Variants allowed as standalone elements of a body sequence.
    pub fn is_body_element(self) -> bool {
        matches!(
            self,
            Self::Image | Self::Embed | Self::Related | Self::Advert | Self::Pullquote
        )
    }

    /// Variants that can lead the exploded `main` slot of a page type.
    pub fn is_primary_article_of(self, page_type: PageType) -> bool {
        match page_type {
            PageType::ArticleLiveBlog => matches!(self, Self::Article | Self::ArticleLiveBlog),
            _ => self == Self::Article,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized content record.
///
/// `extra` holds fields the record's contract does not declare; they are
/// carried through untouched and re-emitted at the top level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    #[serde(rename = "contentId")]
    pub content_id: String,
    #[serde(rename = "contentName", skip_serializing_if = "Option::is_none")]
    pub content_name: Option<String>,
    #[serde(flatten)]
    pub fields: ContentFields,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Content {
    pub fn kind(&self) -> ContentKind {
        self.fields.kind()
    }

    /// Article fields of an `article` or `articleLiveBlog` record.
    pub fn as_article(&self) -> Option<&Article> {
        match &self.fields {
            ContentFields::Article(article) => Some(article),
            ContentFields::ArticleLiveBlog(live_blog) => Some(&live_blog.article),
            _ => None,
        }
    }

    pub fn as_live_blog(&self) -> Option<&ArticleLiveBlog> {
        match &self.fields {
            ContentFields::ArticleLiveBlog(live_blog) => Some(live_blog),
            _ => None,
        }
    }

    pub fn as_live_blog_mut(&mut self) -> Option<&mut ArticleLiveBlog> {
        match &mut self.fields {
            ContentFields::ArticleLiveBlog(live_blog) => Some(live_blog),
            _ => None,
        }
    }

    pub fn as_liveblog_item(&self) -> Option<&LiveblogItem> {
        match &self.fields {
            ContentFields::LiveblogItem(item) => Some(item),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&Image> {
        match &self.fields {
            ContentFields::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn as_author(&self) -> Option<&Author> {
        match &self.fields {
            ContentFields::Author(author) => Some(author),
            _ => None,
        }
    }

    /// Publication date of dated variants (articles and live-blog cards).
    pub fn pub_date(&self) -> Option<DateTime<Utc>> {
        match &self.fields {
            ContentFields::LiveblogItem(item) => Some(item.pub_date),
            _ => self.as_article().map(|article| article.pub_date),
        }
    }
}

/// Variant-specific fields, tagged by `inputTemplate`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "inputTemplate", rename_all = "camelCase")]
pub enum ContentFields {
    Article(Article),
    ArticleLiveBlog(ArticleLiveBlog),
    LiveblogItem(LiveblogItem),
    Image(Image),
    Gallery(Gallery),
    Embed(Embed),
    Related(Related),
    Advert(Advert),
    Author(Author),
    Pullquote(Pullquote),
    List(List),
}

impl ContentFields {
    pub fn kind(&self) -> ContentKind {
        match self {
            Self::Article(_) => ContentKind::Article,
            Self::ArticleLiveBlog(_) => ContentKind::ArticleLiveBlog,
            Self::LiveblogItem(_) => ContentKind::LiveblogItem,
            Self::Image(_) => ContentKind::Image,
            Self::Gallery(_) => ContentKind::Gallery,
            Self::Embed(_) => ContentKind::Embed,
            Self::Related(_) => ContentKind::Related,
            Self::Advert(_) => ContentKind::Advert,
            Self::Author(_) => ContentKind::Author,
            Self::Pullquote(_) => ContentKind::Pullquote,
            Self::List(_) => ContentKind::List,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_exclusive: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<AuthorEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporting_from: Option<String>,
    pub pub_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mod_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leading_media: Option<Box<Content>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TaxonomyItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    pub body: Vec<BodyElement>,
}

/// A live-blog article: article fields plus the card stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleLiveBlog {
    #[serde(flatten)]
    pub article: Article,
    pub is_live_update: bool,
    pub show_cards_date: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_blog_meta_title: Option<String>,
    /// `liveblogItem` records, pinned cards first then newest first once
    /// composed into a page.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cards: Vec<Content>,
}

/// One card of a live blog. Its `contentName` lives on the envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveblogItem {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_title: Option<String>,
    pub pub_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mod_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<AuthorEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporting_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TaxonomyItem>,
    pub body: Vec<BodyElement>,
}

impl LiveblogItem {
    /// A card with a non-blank `keyEvent` is pinned above the stream.
    pub fn is_pinned(&self) -> bool {
        self.key_event
            .as_deref()
            .is_some_and(|event| !event.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub alt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub aspects: BTreeMap<AspectName, Aspect>,
    pub is_animated: bool,
    pub img_array: Vec<ImageAsset>,
    pub image_type: ImageType,
}

/// Named crop of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectName {
    Square,
    Landscape,
    Headline,
    Regular,
    Vertical,
    Full,
    Belgrade,
}

impl AspectName {
    pub const ALL: [AspectName; 7] = [
        Self::Square,
        Self::Landscape,
        Self::Headline,
        Self::Regular,
        Self::Vertical,
        Self::Full,
        Self::Belgrade,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Square => "square",
            Self::Landscape => "landscape",
            Self::Headline => "headline",
            Self::Regular => "regular",
            Self::Vertical => "vertical",
            Self::Full => "full",
            Self::Belgrade => "belgrade",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|aspect| aspect.as_str() == name)
    }
}

/// Crop rectangle in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Aspect {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAsset {
    pub img_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ImageAsset {
    /// Asset synthesized from a legacy single-id image reference.
    pub fn legacy(img_name: impl Into<String>) -> Self {
        Self {
            img_name: img_name.into(),
            version: Some(LEGACY_IMAGE_VERSION.to_string()),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    #[default]
    Image,
    Infographic,
}

impl ImageType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "image" => Some(Self::Image),
            "infographic" => Some(Self::Infographic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gallery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub images: Vec<Content>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub identifier: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Related {
    pub items: Vec<ContentSummary>,
}

/// Ad placement. The audience field keeps its historical wire spelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advert {
    pub style: String,
    pub class: String,
    pub id: String,
    #[serde(rename = "audianceTarget")]
    pub audience_target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub author_type: AuthorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Box<Content>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_email_alerts: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
}

/// Canonical author affiliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AuthorType {
    #[serde(rename = "haaretz")]
    Haaretz,
    #[serde(rename = "themarker")]
    TheMarker,
    #[serde(rename = "haaretzcom")]
    HaaretzCom,
    #[serde(rename = "haaretzblog")]
    Blogger,
    #[serde(rename = "haaretzguest")]
    Guest,
    #[serde(rename = "unknown")]
    Unknown,
}

impl AuthorType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Haaretz => "haaretz",
            Self::TheMarker => "themarker",
            Self::HaaretzCom => "haaretzcom",
            Self::Blogger => "haaretzblog",
            Self::Guest => "haaretzguest",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PullquoteType {
    Default,
    HasQuote,
    HasPic,
}

impl PullquoteType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::Default),
            "hasQuote" => Some(Self::HasQuote),
            "hasPic" => Some(Self::HasPic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pullquote {
    pub pullquote_type: PullquoteType,
    /// Quoted text.
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Box<Content>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    pub view: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_text: Option<String>,
    pub paginated: bool,
    pub items: Vec<ContentSummary>,
}

/// Envelope-only reference to another content record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSummary {
    pub input_template: String,
    pub content_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Taxonomy node used for tags and page lineage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyItem {
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_segment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
}

/// An article byline entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AuthorEntry {
    Name(String),
    Author(Box<Content>),
}

/// One element of a body sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BodyElement {
    Paragraph(Paragraph),
    Content(Box<Content>),
}

/// Rich-text paragraph: a flat sequence of text runs and nested tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Paragraph(pub Vec<ParagraphNode>);

impl Paragraph {
    /// Concatenated text of every run, tags stripped.
    pub fn plain_text(&self) -> String {
        let mut text = String::new();
        for node in &self.0 {
            node.collect_text(&mut text);
        }
        text
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParagraphNode {
    Text(String),
    Tag(NestedTag),
}

impl ParagraphNode {
    fn collect_text(&self, out: &mut String) {
        match self {
            Self::Text(text) => out.push_str(text),
            Self::Tag(tag) => {
                for node in &tag.content {
                    node.collect_text(out);
                }
            }
        }
    }
}

/// Inline markup element, e.g. `{"tag": "a", "attributes": {"href": …}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NestedTag {
    pub tag: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<ParagraphNode>,
}
