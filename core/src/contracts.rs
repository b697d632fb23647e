//! Builtin field contracts.
//!
//! Each content variant is listed generation by generation, oldest first.
//! Field sets are shared between contracts wherever generations agree.

use crate::registry::{FieldContract, FieldKind, FieldSpec, Generation};

/// `authorType` values of author generations 1 and 2.
pub const LEGACY_AUTHOR_TYPES: &[&str] = &["htz", "hdc", "tm", "blogger", "guest"];

/// `authorType` values of author generation 3.
pub const AUTHOR_TYPES: &[&str] = &[
    "haaretz",
    "themarker",
    "haaretzcom",
    "haaretzblog",
    "haaretzguest",
    "unknown",
];

pub const PULLQUOTE_TYPES: &[&str] = &["default", "hasQuote", "hasPic"];

pub const IMAGE_TYPES: &[&str] = &["image", "infographic"];

/// Variants accepted as an article's leading media.
pub const LEADING_MEDIA: &[&str] = &["image", "embed", "gallery"];

const fn req(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec::required(name, kind)
}

const fn opt(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec::optional(name, kind)
}

const TEXT: FieldKind = FieldKind::String;
const IMAGE: FieldKind = FieldKind::Content(&["image"]);
const TAGS: FieldKind = FieldKind::List(&FieldKind::Taxonomy);
const AUTHORS: FieldKind = FieldKind::List(&FieldKind::AuthorOrName);
const SUMMARIES: FieldKind = FieldKind::List(&FieldKind::Summary);

const ARTICLE: &[FieldSpec] = &[
    req("title", TEXT),
    opt("mobileTitle", TEXT),
    opt("subtitle", TEXT),
    opt("mobileSubtitle", TEXT),
    opt("exclusive", TEXT),
    opt("mobileExclusive", TEXT),
    opt("authors", AUTHORS),
    opt("credit", TEXT),
    opt("reportingFrom", TEXT),
    req("pubDate", FieldKind::Date),
    opt("modDate", FieldKind::Date),
    opt("leadingMedia", FieldKind::Content(LEADING_MEDIA)),
    opt("tags", TAGS),
    opt("comments", TEXT),
    req("body", FieldKind::Body),
];

const CARDS: FieldKind = FieldKind::List(&FieldKind::Content(&["liveblogItem"]));

const LIVE_BLOG_V1: &[FieldSpec] = &[
    req("isLiveUpdate", FieldKind::Bool),
    req("ShowCardsDate", FieldKind::Bool),
    opt("liveBlogMetaTitle", TEXT),
    opt("cards", CARDS),
];

const LIVE_BLOG_V2: &[FieldSpec] = &[
    opt("isLiveUpdate", FieldKind::Bool),
    opt("showCardsDate", FieldKind::Bool),
    opt("liveBlogMetaTitle", TEXT),
    opt("cards", CARDS),
];

const CARD_COMMON: &[FieldSpec] = &[
    req("title", TEXT),
    req("contentName", TEXT),
    req("pubDate", FieldKind::Date),
    opt("modDate", FieldKind::Date),
    opt("keyEvent", TEXT),
    opt("cardId", TEXT),
    opt("reportingFrom", TEXT),
    opt("credit", TEXT),
    opt("tags", TAGS),
];

const CARD_V1: &[FieldSpec] = &[
    opt("titleMobile", TEXT),
    req("content", FieldKind::Body),
    opt("author", FieldKind::AuthorOrName),
];

const CARD_V2: &[FieldSpec] = &[
    opt("mobileTitle", TEXT),
    req("body", FieldKind::Body),
    opt("authors", AUTHORS),
];

const IMAGE_V1: &[FieldSpec] = &[
    req("alt", TEXT),
    req("image", TEXT),
    opt("caption", TEXT),
    opt("credit", TEXT),
];

const IMAGE_V2: &[FieldSpec] = &[
    req("alt", TEXT),
    req("imgArray", FieldKind::ImageAssets),
    opt("description", TEXT),
    opt("credit", TEXT),
    opt("isAnimated", FieldKind::Bool),
    opt("imageType", FieldKind::Enum(IMAGE_TYPES)),
];

const IMAGE_V3: &[FieldSpec] = &[req("aspects", FieldKind::Aspects)];

const GALLERY: &[FieldSpec] = &[
    req("images", FieldKind::List(&IMAGE)),
    opt("title", TEXT),
];

const EMBED: &[FieldSpec] = &[req("identifier", TEXT)];

const RELATED: &[FieldSpec] = &[req("items", SUMMARIES)];

const ADVERT: &[FieldSpec] = &[
    req("style", TEXT),
    req("class", TEXT),
    req("id", TEXT),
    req("audianceTarget", TEXT),
];

const PULLQUOTE: &[FieldSpec] = &[
    req("pullquoteType", FieldKind::Enum(PULLQUOTE_TYPES)),
    req("content", TEXT),
    opt("image", IMAGE),
    opt("citation", TEXT),
];

const AUTHOR_CONTACT: &[FieldSpec] = &[
    opt("twitter", TEXT),
    opt("facebook", TEXT),
    opt("email", TEXT),
    opt("hasEmailAlerts", FieldKind::Bool),
];

const AUTHOR_V1: &[FieldSpec] = &[
    req("contentName", TEXT),
    req("authorType", FieldKind::Vocabulary(LEGACY_AUTHOR_TYPES)),
    req("hasPushAlerts", FieldKind::Bool),
    opt("url", TEXT),
    opt("image", TEXT),
    opt("gplus", TEXT),
];

const AUTHOR_V2: &[FieldSpec] = &[
    req("contentName", TEXT),
    req("authorType", FieldKind::Vocabulary(LEGACY_AUTHOR_TYPES)),
    req("url", TEXT),
    opt("image", IMAGE),
];

const AUTHOR_V3: &[FieldSpec] = &[
    req("contentName", TEXT),
    req("authorType", FieldKind::Vocabulary(AUTHOR_TYPES)),
    opt("url", TEXT),
    opt("image", IMAGE),
    opt("bio", TEXT),
    opt("jobTitle", TEXT),
];

const LIST_COMMON: &[FieldSpec] = &[
    req("view", TEXT),
    req("items", SUMMARIES),
    opt("title", TEXT),
    opt("url", TEXT),
];

const LIST_V1: &[FieldSpec] = &[
    req("hasPagination", FieldKind::Bool),
    opt("urlDescription", TEXT),
];

const LIST_V2: &[FieldSpec] = &[
    opt("paginated", FieldKind::Bool),
    opt("linkText", TEXT),
];

/// Fields of a taxonomy item (tags, lineage). Not a content variant.
pub const TAXONOMY_ITEM: &[FieldSpec] = &[
    req("name", TEXT),
    req("url", TEXT),
    opt("pathSegment", TEXT),
    opt("contentId", TEXT),
];

const fn v(number: u32) -> Generation {
    Generation::new(number)
}

pub const BUILTIN_CONTRACTS: &[FieldContract] = &[
    FieldContract::new("article", v(1), &[ARTICLE]),
    FieldContract::new("articleLiveBlog", v(1), &[ARTICLE, LIVE_BLOG_V1]),
    FieldContract::new("articleLiveBlog", v(2), &[ARTICLE, LIVE_BLOG_V2]),
    FieldContract::new("liveblogItem", v(1), &[CARD_COMMON, CARD_V1]),
    FieldContract::new("liveblogItem", v(2), &[CARD_COMMON, CARD_V2]),
    FieldContract::new("image", v(1), &[IMAGE_V1]),
    FieldContract::new("image", v(2), &[IMAGE_V2]),
    FieldContract::new("image", v(3), &[IMAGE_V2, IMAGE_V3]),
    FieldContract::new("gallery", v(1), &[GALLERY]),
    FieldContract::new("embed", v(1), &[EMBED]),
    FieldContract::new("related", v(1), &[RELATED]),
    FieldContract::new("advert", v(1), &[ADVERT]),
    FieldContract::new("pullquote", v(1), &[PULLQUOTE]),
    FieldContract::new("author", v(1), &[AUTHOR_V1, AUTHOR_CONTACT]),
    FieldContract::new("author", v(2), &[AUTHOR_V2, AUTHOR_CONTACT]),
    FieldContract::new("author", v(3), &[AUTHOR_V3, AUTHOR_CONTACT]),
    FieldContract::new("list", v(1), &[LIST_COMMON, LIST_V1]),
    FieldContract::new("list", v(2), &[LIST_COMMON, LIST_V2]),
];
