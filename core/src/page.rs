//! Page-level types: page type, SEO metadata and the composed page.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::types::{Content, TaxonomyItem};

/// Closed set of page types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PageType {
    Article,
    ArticleMagazine,
    ArticleLiveBlog,
    ArticleRecipe,
    ArticleInterview,
    ArticleReviewResturant,
    ArticleReviewMovie,
    ArticleReviewBook,
    ArticleCards,
    Venue,
    Event,
    Homepage,
    Section,
    Listings,
    Tag,
    Search,
    SearchMouse,
    Interactive,
}

impl PageType {
    pub const ALL: [PageType; 18] = [
        Self::Article,
        Self::ArticleMagazine,
        Self::ArticleLiveBlog,
        Self::ArticleRecipe,
        Self::ArticleInterview,
        Self::ArticleReviewResturant,
        Self::ArticleReviewMovie,
        Self::ArticleReviewBook,
        Self::ArticleCards,
        Self::Venue,
        Self::Event,
        Self::Homepage,
        Self::Section,
        Self::Listings,
        Self::Tag,
        Self::Search,
        Self::SearchMouse,
        Self::Interactive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Article => "article",
            Self::ArticleMagazine => "articleMagazine",
            Self::ArticleLiveBlog => "articleLiveBlog",
            Self::ArticleRecipe => "articleRecipe",
            Self::ArticleInterview => "articleInterview",
            Self::ArticleReviewResturant => "articleReviewResturant",
            Self::ArticleReviewMovie => "articleReviewMovie",
            Self::ArticleReviewBook => "articleReviewBook",
            Self::ArticleCards => "articleCards",
            Self::Venue => "venue",
            Self::Event => "event",
            Self::Homepage => "homepage",
            Self::Section => "section",
            Self::Listings => "listings",
            Self::Tag => "tag",
            Self::Search => "search",
            Self::SearchMouse => "searchMouse",
            Self::Interactive => "interactive",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|page_type| page_type.as_str() == name)
    }

    /// Article-family pages, whose `main` slot starts with the primary
    /// article.
    pub fn has_exploded_main(self) -> bool {
        !matches!(
            self,
            Self::Homepage
                | Self::Section
                | Self::Listings
                | Self::Tag
                | Self::Search
                | Self::SearchMouse
                | Self::Interactive
        )
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SEO metadata. Passed through untouched apart from the object check.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SeoData(pub Map<String, Value>);

impl SeoData {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn meta_title(&self) -> Option<&str> {
        self.get("metaTitle").and_then(Value::as_str)
    }

    pub fn canonical_url(&self) -> Option<&str> {
        self.get("canonicalUrl").and_then(Value::as_str)
    }
}

/// A fully validated and normalized page.
///
/// Slots keep the element order of the input; elements dropped as unknown
/// leave no gap.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub page_type: PageType,
    pub lineage: Vec<TaxonomyItem>,
    pub seo_data: SeoData,
    pub slots: BTreeMap<String, Vec<Content>>,
}

impl Page {
    pub fn slot(&self, name: &str) -> Option<&[Content]> {
        self.slots.get(name).map(Vec::as_slice)
    }

    /// The primary article of an article-family page.
    pub fn primary(&self) -> Option<&Content> {
        if !self.page_type.has_exploded_main() {
            return None;
        }
        self.slot("main").and_then(<[Content]>::first)
    }

    /// Total number of elements across all slots.
    pub fn element_count(&self) -> usize {
        self.slots.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_type_names_round_trip() {
        for page_type in PageType::ALL {
            assert_eq!(PageType::from_name(page_type.as_str()), Some(page_type));
            assert_eq!(serde_json::to_value(page_type).unwrap(), json!(page_type.as_str()));
        }
        assert_eq!(PageType::from_name("blog"), None);
    }

    #[test]
    fn test_exploded_main_page_types() {
        let exploded: Vec<_> = PageType::ALL
            .into_iter()
            .filter(|page_type| page_type.has_exploded_main())
            .map(PageType::as_str)
            .collect();
        assert_eq!(
            exploded,
            vec![
                "article",
                "articleMagazine",
                "articleLiveBlog",
                "articleRecipe",
                "articleInterview",
                "articleReviewResturant",
                "articleReviewMovie",
                "articleReviewBook",
                "articleCards",
                "venue",
                "event",
            ]
        );
    }

    #[test]
    fn test_seo_data_accessors() {
        let seo = SeoData(json!({"metaTitle": "Hello", "robots": "index"}).as_object().cloned().unwrap());
        assert_eq!(seo.meta_title(), Some("Hello"));
        assert_eq!(seo.canonical_url(), None);
        assert_eq!(serde_json::to_value(&seo).unwrap()["robots"], "index");
    }
}
