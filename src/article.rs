//! The extraction result.
//!
//! ## Example
//!
//! ```rust,no_run
//! use readability_arena::Readability;
//!
//! let html = std::fs::read_to_string("article.html").unwrap();
//! let article = Readability::new(&html, Some("https://example.com"), None)
//!     .unwrap()
//!     .parse()
//!     .unwrap();
//!
//! println!("Title: {:?}", article.title);
//! println!("Length: {} characters", article.length);
//! if article.below_threshold {
//!     println!("Short result, the page may not be an article");
//! }
//! ```

use serde::{Deserialize, Serialize};

/// A parsed article with extracted content and metadata.
///
/// Serializes with serde, so it can be written straight to JSON:
///
/// ```rust,no_run
/// use readability_arena::Readability;
/// # let html = "<html></html>";
/// let article = Readability::new(html, None, None).unwrap().parse().unwrap();
/// println!("{}", serde_json::to_string_pretty(&article).unwrap());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Article {
    /// The article title.
    ///
    /// JSON-LD is checked first, then Dublin Core, OpenGraph, Twitter and
    /// Parse.ly meta tags. Without metadata the `<title>` is cleaned of its
    /// site name, or a clearly different `<h1>` is used instead.
    pub title: Option<String>,

    /// Cleaned HTML content of the article, wrapped in
    /// `<div id="readability-page-1" class="page">`.
    ///
    /// Relative URLs are absolute when a base URL is known.
    pub content: Option<String>,

    /// Text of `content` with markup stripped.
    pub text_content: Option<String>,

    /// Length of `text_content` in characters.
    pub length: usize,

    /// Description from metadata, or the first real paragraph.
    ///
    /// Falls back to the first paragraph of the content when no metadata
    /// provides one.
    pub excerpt: Option<String>,

    /// Author name(s).
    ///
    /// From JSON-LD or meta tags first, then from a `rel="author"`,
    /// `itemprop="author"` or byline-classed element in the page.
    pub byline: Option<String>,

    /// Text direction declared around the content (`ltr`, `rtl` or `auto`).
    pub dir: Option<String>,

    /// Publisher or site name.
    pub site_name: Option<String>,

    /// BCP 47 tag from `<html lang>` or `Content-Language`.
    pub lang: Option<String>,

    /// Publication timestamp, usually ISO 8601.
    pub published_time: Option<String>,

    /// Content HTML before URL fixing, wrapper simplification and class stripping.
    pub raw_content: Option<String>,

    /// No extraction attempt reached `char_threshold`. The content is the
    /// longest result found and may be navigation or boilerplate.
    pub below_threshold: bool,
}

impl Article {
    pub fn new() -> Self {
        Self::default()
    }
}
