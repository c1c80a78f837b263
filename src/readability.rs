//! Entry point: [`Readability`] and its `parse` pipeline.
//!
//! It owns the parsed page and runs the whole pipeline:
//! metadata, preprocessing, candidate selection with retries, cleaning and
//! post-processing.
//!
//! ## Example
//!
//! ```rust,no_run
//! use readability_arena::Readability;
//!
//! let html = std::fs::read_to_string("article.html").unwrap();
//! let url = "https://example.com/article";
//!
//! let readability = Readability::new(&html, Some(url), None)?;
//! let article = readability.parse()?;
//!
//! println!("Title: {:?}", article.title);
//! println!("Author: {:?}", article.byline);
//! println!("Content length: {} chars", article.length);
//!
//! if let Some(content) = article.content {
//!     std::fs::write("output.html", content)?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::{
    article::Article,
    constants::Patterns,
    content_extractor::{ContentExtractor, ExtractedContent},
    dom::{Document, NodeId},
    error::{ReadabilityError, Result},
    metadata::{get_article_metadata, get_json_ld, Metadata},
    options::ReadabilityOptions,
    post_processor, preprocessor,
};
use scraper::Html;
use tracing::debug;
use url::Url;

/// One page, ready to be parsed into an [`Article`].
///
/// Construct it with [`Readability::new`], then call
/// [`parse`](Readability::parse) to get an [`Article`]. Each instance parses
/// one document; independent instances share nothing mutable and can run on
/// different threads.
///
/// ## Example
///
/// ```rust
/// use readability_arena::Readability;
///
/// let paragraph = "Reader mode keeps the prose of a page and drops everything around it. ".repeat(3);
/// let html = format!(
///     "<html><head><title>Article Title</title></head><body><article>\
///      <p>{paragraph}</p><p>{paragraph}</p><p>{paragraph}</p></article></body></html>"
/// );
///
/// let article = Readability::new(&html, None, None)?.parse()?;
/// assert_eq!(article.title.as_deref(), Some("Article Title"));
/// assert!(!article.below_threshold);
/// # Ok::<(), readability_arena::ReadabilityError>(())
/// ```
///
/// ## With Custom Options
///
/// ```rust
/// use readability_arena::{Readability, ReadabilityOptions};
///
/// let options = ReadabilityOptions::builder()
///     .char_threshold(300)
///     .max_elems_to_parse(10_000)
///     .build();
///
/// let readability = Readability::new("<html></html>", None, Some(options))?;
/// # Ok::<(), readability_arena::ReadabilityError>(())
/// ```
pub struct Readability {
    /// The page as parsed by `scraper`; metadata is read from it directly.
    document: Html,

    /// Page address; relative links in the output are resolved against it.
    base_url: Option<Url>,

    options: ReadabilityOptions,
}

impl Readability {
    /// Parses `html` and records the page `url` and `options`. Without
    /// options the defaults apply.
    ///
    /// # Errors
    /// [`ReadabilityError::InvalidUrl`] when `url` is not an absolute URL.
    pub fn new(html: &str, url: Option<&str>, options: Option<ReadabilityOptions>) -> Result<Self> {
        let base_url = url
            .map(|u| Url::parse(u).map_err(|_| ReadabilityError::InvalidUrl(u.to_string())))
            .transpose()?;

        Ok(Self {
            document: Html::parse_document(html),
            base_url,
            options: options.unwrap_or_default(),
        })
    }

    /// Parse the document and extract article content.
    ///
    /// # Errors
    /// * [`ReadabilityError::TooManyElements`] when the page exceeds
    ///   `max_elems_to_parse`. Nothing else is done in that case.
    /// * [`ReadabilityError::NoArticleFound`] when there is no body or no
    ///   attempt yielded any text.
    ///
    /// A result shorter than `char_threshold` is still returned, with
    /// [`Article::below_threshold`] set.
    pub fn parse(self) -> Result<Article> {
        let patterns = Patterns::shared();
        let mut doc = Document::from_html(&self.document);

        let max = self.options.max_elems_to_parse;
        if max > 0 {
            let count = doc.element_count();
            if count > max {
                return Err(ReadabilityError::TooManyElements { count, max });
            }
        }

        let thresholds = &self.options.thresholds;
        let json_ld = if self.options.disable_json_ld {
            Metadata::default()
        } else {
            get_json_ld(&self.document, patterns, thresholds)
        };
        let metadata = get_article_metadata(&self.document, json_ld, patterns, thresholds);
        debug!(title = ?metadata.title, byline = ?metadata.byline, "metadata extracted");

        preprocessor::prep_document(&mut doc, patterns);

        let title = metadata.title.clone().unwrap_or_default();
        let extractor =
            ContentExtractor::new(patterns, &self.options, &title, metadata.byline.is_none());
        let ExtractedContent {
            document: mut article_doc,
            content,
            byline,
            dir,
            flags,
            attempts,
            below_threshold,
            ..
        } = extractor.grab_article(&doc)?;
        debug!(?flags, attempts, below_threshold, "article grabbed");

        let raw_content = article_doc.inner_html(content);
        post_processor::post_process(
            &mut article_doc,
            content,
            self.base_url.as_ref(),
            &self.options,
            patterns,
        );

        let text_content = article_doc.text_content(content);
        let excerpt = metadata.excerpt.or_else(|| {
            first_paragraph_text(&article_doc, content, thresholds.min_excerpt_length)
        });

        Ok(Article {
            title: metadata.title,
            content: Some(article_doc.inner_html(content)),
            length: text_content.chars().count(),
            text_content: Some(text_content),
            excerpt,
            byline: metadata.byline.or(byline),
            dir,
            site_name: metadata.site_name,
            lang: metadata.lang,
            published_time: metadata.published_time,
            raw_content: Some(raw_content),
            below_threshold,
        })
    }
}

/// Text of the first paragraph with at least `min_length` characters, else
/// of the first one with any text.
fn first_paragraph_text(doc: &Document, content: NodeId, min_length: usize) -> Option<String> {
    let texts: Vec<String> = doc
        .get_elements_by_tag(content, &["P"])
        .into_iter()
        .map(|p| doc.text_content(p).trim().to_string())
        .filter(|text| !text.is_empty())
        .collect();
    let position = texts
        .iter()
        .position(|text| text.chars().count() >= min_length)
        .unwrap_or(0);
    texts.into_iter().nth(position)
}
