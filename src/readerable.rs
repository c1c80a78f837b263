//! Cheap guess at whether a page holds an article.
//!
//! [`is_probably_readerable`] only counts long visible text blocks, so it is
//! meant to run before deciding to pay for a full extraction.
//!
//! ```rust
//! use readability_arena::{is_probably_readerable, Readability};
//!
//! let html = "<html><body><p>Short</p></body></html>";
//!
//! if is_probably_readerable(html, None) {
//!     let article = Readability::new(html, None, None).unwrap().parse();
//!     println!("{:?}", article.map(|a| a.title));
//! } else {
//!     println!("Not an article page, skipping parse");
//! }
//! ```

use crate::constants::Patterns;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

static CONTENT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p, pre, article").unwrap());
static DIV_BR_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("div > br").unwrap());

/// Cutoffs for [`is_probably_readerable`].
///
/// ## Example
///
/// ```rust
/// use readability_arena::{is_probably_readerable, ReaderableOptions};
///
/// let options = ReaderableOptions {
///     min_content_length: 200,
///     min_score: 30.0,
/// };
///
/// assert!(!is_probably_readerable("<p>tiny</p>", Some(options)));
/// ```
#[derive(Debug, Clone)]
pub struct ReaderableOptions {
    /// Blocks shorter than this contribute nothing.
    ///
    /// Default: `140`
    pub min_content_length: usize,

    /// Score above which the page counts as readerable.
    ///
    /// Default: `20.0`
    pub min_score: f64,
}

impl Default for ReaderableOptions {
    fn default() -> Self {
        Self {
            min_content_length: 140,
            min_score: 20.0,
        }
    }
}

/// Guess whether `html` is worth handing to [`Readability`](crate::Readability).
///
/// Looks at visible `<p>`, `<pre>` and `<article>` elements plus the parents
/// of `div > br`. Elements with unlikely classes and paragraphs inside list
/// items are skipped. Every remaining element with at least
/// `min_content_length` characters adds `sqrt(len - min_content_length)` to
/// the score, and the check passes once the score exceeds `min_score`.
///
/// ```rust
/// use readability_arena::is_probably_readerable;
///
/// let paragraph = "This paragraph is long enough to count toward the score. ".repeat(6);
/// let html = format!("<html><body><p>{paragraph}</p><p>{paragraph}</p></body></html>");
/// assert!(is_probably_readerable(&html, None));
///
/// assert!(!is_probably_readerable("<html><body><p>Short</p></body></html>", None));
/// ```
pub fn is_probably_readerable(html: &str, options: Option<ReaderableOptions>) -> bool {
    let options = options.unwrap_or_default();
    let patterns = Patterns::shared();
    let document = Html::parse_document(html);

    let mut seen = HashSet::new();
    let nodes = document
        .select(&CONTENT_SELECTOR)
        .chain(
            document
                .select(&DIV_BR_SELECTOR)
                .filter_map(|br| br.parent().and_then(ElementRef::wrap)),
        )
        .filter(|node| seen.insert(node.id()));

    let mut score = 0.0;
    for node in nodes {
        if !is_visible(&node, patterns) || is_unlikely(&node, patterns) || is_list_paragraph(&node)
        {
            continue;
        }

        let text: String = node.text().collect();
        let length = text.trim().chars().count();
        if length < options.min_content_length {
            continue;
        }

        score += ((length - options.min_content_length) as f64).sqrt();
        if score > options.min_score {
            return true;
        }
    }

    false
}

fn is_visible(node: &ElementRef, patterns: &Patterns) -> bool {
    let element = node.value();
    let hidden_style = element
        .attr("style")
        .is_some_and(|style| patterns.display_none.is_match(style));
    let aria_hidden = element.attr("aria-hidden") == Some("true")
        && !element.attr("class").unwrap_or("").contains("fallback-image");
    !hidden_style && element.attr("hidden").is_none() && !aria_hidden
}

fn is_unlikely(node: &ElementRef, patterns: &Patterns) -> bool {
    let element = node.value();
    let match_string = format!(
        "{} {}",
        element.attr("class").unwrap_or(""),
        element.attr("id").unwrap_or("")
    );
    patterns.unlikely_candidates.is_match(&match_string)
        && !patterns.ok_maybe_its_a_candidate.is_match(&match_string)
}

/// `li p`
fn is_list_paragraph(node: &ElementRef) -> bool {
    node.value().name() == "p"
        && node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| ancestor.value().name() == "li")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_text() -> String {
        "Readers linger over paragraphs that carry real sentences and real ideas. ".repeat(4)
    }

    #[test]
    fn test_is_probably_readerable() {
        let text = long_text();
        let html = format!(
            "<html><body><article><p>{text}</p><p>{text}</p></article></body></html>"
        );
        assert!(is_probably_readerable(&html, None));
    }

    #[test]
    fn test_not_readerable() {
        let html = "<html><body><p>Short</p></body></html>";
        assert!(!is_probably_readerable(html, None));
    }

    #[test]
    fn hidden_and_unlikely_paragraphs_do_not_count() {
        let text = long_text();
        let html = format!(
            r#"<html><body>
                <p style="display: none">{text}</p>
                <p hidden>{text}</p>
                <p class="sidebar">{text}</p>
                <ul><li><p>{text}</p></li></ul>
            </body></html>"#
        );
        assert!(!is_probably_readerable(&html, None));
    }

    #[test]
    fn br_separated_text_counts_through_its_div() {
        let text = long_text();
        let html = format!("<html><body><div>{text}<br>{text}<br>{text}</div></body></html>");
        assert!(is_probably_readerable(&html, None));
    }

    #[test]
    fn stricter_options_reject_borderline_pages() {
        let text = long_text();
        let html = format!("<html><body><p>{text}</p><p>{text}</p></body></html>");
        let options = ReaderableOptions {
            min_content_length: 140,
            min_score: 100.0,
        };
        assert!(!is_probably_readerable(&html, Some(options)));
    }
}
