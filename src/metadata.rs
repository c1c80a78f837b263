//! Metadata extraction from HTML documents (JSON-LD, meta tags, etc.).
//!
//! Runs on the parsed [`Html`] before the arena copy is made, so scripts
//! holding JSON-LD are still present.

use crate::constants::Patterns;
use crate::error::{ReadabilityError, Result};
use crate::options::Thresholds;
use crate::utils::{self, text_similarity, word_count};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;
use std::collections::HashMap;
use tracing::trace;

static JSON_LD_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());
static META_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("meta").unwrap());
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static H1_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());

/// Metadata extracted from the document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub title: Option<String>,
    pub byline: Option<String>,
    pub excerpt: Option<String>,
    pub site_name: Option<String>,
    pub published_time: Option<String>,
    pub lang: Option<String>,
}

/// Extract article metadata from the first usable JSON-LD block.
///
/// Looks for `<script type="application/ld+json">` holding a schema.org
/// Article-family object, directly, inside an array, or inside `@graph`.
/// Malformed blocks are skipped.
pub fn get_json_ld(document: &Html, patterns: &Patterns, thresholds: &Thresholds) -> Metadata {
    for script in document.select(&JSON_LD_SELECTOR) {
        let content: String = script.text().collect();
        match parse_json_ld(&content, patterns) {
            Ok(article) => {
                let document_title = get_article_title(document, patterns, thresholds);
                return metadata_from_json_ld(&article, &document_title, patterns, thresholds);
            }
            Err(err) => trace!(%err, "skipping JSON-LD block"),
        }
    }
    Metadata::default()
}

fn parse_json_ld(content: &str, patterns: &Patterns) -> Result<Value> {
    let content = content
        .trim()
        .trim_start_matches("<![CDATA[")
        .trim_end_matches("]]>")
        .trim();

    let parsed: Value =
        serde_json::from_str(content).map_err(|err| ReadabilityError::JsonLd(err.to_string()))?;
    let parsed = match parsed {
        Value::Array(items) => items
            .into_iter()
            .find(|item| is_article_type(item, patterns))
            .ok_or_else(|| ReadabilityError::JsonLd("no article in array".into()))?,
        other => other,
    };

    if !has_schema_context(&parsed, patterns) {
        return Err(ReadabilityError::JsonLd("missing schema.org context".into()));
    }

    let article = if parsed.get("@type").is_none() {
        parsed
            .get("@graph")
            .and_then(Value::as_array)
            .and_then(|graph| graph.iter().find(|item| is_article_type(item, patterns)))
            .cloned()
            .ok_or_else(|| ReadabilityError::JsonLd("no article in @graph".into()))?
    } else {
        parsed
    };

    if !is_article_type(&article, patterns) {
        return Err(ReadabilityError::JsonLd("not an article type".into()));
    }
    Ok(article)
}

fn has_schema_context(value: &Value, patterns: &Patterns) -> bool {
    match value.get("@context") {
        Some(Value::String(context)) => patterns.schema_org_context.is_match(context),
        Some(Value::Object(context)) => context
            .get("@vocab")
            .and_then(Value::as_str)
            .is_some_and(|vocab| patterns.schema_org_context.is_match(vocab)),
        _ => false,
    }
}

fn is_article_type(value: &Value, patterns: &Patterns) -> bool {
    match value.get("@type") {
        Some(Value::String(kind)) => patterns.json_ld_article_types.is_match(kind),
        Some(Value::Array(kinds)) => kinds
            .iter()
            .filter_map(Value::as_str)
            .any(|kind| patterns.json_ld_article_types.is_match(kind)),
        _ => false,
    }
}

fn string_field<'v>(value: &'v Value, key: &str) -> Option<&'v str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn metadata_from_json_ld(
    article: &Value,
    document_title: &str,
    patterns: &Patterns,
    thresholds: &Thresholds,
) -> Metadata {
    let name = string_field(article, "name");
    let headline = string_field(article, "headline");

    // `name` is sometimes the site or section; prefer whichever matches the page title.
    let title = match (name, headline) {
        (Some(name), Some(headline)) if name != headline => {
            let matches = |candidate: &str| {
                text_similarity(candidate, document_title, patterns) >= thresholds.title_similarity
            };
            if matches(headline) && !matches(name) {
                Some(headline)
            } else {
                Some(name)
            }
        }
        (Some(name), _) => Some(name),
        (None, headline) => headline,
    };

    let byline = article.get("author").and_then(|author| match author {
        Value::Array(authors) => {
            let names: Vec<&str> = authors
                .iter()
                .filter_map(|author| string_field(author, "name"))
                .collect();
            (!names.is_empty()).then(|| names.join(", "))
        }
        author => string_field(author, "name").map(str::to_string),
    });

    Metadata {
        title: title.map(str::to_string),
        byline,
        excerpt: string_field(article, "description").map(str::to_string),
        site_name: article
            .get("publisher")
            .and_then(|publisher| string_field(publisher, "name"))
            .map(str::to_string),
        published_time: string_field(article, "datePublished").map(str::to_string),
        lang: None,
    }
}

/// Collect `<meta>` values keyed by normalized property or name.
fn collect_meta_values(document: &Html, patterns: &Patterns) -> HashMap<String, String> {
    let mut values = HashMap::new();
    for meta in document.select(&META_SELECTOR) {
        let element = meta.value();
        let Some(content) = element.attr("content").map(str::trim).filter(|c| !c.is_empty())
        else {
            continue;
        };

        let mut matched = false;
        if let Some(property) = element.attr("property") {
            for found in patterns.meta_property.find_iter(property) {
                let key: String = found
                    .as_str()
                    .to_lowercase()
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect();
                values.insert(key, content.to_string());
                matched = true;
            }
        }

        if !matched {
            if let Some(name) = element.attr("name").filter(|n| patterns.meta_name.is_match(n)) {
                let key: String = name
                    .to_lowercase()
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .map(|c| if c == '.' { ':' } else { c })
                    .collect();
                values.insert(key, content.to_string());
            }
        }
    }
    values
}

fn first_of(values: &HashMap<String, String>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| values.get(*key).cloned())
}

/// Combine JSON-LD, `<meta>` tags and the document title into the final
/// metadata. JSON-LD wins over meta tags, which win over the title heuristic.
///
/// Supports OpenGraph, Twitter Cards, Dublin Core, Parse.ly and Weibo keys.
pub fn get_article_metadata(
    document: &Html,
    json_ld: Metadata,
    patterns: &Patterns,
    thresholds: &Thresholds,
) -> Metadata {
    let values = collect_meta_values(document, patterns);

    let title = json_ld
        .title
        .or_else(|| {
            first_of(
                &values,
                &[
                    "dc:title",
                    "dcterm:title",
                    "og:title",
                    "weibo:article:title",
                    "weibo:webpage:title",
                    "title",
                    "twitter:title",
                    "parsely-title",
                ],
            )
        })
        .unwrap_or_else(|| get_article_title(document, patterns, thresholds));

    let article_author = values
        .get("article:author")
        .filter(|author| !utils::is_url(author))
        .cloned();
    let byline = json_ld
        .byline
        .or_else(|| {
            first_of(
                &values,
                &["dc:creator", "dcterm:creator", "author", "parsely-author"],
            )
        })
        .or(article_author);

    let excerpt = json_ld.excerpt.or_else(|| {
        first_of(
            &values,
            &[
                "dc:description",
                "dcterm:description",
                "og:description",
                "weibo:article:description",
                "weibo:webpage:description",
                "description",
                "twitter:description",
            ],
        )
    });

    let site_name = json_ld
        .site_name
        .or_else(|| first_of(&values, &["og:site_name"]));

    let published_time = json_ld.published_time.or_else(|| {
        first_of(
            &values,
            &["article:published_time", "parsely-pub-date"],
        )
    });

    let unescape = |value: Option<String>| value.map(|v| utils::unescape_html_entities(&v));
    Metadata {
        title: Some(title)
            .filter(|title| !title.is_empty())
            .map(|title| utils::unescape_html_entities(&title)),
        byline: unescape(byline),
        excerpt: unescape(excerpt),
        site_name: unescape(site_name),
        published_time: unescape(published_time),
        lang: extract_language(document),
    }
}

/// `<html lang>`, else a `Content-Language` meta value.
fn extract_language(document: &Html) -> Option<String> {
    let from_html = document
        .root_element()
        .value()
        .attr("lang")
        .map(str::trim)
        .filter(|lang| !lang.is_empty());
    if let Some(lang) = from_html {
        return Some(lang.to_string());
    }

    document
        .select(&META_SELECTOR)
        .filter(|meta| {
            meta.value()
                .attr("http-equiv")
                .is_some_and(|equiv| equiv.eq_ignore_ascii_case("content-language"))
        })
        .find_map(|meta| {
            meta.value()
                .attr("content")
                .map(str::trim)
                .filter(|lang| !lang.is_empty())
                .map(str::to_string)
        })
}

fn element_text(document: &Html, selector: &Selector, patterns: &Patterns) -> Option<String> {
    let element = document.select(selector).next()?;
    let text: String = element.text().collect();
    let text = utils::normalize_whitespace(text.trim(), patterns);
    (!text.is_empty()).then_some(text)
}

/// Title derived from the document itself.
///
/// When `<title>` and the first `<h1>` share few words and the heading reads
/// like a single sentence, the heading is used. Otherwise `<title>` is split
/// on separators like `|`, `-` and `:` and the segment with the most words,
/// then the most title-case words, wins.
pub fn get_article_title(document: &Html, patterns: &Patterns, thresholds: &Thresholds) -> String {
    let title = element_text(document, &TITLE_SELECTOR, patterns);
    let heading = element_text(document, &H1_SELECTOR, patterns);

    let Some(title) = title else {
        return heading.unwrap_or_default();
    };

    if let Some(heading) = heading {
        let divergent = text_similarity(&title, &heading, patterns) < thresholds.title_divergence;
        if divergent && is_single_sentence(&heading, patterns) {
            trace!(%heading, "using h1 over a divergent <title>");
            return heading;
        }
    }

    clean_title(&title, patterns)
}

fn is_single_sentence(text: &str, patterns: &Patterns) -> bool {
    let words = word_count(text);
    let body = text.trim_end_matches(['.', '!', '?']);
    (2..=30).contains(&words) && !patterns.sentence_end.is_match(body)
}

/// Drop site names and section labels around the real title. The segment
/// with the most words wins; on a tie the earlier one, since site names
/// usually trail.
fn clean_title(title: &str, patterns: &Patterns) -> String {
    let segments: Vec<&str> = patterns
        .title_separator
        .split(title)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.len() < 2 {
        return title.to_string();
    }

    segments
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| word_count(a).cmp(&word_count(b)).then(ib.cmp(ia)))
        .map(|(_, segment)| segment.to_string())
        .unwrap_or_else(|| title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn metadata(html: &str) -> Metadata {
        let document = Html::parse_document(html);
        let patterns = Patterns::shared();
        let thresholds = Thresholds::default();
        let json_ld = get_json_ld(&document, patterns, &thresholds);
        get_article_metadata(&document, json_ld, patterns, &thresholds)
    }

    #[test]
    fn test_json_ld_extraction() {
        let html = r#"
            <html>
                <head>
                    <script type="application/ld+json">
                    {
                        "@context": "https://schema.org",
                        "@type": "NewsArticle",
                        "headline": "Test Article",
                        "author": {"name": "John Doe"},
                        "publisher": {"name": "The Paper"},
                        "datePublished": "2024-05-01",
                        "description": "Test description"
                    }
                    </script>
                </head>
            </html>
        "#;

        let metadata = metadata(html);
        assert_eq!(metadata.title.as_deref(), Some("Test Article"));
        assert_eq!(metadata.byline.as_deref(), Some("John Doe"));
        assert_eq!(metadata.excerpt.as_deref(), Some("Test description"));
        assert_eq!(metadata.site_name.as_deref(), Some("The Paper"));
        assert_eq!(metadata.published_time.as_deref(), Some("2024-05-01"));
    }

    #[test]
    fn test_json_ld_graph_and_author_list() {
        let html = r#"<html><head>
            <script type="application/ld+json">{ not json</script>
            <script type="application/ld+json">
            {"@context": {"@vocab": "http://schema.org/"},
             "@graph": [
                {"@type": "WebSite", "name": "Site"},
                {"@type": ["BlogPosting"], "name": "Graph Post",
                 "author": [{"name": "Ann"}, {"name": "Bob"}]}
             ]}
            </script></head></html>"#;

        let metadata = metadata(html);
        assert_eq!(metadata.title.as_deref(), Some("Graph Post"));
        assert_eq!(metadata.byline.as_deref(), Some("Ann, Bob"));
    }

    #[test]
    fn test_json_ld_requires_schema_context() {
        let html = r#"<html><head>
            <script type="application/ld+json">{"@type": "Article", "headline": "Nope"}</script>
            <title>Fallback Title</title></head></html>"#;
        assert_eq!(metadata(html).title.as_deref(), Some("Fallback Title"));
    }

    #[test]
    fn test_json_ld_headline_matching_title_beats_name() {
        let html = r#"<html><head><title>Rust Ships New Borrow Checker</title>
            <script type="application/ld+json">
            {"@context": "https://schema.org", "@type": "Article",
             "name": "Daily Tech News", "headline": "Rust ships new borrow checker"}
            </script></head></html>"#;
        assert_eq!(
            metadata(html).title.as_deref(),
            Some("Rust ships new borrow checker")
        );
    }

    #[test]
    fn test_meta_tag_extraction() {
        let html = r#"
            <html>
                <head>
                    <meta property="og:title" content="OG Title" />
                    <meta name="author" content="Jane Smith" />
                    <meta property="og:description" content="OG Description" />
                    <meta property="og:site_name" content="Example" />
                    <meta name="twitter:title" content="Twitter Title" />
                </head>
            </html>
        "#;

        let metadata = metadata(html);
        assert_eq!(metadata.title.as_deref(), Some("OG Title"));
        assert_eq!(metadata.byline.as_deref(), Some("Jane Smith"));
        assert_eq!(metadata.excerpt.as_deref(), Some("OG Description"));
        assert_eq!(metadata.site_name.as_deref(), Some("Example"));
    }

    #[test]
    fn test_article_author_url_is_ignored() {
        let html = r#"<html><head>
            <meta property="article:author" content="https://example.com/staff/jane" />
            </head></html>"#;
        assert_eq!(metadata(html).byline, None);

        let html = r#"<html><head>
            <meta property="article:author" content="Jane Smith" />
            </head></html>"#;
        assert_eq!(metadata(html).byline.as_deref(), Some("Jane Smith"));
    }

    #[test]
    fn test_title_extraction() {
        let patterns = Patterns::shared();
        let thresholds = Thresholds::default();
        let document =
            Html::parse_document("<html><head><title>Article Title | Site Name</title></head></html>");
        assert_eq!(
            get_article_title(&document, patterns, &thresholds),
            "Article Title"
        );

        let document = Html::parse_document(
            "<html><head><title>News - A Much Longer Headline About Things</title></head></html>",
        );
        assert_eq!(
            get_article_title(&document, patterns, &thresholds),
            "A Much Longer Headline About Things"
        );

        let document = Html::parse_document(
            "<html><head><title>Council votes | Town News</title></head></html>",
        );
        assert_eq!(
            get_article_title(&document, patterns, &thresholds),
            "Council votes"
        );
    }

    #[test]
    fn test_divergent_h1_wins() {
        let patterns = Patterns::shared();
        let thresholds = Thresholds::default();
        let document = Html::parse_document(
            "<html><head><title>Home | Example Portal</title></head><body><h1>Scientists map the deep ocean floor</h1></body></html>",
        );
        assert_eq!(
            get_article_title(&document, patterns, &thresholds),
            "Scientists map the deep ocean floor"
        );

        // Two sentences are not a headline.
        let document = Html::parse_document(
            "<html><head><title>Home | Example Portal</title></head><body><h1>Welcome. Read on below</h1></body></html>",
        );
        assert_eq!(
            get_article_title(&document, patterns, &thresholds),
            "Example Portal"
        );
    }

    #[test]
    fn test_language_and_entities() {
        let html = r#"<html lang="fr"><head><title>Tom &amp;amp; Jerry</title>
            <meta name="description" content="5 &lt; 6"></head></html>"#;
        let metadata = metadata(html);
        assert_eq!(metadata.lang.as_deref(), Some("fr"));
        assert_eq!(metadata.title.as_deref(), Some("Tom & Jerry"));
        assert_eq!(metadata.excerpt.as_deref(), Some("5 < 6"));

        let html = r#"<html><head><meta http-equiv="Content-Language" content="de"></head></html>"#;
        assert_eq!(self::metadata(html).lang.as_deref(), Some("de"));
    }
}
