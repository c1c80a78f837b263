//! String and URL helpers.

use crate::constants::{Patterns, HTML_ESCAPE_MAP};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashSet;
use url::Url;

/// Whether `value` parses as an absolute URL.
pub fn is_url(value: &str) -> bool {
    Url::parse(value).is_ok()
}

/// Resolve `uri` against `base`, leaving it untouched when that fails.
pub fn to_absolute_uri(uri: &str, base: &Url) -> String {
    base.join(uri.trim())
        .map(|resolved| resolved.to_string())
        .unwrap_or_else(|_| uri.to_string())
}

/// Collapse runs of whitespace into one space.
pub fn normalize_whitespace(text: &str, patterns: &Patterns) -> String {
    patterns.normalize.replace_all(text, " ").into_owned()
}

/// Replace `&lt;`, `&gt;`, `&amp;`, `&quot;`, `&apos;` and numeric references.
pub fn unescape_html_entities(text: &str) -> String {
    static NAMED: Lazy<Regex> = Lazy::new(|| Regex::new(r"&(quot|amp|apos|lt|gt);").unwrap());
    static NUMERIC: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)&#(?:x([0-9a-f]{1,4})|([0-9]{1,4}));").unwrap());

    if !text.contains('&') {
        return text.to_string();
    }

    let named = NAMED.replace_all(text, |caps: &Captures| {
        let name = &caps[1];
        HTML_ESCAPE_MAP
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
            .unwrap_or_else(|| caps[0].to_string())
    });

    NUMERIC
        .replace_all(&named, |caps: &Captures| {
            let code = match (caps.get(1), caps.get(2)) {
                (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
                (_, Some(dec)) => dec.as_str().parse::<u32>().ok(),
                _ => None,
            };
            match code {
                Some(0) | None => "\u{FFFD}".to_string(),
                Some(code) if code > 0x10FFFF || (0xD800..=0xDFFF).contains(&code) => {
                    "\u{FFFD}".to_string()
                }
                Some(code) => char::from_u32(code)
                    .map(String::from)
                    .unwrap_or_else(|| "\u{FFFD}".to_string()),
            }
        })
        .into_owned()
}

fn tokens(text: &str, patterns: &Patterns) -> HashSet<String> {
    patterns
        .tokenize
        .split(&text.to_lowercase())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Word overlap of two strings: distinct tokens shared by both over the size
/// of the larger token set. `1.0` means the same words, `0.0` nothing in common.
pub fn text_similarity(a: &str, b: &str, patterns: &Patterns) -> f64 {
    let tokens_a = tokens(a, patterns);
    let tokens_b = tokens(b, patterns);
    let larger = tokens_a.len().max(tokens_b.len());
    if larger == 0 {
        return 0.0;
    }
    let shared = tokens_a.intersection(&tokens_b).count();
    shared as f64 / larger as f64
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescapes_named_and_numeric_entities() {
        assert_eq!(
            unescape_html_entities("Tom &amp; Jerry &lt;3 &#39;quoted&#x27; &quot;x&quot;"),
            "Tom & Jerry <3 'quoted' \"x\""
        );
        assert_eq!(unescape_html_entities("no entities"), "no entities");
        assert_eq!(unescape_html_entities("&#0;"), "\u{FFFD}");
    }

    #[test]
    fn similarity_is_shared_over_larger_set() {
        let patterns = Patterns::shared();
        assert_eq!(text_similarity("Hello world", "hello WORLD", patterns), 1.0);
        assert_eq!(
            text_similarity("one two three four", "one two three", patterns),
            0.75
        );
        assert_eq!(text_similarity("", "anything", patterns), 0.0);
        assert_eq!(text_similarity("alpha", "beta", patterns), 0.0);
    }

    #[test]
    fn resolves_relative_uris() {
        let base = Url::parse("https://example.com/news/story.html").unwrap();
        assert_eq!(
            to_absolute_uri("../img/a.png", &base),
            "https://example.com/img/a.png"
        );
        assert_eq!(
            to_absolute_uri("https://cdn.example.org/x.js", &base),
            "https://cdn.example.org/x.js"
        );
    }

    #[test]
    fn counts_words() {
        assert_eq!(word_count("  a  b c "), 3);
    }
}
