//! Final clean-up of the extracted article.
//!
//! Runs once on the accepted content: links and media sources are made
//! absolute, redundant wrappers are collapsed, classes are stripped and
//! leftover entities in text are decoded.

use crate::constants::{Patterns, CLASSES_TO_PRESERVE};
use crate::dom::{Document, NodeId};
use crate::dom_utils;
use crate::options::ReadabilityOptions;
use crate::utils;
use regex::Captures;
use tracing::trace;
use url::Url;

const URI_ATTRS: [&str; 3] = ["href", "src", "poster"];

/// Apply every post-processing step to `content`.
pub fn post_process(
    doc: &mut Document,
    content: NodeId,
    page_url: Option<&Url>,
    options: &ReadabilityOptions,
    patterns: &Patterns,
) {
    if let Some(base) = document_base(doc, page_url) {
        let keep_fragments = page_url == Some(&base);
        fix_relative_uris(doc, content, &base, keep_fragments, patterns);
    }
    simplify_nested_elements(doc, content, patterns);
    if !options.keep_classes {
        clean_classes(doc, content, &options.classes_to_preserve);
    }
    unescape_text_nodes(doc, content);
}

/// URL relative links resolve against: `<base href>` when present, else the page URL.
pub fn document_base(doc: &Document, page_url: Option<&Url>) -> Option<Url> {
    let base_href = doc
        .get_elements_by_tag(doc.root(), &["BASE"])
        .into_iter()
        .find_map(|base| doc.attr(base, "href"))
        .map(str::trim)
        .filter(|href| !href.is_empty());

    let from_base = base_href.and_then(|href| match page_url {
        Some(page) => page.join(href).ok(),
        None => Url::parse(href).ok(),
    });
    from_base.or_else(|| page_url.cloned())
}

/// Resolve `href`, `src`, `poster` and every `srcset` candidate of every
/// element under `content` against `base`.
///
/// `javascript:` links are unwrapped: a link holding only text becomes that
/// text, anything else becomes a `<span>` with the link's children.
pub fn fix_relative_uris(
    doc: &mut Document,
    content: NodeId,
    base: &Url,
    keep_fragments: bool,
    patterns: &Patterns,
) {
    let resolve = |uri: &str| {
        if keep_fragments && uri.starts_with('#') {
            uri.to_string()
        } else {
            utils::to_absolute_uri(uri, base)
        }
    };

    for link in doc.get_elements_by_tag(content, &["A"]) {
        let Some(href) = doc.attr(link, "href").map(str::to_string) else {
            continue;
        };
        if href.trim_start().starts_with("javascript:") {
            let children = doc.children(link);
            let replacement = if children.len() == 1 && doc.is_text(children[0]) {
                let text = doc.text_content(link);
                doc.create_text(&text)
            } else {
                let span = doc.create_element("SPAN");
                doc.move_children(link, span);
                span
            };
            doc.replace(link, replacement);
            trace!(%href, "unwrapped javascript link");
        }
    }

    for elem in doc.get_elements_by_tag(content, &["*"]) {
        for name in URI_ATTRS {
            if let Some(value) = doc.attr(elem, name).map(str::to_string) {
                doc.set_attr(elem, name, resolve(&value));
            }
        }
        if let Some(srcset) = doc.attr(elem, "srcset").map(str::to_string) {
            let resolved = patterns.srcset_url.replace_all(&srcset, |caps: &Captures| {
                format!(
                    "{}{}{}",
                    resolve(&caps[1]),
                    caps.get(2).map_or("", |m| m.as_str()),
                    &caps[3]
                )
            });
            doc.set_attr(elem, "srcset", resolved.into_owned());
        }
    }
}

/// Remove empty `div`/`section` wrappers and collapse ones holding a single
/// `div`/`section`. The wrapper's attributes move to the child it is
/// replaced by. Elements whose id starts with `readability` are left alone.
pub fn simplify_nested_elements(doc: &mut Document, content: NodeId, patterns: &Patterns) {
    let mut node = Some(content);
    while let Some(current) = node {
        let is_wrapper = doc.parent(current).is_some()
            && doc.has_any_tag(current, &["DIV", "SECTION"])
            && !doc.id_attr(current).starts_with("readability");

        if is_wrapper {
            if dom_utils::is_element_without_content(doc, current) {
                node = dom_utils::remove_and_get_next(doc, current)
                    .filter(|next| doc.contains(content, *next));
                continue;
            }
            if dom_utils::has_single_tag_inside_element(doc, current, "DIV", patterns)
                || dom_utils::has_single_tag_inside_element(doc, current, "SECTION", patterns)
            {
                let child = doc.element_children(current)[0];
                let attrs = doc.attrs(current);
                for (name, value) in attrs {
                    doc.set_attr(child, &name, value);
                }
                doc.replace(current, child);
                node = Some(child);
                continue;
            }
        }
        node = dom_utils::get_next_node(doc, current, false)
            .filter(|next| doc.contains(content, *next));
    }
}

/// Drop every class not in `classes_to_preserve` (or the built-in `page`).
pub fn clean_classes(doc: &mut Document, content: NodeId, classes_to_preserve: &[String]) {
    let mut elements = vec![content];
    elements.extend(doc.get_elements_by_tag(content, &["*"]));

    for element in elements {
        let Some(class) = doc.attr(element, "class") else {
            continue;
        };
        let kept: Vec<&str> = class
            .split_whitespace()
            .filter(|name| {
                CLASSES_TO_PRESERVE.contains(name)
                    || classes_to_preserve.iter().any(|keep| keep == name)
            })
            .collect();
        if kept.is_empty() {
            doc.remove_attr(element, "class");
        } else {
            let kept = kept.join(" ");
            doc.set_attr(element, "class", kept);
        }
    }
}

/// Decode entities still present in text nodes, such as double-escaped `&amp;lt;`.
pub fn unescape_text_nodes(doc: &mut Document, content: NodeId) {
    for node in doc.descendants(content) {
        if doc.is_text(node) && doc.text(node).contains('&') {
            let text = utils::unescape_html_entities(doc.text(node));
            doc.set_text(node, text);
        }
    }
}
