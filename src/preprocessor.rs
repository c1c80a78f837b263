//! Normalization of the raw document before scoring.
//!
//! Runs once per parse on the freshly imported tree. Everything here is
//! attempt-independent, so the selector can snapshot the result and retry
//! from it.

use crate::constants::Patterns;
use crate::dom::{Document, NodeId};
use crate::dom_utils::{
    is_phrasing_content, is_probably_visible, is_single_image, is_whitespace,
    next_significant_node,
};
use tracing::trace;

/// Prepare the document for scoring.
///
/// Order matters: noscript bodies are read before scripts are stripped, and
/// visibility is flagged last so it sees the final attributes.
pub fn prep_document(doc: &mut Document, patterns: &Patterns) {
    unwrap_noscript_images(doc, patterns);
    remove_scripts(doc);
    remove_tags(doc, &["STYLE"]);

    if let Some(body) = doc.body() {
        replace_brs(doc, body);
        fix_lazy_images(doc, body, patterns);
    }

    for font in doc.get_elements_by_tag(doc.root(), &["FONT"]) {
        doc.set_tag(font, "SPAN");
    }

    flag_visibility(doc, patterns);
}

fn remove_tags(doc: &mut Document, tags: &[&str]) {
    for node in doc.get_elements_by_tag(doc.root(), tags) {
        doc.detach(node);
    }
}

/// Drop `<script>` and `<noscript>` elements with their content.
pub fn remove_scripts(doc: &mut Document) {
    remove_tags(doc, &["SCRIPT", "NOSCRIPT"]);
}

fn is_image_source_attr(name: &str, value: &str, patterns: &Patterns) -> bool {
    matches!(name, "src" | "srcset" | "data-src" | "data-srcset")
        || patterns.image_extension.is_match(value)
}

/// Largest `w` descriptor of a srcset-like value.
fn max_srcset_width(value: &str) -> Option<u32> {
    value
        .split(',')
        .filter_map(|candidate| {
            let descriptor = candidate.split_whitespace().nth(1)?;
            descriptor.strip_suffix('w')?.parse::<u32>().ok()
        })
        .max()
}

/// Width an image declares through `width` or its srcset.
fn declared_width(doc: &Document, img: NodeId) -> Option<u32> {
    let explicit = doc
        .attr(img, "width")
        .and_then(|value| value.trim().trim_end_matches("px").parse::<u32>().ok());
    let from_srcset = ["srcset", "data-srcset"]
        .iter()
        .filter_map(|name| doc.attr(img, name))
        .filter_map(max_srcset_width)
        .max();
    explicit.max(from_srcset)
}

/// Replace lazy placeholders by the image found in the following `<noscript>`.
///
/// Images without any source-like attribute are dropped first: they can
/// never render and only confuse the single-image checks below.
pub fn unwrap_noscript_images(doc: &mut Document, patterns: &Patterns) {
    for img in doc.get_elements_by_tag(doc.root(), &["IMG"]) {
        let has_source = doc
            .attrs(img)
            .iter()
            .any(|(name, value)| is_image_source_attr(name, value, patterns));
        if !has_source {
            trace!("dropping image without source");
            doc.detach(img);
        }
    }

    for noscript in doc.get_elements_by_tag(doc.root(), &["NOSCRIPT"]) {
        let Some(previous) = doc.previous_element_sibling(noscript) else {
            continue;
        };
        if !is_single_image(doc, previous) {
            continue;
        }

        // With scripting enabled the parser keeps noscript content as raw text.
        let markup = if doc.first_element_child(noscript).is_some() {
            doc.inner_html(noscript)
        } else {
            doc.text_content(noscript)
        };
        let holder = doc.create_element("DIV");
        for node in doc.parse_fragment(&markup) {
            doc.append_child(holder, node);
        }
        if !is_single_image(doc, holder) {
            continue;
        }
        let Some(replacement) = doc.first_element_child(holder) else {
            continue;
        };

        let old_img = if doc.has_tag(previous, "IMG") {
            Some(previous)
        } else {
            doc.get_elements_by_tag(previous, &["IMG"]).first().copied()
        };
        let new_img = if doc.has_tag(replacement, "IMG") {
            Some(replacement)
        } else {
            doc.get_elements_by_tag(replacement, &["IMG"]).first().copied()
        };
        let (Some(old_img), Some(new_img)) = (old_img, new_img) else {
            continue;
        };

        if let (Some(old_width), Some(new_width)) =
            (declared_width(doc, old_img), declared_width(doc, new_img))
        {
            if old_width > new_width {
                continue;
            }
        }

        let carried: Vec<(String, String)> = doc
            .attrs(old_img)
            .iter()
            .filter(|(name, value)| {
                !value.is_empty()
                    && (name == "src"
                        || name == "srcset"
                        || patterns.image_extension.is_match(value))
            })
            .cloned()
            .collect();
        for (name, value) in carried {
            if doc.attr(new_img, &name) == Some(value.as_str()) {
                continue;
            }
            let target = if doc.has_attr(new_img, &name) {
                format!("data-old-{name}")
            } else {
                name
            };
            doc.set_attr(new_img, &target, value);
        }

        trace!("unwrapped noscript image");
        doc.replace(previous, replacement);
    }
}

/// Turn runs of two or more `<br>` into paragraph boundaries.
///
/// `foo<br>bar<br><br>abc` becomes `foo<br>bar<p>abc</p>`.
pub fn replace_brs(doc: &mut Document, root: NodeId) {
    for br in doc.get_elements_by_tag(root, &["BR"]) {
        let mut next = next_significant_node(doc, doc.next_sibling(br));
        let mut replaced = false;
        while let Some(node) = next.filter(|node| doc.has_tag(*node, "BR")) {
            replaced = true;
            let after = doc.next_sibling(node);
            doc.detach(node);
            next = next_significant_node(doc, after);
        }
        if !replaced {
            continue;
        }

        let Some(parent) = doc.parent(br) else {
            continue;
        };
        let paragraph = doc.create_element("P");
        doc.replace(br, paragraph);

        let mut next = doc.next_sibling(paragraph);
        while let Some(node) = next {
            // A second run ends this paragraph.
            if doc.has_tag(node, "BR") {
                let following = next_significant_node(doc, doc.next_sibling(node));
                if following.is_some_and(|f| doc.has_tag(f, "BR")) {
                    break;
                }
            }
            if !is_phrasing_content(doc, node) {
                break;
            }
            next = doc.next_sibling(node);
            doc.append_child(paragraph, node);
        }

        while let Some(last) = doc.last_child(paragraph) {
            if !is_whitespace(doc, last) {
                break;
            }
            doc.detach(last);
        }

        if doc.has_tag(parent, "P") {
            doc.set_tag(parent, "DIV");
        }
    }
}

/// Promote image URLs hidden in lazy-loading attributes to `src`/`srcset`.
///
/// When several attributes qualify, the srcset-like value declaring the
/// largest width wins. `data-src` beats other plain URLs, which are taken
/// in attribute order.
pub fn fix_lazy_images(doc: &mut Document, root: NodeId, patterns: &Patterns) {
    for elem in doc.get_elements_by_tag(root, &["IMG", "PICTURE", "FIGURE"]) {
        drop_placeholder_src(doc, elem, patterns);

        let has_src = doc.attr(elem, "src").is_some_and(|v| !v.is_empty());
        let has_srcset = doc
            .attr(elem, "srcset")
            .is_some_and(|v| !v.is_empty() && v != "null");
        if (has_src || has_srcset) && !doc.class_name(elem).to_lowercase().contains("lazy") {
            continue;
        }

        let mut srcset: Option<(Option<u32>, String)> = None;
        let mut src: Option<String> = None;
        for (name, value) in &doc.attrs(elem) {
            if matches!(name.as_str(), "src" | "srcset" | "alt") {
                continue;
            }
            if value.trim().is_empty() {
                continue;
            }
            // `data-src` and `data-srcset` qualify whatever their URLs look like.
            if name == "data-srcset" || patterns.lazy_srcset_value.is_match(value) {
                let width = max_srcset_width(value);
                if srcset.as_ref().map_or(true, |(best, _)| width > *best) {
                    srcset = Some((width, value.trim().to_string()));
                }
            } else if name == "data-src" {
                src = Some(value.trim().to_string());
            } else if src.is_none() && patterns.lazy_src_value.is_match(value) {
                src = Some(value.clone());
            }
        }

        let promotions = [
            ("srcset", srcset.map(|(_, value)| value)),
            ("src", src),
        ];
        for (target, value) in promotions {
            let Some(value) = value else { continue };
            if doc.has_any_tag(elem, &["IMG", "PICTURE"]) {
                doc.set_attr(elem, target, value);
            } else if doc.get_elements_by_tag(elem, &["IMG", "PICTURE"]).is_empty() {
                let img = doc.create_element("IMG");
                doc.set_attr(img, target, value);
                doc.append_child(elem, img);
            }
        }
    }
}

/// Remove a tiny base64 `src` when another attribute carries the real image.
fn drop_placeholder_src(doc: &mut Document, elem: NodeId, patterns: &Patterns) {
    let Some(src) = doc.attr(elem, "src") else {
        return;
    };
    let Some(prefix) = patterns.b64_data_url.captures(src) else {
        return;
    };
    if &prefix[1] == "image/svg+xml" {
        return;
    }
    let payload = src.len() - prefix[0].len();
    let real_image_elsewhere = doc
        .attrs(elem)
        .iter()
        .any(|(name, value)| name != "src" && patterns.image_extension.is_match(value));
    // 133 base64 chars encode roughly 100 bytes, too small for a real image.
    if real_image_elsewhere && payload < 133 {
        doc.remove_attr(elem, "src");
    }
}

/// Cache the visibility of every element.
pub fn flag_visibility(doc: &mut Document, patterns: &Patterns) {
    for node in doc.get_elements_by_tag(doc.root(), &["*"]) {
        let visible = is_probably_visible(doc, node, patterns);
        doc.set_visible(node, visible);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn body_html(doc: &Document) -> String {
        doc.inner_html(doc.body().unwrap())
    }

    #[test]
    fn strips_scripts_styles_and_fonts() {
        let mut doc = Document::parse(
            "<html><head><style>p{}</style></head><body><script>var x;</script><noscript>n</noscript><font>t</font></body></html>",
        );
        prep_document(&mut doc, Patterns::shared());
        assert_eq!(body_html(&doc), "<span>t</span>");
        assert!(doc.get_elements_by_tag(doc.root(), &["STYLE"]).is_empty());
    }

    #[test]
    fn br_runs_become_paragraphs() {
        let mut doc = Document::parse("<body><div>foo<br>bar<br> <br><br>abc</div></body>");
        let body = doc.body().unwrap();
        replace_brs(&mut doc, body);
        assert_eq!(body_html(&doc), "<div>foo<br>bar<p> abc</p></div>");
    }

    #[test]
    fn br_paragraph_inside_p_retags_parent() {
        let mut doc = Document::parse("<body><p>one<br><br>two</p></body>");
        let body = doc.body().unwrap();
        replace_brs(&mut doc, body);
        assert_eq!(body_html(&doc), "<div>one<p>two</p></div>");
    }

    #[test]
    fn noscript_image_replaces_placeholder() {
        let mut doc = Document::parse(
            r#"<body><div><img src="placeholder.gif" data-src="real.jpg"><noscript><img src="full.jpg" width="800"></noscript></div></body>"#,
        );
        unwrap_noscript_images(&mut doc, Patterns::shared());
        let imgs = doc.get_elements_by_tag(doc.body().unwrap(), &["IMG"]);
        assert_eq!(imgs.len(), 1);
        let img = imgs[0];
        assert_eq!(doc.attr(img, "src"), Some("full.jpg"));
        assert_eq!(doc.attr(img, "data-old-src"), Some("placeholder.gif"));
        assert_eq!(doc.attr(img, "data-src"), Some("real.jpg"));
    }

    #[test]
    fn noscript_keeps_wider_original() {
        let mut doc = Document::parse(
            r#"<body><div><img src="big.jpg" width="1200"><noscript><img src="small.jpg" width="300"></noscript></div></body>"#,
        );
        unwrap_noscript_images(&mut doc, Patterns::shared());
        let imgs = doc.get_elements_by_tag(doc.body().unwrap(), &["IMG"]);
        assert_eq!(doc.attr(imgs[0], "src"), Some("big.jpg"));
    }

    #[test]
    fn images_without_source_are_dropped() {
        let mut doc = Document::parse(r#"<body><p><img alt="x"><img data-lazy="a.png"></p></body>"#);
        unwrap_noscript_images(&mut doc, Patterns::shared());
        assert_eq!(
            doc.get_elements_by_tag(doc.body().unwrap(), &["IMG"]).len(),
            1
        );
    }

    #[test]
    fn lazy_images_prefer_widest_srcset() {
        let mut doc = Document::parse(
            r#"<body><img class="lazy" data-small="a.jpg 300w" data-large="b.jpg 1200w, c.jpg 600w" data-original="d.jpg"></body>"#,
        );
        let body = doc.body().unwrap();
        fix_lazy_images(&mut doc, body, Patterns::shared());
        let img = doc.first_element_child(body).unwrap();
        assert_eq!(doc.attr(img, "srcset"), Some("b.jpg 1200w, c.jpg 600w"));
        assert_eq!(doc.attr(img, "src"), Some("d.jpg"));
    }

    #[test]
    fn data_src_is_promoted_without_file_extension() {
        let mut doc = Document::parse(
            r#"<body><img data-src="https://cdn.example.com/photo?id=42" data-srcset="https://cdn.example.com/photo?id=42&amp;w=2 2x" alt="chart"></body>"#,
        );
        let body = doc.body().unwrap();
        fix_lazy_images(&mut doc, body, Patterns::shared());
        let img = doc.first_element_child(body).unwrap();
        assert_eq!(doc.attr(img, "src"), Some("https://cdn.example.com/photo?id=42"));
        assert_eq!(
            doc.attr(img, "srcset"),
            Some("https://cdn.example.com/photo?id=42&w=2 2x")
        );
    }

    #[test]
    fn figure_without_image_gets_one() {
        let mut doc = Document::parse(r#"<body><figure data-src="photo.png"></figure></body>"#);
        let body = doc.body().unwrap();
        fix_lazy_images(&mut doc, body, Patterns::shared());
        assert_eq!(
            body_html(&doc),
            r#"<figure data-src="photo.png"><img src="photo.png"></figure>"#
        );
    }

    #[test]
    fn tiny_base64_placeholder_is_removed() {
        let mut doc = Document::parse(
            r#"<body><img src="data:image/gif;base64,R0lGODlhAQABAAAAACw=" data-src="real.jpg"></body>"#,
        );
        let body = doc.body().unwrap();
        fix_lazy_images(&mut doc, body, Patterns::shared());
        let img = doc.first_element_child(body).unwrap();
        assert_eq!(doc.attr(img, "src"), Some("real.jpg"));
    }

    #[test]
    fn visibility_is_flagged() {
        let mut doc = Document::parse(r#"<body><div hidden>a</div><div>b</div></body>"#);
        flag_visibility(&mut doc, Patterns::shared());
        let divs = doc.element_children(doc.body().unwrap());
        assert!(!doc.is_visible(divs[0]));
        assert!(doc.is_visible(divs[1]));
    }
}
