//! Tree queries used by the scorer, selector and cleaner.

use crate::constants::{Patterns, DIV_TO_P_ELEMS, PHRASING_ELEMS};
use crate::dom::{Document, NodeId};
use regex::Regex;

/// Visible text of a node, trimmed. With `normalize_spaces` runs of whitespace
/// collapse into single spaces.
pub fn get_inner_text(
    doc: &Document,
    id: NodeId,
    patterns: &Patterns,
    normalize_spaces: bool,
) -> String {
    let text = doc.visible_text(id);
    let trimmed = text.trim();
    if normalize_spaces {
        patterns.normalize.replace_all(trimmed, " ").into_owned()
    } else {
        trimmed.to_string()
    }
}

/// Length in characters of the normalized inner text.
pub fn text_length(doc: &Document, id: NodeId, patterns: &Patterns) -> usize {
    get_inner_text(doc, id, patterns, true).chars().count()
}

/// Number of commas (any script) in the node's text.
pub fn get_char_count(doc: &Document, id: NodeId, patterns: &Patterns) -> usize {
    let text = get_inner_text(doc, id, patterns, true);
    patterns.commas.find_iter(&text).count()
}

/// Share of the node's text that sits inside links. Fragment links count 30%.
pub fn get_link_density(doc: &Document, id: NodeId, patterns: &Patterns) -> f64 {
    let total = text_length(doc, id, patterns);
    if total == 0 {
        return 0.0;
    }

    let link_length: f64 = doc
        .get_elements_by_tag(id, &["A"])
        .into_iter()
        .map(|link| {
            let coefficient = match doc.attr(link, "href") {
                Some(href) if patterns.hash_url.is_match(href) => 0.3,
                _ => 1.0,
            };
            text_length(doc, link, patterns) as f64 * coefficient
        })
        .sum();

    link_length / total as f64
}

/// Share of the node's text held by descendants with one of `tags`.
pub fn get_text_density(doc: &Document, id: NodeId, tags: &[&str], patterns: &Patterns) -> f64 {
    let total = text_length(doc, id, patterns);
    if total == 0 {
        return 0.0;
    }
    let children_length: usize = doc
        .get_elements_by_tag(id, tags)
        .into_iter()
        .map(|child| text_length(doc, child, patterns))
        .sum();
    children_length as f64 / total as f64
}

/// Text nodes, phrasing elements, and links/edits that only hold phrasing content.
pub fn is_phrasing_content(doc: &Document, id: NodeId) -> bool {
    if doc.is_text(id) {
        return true;
    }
    let Some(tag) = doc.tag_name(id) else {
        return false;
    };
    if PHRASING_ELEMS.contains(&tag.as_str()) {
        return true;
    }
    matches!(tag.as_str(), "A" | "DEL" | "INS")
        && doc
            .children(id)
            .iter()
            .all(|child| is_phrasing_content(doc, *child))
}

/// Whitespace-only text or a `<br>`.
pub fn is_whitespace(doc: &Document, id: NodeId) -> bool {
    (doc.is_text(id) && doc.text(id).trim().is_empty()) || doc.has_tag(id, "BR")
}

/// Whether the node holds exactly one element, tagged `tag`, and no other text.
pub fn has_single_tag_inside_element(
    doc: &Document,
    id: NodeId,
    tag: &str,
    patterns: &Patterns,
) -> bool {
    let children = doc.element_children(id);
    if children.len() != 1 || !doc.has_tag(children[0], tag) {
        return false;
    }
    !doc
        .children(id)
        .iter()
        .any(|child| doc.is_text(*child) && patterns.has_content.is_match(doc.text(*child)))
}

/// An element with no text whose only children, if any, are `<br>`/`<hr>`.
pub fn is_element_without_content(doc: &Document, id: NodeId) -> bool {
    if !doc.is_element(id) || !doc.text_content(id).trim().is_empty() {
        return false;
    }
    let children = doc.element_children(id);
    let breaks = doc.get_elements_by_tag(id, &["BR", "HR"]).len();
    children.is_empty() || children.len() == breaks
}

/// Whether any descendant is a block-level element.
pub fn has_child_block_element(doc: &Document, id: NodeId) -> bool {
    doc.children(id).iter().any(|child| {
        doc.has_any_tag(*child, &DIV_TO_P_ELEMS) || has_child_block_element(doc, *child)
    })
}

/// Element ancestors of a node, nearest first. `max_depth == 0` means no limit.
pub fn get_node_ancestors(doc: &Document, id: NodeId, max_depth: usize) -> Vec<NodeId> {
    let mut ancestors = Vec::new();
    let mut current = doc.parent_element(id);
    while let Some(ancestor) = current {
        ancestors.push(ancestor);
        if max_depth > 0 && ancestors.len() == max_depth {
            break;
        }
        current = doc.parent_element(ancestor);
    }
    ancestors
}

/// Whether an ancestor within `max_depth` levels (0 = any) has `tag` and passes `filter`.
pub fn has_ancestor_tag(
    doc: &Document,
    id: NodeId,
    tag: &str,
    max_depth: usize,
    filter: impl Fn(NodeId) -> bool,
) -> bool {
    let mut depth = 0;
    let mut current = doc.parent_element(id);
    while let Some(ancestor) = current {
        if max_depth > 0 && depth >= max_depth {
            return false;
        }
        if doc.has_tag(ancestor, tag) && filter(ancestor) {
            return true;
        }
        depth += 1;
        current = doc.parent_element(ancestor);
    }
    false
}

/// Next element in a depth-first walk. With `skip_children` the subtree of
/// `id` is stepped over.
pub fn get_next_node(doc: &Document, id: NodeId, skip_children: bool) -> Option<NodeId> {
    if !skip_children {
        if let Some(child) = doc.first_element_child(id) {
            return Some(child);
        }
    }
    let mut current = Some(id);
    while let Some(node) = current {
        if let Some(sibling) = doc.next_element_sibling(node) {
            return Some(sibling);
        }
        current = doc.parent(node);
    }
    None
}

/// Detach `id` and return the node a depth-first walk would visit next.
pub fn remove_and_get_next(doc: &mut Document, id: NodeId) -> Option<NodeId> {
    let next = get_next_node(doc, id, true);
    doc.detach(id);
    next
}

/// First node from `start` on (siblings only) that is an element or holds text.
pub fn next_significant_node(doc: &Document, start: Option<NodeId>) -> Option<NodeId> {
    let mut next = start;
    while let Some(node) = next {
        if doc.is_element(node) || !doc.text_content(node).trim().is_empty() {
            return Some(node);
        }
        next = doc.next_sibling(node);
    }
    None
}

/// Visibility from inline style, `hidden` and `aria-hidden`.
pub fn is_probably_visible(doc: &Document, id: NodeId, patterns: &Patterns) -> bool {
    if let Some(style) = doc.attr(id, "style") {
        if patterns.display_none.is_match(style) || patterns.visibility_hidden.is_match(style) {
            return false;
        }
    }
    if doc.has_attr(id, "hidden") {
        return false;
    }
    match doc.attr(id, "aria-hidden") {
        Some(value) if value == "true" => doc.class_name(id).contains("fallback-image"),
        _ => true,
    }
}

/// An `<img>`, or an element whose only content is a single image.
pub fn is_single_image(doc: &Document, id: NodeId) -> bool {
    let mut current = id;
    loop {
        if doc.has_tag(current, "IMG") {
            return true;
        }
        let children = doc.element_children(current);
        if children.len() != 1 || !doc.text_content(current).trim().is_empty() {
            return false;
        }
        current = children[0];
    }
}

/// Rows and columns of a table, honouring `rowspan`/`colspan`.
pub fn get_row_and_column_count(doc: &Document, table: NodeId) -> (usize, usize) {
    let mut rows = 0;
    let mut columns = 0;
    for tr in doc.get_elements_by_tag(table, &["TR"]) {
        let rowspan = doc
            .attr(tr, "rowspan")
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(1);
        rows += rowspan.max(1);

        let columns_in_row: usize = doc
            .get_elements_by_tag(tr, &["TD"])
            .into_iter()
            .map(|cell| {
                doc.attr(cell, "colspan")
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(1)
                    .max(1)
            })
            .sum();
        columns = columns.max(columns_in_row);
    }
    (rows, columns)
}

/// Whether an embed points at an allowed video host.
pub fn is_allowed_video(doc: &Document, id: NodeId, videos: &Regex) -> bool {
    if doc
        .attrs(id)
        .iter()
        .any(|(_, value)| videos.is_match(value))
    {
        return true;
    }
    doc.has_tag(id, "OBJECT") && videos.is_match(&doc.inner_html(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_child(doc: &Document) -> NodeId {
        doc.first_element_child(doc.body().unwrap()).unwrap()
    }

    #[test]
    fn link_density_discounts_fragment_links() {
        let patterns = Patterns::shared();
        let doc = Document::parse(
            r##"<body><div>aaaaaaaaaa<a href="/x">bbbbbbbbbb</a><a href="#top">cccccccccc</a></div></body>"##,
        );
        let div = body_child(&doc);
        let density = get_link_density(&doc, div, patterns);
        assert!((density - (10.0 + 3.0) / 30.0).abs() < 1e-9);
    }

    #[test]
    fn phrasing_content_rules() {
        let doc = Document::parse("<body><div><a href='#'><b>x</b></a><a href='#'><p>y</p></a></div></body>");
        let div = body_child(&doc);
        let links = doc.element_children(div);
        assert!(is_phrasing_content(&doc, links[0]));
        assert!(!is_phrasing_content(&doc, links[1]));
    }

    #[test]
    fn single_tag_inside_element_ignores_whitespace() {
        let patterns = Patterns::shared();
        let doc = Document::parse("<body><div>\n  <p>text</p>\n</div></body>");
        let div = body_child(&doc);
        assert!(has_single_tag_inside_element(&doc, div, "P", patterns));

        let doc = Document::parse("<body><div>loose<p>text</p></div></body>");
        let div = body_child(&doc);
        assert!(!has_single_tag_inside_element(&doc, div, "P", patterns));
    }

    #[test]
    fn element_without_content_allows_breaks() {
        let doc = Document::parse("<body><div> <br><hr> </div></body>");
        assert!(is_element_without_content(&doc, body_child(&doc)));
        let doc = Document::parse("<body><div><span></span></div></body>");
        assert!(!is_element_without_content(&doc, body_child(&doc)));
    }

    #[test]
    fn next_node_walks_depth_first() {
        let doc = Document::parse("<body><div><p>a</p></div><section>b</section></body>");
        let div = body_child(&doc);
        let p = doc.first_element_child(div).unwrap();
        let section = doc.next_element_sibling(div).unwrap();
        assert_eq!(get_next_node(&doc, div, false), Some(p));
        assert_eq!(get_next_node(&doc, p, false), Some(section));
        assert_eq!(get_next_node(&doc, div, true), Some(section));
    }

    #[test]
    fn visibility_checks_attributes() {
        let patterns = Patterns::shared();
        let doc = Document::parse(
            r#"<body><div style="display: none">a</div><div hidden>b</div><div aria-hidden="true" class="fallback-image">c</div><div aria-hidden="true">d</div></body>"#,
        );
        let divs = doc.element_children(doc.body().unwrap());
        let visible: Vec<bool> = divs
            .iter()
            .map(|div| is_probably_visible(&doc, *div, patterns))
            .collect();
        assert_eq!(visible, vec![false, false, true, false]);
    }

    #[test]
    fn counts_rows_and_columns_with_spans() {
        let doc = Document::parse(
            "<body><table><tr><td colspan='3'>a</td></tr><tr rowspan='2'><td>b</td><td>c</td></tr></table></body>",
        );
        let table = body_child(&doc);
        assert_eq!(get_row_and_column_count(&doc, table), (3, 3));
    }

    #[test]
    fn single_image_through_wrappers() {
        let doc = Document::parse("<body><figure><span><img src='a.jpg'></span></figure></body>");
        assert!(is_single_image(&doc, body_child(&doc)));
        let doc = Document::parse("<body><figure><img src='a.jpg'>caption</figure></body>");
        assert!(!is_single_image(&doc, body_child(&doc)));
    }
}
