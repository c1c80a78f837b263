//! Pruning of the selected article subtree.
//!
//! [`ArticleCleaner::prep_article`] runs once per attempt on the content the
//! selector assembled. Unconditional rules always apply; the link-density
//! rules only while `CLEAN_CONDITIONALLY` is active.

use crate::constants::{
    ParseFlags, Patterns, CLASSES_TO_PRESERVE, CONDITIONAL_CLEAN_TAGS,
    DEPRECATED_SIZE_ATTRIBUTE_ELEMS, EMBED_TAGS, HEADING_TAGS, PRESENTATIONAL_ATTRIBUTES,
};
use crate::dom::{Document, NodeId};
use crate::dom_utils;
use crate::options::ReadabilityOptions;
use crate::scoring::NodeScorer;
use crate::utils::text_similarity;
use regex::Regex;
use std::collections::HashSet;
use tracing::trace;

const MEDIA_TAGS: [&str; 4] = ["IMG", "EMBED", "OBJECT", "IFRAME"];

/// Cleans one article subtree for one extraction attempt.
pub struct ArticleCleaner<'a> {
    patterns: &'a Patterns,
    options: &'a ReadabilityOptions,
    flags: ParseFlags,
    scorer: NodeScorer<'a>,
    title: &'a str,
    data_tables: HashSet<NodeId>,
}

impl<'a> ArticleCleaner<'a> {
    pub fn new(
        patterns: &'a Patterns,
        options: &'a ReadabilityOptions,
        flags: ParseFlags,
        title: &'a str,
    ) -> Self {
        Self {
            patterns,
            options,
            flags,
            scorer: NodeScorer::new(patterns, &options.thresholds, flags),
            title,
            data_tables: HashSet::new(),
        }
    }

    fn videos(&self) -> &Regex {
        self.options
            .allowed_video_regex
            .as_ref()
            .unwrap_or(&self.patterns.videos)
    }

    /// Prepare the article for display: strip presentational markup, drop
    /// widgets, embeds and duplicate headings, and prune link-heavy blocks.
    pub fn prep_article(&mut self, doc: &mut Document, article: NodeId) {
        clean_styles(doc, article);
        self.mark_data_tables(doc, article);

        remove_matching(doc, article, |doc, node| !doc.is_visible(node));
        for tag in ["STYLE", "SCRIPT", "FOOTER", "LINK", "ASIDE"] {
            self.clean(doc, article, tag);
        }
        for tag in EMBED_TAGS {
            self.clean(doc, article, tag);
        }

        for child in doc.element_children(article) {
            self.clean_share_elements(doc, child);
        }

        for tag in ["INPUT", "TEXTAREA", "BUTTON"] {
            self.clean(doc, article, tag);
        }
        self.clean_headers(doc, article);

        for tag in CONDITIONAL_CLEAN_TAGS {
            self.clean_conditionally(doc, article, tag);
        }

        for h1 in doc.get_elements_by_tag(article, &["H1"]) {
            doc.set_tag(h1, "H2");
        }

        remove_matching(doc, article, |doc, node| {
            doc.has_tag(node, "P")
                && doc.get_elements_by_tag(node, &MEDIA_TAGS).is_empty()
                && doc.visible_text(node).trim().is_empty()
        });

        for br in doc.get_elements_by_tag(article, &["BR"]) {
            let next = dom_utils::next_significant_node(doc, doc.next_sibling(br));
            if next.is_some_and(|next| doc.has_tag(next, "P")) {
                doc.detach(br);
            }
        }

        for table in doc.get_elements_by_tag(article, &["TABLE"]) {
            self.collapse_single_cell_table(doc, table);
        }
    }

    /// Remove every `tag` element, sparing embeds of allowed video hosts.
    fn clean(&self, doc: &mut Document, root: NodeId, tag: &str) {
        let is_embed = EMBED_TAGS.contains(&tag);
        for node in doc.get_elements_by_tag(root, &[tag]).into_iter().rev() {
            if is_embed && dom_utils::is_allowed_video(doc, node, self.videos()) {
                continue;
            }
            trace!(tag, "removing element");
            doc.detach(node);
        }
    }

    /// Drop share widgets below `root` whose text is short.
    fn clean_share_elements(&self, doc: &mut Document, root: NodeId) {
        let end = dom_utils::get_next_node(doc, root, true);
        let mut next = dom_utils::get_next_node(doc, root, false);
        while let Some(node) = next {
            if Some(node) == end || !doc.contains(root, node) {
                break;
            }
            let match_string = format!("{} {}", doc.class_name(node), doc.id_attr(node));
            let is_share = self.patterns.share_elements.is_match(&match_string)
                && doc.text_content(node).chars().count() < self.options.char_threshold;
            next = if is_share {
                trace!(class = doc.class_name(node), "removing share widget");
                dom_utils::remove_and_get_next(doc, node)
            } else {
                dom_utils::get_next_node(doc, node, false)
            };
        }
    }

    /// Remove headings that repeat the title or carry a negative class weight.
    fn clean_headers(&self, doc: &mut Document, root: NodeId) {
        let threshold = self.options.thresholds.title_similarity;
        for heading in doc.get_elements_by_tag(root, &["H1", "H2"]).into_iter().rev() {
            let duplicates_title = !self.title.is_empty() && {
                let text = dom_utils::get_inner_text(doc, heading, self.patterns, false);
                text_similarity(self.title, &text, self.patterns) >= threshold
            };
            if duplicates_title || self.scorer.class_weight(doc, heading) < 0.0 {
                trace!(duplicates_title, "removing heading");
                doc.detach(heading);
            }
        }
    }

    /// Classify the tables of the article as layout or data tables.
    pub fn mark_data_tables(&mut self, doc: &Document, root: NodeId) {
        self.data_tables.clear();
        for table in doc.get_elements_by_tag(root, &["TABLE"]) {
            if is_data_table(doc, table) {
                self.data_tables.insert(table);
            }
        }
    }

    fn inside_data_table(&self, doc: &Document, node: NodeId) -> bool {
        dom_utils::has_ancestor_tag(doc, node, "TABLE", 0, |table| {
            self.data_tables.contains(&table)
        })
    }

    fn contains_data_table(&self, doc: &Document, node: NodeId) -> bool {
        doc.get_elements_by_tag(node, &["TABLE"])
            .into_iter()
            .any(|table| self.data_tables.contains(&table))
    }

    /// Remove `tag` elements that look like link farms rather than prose.
    pub fn clean_conditionally(&self, doc: &mut Document, root: NodeId, tag: &str) {
        if !self.flags.contains(ParseFlags::CLEAN_CONDITIONALLY) {
            return;
        }
        for node in doc.get_elements_by_tag(root, &[tag]).into_iter().rev() {
            if self.should_remove(doc, node) {
                trace!(tag, "conditionally removing element");
                doc.detach(node);
            }
        }
    }

    fn should_remove(&self, doc: &Document, node: NodeId) -> bool {
        let thresholds = &self.options.thresholds;
        let patterns = self.patterns;
        let tag = doc.tag_name(node).unwrap_or_default();

        if self.data_tables.contains(&node)
            || self.inside_data_table(doc, node)
            || self.contains_data_table(doc, node)
            || dom_utils::has_ancestor_tag(doc, node, "CODE", 0, |_| true)
        {
            return false;
        }

        if dom_utils::get_char_count(doc, node, patterns) >= thresholds.clean_comma_count {
            return false;
        }

        let embeds = doc.get_elements_by_tag(node, &EMBED_TAGS);
        if embeds
            .iter()
            .any(|embed| dom_utils::is_allowed_video(doc, *embed, self.videos()))
        {
            return false;
        }

        let heading_density = dom_utils::get_text_density(doc, node, &HEADING_TAGS, patterns);
        if heading_density >= thresholds.heading_density {
            return false;
        }

        let text = dom_utils::get_inner_text(doc, node, patterns, true);
        if patterns.ad_words.is_match(&text) || patterns.loading_words.is_match(&text) {
            return true;
        }

        let text_length = text.chars().count();
        let is_list = matches!(tag.as_str(), "UL" | "OL" | "LI" | "SELECT") || {
            let list_length: usize = doc
                .get_elements_by_tag(node, &["UL", "OL"])
                .into_iter()
                .map(|list| dom_utils::text_length(doc, list, patterns))
                .sum();
            text_length > 0 && list_length as f64 / text_length as f64 > 0.9
        };
        let list_like = is_list || tag == "TABLE";

        let link_density = dom_utils::get_link_density(doc, node, patterns);
        let cutoff = if list_like {
            thresholds.clean_list_link_density
        } else {
            thresholds.clean_link_density
        } + self.options.link_density_modifier;

        let class_weight = self.scorer.class_weight(doc, node);
        let weight = class_weight - link_density * thresholds.link_density_penalty;

        let images = doc.get_elements_by_tag(node, &["IMG"]).len();
        let media = images + embeds.len();
        let paragraphs = doc.get_elements_by_tag(node, &["P"]).len();
        let media_rich =
            media > 0 && (media > paragraphs || text_length < media * thresholds.text_per_media);

        let remove = link_density > cutoff && (weight < 0.0 || class_weight < 0.0) && !media_rich;

        if remove && is_list && is_list_of_images(doc, node, images) {
            return false;
        }
        remove
    }

    /// Replace a table holding a single cell by that cell's content.
    fn collapse_single_cell_table(&self, doc: &mut Document, table: NodeId) {
        let patterns = self.patterns;
        let body = if dom_utils::has_single_tag_inside_element(doc, table, "TBODY", patterns) {
            doc.first_element_child(table).unwrap_or(table)
        } else {
            table
        };
        if !dom_utils::has_single_tag_inside_element(doc, body, "TR", patterns) {
            return;
        }
        let Some(row) = doc.first_element_child(body) else {
            return;
        };
        if !dom_utils::has_single_tag_inside_element(doc, row, "TD", patterns) {
            return;
        }
        let Some(cell) = doc.first_element_child(row) else {
            return;
        };
        let phrasing = doc
            .children(cell)
            .iter()
            .all(|child| dom_utils::is_phrasing_content(doc, *child));
        doc.set_tag(cell, if phrasing { "P" } else { "DIV" });
        doc.replace(table, cell);
    }
}

/// Remove, innermost first, every element under `root` accepted by `filter`.
fn remove_matching(doc: &mut Document, root: NodeId, filter: impl Fn(&Document, NodeId) -> bool) {
    for node in doc.get_elements_by_tag(root, &["*"]).into_iter().rev() {
        if filter(doc, node) {
            doc.detach(node);
        }
    }
}

/// Whether a list holds nothing but one image per item.
fn is_list_of_images(doc: &Document, list: NodeId, images: usize) -> bool {
    if doc
        .element_children(list)
        .into_iter()
        .any(|child| doc.element_children(child).len() > 1)
    {
        return false;
    }
    images > 0 && images == doc.get_elements_by_tag(list, &["LI"]).len()
}

/// Layout tables are unwrapped by the cleaner, data tables are kept.
pub fn is_data_table(doc: &Document, table: NodeId) -> bool {
    match doc.attr(table, "role") {
        Some("presentation") => return false,
        Some("grid") => return true,
        _ => {}
    }
    if doc.attr(table, "datatable") == Some("0") {
        return false;
    }
    if doc.attr(table, "summary").is_some_and(|s| !s.is_empty()) {
        return true;
    }
    if let Some(caption) = doc.get_elements_by_tag(table, &["CAPTION"]).first() {
        if !doc.children(*caption).is_empty() {
            return true;
        }
    }
    if !doc
        .get_elements_by_tag(table, &["COL", "COLGROUP", "TFOOT", "THEAD", "TH"])
        .is_empty()
    {
        return true;
    }
    if !doc.get_elements_by_tag(table, &["TABLE"]).is_empty() {
        return false;
    }

    let (rows, columns) = dom_utils::get_row_and_column_count(doc, table);
    if rows == 1 || columns == 1 {
        return false;
    }
    if rows >= 10 || columns > 4 {
        return true;
    }
    rows * columns > 10
}

/// Strip presentational attributes below `root`, leaving SVG subtrees and
/// elements tagged with a pipeline class alone.
pub fn clean_styles(doc: &mut Document, root: NodeId) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if doc.has_tag(node, "SVG") {
            continue;
        }
        let preserved = doc
            .class_name(node)
            .split_whitespace()
            .any(|class| CLASSES_TO_PRESERVE.contains(&class));
        if !preserved {
            for attr in PRESENTATIONAL_ATTRIBUTES {
                doc.remove_attr(node, attr);
            }
            if doc.has_any_tag(node, &DEPRECATED_SIZE_ATTRIBUTE_ELEMS) {
                doc.remove_attr(node, "width");
                doc.remove_attr(node, "height");
            }
        }
        stack.extend(doc.element_children(node));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn article(html: &str) -> (Document, NodeId) {
        let doc = Document::parse(&format!("<body><div id='article'>{html}</div></body>"));
        let root = doc.first_element_child(doc.body().unwrap()).unwrap();
        (doc, root)
    }

    fn cleaned(html: &str, flags: ParseFlags, title: &str) -> String {
        let (mut doc, root) = article(html);
        let options = ReadabilityOptions::default();
        let mut cleaner = ArticleCleaner::new(Patterns::shared(), &options, flags, title);
        cleaner.prep_article(&mut doc, root);
        doc.inner_html(root)
    }

    const PROSE: &str = "Plain prose without any links that keeps going for a while so the block has text.";

    #[test]
    fn detects_data_tables() {
        let (doc, root) = article(
            "<table><tr><th>a</th></tr></table>\
             <table role='presentation'><tr><th>a</th></tr></table>\
             <table><tr><td>a</td></tr><tr><td>b</td></tr></table>\
             <table role='grid'><tr><td>a</td></tr></table>\
             <table><tr><td>1</td><td>2</td><td>3</td><td>4</td><td>5</td></tr><tr><td>6</td><td>7</td><td>8</td><td>9</td><td>0</td></tr></table>",
        );
        let tables = doc.element_children(root);
        let flags: Vec<bool> = tables.iter().map(|t| is_data_table(&doc, *t)).collect();
        assert_eq!(flags, vec![true, false, false, true, true]);
    }

    #[test]
    fn removes_link_farms_but_keeps_prose() {
        let html = format!(
            "<div><a href='/a'>Home page link</a> <a href='/b'>Another link here</a></div><div><p>{PROSE}</p></div>"
        );
        let out = cleaned(&html, ParseFlags::all(), "");
        assert_eq!(out, format!("<div><p>{PROSE}</p></div>"));
    }

    #[test]
    fn conditional_cleaning_needs_its_flag() {
        let html = "<div><a href='/a'>Home page link</a></div>";
        let out = cleaned(html, ParseFlags::STRIP_UNLIKELYS | ParseFlags::WEIGHT_CLASSES, "");
        assert_eq!(out, html.replace('\'', "\""));
    }

    #[test]
    fn data_tables_survive_link_density() {
        let html = "<table><thead><tr><th>Name</th></tr></thead><tr><td><a href='/x'>linked cell</a></td></tr></table>";
        let out = cleaned(html, ParseFlags::all(), "");
        assert!(out.contains("<table>"));
    }

    #[test]
    fn list_of_images_is_kept() {
        let html = "<ul><li><a href='/1'><img src='1.jpg'></a></li><li><a href='/2'><img src='2.jpg'></a></li></ul>";
        let out = cleaned(html, ParseFlags::all(), "");
        assert!(out.contains("<ul>"));
    }

    #[test]
    fn removes_duplicate_title_heading_and_retags_h1() {
        let html = format!("<h1>The Big Story</h1><h1>Another Section</h1><p>{PROSE}</p>");
        let out = cleaned(&html, ParseFlags::all(), "The Big Story");
        assert_eq!(out, format!("<h2>Another Section</h2><p>{PROSE}</p>"));
    }

    #[test]
    fn embeds_keep_allowed_videos_only() {
        let html = "<iframe src='https://www.youtube.com/embed/x'></iframe><iframe src='https://ads.example.com/'></iframe>";
        let out = cleaned(html, ParseFlags::empty(), "");
        assert_eq!(out, r#"<iframe src="https://www.youtube.com/embed/x"></iframe>"#);
    }

    #[test]
    fn removes_share_widgets_and_forms_controls() {
        let html = format!(
            "<div><p>{PROSE}</p><div class='share-buttons'>Share this</div><button>Go</button></div>"
        );
        let out = cleaned(&html, ParseFlags::empty(), "");
        assert_eq!(out, format!("<div><p>{PROSE}</p></div>"));
    }

    #[test]
    fn collapses_single_cell_tables_and_empty_paragraphs() {
        let out = cleaned(
            "<table><tbody><tr><td>only <b>cell</b></td></tr></tbody></table><p> </p><br><p>x</p>",
            ParseFlags::empty(),
            "",
        );
        assert_eq!(out, "<p>only <b>cell</b></p><p>x</p>");
    }

    #[test]
    fn strips_presentational_attributes_outside_svg() {
        let (mut doc, root) = article(
            "<p style='color:red' align='center' class='x'>a</p><table width='10'><tr><td>b</td></tr></table><svg style='fill:red'></svg>",
        );
        clean_styles(&mut doc, root);
        let children = doc.element_children(root);
        assert_eq!(doc.attrs(children[0]).len(), 1);
        assert!(!doc.has_attr(children[1], "width"));
        assert_eq!(doc.attr(children[2], "style"), Some("fill:red"));
    }
}
