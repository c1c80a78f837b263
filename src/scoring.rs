//! Content scoring algorithms for determining article quality.
//!
//! Scores live in a [`ScoreMap`] owned by one extraction attempt rather than
//! on the nodes themselves, so a retry starts from a clean slate.

use crate::constants::{ParseFlags, Patterns};
use crate::dom::{Document, NodeId};
use crate::dom_utils;
use crate::options::Thresholds;
use std::collections::HashMap;

/// Readability state of one scored element.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Annotation {
    pub content_score: f64,
}

/// Annotations of the elements scored during one attempt.
#[derive(Debug, Clone, Default)]
pub struct ScoreMap {
    annotations: HashMap<NodeId, Annotation>,
    initialized: Vec<NodeId>,
}

impl ScoreMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self, id: NodeId) -> bool {
        self.annotations.contains_key(&id)
    }

    pub fn score(&self, id: NodeId) -> Option<f64> {
        self.annotations.get(&id).map(|a| a.content_score)
    }

    /// Overwrite the score of an annotated element.
    pub fn set_score(&mut self, id: NodeId, score: f64) {
        if let Some(annotation) = self.annotations.get_mut(&id) {
            annotation.content_score = score;
        }
    }

    fn add(&mut self, id: NodeId, delta: f64) {
        if let Some(annotation) = self.annotations.get_mut(&id) {
            annotation.content_score += delta;
        }
    }

    fn insert(&mut self, id: NodeId, score: f64) {
        self.annotations.insert(
            id,
            Annotation {
                content_score: score,
            },
        );
        self.initialized.push(id);
    }

    /// Annotated elements in the order they were initialized.
    pub fn nodes(&self) -> &[NodeId] {
        &self.initialized
    }
}

/// Score contribution of a tag on its own.
pub fn tag_base_score(tag: &str) -> f64 {
    match tag {
        "DIV" => 5.0,
        "PRE" | "TD" | "BLOCKQUOTE" => 3.0,
        "ADDRESS" | "OL" | "UL" | "DL" | "DD" | "DT" | "LI" | "FORM" => -3.0,
        "H1" | "H2" | "H3" | "H4" | "H5" | "H6" | "TH" => -5.0,
        _ => 0.0,
    }
}

/// Scores elements for one attempt with a fixed set of flags.
#[derive(Debug, Clone, Copy)]
pub struct NodeScorer<'a> {
    patterns: &'a Patterns,
    thresholds: &'a Thresholds,
    flags: ParseFlags,
}

impl<'a> NodeScorer<'a> {
    pub fn new(patterns: &'a Patterns, thresholds: &'a Thresholds, flags: ParseFlags) -> Self {
        Self {
            patterns,
            thresholds,
            flags,
        }
    }

    /// Class/id weight: one positive and one negative contribution at most,
    /// zero unless `WEIGHT_CLASSES` is active.
    pub fn class_weight(&self, doc: &Document, id: NodeId) -> f64 {
        if !self.flags.contains(ParseFlags::WEIGHT_CLASSES) {
            return 0.0;
        }

        let class = doc.class_name(id);
        let id_attr = doc.id_attr(id);
        let matches = |regex: &regex::Regex| {
            (!class.is_empty() && regex.is_match(class))
                || (!id_attr.is_empty() && regex.is_match(id_attr))
        };

        let mut weight = 0.0;
        if matches(&self.patterns.negative) {
            weight -= self.thresholds.class_weight;
        }
        if matches(&self.patterns.positive) {
            weight += self.thresholds.class_weight;
        }
        weight
    }

    /// Give an element its starting score. Does nothing if it already has one.
    ///
    /// Returns `true` when the element was annotated by this call.
    pub fn initialize_node(&self, doc: &Document, scores: &mut ScoreMap, id: NodeId) -> bool {
        if scores.is_initialized(id) {
            return false;
        }
        let Some(tag) = doc.tag_name(id) else {
            return false;
        };
        let score = tag_base_score(&tag) + self.class_weight(doc, id);
        scores.insert(id, score);
        true
    }

    /// Local score of a paragraph-like element: one point, one per comma and
    /// one per hundred characters up to three. `None` for too little text.
    pub fn paragraph_score(&self, doc: &Document, id: NodeId) -> Option<f64> {
        let text = dom_utils::get_inner_text(doc, id, self.patterns, true);
        let length = text.chars().count();
        if length < self.thresholds.min_paragraph_length {
            return None;
        }

        let commas = self.patterns.commas.find_iter(&text).count() as f64;
        let length_bonus = ((length / self.thresholds.length_bonus_unit.max(1)) as f64)
            .min(self.thresholds.max_length_bonus);
        Some(1.0 + commas + length_bonus)
    }

    /// Score a paragraph-like element and propagate the score to its ancestors.
    ///
    /// The element itself and its parent receive the full score, the
    /// grandparent half, and an ancestor `n` hops above the parent `1/(3n)`.
    /// Elements without an element parent are skipped, and the `<html>`
    /// element never receives a score.
    pub fn score_paragraph(&self, doc: &Document, scores: &mut ScoreMap, id: NodeId) -> Option<f64> {
        doc.parent_element(id)?;
        let score = self.paragraph_score(doc, id)?;

        let ancestors: Vec<NodeId> =
            dom_utils::get_node_ancestors(doc, id, self.thresholds.max_score_ancestors)
                .into_iter()
                .filter(|ancestor| doc.parent_element(*ancestor).is_some())
                .collect();
        if ancestors.is_empty() {
            return None;
        }

        self.initialize_node(doc, scores, id);
        scores.add(id, score);

        for (level, ancestor) in ancestors.into_iter().enumerate() {
            self.initialize_node(doc, scores, ancestor);
            let divider = match level {
                0 => 1.0,
                1 => 2.0,
                _ => level as f64 * 3.0,
            };
            scores.add(ancestor, score / divider);
        }

        Some(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_TEXT: &str = "This paragraph has plenty of words, a couple of commas, and enough length to be scored by the node scorer without trouble.";

    fn scorer(flags: ParseFlags) -> (&'static Patterns, Thresholds, ParseFlags) {
        (Patterns::shared(), Thresholds::default(), flags)
    }

    #[test]
    fn class_weight_positive_and_negative() {
        let (patterns, thresholds, flags) = scorer(ParseFlags::all());
        let scorer = NodeScorer::new(patterns, &thresholds, flags);
        let doc = Document::parse(
            r#"<body><div class="article">a</div><div class="sidebar">b</div><div id="main-content" class="comment">c</div></body>"#,
        );
        let divs = doc.element_children(doc.body().unwrap());
        assert_eq!(scorer.class_weight(&doc, divs[0]), 25.0);
        assert_eq!(scorer.class_weight(&doc, divs[1]), -25.0);
        assert_eq!(scorer.class_weight(&doc, divs[2]), 0.0);

        let unweighted = NodeScorer::new(patterns, &thresholds, ParseFlags::STRIP_UNLIKELYS);
        assert_eq!(unweighted.class_weight(&doc, divs[0]), 0.0);
    }

    #[test]
    fn base_scores_by_tag() {
        assert_eq!(tag_base_score("DIV"), 5.0);
        assert_eq!(tag_base_score("BLOCKQUOTE"), 3.0);
        assert_eq!(tag_base_score("LI"), -3.0);
        assert_eq!(tag_base_score("TH"), -5.0);
        assert_eq!(tag_base_score("P"), 0.0);
    }

    #[test]
    fn initialize_node_runs_once() {
        let (patterns, thresholds, flags) = scorer(ParseFlags::all());
        let scorer = NodeScorer::new(patterns, &thresholds, flags);
        let doc = Document::parse("<body><div>x</div></body>");
        let div = doc.first_element_child(doc.body().unwrap()).unwrap();
        let mut scores = ScoreMap::new();

        assert!(scorer.initialize_node(&doc, &mut scores, div));
        assert!(!scorer.initialize_node(&doc, &mut scores, div));
        assert_eq!(scores.score(div), Some(5.0));
        assert_eq!(scores.nodes().len(), 1);
    }

    #[test]
    fn paragraph_score_counts_commas_and_length() {
        let (patterns, thresholds, flags) = scorer(ParseFlags::all());
        let scorer = NodeScorer::new(patterns, &thresholds, flags);
        let text = format!("{}, {}", "a".repeat(200), "b".repeat(200));
        let doc = Document::parse(&format!("<body><p>{text}</p><p>short</p></body>"));
        let paragraphs = doc.element_children(doc.body().unwrap());
        // 1 base + 1 comma + min(402 / 100, 3)
        assert_eq!(scorer.paragraph_score(&doc, paragraphs[0]), Some(5.0));
        assert_eq!(scorer.paragraph_score(&doc, paragraphs[1]), None);
    }

    #[test]
    fn propagation_decays_with_distance() {
        let (patterns, thresholds, flags) = scorer(ParseFlags::all());
        let scorer = NodeScorer::new(patterns, &thresholds, flags);
        let doc = Document::parse(&format!(
            "<body><div><div><div><p>{LONG_TEXT}</p></div></div></div></body>"
        ));
        let body = doc.body().unwrap();
        let great_grandparent = doc.first_element_child(body).unwrap();
        let grandparent = doc.first_element_child(great_grandparent).unwrap();
        let parent = doc.first_element_child(grandparent).unwrap();
        let paragraph = doc.first_element_child(parent).unwrap();

        let mut scores = ScoreMap::new();
        let s = scorer.score_paragraph(&doc, &mut scores, paragraph).unwrap();

        let gained = |id| scores.score(id).unwrap() - tag_base_score("DIV");
        let close = |a: f64, b: f64| (a - b).abs() < 1e-9;
        assert_eq!(scores.score(paragraph), Some(s));
        assert!(close(gained(parent), s));
        assert!(close(gained(grandparent), s / 2.0));
        assert!(close(gained(great_grandparent), s / 6.0));
        assert!(close(scores.score(body).unwrap(), s / 9.0));
        assert!(!scores.is_initialized(doc.document_element().unwrap()));
    }

    #[test]
    fn ancestor_depth_limit_is_respected() {
        let patterns = Patterns::shared();
        let thresholds = Thresholds {
            max_score_ancestors: 1,
            ..Thresholds::default()
        };
        let scorer = NodeScorer::new(patterns, &thresholds, ParseFlags::all());
        let doc = Document::parse(&format!("<body><div><div><p>{LONG_TEXT}</p></div></div></body>"));
        let outer = doc.first_element_child(doc.body().unwrap()).unwrap();
        let inner = doc.first_element_child(outer).unwrap();
        let paragraph = doc.first_element_child(inner).unwrap();

        let mut scores = ScoreMap::new();
        scorer.score_paragraph(&doc, &mut scores, paragraph);
        assert!(scores.is_initialized(inner));
        assert!(!scores.is_initialized(outer));
    }
}
