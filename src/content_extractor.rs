//! Main content extraction: the candidate walk, ranking, sibling merge and
//! the retry loop around them.
//!
//! Each attempt runs against its own clone of the preprocessed document, so
//! whatever an attempt strips or rewrites never leaks into the next one.
//! Attempts relax [`ParseFlags`] in [`RELAXATION_ORDER`] until the content
//! reaches `char_threshold`; when none does, the longest attempt wins.

use crate::cleaner::ArticleCleaner;
use crate::constants::{
    ParseFlags, Patterns, ALTER_TO_DIV_EXCEPTIONS, HEADING_TAGS, PAGE_WRAPPER_ID,
    RELAXATION_ORDER, UNLIKELY_ROLES,
};
use crate::dom::{Document, NodeId};
use crate::dom_utils;
use crate::error::{ReadabilityError, Result};
use crate::options::{ReadabilityOptions, Thresholds};
use crate::scoring::{NodeScorer, ScoreMap};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, trace};

/// Content found by [`ContentExtractor::grab_article`].
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    /// The attempt's copy of the document. `content` lives in its arena.
    pub document: Document,
    /// Detached `<div>` holding the page wrapper and the merged content.
    pub content: NodeId,
    /// Characters of normalized text in `content`.
    pub text_length: usize,
    /// Byline found in the page itself, if one was looked for.
    pub byline: Option<String>,
    /// Text direction declared around the top candidate.
    pub dir: Option<String>,
    /// Flags of the attempt that produced this content.
    pub flags: ParseFlags,
    /// Number of attempts made.
    pub attempts: usize,
    /// No attempt reached `char_threshold`; this is the longest one.
    pub below_threshold: bool,
}

/// Runs the candidate selection pipeline over a preprocessed document.
pub struct ContentExtractor<'a> {
    patterns: &'a Patterns,
    options: &'a ReadabilityOptions,
    title: &'a str,
    find_byline: bool,
}

impl<'a> ContentExtractor<'a> {
    /// `title` is used to drop headings repeating it. When `find_byline` is
    /// false the walk leaves byline-looking elements alone.
    pub fn new(
        patterns: &'a Patterns,
        options: &'a ReadabilityOptions,
        title: &'a str,
        find_byline: bool,
    ) -> Self {
        Self {
            patterns,
            options,
            title,
            find_byline,
        }
    }

    /// Extract the article, relaxing heuristics until enough text is found.
    pub fn grab_article(&self, source: &Document) -> Result<ExtractedContent> {
        if source.body().is_none() {
            return Err(ReadabilityError::NoArticleFound);
        }

        let mut flags = ParseFlags::all();
        let mut relaxations = RELAXATION_ORDER.iter();
        let mut best: Option<ExtractedContent> = None;
        let mut attempts = 0;

        loop {
            attempts += 1;
            let mut attempt = self.grab_with_flags(source, flags)?;
            attempt.attempts = attempts;
            debug!(
                ?flags,
                text_length = attempt.text_length,
                threshold = self.options.char_threshold,
                "extraction attempt"
            );

            if attempt.text_length >= self.options.char_threshold {
                return Ok(attempt);
            }
            if best
                .as_ref()
                .map_or(true, |best| attempt.text_length > best.text_length)
            {
                best = Some(attempt);
            }

            match relaxations.next() {
                Some(flag) => {
                    flags.remove(*flag);
                    debug!(?flags, "content below threshold, retrying");
                }
                None => break,
            }
        }

        match best {
            Some(mut best) if best.text_length > 0 => {
                debug!(
                    text_length = best.text_length,
                    "no attempt reached the threshold, keeping the longest"
                );
                best.attempts = attempts;
                best.below_threshold = true;
                Ok(best)
            }
            _ => Err(ReadabilityError::NoArticleFound),
        }
    }

    /// Run one attempt with fixed flags on a fresh copy of `source`.
    pub fn grab_with_flags(
        &self,
        source: &Document,
        flags: ParseFlags,
    ) -> Result<ExtractedContent> {
        let mut doc = source.clone();
        let body = doc.body().ok_or(ReadabilityError::NoArticleFound)?;
        let thresholds = &self.options.thresholds;
        let scorer = NodeScorer::new(self.patterns, thresholds, flags);

        let (elements_to_score, byline) = self.walk(&mut doc, flags);

        let mut scores = ScoreMap::new();
        let mut scored = HashSet::new();
        for element in elements_to_score {
            if scored.insert(element) {
                scorer.score_paragraph(&doc, &mut scores, element);
            }
        }

        let top_candidates = self.rank_candidates(&doc, &mut scores);
        let (top, created) = match top_candidates.first() {
            Some(&top) if !doc.has_tag(top, "BODY") => {
                let top = self.promote_candidate(&doc, &scorer, &mut scores, &top_candidates);
                (top, false)
            }
            _ => {
                // Body is too inclusive to be the article; wrap its content instead.
                let wrapper = doc.create_element("DIV");
                doc.move_children(body, wrapper);
                doc.append_child(body, wrapper);
                scorer.initialize_node(&doc, &mut scores, wrapper);
                (wrapper, true)
            }
        };
        trace!(score = ?scores.score(top), created, "top candidate");

        let dir = article_dir(&doc, top);
        let content = merge_siblings(&mut doc, &scores, top, self.patterns, thresholds);

        let mut cleaner = ArticleCleaner::new(self.patterns, self.options, flags, self.title);
        cleaner.prep_article(&mut doc, content);

        if created {
            doc.set_attr(top, "id", PAGE_WRAPPER_ID);
            doc.set_attr(top, "class", "page");
        } else {
            let page = doc.create_element("DIV");
            doc.set_attr(page, "id", PAGE_WRAPPER_ID);
            doc.set_attr(page, "class", "page");
            doc.move_children(content, page);
            doc.append_child(content, page);
        }

        let text_length = dom_utils::text_length(&doc, content, self.patterns);
        Ok(ExtractedContent {
            document: doc,
            content,
            text_length,
            byline,
            dir,
            flags,
            attempts: 1,
            below_threshold: false,
        })
    }

    /// Depth-first walk removing noise and collecting the elements to score.
    fn walk(&self, doc: &mut Document, flags: ParseFlags) -> (Vec<NodeId>, Option<String>) {
        let patterns = self.patterns;
        let strip_unlikelys = flags.contains(ParseFlags::STRIP_UNLIKELYS);
        let mut elements_to_score = Vec::new();
        let mut byline: Option<String> = None;
        let mut node = doc.document_element();

        while let Some(current) = node {
            let tag = doc.tag_name(current).unwrap_or_default();
            let match_string = format!("{} {}", doc.class_name(current), doc.id_attr(current));

            if !doc.is_visible(current) {
                trace!(%tag, "removing hidden element");
                node = dom_utils::remove_and_get_next(doc, current);
                continue;
            }

            if doc.attr(current, "aria-modal") == Some("true")
                && doc.attr(current, "role") == Some("dialog")
            {
                node = dom_utils::remove_and_get_next(doc, current);
                continue;
            }

            if self.find_byline && byline.is_none() {
                if let Some(found) = self.check_byline(doc, current, &match_string) {
                    trace!(byline = %found, "found byline in page");
                    byline = Some(found);
                    node = dom_utils::remove_and_get_next(doc, current);
                    continue;
                }
            }

            if strip_unlikelys {
                if patterns.unlikely_candidates.is_match(&match_string)
                    && !patterns.ok_maybe_its_a_candidate.is_match(&match_string)
                    && !dom_utils::has_ancestor_tag(doc, current, "TABLE", 0, |_| true)
                    && !dom_utils::has_ancestor_tag(doc, current, "CODE", 0, |_| true)
                    && tag != "BODY"
                    && tag != "HTML"
                    && tag != "A"
                {
                    trace!(%match_string, "removing unlikely candidate");
                    node = dom_utils::remove_and_get_next(doc, current);
                    continue;
                }

                if doc
                    .attr(current, "role")
                    .is_some_and(|role| UNLIKELY_ROLES.contains(&role))
                {
                    trace!(%match_string, "removing element with unlikely role");
                    node = dom_utils::remove_and_get_next(doc, current);
                    continue;
                }
            }

            let removable_when_empty = matches!(tag.as_str(), "DIV" | "SECTION" | "HEADER")
                || HEADING_TAGS.contains(&tag.as_str());
            if removable_when_empty && dom_utils::is_element_without_content(doc, current) {
                node = dom_utils::remove_and_get_next(doc, current);
                continue;
            }

            if self.options.scores_tag(&tag) {
                elements_to_score.push(current);
            }

            let mut current = current;
            if tag == "DIV" {
                wrap_phrasing_runs(doc, current);

                let single_paragraph =
                    dom_utils::has_single_tag_inside_element(doc, current, "P", patterns)
                        && dom_utils::get_link_density(doc, current, patterns)
                            < self.options.thresholds.div_to_p_link_density;
                if single_paragraph {
                    if let Some(paragraph) = doc.first_element_child(current) {
                        doc.replace(current, paragraph);
                        current = paragraph;
                        elements_to_score.push(paragraph);
                    }
                } else if !dom_utils::has_child_block_element(doc, current) {
                    doc.set_tag(current, "P");
                    elements_to_score.push(current);
                }
            }

            node = dom_utils::get_next_node(doc, current, false);
        }

        (elements_to_score, byline)
    }

    /// Text of `node` when it looks like a byline.
    fn check_byline(&self, doc: &Document, node: NodeId, match_string: &str) -> Option<String> {
        let rel_author = doc.attr(node, "rel") == Some("author");
        let itemprop_author = doc
            .attr(node, "itemprop")
            .is_some_and(|itemprop| itemprop.contains("author"));
        if !rel_author && !itemprop_author && !self.patterns.byline.is_match(match_string) {
            return None;
        }
        let text = doc.text_content(node);
        let text = text.trim();
        let length = text.chars().count();
        (length > 0 && length < self.options.thresholds.max_byline_length)
            .then(|| text.to_string())
    }

    /// Scale scores by link density and keep the best `nb_top_candidates`.
    ///
    /// Equal scores keep document order, earlier first.
    fn rank_candidates(&self, doc: &Document, scores: &mut ScoreMap) -> Vec<NodeId> {
        let order = doc.document_order();
        let mut candidates: Vec<NodeId> = scores
            .nodes()
            .iter()
            .copied()
            .filter(|id| order.contains_key(id))
            .collect();

        for &candidate in &candidates {
            if let Some(score) = scores.score(candidate) {
                let link_density = dom_utils::get_link_density(doc, candidate, self.patterns);
                let scaled = score * (1.0 - link_density);
                trace!(score = scaled, "candidate");
                scores.set_score(candidate, scaled);
            }
        }

        candidates.sort_by_key(|id| order[id]);
        candidates.sort_by(|a, b| {
            let a = scores.score(*a).unwrap_or(0.0);
            let b = scores.score(*b).unwrap_or(0.0);
            b.partial_cmp(&a).unwrap_or(Ordering::Equal)
        });
        candidates.truncate(self.options.nb_top_candidates.max(1));
        candidates
    }

    /// Move the top candidate up the tree when its ancestors hold the article
    /// better than it does.
    fn promote_candidate(
        &self,
        doc: &Document,
        scorer: &NodeScorer<'_>,
        scores: &mut ScoreMap,
        top_candidates: &[NodeId],
    ) -> NodeId {
        let thresholds = &self.options.thresholds;
        let mut top = top_candidates[0];
        let top_score = scores.score(top).unwrap_or(0.0);
        let is_body = |id: NodeId| doc.has_tag(id, "BODY");

        // Several near-best candidates sharing an ancestor point at that ancestor.
        let alternative_ancestors: Vec<Vec<NodeId>> = top_candidates[1..]
            .iter()
            .filter(|candidate| {
                top_score > 0.0
                    && scores.score(**candidate).unwrap_or(0.0) / top_score
                        >= thresholds.alternative_candidate_ratio
            })
            .map(|candidate| dom_utils::get_node_ancestors(doc, *candidate, 0))
            .collect();
        if alternative_ancestors.len() >= thresholds.min_shared_candidates {
            let mut parent = doc.parent_element(top);
            while let Some(ancestor) = parent.filter(|p| !is_body(*p)) {
                let sharing = alternative_ancestors
                    .iter()
                    .filter(|ancestors| ancestors.contains(&ancestor))
                    .count();
                if sharing >= thresholds.min_shared_candidates {
                    trace!("promoting shared ancestor of alternative candidates");
                    top = ancestor;
                    break;
                }
                parent = doc.parent_element(ancestor);
            }
        }
        scorer.initialize_node(doc, scores, top);

        // Climb while parents score higher; a parent far below ends the climb.
        let mut last_score = scores.score(top).unwrap_or(0.0);
        let score_threshold = last_score / 3.0;
        let mut parent = doc.parent_element(top);
        while let Some(ancestor) = parent.filter(|p| !is_body(*p)) {
            let Some(parent_score) = scores.score(ancestor) else {
                parent = doc.parent_element(ancestor);
                continue;
            };
            if parent_score < score_threshold {
                break;
            }
            if parent_score > last_score {
                top = ancestor;
                break;
            }
            last_score = parent_score;
            parent = doc.parent_element(ancestor);
        }

        // A parent holding nothing but the candidate is the same content.
        let mut parent = doc.parent_element(top);
        while let Some(ancestor) = parent.filter(|p| !is_body(*p)) {
            if doc.element_children(ancestor).len() != 1 {
                break;
            }
            top = ancestor;
            parent = doc.parent_element(ancestor);
        }
        scorer.initialize_node(doc, scores, top);
        top
    }
}

/// Wrap runs of phrasing content directly inside `div` into paragraphs.
fn wrap_phrasing_runs(doc: &mut Document, div: NodeId) {
    let mut paragraph: Option<NodeId> = None;
    let mut child = doc.first_child(div);
    while let Some(current) = child {
        let next = doc.next_sibling(current);
        if dom_utils::is_phrasing_content(doc, current) {
            match paragraph {
                Some(p) => doc.append_child(p, current),
                None if !dom_utils::is_whitespace(doc, current) => {
                    let p = doc.create_element("P");
                    doc.replace(current, p);
                    doc.append_child(p, current);
                    paragraph = Some(p);
                }
                None => {}
            }
        } else if let Some(p) = paragraph.take() {
            trim_trailing_whitespace(doc, p);
        }
        child = next;
    }
    if let Some(p) = paragraph {
        trim_trailing_whitespace(doc, p);
    }
}

fn trim_trailing_whitespace(doc: &mut Document, node: NodeId) {
    while let Some(last) = doc.last_child(node) {
        if !dom_utils::is_whitespace(doc, last) {
            break;
        }
        doc.detach(last);
    }
}

/// First `dir` attribute on the candidate's parent, the candidate, or the
/// parent's ancestors.
fn article_dir(doc: &Document, top: NodeId) -> Option<String> {
    let parent = doc.parent_element(top);
    parent
        .into_iter()
        .chain(std::iter::once(top))
        .chain(parent.map_or_else(Vec::new, |p| dom_utils::get_node_ancestors(doc, p, 0)))
        .find_map(|node| doc.attr(node, "dir").filter(|dir| !dir.is_empty()))
        .map(str::to_string)
}

/// Gather the top candidate and its qualifying siblings into a new `<div>`.
///
/// A sibling is kept when its score, plus a bonus for sharing the
/// candidate's class, reaches `max(sibling_score_floor, top × sibling_score_ratio)`,
/// or when it is a paragraph that reads like prose.
pub fn merge_siblings(
    doc: &mut Document,
    scores: &ScoreMap,
    top: NodeId,
    patterns: &Patterns,
    thresholds: &Thresholds,
) -> NodeId {
    let content = doc.create_element("DIV");
    let top_score = scores.score(top).unwrap_or(0.0);
    let sibling_threshold =
        (top_score * thresholds.sibling_score_ratio).max(thresholds.sibling_score_floor);
    let top_class = doc.class_name(top).to_string();

    let siblings = match doc.parent_element(top) {
        Some(parent) => doc.element_children(parent),
        None => vec![top],
    };

    for sibling in siblings {
        let append = sibling == top || {
            let bonus = if !top_class.is_empty() && doc.class_name(sibling) == top_class {
                top_score * thresholds.sibling_score_ratio
            } else {
                0.0
            };
            match scores.score(sibling) {
                Some(score) if score + bonus >= sibling_threshold => true,
                _ if doc.has_tag(sibling, "P") => {
                    is_prose_paragraph(doc, sibling, patterns, thresholds)
                }
                _ => false,
            }
        };
        if !append {
            continue;
        }

        trace!(score = ?scores.score(sibling), "appending sibling");
        if !doc.has_any_tag(sibling, &ALTER_TO_DIV_EXCEPTIONS) {
            doc.set_tag(sibling, "DIV");
        }
        doc.append_child(content, sibling);
    }
    content
}

fn is_prose_paragraph(
    doc: &Document,
    paragraph: NodeId,
    patterns: &Patterns,
    thresholds: &Thresholds,
) -> bool {
    let link_density = dom_utils::get_link_density(doc, paragraph, patterns);
    let text = dom_utils::get_inner_text(doc, paragraph, patterns, true);
    let length = text.chars().count();
    if length > thresholds.sibling_paragraph_length {
        link_density < thresholds.sibling_link_density
    } else {
        length > 0 && link_density == 0.0 && patterns.sentence_end.is_match(&text)
    }
}
