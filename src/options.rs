//! Parser configuration.
//!
//! [`ReadabilityOptions`] holds the switches a caller usually touches:
//! element limit, candidate count, length threshold, class handling.
//! [`Thresholds`] holds the heuristic constants every stage reads.
//!
//! ```rust
//! use readability_arena::{Readability, ReadabilityOptions};
//!
//! let options = ReadabilityOptions::builder()
//!     .char_threshold(250)
//!     .classes_to_preserve(vec!["caption".to_string()])
//!     .build();
//! assert_eq!(options.char_threshold, 250);
//!
//! let _reader = Readability::new("<p>Hi</p>", None, Some(options)).unwrap();
//! ```

use crate::constants::DEFAULT_TAGS_TO_SCORE;
use regex::Regex;

/// Caller-facing switches. Build with [`ReadabilityOptions::builder`] or
/// start from `default()` and override fields.
#[derive(Debug, Clone)]
pub struct ReadabilityOptions {
    /// Element count above which parsing fails with
    /// [`ReadabilityError::TooManyElements`](crate::ReadabilityError::TooManyElements).
    /// `0` means unlimited, the default.
    pub max_elems_to_parse: usize,

    /// How many ranked containers compete for the top spot (5).
    pub nb_top_candidates: usize,

    /// Text length an attempt must reach before relaxation stops (500).
    pub char_threshold: usize,

    /// Class names that survive class stripping (`page`).
    pub classes_to_preserve: Vec<String>,

    /// Uppercase tag names whose text feeds the paragraph scores.
    pub tags_to_score: Vec<String>,

    /// Leave every class attribute untouched.
    pub keep_classes: bool,

    /// Ignore `application/ld+json` blocks when reading metadata.
    pub disable_json_ld: bool,

    /// Replaces the built-in video host pattern (YouTube, Vimeo,
    /// Dailymotion, Twitch, Wikimedia and friends) when set.
    pub allowed_video_regex: Option<Regex>,

    /// Shifts every link density cutoff in the cleaner. Positive values
    /// tolerate more links.
    pub link_density_modifier: f64,

    pub thresholds: Thresholds,
}

impl Default for ReadabilityOptions {
    fn default() -> Self {
        Self {
            max_elems_to_parse: 0,
            nb_top_candidates: 5,
            char_threshold: 500,
            classes_to_preserve: vec!["page".to_string()],
            tags_to_score: DEFAULT_TAGS_TO_SCORE
                .iter()
                .map(|tag| tag.to_string())
                .collect(),
            keep_classes: false,
            disable_json_ld: false,
            allowed_video_regex: None,
            link_density_modifier: 0.0,
            thresholds: Thresholds::default(),
        }
    }
}

impl ReadabilityOptions {
    pub fn builder() -> ReadabilityOptionsBuilder {
        ReadabilityOptionsBuilder::default()
    }

    /// Whether `tag` (uppercase) is one of the scored tags.
    pub(crate) fn scores_tag(&self, tag: &str) -> bool {
        self.tags_to_score
            .iter()
            .any(|scored| scored.eq_ignore_ascii_case(tag))
    }
}

/// Every heuristic constant of the pipeline.
///
/// The scorer, selector, cleaner and metadata extractor all read from this
/// struct; none of them keeps a private copy of a threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    /// Paragraphs with less text are not scored.
    pub min_paragraph_length: usize,
    /// How many ancestors receive a paragraph's score. `0` walks up to the root.
    pub max_score_ancestors: usize,
    /// Points per text length unit in a paragraph score.
    pub length_bonus_unit: usize,
    /// Cap on the length bonus.
    pub max_length_bonus: f64,
    /// Weight of a positive or negative class/id match.
    pub class_weight: f64,
    /// Lower bound of the sibling inclusion threshold.
    pub sibling_score_floor: f64,
    /// Fraction of the top score a sibling needs, also the same-class bonus.
    pub sibling_score_ratio: f64,
    /// Minimum text length for a `<p>` sibling merged on text alone.
    pub sibling_paragraph_length: usize,
    /// Link density a `<p>` sibling must stay under.
    pub sibling_link_density: f64,
    /// Link density under which a div holding one `<p>` is replaced by it.
    pub div_to_p_link_density: f64,
    /// Score ratio for alternative candidates considered for promotion.
    pub alternative_candidate_ratio: f64,
    /// Alternative candidates that must share an ancestor to promote it.
    pub min_shared_candidates: usize,
    /// Link density above which the cleaner may remove an element.
    pub clean_link_density: f64,
    /// Same as `clean_link_density` for list and table-like elements.
    pub clean_list_link_density: f64,
    /// Weight penalty per unit of link density.
    pub link_density_penalty: f64,
    /// Elements with at least this many commas are never cleaned conditionally.
    pub clean_comma_count: usize,
    /// Characters of text one image or embed can account for.
    pub text_per_media: usize,
    /// Heading text density at which a block is kept as a heading group.
    pub heading_density: f64,
    /// Word overlap at which a heading duplicates the title.
    pub title_similarity: f64,
    /// Word overlap below which `<title>` and `<h1>` are considered unrelated.
    pub title_divergence: f64,
    /// Longest accepted byline.
    pub max_byline_length: usize,
    /// Shortest paragraph used as an excerpt.
    pub min_excerpt_length: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_paragraph_length: 25,
            max_score_ancestors: 0,
            length_bonus_unit: 100,
            max_length_bonus: 3.0,
            class_weight: 25.0,
            sibling_score_floor: 10.0,
            sibling_score_ratio: 0.2,
            sibling_paragraph_length: 80,
            sibling_link_density: 0.25,
            div_to_p_link_density: 0.25,
            alternative_candidate_ratio: 0.75,
            min_shared_candidates: 3,
            clean_link_density: 0.5,
            clean_list_link_density: 0.75,
            link_density_penalty: 25.0,
            clean_comma_count: 10,
            text_per_media: 100,
            heading_density: 0.9,
            title_similarity: 0.75,
            title_divergence: 0.5,
            max_byline_length: 100,
            min_excerpt_length: 25,
        }
    }
}

/// Chained setters over [`ReadabilityOptions::default`].
#[derive(Debug, Clone, Default)]
pub struct ReadabilityOptionsBuilder {
    options: ReadabilityOptions,
}

impl ReadabilityOptionsBuilder {
    /// Fail with `TooManyElements` above `max` elements. `0` disables the check.
    pub fn max_elems_to_parse(mut self, max: usize) -> Self {
        self.options.max_elems_to_parse = max;
        self
    }

    pub fn nb_top_candidates(mut self, count: usize) -> Self {
        self.options.nb_top_candidates = count;
        self
    }

    pub fn char_threshold(mut self, chars: usize) -> Self {
        self.options.char_threshold = chars;
        self
    }

    pub fn classes_to_preserve(mut self, classes: Vec<String>) -> Self {
        self.options.classes_to_preserve = classes;
        self
    }

    /// Tag names are matched case-insensitively.
    pub fn tags_to_score(mut self, tags: Vec<String>) -> Self {
        self.options.tags_to_score = tags.iter().map(|t| t.to_ascii_uppercase()).collect();
        self
    }

    pub fn keep_classes(mut self, keep: bool) -> Self {
        self.options.keep_classes = keep;
        self
    }

    pub fn disable_json_ld(mut self, disable: bool) -> Self {
        self.options.disable_json_ld = disable;
        self
    }

    /// Embeds whose URL matches `videos` survive cleaning.
    pub fn allowed_video_regex(mut self, videos: Regex) -> Self {
        self.options.allowed_video_regex = Some(videos);
        self
    }

    pub fn link_density_modifier(mut self, modifier: f64) -> Self {
        self.options.link_density_modifier = modifier;
        self
    }

    pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
        self.options.thresholds = thresholds;
        self
    }

    pub fn build(self) -> ReadabilityOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_falls_back_to_defaults() {
        let options = ReadabilityOptions::builder().char_threshold(42).build();
        assert_eq!(options.char_threshold, 42);
        assert_eq!(options.nb_top_candidates, 5);
        assert_eq!(options.thresholds, Thresholds::default());
    }

    #[test]
    fn tags_to_score_are_case_insensitive() {
        let options = ReadabilityOptions::builder()
            .tags_to_score(vec!["p".to_string(), "Div".to_string()])
            .build();
        assert!(options.scores_tag("P"));
        assert!(options.scores_tag("DIV"));
        assert!(!options.scores_tag("TD"));
    }
}
