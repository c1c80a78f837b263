//! Flags, pattern tables and tag lists shared by every stage of the pipeline.

use bitflags::bitflags;
use once_cell::sync::Lazy;
use regex::Regex;

bitflags! {
    /// Heuristics active during one extraction attempt.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ParseFlags: u32 {
        const STRIP_UNLIKELYS = 0x1;
        const WEIGHT_CLASSES = 0x2;
        const CLEAN_CONDITIONALLY = 0x4;
    }
}

/// Flags switched off one after another when an attempt yields too little text.
pub const RELAXATION_ORDER: [ParseFlags; 3] = [
    ParseFlags::STRIP_UNLIKELYS,
    ParseFlags::WEIGHT_CLASSES,
    ParseFlags::CLEAN_CONDITIONALLY,
];

/// Regular expressions used to classify class names, ids, text and URLs.
///
/// Built once and handed to the scorer, selector, cleaner and readerable
/// check, so every component reads the same table.
#[derive(Debug)]
pub struct Patterns {
    pub unlikely_candidates: Regex,
    pub ok_maybe_its_a_candidate: Regex,
    pub positive: Regex,
    pub negative: Regex,
    pub byline: Regex,
    pub normalize: Regex,
    pub videos: Regex,
    pub share_elements: Regex,
    pub tokenize: Regex,
    pub has_content: Regex,
    pub hash_url: Regex,
    pub srcset_url: Regex,
    pub b64_data_url: Regex,
    pub commas: Regex,
    pub json_ld_article_types: Regex,
    pub schema_org_context: Regex,
    pub ad_words: Regex,
    pub loading_words: Regex,
    pub display_none: Regex,
    pub visibility_hidden: Regex,
    pub image_extension: Regex,
    pub lazy_srcset_value: Regex,
    pub lazy_src_value: Regex,
    pub title_separator: Regex,
    pub sentence_end: Regex,
    pub meta_property: Regex,
    pub meta_name: Regex,
}

impl Patterns {
    pub fn new() -> Self {
        Self {
            unlikely_candidates: Regex::new(
                r"(?i)-ad-|ai2html|banner|breadcrumbs|combx|comment|community|cover-wrap|disqus|extra|footer|gdpr|header|legends|menu|related|remark|replies|rss|shoutbox|sidebar|skyscraper|social|sponsor|supplemental|ad-break|agegate|pagination|pager|popup|yom-remote",
            )
            .unwrap(),
            ok_maybe_its_a_candidate: Regex::new(r"(?i)and|article|body|column|content|main|shadow")
                .unwrap(),
            positive: Regex::new(
                r"(?i)article|body|content|entry|hentry|h-entry|main|page|pagination|post|text|blog|story",
            )
            .unwrap(),
            negative: Regex::new(
                r"(?i)-ad-|hidden|^hid$| hid$| hid |^hid |banner|combx|comment|com-|contact|foot|footer|footnote|gdpr|masthead|media|meta|outbrain|promo|related|scroll|share|shoutbox|sidebar|skyscraper|sponsor|shopping|tags|tool|widget",
            )
            .unwrap(),
            byline: Regex::new(r"(?i)byline|author|dateline|writtenby|p-author").unwrap(),
            normalize: Regex::new(r"\s{2,}").unwrap(),
            videos: Regex::new(
                r"(?i)//(www\.)?((dailymotion|youtube|youtube-nocookie|player\.vimeo|v\.qq)\.com|(archive|upload\.wikimedia)\.org|player\.twitch\.tv)",
            )
            .unwrap(),
            share_elements: Regex::new(r"(?i)(\b|_)(share|sharedaddy)(\b|_)").unwrap(),
            tokenize: Regex::new(r"\W+").unwrap(),
            has_content: Regex::new(r"\S$").unwrap(),
            hash_url: Regex::new(r"^#.+").unwrap(),
            srcset_url: Regex::new(r"(\S+)(\s+[\d.]+[xw])?(\s*(?:,|$))").unwrap(),
            b64_data_url: Regex::new(r"(?i)^data:\s*([^\s;,]+)\s*;\s*base64\s*,").unwrap(),
            commas: Regex::new(r"[,،﹐︐︑⹁⸴⸲，]").unwrap(),
            json_ld_article_types: Regex::new(
                r"^(?:Article|AdvertiserContentArticle|NewsArticle|AnalysisNewsArticle|AskPublicNewsArticle|BackgroundNewsArticle|OpinionNewsArticle|ReportageNewsArticle|ReviewNewsArticle|Report|SatiricalArticle|ScholarlyArticle|MedicalScholarlyArticle|SocialMediaPosting|BlogPosting|LiveBlogPosting|DiscussionForumPosting|TechArticle|APIReference)$",
            )
            .unwrap(),
            schema_org_context: Regex::new(r"^https?://schema\.org/?$").unwrap(),
            ad_words: Regex::new(
                r"(?i)^(ad(vertising|vertisement)?|pub(licité)?|werb(ung)?|广告|Реклама|Anuncio)$",
            )
            .unwrap(),
            loading_words: Regex::new(
                r"(?i)^((loading|正在加载|Загрузка|chargement|cargando)(…|\.\.\.)?)$",
            )
            .unwrap(),
            display_none: Regex::new(r"(?i)display\s*:\s*none").unwrap(),
            visibility_hidden: Regex::new(r"(?i)visibility\s*:\s*hidden").unwrap(),
            image_extension: Regex::new(r"(?i)\.(jpg|jpeg|png|webp)").unwrap(),
            lazy_srcset_value: Regex::new(r"(?i)\.(jpg|jpeg|png|webp)\s+\d").unwrap(),
            lazy_src_value: Regex::new(r"(?i)^\s*\S+\.(jpg|jpeg|png|webp)\S*\s*$").unwrap(),
            title_separator: Regex::new(r"\s+[|\-–—\\/>»]\s+|:\s+").unwrap(),
            sentence_end: Regex::new(r"\.( |$)").unwrap(),
            meta_property: Regex::new(
                r"(?i)\s*(article|dc|dcterm|og|twitter)\s*:\s*(author|creator|description|published_time|title|site_name)\s*",
            )
            .unwrap(),
            meta_name: Regex::new(
                r"(?i)^\s*(?:(dc|dcterm|og|twitter|parsely|weibo:(article|webpage))\s*[-\.:]\s*)?(author|creator|pub-date|description|title|site_name)\s*$",
            )
            .unwrap(),
        }
    }

    /// Process-wide table, compiled on first use.
    pub fn shared() -> &'static Patterns {
        &PATTERNS
    }
}

impl Default for Patterns {
    fn default() -> Self {
        Self::new()
    }
}

static PATTERNS: Lazy<Patterns> = Lazy::new(Patterns::new);

/// Tags scored during the candidate walk unless overridden by options.
pub const DEFAULT_TAGS_TO_SCORE: [&str; 9] = ["SECTION", "H2", "H3", "H4", "H5", "H6", "P", "TD", "PRE"];

pub const UNLIKELY_ROLES: [&str; 7] = [
    "menu",
    "menubar",
    "complementary",
    "navigation",
    "alert",
    "alertdialog",
    "dialog",
];

pub const DIV_TO_P_ELEMS: [&str; 9] = [
    "BLOCKQUOTE", "DL", "DIV", "IMG", "OL", "P", "PRE", "TABLE", "UL",
];

/// Tags a merged sibling keeps; anything else is retagged `DIV`.
pub const ALTER_TO_DIV_EXCEPTIONS: [&str; 4] = ["DIV", "ARTICLE", "SECTION", "P"];

pub const PRESENTATIONAL_ATTRIBUTES: [&str; 12] = [
    "align",
    "background",
    "bgcolor",
    "border",
    "cellpadding",
    "cellspacing",
    "frame",
    "hspace",
    "rules",
    "style",
    "valign",
    "vspace",
];

pub const DEPRECATED_SIZE_ATTRIBUTE_ELEMS: [&str; 5] = ["TABLE", "TH", "TD", "HR", "PRE"];

// CANVAS, IFRAME, SVG and VIDEO are phrasing content too, but they tend to be
// removed once wrapped into paragraphs, so they are left out.
pub const PHRASING_ELEMS: [&str; 39] = [
    "ABBR", "AUDIO", "B", "BDO", "BR", "BUTTON", "CITE", "CODE", "DATA", "DATALIST", "DFN", "EM",
    "EMBED", "I", "IMG", "INPUT", "KBD", "LABEL", "MARK", "MATH", "METER", "NOSCRIPT", "OBJECT",
    "OUTPUT", "PROGRESS", "Q", "RUBY", "SAMP", "SCRIPT", "SELECT", "SMALL", "SPAN", "STRONG",
    "SUB", "SUP", "TEXTAREA", "TIME", "VAR", "WBR",
];

/// Classes the pipeline assigns itself.
pub const CLASSES_TO_PRESERVE: [&str; 1] = ["page"];

/// Elements pruned by the conditional cleaner, in the order they are visited.
/// Containers come last so they are judged after their lists and paragraphs.
pub const CONDITIONAL_CLEAN_TAGS: [&str; 8] =
    ["FORM", "FIELDSET", "TABLE", "UL", "LI", "P", "SELECT", "DIV"];

/// Elements always removed from the article unless they embed an allowed video.
pub const EMBED_TAGS: [&str; 3] = ["OBJECT", "EMBED", "IFRAME"];

pub const HEADING_TAGS: [&str; 6] = ["H1", "H2", "H3", "H4", "H5", "H6"];

/// Named entities unescaped in text and metadata.
pub const HTML_ESCAPE_MAP: [(&str, &str); 5] = [
    ("lt", "<"),
    ("gt", ">"),
    ("amp", "&"),
    ("quot", "\""),
    ("apos", "'"),
];

/// Id given to the wrapper of the extracted content.
pub const PAGE_WRAPPER_ID: &str = "readability-page-1";
