//! # readability-arena
//!
//! Reader-mode article extraction: given a full web page, find the main
//! article and drop navigation, advertisements, comments and other clutter.
//!
//! ## Overview
//!
//! The page is parsed with `scraper` and its `ego_tree` arena is wrapped in a
//! mutable [`dom::Document`]. The extraction pipeline scores paragraphs, ranks
//! container elements, merges related siblings and cleans the winning
//! subtree. Metadata (title, author, description, site name, language,
//! publication date) comes from JSON-LD, `<meta>` tags and the page itself.
//!
//! ## Key Features
//!
//! - **Content Extraction**: scoring and candidate selection over the whole page
//! - **Retries**: strict heuristics are relaxed one by one when too little text is found
//! - **Metadata Extraction**: JSON-LD, OpenGraph, Twitter Cards, Dublin Core, Parse.ly
//! - **Configurable**: every heuristic constant lives in [`Thresholds`]
//! - **Pre-flight Check**: [`is_probably_readerable`] without a full parse
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use readability_arena::{Readability, ReadabilityOptions};
//!
//! let html = std::fs::read_to_string("page.html").unwrap();
//! let url = "https://example.com/article";
//!
//! let options = ReadabilityOptions::default();
//! let article = Readability::new(&html, Some(url), Some(options))?.parse()?;
//!
//! println!("Title: {:?}", article.title);
//! println!("Author: {:?}", article.byline);
//! println!("Content: {:?}", article.content);
//! # Ok::<(), readability_arena::ReadabilityError>(())
//! ```
//!
//! ## Custom Options
//!
//! ```rust
//! use readability_arena::{Readability, ReadabilityOptions, Thresholds};
//!
//! let options = ReadabilityOptions::builder()
//!     .char_threshold(300)
//!     .nb_top_candidates(10)
//!     .keep_classes(true)
//!     .thresholds(Thresholds {
//!         clean_link_density: 0.4,
//!         ..Thresholds::default()
//!     })
//!     .build();
//!
//! let readability = Readability::new("<html></html>", None, Some(options)).unwrap();
//! ```
//!
//! ## Pre-flight Check
//!
//! ```rust
//! use readability_arena::is_probably_readerable;
//!
//! let html = "<html><body><nav>Home</nav></body></html>";
//! assert!(!is_probably_readerable(html, None));
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use readability_arena::{Readability, ReadabilityError};
//!
//! match Readability::new("<html></html>", Some("not a valid url"), None) {
//!     Ok(_) => unreachable!(),
//!     Err(ReadabilityError::InvalidUrl(url)) => eprintln!("Invalid URL: {}", url),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```
//!
//! A page that never yields `char_threshold` characters is not an error:
//! the longest attempt is returned with [`Article::below_threshold`] set.
//!
//! ## Logging
//!
//! Attempt-level decisions are logged with `tracing` at `debug`, per-node
//! decisions at `trace`. Install any subscriber to see them.

mod article;
mod cleaner;
mod constants;
mod content_extractor;
pub mod dom;
mod dom_utils;
mod error;
mod metadata;
mod options;
mod post_processor;
mod preprocessor;
mod readability;
mod readerable;
mod scoring;
mod utils;

// Public exports
pub use article::Article;
pub use error::{ReadabilityError, Result};
pub use options::{ReadabilityOptions, ReadabilityOptionsBuilder, Thresholds};
pub use readability::Readability;
pub use readerable::{is_probably_readerable, ReaderableOptions};
