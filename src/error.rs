//! Error types for the readability library.

use thiserror::Error;

/// Result type alias for readability operations
pub type Result<T> = std::result::Result<T, ReadabilityError>;

/// Errors that can occur during readability parsing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReadabilityError {
    /// The base URL given to [`Readability::new`](crate::Readability::new) is not absolute.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The document has more elements than `max_elems_to_parse` allows.
    #[error("Document has {count} elements, more than the limit of {max}")]
    TooManyElements { count: usize, max: usize },

    /// No attempt produced any article text.
    #[error("No article content found in document")]
    NoArticleFound,

    /// A JSON-LD block could not be used. Such blocks are skipped, so this
    /// never escapes [`Readability::parse`](crate::Readability::parse).
    #[error("JSON-LD parsing error: {0}")]
    JsonLd(String),
}
