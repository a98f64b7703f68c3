//! Error types for tebeo operations.
//!
//! This module defines the main error type [`TebeoError`] which covers every
//! failure the scraping, generation and injection pipeline can report.
//!
//! Parsing a results page never fails on a single bad fragment: those are
//! dropped and logged. Errors are reserved for conditions that abort a whole
//! operation.
//!
//! # Example
//!
//! ```rust
//! use tebeo_core::{TebeoError, Result};
//!
//! fn require_slug(slug: &str) -> Result<&str> {
//!     if slug.is_empty() {
//!         return Err(TebeoError::InvalidUrl("empty slug".to_string()));
//!     }
//!     Ok(slug)
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for tebeo operations.
///
/// # Example
///
/// ```rust
/// use tebeo_core::{TebeoError, parse_issue};
///
/// match parse_issue("<html><body></body></html>") {
///     Ok(record) => println!("{} #{}", record.series, record.number),
///     Err(TebeoError::UnparsableDetail(missing)) => println!("missing {missing}"),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum TebeoError {
    /// The page could not be fetched.
    ///
    /// Covers DNS and connection failures, timeouts and non-success HTTP
    /// statuses other than 404. Never retried inside the core.
    #[error("Source not reachable ({url}): {reason}")]
    UnreachableSource { url: String, reason: String },

    /// The fetch succeeded but produced no matching records.
    #[error("Nothing found for {0}")]
    NotFound(String),

    /// A detail page lacks the identity fields (series, number).
    ///
    /// Losing any other field is not an error; it is left unknown.
    #[error("Unparsable detail page: missing {0}")]
    UnparsableDetail(String),

    /// The target file is not a zip-format container.
    ///
    /// The archive is left untouched.
    #[error("Malformed archive {}: {reason}", path.display())]
    MalformedArchive { path: PathBuf, reason: String },

    /// An I/O error while staging or committing a new archive.
    ///
    /// The original archive is left untouched.
    #[error("Failed to write archive {}: {source}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid URL or slug provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTML query errors, typically an invalid CSS selector.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// File not found.
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Other I/O errors (reading saved pages or documents).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for TebeoError.
pub type Result<T> = std::result::Result<T, TebeoError>;
