//! Error types for chapterize operations.

use thiserror::Error;

/// Errors that can occur while reading, standardizing or writing a package.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid EPUB: {0}")]
    InvalidEpub(String),

    #[error("Invalid navigation document: {0}")]
    InvalidNav(String),

    #[error("Missing required element: {0}")]
    MissingElement(String),

    /// A navigation entry names a fragment that no element in its source
    /// document carries as `id` or `name`.
    #[error("Navigation target missing: {path}#{fragment}")]
    NavTargetMissing { path: String, fragment: String },
}

pub type Result<T> = std::result::Result<T, Error>;
