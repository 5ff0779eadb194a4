//! Error types for the page-map reader.
//!
//! Only the outer edges fail hard: opening the file, validating the
//! configuration and resolving schema objects. Page and payload decoding
//! never return these errors; they degrade to partial structures instead.

use thiserror::Error;

/// Result type alias for reader operations
pub type Result<T> = std::result::Result<T, InspectError>;

/// Errors that can occur while opening or querying a database file
#[derive(Error, Debug)]
pub enum InspectError {
    /// I/O error from the underlying file system
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Rejected configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Page number outside `[1, page_count]`
    #[error("Page {pgno} out of range (page count: {page_count})")]
    PageOutOfRange { pgno: u32, page_count: u32 },

    /// Table or index name not present in the schema
    #[error("Unknown schema object: {0}")]
    UnknownObject(String),

    /// Schema table could not be interpreted
    #[error("Schema error: {0}")]
    Schema(String),

    /// Stored CREATE statement could not be parsed
    #[error("SQL parse error: {0}")]
    SqlParse(#[from] sqlparser::parser::ParserError),
}

impl InspectError {
    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a schema error
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }
}
