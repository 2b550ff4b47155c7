use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for hdrcat operations
#[derive(Error, Debug)]
pub enum HdrcatError {
    /// IO error without a more specific path attached
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Root source or an expanded header is missing or not a regular file
    #[error("Source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// Reading a source file failed after it was resolved
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Output destination could not be written
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An include directive names a file with bytes that are not UTF-8
    #[error("Include name is not valid UTF-8 at {path}:{line}")]
    InvalidIncludeName { path: PathBuf, line: usize },

    /// Include root is missing or not a directory
    #[error("Include root not found: {path}")]
    IncludeRootNotFound { path: PathBuf },

    /// Guard token cannot be used as a preprocessor identifier
    #[error("Invalid include guard token: {guard:?}")]
    InvalidGuard { guard: String },

    /// Existing output differs from a fresh amalgamation
    #[error("Output is out of date: {path}")]
    OutOfDate { path: PathBuf },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HdrcatError>;
