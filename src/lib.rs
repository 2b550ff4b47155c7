//! # hdrcat
//!
//! Amalgamates a header-only library spread over many files into a single
//! drop-in header by inlining every quoted `#include "name"` that resolves to a
//! file under the include root.
//!
//! ## Behavior
//!
//! - Only lines that are exactly `#include "name"` followed by a newline are directives
//! - Local includes are expanded recursively between provenance markers
//! - Includes with no local file are passed through unchanged
//! - Every include name is handled once per run; later repeats are dropped
//! - The result is wrapped in a fixed include guard
//!
//! ## Usage
//!
//! ### As a Library
//!
//! ```no_run
//! use hdrcat::{AmalgamateConfig, generate};
//! use std::path::Path;
//!
//! let config = AmalgamateConfig::for_repo(Path::new("/path/to/repo"));
//!
//! match generate(&config) {
//!     Ok(_) => println!("Generated {}", config.output.display()),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```
//!
//! ### As a CLI Tool
//!
//! ```bash
//! # Regenerate single_include/ from include/ in the current repository
//! hdrcat
//!
//! # Fail if the committed single header is stale
//! hdrcat --check
//!
//! # Show what would be expanded, passed through and skipped
//! hdrcat --list=json
//! ```

pub mod amalgamate;
pub mod error;
pub mod fs_utils;

// Re-export main types and functions for convenience
pub use amalgamate::{
    AmalgamateConfig, Amalgamation, Amalgamator, Report, ReportEntry, amalgamate, check,
    generate, parse_include,
};
pub use error::{HdrcatError, Result};
