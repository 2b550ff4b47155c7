use crate::error::{HdrcatError, Result};
use crate::fs_utils::{
    normalize_path, read_source, resolve_include_path, unreferenced_headers, write_output,
};
use serde::Serialize;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Guard bracketing the amalgamated header. Generated once; downstream
/// consumers depend on it never changing.
pub const DEFAULT_GUARD: &str =
    "TORREBIS_BENCODE_TORREBIS_BENCODE_H_3440b2d414bd44d2a62019070eafc1eb_";

/// Include root, relative to the repository root
pub const DEFAULT_INCLUDE_DIR: &str = "include";

/// Root source, relative to the include root
pub const DEFAULT_SOURCE: &str = "torrebis_bencode/torrebis_bencode.h";

/// Amalgamated output, relative to the repository root
pub const DEFAULT_OUTPUT: &str = "single_include/torrebis_bencode.h";

const INCLUDE_PREFIX: &[u8] = b"#include \"";
const INCLUDE_SUFFIX: &[u8] = b"\"\n";

/// Configuration for one amalgamation run
#[derive(Debug, Clone)]
pub struct AmalgamateConfig {
    /// Directory that quoted include names are resolved against
    pub include_root: PathBuf,
    /// Entry point, as an include name relative to `include_root`
    pub source: String,
    /// File that receives the amalgamation
    pub output: PathBuf,
    /// Token used in the `#ifndef`/`#define`/`#endif` guard
    pub guard: String,
}

impl Default for AmalgamateConfig {
    fn default() -> Self {
        let repo_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::for_repo(&repo_root)
    }
}

impl AmalgamateConfig {
    /// Default layout rooted at `repo_root`
    pub fn for_repo(repo_root: &Path) -> Self {
        Self {
            include_root: repo_root.join(DEFAULT_INCLUDE_DIR),
            source: DEFAULT_SOURCE.to_string(),
            output: repo_root.join(DEFAULT_OUTPUT),
            guard: DEFAULT_GUARD.to_string(),
        }
    }

    /// Resolved path of the root source
    pub fn source_path(&self) -> PathBuf {
        resolve_include_path(&self.include_root, &self.source)
    }

    /// Checks the configuration before any file is touched
    ///
    /// # Errors
    ///
    /// - `HdrcatError::IncludeRootNotFound` if the include root isn't a directory.
    /// - `HdrcatError::InvalidGuard` if the guard is empty or contains whitespace.
    pub fn validate(&self) -> Result<()> {
        if !self.include_root.is_dir() {
            return Err(HdrcatError::IncludeRootNotFound {
                path: self.include_root.clone(),
            });
        }

        if self.guard.is_empty() || self.guard.chars().any(char::is_whitespace) {
            return Err(HdrcatError::InvalidGuard {
                guard: self.guard.clone(),
            });
        }

        Ok(())
    }
}

/// What happened to a single include directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ReportEntry {
    /// Resolved to a local file and inlined
    Expand { name: String, path: String },
    /// No local file; directive emitted unchanged
    Pass { name: String },
    /// Name already handled earlier in the run; nothing emitted
    Skip { name: String, from: String },
}

/// Record of one amalgamation run, in traversal order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub source: String,
    pub entries: Vec<ReportEntry>,
    /// Files under the include root that were never inlined
    pub unreferenced: Vec<String>,
}

impl Report {
    /// Names inlined from the include root
    pub fn expanded(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|entry| match entry {
            ReportEntry::Expand { name, .. } => Some(name.as_str()),
            _ => None,
        })
    }

    /// Names emitted unchanged
    pub fn passed_through(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|entry| match entry {
            ReportEntry::Pass { name } => Some(name.as_str()),
            _ => None,
        })
    }

    /// Number of directives dropped as duplicates
    pub fn skipped_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry, ReportEntry::Skip { .. }))
            .count()
    }
}

/// Finished amalgamation held in memory
#[derive(Debug, Clone)]
pub struct Amalgamation {
    pub bytes: Vec<u8>,
    pub report: Report,
}

/// Returns the include name if `line` is exactly `#include "<name>"` plus a newline
///
/// The line must keep its trailing `\n`; a final line without one is never a
/// directive, and neither is anything followed by a comment or `\r`.
pub fn parse_include(line: &[u8]) -> Option<&[u8]> {
    line.strip_prefix(INCLUDE_PREFIX)?
        .strip_suffix(INCLUDE_SUFFIX)
}

/// Depth-first traversal state for one run.
///
/// The seen set lives here and nowhere else, so independent runs never share
/// state.
pub struct Amalgamator<'a, W: Write> {
    config: &'a AmalgamateConfig,
    out: W,
    seen: HashSet<String>,
    reached: HashSet<PathBuf>,
    entries: Vec<ReportEntry>,
}

impl<'a, W: Write> Amalgamator<'a, W> {
    pub fn new(config: &'a AmalgamateConfig, out: W) -> Self {
        Self {
            config,
            out,
            seen: HashSet::new(),
            reached: HashSet::new(),
            entries: Vec::new(),
        }
    }

    /// Writes the guarded expansion of the root source and returns the writer
    /// with the run's report.
    ///
    /// # Errors
    ///
    /// Any read or write failure; see `expand_into_stream`.
    pub fn run(mut self) -> Result<(W, Report)> {
        let guard = &self.config.guard;
        writeln!(self.out, "#ifndef {guard}")?;
        writeln!(self.out, "#define {guard}")?;
        writeln!(self.out)?;

        let source_path = self.config.source_path();
        self.reached.insert(normalize_path(&source_path));
        self.expand_into_stream(&source_path)?;

        writeln!(self.out, "#endif  // {}", self.config.guard)?;
        self.out.flush()?;

        let unreferenced = unreferenced_headers(&self.config.include_root, &self.reached);
        for name in &unreferenced {
            info!(header = %name, "header under include root was never included");
        }

        let report = Report {
            source: self.config.source.clone(),
            entries: self.entries,
            unreferenced,
        };
        Ok((self.out, report))
    }

    /// Copies `path` line by line, replacing each include directive with its
    /// expansion.
    ///
    /// # Errors
    ///
    /// - `HdrcatError::SourceNotFound` / `HdrcatError::Read` if `path` can't be read.
    /// - `HdrcatError::InvalidIncludeName` if a directive's name isn't UTF-8.
    /// - `HdrcatError::Io` if writing to the output fails.
    pub fn expand_into_stream(&mut self, path: &Path) -> Result<()> {
        let contents = read_source(path)?;

        for (index, line) in contents.split_inclusive(|&b| b == b'\n').enumerate() {
            let Some(raw_name) = parse_include(line) else {
                self.out.write_all(line)?;
                continue;
            };

            let name = std::str::from_utf8(raw_name).map_err(|_| HdrcatError::InvalidIncludeName {
                path: path.to_path_buf(),
                line: index + 1,
            })?;

            self.expand_directive(name, path)?;
        }

        Ok(())
    }

    /// Handles one matched directive found in `from`
    fn expand_directive(&mut self, name: &str, from: &Path) -> Result<()> {
        if self.seen.contains(name) {
            debug!(name, from = %from.display(), "skipping repeated include");
            self.entries.push(ReportEntry::Skip {
                name: name.to_string(),
                from: self.display_relative(from),
            });
            return Ok(());
        }

        // Marked before resolving so a cycle back to `name` is elided.
        self.seen.insert(name.to_string());

        let local_path = resolve_include_path(&self.config.include_root, name);
        if local_path.is_file() {
            debug!(name, path = %local_path.display(), "expanding include");
            self.entries.push(ReportEntry::Expand {
                name: name.to_string(),
                path: self.display_relative(&local_path),
            });
            self.reached.insert(normalize_path(&local_path));

            write!(self.out, "\n// Expanding  #include \"{name}\"\n")?;
            self.expand_into_stream(&local_path)?;
            write!(self.out, "\n// Done expanding  #include \"{name}\"\n")?;
        } else {
            debug!(name, "passing include through");
            self.entries.push(ReportEntry::Pass {
                name: name.to_string(),
            });
            writeln!(self.out, "#include \"{name}\"")?;
        }

        Ok(())
    }

    fn display_relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.config.include_root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

/// Renders the amalgamation into memory without touching the output file
///
/// # Errors
///
/// Returns configuration errors from `AmalgamateConfig::validate` and any
/// fatal read error from the traversal.
pub fn amalgamate(config: &AmalgamateConfig) -> Result<Amalgamation> {
    config.validate()?;
    info!(source = %config.source_path().display(), "amalgamating");

    let (bytes, report) = Amalgamator::new(config, Vec::new()).run()?;

    info!(
        expanded = report.expanded().count(),
        passed_through = report.passed_through().count(),
        skipped = report.skipped_count(),
        "amalgamation finished"
    );
    Ok(Amalgamation { bytes, report })
}

/// Amalgamates and overwrites the configured output file.
///
/// Nothing is written unless the whole traversal succeeds.
///
/// # Errors
///
/// Any error from `amalgamate`, or `HdrcatError::Write` if the output can't be written.
pub fn generate(config: &AmalgamateConfig) -> Result<Amalgamation> {
    let amalgamation = amalgamate(config)?;
    write_output(&config.output, &amalgamation.bytes)?;
    info!(output = %config.output.display(), bytes = amalgamation.bytes.len(), "wrote amalgamation");
    Ok(amalgamation)
}

/// Verifies the configured output matches a fresh amalgamation
///
/// # Errors
///
/// `HdrcatError::OutOfDate` if the output is missing or differs, otherwise any
/// error from `amalgamate`.
pub fn check(config: &AmalgamateConfig) -> Result<Amalgamation> {
    let amalgamation = amalgamate(config)?;

    let current = match std::fs::read(&config.output) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(HdrcatError::OutOfDate {
                path: config.output.clone(),
            });
        }
        Err(source) => {
            return Err(HdrcatError::Read {
                path: config.output.clone(),
                source,
            });
        }
    };

    if current != amalgamation.bytes {
        return Err(HdrcatError::OutOfDate {
            path: config.output.clone(),
        });
    }

    Ok(amalgamation)
}
