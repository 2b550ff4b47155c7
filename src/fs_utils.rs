use crate::error::{HdrcatError, Result};
use std::collections::HashSet;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Reads the raw bytes of a source file
///
/// # Errors
///
/// - `HdrcatError::SourceNotFound` if the path doesn't exist or isn't a file.
/// - `HdrcatError::Read` if the file exists but reading it fails.
pub fn read_source(path: &Path) -> Result<Vec<u8>> {
    if !path.is_file() {
        return Err(HdrcatError::SourceNotFound {
            path: path.to_path_buf(),
        });
    }

    fs::read(path).map_err(|source| HdrcatError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves an include name against the include root.
///
/// `/` is the only separator recognized inside `name`; empty segments are
/// dropped so `a//b.h` resolves like `a/b.h`.
pub fn resolve_include_path(include_root: &Path, name: &str) -> PathBuf {
    name.split('/')
        .filter(|segment| !segment.is_empty())
        .fold(include_root.to_path_buf(), |path, segment| path.join(segment))
}

/// Writes the finished amalgamation, creating parent directories as needed
///
/// # Errors
///
/// Returns `HdrcatError::Write` if the destination or its parent can't be written.
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    let to_write_error = |source| HdrcatError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(to_write_error)?;
    }

    let file = fs::File::create(path).map_err(to_write_error)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes).map_err(to_write_error)?;
    writer.flush().map_err(to_write_error)
}

/// Check if a path is hidden (starts with '.')
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

/// Lexically resolves `.` and `..` components without touching the filesystem
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(component),
            },
            other => normalized.push(other),
        }
    }

    normalized
}

/// Lists files under `include_root` that are not in `reached`.
///
/// `reached` must hold paths passed through `normalize_path`. Names are
/// relative to the include root with `/` separators, in file name order.
/// Hidden files and directories are skipped. Entries that can't be walked
/// are logged and skipped; the scan never fails.
pub fn unreferenced_headers(include_root: &Path, reached: &HashSet<PathBuf>) -> Vec<String> {
    let mut unreferenced = Vec::new();

    let walker = WalkDir::new(include_root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.path()));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping entry while scanning include root");
                continue;
            }
        };

        if !entry.file_type().is_file() || reached.contains(&normalize_path(entry.path())) {
            continue;
        }

        if let Ok(relative) = entry.path().strip_prefix(include_root) {
            unreferenced.push(relative.to_string_lossy().replace('\\', "/"));
        }
    }

    unreferenced
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_source() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.h");

        fs::write(&file_path, b"int x;\n").unwrap();
        assert_eq!(read_source(&file_path).unwrap(), b"int x;\n");

        let missing = temp_dir.path().join("missing.h");
        let result = read_source(&missing);
        assert!(matches!(result, Err(HdrcatError::SourceNotFound { .. })));

        // Directory is not a source file
        let dir_path = temp_dir.path().join("dir");
        fs::create_dir(&dir_path).unwrap();
        let result = read_source(&dir_path);
        assert!(matches!(result, Err(HdrcatError::SourceNotFound { .. })));
    }

    #[test]
    fn test_read_source_non_utf8() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("latin1.h");

        fs::write(&file_path, [0x2f, 0x2f, 0x20, 0xe9, 0x0a]).unwrap();
        assert_eq!(read_source(&file_path).unwrap(), vec![0x2f, 0x2f, 0x20, 0xe9, 0x0a]);
    }

    #[test]
    fn test_resolve_include_path() {
        let root = Path::new("/repo/include");

        assert_eq!(resolve_include_path(root, "a.h"), root.join("a.h"));
        assert_eq!(
            resolve_include_path(root, "lib/detail/b.h"),
            root.join("lib").join("detail").join("b.h")
        );
        assert_eq!(resolve_include_path(root, "lib//b.h"), root.join("lib").join("b.h"));
        assert_eq!(resolve_include_path(root, ""), root.to_path_buf());
    }

    #[test]
    fn test_write_output_creates_parents() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("single_include").join("lib.h");

        write_output(&out, b"first\n").unwrap();
        assert_eq!(fs::read(&out).unwrap(), b"first\n");

        // Overwritten, not appended
        write_output(&out, b"second\n").unwrap();
        assert_eq!(fs::read(&out).unwrap(), b"second\n");
    }

    #[test]
    fn test_write_output_unwritable() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "file, not a dir").unwrap();

        let result = write_output(&blocker.join("out.h"), b"x");
        assert!(matches!(result, Err(HdrcatError::Write { .. })));
    }

    #[test]
    fn test_is_hidden() {
        assert!(is_hidden(Path::new(".git")));
        assert!(is_hidden(Path::new("include/.cache")));
        assert!(!is_hidden(Path::new("include/a.h")));
    }

    #[test]
    fn test_unreferenced_headers() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("lib")).unwrap();
        fs::create_dir_all(root.join(".hidden")).unwrap();
        fs::write(root.join("lib/a.h"), "").unwrap();
        fs::write(root.join("lib/b.h"), "").unwrap();
        fs::write(root.join("top.h"), "").unwrap();
        fs::write(root.join(".hidden/c.h"), "").unwrap();
        fs::write(root.join(".dotfile"), "").unwrap();

        let reached: HashSet<PathBuf> = [root.join("top.h"), resolve_include_path(root, "lib/a.h")]
            .iter()
            .map(|path| normalize_path(path))
            .collect();

        let result = unreferenced_headers(root, &reached);
        assert_eq!(result, vec!["lib/b.h".to_string()]);
    }

    #[test]
    fn test_unreferenced_headers_dot_dot_name() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("a")).unwrap();
        fs::write(root.join("b.h"), "").unwrap();

        let reached: HashSet<PathBuf> = [normalize_path(&resolve_include_path(root, "a/../b.h"))]
            .into_iter()
            .collect();

        assert!(unreferenced_headers(root, &reached).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreferenced_headers_skips_walk_errors() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("lib")).unwrap();
        fs::write(root.join("lib/orphan.h"), "").unwrap();
        // Symlink back to an ancestor makes walkdir report a loop error
        std::os::unix::fs::symlink(root, root.join("lib/loop")).unwrap();

        let result = unreferenced_headers(root, &HashSet::new());
        assert_eq!(result, vec!["lib/orphan.h".to_string()]);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("/inc/a/../b.h")), Path::new("/inc/b.h"));
        assert_eq!(normalize_path(Path::new("/inc/./a/./b.h")), Path::new("/inc/a/b.h"));
        assert_eq!(normalize_path(Path::new("/inc/a/b/../../c.h")), Path::new("/inc/c.h"));
        assert_eq!(normalize_path(Path::new("/../x.h")), Path::new("/x.h"));
        assert_eq!(normalize_path(Path::new("../inc/a.h")), Path::new("../inc/a.h"));
        assert_eq!(normalize_path(Path::new("inc/../../a.h")), Path::new("../a.h"));
    }
}
