//! File system helpers used by discovery, target preparation and writing.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A path with no component starting with `.`.
pub fn is_not_hidden(path: &str) -> bool {
    path.split('/').all(|part| !part.starts_with('.'))
}

/// `path` relative to `root`, with `/` separators.
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// All non-hidden files under `root` as sorted relative paths.
///
/// Directories for which `skip` returns true are not descended into.
pub fn list_files(root: &Path, skip: impl Fn(&Path) -> bool) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || (!e.file_name().to_string_lossy().starts_with('.') && !skip(e.path()))
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| relative_path(root, e.path()))
        .collect();
    files.sort();
    files
}

/// Create `dir` and its parents.
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

/// Write `content` to `path`, creating parent directories.
pub fn write_file(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}

/// Copy `from` to `to`, creating parent directories.
pub fn copy_file(from: &Path, to: &Path) -> io::Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(from, to).map(|_| ())
}

/// Remove everything inside `root` except top-level entries named in
/// `keep`. A missing `root` is not an error.
pub fn remove_tree_except(root: &Path, keep: &[&str]) -> io::Result<()> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err),
    };

    for entry in entries {
        let entry = entry?;
        if keep.iter().any(|name| entry.file_name() == *name) {
            continue;
        }
        let path: PathBuf = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, rel).unwrap();
    }

    #[test]
    fn test_is_not_hidden() {
        assert!(is_not_hidden("a/b.html"));
        assert!(is_not_hidden("_posts/a.md"));
        assert!(!is_not_hidden(".git/config"));
        assert!(!is_not_hidden("a/.DS_Store"));
    }

    #[test]
    fn test_list_files_skips_hidden_and_pruned() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "index.html");
        touch(root, "_posts/a.md");
        touch(root, ".git/HEAD");
        touch(root, "css/.hidden");
        touch(root, "out/x.html");

        let out = root.join("out");
        let files = list_files(root, |p| p == out);
        assert_eq!(files, vec!["_posts/a.md", "index.html"]);
    }

    #[test]
    fn test_remove_tree_except() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, ".git/HEAD");
        touch(root, "_locomote/state");
        touch(root, "old/page.html");
        touch(root, "stale.html");

        remove_tree_except(root, &[".git", "_locomote"]).unwrap();
        assert!(root.join(".git/HEAD").exists());
        assert!(root.join("_locomote/state").exists());
        assert!(!root.join("old").exists());
        assert!(!root.join("stale.html").exists());

        remove_tree_except(&root.join("missing"), &[]).unwrap();
    }

    #[test]
    fn test_write_file_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/c.html");
        write_file(&path, "x").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "x");
    }

    #[test]
    fn test_relative_path() {
        let root = Path::new("/site");
        assert_eq!(relative_path(root, Path::new("/site/a/b.md")).as_deref(), Some("a/b.md"));
        assert_eq!(relative_path(root, Path::new("/site")), None);
        assert_eq!(relative_path(root, Path::new("/other/x")), None);
    }
}
