//! Source discovery: classify every file under the source root into a
//! collection as a document or a static file.
//!
//! ```text
//! list_files(source)            hidden entries and the target dir skipped
//!     │
//!     ├── excluded by glob?      drop
//!     ├── .html / .md with front matter
//!     │       └── Document in collection_for_path(path)
//!     └── otherwise
//!             └── StaticFile in collection_for_path(path)
//! ```

use crate::config::{SiteConfig, defaults};
use crate::log;
use crate::site::{Collections, Document};
use crate::utils::{frontmatter, fs};
use anyhow::{Context, Result};
use glob::Pattern;
use heckle_core::batch;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

/// Extensions that may carry front matter.
const TEMPLATE_EXTENSIONS: [&str; 2] = ["html", "md"];

/// Paths and patterns left out of discovery.
#[derive(Debug, Default)]
pub struct Exclusions {
    patterns: Vec<Pattern>,
    /// Absolute paths never treated as sources (config file, dependency store).
    files: Vec<PathBuf>,
}

impl Exclusions {
    pub fn new(config: &SiteConfig) -> Result<Self> {
        let patterns = config
            .exclude_patterns()
            .iter()
            .map(|p| Pattern::new(p).with_context(|| format!("invalid exclude pattern `{p}`")))
            .collect::<Result<_>>()?;
        Ok(Self {
            patterns,
            files: Vec::new(),
        })
    }

    pub fn with_file(mut self, path: &Path) -> Self {
        self.files.push(path.to_path_buf());
        self
    }

    fn is_excluded(&self, source: &Path, rel: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(rel))
            || self.files.iter().any(|f| f == &source.join(rel))
    }
}

/// Discover sources under `source` into collections seeded from `config`.
///
/// `target` is skipped when it lies inside `source`. Template files that are
/// not UTF-8 are treated as static files. A read or front matter failure
/// aborts discovery.
pub fn discover(
    source: &Path,
    target: &Path,
    config: &SiteConfig,
    exclusions: &Exclusions,
) -> Result<Collections> {
    let files: Vec<String> = fs::list_files(source, |dir| dir == target)
        .into_iter()
        .filter(|rel| fs::is_not_hidden(rel) && !exclusions.is_excluded(source, rel))
        .collect();

    let collections = Mutex::new(Collections::new(config));
    let cache_limit = defaults::build::cache_html_limit();

    batch(&files, defaults::build::workers(), |rel, _| {
        classify(source, rel, cache_limit, &collections)
    })?;

    let collections = collections.into_inner();
    log!(
        "discover";
        "{} documents, {} static files",
        collections.document_count(),
        collections.static_file_count()
    );
    Ok(collections)
}

fn classify(source: &Path, rel: &str, cache_limit: usize, collections: &Mutex<Collections>) -> Result<()> {
    let is_template = Path::new(rel)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| TEMPLATE_EXTENSIONS.contains(&ext));

    if is_template {
        let path = source.join(rel);
        let bytes = std::fs::read(&path).with_context(|| format!("cannot read `{}`", path.display()))?;
        // Undecodable bodies cannot carry front matter.
        let parsed = match String::from_utf8(bytes) {
            Ok(content) => frontmatter::parse(&content)
                .with_context(|| format!("bad front matter in `{rel}`"))?,
            Err(_) => None,
        };

        if let Some(fm) = parsed {
            let html = (fm.body.len() <= cache_limit).then_some(fm.body);
            let mut collections = collections.lock();
            let collection = collections.collection_for_path(rel);
            let data = collection.document_data(rel, fm.data);
            collection.add_document(Document::new(rel, data, html));
            return Ok(());
        }
    }

    collections.lock().collection_for_path(rel).add_static_file(rel);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs as stdfs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        stdfs::create_dir_all(path.parent().unwrap()).unwrap();
        stdfs::write(path, content).unwrap();
    }

    fn run(dir: &TempDir, config: &SiteConfig) -> Collections {
        let exclusions = Exclusions::new(config).unwrap();
        discover(dir.path(), &dir.path().join("_site"), config, &exclusions).unwrap()
    }

    #[test]
    fn test_classification() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "index.html", "---\ntitle: Home\n---\n<h1>hi</h1>");
        write(root, "plain.html", "<p>no front matter</p>");
        write(root, "_posts/a.md", "---\n---\n# A");
        write(root, "_layouts/base.html", "---\n---\n{{ content }}");
        write(root, "_widgets/w.html", "---\n---\nw");
        write(root, "img/logo.png", "png");
        write(root, ".git/config", "x");
        write(root, "docs/.hidden.html", "---\n---\n");
        write(root, "_site/old.html", "---\n---\n");

        let collections = run(&dir, &SiteConfig::default());

        let pages = collections.get("pages").unwrap();
        let docs: Vec<_> = pages.documents().iter().map(|d| d.path().to_owned()).collect();
        assert_eq!(docs, vec!["index.html"]);
        let statics: Vec<_> = pages.static_files().iter().map(|f| f.path.clone()).collect();
        assert_eq!(statics, vec!["img/logo.png", "plain.html"]);

        assert_eq!(collections.get("posts").unwrap().documents().len(), 1);
        assert!(collections.get("layouts").unwrap().documents().get("_layouts/base.html").is_some());
        assert!(collections.get("widgets").unwrap().is_outputable());
        assert_eq!(collections.document_count(), 3);
    }

    #[test]
    fn test_exclusions() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "drafts/a.html", "---\n---\n");
        write(root, "b.psd", "x");
        write(root, "_config.yml", "exclude: [drafts/*]");
        write(root, "keep.txt", "x");

        let config = SiteConfig::from_json(json!({"exclude": ["drafts/*", "*.psd"]})).unwrap();
        let exclusions = Exclusions::new(&config).unwrap().with_file(&root.join("_config.yml"));
        let collections = discover(root, &root.join("_site"), &config, &exclusions).unwrap();

        let all: Vec<_> = collections
            .iter()
            .flat_map(|c| c.static_files().iter().map(|f| f.path.clone()))
            .collect();
        assert_eq!(all, vec!["keep.txt"]);
        assert_eq!(collections.document_count(), 0);
    }

    #[test]
    fn test_large_body_not_cached() {
        let dir = TempDir::new().unwrap();
        let body = "x".repeat(defaults::build::cache_html_limit() + 1);
        write(dir.path(), "big.html", &format!("---\n---\n{body}"));
        write(dir.path(), "small.html", "---\n---\nsmall");

        let collections = run(&dir, &SiteConfig::default());
        let pages = collections.get("pages").unwrap();
        assert!(!pages.documents().get("big.html").unwrap().has_cached_body());
        assert!(pages.documents().get("small.html").unwrap().has_cached_body());
    }

    #[test]
    fn test_bad_front_matter_aborts() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "bad.html", "---\n[oops\n---\n");
        let config = SiteConfig::default();
        let exclusions = Exclusions::new(&config).unwrap();
        assert!(discover(dir.path(), &dir.path().join("_site"), &config, &exclusions).is_err());
    }
}
