//! Templated documents: URL derivation, the read interface seen by
//! templates, and the render → layout → write pipeline.
//!
//! # URL Derivation
//!
//! | Source / permalink   | URL             | Written to              |
//! |----------------------|-----------------|-------------------------|
//! | `about.html`         | `/about.html`   | `about.html`            |
//! | `about.md`           | `/about/`       | `about/index.html`      |
//! | `blog/index.html`    | `/blog/`        | `blog/index.html`       |
//! | `_posts/a.html`      | `/posts/a.html` | `posts/a.html`          |
//! | permalink `/r/soup/` | `/r/soup/`      | `r/soup/index.html`     |
//! | permalink `/feed.xml`| `/feed`         | `feed/index.html`       |
//!
//! # Layout State
//!
//! While a layout renders, the page it wraps must answer `content` with its
//! computed body and, inside a layout chain, `page` with the original page.
//! Serial builds park that state on the document itself for the duration of
//! the layout call; parallel builds wrap the document in a fresh
//! [`PageProxy`] so concurrent renders through a shared layout never see each
//! other's state.

use crate::config::BuildMode;
use crate::error::DocumentError;
use crate::log;
use crate::render::{PageProxy, RenderEnv};
use crate::site::keyed::Keyed;
use crate::template::{Object, RenderContext, RenderError, Template, Value};
use crate::utils::{frontmatter, fs};
use parking_lot::Mutex;
use serde_json::{Map, Value as Json};
use std::sync::{Arc, OnceLock};

const HTML_EXT: &str = ".html";
const MARKDOWN_EXT: &str = ".md";
const INDEX_FILE: &str = "index.html";

/// Collection whose documents are layouts.
pub const LAYOUTS_COLLECTION: &str = "layouts";

/// Per-render state held while a layout wraps this document.
#[derive(Debug)]
struct Transient {
    content: String,
    page: Option<Value>,
}

#[derive(Debug)]
pub struct Document {
    path: String,
    data: Map<String, Json>,
    /// Body, unless it was too large to keep in memory.
    html: Option<String>,
    url: String,
    /// Relative to the target root.
    target_path: String,
    categories: Vec<String>,
    tags: Vec<String>,
    collection: String,
    /// Only populated for layouts.
    template: OnceLock<Arc<Template>>,
    transient: Mutex<Option<Transient>>,
}

impl Document {
    pub fn new(path: &str, data: Map<String, Json>, html: Option<String>) -> Self {
        let mut categories = list(data.get("categories"));
        categories.extend(list(data.get("category")));
        let tags = list(data.get("tags"));

        let permalink = data
            .get("permalink")
            .and_then(Json::as_str)
            .filter(|p| !p.is_empty());
        let (url, filename) = derive_url(permalink.unwrap_or(path));
        let target_path = target_path(&url, &filename);

        Self {
            path: path.to_owned(),
            data,
            html,
            url,
            target_path,
            categories,
            tags,
            collection: String::new(),
            template: OnceLock::new(),
            transient: Mutex::new(None),
        }
    }

    /// Record collection membership, also visible as `collection` in data.
    pub(super) fn assign_collection(&mut self, name: &str) {
        self.collection = name.to_owned();
        self.data.insert("collection".into(), Json::String(name.to_owned()));
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn target_path(&self) -> &str {
        &self.target_path
    }

    pub fn data(&self) -> &Map<String, Json> {
        &self.data
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn layout(&self) -> Option<&str> {
        self.data.get("layout").and_then(Json::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.data.get("title").and_then(Json::as_str)
    }

    /// Set from the owning collection's `_outputable` value.
    pub fn is_outputable(&self) -> bool {
        self.data.get("_outputable") == Some(&Json::Bool(true))
    }

    pub fn is_layout(&self) -> bool {
        self.collection == LAYOUTS_COLLECTION
    }

    /// False when the body exceeded the cache limit at discovery.
    pub fn has_cached_body(&self) -> bool {
        self.html.is_some()
    }

    pub fn is_html(&self) -> bool {
        self.path.ends_with(HTML_EXT)
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    fn template(&self, env: &RenderEnv) -> Result<Arc<Template>, DocumentError> {
        if let Some(template) = self.template.get() {
            return Ok(Arc::clone(template));
        }

        let body = match &self.html {
            Some(html) => html.clone(),
            None => {
                let file = env.site.source.join(&self.path);
                frontmatter::read_body(&file).map_err(|err| DocumentError::Render {
                    path: self.path.clone(),
                    source: RenderError::Io(file, err),
                })?
            }
        };
        let template = env.engine.parse(&body).map_err(|source| DocumentError::Parse {
            path: self.path.clone(),
            source,
        })?;
        let template = Arc::new(template);

        if self.is_layout() {
            // A concurrent first render may win; either copy is equivalent.
            let _ = self.template.set(Arc::clone(&template));
        }
        Ok(template)
    }

    fn try_render(&self, ctx: &mut RenderContext<'_>) -> Result<String, DocumentError> {
        let render_err = |source| DocumentError::Render {
            path: self.path.clone(),
            source,
        };
        let template = self.template(ctx.env)?;
        let content = template.render(ctx).map_err(render_err)?;
        ctx.env.processors.process(&self.path, content).map_err(render_err)
    }

    /// Render the body against `ctx` and post-process it by extension.
    ///
    /// Failures are logged, counted and yield empty content.
    pub fn render(&self, ctx: &mut RenderContext<'_>) -> String {
        self.try_render(ctx).unwrap_or_else(|err| {
            log!("error"; "{err}");
            ctx.env.record_failure();
            String::new()
        })
    }

    /// Render the body, then wrap it in this document's layout.
    pub fn output(self: &Arc<Self>, ctx: &mut RenderContext<'_>) -> Result<String, RenderError> {
        let content = self.render(ctx);
        ctx.trace(&self.path)?;
        let layout = ctx.env.layouts.resolve(self.layout());

        // A layout in a chain keeps answering `page` with the original page.
        let page = if self.is_layout() {
            Some(ctx.get("page")?)
        } else {
            None
        };

        match ctx.env.mode {
            BuildMode::Serial => {
                let _guard = TransientGuard::set(self, Transient { content, page });
                let mut child = ctx.child(Value::Object(Arc::clone(self) as Arc<dyn Object>))?;
                layout.output(&mut child)
            }
            BuildMode::Parallel => {
                let proxy = Arc::new(PageProxy::new(Arc::clone(self), content, page));
                let mut child = ctx.child(Value::Object(proxy))?;
                layout.output(&mut child)
            }
        }
    }

    /// Render through the layout chain and write to the target tree.
    pub fn write(self: &Arc<Self>, env: &RenderEnv) -> Result<(), DocumentError> {
        let target = env.site.target.join(&self.target_path);
        let mut ctx = RenderContext::new(
            env,
            Value::Object(Arc::clone(self) as Arc<dyn Object>),
            Some(self.path.clone()),
        );
        let output = self.output(&mut ctx).map_err(|source| DocumentError::Render {
            path: self.path.clone(),
            source,
        })?;
        fs::write_file(&target, &output).map_err(|source| DocumentError::Write {
            path: target,
            source,
        })
    }

    // ========================================================================
    // Read Interface
    // ========================================================================

    /// Keys shared by the document and its page proxies. Does not trace.
    pub(crate) fn lookup(&self, key: &str, ctx: &RenderContext<'_>) -> Value {
        match key {
            "title" => self.title().map(Value::from).unwrap_or_default(),
            "url" => Value::from(self.url.as_str()),
            "path" => Value::from(self.path.as_str()),
            "collection" => Value::from(self.collection.as_str()),
            "categories" => strings(&self.categories),
            "tags" => strings(&self.tags),
            "layout" => self.layout().map(Value::from).unwrap_or_default(),
            "data" => Value::from_json_map(&self.data),
            "site" => Value::Object(Arc::clone(&ctx.env.site) as Arc<dyn Object>),
            "output_path" => Value::from(self.target_path.as_str()),
            _ => self.data.get(key).map(Value::from_json).unwrap_or_default(),
        }
    }

    /// Body rendered with this document as the target.
    pub(crate) fn render_content(
        self: &Arc<Self>,
        ctx: &mut RenderContext<'_>,
    ) -> Result<Value, RenderError> {
        let mut child = ctx.child(Value::Object(Arc::clone(self) as Arc<dyn Object>))?;
        Ok(Value::from(self.render(&mut child)))
    }

    pub(crate) fn snapshot(&self) -> Json {
        let mut map = self.data.clone();
        map.insert("path".into(), Json::String(self.path.clone()));
        map.insert("url".into(), Json::String(self.url.clone()));
        Json::Object(map)
    }
}

impl Object for Document {
    fn get(self: Arc<Self>, key: &str, ctx: &mut RenderContext<'_>) -> Result<Value, RenderError> {
        ctx.trace(&self.path)?;
        match key {
            "page" => {
                let page = self.transient.lock().as_ref().and_then(|t| t.page.clone());
                Ok(page.unwrap_or(Value::Object(self)))
            }
            "content" => {
                let content = self.transient.lock().as_ref().map(|t| t.content.clone());
                match content {
                    Some(content) => Ok(Value::from(content)),
                    None => self.render_content(ctx),
                }
            }
            _ => Ok(self.lookup(key, ctx)),
        }
    }

    fn to_json(&self) -> Json {
        self.snapshot()
    }

    fn to_text(&self) -> String {
        self.url.clone()
    }
}

impl Keyed for Document {
    fn key(&self) -> &str {
        &self.path
    }
}

/// Restores the previous transient state when the layout call returns.
struct TransientGuard<'a> {
    doc: &'a Document,
    previous: Option<Transient>,
}

impl<'a> TransientGuard<'a> {
    fn set(doc: &'a Document, transient: Transient) -> Self {
        let previous = doc.transient.lock().replace(transient);
        Self { doc, previous }
    }
}

impl Drop for TransientGuard<'_> {
    fn drop(&mut self) {
        *self.doc.transient.lock() = self.previous.take();
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Strings from a front matter value: whitespace-separated text, a list, or
/// a single scalar.
fn list(value: Option<&Json>) -> Vec<String> {
    let items: Vec<String> = match value {
        None | Some(Json::Null) => Vec::new(),
        Some(Json::String(s)) => s.split_whitespace().map(str::to_owned).collect(),
        Some(Json::Array(items)) => items
            .iter()
            .map(|item| match item {
                Json::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(other) => vec![other.to_string()],
    };
    items.into_iter().filter(|s| !s.is_empty()).collect()
}

fn strings(items: &[String]) -> Value {
    Value::List(items.iter().map(|s| Value::from(s.as_str())).collect())
}

/// Last path segment, ignoring trailing slashes.
fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit_once('/').map_or(trimmed, |(_, name)| name)
}

/// Everything before the last segment; `.` when there is none.
fn dirname(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some(("", _)) => "/",
        Some((dir, _)) => dir,
        None => ".",
    }
}

/// Extension of the last segment including the dot; dotfiles have none.
fn extname(path: &str) -> &str {
    let name = basename(path);
    match name.rfind('.') {
        Some(0) | None => "",
        Some(i) => &name[i..],
    }
}

fn join(dir: &str, name: &str) -> String {
    match dir {
        "." | "" => name.to_owned(),
        _ => format!("{}/{name}", dir.trim_end_matches('/')),
    }
}

/// URL and output filename for a source path or permalink.
fn derive_url(source: &str) -> (String, String) {
    let mut url = source.to_owned();
    let mut filename = INDEX_FILE.to_owned();

    match extname(source) {
        "" => {}
        HTML_EXT => filename = basename(source).to_owned(),
        MARKDOWN_EXT => {
            let stem = &basename(source)[..basename(source).len() - MARKDOWN_EXT.len()];
            url = if stem == "index" {
                join(dirname(source), INDEX_FILE)
            } else {
                join(&join(dirname(source), stem), INDEX_FILE)
            };
        }
        ext => url.truncate(url.len() - ext.len()),
    }

    if basename(&url) == INDEX_FILE {
        let dir = match dirname(&url) {
            "." => "",
            "/" => "",
            dir => dir,
        };
        url = format!("{dir}/");
    }
    if let Some(stripped) = url.strip_prefix('_') {
        url = stripped.to_owned();
    }
    if !url.starts_with('/') {
        url.insert(0, '/');
    }
    (url, filename)
}

/// Output path without the leading slash.
fn target_path(url: &str, filename: &str) -> String {
    let path = if basename(url) == filename {
        url.to_owned()
    } else {
        format!("{}/{filename}", url.trim_end_matches('/'))
    };
    path.trim_start_matches('/').to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Json) -> Map<String, Json> {
        match value {
            Json::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn doc(path: &str) -> Document {
        Document::new(path, Map::new(), Some(String::new()))
    }

    #[test]
    fn test_url_derivation() {
        let cases = [
            ("about.html", "/about.html", "about.html"),
            ("about.md", "/about/", "about/index.html"),
            ("docs/guide.md", "/docs/guide/", "docs/guide/index.html"),
            ("docs/index.md", "/docs/", "docs/index.html"),
            ("index.md", "/", "index.html"),
            ("index.html", "/", "index.html"),
            ("blog/index.html", "/blog/", "blog/index.html"),
            ("_posts/a.html", "/posts/a.html", "posts/a.html"),
            ("_posts/b.md", "/posts/b/", "posts/b/index.html"),
            ("notes", "/notes", "notes/index.html"),
        ];
        for (path, url, target) in cases {
            let d = doc(path);
            assert_eq!(d.url(), url, "{path}");
            assert_eq!(d.target_path(), target, "{path}");
        }
    }

    #[test]
    fn test_permalink_wins() {
        let d = Document::new("_r/soup.html", data(json!({"permalink": "/r/soup/"})), None);
        assert_eq!(d.url(), "/r/soup/");
        assert_eq!(d.target_path(), "r/soup/index.html");

        let d = Document::new("feed.html", data(json!({"permalink": "/feed.xml"})), None);
        assert_eq!(d.url(), "/feed");
        assert_eq!(d.target_path(), "feed/index.html");

        let d = Document::new("x.html", data(json!({"permalink": "/a/b.html"})), None);
        assert_eq!(d.url(), "/a/b.html");
        assert_eq!(d.target_path(), "a/b.html");
    }

    #[test]
    fn test_categories_and_tags() {
        let d = Document::new(
            "a.html",
            data(json!({
                "categories": "news  tech",
                "category": ["rust", ""],
                "tags": 7
            })),
            None,
        );
        assert_eq!(d.categories(), ["news", "tech", "rust"]);
        assert_eq!(d.tags(), ["7"]);
        assert!(doc("b.html").tags().is_empty());
    }

    #[test]
    fn test_collection_assignment() {
        let mut d = Document::new("_layouts/base.html", data(json!({"_outputable": false})), None);
        d.assign_collection("layouts");
        assert!(d.is_layout());
        assert!(!d.is_outputable());
        assert_eq!(d.data()["collection"], json!("layouts"));

        let mut d = Document::new("a.html", data(json!({"_outputable": true, "layout": "base"})), None);
        d.assign_collection("pages");
        assert!(!d.is_layout());
        assert!(d.is_outputable());
        assert_eq!(d.layout(), Some("base"));
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(basename("/a/b/"), "b");
        assert_eq!(dirname("a"), ".");
        assert_eq!(dirname("/a"), "/");
        assert_eq!(extname(".htaccess"), "");
        assert_eq!(extname("a/b.tar.gz"), ".gz");
        assert_eq!(join(".", "x"), "x");
    }
}
