//! Per-render view of a document wrapped by a layout in parallel builds.

use crate::site::Document;
use crate::template::{Object, RenderContext, RenderError, Value};
use serde_json::Value as Json;
use std::sync::Arc;

/// A document plus the transient state of one layout render.
///
/// Answers `content` and `page` itself and delegates every other key to the
/// base document, tracing the base path like the document would.
#[derive(Debug)]
pub struct PageProxy {
    base: Arc<Document>,
    content: String,
    /// Original page when the base is a layout in a chain.
    page: Option<Value>,
}

impl PageProxy {
    pub fn new(base: Arc<Document>, content: String, page: Option<Value>) -> Self {
        Self {
            base,
            content,
            page,
        }
    }
}

impl Object for PageProxy {
    fn get(self: Arc<Self>, key: &str, ctx: &mut RenderContext<'_>) -> Result<Value, RenderError> {
        ctx.trace(self.base.path())?;
        Ok(match key {
            "content" => Value::from(self.content.as_str()),
            "page" => match &self.page {
                Some(page) => page.clone(),
                None => Value::Object(self),
            },
            _ => self.base.lookup(key, ctx),
        })
    }

    fn to_json(&self) -> Json {
        self.base.snapshot()
    }

    fn to_text(&self) -> String {
        self.base.url().to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderEnv;
    use heckle_core::{Dependencies, DependencyGraph};
    use serde_json::json;
    use tempfile::TempDir;

    fn doc() -> Arc<Document> {
        let data = match json!({"title": "Home"}) {
            Json::Object(map) => map,
            _ => unreachable!(),
        };
        Arc::new(Document::new("index.html", data, Some(String::new())))
    }

    #[test]
    fn test_overrides_and_delegation() {
        let env = RenderEnv::for_tests();
        let proxy = Arc::new(PageProxy::new(doc(), "<p>body</p>".into(), None));
        let mut ctx = RenderContext::new(&env, Value::Object(proxy), Some("index.html".into()));

        assert_eq!(ctx.get("content").unwrap().render(), "<p>body</p>");
        assert_eq!(ctx.get("title").unwrap().render(), "Home");
        assert_eq!(ctx.get("page.content").unwrap().render(), "<p>body</p>");
        assert_eq!(ctx.get("page.url").unwrap().render(), "/");
    }

    #[test]
    fn test_mirrored_page() {
        let env = RenderEnv::for_tests();
        let page = Value::from_json(&json!({"title": "Original"}));
        let proxy = Arc::new(PageProxy::new(doc(), String::new(), Some(page)));
        let mut ctx = RenderContext::new(&env, Value::Object(proxy), Some("index.html".into()));
        assert_eq!(ctx.get("page.title").unwrap().render(), "Original");
        assert_eq!(ctx.get("title").unwrap().render(), "Home");
    }

    #[test]
    fn test_reads_trace_base_path() {
        let dir = TempDir::new().unwrap();
        let graph = Arc::new(DependencyGraph::new(dir.path().join("deps"), "fp"));
        graph.start_trace(false);
        let env = RenderEnv::for_tests_with(dir.path(), graph.clone());

        let proxy = Arc::new(PageProxy::new(doc(), String::new(), None));
        let mut ctx = RenderContext::new(&env, Value::Object(proxy), Some("_layouts/base.html".into()));
        ctx.get("title").unwrap();
        graph.end_trace();
        assert_eq!(graph.get_dependencies("_layouts/base.html"), vec!["index.html"]);
    }
}
