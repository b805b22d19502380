//! Template engine: registered filters and tags plus the include cache.

use super::filters;
use super::parser::{BUILTIN_TAGS, Parser};
use super::{RenderContext, RenderError, Template, TemplateError, Value};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// `input | name: args…`
pub type FilterFn =
    dyn Fn(&mut RenderContext<'_>, Value, &[Value]) -> Result<Value, RenderError> + Send + Sync;

/// `{% name markup %}`; returns the text written in place of the tag.
pub type TagFn = dyn Fn(&mut RenderContext<'_>, &TagCall) -> Result<String, RenderError> + Send + Sync;

/// Arguments passed to an extension tag.
#[derive(Debug, Clone, Default)]
pub struct TagCall {
    /// Unparsed markup after the tag name.
    pub markup: String,
    /// Named parameters, resolved against the render context.
    pub params: Vec<(String, Value)>,
}

impl TagCall {
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

pub struct Engine {
    includes_dir: PathBuf,
    filters: FxHashMap<String, Arc<FilterFn>>,
    tags: FxHashMap<String, Arc<TagFn>>,
    includes: RwLock<FxHashMap<String, Arc<Template>>>,
}

impl Engine {
    /// Engine reading includes from `<source>/_includes`, with the built-in
    /// filters registered.
    pub fn new(source: &Path) -> Self {
        let mut engine = Self {
            includes_dir: source.join("_includes"),
            filters: FxHashMap::default(),
            tags: FxHashMap::default(),
            includes: RwLock::new(FxHashMap::default()),
        };
        for (name, filter) in filters::builtin() {
            engine.filters.insert(name.to_owned(), filter);
        }
        engine
    }

    /// Register a filter; replaces an existing filter of the same name.
    pub fn register_filter(&mut self, name: &str, filter: Arc<FilterFn>) {
        self.filters.insert(name.to_owned(), filter);
    }

    /// Register a tag. Names of built-in tags are ignored by the parser.
    pub fn register_tag(&mut self, name: &str, tag: Arc<TagFn>) {
        self.tags.insert(name.to_owned(), tag);
    }

    pub fn parse(&self, source: &str) -> Result<Template, TemplateError> {
        let is_tag = |name: &str| !BUILTIN_TAGS.contains(&name) && self.tags.contains_key(name);
        let nodes = Parser::new(source, &is_tag).parse()?;
        Ok(Template::new(nodes))
    }

    /// Parsed include `file`, read from disk on first use.
    pub fn include(&self, file: &str) -> Result<Arc<Template>, RenderError> {
        if let Some(template) = self.includes.read().get(file) {
            return Ok(Arc::clone(template));
        }

        let source = std::fs::read_to_string(self.includes_dir.join(file)).map_err(|source| {
            RenderError::MissingInclude {
                name: file.to_owned(),
                source,
            }
        })?;
        let template = Arc::new(self.parse(&source).map_err(|source| RenderError::IncludeParse {
            name: file.to_owned(),
            source,
        })?);

        // Another worker may have parsed it meanwhile; keep the first.
        Ok(Arc::clone(
            self.includes
                .write()
                .entry(file.to_owned())
                .or_insert(template),
        ))
    }

    pub(crate) fn filter(&self, name: &str) -> Result<Arc<FilterFn>, RenderError> {
        self.filters
            .get(name)
            .cloned()
            .ok_or_else(|| RenderError::UnknownFilter(name.to_owned()))
    }

    pub(crate) fn tag(&self, name: &str) -> Result<Arc<TagFn>, RenderError> {
        self.tags
            .get(name)
            .cloned()
            .ok_or_else(|| RenderError::tag(name, "not registered"))
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut filters: Vec<_> = self.filters.keys().collect();
        let mut tags: Vec<_> = self.tags.keys().collect();
        filters.sort();
        tags.sort();
        f.debug_struct("Engine")
            .field("includes_dir", &self.includes_dir)
            .field("filters", &filters)
            .field("tags", &tags)
            .finish_non_exhaustive()
    }
}
