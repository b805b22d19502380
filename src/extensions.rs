//! Build extensions: site-init hooks, programmatic layouts, tags, filters
//! and per-extension processors.
//!
//! Hooks are plain closures, so each one is registered with a `signature`
//! string standing in for its body. Signatures feed the extension
//! fingerprint: changing one invalidates every incremental build list.
//!
//! ```ignore
//! let ext = Extensions::new()
//!     .with_filter("shout", "shout@1", |_ctx, input, _args| {
//!         Ok(Value::from(input.render().to_uppercase()))
//!     })
//!     .with_layout("bare", "bare@1", |ctx| ctx.get("content").map(|c| c.render()));
//! ```

use crate::error::BuildError;
use crate::template::{Engine, FilterFn, RenderContext, RenderError, Scope, TagCall, TagFn, Value};
use heckle_core::Fingerprint;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Runs once before rendering with the template globals and the engine.
pub type InitFn = dyn Fn(&mut Scope, &mut Engine) -> anyhow::Result<()> + Send + Sync;

/// Programmatic layout; the context's environment is the page being wrapped.
pub type LayoutFn = dyn Fn(&mut RenderContext<'_>) -> Result<String, RenderError> + Send + Sync;

/// `(source path, rendered body) -> body`, keyed by source extension.
pub type ContentFn = dyn Fn(&str, String) -> Result<String, RenderError> + Send + Sync;

/// `(from, to)`, keyed by static file extension.
pub type StaticFn = dyn Fn(&Path, &Path) -> anyhow::Result<()> + Send + Sync;

/// A hook and the signature that stands in for its body.
pub struct Hook<F: ?Sized> {
    pub signature: String,
    pub func: Arc<F>,
}

impl<F: ?Sized> Clone for Hook<F> {
    fn clone(&self) -> Self {
        Self {
            signature: self.signature.clone(),
            func: Arc::clone(&self.func),
        }
    }
}

impl<F: ?Sized> Hook<F> {
    fn new(signature: &str, func: Arc<F>) -> Self {
        Self {
            signature: signature.to_owned(),
            func,
        }
    }
}

#[derive(Clone, Default)]
pub struct Extensions {
    /// Run in order.
    pub init: Vec<Hook<InitFn>>,
    pub layouts: BTreeMap<String, Hook<LayoutFn>>,
    pub tags: BTreeMap<String, Hook<TagFn>>,
    pub filters: BTreeMap<String, Hook<FilterFn>>,
    /// Keyed by extension including the dot, e.g. `.md`.
    pub content_processors: BTreeMap<String, Hook<ContentFn>>,
    /// Keyed by extension including the dot, e.g. `.scss`.
    pub static_processors: BTreeMap<String, Hook<StaticFn>>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_init(
        mut self,
        signature: &str,
        f: impl Fn(&mut Scope, &mut Engine) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        let func: Arc<InitFn> = Arc::new(f);
        self.init.push(Hook::new(signature, func));
        self
    }

    pub fn with_layout(
        mut self,
        name: &str,
        signature: &str,
        f: impl Fn(&mut RenderContext<'_>) -> Result<String, RenderError> + Send + Sync + 'static,
    ) -> Self {
        let func: Arc<LayoutFn> = Arc::new(f);
        self.layouts.insert(name.to_owned(), Hook::new(signature, func));
        self
    }

    pub fn with_tag(
        mut self,
        name: &str,
        signature: &str,
        f: impl Fn(&mut RenderContext<'_>, &TagCall) -> Result<String, RenderError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        let func: Arc<TagFn> = Arc::new(f);
        self.tags.insert(name.to_owned(), Hook::new(signature, func));
        self
    }

    pub fn with_filter(
        mut self,
        name: &str,
        signature: &str,
        f: impl Fn(&mut RenderContext<'_>, Value, &[Value]) -> Result<Value, RenderError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        let func: Arc<FilterFn> = Arc::new(f);
        self.filters.insert(name.to_owned(), Hook::new(signature, func));
        self
    }

    pub fn with_content_processor(
        mut self,
        ext: &str,
        signature: &str,
        f: impl Fn(&str, String) -> Result<String, RenderError> + Send + Sync + 'static,
    ) -> Self {
        let func: Arc<ContentFn> = Arc::new(f);
        self.content_processors.insert(ext.to_owned(), Hook::new(signature, func));
        self
    }

    pub fn with_static_processor(
        mut self,
        ext: &str,
        signature: &str,
        f: impl Fn(&Path, &Path) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        let func: Arc<StaticFn> = Arc::new(f);
        self.static_processors.insert(ext.to_owned(), Hook::new(signature, func));
        self
    }

    /// Combine with `later`: init hooks chain, named entries from `later`
    /// replace ours.
    pub fn merge(mut self, later: Self) -> Self {
        self.init.extend(later.init);
        self.layouts.extend(later.layouts);
        self.tags.extend(later.tags);
        self.filters.extend(later.filters);
        self.content_processors.extend(later.content_processors);
        self.static_processors.extend(later.static_processors);
        self
    }

    /// Hash of every hook signature, 20 hex characters.
    pub fn fingerprint(&self) -> String {
        fn named<F: ?Sized>(fp: &mut Fingerprint, kind: &str, hooks: &BTreeMap<String, Hook<F>>) {
            for (name, hook) in hooks {
                fp.update(kind).update(name).update(&hook.signature);
            }
        }

        let mut fp = Fingerprint::new();
        for hook in &self.init {
            fp.update("init").update(&hook.signature);
        }
        named(&mut fp, "layout", &self.layouts);
        named(&mut fp, "tag", &self.tags);
        named(&mut fp, "filter", &self.filters);
        named(&mut fp, "content", &self.content_processors);
        named(&mut fp, "static", &self.static_processors);
        fp.finish()
    }

    /// Register tags and filters on `engine`.
    pub fn install(&self, engine: &mut Engine) {
        for (name, hook) in &self.tags {
            engine.register_tag(name, Arc::clone(&hook.func));
        }
        for (name, hook) in &self.filters {
            engine.register_filter(name, Arc::clone(&hook.func));
        }
    }

    /// Run init hooks in order.
    pub fn run_init(&self, globals: &mut Scope, engine: &mut Engine) -> anyhow::Result<()> {
        for hook in &self.init {
            (hook.func)(globals, engine)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions")
            .field("init", &self.init.len())
            .field("layouts", &self.layouts.keys().collect::<Vec<_>>())
            .field("tags", &self.tags.keys().collect::<Vec<_>>())
            .field("filters", &self.filters.keys().collect::<Vec<_>>())
            .field("content_processors", &self.content_processors.keys().collect::<Vec<_>>())
            .field("static_processors", &self.static_processors.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Named extension bundles that a site config can enable by name.
#[derive(Debug, Clone, Default)]
pub struct ExtensionRegistry {
    bundles: BTreeMap<String, Extensions>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, extensions: Extensions) -> &mut Self {
        self.bundles.insert(name.to_owned(), extensions);
        self
    }

    /// Merge the named bundles in order. Unknown names fail the build.
    pub fn resolve(&self, names: &[&str]) -> Result<Extensions, BuildError> {
        names.iter().try_fold(Extensions::new(), |merged, name| {
            let bundle = self
                .bundles
                .get(*name)
                .ok_or_else(|| BuildError::ExtensionLoad((*name).to_owned()))?;
            Ok(merged.merge(bundle.clone()))
        })
    }
}
