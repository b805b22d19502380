//! Shared render state for one build.
//!
//! A `RenderEnv` is built once the site is discovered and then only read:
//! render workers share it by reference, and the one counter it carries is
//! atomic.

mod layouts;
mod processors;
mod proxy;

pub use layouts::{DEFAULT_LAYOUT, Layout, Layouts};
pub use processors::ContentProcessors;
pub use proxy::PageProxy;

use crate::config::BuildMode;
use crate::site::Site;
use crate::template::{Engine, Object, Scope, Value};
use heckle_core::Dependencies;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct RenderEnv {
    pub site: Arc<Site>,
    pub engine: Engine,
    pub layouts: Layouts,
    pub dependencies: Arc<dyn Dependencies>,
    pub processors: ContentProcessors,
    /// Variables visible to every template: `site` and the config keys.
    pub globals: Scope,
    pub mode: BuildMode,
    failures: AtomicUsize,
}

impl RenderEnv {
    /// Environment with built-in layouts and processors and the site's
    /// globals.
    pub fn new(site: Arc<Site>, engine: Engine, dependencies: Arc<dyn Dependencies>) -> Self {
        Self {
            globals: globals(&site),
            site,
            engine,
            layouts: Layouts::default(),
            dependencies,
            processors: ContentProcessors::default(),
            mode: BuildMode::default(),
            failures: AtomicUsize::new(0),
        }
    }

    pub fn with_layouts(mut self, layouts: Layouts) -> Self {
        self.layouts = layouts;
        self
    }

    pub fn with_processors(mut self, processors: ContentProcessors) -> Self {
        self.processors = processors;
        self
    }

    pub fn with_globals(mut self, globals: Scope) -> Self {
        self.globals = globals;
        self
    }

    pub fn with_mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    /// Count one per-document failure.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for RenderEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderEnv")
            .field("source", &self.site.source)
            .field("layouts", &self.layouts.len())
            .field("mode", &self.mode)
            .field("failures", &self.failures())
            .finish_non_exhaustive()
    }
}

/// `site` plus every configuration key.
pub fn globals(site: &Arc<Site>) -> Scope {
    let mut globals: Scope = site
        .data()
        .iter()
        .map(|(key, value)| (key.clone(), Value::from_json(value)))
        .collect();
    globals.insert("site".into(), Value::Object(Arc::clone(site) as Arc<dyn Object>));
    globals
}

#[cfg(test)]
impl RenderEnv {
    /// Empty site rooted in the system temp dir, no dependency tracking and
    /// a `greeting` global.
    pub(crate) fn for_tests() -> Self {
        let mut env = Self::for_tests_with(
            &std::env::temp_dir(),
            Arc::new(heckle_core::NullDependencies),
        );
        env.globals.insert("greeting".into(), Value::from("hello"));
        env
    }

    /// Empty site rooted at `source` recording into `dependencies`.
    pub(crate) fn for_tests_with(
        source: &std::path::Path,
        dependencies: Arc<dyn Dependencies>,
    ) -> Self {
        use crate::config::SiteConfig;
        use crate::site::Collections;

        let config = SiteConfig::default();
        let collections = Collections::new(&config);
        let site = Site::new(source, &source.join("_site"), config, None, collections);
        Self::for_site(Arc::new(site), dependencies)
    }

    pub(crate) fn for_site(site: Arc<Site>, dependencies: Arc<dyn Dependencies>) -> Self {
        let engine = Engine::new(&site.source);
        Self::new(site, engine, dependencies)
    }
}
