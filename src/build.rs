//! Site building orchestration.
//!
//! # Architecture
//!
//! ```text
//! SiteBuilder::build(changed)
//!     │
//!     ├── load_site_config()          inline > path > _config.* > manifest
//!     ├── resolve extensions          registry names + caller bundle
//!     ├── open dependency graph       real or null, loaded from the store
//!     ├── discover()                  → Collections
//!     ├── Layouts / Site / RenderEnv  engine, globals, init hooks
//!     ├── prepare_target()            cleared unless incremental
//!     │
//!     ├── start_trace(incremental)
//!     ├── write_documents()           build list ∩ outputable documents
//!     ├── copy_static_files()
//!     └── end_trace() + save()
//! ```
//!
//! Every step up to target preparation aborts the build on failure; the
//! result then carries the error. Per-document failures are logged, counted
//! and never stop the batch.

use crate::compiler::{
    Exclusions, StaticProcessors, copy_static_files, discover, prepare_target, write_documents,
};
use crate::config::{BuildOptions, LoadedConfig, defaults, load_site_config};
use crate::error::{BuildError, BuildResult};
use crate::extensions::{ExtensionRegistry, Extensions};
use crate::log;
use crate::logger::ProgressBars;
use crate::render::{self, ContentProcessors, Layouts, RenderEnv};
use crate::site::{LAYOUTS_COLLECTION, Site};
use crate::template::Engine;
use crate::utils::{fs, memory};
use anyhow::Context;
use heckle_core::{Dependencies, DependencyGraph, GraphError, NullDependencies};
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Suffix of the default dependency store, next to the source directory.
const STORE_SUFFIX: &str = ".dependencies";

/// Store name used when the source directory has no usable name.
const FALLBACK_STORE: &str = "_site.dependencies";

/// Entry point for building one site.
///
/// ```ignore
/// let result = SiteBuilder::new("site", "site/_site")
///     .options(BuildOptions { incremental: true, ..Default::default() })
///     .extensions(my_extensions)
///     .build(&["_posts/a.md".into()]);
/// ```
#[derive(Debug, Clone)]
pub struct SiteBuilder {
    source: PathBuf,
    target: PathBuf,
    options: BuildOptions,
    registry: ExtensionRegistry,
    extensions: Option<Extensions>,
}

/// Loaded configuration, resolved extensions and the opened graph.
struct Setup {
    loaded: LoadedConfig,
    extensions: Extensions,
    fingerprint: String,
    graph: Arc<dyn Dependencies>,
    /// False when a corrupt store was discarded and everything must rebuild.
    graph_usable: bool,
}

impl SiteBuilder {
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            options: BuildOptions::default(),
            registry: ExtensionRegistry::new(),
            extensions: None,
        }
    }

    pub fn options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Bundles the site config may enable by name.
    pub fn registry(mut self, registry: ExtensionRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Extensions applied on top of any the config enables.
    pub fn extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = Some(extensions);
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Where the dependency graph is persisted.
    pub fn dependency_store(&self) -> PathBuf {
        if let Some(store) = &self.options.dependency_store {
            return store.clone();
        }
        match (self.source.parent(), self.source.file_name()) {
            (Some(parent), Some(name)) => {
                parent.join(format!("{}{STORE_SUFFIX}", name.to_string_lossy()))
            }
            _ => self.source.join(FALLBACK_STORE),
        }
    }

    /// Build the site. A non-empty `changed` list makes the build
    /// incremental.
    pub fn build(&self, changed: &[String]) -> BuildResult {
        let start = Instant::now();
        memory::reset_peak_usage();

        let mut result = self.run(changed).unwrap_or_else(|error| {
            log!("error"; "{}", error_chain(&error));
            BuildResult {
                error: Some(error),
                ..BuildResult::default()
            }
        });

        result.elapsed = start.elapsed();
        result.peak_memory_bytes = result.peak_memory_bytes.max(memory::peak_usage());
        if result.is_ok() {
            log!(
                "build";
                "done: {} documents, {} static files, {} failures in {} ms",
                result.documents,
                result.static_files,
                result.failures,
                result.elapsed_time_ms()
            );
        }
        result
    }

    /// Load the persisted graph under the current extension fingerprint.
    pub fn open_graph(&self) -> Result<DependencyGraph, BuildError> {
        let loaded = load_site_config(&self.source, &self.options)?;
        let extensions = self.resolve_extensions(&loaded)?;
        let graph = DependencyGraph::new(self.dependency_store(), extensions.fingerprint());
        graph.load().map_err(BuildError::GraphLoad)?;
        Ok(graph)
    }

    // ========================================================================
    // Internal
    // ========================================================================

    fn resolve_extensions(&self, loaded: &LoadedConfig) -> Result<Extensions, BuildError> {
        let enabled = self.registry.resolve(&loaded.config.extension_names())?;
        Ok(match &self.extensions {
            Some(extensions) => enabled.merge(extensions.clone()),
            None => enabled,
        })
    }

    fn setup(&self) -> Result<Setup, BuildError> {
        let loaded = load_site_config(&self.source, &self.options)?;
        let extensions = self.resolve_extensions(&loaded)?;
        let fingerprint = extensions.fingerprint();

        if !self.options.dependency_tracking {
            return Ok(Setup {
                loaded,
                extensions,
                fingerprint,
                graph: Arc::new(NullDependencies),
                graph_usable: true,
            });
        }

        let graph = DependencyGraph::new(self.dependency_store(), fingerprint.as_str());
        let graph_usable = match graph.load() {
            Ok(_) => true,
            Err(err @ GraphError::Corrupt { .. }) => {
                log!("deps"; "discarding dependency store: {err}");
                false
            }
            Err(err) => return Err(BuildError::GraphLoad(err)),
        };
        let graph: Arc<dyn Dependencies> = if graph_usable {
            Arc::new(graph)
        } else {
            Arc::new(DependencyGraph::new(self.dependency_store(), fingerprint.as_str()))
        };

        Ok(Setup {
            loaded,
            extensions,
            fingerprint,
            graph,
            graph_usable,
        })
    }

    fn run(&self, changed: &[String]) -> Result<BuildResult, BuildError> {
        let opts = &self.options;
        let Setup {
            loaded,
            extensions,
            fingerprint,
            graph,
            graph_usable,
        } = self.setup()?;

        let changed = normalize_changed(&self.source, changed);
        let incremental = (opts.incremental || !changed.is_empty()) && graph_usable;

        // Discovery
        let mut exclusions = Exclusions::new(&loaded.config)?.with_file(&self.dependency_store());
        if let Some(path) = &loaded.path {
            exclusions = exclusions.with_file(path);
        }
        let collections = discover(&self.source, &self.target, &loaded.config, &exclusions)
            .context("discovery failed")?;

        let layouts = Layouts::new(&extensions, collections.get(LAYOUTS_COLLECTION));
        let site = Arc::new(Site::new(
            &self.source,
            &self.target,
            loaded.config,
            loaded.path.as_deref(),
            collections,
        ));

        // Render environment
        let mut engine = Engine::new(&self.source);
        extensions.install(&mut engine);
        let mut globals = render::globals(&site);
        extensions
            .run_init(&mut globals, &mut engine)
            .context("site init hook failed")?;
        let env = RenderEnv::new(Arc::clone(&site), engine, Arc::clone(&graph))
            .with_globals(globals)
            .with_layouts(layouts)
            .with_processors(ContentProcessors::new(&extensions))
            .with_mode(opts.mode);

        prepare_target(&self.target, incremental).with_context(|| {
            format!("cannot prepare target `{}`", self.target.display())
        })?;

        graph.start_trace(incremental);

        let mut documents = site.collections().documents();
        let mut statics = site.collections().static_files();
        if incremental && !changed.is_empty() {
            let listed: FxHashSet<&str> = changed.iter().map(String::as_str).collect();
            statics.retain(|file| listed.contains(file.path.as_str()));

            match graph.get_build_list(&changed, &fingerprint) {
                Some(build_list) => {
                    let affected: FxHashSet<&str> = build_list.iter().map(String::as_str).collect();
                    let total = documents.len();
                    documents.retain(|doc| affected.contains(doc.path()));
                    log!("deps"; "{} of {} documents affected", documents.len(), total);
                }
                None => log!("deps"; "dependency graph is stale, rebuilding all documents"),
            }
        }

        let progress = opts
            .progress
            .then(|| ProgressBars::new_filtered(&[("documents", documents.len()), ("static", statics.len())]))
            .flatten();

        log!("build"; "rendering {} documents ({:?})", documents.len(), opts.mode);
        let stats = write_documents(&env, &documents, opts.workers, progress.as_ref());

        let processors = StaticProcessors::new(&extensions);
        let (copied, failed) = copy_static_files(
            &statics,
            &self.source,
            &self.target,
            &processors,
            defaults::build::workers(),
            progress.as_ref(),
        )?;

        if let Some(progress) = &progress {
            progress.finish();
        }

        graph.end_trace();
        graph
            .save()
            .map_err(|err| anyhow::Error::from(err).context("cannot save dependency graph"))?;

        Ok(BuildResult {
            documents: stats.written,
            static_files: copied,
            failures: env.failures() + failed,
            peak_memory_bytes: stats.peak_memory_bytes,
            ..BuildResult::default()
        })
    }
}

/// Build `source` into `target` with `options` and no extensions.
pub fn build_site(source: &Path, target: &Path, options: BuildOptions, changed: &[String]) -> BuildResult {
    SiteBuilder::new(source, target).options(options).build(changed)
}

/// Changed paths relative to `source`, with `/` separators.
fn normalize_changed(source: &Path, changed: &[String]) -> Vec<String> {
    changed
        .iter()
        .map(|path| {
            let p = Path::new(path);
            if p.is_absolute() {
                if let Some(rel) = fs::relative_path(source, p) {
                    return rel;
                }
            }
            path.trim_start_matches("./").replace('\\', "/")
        })
        .collect()
}

/// Error and its sources as one message, for logging.
fn error_chain(error: &BuildError) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(err) = source {
        message.push_str(": ");
        message.push_str(&err.to_string());
        source = err.source();
    }
    message
}
