//! Path-keyed dependency graph for incremental builds.
//!
//! The graph records, for every *dependent* path (a document being rendered,
//! an include being expanded), the set of *dependency* paths it read while
//! rendering. Edges are collected into a trace buffer and committed at the
//! end of a build; queries run in the opposite direction ("what depends on
//! this changed file?").
//!
//! # Trace Lifecycle
//!
//! ```text
//! start_trace(incremental)
//!     │   incremental = false → all prior edges discarded
//!     ▼
//! trace(dependency, dependent)*      (buffer: dependent → {dependency})
//!     │
//!     ▼
//! end_trace()                        (each traced dependent's set replaces
//!                                     its previous entry; others untouched)
//! ```
//!
//! # Thread Safety
//!
//! All state sits behind one mutex, so `trace` may be called from parallel
//! render workers; individual calls are serialized.

mod null;
mod registry;
mod store;

pub use null::NullDependencies;
pub use registry::{PathId, PathRegistry};

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Dependency graph errors.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("IO error on dependency store `{0}`")]
    Io(PathBuf, #[source] io::Error),

    #[error("corrupt dependency store at line {line}: {message}")]
    Corrupt { line: usize, message: String },

    #[error("no dependent set in render context while tracing `{path}`")]
    NoDependent { path: String },

    #[error("dependency `{path}` traced outside of an open trace")]
    NotTracing { path: String },
}

/// Operations shared by the real graph and the no-op implementation.
pub trait Dependencies: Send + Sync {
    /// Open a fresh trace buffer; discard all prior edges unless incremental.
    fn start_trace(&self, incremental: bool);

    /// Record that `dependent` read `path`.
    ///
    /// Fails if no dependent is set: every render context must carry one.
    fn trace(&self, path: &str, dependent: Option<&str>) -> Result<(), GraphError>;

    /// Commit the trace buffer into the persistent table.
    fn end_trace(&self);

    /// Paths recorded as dependencies of `path`.
    fn get_dependencies(&self, path: &str) -> Vec<String>;

    /// Paths to rebuild for a set of changed paths.
    ///
    /// `None` means the result cannot be trusted and a full build is required.
    fn get_build_list(&self, changed: &[String], fingerprint: &str) -> Option<Vec<String>>;

    /// Load persisted state. `Ok(false)` when there is nothing to load.
    fn load(&self) -> Result<bool, GraphError>;

    /// Persist current state.
    fn save(&self) -> Result<(), GraphError>;
}

/// Mutable graph state, guarded by the graph's mutex.
#[derive(Debug, Default)]
pub(crate) struct GraphState {
    pub(crate) registry: PathRegistry,
    /// Fingerprint the persisted edges were recorded under.
    pub(crate) recorded_fingerprint: Option<String>,
    /// dependent → dependencies
    pub(crate) dependencies: BTreeMap<PathId, BTreeSet<PathId>>,
    traces: Option<FxHashMap<PathId, FxHashSet<PathId>>>,
}

/// Persistent dependency graph backed by a line-oriented store file.
#[derive(Debug)]
pub struct DependencyGraph {
    store: PathBuf,
    fingerprint: String,
    state: Mutex<GraphState>,
}

impl DependencyGraph {
    /// Create an empty graph persisted at `store`, recording under `fingerprint`.
    pub fn new(store: impl Into<PathBuf>, fingerprint: impl Into<String>) -> Self {
        Self {
            store: store.into(),
            fingerprint: fingerprint.into(),
            state: Mutex::new(GraphState::default()),
        }
    }

    /// Fingerprint this graph will persist on save.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Lookup the ID for a path, allocating one if necessary.
    pub fn get_id_for_path(&self, path: &str) -> PathId {
        self.state.lock().registry.id_for(path)
    }

    /// Number of dependents with a recorded entry.
    pub fn dependent_count(&self) -> usize {
        self.state.lock().dependencies.len()
    }
}

impl Dependencies for DependencyGraph {
    fn start_trace(&self, incremental: bool) {
        let mut state = self.state.lock();
        if !incremental {
            state.dependencies.clear();
        }
        state.traces = Some(FxHashMap::default());
    }

    fn trace(&self, path: &str, dependent: Option<&str>) -> Result<(), GraphError> {
        let dependent = dependent.ok_or_else(|| GraphError::NoDependent {
            path: path.to_owned(),
        })?;

        let mut state = self.state.lock();
        let GraphState {
            registry, traces, ..
        } = &mut *state;
        let traces = traces.as_mut().ok_or_else(|| GraphError::NotTracing {
            path: path.to_owned(),
        })?;

        let dependent_id = registry.id_for(dependent);
        let path_id = registry.id_for(path);
        traces.entry(dependent_id).or_default().insert(path_id);
        Ok(())
    }

    fn end_trace(&self) {
        let mut state = self.state.lock();
        if let Some(traces) = state.traces.take() {
            for (dependent, deps) in traces {
                state.dependencies.insert(dependent, deps.into_iter().collect());
            }
        }
    }

    fn get_dependencies(&self, path: &str) -> Vec<String> {
        let state = self.state.lock();
        let Some(id) = state.registry.get(path) else {
            return Vec::new();
        };
        state
            .dependencies
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|&dep| state.registry.path(dep).map(str::to_owned))
            .collect()
    }

    fn get_build_list(&self, changed: &[String], fingerprint: &str) -> Option<Vec<String>> {
        let state = self.state.lock();
        if state.recorded_fingerprint.as_deref() != Some(fingerprint) {
            return None;
        }

        // Invert dependent → dependencies into dependency → dependents.
        let mut dependents: FxHashMap<PathId, Vec<PathId>> = FxHashMap::default();
        for (&dependent, deps) in &state.dependencies {
            for &dep in deps {
                dependents.entry(dep).or_default().push(dependent);
            }
        }

        let mut visited = FxHashSet::default();
        let mut affected = BTreeSet::new();
        let mut unseen = BTreeSet::new();

        for path in changed {
            let Some(id) = state.registry.get(path) else {
                // Never traced, so it must be a new source.
                unseen.insert(path.clone());
                continue;
            };
            if state.dependencies.contains_key(&id) {
                affected.insert(id);
            }
            let mut stack = vec![id];
            while let Some(current) = stack.pop() {
                if !visited.insert(current) {
                    continue;
                }
                for &dependent in dependents.get(&current).into_iter().flatten() {
                    affected.insert(dependent);
                    stack.push(dependent);
                }
            }
        }

        let mut result: BTreeSet<String> = affected
            .into_iter()
            .filter_map(|id| state.registry.path(id).map(str::to_owned))
            .collect();
        result.extend(unseen);
        Some(result.into_iter().collect())
    }

    fn load(&self) -> Result<bool, GraphError> {
        match store::read(&self.store)? {
            Some(loaded) => {
                *self.state.lock() = loaded;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn save(&self) -> Result<(), GraphError> {
        let state = self.state.lock();
        store::write(&self.store, &self.fingerprint, &state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FP: &str = "fp-1";

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    /// Graph with a committed trace and a persisted fingerprint, as after a load.
    fn traced(edges: &[(&str, &str)]) -> DependencyGraph {
        let graph = DependencyGraph::new("unused.dependencies", FP);
        graph.start_trace(false);
        for (dependent, dependency) in edges {
            graph.trace(dependency, Some(dependent)).unwrap();
        }
        graph.end_trace();
        graph.state.lock().recorded_fingerprint = Some(FP.to_string());
        graph
    }

    #[test]
    fn test_trace_requires_dependent() {
        let graph = DependencyGraph::new("x", FP);
        graph.start_trace(false);
        let err = graph.trace("a.html", None).unwrap_err();
        assert!(matches!(err, GraphError::NoDependent { .. }));
    }

    #[test]
    fn test_trace_requires_open_trace() {
        let graph = DependencyGraph::new("x", FP);
        let err = graph.trace("a.html", Some("b.html")).unwrap_err();
        assert!(matches!(err, GraphError::NotTracing { .. }));
    }

    #[test]
    fn test_trace_is_idempotent() {
        let graph = traced(&[
            ("index.html", "_layouts/default.html"),
            ("index.html", "_layouts/default.html"),
        ]);
        assert_eq!(
            graph.get_dependencies("index.html"),
            strings(&["_layouts/default.html"])
        );
    }

    #[test]
    fn test_end_trace_replaces_entry() {
        let graph = traced(&[
            ("index.html", "_includes/a.html"),
            ("about.html", "_includes/a.html"),
        ]);

        graph.start_trace(true);
        graph.trace("_includes/b.html", Some("index.html")).unwrap();
        graph.end_trace();

        // Replaced, not merged.
        assert_eq!(graph.get_dependencies("index.html"), strings(&["_includes/b.html"]));
        // Untraced dependents keep their entry.
        assert_eq!(graph.get_dependencies("about.html"), strings(&["_includes/a.html"]));
    }

    #[test]
    fn test_full_trace_discards_prior_edges() {
        let graph = traced(&[("about.html", "_includes/a.html")]);
        graph.start_trace(false);
        graph.trace("index.html", Some("index.html")).unwrap();
        graph.end_trace();
        assert!(graph.get_dependencies("about.html").is_empty());
        assert_eq!(graph.dependent_count(), 1);
    }

    #[test]
    fn test_build_list_transitive() {
        let graph = traced(&[
            ("index.html", "index.html"),
            ("index.html", "_layouts/default.html"),
            ("index.html", "_includes/nav.html"),
            ("_includes/nav.html", "_includes/link.html"),
            ("about.html", "about.html"),
            ("about.html", "_layouts/page.html"),
        ]);

        let list = graph
            .get_build_list(&strings(&["_includes/link.html"]), FP)
            .unwrap();
        assert_eq!(list, strings(&["_includes/nav.html", "index.html"]));

        let list = graph
            .get_build_list(&strings(&["_layouts/page.html"]), FP)
            .unwrap();
        assert_eq!(list, strings(&["about.html"]));
    }

    #[test]
    fn test_build_list_includes_changed_dependent() {
        let graph = traced(&[("index.html", "index.html"), ("about.html", "about.html")]);
        let list = graph.get_build_list(&strings(&["about.html"]), FP).unwrap();
        assert_eq!(list, strings(&["about.html"]));
    }

    #[test]
    fn test_build_list_union_across_changes() {
        let graph = traced(&[
            ("a.html", "_includes/x.html"),
            ("b.html", "_includes/y.html"),
            ("c.html", "_includes/z.html"),
        ]);
        let list = graph
            .get_build_list(&strings(&["_includes/x.html", "_includes/y.html"]), FP)
            .unwrap();
        assert_eq!(list, strings(&["a.html", "b.html"]));
    }

    #[test]
    fn test_build_list_survives_cycles() {
        let graph = traced(&[("a.html", "b.html"), ("b.html", "a.html")]);
        let list = graph.get_build_list(&strings(&["a.html"]), FP).unwrap();
        assert_eq!(list, strings(&["a.html", "b.html"]));
    }

    #[test]
    fn test_build_list_reports_unseen_paths() {
        let graph = traced(&[("a.html", "a.html")]);
        let list = graph.get_build_list(&strings(&["new.html"]), FP).unwrap();
        assert_eq!(list, strings(&["new.html"]));
    }

    #[test]
    fn test_build_list_fingerprint_mismatch() {
        let graph = traced(&[("a.html", "a.html")]);
        assert!(graph.get_build_list(&[], "other").is_none());
        assert!(graph.get_build_list(&strings(&["a.html"]), "other").is_none());
    }

    #[test]
    fn test_build_list_without_recorded_fingerprint() {
        let graph = DependencyGraph::new("x", FP);
        assert!(graph.get_build_list(&[], FP).is_none());
    }

    #[test]
    fn test_parallel_trace() {
        use rayon::prelude::*;

        let graph = DependencyGraph::new("x", FP);
        graph.start_trace(false);
        (0..200).into_par_iter().for_each(|i| {
            let dependent = format!("page-{i}.html");
            graph.trace("_layouts/default.html", Some(&dependent)).unwrap();
            graph.trace(&dependent, Some(&dependent)).unwrap();
        });
        graph.end_trace();

        assert_eq!(graph.dependent_count(), 200);
        assert_eq!(graph.get_dependencies("page-7.html").len(), 2);
    }

    #[test]
    fn test_save_load_roundtrip_queries() {
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("site.dependencies");

        let graph = DependencyGraph::new(&store, FP);
        graph.start_trace(false);
        graph.trace("index.html", Some("index.html")).unwrap();
        graph.trace("_layouts/default.html", Some("index.html")).unwrap();
        graph.trace("_includes/nav.html", Some("index.html")).unwrap();
        graph.trace("about.html", Some("about.html")).unwrap();
        graph.end_trace();
        graph.save().unwrap();

        let loaded = DependencyGraph::new(&store, FP);
        assert!(loaded.load().unwrap());

        let changed = strings(&["_includes/nav.html"]);
        assert_eq!(
            loaded.get_build_list(&changed, FP),
            Some(strings(&["index.html"]))
        );
        let mut deps = loaded.get_dependencies("index.html");
        deps.sort();
        assert_eq!(
            deps,
            strings(&["_includes/nav.html", "_layouts/default.html", "index.html"])
        );
        // IDs survive the round trip.
        assert_eq!(
            loaded.get_id_for_path("about.html"),
            graph.get_id_for_path("about.html")
        );
    }

    #[test]
    fn test_load_missing_store() {
        let dir = TempDir::new().unwrap();
        let graph = DependencyGraph::new(dir.path().join("none.dependencies"), FP);
        assert!(!graph.load().unwrap());
        assert_eq!(graph.dependent_count(), 0);
    }

    #[test]
    fn test_save_persists_current_fingerprint() {
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("site.dependencies");

        let old = DependencyGraph::new(&store, "old");
        old.start_trace(false);
        old.trace("a.html", Some("a.html")).unwrap();
        old.end_trace();
        old.save().unwrap();

        // A build under a new fingerprint is forced full, then re-arms.
        let new = DependencyGraph::new(&store, "new");
        new.load().unwrap();
        assert!(new.get_build_list(&[], "new").is_none());
        new.start_trace(false);
        new.trace("a.html", Some("a.html")).unwrap();
        new.end_trace();
        new.save().unwrap();

        let next = DependencyGraph::new(&store, "new");
        next.load().unwrap();
        assert!(next.get_build_list(&[], "new").is_some());
    }
}
