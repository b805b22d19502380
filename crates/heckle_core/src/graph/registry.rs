//! Bidirectional path <-> integer ID table.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Integer surrogate for a path string.
///
/// Allocated monotonically on first sight and never reused within one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathId(pub u32);

/// Path registry embedded in the dependency graph.
#[derive(Debug, Default, Clone)]
pub struct PathRegistry {
    ids: FxHashMap<String, PathId>,
    paths: FxHashMap<PathId, String>,
    counter: u32,
}

impl PathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lookup the ID for a path, allocating a new one if necessary.
    pub fn id_for(&mut self, path: &str) -> PathId {
        if let Some(&id) = self.ids.get(path) {
            return id;
        }
        let id = PathId(self.counter);
        self.counter += 1;
        self.ids.insert(path.to_owned(), id);
        self.paths.insert(id, path.to_owned());
        id
    }

    /// Lookup an existing ID without allocating.
    pub fn get(&self, path: &str) -> Option<PathId> {
        self.ids.get(path).copied()
    }

    pub fn path(&self, id: PathId) -> Option<&str> {
        self.paths.get(&id).map(String::as_str)
    }

    /// Next ID to be allocated.
    pub const fn counter(&self) -> u32 {
        self.counter
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterate `(path, id)` pairs in ID order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, PathId)> {
        let mut entries: Vec<_> = self.ids.iter().map(|(p, &id)| (p.as_str(), id)).collect();
        entries.sort_by_key(|&(_, id)| id);
        entries.into_iter()
    }

    /// Restore a registry from persisted entries.
    ///
    /// Rejects duplicate paths, duplicate IDs and IDs at or above `counter`.
    pub(crate) fn restore(
        counter: u32,
        entries: impl IntoIterator<Item = (String, PathId)>,
    ) -> Result<Self, String> {
        let mut registry = Self {
            counter,
            ..Self::default()
        };
        for (path, id) in entries {
            if id.0 >= counter {
                return Err(format!("path id {} for `{path}` exceeds counter {counter}", id.0));
            }
            if registry.paths.insert(id, path.clone()).is_some() {
                return Err(format!("path id {} allocated twice", id.0));
            }
            if registry.ids.insert(path.clone(), id).is_some() {
                return Err(format!("path `{path}` registered twice"));
            }
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_for_is_idempotent() {
        let mut reg = PathRegistry::new();
        let a = reg.id_for("index.html");
        assert_eq!(reg.id_for("index.html"), a);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_first_id_is_stable() {
        // ID zero must not be treated as "missing".
        let mut reg = PathRegistry::new();
        assert_eq!(reg.id_for("a"), PathId(0));
        assert_eq!(reg.id_for("a"), PathId(0));
        assert_eq!(reg.counter(), 1);
    }

    #[test]
    fn test_ids_are_injective() {
        let mut reg = PathRegistry::new();
        let ids: Vec<_> = ["a", "b", "c", "_layouts/x.html"]
            .iter()
            .map(|p| reg.id_for(p))
            .collect();
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn test_path_reverse_lookup() {
        let mut reg = PathRegistry::new();
        let id = reg.id_for("_includes/nav.html");
        assert_eq!(reg.path(id), Some("_includes/nav.html"));
        assert_eq!(reg.path(PathId(99)), None);
    }

    #[test]
    fn test_get_does_not_allocate() {
        let reg = PathRegistry::new();
        assert_eq!(reg.get("missing"), None);
        assert_eq!(reg.counter(), 0);
    }

    #[test]
    fn test_restore_rejects_out_of_range() {
        let err = PathRegistry::restore(1, [("a".to_string(), PathId(3))]);
        assert!(err.is_err());
    }

    #[test]
    fn test_restore_continues_counter() {
        let mut reg = PathRegistry::restore(
            2,
            [("a".to_string(), PathId(0)), ("b".to_string(), PathId(1))],
        )
        .unwrap();
        assert_eq!(reg.id_for("c"), PathId(2));
        assert_eq!(reg.id_for("a"), PathId(0));
    }
}
