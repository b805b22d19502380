//! No-op dependency tracking.

use super::{Dependencies, GraphError};

/// Dependency implementation used when tracking is disabled.
///
/// Records nothing and never vouches for an incremental build list.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDependencies;

impl Dependencies for NullDependencies {
    fn start_trace(&self, _incremental: bool) {}

    fn trace(&self, _path: &str, _dependent: Option<&str>) -> Result<(), GraphError> {
        Ok(())
    }

    fn end_trace(&self) {}

    fn get_dependencies(&self, _path: &str) -> Vec<String> {
        Vec::new()
    }

    fn get_build_list(&self, _changed: &[String], _fingerprint: &str) -> Option<Vec<String>> {
        None
    }

    fn load(&self) -> Result<bool, GraphError> {
        Ok(false)
    }

    fn save(&self) -> Result<(), GraphError> {
        Ok(())
    }
}
