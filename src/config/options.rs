//! Per-build options supplied by the caller.

use super::{SiteConfig, defaults};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How documents are scheduled for rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// One document at a time; layouts hold per-render state in place.
    Serial,
    /// Worker pool; each layout render gets its own page proxy.
    #[default]
    Parallel,
}

#[derive(Debug, Clone, Educe)]
#[educe(Default)]
pub struct BuildOptions {
    /// Use this configuration instead of discovering one.
    pub config: Option<SiteConfig>,

    /// Explicit configuration file.
    pub config_path: Option<PathBuf>,

    /// Record dependencies; disabled builds use a no-op graph.
    #[educe(Default = defaults::r#true())]
    pub dependency_tracking: bool,

    /// Override the dependency store location.
    pub dependency_store: Option<PathBuf>,

    /// Keep the target tree and previous edges. Implied by a non-empty
    /// changed-file list.
    pub incremental: bool,

    pub mode: BuildMode,

    #[educe(Default = defaults::build::workers())]
    pub workers: usize,

    /// Show terminal progress bars.
    pub progress: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = BuildOptions::default();
        assert!(opts.dependency_tracking);
        assert!(!opts.incremental);
        assert_eq!(opts.mode, BuildMode::Parallel);
        assert_eq!(opts.workers, 20);
        assert!(opts.config.is_none());
    }
}
