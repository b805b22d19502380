//! Build-level error types and the build result.
//!
//! | Error                      | Scope          | Effect                    |
//! |----------------------------|----------------|---------------------------|
//! | `BuildError::Configuration`| setup          | build aborted             |
//! | `BuildError::ExtensionLoad`| setup          | build aborted             |
//! | `BuildError::GraphLoad`    | setup          | build aborted             |
//! | `BuildError::Abort`        | setup/commit   | build aborted             |
//! | `DocumentError::*`         | one document   | logged, empty output      |

use crate::config::ConfigError;
use crate::template::{RenderError, TemplateError};
use heckle_core::GraphError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A failure that stops the whole build.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("configuration error")]
    Configuration(#[from] ConfigError),

    #[error("cannot load extension `{0}`")]
    ExtensionLoad(String),

    #[error("cannot load dependency graph")]
    GraphLoad(#[source] GraphError),

    #[error("build aborted")]
    Abort(#[source] anyhow::Error),
}

impl From<anyhow::Error> for BuildError {
    fn from(err: anyhow::Error) -> Self {
        Self::Abort(err)
    }
}

/// A failure confined to one document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("cannot parse `{path}`: {source}")]
    Parse {
        path: String,
        #[source]
        source: TemplateError,
    },

    #[error("cannot render `{path}`: {source}")]
    Render {
        path: String,
        #[source]
        source: RenderError,
    },

    #[error("cannot write `{}`: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of one build.
///
/// `error` is set only when the build was aborted; per-document failures
/// are counted in `failures` and logged.
#[derive(Debug, Default)]
pub struct BuildResult {
    pub error: Option<BuildError>,
    pub elapsed: Duration,
    pub peak_memory_bytes: usize,
    /// Documents rendered and written.
    pub documents: usize,
    pub static_files: usize,
    pub failures: usize,
}

impl BuildResult {
    pub fn elapsed_time_ms(&self) -> u128 {
        self.elapsed.as_millis()
    }

    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_from_anyhow() {
        let err: BuildError = anyhow::anyhow!("disk full").into();
        assert!(matches!(err, BuildError::Abort(_)));
        assert_eq!(err.to_string(), "build aborted");
    }

    #[test]
    fn test_document_error_display() {
        let err = DocumentError::Parse {
            path: "a.html".into(),
            source: TemplateError::new(3, "unknown tag `x`"),
        };
        assert_eq!(err.to_string(), "cannot parse `a.html`: line 3: unknown tag `x`");
    }

    #[test]
    fn test_result_accessors() {
        let result = BuildResult {
            elapsed: Duration::from_millis(1500),
            ..BuildResult::default()
        };
        assert_eq!(result.elapsed_time_ms(), 1500);
        assert!(result.is_ok());
    }
}
