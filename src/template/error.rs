//! Template error types.

use heckle_core::GraphError;
use std::path::PathBuf;
use thiserror::Error;

/// Malformed template source.
#[derive(Debug, Error)]
#[error("line {line}: {message}")]
pub struct TemplateError {
    pub line: usize,
    pub message: String,
}

impl TemplateError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Failure while evaluating a parsed template.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template parse error: {0}")]
    Parse(#[from] TemplateError),

    #[error("cannot read `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("include `{name}` not found")]
    MissingInclude {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("include `{name}` failed to parse: {source}")]
    IncludeParse {
        name: String,
        #[source]
        source: TemplateError,
    },

    #[error("unknown filter `{0}`")]
    UnknownFilter(String),

    #[error("filter `{name}`: {message}")]
    Filter { name: String, message: String },

    #[error("tag `{name}`: {message}")]
    Tag { name: String, message: String },

    #[error("cannot process `{path}`: {message}")]
    Process { path: String, message: String },

    #[error("dependency trace failed")]
    Trace(#[from] GraphError),

    #[error("render depth exceeded {0} nested contexts")]
    RecursionLimit(usize),
}

impl RenderError {
    pub fn filter(name: &str, message: impl Into<String>) -> Self {
        Self::Filter {
            name: name.to_owned(),
            message: message.into(),
        }
    }

    pub fn tag(name: &str, message: impl Into<String>) -> Self {
        Self::Tag {
            name: name.to_owned(),
            message: message.into(),
        }
    }
}
