//! Liquid-flavoured template collaborator.
//!
//! # Module Structure
//!
//! | Module     | Purpose                                        |
//! |------------|------------------------------------------------|
//! | `value`    | Runtime values and the `Object` read interface |
//! | `context`  | Scopes, render target, dependent path          |
//! | `parser`   | Source → node tree                             |
//! | `markup`   | `include` / extension tag parameter grammar    |
//! | `eval`     | Node tree → text                               |
//! | `engine`   | Filters, tags, include cache                   |
//! | `filters`  | Built-in filters                               |
//!
//! Supported syntax: `{{ expr | filter: args }}`, `if`/`else`, `for`,
//! `include`, `log`, and registered extension tags.

mod context;
mod engine;
mod error;
mod eval;
mod filters;
mod markup;
mod parser;
mod value;

pub use context::{MAX_DEPTH, RenderContext, Scope};
pub use engine::{Engine, FilterFn, TagCall, TagFn};
pub use error::{RenderError, TemplateError};
pub use markup::{Markup, Param, parse_markup};
pub use value::{Object, Value};

use parser::Node;

/// A parsed template. Immutable and shareable across render workers.
#[derive(Debug)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub(crate) const fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn render(&self, ctx: &mut RenderContext<'_>) -> Result<String, RenderError> {
        let mut out = String::new();
        eval::render_nodes(&self.nodes, ctx, &mut out)?;
        Ok(out)
    }
}
