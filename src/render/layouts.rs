//! Layout resolution.
//!
//! | Source                         | Keys                          | Precedence |
//! |--------------------------------|-------------------------------|------------|
//! | built-in echo                  | `compress`, `__default`       | lowest     |
//! | extension (programmatic)       | registered name               |            |
//! | `_layouts/` documents          | `base.html` and `base`        | highest    |

use crate::extensions::{Extensions, LayoutFn};
use crate::site::{Collection, Document};
use crate::template::{RenderContext, RenderError};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Fallback used when a document names no layout or an unknown one.
pub const DEFAULT_LAYOUT: &str = "__default";

const LAYOUTS_DIR: &str = "_layouts/";

#[derive(Clone)]
pub enum Layout {
    /// Writes the wrapped page's content unchanged.
    Echo,
    Programmatic(Arc<LayoutFn>),
    Document(Arc<Document>),
}

impl Layout {
    /// Render with `ctx`, whose target is the page being wrapped.
    pub fn output(&self, ctx: &mut RenderContext<'_>) -> Result<String, RenderError> {
        match self {
            Self::Echo => {
                let page = ctx.environment().clone();
                Ok(page.get_key("content", ctx)?.render())
            }
            Self::Programmatic(f) => f(ctx),
            Self::Document(doc) => doc.output(ctx),
        }
    }
}

impl fmt::Debug for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Echo => f.write_str("Echo"),
            Self::Programmatic(_) => f.write_str("Programmatic"),
            Self::Document(doc) => f.debug_tuple("Document").field(&doc.path()).finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Layouts {
    map: BTreeMap<String, Layout>,
}

impl Default for Layouts {
    fn default() -> Self {
        Self {
            map: BTreeMap::from([
                ("compress".to_owned(), Layout::Echo),
                (DEFAULT_LAYOUT.to_owned(), Layout::Echo),
            ]),
        }
    }
}

impl Layouts {
    pub fn new(extensions: &Extensions, layouts: Option<&Collection>) -> Self {
        let mut map = Self::default().map;
        for (name, hook) in &extensions.layouts {
            map.insert(name.clone(), Layout::Programmatic(Arc::clone(&hook.func)));
        }

        for doc in layouts.into_iter().flat_map(|c| c.documents()) {
            let name = doc.path().strip_prefix(LAYOUTS_DIR).unwrap_or(doc.path());
            let layout = Layout::Document(Arc::clone(doc));
            if let Some(stem) = strip_extension(name) {
                map.insert(stem.to_owned(), layout.clone());
            }
            map.insert(name.to_owned(), layout);
        }
        Self { map }
    }

    pub fn get(&self, name: &str) -> Option<&Layout> {
        self.map.get(name)
    }

    /// Layout for `name`, falling back to the default echo layout.
    pub fn resolve(&self, name: Option<&str>) -> Layout {
        name.and_then(|name| self.map.get(name))
            .or_else(|| self.map.get(DEFAULT_LAYOUT))
            .cloned()
            .unwrap_or(Layout::Echo)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// `name` without the extension of its last segment, if it has one.
fn strip_extension(name: &str) -> Option<&str> {
    let file_start = name.rfind('/').map_or(0, |i| i + 1);
    name[file_start..]
        .rfind('.')
        .filter(|&dot| dot > 0)
        .map(|dot| &name[..file_start + dot])
}
