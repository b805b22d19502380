//! heckle - incremental static site builder.
//!
//! Sources are classified into collections, rendered through a Liquid-style
//! template engine and written to a target tree. Every file a document reads
//! while rendering is recorded in a dependency graph, so a later build given
//! a list of changed files renders only the documents those files can affect.
//!
//! # Modules
//!
//! | Module       | Role                                                   |
//! |--------------|--------------------------------------------------------|
//! | `config`     | site configuration discovery, build options            |
//! | `template`   | parser, evaluator, filters and tags                    |
//! | `site`       | documents, static files, collections, the site object  |
//! | `render`     | layouts, page proxies, content processors              |
//! | `compiler`   | discovery, document writing, static copying            |
//! | `extensions` | init hooks, layouts, tags, filters, processors         |
//! | `build`      | orchestration and the build result                     |

pub mod build;
pub mod compiler;
pub mod config;
pub mod error;
pub mod extensions;
pub mod logger;
pub mod render;
pub mod site;
pub mod template;
pub mod utils;

pub use build::{SiteBuilder, build_site};
pub use config::{BuildMode, BuildOptions, SiteConfig};
pub use error::{BuildError, BuildResult, DocumentError};
pub use extensions::{ExtensionRegistry, Extensions};
