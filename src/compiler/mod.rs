//! Build pipeline stages.
//!
//! - **discover**: Classify source files into collections
//! - **pages**: Render and write documents, serially or in parallel
//! - **assets**: Copy static files through their processors
//!
//! # Build Flow
//!
//! ```text
//! discover() ──► prepare_target() ──► write_documents() ──► copy_static_files()
//!     │                                     │                      │
//!     ▼                                     ▼                      ▼
//! Collections                          HTML files            static files
//! ```

pub mod assets;
pub mod discover;
pub mod pages;

pub use assets::{StaticProcessors, copy_static_files, minimal_dirs};
pub use discover::{Exclusions, discover};
pub use pages::{RenderStats, write_documents};

use crate::utils::fs;
use std::io;
use std::path::Path;

/// Top-level target entries that survive a full rebuild.
const PRESERVED: &[&str] = &[".git", "_locomote"];

/// Empty `target` unless incremental, then make sure it exists.
pub fn prepare_target(target: &Path, incremental: bool) -> io::Result<()> {
    if !incremental {
        fs::remove_tree_except(target, PRESERVED)?;
    }
    fs::ensure_dir(target)
}
