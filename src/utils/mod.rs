//! Utility modules for the build engine.

pub mod frontmatter;
pub mod fs;
pub mod memory;
