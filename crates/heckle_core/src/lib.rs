//! Core infrastructure for incremental document pipelines.
//!
//! This crate holds the parts of the build engine that know nothing about
//! documents, templates or sites:
//!
//! - **graph**: path-keyed dependency graph with trace-time edge recording,
//!   transitive-dependent queries and an append-only on-disk store
//! - **fingerprint**: stable hash over an extension surface
//! - **batch**: bounded worker pool draining a shared item cursor
//!
//! # Incremental Flow
//!
//! ```text
//! load() ──► start_trace() ──► trace()* ──► end_trace() ──► save()
//!   │                                                        │
//!   └──────────── get_build_list(changed, fingerprint) ◄─────┘
//!                        (next build)
//! ```

pub mod batch;
pub mod fingerprint;
pub mod graph;

pub use batch::batch;
pub use fingerprint::{Fingerprint, fingerprint};
pub use graph::{
    Dependencies, DependencyGraph, GraphError, NullDependencies, PathId, PathRegistry,
};
