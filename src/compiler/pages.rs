//! Document rendering: serial or through the worker pool.

use crate::config::BuildMode;
use crate::log;
use crate::logger::ProgressBars;
use crate::render::RenderEnv;
use crate::site::Document;
use crate::utils::memory;
use heckle_core::batch;
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters from one rendering pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderStats {
    pub written: usize,
    /// Highest allocator usage seen after a write.
    pub peak_memory_bytes: usize,
}

/// Render and write `docs`.
///
/// A failing document is logged and counted on `env`; it never stops the
/// others.
pub fn write_documents(
    env: &RenderEnv,
    docs: &[Arc<Document>],
    workers: usize,
    progress: Option<&ProgressBars>,
) -> RenderStats {
    let written = AtomicUsize::new(0);
    let peak = AtomicUsize::new(memory::current_usage());

    let write_one = |doc: &Arc<Document>| {
        match doc.write(env) {
            Ok(()) => {
                written.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                log!("error"; "{err}");
                env.record_failure();
            }
        }
        peak.fetch_max(memory::current_usage(), Ordering::Relaxed);
        if let Some(progress) = progress {
            progress.inc_by_name("documents");
        }
    };

    match env.mode {
        BuildMode::Serial => {
            for doc in docs {
                write_one(doc);
            }
        }
        BuildMode::Parallel => {
            let result = batch(docs, workers, |doc, _| {
                write_one(doc);
                Ok::<(), Infallible>(())
            });
            if let Err(never) = result {
                match never {}
            }
        }
    }

    RenderStats {
        written: written.into_inner(),
        peak_memory_bytes: peak.into_inner(),
    }
}
