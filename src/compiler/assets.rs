//! Static file copying.
//!
//! Target directories are created up front from the minimal set that
//! covers every file; files are then copied through an extension-keyed
//! processor table, verbatim by default.

use crate::extensions::{Extensions, StaticFn};
use crate::log;
use crate::logger::ProgressBars;
use crate::site::StaticFile;
use crate::utils::fs;
use anyhow::{Context, Result};
use heckle_core::batch;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Extension-keyed static processors, keys including the dot.
#[derive(Clone, Default)]
pub struct StaticProcessors {
    table: BTreeMap<String, Arc<StaticFn>>,
}

impl StaticProcessors {
    pub fn new(extensions: &Extensions) -> Self {
        let table = extensions
            .static_processors
            .iter()
            .map(|(ext, hook)| (ext.clone(), Arc::clone(&hook.func)))
            .collect();
        Self { table }
    }

    /// Process `file` from `source` into `target`.
    pub fn process(&self, file: &StaticFile, source: &Path, target: &Path) -> Result<()> {
        let from = source.join(&file.path);
        let to = target.join(&file.target_path);
        match self.table.get(&file.extname) {
            Some(processor) => processor(&from, &to),
            None => fs::copy_file(&from, &to)
                .with_context(|| format!("cannot copy `{}`", file.path)),
        }
    }
}

impl std::fmt::Debug for StaticProcessors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.table.keys()).finish()
    }
}

/// Smallest set of directories whose creation creates all of `dirs`.
///
/// A directory is dropped when another entry lies beneath it.
pub fn minimal_dirs<'a>(dirs: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut dirs: Vec<&str> = dirs.into_iter().filter(|d| !d.is_empty()).collect();
    dirs.sort_unstable();
    dirs.dedup();

    let mut minimal = Vec::with_capacity(dirs.len());
    for (i, dir) in dirs.iter().enumerate() {
        let covered = dirs
            .get(i + 1)
            .is_some_and(|next| next.strip_prefix(dir).is_some_and(|rest| rest.starts_with('/')));
        if !covered {
            minimal.push(*dir);
        }
    }
    minimal
}

/// Copy `files` into `target`. Returns `(copied, failed)`.
///
/// Directory creation failures abort; a failing file is logged and the
/// others continue.
pub fn copy_static_files(
    files: &[&StaticFile],
    source: &Path,
    target: &Path,
    processors: &StaticProcessors,
    workers: usize,
    progress: Option<&ProgressBars>,
) -> Result<(usize, usize)> {
    for dir in minimal_dirs(files.iter().map(|f| f.target_dir())) {
        let dir = target.join(dir);
        fs::ensure_dir(&dir).with_context(|| format!("cannot create `{}`", dir.display()))?;
    }

    let copied = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let result = batch(files, workers, |file, _| {
        match processors.process(file, source, target) {
            Ok(()) => {
                copied.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                log!("error"; "{}: {:#}", file.path, err);
                failed.fetch_add(1, Ordering::Relaxed);
            }
        }
        if let Some(progress) = progress {
            progress.inc_by_name("static");
        }
        Ok::<(), Infallible>(())
    });
    if let Err(never) = result {
        match never {}
    }

    Ok((copied.into_inner(), failed.into_inner()))
}
