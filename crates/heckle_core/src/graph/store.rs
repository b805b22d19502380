//! Line-oriented JSON store for the dependency graph.
//!
//! # Format
//!
//! ```text
//! {"extensionsFingerprint":"…","pathCounter":N}   header
//! ["index.html",0]                                 path table
//! ["_layouts/default.html",1]
//! "--"
//! [0,[0,1]]                                        dependent → dependencies
//! "--"
//! ```
//!
//! Every line is a standalone JSON value. Writes go to a sibling temp file
//! that is renamed over the store once complete.

use super::{GraphError, GraphState, PathId, PathRegistry};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;

const SECTION_END: &str = "--";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Header {
    extensions_fingerprint: Option<String>,
    path_counter: u32,
}

/// Write `state` to `store`, recording it under `fingerprint`.
pub(super) fn write(store: &Path, fingerprint: &str, state: &GraphState) -> Result<(), GraphError> {
    let io_err = |e: std::io::Error| GraphError::Io(store.to_path_buf(), e);

    if let Some(parent) = store.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let tmp = store.with_extension("dependencies.tmp");
    let file = File::create(&tmp).map_err(io_err)?;
    let mut out = BufWriter::new(file);

    let header = Header {
        extensions_fingerprint: Some(fingerprint.to_owned()),
        path_counter: state.registry.counter(),
    };
    write_line(&mut out, &header).map_err(io_err)?;
    for entry in state.registry.entries() {
        write_line(&mut out, &entry).map_err(io_err)?;
    }
    write_line(&mut out, &SECTION_END).map_err(io_err)?;
    for (dependent, deps) in &state.dependencies {
        write_line(&mut out, &(dependent, deps)).map_err(io_err)?;
    }
    write_line(&mut out, &SECTION_END).map_err(io_err)?;

    out.flush().map_err(io_err)?;
    drop(out);
    fs::rename(&tmp, store).map_err(io_err)
}

fn write_line(out: &mut impl Write, value: &impl Serialize) -> std::io::Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    out.write_all(b"\n")
}

/// Read a store. `Ok(None)` if the file does not exist.
pub(super) fn read(store: &Path) -> Result<Option<GraphState>, GraphError> {
    let file = match File::open(store) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(GraphError::Io(store.to_path_buf(), e)),
    };

    let mut lines = BufReader::new(file)
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line));

    let mut next_line = || -> Result<Option<(usize, String)>, GraphError> {
        for (no, line) in lines.by_ref() {
            let line = line.map_err(|e| GraphError::Io(store.to_path_buf(), e))?;
            if !line.trim().is_empty() {
                return Ok(Some((no, line)));
            }
        }
        Ok(None)
    };

    let (no, line) = next_line()?.ok_or(GraphError::Corrupt {
        line: 1,
        message: "missing header".into(),
    })?;
    let header: Header = parse(no, &line)?;

    let mut entries = Vec::new();
    loop {
        let (no, line) = next_line()?.ok_or_else(|| truncated("path table"))?;
        if is_section_end(&line) {
            break;
        }
        entries.push(parse::<(String, PathId)>(no, &line)?);
    }
    let registry = PathRegistry::restore(header.path_counter, entries)
        .map_err(|message| GraphError::Corrupt { line: no, message })?;

    let mut dependencies = BTreeMap::new();
    loop {
        let (no, line) = next_line()?.ok_or_else(|| truncated("dependency table"))?;
        if is_section_end(&line) {
            break;
        }
        let (dependent, deps) = parse::<(PathId, BTreeSet<PathId>)>(no, &line)?;
        if let Some(bad) = std::iter::once(&dependent)
            .chain(&deps)
            .find(|id| registry.path(**id).is_none())
        {
            return Err(GraphError::Corrupt {
                line: no,
                message: format!("unknown path id {}", bad.0),
            });
        }
        dependencies.insert(dependent, deps);
    }

    Ok(Some(GraphState {
        registry,
        recorded_fingerprint: header.extensions_fingerprint,
        dependencies,
        ..GraphState::default()
    }))
}

fn parse<T: for<'de> Deserialize<'de>>(line: usize, text: &str) -> Result<T, GraphError> {
    serde_json::from_str(text).map_err(|e| GraphError::Corrupt {
        line,
        message: e.to_string(),
    })
}

fn is_section_end(line: &str) -> bool {
    matches!(serde_json::from_str::<String>(line), Ok(s) if s == SECTION_END)
}

fn truncated(section: &str) -> GraphError {
    GraphError::Corrupt {
        line: 0,
        message: format!("store ends inside the {section}"),
    }
}
