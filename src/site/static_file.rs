//! Files copied to the target tree.

use super::keyed::Keyed;
use crate::template::Value;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFile {
    /// Source path relative to the site root.
    pub path: String,
    pub basename: String,
    /// Extension including the dot, or empty.
    pub extname: String,
    /// Basename without extension.
    pub name: String,
    /// Target path relative to the output root; a leading `_` is dropped.
    pub target_path: String,
}

impl StaticFile {
    pub fn new(path: &str) -> Self {
        let p = Path::new(path);
        let basename = p
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extname = p
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let name = p
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let target_path = path.strip_prefix('_').unwrap_or(path).to_owned();

        Self {
            path: path.to_owned(),
            basename,
            extname,
            name,
            target_path,
        }
    }

    /// Parent directory of the target path, `""` for the output root.
    pub fn target_dir(&self) -> &str {
        self.target_path
            .rsplit_once('/')
            .map_or("", |(dir, _)| dir)
    }

    pub fn to_value(&self) -> Value {
        Value::Map(BTreeMap::from([
            ("path".to_owned(), Value::from(self.path.as_str())),
            ("basename".to_owned(), Value::from(self.basename.as_str())),
            ("extname".to_owned(), Value::from(self.extname.as_str())),
            ("name".to_owned(), Value::from(self.name.as_str())),
            ("target_path".to_owned(), Value::from(self.target_path.as_str())),
        ]))
    }
}

impl Keyed for StaticFile {
    fn key(&self) -> &str {
        &self.path
    }
}
