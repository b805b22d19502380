//! Collections: named, ordered groups of documents and static files.

use super::document::Document;
use super::keyed::KeyedList;
use super::static_file::StaticFile;
use crate::config::{CollectionConfig, SiteConfig};
use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Built-in collections and whether they are written out.
pub const BUILTIN: [(&str, bool); 5] = [
    ("layouts", false),
    ("includes", false),
    ("pages", true),
    ("posts", true),
    ("sass", false),
];

/// Collection for sources outside any `_name/` directory.
pub const DEFAULT_COLLECTION: &str = "pages";

const OUTPUTABLE_KEY: &str = "_outputable";

#[derive(Debug, Clone)]
pub struct Collection {
    name: String,
    permalink: Option<String>,
    /// Merged under each member document's front matter.
    values: Map<String, Json>,
    documents: KeyedList<Arc<Document>>,
    static_files: KeyedList<StaticFile>,
}

impl Collection {
    pub fn new(name: &str, config: &CollectionConfig) -> Self {
        let mut values = config.values.clone();
        values.insert(OUTPUTABLE_KEY.into(), Json::Bool(config.is_outputable()));
        Self {
            name: name.to_owned(),
            permalink: config.permalink.clone(),
            values,
            documents: KeyedList::new(),
            static_files: KeyedList::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured `title`, else the name.
    pub fn title(&self) -> String {
        match self.values.get("title") {
            Some(Json::String(title)) => title.clone(),
            _ => self.name.clone(),
        }
    }

    pub fn relative_directory(&self) -> String {
        format!("_{}", self.name)
    }

    pub fn is_outputable(&self) -> bool {
        self.values.get(OUTPUTABLE_KEY) == Some(&Json::Bool(true))
    }

    pub fn permalink(&self) -> Option<&str> {
        self.permalink.as_deref()
    }

    pub fn values(&self) -> &Map<String, Json> {
        &self.values
    }

    pub fn documents(&self) -> &KeyedList<Arc<Document>> {
        &self.documents
    }

    pub fn static_files(&self) -> &KeyedList<StaticFile> {
        &self.static_files
    }

    /// Collection values overlaid with `front_matter`, plus a permalink
    /// from the collection pattern when the document has none.
    pub fn document_data(&self, path: &str, front_matter: Map<String, Json>) -> Map<String, Json> {
        let permalink = match front_matter.get("permalink") {
            Some(Json::String(p)) if !p.is_empty() => None,
            _ => self.make_permalink(path, &front_matter),
        };

        let mut data = self.values.clone();
        data.extend(front_matter);
        if let Some(permalink) = permalink {
            data.insert("permalink".into(), Json::String(permalink));
        }
        data
    }

    /// Expand the collection permalink pattern for `path`.
    ///
    /// Placeholders: `:collection`, `:path`, `:name`, `:title` (front matter
    /// `slug`, else the basename) and `:output_ext`.
    pub fn make_permalink(&self, path: &str, front_matter: &Map<String, Json>) -> Option<String> {
        let pattern = self.permalink.as_deref()?;
        let p = Path::new(path);
        let basename = p
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = p
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let title = match front_matter.get("slug") {
            Some(Json::String(slug)) if !slug.is_empty() => slug.clone(),
            _ => basename.clone(),
        };

        // `:collection` before `:path` etc. so no replacement feeds another.
        let placeholders = [
            (":collection", self.name.as_str()),
            (":output_ext", ext.as_str()),
            (":path", path),
            (":name", basename.as_str()),
            (":title", title.as_str()),
        ];
        let mut permalink = String::with_capacity(pattern.len());
        let mut rest = pattern;
        'scan: while !rest.is_empty() {
            for (placeholder, value) in placeholders {
                if let Some(tail) = rest.strip_prefix(placeholder) {
                    permalink.push_str(value);
                    rest = tail;
                    continue 'scan;
                }
            }
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                permalink.push(c);
            }
            rest = chars.as_str();
        }
        Some(permalink)
    }

    /// Add `doc`, replacing any document with the same path.
    pub fn add_document(&mut self, mut doc: Document) -> Arc<Document> {
        doc.assign_collection(&self.name);
        let doc = Arc::new(doc);
        self.documents.insert(Arc::clone(&doc));
        doc
    }

    pub fn add_static_file(&mut self, path: &str) {
        self.static_files.insert(StaticFile::new(path));
    }
}

// ============================================================================
// Collections
// ============================================================================

/// All collections of a site, keyed by name.
#[derive(Debug, Clone)]
pub struct Collections {
    map: BTreeMap<String, Collection>,
}

impl Collections {
    /// Built-ins, then collections declared in `config`.
    pub fn new(config: &SiteConfig) -> Self {
        let mut map = BTreeMap::new();
        for (name, outputable) in BUILTIN {
            map.insert(
                name.to_owned(),
                Collection::new(name, &CollectionConfig::outputable(outputable)),
            );
        }
        for (name, collection) in &config.collections {
            map.insert(name.clone(), Collection::new(name, collection));
        }
        Self { map }
    }

    /// Name of the collection owning `path`: `_name/…` → `name`, anything
    /// else → `pages`.
    pub fn collection_name_for_path(path: &str) -> &str {
        match path.strip_prefix('_') {
            Some(rest) => rest.split_once('/').map_or(rest, |(name, _)| name),
            None => DEFAULT_COLLECTION,
        }
    }

    /// Collection owning `path`, created as outputable when unknown.
    pub fn collection_for_path(&mut self, path: &str) -> &mut Collection {
        let name = Self::collection_name_for_path(path);
        self.map
            .entry(name.to_owned())
            .or_insert_with(|| Collection::new(name, &CollectionConfig::outputable(true)))
    }

    pub fn get(&self, name: &str) -> Option<&Collection> {
        self.map.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Collection> {
        self.map.values()
    }

    fn outputable(&self) -> impl Iterator<Item = &Collection> {
        self.map.values().filter(|c| c.is_outputable())
    }

    /// Documents in outputable collections.
    pub fn documents(&self) -> Vec<Arc<Document>> {
        self.outputable()
            .flat_map(|c| c.documents.iter().cloned())
            .collect()
    }

    /// Static files in outputable collections.
    pub fn static_files(&self) -> Vec<&StaticFile> {
        self.outputable().flat_map(|c| c.static_files.iter()).collect()
    }

    pub fn document_count(&self) -> usize {
        self.outputable().map(|c| c.documents.len()).sum()
    }

    pub fn static_file_count(&self) -> usize {
        self.outputable().map(|c| c.static_files.len()).sum()
    }

    /// Collections that are not built in.
    pub fn custom(&self) -> Vec<&Collection> {
        self.map
            .values()
            .filter(|c| !BUILTIN.iter().any(|(name, _)| *name == c.name))
            .collect()
    }
}
