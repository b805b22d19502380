//! Document model: the site, its collections, documents and static files.
//!
//! # Module Structure
//!
//! | Module        | Purpose                                         |
//! |---------------|-------------------------------------------------|
//! | `keyed`       | Key-sorted list with replace-by-key insert      |
//! | `collection`  | `Collection` and the site's `Collections`       |
//! | `document`    | URL derivation, read interface, render pipeline |
//! | `static_file` | Copy-through sources                            |
//!
//! Collections own their documents; a document only remembers its
//! collection's name. The `Site` owns the collections and answers the
//! `site.*` keys templates read.

mod collection;
mod document;
mod keyed;
mod static_file;

pub use collection::{BUILTIN, Collection, Collections, DEFAULT_COLLECTION};
pub use document::{Document, LAYOUTS_COLLECTION};
pub use keyed::{Keyed, KeyedList};
pub use static_file::StaticFile;

use crate::config::SiteConfig;
use crate::template::{Object, RenderContext, RenderError, Value};
use crate::utils::fs::relative_path;
use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type DocumentIndex = BTreeMap<String, Vec<Arc<Document>>>;

#[derive(Debug)]
pub struct Site {
    pub source: PathBuf,
    pub target: PathBuf,
    pub config: SiteConfig,
    /// Configuration file relative to `source`, traced on every read.
    config_path: Option<String>,
    /// ISO-8601 build start.
    time: String,
    /// Snapshot of `config` as templates see it.
    data: Map<String, Json>,
    collections: Collections,
    categories: DocumentIndex,
    tags: DocumentIndex,
}

impl Site {
    pub fn new(
        source: &Path,
        target: &Path,
        config: SiteConfig,
        config_path: Option<&Path>,
        collections: Collections,
    ) -> Self {
        let mut categories = DocumentIndex::new();
        let mut tags = DocumentIndex::new();
        for doc in collections.documents() {
            for name in doc.categories() {
                categories.entry(name.clone()).or_default().push(Arc::clone(&doc));
            }
            for name in doc.tags() {
                tags.entry(name.clone()).or_default().push(Arc::clone(&doc));
            }
        }

        Self {
            source: source.to_path_buf(),
            target: target.to_path_buf(),
            config_path: config_path.and_then(|path| relative_path(source, path)),
            time: chrono::Local::now().to_rfc3339(),
            data: config.to_json(),
            config,
            collections,
            categories,
            tags,
        }
    }

    pub fn collections(&self) -> &Collections {
        &self.collections
    }

    pub fn time(&self) -> &str {
        &self.time
    }

    /// Configuration keys as templates see them.
    pub fn data(&self) -> &Map<String, Json> {
        &self.data
    }

    fn collection_documents(&self, name: &str) -> Value {
        self.collections
            .get(name)
            .map(|c| documents(c.documents().iter()))
            .unwrap_or_else(|| Value::List(Vec::new()))
    }
}

fn documents<'a>(docs: impl Iterator<Item = &'a Arc<Document>>) -> Value {
    Value::List(
        docs.map(|doc| Value::Object(Arc::clone(doc) as Arc<dyn Object>))
            .collect(),
    )
}

fn index(index: &DocumentIndex) -> Value {
    Value::Map(
        index
            .iter()
            .map(|(name, docs)| (name.clone(), documents(docs.iter())))
            .collect(),
    )
}

impl Object for Site {
    fn get(self: Arc<Self>, key: &str, ctx: &mut RenderContext<'_>) -> Result<Value, RenderError> {
        if let Some(path) = &self.config_path {
            ctx.trace(path)?;
        }

        Ok(match key {
            "time" => Value::from(self.time.as_str()),
            "pages" => self.collection_documents("pages"),
            "posts" => self.collection_documents("posts"),
            "html_pages" => self
                .collections
                .get(DEFAULT_COLLECTION)
                .map(|c| documents(c.documents().iter().filter(|d| d.is_html())))
                .unwrap_or_else(|| Value::List(Vec::new())),
            "collections" => Value::List(
                self.collections
                    .custom()
                    .into_iter()
                    .map(|c| {
                        Value::Object(Arc::new(CollectionRef {
                            site: Arc::clone(&self),
                            name: c.name().to_owned(),
                        }))
                    })
                    .collect(),
            ),
            "documents" => documents(self.collections.documents().iter()),
            "static_files" => Value::List(
                self.collections
                    .static_files()
                    .into_iter()
                    .map(StaticFile::to_value)
                    .collect(),
            ),
            "categories" => index(&self.categories),
            "tags" => index(&self.tags),
            "url" => self.config.url.as_deref().map(Value::from).unwrap_or_default(),
            "data" => Value::from_json_map(&self.data),
            _ if self.collections.get(key).is_some() => self.collection_documents(key),
            _ => self.data.get(key).map(Value::from_json).unwrap_or_default(),
        })
    }

    fn to_json(&self) -> Json {
        serde_json::json!({
            "time": self.time,
            "url": self.config.url,
            "data": self.data,
        })
    }
}

/// Read interface over one collection, as listed by `site.collections`.
#[derive(Debug)]
pub struct CollectionRef {
    site: Arc<Site>,
    name: String,
}

impl CollectionRef {
    fn collection(&self) -> Option<&Collection> {
        self.site.collections.get(&self.name)
    }
}

impl Object for CollectionRef {
    fn get(self: Arc<Self>, key: &str, _ctx: &mut RenderContext<'_>) -> Result<Value, RenderError> {
        let Some(collection) = self.collection() else {
            return Ok(Value::Nil);
        };
        Ok(match key {
            "name" | "label" => Value::from(collection.name()),
            "title" => Value::from(collection.title()),
            "docs" | "documents" => documents(collection.documents().iter()),
            "files" | "static_files" => Value::List(
                collection.static_files().iter().map(StaticFile::to_value).collect(),
            ),
            "relative_directory" => Value::from(collection.relative_directory()),
            "outputable" => Value::from(collection.is_outputable()),
            _ => collection
                .values()
                .get(key)
                .map(Value::from_json)
                .unwrap_or_default(),
        })
    }

    fn to_json(&self) -> Json {
        let mut map = self
            .collection()
            .map(|c| c.values().clone())
            .unwrap_or_default();
        map.insert("name".into(), Json::String(self.name.clone()));
        Json::Object(map)
    }

    fn to_text(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderEnv;
    use heckle_core::{Dependencies, DependencyGraph, NullDependencies};
    use serde_json::json;
    use tempfile::TempDir;

    fn fm(value: Json) -> Map<String, Json> {
        match value {
            Json::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn add(collections: &mut Collections, path: &str, front_matter: Json) {
        let collection = collections.collection_for_path(path);
        let data = collection.document_data(path, fm(front_matter));
        collection.add_document(Document::new(path, data, Some(String::new())));
    }

    fn site(dir: &Path, config_path: Option<&Path>) -> Arc<Site> {
        let config = SiteConfig::from_json(json!({
            "url": "https://example.com",
            "author": "Ann",
            "collections": {"recipes": {"title": "Recipes"}}
        }))
        .unwrap();
        let mut collections = Collections::new(&config);
        add(&mut collections, "index.html", json!({"title": "Home", "tags": "a b"}));
        add(&mut collections, "about.md", json!({"categories": ["info"]}));
        add(&mut collections, "_posts/p1.html", json!({"tags": ["a"]}));
        add(&mut collections, "_recipes/soup.html", json!({}));
        add(&mut collections, "_layouts/base.html", json!({"tags": ["hidden"]}));
        collections.collection_for_path("img/x.png").add_static_file("img/x.png");
        Arc::new(Site::new(dir, &dir.join("_site"), config, config_path, collections))
    }

    fn render(env: &RenderEnv, src: &str) -> String {
        let template = env.engine.parse(src).unwrap();
        let mut ctx = RenderContext::new(env, Value::Nil, Some("page.html".into()));
        template.render(&mut ctx).unwrap()
    }

    #[test]
    fn test_site_keys() {
        let dir = TempDir::new().unwrap();
        let env = RenderEnv::for_site(site(dir.path(), None), Arc::new(NullDependencies));

        assert_eq!(render(&env, "{{ site.url }}|{{ site.author }}"), "https://example.com|Ann");
        assert_eq!(render(&env, "{{ site.pages.size }}|{{ site.html_pages.size }}"), "2|1");
        assert_eq!(render(&env, "{% for p in site.posts %}{{ p.url }}{% endfor %}"), "/posts/p1.html");
        assert_eq!(render(&env, "{{ site.documents.size }}"), "4");
        assert_eq!(render(&env, "{{ site.static_files.first.target_path }}"), "img/x.png");
        assert_eq!(render(&env, "{{ site.tags.a.size }}|{{ site.tags.hidden.size }}"), "2|");
        assert_eq!(render(&env, "{{ site.categories.info.first.url }}"), "/about/");
        assert_eq!(render(&env, "{{ site.recipes.first.url }}"), "/recipes/soup.html");
        assert_eq!(render(&env, "{{ site.data.author }}"), "Ann");
        assert!(!render(&env, "{{ site.time }}").is_empty());
    }

    #[test]
    fn test_collection_view() {
        let dir = TempDir::new().unwrap();
        let env = RenderEnv::for_site(site(dir.path(), None), Arc::new(NullDependencies));
        let out = render(
            &env,
            "{% for c in site.collections %}{{ c }}:{{ c.title }}:{{ c.docs.size }}:{{ c.relative_directory }}:{{ c.outputable }}{% endfor %}",
        );
        assert_eq!(out, "recipes:Recipes:1:_recipes:true");
    }

    #[test]
    fn test_site_reads_trace_config_file() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("_config.yml");
        let graph = Arc::new(DependencyGraph::new(dir.path().join("deps"), "fp"));
        graph.start_trace(false);
        let env = RenderEnv::for_site(site(dir.path(), Some(&config)), graph.clone());

        render(&env, "{{ site.url }}");
        graph.end_trace();
        assert_eq!(graph.get_dependencies("page.html"), vec!["_config.yml"]);
    }
}
