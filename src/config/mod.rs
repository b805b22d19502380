//! Site configuration and build options.
//!
//! # Sources
//!
//! | Source                 | Format                          |
//! |------------------------|---------------------------------|
//! | inline                 | `BuildOptions::config`          |
//! | explicit path          | `.json`, `.yml`/`.yaml`, `.toml`|
//! | `_config.json`         | JSON                            |
//! | `_config.yml`          | YAML                            |
//! | `_config.toml`         | TOML                            |
//! | `locomote.json`        | JSON, `site` property           |
//!
//! # Example
//!
//! ```yaml
//! url: https://example.com
//! exclude: [drafts/**, "*.psd"]
//! extensions: highlight
//! collections:
//!   recipes:
//!     permalink: /cooking/:name/
//!     title: Recipes
//! author: Jane
//! ```
//!
//! Keys other than the ones `SiteConfig` names are kept in `extra` and are
//! visible to templates as globals.

pub mod defaults;
mod error;
mod loader;
mod options;

pub use error::ConfigError;
pub use loader::{LoadedConfig, load_site_config};
pub use options::{BuildMode, BuildOptions};

use educe::Educe;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;

// ============================================================================
// Root Configuration
// ============================================================================

#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
pub struct SiteConfig {
    /// Site base URL, exposed as `site.url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Glob patterns of source paths to skip.
    #[serde(default, skip_serializing_if = "ExcludeList::is_empty")]
    pub exclude: ExcludeList,

    /// Declared collections; built-ins may be redeclared.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub collections: BTreeMap<String, CollectionConfig>,

    /// Comma-separated names of extension bundles to enable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<String>,

    /// Everything else.
    #[serde(flatten)]
    pub extra: Map<String, Json>,
}

/// `exclude` accepts a list or a comma-separated string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ExcludeList {
    List(Vec<String>),
    Csv(String),
}

impl Default for ExcludeList {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl ExcludeList {
    pub fn patterns(&self) -> Vec<String> {
        match self {
            Self::List(list) => list.clone(),
            Self::Csv(csv) => csv
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_owned)
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns().is_empty()
    }
}

/// One entry under `collections`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Permalink template applied to documents without their own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permalink: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<bool>,

    #[serde(
        default,
        rename = "_outputable",
        skip_serializing_if = "Option::is_none"
    )]
    pub outputable: Option<bool>,

    /// Values merged into each member document's data (`title`, …).
    #[serde(flatten)]
    pub values: Map<String, Json>,
}

impl CollectionConfig {
    pub fn outputable(outputable: bool) -> Self {
        Self {
            outputable: Some(outputable),
            ..Self::default()
        }
    }

    /// Collections are written out unless configured otherwise.
    pub fn is_outputable(&self) -> bool {
        self.outputable.or(self.output).unwrap_or(true)
    }
}

impl SiteConfig {
    /// Build from a parsed JSON document; `null` yields the default config.
    pub fn from_json(json: Json) -> Result<Self, ConfigError> {
        if json.is_null() {
            return Ok(Self::default());
        }
        let config: Self = serde_json::from_value(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Option<Self> = serde_yaml::from_str(content)?;
        let config = config.unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// All configuration keys as a JSON object, as templates see them.
    pub fn to_json(&self) -> Map<String, Json> {
        match serde_json::to_value(self) {
            Ok(Json::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Glob patterns excluded from discovery, built-ins first.
    pub fn exclude_patterns(&self) -> Vec<String> {
        let mut patterns = defaults::discovery::exclude();
        patterns.extend(self.exclude.patterns());
        patterns
    }

    /// Names listed under `extensions`.
    pub fn extension_names(&self) -> Vec<&str> {
        self.extensions
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for pattern in self.exclude.patterns() {
            glob::Pattern::new(&pattern).map_err(|err| {
                ConfigError::Validation(format!("[exclude] invalid pattern `{pattern}`: {err}"))
            })?;
        }

        if let Some(name) = self
            .collections
            .keys()
            .find(|name| name.is_empty() || name.contains('/'))
        {
            return Err(ConfigError::Validation(format!(
                "[collections] invalid collection name `{name}`"
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_yaml_config() {
        let config = SiteConfig::from_yaml(
            r#"
url: https://example.com
exclude: [drafts/**]
collections:
  recipes:
    permalink: /cooking/:name/
    title: Recipes
  notes:
    output: false
author: Jane
"#,
        )
        .unwrap();

        assert_eq!(config.url.as_deref(), Some("https://example.com"));
        assert_eq!(config.exclude.patterns(), vec!["drafts/**"]);
        let recipes = &config.collections["recipes"];
        assert_eq!(recipes.permalink.as_deref(), Some("/cooking/:name/"));
        assert_eq!(recipes.values["title"], json!("Recipes"));
        assert!(recipes.is_outputable());
        assert!(!config.collections["notes"].is_outputable());
        assert_eq!(config.extra["author"], json!("Jane"));
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = SiteConfig::from_yaml("").unwrap();
        assert!(config.url.is_none());
        assert!(config.collections.is_empty());
    }

    #[test]
    fn test_csv_exclude() {
        let config = SiteConfig::from_json(json!({"exclude": "a/*, b.txt,"})).unwrap();
        assert_eq!(config.exclude.patterns(), vec!["a/*", "b.txt"]);
        assert_eq!(
            config.exclude_patterns(),
            vec!["_site/*", "_site/**/*", "a/*", "b.txt"]
        );
    }

    #[test]
    fn test_outputable_alias() {
        let config = SiteConfig::from_json(json!({
            "collections": {"a": {"_outputable": false}, "b": {}}
        }))
        .unwrap();
        assert!(!config.collections["a"].is_outputable());
        assert!(config.collections["b"].is_outputable());
    }

    #[test]
    fn test_to_json_includes_all_keys() {
        let config = SiteConfig::from_toml(
            r#"
url = "https://x.org"
title = "Site"

[collections.recipes]
permalink = "/r/:name/"
"#,
        )
        .unwrap();
        let map = config.to_json();
        assert_eq!(map["url"], json!("https://x.org"));
        assert_eq!(map["title"], json!("Site"));
        assert_eq!(map["collections"]["recipes"]["permalink"], json!("/r/:name/"));
        assert!(!map.contains_key("exclude"));
    }

    #[test]
    fn test_extension_names() {
        let config = SiteConfig::from_json(json!({"extensions": "a, b ,,c"})).unwrap();
        assert_eq!(config.extension_names(), vec!["a", "b", "c"]);
        assert!(SiteConfig::default().extension_names().is_empty());
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            SiteConfig::from_json(json!({"exclude": ["a/[b"]})),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            SiteConfig::from_json(json!({"collections": {"a/b": {}}})),
            Err(ConfigError::Validation(_))
        ));
    }
}
