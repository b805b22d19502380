//! Configuration discovery.

use super::{BuildOptions, ConfigError, SiteConfig, defaults};
use crate::log;
use serde_json::Value as Json;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// A resolved configuration and the file it came from, if any.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub config: SiteConfig,
    pub path: Option<PathBuf>,
}

/// Resolve the site configuration for a build.
///
/// Order: inline config, explicit path, `_config.json`, `_config.yml`,
/// `_config.toml`, the `site` property of `locomote.json`, then an empty
/// default.
pub fn load_site_config(source: &Path, opts: &BuildOptions) -> Result<LoadedConfig, ConfigError> {
    if let Some(config) = &opts.config {
        config.validate()?;
        return Ok(LoadedConfig {
            config: config.clone(),
            path: opts.config_path.clone(),
        });
    }

    if let Some(path) = &opts.config_path {
        let content = read_optional(path)?.ok_or_else(|| ConfigError::NotFound(path.clone()))?;
        let config = parse_by_extension(path, &content)?;
        log!("config"; "loaded site configuration from {}", path.display());
        return Ok(LoadedConfig {
            config,
            path: Some(path.clone()),
        });
    }

    for name in defaults::discovery::config_files() {
        let path = source.join(name);
        if let Some(content) = read_optional(&path)? {
            let config = parse_by_extension(&path, &content)?;
            log!("config"; "loaded site configuration from {}", path.display());
            return Ok(LoadedConfig {
                config,
                path: Some(path),
            });
        }
    }

    let manifest = source.join(defaults::discovery::manifest());
    if let Some(content) = read_optional(&manifest)? {
        let mut json: Json = serde_json::from_str(&content)?;
        let site = json.get_mut("site").map(Json::take).unwrap_or(Json::Null);
        if !site.is_null() {
            let config = SiteConfig::from_json(site)?;
            log!("config"; "loaded site configuration from {}", manifest.display());
            return Ok(LoadedConfig {
                config,
                path: Some(manifest),
            });
        }
    }

    log!("config"; "no site configuration found");
    Ok(LoadedConfig::default())
}

fn parse_by_extension(path: &Path, content: &str) -> Result<SiteConfig, ConfigError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => SiteConfig::from_json(serde_json::from_str(content)?),
        Some("yml" | "yaml") => SiteConfig::from_yaml(content),
        Some("toml") => SiteConfig::from_toml(content),
        _ => Err(ConfigError::Unsupported(path.to_path_buf())),
    }
}

/// File contents, or `None` when the file does not exist.
fn read_optional(path: &Path) -> Result<Option<String>, ConfigError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(ConfigError::Io(path.to_path_buf(), err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn load(dir: &TempDir) -> Result<LoadedConfig, ConfigError> {
        load_site_config(dir.path(), &BuildOptions::default())
    }

    #[test]
    fn test_no_config() {
        let dir = TempDir::new().unwrap();
        let loaded = load(&dir).unwrap();
        assert!(loaded.path.is_none());
        assert!(loaded.config.url.is_none());
    }

    #[test]
    fn test_json_before_yaml() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("_config.json"), r#"{"title": "json"}"#).unwrap();
        fs::write(dir.path().join("_config.yml"), "title: yaml").unwrap();
        let loaded = load(&dir).unwrap();
        assert_eq!(loaded.config.extra["title"], json!("json"));
        assert_eq!(loaded.path, Some(dir.path().join("_config.json")));
    }

    #[test]
    fn test_yaml_then_toml() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("_config.toml"), "title = \"toml\"").unwrap();
        assert_eq!(load(&dir).unwrap().config.extra["title"], json!("toml"));

        fs::write(dir.path().join("_config.yml"), "title: yaml").unwrap();
        assert_eq!(load(&dir).unwrap().config.extra["title"], json!("yaml"));
    }

    #[test]
    fn test_manifest_site_property() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("locomote.json"),
            r#"{"name": "app", "site": {"url": "https://m.example"}}"#,
        )
        .unwrap();
        let loaded = load(&dir).unwrap();
        assert_eq!(loaded.config.url.as_deref(), Some("https://m.example"));
        assert!(!loaded.config.extra.contains_key("name"));
    }

    #[test]
    fn test_manifest_without_site() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("locomote.json"), r#"{"name": "app"}"#).unwrap();
        assert!(load(&dir).unwrap().path.is_none());
    }

    #[test]
    fn test_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("site.yaml");
        fs::write(&path, "url: https://e.example").unwrap();
        fs::write(dir.path().join("_config.json"), "{}").unwrap();

        let opts = BuildOptions {
            config_path: Some(path.clone()),
            ..BuildOptions::default()
        };
        let loaded = load_site_config(dir.path(), &opts).unwrap();
        assert_eq!(loaded.config.url.as_deref(), Some("https://e.example"));
        assert_eq!(loaded.path, Some(path));
    }

    #[test]
    fn test_explicit_path_errors() {
        let dir = TempDir::new().unwrap();
        let missing = BuildOptions {
            config_path: Some(dir.path().join("nope.json")),
            ..BuildOptions::default()
        };
        assert!(matches!(
            load_site_config(dir.path(), &missing),
            Err(ConfigError::NotFound(_))
        ));

        let ini = dir.path().join("site.ini");
        fs::write(&ini, "x=1").unwrap();
        let unsupported = BuildOptions {
            config_path: Some(ini),
            ..BuildOptions::default()
        };
        assert!(matches!(
            load_site_config(dir.path(), &unsupported),
            Err(ConfigError::Unsupported(_))
        ));
    }

    #[test]
    fn test_inline_config_wins() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("_config.json"), r#"{"title": "file"}"#).unwrap();
        let opts = BuildOptions {
            config: Some(SiteConfig::from_json(json!({"title": "inline"})).unwrap()),
            ..BuildOptions::default()
        };
        let loaded = load_site_config(dir.path(), &opts).unwrap();
        assert_eq!(loaded.config.extra["title"], json!("inline"));
    }

    #[test]
    fn test_malformed_config() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("_config.json"), "{oops").unwrap();
        assert!(matches!(load(&dir), Err(ConfigError::Json(_))));
    }
}
