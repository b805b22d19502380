//! YAML front matter.
//!
//! ```text
//! ---
//! title: Hello
//! layout: post
//! ---
//! body…
//! ```
//!
//! A file without a leading `---` line, or without a closing one, has no
//! front matter and is not a templated document.

use serde_json::{Map, Value as Json};
use std::path::Path;
use thiserror::Error;

const DELIMITER: &str = "---";

#[derive(Debug, Error)]
pub enum FrontMatterError {
    #[error("invalid front matter YAML")]
    Yaml(#[from] serde_yaml::Error),

    #[error("front matter must be a mapping")]
    NotMapping,
}

/// Parsed front matter and the remaining body.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontMatter {
    pub data: Map<String, Json>,
    pub body: String,
}

/// Split `content` into the raw YAML block and the body.
fn split(content: &str) -> Option<(&str, &str)> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let first_end = content.find('\n').unwrap_or(content.len());
    if content[..first_end].trim_end() != DELIMITER {
        return None;
    }

    let rest = content.get(first_end + 1..)?;
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == DELIMITER {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// Parse front matter; `Ok(None)` when the content has none.
pub fn parse(content: &str) -> Result<Option<FrontMatter>, FrontMatterError> {
    let Some((yaml, body)) = split(content) else {
        return Ok(None);
    };

    let data = match serde_yaml::from_str::<Option<Json>>(yaml)? {
        None | Some(Json::Null) => Map::new(),
        Some(Json::Object(map)) => map,
        Some(_) => return Err(FrontMatterError::NotMapping),
    };

    Ok(Some(FrontMatter {
        data,
        body: body.to_owned(),
    }))
}

/// Body of the file at `path` with any front matter removed.
pub fn read_body(path: &Path) -> std::io::Result<String> {
    let content = std::fs::read_to_string(path)?;
    Ok(match split(&content) {
        Some((_, body)) => body.to_owned(),
        None => content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_basic() {
        let fm = parse("---\ntitle: Hello\ntags: [a, b]\n---\n<p>hi</p>\n")
            .unwrap()
            .unwrap();
        assert_eq!(fm.data["title"], json!("Hello"));
        assert_eq!(fm.data["tags"], json!(["a", "b"]));
        assert_eq!(fm.body, "<p>hi</p>\n");
    }

    #[test]
    fn test_empty_block_is_document() {
        let fm = parse("---\n---\nbody").unwrap().unwrap();
        assert!(fm.data.is_empty());
        assert_eq!(fm.body, "body");
    }

    #[test]
    fn test_no_front_matter() {
        assert!(parse("<p>plain</p>").unwrap().is_none());
        assert!(parse("---\ntitle: x\nno close").unwrap().is_none());
        assert!(parse("").unwrap().is_none());
        assert!(parse("--- \n").unwrap().is_none());
    }

    #[test]
    fn test_crlf_and_bom() {
        let fm = parse("\u{feff}---\r\ntitle: x\r\n---\r\nbody").unwrap().unwrap();
        assert_eq!(fm.data["title"], json!("x"));
        assert_eq!(fm.body, "body");
    }

    #[test]
    fn test_not_mapping() {
        assert!(matches!(parse("---\n- a\n---\n"), Err(FrontMatterError::NotMapping)));
        assert!(matches!(parse("---\na: [\n---\n"), Err(FrontMatterError::Yaml(_))));
    }

    #[test]
    fn test_read_body() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a.html");
        std::fs::write(&path, "---\nx: 1\n---\nBODY").unwrap();
        assert_eq!(read_body(&path).unwrap(), "BODY");
    }
}
