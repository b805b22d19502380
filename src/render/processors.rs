//! Content post-processors, applied to a document body after template
//! evaluation so markup conversion never sees unexpanded tags.

use crate::extensions::{ContentFn, Extensions};
use crate::template::RenderError;
use pulldown_cmark::{Options, Parser, html::push_html};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Extension-keyed processor table. Unlisted extensions pass through.
#[derive(Clone)]
pub struct ContentProcessors {
    table: BTreeMap<String, Arc<ContentFn>>,
}

impl ContentProcessors {
    /// Built-ins, overridden by extension processors of the same key.
    pub fn new(extensions: &Extensions) -> Self {
        let mut processors = Self::default();
        for (ext, hook) in &extensions.content_processors {
            processors.table.insert(ext.clone(), Arc::clone(&hook.func));
        }
        processors
    }

    pub fn process(&self, path: &str, content: String) -> Result<String, RenderError> {
        let ext = Path::new(path)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        match self.table.get(&ext) {
            Some(processor) => processor(path, content),
            None => Ok(content),
        }
    }
}

impl Default for ContentProcessors {
    fn default() -> Self {
        let md: Arc<ContentFn> = Arc::new(markdown);
        Self {
            table: BTreeMap::from([(".md".to_owned(), md)]),
        }
    }
}

impl fmt::Debug for ContentProcessors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.table.keys()).finish()
    }
}

/// Markdown to HTML with GFM tables, strikethrough and task lists. Raw HTML
/// passes through.
fn markdown(_path: &str, content: String) -> Result<String, RenderError> {
    let options =
        Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS | Options::ENABLE_TABLES;
    let parser = Parser::new_ext(&content, options);
    let mut html = String::with_capacity(content.len() * 2);
    push_html(&mut html, parser);
    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_converted() {
        let processors = ContentProcessors::default();
        let html = processors
            .process("a.md", "# Hi\n\n<div class=\"x\">raw</div>\n".into())
            .unwrap();
        assert!(html.contains("<h1>Hi</h1>"));
        assert!(html.contains("<div class=\"x\">raw</div>"));
    }

    #[test]
    fn test_other_extensions_unchanged() {
        let processors = ContentProcessors::default();
        assert_eq!(processors.process("a.html", "# Hi".into()).unwrap(), "# Hi");
        assert_eq!(processors.process("README", "# Hi".into()).unwrap(), "# Hi");
    }

    #[test]
    fn test_extension_processor_overrides() {
        let ext = Extensions::new()
            .with_content_processor(".md", "plain@1", |_, s| Ok(format!("<pre>{s}</pre>")))
            .with_content_processor(".txt", "txt@1", |path, _| {
                Err(RenderError::Process {
                    path: path.to_owned(),
                    message: "nope".into(),
                })
            });
        let processors = ContentProcessors::new(&ext);
        assert_eq!(processors.process("a.md", "x".into()).unwrap(), "<pre>x</pre>");
        assert!(matches!(
            processors.process("b.txt", "x".into()),
            Err(RenderError::Process { .. })
        ));
    }
}
