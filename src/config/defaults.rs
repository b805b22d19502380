//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization and by
//! `educe` for `Default` impls.

// ============================================================================
// Common Defaults
// ============================================================================

pub fn r#true() -> bool {
    true
}

// ============================================================================
// Build Option Defaults
// ============================================================================

pub mod build {
    /// Worker count for rendering, discovery and static copying.
    pub fn workers() -> usize {
        20
    }

    /// Bodies above this size are re-read from disk when rendered.
    pub fn cache_html_limit() -> usize {
        1024 * 100
    }
}

// ============================================================================
// Discovery Defaults
// ============================================================================

pub mod discovery {
    /// Always excluded, in case the source contains a built `_site`.
    pub fn exclude() -> Vec<String> {
        vec!["_site/*".into(), "_site/**/*".into()]
    }

    /// Candidate config files under the source root, in lookup order.
    pub fn config_files() -> [&'static str; 3] {
        ["_config.json", "_config.yml", "_config.toml"]
    }

    /// Manifest whose `site` property holds the configuration.
    pub fn manifest() -> &'static str {
        "locomote.json"
    }
}
