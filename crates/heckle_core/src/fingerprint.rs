//! Fingerprints over an executable extension surface.
//!
//! A fingerprint summarizes everything that can change build output without
//! any source file changing: init hooks, programmatic layouts, tags and
//! filters. Callers feed components in a deterministic order; a differing
//! token means every incremental result recorded under the old token is stale.

/// Number of hex characters kept from the digest.
const FINGERPRINT_LEN: usize = 20;

/// Incremental hasher for fingerprint components.
///
/// Each component is length-prefixed so `["ab", "c"]` and `["a", "bc"]`
/// produce different tokens.
#[derive(Default)]
pub struct Fingerprint {
    hasher: blake3::Hasher,
}

impl Fingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one component.
    pub fn update(&mut self, part: &str) -> &mut Self {
        self.hasher.update(&(part.len() as u64).to_le_bytes());
        self.hasher.update(part.as_bytes());
        self
    }

    /// Finish and return the truncated hex token.
    pub fn finish(&self) -> String {
        let hex = self.hasher.finalize().to_hex();
        hex[..FINGERPRINT_LEN].to_string()
    }
}

/// Hash a sequence of components into a fingerprint token.
pub fn fingerprint<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut fp = Fingerprint::new();
    for part in parts {
        fp.update(part);
    }
    fp.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_deterministic() {
        let a = fingerprint(["init:v1", "layout:compress:v2"]);
        let b = fingerprint(["init:v1", "layout:compress:v2"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), FINGERPRINT_LEN);
    }

    #[test]
    fn test_fingerprint_component_boundaries() {
        assert_ne!(fingerprint(["ab", "c"]), fingerprint(["a", "bc"]));
    }

    #[test]
    fn test_fingerprint_changes_with_body() {
        assert_ne!(fingerprint(["filter:x:v1"]), fingerprint(["filter:x:v2"]));
    }

    #[test]
    fn test_fingerprint_empty_surface() {
        // An extension-less build still has a well-defined token.
        assert_eq!(fingerprint(Vec::<&str>::new()), Fingerprint::new().finish());
    }
}
