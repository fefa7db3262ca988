//! Session configuration.

use std::collections::HashSet;

/// Tunables for a [`Session`](crate::session::Session).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Elements fetched per round trip while iterating a collection.
    pub page_size: u64,
    /// Whether read round trips are memoized. Disabling clears the query
    /// caches; the identity map stays active either way.
    pub caching: bool,
    /// Type tags whose attribute set may legitimately change between calls.
    /// Proxies with these tags drop their members cache on every mutation.
    pub volatile_type_tags: HashSet<String>,
    /// Type tags of server-side scratch collections that the caller is
    /// expected to dispose of explicitly.
    pub disposable_type_tags: HashSet<String>,
}

impl SessionConfig {
    /// Default iteration window size.
    pub const DEFAULT_PAGE_SIZE: u64 = 100;

    /// Mark a type tag as volatile-schema.
    pub fn with_volatile_tag(mut self, tag: impl Into<String>) -> Self {
        self.volatile_type_tags.insert(tag.into());
        self
    }

    /// Mark a type tag as a disposable collection.
    pub fn with_disposable_tag(mut self, tag: impl Into<String>) -> Self {
        self.disposable_type_tags.insert(tag.into());
        self
    }

    /// Override the iteration window size.
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            page_size: SessionConfig::DEFAULT_PAGE_SIZE,
            caching: true,
            volatile_type_tags: HashSet::new(),
            disposable_type_tags: HashSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.page_size, 100);
        assert!(config.caching);
        assert!(config.volatile_type_tags.is_empty());
    }

    #[test]
    fn test_builders() {
        let config = SessionConfig::default()
            .with_page_size(0)
            .with_volatile_tag("Material");
        // Page size is clamped to at least one element per window.
        assert_eq!(config.page_size, 1);
        assert!(config.volatile_type_tags.contains("Material"));
    }
}
