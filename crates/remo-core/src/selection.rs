//! Local mirror of the server-side selection.
//!
//! The server is authoritative: after every selection command the mirror is
//! replaced wholesale with whatever the response carries, so server-side
//! filtering of rejected entities is reflected immediately. The mirror never
//! survives a project transition.

use crate::proxy::{Proxy, ProxyHandle};

/// Mirrored selection contents, ordered as the server reports them.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    handles: Vec<ProxyHandle>,
}

impl Selection {
    pub fn handles(&self) -> &[ProxyHandle] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// True if the mirror holds the same remote entity.
    pub fn contains(&self, proxy: &Proxy) -> bool {
        self.handles.iter().any(|h| h.same_entity(proxy))
    }

    pub fn get(&self, index: usize) -> Option<&ProxyHandle> {
        self.handles.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProxyHandle> {
        self.handles.iter()
    }

    /// Replace the mirror with the authoritative server contents.
    pub(crate) fn replace(&mut self, handles: Vec<ProxyHandle>) {
        self.handles = handles;
    }

    /// Drop the mirrored contents without a round trip. Used on project
    /// transitions, where the stale handles must not outlive the cache epoch.
    pub(crate) fn clear_local(&mut self) {
        self.handles.clear();
    }
}

impl<'a> IntoIterator for &'a Selection {
    type Item = &'a ProxyHandle;
    type IntoIter = std::slice::Iter<'a, ProxyHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.handles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::{ProxyKind, Token};
    use std::sync::Arc;

    fn handle(token: &str) -> ProxyHandle {
        Arc::new(Proxy::new(
            Token::new(token),
            "Point".to_string(),
            ProxyKind::Object {
                is_collection: false,
                volatile: false,
                disposable: false,
            },
        ))
    }

    #[test]
    fn test_replace_is_wholesale() {
        let mut selection = Selection::default();
        selection.replace(vec![handle("{A}"), handle("{B}")]);
        assert_eq!(selection.len(), 2);

        selection.replace(vec![handle("{C}")]);
        assert_eq!(selection.len(), 1);
        assert!(selection.contains(&handle("{C}")));
        assert!(!selection.contains(&handle("{A}")));
    }

    #[test]
    fn test_clear_local() {
        let mut selection = Selection::default();
        selection.replace(vec![handle("{A}")]);
        selection.clear_local();
        assert!(selection.is_empty());
    }
}
