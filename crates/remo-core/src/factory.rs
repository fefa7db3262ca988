//! Identity cache and proxy factory.
//!
//! One live handle per token: repeated references to the same remote entity
//! resolve to the same `Arc`, so pointer equality implies remote identity.
//! The map is cleared only on project-level transitions, never on ordinary
//! property or method calls.

use crate::config::SessionConfig;
use crate::error::{RemoError, Result};
use crate::gateway::Gateway;
use crate::proxy::{EnumDef, PropertyMeta, Proxy, ProxyHandle, ProxyKind, Token, ValueKind};
use crate::value::Value;
use crate::wire::{ENUM_PREFIX, STAGED_PREFIX};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Everything needed to resolve a token to a handle.
#[derive(Debug)]
pub(crate) struct ResolveSpec<'a> {
    pub token: Token,
    pub type_tag: &'a str,
    pub is_collection: bool,
    /// Present when the entity is a value-bearing property of `owner`.
    pub property_name: Option<&'a str>,
    pub owner: Option<Token>,
    /// Literal pinned at construction for phase-indexed primitives.
    pub pinned: Option<Value>,
}

/// Token -> handle identity map plus the per-process enumeration schemas.
pub struct ProxyFactory {
    handles: HashMap<Token, ProxyHandle>,
    /// Enumerated type definitions, keyed by type tag. Cached for the
    /// factory's lifetime; enum schemas do not change within a process.
    enums: HashMap<String, Arc<EnumDef>>,
    volatile_tags: HashSet<String>,
    disposable_tags: HashSet<String>,
}

impl ProxyFactory {
    pub(crate) fn new(config: &SessionConfig) -> Self {
        Self {
            handles: HashMap::new(),
            enums: HashMap::new(),
            volatile_tags: config.volatile_type_tags.clone(),
            disposable_tags: config.disposable_type_tags.clone(),
        }
    }

    /// The handle for `token`, if one is live.
    pub fn get_if_exists(&self, token: &Token) -> Option<ProxyHandle> {
        self.handles.get(token).cloned()
    }

    /// Wipe the token -> handle map. Every previously issued handle becomes
    /// invalid for identity comparison; continued use is a caller error.
    /// Enumeration schemas survive, they are not project state.
    pub(crate) fn clear(&mut self) {
        debug!(handles = self.handles.len(), "identity cache cleared");
        self.handles.clear();
    }

    /// The root object handle. Not registered in the identity map; its
    /// token is empty and it outlives every project transition.
    pub(crate) fn create_global(&self) -> ProxyHandle {
        Arc::new(Proxy::new(Token::new(""), String::new(), ProxyKind::Global))
    }

    /// Resolve a token to its unique handle.
    ///
    /// A known token returns the existing handle unconditionally; new
    /// metadata for it is discarded, guarding against reconstruction and
    /// metadata drift. Otherwise the description is dispatched to the right
    /// variant, registered, and returned. Registration happens before the
    /// handle is handed out so nested construction can already resolve it.
    ///
    /// Returns the handle and whether it was newly created.
    pub(crate) fn resolve<G: Gateway>(
        &mut self,
        gateway: &mut G,
        spec: ResolveSpec<'_>,
    ) -> Result<(ProxyHandle, bool)> {
        if let Some(existing) = self.handles.get(&spec.token) {
            return Ok((existing.clone(), false));
        }

        let kind = if spec.owner.is_some() || spec.property_name.is_some() {
            let value_kind = self.value_kind(gateway, &spec)?;
            ProxyKind::Property(PropertyMeta {
                owner: spec.owner,
                name: spec.property_name.unwrap_or_default().to_string(),
                kind: value_kind,
                is_collection: spec.is_collection,
                pinned: spec.pinned,
            })
        } else if self.disposable_tags.contains(spec.type_tag) {
            ProxyKind::Object {
                is_collection: true,
                volatile: false,
                disposable: true,
            }
        } else if self.volatile_tags.contains(spec.type_tag) {
            ProxyKind::Object {
                is_collection: spec.is_collection,
                volatile: true,
                disposable: false,
            }
        } else {
            ProxyKind::Object {
                is_collection: spec.is_collection,
                volatile: false,
                disposable: false,
            }
        };

        debug!(token = %spec.token, type_tag = spec.type_tag, "proxy created");
        let handle = Arc::new(Proxy::new(
            spec.token.clone(),
            spec.type_tag.to_string(),
            kind,
        ));
        self.handles.insert(spec.token, handle.clone());
        Ok((handle, true))
    }

    /// Dispatch a property type tag to its value kind, fetching the
    /// enumeration schema on the first encounter of an enum type name.
    fn value_kind<G: Gateway>(
        &mut self,
        gateway: &mut G,
        spec: &ResolveSpec<'_>,
    ) -> Result<ValueKind> {
        Ok(match spec.type_tag {
            "Boolean" => ValueKind::Boolean,
            "Integer" => ValueKind::Integer,
            "Number" => ValueKind::Double,
            "Text" => ValueKind::Text,
            "Object" => ValueKind::Object,
            tag if tag.starts_with(ENUM_PREFIX) => {
                ValueKind::Enumerated(self.enum_def(gateway, &spec.token, tag)?)
            }
            tag if tag.starts_with(STAGED_PREFIX) => ValueKind::Staged,
            _ => ValueKind::Plain,
        })
    }

    /// The enumeration schema for a type tag, fetched remotely at most once.
    fn enum_def<G: Gateway>(
        &mut self,
        gateway: &mut G,
        token: &Token,
        type_tag: &str,
    ) -> Result<Arc<EnumDef>> {
        if let Some(def) = self.enums.get(type_tag) {
            return Ok(def.clone());
        }
        let response = gateway.query_enumeration(token)?;
        if !response.success {
            return Err(RemoError::Unsuccessful {
                message: response.extrainfo,
            });
        }
        debug!(type_tag, names = response.enum_values.len(), "enumeration schema fetched");
        let def = Arc::new(EnumDef::new(type_tag, response.enum_values));
        self.enums.insert(type_tag.to_string(), def.clone());
        Ok(def)
    }

    /// True if a primitive property tag (used to detect phase-pinned
    /// literals in staged owners).
    pub(crate) fn is_primitive_tag(type_tag: &str) -> bool {
        matches!(type_tag, "Boolean" | "Number" | "Integer" | "Text")
            || type_tag.starts_with(ENUM_PREFIX)
    }
}
