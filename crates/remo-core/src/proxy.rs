//! Proxy variants: local stand-ins for remote entities.
//!
//! A proxy carries identity (its token), a type tag, capability flags, and a
//! lazily fetched members cache. It holds no reference to the session or the
//! gateway; every round trip goes through an explicit
//! [`Session`](crate::session::Session), and owner links are stored as
//! tokens resolved through the identity map rather than back-pointers.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Opaque identifier issued by the remote server for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(raw: impl Into<String>) -> Self {
        Token(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the null token and for the root object's empty token.
    pub fn is_null(&self) -> bool {
        self.0.is_empty() || self.0 == crate::wire::NULL_TOKEN
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Token {
    fn from(raw: &str) -> Self {
        Token(raw.to_string())
    }
}

impl From<String> for Token {
    fn from(raw: String) -> Self {
        Token(raw)
    }
}

/// Shared handle to one remote entity.
///
/// While the identity cache is valid, at most one handle exists per token,
/// so pointer equality (`Arc::ptr_eq`) implies the same remote entity.
pub type ProxyHandle = Arc<Proxy>;

/// Symbolic-name <-> ordinal table of one enumerated type, fetched once per
/// factory lifetime.
#[derive(Debug, Clone)]
pub struct EnumDef {
    type_name: String,
    ordinals: BTreeMap<String, i64>,
}

impl EnumDef {
    pub fn new(type_name: impl Into<String>, ordinals: BTreeMap<String, i64>) -> Self {
        Self {
            type_name: type_name.into(),
            ordinals,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn ordinal_of(&self, name: &str) -> Option<i64> {
        self.ordinals.get(name).copied()
    }

    pub fn name_of(&self, ordinal: i64) -> Option<&str> {
        self.ordinals
            .iter()
            .find(|(_, v)| **v == ordinal)
            .map(|(k, _)| k.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ordinals.keys().map(String::as_str)
    }
}

/// What kind of value a property carries.
#[derive(Debug, Clone)]
pub enum ValueKind {
    Boolean,
    Integer,
    Double,
    Text,
    Enumerated(Arc<EnumDef>),
    /// Wraps another entity; attribute access merges the wrapped entity's
    /// property attributes into its own.
    Object,
    /// Phase-indexed: a value exists per phase key, not a single scalar.
    Staged,
    /// Any other property type.
    Plain,
}

/// Metadata of a value-bearing property proxy.
#[derive(Debug, Clone)]
pub struct PropertyMeta {
    /// Owner token, resolved through the identity map on demand.
    pub owner: Option<Token>,
    /// Property name on the owner.
    pub name: String,
    pub kind: ValueKind,
    pub is_collection: bool,
    /// Literal pinned at construction for phase-indexed primitives; such a
    /// property has no independent owner to re-query.
    pub pinned: Option<Value>,
}

/// Variant of a proxy.
#[derive(Debug)]
pub enum ProxyKind {
    /// The root object. Attribute resolution tries a remote named-object
    /// lookup before the members cache; owns the selection.
    Global,
    Object {
        is_collection: bool,
        /// Attribute set may change between calls; members cache is dropped
        /// on every mutation.
        volatile: bool,
        /// Server-side scratch collection the caller disposes of explicitly.
        disposable: bool,
    },
    Property(PropertyMeta),
}

/// Local stand-in for one remote entity.
#[derive(Debug)]
pub struct Proxy {
    token: Token,
    type_tag: String,
    kind: ProxyKind,
    members: RwLock<Option<AttrMap>>,
}

impl Proxy {
    pub(crate) fn new(token: Token, type_tag: String, kind: ProxyKind) -> Self {
        Self {
            token,
            type_tag,
            kind,
            members: RwLock::new(None),
        }
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    pub fn kind(&self) -> &ProxyKind {
        &self.kind
    }

    /// Same remote entity, regardless of handle identity.
    pub fn same_entity(&self, other: &Proxy) -> bool {
        self.token == other.token
    }

    /// Wire representation used when this proxy is passed as a call
    /// argument: the token literal (empty for the root object).
    pub fn wire_repr(&self) -> &str {
        self.token.as_str()
    }

    pub fn is_global(&self) -> bool {
        matches!(self.kind, ProxyKind::Global)
    }

    pub fn is_property(&self) -> bool {
        matches!(self.kind, ProxyKind::Property(_))
    }

    pub fn property_meta(&self) -> Option<&PropertyMeta> {
        match &self.kind {
            ProxyKind::Property(meta) => Some(meta),
            _ => None,
        }
    }

    pub fn is_collection(&self) -> bool {
        match &self.kind {
            ProxyKind::Global => false,
            ProxyKind::Object { is_collection, .. } => *is_collection,
            ProxyKind::Property(meta) => meta.is_collection,
        }
    }

    pub fn is_volatile(&self) -> bool {
        matches!(self.kind, ProxyKind::Object { volatile: true, .. })
    }

    pub fn is_disposable(&self) -> bool {
        matches!(self.kind, ProxyKind::Object { disposable: true, .. })
    }

    pub(crate) fn cached_members(&self) -> Option<AttrMap> {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn store_members(&self, map: AttrMap) {
        *self.members.write().unwrap_or_else(PoisonError::into_inner) = Some(map);
    }

    /// Drop the members cache. Used for volatile-schema proxies on every
    /// mutation and for the root object on project transitions.
    pub(crate) fn drop_members(&self) {
        *self.members.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ProxyKind::Global => write!(f, "<global>"),
            _ => write!(f, "<{} {}>", self.type_tag, self.token),
        }
    }
}

/// One entry of a members map.
#[derive(Debug, Clone)]
pub enum Attribute {
    /// Invocable member; carries no cached value.
    Method(String),
    /// Value-bearing member, or (for the root object) a remotely resolved
    /// named entity. The handle is identity-cached.
    Property(ProxyHandle),
}

/// Attribute descriptors of one entity, keyed by exposed name.
pub type AttrMap = BTreeMap<String, Attribute>;
