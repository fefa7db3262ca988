//! Session: the single entry point for remote-object traffic.
//!
//! The session owns the gateway, the identity cache, the three query-cache
//! namespaces (named lookups, property values, collection results) and the
//! selection mirror. Every read is memoized while caching is enabled; every
//! mutating call invalidates the query caches before the request leaves, so
//! a failed mutation leaves them cold rather than stale.

use crate::command::{self, CallArg};
use crate::config::SessionConfig;
use crate::error::{RemoError, Result};
use crate::factory::{ProxyFactory, ResolveSpec};
use crate::gateway::Gateway;
use crate::proxy::{Attribute, AttrMap, Proxy, ProxyHandle, Token, ValueKind};
use crate::selection::Selection;
use crate::value::Value;
use crate::wire::{
    EnvironmentCommand, ListMethod, ListQuery, MembersResponse, SelectionCommand,
};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// Builds a domain value from a marked JSON payload body.
pub type PayloadConstructor = Arc<dyn Fn(&serde_json::Value) -> Result<Value> + Send + Sync>;

/// Cache key of one property-values query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct PropertyKey {
    tokens: Vec<Token>,
    property: String,
    phase: Option<Token>,
}

/// Cache key of one collection query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ListKey {
    token: Token,
    method: ListMethod,
    start: Option<u64>,
    stop: Option<u64>,
    members: Option<Vec<String>>,
}

/// One connection's worth of remote-object state.
pub struct Session<G: Gateway> {
    pub(crate) gateway: G,
    pub(crate) factory: ProxyFactory,
    config: SessionConfig,
    caching: bool,
    global: ProxyHandle,
    selection: Selection,
    pub(crate) constructors: HashMap<String, PayloadConstructor>,
    named_cache: HashMap<String, ProxyHandle>,
    value_cache: HashMap<PropertyKey, Vec<Value>>,
    list_cache: HashMap<ListKey, Value>,
    /// Live volatile-schema proxies; their members caches are dropped on
    /// every mutation. Dead entries are pruned during invalidation.
    volatile: Vec<Weak<Proxy>>,
    last_feedback: String,
}

impl<G: Gateway> Session<G> {
    pub fn new(gateway: G, config: SessionConfig) -> Self {
        let factory = ProxyFactory::new(&config);
        let global = factory.create_global();
        let caching = config.caching;
        Self {
            gateway,
            factory,
            config,
            caching,
            global,
            selection: Selection::default(),
            constructors: HashMap::new(),
            named_cache: HashMap::new(),
            value_cache: HashMap::new(),
            list_cache: HashMap::new(),
            volatile: Vec::new(),
            last_feedback: String::new(),
        }
    }

    /// The root object. Survives project transitions.
    pub fn global(&self) -> ProxyHandle {
        self.global.clone()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    /// The live handle for a token, if the identity cache holds one.
    pub fn lookup_handle(&self, token: &Token) -> Option<ProxyHandle> {
        self.factory.get_if_exists(token)
    }

    /// Feedback text of the most recent command, successful or not.
    pub fn last_feedback(&self) -> &str {
        &self.last_feedback
    }

    /// Register a constructor for marked JSON payloads carrying the given
    /// content type.
    pub fn register_payload_constructor(
        &mut self,
        content_type: impl Into<String>,
        constructor: PayloadConstructor,
    ) {
        self.constructors.insert(content_type.into(), constructor);
    }

    /// Switch read memoization on or off. Flipping in either direction
    /// invalidates the query caches; the identity map stays live.
    pub fn set_caching_enabled(&mut self, enabled: bool) {
        if self.caching != enabled {
            self.invalidate_query_caches();
        }
        self.caching = enabled;
    }

    pub fn caching_enabled(&self) -> bool {
        self.caching
    }

    /// Drop all memoized query results and the members caches of live
    /// volatile-schema proxies. The identity map is untouched.
    pub(crate) fn invalidate_query_caches(&mut self) {
        trace!(
            named = self.named_cache.len(),
            values = self.value_cache.len(),
            lists = self.list_cache.len(),
            "query caches invalidated"
        );
        self.named_cache.clear();
        self.value_cache.clear();
        self.list_cache.clear();
        self.volatile.retain(|weak| match weak.upgrade() {
            Some(proxy) => {
                proxy.drop_members();
                true
            }
            None => false,
        });
    }

    /// Resolve a wire description to a handle, tracking newly created
    /// volatile-schema proxies for invalidation.
    pub(crate) fn resolve_handle(&mut self, spec: ResolveSpec<'_>) -> Result<ProxyHandle> {
        let (handle, created) = self.factory.resolve(&mut self.gateway, spec)?;
        if created && handle.is_volatile() {
            self.volatile.push(Arc::downgrade(&handle));
        }
        Ok(handle)
    }

    // --- attribute access ------------------------------------------------

    /// The member descriptors of one entity, fetched at most once per proxy
    /// (volatile-schema proxies refetch after every mutation).
    pub fn members(&mut self, handle: &ProxyHandle) -> Result<AttrMap> {
        if let Some(map) = handle.cached_members() {
            return Ok(map);
        }
        let response = self.gateway.query_members(handle.token())?;
        let map = self.build_member_map(handle.token(), response)?;
        handle.store_members(map.clone());
        Ok(map)
    }

    fn build_member_map(&mut self, owner: &Token, response: MembersResponse) -> Result<AttrMap> {
        if !response.success {
            return Err(RemoError::Unsuccessful {
                message: response.extrainfo,
            });
        }
        self.build_members(owner, response)
    }

    /// Resolve one attribute of an entity.
    ///
    /// On the root object a remote named-object lookup is tried first, so
    /// renamed and newly created entities resolve without a members refetch;
    /// an unsuccessful lookup falls back to the members map. Object-valued
    /// properties expose the union of their own members and the wrapped
    /// entity's, with their own taking precedence.
    pub fn attribute(&mut self, handle: &ProxyHandle, name: &str) -> Result<Attribute> {
        if handle.is_global() {
            if let Some(cached) = self.named_cache.get(name) {
                return Ok(Attribute::Property(cached.clone()));
            }
            match self.fetch_named(name) {
                Ok(found) => {
                    if self.caching {
                        self.named_cache.insert(name.to_string(), found.clone());
                    }
                    return Ok(Attribute::Property(found));
                }
                Err(RemoError::Unsuccessful { .. }) => {}
                Err(other) => return Err(other),
            }
            return self.member_attribute(handle, name);
        }

        if let Some(meta) = handle.property_meta() {
            if matches!(meta.kind, ValueKind::Object) {
                let merged = self.merged_attributes(handle)?;
                return merged
                    .get(name)
                    .cloned()
                    .ok_or_else(|| RemoError::NoSuchAttribute {
                        name: name.to_string(),
                    });
            }
        }

        self.member_attribute(handle, name)
    }

    fn member_attribute(&mut self, handle: &ProxyHandle, name: &str) -> Result<Attribute> {
        let members = self.members(handle)?;
        members
            .get(name)
            .cloned()
            .ok_or_else(|| RemoError::NoSuchAttribute {
                name: name.to_string(),
            })
    }

    /// Look one entity up by its current name on the server.
    fn fetch_named(&mut self, name: &str) -> Result<ProxyHandle> {
        let response = self.gateway.query_named_object(name)?;
        if !response.success {
            return Err(RemoError::Unsuccessful {
                message: response.extrainfo,
            });
        }
        let item = response
            .returned_object
            .ok_or_else(|| RemoError::malformed("named-object response carried no object"))?;
        match self.item_value(item)? {
            Value::Handle(handle) => Ok(handle),
            other => Err(RemoError::malformed(format!(
                "named-object lookup returned a non-entity: {other:?}"
            ))),
        }
    }

    /// Own members of an object-valued property merged with the wrapped
    /// entity's value-bearing members, recomputed per call so a changed
    /// wrapped value is honored. Own entries take precedence; the wrapped
    /// entity's methods are not exposed through the property.
    pub(crate) fn merged_attributes(&mut self, handle: &ProxyHandle) -> Result<AttrMap> {
        let mut merged = self.members(handle)?;
        if let Value::Handle(inner) = self.property_value(handle)? {
            for (name, attribute) in self.members(&inner)? {
                if matches!(attribute, Attribute::Property(_)) {
                    merged.entry(name).or_insert(attribute);
                }
            }
        }
        Ok(merged)
    }

    // --- property reads and writes ---------------------------------------

    /// Current value of a value-bearing property.
    ///
    /// Literals pinned at construction (phase-indexed primitives) are
    /// returned without a round trip; everything else is re-queried from the
    /// owner through the property-values cache.
    pub fn property_value(&mut self, handle: &ProxyHandle) -> Result<Value> {
        let meta = handle
            .property_meta()
            .ok_or_else(|| RemoError::InvalidArgument {
                message: format!("{handle} is not a value-bearing property"),
            })?;
        if let Some(pinned) = &meta.pinned {
            return Ok(pinned.clone());
        }
        let owner = meta
            .owner
            .clone()
            .ok_or_else(|| RemoError::DetachedProperty {
                name: meta.name.clone(),
            })?;
        let name = meta.name.clone();
        let mut values = self.objects_property(&[owner], &name, None)?;
        values
            .pop()
            .ok_or_else(|| RemoError::malformed("property-values response was empty"))
    }

    /// One property's value for each of the given entities, memoized as a
    /// batch. Results are in input order.
    pub fn objects_property(
        &mut self,
        tokens: &[Token],
        property: &str,
        phase: Option<&Token>,
    ) -> Result<Vec<Value>> {
        let key = PropertyKey {
            tokens: tokens.to_vec(),
            property: property.to_string(),
            phase: phase.cloned(),
        };
        if self.caching {
            if let Some(values) = self.value_cache.get(&key) {
                trace!(property, "property cache hit");
                return Ok(values.clone());
            }
        }
        let results = self.gateway.query_property_values(tokens, property, phase)?;
        if results.len() != tokens.len() {
            return Err(RemoError::malformed(format!(
                "property-values response covered {} of {} entities",
                results.len(),
                tokens.len()
            )));
        }
        let mut values = Vec::with_capacity(results.len());
        for (token, result) in tokens.iter().zip(results) {
            let raw = result
                .properties
                .get(property)
                .ok_or_else(|| RemoError::NoSuchAttribute {
                    name: property.to_string(),
                })?
                .clone();
            values.push(self.interpret_property_value(token, property, raw)?);
        }
        if self.caching {
            self.value_cache.insert(key, values.clone());
        }
        Ok(values)
    }

    /// Value of a phase-indexed property under one phase.
    pub fn staged_value(&mut self, handle: &ProxyHandle, phase: &ProxyHandle) -> Result<Value> {
        let meta = handle
            .property_meta()
            .filter(|meta| matches!(meta.kind, ValueKind::Staged))
            .ok_or_else(|| RemoError::InvalidArgument {
                message: format!("{handle} is not phase-indexed"),
            })?;
        if phase.is_global() || phase.is_property() {
            return Err(RemoError::PhaseKeyExpected);
        }
        let owner = meta
            .owner
            .clone()
            .ok_or_else(|| RemoError::DetachedProperty {
                name: meta.name.clone(),
            })?;
        let name = meta.name.clone();
        let phase_token = phase.token().clone();
        let mut values = self.objects_property(&[owner], &name, Some(&phase_token))?;
        values
            .pop()
            .ok_or_else(|| RemoError::malformed("property-values response was empty"))
    }

    /// Assign a value-bearing property.
    pub fn set_property(&mut self, handle: &ProxyHandle, value: CallArg) -> Result<Value> {
        self.call_method(Some(handle), "set", &[value])
    }

    /// Assign a phase-indexed property under one phase. Assigning null is a
    /// defined no-op and produces no traffic and no invalidation.
    pub fn set_staged(
        &mut self,
        handle: &ProxyHandle,
        phase: &ProxyHandle,
        value: CallArg,
    ) -> Result<Value> {
        if matches!(value, CallArg::Null) {
            return Ok(Value::None);
        }
        if phase.is_global() || phase.is_property() {
            return Err(RemoError::PhaseKeyExpected);
        }
        self.call_method(
            Some(handle),
            "set",
            &[CallArg::Handle(phase.clone()), value],
        )
    }

    /// Symbolic name of an enumerated property's current value.
    pub fn enum_name(&mut self, handle: &ProxyHandle) -> Result<String> {
        let def = match handle.property_meta().map(|meta| &meta.kind) {
            Some(ValueKind::Enumerated(def)) => def.clone(),
            _ => {
                return Err(RemoError::InvalidArgument {
                    message: format!("{handle} is not an enumerated property"),
                })
            }
        };
        let value = self.property_value(handle)?;
        let ordinal = value
            .as_i64()
            .ok_or_else(|| RemoError::malformed("enumerated property value is not an ordinal"))?;
        def.name_of(ordinal)
            .map(str::to_string)
            .ok_or_else(|| RemoError::EnumDesync {
                enum_name: def.type_name().to_string(),
                ordinal,
            })
    }

    /// Assign an enumerated property by symbolic name. An unknown name is
    /// rejected locally before any request is issued.
    pub fn set_enum_by_name(&mut self, handle: &ProxyHandle, name: &str) -> Result<Value> {
        let def = match handle.property_meta().map(|meta| &meta.kind) {
            Some(ValueKind::Enumerated(def)) => def.clone(),
            _ => {
                return Err(RemoError::InvalidArgument {
                    message: format!("{handle} is not an enumerated property"),
                })
            }
        };
        let ordinal = def
            .ordinal_of(name)
            .ok_or_else(|| RemoError::UnknownEnumName {
                name: name.to_string(),
                valid: def.names().collect::<Vec<_>>().join(", "),
            })?;
        self.set_property(handle, CallArg::Int(ordinal))
    }

    // --- method invocation ------------------------------------------------

    /// Invoke a remote method. `None` targets the root object.
    ///
    /// Value-bearing property arguments (other than phase-indexed ones) are
    /// dereferenced to their current values first; then the query caches are
    /// invalidated, the command is rendered and sent, and the response is
    /// interpreted under the single-vs-many collapsing rule.
    pub fn call_method(
        &mut self,
        target: Option<&ProxyHandle>,
        method: &str,
        args: &[CallArg],
    ) -> Result<Value> {
        let lowered = self.lower_args(args)?;
        self.invalidate_query_caches();
        let target = target.unwrap_or(&self.global).clone();
        let rendered = command::method_call(Some(target.as_ref()), method, &lowered)?;
        debug!(command = %rendered, "command dispatched");
        let response = self.gateway.execute_command(&rendered)?;
        self.last_feedback = response.extrainfo.clone();
        self.interpret_command(response)
    }

    fn lower_args(&mut self, args: &[CallArg]) -> Result<Vec<CallArg>> {
        args.iter().map(|arg| self.lower_arg(arg)).collect()
    }

    fn lower_arg(&mut self, arg: &CallArg) -> Result<CallArg> {
        match arg {
            CallArg::Handle(handle) if command::passes_by_value(handle) => {
                let value = self.property_value(handle)?;
                CallArg::try_from(value)
            }
            CallArg::List(items) => Ok(CallArg::List(self.lower_args(items)?)),
            other => Ok(other.clone()),
        }
    }

    // --- collections -------------------------------------------------------

    /// The handle collection queries run against: the entity itself, or for
    /// object-valued properties the wrapped collection.
    pub(crate) fn collection_handle(&mut self, handle: &ProxyHandle) -> Result<ProxyHandle> {
        if handle.is_collection() {
            return Ok(handle.clone());
        }
        if let Some(meta) = handle.property_meta() {
            if matches!(meta.kind, ValueKind::Object) {
                if let Value::Handle(inner) = self.property_value(handle)? {
                    if inner.is_collection() {
                        return Ok(inner);
                    }
                }
            }
        }
        Err(RemoError::NotACollection {
            type_tag: handle.type_tag().to_string(),
        })
    }

    /// Number of elements in a collection.
    pub fn count(&mut self, handle: &ProxyHandle) -> Result<u64> {
        let target = self.collection_handle(handle)?;
        let value = self.list_query(ListQuery {
            token: target.token().clone(),
            method: ListMethod::Count,
            start: None,
            stop: None,
            members: None,
        })?;
        value
            .as_i64()
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| RemoError::malformed("collection count is not a non-negative integer"))
    }

    /// One element by zero-based index, bounds-checked against the current
    /// count.
    pub fn item(&mut self, handle: &ProxyHandle, index: u64) -> Result<Value> {
        let target = self.collection_handle(handle)?;
        let len = self.count(&target)?;
        if index >= len {
            return Err(RemoError::IndexOutOfRange { index, len });
        }
        self.list_query(ListQuery {
            token: target.token().clone(),
            method: ListMethod::Index,
            start: Some(index),
            stop: None,
            members: None,
        })
    }

    /// Elements in `[start, stop)`. Always a list, even for one element;
    /// out-of-range bounds are clamped by the server.
    pub fn slice(&mut self, handle: &ProxyHandle, start: u64, stop: u64) -> Result<Value> {
        let target = self.collection_handle(handle)?;
        self.list_query(ListQuery {
            token: target.token().clone(),
            method: ListMethod::Sublist,
            start: Some(start),
            stop: Some(stop),
            members: None,
        })
    }

    /// One member value of the element at `index`, fetched without
    /// constructing the element proxy.
    pub fn member_item(&mut self, handle: &ProxyHandle, index: u64, member: &str) -> Result<Value> {
        let target = self.collection_handle(handle)?;
        let len = self.count(&target)?;
        if index >= len {
            return Err(RemoError::IndexOutOfRange { index, len });
        }
        self.list_query(ListQuery {
            token: target.token().clone(),
            method: ListMethod::MemberIndex,
            start: Some(index),
            stop: None,
            members: Some(vec![member.to_string()]),
        })
    }

    /// One member value per element in `[start, stop)`. Always a list.
    pub fn member_slice(
        &mut self,
        handle: &ProxyHandle,
        start: u64,
        stop: u64,
        member: &str,
    ) -> Result<Value> {
        let target = self.collection_handle(handle)?;
        self.list_query(ListQuery {
            token: target.token().clone(),
            method: ListMethod::MemberSublist,
            start: Some(start),
            stop: Some(stop),
            members: Some(vec![member.to_string()]),
        })
    }

    /// Replace the element at `index`.
    pub fn set_item(&mut self, handle: &ProxyHandle, index: u64, value: CallArg) -> Result<Value> {
        let target = self.collection_handle(handle)?;
        let len = self.count(&target)?;
        if index >= len {
            return Err(RemoError::IndexOutOfRange { index, len });
        }
        self.call_method(Some(&target), "set", &[CallArg::Int(index as i64), value])
    }

    fn list_query(&mut self, query: ListQuery) -> Result<Value> {
        let key = ListKey {
            token: query.token.clone(),
            method: query.method,
            start: query.start,
            stop: query.stop,
            members: query.members.clone(),
        };
        if self.caching {
            if let Some(value) = self.list_cache.get(&key) {
                trace!(method = ?query.method, "collection cache hit");
                return Ok(value.clone());
            }
        }
        let response = self.gateway.query_list(&query)?;
        let value = self.interpret_list(response)?;
        if self.caching {
            self.list_cache.insert(key, value.clone());
        }
        Ok(value)
    }

    // --- selection ----------------------------------------------------------

    /// The selection mirror as of the last selection command.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Re-read the authoritative selection from the server.
    pub fn refresh_selection(&mut self) -> Result<&Selection> {
        self.apply_selection(SelectionCommand::Get, &[])
    }

    /// Replace the selection with the given entities.
    pub fn select_set(&mut self, handles: &[ProxyHandle]) -> Result<&Selection> {
        let tokens = Self::selection_tokens(handles);
        self.apply_selection(SelectionCommand::Set, &tokens)
    }

    /// Add the given entities to the selection.
    pub fn select_append(&mut self, handles: &[ProxyHandle]) -> Result<&Selection> {
        let tokens = Self::selection_tokens(handles);
        self.apply_selection(SelectionCommand::Append, &tokens)
    }

    /// Remove the given entities from the selection.
    pub fn select_remove(&mut self, handles: &[ProxyHandle]) -> Result<&Selection> {
        let tokens = Self::selection_tokens(handles);
        self.apply_selection(SelectionCommand::Remove, &tokens)
    }

    /// Empty the selection on the server.
    pub fn clear_selection(&mut self) -> Result<&Selection> {
        self.apply_selection(SelectionCommand::Set, &[])
    }

    fn selection_tokens(handles: &[ProxyHandle]) -> Vec<Token> {
        handles.iter().map(|h| h.token().clone()).collect()
    }

    /// Run one selection command and mirror whatever the server reports
    /// back, wholesale. Selection traffic does not touch the query caches.
    fn apply_selection(
        &mut self,
        command: SelectionCommand,
        tokens: &[Token],
    ) -> Result<&Selection> {
        let response = self.gateway.execute_selection(command, tokens)?;
        if !response.success {
            return Err(RemoError::Unsuccessful {
                message: response.extrainfo,
            });
        }
        let handles = self.interpret_selection(response.selection)?;
        self.selection.replace(handles);
        Ok(&self.selection)
    }

    // --- project transitions -------------------------------------------------

    /// Start an empty project.
    pub fn new_project(&mut self) -> Result<()> {
        self.environment(EnvironmentCommand::New)
    }

    /// Open the project at `location`.
    pub fn open_project(&mut self, location: impl Into<String>) -> Result<()> {
        self.environment(EnvironmentCommand::Open(location.into()))
    }

    /// Close the current project.
    pub fn close_project(&mut self) -> Result<()> {
        self.environment(EnvironmentCommand::Close)
    }

    /// Recover the server's last recoverable project state.
    pub fn recover_project(&mut self) -> Result<()> {
        self.environment(EnvironmentCommand::Recover)
    }

    /// Run one project transition. All local state except the root handle
    /// and the enumeration schemas is discarded up front; handles from the
    /// previous epoch must not be reused even if the transition fails.
    fn environment(&mut self, command: EnvironmentCommand) -> Result<()> {
        debug!(action = command.action(), "project transition");
        self.invalidate_query_caches();
        self.factory.clear();
        self.global.drop_members();
        self.selection.clear_local();
        let response = self.gateway.execute_environment(&command)?;
        if !response.success {
            return Err(RemoError::Unsuccessful {
                message: response.extrainfo,
            });
        }
        Ok(())
    }
}
