//! Response interpretation: wire shapes to domain values.
//!
//! Every entity description flowing back from the server passes through
//! [`Session::proxify`], so registration in the identity cache is a
//! precondition of returning any handle. Collapsing of single-element
//! results happens here as well: command results collapse, collection
//! slices never do.

use crate::error::{RemoError, Result};
use crate::factory::{ProxyFactory, ResolveSpec};
use crate::gateway::Gateway;
use crate::proxy::{Attribute, AttrMap, ProxyHandle, Token};
use crate::session::Session;
use crate::value::Value;
use crate::wire::{
    CommandResponse, ListMethod, ListResponse, MembersResponse, ObjectRepr, ReturnedItem,
    CONTENT_TYPE_KEY, NULL_TOKEN, PAYLOAD_TYPE_TAG,
};
use serde_json::Value as Json;
use tracing::{trace, warn};

impl<G: Gateway> Session<G> {
    /// Interpret a generic command response.
    ///
    /// A failed command carries the server's message. A successful one
    /// yields, in order of preference: the returned objects (collapsed),
    /// the returned bare values (collapsed), the feedback text, or `true`.
    pub(crate) fn interpret_command(&mut self, response: CommandResponse) -> Result<Value> {
        if !response.success {
            return Err(RemoError::Unsuccessful {
                message: response.extrainfo,
            });
        }
        if let Some(items) = response.returned_objects {
            return self.proxify_items(items, false);
        }
        if let Some(raw) = response.returned_values {
            let mut values: Vec<Value> = raw.iter().map(Value::from_json).collect();
            return Ok(match values.len() {
                0 => Value::None,
                1 => values.remove(0),
                _ => Value::List(values),
            });
        }
        if !response.extrainfo.is_empty() {
            return Ok(Value::Text(response.extrainfo));
        }
        Ok(Value::Bool(true))
    }

    /// Resolve a returned-object list, applying the collapsing rule: zero
    /// items become the no-result marker, a single item becomes the bare
    /// value. `keep_list` suppresses both, for contexts with list semantics
    /// (slices, selections).
    pub(crate) fn proxify_items(
        &mut self,
        items: Vec<ReturnedItem>,
        keep_list: bool,
    ) -> Result<Value> {
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            values.push(self.item_value(item)?);
        }
        Ok(match values.len() {
            0 if !keep_list => Value::None,
            1 if !keep_list => values.remove(0),
            _ => Value::List(values),
        })
    }

    pub(crate) fn item_value(&mut self, item: ReturnedItem) -> Result<Value> {
        match item {
            ReturnedItem::Object(repr) => self.proxify(&repr, None, None),
            ReturnedItem::Literal(json) => Ok(Value::from_json(&json)),
        }
    }

    /// Turn one entity description into a value, registering the handle in
    /// the identity cache.
    ///
    /// A description carrying an owner token for an entity we have never
    /// seen is resolved through the owner: the owner's members are
    /// (re)fetched, which registers the child with its full property
    /// metadata. An owner absent from the identity cache is a consistency
    /// error.
    pub(crate) fn proxify(
        &mut self,
        repr: &ObjectRepr,
        property_name: Option<&str>,
        owner: Option<&Token>,
    ) -> Result<Value> {
        if repr.type_tag == PAYLOAD_TYPE_TAG {
            return self.build_payload(repr);
        }

        let token = match &repr.token {
            Some(token) if !token.is_null() => token.clone(),
            _ => {
                return Ok(match &repr.value {
                    Some(value) => Value::from_json(value),
                    None => Value::None,
                })
            }
        };

        if owner.is_none() {
            if let Some(wire_owner) = &repr.owner {
                if self.factory.get_if_exists(&token).is_none() {
                    if let Some(handle) = self.adopt_orphan(&token, wire_owner)? {
                        return Ok(Value::Handle(handle));
                    }
                }
            }
        }

        let pinned = if ProxyFactory::is_primitive_tag(&repr.type_tag) {
            repr.value.as_ref().map(Value::from_json)
        } else {
            None
        };
        let handle = self.resolve_handle(ResolveSpec {
            token,
            type_tag: &repr.type_tag,
            is_collection: repr.is_collection,
            property_name,
            owner: owner.cloned().or_else(|| repr.owner.clone()),
            pinned,
        })?;
        Ok(Value::Handle(handle))
    }

    /// Register an owned entity we learned about out of band, by fetching
    /// its owner's members. Returns the child handle if the owner exposed
    /// it; otherwise the caller falls back to the wire metadata.
    fn adopt_orphan(&mut self, child: &Token, owner: &Token) -> Result<Option<ProxyHandle>> {
        let owner_handle =
            self.factory
                .get_if_exists(owner)
                .ok_or_else(|| RemoError::MissingOwner {
                    owner: owner.clone(),
                })?;
        self.members(&owner_handle)?;
        if let Some(handle) = self.factory.get_if_exists(child) {
            return Ok(Some(handle));
        }
        // The cached members predate this child. Refetch once.
        owner_handle.drop_members();
        self.members(&owner_handle)?;
        if let Some(handle) = self.factory.get_if_exists(child) {
            return Ok(Some(handle));
        }
        trace!(%child, %owner, "owner does not expose the child; using wire metadata");
        Ok(None)
    }

    /// Build a value from a marked non-proxy payload. A `ContentType` key
    /// selects a registered constructor; without one the body passes
    /// through verbatim.
    pub(crate) fn build_payload(&mut self, repr: &ObjectRepr) -> Result<Value> {
        let payload = repr
            .payload
            .as_ref()
            .ok_or_else(|| RemoError::malformed("marked payload carried no body"))?;
        match payload.get(CONTENT_TYPE_KEY).and_then(Json::as_str) {
            Some(content_type) => {
                let constructor = self.constructors.get(content_type).cloned().ok_or_else(
                    || RemoError::UnknownPayloadKind {
                        content_type: content_type.to_string(),
                    },
                )?;
                constructor(payload)
            }
            None => Ok(Value::Raw(payload.clone())),
        }
    }

    /// Build the attribute map of one entity from its members response.
    /// Properties shadow same-named commands.
    pub(crate) fn build_members(
        &mut self,
        owner: &Token,
        response: MembersResponse,
    ) -> Result<AttrMap> {
        let mut map = AttrMap::new();
        for command in response.commands {
            map.insert(command.clone(), Attribute::Method(command));
        }
        for (name, repr) in response.properties {
            match self.proxify(&repr, Some(name.as_str()), Some(owner))? {
                Value::Handle(handle) => {
                    map.insert(name, Attribute::Property(handle));
                }
                other => {
                    warn!(property = %name, value = ?other, "property descriptor without a token; skipped");
                }
            }
        }
        Ok(map)
    }

    /// Interpret a collection query response, dispatching on the echoed
    /// method name.
    pub(crate) fn interpret_list(&mut self, response: ListResponse) -> Result<Value> {
        if !response.success {
            return Err(RemoError::Unsuccessful {
                message: response.extrainfo,
            });
        }
        match response.method {
            ListMethod::Count => Ok(Value::from_json(&response.output)),
            ListMethod::Index => {
                let item: ReturnedItem = serde_json::from_value(response.output)?;
                self.item_value(item)
            }
            ListMethod::Sublist => {
                let items: Vec<ReturnedItem> = serde_json::from_value(response.output)?;
                self.proxify_items(items, true)
            }
            ListMethod::MemberIndex => {
                let raw = Self::member_output(&response)?.clone();
                let item: ReturnedItem = serde_json::from_value(raw)?;
                self.item_value(item)
            }
            ListMethod::MemberSublist => {
                let raw = Self::member_output(&response)?.clone();
                let items: Vec<ReturnedItem> = serde_json::from_value(raw)?;
                self.proxify_items(items, true)
            }
        }
    }

    /// The output slot of the single queried member.
    fn member_output(response: &ListResponse) -> Result<&Json> {
        let member = response
            .member_names
            .first()
            .ok_or_else(|| RemoError::malformed("member query echoed no member name"))?;
        response
            .output
            .get(member)
            .ok_or_else(|| RemoError::malformed(format!("no output for member '{member}'")))
    }

    /// Interpret one property value from a property-values response.
    ///
    /// Entity descriptions resolve through the identity cache; primitives
    /// carried inline under a phase key become literals pinned at
    /// construction. The null token decodes to the no-result marker.
    pub(crate) fn interpret_property_value(
        &mut self,
        owner: &Token,
        property: &str,
        raw: Json,
    ) -> Result<Value> {
        match raw {
            Json::Object(ref map) if map.contains_key("type") => {
                let repr: ObjectRepr = serde_json::from_value(raw)?;
                if ProxyFactory::is_primitive_tag(&repr.type_tag) && repr.value.is_some() {
                    // Inline primitive: pin it to a property handle.
                    self.proxify(&repr, Some(property), Some(owner))
                } else {
                    // Entity-valued: the description stands on its own.
                    self.proxify(&repr, None, None)
                }
            }
            Json::String(ref s) if s == NULL_TOKEN => Ok(Value::None),
            other => Ok(Value::from_json(&other)),
        }
    }

    /// Interpret the authoritative selection contents. Selections have list
    /// semantics; literals in a selection are a protocol violation.
    pub(crate) fn interpret_selection(
        &mut self,
        items: Vec<ReturnedItem>,
    ) -> Result<Vec<ProxyHandle>> {
        let mut handles = Vec::with_capacity(items.len());
        for item in items {
            match self.item_value(item)? {
                Value::Handle(handle) => handles.push(handle),
                other => {
                    return Err(RemoError::malformed(format!(
                        "selection carried a non-entity: {other:?}"
                    )))
                }
            }
        }
        Ok(handles)
    }
}
