//! Wire data model for gateway requests and responses.
//!
//! Serde renames bind the exact field names the remote protocol uses
//! (`guid`, `islistable`, `ownerguid`, `extrainfo`, ...). Nothing here
//! performs I/O; [`Gateway`](crate::gateway::Gateway) implementations are
//! responsible for moving these types over a transport.

use crate::proxy::Token;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeMap;

/// Token of the null entity. Property values holding it decode to the
/// explicit no-result marker.
pub const NULL_TOKEN: &str = "{00000000-0000-0000-0000-000000000000}";

/// Type tag marking a non-proxy JSON payload.
pub const PAYLOAD_TYPE_TAG: &str = "JSON";

/// Key inside a non-proxy payload that selects a registered constructor.
pub const CONTENT_TYPE_KEY: &str = "ContentType";

/// Type-tag prefix of phase-indexed (staged) entities.
pub const STAGED_PREFIX: &str = "staged";

/// Type-tag prefix of enumerated properties.
pub const ENUM_PREFIX: &str = "enum";

fn default_true() -> bool {
    true
}

/// One remote entity as described by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectRepr {
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(rename = "guid", default, skip_serializing_if = "Option::is_none")]
    pub token: Option<Token>,
    #[serde(rename = "islistable", default)]
    pub is_collection: bool,
    #[serde(rename = "ownerguid", default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Token>,
    /// Inline literal carried by phase-indexed primitives.
    #[serde(rename = "value", default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Json>,
    /// Body of a non-proxy JSON payload.
    #[serde(rename = "json", default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Json>,
}

impl ObjectRepr {
    /// Minimal description of a plain entity.
    pub fn entity(token: impl Into<Token>, type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            token: Some(token.into()),
            is_collection: false,
            owner: None,
            value: None,
            payload: None,
        }
    }
}

/// One element of a returned-object list: either a full entity description
/// or a bare literal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReturnedItem {
    Object(ObjectRepr),
    Literal(Json),
}

/// Response to a generic command invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(default)]
    pub extrainfo: String,
    /// `None` when the command returns no object list at all; `Some(vec![])`
    /// when it returned one that matched nothing. The two interpret
    /// differently.
    #[serde(rename = "returnedobjects", default, skip_serializing_if = "Option::is_none")]
    pub returned_objects: Option<Vec<ReturnedItem>>,
    #[serde(rename = "returnedvalues", default, skip_serializing_if = "Option::is_none")]
    pub returned_values: Option<Vec<Json>>,
}

/// Response to a named-object lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedObjectResponse {
    pub success: bool,
    #[serde(default)]
    pub extrainfo: String,
    #[serde(rename = "returnedobject", default, skip_serializing_if = "Option::is_none")]
    pub returned_object: Option<ReturnedItem>,
}

/// Response to a members/attributes lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembersResponse {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub extrainfo: String,
    /// Invocable member names.
    #[serde(default)]
    pub commands: Vec<String>,
    /// Value-bearing members, keyed by property name.
    #[serde(default)]
    pub properties: BTreeMap<String, ObjectRepr>,
}

/// Per-token result of a property-values lookup. A property absent from the
/// map means the queried attribute does not exist on that entity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyQueryResult {
    #[serde(default)]
    pub properties: BTreeMap<String, Json>,
}

/// Methods of the list resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListMethod {
    Count,
    Sublist,
    Index,
    MemberSublist,
    MemberIndex,
}

/// One query against the list resource.
#[derive(Debug, Clone, Serialize)]
pub struct ListQuery {
    #[serde(rename = "guid")]
    pub token: Token,
    pub method: ListMethod,
    #[serde(rename = "startindex", skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    #[serde(rename = "stopindex", skip_serializing_if = "Option::is_none")]
    pub stop: Option<u64>,
    #[serde(rename = "membernames", skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<String>>,
}

/// Response to a list query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    pub success: bool,
    #[serde(default)]
    pub extrainfo: String,
    #[serde(rename = "methodname")]
    pub method: ListMethod,
    #[serde(rename = "outputdata", default)]
    pub output: Json,
    #[serde(rename = "membernames", default)]
    pub member_names: Vec<String>,
}

/// Response to an enumeration schema fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumerationResponse {
    pub success: bool,
    #[serde(default)]
    pub extrainfo: String,
    #[serde(rename = "enumvalues", default)]
    pub enum_values: BTreeMap<String, i64>,
}

/// Mutating (and reading) selection commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionCommand {
    Get,
    Set,
    Append,
    Remove,
}

/// Response to a selection command: the authoritative selection afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionResponse {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub extrainfo: String,
    #[serde(default)]
    pub selection: Vec<ReturnedItem>,
}

/// Project-level transitions. These are the only events that clear the
/// identity cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentCommand {
    New,
    Open(String),
    Close,
    Recover,
}

impl EnvironmentCommand {
    /// Action name on the environment resource.
    pub fn action(&self) -> &'static str {
        match self {
            EnvironmentCommand::New => "new",
            EnvironmentCommand::Open(_) => "open",
            EnvironmentCommand::Close => "close",
            EnvironmentCommand::Recover => "recover",
        }
    }

    /// Location argument, if the action carries one.
    pub fn location(&self) -> Option<&str> {
        match self {
            EnvironmentCommand::Open(location) => Some(location),
            _ => None,
        }
    }
}

/// Response to an environment command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentResponse {
    pub success: bool,
    #[serde(default)]
    pub extrainfo: String,
}
