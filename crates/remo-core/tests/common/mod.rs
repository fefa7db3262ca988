//! In-memory gateway used by the integration tests.
//!
//! Every request is logged as a `kind:detail` string so tests can count
//! round trips per resource and assert on the exact rendered commands.

use remo_core::wire::{
    CommandResponse, EnumerationResponse, EnvironmentCommand, EnvironmentResponse, ListMethod,
    ListQuery, ListResponse, MembersResponse, NamedObjectResponse, ObjectRepr,
    PropertyQueryResult, ReturnedItem, SelectionCommand, SelectionResponse,
};
use remo_core::{Gateway, Result, Token};
use serde_json::{json, Value as Json};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

#[derive(Debug, Clone)]
pub struct ObjectSpec {
    pub type_tag: String,
    pub is_collection: bool,
    pub commands: Vec<String>,
    /// (name, token, type tag) per value-bearing member.
    pub properties: Vec<(String, String, String)>,
}

/// Scriptable in-memory server double.
#[derive(Default)]
pub struct MockGateway {
    objects: BTreeMap<String, ObjectSpec>,
    named: BTreeMap<String, String>,
    /// `owner.property` or `owner.property/phase` -> raw value.
    values: BTreeMap<String, Json>,
    elements: BTreeMap<String, Vec<String>>,
    enums: BTreeMap<String, BTreeMap<String, i64>>,
    command_script: VecDeque<CommandResponse>,
    selection: Vec<String>,
    /// Tokens the server refuses to put in the selection.
    rejects: BTreeSet<String>,
    pub calls: Vec<String>,
    pub fail_commands: bool,
    /// Drop the last entry from every property-values response.
    pub truncate_value_results: bool,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, token: &str, type_tag: &str) -> Self {
        self.objects.insert(
            token.to_string(),
            ObjectSpec {
                type_tag: type_tag.to_string(),
                is_collection: false,
                commands: Vec::new(),
                properties: Vec::new(),
            },
        );
        self
    }

    pub fn with_collection(mut self, token: &str, type_tag: &str, elements: &[&str]) -> Self {
        self = self.with_object(token, type_tag);
        if let Some(spec) = self.objects.get_mut(token) {
            spec.is_collection = true;
        }
        self.elements.insert(
            token.to_string(),
            elements.iter().map(|e| e.to_string()).collect(),
        );
        self
    }

    pub fn with_commands(mut self, token: &str, commands: &[&str]) -> Self {
        if let Some(spec) = self.objects.get_mut(token) {
            spec.commands = commands.iter().map(|c| c.to_string()).collect();
        }
        self
    }

    pub fn with_property(mut self, owner: &str, name: &str, token: &str, type_tag: &str) -> Self {
        if let Some(spec) = self.objects.get_mut(owner) {
            spec.properties
                .push((name.to_string(), token.to_string(), type_tag.to_string()));
        }
        self
    }

    pub fn with_named(mut self, name: &str, token: &str) -> Self {
        self.named.insert(name.to_string(), token.to_string());
        self
    }

    pub fn with_value(mut self, owner: &str, property: &str, value: Json) -> Self {
        self.values.insert(format!("{owner}.{property}"), value);
        self
    }

    pub fn with_staged_value(
        mut self,
        owner: &str,
        property: &str,
        phase: &str,
        value: Json,
    ) -> Self {
        self.values
            .insert(format!("{owner}.{property}/{phase}"), value);
        self
    }

    pub fn with_enum(mut self, token: &str, table: &[(&str, i64)]) -> Self {
        self.enums.insert(
            token.to_string(),
            table.iter().map(|(n, v)| (n.to_string(), *v)).collect(),
        );
        self
    }

    pub fn with_selection(mut self, tokens: &[&str]) -> Self {
        self.selection = tokens.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_rejected(mut self, token: &str) -> Self {
        self.rejects.insert(token.to_string());
        self
    }

    /// Queue a response for the next generic command.
    pub fn script_command(mut self, response: CommandResponse) -> Self {
        self.command_script.push_back(response);
        self
    }

    /// Number of logged requests whose log line starts with `prefix`.
    pub fn calls_with(&self, prefix: &str) -> usize {
        self.calls.iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn repr(&self, token: &str) -> ObjectRepr {
        match self.objects.get(token) {
            Some(spec) => {
                let mut repr = ObjectRepr::entity(token, spec.type_tag.clone());
                repr.is_collection = spec.is_collection;
                repr
            }
            None => ObjectRepr::entity(token, "Point"),
        }
    }

    fn element_repr_json(&self, token: &str) -> Json {
        json!(self.repr(token))
    }

    fn method_name(method: ListMethod) -> &'static str {
        match method {
            ListMethod::Count => "count",
            ListMethod::Sublist => "sublist",
            ListMethod::Index => "index",
            ListMethod::MemberSublist => "membersublist",
            ListMethod::MemberIndex => "memberindex",
        }
    }
}

/// A successful command response that returns nothing.
pub fn ok_response() -> CommandResponse {
    CommandResponse {
        success: true,
        extrainfo: String::new(),
        returned_objects: None,
        returned_values: None,
    }
}

/// A successful command response returning the given objects.
pub fn objects_response(items: Vec<ReturnedItem>) -> CommandResponse {
    CommandResponse {
        returned_objects: Some(items),
        ..ok_response()
    }
}

impl Gateway for MockGateway {
    fn query_named_object(&mut self, name: &str) -> Result<NamedObjectResponse> {
        self.calls.push(format!("named:{name}"));
        Ok(match self.named.get(name) {
            Some(token) => NamedObjectResponse {
                success: true,
                extrainfo: String::new(),
                returned_object: Some(ReturnedItem::Object(self.repr(token))),
            },
            None => NamedObjectResponse {
                success: false,
                extrainfo: format!("no object named '{name}'"),
                returned_object: None,
            },
        })
    }

    fn query_members(&mut self, token: &Token) -> Result<MembersResponse> {
        self.calls.push(format!("members:{token}"));
        let spec = match self.objects.get(token.as_str()) {
            Some(spec) => spec.clone(),
            None => {
                return Ok(MembersResponse {
                    success: true,
                    extrainfo: String::new(),
                    commands: Vec::new(),
                    properties: BTreeMap::new(),
                })
            }
        };
        let mut properties = BTreeMap::new();
        for (name, ptoken, tag) in &spec.properties {
            properties.insert(
                name.clone(),
                ObjectRepr {
                    type_tag: tag.clone(),
                    token: Some(Token::new(ptoken.clone())),
                    is_collection: self
                        .objects
                        .get(ptoken)
                        .map(|s| s.is_collection)
                        .unwrap_or(false),
                    owner: Some(token.clone()),
                    value: None,
                    payload: None,
                },
            );
        }
        Ok(MembersResponse {
            success: true,
            extrainfo: String::new(),
            commands: spec.commands,
            properties,
        })
    }

    fn query_property_values(
        &mut self,
        tokens: &[Token],
        property: &str,
        phase: Option<&Token>,
    ) -> Result<Vec<PropertyQueryResult>> {
        self.calls.push(format!("values:{property}"));
        let mut results = Vec::new();
        for token in tokens {
            let key = match phase {
                Some(phase) => format!("{token}.{property}/{phase}"),
                None => format!("{token}.{property}"),
            };
            let mut properties = BTreeMap::new();
            if let Some(value) = self.values.get(&key) {
                properties.insert(property.to_string(), value.clone());
            }
            results.push(PropertyQueryResult { properties });
        }
        if self.truncate_value_results {
            results.pop();
        }
        Ok(results)
    }

    fn query_list(&mut self, query: &ListQuery) -> Result<ListResponse> {
        self.calls.push(format!(
            "list:{}:{}",
            Self::method_name(query.method),
            query.token
        ));
        let elements = self
            .elements
            .get(query.token.as_str())
            .cloned()
            .unwrap_or_default();
        let len = elements.len() as u64;
        let start = query.start.unwrap_or(0).min(len) as usize;
        let stop = query.stop.unwrap_or(len).min(len) as usize;
        let member = query
            .members
            .as_ref()
            .and_then(|m| m.first())
            .cloned()
            .unwrap_or_default();

        let output = match query.method {
            ListMethod::Count => json!(len),
            ListMethod::Sublist => Json::Array(
                elements[start.min(stop)..stop]
                    .iter()
                    .map(|e| self.element_repr_json(e))
                    .collect(),
            ),
            ListMethod::Index => elements
                .get(start)
                .map(|e| self.element_repr_json(e))
                .unwrap_or(Json::Null),
            ListMethod::MemberIndex => {
                let value = elements
                    .get(start)
                    .and_then(|e| self.values.get(&format!("{e}.{member}")))
                    .cloned()
                    .unwrap_or(Json::Null);
                json!({ (member.clone()): value })
            }
            ListMethod::MemberSublist => {
                let values: Vec<Json> = elements[start.min(stop)..stop]
                    .iter()
                    .map(|e| {
                        self.values
                            .get(&format!("{e}.{member}"))
                            .cloned()
                            .unwrap_or(Json::Null)
                    })
                    .collect();
                json!({ (member.clone()): values })
            }
        };
        Ok(ListResponse {
            success: true,
            extrainfo: String::new(),
            method: query.method,
            output,
            member_names: query.members.clone().unwrap_or_default(),
        })
    }

    fn query_enumeration(&mut self, token: &Token) -> Result<EnumerationResponse> {
        self.calls.push(format!("enum:{token}"));
        Ok(match self.enums.get(token.as_str()) {
            Some(table) => EnumerationResponse {
                success: true,
                extrainfo: String::new(),
                enum_values: table.clone(),
            },
            None => EnumerationResponse {
                success: false,
                extrainfo: "unknown enumeration".to_string(),
                enum_values: BTreeMap::new(),
            },
        })
    }

    fn execute_command(&mut self, command: &str) -> Result<CommandResponse> {
        self.calls.push(format!("command:{command}"));
        if self.fail_commands {
            return Ok(CommandResponse {
                success: false,
                extrainfo: "server rejected the command".to_string(),
                returned_objects: None,
                returned_values: None,
            });
        }
        Ok(self.command_script.pop_front().unwrap_or_else(ok_response))
    }

    fn execute_selection(
        &mut self,
        command: SelectionCommand,
        tokens: &[Token],
    ) -> Result<SelectionResponse> {
        self.calls.push(format!("selection:{command:?}"));
        let accepted: Vec<String> = tokens
            .iter()
            .map(|t| t.as_str().to_string())
            .filter(|t| !self.rejects.contains(t))
            .collect();
        match command {
            SelectionCommand::Get => {}
            SelectionCommand::Set => self.selection = accepted,
            SelectionCommand::Append => {
                for token in accepted {
                    if !self.selection.contains(&token) {
                        self.selection.push(token);
                    }
                }
            }
            SelectionCommand::Remove => {
                self.selection.retain(|t| !accepted.contains(t));
            }
        }
        let selection = self
            .selection
            .iter()
            .map(|t| ReturnedItem::Object(self.repr(t)))
            .collect();
        Ok(SelectionResponse {
            success: true,
            extrainfo: String::new(),
            selection,
        })
    }

    fn execute_environment(&mut self, command: &EnvironmentCommand) -> Result<EnvironmentResponse> {
        self.calls.push(format!("env:{}", command.action()));
        Ok(EnvironmentResponse {
            success: true,
            extrainfo: String::new(),
        })
    }
}
