//! Request gateway contract.
//!
//! The gateway executes exactly one query or command against the remote
//! application server and returns parsed structured data. Transport,
//! authentication, timeouts and retry policy all live behind this trait;
//! the core never retries and never issues overlapping requests.
//!
//! Transport failures are surfaced as
//! [`RemoError::Transport`](crate::error::RemoError::Transport), wrapping
//! whatever error the implementation produces via `anyhow`.

use crate::error::Result;
use crate::proxy::Token;
use crate::wire::{
    CommandResponse, EnumerationResponse, EnvironmentCommand, EnvironmentResponse, ListQuery,
    ListResponse, MembersResponse, NamedObjectResponse, PropertyQueryResult, SelectionCommand,
    SelectionResponse,
};

/// Synchronous request/response contract to the remote application server.
pub trait Gateway {
    /// Look up one entity by its current name.
    fn query_named_object(&mut self, name: &str) -> Result<NamedObjectResponse>;

    /// Fetch the member (method and property) descriptors of one entity.
    fn query_members(&mut self, token: &Token) -> Result<MembersResponse>;

    /// Fetch one property's value for each of the given entities, optionally
    /// pinned to a phase. Results are returned in input order.
    fn query_property_values(
        &mut self,
        tokens: &[Token],
        property: &str,
        phase: Option<&Token>,
    ) -> Result<Vec<PropertyQueryResult>>;

    /// Execute one collection query (count/index/sublist/member variants).
    fn query_list(&mut self, query: &ListQuery) -> Result<ListResponse>;

    /// Fetch the symbolic-name -> ordinal table of an enumerated type.
    fn query_enumeration(&mut self, token: &Token) -> Result<EnumerationResponse>;

    /// Execute one generic command invocation, already rendered in the
    /// remote command-line form.
    fn execute_command(&mut self, command: &str) -> Result<CommandResponse>;

    /// Execute one selection command and return the authoritative selection.
    fn execute_selection(
        &mut self,
        command: SelectionCommand,
        tokens: &[Token],
    ) -> Result<SelectionResponse>;

    /// Execute one project-level transition.
    fn execute_environment(&mut self, command: &EnvironmentCommand)
        -> Result<EnvironmentResponse>;
}
