//! Lazy iteration and bulk reads over remote collections.

use crate::command::CallArg;
use crate::error::{RemoError, Result};
use crate::gateway::Gateway;
use crate::proxy::{Attribute, ProxyHandle, Token};
use crate::session::Session;
use crate::value::Value;
use std::collections::VecDeque;

impl<G: Gateway> Session<G> {
    /// Iterate a collection lazily, fetching one bounded page per round
    /// trip. The element count is read once, up front, and the iteration
    /// window never exceeds the configured page size.
    pub fn elements<'s>(&'s mut self, handle: &ProxyHandle) -> Result<PagedIter<'s, G>> {
        let target = self.collection_handle(handle)?;
        Ok(PagedIter {
            session: self,
            target,
            length: None,
            cursor: 0,
            buffer: VecDeque::new(),
            failed: false,
        })
    }
}

/// Lazy, page-buffered iterator over one collection.
///
/// Produced by [`Session::elements`]. The first `next` call counts the
/// collection; each subsequent page is fetched only when the buffer runs
/// dry, so early termination never pays for unvisited pages. After the
/// first error the iterator is fused.
pub struct PagedIter<'s, G: Gateway> {
    session: &'s mut Session<G>,
    target: ProxyHandle,
    length: Option<u64>,
    cursor: u64,
    buffer: VecDeque<Value>,
    failed: bool,
}

impl<G: Gateway> PagedIter<'_, G> {
    fn fill(&mut self) -> Result<()> {
        let length = match self.length {
            Some(length) => length,
            None => {
                let length = self.session.count(&self.target)?;
                self.length = Some(length);
                length
            }
        };
        while self.buffer.is_empty() && self.cursor < length {
            let stop = (self.cursor + self.session.config().page_size).min(length);
            match self.session.slice(&self.target, self.cursor, stop)? {
                Value::List(values) => self.buffer.extend(values),
                other => {
                    return Err(RemoError::malformed(format!(
                        "collection slice yielded a non-list: {other:?}"
                    )))
                }
            }
            self.cursor = stop;
        }
        Ok(())
    }
}

impl<G: Gateway> Iterator for PagedIter<'_, G> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if let Err(err) = self.fill() {
            self.failed = true;
            return Some(Err(err));
        }
        self.buffer.pop_front().map(Ok)
    }
}

/// One property read column-wise across the elements of a collection,
/// optionally under a phase key.
///
/// Reads go through the batched property-values query, one round trip per
/// column instead of one per element.
#[derive(Debug, Clone)]
pub struct PropertyColumn {
    parent: ProxyHandle,
    property: String,
    phase: Option<ProxyHandle>,
}

impl PropertyColumn {
    pub fn new(parent: ProxyHandle, property: impl Into<String>) -> Self {
        Self {
            parent,
            property: property.into(),
            phase: None,
        }
    }

    /// Read under a phase key instead of the current state.
    pub fn in_phase(mut self, phase: ProxyHandle) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn len<G: Gateway>(&self, session: &mut Session<G>) -> Result<u64> {
        session.count(&self.parent)
    }

    pub fn is_empty<G: Gateway>(&self, session: &mut Session<G>) -> Result<bool> {
        Ok(self.len(session)? == 0)
    }

    /// The property value of every element, in element order, in one
    /// batched query.
    pub fn values<G: Gateway>(&self, session: &mut Session<G>) -> Result<Vec<Value>> {
        let tokens = self.element_tokens(session)?;
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        let phase = self.phase.as_ref().map(|p| p.token());
        session.objects_property(&tokens, &self.property, phase)
    }

    /// The property value of the element at `index`.
    pub fn get<G: Gateway>(&self, session: &mut Session<G>, index: u64) -> Result<Value> {
        let len = self.len(session)?;
        if index >= len {
            return Err(RemoError::IndexOutOfRange { index, len });
        }
        let element = self.element_handle(session, index)?;
        let phase = self.phase.as_ref().map(|p| p.token());
        let mut values = session.objects_property(
            std::slice::from_ref(element.token()),
            &self.property,
            phase,
        )?;
        values
            .pop()
            .ok_or_else(|| RemoError::malformed("property-values response was empty"))
    }

    /// Assign the property of the element at `index`.
    pub fn set<G: Gateway>(
        &self,
        session: &mut Session<G>,
        index: u64,
        value: CallArg,
    ) -> Result<Value> {
        let element = self.element_handle(session, index)?;
        match session.attribute(&element, &self.property)? {
            Attribute::Property(property) => session.set_property(&property, value),
            Attribute::Method(_) => Err(RemoError::InvalidArgument {
                message: format!("'{}' is a method, not a property", self.property),
            }),
        }
    }

    fn element_handle<G: Gateway>(
        &self,
        session: &mut Session<G>,
        index: u64,
    ) -> Result<ProxyHandle> {
        match session.item(&self.parent, index)? {
            Value::Handle(handle) => Ok(handle),
            other => Err(RemoError::malformed(format!(
                "collection element is not an entity: {other:?}"
            ))),
        }
    }

    fn element_tokens<G: Gateway>(&self, session: &mut Session<G>) -> Result<Vec<Token>> {
        let len = self.len(session)?;
        let elements = session.slice(&self.parent, 0, len)?;
        let values = match elements {
            Value::List(values) => values,
            other => {
                return Err(RemoError::malformed(format!(
                    "collection slice yielded a non-list: {other:?}"
                )))
            }
        };
        values
            .into_iter()
            .map(|value| match value {
                Value::Handle(handle) => Ok(handle.token().clone()),
                other => Err(RemoError::malformed(format!(
                    "collection element is not an entity: {other:?}"
                ))),
            })
            .collect()
    }
}
