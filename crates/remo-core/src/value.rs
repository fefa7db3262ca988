//! Domain values produced by the result interpreter.

use crate::proxy::ProxyHandle;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A value returned from a remote operation.
///
/// `Value::None` is the explicit no-result marker: it is distinct from
/// `Bool(false)`, `Int(0)` and the empty string, so boolean-falsy results
/// survive the single-vs-many collapsing rule.
#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
    /// A proxy handle resolved through the identity cache.
    Handle(ProxyHandle),
    List(Vec<Value>),
    /// An unmarked JSON payload, passed through verbatim.
    Raw(serde_json::Value),
    /// Output of a registered payload constructor.
    Payload(Arc<dyn Any + Send + Sync>),
}

impl Value {
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(x) => Some(*x),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<&ProxyHandle> {
        match self {
            Value::Handle(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(values) => Some(values),
            _ => None,
        }
    }

    /// Decode a bare JSON literal. Objects and non-integral numbers keep
    /// their full fidelity; JSON `null` maps to the no-result marker.
    pub fn from_json(json: &serde_json::Value) -> Value {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::None,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Double(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::Text(s.clone()),
            Json::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            Json::Object(_) => Value::Raw(json.clone()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Double(x) => write!(f, "Double({x})"),
            Value::Text(s) => write!(f, "Text({s:?})"),
            Value::Handle(h) => write!(f, "Handle({})", h.token()),
            Value::List(values) => f.debug_list().entries(values).finish(),
            Value::Raw(json) => write!(f, "Raw({json})"),
            Value::Payload(_) => f.write_str("Payload(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            // Handles compare by remote identity, not by pointer.
            (Value::Handle(a), Value::Handle(b)) => a.same_entity(b),
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Raw(a), Value::Raw(b)) => a == b,
            (Value::Payload(a), Value::Payload(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Double(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}
