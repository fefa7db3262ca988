//! Assembly of remote command-line invocations.
//!
//! Method calls travel as a single command string:
//! `method [target-token] [arg ...]`. Proxies are passed by token literal,
//! lists are parenthesized, and strings are wrapped in the first quoting
//! style they do not themselves contain.

use crate::error::{RemoError, Result};
use crate::proxy::{Proxy, ProxyHandle, ValueKind};
use crate::value::Value;

/// Quoting styles accepted by the remote command line, in preference order.
const STRING_WRAPPERS: [&str; 4] = ["\"", "'", "\"\"\"", "'''"];

/// One argument of a remote method call.
#[derive(Debug, Clone)]
pub enum CallArg {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
    Handle(ProxyHandle),
    List(Vec<CallArg>),
}

impl CallArg {
    /// Render this argument in remote command-line form.
    pub(crate) fn render(&self) -> Result<String> {
        match self {
            CallArg::Null => Ok("None".to_string()),
            CallArg::Bool(true) => Ok("True".to_string()),
            CallArg::Bool(false) => Ok("False".to_string()),
            CallArg::Int(n) => Ok(n.to_string()),
            CallArg::Double(x) => Ok(x.to_string()),
            CallArg::Text(s) => wrap_string(s),
            CallArg::Handle(h) => Ok(h.wire_repr().to_string()),
            CallArg::List(items) => Ok(format!("({})", render_args(items)?)),
        }
    }
}

impl From<bool> for CallArg {
    fn from(b: bool) -> Self {
        CallArg::Bool(b)
    }
}

impl From<i64> for CallArg {
    fn from(n: i64) -> Self {
        CallArg::Int(n)
    }
}

impl From<f64> for CallArg {
    fn from(x: f64) -> Self {
        CallArg::Double(x)
    }
}

impl From<&str> for CallArg {
    fn from(s: &str) -> Self {
        CallArg::Text(s.to_string())
    }
}

impl From<String> for CallArg {
    fn from(s: String) -> Self {
        CallArg::Text(s)
    }
}

impl From<ProxyHandle> for CallArg {
    fn from(h: ProxyHandle) -> Self {
        CallArg::Handle(h)
    }
}

impl TryFrom<Value> for CallArg {
    type Error = RemoError;

    /// Lower a previously returned value back into a call argument.
    fn try_from(value: Value) -> Result<CallArg> {
        match value {
            Value::None => Ok(CallArg::Null),
            Value::Bool(b) => Ok(CallArg::Bool(b)),
            Value::Int(n) => Ok(CallArg::Int(n)),
            Value::Double(x) => Ok(CallArg::Double(x)),
            Value::Text(s) => Ok(CallArg::Text(s)),
            Value::Handle(h) => Ok(CallArg::Handle(h)),
            Value::List(values) => Ok(CallArg::List(
                values
                    .into_iter()
                    .map(CallArg::try_from)
                    .collect::<Result<Vec<_>>>()?,
            )),
            Value::Raw(_) | Value::Payload(_) => Err(RemoError::InvalidArgument {
                message: "opaque payloads cannot be passed as call arguments".to_string(),
            }),
        }
    }
}

/// Wrap a string in the first quoting style it does not contain.
fn wrap_string(s: &str) -> Result<String> {
    for wrapper in STRING_WRAPPERS {
        if !s.contains(wrapper) {
            return Ok(format!("{wrapper}{s}{wrapper}"));
        }
    }
    Err(RemoError::UnquotableString(s.to_string()))
}

/// Concatenate rendered arguments, space separated.
pub(crate) fn render_args(args: &[CallArg]) -> Result<String> {
    let rendered = args
        .iter()
        .map(CallArg::render)
        .collect::<Result<Vec<_>>>()?;
    Ok(rendered.join(" "))
}

/// Render a full method invocation. The root object's empty token is
/// elided, so global commands read `undo`, not `undo `.
pub(crate) fn method_call(target: Option<&Proxy>, method: &str, args: &[CallArg]) -> Result<String> {
    let mut parts = vec![method.to_string()];
    if let Some(target) = target {
        let repr = target.wire_repr();
        if !repr.is_empty() {
            parts.push(repr.to_string());
        }
    }
    let rendered = render_args(args)?;
    if !rendered.is_empty() {
        parts.push(rendered);
    }
    Ok(parts.join(" "))
}

/// True when a handle argument must be passed by its current value rather
/// than by token: plain value-bearing properties dereference, phase-indexed
/// ones do not.
pub(crate) fn passes_by_value(handle: &Proxy) -> bool {
    match handle.property_meta() {
        Some(meta) => !matches!(meta.kind, ValueKind::Staged),
        None => false,
    }
}
