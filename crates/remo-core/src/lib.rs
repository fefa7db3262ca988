//! Remo Core - Remote-object identity cache and proxy dispatch.
//!
//! This crate keeps a local mirror of entities living inside a remote
//! application server: one live handle per server token, memoized read
//! caches that are conservatively invalidated before every mutating call,
//! lazy bounded-page collection iteration, and a selection mirror whose
//! contents the server owns. Transport is pluggable through the
//! [`Gateway`] trait; the crate itself performs no I/O.
//!
//! # Example
//!
//! ```rust,ignore
//! use remo_core::{Attribute, CallArg, Session, SessionConfig};
//!
//! fn main() -> remo_core::Result<()> {
//!     let gateway = my_transport::connect("127.0.0.1:10000")?;
//!     let mut session = Session::new(gateway, SessionConfig::default());
//!
//!     let global = session.global();
//!     let point = session.call_method(Some(&global), "point", &[
//!         CallArg::Double(1.0),
//!         CallArg::Double(2.5),
//!     ])?;
//!
//!     if let Some(point) = point.as_handle() {
//!         if let Attribute::Property(x) = session.attribute(point, "x")? {
//!             println!("x = {:?}", session.property_value(&x)?);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod gateway;
pub mod proxy;
pub mod selection;
pub mod session;
pub mod value;
pub mod wire;

mod collection;
mod factory;
mod interpret;

// Re-export commonly used types
pub use collection::{PagedIter, PropertyColumn};
pub use command::CallArg;
pub use config::SessionConfig;
pub use error::{RemoError, Result};
pub use gateway::Gateway;
pub use proxy::{
    AttrMap, Attribute, EnumDef, PropertyMeta, Proxy, ProxyHandle, ProxyKind, Token, ValueKind,
};
pub use selection::Selection;
pub use session::{PayloadConstructor, Session};
pub use value::Value;
