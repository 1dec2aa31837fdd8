//! Command Layer
//!
//! - `arguments`: declarative schemas that split a request tail into
//!   positional and named arguments
//! - `router`: per-command handlers and the name-based dispatch in front
//!   of them
//!
//! Handlers never touch sockets or buffers directly; they read the shared
//! stores and answer through the
//! [`RequestContext`](crate::connection::RequestContext).

pub mod arguments;
pub mod router;

pub use arguments::{ArgError, ArgSchema, ArgSpec, Arguments, NamedArg};
pub use router::dispatch;
