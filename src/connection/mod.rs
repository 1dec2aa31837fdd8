//! Connection Management
//!
//! - `context`: the [`RequestContext`] command handlers answer through
//! - `handler`: the sequential read-dispatch-respond loop run by each
//!   connection's task

pub mod context;
pub mod handler;

pub use context::RequestContext;
pub use handler::handle_connection;
