//! Storage Layer
//!
//! The shared state behind the command surface:
//!
//! - `engine`: the [`Keyspace`] - keyspace + expiry tables behind one lock
//! - `config`: the [`ConfigStore`] backing `CONFIG GET`
//! - `expiry`: the background sweeper that reclaims expired keys
//!
//! Everything here is constructed once in `main`, wrapped in `Arc`, and
//! passed by reference into per-connection tasks; there are no hidden
//! singletons.

pub mod config;
pub mod engine;
pub mod expiry;

pub use config::ConfigStore;
pub use engine::Keyspace;
pub use expiry::{start_expiry_sweeper, ExpirySweeper, SweeperConfig};
