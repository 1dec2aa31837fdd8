//! # EmberKV - An In-Memory Key-Value Server
//!
//! EmberKV is a Redis-compatible, in-memory key-value server written in
//! Rust. It speaks the RESP wire protocol and can hydrate its initial
//! state from a binary RDB snapshot file.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                              EmberKV                               │
//! │                                                                    │
//! │  ┌──────────┐   ┌─────────────┐   ┌──────────┐   ┌─────────────┐  │
//! │  │ Listener │──>│ FrameReader │──>│ dispatch │──>│ Request     │  │
//! │  │ (accept) │   │ (protocol)  │   │ (commands)│  │ Context     │  │
//! │  └──────────┘   └─────────────┘   └────┬─────┘   └─────────────┘  │
//! │                                        │                          │
//! │                                        ▼                          │
//! │  ┌──────────────┐             ┌─────────────────┐                 │
//! │  │   snapshot   │────────────>│    Keyspace     │<── sweeper      │
//! │  │  (startup)   │   hydrate   │ (keys+expiries) │                 │
//! │  └──────────────┘             └─────────────────┘                 │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Bytes flow from the socket through the [`protocol`] stack into one
//! decoded frame at a time; the [`commands`] layer binds arguments and
//! answers through the connection's
//! [`RequestContext`](connection::RequestContext). Independently, at
//! startup, the [`snapshot`] decoder reconstructs keyspace and expiry
//! tables from disk and hands them to the [`storage`] layer.
//!
//! ## Module Overview
//!
//! - [`protocol`]: RESP value types, the restart-safe incremental frame
//!   decoder, and the framed stream reader
//! - [`snapshot`]: the binary dump decoder used for startup hydration
//! - [`storage`]: the shared keyspace with expiry metadata, the config
//!   store, and the background expiry sweeper
//! - [`commands`]: argument binding and the command handlers
//!   (PING, ECHO, GET, SET, CONFIG, KEYS)
//! - [`connection`]: the per-connection read-dispatch-respond loop
//!
//! ## Design Highlights
//!
//! ### Restart-safe parsing
//!
//! The frame decoder treats incomplete input as a normal result, not an
//! error, so the stream reader can probe it cheaply after every read and
//! a frame split across arbitrary chunk boundaries parses identically to
//! one delivered whole.
//!
//! ### Ownership boundary at the buffer edge
//!
//! Decoded values copy their payload bytes out of the reader's buffer on
//! commit. The buffer is compacted after every consumed frame, and no
//! value ever aliases it.
//!
//! ### Lazy plus active expiry
//!
//! Keys carry absolute expiry instants. Reads treat a past instant as
//! absence and reclaim the key on the spot; a background sweeper reclaims
//! expired keys that are never read again.

pub mod commands;
pub mod connection;
pub mod protocol;
pub mod snapshot;
pub mod storage;

pub use commands::dispatch;
pub use connection::{handle_connection, RequestContext};
pub use protocol::{FrameError, FrameReader, ParseError, RespValue};
pub use snapshot::SnapshotError;
pub use storage::{ConfigStore, Keyspace};

/// The default port the server listens on (same as Redis).
pub const DEFAULT_PORT: u16 = 6379;

/// The default directory holding the snapshot file.
pub const DEFAULT_DIR: &str = "/tmp/redis-data";

/// The default snapshot filename within the data directory.
pub const DEFAULT_DBFILENAME: &str = "dump.rdb";

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
