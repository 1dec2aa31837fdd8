//! Snapshot Hydration
//!
//! Decoding of the compact binary dump format the server hydrates from at
//! startup. Read-only: this server never writes snapshots.
//!
//! - `format`: opcodes, the 2-bit length encoding, string field decoding
//! - `loader`: header/aux/body phases and the body state machine

pub mod format;
pub mod loader;

pub use format::{Cursor, SnapshotError};
pub use loader::{decode, load_file, Database};
