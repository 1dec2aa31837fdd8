//! Snapshot File Decoder
//!
//! Reconstructs key/value tables (with per-key expiry metadata) from the
//! binary dump format. The file has three regions:
//!
//! ```text
//! "REDIS" <4 ascii digits>          header
//! (0xFA <string> <string>)*         auxiliary fields
//! ( 0xFE <len>                      database selector
//!   (0xFB <len> <len>)?             resize hints
//!   ( (0xFD <u32le> | 0xFC <u64le>)?  optional expiry prefix
//!     <type> <key> <value> )*       key/value pairs
//! )*
//! 0xFF                              end of body
//! ```
//!
//! The body loop is an explicit state machine: an expiry prefix moves the
//! decoder into a state that *requires* a value-type byte and exactly one
//! key/value pair next, which makes that contract checkable instead of an
//! accident of control flow.
//!
//! Expiry instants keep their source precision: the millisecond opcode
//! produces a millisecond-resolution instant, never a truncation to whole
//! seconds.
//!
//! Decoding runs synchronously at startup, before any request handler can
//! observe the stores. Errors abort the load; the caller proceeds with an
//! empty database.

use crate::protocol::RespValue;
use crate::snapshot::format::{opcode, Cursor, SnapshotError, MAGIC, STRING_VALUE, VERSION_DIGITS};
use bytes::Bytes;
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

/// One database reconstructed from a snapshot: the keyspace and the
/// expiry table, keyed identically.
#[derive(Debug, Default)]
pub struct Database {
    /// The index announced by the SELECTDB opcode.
    pub index: u64,
    /// Key to stored value.
    pub keyspace: HashMap<Bytes, RespValue>,
    /// Key to absolute expiry instant, for keys that carry one.
    pub expiries: HashMap<Bytes, SystemTime>,
}

impl Database {
    fn new(index: u64) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }
}

/// Body decoding states. An expiry prefix is only legal immediately
/// before a key/value pair; `ExpectValue` carries the decoded instant
/// until that pair arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyState {
    ExpectOpcode,
    ExpectValue(SystemTime),
}

/// Decodes a complete snapshot from memory into an ordered database list.
pub fn decode(bytes: &[u8]) -> Result<Vec<Database>, SnapshotError> {
    let mut cur = Cursor::new(bytes);
    read_header(&mut cur)?;
    read_aux_fields(&mut cur)?;
    read_body(&mut cur)
}

/// Reads a snapshot file from disk and decodes it.
pub fn load_file(path: impl AsRef<Path>) -> Result<Vec<Database>, SnapshotError> {
    let bytes = std::fs::read(path)?;
    decode(&bytes)
}

/// Requires the 9-octet preamble: `REDIS` followed by four ASCII digits.
fn read_header(cur: &mut Cursor<'_>) -> Result<(), SnapshotError> {
    let preamble = cur
        .take(MAGIC.len() + VERSION_DIGITS)
        .map_err(|_| SnapshotError::InvalidHeader)?;
    let (magic, version) = preamble.split_at(MAGIC.len());
    if magic != MAGIC || !version.iter().all(|b| b.is_ascii_digit()) {
        return Err(SnapshotError::InvalidHeader);
    }
    debug!(version = %String::from_utf8_lossy(version), "snapshot header");
    Ok(())
}

/// Consumes the run of auxiliary fields after the header. The pairs are
/// informational; they are logged and dropped.
fn read_aux_fields(cur: &mut Cursor<'_>) -> Result<(), SnapshotError> {
    while cur.peek_u8() == Some(opcode::AUX) {
        cur.take_u8()?;
        let key = cur.string()?;
        let value = cur.string()?;
        debug!(
            key = %String::from_utf8_lossy(&key),
            value = %String::from_utf8_lossy(&value),
            "snapshot aux field"
        );
    }
    Ok(())
}

fn read_body(cur: &mut Cursor<'_>) -> Result<Vec<Database>, SnapshotError> {
    let mut databases: Vec<Database> = Vec::new();
    let mut state = BodyState::ExpectOpcode;

    loop {
        match state {
            BodyState::ExpectOpcode => {
                let op = cur.take_u8()?;
                match op {
                    opcode::EOF => break,
                    // An AUX opcode inside the body also ends the loop.
                    // The format nominally allows aux fields anywhere;
                    // this decoder only honors them in the header region.
                    opcode::AUX => break,
                    opcode::SELECT_DB => {
                        let index = cur.length()?;
                        debug!(index, "snapshot database selector");
                        databases.push(Database::new(index));
                    }
                    opcode::EXPIRE_TIME_SEC => {
                        let secs = u64::from(cur.take_u32_le()?);
                        state = BodyState::ExpectValue(UNIX_EPOCH + Duration::from_secs(secs));
                    }
                    opcode::EXPIRE_TIME_MS => {
                        let millis = cur.take_u64_le()?;
                        state = BodyState::ExpectValue(UNIX_EPOCH + Duration::from_millis(millis));
                    }
                    opcode::RESIZE_DB => {
                        let keyspace_hint = cur.length()? as usize;
                        let expiries_hint = cur.length()? as usize;
                        if let Some(db) = databases.last_mut() {
                            db.keyspace.reserve(keyspace_hint);
                            db.expiries.reserve(expiries_hint);
                        }
                    }
                    value_type => {
                        let (key, value) = read_pair(cur, value_type)?;
                        let db = current(&mut databases)?;
                        db.keyspace.insert(key, value);
                    }
                }
            }
            BodyState::ExpectValue(expires_at) => {
                // The expiry prefix promised a pair; anything else here is
                // a broken file.
                let value_type = cur.take_u8()?;
                let (key, value) = read_pair(cur, value_type)?;
                let db = current(&mut databases)?;
                // Both tables get the key, even when the instant is
                // already past: expiry is a read-side concern.
                db.expiries.insert(key.clone(), expires_at);
                db.keyspace.insert(key, value);
                state = BodyState::ExpectOpcode;
            }
        }
    }

    Ok(databases)
}

/// Decodes one key/value pair of the given value type.
fn read_pair(cur: &mut Cursor<'_>, value_type: u8) -> Result<(Bytes, RespValue), SnapshotError> {
    if value_type != STRING_VALUE {
        return Err(SnapshotError::UnsupportedEncoding(value_type));
    }
    let key = cur.string()?;
    let value = cur.string()?;
    Ok((key, RespValue::BulkString(value)))
}

fn current(databases: &mut [Database]) -> Result<&mut Database, SnapshotError> {
    databases.last_mut().ok_or(SnapshotError::NoDatabaseSelected)
}
