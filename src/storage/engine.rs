//! Keyspace With Expiry Metadata
//!
//! The shared mutable heart of the server: two logical maps per database,
//! `keyspace: key -> value` and `expiries: key -> absolute instant`, kept
//! behind one `RwLock` so a reader always observes a consistent
//! (value, expiry) pair relative to any single write.
//!
//! ## Expiry model
//!
//! Expiries are absolute wall-clock instants (`SystemTime`), which is what
//! the snapshot format stores and what `SET ... PX` resolves to at write
//! time. A key whose instant has passed is *absent* on read - lazy expiry.
//! Reads that trip over an expired key upgrade to a write lock and remove
//! it; the background sweeper ([`expiry`](crate::storage::expiry)) reclaims
//! keys that are never read again.
//!
//! ## Concurrency
//!
//! Designed to be wrapped in an `Arc` and shared across connection tasks.
//! The read-dominant workload makes a reader/writer lock a good fit:
//! `get`/`keys` take the shared lock, mutations take it exclusively, and
//! critical sections never block on I/O.

use crate::protocol::RespValue;
use crate::snapshot::Database;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

/// The two tables, always locked together.
#[derive(Debug, Default)]
struct Tables {
    keyspace: HashMap<Bytes, RespValue>,
    expiries: HashMap<Bytes, SystemTime>,
}

impl Tables {
    fn is_expired(&self, key: &[u8], now: SystemTime) -> bool {
        self.expiries.get(key).is_some_and(|at| *at <= now)
    }

    fn remove(&mut self, key: &[u8]) -> bool {
        self.expiries.remove(key);
        self.keyspace.remove(key).is_some()
    }
}

/// The concurrent key/value store with per-key expiry.
#[derive(Debug, Default)]
pub struct Keyspace {
    tables: RwLock<Tables>,
}

impl Keyspace {
    /// Creates an empty keyspace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a keyspace from a decoded snapshot database, taking
    /// ownership of both its maps.
    pub fn from_snapshot(db: Database) -> Self {
        Self {
            tables: RwLock::new(Tables {
                keyspace: db.keyspace,
                expiries: db.expiries,
            }),
        }
    }

    /// Looks up a key. Returns `None` for missing keys and for keys whose
    /// expiry instant has passed; the latter are removed on the way out.
    pub fn get(&self, key: &[u8]) -> Option<RespValue> {
        let now = SystemTime::now();

        // Fast path under the shared lock.
        {
            let tables = self.tables.read().unwrap();
            if !tables.keyspace.contains_key(key) {
                return None;
            }
            if !tables.is_expired(key, now) {
                return tables.keyspace.get(key).cloned();
            }
        }

        // Key present but expired: take the exclusive lock and re-check,
        // another writer may have replaced it in the gap.
        let mut tables = self.tables.write().unwrap();
        if tables.is_expired(key, now) {
            tables.remove(key);
            return None;
        }
        tables.keyspace.get(key).cloned()
    }

    /// Stores a value with no expiry, clearing any previous expiry on the
    /// same key.
    pub fn set(&self, key: Bytes, value: RespValue) {
        let mut tables = self.tables.write().unwrap();
        tables.expiries.remove(&key);
        tables.keyspace.insert(key, value);
    }

    /// Stores a value that expires at an absolute instant.
    pub fn set_with_expiry(&self, key: Bytes, value: RespValue, expires_at: SystemTime) {
        let mut tables = self.tables.write().unwrap();
        tables.expiries.insert(key.clone(), expires_at);
        tables.keyspace.insert(key, value);
    }

    /// Stores a value that expires `ttl` from now.
    pub fn set_with_ttl(&self, key: Bytes, value: RespValue, ttl: Duration) {
        self.set_with_expiry(key, value, SystemTime::now() + ttl);
    }

    /// Removes a key. Returns whether it was present (expired keys count
    /// as absent).
    pub fn delete(&self, key: &[u8]) -> bool {
        let now = SystemTime::now();
        let mut tables = self.tables.write().unwrap();
        let was_live = tables.keyspace.contains_key(key) && !tables.is_expired(key, now);
        tables.remove(key);
        was_live
    }

    /// All live keys, in no particular order.
    pub fn keys(&self) -> Vec<Bytes> {
        let now = SystemTime::now();
        let tables = self.tables.read().unwrap();
        tables
            .keyspace
            .keys()
            .filter(|key| !tables.is_expired(key, now))
            .cloned()
            .collect()
    }

    /// The expiry instant recorded for a key, if any.
    pub fn expiry(&self, key: &[u8]) -> Option<SystemTime> {
        self.tables.read().unwrap().expiries.get(key).copied()
    }

    /// Number of stored keys, including not-yet-reclaimed expired ones.
    pub fn len(&self) -> usize {
        self.tables.read().unwrap().keyspace.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every key whose expiry instant has passed. Returns how
    /// many were reclaimed.
    pub fn sweep_expired(&self) -> usize {
        let now = SystemTime::now();
        let mut tables = self.tables.write().unwrap();

        let dead: Vec<Bytes> = tables
            .expiries
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &dead {
            tables.remove(key);
        }
        dead.len()
    }
}
