//! Server Configuration Store
//!
//! A small concurrent string map holding the runtime configuration
//! surface (`dir`, `dbfilename`, `port`). Seeded once from the CLI in
//! `main` and read by the `CONFIG GET` command; kept behind a lock so the
//! command path and any future writers share one view.

use std::collections::HashMap;
use std::sync::RwLock;

/// Process-wide configuration entries.
#[derive(Debug, Default)]
pub struct ConfigStore {
    entries: RwLock<HashMap<String, String>>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a configuration key.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.read().unwrap().get(key).cloned()
    }

    /// Sets a configuration key, replacing any previous value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries
            .write()
            .unwrap()
            .insert(key.into(), value.into());
    }
}
