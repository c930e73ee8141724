//! Key-value scratch storage standing in for browser session/local storage.

use std::collections::HashMap;
use std::sync::RwLock;

/// Session-scoped key holding the email used at sign-up.
pub const SIGNUP_EMAIL_KEY: &str = "signupEmail";
/// Persistent key holding the last verification resend time (ms since epoch).
pub const LAST_RESEND_TIME_KEY: &str = "lastResendTime";

/// Unsynchronized string store. Last writer wins.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
    }
}
