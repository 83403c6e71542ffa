//! The keyspace itself: a plain `HashMap<String, Entry>`.
//!
//! `Store` holds no locking of its own — callers wrap it in a
//! `tokio::sync::RwLock` (see `Engine` in `commands::mod`) and take a write
//! guard for the whole of a mutating command, a read guard for pure reads.

use std::collections::HashMap;
use std::time::Instant;

use crate::db::types::Entry;

/// The in-memory keyspace.
#[derive(Default)]
pub struct Store {
    items: HashMap<String, Entry>,
}

impl Store {
    pub fn new() -> Self {
        Store { items: HashMap::new() }
    }

    /// Look up a live entry, evicting it first if its TTL has passed.
    pub fn get(&mut self, key: &str) -> Option<&Entry> {
        self.evict_if_expired(key);
        self.items.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.evict_if_expired(key);
        self.items.get_mut(key)
    }

    pub fn contains(&mut self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn insert(&mut self, key: String, entry: Entry) {
        self.items.insert(key, entry);
    }

    pub fn remove(&mut self, key: &str) -> Option<Entry> {
        self.evict_if_expired(key);
        self.items.remove(key)
    }

    /// Every live key, lazily evicting expired ones along the way.
    pub fn all_keys(&mut self) -> Vec<String> {
        let now = Instant::now();
        let expired: Vec<String> = self
            .items
            .iter()
            .filter(|(_, e)| e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in expired {
            self.items.remove(&key);
        }
        self.items.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn evict_if_expired(&mut self, key: &str) {
        let expired = matches!(self.items.get(key), Some(e) if e.is_expired(Instant::now()));
        if expired {
            self.items.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::ValueKind;
    use std::time::Duration;

    #[test]
    fn expired_entry_is_evicted_lazily_on_get() {
        let mut store = Store::new();
        let mut entry = Entry::new(ValueKind::String("v".to_string()));
        entry.expires_at = Some(Instant::now() - Duration::from_secs(1));
        store.insert("k".to_string(), entry);

        assert!(store.get("k").is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn keys_skips_expired_entries() {
        let mut store = Store::new();
        store.insert("live".to_string(), Entry::new(ValueKind::String("v".to_string())));
        let mut dead = Entry::new(ValueKind::String("v".to_string()));
        dead.expires_at = Some(Instant::now() - Duration::from_secs(1));
        store.insert("dead".to_string(), dead);

        assert_eq!(store.all_keys(), vec!["live".to_string()]);
    }
}
