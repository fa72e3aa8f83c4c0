//! Shared in-memory key space with millisecond expiry
//!
//! All client connections mutate one `KeySpace`. A single mutex guards the
//! map, so a reader always observes a fully written `(value, expires_at)`
//! pair. Expiry is lazy: an entry past its deadline is logically absent the
//! moment the clock passes it, and is physically removed the next time a
//! read touches it. Physical occupancy may temporarily exceed logical
//! occupancy; there is no background sweeper.

use std::collections::HashMap;
use std::sync::Mutex;

/// A stored value and its optional absolute expiry in unix-millis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub value: Vec<u8>,
    pub expires_at: Option<i64>,
}

impl Entry {
    fn is_expired(&self, now: i64) -> bool {
        matches!(self.expires_at, Some(deadline) if now >= deadline)
    }
}

/// Concurrent map of key → entry shared by all connections
#[derive(Debug, Default)]
pub struct KeySpace {
    entries: Mutex<HashMap<String, Entry>>,
}

impl KeySpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a key, replacing any prior value and its expiry
    pub fn set(&self, key: String, value: Vec<u8>, expires_at: Option<i64>) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key, Entry { value, expires_at });
    }

    /// Read a key at wall-clock time `now`, removing it when expired
    pub fn get(&self, key: &str, now: i64) -> Option<Vec<u8>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    /// All keys whose expiry has not passed at time `now`
    pub fn keys(&self, now: i64) -> Vec<String> {
        let entries = self.entries.lock().unwrap();
        entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Physical entry count, used for startup logging
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get() {
        let keyspace = KeySpace::new();
        keyspace.set("foo".into(), b"bar".to_vec(), None);
        assert_eq!(keyspace.get("foo", 0), Some(b"bar".to_vec()));
        assert_eq!(keyspace.get("missing", 0), None);
    }

    #[test]
    fn test_set_overwrites_value_and_expiry() {
        let keyspace = KeySpace::new();
        keyspace.set("k".into(), b"v1".to_vec(), Some(100));
        keyspace.set("k".into(), b"v2".to_vec(), None);
        // the old deadline must not survive the overwrite
        assert_eq!(keyspace.get("k", 1_000_000), Some(b"v2".to_vec()));
    }

    #[test]
    fn test_expiry_boundary() {
        let keyspace = KeySpace::new();
        keyspace.set("k".into(), b"v".to_vec(), Some(500));
        assert_eq!(keyspace.get("k", 499), Some(b"v".to_vec()));
        assert_eq!(keyspace.get("k", 500), None);
    }

    #[test]
    fn test_expired_entry_is_removed_on_read() {
        let keyspace = KeySpace::new();
        keyspace.set("k".into(), b"v".to_vec(), Some(500));
        assert_eq!(keyspace.len(), 1);
        assert_eq!(keyspace.get("k", 501), None);
        assert_eq!(keyspace.len(), 0);
    }

    #[test]
    fn test_keys_filters_expired_entries() {
        let keyspace = KeySpace::new();
        keyspace.set("live".into(), b"a".to_vec(), None);
        keyspace.set("later".into(), b"b".to_vec(), Some(2_000));
        keyspace.set("gone".into(), b"c".to_vec(), Some(100));

        let mut keys = keyspace.keys(1_000);
        keys.sort();
        assert_eq!(keys, vec!["later".to_string(), "live".to_string()]);
        // keys() does not remove, only filters
        assert_eq!(keyspace.len(), 3);
    }
}
