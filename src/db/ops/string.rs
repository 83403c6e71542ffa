//! String value operations: GET / SET (with TTL) / INCR.

use std::time::{Duration, Instant};

use crate::db::core::Store;
use crate::db::types::{Entry, ValueKind};
use crate::error::{CacheError, CacheResult};

pub trait StringOps {
    /// `Ok(None)` on missing key; `Err(WrongType)` if the key holds a non-string.
    fn get(&mut self, key: &str) -> CacheResult<Option<String>>;

    /// Set `key` to `value`. `ttl` replaces any existing expiry; `None` clears it.
    fn set(&mut self, key: String, value: String, ttl: Option<Duration>);

    /// `INCR`/`INCRBY`: parses the stored string as `i64`, adds `delta`, stores
    /// the new value back as text. Missing key defaults to `0`.
    fn incrby(&mut self, key: &str, delta: i64) -> CacheResult<i64>;
}

impl StringOps for Store {
    fn get(&mut self, key: &str) -> CacheResult<Option<String>> {
        match self.get(key) {
            None => Ok(None),
            Some(entry) => match &entry.value {
                ValueKind::String(s) => Ok(Some(s.clone())),
                _ => Err(CacheError::WrongType),
            },
        }
    }

    fn set(&mut self, key: String, value: String, ttl: Option<Duration>) {
        let expires_at = ttl.map(|d| Instant::now() + d);
        self.insert(key, Entry { value: ValueKind::String(value), expires_at });
    }

    fn incrby(&mut self, key: &str, delta: i64) -> CacheResult<i64> {
        let (current, expires_at) = match self.get(key) {
            None => (0i64, None),
            Some(entry) => {
                let s = match &entry.value {
                    ValueKind::String(s) => s,
                    _ => return Err(CacheError::WrongType),
                };
                let n = s.parse::<i64>().map_err(|_| CacheError::StoredValueNotInteger)?;
                (n, entry.expires_at)
            }
        };

        let new_val = current.checked_add(delta).ok_or(CacheError::Overflow)?;
        self.insert(
            key.to_string(),
            Entry { value: ValueKind::String(new_val.to_string()), expires_at },
        );
        Ok(new_val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let mut store = Store::new();
        store.set("k".to_string(), "v".to_string(), None);
        assert_eq!(StringOps::get(&mut store, "k").unwrap(), Some("v".to_string()));
    }

    #[test]
    fn incrby_defaults_missing_key_to_zero() {
        let mut store = Store::new();
        assert_eq!(store.incrby("counter", 1).unwrap(), 1);
        assert_eq!(store.incrby("counter", 5).unwrap(), 6);
    }

    #[test]
    fn incrby_rejects_non_integer_stored_value() {
        let mut store = Store::new();
        store.set("k".to_string(), "abc".to_string(), None);
        assert_eq!(store.incrby("k", 1), Err(CacheError::StoredValueNotInteger));
    }

    #[test]
    fn incrby_preserves_existing_ttl() {
        let mut store = Store::new();
        store.set("k".to_string(), "1".to_string(), Some(Duration::from_secs(10)));
        store.incrby("k", 1).unwrap();
        assert!(store.get("k").unwrap().expires_at.is_some());
    }

    #[test]
    fn get_on_wrong_type_errors() {
        use crate::db::ops::hash::HashOps;
        let mut store = Store::new();
        store.hset(&"h".to_string(), "f".to_string(), "v".to_string()).unwrap();
        assert_eq!(StringOps::get(&mut store, "h"), Err(CacheError::WrongType));
    }
}
