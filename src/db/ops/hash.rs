//! Hash value operations (field -> value sub-maps), with the WRONGTYPE guard.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::db::core::Store;
use crate::db::ops::generic::glob_match;
use crate::db::types::{Entry, ValueKind};
use crate::error::{CacheError, CacheResult};

pub trait HashOps {
    fn hset(&mut self, key: &str, field: String, value: String) -> CacheResult<usize>;
    fn hsetnx(&mut self, key: &str, field: String, value: String) -> CacheResult<bool>;
    fn hget(&mut self, key: &str, field: &str) -> CacheResult<Option<String>>;
    fn hmget(&mut self, key: &str, fields: &[String]) -> CacheResult<Vec<Option<String>>>;
    fn hdel(&mut self, key: &str, fields: &[String]) -> CacheResult<usize>;
    fn hexists(&mut self, key: &str, field: &str) -> CacheResult<bool>;
    fn hlen(&mut self, key: &str) -> CacheResult<usize>;
    fn hstrlen(&mut self, key: &str, field: &str) -> CacheResult<usize>;
    fn hkeys(&mut self, key: &str) -> CacheResult<Vec<String>>;
    fn hvals(&mut self, key: &str) -> CacheResult<Vec<String>>;
    fn hgetall(&mut self, key: &str) -> CacheResult<Vec<String>>;
    fn hincrby(&mut self, key: &str, field: &str, delta: i64) -> CacheResult<i64>;
    fn hincrbyfloat(&mut self, key: &str, field: &str, delta: f64) -> CacheResult<f64>;
    /// `count = None` → one random field (or nil). `Some(n)`, `n >= 0` → up to
    /// `n` distinct fields. `Some(n)`, `n < 0` → exactly `|n|` fields with
    /// replacement. `with_values` interleaves `field, value`.
    fn hrandfield(&mut self, key: &str, count: Option<i64>, with_values: bool) -> CacheResult<Vec<String>>;
    /// Filters the full field sequence by `pattern` first, then paginates
    /// the filtered sequence by `[cursor, cursor+count)`.
    fn hscan(&mut self, key: &str, cursor: usize, pattern: Option<&str>, count: usize) -> CacheResult<(usize, Vec<String>)>;
}

fn hash_mut<'a>(store: &'a mut Store, key: &str) -> CacheResult<Option<&'a mut HashMap<String, String>>> {
    match store.get_mut(key) {
        None => Ok(None),
        Some(entry) => match &mut entry.value {
            ValueKind::Hash(h) => Ok(Some(h)),
            _ => Err(CacheError::WrongType),
        },
    }
}

fn hash_ref<'a>(store: &'a mut Store, key: &str) -> CacheResult<Option<&'a HashMap<String, String>>> {
    match store.get(key) {
        None => Ok(None),
        Some(entry) => match &entry.value {
            ValueKind::Hash(h) => Ok(Some(h)),
            _ => Err(CacheError::WrongType),
        },
    }
}

impl HashOps for Store {
    fn hset(&mut self, key: &str, field: String, value: String) -> CacheResult<usize> {
        if let Some(entry) = self.get(key) {
            if !matches!(entry.value, ValueKind::Hash(_)) {
                return Err(CacheError::WrongType);
            }
        }
        if self.get(key).is_none() {
            self.insert(key.to_string(), Entry::new(ValueKind::Hash(HashMap::new())));
        }
        let hash = hash_mut(self, key)?.expect("hash entry just created");
        let is_new = hash.insert(field, value).is_none();
        Ok(is_new as usize)
    }

    fn hsetnx(&mut self, key: &str, field: String, value: String) -> CacheResult<bool> {
        if let Some(h) = hash_ref(self, key)? {
            if h.contains_key(&field) {
                return Ok(false);
            }
        }
        self.hset(key, field, value)?;
        Ok(true)
    }

    fn hget(&mut self, key: &str, field: &str) -> CacheResult<Option<String>> {
        Ok(hash_ref(self, key)?.and_then(|h| h.get(field).cloned()))
    }

    fn hmget(&mut self, key: &str, fields: &[String]) -> CacheResult<Vec<Option<String>>> {
        let h = hash_ref(self, key)?;
        Ok(fields
            .iter()
            .map(|f| h.and_then(|h| h.get(f).cloned()))
            .collect())
    }

    fn hdel(&mut self, key: &str, fields: &[String]) -> CacheResult<usize> {
        let Some(hash) = hash_mut(self, key)? else { return Ok(0) };
        let mut count = 0;
        for f in fields {
            if hash.remove(f).is_some() {
                count += 1;
            }
        }
        if hash.is_empty() {
            self.remove(key);
        }
        Ok(count)
    }

    fn hexists(&mut self, key: &str, field: &str) -> CacheResult<bool> {
        Ok(hash_ref(self, key)?.map(|h| h.contains_key(field)).unwrap_or(false))
    }

    fn hlen(&mut self, key: &str) -> CacheResult<usize> {
        Ok(hash_ref(self, key)?.map(|h| h.len()).unwrap_or(0))
    }

    fn hstrlen(&mut self, key: &str, field: &str) -> CacheResult<usize> {
        Ok(self.hget(key, field)?.map(|v| v.len()).unwrap_or(0))
    }

    fn hkeys(&mut self, key: &str) -> CacheResult<Vec<String>> {
        Ok(hash_ref(self, key)?.map(|h| h.keys().cloned().collect()).unwrap_or_default())
    }

    fn hvals(&mut self, key: &str) -> CacheResult<Vec<String>> {
        Ok(hash_ref(self, key)?.map(|h| h.values().cloned().collect()).unwrap_or_default())
    }

    fn hgetall(&mut self, key: &str) -> CacheResult<Vec<String>> {
        let Some(h) = hash_ref(self, key)? else { return Ok(Vec::new()) };
        let mut out = Vec::with_capacity(h.len() * 2);
        for (f, v) in h {
            out.push(f.clone());
            out.push(v.clone());
        }
        Ok(out)
    }

    fn hincrby(&mut self, key: &str, field: &str, delta: i64) -> CacheResult<i64> {
        let current = self.hget(key, field)?.unwrap_or_else(|| "0".to_string());
        let n = current.parse::<i64>().map_err(|_| CacheError::HashValueNotInteger)?;
        let new_val = n.checked_add(delta).ok_or(CacheError::Overflow)?;
        self.hset(key, field.to_string(), new_val.to_string())?;
        Ok(new_val)
    }

    fn hincrbyfloat(&mut self, key: &str, field: &str, delta: f64) -> CacheResult<f64> {
        let current = self.hget(key, field)?.unwrap_or_else(|| "0".to_string());
        let n = current.parse::<f64>().map_err(|_| CacheError::HashValueNotFloat)?;
        let new_val = n + delta;
        if !new_val.is_finite() {
            return Err(CacheError::NotFinite);
        }
        self.hset(key, field.to_string(), format!("{}", new_val))?;
        Ok(new_val)
    }

    fn hrandfield(&mut self, key: &str, count: Option<i64>, with_values: bool) -> CacheResult<Vec<String>> {
        let Some(h) = hash_ref(self, key)? else { return Ok(Vec::new()) };
        let fields: Vec<(&String, &String)> = h.iter().collect();
        if fields.is_empty() {
            return Ok(Vec::new());
        }

        let mut rng = rand::thread_rng();
        let mut out = Vec::new();
        match count {
            None => {
                let (f, v) = fields[rng.gen_range(0..fields.len())];
                out.push(f.clone());
                if with_values {
                    out.push(v.clone());
                }
            }
            Some(n) if n >= 0 => {
                let take = (n as usize).min(fields.len());
                let mut shuffled = fields;
                shuffled.shuffle(&mut rng);
                for (f, v) in shuffled.into_iter().take(take) {
                    out.push(f.clone());
                    if with_values {
                        out.push(v.clone());
                    }
                }
            }
            Some(n) => {
                for _ in 0..n.unsigned_abs() {
                    let (f, v) = fields[rng.gen_range(0..fields.len())];
                    out.push(f.clone());
                    if with_values {
                        out.push(v.clone());
                    }
                }
            }
        }
        Ok(out)
    }

    fn hscan(&mut self, key: &str, cursor: usize, pattern: Option<&str>, count: usize) -> CacheResult<(usize, Vec<String>)> {
        let Some(h) = hash_ref(self, key)? else { return Ok((0, Vec::new())) };
        let mut filtered: Vec<(&String, &String)> = h.iter().collect();
        filtered.sort_by(|a, b| a.0.cmp(b.0));
        let filtered: Vec<(&String, &String)> = filtered
            .into_iter()
            .filter(|(f, _)| pattern.map(|p| glob_match(p, f)).unwrap_or(true))
            .collect();

        if cursor >= filtered.len() {
            return Ok((0, Vec::new()));
        }

        let end = (cursor + count).min(filtered.len());
        let next_cursor = if end >= filtered.len() { 0 } else { end };
        let mut out = Vec::new();
        for (f, v) in &filtered[cursor..end] {
            out.push((*f).clone());
            out.push((*v).clone());
        }
        Ok((next_cursor, out))
    }
}
