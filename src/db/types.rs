//! Value kinds stored in the keyspace.
//!
//! embercache is a typed cache: every key holds exactly one of `ValueKind`.
//! An operation whose receiver key holds the wrong kind returns
//! [`crate::error::CacheError::WrongType`] rather than coercing.

use std::collections::HashMap;
use std::time::Instant;

use super::skiplist::SkipList;

/// The three value kinds embercache keys can hold.
#[derive(Debug, Clone)]
pub enum ValueKind {
    String(String),
    Hash(HashMap<String, String>),
    SortedSet(SortedSetValue),
}

impl ValueKind {
    /// Name used by the `TYPE` command and in `WRONGTYPE` diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            ValueKind::String(_) => "string",
            ValueKind::Hash(_) => "hash",
            ValueKind::SortedSet(_) => "zset",
        }
    }
}

/// A keyspace slot: a value plus its optional expiry.
///
/// `expires_at` is a monotonic deadline (`Instant`), not a wall-clock
/// timestamp — set once when a TTL is applied, never reinterpreted against
/// `SystemTime`, so a system clock step can't resurrect or kill a key early.
#[derive(Debug, Clone)]
pub struct Entry {
    pub value: ValueKind,
    pub expires_at: Option<Instant>,
}

impl Entry {
    pub fn new(value: ValueKind) -> Self {
        Entry { value, expires_at: None }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(deadline) if deadline <= now)
    }
}

/// Sorted-set value: a `member -> score` map plus a skip list keeping
/// `(score, member)` pairs ordered for O(log n) rank and ranged reads.
#[derive(Debug, Clone, Default)]
pub struct SortedSetValue {
    members: HashMap<String, f64>,
    order: SkipList,
}

impl SortedSetValue {
    pub fn new() -> Self {
        SortedSetValue { members: HashMap::new(), order: SkipList::new() }
    }

    /// Insert or update `member`'s score. Returns `true` if `member` is new.
    pub fn insert(&mut self, member: String, score: f64) -> bool {
        if let Some(&old_score) = self.members.get(&member) {
            if old_score == score {
                return false;
            }
            self.order.remove(&member, old_score);
            self.order.insert(member.clone(), score);
            self.members.insert(member, score);
            false
        } else {
            self.order.insert(member.clone(), score);
            self.members.insert(member, score);
            true
        }
    }

    pub fn remove(&mut self, member: &str) -> bool {
        match self.members.remove(member) {
            Some(score) => {
                self.order.remove(member, score);
                true
            }
            None => false,
        }
    }

    pub fn score(&self, member: &str) -> Option<f64> {
        self.members.get(member).copied()
    }

    pub fn rank(&self, member: &str) -> Option<usize> {
        let score = *self.members.get(member)?;
        self.order.rank(member, score)
    }

    pub fn revrank(&self, member: &str) -> Option<usize> {
        let rank = self.rank(member)?;
        Some(self.order.len() - 1 - rank)
    }

    /// Members in rank order `[start, stop]`, Redis-style negative indices
    /// normalized against the current length.
    pub fn range(&self, start: i64, stop: i64) -> Vec<(String, f64)> {
        let len = self.order.len() as i64;
        if len == 0 {
            return Vec::new();
        }
        let start = if start < 0 { (len + start).max(0) } else { start.min(len) };
        let stop = if stop < 0 { (len + stop).max(0) } else { stop.min(len - 1) };
        if start > stop || start >= len {
            return Vec::new();
        }
        self.order
            .range(start as usize, stop as usize)
            .into_iter()
            .map(|(m, s)| (m.to_string(), s))
            .collect()
    }

    /// Members with `min <= score <= max` (bounds already resolved from the
    /// `(`-exclusive / `-inf`/`+inf` grammar by the caller), in score order.
    pub fn range_by_score(&self, min: f64, max: f64, min_exclusive: bool, max_exclusive: bool) -> Vec<(String, f64)> {
        self.order
            .iter()
            .filter(|(_, s)| {
                let above_min = if min_exclusive { *s > min } else { *s >= min };
                let below_max = if max_exclusive { *s < max } else { *s <= max };
                above_min && below_max
            })
            .map(|(m, s)| (m.to_string(), s))
            .collect()
    }

    pub fn count(&self, min: f64, max: f64, min_exclusive: bool, max_exclusive: bool) -> usize {
        self.range_by_score(min, max, min_exclusive, max_exclusive).len()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.order.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_reports_new_vs_updated() {
        let mut z = SortedSetValue::new();
        assert!(z.insert("a".to_string(), 1.0));
        assert!(!z.insert("a".to_string(), 2.0));
        assert_eq!(z.score("a"), Some(2.0));
    }

    #[test]
    fn range_normalizes_negative_indices() {
        let mut z = SortedSetValue::new();
        for (m, s) in [("a", 1.0), ("b", 2.0), ("c", 3.0)] {
            z.insert(m.to_string(), s);
        }
        assert_eq!(
            z.range(-2, -1),
            vec![("b".to_string(), 2.0), ("c".to_string(), 3.0)]
        );
    }

    #[test]
    fn range_by_score_respects_exclusivity() {
        let mut z = SortedSetValue::new();
        for (m, s) in [("a", 1.0), ("b", 2.0), ("c", 3.0)] {
            z.insert(m.to_string(), s);
        }
        let inclusive = z.range_by_score(1.0, 3.0, false, false);
        assert_eq!(inclusive.len(), 3);
        let exclusive = z.range_by_score(1.0, 3.0, true, true);
        assert_eq!(exclusive, vec![("b".to_string(), 2.0)]);
    }

    #[test]
    fn remove_drops_from_both_member_map_and_order() {
        let mut z = SortedSetValue::new();
        z.insert("a".to_string(), 1.0);
        assert!(z.remove("a"));
        assert!(!z.remove("a"));
        assert!(z.is_empty());
    }
}
