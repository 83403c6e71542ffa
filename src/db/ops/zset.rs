//! Sorted-set value operations: score-indexed ordered member collection.

use crate::db::core::Store;
use crate::db::types::{Entry, SortedSetValue, ValueKind};
use crate::error::{CacheError, CacheResult};

/// Mutually-exclusive gating flags accepted by `ZADD`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZaddFlags {
    pub nx: bool,
    pub xx: bool,
    pub gt: bool,
    pub lt: bool,
    pub ch: bool,
}

/// A parsed score-range boundary (`-inf`, `+inf`, `(3.0`, or `3.0`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBound {
    pub value: f64,
    pub exclusive: bool,
}

/// Parses the shared ZCOUNT/ZRANGEBYSCORE/ZREVRANGEBYSCORE boundary grammar.
pub fn parse_score_bound(raw: &str) -> CacheResult<ScoreBound> {
    match raw {
        "-inf" => Ok(ScoreBound { value: f64::NEG_INFINITY, exclusive: false }),
        "+inf" => Ok(ScoreBound { value: f64::INFINITY, exclusive: false }),
        s if s.starts_with('(') => {
            let n: f64 = s[1..].parse().map_err(|_| CacheError::NotAFloat)?;
            Ok(ScoreBound { value: n, exclusive: true })
        }
        s => {
            let n: f64 = s.parse().map_err(|_| CacheError::NotAFloat)?;
            Ok(ScoreBound { value: n, exclusive: false })
        }
    }
}

/// `+inf`/`-inf` for infinities; no decimal point if the score is
/// integer-valued; otherwise the shortest round-trippable decimal (Rust's
/// default `f64` `Display`, an idiomatic equivalent of `%.17g`).
pub fn format_score(score: f64) -> String {
    if score == f64::INFINITY {
        "+inf".to_string()
    } else if score == f64::NEG_INFINITY {
        "-inf".to_string()
    } else if score == score.trunc() && score.abs() < 1e17 {
        format!("{}", score as i64)
    } else {
        format!("{}", score)
    }
}

pub trait ZSetOps {
    /// Applies `flags` to each `(member, score)` pair in order. Returns the
    /// count of members *added*, or *changed* (added or re-scored) if `CH`.
    fn zadd(&mut self, key: &str, flags: ZaddFlags, members: Vec<(String, f64)>) -> CacheResult<usize>;
    fn zrem(&mut self, key: &str, members: &[String]) -> CacheResult<usize>;
    fn zincrby(&mut self, key: &str, delta: f64, member: String) -> CacheResult<f64>;
    fn zscore(&mut self, key: &str, member: &str) -> CacheResult<Option<f64>>;
    fn zrank(&mut self, key: &str, member: &str) -> CacheResult<Option<usize>>;
    fn zrevrank(&mut self, key: &str, member: &str) -> CacheResult<Option<usize>>;
    fn zcard(&mut self, key: &str) -> CacheResult<usize>;
    fn zcount(&mut self, key: &str, min: ScoreBound, max: ScoreBound) -> CacheResult<usize>;
    fn zrange(&mut self, key: &str, start: i64, stop: i64, reverse: bool) -> CacheResult<Vec<(String, f64)>>;
    fn zrangebyscore(
        &mut self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
        reverse: bool,
        offset: usize,
        count: Option<usize>,
    ) -> CacheResult<Vec<(String, f64)>>;
}

fn zset_mut<'a>(store: &'a mut Store, key: &str) -> CacheResult<Option<&'a mut SortedSetValue>> {
    match store.get_mut(key) {
        None => Ok(None),
        Some(entry) => match &mut entry.value {
            ValueKind::SortedSet(z) => Ok(Some(z)),
            _ => Err(CacheError::WrongType),
        },
    }
}

fn zset_ref<'a>(store: &'a mut Store, key: &str) -> CacheResult<Option<&'a SortedSetValue>> {
    match store.get(key) {
        None => Ok(None),
        Some(entry) => match &entry.value {
            ValueKind::SortedSet(z) => Ok(Some(z)),
            _ => Err(CacheError::WrongType),
        },
    }
}

impl ZSetOps for Store {
    fn zadd(&mut self, key: &str, flags: ZaddFlags, members: Vec<(String, f64)>) -> CacheResult<usize> {
        if flags.nx && flags.xx {
            return Err(CacheError::SyntaxError);
        }

        if let Some(entry) = self.get(key) {
            if !matches!(entry.value, ValueKind::SortedSet(_)) {
                return Err(CacheError::WrongType);
            }
        } else if !flags.xx {
            self.insert(key.to_string(), Entry::new(ValueKind::SortedSet(SortedSetValue::new())));
        }

        let Some(zset) = zset_mut(self, key)? else { return Ok(0) };

        let mut count = 0;
        for (member, score) in members {
            let existing = zset.score(&member);
            let is_new = existing.is_none();

            if flags.nx && !is_new {
                continue;
            }
            if flags.xx && is_new {
                continue;
            }
            if let Some(old) = existing {
                if flags.gt && score <= old {
                    continue;
                }
                if flags.lt && score >= old {
                    continue;
                }
            }

            let changed = is_new || existing != Some(score);
            if changed {
                zset.insert(member, score);
                if is_new || flags.ch {
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    fn zrem(&mut self, key: &str, members: &[String]) -> CacheResult<usize> {
        let Some(zset) = zset_mut(self, key)? else { return Ok(0) };
        let mut removed = 0;
        for m in members {
            if zset.remove(m) {
                removed += 1;
            }
        }
        if zset.is_empty() {
            self.remove(key);
        }
        Ok(removed)
    }

    fn zincrby(&mut self, key: &str, delta: f64, member: String) -> CacheResult<f64> {
        let current = self.zscore(key, &member)?.unwrap_or(0.0);
        let new_score = current + delta;
        if new_score.is_nan() {
            return Err(CacheError::NotFinite);
        }
        self.zadd(key, ZaddFlags::default(), vec![(member, new_score)])?;
        Ok(new_score)
    }

    fn zscore(&mut self, key: &str, member: &str) -> CacheResult<Option<f64>> {
        Ok(zset_ref(self, key)?.and_then(|z| z.score(member)))
    }

    fn zrank(&mut self, key: &str, member: &str) -> CacheResult<Option<usize>> {
        Ok(zset_ref(self, key)?.and_then(|z| z.rank(member)))
    }

    fn zrevrank(&mut self, key: &str, member: &str) -> CacheResult<Option<usize>> {
        Ok(zset_ref(self, key)?.and_then(|z| z.revrank(member)))
    }

    fn zcard(&mut self, key: &str) -> CacheResult<usize> {
        Ok(zset_ref(self, key)?.map(|z| z.len()).unwrap_or(0))
    }

    fn zcount(&mut self, key: &str, min: ScoreBound, max: ScoreBound) -> CacheResult<usize> {
        Ok(zset_ref(self, key)?
            .map(|z| z.count(min.value, max.value, min.exclusive, max.exclusive))
            .unwrap_or(0))
    }

    fn zrange(&mut self, key: &str, start: i64, stop: i64, reverse: bool) -> CacheResult<Vec<(String, f64)>> {
        let Some(z) = zset_ref(self, key)? else { return Ok(Vec::new()) };
        let mut result = z.range(start, stop);
        if reverse {
            result.reverse();
        }
        Ok(result)
    }

    fn zrangebyscore(
        &mut self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
        reverse: bool,
        offset: usize,
        count: Option<usize>,
    ) -> CacheResult<Vec<(String, f64)>> {
        let Some(z) = zset_ref(self, key)? else { return Ok(Vec::new()) };
        let mut result = z.range_by_score(min.value, max.value, min.exclusive, max.exclusive);
        if reverse {
            result.reverse();
        }
        let result = if offset < result.len() { result[offset..].to_vec() } else { Vec::new() };
        Ok(match count {
            Some(n) => result.into_iter().take(n).collect(),
            None => result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ops::generic::GenericOps;

    fn flags() -> ZaddFlags {
        ZaddFlags::default()
    }

    #[test]
    fn zadd_idempotent_on_repeat_pair() {
        let mut store = Store::new();
        assert_eq!(store.zadd("s", flags(), vec![("a".to_string(), 1.0)]).unwrap(), 1);
        assert_eq!(store.zadd("s", flags(), vec![("a".to_string(), 1.0)]).unwrap(), 0);
    }

    #[test]
    fn zadd_gt_gating_respects_ch() {
        let mut store = Store::new();
        assert_eq!(store.zadd("s", flags(), vec![("m".to_string(), 5.0)]).unwrap(), 1);

        let gt = ZaddFlags { gt: true, ..Default::default() };
        assert_eq!(store.zadd("s", gt, vec![("m".to_string(), 3.0)]).unwrap(), 0);
        assert_eq!(store.zscore("s", "m").unwrap(), Some(5.0));

        assert_eq!(store.zadd("s", gt, vec![("m".to_string(), 9.0)]).unwrap(), 0);
        assert_eq!(store.zscore("s", "m").unwrap(), Some(9.0));

        let gt_ch = ZaddFlags { gt: true, ch: true, ..Default::default() };
        assert_eq!(store.zadd("s", gt_ch, vec![("m".to_string(), 20.0)]).unwrap(), 1);
    }

    #[test]
    fn zadd_rejects_nx_and_xx_together() {
        let mut store = Store::new();
        let nx_xx = ZaddFlags { nx: true, xx: true, ..Default::default() };
        assert_eq!(store.zadd("s", nx_xx, vec![("m".to_string(), 1.0)]), Err(CacheError::SyntaxError));
        assert!(!store.exists("s"));
    }

    #[test]
    fn zrangebyscore_withscores_scenario() {
        let mut store = Store::new();
        store
            .zadd(
                "s",
                flags(),
                vec![("a".to_string(), 1.0), ("b".to_string(), 2.0), ("c".to_string(), 3.0)],
            )
            .unwrap();

        let min = parse_score_bound("1").unwrap();
        let max = parse_score_bound("2").unwrap();
        let result = store.zrangebyscore("s", min, max, false, 0, None).unwrap();
        assert_eq!(result, vec![("a".to_string(), 1.0), ("b".to_string(), 2.0)]);
    }

    #[test]
    fn zrem_deletes_key_once_empty() {
        let mut store = Store::new();
        store.zadd("s", flags(), vec![("a".to_string(), 1.0)]).unwrap();
        assert_eq!(store.zrem("s", &["a".to_string()]).unwrap(), 1);
        assert_eq!(store.zcard("s").unwrap(), 0);
        assert_eq!(store.zscore("s", "a").unwrap(), None);
    }

    #[test]
    fn score_bound_grammar() {
        assert_eq!(parse_score_bound("-inf").unwrap(), ScoreBound { value: f64::NEG_INFINITY, exclusive: false });
        assert_eq!(parse_score_bound("(3").unwrap(), ScoreBound { value: 3.0, exclusive: true });
        assert!(parse_score_bound("abc").is_err());
    }

    #[test]
    fn score_formatting_drops_decimal_for_integers() {
        assert_eq!(format_score(3.0), "3");
        assert_eq!(format_score(3.5), "3.5");
        assert_eq!(format_score(f64::INFINITY), "+inf");
    }
}
