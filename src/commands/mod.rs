//! Command dispatcher: registry of uppercased command names, arity/shape
//! validation ahead of any lock acquisition, and the single place a
//! [`CacheError`] becomes a RESP `Error` frame.

use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::db::ops::generic::GenericOps;
use crate::db::ops::hash::HashOps;
use crate::db::ops::string::StringOps;
use crate::db::ops::zset::{parse_score_bound, format_score, ZSetOps, ZaddFlags};
use crate::db::core::Store;
use crate::error::{CacheError, CacheResult};
use crate::network::resp::RespValue;
use crate::observability::metrics::{METRIC_COMMANDS_TOTAL, METRIC_COMMAND_LATENCY};

/// Records a command's latency histogram on drop, whichever branch returns.
struct LatencyGuard {
    start: Instant,
    command: String,
}

impl Drop for LatencyGuard {
    fn drop(&mut self) {
        histogram!(METRIC_COMMAND_LATENCY, "command" => self.command.clone())
            .record(self.start.elapsed().as_secs_f64());
    }
}

/// Shared server state: one keyspace behind one process-wide lock.
///
/// Every command takes `.write().await`, including pure reads: lazy TTL
/// eviction in `Store::get`/`get_mut` can remove an expired entry as a
/// side effect of looking it up, so even a read needs exclusive access.
/// Reads therefore serialize behind each other, not just behind writes.
pub struct Engine {
    store: RwLock<Store>,
}

impl Engine {
    pub fn new() -> Self {
        Engine { store: RwLock::new(Store::new()) }
    }

    /// Top-level entry point: one parsed RESP frame in, one RESP frame out.
    /// Non-`Array` frames are answered inline without touching the store —
    /// the connection stays open and keeps processing the buffer.
    #[instrument(skip(self, request))]
    pub async fn dispatch(&self, request: RespValue) -> RespValue {
        match request {
            RespValue::Array(Some(tokens)) => self.dispatch_array(tokens).await,
            _ => err(CacheError::ExpectedArray),
        }
    }

    async fn dispatch_array(&self, tokens: Vec<RespValue>) -> RespValue {
        if tokens.is_empty() {
            return err(CacheError::EmptyCommand);
        }

        let cmd_name = match &tokens[0] {
            RespValue::BulkString(Some(s)) => s.clone(),
            RespValue::SimpleString(s) => s.clone(),
            _ => return err(CacheError::EmptyCommand),
        };

        // Nil BulkString argv entries are dropped before dispatch (documented
        // lenient behavior; see DESIGN.md).
        let args: Vec<String> = tokens
            .iter()
            .skip(1)
            .filter_map(|t| match t {
                RespValue::BulkString(Some(s)) => Some(s.clone()),
                _ => None,
            })
            .collect();

        let cmd = cmd_name.to_uppercase();
        info!(command = %cmd, "dispatching command");
        counter!(METRIC_COMMANDS_TOTAL, "command" => cmd.clone()).increment(1);
        let _latency = LatencyGuard { start: Instant::now(), command: cmd.clone() };

        match cmd.as_str() {
            "PING" => RespValue::SimpleString("PONG".to_string()),
            "GET" => self.cmd_get(&args).await,
            "SET" => self.cmd_set(&args).await,
            "DEL" => self.cmd_del(&args).await,
            "EXISTS" => self.cmd_exists(&args).await,
            "KEYS" => self.cmd_keys(&args).await,
            "TTL" => self.cmd_ttl(&args).await,
            "INCR" => self.cmd_incr(&args).await,
            "EXPIRE" => self.cmd_expire(&args).await,
            "TYPE" => self.cmd_type(&args).await,

            "HSET" => self.cmd_hset(&args).await,
            "HMSET" => self.cmd_hmset(&args).await,
            "HSETNX" => self.cmd_hsetnx(&args).await,
            "HGET" => self.cmd_hget(&args).await,
            "HMGET" => self.cmd_hmget(&args).await,
            "HDEL" => self.cmd_hdel(&args).await,
            "HEXISTS" => self.cmd_hexists(&args).await,
            "HLEN" => self.cmd_hlen(&args).await,
            "HSTRLEN" => self.cmd_hstrlen(&args).await,
            "HKEYS" => self.cmd_hkeys(&args).await,
            "HVALS" => self.cmd_hvals(&args).await,
            "HGETALL" => self.cmd_hgetall(&args).await,
            "HINCRBY" => self.cmd_hincrby(&args).await,
            "HINCRBYFLOAT" => self.cmd_hincrbyfloat(&args).await,
            "HRANDFIELD" => self.cmd_hrandfield(&args).await,
            "HSCAN" => self.cmd_hscan(&args).await,

            "ZADD" => self.cmd_zadd(&args).await,
            "ZREM" => self.cmd_zrem(&args).await,
            "ZINCRBY" => self.cmd_zincrby(&args).await,
            "ZSCORE" => self.cmd_zscore(&args).await,
            "ZRANK" => self.cmd_zrank(&args).await,
            "ZREVRANK" => self.cmd_zrevrank(&args).await,
            "ZCARD" => self.cmd_zcard(&args).await,
            "ZCOUNT" => self.cmd_zcount(&args).await,
            "ZRANGEBYSCORE" => self.cmd_zrangebyscore(&args, false).await,
            "ZREVRANGEBYSCORE" => self.cmd_zrangebyscore(&args, true).await,
            "ZRANGE" => self.cmd_zrange(&args, false).await,
            "ZREVRANGE" => self.cmd_zrange(&args, true).await,

            _ => err(CacheError::UnknownCommand(cmd_name)),
        }
    }

    // ---- string / generic --------------------------------------------

    async fn cmd_get(&self, args: &[String]) -> RespValue {
        let Some(key) = arity(args, 1, "GET") else { return err(CacheError::WrongArity("GET".into())) };
        let mut store = self.store.write().await;
        to_resp(StringOps::get(&mut *store, &key[0]).map(RespValue::from_bulk_opt))
    }

    async fn cmd_set(&self, args: &[String]) -> RespValue {
        if args.len() < 2 {
            return err(CacheError::WrongArity("SET".into()));
        }
        let key = args[0].clone();
        let value = args[1].clone();

        let ttl = match parse_set_ttl(&args[2..]) {
            Ok(ttl) => ttl,
            Err(e) => return err(e),
        };

        let mut store = self.store.write().await;
        StringOps::set(&mut *store, key, value, ttl);
        RespValue::SimpleString("OK".to_string())
    }

    async fn cmd_del(&self, args: &[String]) -> RespValue {
        if args.is_empty() {
            return err(CacheError::WrongArity("DEL".into()));
        }
        let mut store = self.store.write().await;
        let count = args.iter().filter(|k| store.del(k)).count();
        RespValue::Integer(count as i64)
    }

    async fn cmd_exists(&self, args: &[String]) -> RespValue {
        if args.is_empty() {
            return err(CacheError::WrongArity("EXISTS".into()));
        }
        let mut store = self.store.write().await;
        let count = args.iter().filter(|k| store.exists(k)).count();
        RespValue::Integer(count as i64)
    }

    async fn cmd_keys(&self, args: &[String]) -> RespValue {
        let Some(key) = arity(args, 1, "KEYS") else { return err(CacheError::WrongArity("KEYS".into())) };
        let mut store = self.store.write().await;
        let keys = store.keys(&key[0]);
        RespValue::Array(Some(keys.into_iter().map(|k| RespValue::BulkString(Some(k))).collect()))
    }

    async fn cmd_ttl(&self, args: &[String]) -> RespValue {
        let Some(key) = arity(args, 1, "TTL") else { return err(CacheError::WrongArity("TTL".into())) };
        let mut store = self.store.write().await;
        RespValue::Integer(store.ttl(&key[0]))
    }

    async fn cmd_incr(&self, args: &[String]) -> RespValue {
        let Some(key) = arity(args, 1, "INCR") else { return err(CacheError::WrongArity("INCR".into())) };
        let mut store = self.store.write().await;
        to_resp(store.incrby(&key[0], 1).map(RespValue::Integer))
    }

    async fn cmd_expire(&self, args: &[String]) -> RespValue {
        if args.len() != 2 {
            return err(CacheError::WrongArity("EXPIRE".into()));
        }
        let seconds = match args[1].parse::<u64>() {
            Ok(n) => n,
            Err(_) => return err(CacheError::NotAnInteger),
        };
        let mut store = self.store.write().await;
        RespValue::Integer(store.expire(&args[0], seconds) as i64)
    }

    async fn cmd_type(&self, args: &[String]) -> RespValue {
        let Some(key) = arity(args, 1, "TYPE") else { return err(CacheError::WrongArity("TYPE".into())) };
        let mut store = self.store.write().await;
        RespValue::SimpleString(store.type_of(&key[0]).unwrap_or("none").to_string())
    }

    // ---- hash -----------------------------------------------------------

    async fn cmd_hset(&self, args: &[String]) -> RespValue {
        if args.len() < 3 || (args.len() - 1) % 2 != 0 {
            return err(CacheError::WrongArity("HSET".into()));
        }
        let mut store = self.store.write().await;
        let mut added = 0usize;
        for pair in args[1..].chunks(2) {
            match store.hset(&args[0], pair[0].clone(), pair[1].clone()) {
                Ok(n) => added += n,
                Err(e) => return err(e),
            }
        }
        RespValue::Integer(added as i64)
    }

    async fn cmd_hmset(&self, args: &[String]) -> RespValue {
        if args.len() < 3 || (args.len() - 1) % 2 != 0 {
            return err(CacheError::WrongArity("HMSET".into()));
        }
        let mut store = self.store.write().await;
        for pair in args[1..].chunks(2) {
            if let Err(e) = store.hset(&args[0], pair[0].clone(), pair[1].clone()) {
                return err(e);
            }
        }
        RespValue::SimpleString("OK".to_string())
    }

    async fn cmd_hsetnx(&self, args: &[String]) -> RespValue {
        if args.len() != 3 {
            return err(CacheError::WrongArity("HSETNX".into()));
        }
        let mut store = self.store.write().await;
        to_resp(store.hsetnx(&args[0], args[1].clone(), args[2].clone()).map(|b| RespValue::Integer(b as i64)))
    }

    async fn cmd_hget(&self, args: &[String]) -> RespValue {
        if args.len() != 2 {
            return err(CacheError::WrongArity("HGET".into()));
        }
        let mut store = self.store.write().await;
        to_resp(store.hget(&args[0], &args[1]).map(RespValue::from_bulk_opt))
    }

    async fn cmd_hmget(&self, args: &[String]) -> RespValue {
        if args.len() < 2 {
            return err(CacheError::WrongArity("HMGET".into()));
        }
        let mut store = self.store.write().await;
        to_resp(store.hmget(&args[0], &args[1..]).map(|vals| {
            RespValue::Array(Some(vals.into_iter().map(RespValue::from_bulk_opt).collect()))
        }))
    }

    async fn cmd_hdel(&self, args: &[String]) -> RespValue {
        if args.len() < 2 {
            return err(CacheError::WrongArity("HDEL".into()));
        }
        let mut store = self.store.write().await;
        to_resp(store.hdel(&args[0], &args[1..]).map(|n| RespValue::Integer(n as i64)))
    }

    async fn cmd_hexists(&self, args: &[String]) -> RespValue {
        if args.len() != 2 {
            return err(CacheError::WrongArity("HEXISTS".into()));
        }
        let mut store = self.store.write().await;
        to_resp(store.hexists(&args[0], &args[1]).map(|b| RespValue::Integer(b as i64)))
    }

    async fn cmd_hlen(&self, args: &[String]) -> RespValue {
        let Some(key) = arity(args, 1, "HLEN") else { return err(CacheError::WrongArity("HLEN".into())) };
        let mut store = self.store.write().await;
        to_resp(store.hlen(&key[0]).map(|n| RespValue::Integer(n as i64)))
    }

    async fn cmd_hstrlen(&self, args: &[String]) -> RespValue {
        if args.len() != 2 {
            return err(CacheError::WrongArity("HSTRLEN".into()));
        }
        let mut store = self.store.write().await;
        to_resp(store.hstrlen(&args[0], &args[1]).map(|n| RespValue::Integer(n as i64)))
    }

    async fn cmd_hkeys(&self, args: &[String]) -> RespValue {
        let Some(key) = arity(args, 1, "HKEYS") else { return err(CacheError::WrongArity("HKEYS".into())) };
        let mut store = self.store.write().await;
        to_resp(store.hkeys(&key[0]).map(resp_string_array))
    }

    async fn cmd_hvals(&self, args: &[String]) -> RespValue {
        let Some(key) = arity(args, 1, "HVALS") else { return err(CacheError::WrongArity("HVALS".into())) };
        let mut store = self.store.write().await;
        to_resp(store.hvals(&key[0]).map(resp_string_array))
    }

    async fn cmd_hgetall(&self, args: &[String]) -> RespValue {
        let Some(key) = arity(args, 1, "HGETALL") else { return err(CacheError::WrongArity("HGETALL".into())) };
        let mut store = self.store.write().await;
        to_resp(store.hgetall(&key[0]).map(resp_string_array))
    }

    async fn cmd_hincrby(&self, args: &[String]) -> RespValue {
        if args.len() != 3 {
            return err(CacheError::WrongArity("HINCRBY".into()));
        }
        let delta = match args[2].parse::<i64>() {
            Ok(n) => n,
            Err(_) => return err(CacheError::NotAnInteger),
        };
        let mut store = self.store.write().await;
        to_resp(store.hincrby(&args[0], &args[1], delta).map(RespValue::Integer))
    }

    async fn cmd_hincrbyfloat(&self, args: &[String]) -> RespValue {
        if args.len() != 3 {
            return err(CacheError::WrongArity("HINCRBYFLOAT".into()));
        }
        let delta = match args[2].parse::<f64>() {
            Ok(n) => n,
            Err(_) => return err(CacheError::NotAFloat),
        };
        let mut store = self.store.write().await;
        to_resp(store.hincrbyfloat(&args[0], &args[1], delta).map(|v| RespValue::BulkString(Some(format_score(v)))))
    }

    async fn cmd_hrandfield(&self, args: &[String]) -> RespValue {
        if args.is_empty() || args.len() > 3 {
            return err(CacheError::WrongArity("HRANDFIELD".into()));
        }
        let count = match args.get(1) {
            None => None,
            Some(s) => match s.parse::<i64>() {
                Ok(n) => Some(n),
                Err(_) => return err(CacheError::NotAnInteger),
            },
        };
        let with_values = match args.get(2) {
            None => false,
            Some(s) if s.eq_ignore_ascii_case("WITHVALUES") => true,
            Some(tok) => return err(CacheError::SyntaxErrorNear(tok.clone())),
        };
        if with_values && count.is_none() {
            return err(CacheError::SyntaxError);
        }

        let mut store = self.store.write().await;
        match store.hrandfield(&args[0], count, with_values) {
            Ok(fields) if count.is_none() => {
                RespValue::BulkString(fields.into_iter().next())
            }
            Ok(fields) => RespValue::Array(Some(fields.into_iter().map(|f| RespValue::BulkString(Some(f))).collect())),
            Err(e) => err(e),
        }
    }

    async fn cmd_hscan(&self, args: &[String]) -> RespValue {
        if args.len() < 2 {
            return err(CacheError::WrongArity("HSCAN".into()));
        }
        let cursor: usize = match args[1].parse() {
            Ok(n) => n,
            Err(_) => return err(CacheError::NotAnInteger),
        };

        let mut pattern: Option<String> = None;
        let mut count: usize = 10;
        let mut i = 2;
        while i < args.len() {
            match args[i].to_uppercase().as_str() {
                "MATCH" if i + 1 < args.len() => {
                    pattern = Some(args[i + 1].clone());
                    i += 2;
                }
                "COUNT" if i + 1 < args.len() => {
                    count = match args[i + 1].parse() {
                        Ok(n) => n,
                        Err(_) => return err(CacheError::NotAnInteger),
                    };
                    i += 2;
                }
                _ => return err(CacheError::SyntaxErrorNear(args[i].clone())),
            }
        }

        let mut store = self.store.write().await;
        match store.hscan(&args[0], cursor, pattern.as_deref(), count) {
            Ok((next, flat)) => RespValue::Array(Some(vec![
                RespValue::BulkString(Some(next.to_string())),
                resp_string_array(flat),
            ])),
            Err(e) => err(e),
        }
    }

    // ---- sorted set -------------------------------------------------------

    async fn cmd_zadd(&self, args: &[String]) -> RespValue {
        if args.len() < 3 {
            return err(CacheError::WrongArity("ZADD".into()));
        }
        let mut flags = ZaddFlags::default();
        let mut i = 1;
        loop {
            match args.get(i).map(|s| s.to_uppercase()) {
                Some(ref t) if t == "NX" => { flags.nx = true; i += 1; }
                Some(ref t) if t == "XX" => { flags.xx = true; i += 1; }
                Some(ref t) if t == "GT" => { flags.gt = true; i += 1; }
                Some(ref t) if t == "LT" => { flags.lt = true; i += 1; }
                Some(ref t) if t == "CH" => { flags.ch = true; i += 1; }
                _ => break,
            }
        }
        if (flags.nx && (flags.gt || flags.lt)) || (flags.gt && flags.lt) || (flags.nx && flags.xx) {
            return err(CacheError::SyntaxError);
        }

        let rest = &args[i..];
        if rest.is_empty() || rest.len() % 2 != 0 {
            return err(CacheError::WrongArity("ZADD".into()));
        }
        let mut members = Vec::with_capacity(rest.len() / 2);
        for pair in rest.chunks(2) {
            let score = match pair[0].parse::<f64>() {
                Ok(n) => n,
                Err(_) => return err(CacheError::NotAFloat),
            };
            members.push((pair[1].clone(), score));
        }

        let mut store = self.store.write().await;
        to_resp(store.zadd(&args[0], flags, members).map(|n| RespValue::Integer(n as i64)))
    }

    async fn cmd_zrem(&self, args: &[String]) -> RespValue {
        if args.len() < 2 {
            return err(CacheError::WrongArity("ZREM".into()));
        }
        let mut store = self.store.write().await;
        to_resp(store.zrem(&args[0], &args[1..]).map(|n| RespValue::Integer(n as i64)))
    }

    async fn cmd_zincrby(&self, args: &[String]) -> RespValue {
        if args.len() != 3 {
            return err(CacheError::WrongArity("ZINCRBY".into()));
        }
        let delta = match args[1].parse::<f64>() {
            Ok(n) => n,
            Err(_) => return err(CacheError::NotAFloat),
        };
        let mut store = self.store.write().await;
        to_resp(store.zincrby(&args[0], delta, args[2].clone()).map(|v| RespValue::BulkString(Some(format_score(v)))))
    }

    async fn cmd_zscore(&self, args: &[String]) -> RespValue {
        if args.len() != 2 {
            return err(CacheError::WrongArity("ZSCORE".into()));
        }
        let mut store = self.store.write().await;
        to_resp(store.zscore(&args[0], &args[1]).map(|opt| RespValue::BulkString(opt.map(format_score))))
    }

    async fn cmd_zrank(&self, args: &[String]) -> RespValue {
        if args.len() != 2 {
            return err(CacheError::WrongArity("ZRANK".into()));
        }
        let mut store = self.store.write().await;
        to_resp(store.zrank(&args[0], &args[1]).map(resp_int_opt))
    }

    async fn cmd_zrevrank(&self, args: &[String]) -> RespValue {
        if args.len() != 2 {
            return err(CacheError::WrongArity("ZREVRANK".into()));
        }
        let mut store = self.store.write().await;
        to_resp(store.zrevrank(&args[0], &args[1]).map(resp_int_opt))
    }

    async fn cmd_zcard(&self, args: &[String]) -> RespValue {
        let Some(key) = arity(args, 1, "ZCARD") else { return err(CacheError::WrongArity("ZCARD".into())) };
        let mut store = self.store.write().await;
        to_resp(store.zcard(&key[0]).map(|n| RespValue::Integer(n as i64)))
    }

    async fn cmd_zcount(&self, args: &[String]) -> RespValue {
        if args.len() != 3 {
            return err(CacheError::WrongArity("ZCOUNT".into()));
        }
        let min = match parse_score_bound(&args[1]) { Ok(b) => b, Err(e) => return err(e) };
        let max = match parse_score_bound(&args[2]) { Ok(b) => b, Err(e) => return err(e) };
        let mut store = self.store.write().await;
        to_resp(store.zcount(&args[0], min, max).map(|n| RespValue::Integer(n as i64)))
    }

    async fn cmd_zrangebyscore(&self, args: &[String], is_rev: bool) -> RespValue {
        if args.len() < 3 {
            return err(CacheError::WrongArity("ZRANGEBYSCORE".into()));
        }
        // ZREVRANGEBYSCORE passes max then min on the wire; normalize to (min, max).
        let (min_tok, max_tok) = if is_rev { (&args[2], &args[1]) } else { (&args[1], &args[2]) };
        let min = match parse_score_bound(min_tok) { Ok(b) => b, Err(e) => return err(e) };
        let max = match parse_score_bound(max_tok) { Ok(b) => b, Err(e) => return err(e) };

        let mut withscores = false;
        let mut offset = 0usize;
        let mut count: Option<usize> = None;
        let mut i = 3;
        while i < args.len() {
            match args[i].to_uppercase().as_str() {
                "WITHSCORES" => { withscores = true; i += 1; }
                "LIMIT" if i + 2 < args.len() => {
                    offset = match args[i + 1].parse() { Ok(n) => n, Err(_) => return err(CacheError::NotAnInteger) };
                    count = match args[i + 2].parse::<i64>() {
                        Ok(-1) => None,
                        Ok(n) if n >= 0 => Some(n as usize),
                        _ => return err(CacheError::NotAnInteger),
                    };
                    i += 3;
                }
                _ => return err(CacheError::SyntaxErrorNear(args[i].clone())),
            }
        }

        let mut store = self.store.write().await;
        match store.zrangebyscore(&args[0], min, max, is_rev, offset, count) {
            Ok(items) => resp_member_score_list(items, withscores),
            Err(e) => err(e),
        }
    }

    async fn cmd_zrange(&self, args: &[String], is_rev: bool) -> RespValue {
        if args.len() < 3 {
            return err(CacheError::WrongArity("ZRANGE".into()));
        }
        let start = match args[1].parse::<i64>() { Ok(n) => n, Err(_) => return err(CacheError::NotAnInteger) };
        let stop = match args[2].parse::<i64>() { Ok(n) => n, Err(_) => return err(CacheError::NotAnInteger) };
        let withscores = match args.get(3) {
            None => false,
            Some(s) if s.eq_ignore_ascii_case("WITHSCORES") => true,
            Some(tok) => return err(CacheError::SyntaxErrorNear(tok.clone())),
        };

        let mut store = self.store.write().await;
        match store.zrange(&args[0], start, stop, is_rev) {
            Ok(items) => resp_member_score_list(items, withscores),
            Err(e) => err(e),
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl RespValue {
    fn from_bulk_opt(opt: Option<String>) -> RespValue {
        RespValue::BulkString(opt)
    }
}

fn resp_string_array(items: Vec<String>) -> RespValue {
    RespValue::Array(Some(items.into_iter().map(|s| RespValue::BulkString(Some(s))).collect()))
}

fn resp_int_opt(opt: Option<usize>) -> RespValue {
    match opt {
        Some(n) => RespValue::Integer(n as i64),
        None => RespValue::BulkString(None),
    }
}

fn resp_member_score_list(items: Vec<(String, f64)>, withscores: bool) -> RespValue {
    let mut flat = Vec::with_capacity(items.len() * if withscores { 2 } else { 1 });
    for (member, score) in items {
        flat.push(RespValue::BulkString(Some(member)));
        if withscores {
            flat.push(RespValue::BulkString(Some(format_score(score))));
        }
    }
    RespValue::Array(Some(flat))
}

/// Returns `Some(args)` (unchanged) when `args.len() == n`, else `None`.
fn arity(args: &[String], n: usize, _cmd: &str) -> Option<&[String]> {
    if args.len() == n {
        Some(args)
    } else {
        None
    }
}

fn err(e: CacheError) -> RespValue {
    RespValue::Error(e.to_string())
}

fn to_resp(result: CacheResult<RespValue>) -> RespValue {
    result.unwrap_or_else(err)
}

/// Parses the optional `EX seconds | PX milliseconds` suffix of `SET`. Per
/// Redis (and unlike the reference implementation), `EX` is integer seconds
/// only — fractional values are rejected rather than silently truncated.
fn parse_set_ttl(rest: &[String]) -> CacheResult<Option<Duration>> {
    match rest {
        [] => Ok(None),
        [opt, val] => match opt.to_uppercase().as_str() {
            "EX" => {
                let secs: u64 = val.parse().map_err(|_| CacheError::NotAnInteger)?;
                Ok(Some(Duration::from_secs(secs)))
            }
            "PX" => {
                let ms: u64 = val.parse().map_err(|_| CacheError::NotAnInteger)?;
                Ok(Some(Duration::from_millis(ms)))
            }
            _ => Err(CacheError::SyntaxErrorNear(opt.clone())),
        },
        _ => Err(CacheError::SyntaxError),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(parts: &[&str]) -> RespValue {
        RespValue::Array(Some(
            parts.iter().map(|p| RespValue::BulkString(Some(p.to_string()))).collect(),
        ))
    }

    #[tokio::test]
    async fn pipelined_set_get_scenario() {
        let engine = Engine::new();
        assert_eq!(engine.dispatch(req(&["SET", "a", "1"])).await, RespValue::SimpleString("OK".to_string()));
        assert_eq!(engine.dispatch(req(&["GET", "a"])).await, RespValue::BulkString(Some("1".to_string())));
    }

    #[tokio::test]
    async fn incr_on_non_integer_value_errors() {
        let engine = Engine::new();
        engine.dispatch(req(&["SET", "k", "abc"])).await;
        assert_eq!(
            engine.dispatch(req(&["INCR", "k"])).await,
            RespValue::Error("ERR value is not an integer".to_string())
        );
    }

    #[tokio::test]
    async fn zadd_then_zrangebyscore_scenario() {
        let engine = Engine::new();
        assert_eq!(
            engine.dispatch(req(&["ZADD", "s", "1", "a", "2", "b", "3", "c"])).await,
            RespValue::Integer(3)
        );
        let resp = engine.dispatch(req(&["ZRANGEBYSCORE", "s", "1", "2", "WITHSCORES"])).await;
        assert_eq!(
            resp,
            RespValue::Array(Some(vec![
                RespValue::BulkString(Some("a".to_string())),
                RespValue::BulkString(Some("1".to_string())),
                RespValue::BulkString(Some("b".to_string())),
                RespValue::BulkString(Some("2".to_string())),
            ]))
        );
    }

    #[tokio::test]
    async fn wrongtype_scenario() {
        let engine = Engine::new();
        engine.dispatch(req(&["SET", "k", "v"])).await;
        assert_eq!(
            engine.dispatch(req(&["HGET", "k", "f"])).await,
            RespValue::Error("WRONGTYPE Operation against a key holding the wrong kind of value".to_string())
        );
    }

    #[tokio::test]
    async fn unknown_command_and_empty_command() {
        let engine = Engine::new();
        assert_eq!(
            engine.dispatch(req(&["NOPE"])).await,
            RespValue::Error("ERR unknown command 'NOPE'".to_string())
        );
        assert_eq!(
            engine.dispatch(RespValue::Array(Some(vec![]))).await,
            RespValue::Error("ERR empty command".to_string())
        );
    }

    #[tokio::test]
    async fn non_array_top_level_frame_is_answered_inline() {
        let engine = Engine::new();
        assert_eq!(
            engine.dispatch(RespValue::SimpleString("PING".to_string())).await,
            RespValue::Error(CacheError::ExpectedArray.to_string())
        );
    }
}
