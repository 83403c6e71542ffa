//! RESP2 wire codec: byte-level framing parser and serializer.
//!
//! `parse` distinguishes a frame that is merely incomplete (need more bytes,
//! caller should buffer and retry) from one that is malformed (permanent
//! protocol violation, caller should close the connection). The two are
//! different variants of [`ParseError`] rather than one conflated error —
//! losing that distinction would mean a partial read looks identical to a
//! broken client.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(Option<String>),
    Array(Option<Vec<RespValue>>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Not enough bytes buffered yet; retry once more arrive.
    Incomplete,
    /// The buffered bytes can never form a valid frame.
    Malformed(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Incomplete => write!(f, "incomplete frame"),
            ParseError::Malformed(msg) => write!(f, "malformed frame: {msg}"),
        }
    }
}

impl std::error::Error for ParseError {}

impl RespValue {
    pub fn serialize(&self) -> String {
        match self {
            RespValue::SimpleString(s) => format!("+{s}\r\n"),
            RespValue::Error(msg) => format!("-{msg}\r\n"),
            RespValue::Integer(i) => format!(":{i}\r\n"),
            RespValue::BulkString(Some(s)) => format!("${}\r\n{s}\r\n", s.len()),
            RespValue::BulkString(None) => "$-1\r\n".to_string(),
            RespValue::Array(Some(items)) => {
                let mut out = format!("*{}\r\n", items.len());
                for item in items {
                    out.push_str(&item.serialize());
                }
                out
            }
            RespValue::Array(None) => "*-1\r\n".to_string(),
        }
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Reads a `\r\n`-terminated line, returning the line text and the number of
/// bytes (including the terminator) it occupied.
fn read_line(buf: &[u8]) -> Result<(String, usize), ParseError> {
    match find_crlf(buf) {
        Some(pos) => {
            let text = String::from_utf8(buf[..pos].to_vec())
                .map_err(|_| ParseError::Malformed("line is not valid UTF-8".to_string()))?;
            Ok((text, pos + 2))
        }
        None => Err(ParseError::Incomplete),
    }
}

fn read_int_line(buf: &[u8]) -> Result<(i64, usize), ParseError> {
    let (line, len) = read_line(buf)?;
    let n = line
        .parse::<i64>()
        .map_err(|_| ParseError::Malformed(format!("invalid integer '{line}'")))?;
    Ok((n, len))
}

/// Parses one RESP frame from the front of `buf`. On success returns the
/// value and how many bytes it consumed; the caller advances its buffer by
/// that amount and may call `parse` again on the remainder.
pub fn parse(buf: &[u8]) -> Result<(RespValue, usize), ParseError> {
    if buf.is_empty() {
        return Err(ParseError::Incomplete);
    }

    match buf[0] {
        b'+' => {
            let (line, len) = read_line(&buf[1..])?;
            Ok((RespValue::SimpleString(line), len + 1))
        }
        b'-' => {
            let (line, len) = read_line(&buf[1..])?;
            Ok((RespValue::Error(line), len + 1))
        }
        b':' => {
            let (n, len) = read_int_line(&buf[1..])?;
            Ok((RespValue::Integer(n), len + 1))
        }
        b'$' => {
            let (declared_len, len_bytes) = read_int_line(&buf[1..])?;
            let header_len = 1 + len_bytes;
            if declared_len == -1 {
                return Ok((RespValue::BulkString(None), header_len));
            }
            if declared_len < 0 {
                return Err(ParseError::Malformed(format!("negative bulk length {declared_len}")));
            }
            let str_len = declared_len as usize;
            let total = header_len + str_len + 2;
            if buf.len() < total {
                return Err(ParseError::Incomplete);
            }
            if &buf[header_len + str_len..total] != b"\r\n" {
                return Err(ParseError::Malformed("bulk string missing trailing CRLF".to_string()));
            }
            let text = String::from_utf8(buf[header_len..header_len + str_len].to_vec())
                .map_err(|_| ParseError::Malformed("bulk string is not valid UTF-8".to_string()))?;
            Ok((RespValue::BulkString(Some(text)), total))
        }
        b'*' => {
            let (declared_count, len_bytes) = read_int_line(&buf[1..])?;
            let mut pos = 1 + len_bytes;
            if declared_count == -1 {
                return Ok((RespValue::Array(None), pos));
            }
            if declared_count < 0 {
                return Err(ParseError::Malformed(format!("negative array count {declared_count}")));
            }
            let mut items = Vec::with_capacity(declared_count as usize);
            for _ in 0..declared_count {
                let (item, consumed) = parse(&buf[pos..])?;
                items.push(item);
                pos += consumed;
            }
            Ok((RespValue::Array(Some(items)), pos))
        }
        other => Err(ParseError::Malformed(format!("unknown type prefix '{}'", other as char))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_shape() {
        let values = vec![
            RespValue::SimpleString("OK".to_string()),
            RespValue::Error("ERR bad".to_string()),
            RespValue::Integer(-42),
            RespValue::BulkString(Some("hello".to_string())),
            RespValue::BulkString(None),
            RespValue::Array(Some(vec![
                RespValue::BulkString(Some("SET".to_string())),
                RespValue::BulkString(Some("k".to_string())),
            ])),
            RespValue::Array(None),
        ];
        for v in values {
            let bytes = v.serialize();
            let (parsed, consumed) = parse(bytes.as_bytes()).unwrap();
            assert_eq!(parsed, v);
            assert_eq!(consumed, bytes.len());
        }
    }

    #[test]
    fn partial_bulk_string_is_incomplete_not_malformed() {
        let full = RespValue::BulkString(Some("hello world".to_string())).serialize();
        let partial = &full.as_bytes()[..full.len() - 3];
        assert_eq!(parse(partial), Err(ParseError::Incomplete));
    }

    #[test]
    fn unknown_prefix_is_malformed() {
        match parse(b"&nope\r\n") {
            Err(ParseError::Malformed(_)) => {}
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn nested_array_buffers_until_every_element_present() {
        let first_read = b"*2\r\n$3\r\nfoo\r\n$3\r\nba";
        assert_eq!(parse(first_read), Err(ParseError::Incomplete));
    }

    #[test]
    fn pipelined_frames_parse_one_at_a_time() {
        let buf = b"*1\r\n$4\r\nPING\r\n*1\r\n$4\r\nPING\r\n";
        let (first, consumed) = parse(buf).unwrap();
        assert_eq!(first, RespValue::Array(Some(vec![RespValue::BulkString(Some("PING".to_string()))])));
        let (second, _) = parse(&buf[consumed..]).unwrap();
        assert_eq!(second, first);
    }
}
