//! Error types for embercache.
//!
//! Every fallible store and dispatch operation returns a `CacheError`
//! rather than a bare `String`. The dispatcher is the only place that
//! turns a `CacheError` into a RESP `Error` frame (see `commands::mod`).

use thiserror::Error;

/// All error conditions the engine and dispatcher can surface to a client.
///
/// `Display` renders exactly the RESP error text (including the `ERR` /
/// `WRONGTYPE` prefix) the wire protocol expects.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CacheError {
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(String),

    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),

    #[error("ERR empty command")]
    EmptyCommand,

    #[error("ERR expected array")]
    ExpectedArray,

    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,

    #[error("ERR value is not an integer")]
    StoredValueNotInteger,

    #[error("ERR value is not a valid float")]
    NotAFloat,

    #[error("ERR hash value is not an integer")]
    HashValueNotInteger,

    #[error("ERR hash value is not a float")]
    HashValueNotFloat,

    #[error("ERR increment would produce NaN or Infinity")]
    NotFinite,

    #[error("ERR increment or decrement would overflow")]
    Overflow,

    #[error("ERR syntax error")]
    SyntaxError,

    #[error("ERR syntax error near '{0}'")]
    SyntaxErrorNear(String),
}

pub type CacheResult<T> = Result<T, CacheError>;
