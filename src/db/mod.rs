//! Keyspace engine: the store, its value types, and per-type operations.

pub mod core;
pub mod ops;
pub mod skiplist;
pub mod types;

pub use core::Store;
pub use ops::generic::GenericOps;
pub use ops::hash::HashOps;
pub use ops::string::StringOps;
pub use ops::zset::ZSetOps;
pub use types::{Entry, ValueKind};
