//! Process-wide observability: metrics export.

pub mod metrics;
