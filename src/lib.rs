//! Grouped streaming aggregation core for the LogsQL `stats` pipe
//!
//! Blocks of log rows flow through a query pipeline; this crate computes
//! per-worker partial aggregates grouped by a tuple of by-fields (optionally
//! bucketed), merges the partials across workers and emits grouped result
//! rows downstream. Aggregator state growth is charged against an atomic
//! memory budget so heavy queries are cancelled before they can OOM.

pub mod bitmap;
pub mod block;
pub mod encoding;
pub mod error;
pub mod filter;
pub mod lexer;
pub mod memory;
pub mod pipe;
pub mod pipe_stats;
pub mod stats;
pub mod values;

// Re-export main types
pub use block::{BlockResult, Column};
pub use error::{Error, Result};
pub use filter::Filter;
pub use pipe::{CollectingProcessor, FieldsSet, PipeProcessor};
pub use pipe_stats::{ByStatsField, StatsFuncSpec, StatsPipe, StatsPipeProcessor};
pub use stats::{StatsFunc, StatsTracker};
