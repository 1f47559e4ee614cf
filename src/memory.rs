//! Memory accounting for aggregation state
//!
//! Aggregator state growth is charged against a process-wide budget so that
//! heavy queries are cancelled before they can OOM the process. Shards borrow
//! from the global pool in fixed chunks to keep the atomic traffic low.

use std::sync::OnceLock;
use sysinfo::System;

/// Granularity of per-shard borrowing from the global budget.
pub const STATE_SIZE_BUDGET_CHUNK: i64 = 1 << 20;

// Fallback when the system memory cannot be determined.
const DEFAULT_ALLOWED_MEMORY: u64 = 8 << 30;

/// Memory available to the process, sampled once per process.
pub fn allowed() -> usize {
    static ALLOWED: OnceLock<usize> = OnceLock::new();
    *ALLOWED.get_or_init(|| {
        let mut sys = System::new();
        sys.refresh_memory();
        let mut mem = sys.available_memory();
        if mem == 0 {
            mem = sys.total_memory();
        }
        if mem == 0 {
            mem = DEFAULT_ALLOWED_MEMORY;
        }
        mem as usize
    })
}
