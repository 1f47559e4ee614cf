//! The `stats` pipe: grouped streaming aggregation
//!
//! A parsed [`StatsPipe`] turns into a [`StatsPipeProcessor`] with one shard
//! per worker. Workers feed blocks into their own shard, which groups rows
//! by the encoded by-field tuple and dispatches them to per-group trackers.
//! `flush` folds all shard maps into one and streams the grouped result
//! blocks downstream in bounded chunks.

use crate::bitmap::Bitmap;
use crate::block::{get_bucketed_value, BlockResult, ResultColumn};
use crate::encoding::{marshal_bytes, unmarshal_bytes};
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::lexer::{get_canonical_column_name, quote_token_if_needed, Lexer};
use crate::memory::{allowed, STATE_SIZE_BUDGET_CHUNK};
use crate::pipe::{FieldsSet, PipeProcessor};
use crate::stats::{parse_field_name, StatsFunc, StatsTracker};
use crate::values::{try_parse_bytes, try_parse_duration, try_parse_float, try_parse_ipv4_mask};
use crate::values::{
    NSECS_PER_DAY, NSECS_PER_HOUR, NSECS_PER_MICROSECOND, NSECS_PER_MILLISECOND,
    NSECS_PER_MINUTE, NSECS_PER_SECOND, NSECS_PER_WEEK,
};
use crossbeam_utils::CachePadded;
use hashbrown::hash_map::Entry;
use hashbrown::HashMap;
use parking_lot::Mutex;
use std::fmt;
use std::mem::size_of;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

/// Output blocks are cut whenever the accumulated value bytes reach this
/// threshold.
const OUTPUT_BLOCK_VALUES_LEN: usize = 1_000_000;

/// One `by (...)` field with its optional bucket configuration.
///
/// The surface form is `name[:bucket_size [offset bucket_offset]]`, where the
/// size can be a number, a duration, a byte size, an IPv4 mask or a named
/// calendar unit. The non-linear `month` and `year` units keep
/// `bucket_size == 0` and are recognised by their string form.
#[derive(Debug, Clone, Default)]
pub struct ByStatsField {
    pub name: String,
    pub bucket_size_str: String,
    pub bucket_size: f64,
    pub bucket_offset_str: String,
    pub bucket_offset: f64,
}

impl ByStatsField {
    pub fn has_bucket_config(&self) -> bool {
        !self.bucket_size_str.is_empty() || !self.bucket_offset_str.is_empty()
    }
}

impl fmt::Display for ByStatsField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote_token_if_needed(&self.name))?;
        if !self.bucket_size_str.is_empty() {
            write!(f, ":{}", self.bucket_size_str)?;
            if !self.bucket_offset_str.is_empty() {
                write!(f, " offset {}", self.bucket_offset_str)?;
            }
        }
        Ok(())
    }
}

/// One stats function of the pipe together with its optional row filter and
/// output name.
#[derive(Debug, Clone)]
pub struct StatsFuncSpec {
    pub func: StatsFunc,
    /// Additional `if (...)` filter applied to rows before `func` sees them.
    pub iff: Option<Filter>,
    /// Fields to keep when materialising the filtered projection for `func`.
    pub needed_fields_for_func: Vec<String>,
    pub result_name: String,
}

/// Parsed `stats [by (...)] func [if (...)] as name, ...` pipe.
#[derive(Debug, Clone)]
pub struct StatsPipe {
    pub by_fields: Vec<ByStatsField>,
    pub funcs: Vec<StatsFuncSpec>,
}

impl StatsPipe {
    /// Parse the stats pipe from the lexer positioned at the `stats` keyword.
    pub fn parse(lex: &mut Lexer) -> Result<StatsPipe> {
        if !lex.is_keyword(&["stats"]) {
            return Err(lex.error("expecting 'stats'"));
        }
        lex.next_token();

        let mut by_fields = Vec::new();
        if lex.is_keyword(&["by", "("]) {
            if lex.is_keyword(&["by"]) {
                lex.next_token();
            }
            by_fields = parse_by_stats_fields(lex)?;
        }

        let mut funcs: Vec<StatsFuncSpec> = Vec::new();
        loop {
            let func = StatsFunc::parse(lex)?;

            let mut iff = None;
            if lex.is_keyword(&["if"]) {
                iff = Some(parse_if_filter(lex)?);
            }

            let result_name = parse_result_name(lex)?;
            if funcs.iter().any(|f| f.result_name == result_name) {
                return Err(Error::parse(
                    result_name,
                    "duplicate result name in stats pipe",
                ));
            }

            let mut needed = FieldsSet::new();
            func.update_needed_fields(&mut needed);
            if let Some(f) = &iff {
                f.update_needed_fields(&mut needed);
            }

            funcs.push(StatsFuncSpec {
                func,
                iff,
                needed_fields_for_func: needed.get_all(),
                result_name,
            });

            if lex.is_keyword(&["|", ")", ""]) {
                return Ok(StatsPipe { by_fields, funcs });
            }
            if !lex.is_keyword(&[","]) {
                return Err(lex.error("expecting ',', '|' or ')' after stats func"));
            }
            lex.next_token();
        }
    }

    /// Parse a standalone stats clause, requiring the full input to be
    /// consumed.
    pub fn parse_str(s: &str) -> Result<StatsPipe> {
        let mut lex = Lexer::new(s);
        let ps = StatsPipe::parse(&mut lex)?;
        if !lex.is_end() {
            return Err(lex.error("unexpected trailing token after stats pipe"));
        }
        Ok(ps)
    }

    /// Record the input fields the pipe reads: by-fields unconditionally,
    /// plus whatever each function and its filter need.
    pub fn update_needed_fields(&self, needed: &mut FieldsSet) {
        for bf in &self.by_fields {
            needed.add(&bf.name);
        }
        for f in &self.funcs {
            f.func.update_needed_fields(needed);
            if let Some(iff) = &f.iff {
                iff.update_needed_fields(needed);
            }
        }
    }

    /// Create the processor for this pipe with one shard per worker. The
    /// state-size budget is bounded by a share of the available memory.
    pub fn new_pipe_processor(
        self: Arc<StatsPipe>,
        workers_count: usize,
        stop: Arc<AtomicBool>,
        cancel: Arc<dyn Fn() + Send + Sync>,
        pp_base: Arc<dyn PipeProcessor>,
    ) -> StatsPipeProcessor {
        let max_state_size = (allowed() as f64 * 0.3) as i64;
        self.new_pipe_processor_with_max_state_size(
            workers_count,
            stop,
            cancel,
            pp_base,
            max_state_size,
        )
    }

    /// Like [`StatsPipe::new_pipe_processor`] with an explicit state-size
    /// bound.
    pub fn new_pipe_processor_with_max_state_size(
        self: Arc<StatsPipe>,
        workers_count: usize,
        stop: Arc<AtomicBool>,
        cancel: Arc<dyn Fn() + Send + Sync>,
        pp_base: Arc<dyn PipeProcessor>,
        mut max_state_size: i64,
    ) -> StatsPipeProcessor {
        let mut shards = Vec::with_capacity(workers_count);
        for _ in 0..workers_count {
            shards.push(CachePadded::new(Mutex::new(StatsShard::new())));
            max_state_size -= STATE_SIZE_BUDGET_CHUNK;
        }
        tracing::debug!(
            workers = workers_count,
            max_state_size,
            "creating stats pipe processor"
        );
        StatsPipeProcessor {
            ps: self,
            stop,
            cancel,
            pp_base,
            shards,
            max_state_size,
            state_size_budget: AtomicI64::new(max_state_size),
        }
    }
}

impl fmt::Display for StatsPipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stats ")?;
        if !self.by_fields.is_empty() {
            let a: Vec<String> = self.by_fields.iter().map(ByStatsField::to_string).collect();
            write!(f, "by ({}) ", a.join(", "))?;
        }
        if self.funcs.is_empty() {
            panic!("BUG: StatsPipe must contain at least one stats function");
        }
        let mut parts = Vec::with_capacity(self.funcs.len());
        for func in &self.funcs {
            let mut line = func.func.to_string();
            if let Some(iff) = &func.iff {
                line.push_str(&format!(" if ({iff})"));
            }
            line.push_str(" as ");
            line.push_str(&quote_token_if_needed(&func.result_name));
            parts.push(line);
        }
        write!(f, "{}", parts.join(", "))
    }
}

fn parse_if_filter(lex: &mut Lexer) -> Result<Filter> {
    if !lex.is_keyword(&["if"]) {
        return Err(lex.error("expecting 'if'"));
    }
    lex.next_token();
    if !lex.is_keyword(&["("]) {
        return Err(lex.error("expecting '(' after 'if'"));
    }
    lex.next_token();
    if lex.is_keyword(&[")"]) {
        lex.next_token();
        return Ok(Filter::MatchAll);
    }
    let f = Filter::parse(lex)?;
    if !lex.is_keyword(&[")"]) {
        return Err(lex.error("expecting ')' after 'if' filter"));
    }
    lex.next_token();
    Ok(f)
}

fn parse_result_name(lex: &mut Lexer) -> Result<String> {
    if lex.is_keyword(&["as"]) {
        lex.next_token();
    }
    parse_field_name(lex)
}

fn parse_by_stats_fields(lex: &mut Lexer) -> Result<Vec<ByStatsField>> {
    if !lex.is_keyword(&["("]) {
        return Err(lex.error("missing '(' in 'by' clause"));
    }
    let mut bfs = Vec::new();
    loop {
        lex.next_token();
        if lex.is_keyword(&[")"]) {
            lex.next_token();
            return Ok(bfs);
        }
        if lex.is_keyword(&[","]) {
            return Err(lex.error("unexpected ',' in 'by' clause"));
        }
        if lex.is_end() {
            return Err(lex.error("missing ')' in 'by' clause"));
        }
        let name = get_canonical_column_name(lex.token());
        lex.next_token();
        let mut bf = ByStatsField {
            name,
            ..Default::default()
        };

        if lex.is_keyword(&[":"]) {
            lex.next_token();
            let mut bucket_size_str = lex.token().to_string();
            lex.next_token();
            if bucket_size_str == "/" {
                // `/N` lexes as two tokens.
                bucket_size_str.push_str(lex.token());
                lex.next_token();
            }
            if bucket_size_str != "year" && bucket_size_str != "month" {
                bf.bucket_size = try_parse_bucket_size(&bucket_size_str).ok_or_else(|| {
                    Error::parse(
                        bucket_size_str.clone(),
                        format!("cannot parse bucket size for field {:?}", bf.name),
                    )
                })?;
            }
            bf.bucket_size_str = bucket_size_str;

            if lex.is_keyword(&["offset"]) {
                lex.next_token();
                let bucket_offset_str = lex.token().to_string();
                lex.next_token();
                bf.bucket_offset = try_parse_bucket_offset(&bucket_offset_str).ok_or_else(|| {
                    Error::parse(
                        bucket_offset_str.clone(),
                        format!("cannot parse bucket offset for field {:?}", bf.name),
                    )
                })?;
                bf.bucket_offset_str = bucket_offset_str;
            }
        }
        bfs.push(bf);

        if lex.is_keyword(&[")"]) {
            lex.next_token();
            return Ok(bfs);
        }
        if !lex.is_keyword(&[","]) {
            return Err(lex.error("expecting ',' or ')' in 'by' clause"));
        }
    }
}

/// Parse a bucket size literal: a named calendar unit, a number, a duration
/// (nanosecond base), a byte size, or an IPv4 mask `/N`.
fn try_parse_bucket_size(s: &str) -> Option<f64> {
    match s {
        "nanosecond" => return Some(1.0),
        "microsecond" => return Some(NSECS_PER_MICROSECOND as f64),
        "millisecond" => return Some(NSECS_PER_MILLISECOND as f64),
        "second" => return Some(NSECS_PER_SECOND as f64),
        "minute" => return Some(NSECS_PER_MINUTE as f64),
        "hour" => return Some(NSECS_PER_HOUR as f64),
        "day" => return Some(NSECS_PER_DAY as f64),
        "week" => return Some(NSECS_PER_WEEK as f64),
        _ => {}
    }
    if let Some(f) = try_parse_float(s) {
        return Some(f);
    }
    if let Some(ns) = try_parse_duration(s) {
        return Some(ns as f64);
    }
    if let Some(n) = try_parse_bytes(s) {
        return Some(n as f64);
    }
    if let Some(n) = try_parse_ipv4_mask(s) {
        return Some(n as f64);
    }
    None
}

/// Parse a bucket offset literal: a number, a duration or a byte size, with
/// an optional leading `-`. Calendar units are not valid offsets.
fn try_parse_bucket_offset(s: &str) -> Option<f64> {
    let (neg, abs) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let v = if let Some(f) = try_parse_float(abs) {
        f
    } else if let Some(ns) = try_parse_duration(abs) {
        ns as f64
    } else if let Some(n) = try_parse_bytes(abs) {
        n as f64
    } else {
        return None;
    };
    Some(if neg { -v } else { v })
}

/// The per-worker stats processor.
pub struct StatsPipeProcessor {
    ps: Arc<StatsPipe>,
    stop: Arc<AtomicBool>,
    cancel: Arc<dyn Fn() + Send + Sync>,
    pp_base: Arc<dyn PipeProcessor>,

    shards: Vec<CachePadded<Mutex<StatsShard>>>,

    max_state_size: i64,
    state_size_budget: AtomicI64,
}

impl PipeProcessor for StatsPipeProcessor {
    fn write_block(&self, worker_id: usize, br: &BlockResult) {
        if br.rows_len() == 0 {
            return;
        }

        // Only worker `worker_id` touches this shard during the write phase,
        // so the lock is uncontended.
        let mut shard = self.shards[worker_id].lock();

        while shard.state_size_budget < 0 {
            // Steal some budget for the state size from the global budget.
            let remaining = self
                .state_size_budget
                .fetch_sub(STATE_SIZE_BUDGET_CHUNK, Ordering::SeqCst)
                - STATE_SIZE_BUDGET_CHUNK;
            if remaining < 0 {
                // The state size is too big. Stop processing data in order
                // to avoid OOM crash.
                if remaining + STATE_SIZE_BUDGET_CHUNK >= 0 {
                    // Notify the workers to stop calling write_block().
                    tracing::warn!("state size budget exhausted; cancelling the query");
                    (self.cancel)();
                }
                return;
            }
            shard.state_size_budget += STATE_SIZE_BUDGET_CHUNK;
        }

        shard.write_block(&self.ps, br);
    }

    fn flush(&self) -> Result<()> {
        if self.state_size_budget.load(Ordering::SeqCst) <= 0 {
            return Err(Error::BudgetExceeded {
                pipe: self.ps.to_string(),
                max_mib: self.max_state_size / (1 << 20),
            });
        }

        // Fold shards 1..W into shard 0's map.
        let mut m = std::mem::take(&mut self.shards[0].lock().m);
        for shard in &self.shards[1..] {
            let shard_m = std::mem::take(&mut shard.lock().m);
            for (key, group) in shard_m {
                // Shard maps can be big; stop wasting CPU as soon as the
                // consumer has gone away.
                if self.stop.load(Ordering::Relaxed) {
                    return Ok(());
                }
                match m.entry(key) {
                    Entry::Occupied(mut e) => {
                        for (dst, src) in e.get_mut().trackers.iter_mut().zip(group.trackers) {
                            dst.merge(src);
                        }
                    }
                    Entry::Vacant(e) => {
                        e.insert(group);
                    }
                }
            }
        }

        let by_fields = &self.ps.by_fields;
        if by_fields.is_empty() && m.is_empty() {
            // Zero matching rows: the aggregators still produce their
            // no-input results for the single empty-key group.
            let trackers = self
                .ps
                .funcs
                .iter()
                .map(|f| f.func.new_tracker().0)
                .collect();
            m.insert(Vec::new(), StatsGroup { trackers });
        }
        tracing::debug!(groups = m.len(), "merged shard states");

        // Stream per-group results downstream in bounded chunks.
        let mut rcs: Vec<ResultColumn> =
            Vec::with_capacity(by_fields.len() + self.ps.funcs.len());
        for bf in by_fields {
            rcs.push(ResultColumn::new(bf.name.clone()));
        }
        for f in &self.ps.funcs {
            rcs.push(ResultColumn::new(f.result_name.clone()));
        }

        let mut values_len = 0usize;
        for (key, group) in m {
            if self.stop.load(Ordering::Relaxed) {
                return Ok(());
            }

            let mut values: Vec<String> = Vec::with_capacity(rcs.len());
            let mut key_buf: &[u8] = &key;
            while !key_buf.is_empty() {
                let Some((v, n)) = unmarshal_bytes(key_buf) else {
                    panic!("BUG: cannot unmarshal value from group key {key_buf:?}");
                };
                key_buf = &key_buf[n..];
                values.push(String::from_utf8_lossy(v).into_owned());
            }
            if values.len() != by_fields.len() {
                panic!(
                    "BUG: unexpected number of values decoded from group key; got {}; want {}",
                    values.len(),
                    by_fields.len()
                );
            }

            for tracker in &group.trackers {
                values.push(tracker.finalize());
            }
            if values.len() != rcs.len() {
                panic!(
                    "BUG: number of values {} must match the number of result columns {}",
                    values.len(),
                    rcs.len()
                );
            }

            for (rc, v) in rcs.iter_mut().zip(values) {
                values_len += v.len();
                rc.add_value(v);
            }
            if values_len >= OUTPUT_BLOCK_VALUES_LEN {
                let out = BlockResult::from_result_columns(&mut rcs);
                self.pp_base.write_block(0, &out);
                values_len = 0;
            }
        }

        let out = BlockResult::from_result_columns(&mut rcs);
        self.pp_base.write_block(0, &out);
        Ok(())
    }
}

struct StatsGroup {
    trackers: Vec<StatsTracker>,
}

impl StatsGroup {
    fn update_for_all_rows(&mut self, brs: &[FuncBlock<'_>]) -> i64 {
        let mut n = 0;
        for (tracker, fb) in self.trackers.iter_mut().zip(brs.iter()) {
            n += tracker.update_for_all_rows(fb.block());
        }
        n
    }

    fn update_for_row(&mut self, brs: &[FuncBlock<'_>], row_idx: usize) -> i64 {
        let mut n = 0;
        for (tracker, fb) in self.trackers.iter_mut().zip(brs.iter()) {
            match fb {
                FuncBlock::Verbatim(br) => n += tracker.update_for_row(br, row_idx),
                FuncBlock::Filtered { br, row_map } => {
                    // Rows rejected by the per-function filter are invisible
                    // to this tracker; surviving rows carry their index in
                    // the projected block.
                    if let Some(mapped) = row_map[row_idx] {
                        n += tracker.update_for_row(br, mapped);
                    }
                }
            }
        }
        n
    }
}

/// The block each stats function sees after its `if (...)` filter: the input
/// block verbatim, or an owned filtered projection together with the mapping
/// from input row index to projected row index.
enum FuncBlock<'a> {
    Verbatim(&'a BlockResult),
    Filtered {
        br: BlockResult,
        row_map: Vec<Option<usize>>,
    },
}

impl FuncBlock<'_> {
    fn block(&self) -> &BlockResult {
        match self {
            FuncBlock::Verbatim(br) => br,
            FuncBlock::Filtered { br, .. } => br,
        }
    }
}

struct StatsShard {
    m: HashMap<Vec<u8>, StatsGroup>,
    state_size_budget: i64,
}

impl StatsShard {
    fn new() -> StatsShard {
        StatsShard {
            m: HashMap::new(),
            state_size_budget: STATE_SIZE_BUDGET_CHUNK,
        }
    }

    fn write_block(&mut self, ps: &StatsPipe, br: &BlockResult) {
        let brs = apply_per_function_filters(ps, br);
        let by_fields = &ps.by_fields;

        if by_fields.is_empty() {
            // Fast path - all the rows go to a single group with empty key.
            let n = self.group_mut(ps, b"").update_for_all_rows(&brs);
            self.state_size_budget -= n;
            return;
        }

        if by_fields.len() == 1 {
            let bf = &by_fields[0];
            if let Some(c) = br.get_column_by_name(&bf.name) {
                if c.is_const() {
                    // Fast path for a column with a constant value.
                    let v = get_bucketed_value(c.get_value_at_row(0), bf);
                    let mut key = Vec::new();
                    marshal_bytes(&mut key, v.as_bytes());
                    let n = self.group_mut(ps, &key).update_for_all_rows(&brs);
                    self.state_size_budget -= n;
                    return;
                }
            }

            let values = br.get_values_bucketed(bf);
            if are_const_values(&values) {
                // Fast path for a column with constant values.
                let mut key = Vec::new();
                marshal_bytes(&mut key, values[0].as_bytes());
                let n = self.group_mut(ps, &key).update_for_all_rows(&brs);
                self.state_size_budget -= n;
                return;
            }

            // Generic path - the key changes across rows.
            let mut key = Vec::new();
            let mut row = 0;
            while row < br.rows_len() {
                let mut end = row + 1;
                while end < br.rows_len() && values[end] == values[row] {
                    end += 1;
                }
                key.clear();
                marshal_bytes(&mut key, values[row].as_bytes());
                let n = {
                    let group = self.group_mut(ps, &key);
                    let mut n = 0;
                    for i in row..end {
                        n += group.update_for_row(&brs, i);
                    }
                    n
                };
                self.state_size_budget -= n;
                row = end;
            }
            return;
        }

        // Obtain the bucketed values for all the by-fields.
        let column_values: Vec<Vec<String>> = by_fields
            .iter()
            .map(|bf| br.get_values_bucketed(bf))
            .collect();

        if column_values.iter().all(|values| are_const_values(values)) {
            // Fast path for constant 'by (...)' columns.
            let mut key = Vec::new();
            for values in &column_values {
                marshal_bytes(&mut key, values[0].as_bytes());
            }
            let n = self.group_mut(ps, &key).update_for_all_rows(&brs);
            self.state_size_budget -= n;
            return;
        }

        // The slowest path - group by multiple columns with values changing
        // across rows.
        let mut key = Vec::new();
        let mut row = 0;
        while row < br.rows_len() {
            let mut end = row + 1;
            while end < br.rows_len()
                && column_values.iter().all(|values| values[end] == values[row])
            {
                end += 1;
            }
            key.clear();
            for values in &column_values {
                marshal_bytes(&mut key, values[row].as_bytes());
            }
            let n = {
                let group = self.group_mut(ps, &key);
                let mut n = 0;
                for i in row..end {
                    n += group.update_for_row(&brs, i);
                }
                n
            };
            self.state_size_budget -= n;
            row = end;
        }
    }

    fn group_mut(&mut self, ps: &StatsPipe, key: &[u8]) -> &mut StatsGroup {
        if !self.m.contains_key(key) {
            let mut trackers = Vec::with_capacity(ps.funcs.len());
            for f in &ps.funcs {
                let (tracker, size) = f.func.new_tracker();
                self.state_size_budget -= size;
                trackers.push(tracker);
            }
            self.state_size_budget -=
                (key.len() + size_of::<Vec<u8>>() + size_of::<StatsGroup>()) as i64;
            // The key view may borrow recycled block storage; the map owns a
            // copy from the first insertion on.
            self.m.insert(key.to_vec(), StatsGroup { trackers });
        }
        self.m.get_mut(key).unwrap()
    }
}

fn apply_per_function_filters<'a>(ps: &StatsPipe, br: &'a BlockResult) -> Vec<FuncBlock<'a>> {
    ps.funcs
        .iter()
        .map(|f| {
            let Some(iff) = &f.iff else {
                // Fast path - no per-function filter.
                return FuncBlock::Verbatim(br);
            };

            let mut bm = Bitmap::default();
            bm.init(br.rows_len());
            bm.set_bits();
            iff.apply_to_block(br, &mut bm);

            if bm.are_all_bits_set() {
                // Fast path - the filter keeps all the rows.
                return FuncBlock::Verbatim(br);
            }
            if bm.is_zero() {
                return FuncBlock::Filtered {
                    br: BlockResult::empty(),
                    row_map: vec![None; br.rows_len()],
                };
            }

            let mut row_map = vec![None; br.rows_len()];
            let mut next = 0;
            bm.for_each_set_bit(|row| {
                row_map[row] = Some(next);
                next += 1;
            });
            FuncBlock::Filtered {
                br: BlockResult::from_filtered(br, &bm, &f.needed_fields_for_func),
                row_map,
            }
        })
        .collect()
}

fn are_const_values(values: &[String]) -> bool {
    let Some(first) = values.first() else {
        return false;
    };
    values[1..].iter().all(|v| v == first)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> StatsPipe {
        StatsPipe::parse_str(s).unwrap()
    }

    #[test]
    fn test_parse_and_stringify() {
        for (input, want) in [
            ("stats count(*) as n", "stats count(*) as n"),
            ("stats count() n", "stats count(*) as n"),
            (
                "stats by (host) sum(bytes) as s",
                "stats by (host) sum(bytes) as s",
            ),
            (
                "stats (host, dc) count(*) as n",
                "stats by (host, dc) count(*) as n",
            ),
            (
                "stats by (latency:1s) count(*) as n",
                "stats by (latency:1s) count(*) as n",
            ),
            (
                "stats by (latency:1s offset 0.5s) count(*) as n",
                "stats by (latency:1s offset 0.5s) count(*) as n",
            ),
            (
                "stats by (ip:/24) count(*) as n",
                "stats by (ip:/24) count(*) as n",
            ),
            (
                "stats by (t:month) count(*) as n",
                "stats by (t:month) count(*) as n",
            ),
            (
                "stats by (level) count(*) if (status:error) as errs, count(*) as total",
                "stats by (level) count(*) if (status:error) as errs, count(*) as total",
            ),
            (
                "stats quantile(0.95, latency) as p95, median(latency) as p50",
                "stats quantile(0.95, latency) as p95, median(latency) as p50",
            ),
            (
                "stats count(*) if () as n",
                "stats count(*) if (*) as n",
            ),
        ] {
            let ps = parse(input);
            assert_eq!(ps.to_string(), want, "for {input:?}");
        }
    }

    #[test]
    fn test_parse_errors() {
        for input in [
            "stats",
            "count(*) as n",
            "stats by (host)",
            "stats frobnicate(x) as y",
            "stats count(*)",
            "stats by (latency:bogus) count(*) as n",
            "stats by (latency:1s offset bogus) count(*) as n",
            "stats count(*) as n,",
            "stats count(*) as n extra",
            "stats count(*) if (status:error as n",
        ] {
            assert!(StatsPipe::parse_str(input).is_err(), "expected error for {input:?}");
        }
    }

    #[test]
    fn test_duplicate_result_names_rejected() {
        assert!(StatsPipe::parse_str("stats count(*) as n, sum(x) as n").is_err());
    }

    #[test]
    fn test_parse_bucket_size_literals() {
        assert_eq!(try_parse_bucket_size("second"), Some(1e9));
        assert_eq!(try_parse_bucket_size("week"), Some(NSECS_PER_WEEK as f64));
        assert_eq!(try_parse_bucket_size("12345"), Some(12345.0));
        assert_eq!(try_parse_bucket_size("1.5s"), Some(1.5e9));
        assert_eq!(try_parse_bucket_size("1.5KiB"), Some(1536.0));
        assert_eq!(try_parse_bucket_size("/24"), Some(256.0));
        assert_eq!(try_parse_bucket_size("bogus"), None);
    }

    #[test]
    fn test_parse_bucket_offset_literals() {
        assert_eq!(try_parse_bucket_offset("5"), Some(5.0));
        assert_eq!(try_parse_bucket_offset("-5"), Some(-5.0));
        assert_eq!(try_parse_bucket_offset("-1.5s"), Some(-1.5e9));
        assert_eq!(try_parse_bucket_offset("1KiB"), Some(1024.0));
        assert_eq!(try_parse_bucket_offset("month"), None);
    }

    #[test]
    fn test_needed_fields() {
        let ps = parse("stats by (host) sum(bytes) if (status:error) as s");
        let mut needed = FieldsSet::new();
        ps.update_needed_fields(&mut needed);
        assert!(needed.contains("host"));
        assert!(needed.contains("bytes"));
        assert!(needed.contains("status"));
        assert!(!needed.contains("latency"));
    }

    #[test]
    fn test_by_field_display_round_trip() {
        let ps = parse(r#"stats by ("field with space":10 offset -5) count(*) as n"#);
        let rendered = ps.to_string();
        let reparsed = StatsPipe::parse_str(&rendered).unwrap();
        assert_eq!(rendered, reparsed.to_string());
    }
}
