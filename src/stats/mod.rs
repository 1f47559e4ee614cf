//! Stats functions and their per-group state
//!
//! Each stats function has two halves: the parsed plan side ([`StatsFunc`])
//! and the per-group accumulator side ([`StatsTracker`]). Trackers expose
//! four operations — update for a whole block, update for one row, merge
//! with a peer from another shard, and finalize into the result string.
//! Updates report the growth in state bytes they caused so the shard can
//! charge it against the memory budget.

mod avg;
mod count;
mod count_empty;
mod count_uniq;
mod max;
mod min;
mod quantile;
mod row_any;
mod sum;
mod sum_len;
mod uniq_values;
mod values;

pub use avg::{AvgTracker, StatsAvg};
pub use count::{CountTracker, StatsCount};
pub use count_empty::{CountEmptyTracker, StatsCountEmpty};
pub use count_uniq::{CountUniqTracker, StatsCountUniq};
pub use max::{MaxTracker, StatsMax};
pub use min::{MinTracker, StatsMin};
pub use quantile::{QuantileTracker, StatsMedian, StatsQuantile};
pub use row_any::{RowAnyTracker, StatsRowAny};
pub use sum::{StatsSum, SumTracker};
pub use sum_len::{StatsSumLen, SumLenTracker};
pub use uniq_values::{StatsUniqValues, UniqValuesTracker};
pub use values::{StatsValues, ValuesTracker};

use crate::block::BlockResult;
use crate::error::Result;
use crate::lexer::{get_canonical_column_name, quote_token_if_needed, Lexer};
use crate::pipe::FieldsSet;
use std::fmt;
use std::mem::size_of;

/// A parsed stats function from the query plan.
#[derive(Debug, Clone)]
pub enum StatsFunc {
    Count(StatsCount),
    CountEmpty(StatsCountEmpty),
    CountUniq(StatsCountUniq),
    Sum(StatsSum),
    SumLen(StatsSumLen),
    Avg(StatsAvg),
    Min(StatsMin),
    Max(StatsMax),
    Quantile(StatsQuantile),
    Median(StatsMedian),
    UniqValues(StatsUniqValues),
    Values(StatsValues),
    RowAny(StatsRowAny),
}

impl StatsFunc {
    /// Parse a stats function call from the lexer, dispatching on the
    /// function name.
    pub fn parse(lex: &mut Lexer) -> Result<StatsFunc> {
        if lex.is_keyword(&["count"]) {
            return Ok(StatsFunc::Count(StatsCount::parse(lex)?));
        }
        if lex.is_keyword(&["count_empty"]) {
            return Ok(StatsFunc::CountEmpty(StatsCountEmpty::parse(lex)?));
        }
        if lex.is_keyword(&["count_uniq"]) {
            return Ok(StatsFunc::CountUniq(StatsCountUniq::parse(lex)?));
        }
        if lex.is_keyword(&["sum"]) {
            return Ok(StatsFunc::Sum(StatsSum::parse(lex)?));
        }
        if lex.is_keyword(&["sum_len"]) {
            return Ok(StatsFunc::SumLen(StatsSumLen::parse(lex)?));
        }
        if lex.is_keyword(&["avg"]) {
            return Ok(StatsFunc::Avg(StatsAvg::parse(lex)?));
        }
        if lex.is_keyword(&["min"]) {
            return Ok(StatsFunc::Min(StatsMin::parse(lex)?));
        }
        if lex.is_keyword(&["max"]) {
            return Ok(StatsFunc::Max(StatsMax::parse(lex)?));
        }
        if lex.is_keyword(&["quantile"]) {
            return Ok(StatsFunc::Quantile(StatsQuantile::parse(lex)?));
        }
        if lex.is_keyword(&["median"]) {
            return Ok(StatsFunc::Median(StatsMedian::parse(lex)?));
        }
        if lex.is_keyword(&["uniq_values"]) {
            return Ok(StatsFunc::UniqValues(StatsUniqValues::parse(lex)?));
        }
        if lex.is_keyword(&["values"]) {
            return Ok(StatsFunc::Values(StatsValues::parse(lex)?));
        }
        if lex.is_keyword(&["row_any"]) {
            return Ok(StatsFunc::RowAny(StatsRowAny::parse(lex)?));
        }
        Err(lex.error("unknown stats function"))
    }

    /// The input fields this function reads (`["*"]` means all).
    pub fn fields(&self) -> &[String] {
        match self {
            StatsFunc::Count(sf) => &sf.fields,
            StatsFunc::CountEmpty(sf) => &sf.fields,
            StatsFunc::CountUniq(sf) => &sf.fields,
            StatsFunc::Sum(sf) => &sf.fields,
            StatsFunc::SumLen(sf) => &sf.fields,
            StatsFunc::Avg(sf) => &sf.fields,
            StatsFunc::Min(sf) => &sf.fields,
            StatsFunc::Max(sf) => &sf.fields,
            StatsFunc::Quantile(sf) => &sf.fields,
            StatsFunc::Median(sf) => &sf.fields,
            StatsFunc::UniqValues(sf) => &sf.fields,
            StatsFunc::Values(sf) => &sf.fields,
            StatsFunc::RowAny(sf) => &sf.fields,
        }
    }

    pub fn update_needed_fields(&self, needed: &mut FieldsSet) {
        needed.add_fields(self.fields());
    }

    /// Create a fresh tracker for one group. Returns the tracker together
    /// with its initial state size in bytes.
    pub fn new_tracker(&self) -> (StatsTracker, i64) {
        let tracker = match self {
            StatsFunc::Count(sf) => StatsTracker::Count(CountTracker::new(sf)),
            StatsFunc::CountEmpty(sf) => StatsTracker::CountEmpty(CountEmptyTracker::new(sf)),
            StatsFunc::CountUniq(sf) => StatsTracker::CountUniq(CountUniqTracker::new(sf)),
            StatsFunc::Sum(sf) => StatsTracker::Sum(SumTracker::new(sf)),
            StatsFunc::SumLen(sf) => StatsTracker::SumLen(SumLenTracker::new(sf)),
            StatsFunc::Avg(sf) => StatsTracker::Avg(AvgTracker::new(sf)),
            StatsFunc::Min(sf) => StatsTracker::Min(MinTracker::new(sf)),
            StatsFunc::Max(sf) => StatsTracker::Max(MaxTracker::new(sf)),
            StatsFunc::Quantile(sf) => StatsTracker::Quantile(QuantileTracker::new(sf.phi, &sf.fields)),
            StatsFunc::Median(sf) => StatsTracker::Quantile(QuantileTracker::new(0.5, &sf.fields)),
            StatsFunc::UniqValues(sf) => StatsTracker::UniqValues(UniqValuesTracker::new(sf)),
            StatsFunc::Values(sf) => StatsTracker::Values(ValuesTracker::new(sf)),
            StatsFunc::RowAny(sf) => StatsTracker::RowAny(RowAnyTracker::new(sf)),
        };
        let size = size_of::<StatsTracker>() as i64 + fields_size(self.fields());
        (tracker, size)
    }
}

impl fmt::Display for StatsFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsFunc::Count(sf) => sf.fmt(f),
            StatsFunc::CountEmpty(sf) => sf.fmt(f),
            StatsFunc::CountUniq(sf) => sf.fmt(f),
            StatsFunc::Sum(sf) => sf.fmt(f),
            StatsFunc::SumLen(sf) => sf.fmt(f),
            StatsFunc::Avg(sf) => sf.fmt(f),
            StatsFunc::Min(sf) => sf.fmt(f),
            StatsFunc::Max(sf) => sf.fmt(f),
            StatsFunc::Quantile(sf) => sf.fmt(f),
            StatsFunc::Median(sf) => sf.fmt(f),
            StatsFunc::UniqValues(sf) => sf.fmt(f),
            StatsFunc::Values(sf) => sf.fmt(f),
            StatsFunc::RowAny(sf) => sf.fmt(f),
        }
    }
}

/// Per-group accumulator state for one stats function.
///
/// All methods are called from a single thread at a time: from the owning
/// worker during the write phase, from the merge thread afterwards.
#[derive(Debug)]
pub enum StatsTracker {
    Count(CountTracker),
    CountEmpty(CountEmptyTracker),
    CountUniq(CountUniqTracker),
    Sum(SumTracker),
    SumLen(SumLenTracker),
    Avg(AvgTracker),
    Min(MinTracker),
    Max(MaxTracker),
    Quantile(QuantileTracker),
    UniqValues(UniqValuesTracker),
    Values(ValuesTracker),
    RowAny(RowAnyTracker),
}

impl StatsTracker {
    /// Update state with every row of `br`; returns the state-size delta in
    /// bytes.
    pub fn update_for_all_rows(&mut self, br: &BlockResult) -> i64 {
        match self {
            StatsTracker::Count(t) => t.update_for_all_rows(br),
            StatsTracker::CountEmpty(t) => t.update_for_all_rows(br),
            StatsTracker::CountUniq(t) => t.update_for_all_rows(br),
            StatsTracker::Sum(t) => t.update_for_all_rows(br),
            StatsTracker::SumLen(t) => t.update_for_all_rows(br),
            StatsTracker::Avg(t) => t.update_for_all_rows(br),
            StatsTracker::Min(t) => t.update_for_all_rows(br),
            StatsTracker::Max(t) => t.update_for_all_rows(br),
            StatsTracker::Quantile(t) => t.update_for_all_rows(br),
            StatsTracker::UniqValues(t) => t.update_for_all_rows(br),
            StatsTracker::Values(t) => t.update_for_all_rows(br),
            StatsTracker::RowAny(t) => t.update_for_all_rows(br),
        }
    }

    /// Update state with the row at `row_idx`; returns the state-size delta
    /// in bytes.
    pub fn update_for_row(&mut self, br: &BlockResult, row_idx: usize) -> i64 {
        match self {
            StatsTracker::Count(t) => t.update_for_row(br, row_idx),
            StatsTracker::CountEmpty(t) => t.update_for_row(br, row_idx),
            StatsTracker::CountUniq(t) => t.update_for_row(br, row_idx),
            StatsTracker::Sum(t) => t.update_for_row(br, row_idx),
            StatsTracker::SumLen(t) => t.update_for_row(br, row_idx),
            StatsTracker::Avg(t) => t.update_for_row(br, row_idx),
            StatsTracker::Min(t) => t.update_for_row(br, row_idx),
            StatsTracker::Max(t) => t.update_for_row(br, row_idx),
            StatsTracker::Quantile(t) => t.update_for_row(br, row_idx),
            StatsTracker::UniqValues(t) => t.update_for_row(br, row_idx),
            StatsTracker::Values(t) => t.update_for_row(br, row_idx),
            StatsTracker::RowAny(t) => t.update_for_row(br, row_idx),
        }
    }

    /// Fold another tracker of the same concrete type into self. Merging is
    /// associative and commutative, so shard order does not matter.
    pub fn merge(&mut self, other: StatsTracker) {
        match (self, other) {
            (StatsTracker::Count(a), StatsTracker::Count(b)) => a.merge(b),
            (StatsTracker::CountEmpty(a), StatsTracker::CountEmpty(b)) => a.merge(b),
            (StatsTracker::CountUniq(a), StatsTracker::CountUniq(b)) => a.merge(b),
            (StatsTracker::Sum(a), StatsTracker::Sum(b)) => a.merge(b),
            (StatsTracker::SumLen(a), StatsTracker::SumLen(b)) => a.merge(b),
            (StatsTracker::Avg(a), StatsTracker::Avg(b)) => a.merge(b),
            (StatsTracker::Min(a), StatsTracker::Min(b)) => a.merge(b),
            (StatsTracker::Max(a), StatsTracker::Max(b)) => a.merge(b),
            (StatsTracker::Quantile(a), StatsTracker::Quantile(b)) => a.merge(b),
            (StatsTracker::UniqValues(a), StatsTracker::UniqValues(b)) => a.merge(b),
            (StatsTracker::Values(a), StatsTracker::Values(b)) => a.merge(b),
            (StatsTracker::RowAny(a), StatsTracker::RowAny(b)) => a.merge(b),
            (a, b) => panic!("BUG: cannot merge mismatched trackers {a:?} and {b:?}"),
        }
    }

    /// Produce the textual result for this tracker's group.
    pub fn finalize(&self) -> String {
        match self {
            StatsTracker::Count(t) => t.finalize(),
            StatsTracker::CountEmpty(t) => t.finalize(),
            StatsTracker::CountUniq(t) => t.finalize(),
            StatsTracker::Sum(t) => t.finalize(),
            StatsTracker::SumLen(t) => t.finalize(),
            StatsTracker::Avg(t) => t.finalize(),
            StatsTracker::Min(t) => t.finalize(),
            StatsTracker::Max(t) => t.finalize(),
            StatsTracker::Quantile(t) => t.finalize(),
            StatsTracker::UniqValues(t) => t.finalize(),
            StatsTracker::Values(t) => t.finalize(),
            StatsTracker::RowAny(t) => t.finalize(),
        }
    }
}

/// Reports whether the field list means "all columns".
pub(crate) fn is_star(fields: &[String]) -> bool {
    fields.len() == 1 && fields[0] == "*"
}

pub(crate) fn fields_size(fields: &[String]) -> i64 {
    fields
        .iter()
        .map(|f| f.len() + size_of::<String>())
        .sum::<usize>() as i64
}

/// Render a field list for the canonical string form: `*` stays bare, other
/// names are quoted when needed.
pub(crate) fn fields_string(fields: &[String]) -> String {
    let rendered: Vec<String> = fields
        .iter()
        .map(|f| {
            if f == "*" {
                f.clone()
            } else {
                quote_token_if_needed(f)
            }
        })
        .collect();
    rendered.join(", ")
}

/// Parse `funcName(field1, ..., fieldN)`. An empty list or a list containing
/// `*` collapses to `["*"]`.
pub(crate) fn parse_stats_func_fields(lex: &mut Lexer, func_name: &str) -> Result<Vec<String>> {
    if !lex.is_keyword(&[func_name]) {
        return Err(lex.error(format!("unexpected func; want {func_name:?}")));
    }
    lex.next_token();
    let mut fields = parse_field_names_in_parens(lex)?;
    if fields.is_empty() || fields.iter().any(|f| f == "*") {
        fields = vec!["*".to_string()];
    }
    Ok(fields)
}

pub(crate) fn parse_field_names_in_parens(lex: &mut Lexer) -> Result<Vec<String>> {
    if !lex.is_keyword(&["("]) {
        return Err(lex.error("missing '('"));
    }
    let mut fields = Vec::new();
    loop {
        lex.next_token();
        if lex.is_keyword(&[")"]) {
            lex.next_token();
            return Ok(fields);
        }
        if lex.is_keyword(&[","]) {
            return Err(lex.error("unexpected ','"));
        }
        fields.push(parse_field_name(lex)?);
        if lex.is_keyword(&[")"]) {
            lex.next_token();
            return Ok(fields);
        }
        if !lex.is_keyword(&[","]) {
            return Err(lex.error("expecting ',' or ')'"));
        }
    }
}

pub(crate) fn parse_field_name(lex: &mut Lexer) -> Result<String> {
    if lex.is_end() {
        return Err(lex.error("missing field name"));
    }
    if lex.is_keyword(&["(", ")", ",", ":", "|"]) {
        return Err(lex.error("unexpected token instead of field name"));
    }
    let name = get_canonical_column_name(lex.token());
    lex.next_token();
    Ok(name)
}
