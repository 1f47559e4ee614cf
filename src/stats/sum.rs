//! `sum(...)` stats function

use crate::block::BlockResult;
use crate::error::Result;
use crate::lexer::Lexer;
use crate::stats::{fields_string, is_star, parse_stats_func_fields};
use crate::values::{format_float, try_parse_float};
use std::fmt;

/// Sums the numeric parses of the listed field values. Non-numeric values
/// contribute nothing.
#[derive(Debug, Clone)]
pub struct StatsSum {
    pub(crate) fields: Vec<String>,
}

impl StatsSum {
    pub(crate) fn parse(lex: &mut Lexer) -> Result<StatsSum> {
        Ok(StatsSum {
            fields: parse_stats_func_fields(lex, "sum")?,
        })
    }
}

impl fmt::Display for StatsSum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sum({})", fields_string(&self.fields))
    }
}

#[derive(Debug)]
pub struct SumTracker {
    fields: Vec<String>,
    sum: f64,
}

impl SumTracker {
    pub(crate) fn new(sf: &StatsSum) -> SumTracker {
        SumTracker {
            fields: sf.fields.clone(),
            sum: 0.0,
        }
    }

    pub(crate) fn update_for_all_rows(&mut self, br: &BlockResult) -> i64 {
        for row in 0..br.rows_len() {
            self.update_row(br, row);
        }
        0
    }

    pub(crate) fn update_for_row(&mut self, br: &BlockResult, row_idx: usize) -> i64 {
        self.update_row(br, row_idx);
        0
    }

    fn update_row(&mut self, br: &BlockResult, row: usize) {
        if is_star(&self.fields) {
            for c in br.columns() {
                if let Some(f) = try_parse_float(c.get_value_at_row(row)) {
                    self.sum += f;
                }
            }
        } else {
            for field in &self.fields {
                if let Some(f) = try_parse_float(br.get_value(field, row)) {
                    self.sum += f;
                }
            }
        }
    }

    pub(crate) fn merge(&mut self, other: SumTracker) {
        self.sum += other.sum;
    }

    pub(crate) fn finalize(&self) -> String {
        format_float(self.sum)
    }
}
