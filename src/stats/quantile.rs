//! `quantile(...)` and `median(...)` stats functions

use crate::block::BlockResult;
use crate::error::Result;
use crate::lexer::Lexer;
use crate::stats::{
    fields_string, is_star, parse_field_name, parse_stats_func_fields,
};
use crate::values::{format_float, try_parse_float};
use std::fmt;
use std::mem::size_of;

/// Exact phi-quantile with linear interpolation over all observed numeric
/// values.
#[derive(Debug, Clone)]
pub struct StatsQuantile {
    pub(crate) phi: f64,
    pub(crate) phi_str: String,
    pub(crate) fields: Vec<String>,
}

impl StatsQuantile {
    pub(crate) fn parse(lex: &mut Lexer) -> Result<StatsQuantile> {
        if !lex.is_keyword(&["quantile"]) {
            return Err(lex.error("unexpected func; want \"quantile\""));
        }
        lex.next_token();
        if !lex.is_keyword(&["("]) {
            return Err(lex.error("missing '(' after 'quantile'"));
        }
        lex.next_token();

        let phi_str = lex.token().to_string();
        let phi = try_parse_float(&phi_str)
            .ok_or_else(|| lex.error("cannot parse phi for 'quantile'"))?;
        if !(0.0..=1.0).contains(&phi) {
            return Err(lex.error("phi for 'quantile' must be in the range [0..1]"));
        }
        lex.next_token();

        let mut fields = Vec::new();
        loop {
            if lex.is_keyword(&[")"]) {
                lex.next_token();
                break;
            }
            if !lex.is_keyword(&[","]) {
                return Err(lex.error("expecting ',' or ')' in 'quantile' args"));
            }
            lex.next_token();
            fields.push(parse_field_name(lex)?);
        }
        if fields.is_empty() || fields.iter().any(|f| f == "*") {
            fields = vec!["*".to_string()];
        }

        Ok(StatsQuantile {
            phi,
            phi_str,
            fields,
        })
    }
}

impl fmt::Display for StatsQuantile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "quantile({}, {})",
            self.phi_str,
            fields_string(&self.fields)
        )
    }
}

/// `median(...)` is `quantile(0.5, ...)` with its own surface form.
#[derive(Debug, Clone)]
pub struct StatsMedian {
    pub(crate) fields: Vec<String>,
}

impl StatsMedian {
    pub(crate) fn parse(lex: &mut Lexer) -> Result<StatsMedian> {
        Ok(StatsMedian {
            fields: parse_stats_func_fields(lex, "median")?,
        })
    }
}

impl fmt::Display for StatsMedian {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "median({})", fields_string(&self.fields))
    }
}

#[derive(Debug)]
pub struct QuantileTracker {
    phi: f64,
    fields: Vec<String>,
    values: Vec<f64>,
}

impl QuantileTracker {
    pub(crate) fn new(phi: f64, fields: &[String]) -> QuantileTracker {
        QuantileTracker {
            phi,
            fields: fields.to_vec(),
            values: Vec::new(),
        }
    }

    pub(crate) fn update_for_all_rows(&mut self, br: &BlockResult) -> i64 {
        let mut state_size_increase = 0;
        for row in 0..br.rows_len() {
            state_size_increase += self.update_row(br, row);
        }
        state_size_increase
    }

    pub(crate) fn update_for_row(&mut self, br: &BlockResult, row_idx: usize) -> i64 {
        self.update_row(br, row_idx)
    }

    fn update_row(&mut self, br: &BlockResult, row: usize) -> i64 {
        let mut state_size_increase = 0;
        if is_star(&self.fields) {
            for c in br.columns() {
                state_size_increase += self.add_value(c.get_value_at_row(row));
            }
        } else {
            for field in self.fields.clone() {
                state_size_increase += self.add_value(br.get_value(&field, row));
            }
        }
        state_size_increase
    }

    fn add_value(&mut self, v: &str) -> i64 {
        match try_parse_float(v) {
            Some(f) => {
                self.values.push(f);
                size_of::<f64>() as i64
            }
            None => 0,
        }
    }

    pub(crate) fn merge(&mut self, other: QuantileTracker) {
        self.values.extend_from_slice(&other.values);
    }

    pub(crate) fn finalize(&self) -> String {
        if self.values.is_empty() {
            return "nan".to_string();
        }
        let mut sorted = self.values.clone();
        sorted.sort_by(f64::total_cmp);

        let h = self.phi * (sorted.len() - 1) as f64;
        let lo = h.floor() as usize;
        let hi = h.ceil() as usize;
        let q = if lo == hi {
            sorted[lo]
        } else {
            sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
        };
        format_float(q)
    }
}
