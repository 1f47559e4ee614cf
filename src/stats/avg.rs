//! `avg(...)` stats function

use crate::block::BlockResult;
use crate::error::Result;
use crate::lexer::Lexer;
use crate::stats::{fields_string, is_star, parse_stats_func_fields};
use crate::values::{format_float, try_parse_float};
use std::fmt;

/// Arithmetic mean over the numeric parses of the listed field values.
/// Produces `nan` when no numeric value was seen.
#[derive(Debug, Clone)]
pub struct StatsAvg {
    pub(crate) fields: Vec<String>,
}

impl StatsAvg {
    pub(crate) fn parse(lex: &mut Lexer) -> Result<StatsAvg> {
        Ok(StatsAvg {
            fields: parse_stats_func_fields(lex, "avg")?,
        })
    }
}

impl fmt::Display for StatsAvg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "avg({})", fields_string(&self.fields))
    }
}

#[derive(Debug)]
pub struct AvgTracker {
    fields: Vec<String>,
    sum: f64,
    count: u64,
}

impl AvgTracker {
    pub(crate) fn new(sf: &StatsAvg) -> AvgTracker {
        AvgTracker {
            fields: sf.fields.clone(),
            sum: 0.0,
            count: 0,
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
                self.add_value(c.get_value_at_row(row));
            }
        } else {
            for field in self.fields.clone() {
                self.add_value(br.get_value(&field, row));
            }
        }
    }

    fn add_value(&mut self, v: &str) {
        if let Some(f) = try_parse_float(v) {
            self.sum += f;
            self.count += 1;
        }
    }

    pub(crate) fn merge(&mut self, other: AvgTracker) {
        self.sum += other.sum;
        self.count += other.count;
    }

    pub(crate) fn finalize(&self) -> String {
        if self.count == 0 {
            return "nan".to_string();
        }
        format_float(self.sum / self.count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Column;

    #[test]
    fn test_avg() {
        let br = BlockResult::new(
            4,
            vec![Column::new(
                "v",
                vec!["1".into(), "2".into(), "x".into(), "3".into()],
            )],
        );
        let sf = StatsAvg {
            fields: vec!["v".to_string()],
        };
        let mut t = AvgTracker::new(&sf);
        t.update_for_all_rows(&br);
        assert_eq!(t.finalize(), "2");
    }

    #[test]
    fn test_avg_empty_is_nan() {
        let sf = StatsAvg {
            fields: vec!["v".to_string()],
        };
        let t = AvgTracker::new(&sf);
        assert_eq!(t.finalize(), "nan");
    }
}
