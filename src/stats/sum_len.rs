//! `sum_len(...)` stats function

use crate::block::BlockResult;
use crate::error::Result;
use crate::lexer::Lexer;
use crate::stats::{fields_string, is_star, parse_stats_func_fields};
use std::fmt;

/// Sums the byte lengths of the listed field values.
#[derive(Debug, Clone)]
pub struct StatsSumLen {
    pub(crate) fields: Vec<String>,
}

impl StatsSumLen {
    pub(crate) fn parse(lex: &mut Lexer) -> Result<StatsSumLen> {
        Ok(StatsSumLen {
            fields: parse_stats_func_fields(lex, "sum_len")?,
        })
    }
}

impl fmt::Display for StatsSumLen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sum_len({})", fields_string(&self.fields))
    }
}

#[derive(Debug)]
pub struct SumLenTracker {
    fields: Vec<String>,
    n: u64,
}

impl SumLenTracker {
    pub(crate) fn new(sf: &StatsSumLen) -> SumLenTracker {
        SumLenTracker {
            fields: sf.fields.clone(),
            n: 0,
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
                self.n += c.get_value_at_row(row).len() as u64;
            }
        } else {
            for field in &self.fields {
                self.n += br.get_value(field, row).len() as u64;
            }
        }
    }

    pub(crate) fn merge(&mut self, other: SumLenTracker) {
        self.n += other.n;
    }

    pub(crate) fn finalize(&self) -> String {
        self.n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Column;

    #[test]
    fn test_sum_len() {
        let br = BlockResult::new(
            2,
            vec![Column::new("m", vec!["abc".into(), "de".into()])],
        );
        let sf = StatsSumLen {
            fields: vec!["m".to_string()],
        };
        let mut t = SumLenTracker::new(&sf);
        t.update_for_all_rows(&br);
        assert_eq!(t.finalize(), "5");
    }
}
