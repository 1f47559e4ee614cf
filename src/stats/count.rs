//! `count(...)` stats function

use crate::block::BlockResult;
use crate::error::Result;
use crate::lexer::Lexer;
use crate::stats::{fields_string, is_star, parse_stats_func_fields};
use std::fmt;

/// Counts rows where at least one of the listed fields is non-empty, or all
/// rows when called as `count(*)`.
#[derive(Debug, Clone)]
pub struct StatsCount {
    pub(crate) fields: Vec<String>,
}

impl StatsCount {
    pub(crate) fn parse(lex: &mut Lexer) -> Result<StatsCount> {
        Ok(StatsCount {
            fields: parse_stats_func_fields(lex, "count")?,
        })
    }
}

impl fmt::Display for StatsCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "count({})", fields_string(&self.fields))
    }
}

#[derive(Debug)]
pub struct CountTracker {
    fields: Vec<String>,
    rows: u64,
}

impl CountTracker {
    pub(crate) fn new(sf: &StatsCount) -> CountTracker {
        CountTracker {
            fields: sf.fields.clone(),
            rows: 0,
        }
    }

    pub(crate) fn update_for_all_rows(&mut self, br: &BlockResult) -> i64 {
        if is_star(&self.fields) {
            self.rows += br.rows_len() as u64;
            return 0;
        }
        for row in 0..br.rows_len() {
            self.update_row(br, row);
        }
        0
    }

    pub(crate) fn update_for_row(&mut self, br: &BlockResult, row_idx: usize) -> i64 {
        if is_star(&self.fields) {
            self.rows += 1;
            return 0;
        }
        self.update_row(br, row_idx);
        0
    }

    fn update_row(&mut self, br: &BlockResult, row: usize) {
        if self
            .fields
            .iter()
            .any(|f| !br.get_value(f, row).is_empty())
        {
            self.rows += 1;
        }
    }

    pub(crate) fn merge(&mut self, other: CountTracker) {
        self.rows += other.rows;
    }

    pub(crate) fn finalize(&self) -> String {
        self.rows.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Column;

    fn block() -> BlockResult {
        BlockResult::new(
            3,
            vec![
                Column::new("a", vec!["x".into(), "".into(), "".into()]),
                Column::new("b", vec!["".into(), "y".into(), "".into()]),
            ],
        )
    }

    #[test]
    fn test_count_star() {
        let sf = StatsCount {
            fields: vec!["*".to_string()],
        };
        let mut t = CountTracker::new(&sf);
        t.update_for_all_rows(&block());
        assert_eq!(t.finalize(), "3");
    }

    #[test]
    fn test_count_fields_skips_all_empty_rows() {
        let sf = StatsCount {
            fields: vec!["a".to_string(), "b".to_string()],
        };
        let mut t = CountTracker::new(&sf);
        t.update_for_all_rows(&block());
        assert_eq!(t.finalize(), "2");
    }

    #[test]
    fn test_merge() {
        let sf = StatsCount {
            fields: vec!["*".to_string()],
        };
        let mut a = CountTracker::new(&sf);
        let mut b = CountTracker::new(&sf);
        a.update_for_all_rows(&block());
        b.update_for_row(&block(), 0);
        a.merge(b);
        assert_eq!(a.finalize(), "4");
    }

    #[test]
    fn test_empty_input() {
        let sf = StatsCount {
            fields: vec!["*".to_string()],
        };
        let t = CountTracker::new(&sf);
        assert_eq!(t.finalize(), "0");
    }
}
