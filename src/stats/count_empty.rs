//! `count_empty(...)` stats function

use crate::block::BlockResult;
use crate::error::Result;
use crate::lexer::Lexer;
use crate::stats::{fields_string, is_star, parse_stats_func_fields};
use std::fmt;

/// Counts rows where every listed field is empty.
#[derive(Debug, Clone)]
pub struct StatsCountEmpty {
    pub(crate) fields: Vec<String>,
}

impl StatsCountEmpty {
    pub(crate) fn parse(lex: &mut Lexer) -> Result<StatsCountEmpty> {
        Ok(StatsCountEmpty {
            fields: parse_stats_func_fields(lex, "count_empty")?,
        })
    }
}

impl fmt::Display for StatsCountEmpty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "count_empty({})", fields_string(&self.fields))
    }
}

#[derive(Debug)]
pub struct CountEmptyTracker {
    fields: Vec<String>,
    rows: u64,
}

impl CountEmptyTracker {
    pub(crate) fn new(sf: &StatsCountEmpty) -> CountEmptyTracker {
        CountEmptyTracker {
            fields: sf.fields.clone(),
            rows: 0,
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
        let all_empty = if is_star(&self.fields) {
            br.columns()
                .iter()
                .all(|c| c.get_value_at_row(row).is_empty())
        } else {
            self.fields.iter().all(|f| br.get_value(f, row).is_empty())
        };
        if all_empty {
            self.rows += 1;
        }
    }

    pub(crate) fn merge(&mut self, other: CountEmptyTracker) {
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

    #[test]
    fn test_count_empty() {
        let br = BlockResult::new(
            3,
            vec![
                Column::new("a", vec!["x".into(), "".into(), "".into()]),
                Column::new("b", vec!["".into(), "y".into(), "".into()]),
            ],
        );
        let sf = StatsCountEmpty {
            fields: vec!["a".to_string(), "b".to_string()],
        };
        let mut t = CountEmptyTracker::new(&sf);
        t.update_for_all_rows(&br);
        assert_eq!(t.finalize(), "1");

        let star = StatsCountEmpty {
            fields: vec!["*".to_string()],
        };
        let mut t = CountEmptyTracker::new(&star);
        t.update_for_all_rows(&br);
        assert_eq!(t.finalize(), "1");
    }
}
