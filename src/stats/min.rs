//! `min(...)` stats function

use crate::block::BlockResult;
use crate::error::Result;
use crate::lexer::Lexer;
use crate::stats::{fields_string, is_star, parse_stats_func_fields};
use crate::values::less_value;
use std::fmt;

/// Smallest value of the listed fields: numeric comparison when both sides
/// parse as numbers, lexicographic otherwise. Empty values are ignored; the
/// result for empty input is the empty string.
#[derive(Debug, Clone)]
pub struct StatsMin {
    pub(crate) fields: Vec<String>,
}

impl StatsMin {
    pub(crate) fn parse(lex: &mut Lexer) -> Result<StatsMin> {
        Ok(StatsMin {
            fields: parse_stats_func_fields(lex, "min")?,
        })
    }
}

impl fmt::Display for StatsMin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "min({})", fields_string(&self.fields))
    }
}

#[derive(Debug)]
pub struct MinTracker {
    fields: Vec<String>,
    min: Option<String>,
}

impl MinTracker {
    pub(crate) fn new(sf: &StatsMin) -> MinTracker {
        MinTracker {
            fields: sf.fields.clone(),
            min: None,
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
        if v.is_empty() {
            return 0;
        }
        match &self.min {
            Some(cur) if !less_value(v, cur) => 0,
            _ => {
                let old_len = self.min.as_ref().map_or(0, String::len) as i64;
                self.min = Some(v.to_string());
                v.len() as i64 - old_len
            }
        }
    }

    pub(crate) fn merge(&mut self, other: MinTracker) {
        if let Some(v) = other.min {
            self.add_value(&v);
        }
    }

    pub(crate) fn finalize(&self) -> String {
        self.min.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Column;

    #[test]
    fn test_min_numeric() {
        let br = BlockResult::new(
            3,
            vec![Column::new("v", vec!["10".into(), "2".into(), "30".into()])],
        );
        let sf = StatsMin {
            fields: vec!["v".to_string()],
        };
        let mut t = MinTracker::new(&sf);
        t.update_for_all_rows(&br);
        assert_eq!(t.finalize(), "2");
    }

    #[test]
    fn test_min_lexicographic_with_non_numeric() {
        let br = BlockResult::new(
            3,
            vec![Column::new(
                "v",
                vec!["banana".into(), "apple".into(), "10".into()],
            )],
        );
        let sf = StatsMin {
            fields: vec!["v".to_string()],
        };
        let mut t = MinTracker::new(&sf);
        t.update_for_all_rows(&br);
        assert_eq!(t.finalize(), "10");
    }

    #[test]
    fn test_min_empty_input() {
        let sf = StatsMin {
            fields: vec!["v".to_string()],
        };
        let t = MinTracker::new(&sf);
        assert_eq!(t.finalize(), "");
    }
}
