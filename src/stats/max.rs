//! `max(...)` stats function

use crate::block::BlockResult;
use crate::error::Result;
use crate::lexer::Lexer;
use crate::stats::{fields_string, is_star, parse_stats_func_fields};
use crate::values::less_value;
use std::fmt;

/// Largest value of the listed fields, with the same comparison rules as
/// `min`.
#[derive(Debug, Clone)]
pub struct StatsMax {
    pub(crate) fields: Vec<String>,
}

impl StatsMax {
    pub(crate) fn parse(lex: &mut Lexer) -> Result<StatsMax> {
        Ok(StatsMax {
            fields: parse_stats_func_fields(lex, "max")?,
        })
    }
}

impl fmt::Display for StatsMax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "max({})", fields_string(&self.fields))
    }
}

#[derive(Debug)]
pub struct MaxTracker {
    fields: Vec<String>,
    max: Option<String>,
}

impl MaxTracker {
    pub(crate) fn new(sf: &StatsMax) -> MaxTracker {
        MaxTracker {
            fields: sf.fields.clone(),
            max: None,
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
        match &self.max {
            Some(cur) if !less_value(cur, v) => 0,
            _ => {
                let old_len = self.max.as_ref().map_or(0, String::len) as i64;
                self.max = Some(v.to_string());
                v.len() as i64 - old_len
            }
        }
    }

    pub(crate) fn merge(&mut self, other: MaxTracker) {
        if let Some(v) = other.max {
            self.add_value(&v);
        }
    }

    pub(crate) fn finalize(&self) -> String {
        self.max.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Column;

    #[test]
    fn test_max_numeric() {
        let br = BlockResult::new(
            3,
            vec![Column::new("v", vec!["10".into(), "2".into(), "9".into()])],
        );
        let sf = StatsMax {
            fields: vec!["v".to_string()],
        };
        let mut t = MaxTracker::new(&sf);
        t.update_for_all_rows(&br);
        assert_eq!(t.finalize(), "10");
    }

    #[test]
    fn test_max_merge() {
        let sf = StatsMax {
            fields: vec!["v".to_string()],
        };
        let mut a = MaxTracker::new(&sf);
        let mut b = MaxTracker::new(&sf);
        a.add_value("5");
        b.add_value("12");
        a.merge(b);
        assert_eq!(a.finalize(), "12");
    }
}
