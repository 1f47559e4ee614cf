//! `values(...)` stats function

use crate::block::BlockResult;
use crate::error::Result;
use crate::lexer::Lexer;
use crate::stats::{fields_string, is_star, parse_stats_func_fields};
use std::fmt;
use std::mem::size_of;

/// Collects every value of the listed fields in encounter order, duplicates
/// and empty values included, as a JSON array.
#[derive(Debug, Clone)]
pub struct StatsValues {
    pub(crate) fields: Vec<String>,
}

impl StatsValues {
    pub(crate) fn parse(lex: &mut Lexer) -> Result<StatsValues> {
        Ok(StatsValues {
            fields: parse_stats_func_fields(lex, "values")?,
        })
    }
}

impl fmt::Display for StatsValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "values({})", fields_string(&self.fields))
    }
}

#[derive(Debug)]
pub struct ValuesTracker {
    fields: Vec<String>,
    values: Vec<String>,
}

impl ValuesTracker {
    pub(crate) fn new(sf: &StatsValues) -> ValuesTracker {
        ValuesTracker {
            fields: sf.fields.clone(),
            values: Vec::new(),
        }
    }

    pub(crate) fn update_for_all_rows(&mut self, br: &BlockResult) -> i64 {
        let mut state_size_increase = 0;
        if is_star(&self.fields) {
            for c in br.columns() {
                for row in 0..br.rows_len() {
                    state_size_increase += self.add_value(c.get_value_at_row(row));
                }
            }
        } else {
            for field in self.fields.clone() {
                for row in 0..br.rows_len() {
                    state_size_increase += self.add_value(br.get_value(&field, row));
                }
            }
        }
        state_size_increase
    }

    pub(crate) fn update_for_row(&mut self, br: &BlockResult, row_idx: usize) -> i64 {
        let mut state_size_increase = 0;
        if is_star(&self.fields) {
            for c in br.columns() {
                state_size_increase += self.add_value(c.get_value_at_row(row_idx));
            }
        } else {
            for field in self.fields.clone() {
                state_size_increase += self.add_value(br.get_value(&field, row_idx));
            }
        }
        state_size_increase
    }

    fn add_value(&mut self, v: &str) -> i64 {
        self.values.push(v.to_string());
        (v.len() + size_of::<String>()) as i64
    }

    pub(crate) fn merge(&mut self, other: ValuesTracker) {
        self.values.extend(other.values);
    }

    pub(crate) fn finalize(&self) -> String {
        let arr: Vec<serde_json::Value> = self
            .values
            .iter()
            .map(|v| serde_json::Value::String(v.clone()))
            .collect();
        serde_json::Value::Array(arr).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Column;

    #[test]
    fn test_values_keeps_duplicates_and_order() {
        let br = BlockResult::new(
            3,
            vec![Column::new(
                "v",
                vec!["b".into(), "a".into(), "b".into()],
            )],
        );
        let sf = StatsValues {
            fields: vec!["v".to_string()],
        };
        let mut t = ValuesTracker::new(&sf);
        t.update_for_all_rows(&br);
        assert_eq!(t.finalize(), r#"["b","a","b"]"#);
    }

    #[test]
    fn test_empty_input() {
        let sf = StatsValues {
            fields: vec!["v".to_string()],
        };
        let t = ValuesTracker::new(&sf);
        assert_eq!(t.finalize(), "[]");
    }
}
