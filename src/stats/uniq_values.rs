//! `uniq_values(...)` stats function

use crate::block::BlockResult;
use crate::error::Result;
use crate::lexer::Lexer;
use crate::stats::{fields_string, is_star, parse_stats_func_fields};
use crate::values::compare_values;
use hashbrown::HashSet;
use std::fmt;
use std::mem::size_of;

/// Collects the distinct non-empty values of the listed fields and finalizes
/// them as a sorted JSON array.
#[derive(Debug, Clone)]
pub struct StatsUniqValues {
    pub(crate) fields: Vec<String>,
}

impl StatsUniqValues {
    pub(crate) fn parse(lex: &mut Lexer) -> Result<StatsUniqValues> {
        Ok(StatsUniqValues {
            fields: parse_stats_func_fields(lex, "uniq_values")?,
        })
    }
}

impl fmt::Display for StatsUniqValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "uniq_values({})", fields_string(&self.fields))
    }
}

#[derive(Debug)]
pub struct UniqValuesTracker {
    fields: Vec<String>,
    m: HashSet<String>,
}

impl UniqValuesTracker {
    pub(crate) fn new(sf: &StatsUniqValues) -> UniqValuesTracker {
        UniqValuesTracker {
            fields: sf.fields.clone(),
            m: HashSet::new(),
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
        if v.is_empty() || self.m.contains(v) {
            return 0;
        }
        // Values must be copied out of the block; its storage is recycled.
        self.m.insert(v.to_string());
        (v.len() + size_of::<String>()) as i64
    }

    pub(crate) fn merge(&mut self, other: UniqValuesTracker) {
        for v in other.m {
            self.m.insert(v);
        }
    }

    pub(crate) fn finalize(&self) -> String {
        let mut items: Vec<&String> = self.m.iter().collect();
        items.sort_by(|a, b| compare_values(a, b));
        let arr: Vec<serde_json::Value> = items
            .into_iter()
            .map(|v| serde_json::Value::String(v.clone()))
            .collect();
        serde_json::Value::Array(arr).to_string()
    }
}
