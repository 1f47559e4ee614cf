//! `count_uniq(...)` stats function

use crate::block::BlockResult;
use crate::encoding::marshal_bytes;
use crate::error::Result;
use crate::lexer::Lexer;
use crate::stats::{fields_string, is_star, parse_stats_func_fields};
use hashbrown::HashSet;
use std::fmt;
use std::mem::size_of;

/// Counts the number of distinct tuples of the listed fields.
///
/// Distinct tuples are held in full; memory use is bounded only by the
/// state-size budget of the owning processor.
#[derive(Debug, Clone)]
pub struct StatsCountUniq {
    pub(crate) fields: Vec<String>,
}

impl StatsCountUniq {
    pub(crate) fn parse(lex: &mut Lexer) -> Result<StatsCountUniq> {
        Ok(StatsCountUniq {
            fields: parse_stats_func_fields(lex, "count_uniq")?,
        })
    }
}

impl fmt::Display for StatsCountUniq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "count_uniq({})", fields_string(&self.fields))
    }
}

#[derive(Debug)]
pub struct CountUniqTracker {
    fields: Vec<String>,
    m: HashSet<Vec<u8>>,
}

impl CountUniqTracker {
    pub(crate) fn new(sf: &StatsCountUniq) -> CountUniqTracker {
        CountUniqTracker {
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
        let mut key = Vec::new();
        let mut all_empty = true;
        if is_star(&self.fields) {
            for c in br.columns() {
                let v = c.get_value_at_row(row);
                all_empty = all_empty && v.is_empty();
                marshal_bytes(&mut key, c.name().as_bytes());
                marshal_bytes(&mut key, v.as_bytes());
            }
        } else {
            for f in &self.fields {
                let v = br.get_value(f, row);
                all_empty = all_empty && v.is_empty();
                marshal_bytes(&mut key, v.as_bytes());
            }
        }
        // A tuple with no values at all does not count as a distinct entry.
        if all_empty {
            return 0;
        }
        if self.m.contains(&key) {
            return 0;
        }
        let delta = (key.len() + size_of::<Vec<u8>>()) as i64;
        self.m.insert(key);
        delta
    }

    pub(crate) fn merge(&mut self, other: CountUniqTracker) {
        for key in other.m {
            self.m.insert(key);
        }
    }

    pub(crate) fn finalize(&self) -> String {
        self.m.len().to_string()
    }
}
