//! `row_any(...)` stats function

use crate::block::BlockResult;
use crate::error::Result;
use crate::lexer::Lexer;
use crate::stats::{fields_string, is_star, parse_stats_func_fields};
use std::fmt;
use std::mem::size_of;

/// Captures one arbitrary row per group (the first seen) as a JSON object
/// of `{field: value}` pairs.
#[derive(Debug, Clone)]
pub struct StatsRowAny {
    pub(crate) fields: Vec<String>,
}

impl StatsRowAny {
    pub(crate) fn parse(lex: &mut Lexer) -> Result<StatsRowAny> {
        Ok(StatsRowAny {
            fields: parse_stats_func_fields(lex, "row_any")?,
        })
    }
}

impl fmt::Display for StatsRowAny {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row_any({})", fields_string(&self.fields))
    }
}

#[derive(Debug)]
pub struct RowAnyTracker {
    fields: Vec<String>,
    captured: bool,
    row: Vec<(String, String)>,
}

impl RowAnyTracker {
    pub(crate) fn new(sf: &StatsRowAny) -> RowAnyTracker {
        RowAnyTracker {
            fields: sf.fields.clone(),
            captured: false,
            row: Vec::new(),
        }
    }

    pub(crate) fn update_for_all_rows(&mut self, br: &BlockResult) -> i64 {
        if br.rows_len() == 0 || self.captured {
            return 0;
        }
        self.capture(br, 0)
    }

    pub(crate) fn update_for_row(&mut self, br: &BlockResult, row_idx: usize) -> i64 {
        if self.captured {
            return 0;
        }
        self.capture(br, row_idx)
    }

    fn capture(&mut self, br: &BlockResult, row: usize) -> i64 {
        self.captured = true;
        let mut state_size_increase = 0;
        if is_star(&self.fields) {
            for c in br.columns() {
                let v = c.get_value_at_row(row);
                state_size_increase += c.name().len() + v.len() + 2 * size_of::<String>();
                self.row.push((c.name().to_string(), v.to_string()));
            }
        } else {
            for field in &self.fields {
                let v = br.get_value(field, row);
                state_size_increase += field.len() + v.len() + 2 * size_of::<String>();
                self.row.push((field.clone(), v.to_string()));
            }
        }
        state_size_increase as i64
    }

    pub(crate) fn merge(&mut self, other: RowAnyTracker) {
        if !self.captured && other.captured {
            self.captured = true;
            self.row = other.row;
        }
    }

    pub(crate) fn finalize(&self) -> String {
        let mut obj = serde_json::Map::new();
        for (name, value) in &self.row {
            obj.insert(name.clone(), serde_json::Value::String(value.clone()));
        }
        serde_json::Value::Object(obj).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Column;

    fn block() -> BlockResult {
        BlockResult::new(
            2,
            vec![
                Column::new("host", vec!["a".into(), "b".into()]),
                Column::new("level", vec!["info".into(), "warn".into()]),
            ],
        )
    }

    #[test]
    fn test_captures_first_row_only() {
        let sf = StatsRowAny {
            fields: vec!["*".to_string()],
        };
        let mut t = RowAnyTracker::new(&sf);
        t.update_for_all_rows(&block());
        t.update_for_all_rows(&block());
        assert_eq!(t.finalize(), r#"{"host":"a","level":"info"}"#);
    }

    #[test]
    fn test_listed_fields() {
        let sf = StatsRowAny {
            fields: vec!["level".to_string()],
        };
        let mut t = RowAnyTracker::new(&sf);
        t.update_for_row(&block(), 1);
        assert_eq!(t.finalize(), r#"{"level":"warn"}"#);
    }

    #[test]
    fn test_empty_input() {
        let sf = StatsRowAny {
            fields: vec!["*".to_string()],
        };
        let t = RowAnyTracker::new(&sf);
        assert_eq!(t.finalize(), "{}");
    }

    #[test]
    fn test_merge_takes_captured_side() {
        let sf = StatsRowAny {
            fields: vec!["*".to_string()],
        };
        let mut a = RowAnyTracker::new(&sf);
        let mut b = RowAnyTracker::new(&sf);
        b.update_for_all_rows(&block());
        a.merge(b);
        assert_eq!(a.finalize(), r#"{"host":"a","level":"info"}"#);
    }
}
