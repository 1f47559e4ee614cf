//! Pipe processor contract
//!
//! A pipe processor consumes blocks from a fixed pool of workers via
//! `write_block` and releases its results into the downstream processor when
//! `flush` is called, once, after all workers have drained.

use crate::block::BlockResult;
use crate::error::Result;
use hashbrown::HashSet;
use parking_lot::Mutex;

pub trait PipeProcessor: Send + Sync {
    /// Feed a block to the processor. Must be called only from worker
    /// `worker_id`'s thread; the block is borrowed for the duration of the
    /// call.
    fn write_block(&self, worker_id: usize, br: &BlockResult);

    /// Finish processing and push results downstream.
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Set of field names needed by a pipe, with `*` meaning all fields.
#[derive(Debug, Default)]
pub struct FieldsSet(HashSet<String>);

impl FieldsSet {
    pub fn new() -> FieldsSet {
        FieldsSet::default()
    }

    pub fn add(&mut self, field: &str) {
        self.0.insert(field.to_string());
    }

    pub fn add_fields(&mut self, fields: &[String]) {
        for f in fields {
            self.0.insert(f.clone());
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains("*") || self.0.contains(field)
    }

    /// All field names in sorted order.
    pub fn get_all(&self) -> Vec<String> {
        let mut fields: Vec<String> = self.0.iter().cloned().collect();
        fields.sort_unstable();
        fields
    }
}

/// Downstream sink that records every emitted block. Used by tests and
/// examples as the terminal `ppBase`.
#[derive(Debug, Default)]
pub struct CollectingProcessor {
    blocks: Mutex<Vec<Vec<Vec<(String, String)>>>>,
}

impl CollectingProcessor {
    pub fn new() -> CollectingProcessor {
        CollectingProcessor::default()
    }

    /// Rows of every block received so far, flattened, each row as
    /// `(column name, value)` pairs in schema order.
    pub fn rows(&self) -> Vec<Vec<(String, String)>> {
        self.blocks.lock().iter().flatten().cloned().collect()
    }

    /// Number of blocks received.
    pub fn blocks_len(&self) -> usize {
        self.blocks.lock().len()
    }
}

impl PipeProcessor for CollectingProcessor {
    fn write_block(&self, _worker_id: usize, br: &BlockResult) {
        let mut rows = Vec::with_capacity(br.rows_len());
        for row in 0..br.rows_len() {
            let fields: Vec<(String, String)> = br
                .columns()
                .iter()
                .map(|c| (c.name().to_string(), c.get_value_at_row(row).to_string()))
                .collect();
            rows.push(fields);
        }
        self.blocks.lock().push(rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_set() {
        let mut set = FieldsSet::new();
        set.add("b");
        set.add_fields(&["a".to_string(), "b".to_string()]);
        assert!(set.contains("a"));
        assert!(!set.contains("c"));
        assert_eq!(set.get_all(), vec!["a".to_string(), "b".to_string()]);

        set.add("*");
        assert!(set.contains("c"));
    }
}
