//! Columnar block of rows flowing between pipe processors
//!
//! A block is an immutable batch of rows laid out as columns of string
//! values. A column may be constant (one value for every row). Blocks also
//! provide the bucketed view of a column used when a by-field carries a
//! `:bucket` configuration.

use crate::bitmap::Bitmap;
use crate::pipe_stats::ByStatsField;
use crate::values::{
    bucket_float, format_float, format_ipv4, try_parse_float, try_parse_ipv4,
};
use chrono::{DateTime, Datelike, SecondsFormat, TimeZone, Utc};

/// A named column of string values.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    is_const: bool,
    values: Vec<String>,
}

impl Column {
    /// A column with one value per row.
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Column {
        Column {
            name: name.into(),
            is_const: false,
            values,
        }
    }

    /// A column whose value repeats for every row of the block.
    pub fn new_const(name: impl Into<String>, value: impl Into<String>) -> Column {
        Column {
            name: name.into(),
            is_const: true,
            values: vec![value.into()],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_const(&self) -> bool {
        self.is_const
    }

    /// Value at `row`. The returned slice borrows block storage and must be
    /// copied if retained past the block's lifetime.
    pub fn get_value_at_row(&self, row: usize) -> &str {
        if self.is_const {
            &self.values[0]
        } else {
            self.values.get(row).map(String::as_str).unwrap_or("")
        }
    }
}

/// Column-oriented batch of rows.
#[derive(Debug, Default, Clone)]
pub struct BlockResult {
    rows_len: usize,
    columns: Vec<Column>,
}

impl BlockResult {
    pub fn new(rows_len: usize, columns: Vec<Column>) -> BlockResult {
        debug_assert!(columns
            .iter()
            .all(|c| c.is_const || c.values.len() == rows_len));
        BlockResult { rows_len, columns }
    }

    pub fn empty() -> BlockResult {
        BlockResult::default()
    }

    pub fn rows_len(&self) -> usize {
        self.rows_len
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn get_column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Value of column `name` at `row`; missing columns read as empty.
    pub fn get_value(&self, name: &str, row: usize) -> &str {
        match self.get_column_by_name(name) {
            Some(c) => c.get_value_at_row(row),
            None => "",
        }
    }

    /// Materialise the bucketed representative of the by-field column for
    /// every row of the block.
    pub fn get_values_bucketed(&self, bf: &ByStatsField) -> Vec<String> {
        match self.get_column_by_name(&bf.name) {
            Some(c) if c.is_const => {
                let v = get_bucketed_value(&c.values[0], bf);
                vec![v; self.rows_len]
            }
            Some(c) => c
                .values
                .iter()
                .map(|v| get_bucketed_value(v, bf))
                .collect(),
            None => vec![get_bucketed_value("", bf); self.rows_len],
        }
    }

    /// Build a block containing only the rows selected by `bm` and only the
    /// `needed_fields` columns (all columns when the list contains `*`).
    pub fn from_filtered(src: &BlockResult, bm: &Bitmap, needed_fields: &[String]) -> BlockResult {
        let rows_len = bm.count_set_bits();
        let star = needed_fields.iter().any(|f| f == "*");
        let names: Vec<&str> = if star {
            src.columns.iter().map(|c| c.name.as_str()).collect()
        } else {
            needed_fields.iter().map(String::as_str).collect()
        };

        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            match src.get_column_by_name(name) {
                Some(c) if c.is_const => {
                    columns.push(Column::new_const(name, c.values[0].clone()));
                }
                Some(c) => {
                    let mut values = Vec::with_capacity(rows_len);
                    bm.for_each_set_bit(|row| values.push(c.get_value_at_row(row).to_string()));
                    columns.push(Column::new(name, values));
                }
                None => columns.push(Column::new_const(name, "")),
            }
        }
        BlockResult { rows_len, columns }
    }

    /// Build an output block by draining the accumulated result columns.
    /// The columns keep their names and are left empty for further appends.
    pub fn from_result_columns(rcs: &mut [ResultColumn]) -> BlockResult {
        let rows_len = rcs.first().map(|rc| rc.values.len()).unwrap_or(0);
        let columns = rcs
            .iter_mut()
            .map(|rc| Column::new(rc.name.clone(), std::mem::take(&mut rc.values)))
            .collect();
        BlockResult { rows_len, columns }
    }
}

/// An output column under construction during emit.
#[derive(Debug)]
pub struct ResultColumn {
    pub name: String,
    pub values: Vec<String>,
}

impl ResultColumn {
    pub fn new(name: impl Into<String>) -> ResultColumn {
        ResultColumn {
            name: name.into(),
            values: Vec::new(),
        }
    }

    pub fn add_value(&mut self, v: String) {
        self.values.push(v);
    }
}

/// Map a raw value to its bucket representative per the by-field config.
///
/// The value's shape decides the arithmetic: RFC 3339 timestamps bucket in
/// nanoseconds and render back as timestamps, IPv4 addresses bucket over the
/// address space, numbers bucket numerically, duration literals bucket in
/// nanoseconds. Values of any other shape pass through unchanged.
pub fn get_bucketed_value(v: &str, bf: &ByStatsField) -> String {
    if !bf.has_bucket_config() {
        return v.to_string();
    }
    if bf.bucket_size_str == "month" || bf.bucket_size_str == "year" {
        return bucket_calendar(v, bf);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(v) {
        if let Some(ns) = dt.timestamp_nanos_opt() {
            let bucketed = bucket_float(ns as f64, bf.bucket_size, bf.bucket_offset) as i64;
            return format_timestamp(bucketed);
        }
        return v.to_string();
    }

    if let Some(ip) = try_parse_ipv4(v) {
        let bucketed = bucket_float(f64::from(ip), bf.bucket_size, bf.bucket_offset);
        let clamped = bucketed.clamp(0.0, f64::from(u32::MAX)) as u32;
        return format_ipv4(clamped);
    }

    if let Some(f) = try_parse_float(v) {
        return format_float(bucket_float(f, bf.bucket_size, bf.bucket_offset));
    }

    if let Some(ns) = crate::values::try_parse_duration(v) {
        let bucketed = bucket_float(ns as f64, bf.bucket_size, bf.bucket_offset) as i64;
        return crate::values::format_duration(bucketed);
    }

    v.to_string()
}

// The non-linear month/year units cannot be expressed as a fixed bucket
// size, so the timestamp is truncated to the unit start instead.
fn bucket_calendar(v: &str, bf: &ByStatsField) -> String {
    let Ok(dt) = DateTime::parse_from_rfc3339(v) else {
        return v.to_string();
    };
    let Some(mut ns) = dt.timestamp_nanos_opt() else {
        return v.to_string();
    };
    ns -= bf.bucket_offset as i64;
    let Some(dt) = DateTime::<Utc>::from_timestamp(
        ns.div_euclid(1_000_000_000),
        ns.rem_euclid(1_000_000_000) as u32,
    ) else {
        return v.to_string();
    };
    let truncated = match bf.bucket_size_str.as_str() {
        "month" => Utc.with_ymd_and_hms(dt.year(), dt.month(), 1, 0, 0, 0),
        _ => Utc.with_ymd_and_hms(dt.year(), 1, 1, 0, 0, 0),
    };
    match truncated.single() {
        Some(t) => t.to_rfc3339_opts(SecondsFormat::Secs, true),
        None => v.to_string(),
    }
}

fn format_timestamp(ns: i64) -> String {
    match DateTime::<Utc>::from_timestamp(
        ns.div_euclid(1_000_000_000),
        ns.rem_euclid(1_000_000_000) as u32,
    ) {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        None => ns.to_string(),
    }
}
