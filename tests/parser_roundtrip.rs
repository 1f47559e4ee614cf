//! Round-trip tests for the stats clause parser
//!
//! The canonical string form must reparse to an identical canonical string.
//! Randomized clauses are built from the grammar with a seeded generator so
//! failures reproduce.

use logsql_stats::StatsPipe;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn assert_round_trip(input: &str) {
    let ps = StatsPipe::parse_str(input)
        .unwrap_or_else(|err| panic!("cannot parse {input:?}: {err}"));
    let canonical = ps.to_string();
    let reparsed = StatsPipe::parse_str(&canonical)
        .unwrap_or_else(|err| panic!("cannot reparse {canonical:?} (from {input:?}): {err}"));
    assert_eq!(
        canonical,
        reparsed.to_string(),
        "canonical form is not stable for {input:?}"
    );
}

#[test]
fn test_fixed_round_trips() {
    for input in [
        "stats count(*) as n",
        "stats count(a, b) as n",
        "stats by (host) count(*) as n",
        "stats by (host, dc) count(*) as n, sum(bytes) as s",
        "stats by (latency:1s) count(*) as n",
        "stats by (latency:1s offset 0.5s) avg(latency) as mean",
        "stats by (latency:hour) count(*) as n",
        "stats by (size:1.5KiB) count(*) as n",
        "stats by (ip:/24) count_uniq(ip) as ips",
        "stats by (t:month) count(*) as n",
        "stats by (t:year offset -1h) count(*) as n",
        "stats count(*) if (status:error) as errs",
        "stats count(*) if (status:error or status:warn) as bad",
        "stats count(*) if (not status:ok) as bad",
        "stats count(*) if (req* status:5*) as slow_errors",
        "stats quantile(0.99, latency) as p99",
        "stats median(latency) as p50",
        "stats uniq_values(host) as hosts, values(host) as all_hosts",
        "stats row_any(*) as sample",
        "stats sum_len(_msg) as total_len",
        r#"stats by ("field with space") count(*) as "name with space""#,
        r#"stats count("by") as "if""#,
    ] {
        assert_round_trip(input);
    }
}

// Generator pools. Bucket sizes include every literal family the grammar
// recognises.
const FIELD_NAMES: &[&str] = &["host", "bytes", "latency", "_msg", "ip", "field with space"];
const RESULT_NAMES: &[&str] = &["n", "s", "p99", "result_1", "name with space"];
const BUCKET_SIZES: &[&str] = &[
    "10", "1.5", "1s", "250ms", "hour", "week", "1.5KiB", "2MB", "/24", "month", "year",
];
const BUCKET_OFFSETS: &[&str] = &["5", "-5", "0.5s", "-1.5h", "1KiB"];
const FUNC_NAMES: &[&str] = &[
    "count",
    "count_empty",
    "count_uniq",
    "sum",
    "sum_len",
    "avg",
    "min",
    "max",
    "median",
    "uniq_values",
    "values",
    "row_any",
];

fn quoted(name: &str) -> String {
    if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        name.to_string()
    } else {
        format!("{name:?}")
    }
}

fn gen_field_list(rng: &mut StdRng) -> String {
    if rng.gen_bool(0.2) {
        return if rng.gen_bool(0.5) { "" } else { "*" }.to_string();
    }
    let n = rng.gen_range(1..=3);
    let fields: Vec<String> = (0..n)
        .map(|_| quoted(FIELD_NAMES[rng.gen_range(0..FIELD_NAMES.len())]))
        .collect();
    fields.join(", ")
}

fn gen_filter(rng: &mut StdRng, depth: usize) -> String {
    let field = FIELD_NAMES[rng.gen_range(0..FIELD_NAMES.len())];
    let atom = match rng.gen_range(0..3) {
        0 => format!("{}:value{}", quoted(field), rng.gen_range(0..5)),
        1 => format!("{}:pref{}*", quoted(field), rng.gen_range(0..5)),
        _ => format!("word{}", rng.gen_range(0..5)),
    };
    if depth == 0 {
        return atom;
    }
    match rng.gen_range(0..4) {
        0 => format!("{atom} {}", gen_filter(rng, depth - 1)),
        1 => format!("{atom} or {}", gen_filter(rng, depth - 1)),
        2 => format!("not {atom}"),
        _ => atom,
    }
}

fn gen_func(rng: &mut StdRng, idx: usize) -> String {
    let name = FUNC_NAMES[rng.gen_range(0..FUNC_NAMES.len())];
    let mut s = if name == "median" && rng.gen_bool(0.5) {
        format!(
            "quantile(0.{}, {})",
            rng.gen_range(1..10),
            quoted(FIELD_NAMES[rng.gen_range(0..FIELD_NAMES.len())])
        )
    } else {
        format!("{name}({})", gen_field_list(rng))
    };
    if rng.gen_bool(0.4) {
        s.push_str(&format!(" if ({})", gen_filter(rng, 2)));
    }
    // The 'as' keyword is optional on input; result names must be unique.
    let result = format!(
        "{}_{idx}",
        RESULT_NAMES[rng.gen_range(0..RESULT_NAMES.len())].replace(' ', "_")
    );
    if rng.gen_bool(0.7) {
        s.push_str(&format!(" as {result}"));
    } else {
        s.push_str(&format!(" {result}"));
    }
    s
}

fn gen_clause(rng: &mut StdRng) -> String {
    let mut s = "stats ".to_string();
    if rng.gen_bool(0.6) {
        let n = rng.gen_range(1..=3);
        let fields: Vec<String> = (0..n)
            .map(|_| {
                let mut bf = quoted(FIELD_NAMES[rng.gen_range(0..FIELD_NAMES.len())]);
                if rng.gen_bool(0.5) {
                    bf.push(':');
                    let size = BUCKET_SIZES[rng.gen_range(0..BUCKET_SIZES.len())];
                    bf.push_str(size);
                    if size != "month" && size != "year" && rng.gen_bool(0.3) {
                        bf.push_str(" offset ");
                        bf.push_str(BUCKET_OFFSETS[rng.gen_range(0..BUCKET_OFFSETS.len())]);
                    }
                }
                bf
            })
            .collect();
        // The 'by' keyword itself is optional.
        if rng.gen_bool(0.8) {
            s.push_str("by ");
        }
        s.push_str(&format!("({}) ", fields.join(", ")));
    }
    let n = rng.gen_range(1..=3);
    let funcs: Vec<String> = (0..n).map(|i| gen_func(rng, i)).collect();
    s.push_str(&funcs.join(", "));
    s
}

#[test]
fn test_random_round_trips() {
    let mut rng = StdRng::seed_from_u64(0x5747_5f5f);
    for _ in 0..500 {
        let clause = gen_clause(&mut rng);
        assert_round_trip(&clause);
    }
}

#[test]
fn test_calendar_unit_is_not_a_valid_offset() {
    assert!(StatsPipe::parse_str("stats by (t:month offset month) count(*) as n").is_err());
}
