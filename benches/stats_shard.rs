//! Micro-benchmarks for the shard aggregation paths

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use logsql_stats::{BlockResult, CollectingProcessor, Column, PipeProcessor, StatsPipe};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

const ROWS: usize = 8192;

fn make_processor(query: &str) -> logsql_stats::StatsPipeProcessor {
    let ps = Arc::new(StatsPipe::parse_str(query).unwrap());
    let sink: Arc<dyn PipeProcessor> = Arc::new(CollectingProcessor::new());
    let stop = Arc::new(AtomicBool::new(false));
    let cancel: Arc<dyn Fn() + Send + Sync> = Arc::new(|| {});
    ps.new_pipe_processor(1, stop, cancel, sink)
}

fn varied_block() -> BlockResult {
    let hosts: Vec<String> = (0..ROWS).map(|i| format!("host{}", i % 64)).collect();
    let bytes: Vec<String> = (0..ROWS).map(|i| (i % 1000).to_string()).collect();
    BlockResult::new(
        ROWS,
        vec![Column::new("host", hosts), Column::new("bytes", bytes)],
    )
}

fn const_block() -> BlockResult {
    let bytes: Vec<String> = (0..ROWS).map(|i| (i % 1000).to_string()).collect();
    BlockResult::new(
        ROWS,
        vec![
            Column::new_const("host", "host0"),
            Column::new("bytes", bytes),
        ],
    )
}

fn bench_no_group(c: &mut Criterion) {
    let processor = make_processor("stats count(*) as n, sum(bytes) as s");
    let br = varied_block();
    c.bench_function("shard_no_by_fields", |b| {
        b.iter(|| processor.write_block(0, black_box(&br)));
    });
}

fn bench_single_const_column(c: &mut Criterion) {
    let processor = make_processor("stats by (host) sum(bytes) as s");
    let br = const_block();
    c.bench_function("shard_single_const_column", |b| {
        b.iter(|| processor.write_block(0, black_box(&br)));
    });
}

fn bench_single_varied_column(c: &mut Criterion) {
    let processor = make_processor("stats by (host) sum(bytes) as s");
    let br = varied_block();
    c.bench_function("shard_single_varied_column", |b| {
        b.iter(|| processor.write_block(0, black_box(&br)));
    });
}

fn bench_multi_column(c: &mut Criterion) {
    let processor = make_processor("stats by (host, bytes) count(*) as n");
    let br = varied_block();
    c.bench_function("shard_multi_column", |b| {
        b.iter(|| processor.write_block(0, black_box(&br)));
    });
}

criterion_group!(
    benches,
    bench_no_group,
    bench_single_const_column,
    bench_single_varied_column,
    bench_multi_column
);
criterion_main!(benches);
