/// Tally and validation benchmarks
///
/// Measures the per-event cost of `SyscallTally::record` for a realistic
/// syscall mix and the cost of comparing a finished tally to a whitelist.
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;
use vigia::tally::SyscallTally;
use vigia::validator::compare;
use vigia::whitelist::Whitelist;

/// Skewed event stream: a handful of hot syscalls and a long tail
fn event_stream(len: usize, distinct: u64) -> Vec<u64> {
    (0..len as u64)
        .map(|i| if i % 4 == 0 { i % distinct } else { i % 8 })
        .collect()
}

fn bench_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("tally_record");
    group.measurement_time(Duration::from_secs(5));

    for &distinct in &[8u64, 64, 300] {
        let events = event_stream(100_000, distinct);
        group.throughput(Throughput::Elements(events.len() as u64));

        group.bench_with_input(BenchmarkId::new("distinct", distinct), &events, |b, events| {
            b.iter(|| {
                let mut tally = SyscallTally::new();
                for &id in events {
                    tally.record(black_box(id));
                }
                black_box(tally.len());
            });
        });
    }

    group.finish();
}

fn bench_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare");

    let mut tally = SyscallTally::new();
    for id in event_stream(10_000, 300) {
        tally.record(id);
    }
    let whitelist = Whitelist::from_ids((0..300).step_by(2));

    group.bench_function("300_observed_150_allowed", |b| {
        b.iter(|| black_box(compare(black_box(tally.snapshot()), &whitelist)));
    });

    group.finish();
}

criterion_group!(benches, bench_record, bench_compare);
criterion_main!(benches);
