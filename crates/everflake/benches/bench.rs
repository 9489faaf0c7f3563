use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use everflake::{GenStatus, StaticWorkerIdAssigner, TimeSource, UidConfig, UidGenerator};
use std::time::Instant;

/// 2018-04-01 00:00:00 UTC, the default epoch.
const EPOCH_SECONDS: i64 = 1_522_540_800;

struct FixedMockTime {
    seconds: i64,
}

impl TimeSource for FixedMockTime {
    fn unix_seconds(&self) -> i64 {
        self.seconds
    }
}

// Number of IDs generated per benchmark iteration. Stays below the default
// 8192-per-second sequence capacity so the hot path never pends.
const TOTAL_IDS: usize = 4096;

/// Benchmarks a hot-path generator where IDs are always `Ready`.
fn bench_generator(
    c: &mut Criterion,
    group_name: &str,
    generator_factory: impl Fn() -> UidGenerator<FixedMockTime>,
) {
    let mut group = c.benchmark_group(group_name);
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("elems/{TOTAL_IDS}"), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                let generator = generator_factory();
                for _ in 0..TOTAL_IDS {
                    match generator.try_poll_uid().unwrap() {
                        GenStatus::Ready { uid } => {
                            black_box(uid);
                        }
                        GenStatus::Pending { .. } => unreachable!(),
                    }
                }
            }

            start.elapsed()
        })
    });

    group.finish();
}

/// The fixed 64-bit encoding: timestamps still fit their field.
fn bench_fixed_encoding(c: &mut Criterion) {
    bench_generator(c, "uid/fixed", || {
        UidGenerator::with_time_source(
            &UidConfig::for_data_center(1),
            &StaticWorkerIdAssigner::new(42),
            FixedMockTime {
                seconds: EPOCH_SECONDS + 100,
            },
        )
        .unwrap()
    });
}

/// The arbitrary-precision encoding: the timestamp field has overflowed.
fn bench_wide_encoding(c: &mut Criterion) {
    bench_generator(c, "uid/wide", || {
        // 4 timestamp bits put every allocation past the fixed capacity
        UidGenerator::with_time_source(
            &UidConfig::for_data_center(1).with_bits(4, 9, 13, 13),
            &StaticWorkerIdAssigner::new(42),
            FixedMockTime {
                seconds: EPOCH_SECONDS + 100,
            },
        )
        .unwrap()
    });
}

criterion_group!(benches, bench_fixed_encoding, bench_wide_encoding);
criterion_main!(benches);
