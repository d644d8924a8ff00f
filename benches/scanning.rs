use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use memscan::{
    DataType, ScanOp, ScanTarget, ScanValue, Scanner, ScannerConfig, SyntheticProbe,
};

const REGION_SIZE: usize = 1 << 20;

fn seeded_probe() -> SyntheticProbe {
    let mut data = vec![0xA5u8; REGION_SIZE];
    for off in (0..REGION_SIZE - 4).step_by(4096) {
        data[off..off + 4].copy_from_slice(&42i32.to_le_bytes());
    }
    let mut probe = SyntheticProbe::new();
    probe.add_region(data);
    probe
}

fn benchmark_first_scan(c: &mut Criterion) {
    c.bench_function("first_scan_int_exact_1mb", |b| {
        b.iter_batched(
            || {
                Scanner::with_probe(
                    seeded_probe(),
                    DataType::Int,
                    ScannerConfig::default(),
                )
            },
            |mut scanner| {
                let summary = scanner
                    .first_scan(ScanOp::Exact, ScanTarget::Scalar(ScanValue::from_int(42)));
                black_box(summary.result_count)
            },
            BatchSize::LargeInput,
        );
    });
}

fn benchmark_sequence_scan(c: &mut Criterion) {
    c.bench_function("first_scan_sequence_1mb", |b| {
        b.iter_batched(
            || {
                let mut data = vec![0u8; REGION_SIZE];
                for off in (0..REGION_SIZE - 8).step_by(65_536) {
                    data[off..off + 6].copy_from_slice(b"needle");
                }
                let mut probe = SyntheticProbe::new();
                probe.add_region(data);
                Scanner::with_probe(probe, DataType::ByteArray, ScannerConfig::default())
            },
            |mut scanner| {
                let summary = scanner.first_scan(ScanOp::Exact, ScanTarget::Bytes(b"needle"));
                black_box(summary.result_count)
            },
            BatchSize::LargeInput,
        );
    });
}

fn benchmark_rescan(c: &mut Criterion) {
    c.bench_function("rescan_int_exact_batched", |b| {
        b.iter_batched(
            || {
                let mut scanner = Scanner::with_probe(
                    seeded_probe(),
                    DataType::Int,
                    ScannerConfig::default(),
                );
                scanner.first_scan(ScanOp::Exact, ScanTarget::Scalar(ScanValue::from_int(42)));
                scanner
            },
            |mut scanner| {
                let summary =
                    scanner.rescan(ScanOp::Exact, ScanTarget::Scalar(ScanValue::from_int(42)));
                black_box(summary.result_count)
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    benchmark_first_scan,
    benchmark_sequence_scan,
    benchmark_rescan
);
criterion_main!(benches);
