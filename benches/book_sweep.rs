use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use flox_core::book::{Book, BookUpdate, Level, UpdateKind};
use flox_core::decimal::{Price, Quantity};
use flox_core::ids::SymbolId;
use std::hint::black_box;

const LEVELS: usize = 4096;

fn build_book(depth: usize) -> Book<LEVELS> {
    let tick = Price::from_raw(1_000_000); // 0.01 at 1e8 scale
    let mut book: Book<LEVELS> = Book::new(SymbolId::new(1), tick).unwrap();
    let mid = 2_000usize;
    let bids = (0..depth)
        .map(|i| Level {
            price: Price::from_raw(((mid - i) as i64) * tick.raw()),
            qty: Quantity::from_raw(1_000_000_000),
        })
        .collect();
    let asks = (0..depth)
        .map(|i| Level {
            price: Price::from_raw(((mid + 1 + i) as i64) * tick.raw()),
            qty: Quantity::from_raw(1_000_000_000),
        })
        .collect();
    book.apply(&BookUpdate {
        kind: UpdateKind::Snapshot,
        bids,
        asks,
        sequence_number: 1,
    })
    .unwrap();
    book
}

fn bench_apply_delta(c: &mut Criterion) {
    let mut group = c.benchmark_group("Book - apply delta");
    for &depth in &[8usize, 64, 512] {
        group.bench_with_input(BenchmarkId::new("single_level_delta", depth), &depth, |b, &depth| {
            let mut book = build_book(depth);
            let tick = Price::from_raw(1_000_000);
            let mut seq = 2u64;
            b.iter(|| {
                let update = BookUpdate {
                    kind: UpdateKind::Delta,
                    bids: vec![Level {
                        price: Price::from_raw(1_999 * tick.raw()),
                        qty: Quantity::from_raw((seq as i64) * 1_000_000),
                    }],
                    asks: vec![],
                    sequence_number: seq,
                };
                seq += 1;
                black_box(book.apply(&update).unwrap());
            });
        });
    }
    group.finish();
}

fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("Book - sweep");
    for &depth in &[8usize, 64, 512] {
        group.bench_with_input(BenchmarkId::new("sweep_asks", depth), &depth, |b, &depth| {
            let book = build_book(depth);
            let need = Quantity::from_raw((depth as i64) * 1_000_000_000 / 2);
            b.iter(|| black_box(book.sweep_asks(need)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_apply_delta, bench_sweep);
criterion_main!(benches);
