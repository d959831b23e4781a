use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use flox_core::bus::{BackoffPolicy, Bus, BusConfig, ConsumerKind};
use flox_core::decimal::{Price, Quantity};
use flox_core::events::TradeEvent;
use flox_core::ids::SymbolId;
use std::hint::black_box;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const CAP: usize = 1 << 16;
const MAXC: usize = 4;

fn sample_trade(trade_id: u64) -> TradeEvent {
    TradeEvent {
        symbol: SymbolId::new(1),
        price: Price::from_raw(100_000_000),
        quantity: Quantity::from_raw(1_000_000),
        is_buy: trade_id % 2 == 0,
        trade_id,
        exchange_ts_ns: 1,
        recv_ts_ns: 2,
    }
}

fn bench_single_consumer(c: &mut Criterion) {
    let mut group = c.benchmark_group("Bus - single required consumer");
    for &count in &[1_000u64, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::new("publish_and_drain", count), &count, |b, &count| {
            b.iter(|| {
                let bus: Arc<Bus<TradeEvent, CAP, MAXC>> = Arc::new(Bus::new(BusConfig {
                    backoff_policy: BackoffPolicy::Relaxed,
                    ..Default::default()
                }));
                let seen = Arc::new(AtomicU64::new(0));
                let seen_in_consumer = Arc::clone(&seen);
                Bus::subscribe(&bus, ConsumerKind::Required, move |event: Option<&TradeEvent>| {
                    if event.is_some() {
                        seen_in_consumer.fetch_add(1, Ordering::Relaxed);
                    }
                })
                .unwrap();
                bus.start();

                for i in 0..count {
                    black_box(bus.publish(sample_trade(i)).unwrap());
                }
                bus.wait_consumed();
                bus.stop();
                assert_eq!(seen.load(Ordering::Relaxed), count);
            });
        });
    }
    group.finish();
}

fn bench_fanout_consumers(c: &mut Criterion) {
    let mut group = c.benchmark_group("Bus - fan-out consumers");
    for &consumer_count in &[1usize, 2, 4] {
        group.bench_with_input(
            BenchmarkId::new("publish_10k_events", consumer_count),
            &consumer_count,
            |b, &consumer_count| {
                b.iter(|| {
                    let bus: Arc<Bus<TradeEvent, CAP, MAXC>> = Arc::new(Bus::new(BusConfig {
                        backoff_policy: BackoffPolicy::Relaxed,
                        ..Default::default()
                    }));
                    for _ in 0..consumer_count {
                        Bus::subscribe(&bus, ConsumerKind::Required, |_event: Option<&TradeEvent>| {}).unwrap();
                    }
                    bus.start();
                    for i in 0..10_000u64 {
                        black_box(bus.publish(sample_trade(i)).unwrap());
                    }
                    bus.wait_consumed();
                    bus.stop();
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_single_consumer, bench_fanout_consumers);
criterion_main!(benches);
