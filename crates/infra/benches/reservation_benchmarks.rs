use std::sync::Arc;
use std::thread;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use stockhold_core::ItemCode;
use stockhold_infra::{EngineConfig, InMemoryEngine, ReservationError};

fn sku() -> ItemCode {
    ItemCode::new("BENCH-SKU").unwrap()
}

fn engine_with_stock(stock: i64) -> InMemoryEngine {
    let engine = InMemoryEngine::in_memory(&EngineConfig::default().with_max_attempts(1024));
    engine.upsert_item(&sku(), "Bench item", stock).unwrap();
    engine
}

fn bench_create_confirm_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("reservation_latency");

    group.bench_function("create", |b| {
        let engine = engine_with_stock(i64::MAX / 2);
        let code = sku();
        b.iter(|| black_box(engine.create_reservation(&code, 1).unwrap()));
    });

    group.bench_function("create_then_confirm", |b| {
        let engine = engine_with_stock(i64::MAX / 2);
        let code = sku();
        b.iter(|| {
            let r = engine.create_reservation(&code, 1).unwrap();
            black_box(engine.confirm_reservation(r.reservation_id()).unwrap())
        });
    });

    group.finish();
}

fn bench_contended_creates(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_creates");
    let per_thread = 200u64;

    for threads in [1usize, 2, 4, 8] {
        group.throughput(Throughput::Elements(threads as u64 * per_thread));
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter(|| {
                let engine = Arc::new(engine_with_stock((threads as u64 * per_thread) as i64));
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let engine = engine.clone();
                        thread::spawn(move || {
                            let code = sku();
                            for _ in 0..per_thread {
                                match engine.create_reservation(&code, 1) {
                                    Ok(_) | Err(ReservationError::Conflict) => {}
                                    Err(e) => panic!("unexpected: {e:?}"),
                                }
                            }
                        })
                    })
                    .collect();
                for h in handles {
                    h.join().unwrap();
                }
            });
        });
    }

    group.finish();
}

fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("expiry_sweep");

    for pending in [100usize, 1_000] {
        group.throughput(Throughput::Elements(pending as u64));
        group.bench_with_input(BenchmarkId::from_parameter(pending), &pending, |b, &pending| {
            b.iter_with_setup(
                || {
                    let engine = engine_with_stock(pending as i64);
                    for _ in 0..pending {
                        engine.create_reservation(&sku(), 1).unwrap();
                    }
                    engine
                },
                |engine| {
                    let far_future = chrono::Utc::now() + chrono::Duration::days(1);
                    black_box(engine.sweep_expired(far_future).unwrap())
                },
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_create_confirm_latency,
    bench_contended_creates,
    bench_sweep
);
criterion_main!(benches);
