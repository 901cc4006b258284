use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use std::sync::Arc;

use silos_core::SiloId;
use silos_infra::ledger::InventoryLedger;
use silos_infra::registry::SiloRegistry;
use silos_infra::reporter::SummaryReporter;
use silos_infra::silo_store::InMemorySiloStore;
use silos_inventory::InventoryPolicy;
use tokio::runtime::Runtime;

type Store = Arc<InMemorySiloStore>;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .expect("tokio runtime")
}

fn setup(rt: &Runtime) -> (Store, InventoryLedger<Store>, SiloId) {
    let store = InMemorySiloStore::arc();
    let policy = InventoryPolicy::default();
    let registry = SiloRegistry::new(store.clone(), policy.delete);
    let ledger = InventoryLedger::new(store.clone(), &policy);
    let id = rt.block_on(async {
        let silo = registry.create("Bench").await.expect("create");
        ledger
            .load(silo.id(), 1_000_000, Some("Maiz"))
            .await
            .expect("seed");
        silo.id()
    });
    (store, ledger, id)
}

fn bench_movement_latency(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("movement_latency");
    group.sample_size(500);

    group.bench_function("load", |b| {
        let (_, ledger, id) = setup(&rt);
        b.iter(|| {
            rt.block_on(ledger.load(black_box(id), 1, None))
                .expect("load");
        });
    });

    group.bench_function("load_then_unload", |b| {
        let (_, ledger, id) = setup(&rt);
        b.iter(|| {
            rt.block_on(async {
                ledger.load(black_box(id), 5, None).await.expect("load");
                ledger.unload(black_box(id), 5).await.expect("unload");
            });
        });
    });

    group.finish();
}

fn bench_contended_unloads(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("contended_unloads");

    for tasks in [1usize, 8, 64].iter() {
        group.throughput(Throughput::Elements(*tasks as u64));
        group.bench_with_input(BenchmarkId::from_parameter(tasks), tasks, |b, &tasks| {
            let (_, ledger, id) = setup(&rt);
            let ledger = Arc::new(ledger);
            b.iter(|| {
                rt.block_on(async {
                    let mut handles = Vec::with_capacity(tasks * 2);
                    for _ in 0..tasks {
                        let loader = ledger.clone();
                        handles.push(tokio::spawn(async move {
                            loader.load(id, 1, None).await.map(|_| ())
                        }));
                        let unloader = ledger.clone();
                        handles.push(tokio::spawn(async move {
                            unloader.unload(id, 1).await.map(|_| ())
                        }));
                    }
                    for handle in handles {
                        let _ = handle.await;
                    }
                });
            });
        });
    }

    group.finish();
}

fn bench_summary(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("summary");

    for movements in [10usize, 1_000, 10_000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(movements),
            movements,
            |b, &movements| {
                let (store, ledger, id) = setup(&rt);
                rt.block_on(async {
                    for _ in 0..movements {
                        ledger.load(id, 1, None).await.expect("load");
                    }
                });
                let reporter = SummaryReporter::new(store, chrono::FixedOffset::east_opt(0).expect("utc"));
                b.iter(|| {
                    let lines = rt.block_on(reporter.summary()).expect("summary");
                    black_box(lines.len())
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_movement_latency,
    bench_contended_unloads,
    bench_summary
);
criterion_main!(benches);
