use std::sync::Arc;

use catalog::{InMemoryCatalogStore, Product};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{Money, PlaceOrder, PlacementConfig, PlacementEngine, StockPolicy};
use id_generator::SnowflakeGenerator;
use ledger::InMemoryLedgerStore;

fn catalog_products() -> Vec<Product> {
    (0..20)
        .map(|n| {
            Product::new(
                format!("p{n}"),
                format!("Product {n}"),
                format!("seller-{}", n % 4),
                Money::from_cents(100 + n),
                u32::MAX,
            )
        })
        .collect()
}

fn cart(lines: usize) -> PlaceOrder {
    (0..lines).fold(PlaceOrder::new("bench-customer", vec![]), |cart, n| {
        cart.with_line(format!("p{}", n % 20), 1)
    })
}

fn engine(
    rt: &tokio::runtime::Runtime,
    policy: StockPolicy,
) -> PlacementEngine<InMemoryCatalogStore, InMemoryLedgerStore> {
    let catalog = rt.block_on(InMemoryCatalogStore::with_products(catalog_products()));
    PlacementEngine::new(
        catalog,
        InMemoryLedgerStore::new(),
        Arc::new(SnowflakeGenerator::new(1).unwrap()),
        PlacementConfig::default().with_stock_policy(policy),
    )
}

fn bench_place_single_line(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let engine = engine(&rt, StockPolicy::DecrementAfterCommit);

    c.bench_function("placement/single_line", |b| {
        b.iter(|| {
            rt.block_on(async {
                engine.place_order(cart(1)).await.unwrap();
            });
        });
    });
}

fn bench_place_ten_lines(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let engine = engine(&rt, StockPolicy::DecrementAfterCommit);

    c.bench_function("placement/ten_lines_four_sellers", |b| {
        b.iter(|| {
            rt.block_on(async {
                engine.place_order(cart(10)).await.unwrap();
            });
        });
    });
}

fn bench_place_ten_lines_reserved(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let engine = engine(&rt, StockPolicy::ReserveBeforeCommit);

    c.bench_function("placement/ten_lines_reserve_before_commit", |b| {
        b.iter(|| {
            rt.block_on(async {
                engine.place_order(cart(10)).await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_place_single_line,
    bench_place_ten_lines,
    bench_place_ten_lines_reserved
);
criterion_main!(benches);
