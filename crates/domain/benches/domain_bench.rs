use common::{Money, ProductId, UserId, VariantKey};
use criterion::{Criterion, criterion_group, criterion_main};
use doc_store::MemoryStore;
use domain::access::{Actor, Role};
use domain::cart::CartService;
use domain::catalog::{Product, ProductVariant};
use domain::order::{CustomerDetails, OrderService, OrderStatus, PaymentMethod};
use domain::store::Store;

fn seeded_store(rt: &tokio::runtime::Runtime, stock: u32) -> (MemoryStore, ProductId) {
    let store = MemoryStore::new();
    let product = Product {
        id: ProductId::new(),
        title: "Benchmark Controller".to_string(),
        description: None,
        category: "Controllers".to_string(),
        brand: "Generic".to_string(),
        variants: vec![ProductVariant {
            color: "Black".to_string(),
            size: "Standard".to_string(),
            stock,
            price: Money::from_cents(1000),
            sku: None,
            image: None,
        }],
    };
    let id = product.id;
    rt.block_on(async { store.put_product(&product).await.unwrap() });
    (store, id)
}

fn details() -> CustomerDetails {
    CustomerDetails {
        name: "Bench User".to_string(),
        phone: "555-0000".to_string(),
        address: "1 Bench Way".to_string(),
    }
}

fn bench_cart_add(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (store, product_id) = seeded_store(&rt, 1_000_000);
    let carts = CartService::new(store);
    let actor = Actor::new(UserId::new(), Role::Customer);
    let key = VariantKey::new("Black", "Standard");

    c.bench_function("cart/add_or_update", |b| {
        b.iter(|| {
            rt.block_on(async {
                // Same quantity every time: a replacement with zero net
                // stock delta, so the loop never drains the variant.
                carts
                    .add_or_update(&actor, product_id, key.clone(), 2)
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_checkout(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (store, product_id) = seeded_store(&rt, u32::MAX / 2);
    let carts = CartService::new(store.clone());
    let orders = OrderService::new(store);
    let actor = Actor::new(UserId::new(), Role::Customer);
    let key = VariantKey::new("Black", "Standard");

    c.bench_function("order/add_and_checkout", |b| {
        b.iter(|| {
            rt.block_on(async {
                carts
                    .add_or_update(&actor, product_id, key.clone(), 1)
                    .await
                    .unwrap();
                orders
                    .create_order(&actor, details(), PaymentMethod::CreditCard)
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_status_table(c: &mut Criterion) {
    use OrderStatus::*;
    let statuses = [Pending, Paid, Processing, Shipped, Delivered, Cancelled];

    c.bench_function("order/status_table", |b| {
        b.iter(|| {
            let mut allowed = 0u32;
            for from in statuses {
                for to in statuses {
                    if from.allows(to) {
                        allowed += 1;
                    }
                }
            }
            assert_eq!(allowed, 8);
        });
    });
}

criterion_group!(benches, bench_cart_add, bench_checkout, bench_status_table);
criterion_main!(benches);
