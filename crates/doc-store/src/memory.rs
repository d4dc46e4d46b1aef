use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, ProductId, UserId, VariantKey};
use domain::access::Role;
use domain::cart::Cart;
use domain::catalog::Product;
use domain::order::Order;
use domain::store::{CartCommit, Result, StockAdjust, StockDelta, Store, StoreError};
use domain::user::User;
use tokio::sync::RwLock;

/// In-memory store implementation for tests and local development.
///
/// All collections live behind a single lock, so every composite
/// operation — stock deltas plus cart write, order insert plus cart
/// clear — is naturally atomic and concurrent adjustments to the same
/// variant serialize, matching the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Collections>>,
}

#[derive(Default)]
struct Collections {
    products: HashMap<ProductId, Product>,
    carts: HashMap<UserId, Cart>,
    orders: HashMap<OrderId, Order>,
    users: HashMap<UserId, User>,
}

/// Result of staging a batch of stock deltas before applying them.
enum Staged {
    /// New stock levels per (product, variant), ready to write.
    Ready(Vec<(ProductId, VariantKey, u32)>),
    Insufficient {
        product_id: ProductId,
        variant: VariantKey,
        available: u32,
    },
    NotFound {
        product_id: ProductId,
        variant: VariantKey,
    },
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.inner.read().await.orders.len()
    }

    /// Clears every collection.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.products.clear();
        inner.carts.clear();
        inner.orders.clear();
        inner.users.clear();
    }
}

/// Validates every delta against current stock, without mutating.
///
/// Releasing deltas on missing variants are skipped; reserving deltas on
/// missing variants abort the batch. The whole batch either stages or
/// reports the first failure.
fn stage_deltas(collections: &Collections, deltas: &[StockDelta]) -> Staged {
    let mut levels: HashMap<(ProductId, VariantKey), i64> = HashMap::new();
    let mut ready = Vec::with_capacity(deltas.len());

    for delta in deltas {
        let slot = (delta.product_id, delta.variant.clone());
        let current = match levels.get(&slot) {
            Some(level) => Some(*level),
            None => collections
                .products
                .get(&delta.product_id)
                .and_then(|p| p.variant(&delta.variant))
                .map(|v| v.stock as i64),
        };

        let Some(current) = current else {
            if delta.delta < 0 {
                return Staged::NotFound {
                    product_id: delta.product_id,
                    variant: delta.variant.clone(),
                };
            }
            continue;
        };

        let next = current + delta.delta;
        if next < 0 {
            return Staged::Insufficient {
                product_id: delta.product_id,
                variant: delta.variant.clone(),
                available: current as u32,
            };
        }
        levels.insert(slot.clone(), next);
        ready.push((slot.0, slot.1, next as u32));
    }

    Staged::Ready(ready)
}

fn apply_levels(collections: &mut Collections, levels: Vec<(ProductId, VariantKey, u32)>) {
    for (product_id, variant, level) in levels {
        if let Some(product) = collections.products.get_mut(&product_id)
            && let Some(v) = product.variant_mut(&variant)
        {
            v.stock = level;
        }
    }
}

fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    orders
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.inner.read().await.products.get(&id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let inner = self.inner.read().await;
        let mut products: Vec<Product> = inner.products.values().cloned().collect();
        products.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(products)
    }

    async fn put_product(&self, product: &Product) -> Result<()> {
        self.inner
            .write()
            .await
            .products
            .insert(product.id, product.clone());
        Ok(())
    }

    async fn adjust_stock(
        &self,
        id: ProductId,
        variant: &VariantKey,
        delta: i64,
    ) -> Result<StockAdjust> {
        let mut inner = self.inner.write().await;

        let Some(current) = inner
            .products
            .get(&id)
            .and_then(|p| p.variant(variant))
            .map(|v| v.stock as i64)
        else {
            return Ok(StockAdjust::NotFound);
        };

        let next = current + delta;
        if next < 0 {
            return Ok(StockAdjust::Insufficient {
                available: current as u32,
            });
        }

        apply_levels(&mut inner, vec![(id, variant.clone(), next as u32)]);
        Ok(StockAdjust::Adjusted {
            level: next as u32,
        })
    }

    async fn get_cart(&self, user: UserId) -> Result<Option<Cart>> {
        Ok(self.inner.read().await.carts.get(&user).cloned())
    }

    async fn commit_cart(&self, cart: &Cart, deltas: &[StockDelta]) -> Result<CartCommit> {
        let mut inner = self.inner.write().await;

        let levels = match stage_deltas(&inner, deltas) {
            Staged::Ready(levels) => levels,
            Staged::Insufficient {
                product_id,
                variant,
                available,
            } => {
                return Ok(CartCommit::Insufficient {
                    product_id,
                    variant,
                    available,
                });
            }
            Staged::NotFound {
                product_id,
                variant,
            } => {
                return Ok(CartCommit::NotFound {
                    product_id,
                    variant,
                });
            }
        };

        apply_levels(&mut inner, levels);
        if cart.lines.is_empty() {
            inner.carts.remove(&cart.user);
        } else {
            inner.carts.insert(cart.user, cart.clone());
        }
        Ok(CartCommit::Committed)
    }

    async fn insert_order_clearing_cart(&self, order: &Order) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.orders.insert(order.id, order.clone());
        inner.carts.remove(&order.customer);
        Ok(())
    }

    async fn update_order(
        &self,
        order: &Order,
        expected_revision: i64,
        releases: &[StockDelta],
    ) -> Result<()> {
        let mut inner = self.inner.write().await;

        let actual = match inner.orders.get(&order.id) {
            Some(stored) => stored.revision,
            None => return Err(StoreError::OrderNotFound(order.id)),
        };
        if actual != expected_revision {
            return Err(StoreError::RevisionConflict {
                order_id: order.id,
                expected: expected_revision,
                actual,
            });
        }

        let levels = match stage_deltas(&inner, releases) {
            Staged::Ready(levels) => levels,
            Staged::Insufficient { .. } | Staged::NotFound { .. } => {
                return Err(StoreError::backend(std::io::Error::other(
                    "order update carried a non-releasing stock delta",
                )));
            }
        };

        apply_levels(&mut inner, levels);
        inner.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.inner.read().await.orders.get(&id).cloned())
    }

    async fn list_orders_for_customer(&self, customer: UserId) -> Result<Vec<Order>> {
        let inner = self.inner.read().await;
        Ok(newest_first(
            inner
                .orders
                .values()
                .filter(|o| o.customer == customer)
                .cloned()
                .collect(),
        ))
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let inner = self.inner.read().await;
        Ok(newest_first(inner.orders.values().cloned().collect()))
    }

    async fn list_orders_for_rider(&self, rider: UserId) -> Result<Vec<Order>> {
        let inner = self.inner.read().await;
        Ok(newest_first(
            inner
                .orders
                .values()
                .filter(|o| o.assigned_rider_id() == Some(rider))
                .cloned()
                .collect(),
        ))
    }

    async fn count_orders_for_rider(&self, rider: UserId) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(inner
            .orders
            .values()
            .filter(|o| o.assigned_rider_id() == Some(rider))
            .count() as u64)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_subject(&self, subject_id: &str) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|u| u.subject_id == subject_id)
            .cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn put_user(&self, user: &User) -> Result<()> {
        self.inner.write().await.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        Ok(self.inner.write().await.users.remove(&id).is_some())
    }

    async fn list_users_by_role(&self, role: Role) -> Result<Vec<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .filter(|u| u.role == role)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::Money;
    use domain::cart::CartLine;
    use domain::catalog::ProductVariant;
    use domain::order::{CustomerDetails, PaymentMethod};

    fn product(stock: u32) -> Product {
        Product {
            id: ProductId::new(),
            title: "Gaming Headset".to_string(),
            description: None,
            category: "Audio".to_string(),
            brand: "SteelSeries".to_string(),
            variants: vec![ProductVariant {
                color: "Black".to_string(),
                size: "Standard".to_string(),
                stock,
                price: Money::from_cents(4500),
                sku: None,
                image: None,
            }],
        }
    }

    fn key() -> VariantKey {
        VariantKey::new("Black", "Standard")
    }

    fn cart_with(user: UserId, product_id: ProductId, quantity: u32) -> Cart {
        let mut cart = Cart::empty(user);
        cart.lines.push(CartLine {
            product_id,
            variant: key(),
            price: Money::from_cents(4500),
            quantity,
        });
        cart
    }

    fn order_from(cart: &Cart) -> Order {
        Order::from_cart(
            cart,
            CustomerDetails {
                name: "Dana Cruz".to_string(),
                phone: "555-0142".to_string(),
                address: "7 Arcade Row".to_string(),
            },
            PaymentMethod::CreditCard,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn adjust_stock_enforces_the_floor() {
        let store = MemoryStore::new();
        let p = product(2);
        let id = p.id;
        store.put_product(&p).await.unwrap();

        assert_eq!(
            store.adjust_stock(id, &key(), -2).await.unwrap(),
            StockAdjust::Adjusted { level: 0 }
        );
        assert_eq!(
            store.adjust_stock(id, &key(), -1).await.unwrap(),
            StockAdjust::Insufficient { available: 0 }
        );
        assert_eq!(
            store.adjust_stock(id, &key(), 3).await.unwrap(),
            StockAdjust::Adjusted { level: 3 }
        );
    }

    #[tokio::test]
    async fn adjust_stock_reports_missing_variants() {
        let store = MemoryStore::new();
        let p = product(2);
        let id = p.id;
        store.put_product(&p).await.unwrap();

        let missing = VariantKey::new("Red", "Standard");
        assert_eq!(
            store.adjust_stock(id, &missing, -1).await.unwrap(),
            StockAdjust::NotFound
        );
        assert_eq!(
            store.adjust_stock(ProductId::new(), &key(), -1).await.unwrap(),
            StockAdjust::NotFound
        );
    }

    #[tokio::test]
    async fn commit_cart_applies_deltas_and_cart_together() {
        let store = MemoryStore::new();
        let p = product(5);
        let id = p.id;
        store.put_product(&p).await.unwrap();

        let user = UserId::new();
        let cart = cart_with(user, id, 3);
        let deltas = [StockDelta::reserve(id, key(), 3)];

        let outcome = store.commit_cart(&cart, &deltas).await.unwrap();
        assert_eq!(outcome, CartCommit::Committed);

        let stored = store.get_cart(user).await.unwrap().unwrap();
        assert_eq!(stored.lines[0].quantity, 3);
        let stock = store.get_product(id).await.unwrap().unwrap().variants[0].stock;
        assert_eq!(stock, 2);
    }

    #[tokio::test]
    async fn failed_commit_leaves_both_sides_untouched() {
        let store = MemoryStore::new();
        let p = product(2);
        let id = p.id;
        store.put_product(&p).await.unwrap();

        let user = UserId::new();
        let cart = cart_with(user, id, 3);
        let deltas = [StockDelta::reserve(id, key(), 3)];

        let outcome = store.commit_cart(&cart, &deltas).await.unwrap();
        assert_eq!(
            outcome,
            CartCommit::Insufficient {
                product_id: id,
                variant: key(),
                available: 2,
            }
        );

        assert!(store.get_cart(user).await.unwrap().is_none());
        let stock = store.get_product(id).await.unwrap().unwrap().variants[0].stock;
        assert_eq!(stock, 2);
    }

    #[tokio::test]
    async fn committing_an_empty_cart_deletes_the_document() {
        let store = MemoryStore::new();
        let p = product(5);
        let id = p.id;
        store.put_product(&p).await.unwrap();

        let user = UserId::new();
        let cart = cart_with(user, id, 1);
        store
            .commit_cart(&cart, &[StockDelta::reserve(id, key(), 1)])
            .await
            .unwrap();

        let empty = Cart::empty(user);
        store
            .commit_cart(&empty, &[StockDelta::release(id, key(), 1)])
            .await
            .unwrap();
        assert!(store.get_cart(user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn releases_on_vanished_products_are_skipped() {
        let store = MemoryStore::new();
        let user = UserId::new();
        let empty = Cart::empty(user);
        let deltas = [StockDelta::release(ProductId::new(), key(), 2)];

        let outcome = store.commit_cart(&empty, &deltas).await.unwrap();
        assert_eq!(outcome, CartCommit::Committed);
    }

    #[tokio::test]
    async fn reserves_on_vanished_products_abort() {
        let store = MemoryStore::new();
        let user = UserId::new();
        let missing = ProductId::new();
        let cart = cart_with(user, missing, 1);
        let deltas = [StockDelta::reserve(missing, key(), 1)];

        let outcome = store.commit_cart(&cart, &deltas).await.unwrap();
        assert!(matches!(outcome, CartCommit::NotFound { .. }));
        assert!(store.get_cart(user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_order_clears_the_owning_cart() {
        let store = MemoryStore::new();
        let p = product(5);
        let id = p.id;
        store.put_product(&p).await.unwrap();

        let user = UserId::new();
        let cart = cart_with(user, id, 2);
        store
            .commit_cart(&cart, &[StockDelta::reserve(id, key(), 2)])
            .await
            .unwrap();

        let order = order_from(&cart);
        store.insert_order_clearing_cart(&order).await.unwrap();

        assert!(store.get_cart(user).await.unwrap().is_none());
        assert!(store.get_order(order.id).await.unwrap().is_some());
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn update_order_checks_the_revision() {
        let store = MemoryStore::new();
        let user = UserId::new();
        let cart = cart_with(user, ProductId::new(), 1);
        let mut order = order_from(&cart);
        store.insert_order_clearing_cart(&order).await.unwrap();

        order.revision = 2;
        store.update_order(&order, 1, &[]).await.unwrap();

        // Same expected revision again is now stale.
        let result = store.update_order(&order, 1, &[]).await;
        assert!(matches!(
            result,
            Err(StoreError::RevisionConflict {
                expected: 1,
                actual: 2,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn update_order_rejects_unknown_orders() {
        let store = MemoryStore::new();
        let cart = cart_with(UserId::new(), ProductId::new(), 1);
        let order = order_from(&cart);

        let result = store.update_order(&order, 1, &[]).await;
        assert!(matches!(result, Err(StoreError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn order_listings_come_newest_first() {
        let store = MemoryStore::new();
        let user = UserId::new();

        let mut first = order_from(&cart_with(user, ProductId::new(), 1));
        first.created_at = Utc::now() - chrono::Duration::minutes(5);
        let second = order_from(&cart_with(user, ProductId::new(), 1));

        store.insert_order_clearing_cart(&first).await.unwrap();
        store.insert_order_clearing_cart(&second).await.unwrap();

        let listed = store.list_orders_for_customer(user).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[tokio::test]
    async fn user_lookups_by_subject_and_email() {
        let store = MemoryStore::new();
        let user = User::rider(
            "sub-1".to_string(),
            "Kim".to_string(),
            "kim@example.com".to_string(),
            None,
            None,
        );
        store.put_user(&user).await.unwrap();

        assert!(store.get_user_by_subject("sub-1").await.unwrap().is_some());
        assert!(store.get_user_by_subject("sub-2").await.unwrap().is_none());
        assert!(
            store
                .get_user_by_email("kim@example.com")
                .await
                .unwrap()
                .is_some()
        );
        assert_eq!(store.list_users_by_role(Role::Rider).await.unwrap().len(), 1);
        assert!(store.delete_user(user.id).await.unwrap());
        assert!(!store.delete_user(user.id).await.unwrap());
    }
}
