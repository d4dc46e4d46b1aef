//! Persistence port for the storefront core.
//!
//! The store is a document-oriented collaborator with per-entity
//! collections (products, carts, orders, users). Every multi-step
//! mutation the order flow needs — stock movement plus cart write, order
//! insert plus cart clear, status write plus cancellation releases — is a
//! single method here, so the transactional boundary is owned by one
//! layer and no component performs ad hoc rollback.

use async_trait::async_trait;
use common::{OrderId, ProductId, UserId, VariantKey};
use thiserror::Error;

use crate::access::Role;
use crate::cart::Cart;
use crate::catalog::Product;
use crate::order::Order;
use crate::user::User;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An order write raced with a concurrent write.
    /// The expected revision did not match the stored revision.
    #[error("revision conflict for order {order_id}: expected {expected}, found {actual}")]
    RevisionConflict {
        order_id: OrderId,
        expected: i64,
        actual: i64,
    },

    /// A revision-checked write targeted an order that does not exist.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// The storage backend failed.
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A serialization/deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Wraps an adapter-specific error as a backend failure.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        StoreError::Backend(Box::new(err))
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// A single stock movement applied as part of a composite write.
///
/// Negative deltas reserve (decrement) stock, positive deltas release
/// (increment) it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDelta {
    pub product_id: ProductId,
    pub variant: VariantKey,
    pub delta: i64,
}

impl StockDelta {
    /// A delta that reserves `quantity` units.
    pub fn reserve(product_id: ProductId, variant: VariantKey, quantity: u32) -> Self {
        Self {
            product_id,
            variant,
            delta: -(quantity as i64),
        }
    }

    /// A delta that releases `quantity` units.
    pub fn release(product_id: ProductId, variant: VariantKey, quantity: u32) -> Self {
        Self {
            product_id,
            variant,
            delta: quantity as i64,
        }
    }
}

/// Outcome of a single-variant stock adjustment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockAdjust {
    /// The adjustment was applied; `level` is the new stock count.
    Adjusted { level: u32 },
    /// A decrement would have taken stock below zero; nothing was changed.
    Insufficient { available: u32 },
    /// The product or variant does not exist.
    NotFound,
}

/// Outcome of an atomic cart commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartCommit {
    /// Cart document and all stock deltas were applied.
    Committed,
    /// A reserving delta could not be satisfied; nothing was changed.
    Insufficient {
        product_id: ProductId,
        variant: VariantKey,
        available: u32,
    },
    /// A reserving delta referenced a missing product or variant;
    /// nothing was changed.
    NotFound {
        product_id: ProductId,
        variant: VariantKey,
    },
}

/// Core trait for storefront store implementations.
///
/// All implementations must be thread-safe (Send + Sync), and concurrent
/// adjustments to the same variant's stock must serialize at the storage
/// layer: a conditional decrement either applies fully or reports
/// insufficiency, never a lost update.
#[async_trait]
pub trait Store: Send + Sync {
    // -- catalog --

    /// Retrieves a product document by id.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Lists all product documents.
    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Inserts or replaces a product document.
    ///
    /// Seed/test surface; the HTTP layer exposes no catalog CRUD.
    async fn put_product(&self, product: &Product) -> Result<()>;

    /// Atomically adjusts one variant's stock with a floor of zero.
    ///
    /// The read-modify-write is serialized at the storage layer; a
    /// decrement below zero is rejected as [`StockAdjust::Insufficient`]
    /// without mutation.
    async fn adjust_stock(
        &self,
        id: ProductId,
        variant: &VariantKey,
        delta: i64,
    ) -> Result<StockAdjust>;

    // -- carts --

    /// Retrieves a user's cart document, if one exists.
    async fn get_cart(&self, user: UserId) -> Result<Option<Cart>>;

    /// Writes a cart document and applies its stock deltas atomically.
    ///
    /// Either the cart write and every delta apply, or none do. A cart
    /// with no lines is deleted rather than stored. Releasing deltas that
    /// reference a missing variant are skipped (the stock has nowhere to
    /// return to); reserving deltas on a missing variant abort with
    /// [`CartCommit::NotFound`].
    async fn commit_cart(&self, cart: &Cart, deltas: &[StockDelta]) -> Result<CartCommit>;

    // -- orders --

    /// Inserts an order and deletes the owning user's cart atomically.
    ///
    /// Either the order exists and the cart is gone, or neither changed.
    async fn insert_order_clearing_cart(&self, order: &Order) -> Result<()>;

    /// Replaces an order document, revision-checked, applying any
    /// releasing stock deltas in the same atomic unit.
    ///
    /// Fails with [`StoreError::RevisionConflict`] when the stored
    /// revision differs from `expected_revision`. Releases against
    /// missing variants are skipped.
    async fn update_order(
        &self,
        order: &Order,
        expected_revision: i64,
        releases: &[StockDelta],
    ) -> Result<()>;

    /// Retrieves an order by id.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists a customer's orders, newest first.
    async fn list_orders_for_customer(&self, customer: UserId) -> Result<Vec<Order>>;

    /// Lists all orders, newest first.
    async fn list_orders(&self) -> Result<Vec<Order>>;

    /// Lists the orders assigned to a rider, newest first.
    async fn list_orders_for_rider(&self, rider: UserId) -> Result<Vec<Order>>;

    /// Counts the orders assigned to a rider.
    async fn count_orders_for_rider(&self, rider: UserId) -> Result<u64>;

    // -- users --

    /// Retrieves a user by id.
    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    /// Retrieves a user by identity-provider subject.
    async fn get_user_by_subject(&self, subject_id: &str) -> Result<Option<User>>;

    /// Retrieves a user by email.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Inserts or replaces a user document.
    async fn put_user(&self, user: &User) -> Result<()>;

    /// Deletes a user document. Returns false when no such user existed.
    async fn delete_user(&self, id: UserId) -> Result<bool>;

    /// Lists users holding the given role.
    async fn list_users_by_role(&self, role: Role) -> Result<Vec<User>>;
}
