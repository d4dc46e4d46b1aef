//! Product catalog model and the inventory ledger.
//!
//! The ledger is the only component that mutates stock counts. All
//! movement goes through the store's atomic conditional adjustment, so
//! two requests racing for the last unit serialize at the storage layer.

use common::{Money, ProductId, VariantKey};
use serde::{Deserialize, Serialize};

use crate::access::{Actor, Role, authorize};
use crate::error::{DomainError, Resource};
use crate::store::{StockAdjust, Store};

/// A purchasable color/size combination with its own stock and price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub color: String,
    pub size: String,
    pub stock: u32,
    pub price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl ProductVariant {
    /// Returns this variant's identity within its product.
    pub fn key(&self) -> VariantKey {
        VariantKey::new(self.color.clone(), self.size.clone())
    }

    /// Returns true when this variant matches the given key.
    pub fn matches(&self, key: &VariantKey) -> bool {
        self.color == key.color && self.size == key.size
    }
}

/// A catalog product document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: String,
    pub brand: String,
    pub variants: Vec<ProductVariant>,
}

impl Product {
    /// Finds a variant by key.
    pub fn variant(&self, key: &VariantKey) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| v.matches(key))
    }

    /// Finds a variant by key, mutably.
    pub fn variant_mut(&mut self, key: &VariantKey) -> Option<&mut ProductVariant> {
        self.variants.iter_mut().find(|v| v.matches(key))
    }
}

/// Owner of all stock-count mutation.
///
/// `reserve` decrements at cart-add time, `release` is the compensating
/// increment for removals and cancellations, and `restock` is the
/// admin-gated catalog top-up.
pub struct InventoryLedger<S: Store> {
    store: S,
}

impl<S: Store> InventoryLedger<S> {
    /// Creates a new ledger over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Atomically reserves `quantity` units of a variant.
    ///
    /// Fails with `InsufficientStock` when the variant holds fewer units,
    /// leaving stock unchanged. Returns the new stock level.
    #[tracing::instrument(skip(self))]
    pub async fn reserve(
        &self,
        product_id: ProductId,
        variant: &VariantKey,
        quantity: u32,
    ) -> Result<u32, DomainError> {
        match self
            .store
            .adjust_stock(product_id, variant, -(quantity as i64))
            .await?
        {
            StockAdjust::Adjusted { level } => {
                metrics::counter!("inventory_reservations_total").increment(1);
                Ok(level)
            }
            StockAdjust::Insufficient { available } => Err(DomainError::InsufficientStock {
                product_id,
                variant: variant.clone(),
                requested: quantity,
                available,
            }),
            StockAdjust::NotFound => Err(self.missing(product_id).await?),
        }
    }

    /// Releases `quantity` units back to a variant.
    ///
    /// Compensating action for cart removal, cart clear, and order
    /// cancellation. No catalog ceiling is enforced.
    #[tracing::instrument(skip(self))]
    pub async fn release(
        &self,
        product_id: ProductId,
        variant: &VariantKey,
        quantity: u32,
    ) -> Result<u32, DomainError> {
        match self
            .store
            .adjust_stock(product_id, variant, quantity as i64)
            .await?
        {
            StockAdjust::Adjusted { level } => {
                metrics::counter!("inventory_releases_total").increment(1);
                Ok(level)
            }
            StockAdjust::Insufficient { available } => Err(DomainError::InsufficientStock {
                product_id,
                variant: variant.clone(),
                requested: quantity,
                available,
            }),
            StockAdjust::NotFound => Err(self.missing(product_id).await?),
        }
    }

    /// Returns the live price of a variant.
    pub async fn price_of(
        &self,
        product_id: ProductId,
        variant: &VariantKey,
    ) -> Result<Money, DomainError> {
        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or(DomainError::NotFound(Resource::Product))?;
        product
            .variant(variant)
            .map(|v| v.price)
            .ok_or(DomainError::NotFound(Resource::Variant))
    }

    /// Admin stock adjustment against the catalog.
    ///
    /// Accepts negative deltas but still enforces the zero floor.
    #[tracing::instrument(skip(self, actor))]
    pub async fn restock(
        &self,
        actor: &Actor,
        product_id: ProductId,
        variant: &VariantKey,
        delta: i64,
    ) -> Result<u32, DomainError> {
        authorize(actor.role, Role::Admin)?;
        match self.store.adjust_stock(product_id, variant, delta).await? {
            StockAdjust::Adjusted { level } => Ok(level),
            StockAdjust::Insufficient { available } => Err(DomainError::InsufficientStock {
                product_id,
                variant: variant.clone(),
                requested: delta.unsigned_abs() as u32,
                available,
            }),
            StockAdjust::NotFound => Err(self.missing(product_id).await?),
        }
    }

    /// Distinguishes a missing product from a missing variant.
    async fn missing(&self, product_id: ProductId) -> Result<DomainError, DomainError> {
        Ok(if self.store.get_product(product_id).await?.is_none() {
            DomainError::NotFound(Resource::Product)
        } else {
            DomainError::NotFound(Resource::Variant)
        })
    }
}
