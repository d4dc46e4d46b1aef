//! Cart model and the cart aggregator.
//!
//! Stock is reserved at the moment a quantity is committed to the cart,
//! not at checkout. Every cart mutation commits the cart document and its
//! stock deltas as one atomic store operation, so a failure partway
//! leaves neither applied.

use chrono::{DateTime, Utc};
use common::{Money, ProductId, UserId, VariantKey};
use serde::{Deserialize, Serialize};

use crate::access::Actor;
use crate::catalog::InventoryLedger;
use crate::error::{DomainError, Resource};
use crate::store::{CartCommit, StockDelta, Store};

/// A reserved quantity of one variant in a user's cart.
///
/// `price` is captured from the live variant at add time; later catalog
/// price changes do not alter it until the line is re-added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub variant: VariantKey,
    pub price: Money,
    pub quantity: u32,
}

impl CartLine {
    /// Returns the line subtotal (price x quantity).
    pub fn subtotal(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

/// A user's cart: at most one line per (product, variant) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub user: UserId,
    pub lines: Vec<CartLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty cart for a user.
    pub fn empty(user: UserId) -> Self {
        let now = Utc::now();
        Self {
            user,
            lines: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Finds the line for a (product, variant) pair.
    pub fn line(&self, product_id: ProductId, variant: &VariantKey) -> Option<&CartLine> {
        self.lines
            .iter()
            .find(|l| l.product_id == product_id && &l.variant == variant)
    }

    fn line_index(&self, product_id: ProductId, variant: &VariantKey) -> Option<usize> {
        self.lines
            .iter()
            .position(|l| l.product_id == product_id && &l.variant == variant)
    }

    /// Returns true when the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the total quantity across all lines.
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Returns the sum of line subtotals.
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::subtotal).sum()
    }
}

/// Per-user cart operations with reservation-on-add semantics.
pub struct CartService<S: Store> {
    store: S,
    ledger: InventoryLedger<S>,
}

impl<S: Store + Clone> CartService<S> {
    /// Creates a new cart service over the given store.
    pub fn new(store: S) -> Self {
        Self {
            ledger: InventoryLedger::new(store.clone()),
            store,
        }
    }
}

impl<S: Store> CartService<S> {
    /// Adds a variant to the actor's cart, or replaces the quantity of an
    /// existing line.
    ///
    /// Re-adding a variant is a quantity replacement, not additive: only
    /// the net stock delta is reserved or released, and the captured
    /// price is refreshed from the live variant. On `InsufficientStock`
    /// the existing line is left unchanged.
    #[tracing::instrument(skip(self, actor))]
    pub async fn add_or_update(
        &self,
        actor: &Actor,
        product_id: ProductId,
        variant: VariantKey,
        quantity: u32,
    ) -> Result<Cart, DomainError> {
        if quantity == 0 {
            return Err(DomainError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }

        let price = self.ledger.price_of(product_id, &variant).await?;

        let mut cart = self
            .store
            .get_cart(actor.id)
            .await?
            .unwrap_or_else(|| Cart::empty(actor.id));

        let previous = match cart.line_index(product_id, &variant) {
            Some(idx) => {
                let line = &mut cart.lines[idx];
                let previous = line.quantity;
                line.quantity = quantity;
                line.price = price;
                previous
            }
            None => {
                cart.lines.push(CartLine {
                    product_id,
                    variant: variant.clone(),
                    price,
                    quantity,
                });
                0
            }
        };
        cart.updated_at = Utc::now();

        // Stock moves by the net change only.
        let net = previous as i64 - quantity as i64;
        let deltas = if net == 0 {
            Vec::new()
        } else {
            vec![StockDelta {
                product_id,
                variant: variant.clone(),
                delta: net,
            }]
        };

        match self.store.commit_cart(&cart, &deltas).await? {
            CartCommit::Committed => {
                metrics::counter!("cart_updates_total").increment(1);
                Ok(cart)
            }
            CartCommit::Insufficient { available, .. } => Err(DomainError::InsufficientStock {
                product_id,
                variant,
                requested: quantity.saturating_sub(previous),
                available,
            }),
            CartCommit::NotFound { .. } => Err(DomainError::NotFound(Resource::Variant)),
        }
    }

    /// Removes a line, releasing its full quantity back to inventory.
    ///
    /// Removing an absent line is a no-op returning the current snapshot,
    /// so duplicate client retries never double-release stock.
    #[tracing::instrument(skip(self, actor))]
    pub async fn remove(
        &self,
        actor: &Actor,
        product_id: ProductId,
        variant: &VariantKey,
    ) -> Result<Cart, DomainError> {
        let mut cart = match self.store.get_cart(actor.id).await? {
            Some(cart) => cart,
            None => return Ok(Cart::empty(actor.id)),
        };

        let Some(idx) = cart.line_index(product_id, variant) else {
            return Ok(cart);
        };

        let line = cart.lines.remove(idx);
        cart.updated_at = Utc::now();

        let deltas = [StockDelta::release(
            line.product_id,
            line.variant,
            line.quantity,
        )];
        match self.store.commit_cart(&cart, &deltas).await? {
            CartCommit::Committed => Ok(cart),
            // Releases are skipped for vanished variants and cannot hit
            // the floor; any other outcome is a store defect.
            CartCommit::Insufficient { .. } | CartCommit::NotFound { .. } => {
                Err(DomainError::NotFound(Resource::Variant))
            }
        }
    }

    /// Empties the cart, releasing every line's quantity.
    #[tracing::instrument(skip(self, actor))]
    pub async fn clear(&self, actor: &Actor) -> Result<(), DomainError> {
        let mut cart = match self.store.get_cart(actor.id).await? {
            Some(cart) => cart,
            None => return Ok(()),
        };

        let deltas: Vec<StockDelta> = cart
            .lines
            .drain(..)
            .map(|l| StockDelta::release(l.product_id, l.variant, l.quantity))
            .collect();
        cart.updated_at = Utc::now();

        match self.store.commit_cart(&cart, &deltas).await? {
            CartCommit::Committed => Ok(()),
            CartCommit::Insufficient { .. } | CartCommit::NotFound { .. } => {
                Err(DomainError::NotFound(Resource::Variant))
            }
        }
    }

    /// Returns the actor's cart, empty when none exists.
    pub async fn snapshot(&self, actor: &Actor) -> Result<Cart, DomainError> {
        Ok(self
            .store
            .get_cart(actor.id)
            .await?
            .unwrap_or_else(|| Cart::empty(actor.id)))
    }

    /// Returns the total quantity across the actor's cart lines.
    pub async fn count_items(&self, actor: &Actor) -> Result<u32, DomainError> {
        Ok(self.snapshot(actor).await?.total_quantity())
    }
}
