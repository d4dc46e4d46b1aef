//! Domain error taxonomy.

use common::{ProductId, VariantKey};
use thiserror::Error;

use crate::order::OrderStatus;
use crate::store::StoreError;

/// The kind of resource a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Product,
    Variant,
    Cart,
    Order,
    Rider,
    User,
}

impl Resource {
    /// Returns the resource name used in machine-readable error codes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Product => "product",
            Resource::Variant => "variant",
            Resource::Cart => "cart",
            Resource::Order => "order",
            Resource::Rider => "rider",
            Resource::User => "user",
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur during order-flow operations.
///
/// Every mutating operation either fully succeeds or reports exactly one
/// of these kinds; there is no partial-success path.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The requested quantity exceeds the variant's available stock.
    #[error(
        "insufficient stock for variant {variant} of product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        variant: VariantKey,
        requested: u32,
        available: u32,
    },

    /// Order placement was attempted with no lines in the cart.
    #[error("cart is empty")]
    EmptyCart,

    /// The target status is not reachable from the current status.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Shipping was requested without an assigned rider.
    #[error("an assigned rider is required before shipping")]
    RiderRequired,

    /// The actor lacks the rights for this operation.
    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    /// A referenced resource does not exist.
    #[error("{0} not found")]
    NotFound(Resource),

    /// The request was structurally well-formed but semantically invalid.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The persistence collaborator failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DomainError {
    /// Returns the stable machine-readable code for this error kind.
    ///
    /// Codes follow the `area/detail` convention of the calling layer's
    /// JSON error bodies and never change between releases.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::InsufficientStock { .. } => "stock/insufficient",
            DomainError::EmptyCart => "cart/empty",
            DomainError::InvalidTransition { .. } => "order/invalid-transition",
            DomainError::RiderRequired => "order/rider-required",
            DomainError::Forbidden(_) => "auth/forbidden",
            DomainError::NotFound(resource) => match resource {
                Resource::Product => "product/not-found",
                Resource::Variant => "variant/not-found",
                Resource::Cart => "cart/not-found",
                Resource::Order => "order/not-found",
                Resource::Rider => "rider/not-found",
                Resource::User => "user/not-found",
            },
            DomainError::Validation(_) => "request/invalid",
            DomainError::Store(StoreError::RevisionConflict { .. }) => "order/conflict",
            DomainError::Store(StoreError::OrderNotFound(_)) => "order/not-found",
            DomainError::Store(_) => "storage/failure",
        }
    }
}
