//! Domain layer for the storefront order/cart/stock core.
//!
//! This crate provides the components of the order flow:
//! - Access gate for role-based authorization
//! - Inventory ledger owning all stock mutation
//! - Cart aggregator with reservation-on-add semantics
//! - Order builder and order status machine
//! - User directory for identity-subject resolution and rider management
//!
//! Persistence is abstracted behind the [`store::Store`] trait; adapters
//! live in the `doc-store` crate.

pub mod access;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod order;
pub mod store;
pub mod user;

pub use access::{Actor, Role, authorize, authorize_owner_or_admin};
pub use cart::{Cart, CartLine, CartService};
pub use catalog::{InventoryLedger, Product, ProductVariant};
pub use error::{DomainError, Resource};
pub use order::{
    CustomerDetails, Order, OrderLine, OrderService, OrderStatus, PaymentMethod, RiderSnapshot,
};
pub use store::{CartCommit, StockAdjust, StockDelta, Store, StoreError};
pub use user::{
    NewRider, RiderDetails, RiderOverview, RiderUpdate, User, UserDirectory, VehicleType,
};
