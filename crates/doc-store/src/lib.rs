//! Document-store adapters for the storefront core.
//!
//! Implements [`domain::Store`] twice: [`MemoryStore`] keeps every
//! collection behind one in-process lock (tests, local development), and
//! [`PostgresStore`] persists JSONB documents with SQL transactions
//! backing the atomic composite operations.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
