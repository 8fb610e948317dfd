//! Ledger store boundary.
//!
//! This module defines the infrastructure-facing abstraction for reading and
//! atomically mutating the stock pool and the request ledger, without making
//! any storage assumptions.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::MemoryLedgerStore;
pub use postgres::PostgresLedgerStore;
pub use r#trait::{Commit, LedgerStore, LedgerWrite, StoreError};
