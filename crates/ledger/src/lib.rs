//! Request ledger domain module.
//!
//! This crate contains the business rules for the stock-backed request
//! ledger, implemented purely as deterministic domain logic (no IO, no HTTP,
//! no storage).

pub mod entry;
pub mod stock;

pub use entry::{DeliveryState, LedgerEntry};
