//! `almox-directory` — reference-data boundary.
//!
//! Catalog and identity data (product names, categories, users, sectors) are
//! owned by external collaborators; the request ledger only reads them
//! through this interface, for existence checks and display joins. Nothing
//! behind this boundary may touch a product's available quantity.

pub mod directory;

pub use directory::{Category, Directory, DirectoryError, ProductRecord, Sector, UserRecord};
