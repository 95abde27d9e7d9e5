//! # Feira - data access for a local street-market marketplace
//!
//! Feira provides:
//! - The relational schema (users, vendors, products, reviews, orders, carts, audit logs)
//! - A schema manager that materializes it idempotently in SQLite
//! - Per-call data-access operations (users, product listing, carts, reviews)
//!
//! "Search by location" is a stub: latitude, longitude and radius are accepted
//! but not applied as a filter. See [`FeiraStore::list_products_by_location`].

pub mod config;
pub mod models;
pub mod storage;
pub mod ui;

pub use models::{CartLine, Category, NewProduct, NewUser, NewVendor, ProductListing, User, UserRole};
pub use storage::{FeiraStore, SchemaManager, StoreStats};

use std::path::PathBuf;

/// Result type alias for Feira operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Feira operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cannot open database {path}: {source}")]
    Connection {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("No open database connection")]
    NotConnected,

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("Failed to {context}: {source}")]
    Operation {
        context: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

impl Error {
    /// Wrap a store-level fault with the name of the operation that hit it
    pub fn operation(context: &'static str, source: rusqlite::Error) -> Self {
        Error::Operation { context, source }
    }

    /// Whether this is a unique-constraint violation on a user-facing field
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Error::Duplicate(_))
    }
}
