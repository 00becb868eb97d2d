//! Storefront Cart
//!
//! Client-side cart reconciliation for a storefront whose products come in
//! color, size and bulk-count variants.
//!
//! ## Features
//! - Variant-keyed cart lines that merge instead of duplicating
//! - Combination-aware stock resolution (color and bulk-option ledgers)
//! - Reservation accounting across lines sharing a color or option
//! - Cart store with snapshot persistence behind a port
//! - Availability projection for product pages
//! - Order summary with tiered shipping and display currency

pub mod config;
pub mod domain;
pub mod http;
pub mod persistence;
pub mod store;
pub mod summary;

use thiserror::Error;

pub use domain::aggregates::{CartLine, CartState, ColorStock, CountPrice, Product, SelectionError};
pub use domain::availability::{AvailabilityProjector, ProductAvailability};
pub use domain::events::CartEvent;
pub use domain::reservation::{remaining_for_pair, reserved_by_others, Selector};
pub use domain::stock::{effective_stock, StockLedger};
pub use domain::value_objects::{Money, Region};
pub use domain::variant::{VariantKey, VariantSelection, VariantSource};
pub use persistence::{CartPersistence, CartSnapshot, InMemoryPersistence, JsonFilePersistence, PersistenceError};
pub use store::{CartStore, QuantityChange, RemovePolicy};
pub use summary::OrderSummary;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("Invalid request: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid selection: {0}")]
    Selection(#[from] SelectionError),

    #[error("Storage error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Cart request failed: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
