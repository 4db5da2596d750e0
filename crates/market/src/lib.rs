//! Marketplaces: named remote catalogs of installable modules.
//!
//! Each marketplace is a reference file under `market/` plus the last
//! fetched catalog under `market/cache/`.

pub mod catalog;
pub mod error;
pub mod registry;

pub use {
    catalog::{CatalogModule, MarketRef, Marketplace, fetch_catalog, parse_market_ref},
    error::{Error, Result},
    registry::{MarketHit, MarketRegistry, MarketSummary},
};
