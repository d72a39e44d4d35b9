//! # market-db: Storage Layer and Inventory Core for Market POS
//!
//! SQLite access for the Market POS backend, and the only place stock
//! levels, baskets and sale statuses are written.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Market POS Data Flow                              │
//! │                                                                         │
//! │  Request handler (POST /basket-lines, POST /sales/:id/finalize)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    market-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │   Inventory   │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (inventory/)  │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ StockLedger   │    │ 001_init.sql │  │   │
//! │  │   │ WAL + busy    │    │ BasketAggr.   │    │              │  │   │
//! │  │   │ timeout       │    │ SaleLifecycle │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Storage and inventory error types
//! - [`inventory`] - Stock ledger, basket aggregation, sale lifecycle
//! - [`repository`] - Catalog and sale row access
//! - [`config`] - TOML + environment configuration
//! - [`telemetry`] - Tracing subscriber setup
//!
//! ## Usage
//!
//! ```rust,ignore
//! use market_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/market.db")).await?;
//! let inventory = db.inventory();
//!
//! let sale = db.sales().create_sale(&branch_id).await?;
//! inventory.create_basket_line(&sale.id, &product_id, 2).await?;
//! let sale = inventory.finalize_sale(&sale.id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod inventory;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, MarketConfig};
pub use error::{DbError, DbResult, InventoryError, InventoryResult};
pub use inventory::{InventoryService, InventorySettings};
pub use pool::{Database, DbConfig};

// Component re-exports for convenience
pub use inventory::accumulator::SaleAccumulator;
pub use inventory::aggregator::BasketAggregator;
pub use inventory::ledger::StockLedger;
pub use inventory::lifecycle::SaleLifecycle;
pub use repository::branch::BranchRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
