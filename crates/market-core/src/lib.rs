//! # market-core: Pure Inventory Rules for Market POS
//!
//! This crate holds the business rules of the inventory-consistency core
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Market POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                Request layer (HTTP, external)                   │   │
//! │  │   CreateBasketLine ─► UpdateBasketLine ─► FinalizeSale          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              market-db (InventoryService, SQLite)               │   │
//! │  │   StockLedger • BasketAggregator • SaleAccumulator • Lifecycle  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ calls pure rules                       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ market-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌───────────┐ ┌─────────────────┐  │   │
//! │  │   │  types   │ │  money   │ │  basket   │ │   lifecycle     │  │   │
//! │  │   │  Sale    │ │  Money   │ │  merge    │ │ in_process ─►   │  │   │
//! │  │   │  Basket  │ │          │ │  deltas   │ │ completed/      │  │   │
//! │  │   │  Stock   │ │          │ │           │ │ cancelled       │  │   │
//! │  │   └──────────┘ └──────────┘ └───────────┘ └─────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Product, StockRecord, Sale, BasketLine, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`error`] - Domain error taxonomy
//! - [`validation`] - Input validation
//! - [`lifecycle`] - Sale state machine
//! - [`basket`] - Basket line merge and stock delta rules
//! - [`accumulator`] - Sale totals and finalize-time stock validation
//!
//! ## Example Usage
//!
//! ```rust
//! use market_core::lifecycle::{transition, SaleAction};
//! use market_core::SaleStatus;
//!
//! let next = transition("sale-1", SaleStatus::InProcess, SaleAction::Finalize).unwrap();
//! assert_eq!(next, SaleStatus::Completed);
//!
//! // Completed sales are frozen.
//! assert!(transition("sale-1", next, SaleAction::EditBasket).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod accumulator;
pub mod basket;
pub mod error;
pub mod lifecycle;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single product requested in one basket operation.
///
/// ## Business Reason
/// Catches fat-finger input (typing 10000 instead of 10) before any stock
/// is reserved.
pub const MAX_LINE_QUANTITY: i64 = 9_999;
