//! # Domain Types
//!
//! Records owned or read by the inventory core.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │  StockRecord    │   │     Branch      │       │
//! │  │  (external)     │   │ (product,branch)│   │   (external)    │       │
//! │  │  price_cents    │   │  quantity  ≥ 0  │   │                 │       │
//! │  │  barcode        │   │  reserved  ≥ 0  │   │                 │       │
//! │  └────────┬────────┘   └────────▲────────┘   └────────┬────────┘       │
//! │           │ unit price          │ Reserve/Release     │ branch_id      │
//! │           ▼                     │ Commit              ▼                │
//! │  ┌─────────────────┐   ┌────────┴────────┐   ┌─────────────────┐       │
//! │  │   BasketLine    │──►│      Sale       │   │  StockMovement  │       │
//! │  │ (sale,product)  │   │  status         │   │  journal entry  │       │
//! │  │  unique         │   │  total_price    │   │  per mutation   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Identifiers are UUID v4 strings, timestamps are UTC.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Branch
// =============================================================================

/// A store location holding its own stock.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Branch {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A sellable item. Read-only for the inventory core.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    pub category_id: Option<String>,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    /// Barcode (EAN-13, UPC-A, etc.).
    pub barcode: String,

    /// Unit price in minor units. Never negative.
    pub price_cents: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the unit price as a Money type.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Stock Record
// =============================================================================

/// Stock of one product at one branch.
///
/// ## Two Counters
/// ```text
///   quantity  - free units, what Reserve draws from
///   reserved  - units held by in_process sales, what Commit consumes
///
///   Reserve(q):  quantity -= q, reserved += q   (only if quantity >= q)
///   Release(q):  quantity += q, reserved -= q
///   Commit(q):                  reserved -= q   (sale finalized)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockRecord {
    pub product_id: String,
    pub branch_id: String,
    pub quantity: i64,
    pub reserved: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl StockRecord {
    /// Units physically on hand: free plus reserved.
    #[inline]
    pub fn on_hand(&self) -> i64 {
        self.quantity + self.reserved
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale.
///
/// Stored and serialized as `in_process`, `completed`, `cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Basket is being built; the only editable state.
    InProcess,
    /// Finalized; total price committed.
    Completed,
    /// Abandoned; reservations returned to stock.
    Cancelled,
}

impl SaleStatus {
    /// Returns the storage name of the status.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::InProcess => "in_process",
            SaleStatus::Completed => "completed",
            SaleStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::InProcess
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A cart that accumulates basket lines until finalized or cancelled.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub branch_id: String,
    pub shop_assistant_id: Option<String>,
    pub cashier_id: Option<String>,
    pub client_name: Option<String>,
    pub status: SaleStatus,
    /// Written only by Finalize.
    pub total_price_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Sale {
    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }
}

// =============================================================================
// Basket Line
// =============================================================================

/// A quantity of one product within one sale.
///
/// At most one line exists per `(sale_id, product_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct BasketLine {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Always > 0.
    pub quantity: i64,
    /// Quantity × unit price at the time of each add.
    pub price_cents: i64,
    /// Optimistic concurrency counter, bumped on every write.
    pub version: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl BasketLine {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// What a stock movement did to a stock record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockMovementKind {
    /// Free → reserved for a sale.
    Reserve,
    /// Reserved → free (line reduced/deleted, sale cancelled).
    Release,
    /// Reserved → sold (sale finalized).
    Commit,
    /// Units received into the branch.
    Restock,
    /// Units removed by a stock correction.
    WriteOff,
}

/// Journal entry for one ledger mutation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub branch_id: String,
    pub sale_id: Option<String>,
    pub kind: StockMovementKind,
    pub quantity: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
