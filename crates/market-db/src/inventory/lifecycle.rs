//! # Sale Lifecycle (storage side)
//!
//! Applies the `market_core::lifecycle` state machine to sale rows and
//! runs the two exits out of `in_process`.
//!
//! ## The Sale Guard
//! ```text
//! Every mutating transaction starts with:
//!
//!   UPDATE sales SET updated_at = now
//!    WHERE id = ? AND status = 'in_process'
//!
//!   1 row  → sale is editable, and this transaction now holds the SQLite
//!            write lock, so no finalize/cancel/edit can interleave
//!   0 rows → missing sale (NotFound) or frozen sale (InvalidSaleStatus)
//! ```
//!
//! ## Finalize / Cancel
//! ```text
//! finalize:  guard → load lines → reservation checks → commit each line
//!            → status = completed, total = Σ line prices
//! cancel:    guard → release each line → delete lines → status = cancelled
//! ```
//! Each runs in a single transaction; any failure leaves the sale
//! `in_process` with its basket and stock untouched.

use chrono::Utc;
use market_core::accumulator::{sale_total, validate_for_finalize};
use market_core::lifecycle::{transition, SaleAction};
use market_core::validation::validate_id;
use market_core::{CoreError, Sale, SaleStatus, ValidationError};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::InventoryResult;
use crate::inventory::accumulator::reservation_checks;
use crate::inventory::aggregator::fetch_lines;
use crate::inventory::ledger::{commit_in, release_in};
use crate::repository::sale::SaleRepository;

/// Finalize and cancel.
#[derive(Debug, Clone)]
pub struct SaleLifecycle {
    pool: SqlitePool,
}

impl SaleLifecycle {
    pub fn new(pool: SqlitePool) -> Self {
        SaleLifecycle { pool }
    }

    /// Locks the basket and commits the sale's total price.
    ///
    /// ## Errors
    /// - `InvalidArgument` when the sale has no lines
    /// - `InsufficientStock` when a stock correction ate into a line's
    ///   reservation since it was added
    /// - `InvalidSaleStatus` when the sale already left `in_process`
    pub async fn finalize(&self, sale_id: &str) -> InventoryResult<Sale> {
        validate_id("sale_id", sale_id)?;

        let mut tx = self.pool.begin().await?;
        let sale = lock_sale(&mut *tx, sale_id, SaleAction::Finalize).await?;
        let next = transition(sale_id, sale.status, SaleAction::Finalize)?;

        let lines = fetch_lines(&mut *tx, sale_id).await?;
        if lines.is_empty() {
            return Err(ValidationError::Required {
                field: "basket_lines".to_string(),
            }
            .into());
        }

        let checks = reservation_checks(&mut *tx, &sale.branch_id, &lines).await?;
        validate_for_finalize(&sale.branch_id, &checks)?;

        for line in &lines {
            commit_in(&mut *tx, &line.product_id, &sale.branch_id, line.quantity, Some(sale_id)).await?;
        }

        let total = sale_total(&lines);
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE sales
            SET status = ?2, total_price_cents = ?3, completed_at = ?4, updated_at = ?4
            WHERE id = ?1 AND status = 'in_process'
            "#,
        )
        .bind(sale_id)
        .bind(next)
        .bind(total.cents())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            sale_id,
            branch_id = %sale.branch_id,
            lines = lines.len(),
            total = %total,
            "Sale completed"
        );

        Ok(Sale {
            status: next,
            total_price_cents: total.cents(),
            updated_at: now,
            completed_at: Some(now),
            ..sale
        })
    }

    /// Abandons the sale and returns every reserved unit to stock.
    pub async fn cancel(&self, sale_id: &str) -> InventoryResult<Sale> {
        validate_id("sale_id", sale_id)?;

        let mut tx = self.pool.begin().await?;
        let sale = lock_sale(&mut *tx, sale_id, SaleAction::Cancel).await?;
        let next = transition(sale_id, sale.status, SaleAction::Cancel)?;

        let lines = fetch_lines(&mut *tx, sale_id).await?;
        let mut released = 0;
        for line in &lines {
            released += release_in(&mut *tx, &line.product_id, &sale.branch_id, line.quantity, Some(sale_id)).await?;
        }

        sqlx::query("DELETE FROM basket_lines WHERE sale_id = ?1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        let now = Utc::now();
        sqlx::query("UPDATE sales SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(sale_id)
            .bind(next)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(sale_id, lines = lines.len(), released, "Sale cancelled");

        Ok(Sale {
            status: next,
            updated_at: now,
            ..sale
        })
    }
}

/// Sale guard: takes the write lock on an editable sale and returns it.
///
/// The touch and the read share one transaction, so a sale read back as
/// `in_process` is always one the touch matched.
///
/// ## Errors
/// - `NotFound` when the sale does not exist
/// - `InvalidSaleStatus` when `action` is illegal in its current status
pub(crate) async fn lock_sale(conn: &mut SqliteConnection, sale_id: &str, action: SaleAction) -> InventoryResult<Sale> {
    sqlx::query("UPDATE sales SET updated_at = ?2 WHERE id = ?1 AND status = ?3")
        .bind(sale_id)
        .bind(Utc::now())
        .bind(SaleStatus::InProcess)
        .execute(&mut *conn)
        .await?;

    let sale = SaleRepository::fetch(conn, sale_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Sale", sale_id))?;

    // Rejects frozen sales with InvalidSaleStatus.
    transition(sale_id, sale.status, action)?;

    Ok(sale)
}

// =============================================================================
// Unit Tests
// =============================================================================
