//! # Stock Ledger
//!
//! The single source of truth for how many units of a product a branch
//! holds, and the only code that writes `stock_records`.
//!
//! ## Atomic Reserve
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WRONG (oversell window):                                               │
//! │     qty = SELECT quantity ...        ◄── worker B reads the same qty   │
//! │     if qty >= q: UPDATE quantity = qty - q                              │
//! │                                                                         │
//! │  RIGHT (one statement):                                                 │
//! │     UPDATE stock_records                                                │
//! │        SET quantity = quantity - q, reserved = reserved + q             │
//! │      WHERE product_id = P AND branch_id = B AND quantity >= q           │
//! │                                                                         │
//! │     rows_affected = 1 → reserved                                        │
//! │     rows_affected = 0 → record missing (NotFound)                       │
//! │                         or short      (InsufficientStock)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Counters
//! | Operation  | quantity | reserved | Condition                |
//! |------------|----------|----------|--------------------------|
//! | reserve    | -q       | +q       | quantity >= q            |
//! | release    | +q       | -q       | reserved >= q            |
//! | commit     |          | -q       | reserved >= q            |
//! | restock    | +q       |          | creates record if absent |
//! | write_off  | -f       | -(q-f)   | f = min(quantity, q)     |
//!
//! Basket deletes and cancels release `r = min(reserved, q)` instead, since
//! a write-off may already have taken part of their reservation.
//!
//! Every mutation appends one row to `stock_movements` in the same
//! transaction.
//!
//! The `*_in` functions run on a caller's open transaction; the
//! [`StockLedger`] methods wrap each in its own transaction.

use chrono::Utc;
use market_core::{CoreError, StockMovement, StockMovementKind, StockRecord, ValidationError};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, InventoryResult};

/// Ledger handle for stock administration and standalone reservations.
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
}

impl StockLedger {
    pub fn new(pool: SqlitePool) -> Self {
        StockLedger { pool }
    }

    /// Free quantity of a product at a branch.
    ///
    /// ## Errors
    /// `NotFound` when the branch does not stock the product.
    pub async fn check_available(&self, product_id: &str, branch_id: &str) -> InventoryResult<i64> {
        Ok(self.get(product_id, branch_id).await?.quantity)
    }

    /// Full stock record for a product at a branch.
    pub async fn get(&self, product_id: &str, branch_id: &str) -> InventoryResult<StockRecord> {
        let mut conn = self.pool.acquire().await?;
        fetch_record(&mut *conn, product_id, branch_id)
            .await?
            .ok_or_else(|| stock_not_found(product_id, branch_id).into())
    }

    /// Reserves `quantity` units outside of any basket.
    pub async fn reserve(&self, product_id: &str, branch_id: &str, quantity: i64) -> InventoryResult<()> {
        let mut tx = self.pool.begin().await?;
        reserve_in(&mut *tx, product_id, branch_id, quantity, None).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Returns `quantity` reserved units to free stock.
    ///
    /// ## Errors
    /// `InsufficientStock` when fewer than `quantity` units are reserved.
    pub async fn release(&self, product_id: &str, branch_id: &str, quantity: i64) -> InventoryResult<()> {
        ensure_positive(quantity)?;

        let mut tx = self.pool.begin().await?;
        let record = lock_record(&mut *tx, product_id, branch_id).await?;

        if record.reserved < quantity {
            warn!(
                product_id,
                branch_id,
                reserved = record.reserved,
                requested = quantity,
                "Release exceeds reservation"
            );
            return Err(CoreError::InsufficientStock {
                product_id: product_id.to_string(),
                branch_id: branch_id.to_string(),
                available: record.reserved,
                requested: quantity,
            }
            .into());
        }

        release_in(&mut *tx, product_id, branch_id, quantity, None).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Turns reserved units into sold units.
    pub async fn commit(&self, product_id: &str, branch_id: &str, quantity: i64) -> InventoryResult<()> {
        let mut tx = self.pool.begin().await?;
        commit_in(&mut *tx, product_id, branch_id, quantity, None).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Receives `quantity` units, creating the record on first delivery.
    ///
    /// ## Errors
    /// `NotFound` when the product or branch does not exist.
    pub async fn restock(&self, product_id: &str, branch_id: &str, quantity: i64) -> InventoryResult<StockRecord> {
        ensure_positive(quantity)?;

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let upsert = sqlx::query(
            r#"
            INSERT INTO stock_records (product_id, branch_id, quantity, reserved, updated_at)
            VALUES (?1, ?2, ?3, 0, ?4)
            ON CONFLICT (product_id, branch_id)
            DO UPDATE SET quantity = quantity + excluded.quantity,
                          updated_at = excluded.updated_at
            "#,
        )
        .bind(product_id)
        .bind(branch_id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from);

        match upsert {
            Ok(_) => {}
            Err(DbError::ForeignKeyViolation { .. }) => {
                return Err(CoreError::not_found("Product or branch", record_key(product_id, branch_id)).into());
            }
            Err(err) => return Err(err.into()),
        }

        record_movement(&mut *tx, product_id, branch_id, None, StockMovementKind::Restock, quantity).await?;

        let record = fetch_record(&mut *tx, product_id, branch_id)
            .await?
            .ok_or_else(|| DbError::not_found("StockRecord", record_key(product_id, branch_id)))?;
        tx.commit().await?;

        debug!(product_id, branch_id, quantity, on_hand = record.on_hand(), "Restocked");
        Ok(record)
    }

    /// Removes `quantity` physical units (shrinkage, manual recount).
    ///
    /// Free units go first, then reserved ones. Sales whose reservation is
    /// eaten this way fail finalize validation.
    ///
    /// ## Errors
    /// `InsufficientStock` when fewer than `quantity` units are on hand.
    pub async fn write_off(&self, product_id: &str, branch_id: &str, quantity: i64) -> InventoryResult<StockRecord> {
        ensure_positive(quantity)?;

        let mut tx = self.pool.begin().await?;
        let record = lock_record(&mut *tx, product_id, branch_id).await?;

        if record.on_hand() < quantity {
            warn!(product_id, branch_id, quantity, on_hand = record.on_hand(), "Write-off exceeds stock");
            return Err(CoreError::InsufficientStock {
                product_id: product_id.to_string(),
                branch_id: branch_id.to_string(),
                available: record.on_hand(),
                requested: quantity,
            }
            .into());
        }

        let from_free = record.quantity.min(quantity);
        let from_reserved = quantity - from_free;

        sqlx::query(
            r#"
            UPDATE stock_records
            SET quantity = quantity - ?3, reserved = reserved - ?4, updated_at = ?5
            WHERE product_id = ?1 AND branch_id = ?2
            "#,
        )
        .bind(product_id)
        .bind(branch_id)
        .bind(from_free)
        .bind(from_reserved)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        record_movement(&mut *tx, product_id, branch_id, None, StockMovementKind::WriteOff, quantity).await?;

        let updated = fetch_record(&mut *tx, product_id, branch_id)
            .await?
            .ok_or_else(|| stock_not_found(product_id, branch_id))?;
        tx.commit().await?;

        debug!(product_id, branch_id, from_free, from_reserved, "Stock written off");
        Ok(updated)
    }

    /// Free quantity of a product summed over every branch.
    pub async fn total_available(&self, product_id: &str) -> InventoryResult<i64> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE id = ?1)")
            .bind(product_id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Err(CoreError::not_found("Product", product_id).into());
        }

        let total: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(quantity), 0) FROM stock_records WHERE product_id = ?1")
                .bind(product_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(total)
    }

    /// Movement journal of one stock record, oldest first.
    pub async fn movements(&self, product_id: &str, branch_id: &str) -> InventoryResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, product_id, branch_id, sale_id, kind, quantity, created_at
            FROM stock_movements
            WHERE product_id = ?1 AND branch_id = ?2
            ORDER BY rowid
            "#,
        )
        .bind(product_id)
        .bind(branch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }
}

// =============================================================================
// Transaction-scoped primitives
// =============================================================================

/// Atomically moves `quantity` free units into reservation.
pub(crate) async fn reserve_in(
    conn: &mut SqliteConnection,
    product_id: &str,
    branch_id: &str,
    quantity: i64,
    sale_id: Option<&str>,
) -> InventoryResult<()> {
    ensure_positive(quantity)?;

    let result = sqlx::query(
        r#"
        UPDATE stock_records
        SET quantity = quantity - ?3, reserved = reserved + ?3, updated_at = ?4
        WHERE product_id = ?1 AND branch_id = ?2 AND quantity >= ?3
        "#,
    )
    .bind(product_id)
    .bind(branch_id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let record = fetch_record(&mut *conn, product_id, branch_id)
            .await?
            .ok_or_else(|| stock_not_found(product_id, branch_id))?;

        warn!(
            product_id,
            branch_id,
            available = record.quantity,
            requested = quantity,
            "Reservation rejected"
        );
        return Err(CoreError::InsufficientStock {
            product_id: product_id.to_string(),
            branch_id: branch_id.to_string(),
            available: record.quantity,
            requested: quantity,
        }
        .into());
    }

    record_movement(conn, product_id, branch_id, sale_id, StockMovementKind::Reserve, quantity).await?;
    debug!(product_id, branch_id, quantity, sale_id, "Stock reserved");
    Ok(())
}

/// Moves up to `quantity` reserved units back to free stock.
///
/// Units written off since they were reserved cannot be returned, so the
/// amount is clamped to what is still reserved. Expects the caller to hold
/// the write lock.
pub(crate) async fn release_in(
    conn: &mut SqliteConnection,
    product_id: &str,
    branch_id: &str,
    quantity: i64,
    sale_id: Option<&str>,
) -> InventoryResult<i64> {
    ensure_positive(quantity)?;

    let record = fetch_record(&mut *conn, product_id, branch_id)
        .await?
        .ok_or_else(|| stock_not_found(product_id, branch_id))?;
    let released = record.reserved.min(quantity);

    if released < quantity {
        warn!(
            product_id,
            branch_id,
            requested = quantity,
            released,
            "Release clamped to reserved stock"
        );
    }
    if released == 0 {
        return Ok(0);
    }

    sqlx::query(
        r#"
        UPDATE stock_records
        SET quantity = quantity + ?3, reserved = reserved - ?3, updated_at = ?4
        WHERE product_id = ?1 AND branch_id = ?2 AND reserved >= ?3
        "#,
    )
    .bind(product_id)
    .bind(branch_id)
    .bind(released)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    record_movement(conn, product_id, branch_id, sale_id, StockMovementKind::Release, released).await?;
    debug!(product_id, branch_id, released, sale_id, "Stock released");
    Ok(released)
}

/// Consumes `quantity` reserved units for a completed sale.
pub(crate) async fn commit_in(
    conn: &mut SqliteConnection,
    product_id: &str,
    branch_id: &str,
    quantity: i64,
    sale_id: Option<&str>,
) -> InventoryResult<()> {
    ensure_positive(quantity)?;

    let result = sqlx::query(
        r#"
        UPDATE stock_records
        SET reserved = reserved - ?3, updated_at = ?4
        WHERE product_id = ?1 AND branch_id = ?2 AND reserved >= ?3
        "#,
    )
    .bind(product_id)
    .bind(branch_id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let record = fetch_record(&mut *conn, product_id, branch_id)
            .await?
            .ok_or_else(|| stock_not_found(product_id, branch_id))?;
        return Err(CoreError::InsufficientStock {
            product_id: product_id.to_string(),
            branch_id: branch_id.to_string(),
            available: record.reserved,
            requested: quantity,
        }
        .into());
    }

    record_movement(conn, product_id, branch_id, sale_id, StockMovementKind::Commit, quantity).await?;
    debug!(product_id, branch_id, quantity, sale_id, "Reservation committed");
    Ok(())
}

pub(crate) async fn fetch_record(
    conn: &mut SqliteConnection,
    product_id: &str,
    branch_id: &str,
) -> InventoryResult<Option<StockRecord>> {
    let record = sqlx::query_as::<_, StockRecord>(
        r#"
        SELECT product_id, branch_id, quantity, reserved, updated_at
        FROM stock_records
        WHERE product_id = ?1 AND branch_id = ?2
        "#,
    )
    .bind(product_id)
    .bind(branch_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(record)
}

/// Takes the SQLite write lock by touching the record, then reads it.
async fn lock_record(conn: &mut SqliteConnection, product_id: &str, branch_id: &str) -> InventoryResult<StockRecord> {
    let touched = sqlx::query("UPDATE stock_records SET updated_at = ?3 WHERE product_id = ?1 AND branch_id = ?2")
        .bind(product_id)
        .bind(branch_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    if touched.rows_affected() == 0 {
        return Err(stock_not_found(product_id, branch_id).into());
    }

    fetch_record(conn, product_id, branch_id)
        .await?
        .ok_or_else(|| stock_not_found(product_id, branch_id).into())
}

async fn record_movement(
    conn: &mut SqliteConnection,
    product_id: &str,
    branch_id: &str,
    sale_id: Option<&str>,
    kind: StockMovementKind,
    quantity: i64,
) -> InventoryResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_movements (id, product_id, branch_id, sale_id, kind, quantity, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(product_id)
    .bind(branch_id)
    .bind(sale_id)
    .bind(kind)
    .bind(quantity)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

fn ensure_positive(quantity: i64) -> Result<(), ValidationError> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

fn record_key(product_id: &str, branch_id: &str) -> String {
    format!("{product_id}@{branch_id}")
}

fn stock_not_found(product_id: &str, branch_id: &str) -> CoreError {
    CoreError::not_found("StockRecord", record_key(product_id, branch_id))
}

// =============================================================================
// Unit Tests
// =============================================================================
