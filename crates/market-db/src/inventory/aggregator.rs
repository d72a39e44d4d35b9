//! # Basket Aggregator
//!
//! Keeps the basket lines of a sale keyed by product and in step with the
//! stock they reserve.
//!
//! ## Add-or-Merge Transaction
//! ```text
//! BEGIN
//!   1. lock_sale(S)             UPDATE sales ... WHERE status = 'in_process'
//!                               (takes the write lock, rejects frozen sales)
//!   2. unit price of P          NotFound if unknown
//!   3. line for (S, P)?
//!        yes → merged_with(q)   over the line cap → InvalidArgument
//!        no  → new line
//!   4. reserve_in(P, B, q)      conditional UPDATE, InsufficientStock → ROLLBACK
//!   5. write the line           UPDATE ... WHERE id = ? AND version = ?
//!                               or INSERT (unique index on sale_id, product_id)
//! COMMIT
//! ```
//!
//! A version mismatch or unique-index hit in step 5 means another writer
//! got there first; it surfaces as `ConcurrencyConflict` and the service
//! retries the whole transaction.

use market_core::basket::StockAdjustment;
use market_core::lifecycle::SaleAction;
use market_core::validation::{validate_id, validate_new_quantity, validate_quantity};
use market_core::{BasketLine, CoreError};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, InventoryError, InventoryResult};
use crate::inventory::ledger::{release_in, reserve_in};
use crate::inventory::lifecycle::lock_sale;
use crate::repository::product::ProductRepository;

const LINE_COLUMNS: &str =
    "id, sale_id, product_id, quantity, price_cents, version, created_at, updated_at";

/// Basket line operations, one transaction per call.
#[derive(Debug, Clone)]
pub struct BasketAggregator {
    pool: SqlitePool,
}

impl BasketAggregator {
    pub fn new(pool: SqlitePool) -> Self {
        BasketAggregator { pool }
    }

    /// Adds `quantity` of a product to a sale, merging into the existing
    /// line for that product.
    ///
    /// ## Errors
    /// - `InvalidArgument` for a non-positive quantity
    /// - `NotFound` for an unknown sale, product or stock record
    /// - `InvalidSaleStatus` when the sale is completed or cancelled
    /// - `InsufficientStock` when the branch cannot cover `quantity`
    /// - `ConcurrencyConflict` when a concurrent add won the race
    ///
    /// On any error neither stock nor basket is changed.
    pub async fn add_or_merge(&self, sale_id: &str, product_id: &str, quantity: i64) -> InventoryResult<BasketLine> {
        validate_id("sale_id", sale_id)?;
        validate_id("product_id", product_id)?;
        validate_quantity(quantity)?;

        let mut tx = self.pool.begin().await?;

        let sale = lock_sale(&mut *tx, sale_id, SaleAction::EditBasket).await?;
        let unit_price = ProductRepository::fetch_unit_price(&mut *tx, product_id).await?;

        let existing = fetch_line_for_product(&mut *tx, sale_id, product_id).await?;
        let line = match &existing {
            Some(current) => current.merged_with(quantity, unit_price)?,
            None => BasketLine::new(sale_id, product_id, quantity, unit_price)?,
        };

        reserve_in(&mut *tx, product_id, &sale.branch_id, quantity, Some(sale_id)).await?;

        match existing {
            Some(current) => write_line(&mut *tx, &line, current.version, "add_basket_line").await?,
            None => insert_line(&mut *tx, &line).await?,
        }

        tx.commit().await?;

        debug!(
            sale_id,
            product_id,
            line_id = %line.id,
            added = quantity,
            quantity = line.quantity,
            price_cents = line.price_cents,
            "Basket line added"
        );
        Ok(line)
    }

    /// Sets a line to `new_quantity`, reserving or releasing the difference.
    ///
    /// The line is repriced at the product's current unit price. A quantity
    /// of zero removes the line and returns `None`.
    pub async fn update(&self, line_id: &str, new_quantity: i64) -> InventoryResult<Option<BasketLine>> {
        validate_id("basket_line_id", line_id)?;
        validate_new_quantity(new_quantity)?;

        let sale_id = self.sale_of_line(line_id).await?;
        let mut tx = self.pool.begin().await?;

        let sale = lock_sale(&mut *tx, &sale_id, SaleAction::EditBasket).await?;
        let current = fetch_line(&mut *tx, line_id)
            .await?
            .ok_or_else(|| CoreError::not_found("BasketLine", line_id))?;

        match StockAdjustment::between(current.quantity, new_quantity) {
            StockAdjustment::Reserve(delta) => {
                reserve_in(&mut *tx, &current.product_id, &sale.branch_id, delta, Some(&sale_id)).await?;
            }
            StockAdjustment::Release(delta) => {
                release_in(&mut *tx, &current.product_id, &sale.branch_id, delta, Some(&sale_id)).await?;
            }
            StockAdjustment::Unchanged => {}
        }

        let updated = if new_quantity == 0 {
            remove_line(&mut *tx, &current).await?;
            None
        } else {
            let unit_price = ProductRepository::fetch_unit_price(&mut *tx, &current.product_id).await?;
            let repriced = current.repriced(new_quantity, unit_price)?;
            write_line(&mut *tx, &repriced, current.version, "update_basket_line").await?;
            Some(repriced)
        };

        tx.commit().await?;

        debug!(
            line_id,
            sale_id = %sale_id,
            from = current.quantity,
            to = new_quantity,
            "Basket line updated"
        );
        Ok(updated)
    }

    /// Removes a line and releases its reserved stock.
    pub async fn delete(&self, line_id: &str) -> InventoryResult<()> {
        validate_id("basket_line_id", line_id)?;

        let sale_id = self.sale_of_line(line_id).await?;
        let mut tx = self.pool.begin().await?;

        let sale = lock_sale(&mut *tx, &sale_id, SaleAction::EditBasket).await?;
        let line = fetch_line(&mut *tx, line_id)
            .await?
            .ok_or_else(|| CoreError::not_found("BasketLine", line_id))?;

        release_in(&mut *tx, &line.product_id, &sale.branch_id, line.quantity, Some(&sale_id)).await?;
        remove_line(&mut *tx, &line).await?;

        tx.commit().await?;

        debug!(line_id, sale_id = %sale_id, released = line.quantity, "Basket line deleted");
        Ok(())
    }

    /// Lines of a sale in the order they were first added.
    pub async fn lines(&self, sale_id: &str) -> InventoryResult<Vec<BasketLine>> {
        let mut tx = self.pool.begin().await?;
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM sales WHERE id = ?1)")
            .bind(sale_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(CoreError::not_found("Sale", sale_id).into());
        }

        let lines = fetch_lines(&mut *tx, sale_id).await?;
        tx.commit().await?;
        Ok(lines)
    }

    /// Gets one basket line.
    pub async fn get_line(&self, line_id: &str) -> InventoryResult<Option<BasketLine>> {
        let mut conn = self.pool.acquire().await?;
        fetch_line(&mut *conn, line_id).await
    }

    async fn sale_of_line(&self, line_id: &str) -> InventoryResult<String> {
        let sale_id: Option<String> = sqlx::query_scalar("SELECT sale_id FROM basket_lines WHERE id = ?1")
            .bind(line_id)
            .fetch_optional(&self.pool)
            .await?;

        sale_id.ok_or_else(|| CoreError::not_found("BasketLine", line_id).into())
    }
}

// =============================================================================
// Row access
// =============================================================================

pub(crate) async fn fetch_lines(conn: &mut SqliteConnection, sale_id: &str) -> InventoryResult<Vec<BasketLine>> {
    let sql = format!("SELECT {LINE_COLUMNS} FROM basket_lines WHERE sale_id = ?1 ORDER BY rowid");
    let lines = sqlx::query_as::<_, BasketLine>(&sql)
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(lines)
}

async fn fetch_line(conn: &mut SqliteConnection, line_id: &str) -> InventoryResult<Option<BasketLine>> {
    let sql = format!("SELECT {LINE_COLUMNS} FROM basket_lines WHERE id = ?1");
    let line = sqlx::query_as::<_, BasketLine>(&sql)
        .bind(line_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(line)
}

async fn fetch_line_for_product(
    conn: &mut SqliteConnection,
    sale_id: &str,
    product_id: &str,
) -> InventoryResult<Option<BasketLine>> {
    let sql = format!("SELECT {LINE_COLUMNS} FROM basket_lines WHERE sale_id = ?1 AND product_id = ?2");
    let line = sqlx::query_as::<_, BasketLine>(&sql)
        .bind(sale_id)
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(line)
}

async fn insert_line(conn: &mut SqliteConnection, line: &BasketLine) -> InventoryResult<()> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO basket_lines (
            id, sale_id, product_id, quantity, price_cents, version, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&line.id)
    .bind(&line.sale_id)
    .bind(&line.product_id)
    .bind(line.quantity)
    .bind(line.price_cents)
    .bind(line.version)
    .bind(line.created_at)
    .bind(line.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(DbError::from);

    match inserted {
        Ok(_) => Ok(()),
        Err(DbError::UniqueViolation { .. }) => Err(conflict("add_basket_line", &line.sale_id)),
        Err(err) => Err(err.into()),
    }
}

/// Writes a line only if nobody bumped its version since it was read.
async fn write_line(
    conn: &mut SqliteConnection,
    line: &BasketLine,
    expected_version: i64,
    operation: &str,
) -> InventoryResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE basket_lines
        SET quantity = ?2, price_cents = ?3, version = ?4, updated_at = ?5
        WHERE id = ?1 AND version = ?6
        "#,
    )
    .bind(&line.id)
    .bind(line.quantity)
    .bind(line.price_cents)
    .bind(line.version)
    .bind(line.updated_at)
    .bind(expected_version)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(conflict(operation, &line.id));
    }
    Ok(())
}

async fn remove_line(conn: &mut SqliteConnection, line: &BasketLine) -> InventoryResult<()> {
    let result = sqlx::query("DELETE FROM basket_lines WHERE id = ?1 AND version = ?2")
        .bind(&line.id)
        .bind(line.version)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(conflict("delete_basket_line", &line.id));
    }
    Ok(())
}

fn conflict(operation: &str, id: &str) -> InventoryError {
    CoreError::ConcurrencyConflict {
        operation: operation.to_string(),
        id: id.to_string(),
        attempts: 1,
    }
    .into()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::seed_catalog;
    use market_core::{ErrorKind, Money, MAX_LINE_QUANTITY};

    fn shape(line: &BasketLine) -> (String, String, i64, i64, i64) {
        (
            line.id.clone(),
            line.product_id.clone(),
            line.quantity,
            line.price_cents,
            line.version,
        )
    }

    #[tokio::test]
    async fn test_merge_two_then_three() {
        let fx = seed_catalog(10, 199).await;
        let sale = fx.open_sale().await;
        let baskets = fx.db.baskets();

        let first = baskets.add_or_merge(&sale.id, &fx.product.id, 2).await.unwrap();
        let merged = baskets.add_or_merge(&sale.id, &fx.product.id, 3).await.unwrap();

        assert_eq!(merged.id, first.id);
        assert_eq!(merged.quantity, 5);
        assert_eq!(merged.price(), Money::from_cents(199).multiply_quantity(5));

        let lines = baskets.lines(&sale.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(shape(&lines[0]), shape(&merged));
        assert_eq!(fx.db.stock().check_available(&fx.product.id, &fx.branch.id).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_example_scenario() {
        let fx = seed_catalog(10, 100).await;
        let sale = fx.open_sale().await;
        let baskets = fx.db.baskets();
        let ledger = fx.db.stock();
        let (p, b) = (fx.product.id.as_str(), fx.branch.id.as_str());

        let line = baskets.add_or_merge(&sale.id, p, 4).await.unwrap();
        assert_eq!((line.quantity, line.price_cents), (4, 400));
        assert_eq!(ledger.check_available(p, b).await.unwrap(), 6);

        let line = baskets.add_or_merge(&sale.id, p, 3).await.unwrap();
        assert_eq!(line.quantity, 7);
        assert_eq!(ledger.check_available(p, b).await.unwrap(), 3);

        let before_stock = ledger.get(p, b).await.unwrap();
        let before_lines = baskets.lines(&sale.id).await.unwrap();

        let err = baskets.add_or_merge(&sale.id, p, 5).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);

        let after_stock = ledger.get(p, b).await.unwrap();
        assert_eq!(after_stock.quantity, before_stock.quantity);
        assert_eq!(after_stock.reserved, before_stock.reserved);
        let after_lines = baskets.lines(&sale.id).await.unwrap();
        assert_eq!(
            after_lines.iter().map(shape).collect::<Vec<_>>(),
            before_lines.iter().map(shape).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_add_rejects_bad_input() {
        let fx = seed_catalog(10, 100).await;
        let sale = fx.open_sale().await;
        let baskets = fx.db.baskets();

        let err = baskets.add_or_merge(&sale.id, &fx.product.id, 0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let unknown = "00000000-0000-4000-8000-000000000000";
        let err = baskets.add_or_merge(&sale.id, unknown, 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = baskets.add_or_merge(unknown, &fx.product.id, 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        assert!(baskets.lines(&sale.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_merge_past_line_cap_leaves_stock_untouched() {
        let fx = seed_catalog(3 * MAX_LINE_QUANTITY, 10).await;
        let sale = fx.open_sale().await;
        let baskets = fx.db.baskets();
        let ledger = fx.db.stock();
        let (p, b) = (fx.product.id.as_str(), fx.branch.id.as_str());

        let line = baskets.add_or_merge(&sale.id, p, MAX_LINE_QUANTITY).await.unwrap();
        let before = ledger.get(p, b).await.unwrap();

        let err = baskets.add_or_merge(&sale.id, p, MAX_LINE_QUANTITY).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let after = ledger.get(p, b).await.unwrap();
        assert_eq!((after.quantity, after.reserved), (before.quantity, before.reserved));

        let lines = baskets.lines(&sale.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, MAX_LINE_QUANTITY);

        // still editable
        let shrunk = baskets.update(&line.id, MAX_LINE_QUANTITY - 1).await.unwrap().unwrap();
        assert_eq!(shrunk.quantity, MAX_LINE_QUANTITY - 1);
    }

    #[tokio::test]
    async fn test_update_reserves_and_releases_delta() {
        let fx = seed_catalog(10, 150).await;
        let sale = fx.open_sale().await;
        let baskets = fx.db.baskets();
        let ledger = fx.db.stock();
        let (p, b) = (fx.product.id.as_str(), fx.branch.id.as_str());

        let line = baskets.add_or_merge(&sale.id, p, 2).await.unwrap();

        let grown = baskets.update(&line.id, 6).await.unwrap().unwrap();
        assert_eq!((grown.quantity, grown.price_cents), (6, 900));
        assert_eq!(ledger.check_available(p, b).await.unwrap(), 4);

        let shrunk = baskets.update(&line.id, 1).await.unwrap().unwrap();
        assert_eq!((shrunk.quantity, shrunk.price_cents), (1, 150));
        assert_eq!(ledger.check_available(p, b).await.unwrap(), 9);

        let err = baskets.update(&line.id, 11).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        let unchanged = baskets.get_line(&line.id).await.unwrap().unwrap();
        assert_eq!(shape(&unchanged), shape(&shrunk));
        assert_eq!(ledger.check_available(p, b).await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_update_to_zero_removes_line() {
        let fx = seed_catalog(10, 150).await;
        let sale = fx.open_sale().await;
        let baskets = fx.db.baskets();

        let line = baskets.add_or_merge(&sale.id, &fx.product.id, 3).await.unwrap();
        assert!(baskets.update(&line.id, 0).await.unwrap().is_none());

        assert!(baskets.lines(&sale.id).await.unwrap().is_empty());
        assert_eq!(fx.db.stock().check_available(&fx.product.id, &fx.branch.id).await.unwrap(), 10);

        let err = baskets.update(&line.id, 1).await.unwrap_err();
        assert!(matches!(err, InventoryError::Domain(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_releases_stock() {
        let fx = seed_catalog(10, 150).await;
        let sale = fx.open_sale().await;
        let baskets = fx.db.baskets();

        let line = baskets.add_or_merge(&sale.id, &fx.product.id, 4).await.unwrap();
        baskets.delete(&line.id).await.unwrap();

        assert!(baskets.get_line(&line.id).await.unwrap().is_none());
        let record = fx.db.stock().get(&fx.product.id, &fx.branch.id).await.unwrap();
        assert_eq!((record.quantity, record.reserved), (10, 0));

        let err = baskets.delete(&line.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_stale_version_is_a_conflict() {
        let fx = seed_catalog(10, 150).await;
        let sale = fx.open_sale().await;
        let line = fx.db.baskets().add_or_merge(&sale.id, &fx.product.id, 1).await.unwrap();

        let mut conn = fx.db.pool().acquire().await.unwrap();
        let stale = line.merged_with(1, Money::from_cents(150)).unwrap();
        write_line(&mut *conn, &stale, line.version, "add_basket_line").await.unwrap();

        let err = write_line(&mut *conn, &stale, line.version, "add_basket_line")
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.kind(), ErrorKind::ConcurrencyConflict);
    }
}
