//! # Sale Accumulator (storage side)
//!
//! Reads a sale's lines and live stock records and feeds them to the pure
//! rules in `market_core::accumulator`.

use market_core::accumulator::{sale_total, validate_for_finalize, ReservationCheck};
use market_core::{BasketLine, CoreError, Money};
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::InventoryResult;
use crate::inventory::aggregator::fetch_lines;
use crate::inventory::ledger::fetch_record;
use crate::repository::sale::SaleRepository;

#[derive(Debug, Clone)]
pub struct SaleAccumulator {
    pool: SqlitePool,
}

impl SaleAccumulator {
    pub fn new(pool: SqlitePool) -> Self {
        SaleAccumulator { pool }
    }

    /// Sum of the current line prices of a sale.
    ///
    /// For a completed sale this equals the stored `total_price_cents`.
    /// Cancelled sales have no lines and total zero.
    pub async fn recompute(&self, sale_id: &str) -> InventoryResult<Money> {
        let mut tx = self.pool.begin().await?;
        SaleRepository::fetch(&mut *tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Sale", sale_id))?;

        let lines = fetch_lines(&mut *tx, sale_id).await?;
        tx.commit().await?;

        Ok(sale_total(&lines))
    }

    /// Re-checks every line of the sale against live stock without
    /// changing anything.
    pub async fn validate_for_finalize(&self, sale_id: &str) -> InventoryResult<()> {
        let mut tx = self.pool.begin().await?;
        let sale = SaleRepository::fetch(&mut *tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Sale", sale_id))?;

        let lines = fetch_lines(&mut *tx, sale_id).await?;
        let checks = reservation_checks(&mut *tx, &sale.branch_id, &lines).await?;
        tx.commit().await?;

        validate_for_finalize(&sale.branch_id, &checks)?;
        Ok(())
    }
}

/// Live stock figures for each line at the sale's branch.
///
/// ## Errors
/// `NotFound` when a line's stock record has disappeared.
pub(crate) async fn reservation_checks(
    conn: &mut SqliteConnection,
    branch_id: &str,
    lines: &[BasketLine],
) -> InventoryResult<Vec<ReservationCheck>> {
    let mut checks = Vec::with_capacity(lines.len());

    for line in lines {
        let record = fetch_record(&mut *conn, &line.product_id, branch_id)
            .await?
            .ok_or_else(|| {
                CoreError::not_found("StockRecord", format!("{}@{}", line.product_id, branch_id))
            })?;

        checks.push(ReservationCheck {
            product_id: line.product_id.clone(),
            line_quantity: line.quantity,
            reserved: record.reserved,
            available: record.quantity,
        });
    }

    Ok(checks)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::seed_catalog;
    use market_core::ErrorKind;

    #[tokio::test]
    async fn test_recompute_tracks_every_edit() {
        let fx = seed_catalog(20, 120).await;
        let tea = fx.add_product("Green Tea 50g", 875, 10).await;
        let sale = fx.open_sale().await;
        let baskets = fx.db.baskets();
        let accumulator = fx.db.accumulator();

        assert_eq!(accumulator.recompute(&sale.id).await.unwrap(), Money::zero());

        let water = baskets.add_or_merge(&sale.id, &fx.product.id, 3).await.unwrap();
        baskets.add_or_merge(&sale.id, &tea.id, 2).await.unwrap();
        baskets.add_or_merge(&sale.id, &fx.product.id, 1).await.unwrap();
        assert_eq!(accumulator.recompute(&sale.id).await.unwrap().cents(), 4 * 120 + 2 * 875);

        baskets.update(&water.id, 2).await.unwrap();
        assert_eq!(accumulator.recompute(&sale.id).await.unwrap().cents(), 2 * 120 + 2 * 875);

        baskets.delete(&water.id).await.unwrap();
        let lines = baskets.lines(&sale.id).await.unwrap();
        assert_eq!(
            accumulator.recompute(&sale.id).await.unwrap(),
            lines.iter().map(BasketLine::price).sum::<Money>()
        );
    }

    #[tokio::test]
    async fn test_validate_for_finalize_reads_live_stock() {
        let fx = seed_catalog(6, 100).await;
        let sale = fx.open_sale().await;
        fx.db.baskets().add_or_merge(&sale.id, &fx.product.id, 5).await.unwrap();

        let accumulator = fx.db.accumulator();
        accumulator.validate_for_finalize(&sale.id).await.unwrap();

        fx.db.stock().write_off(&fx.product.id, &fx.branch.id, 2).await.unwrap();
        let err = accumulator.validate_for_finalize(&sale.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
    }

    #[tokio::test]
    async fn test_recompute_unknown_sale() {
        let fx = seed_catalog(1, 100).await;
        let err = fx
            .db
            .accumulator()
            .recompute("00000000-0000-4000-8000-000000000000")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
