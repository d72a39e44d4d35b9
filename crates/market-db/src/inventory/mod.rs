//! # Inventory Core
//!
//! Stock-aware basket building and sale finalization.
//!
//! ## Components
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        InventoryService                                 │
//! │   create_basket_line • update_basket_line • delete_basket_line          │
//! │   finalize_sale • cancel_sale • sale_total • basket_lines               │
//! │                 (bounded retry on ConcurrencyConflict)                  │
//! │                                                                         │
//! │        ┌──────────────────┐          ┌──────────────────┐               │
//! │        │  SaleLifecycle   │─────────►│ SaleAccumulator  │               │
//! │        │ finalize/cancel  │          │ recompute/check  │               │
//! │        └────────┬─────────┘          └────────┬─────────┘               │
//! │                 │                             │                         │
//! │        ┌────────▼─────────┐          ┌────────▼─────────┐               │
//! │        │ BasketAggregator │          │   StockLedger    │               │
//! │        │  add/merge/edit  │─────────►│ reserve/release  │               │
//! │        └──────────────────┘          │ commit (atomic)  │               │
//! │                                      └──────────────────┘               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Retry Policy
//! Only `ConcurrencyConflict` (lost optimistic race) and SQLite busy errors
//! are retried, up to `max_conflict_retries` times. Delays start at
//! `retry_backoff` and double with jitter so racing writers spread out.
//! `InsufficientStock`, `InvalidSaleStatus`, `NotFound` and validation
//! failures are returned on the first attempt.

pub mod accumulator;
pub mod aggregator;
pub mod ledger;
pub mod lifecycle;

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use market_core::{BasketLine, CoreError, Money, Sale};
use sqlx::SqlitePool;
use tracing::warn;

use crate::error::InventoryResult;

use self::accumulator::SaleAccumulator;
use self::aggregator::BasketAggregator;
use self::lifecycle::SaleLifecycle;

// =============================================================================
// Settings
// =============================================================================

/// Conflict retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventorySettings {
    /// Retries after the first attempt. Zero disables retrying.
    pub max_conflict_retries: u32,

    /// Delay before the first retry. Later delays double, up to
    /// `retry_backoff × MAX_BACKOFF_FACTOR`.
    pub retry_backoff: Duration,
}

/// Cap on the retry delay, as a multiple of `retry_backoff`.
const MAX_BACKOFF_FACTOR: u32 = 16;

impl Default for InventorySettings {
    fn default() -> Self {
        InventorySettings {
            max_conflict_retries: 5,
            retry_backoff: Duration::from_millis(10),
        }
    }
}

// =============================================================================
// Service
// =============================================================================

/// The operations exposed to the request layer.
///
/// ## Example
/// ```rust,ignore
/// let inventory = db.inventory();
/// let line = inventory.create_basket_line(&sale_id, &product_id, 2).await?;
/// let sale = inventory.finalize_sale(&sale_id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct InventoryService {
    baskets: BasketAggregator,
    accumulator: SaleAccumulator,
    lifecycle: SaleLifecycle,
    settings: InventorySettings,
}

impl InventoryService {
    pub fn new(pool: SqlitePool, settings: InventorySettings) -> Self {
        InventoryService {
            baskets: BasketAggregator::new(pool.clone()),
            accumulator: SaleAccumulator::new(pool.clone()),
            lifecycle: SaleLifecycle::new(pool),
            settings,
        }
    }

    pub fn settings(&self) -> &InventorySettings {
        &self.settings
    }

    /// Adds a product to a sale, merging with an existing line.
    pub async fn create_basket_line(
        &self,
        sale_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> InventoryResult<BasketLine> {
        self.retrying("create_basket_line", sale_id, move || {
            self.baskets.add_or_merge(sale_id, product_id, quantity)
        })
        .await
    }

    /// Sets a line's quantity. Returns `None` when quantity 0 removed it.
    pub async fn update_basket_line(
        &self,
        line_id: &str,
        quantity: i64,
    ) -> InventoryResult<Option<BasketLine>> {
        self.retrying("update_basket_line", line_id, move || {
            self.baskets.update(line_id, quantity)
        })
        .await
    }

    pub async fn delete_basket_line(&self, line_id: &str) -> InventoryResult<()> {
        self.retrying("delete_basket_line", line_id, move || self.baskets.delete(line_id))
            .await
    }

    pub async fn finalize_sale(&self, sale_id: &str) -> InventoryResult<Sale> {
        self.retrying("finalize_sale", sale_id, move || self.lifecycle.finalize(sale_id))
            .await
    }

    pub async fn cancel_sale(&self, sale_id: &str) -> InventoryResult<Sale> {
        self.retrying("cancel_sale", sale_id, move || self.lifecycle.cancel(sale_id))
            .await
    }

    pub async fn sale_total(&self, sale_id: &str) -> InventoryResult<Money> {
        self.accumulator.recompute(sale_id).await
    }

    pub async fn basket_lines(&self, sale_id: &str) -> InventoryResult<Vec<BasketLine>> {
        self.baskets.lines(sale_id).await
    }

    /// Runs `attempt` until it succeeds, fails for a business reason, or
    /// the retry budget runs out.
    async fn retrying<T, F, Fut>(&self, operation: &str, id: &str, mut attempt: F) -> InventoryResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = InventoryResult<T>>,
    {
        let mut backoff = self.create_backoff();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;

            match attempt().await {
                Err(err) if err.is_retryable() => {
                    if attempts > self.settings.max_conflict_retries {
                        warn!(operation, id, attempts, error = %err, "Conflict retries exhausted");
                        return Err(CoreError::ConcurrencyConflict {
                            operation: operation.to_string(),
                            id: id.to_string(),
                            attempts,
                        }
                        .into());
                    }

                    let delay = backoff.next_backoff().unwrap_or(self.settings.retry_backoff);
                    warn!(operation, id, attempt = attempts, ?delay, error = %err, "Retrying after conflict");
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        let mut backoff = ExponentialBackoff {
            initial_interval: self.settings.retry_backoff,
            max_interval: self.settings.retry_backoff * MAX_BACKOFF_FACTOR,
            multiplier: 2.0,
            max_elapsed_time: None, // bounded by max_conflict_retries instead
            ..Default::default()
        };
        backoff.reset();
        backoff
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
