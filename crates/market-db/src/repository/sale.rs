//! # Sale Repository
//!
//! Sale creation and lookup. Status changes are not made here: only
//! [`SaleLifecycle`](crate::inventory::lifecycle::SaleLifecycle) moves a sale
//! out of `in_process`, and only inside a stock transaction.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. CREATE                                                              │
//! │     └── create_sale() → Sale { status: in_process, total: 0 }          │
//! │                                                                         │
//! │  2. BUILD BASKET (InventoryService)                                    │
//! │     └── create_basket_line / update_basket_line / delete_basket_line   │
//! │                                                                         │
//! │  3. FINALIZE or CANCEL (SaleLifecycle)                                 │
//! │     └── completed: reservations committed, total written               │
//! │     └── cancelled: reservations released, lines removed                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use market_core::{Sale, SaleStatus};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;

const SALE_COLUMNS: &str = r#"
    id, branch_id, shop_assistant_id, cashier_id, client_name, status,
    total_price_cents, created_at, updated_at, completed_at
"#;

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Opens a new in-process sale at a branch.
    ///
    /// ## Errors
    /// `DbError::ForeignKeyViolation` when the branch does not exist.
    pub async fn create_sale(&self, branch_id: &str) -> DbResult<Sale> {
        let now = Utc::now();
        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            branch_id: branch_id.to_string(),
            shop_assistant_id: None,
            cashier_id: None,
            client_name: None,
            status: SaleStatus::InProcess,
            total_price_cents: 0,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        self.insert_sale(&sale).await
    }

    /// Inserts a sale built by the request layer, which supplies staff and
    /// client. Returns the stored row.
    ///
    /// Only identity, branch, staff, client and timestamps are taken from
    /// `sale`. Every sale starts `in_process` with a zero total and no
    /// completion time, whatever the caller set.
    pub async fn insert_sale(&self, sale: &Sale) -> DbResult<Sale> {
        let sale = Sale {
            status: SaleStatus::InProcess,
            total_price_cents: 0,
            completed_at: None,
            ..sale.clone()
        };
        debug!(id = %sale.id, branch_id = %sale.branch_id, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, branch_id, shop_assistant_id, cashier_id, client_name,
                status, total_price_cents, created_at, updated_at, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.branch_id)
        .bind(&sale.shop_assistant_id)
        .bind(&sale.cashier_id)
        .bind(&sale.client_name)
        .bind(sale.status)
        .bind(sale.total_price_cents)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .bind(sale.completed_at)
        .execute(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut *conn, id).await
    }

    /// Sale lookup on an open connection or transaction.
    pub(crate) async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(sale)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
