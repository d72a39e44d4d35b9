//! # Product Repository
//!
//! Products are owned by the catalog. The inventory core only needs their
//! unit price, so beyond `insert` (used by seeding and tests) this
//! repository is read-only.

use market_core::validation::validate_price_cents;
use market_core::{CoreError, Money, Product};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbResult, InventoryResult};

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product.
    pub async fn insert(&self, product: &Product) -> InventoryResult<()> {
        validate_price_cents(product.price_cents)?;

        debug!(id = %product.id, barcode = %product.barcode, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, category_id, name, barcode, price_cents, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&product.id)
        .bind(&product.category_id)
        .bind(&product.name)
        .bind(&product.barcode)
        .bind(product.price_cents)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a product by ID, active or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, category_id, name, barcode, price_cents, is_active,
                   created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Current unit price of an active product.
    ///
    /// ## Errors
    /// `CoreError::NotFound` for unknown or deactivated products.
    pub async fn unit_price(&self, id: &str) -> InventoryResult<Money> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_unit_price(&mut *conn, id).await
    }

    /// Counts all products (seeding guard).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Unit price lookup on an open connection or transaction.
    pub(crate) async fn fetch_unit_price(
        conn: &mut SqliteConnection,
        id: &str,
    ) -> InventoryResult<Money> {
        let cents: Option<i64> =
            sqlx::query_scalar("SELECT price_cents FROM products WHERE id = ?1 AND is_active = 1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

        cents
            .map(Money::from_cents)
            .ok_or_else(|| CoreError::not_found("Product", id).into())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig, InventoryError};
    use chrono::Utc;

    fn product(price_cents: i64) -> Product {
        let now = Utc::now();
        Product {
            id: uuid::Uuid::new_v4().to_string(),
            category_id: None,
            name: "Sparkling Water 0.5L".to_string(),
            barcode: "4870001000017".to_string(),
            price_cents,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_unit_price() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        let p = product(349);

        repo.insert(&p).await.unwrap();

        let loaded = repo.get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, p.name);
        assert_eq!(loaded.unit_price(), Money::from_cents(349));
        assert_eq!(repo.unit_price(&p.id).await.unwrap().cents(), 349);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unit_price_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut inactive = product(100);
        inactive.is_active = false;
        db.products().insert(&inactive).await.unwrap();

        for id in [inactive.id.as_str(), "00000000-0000-4000-8000-000000000000"] {
            let err = db.products().unit_price(id).await.unwrap_err();
            assert!(matches!(
                err,
                InventoryError::Domain(CoreError::NotFound { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_negative_price_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.products().insert(&product(-1)).await.unwrap_err();
        assert!(matches!(err, InventoryError::Domain(CoreError::Validation(_))));
        assert_eq!(db.products().count().await.unwrap(), 0);
    }
}
