//! File-backed test database with a real multi-connection pool.
//!
//! In-memory databases are pinned to one connection, so concurrency tests
//! run against a WAL file in a temporary directory instead.

#![allow(dead_code)]

use chrono::Utc;
use market_core::{Branch, Product, Sale};
use market_db::{Database, DbConfig};
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

pub struct TestDb {
    pub db: Database,
    pub branch: Branch,
    // Dropped after `db`; removes the database, -wal and -shm files.
    _dir: TempDir,
}

impl TestDb {
    pub async fn new() -> Self {
        market_db::telemetry::init_tracing();

        let dir = TempDir::new().unwrap();
        let config = DbConfig::new(dir.path().join("market.db"))
            .max_connections(8)
            .busy_timeout(Duration::from_secs(10));
        let db = Database::new(config).await.unwrap();

        let branch = Branch {
            id: Uuid::new_v4().to_string(),
            name: "Yunusabad".to_string(),
            address: None,
            created_at: Utc::now(),
        };
        db.branches().insert(&branch).await.unwrap();

        TestDb { db, branch, _dir: dir }
    }

    /// Inserts a product with `stock` units at the test branch.
    pub async fn product(&self, name: &str, price_cents: i64, stock: i64) -> Product {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            category_id: None,
            name: name.to_string(),
            barcode: format!("478{:010}", price_cents),
            price_cents,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.db.products().insert(&product).await.unwrap();
        if stock > 0 {
            self.db.stock().restock(&product.id, &self.branch.id, stock).await.unwrap();
        }
        product
    }

    pub async fn open_sale(&self) -> Sale {
        self.db.sales().create_sale(&self.branch.id).await.unwrap()
    }

    /// (free, reserved) units of a product at the test branch.
    pub async fn stock_of(&self, product_id: &str) -> (i64, i64) {
        let record = self.db.stock().get(product_id, &self.branch.id).await.unwrap();
        (record.quantity, record.reserved)
    }
}
