//! Shared fixtures for unit tests: an in-memory database seeded with one
//! branch and one stocked product.

use chrono::Utc;
use market_core::{Branch, Product, Sale};
use uuid::Uuid;

use crate::pool::{Database, DbConfig};

pub(crate) struct Fixture {
    pub db: Database,
    pub branch: Branch,
    pub product: Product,
}

impl Fixture {
    pub async fn open_sale(&self) -> Sale {
        self.db.sales().create_sale(&self.branch.id).await.unwrap()
    }

    pub async fn add_branch(&self, name: &str) -> Branch {
        let branch = Branch {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            address: None,
            created_at: Utc::now(),
        };
        self.db.branches().insert(&branch).await.unwrap();
        branch
    }

    /// Inserts a product and stocks `stock` units of it at the fixture branch.
    pub async fn add_product(&self, name: &str, price_cents: i64, stock: i64) -> Product {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            category_id: None,
            name: name.to_string(),
            barcode: format!("487{:010}", price_cents),
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
}

/// Fresh database with "Chilanzar" branch and one product with `quantity`
/// units in stock.
pub(crate) async fn seed_catalog(quantity: i64, price_cents: i64) -> Fixture {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();

    let branch = Branch {
        id: Uuid::new_v4().to_string(),
        name: "Chilanzar".to_string(),
        address: Some("Bunyodkor 12".to_string()),
        created_at: Utc::now(),
    };
    db.branches().insert(&branch).await.unwrap();

    let now = Utc::now();
    let product = Product {
        id: Uuid::new_v4().to_string(),
        category_id: None,
        name: "Sparkling Water 0.5L".to_string(),
        barcode: "4870001000017".to_string(),
        price_cents,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    db.products().insert(&product).await.unwrap();
    db.stock().restock(&product.id, &branch.id, quantity).await.unwrap();

    Fixture { db, branch, product }
}
