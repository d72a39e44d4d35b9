//! Sale lifecycle end to end: totals, frozen sales, stock effects and
//! persistence across reopen.

mod common;

use common::TestDb;
use market_core::{CoreError, ErrorKind, Money, SaleStatus};
use market_db::{Database, DbConfig};

#[tokio::test]
async fn total_follows_every_edit_and_freezes_on_finalize() {
    let t = TestDb::new().await;
    let water = t.product("Still Water 1.5L", 180, 30).await;
    let samsa = t.product("Samsa", 700, 12).await;
    let sale = t.open_sale().await;
    let inventory = t.db.inventory();

    let water_line = inventory.create_basket_line(&sale.id, &water.id, 2).await.unwrap();
    inventory.create_basket_line(&sale.id, &samsa.id, 3).await.unwrap();
    inventory.create_basket_line(&sale.id, &water.id, 4).await.unwrap();
    assert_eq!(inventory.sale_total(&sale.id).await.unwrap(), Money::from_cents(6 * 180 + 3 * 700));

    inventory.update_basket_line(&water_line.id, 1).await.unwrap();
    assert_eq!(inventory.sale_total(&sale.id).await.unwrap(), Money::from_cents(180 + 3 * 700));

    let completed = inventory.finalize_sale(&sale.id).await.unwrap();
    assert_eq!(completed.status, SaleStatus::Completed);
    assert_eq!(completed.total_price_cents, 180 + 3 * 700);

    // Every edit path is closed and the total does not move.
    let attempts = [
        inventory.create_basket_line(&sale.id, &water.id, 1).await.unwrap_err(),
        inventory.update_basket_line(&water_line.id, 5).await.unwrap_err(),
        inventory.delete_basket_line(&water_line.id).await.unwrap_err(),
        inventory.cancel_sale(&sale.id).await.unwrap_err(),
        inventory.finalize_sale(&sale.id).await.unwrap_err(),
    ];
    for err in attempts {
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert!(matches!(err.as_domain(), Some(CoreError::InvalidSaleStatus { .. })));
    }

    let stored = t.db.sales().get_by_id(&sale.id).await.unwrap().unwrap();
    assert_eq!(stored.total_price_cents, completed.total_price_cents);
    assert_eq!(inventory.sale_total(&sale.id).await.unwrap().cents(), stored.total_price_cents);

    assert_eq!(t.stock_of(&water.id).await, (29, 0));
    assert_eq!(t.stock_of(&samsa.id).await, (9, 0));
}

#[tokio::test]
async fn cancel_returns_every_unit() {
    let t = TestDb::new().await;
    let milk = t.product("Whole Milk 1L", 1100, 8).await;
    let eggs = t.product("Eggs Dozen", 2200, 4).await;
    let sale = t.open_sale().await;
    let inventory = t.db.inventory();

    inventory.create_basket_line(&sale.id, &milk.id, 5).await.unwrap();
    inventory.create_basket_line(&sale.id, &eggs.id, 4).await.unwrap();
    assert_eq!(t.stock_of(&eggs.id).await, (0, 4));

    let cancelled = inventory.cancel_sale(&sale.id).await.unwrap();
    assert_eq!(cancelled.status, SaleStatus::Cancelled);
    assert_eq!(cancelled.total_price_cents, 0);

    assert_eq!(t.stock_of(&milk.id).await, (8, 0));
    assert_eq!(t.stock_of(&eggs.id).await, (4, 0));
    assert!(inventory.basket_lines(&sale.id).await.unwrap().is_empty());

    // Released units are sellable again.
    let other = t.open_sale().await;
    inventory.create_basket_line(&other.id, &eggs.id, 4).await.unwrap();
}

#[tokio::test]
async fn write_off_under_a_reservation_blocks_finalize() {
    let t = TestDb::new().await;
    let butter = t.product("Butter 200g", 3100, 3).await;
    let sale = t.open_sale().await;
    let inventory = t.db.inventory();

    inventory.create_basket_line(&sale.id, &butter.id, 3).await.unwrap();
    t.db.stock().write_off(&butter.id, &t.branch.id, 1).await.unwrap();

    let err = inventory.finalize_sale(&sale.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientStock);

    let stored = t.db.sales().get_by_id(&sale.id).await.unwrap().unwrap();
    assert_eq!(stored.status, SaleStatus::InProcess);
    assert_eq!(t.stock_of(&butter.id).await, (0, 2));

    // Dropping the line releases only what is still reserved.
    let line = inventory.basket_lines(&sale.id).await.unwrap().remove(0);
    inventory.delete_basket_line(&line.id).await.unwrap();
    assert_eq!(t.stock_of(&butter.id).await, (2, 0));

    inventory.create_basket_line(&sale.id, &butter.id, 2).await.unwrap();
    let completed = inventory.finalize_sale(&sale.id).await.unwrap();
    assert_eq!(completed.total_price_cents, 2 * 3100);
    assert_eq!(t.stock_of(&butter.id).await, (0, 0));
}

#[tokio::test]
async fn oversell_is_rejected_without_side_effects() {
    let t = TestDb::new().await;
    let cake = t.product("Honey Cake", 4500, 2).await;
    let sale = t.open_sale().await;
    let inventory = t.db.inventory();

    let err = inventory.create_basket_line(&sale.id, &cake.id, 3).await.unwrap_err();
    match err.as_domain() {
        Some(CoreError::InsufficientStock { available, requested, .. }) => {
            assert_eq!((*available, *requested), (2, 3));
        }
        other => panic!("expected InsufficientStock, got {:?}", other),
    }

    assert!(inventory.basket_lines(&sale.id).await.unwrap().is_empty());
    assert_eq!(t.stock_of(&cake.id).await, (2, 0));
    assert_eq!(inventory.sale_total(&sale.id).await.unwrap(), Money::zero());
}

#[tokio::test]
async fn state_survives_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("market.db");

    let (sale_id, product_id, branch_id) = {
        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        let branch = market_core::Branch {
            id: uuid::Uuid::new_v4().to_string(),
            name: "Mirzo Ulugbek".to_string(),
            address: None,
            created_at: chrono::Utc::now(),
        };
        db.branches().insert(&branch).await.unwrap();

        let now = chrono::Utc::now();
        let product = market_core::Product {
            id: uuid::Uuid::new_v4().to_string(),
            category_id: None,
            name: "Lavash".to_string(),
            barcode: "4780000000042".to_string(),
            price_cents: 300,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await.unwrap();
        db.stock().restock(&product.id, &branch.id, 10).await.unwrap();

        let sale = db.sales().create_sale(&branch.id).await.unwrap();
        db.inventory().create_basket_line(&sale.id, &product.id, 4).await.unwrap();
        db.close().await;

        (sale.id, product.id, branch.id)
    };

    let db = Database::new(DbConfig::new(&path)).await.unwrap();
    let record = db.stock().get(&product_id, &branch_id).await.unwrap();
    assert_eq!((record.quantity, record.reserved), (6, 4));

    let completed = db.inventory().finalize_sale(&sale_id).await.unwrap();
    assert_eq!(completed.total_price_cents, 1200);
    db.close().await;
}
