//! # Seed Data Generator
//!
//! Populates a database with a branch, products and stock for local
//! development.
//!
//! ## Usage
//! ```bash
//! # 200 products with 50 units each (defaults)
//! cargo run -p market-db --bin seed
//!
//! # Custom amounts
//! cargo run -p market-db --bin seed -- --count 1000 --stock 20
//!
//! # Specify database path (otherwise taken from market.toml / MARKET_DB_PATH)
//! cargo run -p market-db --bin seed -- --db ./data/market.db
//! ```

use chrono::Utc;
use market_core::{Branch, Product};
use market_db::config::MarketConfig;
use market_db::telemetry::init_tracing;
use market_db::Database;
use std::env;
use std::path::PathBuf;
use uuid::Uuid;

/// Product families for realistic test data.
const FAMILIES: &[(&str, &[&str])] = &[
    (
        "BEV",
        &[
            "Sparkling Water",
            "Still Water",
            "Green Tea",
            "Black Tea",
            "Apple Juice",
            "Cherry Juice",
            "Ayran",
            "Kvass",
            "Cola",
            "Lemonade",
        ],
    ),
    (
        "BAK",
        &[
            "Patir Bread",
            "Lavash",
            "Rye Bread",
            "Baguette",
            "Samsa",
            "Croissant",
            "Honey Cake",
            "Napoleon Cake",
        ],
    ),
    (
        "DRY",
        &[
            "Whole Milk",
            "Kefir",
            "Qatiq",
            "Suzma",
            "Butter",
            "Sour Cream",
            "Cottage Cheese",
            "Eggs Dozen",
        ],
    ),
    (
        "GRO",
        &[
            "Devzira Rice",
            "Chickpeas",
            "Mung Beans",
            "Sunflower Oil",
            "Cottonseed Oil",
            "Flour",
            "Sugar",
            "Salt",
            "Pasta",
            "Buckwheat",
        ],
    ),
];

/// Size variants with their price addon in minor units.
const SIZES: &[(&str, i64)] = &[("Small", 0), ("0.5L", 50), ("1L", 150), ("1.5L", 220), ("Family", 400)];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut stock: i64 = 50;
    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--stock" | "-s" => {
                if i + 1 < args.len() {
                    stock = args[i + 1].parse().unwrap_or(50);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Market POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>      Number of products to generate (default: 200)");
                println!("  -s, --stock <N>      Units of each product at the branch (default: 50)");
                println!("  -d, --db <PATH>      Database file path (default: from market.toml)");
                println!("      --config <PATH>  Config file path");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = MarketConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }

    println!("🌱 Market POS Seed Data Generator");
    println!("=================================");
    println!("Database: {}", config.database.path.display());
    println!("Products: {}", count);
    println!("Stock:    {} per product", stock);
    println!();

    let db = Database::new(config.db_config()).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let branch = Branch {
        id: Uuid::new_v4().to_string(),
        name: "Main Branch".to_string(),
        address: None,
        created_at: Utc::now(),
    };
    db.branches().insert(&branch).await?;
    println!("✓ Created branch {} ({})", branch.name, branch.id);

    println!();
    println!("Generating products...");

    let ledger = db.stock();
    let mut generated = 0;
    let start = std::time::Instant::now();

    'outer: for (family_idx, (family, names)) in FAMILIES.iter().enumerate() {
        for (name_idx, name) in names.iter().enumerate() {
            for (size_idx, (size, price_addon)) in SIZES.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let seed = family_idx * 1000 + name_idx * 20 + size_idx;
                let product = generate_product(family, name, size, *price_addon, seed);

                if let Err(e) = db.products().insert(&product).await {
                    eprintln!("Failed to insert {}: {}", product.name, e);
                    continue;
                }

                if stock > 0 {
                    ledger.restock(&product.id, &branch.id, stock).await?;
                }

                generated += 1;

                if generated % 100 == 0 {
                    println!("  Generated {} products...", generated);
                }
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products in {:?}", generated, elapsed);
    println!(
        "  Rate: {:.0} products/second",
        generated as f64 / elapsed.as_secs_f64()
    );

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

/// Generates a single product with deterministic pseudo-random data.
fn generate_product(family: &str, name: &str, size: &str, price_addon: i64, seed: usize) -> Product {
    let now = Utc::now();

    // EAN-13 shaped, checksum not valid
    let barcode = format!("478{:010}", seed);

    // 3.00 - 15.99 base plus size addon
    let base_price = 300 + ((seed * 37) % 1300) as i64;

    Product {
        id: Uuid::new_v4().to_string(),
        category_id: Some(family.to_string()),
        name: format!("{} {}", name, size),
        barcode,
        price_cents: base_price + price_addon,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
