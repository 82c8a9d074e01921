//! # Seed Data Generator
//!
//! Populates the database with sample products for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default development database
//! cargo run -p spaza-db --bin seed
//!
//! # Specify database path
//! cargo run -p spaza-db --bin seed -- --db ./data/spaza.db
//! ```
//!
//! Creates a realistic spaza-shop shelf across the five categories, each
//! product with a barcode, cost/sell price, opening stock and a reorder
//! threshold.

use chrono::Utc;
use std::env;

use spaza_core::{Category, Product};
use spaza_db::{Database, DbConfig, ProductRepository};

/// (category, name, cost cents, sell cents, stock, min stock)
const SHELF: &[(Category, &str, i64, i64, i64, i64)] = &[
    (Category::Food, "White Bread 700g", 1200, 1899, 24, 6),
    (Category::Food, "Brown Bread 700g", 1150, 1799, 18, 6),
    (Category::Food, "Maize Meal 2.5kg", 2800, 3899, 15, 4),
    (Category::Food, "Rice 2kg", 3100, 4299, 12, 4),
    (Category::Food, "Sugar 1kg", 1800, 2499, 20, 5),
    (Category::Food, "Eggs 6-pack", 1500, 2199, 16, 4),
    (Category::Food, "Milk Long-life 1L", 1400, 1999, 30, 8),
    (Category::Food, "Instant Noodles", 450, 699, 48, 12),
    (Category::Household, "Dishwashing Liquid 750ml", 1900, 2799, 10, 3),
    (Category::Household, "Washing Powder 1kg", 2600, 3599, 8, 3),
    (Category::Household, "Green Bar Soap", 900, 1399, 14, 4),
    (Category::Household, "Candles 6-pack", 1100, 1699, 22, 6),
    (Category::Household, "Matches 10-pack", 500, 899, 25, 8),
    (Category::Sweets, "Chappies Bubblegum", 20, 50, 400, 100),
    (Category::Sweets, "Lollipop", 60, 100, 200, 50),
    (Category::Sweets, "Chocolate Bar 55g", 750, 1199, 36, 10),
    (Category::Sweets, "Chips 36g", 500, 799, 60, 15),
    (Category::Cooldrinks, "Cola 330ml Can", 750, 1199, 48, 12),
    (Category::Cooldrinks, "Cola 2L", 1650, 2399, 24, 6),
    (Category::Cooldrinks, "Orange Squash 1L", 1900, 2699, 12, 4),
    (Category::Cooldrinks, "Still Water 500ml", 450, 899, 36, 10),
    (Category::Other, "Airtime Voucher R12", 1080, 1200, 50, 10),
    (Category::Other, "Razor Single", 650, 999, 15, 5),
    (Category::Other, "Paracetamol 10s", 900, 1499, 12, 4),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./spaza_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Spaza POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./spaza_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Spaza POS Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("Connected, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("Database already has {} products", existing);
        println!("Skipping seed to avoid duplicates.");
        println!("Delete the database file to regenerate.");
        return Ok(());
    }

    println!("Seeding shelf...");

    let mut conn = db.pool().acquire().await?;
    let mut seeded = 0usize;

    for (index, (category, name, cost, sell, stock, min_stock)) in SHELF.iter().enumerate() {
        let now = Utc::now();
        let product = Product {
            id: None,
            name: name.to_string(),
            // EAN-13-shaped barcode (checksum not computed; dev data only)
            barcode: Some(format!("600{:010}", index + 1)),
            category: *category,
            cost_price_cents: *cost,
            sell_price_cents: *sell,
            current_stock: *stock,
            min_stock: *min_stock,
            vat_rate_bps: 1500,
            vat_inclusive: true,
            archived: false,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = ProductRepository::insert(&mut conn, &product).await {
            eprintln!("Failed to insert {}: {}", product.name, e);
            continue;
        }

        seeded += 1;
    }
    drop(conn);

    println!("Seeded {} products", seeded);

    let hits = db.products().search("bread").await?;
    println!("Search 'bread': {} results", hits.len());

    let low = db.products().low_stock().await?;
    println!("Low stock: {} products", low.len());

    println!();
    println!("Seed complete");

    Ok(())
}
