//! # Seed Data Generator
//!
//! Populates the database with test products for development.
//!
//! ## Usage
//! ```bash
//! # Default database (./balcao_dev.db)
//! cargo run -p balcao-db --bin seed
//!
//! # Specify database path
//! cargo run -p balcao-db --bin seed -- --db ./data/balcao.db
//! ```
//!
//! Generates a small catalog of typical corner-store items with
//! deterministic barcodes, prices in cents, and varied stock levels
//! (including a few at zero and a few below minimum, so the low-stock
//! views have something to show).

use chrono::Utc;
use std::env;

use balcao_core::Product;
use balcao_db::repository::product::generate_product_id;
use balcao_db::{Database, DbConfig};

/// (name, category, cost cents, sale cents, stock)
const CATALOG: &[(&str, &str, i64, i64, i64)] = &[
    ("Arroz Branco 5kg", "mercearia", 1_450, 2_290, 42),
    ("Feijão Carioca 1kg", "mercearia", 520, 899, 60),
    ("Açúcar Cristal 1kg", "mercearia", 310, 549, 35),
    ("Café Torrado 500g", "mercearia", 980, 1_690, 24),
    ("Óleo de Soja 900ml", "mercearia", 510, 799, 48),
    ("Farinha de Trigo 1kg", "mercearia", 340, 599, 30),
    ("Macarrão Espaguete 500g", "mercearia", 220, 449, 55),
    ("Leite Integral 1L", "laticínios", 380, 599, 72),
    ("Manteiga 200g", "laticínios", 690, 1_190, 18),
    ("Queijo Mussarela 500g", "laticínios", 1_550, 2_490, 12),
    ("Refrigerante Cola 2L", "bebidas", 480, 899, 80),
    ("Suco de Laranja 1L", "bebidas", 420, 749, 3),
    ("Água Mineral 500ml", "bebidas", 60, 199, 150),
    ("Cerveja Lata 350ml", "bebidas", 230, 449, 96),
    ("Sabão em Pó 1kg", "limpeza", 720, 1_290, 20),
    ("Detergente 500ml", "limpeza", 110, 249, 40),
    ("Água Sanitária 1L", "limpeza", 170, 349, 2),
    ("Papel Higiênico 4un", "higiene", 390, 699, 28),
    ("Creme Dental 90g", "higiene", 210, 449, 0),
    ("Sabonete 90g", "higiene", 90, 199, 64),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./balcao_dev.db");

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
                println!("Balcão Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./balcao_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Balcão Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating products...");

    let now = Utc::now();
    let mut generated = 0;

    for (idx, (name, category, cost, sale, stock)) in CATALOG.iter().enumerate() {
        let product = Product {
            id: generate_product_id(),
            name: name.to_string(),
            description: None,
            barcode: Some(format!("789100000{:04}", idx)),
            category: Some(category.to_string()),
            cost_price_cents: *cost,
            sale_price_cents: *sale,
            current_stock: *stock,
            minimum_stock: 5,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        product.validate()?;
        if let Err(e) = db.products().insert(&product).await {
            eprintln!("Failed to insert {}: {}", product.name, e);
            continue;
        }
        generated += 1;
    }

    println!();
    println!("✓ Generated {} products", generated);

    let low = db.products().list_low_stock().await?;
    println!("  {} at or below minimum stock", low.len());

    db.close().await;
    Ok(())
}
