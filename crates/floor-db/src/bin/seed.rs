//! # Seed Data Generator
//!
//! Populates the database with a demo floor for development.
//!
//! ## Usage
//! ```bash
//! # Seed using floor.toml / FLOOR_* settings
//! cargo run -p floor-db --bin seed
//!
//! # Specify database path
//! cargo run -p floor-db --bin seed -- --db ./data/floor.db
//! ```
//!
//! ## Generated Floor
//! - Saloons "Main Hall" and "Terrace" with numbered tables
//! - A small menu: tracked drinks and sides, a burger with extras, and a
//!   "Combo" kit built from them
//! - A waiter with access to the store
//! - One open tab at table M1 with a ticket in the kitchen

use std::env;
use std::path::PathBuf;

use floor_core::{
    NewLineItem, NewProduct, NewSaloon, NewTable, NewVariantOption, OpenCommand, ProductKind,
    SelectedOption, SelectedVariant, StockRef,
};
use floor_db::{telemetry, Database, FloorConfig};
use tracing::info;

/// (saloon, table prefix, table count, seats per table)
const SALOONS: &[(&str, &str, usize, i64)] = &[("Main Hall", "M", 8, 4), ("Terrace", "T", 4, 2)];

/// (name, price in cents, starting stock)
const TRACKED: &[(&str, i64, i64)] = &[
    ("Soda", 500, 48),
    ("Iced Tea", 550, 24),
    ("Fries", 900, 30),
    ("Onion Rings", 1_100, 3),
];

/// (name, price in cents, starting stock; None = untracked)
const EXTRAS: &[(&str, i64, Option<i64>)] =
    &[("Cheese", 300, None), ("Bacon", 450, Some(12)), ("Egg", 250, Some(6))];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let mut db_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Floor POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: from floor.toml)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = FloorConfig::load(None)?;
    if db_path.is_some() {
        config.database.path = db_path;
    }
    telemetry::init_tracing(&config.logging.filter);

    let store_id = config.store.id.clone();
    let db = Database::open(&config).await?;

    println!("Floor POS Seed Data Generator");
    println!("=============================");
    println!("Database: {}", config.database_path().display());
    println!("Store:    {}", store_id);
    println!();

    if !db.saloons().list(&store_id).await?.is_empty() {
        println!("Store already has saloons, skipping seed.");
        println!("Delete the database file to regenerate.");
        return Ok(());
    }

    // Floor plan
    let mut first_table = None;
    for (order, (name, prefix, count, seats)) in SALOONS.iter().enumerate() {
        let saloon = db
            .saloons()
            .create(
                &store_id,
                NewSaloon {
                    name: (*name).to_string(),
                    display_order: order as i64,
                },
            )
            .await?;

        for n in 1..=*count {
            let table = db
                .tables()
                .create(
                    &store_id,
                    NewTable {
                        saloon_id: saloon.id.clone(),
                        name: format!("{prefix}{n}"),
                        max_capacity: *seats,
                        location_description: None,
                    },
                )
                .await?;
            first_table.get_or_insert(table.id);
        }
        info!(saloon = %name, tables = count, "Saloon seeded");
    }

    // Menu
    let catalog = db.catalog();
    let mut tracked = Vec::with_capacity(TRACKED.len());
    for (name, price_cents, stock) in TRACKED {
        let product = catalog
            .create_product(
                &store_id,
                NewProduct {
                    name: (*name).to_string(),
                    kind: ProductKind::Individual,
                    price_cents: *price_cents,
                    tracks_inventory: true,
                    stock_quantity: *stock,
                },
            )
            .await?;
        let item = StockRef::Product(product.id.clone());
        catalog.add_availability_link(&store_id, "delivery", &item, true).await?;
        tracked.push(product);
    }

    let burger = catalog
        .create_product(
            &store_id,
            NewProduct {
                name: "Burger".into(),
                kind: ProductKind::Individual,
                price_cents: 2_400,
                tracks_inventory: false,
                stock_quantity: 0,
            },
        )
        .await?;
    let extras = catalog.create_variant(&burger.id, "Extras").await?;
    let mut options = Vec::with_capacity(EXTRAS.len());
    for (name, price_cents, stock) in EXTRAS {
        options.push(
            catalog
                .create_variant_option(NewVariantOption {
                    variant_id: extras.id.clone(),
                    name: (*name).to_string(),
                    price_cents: *price_cents,
                    tracks_inventory: stock.is_some(),
                    stock_quantity: stock.unwrap_or(0),
                })
                .await?,
        );
    }

    let combo = catalog
        .create_product(
            &store_id,
            NewProduct {
                name: "Combo".into(),
                kind: ProductKind::Kit,
                price_cents: 1_200,
                tracks_inventory: false,
                stock_quantity: 0,
            },
        )
        .await?;
    // Soda + Fries
    catalog.add_kit_component(&combo.id, &tracked[0].id, 1).await?;
    catalog.add_kit_component(&combo.id, &tracked[2].id, 1).await?;

    info!(products = TRACKED.len() + 2, options = options.len(), "Menu seeded");

    // Staff
    let waiter = db.employees().create("Alice").await?;
    db.employees().grant_access(&waiter.id, &store_id).await?;

    // One live tab
    if let Some(table_id) = first_table {
        db.tables().assign_employee(&table_id, &waiter.id).await?;

        let command = db
            .commands()
            .open(OpenCommand {
                store_id: store_id.clone(),
                table_id: Some(table_id),
                customer_name: Some("Walk-in".into()),
                attendant_id: Some(waiter.id.clone()),
                guest_count: Some(2),
                ..Default::default()
            })
            .await?;

        db.orders()
            .add_items(
                &command.id,
                &[
                    NewLineItem::plain(&combo.id, 2),
                    NewLineItem {
                        product_id: burger.id.clone(),
                        quantity: 1,
                        note: Some("medium rare".into()),
                        variants: vec![SelectedVariant {
                            variant_id: extras.id.clone(),
                            options: vec![SelectedOption {
                                variant_option_id: options[1].id.clone(),
                                quantity: 1,
                            }],
                        }],
                    },
                ],
            )
            .await?;
        info!(command_id = %command.id, "Demo tab opened");
    }

    let dashboard = db.tables().dashboard(&store_id).await?;
    println!(
        "Seeded {} tables ({} occupied), {} saloons",
        dashboard.total_tables,
        dashboard.occupied,
        dashboard.saloons.len()
    );

    db.close().await;
    Ok(())
}
