//! Shared fixtures for repository tests.

use crate::error::DbResult;
use crate::pool::{Database, DbConfig};
use floor_core::{
    Command, NewLineItem, NewProduct, NewSaloon, NewTable, NewVariantOption, OpenCommand, Product,
    ProductKind, Saloon, SelectedOption, SelectedVariant, Table, VariantOption,
};

/// One store with a "Main" saloon and a four-seat table "T1".
pub(crate) struct Floor {
    pub db: Database,
    pub store_id: String,
    pub saloon: Saloon,
    pub table: Table,
}

pub(crate) async fn db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

pub(crate) async fn floor() -> Floor {
    floor_on(db().await).await
}

/// Builds the fixture floor on an existing database.
pub(crate) async fn floor_on(db: Database) -> Floor {
    let store_id = "store-1".to_string();

    let saloon = db
        .saloons()
        .create(&store_id, NewSaloon { name: "Main".into(), display_order: 0 })
        .await
        .unwrap();
    let table = db
        .tables()
        .create(
            &store_id,
            NewTable {
                saloon_id: saloon.id.clone(),
                name: "T1".into(),
                max_capacity: 4,
                location_description: None,
            },
        )
        .await
        .unwrap();

    Floor { db, store_id, saloon, table }
}

/// Fixture floor on a file database with a pool of eight connections,
/// for tests that race writers against each other.
pub(crate) async fn file_floor(dir: &tempfile::TempDir) -> Floor {
    let config = DbConfig::new(dir.path().join("floor.db")).max_connections(8);
    floor_on(Database::new(config).await.unwrap()).await
}

/// Another four-seat table in the fixture's saloon.
pub(crate) async fn extra_table(floor: &Floor, name: &str) -> Table {
    floor
        .db
        .tables()
        .create(
            &floor.store_id,
            NewTable {
                saloon_id: floor.saloon.id.clone(),
                name: name.into(),
                max_capacity: 4,
                location_description: None,
            },
        )
        .await
        .unwrap()
}

pub(crate) async fn try_open_command(floor: &Floor) -> DbResult<Command> {
    floor
        .db
        .commands()
        .open(OpenCommand {
            store_id: floor.store_id.clone(),
            table_id: Some(floor.table.id.clone()),
            guest_count: Some(2),
            ..Default::default()
        })
        .await
}

/// Seats two guests at "T1".
pub(crate) async fn open_command(floor: &Floor) -> Command {
    try_open_command(floor).await.unwrap()
}

pub(crate) async fn tracked_product(
    db: &Database,
    name: &str,
    price_cents: i64,
    stock: i64,
) -> Product {
    db.catalog()
        .create_product(
            "store-1",
            NewProduct {
                name: name.into(),
                kind: ProductKind::Individual,
                price_cents,
                tracks_inventory: true,
                stock_quantity: stock,
            },
        )
        .await
        .unwrap()
}

/// Option under `variant_id`; `stock = None` leaves it untracked.
pub(crate) async fn option(
    db: &Database,
    variant_id: &str,
    name: &str,
    price_cents: i64,
    stock: Option<i64>,
) -> VariantOption {
    db.catalog()
        .create_variant_option(NewVariantOption {
            variant_id: variant_id.into(),
            name: name.into(),
            price_cents,
            tracks_inventory: stock.is_some(),
            stock_quantity: stock.unwrap_or(0),
        })
        .await
        .unwrap()
}

/// Counter command in the store that sells `product_id`.
async fn counter_command(db: &Database, product_id: &str) -> Command {
    let product = db.catalog().get_product(product_id).await.unwrap();
    db.commands()
        .open(OpenCommand { store_id: product.store_id, ..Default::default() })
        .await
        .unwrap()
}

/// Order in PREPARING on a counter command, one plain line per entry.
pub(crate) async fn order_with_lines(db: &Database, lines: &[(&str, i64)]) -> String {
    let command = counter_command(db, lines[0].0).await;
    let items: Vec<NewLineItem> = lines
        .iter()
        .map(|(product_id, quantity)| NewLineItem::plain(*product_id, *quantity))
        .collect();

    db.orders().add_items(&command.id, &items).await.unwrap().order.id
}

/// Order with a single line carrying one selected option.
pub(crate) async fn order_with_option(
    db: &Database,
    product_id: &str,
    variant_id: &str,
    option_id: &str,
    line_quantity: i64,
    option_quantity: i64,
) -> String {
    let command = counter_command(db, product_id).await;
    let line = NewLineItem {
        product_id: product_id.into(),
        quantity: line_quantity,
        note: None,
        variants: vec![SelectedVariant {
            variant_id: variant_id.into(),
            options: vec![SelectedOption {
                variant_option_id: option_id.into(),
                quantity: option_quantity,
            }],
        }],
    };

    db.orders().add_items(&command.id, &[line]).await.unwrap().order.id
}
