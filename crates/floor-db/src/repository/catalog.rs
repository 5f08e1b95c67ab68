//! # Catalog Repository
//!
//! Products, variants, variant options, kit composition and per-channel
//! availability links. The floor only reads the catalog while ordering;
//! this repository is how rows get there.
//!
//! ## Shape
//! ```text
//! Product (INDIVIDUAL) ──► Variant ──► VariantOption (may track stock)
//! Product (KIT) ──► KitComponent ──► Product (component, may track stock)
//! Product / VariantOption ──► AvailabilityLink (one per channel)
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use floor_core::validation::{
    validate_kit_quantity, validate_price, validate_product_name,
};
use floor_core::{
    AvailabilityLink, CoreError, KitComponent, NewProduct, NewVariantOption, Product,
    ProductKind, StockRef, Variant, VariantOption,
};

/// Repository for catalog rows.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Creates a product. A tracked product starts unavailable when it has
    /// no stock.
    pub async fn create_product(&self, store_id: &str, input: NewProduct) -> DbResult<Product> {
        validate_product_name(&input.name)?;
        validate_price(input.price_cents)?;

        // Kits never hold their own stock
        let tracks_inventory = input.tracks_inventory && input.kind == ProductKind::Individual;

        let now = Utc::now();
        let product = Product {
            id: new_id(),
            store_id: store_id.to_string(),
            name: input.name.trim().to_string(),
            kind: input.kind,
            price_cents: input.price_cents,
            tracks_inventory,
            stock_quantity: input.stock_quantity,
            is_available: !tracks_inventory || input.stock_quantity > 0,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "Creating product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, store_id, name, kind, price_cents, tracks_inventory,
                stock_quantity, is_available, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.store_id)
        .bind(&product.name)
        .bind(product.kind)
        .bind(product.price_cents)
        .bind(product.tracks_inventory)
        .bind(product.stock_quantity)
        .bind(product.is_available)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    pub async fn get_product(&self, id: &str) -> DbResult<Product> {
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    pub async fn list_products(&self, store_id: &str) -> DbResult<Vec<Product>> {
        let products =
            sqlx::query_as::<_, Product>("SELECT * FROM products WHERE store_id = ?1 ORDER BY name")
                .bind(store_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(products)
    }

    /// Removes a product from the catalog.
    ///
    /// Order lines keep their snapshot; the ledger skips lines whose
    /// product no longer exists.
    pub async fn delete_product(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        info!(id = %id, "Product deleted from catalog");
        Ok(())
    }

    pub async fn create_variant(&self, product_id: &str, name: &str) -> DbResult<Variant> {
        validate_product_name(name)?;
        self.get_product(product_id).await?;

        let variant = Variant {
            id: new_id(),
            product_id: product_id.to_string(),
            name: name.trim().to_string(),
        };

        sqlx::query("INSERT INTO variants (id, product_id, name) VALUES (?1, ?2, ?3)")
            .bind(&variant.id)
            .bind(&variant.product_id)
            .bind(&variant.name)
            .execute(&self.pool)
            .await?;

        Ok(variant)
    }

    pub async fn create_variant_option(&self, input: NewVariantOption) -> DbResult<VariantOption> {
        validate_product_name(&input.name)?;
        validate_price(input.price_cents)?;

        let option = VariantOption {
            id: new_id(),
            variant_id: input.variant_id,
            name: input.name.trim().to_string(),
            price_cents: input.price_cents,
            tracks_inventory: input.tracks_inventory,
            stock_quantity: input.stock_quantity,
            is_available: !input.tracks_inventory || input.stock_quantity > 0,
        };

        sqlx::query(
            r#"
            INSERT INTO variant_options (
                id, variant_id, name, price_cents, tracks_inventory, stock_quantity, is_available
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&option.id)
        .bind(&option.variant_id)
        .bind(&option.name)
        .bind(option.price_cents)
        .bind(option.tracks_inventory)
        .bind(option.stock_quantity)
        .bind(option.is_available)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::ForeignKeyViolation { .. } => {
                DbError::not_found("Variant", &option.variant_id)
            }
            other => other,
        })?;

        Ok(option)
    }

    pub async fn get_variant_option(&self, id: &str) -> DbResult<VariantOption> {
        sqlx::query_as::<_, VariantOption>("SELECT * FROM variant_options WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("VariantOption", id))
    }

    /// Adds `quantity` units of `component_id` to a kit.
    ///
    /// ## Errors
    /// * `NotFound` - either product is missing
    /// * `InvalidState` - the first product is not a KIT, or a kit is nested
    pub async fn add_kit_component(
        &self,
        kit_id: &str,
        component_id: &str,
        quantity: i64,
    ) -> DbResult<KitComponent> {
        validate_kit_quantity(quantity)?;

        let kit = self.get_product(kit_id).await?;
        if kit.kind != ProductKind::Kit {
            return Err(CoreError::invalid_state(
                "Product",
                kit_id,
                "INDIVIDUAL",
                "hold kit components",
            )
            .into());
        }

        let component = self.get_product(component_id).await?;
        if component.kind == ProductKind::Kit {
            return Err(CoreError::invalid_state(
                "Product",
                component_id,
                "KIT",
                "be a kit component",
            )
            .into());
        }

        let link = KitComponent {
            id: new_id(),
            kit_product_id: kit.id,
            component_product_id: component.id,
            quantity,
        };

        sqlx::query(
            r#"
            INSERT INTO kit_components (id, kit_product_id, component_product_id, quantity)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&link.id)
        .bind(&link.kit_product_id)
        .bind(&link.component_product_id)
        .bind(link.quantity)
        .execute(&self.pool)
        .await?;

        Ok(link)
    }

    pub async fn kit_components(&self, kit_id: &str) -> DbResult<Vec<KitComponent>> {
        let components = sqlx::query_as::<_, KitComponent>(
            "SELECT * FROM kit_components WHERE kit_product_id = ?1 ORDER BY component_product_id",
        )
        .bind(kit_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(components)
    }

    /// Publishes a stock item on a sales channel.
    pub async fn add_availability_link(
        &self,
        store_id: &str,
        channel: &str,
        item: &StockRef,
        is_available: bool,
    ) -> DbResult<AvailabilityLink> {
        let (product_id, variant_option_id) = match item {
            StockRef::Product(id) => (Some(id.clone()), None),
            StockRef::VariantOption(id) => (None, Some(id.clone())),
        };

        let link = AvailabilityLink {
            id: new_id(),
            store_id: store_id.to_string(),
            channel: channel.to_string(),
            product_id,
            variant_option_id,
            is_available,
        };

        sqlx::query(
            r#"
            INSERT INTO availability_links (
                id, store_id, channel, product_id, variant_option_id, is_available
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&link.id)
        .bind(&link.store_id)
        .bind(&link.channel)
        .bind(&link.product_id)
        .bind(&link.variant_option_id)
        .bind(link.is_available)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::ForeignKeyViolation { .. } => DbError::not_found(item.entity(), item.id()),
            other => other,
        })?;

        Ok(link)
    }

    /// All channel links of one stock item.
    pub async fn links_for(&self, item: &StockRef) -> DbResult<Vec<AvailabilityLink>> {
        let sql = match item {
            StockRef::Product(_) => {
                "SELECT * FROM availability_links WHERE product_id = ?1 ORDER BY channel"
            }
            StockRef::VariantOption(_) => {
                "SELECT * FROM availability_links WHERE variant_option_id = ?1 ORDER BY channel"
            }
        };

        let links = sqlx::query_as::<_, AvailabilityLink>(sql)
            .bind(item.id())
            .fetch_all(&self.pool)
            .await?;
        Ok(links)
    }
}
