//! Postgres-backed catalog.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use depot_core::{LocationId, ProductId, WarehouseId};
use depot_inventory::{Location, NewLocation, NewProduct, NewWarehouse, Product, Warehouse};

use super::CatalogStore;
use crate::error::{StoreError, StoreResult, map_sqlx_error};

const PRODUCT_COLUMNS: &str =
    "id, name, sku, description, category, uom, barcode, min_stock_level, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: Arc<PgPool>,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

fn not_found_if_untouched(rows: u64, what: String) -> StoreResult<()> {
    if rows == 0 {
        return Err(StoreError::NotFound(what));
    }
    Ok(())
}

#[async_trait::async_trait]
impl CatalogStore for PostgresCatalogStore {
    #[instrument(skip(self, product), fields(sku = %product.sku), err)]
    async fn create_product(&self, product: NewProduct, now: DateTime<Utc>) -> StoreResult<Product> {
        let sql = format!(
            "INSERT INTO products (name, sku, description, category, uom, barcode, min_stock_level, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8) RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&product.name)
            .bind(&product.sku)
            .bind(product.description.as_deref())
            .bind(&product.category)
            .bind(&product.uom)
            .bind(product.barcode.as_deref())
            .bind(product.min_stock_level)
            .bind(now)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_product", e))?;
        product_from_row(&row)
    }

    #[instrument(skip(self), err)]
    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;
        rows.iter().map(product_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn update_product(&self, product: Product) -> StoreResult<Product> {
        let sql = format!(
            "UPDATE products SET name = $2, sku = $3, description = $4, category = $5, uom = $6, \
             barcode = $7, min_stock_level = $8, updated_at = $9 WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(product.id.get())
            .bind(&product.name)
            .bind(&product.sku)
            .bind(product.description.as_deref())
            .bind(&product.category)
            .bind(&product.uom)
            .bind(product.barcode.as_deref())
            .bind(product.min_stock_level)
            .bind(product.updated_at)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_product", e))?;
        match row {
            Some(row) => product_from_row(&row),
            None => Err(StoreError::NotFound(format!("product {}", product.id))),
        }
    }

    #[instrument(skip(self), err)]
    async fn delete_product(&self, id: ProductId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        not_found_if_untouched(result.rows_affected(), format!("product {id}"))
    }

    #[instrument(skip(self), err)]
    async fn create_warehouse(&self, warehouse: NewWarehouse) -> StoreResult<Warehouse> {
        let row = sqlx::query("INSERT INTO warehouses (name) VALUES ($1) RETURNING id, name")
            .bind(&warehouse.name)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_warehouse", e))?;
        warehouse_from_row(&row)
    }

    #[instrument(skip(self), err)]
    async fn list_warehouses(&self) -> StoreResult<Vec<Warehouse>> {
        let rows = sqlx::query("SELECT id, name FROM warehouses ORDER BY id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_warehouses", e))?;
        rows.iter().map(warehouse_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn get_warehouse(&self, id: WarehouseId) -> StoreResult<Option<Warehouse>> {
        let row = sqlx::query("SELECT id, name FROM warehouses WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_warehouse", e))?;
        row.as_ref().map(warehouse_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn rename_warehouse(&self, id: WarehouseId, name: String) -> StoreResult<Warehouse> {
        let row = sqlx::query("UPDATE warehouses SET name = $2 WHERE id = $1 RETURNING id, name")
            .bind(id.get())
            .bind(&name)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("rename_warehouse", e))?;
        match row {
            Some(row) => warehouse_from_row(&row),
            None => Err(StoreError::NotFound(format!("warehouse {id}"))),
        }
    }

    #[instrument(skip(self), err)]
    async fn delete_warehouse(&self, id: WarehouseId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM warehouses WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| match map_sqlx_error("delete_warehouse", e) {
                StoreError::InvalidReference(_) => {
                    StoreError::Conflict(format!("warehouse {id} still has locations"))
                }
                other => other,
            })?;
        not_found_if_untouched(result.rows_affected(), format!("warehouse {id}"))
    }

    #[instrument(skip(self), err)]
    async fn create_location(&self, location: NewLocation) -> StoreResult<Location> {
        let row = sqlx::query(
            "INSERT INTO locations (warehouse_id, name) VALUES ($1, $2) RETURNING id, warehouse_id, name",
        )
        .bind(location.warehouse_id.get())
        .bind(&location.name)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_location", e))?;
        location_from_row(&row)
    }

    #[instrument(skip(self), err)]
    async fn list_locations(&self) -> StoreResult<Vec<Location>> {
        let rows = sqlx::query("SELECT id, warehouse_id, name FROM locations ORDER BY id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_locations", e))?;
        rows.iter().map(location_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn get_location(&self, id: LocationId) -> StoreResult<Option<Location>> {
        let row = sqlx::query("SELECT id, warehouse_id, name FROM locations WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_location", e))?;
        row.as_ref().map(location_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn update_location(&self, location: Location) -> StoreResult<Location> {
        let row = sqlx::query(
            "UPDATE locations SET warehouse_id = $2, name = $3 WHERE id = $1 RETURNING id, warehouse_id, name",
        )
        .bind(location.id.get())
        .bind(location.warehouse_id.get())
        .bind(&location.name)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_location", e))?;
        match row {
            Some(row) => location_from_row(&row),
            None => Err(StoreError::NotFound(format!("location {}", location.id))),
        }
    }

    #[instrument(skip(self), err)]
    async fn delete_location(&self, id: LocationId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM locations WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_location", e))?;
        not_found_if_untouched(result.rows_affected(), format!("location {id}"))
    }
}

// SQLx row mapping

fn product_from_row(row: &PgRow) -> StoreResult<Product> {
    let read = || -> Result<Product, sqlx::Error> {
        Ok(Product {
            id: ProductId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            sku: row.try_get("sku")?,
            description: row.try_get("description")?,
            category: row.try_get("category")?,
            uom: row.try_get("uom")?,
            barcode: row.try_get("barcode")?,
            min_stock_level: row.try_get::<Decimal, _>("min_stock_level")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    };
    read().map_err(|e| StoreError::Storage(format!("failed to read product row: {}", e)))
}

fn warehouse_from_row(row: &PgRow) -> StoreResult<Warehouse> {
    let read = || -> Result<Warehouse, sqlx::Error> {
        Ok(Warehouse {
            id: WarehouseId::new(row.try_get("id")?),
            name: row.try_get("name")?,
        })
    };
    read().map_err(|e| StoreError::Storage(format!("failed to read warehouse row: {}", e)))
}

fn location_from_row(row: &PgRow) -> StoreResult<Location> {
    let read = || -> Result<Location, sqlx::Error> {
        Ok(Location {
            id: LocationId::new(row.try_get("id")?),
            warehouse_id: WarehouseId::new(row.try_get("warehouse_id")?),
            name: row.try_get("name")?,
        })
    };
    read().map_err(|e| StoreError::Storage(format!("failed to read location row: {}", e)))
}
