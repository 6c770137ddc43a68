//! Catalog persistence: products, warehouses and storage locations.

mod in_memory;
mod postgres;

pub use in_memory::InMemoryCatalogStore;
pub use postgres::PostgresCatalogStore;

use chrono::{DateTime, Utc};

use depot_core::{LocationId, ProductId, WarehouseId};
use depot_inventory::{Location, NewLocation, NewProduct, NewWarehouse, Product, Warehouse};

use crate::error::StoreResult;

/// Catalog storage.
///
/// Inputs are expected to be validated already. Stores enforce uniqueness
/// (`Conflict` on a duplicate SKU) and the warehouse → location reference
/// (`InvalidReference` for an unknown warehouse).
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    async fn create_product(&self, product: NewProduct, now: DateTime<Utc>) -> StoreResult<Product>;

    /// All products ordered by id.
    async fn list_products(&self) -> StoreResult<Vec<Product>>;

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>>;

    /// Replace a product's fields with `product`. `NotFound` if it does not exist.
    async fn update_product(&self, product: Product) -> StoreResult<Product>;

    async fn delete_product(&self, id: ProductId) -> StoreResult<()>;

    async fn create_warehouse(&self, warehouse: NewWarehouse) -> StoreResult<Warehouse>;

    async fn list_warehouses(&self) -> StoreResult<Vec<Warehouse>>;

    async fn get_warehouse(&self, id: WarehouseId) -> StoreResult<Option<Warehouse>>;

    async fn rename_warehouse(&self, id: WarehouseId, name: String) -> StoreResult<Warehouse>;

    /// Refused with `Conflict` while locations belong to the warehouse.
    async fn delete_warehouse(&self, id: WarehouseId) -> StoreResult<()>;

    async fn create_location(&self, location: NewLocation) -> StoreResult<Location>;

    async fn list_locations(&self) -> StoreResult<Vec<Location>>;

    async fn get_location(&self, id: LocationId) -> StoreResult<Option<Location>>;

    async fn update_location(&self, location: Location) -> StoreResult<Location>;

    async fn delete_location(&self, id: LocationId) -> StoreResult<()>;
}
