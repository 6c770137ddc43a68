use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use depot_core::{LocationId, ProductId, WarehouseId};
use depot_inventory::{Location, NewLocation, NewProduct, NewWarehouse, Product, Warehouse};

use super::CatalogStore;
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Default)]
struct CatalogState {
    products: BTreeMap<ProductId, Product>,
    warehouses: BTreeMap<WarehouseId, Warehouse>,
    locations: BTreeMap<LocationId, Location>,
    last_id: i64,
}

impl CatalogState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn ensure_unique_sku(&self, sku: &str, except: Option<ProductId>) -> StoreResult<()> {
        let taken = self
            .products
            .values()
            .any(|p| p.sku == sku && Some(p.id) != except);
        if taken {
            return Err(StoreError::Conflict(format!("sku '{sku}' already exists")));
        }
        Ok(())
    }

    fn ensure_warehouse(&self, id: WarehouseId) -> StoreResult<()> {
        if !self.warehouses.contains_key(&id) {
            return Err(StoreError::InvalidReference(format!("warehouse {id} does not exist")));
        }
        Ok(())
    }
}

/// In-memory catalog for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    state: RwLock<CatalogState>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn create_product(&self, product: NewProduct, now: DateTime<Utc>) -> StoreResult<Product> {
        let mut state = self.state.write().map_err(|_| StoreError::poisoned())?;
        state.ensure_unique_sku(&product.sku, None)?;
        let id = ProductId::new(state.next_id());
        let product = product.into_product(id, now);
        state.products.insert(id, product.clone());
        Ok(product)
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let state = self.state.read().map_err(|_| StoreError::poisoned())?;
        Ok(state.products.values().cloned().collect())
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let state = self.state.read().map_err(|_| StoreError::poisoned())?;
        Ok(state.products.get(&id).cloned())
    }

    async fn update_product(&self, product: Product) -> StoreResult<Product> {
        let mut state = self.state.write().map_err(|_| StoreError::poisoned())?;
        if !state.products.contains_key(&product.id) {
            return Err(StoreError::NotFound(format!("product {}", product.id)));
        }
        state.ensure_unique_sku(&product.sku, Some(product.id))?;
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<()> {
        let mut state = self.state.write().map_err(|_| StoreError::poisoned())?;
        state
            .products
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("product {id}")))
    }

    async fn create_warehouse(&self, warehouse: NewWarehouse) -> StoreResult<Warehouse> {
        let mut state = self.state.write().map_err(|_| StoreError::poisoned())?;
        let id = WarehouseId::new(state.next_id());
        let warehouse = Warehouse {
            id,
            name: warehouse.name,
        };
        state.warehouses.insert(id, warehouse.clone());
        Ok(warehouse)
    }

    async fn list_warehouses(&self) -> StoreResult<Vec<Warehouse>> {
        let state = self.state.read().map_err(|_| StoreError::poisoned())?;
        Ok(state.warehouses.values().cloned().collect())
    }

    async fn get_warehouse(&self, id: WarehouseId) -> StoreResult<Option<Warehouse>> {
        let state = self.state.read().map_err(|_| StoreError::poisoned())?;
        Ok(state.warehouses.get(&id).cloned())
    }

    async fn rename_warehouse(&self, id: WarehouseId, name: String) -> StoreResult<Warehouse> {
        let mut state = self.state.write().map_err(|_| StoreError::poisoned())?;
        let warehouse = state
            .warehouses
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("warehouse {id}")))?;
        warehouse.name = name;
        Ok(warehouse.clone())
    }

    async fn delete_warehouse(&self, id: WarehouseId) -> StoreResult<()> {
        let mut state = self.state.write().map_err(|_| StoreError::poisoned())?;
        if state.locations.values().any(|l| l.warehouse_id == id) {
            return Err(StoreError::Conflict(format!("warehouse {id} still has locations")));
        }
        state
            .warehouses
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("warehouse {id}")))
    }

    async fn create_location(&self, location: NewLocation) -> StoreResult<Location> {
        let mut state = self.state.write().map_err(|_| StoreError::poisoned())?;
        state.ensure_warehouse(location.warehouse_id)?;
        let id = LocationId::new(state.next_id());
        let location = Location {
            id,
            warehouse_id: location.warehouse_id,
            name: location.name,
        };
        state.locations.insert(id, location.clone());
        Ok(location)
    }

    async fn list_locations(&self) -> StoreResult<Vec<Location>> {
        let state = self.state.read().map_err(|_| StoreError::poisoned())?;
        Ok(state.locations.values().cloned().collect())
    }

    async fn get_location(&self, id: LocationId) -> StoreResult<Option<Location>> {
        let state = self.state.read().map_err(|_| StoreError::poisoned())?;
        Ok(state.locations.get(&id).cloned())
    }

    async fn update_location(&self, location: Location) -> StoreResult<Location> {
        let mut state = self.state.write().map_err(|_| StoreError::poisoned())?;
        if !state.locations.contains_key(&location.id) {
            return Err(StoreError::NotFound(format!("location {}", location.id)));
        }
        state.ensure_warehouse(location.warehouse_id)?;
        state.locations.insert(location.id, location.clone());
        Ok(location)
    }

    async fn delete_location(&self, id: LocationId) -> StoreResult<()> {
        let mut state = self.state.write().map_err(|_| StoreError::poisoned())?;
        state
            .locations
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("location {id}")))
    }
}
