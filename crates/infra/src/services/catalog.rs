//! Catalog management with the ledger's referential rules applied.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use depot_core::{LocationId, ProductId, WarehouseId};
use depot_inventory::{
    Location, LocationPatch, NewLocation, NewProduct, NewWarehouse, Product, ProductPatch,
    Warehouse,
};

use super::{ReferenceGate, ServiceError, ServiceResult};
use crate::catalog_store::CatalogStore;
use crate::ledger_store::LedgerStore;

/// A location with its warehouse's name resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationView {
    pub id: LocationId,
    pub warehouse_id: WarehouseId,
    pub warehouse_name: String,
    pub name: String,
}

#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogStore>,
    ledger: Arc<dyn LedgerStore>,
    gate: ReferenceGate,
}

impl CatalogService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        ledger: Arc<dyn LedgerStore>,
        gate: ReferenceGate,
    ) -> Self {
        Self {
            catalog,
            ledger,
            gate,
        }
    }

    pub async fn create_product(&self, input: NewProduct) -> ServiceResult<Product> {
        let product = self
            .catalog
            .create_product(input.validated()?, Utc::now())
            .await?;
        info!(product_id = %product.id, sku = %product.sku, "product created");
        Ok(product)
    }

    pub async fn list_products(&self) -> ServiceResult<Vec<Product>> {
        Ok(self.catalog.list_products().await?)
    }

    pub async fn get_product(&self, id: ProductId) -> ServiceResult<Product> {
        self.catalog
            .get_product(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("product {id}")))
    }

    pub async fn update_product(&self, id: ProductId, patch: ProductPatch) -> ServiceResult<Product> {
        let mut product = self.get_product(id).await?;
        patch.apply(&mut product, Utc::now())?;
        Ok(self.catalog.update_product(product).await?)
    }

    /// Products with ledger history cannot be deleted.
    pub async fn delete_product(&self, id: ProductId) -> ServiceResult<()> {
        let _guard = self.gate.removal().await;
        self.get_product(id).await?;
        if self.ledger.references_product(id).await? {
            return Err(ServiceError::conflict(format!(
                "product {id} has stock movements and cannot be deleted"
            )));
        }
        self.catalog.delete_product(id).await?;
        info!(product_id = %id, "product deleted");
        Ok(())
    }

    pub async fn create_warehouse(&self, input: NewWarehouse) -> ServiceResult<Warehouse> {
        Ok(self.catalog.create_warehouse(input.validated()?).await?)
    }

    pub async fn list_warehouses(&self) -> ServiceResult<Vec<Warehouse>> {
        Ok(self.catalog.list_warehouses().await?)
    }

    pub async fn get_warehouse(&self, id: WarehouseId) -> ServiceResult<Warehouse> {
        self.catalog
            .get_warehouse(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("warehouse {id}")))
    }

    pub async fn rename_warehouse(&self, id: WarehouseId, input: NewWarehouse) -> ServiceResult<Warehouse> {
        let input = input.validated()?;
        Ok(self.catalog.rename_warehouse(id, input.name).await?)
    }

    pub async fn delete_warehouse(&self, id: WarehouseId) -> ServiceResult<()> {
        Ok(self.catalog.delete_warehouse(id).await?)
    }

    async fn ensure_warehouse(&self, id: WarehouseId) -> ServiceResult<()> {
        self.get_warehouse(id).await.map(|_| ())
    }

    pub async fn create_location(&self, input: NewLocation) -> ServiceResult<Location> {
        let input = input.validated()?;
        self.ensure_warehouse(input.warehouse_id).await?;
        Ok(self.catalog.create_location(input).await?)
    }

    /// Locations with their warehouse name ("Unknown" if it cannot be resolved).
    pub async fn list_locations(&self) -> ServiceResult<Vec<LocationView>> {
        let warehouses: HashMap<WarehouseId, String> = self
            .catalog
            .list_warehouses()
            .await?
            .into_iter()
            .map(|w| (w.id, w.name))
            .collect();
        Ok(self
            .catalog
            .list_locations()
            .await?
            .into_iter()
            .map(|l| LocationView {
                id: l.id,
                warehouse_id: l.warehouse_id,
                warehouse_name: warehouses
                    .get(&l.warehouse_id)
                    .cloned()
                    .unwrap_or_else(|| "Unknown".to_string()),
                name: l.name,
            })
            .collect())
    }

    pub async fn get_location(&self, id: LocationId) -> ServiceResult<Location> {
        self.catalog
            .get_location(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("location {id}")))
    }

    pub async fn update_location(&self, id: LocationId, patch: LocationPatch) -> ServiceResult<Location> {
        let mut location = self.get_location(id).await?;
        patch.apply(&mut location)?;
        self.ensure_warehouse(location.warehouse_id).await?;
        Ok(self.catalog.update_location(location).await?)
    }

    /// Locations referenced by the ledger cannot be deleted.
    pub async fn delete_location(&self, id: LocationId) -> ServiceResult<()> {
        let _guard = self.gate.removal().await;
        self.get_location(id).await?;
        if self.ledger.references_location(id).await? {
            return Err(ServiceError::conflict(format!(
                "location {id} has stock movements and cannot be deleted"
            )));
        }
        Ok(self.catalog.delete_location(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use depot_core::UserId;
    use depot_inventory::movement::plan_receipt;
    use depot_inventory::{EntryStamp, MovementRequest};

    use super::*;
    use crate::catalog_store::InMemoryCatalogStore;
    use crate::ledger_store::InMemoryLedgerStore;
    use crate::services::MovementRecorder;

    fn services() -> (CatalogService, MovementRecorder) {
        let catalog: Arc<dyn CatalogStore> = Arc::new(InMemoryCatalogStore::new());
        let ledger: Arc<dyn LedgerStore> = Arc::new(InMemoryLedgerStore::new());
        (
            CatalogService::new(catalog.clone(), ledger.clone(), ReferenceGate::new()),
            MovementRecorder::new(ledger, catalog, ReferenceGate::new()),
        )
    }

    fn bolt() -> NewProduct {
        NewProduct {
            name: " Bolt ".to_string(),
            sku: "B-1".to_string(),
            description: None,
            category: String::new(),
            uom: "pcs".to_string(),
            barcode: None,
            min_stock_level: Decimal::ZERO,
        }
    }

    #[tokio::test]
    async fn referenced_product_and_location_cannot_be_deleted() {
        let (catalog, recorder) = services();
        let product = catalog.create_product(bolt()).await.unwrap();
        assert_eq!(product.name, "Bolt");
        let wh = catalog
            .create_warehouse(NewWarehouse {
                name: "Main".to_string(),
            })
            .await
            .unwrap();
        let loc = catalog
            .create_location(NewLocation {
                warehouse_id: wh.id,
                name: "Dock".to_string(),
            })
            .await
            .unwrap();

        recorder
            .record_receipt(
                depot_core::UserId::new(1),
                MovementRequest {
                    reference: None,
                    product_id: product.id,
                    qty: Decimal::from(3),
                    location_src_id: None,
                    location_dest_id: Some(loc.id),
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            catalog.delete_product(product.id).await.unwrap_err(),
            ServiceError::Conflict(_)
        ));
        assert!(matches!(
            catalog.delete_location(loc.id).await.unwrap_err(),
            ServiceError::Conflict(_)
        ));
        assert!(matches!(
            catalog.delete_warehouse(wh.id).await.unwrap_err(),
            ServiceError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn delete_waits_for_a_movement_in_flight() {
        let store: Arc<dyn CatalogStore> = Arc::new(InMemoryCatalogStore::new());
        let ledger: Arc<dyn LedgerStore> = Arc::new(InMemoryLedgerStore::new());
        let gate = ReferenceGate::new();
        let catalog = CatalogService::new(store, ledger.clone(), gate.clone());
        let product = catalog.create_product(bolt()).await.unwrap();

        // A receipt that has passed its catalog checks but not yet appended.
        let in_flight = gate.movement().await;
        let deleting = tokio::spawn({
            let catalog = catalog.clone();
            async move { catalog.delete_product(product.id).await }
        });
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert!(!deleting.is_finished());

        let stamp = EntryStamp::new(Some(UserId::new(1)), Utc::now());
        let plan = plan_receipt(
            &MovementRequest {
                reference: None,
                product_id: product.id,
                qty: Decimal::from(2),
                location_src_id: None,
                location_dest_id: Some(LocationId::new(1)),
            },
            &stamp,
        )
        .unwrap();
        ledger.append_batch(plan.entries).await.unwrap();
        drop(in_flight);

        let err = deleting.await.unwrap().unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert!(catalog.get_product(product.id).await.is_ok());
    }

    #[tokio::test]
    async fn location_listing_resolves_warehouse_names() {
        let (catalog, _) = services();
        let wh = catalog
            .create_warehouse(NewWarehouse {
                name: "Main".to_string(),
            })
            .await
            .unwrap();
        catalog
            .create_location(NewLocation {
                warehouse_id: wh.id,
                name: "Dock".to_string(),
            })
            .await
            .unwrap();
        let views = catalog.list_locations().await.unwrap();
        assert_eq!(views[0].warehouse_name, "Main");

        let err = catalog
            .create_location(NewLocation {
                warehouse_id: WarehouseId::new(404),
                name: "Nowhere".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn negative_threshold_is_rejected_on_update() {
        let (catalog, _) = services();
        let product = catalog.create_product(bolt()).await.unwrap();
        let err = catalog
            .update_product(
                product.id,
                ProductPatch {
                    min_stock_level: Some(Decimal::from(-1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
