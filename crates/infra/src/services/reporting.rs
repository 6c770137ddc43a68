//! Read side: operation lists, adjustments, dashboard, raw ledger and stock.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use depot_core::{EntryId, LocationId, ProductId};
use depot_inventory::projection::{
    adjustment_view, dashboard, documents, live_entries, operation_view,
};
use depot_inventory::{
    AdjustmentView, Dashboard, Directory, LedgerEntry, LedgerFilter, MoveType, OperationView,
    is_low_stock,
};

use super::{ServiceError, ServiceResult};
use crate::catalog_store::CatalogStore;
use crate::ledger_store::{LedgerPage, LedgerStore, Pagination};
use crate::user_store::UserStore;

/// Balance of one product, globally or at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductStock {
    pub product_id: ProductId,
    pub location_id: Option<LocationId>,
    pub balance: Decimal,
    pub min_stock_level: Decimal,
    pub low_stock: bool,
}

#[derive(Clone)]
pub struct Reporting {
    ledger: Arc<dyn LedgerStore>,
    catalog: Arc<dyn CatalogStore>,
    users: Arc<dyn UserStore>,
}

impl Reporting {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        catalog: Arc<dyn CatalogStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            ledger,
            catalog,
            users,
        }
    }

    async fn directory(&self) -> ServiceResult<Directory> {
        let users = self.users.list().await?;
        Ok(Directory::new(
            self.catalog.list_products().await?,
            self.catalog.list_warehouses().await?,
            self.catalog.list_locations().await?,
            users.into_iter().map(|u| (u.id, u.name)),
        ))
    }

    /// Every entry of `kind`, oldest first.
    async fn entries_of(&self, kind: MoveType) -> ServiceResult<Vec<LedgerEntry>> {
        let mut entries = self
            .ledger
            .query(&LedgerFilter::default().with_move_type(kind))
            .await?;
        entries.reverse();
        Ok(entries)
    }

    pub async fn list_operations(&self, kind: MoveType) -> ServiceResult<Vec<OperationView>> {
        let entries = self.entries_of(kind).await?;
        let directory = self.directory().await?;
        let totals = self.ledger.product_totals().await?;
        Ok(live_entries(&entries, kind)
            .into_iter()
            .map(|e| operation_view(e, &directory, &totals))
            .collect())
    }

    /// A live entry of `kind`. Reversed, reversing and foreign entries are not found.
    pub async fn get_operation(&self, kind: MoveType, id: EntryId) -> ServiceResult<OperationView> {
        let entries = self.entries_of(kind).await?;
        let entry = live_entries(&entries, kind)
            .into_iter()
            .find(|e| e.id == id)
            .ok_or_else(|| ServiceError::not_found(format!("{kind} {id}")))?;
        let directory = self.directory().await?;
        let totals = self.ledger.product_totals().await?;
        Ok(operation_view(entry, &directory, &totals))
    }

    /// Live entries of `kind` grouped into documents by reference.
    pub async fn list_documents(&self, kind: MoveType) -> ServiceResult<Vec<OperationView>> {
        let entries = self.entries_of(kind).await?;
        let directory = self.directory().await?;
        let totals = self.ledger.product_totals().await?;
        Ok(documents(live_entries(&entries, kind), &directory, &totals))
    }

    pub async fn list_adjustments(&self) -> ServiceResult<Vec<AdjustmentView>> {
        let entries = self.entries_of(MoveType::Adjust).await?;
        let directory = self.directory().await?;
        Ok(entries
            .iter()
            .map(|e| adjustment_view(e, &directory))
            .collect())
    }

    pub async fn dashboard(&self) -> ServiceResult<Dashboard> {
        let products = self.catalog.list_products().await?;
        let totals = self.ledger.product_totals().await?;
        let total_stock = self.ledger.total_stock().await?;
        Ok(dashboard(&products, &totals, total_stock))
    }

    pub async fn ledger(
        &self,
        filter: LedgerFilter,
        pagination: Pagination,
    ) -> ServiceResult<LedgerPage> {
        filter.validate()?;
        Ok(self.ledger.query_page(&filter, pagination).await?)
    }

    pub async fn product_stock(
        &self,
        product_id: ProductId,
        location_id: Option<LocationId>,
    ) -> ServiceResult<ProductStock> {
        let product = self
            .catalog
            .get_product(product_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("product {product_id}")))?;
        if let Some(loc) = location_id {
            if self.catalog.get_location(loc).await?.is_none() {
                return Err(ServiceError::not_found(format!("location {loc}")));
            }
        }
        let balance = self.ledger.balance(product_id, location_id).await?;
        Ok(ProductStock {
            product_id,
            location_id,
            balance,
            min_stock_level: product.min_stock_level,
            low_stock: is_low_stock(balance, product.min_stock_level),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use depot_auth::{NewUser, Role};
    use depot_core::UserId;
    use depot_inventory::{
        AdjustmentKind, Correction, MovementRequest, NewLocation, NewProduct, NewWarehouse,
    };

    use super::*;
    use crate::catalog_store::InMemoryCatalogStore;
    use crate::ledger_store::InMemoryLedgerStore;
    use crate::services::{MovementRecorder, ReferenceGate};
    use crate::user_store::InMemoryUserStore;

    struct Fixture {
        recorder: MovementRecorder,
        reporting: Reporting,
        user: UserId,
        product: ProductId,
        shelf: LocationId,
    }

    async fn fixture() -> Fixture {
        let ledger: Arc<dyn LedgerStore> = Arc::new(InMemoryLedgerStore::new());
        let catalog: Arc<dyn CatalogStore> = Arc::new(InMemoryCatalogStore::new());
        let users: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());

        let user = users
            .create(
                NewUser {
                    name: "Dana".to_string(),
                    email: "dana@example.com".to_string(),
                    password_hash: "x".to_string(),
                    role: Role::STOCK_MANAGER,
                },
                Utc::now(),
            )
            .await
            .unwrap();
        let product = catalog
            .create_product(
                NewProduct {
                    name: "Bolt".to_string(),
                    sku: "B-1".to_string(),
                    description: None,
                    category: String::new(),
                    uom: "pcs".to_string(),
                    barcode: None,
                    min_stock_level: Decimal::from(10),
                },
                Utc::now(),
            )
            .await
            .unwrap();
        let wh = catalog
            .create_warehouse(NewWarehouse {
                name: "Main".to_string(),
            })
            .await
            .unwrap();
        let shelf = catalog
            .create_location(NewLocation {
                warehouse_id: wh.id,
                name: "Shelf A".to_string(),
            })
            .await
            .unwrap();

        Fixture {
            recorder: MovementRecorder::new(ledger.clone(), catalog.clone(), ReferenceGate::new()),
            reporting: Reporting::new(ledger, catalog, users),
            user: user.id,
            product: product.id,
            shelf: shelf.id,
        }
    }

    fn receipt(f: &Fixture, qty: i64, reference: &str) -> MovementRequest {
        MovementRequest {
            reference: Some(reference.to_string()),
            product_id: f.product,
            qty: Decimal::from(qty),
            location_src_id: None,
            location_dest_id: Some(f.shelf),
        }
    }

    #[tokio::test]
    async fn voided_receipts_disappear_from_listings() {
        let f = fixture().await;
        let kept = f.recorder.record_receipt(f.user, receipt(&f, 5, "IN/1")).await.unwrap();
        let voided = f.recorder.record_receipt(f.user, receipt(&f, 7, "IN/2")).await.unwrap();
        f.recorder
            .void(MoveType::Receipt, f.user, voided.id)
            .await
            .unwrap();

        let ops = f.reporting.list_operations(MoveType::Receipt).await.unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].id, kept.id);
        assert_eq!(ops[0].contact, "Dana");
        assert_eq!(ops[0].lines[0].available_stock, Decimal::from(5));

        let err = f
            .reporting
            .get_operation(MoveType::Receipt, voided.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn corrected_receipt_lists_the_replacement() {
        let f = fixture().await;
        let original = f.recorder.record_receipt(f.user, receipt(&f, 5, "IN/1")).await.unwrap();
        let written = f
            .recorder
            .correct(
                MoveType::Receipt,
                f.user,
                original.id,
                Correction {
                    qty: Some(Decimal::from(8)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let docs = f.reporting.list_documents(MoveType::Receipt).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, written[1].id);
        assert_eq!(docs[0].lines[0].qty, Decimal::from(8));
    }

    #[tokio::test]
    async fn dashboard_and_stock_agree_on_low_stock() {
        let f = fixture().await;
        f.recorder.record_receipt(f.user, receipt(&f, 8, "IN/1")).await.unwrap();

        let d = f.reporting.dashboard().await.unwrap();
        assert_eq!(d.total_products, 1);
        assert_eq!(d.low_stock_items, 1);
        assert_eq!(d.total_stock, Decimal::from(8));

        let stock = f.reporting.product_stock(f.product, Some(f.shelf)).await.unwrap();
        assert_eq!(stock.balance, Decimal::from(8));
        assert!(stock.low_stock);
    }

    #[tokio::test]
    async fn adjustments_are_listed_with_names() {
        let f = fixture().await;
        f.recorder
            .record_manual_adjustment(
                f.user,
                crate::services::ManualAdjustment {
                    product_id: f.product,
                    location_id: f.shelf,
                    adjustment_type: AdjustmentKind::Add,
                    quantity: Decimal::from(4),
                    reason: None,
                    note: None,
                },
            )
            .await
            .unwrap();
        let views = f.reporting.list_adjustments().await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].kind, AdjustmentKind::Add);
        assert_eq!(views[0].product_name, "Bolt");
        assert_eq!(views[0].created_by, "Dana");
    }

    #[tokio::test]
    async fn ledger_rejects_inverted_dates() {
        let f = fixture().await;
        let now = Utc::now();
        let filter = LedgerFilter {
            from: Some(now),
            to: Some(now - chrono::Duration::hours(1)),
            ..Default::default()
        };
        let err = f
            .reporting
            .ledger(filter, Pagination::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
