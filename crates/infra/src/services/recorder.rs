//! Movement Recorder: validates a movement against the catalog and appends
//! its ledger entries.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};

use depot_core::{EntryId, LocationId, ProductId, UserId};
use depot_inventory::movement::{
    adjustment_location, plan_correction, plan_delivery, plan_manual_adjustment, plan_receipt,
    plan_transfer, plan_void,
};
use depot_inventory::{
    AdjustmentKind, Correction, EntryStamp, LedgerEntry, MoveType, MovementPlan, MovementRequest,
};

use super::{ReferenceGate, ServiceError, ServiceResult};
use crate::catalog_store::CatalogStore;
use crate::ledger_store::{AdjustmentDraft, LedgerStore, Reconciliation};

/// Delta-based adjustment as submitted on the adjustments screen.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManualAdjustment {
    pub product_id: ProductId,
    pub location_id: LocationId,
    pub adjustment_type: AdjustmentKind,
    pub quantity: Decimal,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Clone)]
pub struct MovementRecorder {
    ledger: Arc<dyn LedgerStore>,
    catalog: Arc<dyn CatalogStore>,
    gate: ReferenceGate,
}

impl MovementRecorder {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        catalog: Arc<dyn CatalogStore>,
        gate: ReferenceGate,
    ) -> Self {
        Self {
            ledger,
            catalog,
            gate,
        }
    }

    async fn ensure_product(&self, id: ProductId) -> ServiceResult<()> {
        match self.catalog.get_product(id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::not_found(format!("product {id}"))),
        }
    }

    async fn ensure_locations(&self, ids: impl IntoIterator<Item = LocationId>) -> ServiceResult<()> {
        for id in ids {
            if self.catalog.get_location(id).await?.is_none() {
                return Err(ServiceError::not_found(format!("location {id}")));
            }
        }
        Ok(())
    }

    async fn append(&self, kind: MoveType, plan: MovementPlan) -> ServiceResult<Vec<LedgerEntry>> {
        let movement_id = plan.movement_id;
        let entries = self.ledger.append_batch(plan.entries).await?;
        let ids: Vec<i64> = entries.iter().map(|e| e.id.get()).collect();
        if let Some(first) = entries.first() {
            info!(
                %movement_id,
                kind = %kind,
                product_id = %first.product_id,
                delta = %entries.iter().map(|e| e.qty_change).sum::<Decimal>(),
                entry_ids = ?ids,
                "movement recorded"
            );
        }
        Ok(entries)
    }

    async fn record(
        &self,
        kind: MoveType,
        user: UserId,
        req: MovementRequest,
    ) -> ServiceResult<Vec<LedgerEntry>> {
        let result = async {
            let stamp = EntryStamp::new(Some(user), Utc::now());
            let plan = match kind {
                MoveType::Receipt => plan_receipt(&req, &stamp)?,
                MoveType::Delivery => plan_delivery(&req, &stamp)?,
                MoveType::Transfer => plan_transfer(&req, &stamp)?,
                MoveType::Adjust => {
                    return Err(ServiceError::validation("adjustments go through reconcile"));
                }
            };
            let _guard = self.gate.movement().await;
            self.ensure_product(req.product_id).await?;
            self.ensure_locations(plan.locations()).await?;
            self.append(kind, plan).await
        }
        .await;

        if let Err(err) = &result {
            warn!(kind = %kind, product_id = %req.product_id, error = %err, "movement rejected");
        }
        result
    }

    pub async fn record_receipt(
        &self,
        user: UserId,
        req: MovementRequest,
    ) -> ServiceResult<LedgerEntry> {
        let mut entries = self.record(MoveType::Receipt, user, req).await?;
        entries
            .pop()
            .ok_or_else(|| ServiceError::Internal("receipt appended no entry".to_string()))
    }

    pub async fn record_delivery(
        &self,
        user: UserId,
        req: MovementRequest,
    ) -> ServiceResult<LedgerEntry> {
        let mut entries = self.record(MoveType::Delivery, user, req).await?;
        entries
            .pop()
            .ok_or_else(|| ServiceError::Internal("delivery appended no entry".to_string()))
    }

    /// Returns the outflow and inflow legs, in that order.
    pub async fn record_transfer(
        &self,
        user: UserId,
        req: MovementRequest,
    ) -> ServiceResult<Vec<LedgerEntry>> {
        self.record(MoveType::Transfer, user, req).await
    }

    /// Count-based adjustment: `req.qty` is the physically counted quantity.
    pub async fn record_adjustment(
        &self,
        user: UserId,
        req: MovementRequest,
    ) -> ServiceResult<Reconciliation> {
        let result = async {
            let location = adjustment_location(&req)?;
            let stamp = EntryStamp::new(Some(user), Utc::now());
            let draft = AdjustmentDraft::new(
                req.product_id,
                location,
                req.qty,
                req.reference.clone(),
                stamp,
            )?;
            let _guard = self.gate.movement().await;
            self.ensure_product(req.product_id).await?;
            self.ensure_locations([location]).await?;
            Ok::<_, ServiceError>(self.ledger.reconcile(draft).await?)
        }
        .await;

        match &result {
            Ok(r) => info!(
                product_id = %req.product_id,
                entry_id = %r.entry.id,
                previous_balance = %r.previous_balance,
                difference = %r.difference,
                "stock reconciled"
            ),
            Err(err) => warn!(product_id = %req.product_id, error = %err, "adjustment rejected"),
        }
        result
    }

    pub async fn record_manual_adjustment(
        &self,
        user: UserId,
        adj: ManualAdjustment,
    ) -> ServiceResult<LedgerEntry> {
        let result = async {
            let stamp = EntryStamp::new(Some(user), Utc::now());
            let plan = plan_manual_adjustment(
                adj.product_id,
                adj.location_id,
                adj.adjustment_type,
                adj.quantity,
                &stamp,
            )?;
            let _guard = self.gate.movement().await;
            self.ensure_product(adj.product_id).await?;
            self.ensure_locations([adj.location_id]).await?;
            self.append(MoveType::Adjust, plan).await
        }
        .await;

        match result {
            Ok(mut entries) => {
                info!(
                    reason = adj.reason.as_deref().unwrap_or("Adjustment"),
                    note = adj.note.as_deref().unwrap_or(""),
                    "manual adjustment applied"
                );
                entries
                    .pop()
                    .ok_or_else(|| ServiceError::Internal("adjustment appended no entry".to_string()))
            }
            Err(err) => {
                warn!(product_id = %adj.product_id, error = %err, "adjustment rejected");
                Err(err)
            }
        }
    }

    async fn target(&self, kind: MoveType, id: EntryId) -> ServiceResult<LedgerEntry> {
        self.ledger
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("{kind} {id}")))
    }

    /// Reverse a receipt or delivery and append its replacement.
    /// Returns the reversal followed by the replacement.
    pub async fn correct(
        &self,
        kind: MoveType,
        user: UserId,
        id: EntryId,
        patch: Correction,
    ) -> ServiceResult<Vec<LedgerEntry>> {
        let result = async {
            let target = self.target(kind, id).await?;
            let stamp = EntryStamp::new(Some(user), Utc::now());
            let plan = plan_correction(&target, kind, &patch, &stamp)?;
            let _guard = self.gate.movement().await;
            self.ensure_locations(plan.locations()).await?;
            self.append(kind, plan).await
        }
        .await;

        if let Err(err) = &result {
            warn!(kind = %kind, entry_id = %id, error = %err, "correction rejected");
        }
        result
    }

    /// Cancel a receipt or delivery with a single reversal entry.
    pub async fn void(&self, kind: MoveType, user: UserId, id: EntryId) -> ServiceResult<LedgerEntry> {
        let result = async {
            let target = self.target(kind, id).await?;
            let stamp = EntryStamp::new(Some(user), Utc::now());
            let plan = plan_void(&target, kind, &stamp)?;
            self.append(kind, plan).await
        }
        .await;

        match result {
            Ok(mut entries) => entries
                .pop()
                .ok_or_else(|| ServiceError::Internal("void appended no entry".to_string())),
            Err(err) => {
                warn!(kind = %kind, entry_id = %id, error = %err, "void rejected");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use depot_inventory::{LedgerFilter, NewLocation, NewProduct, NewWarehouse};

    use super::*;
    use crate::catalog_store::InMemoryCatalogStore;
    use crate::ledger_store::InMemoryLedgerStore;

    struct Fixture {
        recorder: MovementRecorder,
        ledger: Arc<InMemoryLedgerStore>,
        product: ProductId,
        shelf_a: LocationId,
        shelf_b: LocationId,
    }

    async fn fixture() -> Fixture {
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let catalog = Arc::new(InMemoryCatalogStore::new());
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
        let mut shelves = Vec::new();
        for name in ["A", "B"] {
            let loc = catalog
                .create_location(NewLocation {
                    warehouse_id: wh.id,
                    name: format!("Shelf {name}"),
                })
                .await
                .unwrap();
            shelves.push(loc.id);
        }
        Fixture {
            recorder: MovementRecorder::new(ledger.clone(), catalog, ReferenceGate::new()),
            ledger,
            product: product.id,
            shelf_a: shelves[0],
            shelf_b: shelves[1],
        }
    }

    fn request(
        product: ProductId,
        qty: i64,
        src: Option<LocationId>,
        dest: Option<LocationId>,
    ) -> MovementRequest {
        MovementRequest {
            reference: Some("WH/1".to_string()),
            product_id: product,
            qty: Decimal::from(qty),
            location_src_id: src,
            location_dest_id: dest,
        }
    }

    const USER: UserId = UserId::new(1);

    #[tokio::test]
    async fn receipt_transfer_delivery_scenario() {
        let f = fixture().await;
        f.recorder
            .record_receipt(USER, request(f.product, 30, None, Some(f.shelf_a)))
            .await
            .unwrap();
        let legs = f
            .recorder
            .record_transfer(USER, request(f.product, 10, Some(f.shelf_a), Some(f.shelf_b)))
            .await
            .unwrap();
        assert_eq!(legs.len(), 2);
        f.recorder
            .record_delivery(USER, request(f.product, 4, Some(f.shelf_b), None))
            .await
            .unwrap();

        let a = f.ledger.balance(f.product, Some(f.shelf_a)).await.unwrap();
        let b = f.ledger.balance(f.product, Some(f.shelf_b)).await.unwrap();
        assert_eq!(a, Decimal::from(20));
        assert_eq!(b, Decimal::from(6));
        assert_eq!(f.ledger.balance(f.product, None).await.unwrap(), Decimal::from(26));
    }

    #[tokio::test]
    async fn unknown_product_or_location_is_not_found() {
        let f = fixture().await;
        let err = f
            .recorder
            .record_receipt(USER, request(ProductId::new(999), 5, None, Some(f.shelf_a)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err = f
            .recorder
            .record_receipt(USER, request(f.product, 5, None, Some(LocationId::new(999))))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(f.ledger.query(&LedgerFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn receipt_without_destination_appends_nothing() {
        let f = fixture().await;
        let err = f
            .recorder
            .record_receipt(USER, request(f.product, 5, None, None))
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::Validation("Destination location required".to_string()));
        assert!(f.ledger.query(&LedgerFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn count_adjustment_reports_the_difference() {
        let f = fixture().await;
        f.recorder
            .record_receipt(USER, request(f.product, 30, None, Some(f.shelf_a)))
            .await
            .unwrap();
        let result = f
            .recorder
            .record_adjustment(USER, request(f.product, 25, None, Some(f.shelf_a)))
            .await
            .unwrap();
        assert_eq!(result.previous_balance, Decimal::from(30));
        assert_eq!(result.difference, Decimal::from(-5));
        assert_eq!(result.entry.user_id, Some(USER));

        let err = f
            .recorder
            .record_adjustment(USER, request(f.product, -1, None, Some(f.shelf_a)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn manual_adjustment_removes_stock() {
        let f = fixture().await;
        let entry = f
            .recorder
            .record_manual_adjustment(
                USER,
                ManualAdjustment {
                    product_id: f.product,
                    location_id: f.shelf_a,
                    adjustment_type: AdjustmentKind::Remove,
                    quantity: Decimal::from(3),
                    reason: Some("Damaged".to_string()),
                    note: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(entry.qty_change, Decimal::from(-3));
        assert_eq!(entry.move_type, MoveType::Adjust);
    }

    #[tokio::test]
    async fn correction_then_second_void_conflicts() {
        let f = fixture().await;
        let receipt = f
            .recorder
            .record_receipt(USER, request(f.product, 50, None, Some(f.shelf_a)))
            .await
            .unwrap();

        let patch = Correction {
            qty: Some(Decimal::from(40)),
            ..Default::default()
        };
        let written = f
            .recorder
            .correct(MoveType::Receipt, USER, receipt.id, patch)
            .await
            .unwrap();
        assert_eq!(written[0].reverses, Some(receipt.id));
        assert_eq!(f.ledger.balance(f.product, None).await.unwrap(), Decimal::from(40));

        let err = f
            .recorder
            .void(MoveType::Receipt, USER, receipt.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn voiding_a_delivery_as_receipt_is_not_found() {
        let f = fixture().await;
        f.recorder
            .record_receipt(USER, request(f.product, 5, None, Some(f.shelf_a)))
            .await
            .unwrap();
        let delivery = f
            .recorder
            .record_delivery(USER, request(f.product, 2, Some(f.shelf_a), None))
            .await
            .unwrap();
        let err = f
            .recorder
            .void(MoveType::Receipt, USER, delivery.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        f.recorder
            .void(MoveType::Delivery, USER, delivery.id)
            .await
            .unwrap();
        assert_eq!(f.ledger.balance(f.product, None).await.unwrap(), Decimal::from(5));
    }
}
