//! Movement rules: turn a movement request into the ledger entries to append.
//!
//! Everything here is pure. The caller resolves the acting user, the clock
//! and (for count-based adjustments) the current balance, then appends the
//! planned entries atomically.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use depot_core::{DomainError, DomainResult, LocationId, ProductId, UserId};

use crate::ledger::{LedgerEntry, MoveType, NewLedgerEntry};

/// Request body shared by receipts, deliveries, transfers and count adjustments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementRequest {
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(alias = "product_id")]
    pub product_id: ProductId,
    pub qty: Decimal,
    #[serde(default, alias = "location_src_id")]
    pub location_src_id: Option<LocationId>,
    #[serde(default, alias = "location_dest_id")]
    pub location_dest_id: Option<LocationId>,
}

/// Patch applied when correcting a receipt or delivery.
/// Absent fields fall back to the corrected entry's values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Correction {
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub qty: Option<Decimal>,
    #[serde(default, alias = "location_src_id")]
    pub location_src_id: Option<LocationId>,
    #[serde(default, alias = "location_dest_id")]
    pub location_dest_id: Option<LocationId>,
}

/// Direction of a delta-based stock adjustment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AdjustmentKind {
    Add,
    Remove,
}

impl AdjustmentKind {
    pub fn of(delta: Decimal) -> Self {
        if delta < Decimal::ZERO {
            AdjustmentKind::Remove
        } else {
            AdjustmentKind::Add
        }
    }

    pub fn signed(self, quantity: Decimal) -> Decimal {
        match self {
            AdjustmentKind::Add => quantity.abs(),
            AdjustmentKind::Remove => -quantity.abs(),
        }
    }
}

/// Who, when and under which movement id new entries are written.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EntryStamp {
    pub user_id: Option<UserId>,
    pub movement_id: Uuid,
    pub at: DateTime<Utc>,
}

impl EntryStamp {
    pub fn new(user_id: Option<UserId>, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            movement_id: Uuid::now_v7(),
            at,
        }
    }
}

/// The entries one movement appends, all sharing a movement id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementPlan {
    pub movement_id: Uuid,
    pub entries: Vec<NewLedgerEntry>,
}

impl MovementPlan {
    fn new(stamp: &EntryStamp, entries: Vec<NewLedgerEntry>) -> Self {
        Self {
            movement_id: stamp.movement_id,
            entries,
        }
    }

    /// Every location referenced by the planned entries (deduplicated).
    pub fn locations(&self) -> Vec<LocationId> {
        let mut out: Vec<LocationId> = self
            .entries
            .iter()
            .flat_map(|e| [e.location_src_id, e.location_dest_id])
            .flatten()
            .collect();
        out.sort();
        out.dedup();
        out
    }
}

fn draft(
    stamp: &EntryStamp,
    product_id: ProductId,
    qty_change: Decimal,
    move_type: MoveType,
    reference: Option<String>,
    src: Option<LocationId>,
    dest: Option<LocationId>,
) -> NewLedgerEntry {
    NewLedgerEntry {
        product_id,
        qty_change,
        move_type,
        reference,
        location_src_id: src,
        location_dest_id: dest,
        user_id: stamp.user_id,
        movement_id: stamp.movement_id,
        reverses: None,
        created_at: stamp.at,
    }
}

/// Trim a caller-supplied reference; blank means none.
pub fn normalize_reference(reference: Option<&str>) -> Option<String> {
    reference
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
}

fn nonzero_quantity(qty: Decimal) -> DomainResult<Decimal> {
    if qty.is_zero() {
        return Err(DomainError::validation("qty must not be zero"));
    }
    Ok(qty.abs())
}

/// Receipt: stock arrives at the destination from outside.
pub fn plan_receipt(req: &MovementRequest, stamp: &EntryStamp) -> DomainResult<MovementPlan> {
    let dest = req
        .location_dest_id
        .ok_or_else(|| DomainError::validation("Destination location required"))?;
    let qty = nonzero_quantity(req.qty)?;
    let entry = draft(
        stamp,
        req.product_id,
        qty,
        MoveType::Receipt,
        normalize_reference(req.reference.as_deref()),
        None,
        Some(dest),
    );
    Ok(MovementPlan::new(stamp, vec![entry]))
}

/// Delivery: stock leaves the source towards a customer.
pub fn plan_delivery(req: &MovementRequest, stamp: &EntryStamp) -> DomainResult<MovementPlan> {
    let src = req
        .location_src_id
        .ok_or_else(|| DomainError::validation("Source location required"))?;
    let qty = nonzero_quantity(req.qty)?;
    let entry = draft(
        stamp,
        req.product_id,
        -qty,
        MoveType::Delivery,
        normalize_reference(req.reference.as_deref()),
        Some(src),
        None,
    );
    Ok(MovementPlan::new(stamp, vec![entry]))
}

/// Transfer: an outflow leg at the source and an inflow leg at the destination.
pub fn plan_transfer(req: &MovementRequest, stamp: &EntryStamp) -> DomainResult<MovementPlan> {
    let (Some(src), Some(dest)) = (req.location_src_id, req.location_dest_id) else {
        return Err(DomainError::validation("source & destination required"));
    };
    if src == dest {
        return Err(DomainError::validation("source and destination must differ"));
    }
    let qty = nonzero_quantity(req.qty)?;
    let reference = normalize_reference(req.reference.as_deref());
    let outflow = draft(
        stamp,
        req.product_id,
        -qty,
        MoveType::Transfer,
        reference.clone(),
        Some(src),
        None,
    );
    let inflow = draft(
        stamp,
        req.product_id,
        qty,
        MoveType::Transfer,
        reference,
        None,
        Some(dest),
    );
    Ok(MovementPlan::new(stamp, vec![outflow, inflow]))
}

/// Location a count-based adjustment applies to: destination, else source.
pub fn adjustment_location(req: &MovementRequest) -> DomainResult<LocationId> {
    req.location_dest_id
        .or(req.location_src_id)
        .ok_or_else(|| DomainError::validation("A location is required for adjustment"))
}

/// Adjustment entry carrying an already-computed delta at `location`.
///
/// A zero delta is still recorded: the count itself is an auditable event.
pub fn plan_adjustment(
    product_id: ProductId,
    location: LocationId,
    delta: Decimal,
    reference: Option<String>,
    stamp: &EntryStamp,
) -> NewLedgerEntry {
    draft(
        stamp,
        product_id,
        delta,
        MoveType::Adjust,
        normalize_reference(reference.as_deref()),
        None,
        Some(location),
    )
}

/// Reference generated for manual adjustments, e.g. `ADJ-20240131094500`.
pub fn adjustment_reference(at: DateTime<Utc>) -> String {
    format!("ADJ-{}", at.format("%Y%m%d%H%M%S"))
}

/// Delta-based adjustment (`ADD`/`REMOVE` a positive quantity).
pub fn plan_manual_adjustment(
    product_id: ProductId,
    location: LocationId,
    kind: AdjustmentKind,
    quantity: Decimal,
    stamp: &EntryStamp,
) -> DomainResult<MovementPlan> {
    if quantity <= Decimal::ZERO {
        return Err(DomainError::validation("quantity must be positive"));
    }
    let entry = plan_adjustment(
        product_id,
        location,
        kind.signed(quantity),
        Some(adjustment_reference(stamp.at)),
        stamp,
    );
    Ok(MovementPlan::new(stamp, vec![entry]))
}

fn ensure_correctable(target: &LedgerEntry, kind: MoveType) -> DomainResult<()> {
    if target.move_type != kind {
        return Err(DomainError::not_found(format!("{} {}", kind, target.id)));
    }
    if target.is_reversal() {
        return Err(DomainError::conflict(format!(
            "entry {} is a reversal and cannot be changed",
            target.id
        )));
    }
    Ok(())
}

/// Entry cancelling `target`: same kind and locations, negated quantity.
pub fn plan_reversal(target: &LedgerEntry, stamp: &EntryStamp) -> NewLedgerEntry {
    NewLedgerEntry {
        reverses: Some(target.id),
        ..draft(
            stamp,
            target.product_id,
            -target.qty_change,
            target.move_type,
            target.reference.clone(),
            target.location_src_id,
            target.location_dest_id,
        )
    }
}

/// Void a receipt or delivery: a single reversal entry.
pub fn plan_void(
    target: &LedgerEntry,
    kind: MoveType,
    stamp: &EntryStamp,
) -> DomainResult<MovementPlan> {
    ensure_correctable(target, kind)?;
    Ok(MovementPlan::new(stamp, vec![plan_reversal(target, stamp)]))
}

/// Correct a receipt or delivery: reversal of `target` plus its replacement.
pub fn plan_correction(
    target: &LedgerEntry,
    kind: MoveType,
    patch: &Correction,
    stamp: &EntryStamp,
) -> DomainResult<MovementPlan> {
    ensure_correctable(target, kind)?;

    let request = MovementRequest {
        reference: patch
            .reference
            .clone()
            .or_else(|| target.reference.clone()),
        product_id: target.product_id,
        qty: patch.qty.unwrap_or(target.qty_change),
        location_src_id: patch.location_src_id.or(target.location_src_id),
        location_dest_id: patch.location_dest_id.or(target.location_dest_id),
    };
    let replacement = match kind {
        MoveType::Receipt => plan_receipt(&request, stamp)?,
        MoveType::Delivery => plan_delivery(&request, stamp)?,
        other => {
            return Err(DomainError::validation(format!("{other} entries cannot be corrected")));
        }
    };

    let mut entries = vec![plan_reversal(target, stamp)];
    entries.extend(replacement.entries);
    Ok(MovementPlan::new(stamp, entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::{global_balance, location_balance};
    use crate::ledger::fixtures::entry;
    use depot_core::EntryId;
    use proptest::prelude::*;

    fn stamp() -> EntryStamp {
        EntryStamp::new(Some(UserId::new(1)), Utc::now())
    }

    fn request(qty: i64, src: Option<i64>, dest: Option<i64>) -> MovementRequest {
        MovementRequest {
            reference: Some(" WH/IN/0001 ".to_string()),
            product_id: ProductId::new(1),
            qty: Decimal::from(qty),
            location_src_id: src.map(LocationId::new),
            location_dest_id: dest.map(LocationId::new),
        }
    }

    /// Give planned entries ids so balance helpers can read them.
    fn persist(plans: &[MovementPlan]) -> Vec<LedgerEntry> {
        plans
            .iter()
            .flat_map(|p| p.entries.iter().cloned())
            .enumerate()
            .map(|(i, e)| e.into_entry(EntryId::new(i as i64 + 1)))
            .collect()
    }

    #[test]
    fn receipt_requires_destination() {
        let err = plan_receipt(&request(5, Some(1), None), &stamp()).unwrap_err();
        assert_eq!(err, DomainError::validation("Destination location required"));
    }

    #[test]
    fn delivery_requires_source() {
        assert!(plan_delivery(&request(5, None, Some(1)), &stamp()).is_err());
    }

    #[test]
    fn zero_quantity_is_rejected() {
        assert!(plan_receipt(&request(0, None, Some(1)), &stamp()).is_err());
    }

    #[test]
    fn reference_is_trimmed() {
        let plan = plan_receipt(&request(5, None, Some(1)), &stamp()).unwrap();
        assert_eq!(plan.entries[0].reference.as_deref(), Some("WH/IN/0001"));
    }

    #[test]
    fn transfer_writes_two_legs_with_one_movement_id() {
        let s = stamp();
        let plan = plan_transfer(&request(10, Some(1), Some(2)), &s).unwrap();
        assert_eq!(plan.entries.len(), 2);
        assert!(plan.entries.iter().all(|e| e.movement_id == s.movement_id));
        assert_eq!(plan.entries[0].qty_change, Decimal::from(-10));
        assert_eq!(plan.entries[0].location_dest_id, None);
        assert_eq!(plan.entries[1].qty_change, Decimal::from(10));
        assert_eq!(plan.entries[1].location_src_id, None);
        assert_eq!(plan.locations(), vec![LocationId::new(1), LocationId::new(2)]);
    }

    #[test]
    fn transfer_moves_stock_between_locations() {
        let s = stamp();
        let receipt = plan_receipt(&request(30, None, Some(1)), &s).unwrap();
        let transfer = plan_transfer(&request(10, Some(1), Some(2)), &s).unwrap();
        let entries = persist(&[receipt, transfer]);

        let p = ProductId::new(1);
        assert_eq!(global_balance(&entries, p), Decimal::from(30));
        assert_eq!(location_balance(&entries, p, LocationId::new(1)), Decimal::from(20));
        assert_eq!(location_balance(&entries, p, LocationId::new(2)), Decimal::from(10));
    }

    #[test]
    fn transfer_rejects_same_location() {
        assert!(plan_transfer(&request(1, Some(3), Some(3)), &stamp()).is_err());
    }

    #[test]
    fn adjustment_prefers_destination() {
        let req = request(1, Some(4), Some(5));
        assert_eq!(adjustment_location(&req).unwrap(), LocationId::new(5));
        assert!(adjustment_location(&request(1, None, None)).is_err());
    }

    #[test]
    fn manual_adjustment_signs_by_kind() {
        let s = stamp();
        let plan = plan_manual_adjustment(
            ProductId::new(1),
            LocationId::new(1),
            AdjustmentKind::Remove,
            Decimal::from(4),
            &s,
        )
        .unwrap();
        let e = &plan.entries[0];
        assert_eq!(e.qty_change, Decimal::from(-4));
        assert_eq!(e.move_type, MoveType::Adjust);
        assert!(e.reference.as_deref().is_some_and(|r| r.starts_with("ADJ-")));
    }

    #[test]
    fn correction_reverses_then_replaces() {
        let target = entry(7, 1, 50, MoveType::Receipt, None, Some(1));
        let patch = Correction {
            qty: Some(Decimal::from(40)),
            ..Default::default()
        };
        let plan = plan_correction(&target, MoveType::Receipt, &patch, &stamp()).unwrap();
        assert_eq!(plan.entries.len(), 2);

        let reversal = &plan.entries[0];
        assert_eq!(reversal.reverses, Some(EntryId::new(7)));
        assert_eq!(reversal.qty_change, Decimal::from(-50));
        assert_eq!(reversal.location_dest_id, Some(LocationId::new(1)));

        let replacement = &plan.entries[1];
        assert_eq!(replacement.reverses, None);
        assert_eq!(replacement.qty_change, Decimal::from(40));
        assert_eq!(replacement.location_dest_id, Some(LocationId::new(1)));
    }

    #[test]
    fn correction_of_wrong_kind_is_not_found() {
        let target = entry(7, 1, -5, MoveType::Delivery, Some(1), None);
        let err = plan_correction(&target, MoveType::Receipt, &Correction::default(), &stamp())
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn reversal_cannot_be_voided() {
        let mut target = entry(8, 1, -5, MoveType::Receipt, None, Some(1));
        target.reverses = Some(EntryId::new(2));
        let err = plan_void(&target, MoveType::Receipt, &stamp()).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn json_quantities_keep_every_digit() {
        let raw = r#"{"productId":1,"qty":12345678901234567.123,"locationDestId":1}"#;
        let req: MovementRequest = serde_json::from_str(raw).unwrap();
        let exact: Decimal = "12345678901234567.123".parse().unwrap();
        assert_eq!(req.qty, exact);

        let out = serde_json::to_value(&req).unwrap();
        assert_eq!(out["qty"].to_string(), "12345678901234567.123");

        let from_string: MovementRequest =
            serde_json::from_str(r#"{"productId":1,"qty":"0.1","locationDestId":1}"#).unwrap();
        assert_eq!(from_string.qty, "0.1".parse::<Decimal>().unwrap());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: receipts add and deliveries remove, whatever the input sign.
        #[test]
        fn receipt_and_delivery_signs_ignore_input_sign(
            qty in (-1_000_000i64..1_000_000i64).prop_filter("non-zero", |q| *q != 0)
        ) {
            let s = stamp();
            let receipt = plan_receipt(&request(qty, None, Some(1)), &s).unwrap();
            let delivery = plan_delivery(&request(qty, Some(1), None), &s).unwrap();
            prop_assert!(receipt.entries[0].qty_change > Decimal::ZERO);
            prop_assert!(delivery.entries[0].qty_change < Decimal::ZERO);
        }

        /// Property: a void brings the product back to where it was.
        #[test]
        fn void_restores_previous_balance(
            qtys in prop::collection::vec(1i64..1_000i64, 1..10),
            pick in 0usize..10,
        ) {
            let s = stamp();
            let plans: Vec<MovementPlan> = qtys
                .iter()
                .map(|q| plan_receipt(&request(*q, None, Some(1)), &s).unwrap())
                .collect();
            let mut entries = persist(&plans);
            let before = global_balance(&entries, ProductId::new(1));

            let target = entries[pick % entries.len()].clone();
            let void = plan_void(&target, MoveType::Receipt, &s).unwrap();
            let next_id = entries.len() as i64 + 1;
            entries.extend(
                void.entries
                    .into_iter()
                    .map(|e| e.into_entry(EntryId::new(next_id))),
            );

            let after = global_balance(&entries, ProductId::new(1));
            prop_assert_eq!(after, before - target.qty_change);
        }
    }
}
