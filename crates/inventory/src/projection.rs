//! Read-side views over the ledger (operation lists, adjustments, dashboard).

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use depot_core::{EntryId, LocationId, ProductId, UserId, WarehouseId, index_by_id};

use crate::balance::is_low_stock;
use crate::catalog::{Location, Product, Warehouse};
use crate::ledger::{LedgerEntry, MoveType};

pub use crate::movement::AdjustmentKind;

const STATUS_DONE: &str = "Done";
const STATUS_APPLIED: &str = "Applied";

/// Lookup tables used to resolve ids into display names.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    pub products: HashMap<ProductId, Product>,
    pub warehouses: HashMap<WarehouseId, Warehouse>,
    pub locations: HashMap<LocationId, Location>,
    pub users: HashMap<UserId, String>,
}

impl Directory {
    pub fn new(
        products: Vec<Product>,
        warehouses: Vec<Warehouse>,
        locations: Vec<Location>,
        users: impl IntoIterator<Item = (UserId, String)>,
    ) -> Self {
        Self {
            products: index_by_id(products),
            warehouses: index_by_id(warehouses),
            locations: index_by_id(locations),
            users: users.into_iter().collect(),
        }
    }

    fn location_name(&self, id: Option<LocationId>) -> Option<&str> {
        id.and_then(|id| self.locations.get(&id)).map(|l| l.name.as_str())
    }

    fn user_name(&self, id: Option<UserId>) -> Option<&str> {
        id.and_then(|id| self.users.get(&id)).map(String::as_str)
    }
}

/// One product line of an operation document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationLine {
    pub id: EntryId,
    pub product_id: ProductId,
    /// Absolute quantity moved.
    pub qty: Decimal,
    /// Current global balance of the product.
    pub available_stock: Decimal,
}

/// A receipt or delivery as shown to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationView {
    pub id: EntryId,
    pub reference: String,
    pub from: String,
    pub to: String,
    pub contact: String,
    pub schedule_date: DateTime<Utc>,
    pub status: String,
    pub lines: Vec<OperationLine>,
}

/// Entries of `kind` that are still in effect: neither a reversal nor reversed.
pub fn live_entries(entries: &[LedgerEntry], kind: MoveType) -> Vec<&LedgerEntry> {
    let reversed: HashSet<EntryId> = entries.iter().filter_map(|e| e.reverses).collect();
    entries
        .iter()
        .filter(|e| e.move_type == kind)
        .filter(|e| !e.is_reversal() && !reversed.contains(&e.id))
        .collect()
}

fn line(entry: &LedgerEntry, totals: &HashMap<ProductId, Decimal>) -> OperationLine {
    OperationLine {
        id: entry.id,
        product_id: entry.product_id,
        qty: entry.qty_change.abs(),
        available_stock: totals.get(&entry.product_id).copied().unwrap_or_default(),
    }
}

/// Project a single entry into an operation view with one line.
///
/// An absent source reads as "Vendor" on receipts and an absent destination
/// as "Customer" on deliveries.
pub fn operation_view(
    entry: &LedgerEntry,
    directory: &Directory,
    totals: &HashMap<ProductId, Decimal>,
) -> OperationView {
    let from = directory
        .location_name(entry.location_src_id)
        .map(str::to_string)
        .unwrap_or_else(|| match entry.move_type {
            MoveType::Receipt => "Vendor".to_string(),
            _ => String::new(),
        });
    let to = directory
        .location_name(entry.location_dest_id)
        .map(str::to_string)
        .unwrap_or_else(|| match entry.move_type {
            MoveType::Delivery => "Customer".to_string(),
            _ => String::new(),
        });

    OperationView {
        id: entry.id,
        reference: entry.reference.clone().unwrap_or_default(),
        from,
        to,
        contact: directory.user_name(entry.user_id).unwrap_or_default().to_string(),
        schedule_date: entry.created_at,
        status: STATUS_DONE.to_string(),
        lines: vec![line(entry, totals)],
    }
}

/// Group entries into documents by reference.
///
/// The first entry seen for a reference provides the header; every entry of
/// the group contributes a line. Entries without a reference stay separate.
pub fn documents<'a>(
    entries: impl IntoIterator<Item = &'a LedgerEntry>,
    directory: &Directory,
    totals: &HashMap<ProductId, Decimal>,
) -> Vec<OperationView> {
    let mut out: Vec<OperationView> = Vec::new();
    let mut by_reference: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        match entry.reference.as_deref() {
            Some(reference) => match by_reference.get(reference) {
                Some(&idx) => out[idx].lines.push(line(entry, totals)),
                None => {
                    by_reference.insert(reference.to_string(), out.len());
                    out.push(operation_view(entry, directory, totals));
                }
            },
            None => out.push(operation_view(entry, directory, totals)),
        }
    }
    out
}

/// Adjustment entry as listed on the adjustments screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdjustmentView {
    pub id: EntryId,
    pub reference: Option<String>,
    pub date: DateTime<Utc>,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_code: String,
    pub quantity: Decimal,
    #[serde(rename = "type")]
    pub kind: AdjustmentKind,
    pub status: String,
    pub warehouse_id: Option<WarehouseId>,
    pub location_id: Option<LocationId>,
    pub reason: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

pub fn adjustment_view(entry: &LedgerEntry, directory: &Directory) -> AdjustmentView {
    let product = directory.products.get(&entry.product_id);
    let location_id = entry.adjusted_location();
    let warehouse_id = location_id
        .and_then(|id| directory.locations.get(&id))
        .map(|l| l.warehouse_id);

    AdjustmentView {
        id: entry.id,
        reference: entry.reference.clone(),
        date: entry.created_at,
        product_id: entry.product_id,
        product_name: product.map_or_else(|| "Unknown".to_string(), |p| p.name.clone()),
        product_code: product.map(|p| p.sku.clone()).unwrap_or_default(),
        quantity: entry.qty_change.abs(),
        kind: AdjustmentKind::of(entry.qty_change),
        status: STATUS_APPLIED.to_string(),
        warehouse_id,
        location_id,
        reason: "Adjustment".to_string(),
        created_by: directory.user_name(entry.user_id).unwrap_or("User").to_string(),
        created_at: entry.created_at,
    }
}

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub total_products: usize,
    pub low_stock_items: usize,
    pub total_stock: Decimal,
}

/// Products without any ledger entry have a balance of zero.
pub fn dashboard(
    products: &[Product],
    totals: &HashMap<ProductId, Decimal>,
    total_stock: Decimal,
) -> Dashboard {
    let low_stock_items = products
        .iter()
        .filter(|p| {
            let balance = totals.get(&p.id).copied().unwrap_or_default();
            is_low_stock(balance, p.min_stock_level)
        })
        .count();

    Dashboard {
        total_products: products.len(),
        low_stock_items,
        total_stock,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::product_totals;
    use crate::ledger::fixtures::entry;

    fn product(id: i64, min: i64) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            sku: format!("SKU-{id}"),
            description: None,
            category: String::new(),
            uom: "pcs".to_string(),
            barcode: None,
            min_stock_level: Decimal::from(min),
            created_at: now,
            updated_at: now,
        }
    }

    fn directory() -> Directory {
        Directory::new(
            vec![product(1, 10)],
            vec![Warehouse {
                id: WarehouseId::new(1),
                name: "Main".to_string(),
            }],
            vec![Location {
                id: LocationId::new(1),
                warehouse_id: WarehouseId::new(1),
                name: "Shelf A".to_string(),
            }],
            [(UserId::new(1), "Dana".to_string())],
        )
    }

    #[test]
    fn receipt_without_source_reads_as_vendor() {
        let mut e = entry(1, 1, 50, MoveType::Receipt, None, Some(1));
        e.user_id = Some(UserId::new(1));
        let totals = product_totals([&e]);
        let view = operation_view(&e, &directory(), &totals);
        assert_eq!(view.from, "Vendor");
        assert_eq!(view.to, "Shelf A");
        assert_eq!(view.contact, "Dana");
        assert_eq!(view.status, "Done");
        assert_eq!(view.lines[0].available_stock, Decimal::from(50));
    }

    #[test]
    fn delivery_without_destination_reads_as_customer() {
        let e = entry(2, 1, -5, MoveType::Delivery, Some(1), None);
        let view = operation_view(&e, &directory(), &HashMap::new());
        assert_eq!(view.from, "Shelf A");
        assert_eq!(view.to, "Customer");
        assert_eq!(view.lines[0].qty, Decimal::from(5));
    }

    #[test]
    fn view_serializes_camel_case() {
        let e = entry(2, 1, -5, MoveType::Delivery, Some(1), None);
        let json = serde_json::to_value(operation_view(&e, &directory(), &HashMap::new())).unwrap();
        assert!(json.get("scheduleDate").is_some());
        assert!(json["lines"][0].get("availableStock").is_some());
    }

    #[test]
    fn documents_group_by_reference_first_seen_wins() {
        let mut a = entry(1, 1, 5, MoveType::Receipt, None, Some(1));
        a.reference = Some("WH/IN/1".to_string());
        let mut b = entry(2, 2, 7, MoveType::Receipt, None, Some(1));
        b.reference = Some("WH/IN/1".to_string());
        let c = entry(3, 1, 1, MoveType::Receipt, None, Some(1));
        let d = entry(4, 1, 1, MoveType::Receipt, None, Some(1));

        let docs = documents([&a, &b, &c, &d], &directory(), &HashMap::new());
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].id, EntryId::new(1));
        assert_eq!(docs[0].lines.len(), 2);
        assert_eq!(docs[0].lines[1].product_id, ProductId::new(2));
    }

    #[test]
    fn live_entries_hide_reversal_pairs() {
        let original = entry(1, 1, 5, MoveType::Receipt, None, Some(1));
        let mut reversal = entry(2, 1, -5, MoveType::Receipt, None, Some(1));
        reversal.reverses = Some(EntryId::new(1));
        let replacement = entry(3, 1, 4, MoveType::Receipt, None, Some(1));
        let other = entry(4, 1, -1, MoveType::Delivery, Some(1), None);

        let all = vec![original, reversal, replacement, other];
        let live = live_entries(&all, MoveType::Receipt);
        let ids: Vec<i64> = live.iter().map(|e| e.id.get()).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn adjustment_view_resolves_warehouse_through_location() {
        let e = entry(9, 1, -3, MoveType::Adjust, None, Some(1));
        let view = adjustment_view(&e, &directory());
        assert_eq!(view.kind, AdjustmentKind::Remove);
        assert_eq!(view.quantity, Decimal::from(3));
        assert_eq!(view.warehouse_id, Some(WarehouseId::new(1)));
        assert_eq!(view.product_code, "SKU-1");
        assert_eq!(view.created_by, "User");
    }

    #[test]
    fn dashboard_counts_low_stock_at_threshold() {
        // Product 1: 50 in, 45 out -> 5 <= 10 (low).
        // Product 2: 100 in, min 10 (fine). Product 3: no entries, min 0 (low).
        let entries = vec![
            entry(1, 1, 50, MoveType::Receipt, None, Some(1)),
            entry(2, 1, -45, MoveType::Delivery, Some(1), None),
            entry(3, 2, 100, MoveType::Receipt, None, Some(1)),
        ];
        let totals = product_totals(&entries);
        let d = dashboard(
            &[product(1, 10), product(2, 10), product(3, 0)],
            &totals,
            Decimal::from(105),
        );
        assert_eq!(d.total_products, 3);
        assert_eq!(d.low_stock_items, 2);
        assert_eq!(d.total_stock, Decimal::from(105));
    }
}
