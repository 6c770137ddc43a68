//! Inventory domain module (stock ledger).
//!
//! This crate contains business rules for stock keeping, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage). Stock is never
//! stored: it is always derived by summing the append-only ledger.

pub mod balance;
pub mod catalog;
pub mod ledger;
pub mod movement;
pub mod projection;

pub use balance::{
    adjustment_delta, balance, global_balance, is_low_stock, location_balance, product_totals,
    total_stock,
};
pub use catalog::{
    Location, LocationPatch, NewLocation, NewProduct, NewWarehouse, Product, ProductPatch,
    Warehouse,
};
pub use ledger::{LedgerEntry, LedgerFilter, MoveType, NewLedgerEntry, sort_newest_first};
pub use movement::{AdjustmentKind, Correction, EntryStamp, MovementPlan, MovementRequest};
pub use projection::{AdjustmentView, Dashboard, Directory, OperationLine, OperationView};

pub use rust_decimal::Decimal;
