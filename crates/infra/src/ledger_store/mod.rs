//! Ledger persistence: the append-only table every balance is derived from.

mod in_memory;
mod postgres;

pub use in_memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use depot_core::{DomainError, DomainResult, EntryId, LocationId, ProductId};
use depot_inventory::movement::plan_adjustment;
use depot_inventory::{
    EntryStamp, LedgerEntry, LedgerFilter, NewLedgerEntry, adjustment_delta,
};

use crate::error::{StoreError, StoreResult};

/// Pagination parameters for ledger reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of entries to return.
    pub limit: u32,
    /// Offset for pagination (0-based).
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

impl Pagination {
    pub const MAX_LIMIT: u32 = 1000;

    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(50).min(Self::MAX_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }
}

/// One page of ledger entries, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerPage {
    pub entries: Vec<LedgerEntry>,
    /// Number of entries matching the filter across all pages.
    pub total: u64,
    pub pagination: Pagination,
    pub has_more: bool,
}

impl LedgerPage {
    pub(crate) fn new(entries: Vec<LedgerEntry>, total: u64, pagination: Pagination) -> Self {
        let has_more = total > u64::from(pagination.offset) + entries.len() as u64;
        Self {
            entries,
            total,
            pagination,
            has_more,
        }
    }
}

/// A physical count to reconcile the ledger against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustmentDraft {
    pub product_id: ProductId,
    pub location_id: LocationId,
    counted: Decimal,
    pub reference: Option<String>,
    pub stamp: EntryStamp,
}

impl AdjustmentDraft {
    pub fn new(
        product_id: ProductId,
        location_id: LocationId,
        counted: Decimal,
        reference: Option<String>,
        stamp: EntryStamp,
    ) -> DomainResult<Self> {
        if counted < Decimal::ZERO {
            return Err(DomainError::validation("counted quantity cannot be negative"));
        }
        Ok(Self {
            product_id,
            location_id,
            counted,
            reference,
            stamp,
        })
    }

    pub fn counted(&self) -> Decimal {
        self.counted
    }

    /// The entry that brings `previous` to the counted quantity, and its delta.
    pub(crate) fn settle(&self, previous: Decimal) -> (Decimal, NewLedgerEntry) {
        let difference = adjustment_delta(self.counted, previous);
        let entry = plan_adjustment(
            self.product_id,
            self.location_id,
            difference,
            self.reference.clone(),
            &self.stamp,
        );
        (difference, entry)
    }
}

/// Outcome of an atomic count adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub entry: LedgerEntry,
    pub previous_balance: Decimal,
    pub difference: Decimal,
}

/// Append-only ledger storage.
///
/// Implementations never update or delete entries. Every write takes a
/// per-product serialization point so `reconcile` observes a stable balance.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    async fn append(&self, entry: NewLedgerEntry) -> StoreResult<LedgerEntry> {
        self.append_batch(vec![entry])
            .await?
            .pop()
            .ok_or_else(|| StoreError::Storage("append returned no entry".to_string()))
    }

    /// Append all entries or none. Ids are assigned in input order.
    async fn append_batch(&self, entries: Vec<NewLedgerEntry>) -> StoreResult<Vec<LedgerEntry>>;

    async fn get(&self, id: EntryId) -> StoreResult<Option<LedgerEntry>>;

    /// Every matching entry, newest first.
    async fn query(&self, filter: &LedgerFilter) -> StoreResult<Vec<LedgerEntry>>;

    async fn query_page(
        &self,
        filter: &LedgerFilter,
        pagination: Pagination,
    ) -> StoreResult<LedgerPage>;

    async fn balance(&self, product: ProductId, location: Option<LocationId>)
    -> StoreResult<Decimal>;

    async fn product_totals(&self) -> StoreResult<HashMap<ProductId, Decimal>>;

    async fn total_stock(&self) -> StoreResult<Decimal>;

    /// Read the location balance, compute the difference to the count and
    /// append one adjust entry, with no other write to the product in between.
    async fn reconcile(&self, draft: AdjustmentDraft) -> StoreResult<Reconciliation>;

    async fn references_product(&self, product: ProductId) -> StoreResult<bool>;

    async fn references_location(&self, location: LocationId) -> StoreResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_caps_the_limit() {
        let p = Pagination::new(Some(5_000), None);
        assert_eq!(p.limit, Pagination::MAX_LIMIT);
        assert_eq!(Pagination::new(None, Some(3)), Pagination { limit: 50, offset: 3 });
    }

    #[test]
    fn page_reports_remaining_entries() {
        let page = LedgerPage::new(Vec::new(), 10, Pagination::new(Some(5), Some(10)));
        assert!(!page.has_more);
        let page = LedgerPage::new(Vec::new(), 10, Pagination::new(Some(5), Some(0)));
        assert!(page.has_more);
    }

    #[test]
    fn negative_count_is_rejected() {
        let stamp = EntryStamp::new(None, chrono::Utc::now());
        let draft = AdjustmentDraft::new(
            ProductId::new(1),
            LocationId::new(1),
            Decimal::from(-1),
            None,
            stamp,
        );
        assert!(matches!(draft, Err(DomainError::Validation(_))));
    }

    #[test]
    fn settling_a_valid_count_lands_on_it() {
        let stamp = EntryStamp::new(None, chrono::Utc::now());
        let draft = AdjustmentDraft::new(
            ProductId::new(1),
            LocationId::new(2),
            Decimal::ZERO,
            None,
            stamp,
        )
        .unwrap();
        let (difference, entry) = draft.settle(Decimal::from(7));
        assert_eq!(difference, Decimal::from(-7));
        assert_eq!(entry.qty_change, Decimal::from(-7));
    }
}
