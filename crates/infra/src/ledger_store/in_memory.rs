use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use rust_decimal::Decimal;

use depot_core::{EntryId, LocationId, ProductId};
use depot_inventory::{
    LedgerEntry, LedgerFilter, NewLedgerEntry, balance, product_totals, sort_newest_first,
    total_stock,
};

use super::{AdjustmentDraft, LedgerPage, LedgerStore, Pagination, Reconciliation};
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Default)]
struct LedgerState {
    entries: Vec<LedgerEntry>,
    reversed: HashSet<EntryId>,
    last_id: i64,
}

impl LedgerState {
    /// Check and append under the caller's write lock.
    fn push_all(&mut self, batch: Vec<NewLedgerEntry>) -> StoreResult<Vec<LedgerEntry>> {
        let mut claimed = HashSet::new();
        for new in &batch {
            let Some(target) = new.reverses else {
                continue;
            };
            if self.reversed.contains(&target) || !claimed.insert(target) {
                return Err(StoreError::Conflict(format!("entry {target} is already reversed")));
            }
            if !self.entries.iter().any(|e| e.id == target) {
                return Err(StoreError::InvalidReference(format!(
                    "reversed entry {target} does not exist"
                )));
            }
        }

        let mut stored = Vec::with_capacity(batch.len());
        for new in batch {
            self.last_id += 1;
            let entry = new.into_entry(EntryId::new(self.last_id));
            if let Some(target) = entry.reverses {
                self.reversed.insert(target);
            }
            self.entries.push(entry.clone());
            stored.push(entry);
        }
        Ok(stored)
    }
}

/// In-memory ledger.
///
/// Intended for tests/dev. A single write lock serializes all appends, which
/// makes `reconcile` trivially atomic.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    state: RwLock<LedgerState>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn matching(&self, filter: &LedgerFilter) -> StoreResult<Vec<LedgerEntry>> {
        let state = self.state.read().map_err(|_| StoreError::poisoned())?;
        let mut out: Vec<LedgerEntry> = state
            .entries
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        sort_newest_first(&mut out);
        Ok(out)
    }
}

#[async_trait::async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn append_batch(&self, entries: Vec<NewLedgerEntry>) -> StoreResult<Vec<LedgerEntry>> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        let mut state = self.state.write().map_err(|_| StoreError::poisoned())?;
        state.push_all(entries)
    }

    async fn get(&self, id: EntryId) -> StoreResult<Option<LedgerEntry>> {
        let state = self.state.read().map_err(|_| StoreError::poisoned())?;
        Ok(state.entries.iter().find(|e| e.id == id).cloned())
    }

    async fn query(&self, filter: &LedgerFilter) -> StoreResult<Vec<LedgerEntry>> {
        self.matching(filter)
    }

    async fn query_page(
        &self,
        filter: &LedgerFilter,
        pagination: Pagination,
    ) -> StoreResult<LedgerPage> {
        let all = self.matching(filter)?;
        let total = all.len() as u64;
        let entries = all
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .collect();
        Ok(LedgerPage::new(entries, total, pagination))
    }

    async fn balance(
        &self,
        product: ProductId,
        location: Option<LocationId>,
    ) -> StoreResult<Decimal> {
        let state = self.state.read().map_err(|_| StoreError::poisoned())?;
        Ok(balance(&state.entries, product, location))
    }

    async fn product_totals(&self) -> StoreResult<HashMap<ProductId, Decimal>> {
        let state = self.state.read().map_err(|_| StoreError::poisoned())?;
        Ok(product_totals(&state.entries))
    }

    async fn total_stock(&self) -> StoreResult<Decimal> {
        let state = self.state.read().map_err(|_| StoreError::poisoned())?;
        Ok(total_stock(&state.entries))
    }

    async fn reconcile(&self, draft: AdjustmentDraft) -> StoreResult<Reconciliation> {
        let mut state = self.state.write().map_err(|_| StoreError::poisoned())?;
        let previous_balance = balance(&state.entries, draft.product_id, Some(draft.location_id));
        let (difference, new) = draft.settle(previous_balance);
        let entry = state
            .push_all(vec![new])?
            .pop()
            .ok_or_else(|| StoreError::Storage("append returned no entry".to_string()))?;
        Ok(Reconciliation {
            entry,
            previous_balance,
            difference,
        })
    }

    async fn references_product(&self, product: ProductId) -> StoreResult<bool> {
        let state = self.state.read().map_err(|_| StoreError::poisoned())?;
        Ok(state.entries.iter().any(|e| e.product_id == product))
    }

    async fn references_location(&self, location: LocationId) -> StoreResult<bool> {
        let state = self.state.read().map_err(|_| StoreError::poisoned())?;
        Ok(state.entries.iter().any(|e| e.touches(location)))
    }
}
