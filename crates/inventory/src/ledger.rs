//! The stock ledger: immutable signed quantity changes.
//!
//! Entries are only ever appended. A mistake is undone by appending a
//! reversal entry that points back at the entry it cancels (`reverses`).

use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use depot_core::{DomainError, DomainResult, Entity, EntryId, LocationId, ProductId, UserId};

/// Movement kind recorded on every ledger entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveType {
    /// Stock in from a vendor.
    Receipt,
    /// Stock out to a customer.
    Delivery,
    /// Stock moved between two internal locations.
    Transfer,
    /// Reconciliation against a physical count.
    Adjust,
}

impl MoveType {
    pub const ALL: [MoveType; 4] = [
        MoveType::Receipt,
        MoveType::Delivery,
        MoveType::Transfer,
        MoveType::Adjust,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MoveType::Receipt => "receipt",
            MoveType::Delivery => "delivery",
            MoveType::Transfer => "transfer",
            MoveType::Adjust => "adjust",
        }
    }
}

impl core::fmt::Display for MoveType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MoveType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MoveType::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| DomainError::validation(format!("unknown move type '{s}'")))
    }
}

/// A persisted ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub product_id: ProductId,
    /// Signed quantity delta. Positive adds stock, negative removes it.
    pub qty_change: Decimal,
    pub move_type: MoveType,
    pub reference: Option<String>,
    pub location_src_id: Option<LocationId>,
    pub location_dest_id: Option<LocationId>,
    pub user_id: Option<UserId>,
    /// Shared by every entry written by the same recorder call.
    pub movement_id: Uuid,
    /// Set on reversal entries: the entry this one cancels.
    pub reverses: Option<EntryId>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Whether this entry counts towards the balance of `location`.
    pub fn touches(&self, location: LocationId) -> bool {
        self.location_src_id == Some(location) || self.location_dest_id == Some(location)
    }

    pub fn is_reversal(&self) -> bool {
        self.reverses.is_some()
    }

    /// The storage location an adjustment applied to.
    pub fn adjusted_location(&self) -> Option<LocationId> {
        self.location_dest_id.or(self.location_src_id)
    }
}

impl Entity for LedgerEntry {
    type Id = EntryId;

    fn id(&self) -> EntryId {
        self.id
    }
}

/// An entry ready to be appended (the store assigns the id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLedgerEntry {
    pub product_id: ProductId,
    pub qty_change: Decimal,
    pub move_type: MoveType,
    pub reference: Option<String>,
    pub location_src_id: Option<LocationId>,
    pub location_dest_id: Option<LocationId>,
    pub user_id: Option<UserId>,
    pub movement_id: Uuid,
    pub reverses: Option<EntryId>,
    pub created_at: DateTime<Utc>,
}

impl NewLedgerEntry {
    pub fn into_entry(self, id: EntryId) -> LedgerEntry {
        LedgerEntry {
            id,
            product_id: self.product_id,
            qty_change: self.qty_change,
            move_type: self.move_type,
            reference: self.reference,
            location_src_id: self.location_src_id,
            location_dest_id: self.location_dest_id,
            user_id: self.user_id,
            movement_id: self.movement_id,
            reverses: self.reverses,
            created_at: self.created_at,
        }
    }
}

/// Filter criteria for ledger reads. Every populated field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerFilter {
    pub product_id: Option<ProductId>,
    /// Matches entries whose source or destination is this location.
    pub location_id: Option<LocationId>,
    pub move_type: Option<MoveType>,
    /// Inclusive lower bound on `created_at`.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub to: Option<DateTime<Utc>>,
}

impl LedgerFilter {
    pub fn for_product(product_id: ProductId) -> Self {
        Self {
            product_id: Some(product_id),
            ..Default::default()
        }
    }

    pub fn with_move_type(mut self, move_type: MoveType) -> Self {
        self.move_type = Some(move_type);
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(DomainError::validation("from_date must not be after to_date"));
            }
        }
        Ok(())
    }

    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        self.product_id.is_none_or(|p| entry.product_id == p)
            && self.location_id.is_none_or(|l| entry.touches(l))
            && self.move_type.is_none_or(|m| entry.move_type == m)
            && self.from.is_none_or(|from| entry.created_at >= from)
            && self.to.is_none_or(|to| entry.created_at <= to)
    }
}

/// Newest first, ties broken by id (also newest first).
pub fn sort_newest_first(entries: &mut [LedgerEntry]) {
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Build a persisted entry with the fields tests usually care about.
    pub fn entry(
        id: i64,
        product: i64,
        qty: i64,
        move_type: MoveType,
        src: Option<i64>,
        dest: Option<i64>,
    ) -> LedgerEntry {
        LedgerEntry {
            id: EntryId::new(id),
            product_id: ProductId::new(product),
            qty_change: Decimal::from(qty),
            move_type,
            reference: None,
            location_src_id: src.map(LocationId::new),
            location_dest_id: dest.map(LocationId::new),
            user_id: None,
            movement_id: Uuid::nil(),
            reverses: None,
            created_at: DateTime::<Utc>::from_timestamp(1_700_000_000 + id, 0)
                .unwrap_or_default(),
        }
    }
}
