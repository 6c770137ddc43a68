//! Postgres-backed ledger.
//!
//! Appends run in a transaction that first takes
//! `pg_advisory_xact_lock(product_id)` for every product in the batch, in
//! ascending order. `reconcile` takes the same lock before reading the
//! balance, so a count adjustment can never interleave with another movement
//! of the same product. The `reverses` column is unique, which makes a second
//! reversal of the same entry fail with a unique violation (`Conflict`).

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use depot_core::{EntryId, LocationId, ProductId, UserId};
use depot_inventory::{LedgerEntry, LedgerFilter, NewLedgerEntry};

use super::{AdjustmentDraft, LedgerPage, LedgerStore, Pagination, Reconciliation};
use crate::error::{StoreError, StoreResult, map_sqlx_error};

const ENTRY_COLUMNS: &str = "id, product_id, qty_change, move_type, reference, location_src_id, \
     location_dest_id, user_id, movement_id, reverses, created_at";

const FILTER_CLAUSE: &str = r#"
    WHERE ($1::BIGINT IS NULL OR product_id = $1)
      AND ($2::BIGINT IS NULL OR location_src_id = $2 OR location_dest_id = $2)
      AND ($3::TEXT IS NULL OR move_type = $3)
      AND ($4::TIMESTAMPTZ IS NULL OR created_at >= $4)
      AND ($5::TIMESTAMPTZ IS NULL OR created_at <= $5)
"#;

#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: Arc<PgPool>,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

/// Take the per-product write locks for the current transaction.
async fn lock_products(
    conn: &mut PgConnection,
    products: impl IntoIterator<Item = ProductId>,
) -> Result<(), sqlx::Error> {
    let ordered: BTreeSet<ProductId> = products.into_iter().collect();
    for product in ordered {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(product.get())
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn insert_entry(
    conn: &mut PgConnection,
    new: NewLedgerEntry,
) -> Result<LedgerEntry, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO stock_ledger (
            product_id, qty_change, move_type, reference, location_src_id,
            location_dest_id, user_id, movement_id, reverses, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id
        "#,
    )
    .bind(new.product_id.get())
    .bind(new.qty_change)
    .bind(new.move_type.as_str())
    .bind(new.reference.as_deref())
    .bind(new.location_src_id.map(|l| l.get()))
    .bind(new.location_dest_id.map(|l| l.get()))
    .bind(new.user_id.map(|u| u.get()))
    .bind(new.movement_id)
    .bind(new.reverses.map(|r| r.get()))
    .bind(new.created_at)
    .fetch_one(&mut *conn)
    .await?;

    let id: i64 = row.try_get("id")?;
    Ok(new.into_entry(EntryId::new(id)))
}

async fn location_balance(
    conn: &mut PgConnection,
    product: ProductId,
    location: Option<LocationId>,
) -> Result<Decimal, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT COALESCE(SUM(qty_change), 0) AS balance
        FROM stock_ledger
        WHERE product_id = $1
          AND ($2::BIGINT IS NULL OR location_src_id = $2 OR location_dest_id = $2)
        "#,
    )
    .bind(product.get())
    .bind(location.map(|l| l.get()))
    .fetch_one(&mut *conn)
    .await?;
    row.try_get("balance")
}

#[async_trait::async_trait]
impl LedgerStore for PostgresLedgerStore {
    #[instrument(skip(self, entries), fields(count = entries.len()), err)]
    async fn append_batch(&self, entries: Vec<NewLedgerEntry>) -> StoreResult<Vec<LedgerEntry>> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("append_batch", e))?;

        lock_products(&mut tx, entries.iter().map(|e| e.product_id))
            .await
            .map_err(|e| map_sqlx_error("append_batch", e))?;

        let mut stored = Vec::with_capacity(entries.len());
        for new in entries {
            let entry = insert_entry(&mut tx, new)
                .await
                .map_err(|e| map_sqlx_error("append_batch", e))?;
            stored.push(entry);
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("append_batch", e))?;
        Ok(stored)
    }

    #[instrument(skip(self), err)]
    async fn get(&self, id: EntryId) -> StoreResult<Option<LedgerEntry>> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM stock_ledger WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get", e))?;
        row.map(|r| LedgerEntry::try_from(LedgerRow::from_pg_row(&r)?))
            .transpose()
    }

    #[instrument(skip(self), err)]
    async fn query(&self, filter: &LedgerFilter) -> StoreResult<Vec<LedgerEntry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM stock_ledger {FILTER_CLAUSE} ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(filter.product_id.map(|p| p.get()))
            .bind(filter.location_id.map(|l| l.get()))
            .bind(filter.move_type.map(|m| m.as_str()))
            .bind(filter.from)
            .bind(filter.to)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("query", e))?;
        rows.iter()
            .map(|r| LedgerEntry::try_from(LedgerRow::from_pg_row(r)?))
            .collect()
    }

    #[instrument(skip(self), err)]
    async fn query_page(
        &self,
        filter: &LedgerFilter,
        pagination: Pagination,
    ) -> StoreResult<LedgerPage> {
        let count_sql = format!("SELECT COUNT(*) AS total FROM stock_ledger {FILTER_CLAUSE}");
        let count_row = sqlx::query(&count_sql)
            .bind(filter.product_id.map(|p| p.get()))
            .bind(filter.location_id.map(|l| l.get()))
            .bind(filter.move_type.map(|m| m.as_str()))
            .bind(filter.from)
            .bind(filter.to)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_entries", e))?;
        let total: i64 = count_row
            .try_get("total")
            .map_err(|e| StoreError::Storage(format!("failed to read count: {}", e)))?;

        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM stock_ledger {FILTER_CLAUSE} \
             ORDER BY created_at DESC, id DESC LIMIT $6 OFFSET $7"
        );
        let rows = sqlx::query(&sql)
            .bind(filter.product_id.map(|p| p.get()))
            .bind(filter.location_id.map(|l| l.get()))
            .bind(filter.move_type.map(|m| m.as_str()))
            .bind(filter.from)
            .bind(filter.to)
            .bind(i64::from(pagination.limit))
            .bind(i64::from(pagination.offset))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("query_page", e))?;
        let entries = rows
            .iter()
            .map(|r| LedgerEntry::try_from(LedgerRow::from_pg_row(r)?))
            .collect::<StoreResult<Vec<LedgerEntry>>>()?;

        Ok(LedgerPage::new(entries, total.max(0) as u64, pagination))
    }

    #[instrument(skip(self), err)]
    async fn balance(
        &self,
        product: ProductId,
        location: Option<LocationId>,
    ) -> StoreResult<Decimal> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("balance", e))?;
        location_balance(&mut conn, product, location)
            .await
            .map_err(|e| map_sqlx_error("balance", e))
    }

    #[instrument(skip(self), err)]
    async fn product_totals(&self) -> StoreResult<HashMap<ProductId, Decimal>> {
        let rows = sqlx::query(
            "SELECT product_id, COALESCE(SUM(qty_change), 0) AS total FROM stock_ledger GROUP BY product_id",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("product_totals", e))?;

        let mut totals = HashMap::with_capacity(rows.len());
        for row in rows {
            let product: i64 = row
                .try_get("product_id")
                .map_err(|e| map_sqlx_error("product_totals", e))?;
            let total: Decimal = row
                .try_get("total")
                .map_err(|e| map_sqlx_error("product_totals", e))?;
            totals.insert(ProductId::new(product), total);
        }
        Ok(totals)
    }

    #[instrument(skip(self), err)]
    async fn total_stock(&self) -> StoreResult<Decimal> {
        let row = sqlx::query("SELECT COALESCE(SUM(qty_change), 0) AS total FROM stock_ledger")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("total_stock", e))?;
        row.try_get("total")
            .map_err(|e| map_sqlx_error("total_stock", e))
    }

    #[instrument(
        skip(self, draft),
        fields(product_id = %draft.product_id, location_id = %draft.location_id),
        err
    )]
    async fn reconcile(&self, draft: AdjustmentDraft) -> StoreResult<Reconciliation> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("reconcile", e))?;

        lock_products(&mut tx, [draft.product_id])
            .await
            .map_err(|e| map_sqlx_error("reconcile", e))?;
        let previous_balance = location_balance(&mut tx, draft.product_id, Some(draft.location_id))
            .await
            .map_err(|e| map_sqlx_error("reconcile", e))?;

        let (difference, new) = draft.settle(previous_balance);
        let entry = insert_entry(&mut tx, new)
            .await
            .map_err(|e| map_sqlx_error("reconcile", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("reconcile", e))?;

        Ok(Reconciliation {
            entry,
            previous_balance,
            difference,
        })
    }

    #[instrument(skip(self), err)]
    async fn references_product(&self, product: ProductId) -> StoreResult<bool> {
        let row = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM stock_ledger WHERE product_id = $1) AS referenced",
        )
        .bind(product.get())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("references_product", e))?;
        row.try_get("referenced")
            .map_err(|e| map_sqlx_error("references_product", e))
    }

    #[instrument(skip(self), err)]
    async fn references_location(&self, location: LocationId) -> StoreResult<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM stock_ledger
                WHERE location_src_id = $1 OR location_dest_id = $1
            ) AS referenced
            "#,
        )
        .bind(location.get())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("references_location", e))?;
        row.try_get("referenced")
            .map_err(|e| map_sqlx_error("references_location", e))
    }
}

// SQLx row types

#[derive(Debug)]
struct LedgerRow {
    id: i64,
    product_id: i64,
    qty_change: Decimal,
    move_type: String,
    reference: Option<String>,
    location_src_id: Option<i64>,
    location_dest_id: Option<i64>,
    user_id: Option<i64>,
    movement_id: Uuid,
    reverses: Option<i64>,
    created_at: DateTime<Utc>,
}

impl LedgerRow {
    fn from_pg_row(row: &sqlx::postgres::PgRow) -> StoreResult<Self> {
        let read = || -> Result<Self, sqlx::Error> {
            Ok(LedgerRow {
                id: row.try_get("id")?,
                product_id: row.try_get("product_id")?,
                qty_change: row.try_get("qty_change")?,
                move_type: row.try_get("move_type")?,
                reference: row.try_get("reference")?,
                location_src_id: row.try_get("location_src_id")?,
                location_dest_id: row.try_get("location_dest_id")?,
                user_id: row.try_get("user_id")?,
                movement_id: row.try_get("movement_id")?,
                reverses: row.try_get("reverses")?,
                created_at: row.try_get("created_at")?,
            })
        };
        read().map_err(|e| StoreError::Storage(format!("failed to read ledger row: {}", e)))
    }
}

impl TryFrom<LedgerRow> for LedgerEntry {
    type Error = StoreError;

    fn try_from(row: LedgerRow) -> Result<Self, Self::Error> {
        let move_type = row
            .move_type
            .parse()
            .map_err(|e| StoreError::Storage(format!("ledger row {}: {}", row.id, e)))?;
        Ok(LedgerEntry {
            id: EntryId::new(row.id),
            product_id: ProductId::new(row.product_id),
            qty_change: row.qty_change,
            move_type,
            reference: row.reference,
            location_src_id: row.location_src_id.map(LocationId::new),
            location_dest_id: row.location_dest_id.map(LocationId::new),
            user_id: row.user_id.map(UserId::new),
            movement_id: row.movement_id,
            reverses: row.reverses.map(EntryId::new),
            created_at: row.created_at,
        })
    }
}
