use std::sync::Arc;

use sqlx::PgPool;

use crate::catalog_store::{CatalogStore, InMemoryCatalogStore, PostgresCatalogStore};
use crate::ledger_store::{InMemoryLedgerStore, LedgerStore, PostgresLedgerStore};
use crate::otp_store::{InMemoryOtpStore, OtpStore, PostgresOtpStore};
use crate::user_store::{InMemoryUserStore, PostgresUserStore, UserStore};

/// Every store the services need, behind trait objects.
#[derive(Clone)]
pub struct Stores {
    pub ledger: Arc<dyn LedgerStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub users: Arc<dyn UserStore>,
    pub otps: Arc<dyn OtpStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            ledger: Arc::new(InMemoryLedgerStore::new()),
            catalog: Arc::new(InMemoryCatalogStore::new()),
            users: Arc::new(InMemoryUserStore::new()),
            otps: Arc::new(InMemoryOtpStore::new()),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            ledger: Arc::new(PostgresLedgerStore::new(pool.clone())),
            catalog: Arc::new(PostgresCatalogStore::new(pool.clone())),
            users: Arc::new(PostgresUserStore::new(pool.clone())),
            otps: Arc::new(PostgresOtpStore::new(pool)),
        }
    }
}
