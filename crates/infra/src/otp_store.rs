//! OTP challenge persistence.

use std::sync::{Arc, RwLock};

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use depot_auth::{NewOtpChallenge, OtpChallenge};

use crate::error::{StoreError, StoreResult, map_sqlx_error};

#[async_trait::async_trait]
pub trait OtpStore: Send + Sync {
    async fn insert(&self, challenge: NewOtpChallenge) -> StoreResult<OtpChallenge>;

    /// Most recent challenge for the email, used or not.
    async fn latest(&self, email: &str) -> StoreResult<Option<OtpChallenge>>;

    /// Most recent challenge for the email that has not been consumed.
    async fn latest_unused(&self, email: &str) -> StoreResult<Option<OtpChallenge>>;

    /// Mark the challenge used. Returns `false` if it was already consumed.
    async fn consume(&self, id: i64) -> StoreResult<bool>;

    /// Undo a `consume` whose follow-up write failed.
    async fn release(&self, id: i64) -> StoreResult<()>;
}

#[derive(Debug, Default)]
pub struct InMemoryOtpStore {
    challenges: RwLock<Vec<OtpChallenge>>,
}

impl InMemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn newest<F>(&self, email: &str, keep: F) -> StoreResult<Option<OtpChallenge>>
    where
        F: Fn(&OtpChallenge) -> bool,
    {
        let challenges = self.challenges.read().map_err(|_| StoreError::poisoned())?;
        Ok(challenges
            .iter()
            .filter(|c| c.email == email && keep(c))
            .max_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
            .cloned())
    }
}

#[async_trait::async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn insert(&self, challenge: NewOtpChallenge) -> StoreResult<OtpChallenge> {
        let mut challenges = self.challenges.write().map_err(|_| StoreError::poisoned())?;
        let id = challenges.len() as i64 + 1;
        let challenge = challenge.into_challenge(id);
        challenges.push(challenge.clone());
        Ok(challenge)
    }

    async fn latest(&self, email: &str) -> StoreResult<Option<OtpChallenge>> {
        self.newest(email, |_| true)
    }

    async fn latest_unused(&self, email: &str) -> StoreResult<Option<OtpChallenge>> {
        self.newest(email, |c| !c.used)
    }

    async fn consume(&self, id: i64) -> StoreResult<bool> {
        let mut challenges = self.challenges.write().map_err(|_| StoreError::poisoned())?;
        match challenges.iter_mut().find(|c| c.id == id) {
            Some(c) if !c.used => {
                c.used = true;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(StoreError::NotFound(format!("otp challenge {id}"))),
        }
    }

    async fn release(&self, id: i64) -> StoreResult<()> {
        let mut challenges = self.challenges.write().map_err(|_| StoreError::poisoned())?;
        match challenges.iter_mut().find(|c| c.id == id) {
            Some(c) => {
                c.used = false;
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("otp challenge {id}"))),
        }
    }
}

const OTP_COLUMNS: &str = "id, email, otp, expires_at, used, created_at";

#[derive(Debug, Clone)]
pub struct PostgresOtpStore {
    pool: Arc<PgPool>,
}

impl PostgresOtpStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait::async_trait]
impl OtpStore for PostgresOtpStore {
    #[instrument(skip(self, challenge), fields(email = %challenge.email), err)]
    async fn insert(&self, challenge: NewOtpChallenge) -> StoreResult<OtpChallenge> {
        let row = sqlx::query(
            "INSERT INTO otp_codes (email, otp, expires_at, used, created_at) \
             VALUES ($1, $2, $3, FALSE, $4) RETURNING id",
        )
        .bind(&challenge.email)
        .bind(&challenge.code)
        .bind(challenge.expires_at)
        .bind(challenge.created_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_otp", e))?;
        let id: i64 = row
            .try_get("id")
            .map_err(|e| map_sqlx_error("insert_otp", e))?;
        Ok(challenge.into_challenge(id))
    }

    #[instrument(skip(self), err)]
    async fn latest(&self, email: &str) -> StoreResult<Option<OtpChallenge>> {
        let sql = format!(
            "SELECT {OTP_COLUMNS} FROM otp_codes WHERE email = $1 \
             ORDER BY created_at DESC, id DESC LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("latest_otp", e))?;
        row.as_ref().map(challenge_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn latest_unused(&self, email: &str) -> StoreResult<Option<OtpChallenge>> {
        let sql = format!(
            "SELECT {OTP_COLUMNS} FROM otp_codes WHERE email = $1 AND used = FALSE \
             ORDER BY created_at DESC, id DESC LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("latest_unused_otp", e))?;
        row.as_ref().map(challenge_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn consume(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE otp_codes SET used = TRUE WHERE id = $1 AND used = FALSE")
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("consume_otp", e))?;
        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self), err)]
    async fn release(&self, id: i64) -> StoreResult<()> {
        sqlx::query("UPDATE otp_codes SET used = FALSE WHERE id = $1")
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("release_otp", e))?;
        Ok(())
    }
}

fn challenge_from_row(row: &PgRow) -> StoreResult<OtpChallenge> {
    let read = || -> Result<OtpChallenge, sqlx::Error> {
        Ok(OtpChallenge {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            code: row.try_get("otp")?,
            expires_at: row.try_get("expires_at")?,
            used: row.try_get("used")?,
            created_at: row.try_get("created_at")?,
        })
    };
    read().map_err(|e| StoreError::Storage(format!("failed to read otp row: {}", e)))
}
