//! Postgres-backed user accounts.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use depot_auth::{NewUser, Role, User};
use depot_core::UserId;

use super::UserStore;
use crate::error::{StoreError, StoreResult, map_sqlx_error};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, is_active, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresUserStore {
    pool: Arc<PgPool>,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait::async_trait]
impl UserStore for PostgresUserStore {
    #[instrument(skip(self, user), fields(email = %user.email), err)]
    async fn create(&self, user: NewUser, now: DateTime<Utc>) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users (name, email, password_hash, role, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, TRUE, $5, $5) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(now)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_user", e))?;
        user_from_row(&row)
    }

    #[instrument(skip(self), err)]
    async fn get(&self, id: UserId) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;
        rows.iter().map(user_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn update_role(&self, id: UserId, role: Role, now: DateTime<Utc>) -> StoreResult<User> {
        let sql = format!(
            "UPDATE users SET role = $2, updated_at = $3 WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id.get())
            .bind(role.as_str())
            .bind(now)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_role", e))?;
        match row {
            Some(row) => user_from_row(&row),
            None => Err(StoreError::NotFound(format!("user {id}"))),
        }
    }

    #[instrument(skip(self, password_hash), err)]
    async fn set_password(
        &self,
        id: UserId,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1")
            .bind(id.get())
            .bind(&password_hash)
            .bind(now)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_password", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {id}")));
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn count(&self) -> StoreResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM users")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_users", e))?;
        let total: i64 = row
            .try_get("total")
            .map_err(|e| map_sqlx_error("count_users", e))?;
        Ok(total.max(0) as u64)
    }
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    let read = || -> Result<User, sqlx::Error> {
        Ok(User {
            id: UserId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role: Role::new(row.try_get::<String, _>("role")?),
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    };
    read().map_err(|e| StoreError::Storage(format!("failed to read user row: {}", e)))
}
